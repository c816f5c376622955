use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use crate::{
    auth::AUTHOR_ROLES,
    extractors::AuthGuard,
    models::{
        Assessment, AssessmentFilter, AssessmentPatch, AssessmentStatus, Category, InvalidValue,
        NewAssessment, ReadingLevel,
    },
    names,
    rejections::{AppError, Envelope, ResultExt},
    services::assessment::{AssessmentPage, CreateOutcome, PageRequest, UpdateOutcome},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            names::ASSESSMENTS_URL,
            get(list_assessments).post(create_assessment),
        )
        .route(names::ASSESSMENT_FILTER_URL, get(filter_assessments))
        .route(
            names::ASSESSMENT_URL,
            get(get_assessment)
                .put(update_assessment)
                .delete(delete_assessment),
        )
        .route(names::ASSESSMENT_STATUS_URL, patch(update_status))
}

const NOT_FOUND: &str = "Assessment not found";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    reading_level: Option<ReadingLevel>,
    #[serde(default)]
    category: Option<Category>,
    #[serde(default)]
    status: Option<AssessmentStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterQuery {
    #[serde(default)]
    reading_level: Option<ReadingLevel>,
    #[serde(default)]
    category: Option<Category>,
}

#[derive(Deserialize)]
struct StatusBody {
    #[serde(default)]
    status: Option<String>,
}

async fn list_assessments(
    _guard: AuthGuard,
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, AppError>,
) -> Result<Json<Envelope<AssessmentPage>>, AppError> {
    let filter = AssessmentFilter {
        reading_level: query.reading_level,
        category: query.category,
        status: query.status,
    };
    let page = state
        .assessments
        .list(filter, PageRequest::new(query.page, query.limit))
        .await
        .reject("could not list assessments")?;

    Ok(Json(Envelope::data(page)))
}

async fn filter_assessments(
    _guard: AuthGuard,
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<FilterQuery>, AppError>,
) -> Result<Json<Envelope<Vec<Assessment>>>, AppError> {
    let assessments = state
        .assessments
        .active(query.reading_level, query.category)
        .await
        .reject("could not filter assessments")?;

    Ok(Json(Envelope::data(assessments)))
}

async fn get_assessment(
    _guard: AuthGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Assessment>>, AppError> {
    let assessment = state
        .assessments
        .get(&id)
        .await
        .reject("could not get assessment")?
        .ok_or(AppError::NotFound(NOT_FOUND))?;

    Ok(Json(Envelope::data(assessment)))
}

async fn create_assessment(
    guard: AuthGuard,
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<NewAssessment>, AppError>,
) -> Result<(StatusCode, Json<Envelope<Assessment>>), AppError> {
    let ctx = guard.require(AUTHOR_ROLES)?;

    let outcome = state
        .assessments
        .create(ctx, payload)
        .await
        .reject("could not create assessment")?;

    match outcome {
        CreateOutcome::Created(assessment) => Ok((
            StatusCode::CREATED,
            Json(Envelope::data(assessment).with_message("Assessment created successfully")),
        )),
        CreateOutcome::Invalid(errors) => Err(errors.into()),
        CreateOutcome::Duplicate {
            reading_level,
            category,
        } => Err(AppError::Conflict(format!(
            "An assessment for reading level \"{reading_level}\" and category \"{category}\" already exists"
        ))),
    }
}

async fn update_assessment(
    guard: AuthGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(patch), _): WithRejection<Json<AssessmentPatch>, AppError>,
) -> Result<Json<Envelope<Assessment>>, AppError> {
    let ctx = guard.require(AUTHOR_ROLES)?;

    let outcome = state
        .assessments
        .update(ctx, &id, patch)
        .await
        .reject("could not update assessment")?;

    match outcome {
        UpdateOutcome::Updated(assessment) => Ok(Json(
            Envelope::data(assessment).with_message("Assessment updated successfully"),
        )),
        UpdateOutcome::NotFound => Err(AppError::NotFound(NOT_FOUND)),
        UpdateOutcome::ImmutableFields => Err(AppError::Validation(
            "Reading level and category cannot be changed after creation".to_string(),
        )),
        UpdateOutcome::Invalid(errors) => Err(errors.into()),
    }
}

async fn delete_assessment(
    guard: AuthGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<()>>, AppError> {
    let ctx = guard.require(AUTHOR_ROLES)?;

    let deleted = state
        .assessments
        .delete(ctx, &id)
        .await
        .reject("could not delete assessment")?;

    if !deleted {
        return Err(AppError::NotFound(NOT_FOUND));
    }
    Ok(Json(Envelope::message("Assessment deleted successfully")))
}

async fn update_status(
    guard: AuthGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<StatusBody>, AppError>,
) -> Result<Json<Envelope<Assessment>>, AppError> {
    let ctx = guard.require(AUTHOR_ROLES)?;

    let status: AssessmentStatus = body
        .status
        .unwrap_or_default()
        .parse()
        .map_err(|e: InvalidValue| AppError::Validation(e.to_string()))?;

    let assessment = state
        .assessments
        .set_status(ctx, &id, status)
        .await
        .reject("could not change assessment status")?
        .ok_or(AppError::NotFound(NOT_FOUND))?;

    Ok(Json(Envelope::data(assessment).with_message(format!(
        "Assessment status set to {status}"
    ))))
}
