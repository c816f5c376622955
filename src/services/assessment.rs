use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::Serialize;
use ulid::Ulid;

use crate::auth::RequestContext;
use crate::db::Db;
use crate::models::{
    Assessment, AssessmentFilter, AssessmentPatch, AssessmentStatus, Category, NewAssessment,
    ReadingLevel,
};
use crate::names;
use crate::question_id::assign_question_ids;
use crate::validation::{validate_question_ids, validate_questions, ValidationErrors};

// ---------------------------------------------------------------------------
// AssessmentRepository trait (DIP: service defines the abstraction it needs)
// ---------------------------------------------------------------------------

#[cfg_attr(test, mockall::automock)]
pub trait AssessmentRepository: Send + Sync {
    fn find(&self, id: &str) -> impl std::future::Future<Output = Result<Option<Assessment>>> + Send;

    fn find_by_combination(
        &self,
        reading_level: ReadingLevel,
        category: Category,
    ) -> impl std::future::Future<Output = Result<Option<Assessment>>> + Send;

    /// `false` when the reading level and category pair is already taken.
    fn insert(
        &self,
        assessment: &Assessment,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// `false` when the assessment no longer exists.
    fn save(&self, assessment: &Assessment)
        -> impl std::future::Future<Output = Result<bool>> + Send;

    fn delete(&self, id: &str) -> impl std::future::Future<Output = Result<bool>> + Send;

    fn set_status(
        &self,
        id: &str,
        status: AssessmentStatus,
        updated_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Option<Assessment>>> + Send;

    fn list(
        &self,
        filter: AssessmentFilter,
        offset: i64,
        limit: Option<i64>,
    ) -> impl std::future::Future<Output = Result<(Vec<Assessment>, i64)>> + Send;
}

// ---------------------------------------------------------------------------
// Outcome enums
// ---------------------------------------------------------------------------

pub enum CreateOutcome {
    Created(Assessment),
    /// The payload failed schema or id validation.
    Invalid(ValidationErrors),
    /// An assessment already exists for this reading level and category.
    Duplicate {
        reading_level: ReadingLevel,
        category: Category,
    },
}

pub enum UpdateOutcome {
    Updated(Assessment),
    NotFound,
    /// The patch tried to change the reading level or category.
    ImmutableFields,
    Invalid(ValidationErrors),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Page numbers start at 1; the page size is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(names::DEFAULT_PAGE).max(1),
            limit: limit
                .unwrap_or(names::DEFAULT_PAGE_SIZE)
                .clamp(1, names::MAX_PAGE_SIZE),
        }
    }

    fn offset(self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub pages: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentPage {
    pub assessments: Vec<Assessment>,
    pub pagination: Pagination,
}

// ---------------------------------------------------------------------------
// AssessmentService
// ---------------------------------------------------------------------------

pub struct AssessmentService<R: AssessmentRepository = Db> {
    repo: R,
}

impl<R: AssessmentRepository + Clone> Clone for AssessmentService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<R: AssessmentRepository> AssessmentService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn create(&self, ctx: &RequestContext, payload: NewAssessment) -> Result<CreateOutcome> {
        let NewAssessment {
            reading_level,
            category,
            mut questions,
            status,
        } = payload;

        if let Err(errors) = validate_questions(&questions) {
            return Ok(CreateOutcome::Invalid(errors));
        }

        if self
            .repo
            .find_by_combination(reading_level, category)
            .await?
            .is_some()
        {
            return Ok(CreateOutcome::Duplicate {
                reading_level,
                category,
            });
        }

        assign_question_ids(category, &mut questions);
        if let Err(errors) = validate_question_ids(category, &questions) {
            return Ok(CreateOutcome::Invalid(errors));
        }

        let now = Utc::now();
        let mut assessment = Assessment {
            id: Ulid::new().to_string(),
            reading_level,
            category,
            questions,
            status: AssessmentStatus::Active,
            is_active: true,
            created_by: Some(ctx.user_id.clone()),
            created_at: now,
            updated_at: now,
        };
        assessment.set_status(status.unwrap_or_default());

        // The unique index catches a concurrent create that slipped past the lookup.
        if !self.repo.insert(&assessment).await? {
            return Ok(CreateOutcome::Duplicate {
                reading_level,
                category,
            });
        }

        tracing::info!(
            user_id = %ctx.user_id,
            id = %assessment.id,
            questions = assessment.questions.len(),
            "assessment authored"
        );
        Ok(CreateOutcome::Created(assessment))
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        patch: AssessmentPatch,
    ) -> Result<UpdateOutcome> {
        let Some(mut assessment) = self.repo.find(id).await? else {
            return Ok(UpdateOutcome::NotFound);
        };

        let level_changed = patch
            .reading_level
            .is_some_and(|level| level != assessment.reading_level);
        let category_changed = patch
            .category
            .is_some_and(|category| category != assessment.category);
        if level_changed || category_changed {
            return Ok(UpdateOutcome::ImmutableFields);
        }

        if let Some(mut questions) = patch.questions {
            if let Err(errors) = validate_questions(&questions) {
                return Ok(UpdateOutcome::Invalid(errors));
            }
            // Ids always follow the stored category, never the payload.
            assign_question_ids(assessment.category, &mut questions);
            if let Err(errors) = validate_question_ids(assessment.category, &questions) {
                return Ok(UpdateOutcome::Invalid(errors));
            }
            assessment.questions = questions;
        }

        if let Some(status) = patch.status {
            assessment.set_status(status);
        }
        assessment.updated_at = Utc::now();

        if !self.repo.save(&assessment).await? {
            return Ok(UpdateOutcome::NotFound);
        }

        tracing::info!(user_id = %ctx.user_id, id, "assessment edited");
        Ok(UpdateOutcome::Updated(assessment))
    }

    pub async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<bool> {
        let deleted = self.repo.delete(id).await?;
        if deleted {
            tracing::info!(user_id = %ctx.user_id, id, "assessment removed");
        }
        Ok(deleted)
    }

    pub async fn set_status(
        &self,
        ctx: &RequestContext,
        id: &str,
        status: AssessmentStatus,
    ) -> Result<Option<Assessment>> {
        let updated = self.repo.set_status(id, status, Utc::now()).await?;
        if updated.is_some() {
            tracing::info!(user_id = %ctx.user_id, id, %status, "assessment status toggled");
        }
        Ok(updated)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Assessment>> {
        self.repo.find(id).await
    }

    pub async fn list(&self, filter: AssessmentFilter, page: PageRequest) -> Result<AssessmentPage> {
        let (assessments, total) = self
            .repo
            .list(filter, page.offset(), Some(i64::from(page.limit)))
            .await?;

        let limit = i64::from(page.limit);
        Ok(AssessmentPage {
            assessments,
            pagination: Pagination {
                total,
                page: page.page,
                limit: page.limit,
                pages: (total + limit - 1) / limit,
            },
        })
    }

    /// Active assessments only, as served to the student-facing app.
    pub async fn active(
        &self,
        reading_level: Option<ReadingLevel>,
        category: Option<Category>,
    ) -> Result<Vec<Assessment>> {
        let filter = AssessmentFilter {
            reading_level,
            category,
            status: Some(AssessmentStatus::Active),
        };
        let (assessments, _) = self.repo.list(filter, 0, None).await?;
        Ok(assessments)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::models::{ChoiceOption, ChoiceQuestion, Question, QuestionBody};

    fn teacher() -> RequestContext {
        RequestContext {
            user_id: "teacher-1".to_string(),
            email: "teacher@example.com".to_string(),
            roles: vec![Role::Teacher],
        }
    }

    fn vowel_question() -> Question {
        Question {
            question_id: String::new(),
            order: 0,
            body: QuestionBody::Patinig(ChoiceQuestion {
                question_text: "Which is the vowel?".to_string(),
                choice_options: vec![
                    ChoiceOption {
                        option_text: "a".to_string(),
                        is_correct: true,
                        ..Default::default()
                    },
                    ChoiceOption {
                        option_text: "b".to_string(),
                        is_correct: false,
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }),
        }
    }

    fn new_assessment(questions: Vec<Question>) -> NewAssessment {
        NewAssessment {
            reading_level: ReadingLevel::LowEmerging,
            category: Category::AlphabetKnowledge,
            questions,
            status: None,
        }
    }

    fn stored_assessment() -> Assessment {
        let now = Utc::now();
        let mut questions = vec![vowel_question()];
        assign_question_ids(Category::AlphabetKnowledge, &mut questions);
        Assessment {
            id: "01HZZZZZZZZZZZZZZZZZZZZZZZ".to_string(),
            reading_level: ReadingLevel::LowEmerging,
            category: Category::AlphabetKnowledge,
            questions,
            status: AssessmentStatus::Active,
            is_active: true,
            created_by: Some("teacher-1".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    fn repo_with(existing: Assessment) -> MockAssessmentRepository {
        let mut mock = MockAssessmentRepository::new();
        mock.expect_find().returning(move |_| {
            let existing = existing.clone();
            Box::pin(async move { Ok(Some(existing)) })
        });
        mock
    }

    // ----- create tests -----

    #[tokio::test]
    async fn create_assigns_ids_and_order() {
        let mut mock = MockAssessmentRepository::new();
        mock.expect_find_by_combination()
            .returning(|_, _| Box::pin(async { Ok(None) }));
        mock.expect_insert()
            .withf(|a| a.questions[0].question_id == "AK_001" && a.questions[0].order == 1)
            .returning(|_| Box::pin(async { Ok(true) }));

        let svc = AssessmentService::new(mock);
        let outcome = svc
            .create(&teacher(), new_assessment(vec![vowel_question()]))
            .await
            .unwrap();

        let CreateOutcome::Created(assessment) = outcome else {
            panic!("expected Created");
        };
        assert_eq!(assessment.questions[0].question_id, "AK_001");
        assert_eq!(assessment.questions[0].order, 1);
        assert_eq!(assessment.status, AssessmentStatus::Active);
        assert!(assessment.is_active);
        assert_eq!(assessment.created_by.as_deref(), Some("teacher-1"));
    }

    #[tokio::test]
    async fn create_with_draft_status_is_inactive() {
        let mut mock = MockAssessmentRepository::new();
        mock.expect_find_by_combination()
            .returning(|_, _| Box::pin(async { Ok(None) }));
        mock.expect_insert()
            .returning(|_| Box::pin(async { Ok(true) }));

        let mut payload = new_assessment(vec![vowel_question()]);
        payload.status = Some(AssessmentStatus::Draft);

        let svc = AssessmentService::new(mock);
        let outcome = svc.create(&teacher(), payload).await.unwrap();
        assert!(matches!(outcome, CreateOutcome::Created(ref a) if !a.is_active));
    }

    #[tokio::test]
    async fn create_without_questions_is_invalid() {
        let mock = MockAssessmentRepository::new();
        let svc = AssessmentService::new(mock);

        let outcome = svc.create(&teacher(), new_assessment(vec![])).await.unwrap();
        assert!(matches!(outcome, CreateOutcome::Invalid(_)));
    }

    #[tokio::test]
    async fn create_existing_combination_is_duplicate() {
        let existing = stored_assessment();
        let mut mock = MockAssessmentRepository::new();
        mock.expect_find_by_combination().returning(move |_, _| {
            let existing = existing.clone();
            Box::pin(async move { Ok(Some(existing)) })
        });

        let svc = AssessmentService::new(mock);
        let outcome = svc
            .create(&teacher(), new_assessment(vec![vowel_question()]))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            CreateOutcome::Duplicate {
                reading_level: ReadingLevel::LowEmerging,
                category: Category::AlphabetKnowledge,
            }
        ));
    }

    #[tokio::test]
    async fn create_losing_insert_race_is_duplicate() {
        let mut mock = MockAssessmentRepository::new();
        mock.expect_find_by_combination()
            .returning(|_, _| Box::pin(async { Ok(None) }));
        mock.expect_insert()
            .returning(|_| Box::pin(async { Ok(false) }));

        let svc = AssessmentService::new(mock);
        let outcome = svc
            .create(&teacher(), new_assessment(vec![vowel_question()]))
            .await
            .unwrap();
        assert!(matches!(outcome, CreateOutcome::Duplicate { .. }));
    }

    #[tokio::test]
    async fn create_storage_failure_is_error() {
        let mut mock = MockAssessmentRepository::new();
        mock.expect_find_by_combination()
            .returning(|_, _| Box::pin(async { Err(color_eyre::eyre::eyre!("disk full")) }));

        let svc = AssessmentService::new(mock);
        let res = svc
            .create(&teacher(), new_assessment(vec![vowel_question()]))
            .await;
        assert!(res.is_err());
    }

    // ----- update tests -----

    #[tokio::test]
    async fn update_missing_assessment_is_not_found() {
        let mut mock = MockAssessmentRepository::new();
        mock.expect_find().returning(|_| Box::pin(async { Ok(None) }));

        let svc = AssessmentService::new(mock);
        let outcome = svc
            .update(&teacher(), "missing", AssessmentPatch::default())
            .await
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::NotFound));
    }

    #[tokio::test]
    async fn update_changing_category_is_rejected() {
        let mock = repo_with(stored_assessment());
        let svc = AssessmentService::new(mock);

        let patch = AssessmentPatch {
            category: Some(Category::Decoding),
            ..Default::default()
        };
        let outcome = svc.update(&teacher(), "id", patch).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::ImmutableFields));
    }

    #[tokio::test]
    async fn update_repeating_same_category_is_allowed() {
        let mut mock = repo_with(stored_assessment());
        mock.expect_save().returning(|_| Box::pin(async { Ok(true) }));
        let svc = AssessmentService::new(mock);

        let patch = AssessmentPatch {
            reading_level: Some(ReadingLevel::LowEmerging),
            category: Some(Category::AlphabetKnowledge),
            ..Default::default()
        };
        let outcome = svc.update(&teacher(), "id", patch).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated(_)));
    }

    #[tokio::test]
    async fn update_reassigns_ids_from_stored_category() {
        let mut mock = repo_with(stored_assessment());
        mock.expect_save()
            .withf(|a| {
                a.questions.len() == 3
                    && a.questions.iter().enumerate().all(|(i, q)| {
                        q.order == i as u32 + 1 && q.question_id == format!("AK_{:03}", i + 1)
                    })
            })
            .returning(|_| Box::pin(async { Ok(true) }));
        let svc = AssessmentService::new(mock);

        let mut questions = vec![vowel_question(), vowel_question(), vowel_question()];
        questions[2].question_id = "DC_042".to_string();
        let patch = AssessmentPatch {
            questions: Some(questions),
            ..Default::default()
        };
        let outcome = svc.update(&teacher(), "id", patch).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated(_)));
    }

    #[tokio::test]
    async fn update_with_empty_questions_is_invalid() {
        let mock = repo_with(stored_assessment());
        let svc = AssessmentService::new(mock);

        let patch = AssessmentPatch {
            questions: Some(vec![]),
            ..Default::default()
        };
        let outcome = svc.update(&teacher(), "id", patch).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Invalid(_)));
    }

    #[tokio::test]
    async fn update_status_keeps_is_active_in_lockstep() {
        let mut mock = repo_with(stored_assessment());
        mock.expect_save()
            .withf(|a| a.status == AssessmentStatus::Inactive && !a.is_active)
            .returning(|_| Box::pin(async { Ok(true) }));
        let svc = AssessmentService::new(mock);

        let patch = AssessmentPatch {
            status: Some(AssessmentStatus::Inactive),
            ..Default::default()
        };
        let outcome = svc.update(&teacher(), "id", patch).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated(_)));
    }

    #[tokio::test]
    async fn update_racing_delete_is_not_found() {
        let mut mock = repo_with(stored_assessment());
        mock.expect_save().returning(|_| Box::pin(async { Ok(false) }));
        let svc = AssessmentService::new(mock);

        let outcome = svc
            .update(&teacher(), "id", AssessmentPatch::default())
            .await
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::NotFound));
    }

    // ----- status / delete / list tests -----

    #[tokio::test]
    async fn set_status_passes_through_repository() {
        let mut mock = MockAssessmentRepository::new();
        mock.expect_set_status()
            .withf(|id, status, _| id == "abc" && *status == AssessmentStatus::Draft)
            .returning(|_, status, _| {
                let mut a = stored_assessment();
                a.set_status(status);
                Box::pin(async move { Ok(Some(a)) })
            });

        let svc = AssessmentService::new(mock);
        let updated = svc
            .set_status(&teacher(), "abc", AssessmentStatus::Draft)
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.is_active);
    }

    #[tokio::test]
    async fn delete_reports_missing() {
        let mut mock = MockAssessmentRepository::new();
        mock.expect_delete()
            .returning(|_| Box::pin(async { Ok(false) }));

        let svc = AssessmentService::new(mock);
        assert!(!svc.delete(&teacher(), "missing").await.unwrap());
    }

    #[tokio::test]
    async fn list_computes_page_metadata() {
        let mut mock = MockAssessmentRepository::new();
        mock.expect_list()
            .withf(|_, offset, limit| *offset == 10 && *limit == Some(10))
            .returning(|_, _, _| Box::pin(async { Ok((vec![], 21)) }));

        let svc = AssessmentService::new(mock);
        let page = svc
            .list(AssessmentFilter::default(), PageRequest::new(Some(2), Some(10)))
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 21);
        assert_eq!(page.pagination.pages, 3);
        assert_eq!(page.pagination.page, 2);
    }

    #[tokio::test]
    async fn active_filters_on_active_status_without_paging() {
        let mut mock = MockAssessmentRepository::new();
        mock.expect_list()
            .withf(|filter, offset, limit| {
                filter.status == Some(AssessmentStatus::Active)
                    && filter.category == Some(Category::Decoding)
                    && *offset == 0
                    && limit.is_none()
            })
            .returning(|_, _, _| Box::pin(async { Ok((vec![], 0)) }));

        let svc = AssessmentService::new(mock);
        let active = svc.active(None, Some(Category::Decoding)).await.unwrap();
        assert!(active.is_empty());
    }

    #[test]
    fn page_request_clamps_values() {
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, limit: 1 });
        assert_eq!(
            PageRequest::new(None, Some(10_000)),
            PageRequest {
                page: 1,
                limit: names::MAX_PAGE_SIZE
            }
        );
        assert_eq!(PageRequest::default().limit, names::DEFAULT_PAGE_SIZE);
    }
}
