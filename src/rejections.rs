use axum::{
    body::Body,
    extract::{rejection::JsonRejection, rejection::PathRejection, rejection::QueryRejection, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{validation::ValidationErrors, AppState};

/// Uniform response envelope: `{success, data?, message?, error?}`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            error: None,
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Conflict(String),
    NotFound(&'static str),
    Unauthorized,
    Forbidden,
    /// Storage or other unexpected failure. `detail` is only sent outside production.
    Internal {
        message: &'static str,
        detail: String,
    },
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Validation(m) | AppError::Conflict(m) => m.clone(),
            AppError::NotFound(m) => (*m).to_owned(),
            AppError::Unauthorized => "Authentication required".to_owned(),
            AppError::Forbidden => "You do not have permission to perform this action".to_owned(),
            AppError::Internal { message, .. } => (*message).to_owned(),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(format!("Validation failed: {errors}"))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Error detail stashed on the response for [`error_details`] to expose.
#[derive(Clone)]
struct ErrorDetail {
    message: String,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        let body = Envelope::<()> {
            success: false,
            data: None,
            message: Some(message.clone()),
            error: None,
        };

        let mut response = (status, Json(body)).into_response();
        if let AppError::Internal { detail, .. } = self {
            response
                .extensions_mut()
                .insert(ErrorDetail { message, detail });
        }
        response
    }
}

/// Adds the `error` detail field to failed responses when the server is not
/// running in production mode.
pub async fn error_details(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    let Some(ErrorDetail { message, detail }) = response.extensions_mut().remove::<ErrorDetail>()
    else {
        return response;
    };
    if state.production {
        return response;
    }

    let body = Envelope::<()> {
        success: false,
        data: None,
        message: Some(message),
        error: Some(detail),
    };
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    match serde_json::to_vec(&body) {
        Ok(bytes) => Response::from_parts(parts, Body::from(bytes)),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub trait ResultExt<T> {
    /// Maps a storage error to a 500, logging it with `message` as context.
    fn reject(self, message: &'static str) -> Result<T, AppError>;
}

impl<T> ResultExt<T> for color_eyre::Result<T> {
    fn reject(self, message: &'static str) -> Result<T, AppError> {
        self.map_err(|e| {
            tracing::error!("{message}: {e:?}");
            AppError::Internal {
                message,
                detail: format!("{e:#}"),
            }
        })
    }
}
