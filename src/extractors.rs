use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::{
    auth::{RequestContext, Role},
    rejections::AppError,
    AppState,
};

/// Guard extractor that verifies the bearer token on the request.
/// Carries the caller's context for use in handlers.
pub struct AuthGuard(pub RequestContext);

impl AuthGuard {
    /// Rejects callers holding none of `allowed`.
    pub fn require(&self, allowed: &[Role]) -> Result<&RequestContext, AppError> {
        if self.0.has_any_role(allowed) {
            Ok(&self.0)
        } else {
            tracing::warn!(user_id = %self.0.user_id, roles = ?self.0.roles, "role check failed");
            Err(AppError::Forbidden)
        }
    }
}

impl FromRequestParts<AppState> for AuthGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let ctx = state.jwt.verify(token).map_err(|e| {
            tracing::debug!("rejected bearer token: {e}");
            AppError::Unauthorized
        })?;

        if ctx.roles.is_empty() {
            return Err(AppError::Forbidden);
        }

        Ok(AuthGuard(ctx))
    }
}
