use crate::auth::jwt::JwtValidator;
use crate::auth::models::OwnerContext;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tubely_core::AppError;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from an `Authorization: Bearer <token>` header value.
fn bearer_token(header: Option<&str>) -> Result<&str, AppError> {
    header
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Couldn't find JWT".to_string()))
}

/// Resolve the caller from the bearer token and attach an `OwnerContext`.
pub async fn auth_middleware(
    State(validator): State<Arc<JwtValidator>>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match bearer_token(header) {
        Ok(token) => token,
        Err(e) => return HttpAppError(e).into_response(),
    };

    let user_id = match validator.validate_token(token) {
        Ok(user_id) => user_id,
        Err(e) => return HttpAppError(e).into_response(),
    };

    tracing::debug!(user_id = %user_id, "Request authenticated");
    request.extensions_mut().insert(OwnerContext { user_id });
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert!(bearer_token(None).is_err());
        assert!(bearer_token(Some("Basic dXNlcjpwYXNz")).is_err());
        assert!(bearer_token(Some("Bearer ")).is_err());
    }
}
