use crate::error::HttpAppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use tubely_core::AppError;
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub iss: String,
    pub sub: Uuid, // user_id
    pub iat: i64,  // issued at timestamp
    pub exp: i64,  // expiration timestamp
}

/// Authenticated caller, inserted into request extensions by the auth middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerContext {
    pub user_id: Uuid,
}

// Implement FromRequestParts so the context can be extracted alongside Multipart,
// which must be the last extractor and rules out `Extension`
impl<S> FromRequestParts<S> for OwnerContext
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OwnerContext>()
            .copied()
            .ok_or_else(|| HttpAppError(AppError::Unauthorized("Couldn't find JWT".to_string())))
    }
}
