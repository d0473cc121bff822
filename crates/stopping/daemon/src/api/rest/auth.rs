//! Instance token authentication
//!
//! Manual control calls carry the caller instance's own auth token as a
//! bearer token. The matching record is attached to the request for the
//! handlers.

use super::state::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use stopping_types::{AuthToken, InstanceRecord};

/// The record of the instance whose token authenticated the request
#[derive(Debug, Clone)]
pub struct AuthenticatedInstance(pub InstanceRecord);

fn bearer_token(request: &Request) -> Option<AuthToken> {
    let value = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| AuthToken::new(token))
}

/// Reject requests without a token that belongs to a known instance
pub async fn require_instance_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

    let record = state
        .store
        .get_by_auth_token(&token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("unknown instance token".into()))?;

    tracing::debug!(
        client_id = %record.client_id,
        instance_id = %record.instance_id,
        "Authenticated manual control call"
    );

    request.extensions_mut().insert(AuthenticatedInstance(record));
    Ok(next.run(request).await)
}
