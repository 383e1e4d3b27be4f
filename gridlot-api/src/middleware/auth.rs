use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Acting operator, taken from the x-operator-actor header when present.
/// Lands in request extensions for audit attribution.
#[derive(Debug, Clone)]
pub struct OperatorActor(pub String);

/// Shared-secret gate for the /v1/admin channel. Every operator mutation
/// and read passes through here.
pub async fn operator_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Extract token from Authorization header
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 2. Compare against the configured shared secret
    if state.operator_token.is_empty() || token != state.operator_token {
        return Err(StatusCode::UNAUTHORIZED);
    }

    // 3. Record who is acting for the audit trail
    let actor = req
        .headers()
        .get("x-operator-actor")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("operator")
        .to_string();
    req.extensions_mut().insert(OperatorActor(actor));

    Ok(next.run(req).await)
}
