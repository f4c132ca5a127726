// Credential check for /api routes

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use subtle::ConstantTimeEq;

use super::{AgentState, USER_HEADER, http::ApiError};

/// Compares in time independent of where the first mismatch is.
fn secret_matches(given: Option<&str>, expected: &str) -> bool {
    given.is_some_and(|g| bool::from(g.as_bytes().ct_eq(expected.as_bytes())))
}

pub(super) async fn require_credentials(
    State(state): State<AgentState>,
    request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let user = headers.get(USER_HEADER).and_then(|v| v.to_str().ok());
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    // Both checks always run.
    let user_ok = secret_matches(user, &state.credentials.username);
    let token_ok = secret_matches(token, &state.credentials.password);
    let authorized = user_ok & token_ok;

    if !authorized {
        tracing::warn!(
            user = user.unwrap_or("<none>"),
            path = %request.uri().path(),
            "rejected request with bad credentials"
        );
        return ApiError::Unauthorized.into_response();
    }
    next.run(request).await
}
