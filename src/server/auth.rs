//! Bearer token check for the API routes.

use crate::server::AppContext;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

/// Middleware requiring `Authorization: Bearer <api_token>` on protected
/// routes. A missing header is 401; a present but wrong token is 403.
pub async fn bearer_auth_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    match ctx.config.server.auth.api_token.as_deref() {
        Some(expected) if token == expected => Ok(next.run(request).await),
        _ => Err(StatusCode::FORBIDDEN),
    }
}

/// Generate a random API token
pub fn generate_token() -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    URL_SAFE_NO_PAD.encode(bytes)
}
