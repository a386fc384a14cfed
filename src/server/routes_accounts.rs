//! The /register and /login routes over the account collaborator.

use crate::accounts::{AccountError, AccountRegistry};
use crate::server::AppContext;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct SeedRequest {
    pub seed: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub account_id: u64,
    pub token: String,
}

pub async fn register(
    State(ctx): State<AppContext>,
    Json(payload): Json<SeedRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), (StatusCode, String)> {
    let accounts = require_accounts(&ctx)?;

    let issued = accounts
        .register(&payload.seed)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            account_id: issued.account_id,
            token: issued.token,
        }),
    ))
}

pub async fn login(
    State(ctx): State<AppContext>,
    Json(payload): Json<SeedRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), (StatusCode, String)> {
    let accounts = require_accounts(&ctx)?;

    let issued = accounts.login(&payload.seed).await.map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            account_id: issued.account_id,
            token: issued.token,
        }),
    ))
}

fn require_accounts(ctx: &AppContext) -> Result<Arc<AccountRegistry>, (StatusCode, String)> {
    ctx.accounts.clone().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "Account service not configured".to_string(),
    ))
}

fn error_response(error: AccountError) -> (StatusCode, String) {
    let status = match &error {
        AccountError::CredentialMismatch => StatusCode::UNAUTHORIZED,
        AccountError::Transport(_) | AccountError::Api { .. } => StatusCode::BAD_GATEWAY,
        AccountError::Hash(_) | AccountError::PartialRegistration { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, error.to_string())
}
