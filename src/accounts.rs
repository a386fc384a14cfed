//! Account and credential collaborator.
//!
//! Accounts live in the remote store's admin API; this module wraps its
//! three endpoints and the two flows built on them. Registration is an
//! explicit two-step pipeline (create account, then issue token) so a token
//! failure after the account exists stays distinguishable from total
//! failure. Login matches a submitted seed against the fetched account list
//! as an opaque hashed-secret comparison.

use crate::config::StoreConfig;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Connection timeout for store API requests
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// bcrypt cost for hashing account seeds
const SEED_HASH_COST: u32 = 10;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("account service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to hash seed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("account {account_id} was created but token issuance failed: {source}")]
    PartialRegistration {
        account_id: u64,
        #[source]
        source: Box<AccountError>,
    },

    #[error("no account matches the supplied seed")]
    CredentialMismatch,
}

/// One entry of the store's full account listing. The store keeps the
/// hashed seed in its contact field; it is treated as an opaque secret here.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRecord {
    pub id: u64,
    #[serde(rename = "email")]
    pub hashed_seed: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountsEnvelope {
    accounts: Vec<AccountRecord>,
}

#[derive(Debug, Deserialize)]
struct CreatedAccount {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    token: String,
}

/// A token issued for an account, from either flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub account_id: u64,
    pub token: String,
}

/// Thin client for the store's admin account endpoints.
pub struct AccountClient {
    client: Client,
    base_url: String,
    admin_token: String,
}

impl AccountClient {
    pub fn new(config: &StoreConfig) -> Self {
        let client = Client::builder()
            .timeout(CONNECTION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            admin_token: config.admin_token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/admin/accounts{}", self.base_url, path)
    }

    pub async fn create_account(&self, hashed_seed: &str) -> Result<u64, AccountError> {
        let response = self
            .client
            .post(self.url(""))
            .query(&[("email", hashed_seed)])
            .header(AUTHORIZATION, format!("Bearer {}", self.admin_token))
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let created: CreatedAccount = Self::check(response).await?.json().await?;
        Ok(created.id)
    }

    pub async fn issue_token(&self, account_id: u64) -> Result<String, AccountError> {
        let response = self
            .client
            .post(self.url("/new_auth_token"))
            .query(&[("id", account_id)])
            .header(AUTHORIZATION, format!("Bearer {}", self.admin_token))
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let grant: TokenGrant = Self::check(response).await?.json().await?;
        Ok(grant.token)
    }

    pub async fn list_accounts(&self) -> Result<Vec<AccountRecord>, AccountError> {
        let response = self
            .client
            .get(self.url("/full"))
            .header(AUTHORIZATION, format!("Bearer {}", self.admin_token))
            .send()
            .await?;

        let envelope: AccountsEnvelope = Self::check(response).await?.json().await?;
        Ok(envelope.accounts)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, AccountError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AccountError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

/// Registration and login flows over the account client.
pub struct AccountRegistry {
    client: AccountClient,
}

impl AccountRegistry {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            client: AccountClient::new(config),
        }
    }

    /// Hash the seed, create the account, then issue a token for it.
    pub async fn register(&self, seed: &str) -> Result<IssuedToken, AccountError> {
        let hashed = bcrypt::hash(seed, SEED_HASH_COST)?;
        let account_id = self.client.create_account(&hashed).await?;

        // The account now exists; failures past this point need a defined
        // recovery path and must not look like total failure.
        let token = self
            .client
            .issue_token(account_id)
            .await
            .map_err(|e| AccountError::PartialRegistration {
                account_id,
                source: Box::new(e),
            })?;

        tracing::info!(account_id, "registered new account");
        Ok(IssuedToken { account_id, token })
    }

    /// Match the seed against the full account list, O(accounts) with
    /// short-circuit on the first hash match, then issue a token.
    pub async fn login(&self, seed: &str) -> Result<IssuedToken, AccountError> {
        let accounts = self.client.list_accounts().await?;

        let matched = accounts
            .iter()
            .find(|account| {
                account
                    .hashed_seed
                    .as_deref()
                    .filter(|hash| !hash.is_empty())
                    .map(|hash| bcrypt::verify(seed, hash).unwrap_or(false))
                    .unwrap_or(false)
            })
            .ok_or(AccountError::CredentialMismatch)?;

        let token = self.client.issue_token(matched.id).await?;
        tracing::debug!(account_id = matched.id, "login succeeded");
        Ok(IssuedToken {
            account_id: matched.id,
            token,
        })
    }
}
