//! Central Auth (global account) lookups against the MediaWiki API.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::CentralAuthConfig;
use crate::identity::{BOT_AUTHOR, BOT_NAME, BOT_VERSION};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected API response: {0}")]
    BadResponse(String),
}

/// A global account as reported by `meta=globaluserinfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GlobalAccount {
    #[serde(default)]
    pub name: String,
    /// Home wiki database name, e.g. `enwiki`.
    pub home: Option<String>,
    pub registration: Option<String>,
    #[serde(rename = "editcount")]
    pub edit_count: Option<u64>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub locked: bool,
}

impl GlobalAccount {
    pub fn profile_url(&self) -> String {
        format!(
            "https://meta.wikimedia.org/wiki/Special:CentralAuth/{}",
            self.name.replace(' ', "_")
        )
    }
}

impl fmt::Display for GlobalAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        if let Some(ref home) = self.home {
            write!(f, " home {home},")?;
        }
        if let Some(ref registration) = self.registration {
            write!(f, " registered {registration},")?;
        }
        if let Some(edits) = self.edit_count {
            write!(f, " {edits} edits,")?;
        }
        if self.groups.is_empty() {
            f.write_str(" no global groups")?;
        } else {
            write!(f, " global groups: {}", self.groups.join(", "))?;
        }
        if self.locked {
            f.write_str(" [LOCKED]")?;
        }
        write!(f, " {}", self.profile_url())
    }
}

/// Resolves a global account by name. `Ok(None)` means no such account.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    async fn lookup(&self, account: &str) -> Result<Option<GlobalAccount>, LookupError>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    query: Option<Query>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Query {
    globaluserinfo: GlobalUserInfo,
}

#[derive(Debug, Deserialize)]
struct GlobalUserInfo {
    #[serde(default)]
    missing: bool,
    #[serde(flatten)]
    account: GlobalAccount,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    info: String,
}

/// Interpret a decoded `formatversion=2` `globaluserinfo` response.
fn account_from(response: ApiResponse) -> Result<Option<GlobalAccount>, LookupError> {
    if let Some(error) = response.error {
        return Err(LookupError::BadResponse(format!("{}: {}", error.code, error.info)));
    }
    let info = response
        .query
        .ok_or_else(|| LookupError::BadResponse("missing query".to_string()))?
        .globaluserinfo;
    Ok((!info.missing).then_some(info.account))
}

/// [`AccountLookup`] over HTTP.
#[derive(Debug, Clone)]
pub struct CentralAuthClient {
    http: reqwest::Client,
    api_url: String,
}

impl CentralAuthClient {
    pub fn new(config: &CentralAuthConfig) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("{BOT_NAME}/{BOT_VERSION} (by {BOT_AUTHOR})"))
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl AccountLookup for CentralAuthClient {
    async fn lookup(&self, account: &str) -> Result<Option<GlobalAccount>, LookupError> {
        debug!(account = %account, "central auth lookup");
        let response: ApiResponse = self
            .http
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("meta", "globaluserinfo"),
                ("guiuser", account),
                ("guiprop", "groups|editcount"),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        account_from(response)
    }
}
