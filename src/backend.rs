//! Thin client for the external StudioConnect backend API.
//!
//! Calls carry the stored credential as a bearer token when the caller has
//! one. Responses are normalized into [`ApiError`], with 401 kept as its own
//! variant because the auth state reacts to it specifically. No retries; a
//! failed call surfaces immediately.

use anyhow::Context;
use reqwest::{Client, Response, Url};
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend no longer accepts the credential (HTTP 401).
    #[error("backend rejected the credential")]
    Unauthorized,
    #[error("backend denied the operation")]
    Forbidden,
    #[error("backend has no such resource")]
    NotFound,
    #[error("backend returned HTTP {0}")]
    Status(u16),
    #[error("invalid backend path {0:?}")]
    BadPath(String),
    #[error("backend call failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct BackendClient {
    base: Url,
    client: Client,
}

impl BackendClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("invalid backend URL '{base_url}'"))?;
        let client = Client::builder().build().context("build backend http client")?;
        Ok(BackendClient { base, client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub async fn get_json(&self, path: &str, bearer: Option<&str>) -> Result<Value, ApiError> {
        let mut req = self.client.get(self.url(path)?);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        Self::read_json(req.send().await?).await
    }

    pub async fn post_json(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &Value,
    ) -> Result<Value, ApiError> {
        let mut req = self.client.post(self.url(path)?).json(body);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        Self::read_json(req.send().await?).await
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(|_| ApiError::BadPath(path.to_string()))
    }

    async fn read_json(resp: Response) -> Result<Value, ApiError> {
        match resp.status().as_u16() {
            200..=299 => Ok(resp.json().await?),
            401 => Err(ApiError::Unauthorized),
            403 => Err(ApiError::Forbidden),
            404 => Err(ApiError::NotFound),
            status => Err(ApiError::Status(status)),
        }
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => AppError::auth("session_expired", "the session is no longer valid"),
            ApiError::Forbidden => AppError::forbidden("forbidden", "the backend denied the operation"),
            ApiError::NotFound => AppError::not_found("not_found", "no such resource"),
            other => AppError::upstream("backend_error".to_string(), other.to_string()),
        }
    }
}
