use std::io::{self, Read};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::pager::Page;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("authentication failed for {path}")]
    Unauthorized { path: String },
    #[error("request failed with status {status}: {path}")]
    RequestFailed { status: u16, path: String },
    #[error("{url} is larger than {limit} bytes")]
    SizeExceeded { limit: u64, url: String },
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

/// Anything that can hand back one page of a paged resource.
pub trait PageSource {
    fn fetch_page(&self, path: &str) -> Result<Page, ApiError>;
}

pub struct ApiClient {
    base_url: Url,
    token: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: String) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            token,
            http: Client::new(),
        })
    }

    /// Accepts either an absolute URL (as found in `links.next`) or a path
    /// relative to the API root.
    pub fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.resolve(path)?;
        tracing::debug!(%url, "GET");
        let response = self.http.get(url).bearer_auth(&self.token).send()?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized {
                path: path.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::RequestFailed {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        let body = response.bytes()?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Streams `url` into memory, giving up once more than `limit` bytes
    /// are announced or received.
    pub fn download(&self, url: &str, limit: u64) -> Result<Vec<u8>, ApiError> {
        let response = self.http.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::RequestFailed {
                status: status.as_u16(),
                path: url.to_string(),
            });
        }
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(ApiError::SizeExceeded {
                limit,
                url: url.to_string(),
            });
        }

        let mut bytes = Vec::new();
        response.take(limit + 1).read_to_end(&mut bytes)?;
        if bytes.len() as u64 > limit {
            return Err(ApiError::SizeExceeded {
                limit,
                url: url.to_string(),
            });
        }
        Ok(bytes)
    }
}

impl PageSource for ApiClient {
    fn fetch_page(&self, path: &str) -> Result<Page, ApiError> {
        self.get_json(path)
    }
}
