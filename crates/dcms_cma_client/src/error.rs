//! `ApiError`/`TimeoutError`: errors surface as
//! `ApiError` (with `request`, `response`, `errors[]`, `findError()`) and
//! `TimeoutError`."

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum CmaError {
    #[error("request to {url} timed out")]
    Timeout { url: Url },
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("response from {url} was not valid JSON: {source}")]
    InvalidJson {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
}

/// One JSON:API error object from a non-2xx CMA response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: String,
    pub url: Url,
}

#[derive(Debug, Clone)]
pub struct ResponseInfo {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
#[error("CMA request {} {} returned {}: {}", request.method, request.url, response.status, response.body)]
pub struct ApiError {
    pub request: RequestInfo,
    pub response: ResponseInfo,
    pub errors: Vec<ApiErrorDetail>,
}

impl ApiError {
    /// Returns the first error object whose `code` matches, if any.
    pub fn find_error(&self, code: &str) -> Option<&ApiErrorDetail> {
        self.errors.iter().find(|e| e.code.as_deref() == Some(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_error_matches_by_code() {
        let err = ApiError {
            request: RequestInfo { method: "GET".into(), url: Url::parse("https://x/y").unwrap() },
            response: ResponseInfo { status: 404, body: "{}".into() },
            errors: vec![ApiErrorDetail {
                id: None,
                status: Some("404".into()),
                code: Some("NOT_FOUND".into()),
                title: Some("Not found".into()),
                detail: None,
            }],
        };
        assert!(err.find_error("NOT_FOUND").is_some());
        assert!(err.find_error("OTHER").is_none());
    }
}
