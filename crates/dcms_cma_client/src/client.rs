//! A thin, read-only JSON:API client over the CMA's `item-types`, `fields`,
//! and `site` endpoints.
//!
//! §C.3 resolves the "how does the schema generator read live models
//! without going through the opaque Node client" open question by making
//! this call directly over HTTP from Rust, the same way
//! [`dcms_hyperschema::HyperschemaLoader`] already fetches the hyperschema
//! document: a plain `reqwest::Client` GET, no retries, errors folded into
//! [`CmaError`].

use std::time::Duration;

use dcms_config::ClientConfig;
use url::Url;

use crate::error::{ApiError, ApiErrorDetail, CmaError, RequestInfo, ResponseInfo};
use crate::model::{self, Field, ItemType, ItemTypeWithFields, Site};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct CmaClient {
    http: reqwest::Client,
    base_url: Url,
    api_token: String,
    environment: Option<String>,
}

impl CmaClient {
    /// Builds a client from a resolved bearer token and the rest of
    /// [`ClientConfig`]. Callers resolve `config.api_token` (it may embed a
    /// `${env:...}` secret) before constructing this.
    pub fn new(config: &ClientConfig, api_token: String) -> Self {
        Self {
            http: reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build().expect("static client config"),
            base_url: config.base_url.clone(),
            api_token,
            environment: config.environment.clone(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.base_url.join(path).expect("path is a valid relative URL");
        let mut builder = self
            .http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Accept", "application/json")
            .header("X-Api-Version", "3");
        if let Some(environment) = &self.environment {
            builder = builder.header("X-Environment", environment);
        }
        builder
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, CmaError> {
        let url = self.base_url.join(path).expect("path is a valid relative URL");
        let response = self.request(reqwest::Method::GET, path).send().await.map_err(|source| {
            if source.is_timeout() {
                CmaError::Timeout { url: url.clone() }
            } else {
                CmaError::Transport { url: url.clone(), source }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let errors: Vec<ApiErrorDetail> = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("errors").cloned())
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default();
            return Err(CmaError::Api(ApiError {
                request: RequestInfo { method: "GET".to_string(), url: url.clone() },
                response: ResponseInfo { status: status.as_u16(), body },
                errors,
            }));
        }

        response.json().await.map_err(|source| CmaError::InvalidJson { url, source })
    }

    /// Fetches every item type (model and block model) in the project,
    /// each paired with its own fields in declaration order.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, or a non-2xx CMA
    /// response.
    pub async fn get_item_types_with_fields(&self) -> Result<Vec<ItemTypeWithFields>, CmaError> {
        let item_types_doc = self.get_json("item-types").await?;
        let item_types: Vec<ItemType> = item_types_doc
            .get("data")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(model::parse_item_type).collect())
            .unwrap_or_default();

        let fields_doc = self.get_json("fields").await?;
        let mut fields: Vec<Field> = fields_doc
            .get("data")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(model::parse_field).collect())
            .unwrap_or_default();

        Ok(item_types
            .into_iter()
            .map(|item_type| {
                let (mine, rest): (Vec<Field>, Vec<Field>) =
                    fields.drain(..).partition(|f| f.item_type_id == item_type.id);
                fields = rest;
                let mut mine = mine;
                mine.sort_by_key(|f| item_type.field_ids.iter().position(|id| *id == f.id).unwrap_or(usize::MAX));
                ItemTypeWithFields { item_type, fields: mine }
            })
            .collect())
    }

    /// Fetches the project's `site` singleton (only locales are modeled).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, or a non-2xx CMA
    /// response.
    pub async fn get_site(&self) -> Result<Site, CmaError> {
        let doc = self.get_json("site").await?;
        let attrs = doc.get("data").and_then(|d| d.get("attributes")).cloned().unwrap_or_default();
        let locales = attrs
            .get("locales")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        Ok(Site { locales })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_sets_bearer_and_version_headers() {
        let config = ClientConfig {
            api_token: None,
            environment: Some("sandbox".to_string()),
            base_url: Url::parse("https://site-api.datocms.com/").unwrap(),
        };
        let client = CmaClient::new(&config, "tok123".to_string());
        let req = client.request(reqwest::Method::GET, "item-types").build().unwrap();
        assert_eq!(req.headers().get("Authorization").unwrap(), "Bearer tok123");
        assert_eq!(req.headers().get("X-Environment").unwrap(), "sandbox");
        assert_eq!(req.url().as_str(), "https://site-api.datocms.com/item-types");
    }
}
