//! Loads the CMA client's shipped `resources.json` and flattens it into a
//! lookup keyed by JSON:API type, namespace, and endpoint rel.
//!
//! The installed `@datocms/cma-client-node` package ships a `resources.json`
//! describing every resource/endpoint it exposes; this is the ground truth
//! for which methods exist, independent of the TypeScript declarations the
//! type program introspects. The on-disk shape is `{entity, endpoints[]}[]`
//! — this loader flattens each entity's endpoints so every [`Endpoint`]
//! carries its own copy of the parent entity's identity, which is what the
//! `resource_action*` tools key off of.

use std::collections::HashMap;
use std::sync::Arc;

use camino::Utf8PathBuf;
use dcms_memoizer::Memoizer;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, thiserror::Error, Clone)]
pub enum ResourceSchemaError {
    #[error("failed to read resource manifest {path}: {message}")]
    Read { path: Utf8PathBuf, message: String },
    #[error("failed to parse resource manifest {path}: {message}")]
    Parse { path: Utf8PathBuf, message: String },
}

/// An entity (resource) in the manifest, e.g. `items`, `upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityManifest {
    #[serde(rename = "jsonApiType")]
    pub json_api_type: String,
    pub namespace: String,
    #[serde(rename = "resourceClassName")]
    pub resource_class_name: String,
    #[serde(default)]
    pub endpoints: Vec<RawEndpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEndpoint {
    pub rel: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "rawName")]
    pub raw_name: String,
    pub method: String,
    #[serde(rename = "urlTemplate")]
    pub url_template: String,
    #[serde(default, rename = "urlPlaceholders")]
    pub url_placeholders: Vec<String>,
    #[serde(default, rename = "requestBodyType")]
    pub request_body_type: Option<String>,
    #[serde(default, rename = "requestQueryType")]
    pub request_query_type: Option<String>,
    #[serde(default, rename = "responseType")]
    pub response_type: Option<String>,
    #[serde(default, rename = "paginatedResponse")]
    pub paginated_response: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, rename = "docUrl")]
    pub doc_url: Option<Url>,
}

/// A flattened endpoint, carrying its parent entity's identity alongside
/// its own fields.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub json_api_type: String,
    pub namespace: String,
    pub resource_class_name: String,
    pub rel: String,
    pub name: Option<String>,
    pub raw_name: String,
    pub method: String,
    pub url_template: String,
    pub url_placeholders: Vec<String>,
    pub request_body_type: Option<String>,
    pub request_query_type: Option<String>,
    pub response_type: Option<String>,
    pub paginated_response: bool,
    pub deprecated: bool,
    pub doc_url: Option<Url>,
}

/// Flattened, indexed view of the resource manifest.
#[derive(Debug, Default)]
pub struct ResourceSchema {
    entities: Vec<EntityManifest>,
    endpoints: Vec<Endpoint>,
    by_json_api_type: HashMap<String, Vec<usize>>,
    by_namespace: HashMap<String, Vec<usize>>,
}

impl ResourceSchema {
    fn build(entities: Vec<EntityManifest>) -> Self {
        let mut endpoints = Vec::new();
        let mut by_json_api_type: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_namespace: HashMap<String, Vec<usize>> = HashMap::new();

        for entity in &entities {
            for raw in &entity.endpoints {
                let idx = endpoints.len();
                endpoints.push(Endpoint {
                    json_api_type: entity.json_api_type.clone(),
                    namespace: entity.namespace.clone(),
                    resource_class_name: entity.resource_class_name.clone(),
                    rel: raw.rel.clone(),
                    name: raw.name.clone(),
                    raw_name: raw.raw_name.clone(),
                    method: raw.method.clone(),
                    url_template: raw.url_template.clone(),
                    url_placeholders: raw.url_placeholders.clone(),
                    request_body_type: raw.request_body_type.clone(),
                    request_query_type: raw.request_query_type.clone(),
                    response_type: raw.response_type.clone(),
                    paginated_response: raw.paginated_response,
                    deprecated: raw.deprecated,
                    doc_url: raw.doc_url.clone(),
                });
                by_json_api_type.entry(entity.json_api_type.clone()).or_default().push(idx);
                by_namespace.entry(entity.namespace.clone()).or_default().push(idx);
            }
        }

        Self { entities, endpoints, by_json_api_type, by_namespace }
    }

    pub fn find_by_json_api_type(&self, json_api_type: &str) -> Vec<&Endpoint> {
        self.by_json_api_type
            .get(json_api_type)
            .into_iter()
            .flatten()
            .map(|&i| &self.endpoints[i])
            .collect()
    }

    pub fn find_by_namespace(&self, namespace: &str) -> Vec<&Endpoint> {
        self.by_namespace
            .get(namespace)
            .into_iter()
            .flatten()
            .map(|&i| &self.endpoints[i])
            .collect()
    }

    pub fn find_endpoint_by_rel(&self, json_api_type: &str, rel: &str) -> Option<&Endpoint> {
        self.find_by_json_api_type(json_api_type).into_iter().find(|e| e.rel == rel)
    }

    pub fn entities(&self) -> &[EntityManifest] {
        &self.entities
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }
}

fn parse_manifest(path: &Utf8PathBuf, raw: &str) -> Result<ResourceSchema, ResourceSchemaError> {
    let entities: Vec<EntityManifest> = serde_json::from_str(raw).map_err(|e| ResourceSchemaError::Parse {
        path: path.clone(),
        message: e.to_string(),
    })?;
    Ok(ResourceSchema::build(entities))
}

/// Memoized loader for a single `resources.json` path.
pub struct ResourceSchemaLoader {
    path: Utf8PathBuf,
    memo: Memoizer<Arc<ResourceSchema>, ResourceSchemaError>,
}

impl ResourceSchemaLoader {
    pub fn new(path: Utf8PathBuf) -> Self {
        let load_path = path.clone();
        Self {
            path,
            memo: Memoizer::new_sync(move || {
                let raw = std::fs::read_to_string(&load_path).map_err(|e| ResourceSchemaError::Read {
                    path: load_path.clone(),
                    message: e.to_string(),
                })?;
                parse_manifest(&load_path, &raw).map(Arc::new)
            }),
        }
    }

    /// Returns the cached, flattened manifest, reading and parsing it from
    /// disk on first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse as the
    /// expected `{entity, endpoints[]}[]` shape.
    pub async fn get(&self) -> Result<Arc<ResourceSchema>, ResourceSchemaError> {
        self.memo.get().await.cloned()
    }

    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"[
            {
                "jsonApiType": "item",
                "namespace": "items",
                "resourceClassName": "Item",
                "endpoints": [
                    {
                        "rel": "instances",
                        "name": "list",
                        "rawName": "rawList",
                        "method": "GET",
                        "urlTemplate": "/items",
                        "urlPlaceholders": [],
                        "paginatedResponse": true,
                        "deprecated": false
                    },
                    {
                        "rel": "self",
                        "rawName": "rawFind",
                        "method": "GET",
                        "urlTemplate": "/items/{(%2Fitem%2Fdefinitions%2Fid)}",
                        "urlPlaceholders": ["itemId"],
                        "paginatedResponse": false,
                        "deprecated": false
                    }
                ]
            }
        ]"#
    }

    #[test]
    fn flattens_entities_into_endpoints_with_inherited_identity() {
        let schema = parse_manifest(&Utf8PathBuf::from("resources.json"), sample_json()).unwrap();
        assert_eq!(schema.endpoint_count(), 2);
        let endpoints = schema.find_by_json_api_type("item");
        assert_eq!(endpoints.len(), 2);
        assert!(endpoints.iter().all(|e| e.namespace == "items"));
    }

    #[test]
    fn find_by_namespace_matches_all_entity_endpoints() {
        let schema = parse_manifest(&Utf8PathBuf::from("resources.json"), sample_json()).unwrap();
        assert_eq!(schema.find_by_namespace("items").len(), 2);
        assert!(schema.find_by_namespace("uploads").is_empty());
    }

    #[test]
    fn find_endpoint_by_rel_is_none_on_miss() {
        let schema = parse_manifest(&Utf8PathBuf::from("resources.json"), sample_json()).unwrap();
        let instances = schema.find_endpoint_by_rel("item", "instances").unwrap();
        assert_eq!(instances.raw_name, "rawList");
        assert!(schema.find_endpoint_by_rel("item", "destroy").is_none());
    }

    #[tokio::test]
    async fn loader_reads_and_memoizes_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resources.json");
        std::fs::write(&path, sample_json()).unwrap();
        let loader = ResourceSchemaLoader::new(
            Utf8PathBuf::from_path_buf(path).unwrap(),
        );
        let schema = loader.get().await.unwrap();
        assert_eq!(schema.endpoint_count(), 2);
    }
}
