//! Fetches the DatoCMS REST hyperschema and dereferences it into a plain
//! tree keyed by JSON:API type.
//!
//! The upstream document is JSON Hyper-Schema: entity descriptions and
//! links point at shared definitions via `$ref`. Everything downstream
//! (markdown rendering, action binding) wants the fully inlined tree, so
//! dereferencing happens once, here, and the result is memoized for the
//! life of the process via [`dcms_memoizer::Memoizer`].

use std::collections::HashMap;
use std::sync::Arc;

use dcms_memoizer::Memoizer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

#[derive(Debug, thiserror::Error, Clone)]
pub enum HyperschemaError {
    #[error("failed to fetch hyperschema from {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("hyperschema response was not valid JSON: {0}")]
    InvalidJson(String),
    #[error("hyperschema document did not match the expected shape: {0}")]
    Shape(String),
}

/// A single JSON:API resource entity in the hyperschema.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Entity {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// One link (action) on an entity, e.g. `instances`, `self`, `create`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Link {
    pub rel: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub method: String,
    /// Matched against a client method's `actionUrl` (the `Read more:` URL
    /// parsed out of its JSDoc) to bind signatures back to this link.
    #[serde(default, rename = "docUrl", skip_serializing_if = "Option::is_none")]
    pub doc_url: Option<Url>,
    #[serde(default)]
    pub documentation: Documentation,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Documentation {
    #[serde(default)]
    pub javascript: Option<JavascriptDocs>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JavascriptDocs {
    #[serde(default)]
    pub examples: Vec<Example>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub request: CodeBlock,
    pub response: CodeBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeBlock {
    pub code: String,
}

/// Fully dereferenced hyperschema: no `$ref` remains anywhere in it.
#[derive(Debug, Clone, Default)]
pub struct Hyperschema {
    entities: HashMap<String, Entity>,
}

impl Hyperschema {
    pub fn find_entity(&self, json_api_type: &str) -> Option<&Entity> {
        self.entities.get(json_api_type)
    }

    pub fn find_link<'a>(&'a self, json_api_type: &str, rel: &str) -> Option<&'a Link> {
        self.find_entity(json_api_type)?
            .links
            .iter()
            .find(|link| link.rel == rel)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

/// Resolves `$ref` pointers against the root document, depth-first.
///
/// Refs are always local JSON pointers (`#/definitions/...`) in the
/// hyperschema this loader targets; a ref that cannot be resolved is left
/// untouched rather than treated as fatal, since a dangling ref in prose
/// documentation should not break the whole tree.
fn dereference(root: &Value, node: &Value, chain: &mut Vec<String>) -> Value {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(pointer)) = map.get("$ref") {
                if chain.iter().any(|p| p == pointer) {
                    return Value::Null;
                }
                let fragment = pointer.strip_prefix('#').unwrap_or(pointer);
                if let Some(resolved) = root.pointer(fragment) {
                    chain.push(pointer.clone());
                    let result = dereference(root, resolved, chain);
                    chain.pop();
                    return result;
                }
                return node.clone();
            }
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), dereference(root, value, chain));
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| dereference(root, item, chain)).collect())
        }
        other => other.clone(),
    }
}

/// Parses the dereferenced hyperschema document into [`Hyperschema`].
///
/// The upstream document is a JSON object whose top-level keys are
/// JSON:API types (`"item"`, `"item_type"`, ...) mapping to entity bodies;
/// any other top-level key (`definitions`, `$schema`, ...) is ignored.
fn parse_hyperschema(document: &Value) -> Result<Hyperschema, HyperschemaError> {
    let Value::Object(top) = document else {
        return Err(HyperschemaError::Shape("root is not a JSON object".into()));
    };

    let mut entities = HashMap::new();
    for (key, value) in top {
        if key.starts_with('$') || key == "definitions" {
            continue;
        }
        let Value::Object(candidate) = value else {
            continue;
        };
        if !candidate.contains_key("links") {
            continue;
        }
        let entity: Entity = serde_json::from_value(value.clone())
            .map_err(|e| HyperschemaError::Shape(format!("entity '{key}': {e}")))?;
        entities.insert(key.clone(), entity);
    }

    Ok(Hyperschema { entities })
}

/// Fetches and memoizes the hyperschema for the life of the process.
pub struct HyperschemaLoader {
    url: Url,
    client: reqwest::Client,
    memo: Memoizer<Arc<Hyperschema>, HyperschemaError>,
}

impl HyperschemaLoader {
    pub fn new(url: Url, client: reqwest::Client) -> Self {
        let fetch_url = url.clone();
        let fetch_client = client.clone();
        Self {
            url,
            client,
            memo: Memoizer::new(move || {
                let url = fetch_url.clone();
                let client = fetch_client.clone();
                async move { fetch_and_dereference(&client, &url).await.map(Arc::new) }
            }),
        }
    }

    /// Returns the cached hyperschema, fetching and dereferencing it on
    /// first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP fetch fails or the response does not
    /// parse as hyperschema JSON.
    pub async fn get(&self) -> Result<Arc<Hyperschema>, HyperschemaError> {
        self.memo.get().await.cloned()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl std::fmt::Debug for HyperschemaLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperschemaLoader").field("url", &self.url).finish()
    }
}

#[tracing::instrument(skip(client), fields(url = %url))]
async fn fetch_and_dereference(
    client: &reqwest::Client,
    url: &Url,
) -> Result<Hyperschema, HyperschemaError> {
    let response = client.get(url.clone()).send().await.map_err(|e| HyperschemaError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    let response = response.error_for_status().map_err(|e| HyperschemaError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    let raw: Value = response
        .json()
        .await
        .map_err(|e| HyperschemaError::InvalidJson(e.to_string()))?;

    let mut chain = Vec::new();
    let dereferenced = dereference(&raw, &raw, &mut chain);
    parse_hyperschema(&dereferenced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dereferences_local_pointer() {
        let root = json!({
            "definitions": {
                "item_link": {"rel": "self", "description": "the item"}
            },
            "item": {
                "title": "Item",
                "description": "",
                "links": [{"$ref": "#/definitions/item_link"}]
            }
        });
        let mut chain = Vec::new();
        let out = dereference(&root, &root, &mut chain);
        assert_eq!(out["item"]["links"][0]["rel"], "self");
    }

    #[test]
    fn breaks_cycles_without_infinite_recursion() {
        let root = json!({
            "definitions": {
                "a": {"$ref": "#/definitions/b"},
                "b": {"$ref": "#/definitions/a"}
            }
        });
        let mut chain = Vec::new();
        let out = dereference(&root, &root, &mut chain);
        assert!(out["definitions"]["a"].is_null() || out["definitions"]["a"].is_object());
    }

    #[test]
    fn parses_entities_with_links_ignoring_definitions() {
        let document = json!({
            "definitions": {"x": {}},
            "item": {
                "title": "Item",
                "description": "An item",
                "links": [
                    {"rel": "self", "description": "Fetch", "href": "/items/{id}", "method": "GET"}
                ]
            }
        });
        let schema = parse_hyperschema(&document).unwrap();
        assert_eq!(schema.entity_count(), 1);
        let entity = schema.find_entity("item").unwrap();
        assert_eq!(entity.title, "Item");
        let link = schema.find_link("item", "self").unwrap();
        assert_eq!(link.href, "/items/{id}");
    }

    #[test]
    fn find_link_is_none_on_miss() {
        let schema = Hyperschema::default();
        assert!(schema.find_entity("item").is_none());
        assert!(schema.find_link("item", "self").is_none());
    }
}
