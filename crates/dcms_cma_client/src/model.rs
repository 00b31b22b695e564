//! JSON:API resource shapes for the subset of the CMA this crate reads:
//! item types (models), their fields, and the site singleton (for locales).
//!
//! The DatoCMS client is opaque everywhere dynamic method
//! invocation is needed, but the schema generator and `schema_info` only
//! ever need these three read-only shapes, so they are modeled directly
//! rather than round-tripped through the Node client (§C.3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct JsonApiDocument<T> {
    pub data: T,
    #[serde(default)]
    pub included: Vec<serde_json::Value>,
}

/// A model (`item_type`) resource, flattened from its JSON:API attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemType {
    pub id: String,
    pub api_key: String,
    pub name: String,
    #[serde(default)]
    pub singleton: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub tree: bool,
    #[serde(default)]
    pub modular_block: bool,
    #[serde(default)]
    pub all_locales_required: bool,
    /// Ids of the fields relationship, in declared order.
    #[serde(default)]
    pub field_ids: Vec<String>,
}

/// A field resource, flattened from its JSON:API attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub item_type_id: String,
    pub api_key: String,
    pub field_type: String,
    #[serde(default)]
    pub localized: bool,
    #[serde(default)]
    pub validators: serde_json::Value,
}

impl Field {
    /// Item type ids referenced by a `rich_text`/`structured_text`-family
    /// "allowed blocks" validator, if present.
    pub fn block_item_type_ids(&self) -> Vec<String> {
        for key in ["rich_text_blocks", "structured_text_blocks", "single_block_blocks"] {
            if let Some(ids) = self.validators.get(key).and_then(|v| v.get("item_types")) {
                if let Some(arr) = ids.as_array() {
                    return arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
                }
            }
        }
        Vec::new()
    }

    /// Item type ids referenced by a `structured_text`'s separate
    /// "allowed inline blocks" validator, if present.
    pub fn inline_block_item_type_ids(&self) -> Vec<String> {
        self.validators
            .get("structured_text_inline_blocks")
            .and_then(|v| v.get("item_types"))
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    /// Item type ids this `link`/`links` field can point at, from its
    /// `item_item_type`/`items_item_type` validator. Used to find every
    /// model that references a given model (`schema_info`'s
    /// `include_reverse_references`).
    pub fn linked_item_type_ids(&self) -> Vec<String> {
        for key in ["item_item_type", "items_item_type"] {
            if let Some(ids) = self.validators.get(key).and_then(|v| v.get("item_types")) {
                if let Some(arr) = ids.as_array() {
                    return arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
                }
            }
        }
        Vec::new()
    }
}

/// The project's `site` singleton: only the locales are needed downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    #[serde(default)]
    pub locales: Vec<String>,
}

/// An item type together with its own fields, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemTypeWithFields {
    pub item_type: ItemType,
    pub fields: Vec<Field>,
}

fn get_str(attrs: &serde_json::Value, key: &str) -> String {
    attrs.get(key).and_then(|v| v.as_str()).unwrap_or_default().to_string()
}

fn get_bool(attrs: &serde_json::Value, key: &str) -> bool {
    attrs.get(key).and_then(serde_json::Value::as_bool).unwrap_or(false)
}

/// Parses a raw JSON:API resource object (`{id, type, attributes,
/// relationships}`) for an `item_type` into the flattened [`ItemType`].
pub(crate) fn parse_item_type(raw: &serde_json::Value) -> Option<ItemType> {
    let id = raw.get("id")?.as_str()?.to_string();
    let attrs = raw.get("attributes")?;
    let field_ids = raw
        .pointer("/relationships/fields/data")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter().filter_map(|f| f.get("id").and_then(|i| i.as_str()).map(str::to_string)).collect()
        })
        .unwrap_or_default();

    Some(ItemType {
        id,
        api_key: get_str(attrs, "api_key"),
        name: get_str(attrs, "name"),
        singleton: get_bool(attrs, "singleton"),
        sortable: get_bool(attrs, "sortable"),
        tree: get_bool(attrs, "tree"),
        modular_block: get_bool(attrs, "modular_block"),
        all_locales_required: get_bool(attrs, "all_locales_required"),
        field_ids,
    })
}

/// Parses a raw JSON:API resource object for a `field` into [`Field`],
/// pulling the owning item type id out of its `item_type` relationship.
pub(crate) fn parse_field(raw: &serde_json::Value) -> Option<Field> {
    let id = raw.get("id")?.as_str()?.to_string();
    let attrs = raw.get("attributes")?;
    let item_type_id = raw.pointer("/relationships/item_type/data/id")?.as_str()?.to_string();

    Some(Field {
        id,
        item_type_id,
        api_key: get_str(attrs, "api_key"),
        field_type: get_str(attrs, "field_type"),
        localized: get_bool(attrs, "localized"),
        validators: attrs.get("validators").cloned().unwrap_or(serde_json::Value::Null),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_item_type_with_field_relationship_ids() {
        let raw = json!({
            "id": "123",
            "type": "item_type",
            "attributes": {"api_key": "blog_post", "name": "Blog post", "sortable": true},
            "relationships": {"fields": {"data": [{"id": "1", "type": "field"}, {"id": "2", "type": "field"}]}}
        });
        let item_type = parse_item_type(&raw).unwrap();
        assert_eq!(item_type.api_key, "blog_post");
        assert!(item_type.sortable);
        assert_eq!(item_type.field_ids, vec!["1", "2"]);
    }

    #[test]
    fn parses_field_with_owning_item_type() {
        let raw = json!({
            "id": "1",
            "type": "field",
            "attributes": {"api_key": "title", "field_type": "string", "localized": true, "validators": {}},
            "relationships": {"item_type": {"data": {"id": "123", "type": "item_type"}}}
        });
        let field = parse_field(&raw).unwrap();
        assert_eq!(field.item_type_id, "123");
        assert!(field.localized);
    }

    #[test]
    fn block_item_type_ids_reads_rich_text_validator() {
        let field = Field {
            id: "1".into(),
            item_type_id: "1".into(),
            api_key: "content".into(),
            field_type: "rich_text".into(),
            localized: false,
            validators: json!({"rich_text_blocks": {"item_types": ["10", "11"]}}),
        };
        assert_eq!(field.block_item_type_ids(), vec!["10", "11"]);
    }

    #[test]
    fn linked_item_type_ids_reads_links_validator() {
        let field = Field {
            id: "1".into(),
            item_type_id: "1".into(),
            api_key: "authors".into(),
            field_type: "links".into(),
            localized: false,
            validators: json!({"items_item_type": {"item_types": ["20"]}}),
        };
        assert_eq!(field.linked_item_type_ids(), vec!["20"]);
    }
}
