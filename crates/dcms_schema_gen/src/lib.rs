//! Generates the `schema.ts` file a code-mode workspace regenerates before
//! every `validateScript`/`executeScript` call.
//!
//! Given the project's item types (fetched over HTTP by
//! [`dcms_cma_client::CmaClient::get_item_types_with_fields`]) and its
//! locales, emits one `ItemTypeDefinition<...>` per model, naming each
//! field's shape literally rather than importing a shared field-type enum,
//! matching the real `@datocms/cma-client`'s generic record typing.

use std::collections::HashMap;

use dcms_cma_client::{Field, ItemTypeWithFields};
use heck::ToUpperCamelCase;

/// Builds `api_key -> PascalCase` names for every item type, disambiguating
/// collisions (two models whose `api_key`s only differ in case or
/// separators) by appending the item type id.
fn pascal_names(item_types: &[ItemTypeWithFields]) -> HashMap<String, String> {
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut used: HashMap<String, usize> = HashMap::new();

    for it in item_types {
        let base = it.item_type.api_key.to_upper_camel_case();
        let count = used.entry(base.clone()).or_insert(0);
        *count += 1;
        let name = if *count == 1 { base } else { format!("{base}{}", it.item_type.id) };
        seen.insert(it.item_type.id.clone(), name);
    }
    seen
}

fn union_of(ids: &[String], pascal_for: &HashMap<String, String>) -> String {
    if ids.is_empty() {
        return "never".to_string();
    }
    ids.iter()
        .filter_map(|id| pascal_for.get(id))
        .cloned()
        .collect::<Vec<_>>()
        .join(" | ")
}

fn field_type_literal(field: &Field, pascal_for: &HashMap<String, String>) -> String {
    let mut parts = vec![format!("type: '{}'", field.field_type)];

    match field.field_type.as_str() {
        "rich_text" => {
            parts.push(format!("blocks: {}", union_of(&field.block_item_type_ids(), pascal_for)));
        }
        "structured_text" => {
            parts.push(format!("blocks: {}", union_of(&field.block_item_type_ids(), pascal_for)));
            parts.push(format!("inline_blocks: {}", union_of(&field.inline_block_item_type_ids(), pascal_for)));
        }
        "single_block" => {
            parts.push(format!("blocks: {}", union_of(&field.block_item_type_ids(), pascal_for)));
        }
        _ => {}
    }

    if field.localized {
        parts.push("localized: true".to_string());
    }

    format!("{{ {} }}", parts.join("; "))
}

fn locale_union(locales: &[String]) -> String {
    if locales.is_empty() {
        return "string".to_string();
    }
    locales.iter().map(|l| format!("'{l}'")).collect::<Vec<_>>().join(" | ")
}

/// Renders the full contents of `schema.ts` for a project.
pub fn generate(item_types: &[ItemTypeWithFields], locales: &[String]) -> String {
    let pascal_for = pascal_names(item_types);

    let mut out = String::new();
    out.push_str("import type { ItemTypeDefinition } from '@datocms/cma-client';\n\n");
    out.push_str(&format!("export type EnvironmentSettings = {{ locales: {} }};\n\n", locale_union(locales)));

    for it in item_types {
        let pascal = &pascal_for[&it.item_type.id];

        let mut fields_text = String::new();
        for field in &it.fields {
            fields_text.push_str(&format!("  {}: {};\n", field.api_key, field_type_literal(field, &pascal_for)));
        }
        if it.item_type.sortable {
            fields_text.push_str("  position: { type: 'integer' };\n");
        }
        if it.item_type.tree {
            fields_text.push_str("  parent_id: { type: 'link' };\n");
        }

        out.push_str(&format!(
            "export type {pascal} = ItemTypeDefinition<EnvironmentSettings, '{id}', {{\n{fields_text}}}>;\n\n",
            id = it.item_type.id,
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcms_cma_client::ItemType;
    use serde_json::json;

    fn item_type(id: &str, api_key: &str) -> ItemType {
        ItemType {
            id: id.to_string(),
            api_key: api_key.to_string(),
            name: api_key.to_string(),
            singleton: false,
            sortable: false,
            tree: false,
            modular_block: false,
            all_locales_required: false,
            field_ids: vec![],
        }
    }

    fn field(id: &str, item_type_id: &str, api_key: &str, field_type: &str) -> Field {
        Field {
            id: id.to_string(),
            item_type_id: item_type_id.to_string(),
            api_key: api_key.to_string(),
            field_type: field_type.to_string(),
            localized: false,
            validators: json!({}),
        }
    }

    #[test]
    fn generates_pascal_named_type_alias_per_item_type() {
        let item_types = vec![ItemTypeWithFields {
            item_type: item_type("1", "blog_post"),
            fields: vec![field("f1", "1", "title", "string")],
        }];
        let out = generate(&item_types, &["en".to_string()]);
        assert!(out.contains("export type BlogPost = ItemTypeDefinition<EnvironmentSettings, '1',"));
        assert!(out.contains("title: { type: 'string' }"));
        assert!(out.contains("export type EnvironmentSettings = { locales: 'en' }"));
    }

    #[test]
    fn localized_field_gets_localized_true() {
        let item_types = vec![ItemTypeWithFields {
            item_type: item_type("1", "page"),
            fields: vec![{
                let mut f = field("f1", "1", "title", "string");
                f.localized = true;
                f
            }],
        }];
        let out = generate(&item_types, &[]);
        assert!(out.contains("localized: true"));
    }

    #[test]
    fn rich_text_field_emits_block_union() {
        let mut rich_text = field("f1", "1", "content", "rich_text");
        rich_text.validators = json!({"rich_text_blocks": {"item_types": ["2"]}});
        let item_types = vec![
            ItemTypeWithFields { item_type: item_type("1", "article"), fields: vec![rich_text] },
            ItemTypeWithFields { item_type: item_type("2", "image_block"), fields: vec![] },
        ];
        let out = generate(&item_types, &[]);
        assert!(out.contains("blocks: ImageBlock"));
    }

    #[test]
    fn rich_text_field_with_no_allowed_blocks_is_never() {
        let item_types = vec![ItemTypeWithFields {
            item_type: item_type("1", "article"),
            fields: vec![field("f1", "1", "content", "rich_text")],
        }];
        let out = generate(&item_types, &[]);
        assert!(out.contains("blocks: never"));
    }

    #[test]
    fn sortable_model_gets_virtual_position_field() {
        let mut it = item_type("1", "menu_item");
        it.sortable = true;
        let item_types = vec![ItemTypeWithFields { item_type: it, fields: vec![] }];
        let out = generate(&item_types, &[]);
        assert!(out.contains("position: { type: 'integer' }"));
    }

    #[test]
    fn tree_model_gets_virtual_parent_id_field() {
        let mut it = item_type("1", "category");
        it.tree = true;
        let item_types = vec![ItemTypeWithFields { item_type: it, fields: vec![] }];
        let out = generate(&item_types, &[]);
        assert!(out.contains("parent_id: { type: 'link' }"));
    }

    #[test]
    fn empty_locales_falls_back_to_string() {
        let out = generate(&[], &[]);
        assert!(out.contains("locales: string"));
    }
}
