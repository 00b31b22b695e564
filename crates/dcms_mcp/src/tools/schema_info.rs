//! `schema_info`: fuzzy-matches a query against the live project's
//! models, then optionally pulls in related block models, reverse
//! references, and block embedders around the matches.

use std::collections::BTreeMap;

use dcms_cma_client::{CmaClient, CmaError, ItemTypeWithFields};

use crate::models::FieldsDetails;

#[derive(Debug, thiserror::Error)]
pub enum SchemaInfoError {
    #[error(transparent)]
    Cma(#[from] CmaError),
    #[error("DATOCMS_API_TOKEN is not configured")]
    NoToken,
}

pub struct MatchedField {
    pub api_key: String,
    pub field_type: String,
    pub localized: bool,
    pub validators: Option<serde_json::Value>,
    pub block_item_type_ids: Vec<String>,
}

pub struct MatchedModel {
    pub api_key: String,
    pub name: String,
    pub id: String,
    pub is_block: bool,
    pub fields: Vec<MatchedField>,
}

pub struct SchemaInfoOutput {
    pub matched: Vec<MatchedModel>,
    pub blocks: Vec<MatchedModel>,
    pub reverse_references: Vec<MatchedModel>,
    pub block_embedders: Vec<MatchedModel>,
}

fn to_matched_model(entry: &ItemTypeWithFields, fields_details: &FieldsDetails, allowlist: Option<&[String]>) -> MatchedModel {
    let fields = entry
        .fields
        .iter()
        .filter(|f| allowlist.is_none_or(|list| list.iter().any(|a| a == &f.api_key)))
        .map(|f| MatchedField {
            api_key: f.api_key.clone(),
            field_type: f.field_type.clone(),
            localized: f.localized,
            validators: matches!(fields_details, FieldsDetails::Complete).then(|| f.validators.clone()),
            block_item_type_ids: {
                let mut ids = f.block_item_type_ids();
                ids.extend(f.inline_block_item_type_ids());
                ids
            },
        })
        .collect();

    MatchedModel {
        api_key: entry.item_type.api_key.clone(),
        name: entry.item_type.name.clone(),
        id: entry.item_type.id.clone(),
        is_block: entry.item_type.modular_block,
        fields,
    }
}

/// Fetches every model in the project and assembles the query's match set
/// and whichever related sets the caller asked for.
///
/// # Errors
///
/// Returns an error if no API token is configured or the CMA request
/// fails.
pub async fn run(
    client: &CmaClient,
    query: &str,
    include_blocks: bool,
    include_reverse_references: bool,
    include_block_embedders: bool,
    fields_details: &FieldsDetails,
    field_allowlist: Option<&[String]>,
) -> Result<SchemaInfoOutput, SchemaInfoError> {
    let all = client.get_item_types_with_fields().await?;
    let by_id: BTreeMap<&str, &ItemTypeWithFields> = all.iter().map(|e| (e.item_type.id.as_str(), e)).collect();

    let candidates: Vec<&str> = all.iter().map(|e| e.item_type.api_key.as_str()).collect();
    let ranked_keys = dcms_fuzzy::best_matches(query, &candidates, |s| s);
    let matched_entries: Vec<&ItemTypeWithFields> = ranked_keys
        .into_iter()
        .filter_map(|key| all.iter().find(|e| e.item_type.api_key == *key))
        .collect();

    let matched_ids: std::collections::HashSet<&str> =
        matched_entries.iter().map(|e| e.item_type.id.as_str()).collect();

    let mut block_ids = std::collections::HashSet::new();
    if include_blocks {
        for entry in &matched_entries {
            for field in &entry.fields {
                block_ids.extend(field.block_item_type_ids());
                block_ids.extend(field.inline_block_item_type_ids());
            }
        }
    }

    let mut reverse_reference_ids = std::collections::HashSet::new();
    if include_reverse_references {
        for entry in &all {
            if matched_ids.contains(entry.item_type.id.as_str()) {
                continue;
            }
            let references_a_match = entry
                .fields
                .iter()
                .any(|f| f.linked_item_type_ids().iter().any(|id| matched_ids.contains(id.as_str())));
            if references_a_match {
                reverse_reference_ids.insert(entry.item_type.id.clone());
            }
        }
    }

    let mut block_embedder_ids = std::collections::HashSet::new();
    if include_block_embedders {
        let matched_block_ids: std::collections::HashSet<&str> =
            matched_entries.iter().filter(|e| e.item_type.modular_block).map(|e| e.item_type.id.as_str()).collect();
        if !matched_block_ids.is_empty() {
            for entry in &all {
                if matched_ids.contains(entry.item_type.id.as_str()) || entry.item_type.modular_block {
                    continue;
                }
                let embeds_a_match = entry.fields.iter().any(|f| {
                    let mut ids = f.block_item_type_ids();
                    ids.extend(f.inline_block_item_type_ids());
                    ids.iter().any(|id| matched_block_ids.contains(id.as_str()))
                });
                if embeds_a_match {
                    block_embedder_ids.insert(entry.item_type.id.clone());
                }
            }
        }
    }

    let matched = matched_entries.iter().map(|e| to_matched_model(e, fields_details, field_allowlist)).collect();
    let blocks = block_ids
        .iter()
        .filter_map(|id| by_id.get(id.as_str()))
        .map(|e| to_matched_model(e, fields_details, field_allowlist))
        .collect();
    let reverse_references = reverse_reference_ids
        .iter()
        .filter_map(|id| by_id.get(id.as_str()))
        .map(|e| to_matched_model(e, fields_details, field_allowlist))
        .collect();
    let block_embedders = block_embedder_ids
        .iter()
        .filter_map(|id| by_id.get(id.as_str()))
        .map(|e| to_matched_model(e, fields_details, field_allowlist))
        .collect();

    Ok(SchemaInfoOutput { matched, blocks, reverse_references, block_embedders })
}

pub fn render(output: &SchemaInfoOutput) -> String {
    let mut out = String::from("# Schema Info\n\n");
    render_section(&mut out, "Matched models", &output.matched);
    render_section(&mut out, "Blocks", &output.blocks);
    render_section(&mut out, "Reverse references", &output.reverse_references);
    render_section(&mut out, "Block embedders", &output.block_embedders);
    out
}

fn render_section(out: &mut String, title: &str, models: &[MatchedModel]) {
    if models.is_empty() {
        return;
    }
    out.push_str(&format!("## {title}\n\n"));
    for model in models {
        out.push_str(&format!("### {} (`{}`, `{}`)\n\n", model.name, model.api_key, model.id));
        for field in &model.fields {
            out.push_str(&format!(
                "- `{}`: {}{}\n",
                field.api_key,
                field.field_type,
                if field.localized { " (localized)" } else { "" }
            ));
            if let Some(validators) = &field.validators {
                out.push_str(&format!("  - validators: `{}`\n", serde_json::to_string(validators).unwrap_or_default()));
            }
        }
        out.push('\n');
    }
}
