//! `resources`, `resource`, `resource_action`, and `resource_action_method`
//! tools: walking the resource manifest
//! and hyperschema to answer "what exists" and "what does it look like",
//! entirely offline (no DatoCMS credentials needed).

use dcms_hyperschema::Hyperschema;
use dcms_introspector::{ExpandOptions, ExpandTypes, ExpandedTypes, Introspector, IntrospectorError, MethodSignature, TypeReference};
use dcms_resource_schema::{Endpoint, ResourceSchema};

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no resource matches '{0}'")]
    ResourceNotFound(String),
    #[error("resource '{resource}' has no action '{action}'")]
    ActionNotFound { resource: String, action: String },
    #[error(transparent)]
    Introspector(#[from] IntrospectorError),
}

pub struct ResourceSummary {
    pub namespace: String,
    pub json_api_type: String,
    pub title: String,
    pub action_count: usize,
}

pub struct ActionSummary {
    pub rel: String,
    pub method: String,
    pub summary: String,
}

pub struct ResourceOutput {
    pub json_api_type: String,
    pub title: String,
    pub description_markdown: String,
    pub actions: Vec<ActionSummary>,
}

pub struct MethodBinding {
    pub method_name: String,
    pub return_type: String,
}

pub struct ResourceActionOutput {
    pub resource: String,
    pub action: String,
    pub description_markdown: String,
    pub methods: Vec<MethodBinding>,
}

/// Resolves a user-supplied `resource` string (namespace or JSON:API type)
/// to the canonical JSON:API type, preferring an exact namespace match
/// (what most callers pass) over an exact JSON:API type match.
fn resolve_json_api_type(resource_schema: &ResourceSchema, query: &str) -> Option<String> {
    if let Some(endpoint) = resource_schema.find_by_namespace(query).into_iter().next() {
        return Some(endpoint.json_api_type.clone());
    }
    if !resource_schema.find_by_json_api_type(query).is_empty() {
        return Some(query.to_string());
    }
    None
}

pub fn list_resources(resource_schema: &ResourceSchema) -> Vec<ResourceSummary> {
    resource_schema
        .entities()
        .iter()
        .map(|entity| ResourceSummary {
            namespace: entity.namespace.clone(),
            json_api_type: entity.json_api_type.clone(),
            title: entity.resource_class_name.clone(),
            action_count: entity.endpoints.len(),
        })
        .collect()
}

pub fn get_resource(
    hyperschema: &Hyperschema,
    resource_schema: &ResourceSchema,
    resource: &str,
    expand_details: &[String],
) -> Result<ResourceOutput, DiscoveryError> {
    let json_api_type = resolve_json_api_type(resource_schema, resource)
        .ok_or_else(|| DiscoveryError::ResourceNotFound(resource.to_string()))?;

    let entity = hyperschema.find_entity(&json_api_type);
    let description_markdown = entity.map_or_else(String::new, |e| {
        dcms_docs::render(
            &e.description,
            e.links.iter().filter_map(|l| l.documentation.javascript.as_ref()).flat_map(|j| j.examples.iter()).collect::<Vec<_>>().as_slice(),
            expand_details,
        )
    });

    let endpoints = resource_schema.find_by_json_api_type(&json_api_type);
    let actions = endpoints
        .iter()
        .map(|e| ActionSummary {
            rel: e.rel.clone(),
            method: e.method.clone(),
            summary: hyperschema
                .find_link(&json_api_type, &e.rel)
                .map(|l| l.description.clone())
                .unwrap_or_default(),
        })
        .collect();

    Ok(ResourceOutput {
        title: entity.map_or_else(|| json_api_type.clone(), |e| e.title.clone()),
        json_api_type,
        description_markdown,
        actions,
    })
}

pub fn get_resource_action(
    hyperschema: &Hyperschema,
    resource_schema: &ResourceSchema,
    resource: &str,
    action: &str,
    expand_details: &[String],
) -> Result<ResourceActionOutput, DiscoveryError> {
    let json_api_type = resolve_json_api_type(resource_schema, resource)
        .ok_or_else(|| DiscoveryError::ResourceNotFound(resource.to_string()))?;

    let link = hyperschema.find_link(&json_api_type, action);
    if link.is_none() && resource_schema.find_endpoint_by_rel(&json_api_type, action).is_none() {
        return Err(DiscoveryError::ActionNotFound { resource: resource.to_string(), action: action.to_string() });
    }

    let description_markdown = link.map_or_else(String::new, |l| {
        let examples = l.documentation.javascript.as_ref().map(|j| j.examples.as_slice()).unwrap_or_default();
        dcms_docs::render(&l.description, examples, expand_details)
    });

    // Binds by `docUrl` equality per the underlying hyperschema link, not
    // `rel`: a handful of links document more than one client method (e.g.
    // `rawList` alongside `list`), and `rel` alone would miss them.
    let methods: Vec<MethodBinding> = resource_schema
        .find_by_json_api_type(&json_api_type)
        .into_iter()
        .filter(|e| match (&e.doc_url, link.and_then(|l| l.doc_url.as_ref())) {
            (Some(a), Some(b)) => a == b,
            _ => e.rel == action,
        })
        .map(endpoint_to_binding)
        .collect();

    Ok(ResourceActionOutput { resource: resource.to_string(), action: action.to_string(), description_markdown, methods })
}

fn endpoint_to_binding(endpoint: &Endpoint) -> MethodBinding {
    MethodBinding {
        method_name: endpoint.name.clone().unwrap_or_else(|| endpoint.raw_name.clone()),
        return_type: endpoint.response_type.clone().unwrap_or_else(|| "unknown".to_string()),
    }
}

/// Resolves `resource` to a namespace (what the client object is keyed by)
/// rather than a JSON:API type, for tools that call `client[namespace]`.
pub fn resolve_namespace(resource_schema: &ResourceSchema, resource: &str) -> Option<String> {
    if !resource_schema.find_by_namespace(resource).is_empty() {
        return Some(resource.to_string());
    }
    resource_schema.find_by_json_api_type(resource).into_iter().next().map(|e| e.namespace.clone())
}

/// Finds the endpoint backing `client[namespace][method]`, by its
/// `name`/`rawName` in the manifest.
pub fn find_endpoint_by_method<'a>(resource_schema: &'a ResourceSchema, namespace: &str, method: &str) -> Option<&'a Endpoint> {
    resource_schema
        .find_by_namespace(namespace)
        .into_iter()
        .find(|e| e.name.as_deref() == Some(method) || e.raw_name == method)
}

pub async fn get_method_signature(
    introspector: &Introspector,
    namespace: &str,
    method: &str,
    max_depth: Option<u32>,
    expand_types: Option<Vec<String>>,
) -> Result<Option<(MethodSignature, ExpandedTypes)>, DiscoveryError> {
    let Some(signature) = introspector.signature(namespace, method).await? else {
        return Ok(None);
    };

    let options = ExpandOptions {
        max_depth: max_depth.unwrap_or(2),
        expand_types: match expand_types {
            Some(names) if names == ["*"] => ExpandTypes::All,
            Some(names) => ExpandTypes::Named(names),
            None => ExpandTypes::None,
        },
    };

    let seeds: Vec<TypeReference> = signature.referenced_type_symbols.clone();
    let expanded = introspector.expand_types(&seeds, options).await?;

    Ok(Some((signature, expanded)))
}
