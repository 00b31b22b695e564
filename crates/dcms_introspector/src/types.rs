//! Wire types shared with `introspect.ts`. Field names are `camelCase` on
//! the wire to match the TypeScript side; Rust callers use the `snake_case`
//! struct fields serde renames to.

use serde::{Deserialize, Serialize};

/// Identifies a named type by the declaration that introduces it, not just
/// its short name: `ApiTypes.Foo` and `RawApiTypes.Foo` have different
/// `TypeSymbolId`s even though `name` alone would collide. `introspect.ts`
/// builds this from the declaration's source file path plus its qualified
/// export path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeSymbolId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeReference {
    pub name: String,
    pub symbol: TypeSymbolId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_repr: String,
    pub is_optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// One call signature of a method. A method with multiple overloads
/// produces one of these per overload; the first is the "primary" one a
/// caller sees and the rest populate [`MethodSignature::overloads`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSignature {
    pub parameters: Vec<Parameter>,
    pub return_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSignature {
    pub method_name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// First URL following `Read more:` in the docstring; binds this
    /// method to a specific hyperschema link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    pub referenced_type_symbols: Vec<TypeReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overloads: Vec<CallSignature>,
}

/// `expandTypes` option: the sentinel `"*"` means no depth limit, an empty
/// list means "use the seeds as given", a non-empty list replaces the
/// seeds with exactly those names, shown fully expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExpandTypes {
    #[default]
    None,
    Named(Vec<String>),
    All,
}

impl Serialize for ExpandTypes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ExpandTypes::None => serializer.serialize_none(),
            ExpandTypes::Named(names) => names.serialize(serializer),
            ExpandTypes::All => "*".serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandOptions {
    pub max_depth: u32,
    pub expand_types: ExpandTypes,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self { max_depth: 2, expand_types: ExpandTypes::None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedTypes {
    pub expanded_types: String,
    pub not_expanded_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub(crate) enum IntrospectRequest {
    #[serde(rename_all = "camelCase")]
    Signature { resource: String, method: String },
    #[serde(rename_all = "camelCase")]
    Expand { seeds: Vec<TypeReference>, options: ExpandOptions },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub(crate) enum IntrospectResponse {
    #[allow(dead_code)]
    Signature { signature: Option<MethodSignature> },
    Expand { result: ExpandedTypes },
    Error { message: String },
}
