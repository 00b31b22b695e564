//! In-memory `name -> content` mapping for code-mode scripts.
//!
//! Per `3`/`6`, a script's `name` is a `script://` URI (`script://<basename>.ts`):
//! the scheme is an MCP "resource URI" affordance and the basename is what
//! would be the on-disk path tail. Both forms are preserved on [`Script`] --
//! [`Script::name`] keeps the full URI (globally unique, what callers pass
//! back to `update`/`view`/`execute`) and [`Script::basename`] strips the
//! scheme and extension for anything that needs a bare identifier.

use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

use crate::validator::{self, ValidationResult};

const SCHEME: &str = "script://";

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^script://[A-Za-z][A-Za-z0-9_-]{0,60}\.ts$").expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Script {
    /// Full `script://<basename>.ts` URI; globally unique.
    pub name: String,
    pub content: String,
}

impl Script {
    /// The path tail a real filesystem representation would use: the
    /// scheme and `.ts` extension stripped.
    pub fn basename(&self) -> &str {
        self.name
            .strip_prefix(SCHEME)
            .and_then(|rest| rest.strip_suffix(".ts"))
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, thiserror::Error, Clone)]
pub enum StoreError {
    #[error("script name '{0}' is invalid: must match ^script://[A-Za-z][A-Za-z0-9_-]{{0,60}}\\.ts$")]
    InvalidName(String),
    #[error("script '{0}' already exists")]
    AlreadyExists(String),
    #[error("script '{0}' not found")]
    NotFound(String),
    #[error("replacement #{index}: {reason}")]
    Replacement { index: usize, reason: ReplacementFailure },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplacementFailure {
    #[error("String not found")]
    StringNotFound,
    #[error("oldStr must be unique, found {0} occurrences")]
    MustBeUnique(usize),
}

/// One `{oldStr, newStr}` replacement in an `update` call.
#[derive(Debug, Clone)]
pub struct Replacement {
    pub old_str: String,
    pub new_str: String,
}

pub struct CreateResult {
    pub script: Script,
    pub validation: ValidationResult,
}

pub struct UpdateResult {
    pub script: Script,
    pub validation: ValidationResult,
}

/// In-memory store, keyed by script name, preserving insertion order.
#[derive(Default)]
pub struct ScriptStore {
    scripts: IndexMap<String, Script>,
}

impl ScriptStore {
    pub fn new() -> Self {
        Self { scripts: IndexMap::new() }
    }

    /// Creates a new script. Always saves the script regardless of
    /// validation outcome — the caller decides whether to surface
    /// validation errors to the LLM or proceed anyway.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is malformed or already taken.
    pub fn create(&mut self, name: &str, content: &str) -> Result<CreateResult, StoreError> {
        if !NAME_RE.is_match(name) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        if self.scripts.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }

        let validation = validator::validate(content);
        let script = Script { name: name.to_string(), content: content.to_string() };
        self.scripts.insert(name.to_string(), script.clone());
        Ok(CreateResult { script, validation })
    }

    /// Applies `replacements` sequentially to the stored content of `name`.
    /// Each `old_str` must occur exactly once in the content *at the time
    /// it is processed* — an earlier replacement can create or remove the
    /// match for a later one. Saves the resulting content regardless of
    /// the post-update validation outcome.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `name` doesn't exist, or
    /// [`StoreError::Replacement`] (1-based index) on the first
    /// replacement whose `old_str` doesn't match exactly once.
    pub fn update(&mut self, name: &str, replacements: &[Replacement]) -> Result<UpdateResult, StoreError> {
        let Some(existing) = self.scripts.get(name) else {
            return Err(StoreError::NotFound(name.to_string()));
        };
        let mut content = existing.content.clone();

        for (i, replacement) in replacements.iter().enumerate() {
            let index = i + 1;
            let occurrences = content.matches(replacement.old_str.as_str()).count();
            match occurrences {
                0 => {
                    return Err(StoreError::Replacement {
                        index,
                        reason: ReplacementFailure::StringNotFound,
                    });
                }
                1 => {
                    content = content.replacen(&replacement.old_str, &replacement.new_str, 1);
                }
                n => {
                    return Err(StoreError::Replacement {
                        index,
                        reason: ReplacementFailure::MustBeUnique(n),
                    });
                }
            }
        }

        let validation = validator::validate(&content);
        let script = Script { name: name.to_string(), content: content.clone() };
        self.scripts.insert(name.to_string(), script.clone());
        Ok(UpdateResult { script, validation })
    }

    /// Returns the current content of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `name` doesn't exist.
    pub fn view(&self, name: &str) -> Result<&Script, StoreError> {
        self.scripts.get(name).ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> &'static str {
        "export default async function run(client: Client) { return 1; }"
    }

    #[test]
    fn create_rejects_invalid_name() {
        let mut store = ScriptStore::new();
        assert!(matches!(store.create("1bad", sample()), Err(StoreError::InvalidName(_))));
        assert!(matches!(store.create("one", sample()), Err(StoreError::InvalidName(_))));
        assert!(matches!(store.create("script://one", sample()), Err(StoreError::InvalidName(_))));
    }

    #[test]
    fn create_rejects_duplicate_name() {
        let mut store = ScriptStore::new();
        store.create("script://one.ts", sample()).unwrap();
        assert!(matches!(store.create("script://one.ts", sample()), Err(StoreError::AlreadyExists(_))));
    }

    #[test]
    fn create_saves_even_when_validation_fails() {
        let mut store = ScriptStore::new();
        let result = store.create("script://broken.ts", "const x = 1;").unwrap();
        assert!(!result.validation.valid);
        assert_eq!(store.view("script://broken.ts").unwrap().content, "const x = 1;");
    }

    #[test]
    fn basename_strips_scheme_and_extension() {
        let mut store = ScriptStore::new();
        let result = store.create("script://one.ts", sample()).unwrap();
        assert_eq!(result.script.basename(), "one");
    }

    #[test]
    fn update_applies_replacements_sequentially() {
        let mut store = ScriptStore::new();
        store.create("script://one.ts", "return 1;").unwrap();
        let result = store
            .update("script://one.ts", &[Replacement { old_str: "1".to_string(), new_str: "2".to_string() }])
            .unwrap();
        assert_eq!(result.script.content, "return 2;");
    }

    #[test]
    fn update_errors_on_non_unique_old_str_with_1_based_index() {
        let mut store = ScriptStore::new();
        store.create("script://one.ts", "a a").unwrap();
        let err = store
            .update("script://one.ts", &[Replacement { old_str: "a".to_string(), new_str: "b".to_string() }])
            .unwrap_err();
        match err {
            StoreError::Replacement { index, reason } => {
                assert_eq!(index, 1);
                assert_eq!(reason, ReplacementFailure::MustBeUnique(2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn update_allows_earlier_replacement_to_create_later_match() {
        let mut store = ScriptStore::new();
        store.create("script://one.ts", "X").unwrap();
        let result = store
            .update(
                "script://one.ts",
                &[
                    Replacement { old_str: "X".to_string(), new_str: "a a".to_string() },
                ],
            )
            .unwrap();
        assert_eq!(result.script.content, "a a");
    }

    #[test]
    fn view_errors_on_missing_script() {
        let store = ScriptStore::new();
        assert!(matches!(store.view("script://missing.ts"), Err(StoreError::NotFound(_))));
    }
}
