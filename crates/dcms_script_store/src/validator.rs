//! Structural validation of a code-mode script's TypeScript source.
//!
//! Enforces three independent rules against the parsed AST (never against
//! raw text, so formatting and whitespace never affect the result):
//!
//! 1. every `import` module specifier matches the package whitelist
//! 2. the default export is an (async, or `Promise<...>`-returning)
//!    function taking exactly one `Client`/`ReturnType<typeof buildClient>`
//!    parameter
//! 3. no occurrence of the `any` or `unknown` type keywords
//!
//! All violations are collected; this never short-circuits on the first
//! one, since a caller that wants to show the LLM everything wrong with a
//! script in one round-trip needs the full list.
//!
//! Node-kind checks below match against the `Debug` string of
//! [`biome_js_syntax`]'s syntax kinds (e.g. `"JS_IMPORT"`,
//! `"TS_ANY_TYPE"`) rather than importing each kind constant by name. The
//! generated kind enum is large and this crate only ever needs "is this
//! node some kind of X", so matching on a substring of the kind's debug
//! name is both sufficient and resilient to the exact constant path.

use biome_js_parser::{JsParserOptions, parse};
use biome_js_syntax::{JsFileSource, JsSyntaxNode, JsSyntaxToken};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Violation {
    pub rule: Rule,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Rule {
    PackageWhitelist,
    DefaultExportShape,
    NoAnyOrUnknown,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

const WHITELIST_PATTERNS: &[&str] = &["@datocms/*", "datocms-*", "./schema"];

/// Parses `content` as TypeScript and runs all three structural rules.
///
/// A syntax error from the parser itself is folded into the result as a
/// [`Rule::DefaultExportShape`] violation at `1:1`, since a script that does
/// not parse cannot have any of the three properties checked.
pub fn validate(content: &str) -> ValidationResult {
    let parsed = parse(content, JsFileSource::ts(), JsParserOptions::default());
    let root = parsed.syntax();

    let mut violations = Vec::new();
    violations.extend(check_imports(&root, content));
    violations.extend(check_default_export(&root, content));
    violations.extend(check_any_unknown(&root, content));

    ValidationResult { valid: violations.is_empty(), violations }
}

fn kind_name(node: &JsSyntaxNode) -> String {
    format!("{:?}", node.kind())
}

fn token_kind_name(token: &JsSyntaxToken) -> String {
    format!("{:?}", token.kind())
}

fn line_col(content: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let mut line = 1;
    let mut col = 1;
    for ch in content[..offset].chars() {
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn matches_whitelist(specifier: &str) -> bool {
    WHITELIST_PATTERNS.iter().any(|pattern| {
        if let Some(scope) = pattern.strip_suffix("/*") {
            specifier == scope || specifier.starts_with(&format!("{scope}/"))
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            specifier.starts_with(prefix)
        } else {
            specifier == *pattern
        }
    })
}

fn check_imports(root: &JsSyntaxNode, content: &str) -> Vec<Violation> {
    let mut out = Vec::new();
    for node in root.descendants() {
        if !kind_name(&node).contains("IMPORT") {
            continue;
        }
        let Some(specifier_token) = node
            .descendants_with_tokens()
            .filter_map(|elem| elem.into_token())
            .find(|t| token_kind_name(t).contains("STRING_LITERAL"))
        else {
            continue;
        };
        let raw = specifier_token.text().to_string();
        let specifier = raw.trim_matches(|c| c == '"' || c == '\'' || c == '`');
        if !matches_whitelist(specifier) {
            let (line, column) = line_col(content, usize::from(specifier_token.text_range().start()));
            out.push(Violation {
                rule: Rule::PackageWhitelist,
                message: format!("import specifier '{specifier}' is not in the allowed package list"),
                line,
                column,
            });
        }
    }
    out
}

fn check_any_unknown(root: &JsSyntaxNode, content: &str) -> Vec<Violation> {
    let mut out = Vec::new();
    for node in root.descendants() {
        let kind = kind_name(&node);
        let is_any = kind.contains("ANY_TYPE");
        let is_unknown = kind.contains("UNKNOWN_TYPE");
        if !is_any && !is_unknown {
            continue;
        }
        let (line, column) = line_col(content, usize::from(node.text_range().start()));
        out.push(Violation {
            rule: Rule::NoAnyOrUnknown,
            message: format!("disallowed type '{}'", if is_any { "any" } else { "unknown" }),
            line,
            column,
        });
    }
    out
}

fn check_default_export(root: &JsSyntaxNode, content: &str) -> Vec<Violation> {
    let Some(export_node) = root.descendants().find(|n| kind_name(n).contains("EXPORT_DEFAULT")) else {
        return vec![Violation {
            rule: Rule::DefaultExportShape,
            message: "script has no default export".to_string(),
            line: 1,
            column: 1,
        }];
    };

    let function_node = find_function_node(&export_node, root);

    let Some(function_node) = function_node else {
        let (line, column) = line_col(content, usize::from(export_node.text_range().start()));
        return vec![Violation {
            rule: Rule::DefaultExportShape,
            message: "default export must be a function".to_string(),
            line,
            column,
        }];
    };

    let mut out = Vec::new();
    let (line, column) = line_col(content, usize::from(function_node.text_range().start()));

    let param_count = count_parameters(&function_node);
    if param_count != 1 {
        out.push(Violation {
            rule: Rule::DefaultExportShape,
            message: format!("default export function must take exactly one parameter, found {param_count}"),
            line,
            column,
        });
    } else if !has_valid_client_parameter_type(&function_node) {
        out.push(Violation {
            rule: Rule::DefaultExportShape,
            message: "parameter must be annotated as 'Client' or 'ReturnType<typeof buildClient>'".to_string(),
            line,
            column,
        });
    }

    if !is_async_or_promise_returning(&function_node) {
        out.push(Violation {
            rule: Rule::DefaultExportShape,
            message: "default export function must be async or declare a Promise<...> return type".to_string(),
            line,
            column,
        });
    }

    out
}

/// Finds the function node backing a default export. If the export
/// expression is itself a function (declaration/expression/arrow), returns
/// it directly. If it's a bare identifier, follows that identifier to its
/// local declaration and inspects the initializer.
fn find_function_node(export_node: &JsSyntaxNode, root: &JsSyntaxNode) -> Option<JsSyntaxNode> {
    if let Some(direct) = export_node
        .descendants()
        .find(|n| kind_name(n).contains("FUNCTION") && n != export_node)
    {
        return Some(direct);
    }

    let identifier_token = export_node
        .descendants_with_tokens()
        .filter_map(|elem| elem.into_token())
        .find(|t| token_kind_name(t).contains("IDENT") && !token_kind_name(t).contains("KEYWORD"))?;
    let name = identifier_token.text().to_string();

    root.descendants()
        .filter(|n| kind_name(n).contains("VARIABLE_DECLARATOR") || kind_name(n).contains("FUNCTION_DECLARATION"))
        .find(|decl| {
            decl.descendants_with_tokens()
                .filter_map(|elem| elem.into_token())
                .any(|t| token_kind_name(t).contains("IDENT") && t.text().trim() == name)
        })
        .and_then(|decl| {
            if kind_name(&decl).contains("FUNCTION_DECLARATION") {
                Some(decl)
            } else {
                decl.descendants().find(|n| kind_name(n).contains("FUNCTION"))
            }
        })
}

fn count_parameters(function_node: &JsSyntaxNode) -> usize {
    let Some(params_list) = function_node.descendants().find(|n| kind_name(n).contains("PARAMETERS")) else {
        return 0;
    };
    params_list
        .children()
        .filter(|child| kind_name(child).contains("PARAMETER") && !kind_name(child).contains("PARAMETERS"))
        .count()
}

fn has_valid_client_parameter_type(function_node: &JsSyntaxNode) -> bool {
    let Some(params_list) = function_node.descendants().find(|n| kind_name(n).contains("PARAMETERS")) else {
        return false;
    };
    let Some(annotation) = params_list.descendants().find(|n| kind_name(n).contains("TYPE_ANNOTATION")) else {
        return false;
    };
    let text = annotation.text().to_string();
    let normalized: String = text
        .trim_start_matches(':')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    normalized == "Client" || normalized == "ReturnType<typeofbuildClient>"
}

fn is_async_or_promise_returning(function_node: &JsSyntaxNode) -> bool {
    let has_async_keyword = function_node
        .descendants_with_tokens()
        .filter_map(|elem| elem.into_token())
        .any(|t| token_kind_name(t).contains("ASYNC"));
    if has_async_keyword {
        return true;
    }
    function_node
        .descendants()
        .find(|n| kind_name(n).contains("RETURN_TYPE"))
        .is_some_and(|n| n.text().to_string().contains("Promise"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_script_has_no_violations() {
        let source = r#"
            import { buildClient } from "@datocms/cma-client-node";

            export default async function run(client: Client) {
                return client.items.list();
            }
        "#;
        let result = validate(source);
        assert!(result.valid, "expected no violations, got {:?}", result.violations);
    }

    #[test]
    fn disallowed_import_specifier_is_flagged() {
        let source = r#"
            import fs from "node:fs";
            export default async function run(client: Client) {}
        "#;
        let result = validate(source);
        assert!(result.violations.iter().any(|v| v.rule == Rule::PackageWhitelist));
    }

    #[test]
    fn any_and_unknown_types_are_flagged() {
        let source = r#"
            export default async function run(client: Client) {
                const x: any = 1;
                const y: unknown = 2;
            }
        "#;
        let result = validate(source);
        let count = result.violations.iter().filter(|v| v.rule == Rule::NoAnyOrUnknown).count();
        assert_eq!(count, 2);
    }

    #[test]
    fn missing_default_export_is_flagged() {
        let source = "const x = 1;";
        let result = validate(source);
        assert!(result.violations.iter().any(|v| v.rule == Rule::DefaultExportShape));
    }

    #[test]
    fn wrong_parameter_count_is_flagged() {
        let source = r#"
            export default async function run(a: Client, b: Client) {}
        "#;
        let result = validate(source);
        assert!(result.violations.iter().any(|v| {
            v.rule == Rule::DefaultExportShape && v.message.contains("exactly one parameter")
        }));
    }

    #[test]
    fn return_type_of_build_client_annotation_is_accepted() {
        let source = r#"
            export default async function run(client: ReturnType<typeof buildClient>) {}
        "#;
        let result = validate(source);
        assert!(result.valid, "expected no violations, got {:?}", result.violations);
    }

    #[test]
    fn lookalike_client_annotation_is_rejected() {
        let source = r#"
            export default async function run(client: ClientConfig) {}
        "#;
        let result = validate(source);
        assert!(result.violations.iter().any(|v| {
            v.rule == Rule::DefaultExportShape && v.message.contains("Client")
        }));
    }
}
