//! Post-processes hyperschema link descriptions: collapses or expands
//! embedded `<details>` blocks and resolves inline `::example[id]` tokens
//! against a link's `documentation.javascript.examples[]`.
//!
//! Two render modes, selected by whether the caller passes any
//! `expand_details` filter text:
//!
//! - **Summary mode** (no filter) — every `<details>` keeps only its
//!   `<summary>`; every `::example[id]` becomes a collapsed placeholder;
//!   any example never referenced inline is appended as a collapsed
//!   placeholder at the end. This is the cheap default overview.
//! - **Filter mode** (non-empty filter) — only details/examples whose
//!   summary or title text appears verbatim in the filter list are kept,
//!   fully rendered and open. Everything else is elided.

use std::collections::HashSet;
use std::sync::LazyLock;

use dcms_hyperschema::Example;
use regex::Regex;

static DETAILS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<details>\s*<summary>(.*?)</summary>(.*?)</details>").expect("static regex")
});

static EXAMPLE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"::example\[([^\]]+)\]").expect("static regex"));

/// Renders `description`, resolving `::example[id]` tokens against
/// `examples`. An empty `expand_details` selects summary mode; anything
/// else selects filter mode with that list as the set of summary/title
/// strings to expand.
pub fn render(description: &str, examples: &[Example], expand_details: &[String]) -> String {
    if expand_details.is_empty() {
        render_summary(description, examples)
    } else {
        let filter: HashSet<&str> = expand_details.iter().map(String::as_str).collect();
        render_filtered(description, examples, &filter)
    }
}

fn render_summary(description: &str, examples: &[Example]) -> String {
    let mut referenced: HashSet<&str> = HashSet::new();

    let collapsed_details = DETAILS_RE.replace_all(description, |caps: &regex::Captures| {
        format!("<details><summary>{}</summary></details>", caps[1].trim())
    });

    let with_examples = EXAMPLE_TOKEN_RE.replace_all(&collapsed_details, |caps: &regex::Captures| {
        let id = caps[1].trim();
        match examples.iter().find(|e| e.id == id) {
            Some(example) => {
                referenced.insert(&example.id);
                collapsed_example_placeholder(example)
            }
            None => caps[0].to_string(),
        }
    });

    let mut out = with_examples.into_owned();
    let unreferenced: Vec<&Example> =
        examples.iter().filter(|e| !referenced.contains(e.id.as_str())).collect();
    for example in unreferenced {
        out.push('\n');
        out.push_str(&collapsed_example_placeholder(example));
    }
    out
}

fn collapsed_example_placeholder(example: &Example) -> String {
    format!("<details><summary>Example: {}</summary></details>", example.title)
}

fn render_filtered(description: &str, examples: &[Example], filter: &HashSet<&str>) -> String {
    let details_expanded = DETAILS_RE.replace_all(description, |caps: &regex::Captures| {
        let summary = caps[1].trim();
        if filter.contains(summary) {
            format!("<details open><summary>{summary}</summary>{}</details>", &caps[2])
        } else {
            String::new()
        }
    });

    EXAMPLE_TOKEN_RE
        .replace_all(&details_expanded, |caps: &regex::Captures| {
            let id = caps[1].trim();
            match examples.iter().find(|e| e.id == id) {
                Some(example) if filter.contains(example.title.as_str()) => {
                    expanded_example(example)
                }
                _ => String::new(),
            }
        })
        .into_owned()
}

fn expanded_example(example: &Example) -> String {
    format!(
        "<details open><summary>{}</summary>\n\n{}\n\nRequest:\n```js\n{}\n```\n\nResponse:\n```js\n{}\n```\n</details>",
        example.title, example.description, example.request.code, example.response.code
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcms_hyperschema::CodeBlock;

    fn example(id: &str, title: &str) -> Example {
        Example {
            id: id.to_string(),
            title: title.to_string(),
            description: "desc".to_string(),
            request: CodeBlock { code: "client.items.list()".to_string() },
            response: CodeBlock { code: "[]".to_string() },
        }
    }

    #[test]
    fn summary_mode_collapses_details_to_summary_only() {
        let description = "<details><summary>Filtering</summary>You can filter by field.</details>";
        let out = render(description, &[], &[]);
        assert_eq!(out, "<details><summary>Filtering</summary></details>");
    }

    #[test]
    fn summary_mode_replaces_example_token_and_appends_unreferenced() {
        let examples = vec![example("ex1", "List all items"), example("ex2", "Filter items")];
        let description = "See ::example[ex1] for basics.";
        let out = render(description, &examples, &[]);
        assert!(out.contains("Example: List all items"));
        assert!(out.contains("Example: Filter items"));
    }

    #[test]
    fn summary_mode_leaves_unknown_example_id_untouched() {
        let out = render("::example[missing]", &[], &[]);
        assert_eq!(out, "::example[missing]");
    }

    #[test]
    fn filter_mode_keeps_only_matching_details_fully_open() {
        let description = "<details><summary>Filtering</summary>Body A</details><details><summary>Sorting</summary>Body B</details>";
        let out = render(description, &[], &["Filtering".to_string()]);
        assert!(out.contains("Body A"));
        assert!(!out.contains("Body B"));
        assert!(out.contains("open"));
    }

    #[test]
    fn filter_mode_expands_matching_example_with_code() {
        let examples = vec![example("ex1", "List all items")];
        let description = "::example[ex1]";
        let out = render(description, &examples, &["List all items".to_string()]);
        assert!(out.contains("client.items.list()"));
        assert!(out.contains("Request:"));
    }

    #[test]
    fn filter_mode_elides_non_matching_example() {
        let examples = vec![example("ex1", "List all items")];
        let out = render("::example[ex1]", &examples, &["Something else".to_string()]);
        assert_eq!(out, "");
    }
}
