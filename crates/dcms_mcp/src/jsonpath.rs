//! A minimal JSONPath-like selector for post-filtering execute-method
//! results: post-filter output with a JSON-path selector.
//!
//! Supports the subset actually useful for trimming a CMA response down
//! before it's rendered to the LLM: an optional leading `$`, dotted field
//! access (`.attributes`), bracket field access (`["api-key"]`), numeric
//! array indexing (`[0]`), and the wildcard `[*]` which fans the rest of
//! the path out over every element, collecting the results into an array.
//! Not a full JSONPath implementation (no slices, filters, or recursive
//! descent) — the tool composition only ever needs "pick a field out of a
//! nested response", not general querying.

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("invalid selector syntax at '{0}'")]
    Syntax(String),
}

#[derive(Debug, Clone)]
enum Segment {
    Field(String),
    Index(usize),
    Wildcard,
}

fn parse(path: &str) -> Result<Vec<Segment>, PathError> {
    let mut rest = path.trim();
    if let Some(stripped) = rest.strip_prefix('$') {
        rest = stripped;
    }

    let mut segments = Vec::new();
    let mut chars = rest.char_indices().peekable();
    let mut field = String::new();

    let flush = |field: &mut String, segments: &mut Vec<Segment>| {
        if !field.is_empty() {
            segments.push(Segment::Field(std::mem::take(field)));
        }
    };

    while let Some((_, ch)) = chars.next() {
        match ch {
            '.' => flush(&mut field, &mut segments),
            '[' => {
                flush(&mut field, &mut segments);
                let mut bracket = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    bracket.push(c);
                }
                if !closed {
                    return Err(PathError::Syntax(path.to_string()));
                }
                let bracket = bracket.trim();
                if bracket == "*" {
                    segments.push(Segment::Wildcard);
                } else if let Ok(index) = bracket.parse::<usize>() {
                    segments.push(Segment::Index(index));
                } else {
                    let unquoted = bracket.trim_matches(|c| c == '\'' || c == '"');
                    segments.push(Segment::Field(unquoted.to_string()));
                }
            }
            _ => field.push(ch),
        }
    }
    flush(&mut field, &mut segments);

    Ok(segments)
}

fn apply_segments(value: &Value, segments: &[Segment]) -> Value {
    let Some((head, tail)) = segments.split_first() else {
        return value.clone();
    };

    match head {
        Segment::Field(name) => match value.get(name) {
            Some(next) => apply_segments(next, tail),
            None => Value::Null,
        },
        Segment::Index(index) => match value.get(*index) {
            Some(next) => apply_segments(next, tail),
            None => Value::Null,
        },
        Segment::Wildcard => match value.as_array() {
            Some(items) => Value::Array(items.iter().map(|item| apply_segments(item, tail)).collect()),
            None => Value::Null,
        },
    }
}

/// Selects a sub-value out of `value` per `path`.
///
/// # Errors
///
/// Returns [`PathError::Syntax`] if `path` has an unclosed `[`.
pub fn select(value: &Value, path: &str) -> Result<Value, PathError> {
    let segments = parse(path)?;
    Ok(apply_segments(value, &segments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selects_nested_field_with_leading_dollar() {
        let value = json!({"data": {"attributes": {"title": "Hello"}}});
        assert_eq!(select(&value, "$.data.attributes.title").unwrap(), json!("Hello"));
    }

    #[test]
    fn selects_array_index() {
        let value = json!({"data": [{"id": "1"}, {"id": "2"}]});
        assert_eq!(select(&value, "data[1].id").unwrap(), json!("2"));
    }

    #[test]
    fn wildcard_fans_out_over_array() {
        let value = json!({"data": [{"id": "1"}, {"id": "2"}]});
        assert_eq!(select(&value, "data[*].id").unwrap(), json!(["1", "2"]));
    }

    #[test]
    fn missing_field_resolves_to_null() {
        let value = json!({"data": {}});
        assert_eq!(select(&value, "data.attributes.title").unwrap(), Value::Null);
    }

    #[test]
    fn unclosed_bracket_is_a_syntax_error() {
        let value = json!({});
        assert!(select(&value, "data[0").is_err());
    }

    #[test]
    fn bracket_quoted_field_name() {
        let value = json!({"api-key": "blog_post"});
        assert_eq!(select(&value, "['api-key']").unwrap(), json!("blog_post"));
    }
}
