//! Renders each tool's structured result to the single markdown text
//! block the MCP transport actually sends. Structured data still goes out
//! alongside it via `CallToolResult::structured_content`.

use dcms_introspector::{ExpandedTypes, MethodSignature, Parameter};

pub fn code_fence(lang: &str, body: &str) -> String {
    format!("```{lang}\n{body}\n```")
}

pub fn render_resources(resources: &[crate::tools::discovery::ResourceSummary]) -> String {
    let mut out = String::from("# Resources\n\n");
    for r in resources {
        out.push_str(&format!(
            "- **{}** (`{}`): {} — {} action{}\n",
            r.namespace,
            r.json_api_type,
            if r.title.is_empty() { &r.json_api_type } else { &r.title },
            r.action_count,
            if r.action_count == 1 { "" } else { "s" }
        ));
    }
    out
}

pub fn render_resource(resource: &crate::tools::discovery::ResourceOutput) -> String {
    let mut out = format!("# {} (`{}`)\n\n{}\n\n## Actions\n\n", resource.title, resource.json_api_type, resource.description_markdown);
    for action in &resource.actions {
        out.push_str(&format!("- `{}` ({}): {}\n", action.rel, action.method, action.summary));
    }
    out
}

pub fn render_resource_action(result: &crate::tools::discovery::ResourceActionOutput) -> String {
    let mut out = format!("# {}.{}\n\n{}\n\n## Methods\n\n", result.resource, result.action, result.description_markdown);
    if result.methods.is_empty() {
        out.push_str("No client method binds to this action's documented URL. Check `resource_action_method` directly if you know the method name.\n");
    }
    for method in &result.methods {
        out.push_str(&format!("- `{}` → `{}`\n", method.method_name, method.return_type));
    }
    out
}

fn render_parameter(p: &Parameter) -> String {
    format!("  - `{}{}`: `{}`{}", p.name, if p.is_optional { "?" } else { "" }, p.type_repr, p.doc.as_deref().map(|d| format!(" — {d}")).unwrap_or_default())
}

pub fn render_method_signature(sig: &MethodSignature, expanded: &ExpandedTypes) -> String {
    let mut out = format!("# {}\n\n", sig.method_name);
    if let Some(doc) = &sig.doc {
        out.push_str(doc);
        out.push_str("\n\n");
    }
    if let Some(url) = &sig.action_url {
        out.push_str(&format!("Read more: {url}\n\n"));
    }
    out.push_str("## Parameters\n\n");
    for p in &sig.parameters {
        out.push_str(&render_parameter(p));
        out.push('\n');
    }
    out.push_str(&format!("\n## Returns\n\n`{}`\n\n", sig.return_type));

    if !sig.overloads.is_empty() {
        out.push_str("## Overloads\n\n");
        for (i, overload) in sig.overloads.iter().enumerate() {
            out.push_str(&format!("### Overload {}\n\n", i + 1));
            for p in &overload.parameters {
                out.push_str(&render_parameter(p));
                out.push('\n');
            }
            out.push_str(&format!("\nReturns `{}`\n\n", overload.return_type));
        }
    }

    out.push_str("## Referenced types\n\n");
    out.push_str(&code_fence("typescript", &expanded.expanded_types));
    out.push('\n');

    if !expanded.not_expanded_types.is_empty() {
        out.push_str("\n## Not expanded (raise `max_depth` or pass `expand_types` to drill in)\n\n");
        for name in &expanded.not_expanded_types {
            out.push_str(&format!("- `{name}`\n"));
        }
    }

    out
}

pub fn render_validation(validation: &dcms_script_store::ValidationResult) -> String {
    if validation.valid {
        return "Structural validation passed.\n".to_string();
    }
    let mut out = String::from("Structural validation failed:\n\n");
    for v in &validation.violations {
        out.push_str(&format!("- {:?} at {}:{}: {}\n", v.rule, v.line, v.column, v.message));
    }
    out
}

pub fn render_script_save(name: &str, content: &str, outcome: &crate::tools::scripts::SaveOutcome) -> String {
    let mut out = format!("# {name}\n\n");
    out.push_str(&code_fence("typescript", content));
    out.push_str("\n\n");
    out.push_str(&render_validation(&outcome.validation));

    if let Some(tsc) = &outcome.tsc_outcome {
        out.push_str(&format!(
            "\n## tsc --noEmit\n\n{}\n\n{}\n",
            if tsc.passed { "Passed." } else { "Failed." },
            code_fence("text", &tsc.output)
        ));
    }

    if let Some(execution) = &outcome.execution {
        out.push_str("\n## Execution\n\n");
        out.push_str(&render_execute_result("script", name, execution, None));
    }

    out
}

pub fn render_script_view(script: &dcms_script_store::Script) -> String {
    format!("# {}\n\n{}\n", script.name, code_fence("typescript", &script.content))
}

pub fn render_execute_result(
    resource: &str,
    method: &str,
    outcome: &dcms_workspace::ExecuteResult,
    filtered: Option<&serde_json::Value>,
) -> String {
    let mut out = format!("# {resource}.{method}\n\n");
    match outcome {
        dcms_workspace::ExecuteResult::Success { stdout, stderr } => {
            out.push_str("Executed successfully.\n\n");
            if let Some(value) = filtered {
                out.push_str("## Result\n\n");
                out.push_str(&code_fence("json", &serde_json::to_string_pretty(value).unwrap_or_default()));
                out.push('\n');
            }
            if !stdout.trim().is_empty() {
                out.push_str("\n## STDOUT\n\n");
                out.push_str(&code_fence("text", stdout));
                out.push('\n');
            }
            if !stderr.trim().is_empty() {
                out.push_str("\n## STDERR\n\n");
                out.push_str(&code_fence("text", stderr));
                out.push('\n');
            }
        }
        dcms_workspace::ExecuteResult::Timeout { stdout, stderr } => {
            out.push_str("Timed out.\n\n## STDOUT\n\n");
            out.push_str(&code_fence("text", stdout));
            out.push_str("\n\n## STDERR\n\n");
            out.push_str(&code_fence("text", stderr));
            out.push('\n');
        }
        dcms_workspace::ExecuteResult::ExitCode { code, stdout, stderr } => {
            out.push_str(&format!("Exited with status {code}.\n\n## STDOUT\n\n"));
            out.push_str(&code_fence("text", stdout));
            out.push_str("\n\n## STDERR\n\n");
            out.push_str(&code_fence("text", stderr));
            out.push('\n');
        }
        dcms_workspace::ExecuteResult::Error { message } => {
            out.push_str(&format!("Error: {message}\n"));
        }
    }
    out
}
