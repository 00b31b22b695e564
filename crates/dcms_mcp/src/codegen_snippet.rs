//! Generates the tiny `runner.ts`-compatible script backing
//! `resource_action_{readonly,destructive}_method_execute` (SPEC_FULL.md
//! §C.2): the client is opaque from Rust, so the call itself happens in
//! the Node workspace, through the same default-export-takes-`client`
//! shape `dcms_workspace::Workspace::execute_script` already expects of
//! user scripts.

/// Builds the script text calling `client[namespace][method](...args)` and
/// printing its JSON-serialized result (or `null`) as the sole stdout
/// line, so the caller can parse stdout back into a `Value` and apply a
/// post-filter in Rust rather than in the generated script itself.
pub fn method_execute_script(namespace: &str, method: &str, args: &[serde_json::Value]) -> String {
    let args_json = serde_json::to_string(args).expect("args always serialize");
    format!(
        r#"export default async function run(client: any) {{
  const args: unknown[] = {args_json};
  const result = await client.{namespace}.{method}(...args);
  console.log(JSON.stringify(result === undefined ? null : result));
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn embeds_namespace_method_and_args() {
        let script = method_execute_script("items", "find", &[json!("abc123")]);
        assert!(script.contains("client.items.find(...args)"));
        assert!(script.contains(r#"const args: unknown[] = ["abc123"];"#));
    }

    #[test]
    fn empty_args_serialize_to_empty_array() {
        let script = method_execute_script("items", "list", &[]);
        assert!(script.contains("const args: unknown[] = [];"));
    }
}
