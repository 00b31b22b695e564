//! Static and semi-static file contents materialized into a freshly
//! initialized workspace.

/// Version pinned for `@datocms/cma-client-node` in the generated
/// `package.json`. Overridable via `DCMS_CLIENT_VERSION` so a deployment can
/// track whatever version the operator has vetted without a rebuild.
pub fn client_package_version() -> String {
    std::env::var("DCMS_CLIENT_VERSION").unwrap_or_else(|_| "^3.3.0".to_string())
}

pub fn package_json() -> String {
    format!(
        r#"{{
  "name": "dcms-mcp-workspace",
  "private": true,
  "type": "module",
  "dependencies": {{
    "@datocms/cma-client-node": "{}"
  }},
  "devDependencies": {{
    "typescript": "^5.6.0",
    "tsx": "^4.19.0",
    "@types/node": "^22.0.0"
  }}
}}
"#,
        client_package_version()
    )
}

pub fn tsconfig_json() -> &'static str {
    r#"{
  "compilerOptions": {
    "target": "ES2020",
    "module": "nodenext",
    "moduleResolution": "nodenext",
    "strict": true,
    "esModuleInterop": true,
    "skipLibCheck": true,
    "outDir": "dist"
  },
  "include": ["scripts/**/*.ts"]
}
"#
}

pub fn runner_ts() -> &'static str {
    r#"import { buildClient } from "@datocms/cma-client-node";
import { pathToFileURL } from "node:url";
import path from "node:path";

async function main() {
  const apiToken = process.env.DATOCMS_API_TOKEN;
  if (!apiToken) {
    throw new Error("DATOCMS_API_TOKEN is not set");
  }

  const client = buildClient({
    apiToken,
    environment: process.env.DATOCMS_ENVIRONMENT,
    baseUrl: process.env.DATOCMS_BASE_URL,
  });

  const scriptPath = process.argv[2];
  if (!scriptPath) {
    throw new Error("usage: tsx runner.ts <script>");
  }

  const moduleUrl = pathToFileURL(path.resolve(scriptPath)).href;
  const mod = await import(moduleUrl);
  const fn = mod.default;
  if (typeof fn !== "function") {
    throw new Error("script has no default export function");
  }

  await fn(client);
}

main().catch((err) => {
  console.error(err instanceof Error ? (err.stack ?? err.message) : String(err));
  process.exitCode = 1;
});
"#
}
