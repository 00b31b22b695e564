//! String values that may embed a secret to be resolved lazily.
//!
//! Supports `${env:VAR}` and `${command:...}` interpolation inside an
//! otherwise-plain string. There is no `keychain` variant, and no `keyring`
//! dependency, because nothing in this system ever needs an OS keychain —
//! the DatoCMS API token is supplied via `DATOCMS_API_TOKEN` or a config
//! file, never the system credential store. `env` and `command` are kept
//! because both are legitimate ways to avoid writing a bearer token in
//! plaintext into `dcms.json`.

use std::fmt::Display;
use std::process::Stdio;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct SecretString {
    parts: Vec<SecretPart>,
}

impl SecretString {
    pub fn new_plain(value: &str) -> Self {
        Self {
            parts: vec![SecretPart::Plain(value.into())],
        }
    }

    /// Parse secret string parts from string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input contains an unclosed or unmatched `${...}`.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut chars = input.char_indices().peekable();
        let mut current_plain = String::new();

        while let Some((i, ch)) = chars.next() {
            if ch == '$' {
                if let Some(&(_, '{')) = chars.peek() {
                    chars.next();

                    if !current_plain.is_empty() {
                        parts.push(SecretPart::Plain(current_plain.clone()));
                        current_plain.clear();
                    }

                    let mut secret_content = String::new();
                    let mut found_closing = false;
                    for (_, ch) in chars.by_ref() {
                        if ch == '}' {
                            found_closing = true;
                            break;
                        }
                        secret_content.push(ch);
                    }

                    if !found_closing {
                        anyhow::bail!("Unclosed '${{' at position {i}");
                    }
                    if secret_content.is_empty() {
                        anyhow::bail!("Empty secret '${{}}' at position {i}");
                    }

                    parts.push(SecretPart::Secret(Self::parse_secret(&secret_content, i)?));
                } else {
                    current_plain.push(ch);
                }
            } else if ch == '}' {
                anyhow::bail!("Unmatched '}}' at position {i}");
            } else {
                current_plain.push(ch);
            }
        }

        if !current_plain.is_empty() {
            parts.push(SecretPart::Plain(current_plain));
        }
        if parts.is_empty() {
            parts.push(SecretPart::Plain(String::new()));
        }

        Ok(Self { parts })
    }

    fn parse_secret(content: &str, pos: usize) -> Result<AuthSecret> {
        if let Some((prefix, value)) = content.split_once(':') {
            let value = value.trim();
            if value.is_empty() {
                anyhow::bail!("Empty secret value at position {pos}");
            }
            match prefix.trim() {
                "env" => Ok(AuthSecret::Env(value.to_string())),
                "command" => Ok(AuthSecret::Command(value.to_string())),
                other => anyhow::bail!("Unknown secret type '{other}' at position {pos}"),
            }
        } else {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                anyhow::bail!("Empty secret value at position {pos}");
            }
            Ok(AuthSecret::Env(trimmed.to_string()))
        }
    }

    pub fn has_secrets(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, SecretPart::Secret(_)))
    }

    /// Returns the resolved string.
    ///
    /// # Errors
    ///
    /// Returns an error if any embedded secret cannot be resolved (missing
    /// env var, failing command).
    pub async fn resolve(&self) -> Result<String> {
        let mut resolved = String::new();
        for p in &self.parts {
            let val = match p {
                SecretPart::Plain(p) => p.clone(),
                SecretPart::Secret(secret) => secret.resolve().await?,
            };
            resolved.push_str(&val);
        }
        Ok(resolved)
    }
}

impl Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let val = self.parts.iter().map(ToString::to_string).collect::<String>();
        write!(f, "{val}")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SecretString::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl FromStr for SecretString {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SecretString::parse(s)
    }
}

#[derive(Debug, Clone)]
pub enum SecretPart {
    Plain(String),
    Secret(AuthSecret),
}

impl Display for SecretPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretPart::Plain(s) => write!(f, "{s}"),
            SecretPart::Secret(secret) => write!(f, "${{{secret}}}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AuthSecret {
    /// Environment variable (matches `${env:VAR}`).
    Env(String),
    /// Shell command whose trimmed stdout is the secret (matches `${command:...}`).
    Command(String),
}

impl AuthSecret {
    /// # Errors
    ///
    /// Returns an error if the environment variable is unset, or the command
    /// fails / exits non-zero / produces no output.
    pub async fn resolve(&self) -> Result<String> {
        match self {
            AuthSecret::Env(var) => {
                std::env::var(var).with_context(|| format!("Environment variable '{var}' not found"))
            }
            AuthSecret::Command(cmd) => {
                let output = Command::new("sh")
                    .arg("-c")
                    .arg(cmd)
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .spawn()
                    .context(format!("Failed to spawn auth command: `{cmd}`"))?
                    .wait_with_output()
                    .await
                    .context(format!("Failed to wait for auth command: `{cmd}`"))?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    anyhow::bail!("Auth command failed: `{cmd}`, stderr: {}", stderr.trim());
                }
                let token = String::from_utf8(output.stdout)
                    .context(format!("Auth command stdout is not valid UTF-8: `{cmd}`"))?
                    .trim()
                    .to_string();
                if token.is_empty() {
                    anyhow::bail!("Auth command returned empty output: `{cmd}`");
                }
                Ok(token)
            }
        }
    }
}

impl Display for AuthSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let val = match self {
            AuthSecret::Env(var) => format!("env:{var}"),
            AuthSecret::Command(cmd) => format!("command:{cmd}"),
        };
        write!(f, "{val}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_text() {
        let result = SecretString::parse("plain text").unwrap();
        assert_eq!(result.to_string(), "plain text");
        assert!(!result.has_secrets());
    }

    #[test]
    fn parses_env_interpolation() {
        let result = SecretString::parse("Bearer ${env:TOKEN}").unwrap();
        assert!(result.has_secrets());
        assert_eq!(result.to_string(), "Bearer ${env:TOKEN}");
    }

    #[test]
    fn rejects_unclosed_brace() {
        assert!(SecretString::parse("Bearer ${TOKEN").is_err());
    }

    #[test]
    fn rejects_unmatched_closing_brace() {
        assert!(SecretString::parse("Bearer }").is_err());
    }

    #[tokio::test]
    async fn resolves_env_var() {
        unsafe {
            std::env::set_var("DCMS_TEST_TOKEN_VAR", "abc123");
        }
        let secret = AuthSecret::Env("DCMS_TEST_TOKEN_VAR".into());
        assert_eq!(secret.resolve().await.unwrap(), "abc123");
        unsafe {
            std::env::remove_var("DCMS_TEST_TOKEN_VAR");
        }
    }

    #[tokio::test]
    async fn missing_env_var_errors() {
        let secret = AuthSecret::Env("DCMS_TEST_MISSING_XYZ".into());
        assert!(secret.resolve().await.is_err());
    }

    #[tokio::test]
    async fn resolves_command() {
        let secret = AuthSecret::Command("printf 'from-command'".into());
        assert_eq!(secret.resolve().await.unwrap(), "from-command");
    }
}
