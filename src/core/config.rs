use std::env;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::Url;

use crate::ai::prompt::{self, GREETING};
use crate::ai::retry::RetryPolicy;

const DEFAULT_LLM_HOST: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_LLM_MODEL: &str = "gemini-2.5-flash-preview-09-2025";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub completion_url: String,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub request_timeout: Duration,
    pub system_instruction: String,
    pub greeting: String,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup so callers (and
    /// tests) don't need to touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let completion_url = match lookup("FOLIO_COMPLETION_URL") {
            Some(url) => url,
            None => {
                let host = lookup("FOLIO_LLM_HOST").unwrap_or_else(|| DEFAULT_LLM_HOST.to_string());
                let model =
                    lookup("FOLIO_LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string());
                completion_url(&host, &model, lookup("FOLIO_API_KEY").as_deref())?
            }
        };
        let max_retries = parse_var(&lookup, "FOLIO_MAX_RETRIES")?.unwrap_or(3);
        let base_delay_ms = parse_var(&lookup, "FOLIO_BASE_DELAY_MS")?.unwrap_or(1000);
        let request_timeout_secs = parse_var(&lookup, "FOLIO_REQUEST_TIMEOUT_SECS")?.unwrap_or(60);

        // The persona file is used verbatim, it is not a template
        let system_instruction = match lookup("FOLIO_SYSTEM_INSTRUCTION_PATH") {
            Some(path) => fs::read_to_string(&path)
                .with_context(|| format!("Failed to read system instruction from {}", path))?,
            None => prompt::system_instruction()?,
        };
        let greeting = lookup("FOLIO_GREETING").unwrap_or_else(|| GREETING.to_string());
        // The greeting becomes the first turn sent with every request
        if greeting.trim().is_empty() {
            return Err(anyhow!("Invalid value for FOLIO_GREETING: greeting is blank"));
        }

        Ok(Self {
            completion_url,
            max_retries,
            base_delay_ms,
            request_timeout: Duration::from_secs(request_timeout_secs),
            system_instruction,
            greeting,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_delay_ms))
    }
}

/// Composes the `generateContent` URL for a model. The key is only
/// ever carried inside the URL handed to the transport.
pub fn completion_url(host: &str, model: &str, api_key: Option<&str>) -> Result<String> {
    let base = format!(
        "{}/v1beta/models/{}:generateContent",
        host.trim_end_matches('/'),
        model
    );
    let url = match api_key {
        Some(key) => Url::parse_with_params(&base, &[("key", key)]),
        None => Url::parse(&base),
    }
    .map_err(|e| anyhow!("Invalid completion URL {}: {}", base, e))?;

    Ok(url.to_string())
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow!("Invalid value for {}: {:?} ({})", key, raw, e))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn it_uses_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(
            config.completion_url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-09-2025:generateContent"
        );
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.greeting, GREETING);
        assert!(config.system_instruction.contains("Port-folio Bot"));
    }

    #[test]
    fn it_appends_the_api_key_as_a_query_param() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("FOLIO_LLM_HOST", "http://localhost:8080/"),
            ("FOLIO_LLM_MODEL", "test-model"),
            ("FOLIO_API_KEY", "abc 123"),
        ]))
        .unwrap();

        assert_eq!(
            config.completion_url,
            "http://localhost:8080/v1beta/models/test-model:generateContent?key=abc+123"
        );
    }

    #[test]
    fn it_prefers_an_explicit_completion_url() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("FOLIO_COMPLETION_URL", "http://proxy.local/chat"),
            ("FOLIO_API_KEY", "ignored"),
        ]))
        .unwrap();

        assert_eq!(config.completion_url, "http://proxy.local/chat");
    }

    #[test]
    fn it_rejects_unparseable_numbers() {
        let err = AppConfig::from_lookup(lookup_from(&[("FOLIO_MAX_RETRIES", "lots")]))
            .unwrap_err();

        assert!(err.to_string().contains("FOLIO_MAX_RETRIES"));
    }

    #[test]
    fn it_rejects_a_blank_greeting() {
        for blank in ["", "  \n\t"] {
            let err = AppConfig::from_lookup(lookup_from(&[("FOLIO_GREETING", blank)]))
                .unwrap_err();

            assert!(err.to_string().contains("FOLIO_GREETING"));
        }
    }

    #[test]
    fn it_uses_a_configured_greeting() {
        let config =
            AppConfig::from_lookup(lookup_from(&[("FOLIO_GREETING", "Welcome!")])).unwrap();

        assert_eq!(config.greeting, "Welcome!");
    }

    #[test]
    fn it_builds_the_retry_policy() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("FOLIO_MAX_RETRIES", "5"),
            ("FOLIO_BASE_DELAY_MS", "250"),
        ]))
        .unwrap();
        let policy = config.retry_policy();

        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay_before(1), Duration::from_millis(250));
    }

    #[test]
    fn it_reads_the_system_instruction_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "You only talk about boats.").unwrap();
        let path = file.path().display().to_string();

        let config = AppConfig::from_lookup(lookup_from(&[(
            "FOLIO_SYSTEM_INSTRUCTION_PATH",
            path.as_str(),
        )]))
        .unwrap();

        assert_eq!(config.system_instruction, "You only talk about boats.");
    }

    #[test]
    fn it_errors_on_a_missing_system_instruction_file() {
        let result = AppConfig::from_lookup(lookup_from(&[(
            "FOLIO_SYSTEM_INSTRUCTION_PATH",
            "/definitely/not/here.txt",
        )]));

        assert!(result.is_err());
    }
}
