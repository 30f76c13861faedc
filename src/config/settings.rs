use crate::errors::{Pd2JiraError, Result};
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "PD2JIRA";

/// Site settings, loaded once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub jira_url: String,
    pub jira_project: String,
    pub jira_username: String,
    pub jira_password: String,
    pub issuetype: String,
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Passed to Jira as-is, e.g. `{ name = "High" }`.
    pub priority: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Value>,
    /// Field key to literal value, or to a table with a `value` placeholder
    /// that is filled from the incident subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Value>,
}

impl Settings {
    /// Loads the TOML file at `path`, then applies `PD2JIRA__<KEY>` overrides.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Pd2JiraError::ConfigNotFound(path.to_path_buf()));
        }

        let config_str = std::fs::read_to_string(path)?;
        let mut settings = Self::parse(&config_str)?;

        settings.apply_overrides(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings = Self::parse(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    // Table values go to Jira verbatim, so key case must survive parsing.
    fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Pd2JiraError::ConfigInvalid(e.to_string()))
    }

    /// Overrides the scalar keys only. Tables such as `priority` or
    /// `custom_fields` always come from the file.
    fn apply_overrides(&mut self, env: Environment) -> Result<()> {
        let overrides = Config::builder().add_source(env).build()?;

        let strings = [
            ("jira_url", &mut self.jira_url),
            ("jira_project", &mut self.jira_project),
            ("jira_username", &mut self.jira_username),
            ("jira_password", &mut self.jira_password),
            ("issuetype", &mut self.issuetype),
        ];

        for (key, field) in strings {
            match overrides.get_string(key) {
                Ok(value) => {
                    tracing::debug!("{} set from the environment", key);
                    *field = value;
                }
                Err(ConfigError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        match overrides.get_int("request_timeout_secs") {
            Ok(secs) => {
                let secs = u64::try_from(secs).map_err(|_| {
                    Pd2JiraError::ConfigInvalid(format!(
                        "request_timeout_secs must not be negative (got {})",
                        secs
                    ))
                })?;
                self.request_timeout_secs = Some(secs);
            }
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("jira_url", &self.jira_url),
            ("jira_project", &self.jira_project),
            ("jira_username", &self.jira_username),
            ("jira_password", &self.jira_password),
            ("issuetype", &self.issuetype),
        ];

        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(Pd2JiraError::ConfigInvalid(format!("{} must not be empty", key)));
            }
        }

        if !self.jira_url.starts_with("http://") && !self.jira_url.starts_with("https://") {
            return Err(Pd2JiraError::ConfigInvalid(format!(
                "jira_url must start with http:// or https:// (got '{}')",
                self.jira_url
            )));
        }

        if self.priority.is_null() {
            return Err(Pd2JiraError::ConfigInvalid("priority must be set".to_string()));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn masked_password(&self) -> String {
        let secret = &self.jira_password;
        if secret.chars().count() <= 8 {
            return "********".to_string();
        }
        let head: String = secret.chars().take(4).collect();
        let tail: String = secret
            .chars()
            .skip(secret.chars().count() - 4)
            .collect();
        format!("{}***{}", head, tail)
    }

    /// Copy safe to print: the password is masked.
    pub fn redacted(&self) -> Settings {
        Settings {
            jira_password: self.masked_password(),
            ..self.clone()
        }
    }

    pub fn default_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| Pd2JiraError::Other("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".pd2jira").join("config.toml"))
    }
}
