use colored::*;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Pd2JiraError {
    // Configuration errors
    ConfigNotFound(PathBuf),
    ConfigInvalid(String),
    ConfigValidationFailed(String),

    // Jira errors
    JiraAuthFailed(u16),
    JiraApiError(u16, String),

    // Incident errors
    MalformedIncident(&'static str),
    CustomField(String),

    // Network errors
    NetworkError(String),

    // Generic error
    Other(String),
}

impl fmt::Display for Pd2JiraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Configuration errors
            Pd2JiraError::ConfigNotFound(path) => {
                write!(f, "{}\n", "Configuration not found".red().bold())?;
                write!(f, "   {}\n\n", format!("Looked in {}", path.display()).dimmed())?;
                write!(f, "   To fix:\n")?;
                write!(f, "   1. Create the file with your Jira settings\n")?;
                write!(f, "   2. Or point to one: {}", "pd2jira --config <path>".green())
            }
            Pd2JiraError::ConfigInvalid(msg) => {
                write!(f, "{}\n", "Invalid configuration".red().bold())?;
                write!(f, "   {}\n\n", msg.dimmed())?;
                write!(f, "   To fix:\n")?;
                write!(f, "   1. Check the required keys: jira_url, jira_project, jira_username,\n")?;
                write!(f, "      jira_password, issuetype, labels, priority\n")?;
                write!(f, "   2. Inspect the loaded values: {}", "pd2jira config show".green())
            }
            Pd2JiraError::ConfigValidationFailed(msg) => {
                write!(f, "{}\n", "Configuration validation failed".red().bold())?;
                write!(f, "   {}\n\n", msg.dimmed())?;
                write!(f, "   To fix:\n")?;
                write!(f, "   1. Check your Jira credentials are valid\n")?;
                write!(f, "   2. Verify network connectivity\n")?;
                write!(f, "   3. Test the connection: {}", "pd2jira config validate".green())
            }

            // Jira errors
            Pd2JiraError::JiraAuthFailed(status) => {
                write!(f, "{}\n", format!("Jira authentication failed ({})", status).red().bold())?;
                write!(f, "   {}\n\n", "The username or password was rejected".dimmed())?;
                write!(f, "   To fix:\n")?;
                write!(f, "   1. Check jira_username and jira_password\n")?;
                write!(f, "   2. Or override the secret: PD2JIRA__JIRA_PASSWORD")
            }
            Pd2JiraError::JiraApiError(status, msg) => {
                write!(f, "{}\n", format!("Jira API error ({})", status).red().bold())?;
                write!(f, "   {}\n\n", msg.dimmed())?;
                write!(f, "   Check the fields your project requires (custom_fields)")
            }

            // Incident errors
            Pd2JiraError::MalformedIncident(field) => {
                write!(f, "{}\n", "Incident payload is missing a field".red().bold())?;
                write!(f, "   {}", format!("Missing: incident.{}", field).dimmed())
            }
            Pd2JiraError::CustomField(msg) => {
                write!(f, "{}\n", "Could not set custom field".red().bold())?;
                write!(f, "   {}", msg.dimmed())
            }

            // Network errors
            Pd2JiraError::NetworkError(msg) => {
                write!(f, "{}\n", "Network error".red().bold())?;
                write!(f, "   {}\n\n", msg.dimmed())?;
                write!(f, "   To fix:\n")?;
                write!(f, "   1. Verify you can reach jira_url\n")?;
                write!(f, "   2. Raise request_timeout_secs if Jira is slow")
            }

            // Generic
            Pd2JiraError::Other(msg) => {
                write!(f, "{}\n", "Error".red().bold())?;
                write!(f, "   {}", msg.dimmed())
            }
        }
    }
}

impl std::error::Error for Pd2JiraError {}

impl Pd2JiraError {
    /// One line, no colors. Used where the error ends up in logs or JSON.
    pub fn summary(&self) -> String {
        match self {
            Pd2JiraError::ConfigNotFound(path) => {
                format!("configuration not found at {}", path.display())
            }
            Pd2JiraError::ConfigInvalid(msg) => format!("invalid configuration: {}", msg),
            Pd2JiraError::ConfigValidationFailed(msg) => {
                format!("configuration validation failed: {}", msg)
            }
            Pd2JiraError::JiraAuthFailed(status) => {
                format!("Jira authentication failed ({})", status)
            }
            Pd2JiraError::JiraApiError(status, msg) => format!("Jira API error ({}): {}", status, msg),
            Pd2JiraError::MalformedIncident(field) => {
                format!("incident payload is missing incident.{}", field)
            }
            Pd2JiraError::CustomField(msg) => format!("could not set custom field: {}", msg),
            Pd2JiraError::NetworkError(msg) => format!("network error: {}", msg),
            Pd2JiraError::Other(msg) => msg.clone(),
        }
    }
}

/// Plain rendering of an error chain, e.g. `context: cause`.
pub fn plain_message(err: &anyhow::Error) -> String {
    err.chain()
        .map(|cause| match cause.downcast_ref::<Pd2JiraError>() {
            Some(inner) => inner.summary(),
            None => cause.to_string(),
        })
        .collect::<Vec<_>>()
        .join(": ")
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Pd2JiraError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Pd2JiraError>() {
            Ok(inner) => inner,
            Err(err) => Pd2JiraError::Other(format!("{:#}", err)),
        }
    }
}

impl From<std::io::Error> for Pd2JiraError {
    fn from(err: std::io::Error) -> Self {
        Pd2JiraError::Other(err.to_string())
    }
}

impl From<config::ConfigError> for Pd2JiraError {
    fn from(err: config::ConfigError) -> Self {
        Pd2JiraError::ConfigInvalid(err.to_string())
    }
}

impl From<reqwest::Error> for Pd2JiraError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Pd2JiraError::NetworkError(err.to_string())
        } else if let Some(status) = err.status() {
            if status == 401 || status == 403 {
                Pd2JiraError::JiraAuthFailed(status.as_u16())
            } else {
                Pd2JiraError::JiraApiError(status.as_u16(), err.to_string())
            }
        } else {
            Pd2JiraError::Other(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Pd2JiraError>;
