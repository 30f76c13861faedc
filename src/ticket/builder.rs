use crate::config::settings::Settings;
use crate::errors::{Pd2JiraError, Result};
use crate::models::incident::IncidentPayload;
use crate::models::ticket::{IssueType, ProjectRef, TicketFields, TicketRequest};
use serde_json::{Map, Value};

const PLACEHOLDER_KEY: &str = "value";

/// Builds the create-issue body for one incident from the site settings.
pub struct TicketBuilder<'a> {
    settings: &'a Settings,
    incident_number: u64,
    subject: &'a str,
    html_url: &'a str,
}

impl<'a> TicketBuilder<'a> {
    pub fn new(settings: &'a Settings, payload: &'a IncidentPayload) -> Result<Self> {
        let incident_number = payload
            .incident_number()
            .ok_or(Pd2JiraError::MalformedIncident("incident_number"))?;
        let subject = payload
            .subject()
            .ok_or(Pd2JiraError::MalformedIncident("trigger_summary_data.subject"))?;
        let html_url = payload
            .html_url()
            .ok_or(Pd2JiraError::MalformedIncident("html_url"))?;

        Ok(Self {
            settings,
            incident_number,
            subject,
            html_url,
        })
    }

    pub fn build(&self) -> TicketRequest {
        let mut fields = TicketFields {
            project: Some(self.project()),
            summary: Some(self.summary()),
            description: Some(self.description()),
            issuetype: Some(self.issuetype()),
            labels: Some(self.labels()),
            priority: Some(self.priority()),
            components: self.components(),
            custom: Map::new(),
        };

        match self.custom_fields() {
            Ok(custom) => {
                for (key, value) in custom {
                    match value {
                        Ok(value) => {
                            fields.custom.insert(key, value);
                        }
                        Err(e) => {
                            tracing::warn!("Skipping custom field '{}': {:?}", key, e)
                        }
                    }
                }
            }
            Err(e) => tracing::warn!(
                "Could not set custom fields, please check the custom_fields setting: {:?}",
                e
            ),
        }

        TicketRequest { fields }
    }

    fn project(&self) -> ProjectRef {
        ProjectRef {
            key: self.settings.jira_project.clone(),
        }
    }

    fn summary(&self) -> String {
        format!("[PagerDuty] {}: {}", self.incident_number, self.subject)
    }

    fn description(&self) -> String {
        format!(
            "*CURRENTLY*\n\
             PagerDuty has triggered an alert\n\
             {}\n\
             \n\
             *PROBLEM*\n\
             {}\n\
             \n\
             *SOLUTION*\n\
             * Investigate the alert.\n\
             * Resolve the PagerDuty ticket\n\
             * Create future tickets as necessary",
            self.html_url, self.subject
        )
    }

    fn issuetype(&self) -> IssueType {
        IssueType {
            name: self.settings.issuetype.clone(),
        }
    }

    fn labels(&self) -> Vec<String> {
        self.settings.labels.clone()
    }

    fn priority(&self) -> Value {
        self.settings.priority.clone()
    }

    fn components(&self) -> Option<Value> {
        self.settings.components.clone()
    }

    /// One entry per configured field. The outer error means the whole
    /// setting is unusable; inner errors affect a single field.
    fn custom_fields(&self) -> Result<Vec<(String, Result<Value>)>> {
        let configured = match &self.settings.custom_fields {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(Pd2JiraError::CustomField(format!(
                    "custom_fields must be a table of field keys, got {}",
                    other
                )))
            }
        };

        Ok(configured
            .iter()
            .map(|(key, value)| (key.clone(), self.custom_field(key, value)))
            .collect())
    }

    fn custom_field(&self, key: &str, configured: &Value) -> Result<Value> {
        if key.trim().is_empty() {
            return Err(Pd2JiraError::CustomField("field key must not be empty".to_string()));
        }

        match configured {
            Value::Object(map) if map.contains_key(PLACEHOLDER_KEY) => {
                let word = first_word(self.subject);
                let mut filled = map.clone();
                filled.insert(PLACEHOLDER_KEY.to_string(), Value::String(word.to_string()));
                Ok(Value::Object(filled))
            }
            other => Ok(other.clone()),
        }
    }
}

/// Empty when the text has no words.
fn first_word(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}
