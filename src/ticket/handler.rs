use crate::api::jira::JiraClient;
use crate::config::settings::Settings;
use crate::errors::plain_message;
use crate::models::incident::IncidentPayload;
use crate::models::ticket::TicketResult;
use crate::ticket::builder::TicketBuilder;
use serde::Serialize;
use std::sync::Arc;

/// What happened to one incident.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HandleOutcome {
    NotTriggered,
    Malformed { reason: String },
    AlreadyExists,
    DuplicateCheckFailed { reason: String },
    Submitted(TicketResult),
}

impl HandleOutcome {
    pub fn ticket_key(&self) -> Option<&str> {
        match self {
            HandleOutcome::Submitted(result) => result.key(),
            _ => None,
        }
    }
}

/// Runs classify, duplicate check, build and submit for each incident.
///
/// Two deliveries of the same incident that arrive together can both pass the
/// duplicate check and create two tickets; nothing here coordinates them.
pub struct IncidentHandler {
    settings: Arc<Settings>,
    jira: JiraClient,
}

impl IncidentHandler {
    pub fn new(settings: Arc<Settings>) -> anyhow::Result<Self> {
        let jira = JiraClient::new(&settings)?;
        Ok(Self { settings, jira })
    }

    pub async fn handle(&self, payload: &IncidentPayload) -> HandleOutcome {
        if !payload.is_triggered() {
            tracing::debug!("Ignoring incident with status {:?}", payload.status());
            return HandleOutcome::NotTriggered;
        }

        if let Some(outcome) = self.check_duplicate(payload).await {
            return outcome;
        }

        let request = match TicketBuilder::new(&self.settings, payload) {
            Ok(builder) => builder.build(),
            Err(e) => {
                let reason = e.summary();
                tracing::warn!("Not creating a ticket: {}", reason);
                return HandleOutcome::Malformed { reason };
            }
        };

        let result = match self.jira.create_issue(&request).await {
            Ok(key) => {
                tracing::info!("Created {} for incident #{}", key, incident_label(payload));
                TicketResult::Created { key }
            }
            Err(e) => {
                let message = plain_message(&e);
                tracing::error!("Error occurred while creating ticket: {}", message);
                TicketResult::Failed { message }
            }
        };

        HandleOutcome::Submitted(result)
    }

    /// `None` means no ticket exists yet. Any error counts as "exists".
    async fn check_duplicate(&self, payload: &IncidentPayload) -> Option<HandleOutcome> {
        let Some(incident_number) = payload.incident_number() else {
            tracing::warn!("Failed to determine if ticket exists in Jira: incident has no number");
            return Some(HandleOutcome::DuplicateCheckFailed {
                reason: "incident has no incident_number".to_string(),
            });
        };

        match self
            .jira
            .count_incident_tickets(&self.settings.jira_project, incident_number)
            .await
        {
            Ok(0) => None,
            Ok(total) => {
                tracing::info!(
                    "A ticket for incident #{} already exists in Jira ({} found)",
                    incident_number,
                    total
                );
                Some(HandleOutcome::AlreadyExists)
            }
            Err(e) => {
                let reason = plain_message(&e);
                tracing::warn!("Failed to determine if ticket exists in Jira: {}", reason);
                Some(HandleOutcome::DuplicateCheckFailed { reason })
            }
        }
    }
}

fn incident_label(payload: &IncidentPayload) -> String {
    payload
        .incident_number()
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string())
}
