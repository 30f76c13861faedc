use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TRIGGERED: &str = "triggered";

/// PagerDuty incident document. Every field is optional and read on its own:
/// a missing or mistyped field becomes `None` without hiding the others.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IncidentPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub incident: Option<Incident>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Incident {
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub incident_number: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub html_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub trigger_summary_data: Option<TriggerSummaryData>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TriggerSummaryData {
    #[serde(default, deserialize_with = "lenient")]
    pub subject: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl IncidentPayload {
    /// Best-effort extraction. Only a document that is not an object at all
    /// becomes an empty payload.
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!("Incident payload did not match the expected shape: {}", e);
                IncidentPayload::default()
            }
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.status() == Some(TRIGGERED)
    }

    pub fn status(&self) -> Option<&str> {
        self.incident.as_ref()?.status.as_deref()
    }

    pub fn incident_number(&self) -> Option<u64> {
        self.incident.as_ref()?.incident_number
    }

    pub fn html_url(&self) -> Option<&str> {
        self.incident.as_ref()?.html_url.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.incident
            .as_ref()?
            .trigger_summary_data
            .as_ref()?
            .subject
            .as_deref()
    }
}
