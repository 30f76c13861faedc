use crate::config::settings::Settings;
use crate::errors::Pd2JiraError;
use crate::models::ticket::{CreatedIssue, SearchResults, TicketRequest};
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};

pub struct JiraClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl JiraClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.jira_url.trim_end_matches('/').to_string(),
            username: settings.jira_username.clone(),
            password: settings.jira_password.clone(),
        })
    }

    /// JQL matching tickets that mention the given incident.
    pub fn incident_jql(project: &str, incident_number: u64) -> String {
        format!("project={} and text~'pagerduty {}'", project, incident_number)
    }

    /// Number of tickets in `project` that reference the incident.
    pub async fn count_incident_tickets(&self, project: &str, incident_number: u64) -> Result<u64> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let jql = Self::incident_jql(project, incident_number);

        let response = self
            .client
            .get(&url)
            .query(&[("jql", jql.as_str())])
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(Pd2JiraError::from)
            .context("Failed to send search request to Jira")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(status, text).into());
        }

        let results = response
            .json::<SearchResults>()
            .await
            .context("Failed to parse Jira search response")?;

        Ok(results.total)
    }

    /// Creates the issue and returns its key. The raw response body is part
    /// of every error so that missing required fields are easy to spot.
    pub async fn create_issue(&self, request: &TicketRequest) -> Result<String> {
        let url = format!("{}/rest/api/2/issue/", self.base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(request)
            .send()
            .await
            .map_err(Pd2JiraError::from)
            .context("Failed to send create request to Jira")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read Jira create response")?;
        tracing::debug!("Jira create response ({}): {}", status, text);

        if !status.is_success() {
            return Err(match api_error(status, text.clone()) {
                err @ Pd2JiraError::JiraAuthFailed(_) => {
                    anyhow::Error::new(err).context(format!("Jira create response: {}", text))
                }
                err => err.into(),
            });
        }

        let created = serde_json::from_str::<CreatedIssue>(&text)
            .with_context(|| format!("Failed to parse Jira create response: {}", text))?;

        Ok(created.key)
    }
}

fn api_error(status: StatusCode, body: String) -> Pd2JiraError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Pd2JiraError::JiraAuthFailed(status.as_u16())
    } else {
        Pd2JiraError::JiraApiError(status.as_u16(), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::{ProjectRef, TicketFields};
    use mockito::Matcher;
    use serde_json::json;

    // base64("bot:secret")
    const AUTH: &str = "Basic Ym90OnNlY3JldA==";

    fn settings(url: &str) -> Settings {
        Settings::from_toml_str(&format!(
            r#"
jira_url = "{}/"
jira_project = "OPS"
jira_username = "bot"
jira_password = "secret"
issuetype = "Bug"
labels = ["pd"]
priority = {{ name = "High" }}
"#,
            url
        ))
        .unwrap()
    }

    fn request() -> TicketRequest {
        TicketRequest {
            fields: TicketFields {
                project: Some(ProjectRef { key: "OPS".to_string() }),
                summary: Some("[PagerDuty] 7: Boom".to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_incident_jql() {
        assert_eq!(
            JiraClient::incident_jql("OPS", 4521),
            "project=OPS and text~'pagerduty 4521'"
        );
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = JiraClient::new(&settings("https://jira.example.com")).unwrap();
        assert_eq!(client.base_url, "https://jira.example.com");
        assert_eq!(client.username, "bot");
    }

    #[tokio::test]
    async fn test_count_incident_tickets() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::UrlEncoded(
                "jql".into(),
                "project=OPS and text~'pagerduty 4521'".into(),
            ))
            .match_header("authorization", AUTH)
            .with_header("content-type", "application/json")
            .with_body(r#"{"startAt":0,"total":2,"issues":[]}"#)
            .create_async()
            .await;

        let client = JiraClient::new(&settings(&server.url())).unwrap();
        let total = client.count_incident_tickets("OPS", 4521).await.unwrap();

        assert_eq!(total, 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_count_without_total_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::Any)
            .with_body(r#"{"issues":[]}"#)
            .create_async()
            .await;

        let client = JiraClient::new(&settings(&server.url())).unwrap();
        assert!(client.count_incident_tickets("OPS", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_count_auth_failure() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let client = JiraClient::new(&settings(&server.url())).unwrap();
        let err = client.count_incident_tickets("OPS", 1).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Pd2JiraError>(),
            Some(Pd2JiraError::JiraAuthFailed(401))
        ));
    }

    #[tokio::test]
    async fn test_create_issue() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/api/2/issue/")
            .match_header("authorization", AUTH)
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "fields": {
                    "project": { "key": "OPS" },
                    "summary": "[PagerDuty] 7: Boom"
                }
            })))
            .with_status(201)
            .with_body(r#"{"id":"10000","key":"OPS-12","self":"x"}"#)
            .create_async()
            .await;

        let client = JiraClient::new(&settings(&server.url())).unwrap();
        let key = client.create_issue(&request()).await.unwrap();

        assert_eq!(key, "OPS-12");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_issue_error_includes_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/rest/api/2/issue/")
            .with_status(400)
            .with_body(r#"{"errors":{"customfield_10001":"Field is required."}}"#)
            .create_async()
            .await;

        let client = JiraClient::new(&settings(&server.url())).unwrap();
        let err = client.create_issue(&request()).await.unwrap_err();

        match err.downcast_ref::<Pd2JiraError>() {
            Some(Pd2JiraError::JiraApiError(400, body)) => {
                assert!(body.contains("customfield_10001"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_issue_without_key_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/rest/api/2/issue/")
            .with_status(201)
            .with_body(r#"{"id":"10000"}"#)
            .create_async()
            .await;

        let client = JiraClient::new(&settings(&server.url())).unwrap();
        let err = client.create_issue(&request()).await.unwrap_err();

        assert!(format!("{:#}", err).contains(r#"{"id":"10000"}"#));
    }

    #[tokio::test]
    async fn test_create_issue_auth_failure_keeps_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/rest/api/2/issue/")
            .with_status(403)
            .with_body(r#"{"errorMessages":["You do not have permission to create issues in this project."]}"#)
            .create_async()
            .await;

        let client = JiraClient::new(&settings(&server.url())).unwrap();
        let err = client.create_issue(&request()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Pd2JiraError>(),
            Some(Pd2JiraError::JiraAuthFailed(403))
        ));
        assert!(crate::errors::plain_message(&err).contains("do not have permission"));
    }
}
