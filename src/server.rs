use crate::models::incident::IncidentPayload;
use crate::ticket::handler::{HandleOutcome, IncidentHandler};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    handler: Arc<IncidentHandler>,
}

#[derive(Debug, Serialize)]
struct WebhookResponse {
    outcomes: Vec<HandleOutcome>,
}

pub fn router(handler: Arc<IncidentHandler>) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/health", get(health_check))
        .with_state(AppState { handler })
}

pub async fn serve(handler: Arc<IncidentHandler>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening for PagerDuty webhooks on {}", listener.local_addr()?);
    axum::serve(listener, router(handler)).await?;
    Ok(())
}

/// Splits a delivery into incident documents. PagerDuty v1 webhooks wrap
/// them as `{"messages": [{"data": {...}}]}`; anything else is one document.
pub fn incident_documents(body: Value) -> Vec<Value> {
    match body {
        Value::Object(mut map) if map.get("messages").is_some_and(Value::is_array) => {
            match map.remove("messages") {
                Some(Value::Array(messages)) => messages
                    .into_iter()
                    .map(|mut message| message.get_mut("data").map(Value::take).unwrap_or_default())
                    .collect(),
                _ => Vec::new(),
            }
        }
        other => vec![other],
    }
}

async fn handle_webhook(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut outcomes = Vec::new();

    for document in incident_documents(body) {
        let payload = IncidentPayload::from_value(document);
        outcomes.push(state.handler.handle(&payload).await);
    }

    let created = outcomes.iter().filter(|o| o.ticket_key().is_some()).count();
    info!("Handled {} incident(s), created {} ticket(s)", outcomes.len(), created);

    (StatusCode::OK, Json(WebhookResponse { outcomes }))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::Settings;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    fn handler(url: &str) -> Arc<IncidentHandler> {
        let settings = Settings::from_toml_str(&format!(
            r#"
jira_url = "{}"
jira_project = "OPS"
jira_username = "bot"
jira_password = "secret"
issuetype = "Bug"
labels = ["pd"]
priority = {{ name = "High" }}
"#,
            url
        ))
        .unwrap();
        Arc::new(IncidentHandler::new(Arc::new(settings)).unwrap())
    }

    async fn post_webhook(app: Router, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_single_document_passes_through() {
        let body = json!({ "incident": { "status": "triggered" } });
        assert_eq!(incident_documents(body.clone()), vec![body]);
    }

    #[test]
    fn test_messages_envelope_is_unwrapped() {
        let body = json!({
            "messages": [
                { "type": "incident.trigger", "data": { "incident": { "incident_number": 1 } } },
                { "type": "incident.resolve", "data": { "incident": { "incident_number": 2 } } },
                { "type": "ping" }
            ]
        });

        let documents = incident_documents(body);
        assert_eq!(documents.len(), 3);
        assert_eq!(documents[0]["incident"]["incident_number"], 1);
        assert_eq!(documents[1]["incident"]["incident_number"], 2);
        assert!(documents[2].is_null());
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(handler("http://127.0.0.1:9"));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_webhook_reports_outcomes() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/rest/api/2/search")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"total":0}"#)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/rest/api/2/issue/")
            .with_status(201)
            .with_body(r#"{"key":"OPS-5"}"#)
            .expect(1)
            .create_async()
            .await;

        let app = router(handler(&server.url()));
        let (status, body) = post_webhook(
            app,
            json!({
                "messages": [
                    { "data": { "incident": {
                        "status": "triggered",
                        "incident_number": 10,
                        "html_url": "https://x.pagerduty.com/incidents/A",
                        "trigger_summary_data": { "subject": "CPU hot" }
                    } } },
                    { "data": { "incident": { "status": "resolved", "incident_number": 9 } } }
                ]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "outcomes": [
                    { "outcome": "submitted", "result": "created", "key": "OPS-5" },
                    { "outcome": "not_triggered" }
                ]
            })
        );
        create.assert_async().await;
    }
}
