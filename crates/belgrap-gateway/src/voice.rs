//! Voice-AI gateway client
//!
//! Thin request/response wrapper around the external voice provider: create
//! an outbound call, fetch its status, hang it up, list agents, and stream a
//! stored recording. No business logic lives here; non-2xx responses are
//! propagated as `AppError::VoiceGateway`.

use belgrap_core::config::VoiceGatewayConfig;
use belgrap_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use reqwest::{Client, ClientBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Client for the voice provider's REST API
#[derive(Clone)]
pub struct VoiceGatewayClient {
    http: Client,
    base_url: String,
    api_key: String,
    phone_number_id: String,
}

/// Request to create an outbound call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallRequest {
    /// Agent that runs the scenario script
    pub assistant_id: String,

    /// Outbound phone-number pool id
    pub phone_number_id: String,

    /// Call destination
    pub customer: CallCustomer,

    /// Template variables substituted into the script
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_overrides: Option<AssistantOverrides>,
}

/// Call destination
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCustomer {
    /// Destination number in international format
    pub number: String,

    /// Optional target name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Per-call agent overrides (name substitution etc.)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantOverrides {
    pub variable_values: HashMap<String, String>,
}

/// Call resource as returned by the provider
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCall {
    /// External call identifier
    pub id: String,

    /// Raw provider status string (e.g. `queued`, `inProgress`, `completed`)
    pub status: String,

    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,

    /// Provider-reported duration in seconds
    pub duration_seconds: Option<i64>,

    /// Cost of the call so far
    pub cost: Option<Decimal>,

    /// Conversation transcript
    pub transcript: Option<String>,

    /// URL of the stored recording
    pub recording_url: Option<String>,

    /// End reason (e.g. `customer-ended-call`, `error`)
    pub ended_reason: Option<String>,

    /// Heuristic quality fields
    pub analysis: Option<CallAnalysis>,
}

/// Heuristic quality fields attached to a finished call
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnalysis {
    /// Explicit voicemail flag
    pub voicemail_detected: Option<bool>,

    /// Whether a human interacted with the agent
    pub human_interaction: Option<bool>,

    /// Quality classification (`voicemail`, `failed`, ...)
    pub classification: Option<String>,

    /// Conversation-flow score on a 0-100 scale
    pub flow_score: Option<i32>,
}

/// Agent listed at the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAssistant {
    pub id: String,
    pub name: Option<String>,
}

impl VoiceGatewayClient {
    /// Create a new voice gateway client
    pub fn new(config: &VoiceGatewayConfig) -> AppResult<Self> {
        let http = ClientBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_max_idle_per_host(20)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| AppError::VoiceGateway(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            phone_number_id: config.phone_number_id.clone(),
        })
    }

    /// The configured phone-number pool id
    pub fn phone_number_id(&self) -> &str {
        &self.phone_number_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_error(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, "Voice gateway returned an error");
        AppError::VoiceGateway(format!("status {}: {}", status.as_u16(), body))
    }

    /// Create an outbound call
    #[instrument(skip(self, request))]
    pub async fn create_call(&self, request: &CreateCallRequest) -> AppResult<ProviderCall> {
        debug!(assistant_id = %request.assistant_id, "Creating outbound call");

        let response = self
            .http
            .post(self.url("/call"))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::VoiceGateway(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        response
            .json::<ProviderCall>()
            .await
            .map_err(|e| AppError::VoiceGateway(format!("Invalid response body: {}", e)))
    }

    /// Fetch a call by its external id
    #[instrument(skip(self))]
    pub async fn get_call(&self, call_id: &str) -> AppResult<ProviderCall> {
        let response = self
            .http
            .get(self.url(&format!("/call/{}", call_id)))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::VoiceGateway(format!("Request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::CallNotFound(call_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        response
            .json::<ProviderCall>()
            .await
            .map_err(|e| AppError::VoiceGateway(format!("Invalid response body: {}", e)))
    }

    /// Ask the provider to hang up a call
    #[instrument(skip(self))]
    pub async fn end_call(&self, call_id: &str) -> AppResult<()> {
        let response = self
            .http
            .patch(self.url(&format!("/call/{}", call_id)))
            .bearer_auth(&self.api_key)
            .json(&json!({ "status": "ended" }))
            .send()
            .await
            .map_err(|e| AppError::VoiceGateway(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        Ok(())
    }

    /// List the agents configured at the provider
    #[instrument(skip(self))]
    pub async fn list_assistants(&self) -> AppResult<Vec<ProviderAssistant>> {
        let response = self
            .http
            .get(self.url("/assistant"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::VoiceGateway(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        response
            .json::<Vec<ProviderAssistant>>()
            .await
            .map_err(|e| AppError::VoiceGateway(format!("Invalid response body: {}", e)))
    }

    /// Open a streaming response for a stored recording
    ///
    /// The caller proxies the body through to the end user; the audio bytes
    /// never land on disk here.
    #[instrument(skip(self))]
    pub async fn stream_recording(&self, recording_url: &str) -> AppResult<reqwest::Response> {
        let response = self
            .http
            .get(recording_url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::VoiceGateway(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        Ok(response)
    }
}

impl std::fmt::Debug for VoiceGatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceGatewayClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_call_request_wire_format() {
        let request = CreateCallRequest {
            assistant_id: "agent_1".to_string(),
            phone_number_id: "pool_1".to_string(),
            customer: CallCustomer {
                number: "+31612345678".to_string(),
                name: Some("Jan".to_string()),
            },
            assistant_overrides: Some(AssistantOverrides {
                variable_values: HashMap::from([(
                    "targetName".to_string(),
                    "Jan".to_string(),
                )]),
            }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["assistantId"], "agent_1");
        assert_eq!(json["phoneNumberId"], "pool_1");
        assert_eq!(json["customer"]["number"], "+31612345678");
        assert_eq!(json["assistantOverrides"]["variableValues"]["targetName"], "Jan");
    }

    #[test]
    fn test_provider_call_parses_camel_case() {
        let body = r#"{
            "id": "call_abc",
            "status": "inProgress",
            "startedAt": "2025-06-01T12:00:00Z",
            "durationSeconds": 12,
            "recordingUrl": "https://storage.example/rec.mp3",
            "analysis": {"voicemailDetected": false, "humanInteraction": true, "flowScore": 80}
        }"#;

        let call: ProviderCall = serde_json::from_str(body).unwrap();
        assert_eq!(call.id, "call_abc");
        assert_eq!(call.status, "inProgress");
        assert_eq!(call.duration_seconds, Some(12));
        let analysis = call.analysis.unwrap();
        assert_eq!(analysis.human_interaction, Some(true));
        assert_eq!(analysis.flow_score, Some(80));
    }

    #[test]
    fn test_optional_name_omitted_from_wire() {
        let customer = CallCustomer {
            number: "+31612345678".to_string(),
            name: None,
        };
        let json = serde_json::to_string(&customer).unwrap();
        assert!(!json.contains("name"));
    }
}
