//! Zoom REST API client for scheduling live-class meetings.
//!
//! Bearer tokens come from a `meeting_auth` token cache keyed by the tenant's own credentials,
//! so each tenant's meetings are created in that tenant's Zoom account.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind};
use chrono::{DateTime, Utc};
use log::*;
use meeting_auth::credentials::TenantCredentials;
use meeting_auth::error::{credential_error, CredentialErrorKind};
use meeting_auth::http::ClientBuilder;
use meeting_auth::oauth::providers::zoom;
use meeting_auth::oauth::token::{TokenCache, TokenExchange};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service::config::Config;

/// Zoom meeting type for a meeting with a fixed start time.
const SCHEDULED_MEETING: u8 = 2;
const DEFAULT_TIMEZONE: &str = "UTC";

/// Caller-supplied parameters of a meeting.
#[derive(Debug, Clone)]
pub struct CreateMeetingRequest {
    pub topic: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    /// IANA timezone name shown to participants. Defaults to UTC.
    pub timezone: Option<String>,
    pub agenda: Option<String>,
}

impl CreateMeetingRequest {
    pub fn new(topic: &str, start_time: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            topic: topic.to_string(),
            start_time,
            duration_minutes,
            timezone: None,
            agenda: None,
        }
    }

    fn validate(&self) -> Result<(), Error> {
        if self.duration_minutes == 0 {
            return Err(Error::validation("duration must be greater than zero"));
        }
        if self.topic.trim().is_empty() {
            return Err(Error::validation("topic must not be empty"));
        }
        Ok(())
    }
}

/// The created meeting, as handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingHandle {
    pub id: u64,
    pub join_url: String,
    pub start_url: String,
    pub password: String,
    pub encrypted_password: String,
}

/// Request body for `POST /users/me/meetings`
#[derive(Debug, Serialize)]
struct MeetingPayload<'a> {
    topic: &'a str,
    #[serde(rename = "type")]
    meeting_type: u8,
    start_time: String,
    duration: u32,
    timezone: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    agenda: Option<&'a str>,
    settings: MeetingSettings,
}

#[derive(Debug, Serialize)]
struct MeetingSettings {
    host_video: bool,
    participant_video: bool,
    join_before_host: bool,
    waiting_room: bool,
    auto_recording: &'static str,
}

impl Default for MeetingSettings {
    fn default() -> Self {
        Self {
            host_video: true,
            participant_video: false,
            join_before_host: false,
            waiting_room: false,
            auto_recording: "none",
        }
    }
}

impl<'a> From<&'a CreateMeetingRequest> for MeetingPayload<'a> {
    fn from(request: &'a CreateMeetingRequest) -> Self {
        Self {
            topic: request.topic.trim(),
            meeting_type: SCHEDULED_MEETING,
            start_time: request.start_time.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            duration: request.duration_minutes,
            timezone: request.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE),
            agenda: request.agenda.as_deref(),
            settings: MeetingSettings::default(),
        }
    }
}

/// Response from creating a meeting
#[derive(Debug, Deserialize)]
struct MeetingResponse {
    id: u64,
    join_url: String,
    start_url: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    encrypted_password: String,
}

/// Error body, e.g. `{"code":300,"message":"Invalid meeting start time"}`
#[derive(Debug, Default, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

/// Zoom REST API client.
pub struct Client<E: TokenExchange = zoom::Provider> {
    http_client: reqwest::Client,
    api_base_url: String,
    tokens: TokenCache<E>,
}

impl Client<zoom::Provider> {
    /// Build a client from the service configuration: one HTTP client shared by the token
    /// exchange and the REST API, and a token cache using the configured safety margin.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let http_client = ClientBuilder::new()
            .with_timeout(std::time::Duration::from_secs(config.provider_timeout_secs))
            .build()?;

        let safety_margin = i64::try_from(config.token_safety_margin_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| Error::config("TOKEN_SAFETY_MARGIN_SECS is out of range"))?;
        let tokens = TokenCache::new(zoom::Provider::new(
            config.zoom_token_url(),
            http_client.clone(),
        ))
        .with_safety_margin(safety_margin);

        Ok(Self::new(http_client, config.zoom_api_base_url(), tokens))
    }
}

impl<E: TokenExchange> Client<E> {
    pub fn new(http_client: reqwest::Client, api_base_url: &str, tokens: TokenCache<E>) -> Self {
        Self {
            http_client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Create a scheduled meeting in the tenant's Zoom account.
    ///
    /// Disabled or incomplete configuration and invalid requests are rejected before any
    /// network call. A 401 from the API drops the cached token so the next call exchanges
    /// for a fresh one; the failed call itself is not retried.
    pub async fn create_meeting(
        &self,
        tenant: &TenantCredentials,
        request: &CreateMeetingRequest,
    ) -> Result<MeetingHandle, Error> {
        if !tenant.is_enabled {
            return Err(credential_error(
                CredentialErrorKind::Disabled,
                &format!("Zoom integration is disabled for {}", tenant.scope),
            )
            .into());
        }
        tenant.credentials.validate()?;
        request.validate()?;

        let token = self.tokens.get_token(&tenant.credentials).await?;

        let url = format!("{}/users/me/meetings", self.api_base_url);
        debug!(
            "Creating Zoom meeting for {} starting at {}",
            tenant.scope, request.start_time
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&MeetingPayload::from(request))
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                warn!("Failed to reach Zoom meetings API: {}", e);
                Error::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.tokens.invalidate(&tenant.credentials);
            }
            let body = response
                .json::<ApiErrorResponse>()
                .await
                .unwrap_or_default();
            let message = body
                .message
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
            warn!("Zoom meetings API error {}: {}", status, message);
            return Err(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::Provisioning {
                    status: status.as_u16(),
                    message,
                }),
            });
        }

        let meeting: MeetingResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            warn!("Failed to parse Zoom meeting response: {}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                    "Invalid response from Zoom".to_string(),
                )),
            }
        })?;
        info!("Created Zoom meeting {} for {}", meeting.id, tenant.scope);

        Ok(MeetingHandle {
            id: meeting.id,
            join_url: meeting.join_url,
            start_url: meeting.start_url,
            password: meeting.password,
            encrypted_password: meeting.encrypted_password,
        })
    }
}
