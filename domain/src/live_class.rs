//! Scheduling the video meeting of a live class.

use crate::error::Error;
use crate::gateway::zoom::{Client, CreateMeetingRequest, MeetingHandle};
use chrono::Utc;
use log::*;
use meeting_auth::credentials::{CredentialStorage, Store, TenantScope};
use meeting_auth::oauth::token::TokenExchange;

/// Create a meeting with the tenant's own Zoom credentials and record it in the tenant's
/// usage log.
///
/// Once the meeting exists it is returned even if the usage entry cannot be written; that
/// failure is only logged.
pub async fn schedule_meeting<S: CredentialStorage, E: TokenExchange>(
    store: &Store<S>,
    client: &Client<E>,
    tenant_id: Option<&str>,
    request: &CreateMeetingRequest,
) -> Result<MeetingHandle, Error> {
    let scope = TenantScope::from_tenant_id(tenant_id);
    let tenant = store.resolve_credentials(&scope).await?;

    let meeting = client.create_meeting(&tenant, request).await?;

    if let Err(e) = store
        .record_usage(&scope, Utc::now().date_naive(), request.duration_minutes)
        .await
    {
        error!(
            "Meeting {} created for {} but usage was not recorded: {}",
            meeting.id, scope, e
        );
    }

    Ok(meeting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, InternalErrorKind};
    use crate::zoom_config;
    use chrono::DateTime;
    use meeting_auth::credentials::{CredentialUpdate, EncryptionKey, MemoryStorage};
    use meeting_auth::oauth::providers::zoom;
    use meeting_auth::oauth::token::TokenCache;
    use mockito::{Server, ServerGuard};
    use secrecy::SecretString;

    const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn store() -> Store<MemoryStorage> {
        Store::new(
            MemoryStorage::new(),
            EncryptionKey::from_hex(KEY_HEX).unwrap(),
        )
    }

    fn client(server: &ServerGuard) -> Client {
        let http_client = reqwest::Client::new();
        let tokens = TokenCache::new(zoom::Provider::new(
            &format!("{}/oauth/token", server.url()),
            http_client.clone(),
        ));
        Client::new(http_client, &format!("{}/v2", server.url()), tokens)
    }

    fn algebra() -> CreateMeetingRequest {
        let start = DateTime::parse_from_rfc3339("2025-01-10T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        CreateMeetingRequest::new("Algebra", start, 45)
    }

    async fn configure_tenant_a(store: &Store<MemoryStorage>) {
        zoom_config::put(
            store,
            Some("A"),
            CredentialUpdate {
                client_id: Some("a1".to_string()),
                client_secret: Some(SecretString::from("s3cr3t".to_string())),
                account_id: Some("acc1".to_string()),
                is_enabled: Some(true),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn configured_tenant_gets_meeting_and_usage_entry() {
        let mut server = Server::new_async().await;
        let token = server
            .mock("POST", "/oauth/token")
            .match_header("authorization", "Basic YTE6czNjcjN0")
            .with_status(200)
            .with_body(r#"{"access_token":"zoom-token","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;
        let _meeting = server
            .mock("POST", "/v2/users/me/meetings")
            .match_header("authorization", "Bearer zoom-token")
            .with_status(201)
            .with_body(
                r#"{"id":85746065432,"join_url":"https://zoom.us/j/85746065432","start_url":"https://zoom.us/s/85746065432","password":"123456","encrypted_password":"abc"}"#,
            )
            .expect(2)
            .create_async()
            .await;

        let store = store();
        configure_tenant_a(&store).await;

        let display = zoom_config::get(&store, Some("A")).await.unwrap();
        assert!(display.has_secret);
        assert_eq!(display.client_secret, zoom_config::MASKED_SECRET);

        let client = client(&server);
        let handle = schedule_meeting(&store, &client, Some("A"), &algebra())
            .await
            .unwrap();
        assert!(!handle.join_url.is_empty());

        let mut second = algebra();
        second.duration_minutes = 30;
        schedule_meeting(&store, &client, Some("A"), &second)
            .await
            .unwrap();

        let usage = zoom_config::get(&store, Some("A")).await.unwrap().usage_log;
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].date, Utc::now().date_naive());
        assert_eq!(usage[0].meeting_count, 2);
        assert_eq!(usage[0].total_minutes, 75);
        token.assert_async().await;
    }

    #[tokio::test]
    async fn unconfigured_tenant_is_config_error() {
        let server = Server::new_async().await;

        let result = schedule_meeting(&store(), &client(&server), Some("B"), &algebra()).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config)
        );
    }

    #[tokio::test]
    async fn disabled_tenant_is_config_error_even_with_unreadable_secret() {
        let server = Server::new_async().await;
        let original = store();
        configure_tenant_a(&original).await;
        zoom_config::put(
            &original,
            Some("A"),
            CredentialUpdate {
                is_enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let raw = original
            .storage()
            .raw(&TenantScope::Tenant("A".to_string()))
            .await
            .unwrap();

        let rotated = Store::new(
            MemoryStorage::new(),
            EncryptionKey::from_hex(&"ff".repeat(32)).unwrap(),
        );
        rotated.storage().insert_raw(raw).await;

        let result = schedule_meeting(&rotated, &client(&server), Some("A"), &algebra()).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config)
        );
    }

    #[tokio::test]
    async fn secret_encrypted_under_another_key_is_crypto_error() {
        let server = Server::new_async().await;
        let original = store();
        configure_tenant_a(&original).await;
        let raw = original
            .storage()
            .raw(&TenantScope::Tenant("A".to_string()))
            .await
            .unwrap();

        let rotated = Store::new(
            MemoryStorage::new(),
            EncryptionKey::from_hex(&"ff".repeat(32)).unwrap(),
        );
        rotated.storage().insert_raw(raw).await;

        let result = schedule_meeting(&rotated, &client(&server), Some("A"), &algebra()).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Crypto)
        );
    }
}
