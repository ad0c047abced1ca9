use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use axum::body::Bytes;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::config::Settings;
use crate::core::time::unix_millis;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredObject {
    pub(crate) key: String,
    pub(crate) size: i64,
    pub(crate) sha256: String,
}

#[async_trait]
pub(crate) trait ImageStore: Send + Sync {
    async fn put(&self, key: &str, content_type: &str, bytes: Bytes)
        -> anyhow::Result<StoredObject>;
}

#[derive(Debug, Clone)]
pub(crate) struct StorageService {
    client: Client,
    bucket: String,
}

impl StorageService {
    /// `None` when no credentials are configured.
    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        if !settings.s3().is_configured() {
            return Ok(None);
        }

        let creds = Credentials::new(
            settings.s3().access_key.clone(),
            settings.s3().secret_key.clone(),
            None,
            None,
            "essay-grader-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(settings.s3().endpoint.clone())
            .region(aws_config::Region::new(settings.s3().region.clone()))
            .credentials_provider(creds)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config).force_path_style(true).build();
        let client = Client::from_conf(s3_config);

        Ok(Some(Self { client, bucket: settings.s3().bucket.clone() }))
    }
}

#[async_trait]
impl ImageStore for StorageService {
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> anyhow::Result<StoredObject> {
        let size = bytes.len() as i64;
        let sha256 = hex::encode(Sha256::digest(&bytes));

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await?;

        Ok(StoredObject { key: key.to_string(), size, sha256 })
    }
}

/// `{prefix}/{unix_millis}_{request_id}_{index}_{filename}`. The request id keeps
/// concurrent requests apart when sanitized names coincide.
pub(crate) fn object_key(
    prefix: &str,
    received_at: OffsetDateTime,
    request_id: Uuid,
    index: usize,
    filename: &str,
) -> String {
    format!(
        "{}/{}_{}_{}_{}",
        prefix,
        unix_millis(received_at),
        request_id,
        index,
        sanitized_filename(filename)
    )
}

pub(crate) fn sanitized_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect();

    let sanitized = sanitized.trim_start_matches('.');
    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn sanitized_filename_filters_disallowed_chars() {
        assert_eq!(sanitized_filename("essay (page 1)!.jpg"), "essaypage1.jpg");
        assert_eq!(sanitized_filename("../../etc/passwd"), "etcpasswd");
    }

    #[test]
    fn sanitized_filename_falls_back_on_empty() {
        assert_eq!(sanitized_filename("作文.jpg"), "jpg");
        assert_eq!(sanitized_filename("###"), "upload");
    }

    #[test]
    fn object_key_includes_timestamp_request_index_and_name() {
        let received_at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let request_id = Uuid::from_u128(0x1);
        assert_eq!(
            object_key("essays", received_at, request_id, 2, "page 3.png"),
            "essays/1700000000000_00000000-0000-0000-0000-000000000001_2_page3.png"
        );
        assert_ne!(
            object_key("essays", received_at, request_id, 0, "a.png"),
            object_key("essays", received_at, request_id, 1, "a.png")
        );
    }

    #[test]
    fn object_keys_differ_across_requests_with_same_time_index_and_name() {
        let received_at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let first = Uuid::from_u128(0x1);
        let second = Uuid::from_u128(0x2);

        assert_ne!(
            object_key("essays", received_at, first, 0, "image.jpg"),
            object_key("essays", received_at, second, 0, "image.jpg")
        );
        // Both names sanitize to "jpg".
        assert_ne!(
            object_key("essays", received_at, first, 0, "作文.jpg"),
            object_key("essays", received_at, second, 0, "照片.jpg")
        );
    }

    #[tokio::test]
    async fn storage_disabled_without_credentials() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        let storage = StorageService::from_settings(&settings).await.expect("storage");
        assert!(storage.is_none());
    }

    #[tokio::test]
    async fn storage_enabled_with_credentials() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        test_support::set_test_storage_env();

        let settings = Settings::load().expect("settings");
        let storage = StorageService::from_settings(&settings).await.expect("storage");
        assert!(storage.is_some());
    }
}
