//! System settings repository.

use crate::error::MetadataResult;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for key/value system settings.
#[async_trait]
pub trait SettingsRepo: Send + Sync {
    /// Get a setting value.
    async fn get_setting(&self, key: &str) -> MetadataResult<Option<String>>;

    /// Insert or update a setting.
    async fn put_setting(
        &self,
        key: &str,
        value: &str,
        now: OffsetDateTime,
    ) -> MetadataResult<()>;
}
