//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{
    AuditRepo, BlobRepo, FileRepo, SettingsRepo, ShareRepo, UploadRepo, UserRepo,
};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// SQLite schema (embedded).
const SQLITE_SCHEMA: &str = include_str!("sqlite_schema.sql");

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore:
    UserRepo + BlobRepo + FileRepo + ShareRepo + UploadRepo + AuditRepo + SettingsRepo + Send + Sync
{
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
///
/// The reference implementation, used in tests and single-node
/// deployments. Production multi-connection deployments use PostgreSQL.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MetadataError::Config(format!("cannot create db directory: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection avoids
            // persistent "database is locked" failures under axum concurrency.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SQLITE_SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.message().contains("UNIQUE constraint"),
        _ => false,
    }
}

// Implement all the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl UserRepo for SqliteStore {
        async fn create_user(&self, user: &UserRow) -> MetadataResult<()> {
            let result = sqlx::query(
                r#"
                INSERT INTO users (
                    user_id, email, password_hash, role, status,
                    storage_quota, storage_used, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(user.user_id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.role)
            .bind(&user.status)
            .bind(user.storage_quota)
            .bind(user.storage_used)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => Ok(()),
                Err(e) if is_unique_violation(&e) => Err(MetadataError::AlreadyExists(format!(
                    "email '{}' already registered",
                    user.email
                ))),
                Err(e) => Err(e.into()),
            }
        }

        async fn get_user(&self, user_id: Uuid) -> MetadataResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_user_by_email(&self, email: &str) -> MetadataResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn count_users(&self) -> MetadataResult<u64> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(&self.pool)
                .await?;
            Ok(count as u64)
        }
    }

    #[async_trait]
    impl BlobRepo for SqliteStore {
        async fn get_blob(&self, hash: &str) -> MetadataResult<Option<BlobRow>> {
            let row = sqlx::query_as::<_, BlobRow>("SELECT * FROM file_blobs WHERE hash = ?")
                .bind(hash)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn blob_exists(&self, hash: &str) -> MetadataResult<bool> {
            let row: Option<(i32,)> =
                sqlx::query_as("SELECT 1 FROM file_blobs WHERE hash = ?")
                    .bind(hash)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row.is_some())
        }

        async fn set_blob_banned(
            &self,
            hash: &str,
            banned: bool,
            reason: Option<&str>,
        ) -> MetadataResult<()> {
            let result =
                sqlx::query("UPDATE file_blobs SET is_banned = ?, ban_reason = ? WHERE hash = ?")
                    .bind(banned)
                    .bind(reason)
                    .bind(hash)
                    .execute(&self.pool)
                    .await?;
            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("blob {hash} not found")));
            }
            Ok(())
        }

        async fn get_orphan_blobs(&self, limit: u32) -> MetadataResult<Vec<BlobRow>> {
            let rows = sqlx::query_as::<_, BlobRow>(
                "SELECT * FROM file_blobs WHERE ref_count <= 0 ORDER BY created_at LIMIT ?",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn delete_orphan_blob(&self, hash: &str) -> MetadataResult<bool> {
            // Guarded delete: a logical copy racing with the orphan scan
            // bumps ref_count first and the delete then matches no row.
            let result =
                sqlx::query("DELETE FROM file_blobs WHERE hash = ? AND ref_count <= 0")
                    .bind(hash)
                    .execute(&self.pool)
                    .await?;
            Ok(result.rows_affected() > 0)
        }
    }

    #[async_trait]
    impl FileRepo for SqliteStore {
        async fn get_file(&self, file_id: Uuid) -> MetadataResult<Option<FileRow>> {
            let row =
                sqlx::query_as::<_, FileRow>("SELECT * FROM file_records WHERE file_id = ?")
                    .bind(file_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn get_live_file(
            &self,
            file_id: Uuid,
            user_id: Uuid,
        ) -> MetadataResult<Option<FileRow>> {
            let row = sqlx::query_as::<_, FileRow>(
                "SELECT * FROM file_records WHERE file_id = ? AND user_id = ? AND deleted_at IS NULL",
            )
            .bind(file_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn list_files(
            &self,
            user_id: Uuid,
            limit: u32,
            offset: u32,
        ) -> MetadataResult<Vec<FileRow>> {
            let rows = sqlx::query_as::<_, FileRow>(
                r#"
                SELECT * FROM file_records
                WHERE user_id = ? AND deleted_at IS NULL
                ORDER BY created_at DESC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn count_files(&self, user_id: Uuid) -> MetadataResult<u64> {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM file_records WHERE user_id = ? AND deleted_at IS NULL",
            )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
            Ok(count as u64)
        }

        async fn count_live_files_owned(
            &self,
            file_ids: &[Uuid],
            user_id: Uuid,
        ) -> MetadataResult<u64> {
            if file_ids.is_empty() {
                return Ok(0);
            }

            let placeholders: Vec<&str> = file_ids.iter().map(|_| "?").collect();
            let query = format!(
                "SELECT COUNT(*) FROM file_records \
                 WHERE user_id = ? AND deleted_at IS NULL AND file_id IN ({})",
                placeholders.join(", ")
            );

            let mut query_builder = sqlx::query_scalar::<_, i64>(&query).bind(user_id);
            for file_id in file_ids {
                query_builder = query_builder.bind(file_id);
            }

            let count = query_builder.fetch_one(&self.pool).await?;
            Ok(count as u64)
        }

        async fn create_file_for_blob(&self, file: &FileRow) -> MetadataResult<()> {
            let mut tx = self.pool.begin().await?;

            let blob = sqlx::query_as::<_, BlobRow>("SELECT * FROM file_blobs WHERE hash = ?")
                .bind(&file.blob_hash)
                .fetch_optional(&mut *tx)
                .await?;

            let blob = blob.ok_or_else(|| {
                MetadataError::NotFound(format!("blob {} not found", file.blob_hash))
            })?;
            if blob.is_banned {
                return Err(MetadataError::Constraint(format!(
                    "blob {} is banned",
                    file.blob_hash
                )));
            }

            sqlx::query("UPDATE file_blobs SET ref_count = ref_count + 1 WHERE hash = ?")
                .bind(&file.blob_hash)
                .execute(&mut *tx)
                .await?;

            insert_file_record(&mut tx, file).await?;
            charge_storage(&mut tx, file.user_id, file.size, file.created_at).await?;

            tx.commit().await?;
            Ok(())
        }

        async fn create_blob_with_file(
            &self,
            blob: &BlobRow,
            file: &FileRow,
        ) -> MetadataResult<()> {
            let mut tx = self.pool.begin().await?;

            let result = sqlx::query(
                r#"
                INSERT INTO file_blobs (
                    hash, store_path, encrypted_dek, size, ref_count,
                    is_banned, ban_reason, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&blob.hash)
            .bind(&blob.store_path)
            .bind(&blob.encrypted_dek)
            .bind(blob.size)
            .bind(blob.ref_count)
            .bind(blob.is_banned)
            .bind(&blob.ban_reason)
            .bind(blob.created_at)
            .execute(&mut *tx)
            .await;

            if let Err(e) = result {
                if is_unique_violation(&e) {
                    // Another uploader committed this hash first; the caller
                    // re-enters the logical-copy path.
                    return Err(MetadataError::AlreadyExists(blob.hash.clone()));
                }
                return Err(e.into());
            }

            insert_file_record(&mut tx, file).await?;
            charge_storage(&mut tx, file.user_id, file.size, file.created_at).await?;

            tx.commit().await?;
            Ok(())
        }

        async fn soft_delete_file(
            &self,
            file_id: Uuid,
            user_id: Uuid,
            now: OffsetDateTime,
        ) -> MetadataResult<FileRow> {
            let mut tx = self.pool.begin().await?;

            let result = sqlx::query(
                r#"
                UPDATE file_records SET deleted_at = ?
                WHERE file_id = ? AND user_id = ? AND deleted_at IS NULL
                "#,
            )
            .bind(now)
            .bind(file_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!(
                    "file {file_id} not found"
                )));
            }

            let file =
                sqlx::query_as::<_, FileRow>("SELECT * FROM file_records WHERE file_id = ?")
                    .bind(file_id)
                    .fetch_one(&mut *tx)
                    .await?;

            sqlx::query(
                "UPDATE file_blobs SET ref_count = MAX(0, ref_count - 1) WHERE hash = ?",
            )
            .bind(&file.blob_hash)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE users SET storage_used = MAX(0, storage_used - ?), updated_at = ? WHERE user_id = ?",
            )
            .bind(file.size)
            .bind(now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(file)
        }

        async fn purge_tombstones(&self, older_than: OffsetDateTime) -> MetadataResult<u64> {
            // Refcounts were released at soft-delete time; this only removes
            // the lingering rows (share_files joins cascade).
            let result = sqlx::query(
                "DELETE FROM file_records WHERE deleted_at IS NOT NULL AND deleted_at < ?",
            )
            .bind(older_than)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected())
        }
    }

    /// Insert a file record inside a transaction.
    async fn insert_file_record(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        file: &FileRow,
    ) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO file_records (
                file_id, user_id, blob_hash, filename, size,
                created_at, expires_at, deleted_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(file.file_id)
        .bind(file.user_id)
        .bind(&file.blob_hash)
        .bind(&file.filename)
        .bind(file.size)
        .bind(file.created_at)
        .bind(file.expires_at)
        .bind(file.deleted_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Charge a user's storage with the quota admission check folded into
    /// the update. Zero rows affected means either quota exhaustion or a
    /// missing user; the follow-up probe distinguishes them.
    async fn charge_storage(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        user_id: Uuid,
        size: i64,
        now: OffsetDateTime,
    ) -> MetadataResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET storage_used = storage_used + ?1, updated_at = ?2
            WHERE user_id = ?3 AND storage_used + ?1 <= storage_quota
            "#,
        )
        .bind(size)
        .bind(now)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<(i32,)> =
                sqlx::query_as("SELECT 1 FROM users WHERE user_id = ?")
                    .bind(user_id)
                    .fetch_optional(&mut **tx)
                    .await?;
            return if exists.is_some() {
                Err(MetadataError::QuotaExceeded(user_id))
            } else {
                Err(MetadataError::NotFound(format!("user {user_id} not found")))
            };
        }
        Ok(())
    }

    #[async_trait]
    impl ShareRepo for SqliteStore {
        async fn pickup_code_exists(&self, code: &str) -> MetadataResult<bool> {
            let row: Option<(i32,)> =
                sqlx::query_as("SELECT 1 FROM share_sessions WHERE pickup_code = ?")
                    .bind(code)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row.is_some())
        }

        async fn create_share_with_files(
            &self,
            share: &ShareRow,
            file_ids: &[Uuid],
        ) -> MetadataResult<()> {
            let mut tx = self.pool.begin().await?;

            let result = sqlx::query(
                r#"
                INSERT INTO share_sessions (
                    share_id, pickup_code, creator_id, password_hash,
                    max_downloads, current_downloads, created_at, expires_at, stopped_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(share.share_id)
            .bind(&share.pickup_code)
            .bind(share.creator_id)
            .bind(&share.password_hash)
            .bind(share.max_downloads)
            .bind(share.current_downloads)
            .bind(share.created_at)
            .bind(share.expires_at)
            .bind(share.stopped_at)
            .execute(&mut *tx)
            .await;

            if let Err(e) = result {
                if is_unique_violation(&e) {
                    return Err(MetadataError::AlreadyExists(format!(
                        "pickup code {} already taken",
                        share.pickup_code
                    )));
                }
                return Err(e.into());
            }

            for file_id in file_ids {
                sqlx::query("INSERT INTO share_files (share_id, file_id) VALUES (?, ?)")
                    .bind(share.share_id)
                    .bind(file_id)
                    .execute(&mut *tx)
                    .await?;
            }

            tx.commit().await?;
            Ok(())
        }

        async fn get_share(&self, share_id: Uuid) -> MetadataResult<Option<ShareRow>> {
            let row =
                sqlx::query_as::<_, ShareRow>("SELECT * FROM share_sessions WHERE share_id = ?")
                    .bind(share_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn get_share_by_code(&self, code: &str) -> MetadataResult<Option<ShareRow>> {
            let row = sqlx::query_as::<_, ShareRow>(
                "SELECT * FROM share_sessions WHERE pickup_code = ?",
            )
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn get_share_files(&self, share_id: Uuid) -> MetadataResult<Vec<FileRow>> {
            let rows = sqlx::query_as::<_, FileRow>(
                r#"
                SELECT f.* FROM file_records f
                JOIN share_files sf ON sf.file_id = f.file_id
                JOIN file_blobs b ON b.hash = f.blob_hash
                WHERE sf.share_id = ? AND f.deleted_at IS NULL AND NOT b.is_banned
                ORDER BY f.created_at
                "#,
            )
            .bind(share_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn increment_downloads(&self, share_id: Uuid) -> MetadataResult<()> {
            sqlx::query(
                "UPDATE share_sessions SET current_downloads = current_downloads + 1 WHERE share_id = ?",
            )
            .bind(share_id)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn stop_share(
            &self,
            share_id: Uuid,
            creator_id: Uuid,
            now: OffsetDateTime,
        ) -> MetadataResult<bool> {
            let result = sqlx::query(
                r#"
                UPDATE share_sessions SET stopped_at = ?
                WHERE share_id = ? AND creator_id = ? AND stopped_at IS NULL
                "#,
            )
            .bind(now)
            .bind(share_id)
            .bind(creator_id)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn list_shares(
            &self,
            creator_id: Uuid,
            limit: u32,
            offset: u32,
        ) -> MetadataResult<Vec<ShareRow>> {
            let rows = sqlx::query_as::<_, ShareRow>(
                r#"
                SELECT * FROM share_sessions
                WHERE creator_id = ?
                ORDER BY created_at DESC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(creator_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn count_shares(&self, creator_id: Uuid) -> MetadataResult<u64> {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM share_sessions WHERE creator_id = ?")
                    .bind(creator_id)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(count as u64)
        }

        async fn stop_expired_shares(&self, now: OffsetDateTime) -> MetadataResult<u64> {
            let result = sqlx::query(
                "UPDATE share_sessions SET stopped_at = ? WHERE expires_at < ? AND stopped_at IS NULL",
            )
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected())
        }

        async fn stop_exhausted_shares(&self, now: OffsetDateTime) -> MetadataResult<u64> {
            let result = sqlx::query(
                r#"
                UPDATE share_sessions SET stopped_at = ?
                WHERE max_downloads > 0
                  AND current_downloads >= max_downloads
                  AND stopped_at IS NULL
                "#,
            )
            .bind(now)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected())
        }
    }

    #[async_trait]
    impl UploadRepo for SqliteStore {
        async fn create_upload_session(
            &self,
            session: &UploadSessionRow,
        ) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO upload_sessions (
                    upload_id, user_id, filename, declared_size, declared_hash,
                    upload_offset, state, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(session.upload_id)
            .bind(session.user_id)
            .bind(&session.filename)
            .bind(session.declared_size)
            .bind(&session.declared_hash)
            .bind(session.upload_offset)
            .bind(&session.state)
            .bind(session.created_at)
            .bind(session.updated_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_upload_session(
            &self,
            upload_id: Uuid,
        ) -> MetadataResult<Option<UploadSessionRow>> {
            let row = sqlx::query_as::<_, UploadSessionRow>(
                "SELECT * FROM upload_sessions WHERE upload_id = ?",
            )
            .bind(upload_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn advance_upload_offset(
            &self,
            upload_id: Uuid,
            expected_offset: i64,
            delta: i64,
            now: OffsetDateTime,
        ) -> MetadataResult<i64> {
            let result = sqlx::query(
                r#"
                UPDATE upload_sessions SET upload_offset = upload_offset + ?, updated_at = ?
                WHERE upload_id = ? AND upload_offset = ? AND state = 'uploading'
                "#,
            )
            .bind(delta)
            .bind(now)
            .bind(upload_id)
            .bind(expected_offset)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                let recorded: Option<(i64,)> = sqlx::query_as(
                    "SELECT upload_offset FROM upload_sessions WHERE upload_id = ?",
                )
                .bind(upload_id)
                .fetch_optional(&self.pool)
                .await?;
                return match recorded {
                    Some((recorded,)) => Err(MetadataError::OffsetConflict {
                        expected: expected_offset,
                        recorded,
                    }),
                    None => Err(MetadataError::NotFound(format!(
                        "upload session {upload_id} not found"
                    ))),
                };
            }
            Ok(expected_offset + delta)
        }

        async fn set_upload_state(
            &self,
            upload_id: Uuid,
            state: &str,
            now: OffsetDateTime,
        ) -> MetadataResult<()> {
            sqlx::query(
                "UPDATE upload_sessions SET state = ?, updated_at = ? WHERE upload_id = ?",
            )
            .bind(state)
            .bind(now)
            .bind(upload_id)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn delete_upload_session(&self, upload_id: Uuid) -> MetadataResult<()> {
            sqlx::query("DELETE FROM upload_sessions WHERE upload_id = ?")
                .bind(upload_id)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn get_stale_upload_sessions(
            &self,
            older_than: OffsetDateTime,
            limit: u32,
        ) -> MetadataResult<Vec<UploadSessionRow>> {
            let rows = sqlx::query_as::<_, UploadSessionRow>(
                r#"
                SELECT * FROM upload_sessions
                WHERE state != 'completed' AND updated_at < ?
                ORDER BY updated_at
                LIMIT ?
                "#,
            )
            .bind(older_than)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }

    #[async_trait]
    impl AuditRepo for SqliteStore {
        async fn append_audit(&self, entry: &AuditRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO audit_log (audit_id, user_id, action, detail, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(entry.audit_id)
            .bind(entry.user_id)
            .bind(&entry.action)
            .bind(&entry.detail)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn recent_audit(&self, limit: u32) -> MetadataResult<Vec<AuditRow>> {
            let rows = sqlx::query_as::<_, AuditRow>(
                "SELECT * FROM audit_log ORDER BY created_at DESC LIMIT ?",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }

    #[async_trait]
    impl SettingsRepo for SqliteStore {
        async fn get_setting(&self, key: &str) -> MetadataResult<Option<String>> {
            let row: Option<(String,)> =
                sqlx::query_as("SELECT value FROM system_settings WHERE key = ?")
                    .bind(key)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row.map(|(v,)| v))
        }

        async fn put_setting(
            &self,
            key: &str,
            value: &str,
            now: OffsetDateTime,
        ) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO system_settings (key, value, updated_at) VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
            )
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&self.pool)
            .await?;
            Ok(())
        }
    }
}
