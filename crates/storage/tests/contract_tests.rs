//! Contract tests run against every backend.
//!
//! The in-memory backend is the reference implementation of the blob store
//! semantics; the filesystem backend must be indistinguishable from it
//! through the trait.

use bytes::Bytes;
use coffre_core::ContentHash;
use coffre_storage::{BlobStore, FilesystemBackend, MemoryBackend, StorageError};
use std::sync::Arc;

async fn backends() -> (tempfile::TempDir, Vec<Arc<dyn BlobStore>>) {
    let dir = tempfile::tempdir().unwrap();
    let filesystem = FilesystemBackend::new(dir.path()).await.unwrap();
    (
        dir,
        vec![Arc::new(MemoryBackend::new()), Arc::new(filesystem)],
    )
}

fn hash_of(data: &[u8]) -> String {
    ContentHash::compute(data).to_hex()
}

#[tokio::test]
async fn put_get_stat_delete_cycle() {
    let (_dir, backends) = backends().await;
    for backend in backends {
        let data = Bytes::from_static(b"the quick brown fox");
        let hash = hash_of(&data);

        assert!(!backend.exists(&hash).await.unwrap());
        backend.put(&hash, data.clone()).await.unwrap();
        assert!(backend.exists(&hash).await.unwrap());

        assert_eq!(backend.get(&hash).await.unwrap(), data);

        let stat = backend.stat(&hash).await.unwrap();
        assert_eq!(stat.hash, hash);
        assert_eq!(stat.size, data.len() as u64);
        assert_eq!(
            stat.store_path,
            format!("{}/{}/{hash}", &hash[0..2], &hash[2..4]),
            "store path sharding is part of the contract ({})",
            backend.backend_name()
        );

        backend.delete(&hash).await.unwrap();
        assert!(!backend.exists(&hash).await.unwrap());
    }
}

#[tokio::test]
async fn duplicate_put_is_rejected() {
    let (_dir, backends) = backends().await;
    for backend in backends {
        let data = Bytes::from_static(b"stored once, referenced many times");
        let hash = hash_of(&data);

        backend.put(&hash, data.clone()).await.unwrap();
        let second = backend.put(&hash, data.clone()).await;
        assert!(
            matches!(second, Err(StorageError::AlreadyExists(_))),
            "{} must reject a second put",
            backend.backend_name()
        );

        // The first object is untouched.
        assert_eq!(backend.get(&hash).await.unwrap(), data);
    }
}

#[tokio::test]
async fn absent_blob_operations_fail_uniformly() {
    let (_dir, backends) = backends().await;
    for backend in backends {
        let hash = hash_of(b"absent");

        assert!(matches!(
            backend.get(&hash).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            backend.stat(&hash).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            backend.delete(&hash).await,
            Err(StorageError::NotFound(_))
        ));
    }
}

#[tokio::test]
async fn hash_validation_guards_every_entry_point() {
    let (_dir, backends) = backends().await;
    for backend in backends {
        for key in [
            "",
            "short",
            "../../../etc/passwd",
            // uppercase is non-canonical
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855",
        ] {
            assert!(matches!(
                backend.put(key, Bytes::from_static(b"x")).await,
                Err(StorageError::InvalidKey(_))
            ));
            assert!(matches!(
                backend.get(key).await,
                Err(StorageError::InvalidKey(_))
            ));
            assert!(matches!(
                backend.exists(key).await,
                Err(StorageError::InvalidKey(_))
            ));
            assert!(matches!(
                backend.delete(key).await,
                Err(StorageError::InvalidKey(_))
            ));
            assert!(matches!(
                backend.stat(key).await,
                Err(StorageError::InvalidKey(_))
            ));
        }
    }
}

#[tokio::test]
async fn empty_blob_is_storable() {
    let (_dir, backends) = backends().await;
    for backend in backends {
        let hash = hash_of(b"");
        backend.put(&hash, Bytes::new()).await.unwrap();
        assert_eq!(backend.get(&hash).await.unwrap().len(), 0);
        assert_eq!(backend.stat(&hash).await.unwrap().size, 0);
    }
}
