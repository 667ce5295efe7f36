//! End-to-end scenarios over the services: dedup refcounting, quota
//! accounting, share gates, and reclamation.

mod common;

use bytes::Bytes;
use coffre_server::error::ApiError;
use coffre_server::services::CreateShareRequest;
use coffre_server::tasks::{GarbageCollector, LifecycleSweep};
use common::test_state;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

const HELLO: &[u8] = b"Hello, World!";

async fn register(state: &coffre_server::AppState, email: &str) -> Uuid {
    state
        .users
        .register(email, "password123", None)
        .await
        .unwrap()
        .user
        .user_id
}

#[tokio::test]
async fn dedup_across_users_keeps_one_ciphertext() {
    let (_dir, state) = test_state().await;
    let alice = register(&state, "alice@x.com").await;
    let bob = register(&state, "bob@x.com").await;

    let record = state
        .files
        .upload(alice, "a.txt", 13, Bytes::from_static(HELLO))
        .await
        .unwrap();
    let hash = record.blob_hash.clone();
    assert_eq!(
        hash,
        coffre_core::ContentHash::compute(HELLO).to_hex(),
        "record is keyed by the plaintext hash"
    );
    assert_eq!(state.metadata.get_blob(&hash).await.unwrap().unwrap().ref_count, 1);
    assert_eq!(
        state.metadata.get_user(alice).await.unwrap().unwrap().storage_used,
        13
    );

    // Alice again: second record, same blob.
    state
        .files
        .upload(alice, "a2.txt", 13, Bytes::from_static(HELLO))
        .await
        .unwrap();
    assert_eq!(state.metadata.get_blob(&hash).await.unwrap().unwrap().ref_count, 2);
    assert_eq!(
        state.metadata.get_user(alice).await.unwrap().unwrap().storage_used,
        26
    );

    // Bob: third reference, still one ciphertext object.
    state
        .files
        .upload(bob, "b.txt", 13, Bytes::from_static(HELLO))
        .await
        .unwrap();
    assert_eq!(state.metadata.get_blob(&hash).await.unwrap().unwrap().ref_count, 3);
    assert_eq!(
        state.metadata.get_user(bob).await.unwrap().unwrap().storage_used,
        13
    );
    assert!(state.blobs.exists(&hash).await.unwrap());

    // The ciphertext is not the plaintext, and decrypts back to it.
    let ciphertext = state.blobs.get(&hash).await.unwrap();
    assert_ne!(&ciphertext[..], HELLO);
    let downloaded = state.files.download(record.file_id, alice).await.unwrap();
    assert_eq!(&downloaded.plaintext[..], HELLO);
}

#[tokio::test]
async fn size_mismatch_rejected_without_side_effects() {
    let (_dir, state) = test_state().await;
    let alice = register(&state, "alice@x.com").await;

    let result = state
        .files
        .upload(alice, "a.txt", 12, Bytes::from_static(HELLO))
        .await;
    assert!(matches!(result, Err(ApiError::SizeMismatch { .. })));

    assert_eq!(
        state.metadata.get_user(alice).await.unwrap().unwrap().storage_used,
        0
    );
    let hash = coffre_core::ContentHash::compute(HELLO).to_hex();
    assert!(!state.blobs.exists(&hash).await.unwrap());
}

#[tokio::test]
async fn share_gates_password_and_exhaustion() {
    let (_dir, state) = test_state().await;
    let alice = register(&state, "alice@x.com").await;

    let record = state
        .files
        .upload(alice, "a.txt", 13, Bytes::from_static(HELLO))
        .await
        .unwrap();

    let share = state
        .shares
        .create_share(
            alice,
            CreateShareRequest {
                file_ids: vec![record.file_id],
                expires_in_secs: Some(3600),
                max_downloads: 2,
                password: Some("secret".to_string()),
            },
        )
        .await
        .unwrap();
    let code = share.pickup_code.clone();
    assert_eq!(code.len(), 8);

    // Wrong / missing password.
    assert!(matches!(
        state.shares.get_by_code(&code, Some("wrong")).await,
        Err(ApiError::InvalidPassword)
    ));
    assert!(matches!(
        state.shares.get_by_code(&code, None).await,
        Err(ApiError::PasswordRequired)
    ));

    // Two successful downloads reach the cap.
    for _ in 0..2 {
        let (share, files) = state.shares.get_by_code(&code, Some("secret")).await.unwrap();
        let bytes = state.files.read_plaintext(&files[0]).await.unwrap();
        assert_eq!(&bytes[..], HELLO);
        state.shares.increment_download(share.share_id).await.unwrap();
    }

    // The third gate check sees exhaustion.
    assert!(matches!(
        state.shares.get_by_code(&code, Some("secret")).await,
        Err(ApiError::Exhausted)
    ));

    // A wrong-length or out-of-alphabet code never reaches the database.
    assert!(matches!(
        state.shares.get_by_code("ABC", Some("secret")).await,
        Err(ApiError::InvalidCode)
    ));
    assert!(matches!(
        state.shares.get_by_code("ABCD234O", None).await,
        Err(ApiError::InvalidCode)
    ));
}

#[tokio::test]
async fn stopped_and_expired_gates_precede_password() {
    let (_dir, state) = test_state().await;
    let alice = register(&state, "alice@x.com").await;

    let record = state
        .files
        .upload(alice, "a.txt", 13, Bytes::from_static(HELLO))
        .await
        .unwrap();
    let share = state
        .shares
        .create_share(
            alice,
            CreateShareRequest {
                file_ids: vec![record.file_id],
                expires_in_secs: Some(3600),
                max_downloads: 0,
                password: Some("secret".to_string()),
            },
        )
        .await
        .unwrap();

    state.shares.stop(share.share_id, alice).await.unwrap();
    // Stopped wins over the missing password.
    assert!(matches!(
        state.shares.get_by_code(&share.pickup_code, None).await,
        Err(ApiError::Stopped)
    ));
    // Stopping again is a no-op for the creator.
    state.shares.stop(share.share_id, alice).await.unwrap();

    // A stranger cannot stop what they do not own.
    let mallory = register(&state, "mallory@x.com").await;
    assert!(matches!(
        state.shares.stop(share.share_id, mallory).await,
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
async fn save_to_vault_is_a_logical_copy() {
    let (_dir, state) = test_state().await;
    let alice = register(&state, "alice@x.com").await;
    let bob = register(&state, "bob@x.com").await;

    let record = state
        .files
        .upload(alice, "a.txt", 13, Bytes::from_static(HELLO))
        .await
        .unwrap();
    let hash = record.blob_hash.clone();
    let share = state
        .shares
        .create_share(
            alice,
            CreateShareRequest {
                file_ids: vec![record.file_id],
                expires_in_secs: Some(3600),
                max_downloads: 0,
                password: None,
            },
        )
        .await
        .unwrap();

    let outcome = state
        .shares
        .save_to_vault(&share.pickup_code, None, &[record.file_id], bob)
        .await
        .unwrap();
    assert_eq!(outcome.saved_ids.len(), 1);
    assert!(outcome.errors.is_empty());

    // One more strong reference, one download counted, no new ciphertext.
    assert_eq!(state.metadata.get_blob(&hash).await.unwrap().unwrap().ref_count, 2);
    assert_eq!(
        state
            .metadata
            .get_share(share.share_id)
            .await
            .unwrap()
            .unwrap()
            .current_downloads,
        1
    );
    let (bob_files, total) = state.files.list(bob, 1, 20).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(bob_files[0].blob_hash, hash);
    assert_eq!(
        state.metadata.get_user(bob).await.unwrap().unwrap().storage_used,
        13
    );

    // Ids outside the surviving set are skipped, not errors.
    let outcome = state
        .shares
        .save_to_vault(&share.pickup_code, None, &[Uuid::new_v4()], bob)
        .await
        .unwrap();
    assert!(outcome.saved_ids.is_empty());
    assert!(outcome.errors.is_empty());
}

#[tokio::test]
async fn tombstone_purge_follows_discipline_a() {
    let (_dir, state) = test_state().await;
    let alice = register(&state, "alice@x.com").await;

    let keep = state
        .files
        .upload(alice, "a.txt", 13, Bytes::from_static(HELLO))
        .await
        .unwrap();
    let doomed = state
        .files
        .upload(alice, "a2.txt", 13, Bytes::from_static(HELLO))
        .await
        .unwrap();
    let hash = keep.blob_hash.clone();

    // Soft-delete a2.txt eight days ago.
    let eight_days_ago = OffsetDateTime::now_utc() - Duration::days(8);
    state
        .metadata
        .soft_delete_file(doomed.file_id, alice, eight_days_ago)
        .await
        .unwrap();

    // Accounting released immediately at soft-delete time.
    assert_eq!(
        state.metadata.get_user(alice).await.unwrap().unwrap().storage_used,
        13
    );
    assert_eq!(state.metadata.get_blob(&hash).await.unwrap().unwrap().ref_count, 1);
    let (files, total) = state.files.list(alice, 1, 20).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(files[0].file_id, keep.file_id);

    // GC hard-removes the tombstone without another refcount decrement.
    let gc = GarbageCollector::new(
        state.metadata.clone(),
        state.blobs.clone(),
        state.config.server.upload_dir.clone(),
        state.config.gc.clone(),
    );
    let outcome = gc.run(OffsetDateTime::now_utc()).await;
    assert_eq!(outcome.tombstones_purged, 1);
    assert_eq!(outcome.orphan_blobs_deleted, 0);
    assert_eq!(outcome.errors, 0);

    assert!(state.metadata.get_file(doomed.file_id).await.unwrap().is_none());
    assert_eq!(state.metadata.get_blob(&hash).await.unwrap().unwrap().ref_count, 1);
    assert!(state.blobs.exists(&hash).await.unwrap());
}

#[tokio::test]
async fn orphaned_blob_is_reclaimed_with_its_ciphertext() {
    let (_dir, state) = test_state().await;
    let alice = register(&state, "alice@x.com").await;
    let bob = register(&state, "bob@x.com").await;

    let a1 = state
        .files
        .upload(alice, "a.txt", 13, Bytes::from_static(HELLO))
        .await
        .unwrap();
    let a3 = state
        .files
        .upload(alice, "a3.txt", 13, Bytes::from_static(HELLO))
        .await
        .unwrap();
    let b1 = state
        .files
        .upload(bob, "b.txt", 13, Bytes::from_static(HELLO))
        .await
        .unwrap();
    let hash = a1.blob_hash.clone();

    // Everyone deletes, eight days pass.
    let eight_days_ago = OffsetDateTime::now_utc() - Duration::days(8);
    for (id, owner) in [(a1.file_id, alice), (a3.file_id, alice), (b1.file_id, bob)] {
        state
            .metadata
            .soft_delete_file(id, owner, eight_days_ago)
            .await
            .unwrap();
    }
    assert_eq!(state.metadata.get_blob(&hash).await.unwrap().unwrap().ref_count, 0);

    let gc = GarbageCollector::new(
        state.metadata.clone(),
        state.blobs.clone(),
        state.config.server.upload_dir.clone(),
        state.config.gc.clone(),
    );
    let outcome = gc.run(OffsetDateTime::now_utc()).await;
    assert_eq!(outcome.tombstones_purged, 3);
    assert_eq!(outcome.orphan_blobs_deleted, 1);
    assert_eq!(outcome.bytes_reclaimed, 13);

    // Row gone, ciphertext gone, referenced blobs untouched.
    assert!(state.metadata.get_blob(&hash).await.unwrap().is_none());
    assert!(!state.blobs.exists(&hash).await.unwrap());
}

#[tokio::test]
async fn lifecycle_sweep_stops_expired_and_exhausted() {
    let (_dir, state) = test_state().await;
    let alice = register(&state, "alice@x.com").await;

    let record = state
        .files
        .upload(alice, "a.txt", 13, Bytes::from_static(HELLO))
        .await
        .unwrap();

    let expired = state
        .shares
        .create_share(
            alice,
            CreateShareRequest {
                file_ids: vec![record.file_id],
                expires_in_secs: Some(3600),
                max_downloads: 0,
                password: None,
            },
        )
        .await
        .unwrap();
    let exhausted = state
        .shares
        .create_share(
            alice,
            CreateShareRequest {
                file_ids: vec![record.file_id],
                expires_in_secs: Some(3600),
                max_downloads: 1,
                password: None,
            },
        )
        .await
        .unwrap();
    state
        .shares
        .increment_download(exhausted.share_id)
        .await
        .unwrap();

    let sweep = LifecycleSweep::new(state.metadata.clone());
    // Run "two hours from now": the first share is past expiry.
    let outcome = sweep.run(OffsetDateTime::now_utc() + Duration::hours(2)).await;
    assert_eq!(outcome.expired_stopped, 2); // both are past expires_at then
    assert_eq!(outcome.errors, 0);

    let stopped = state
        .metadata
        .get_share(expired.share_id)
        .await
        .unwrap()
        .unwrap();
    assert!(stopped.stopped_at.is_some());

    // At the present time only the exhausted share transitions.
    let fresh = state
        .shares
        .create_share(
            alice,
            CreateShareRequest {
                file_ids: vec![record.file_id],
                expires_in_secs: Some(3600),
                max_downloads: 1,
                password: None,
            },
        )
        .await
        .unwrap();
    state.shares.increment_download(fresh.share_id).await.unwrap();
    let outcome = sweep.run(OffsetDateTime::now_utc()).await;
    assert_eq!(outcome.exhausted_stopped, 1);
}

#[tokio::test]
async fn oversized_upload_rejected_without_side_effects() {
    let (_dir, state) = test_state().await;
    let alice = register(&state, "alice@x.com").await;

    // Quota exhaustion proper is covered at the store layer; the service
    // additionally refuses anything over the per-file limit up front.
    let too_big = state.config.business.max_file_size + 1;
    let result = state
        .files
        .upload(alice, "big.bin", too_big, Bytes::from_static(b"x"))
        .await;
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));

    assert_eq!(
        state.metadata.get_user(alice).await.unwrap().unwrap().storage_used,
        0
    );
}

#[tokio::test]
async fn banned_blob_blocks_probe_copy_and_download() {
    let (_dir, state) = test_state().await;
    let alice = register(&state, "alice@x.com").await;

    let record = state
        .files
        .upload(alice, "a.txt", 13, Bytes::from_static(HELLO))
        .await
        .unwrap();
    let hash = record.blob_hash.clone();

    state
        .metadata
        .set_blob_banned(&hash, true, Some("reported"))
        .await
        .unwrap();

    assert!(matches!(
        state.files.check_instant(&hash).await,
        Err(ApiError::BannedContent)
    ));
    assert!(matches!(
        state.files.logical_copy(alice, &hash, "again.txt").await,
        Err(ApiError::BannedContent)
    ));
    assert!(matches!(
        state.files.download(record.file_id, alice).await,
        Err(ApiError::BannedContent)
    ));

    // The refcount survives until reclaim.
    assert_eq!(state.metadata.get_blob(&hash).await.unwrap().unwrap().ref_count, 1);
}
