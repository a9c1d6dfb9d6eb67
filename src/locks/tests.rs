//! Tests for the table lock subsystem.

use super::*;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

fn options() -> TableLockOptions {
    TableLockOptions {
        wait: Duration::from_millis(50),
    }
}

fn patient() -> TableLockOptions {
    TableLockOptions {
        wait: Duration::from_secs(10),
    }
}

#[test]
fn test_lock_metadata_current() {
    let meta = LockMetadata::current("update_many");

    assert!(meta.owner.contains('@'));
    assert_eq!(meta.pid, std::process::id());
    assert_eq!(meta.action, "update_many");
    assert!(meta.describe().starts_with("update_many by "));
}

#[test]
fn test_lock_metadata_read_tolerates_missing_and_partial_files() {
    let temp_dir = TempDir::new().unwrap();
    let lock_path = temp_dir.path().join("jobs.lock");
    assert!(LockMetadata::read(&lock_path).is_none());

    std::fs::write(&lock_path, "").unwrap();
    assert!(LockMetadata::read(&lock_path).is_none());

    std::fs::write(&lock_path, "{\"owner\":").unwrap();
    assert!(LockMetadata::read(&lock_path).is_none());

    let meta = LockMetadata::current("insert");
    std::fs::write(&lock_path, serde_json::to_string(&meta).unwrap()).unwrap();
    assert_eq!(LockMetadata::read(&lock_path), Some(meta));
}

#[test]
fn test_acquire_records_holder_and_drop_unlocks() {
    let temp_dir = TempDir::new().unwrap();
    let lock_path = temp_dir.path().join("jobs.lock");

    let guard = acquire_table_lock(&lock_path, "update_many", options()).unwrap();
    assert_eq!(guard.path(), lock_path.as_path());
    let meta = LockMetadata::read(&lock_path).unwrap();
    assert_eq!(meta.action, "update_many");

    drop(guard);
    // The file stays; only the OS lock and the metadata go.
    assert!(lock_path.exists());
    assert!(LockMetadata::read(&lock_path).is_none());

    acquire_table_lock(&lock_path, "insert", options())
        .unwrap()
        .release()
        .unwrap();
}

#[test]
fn test_acquire_creates_missing_directory() {
    let temp_dir = TempDir::new().unwrap();
    let lock_path = temp_dir.path().join("nested").join("jobs.lock");

    let guard = acquire_table_lock(&lock_path, "insert", options()).unwrap();
    assert!(lock_path.exists());
    guard.release().unwrap();
}

#[test]
fn test_held_lock_times_out() {
    let temp_dir = TempDir::new().unwrap();
    let lock_path = temp_dir.path().join("jobs.lock");

    let _held = acquire_table_lock(&lock_path, "create_index", options()).unwrap();

    let err = acquire_table_lock(&lock_path, "insert", options()).unwrap_err();
    assert!(matches!(err, crate::error::JobLockError::LockError(_)));
    assert!(err.to_string().contains("held by another process"));
    assert!(err.to_string().contains("create_index by"));
}

#[test]
fn test_leftover_lock_file_from_dead_holder_is_reused() {
    let temp_dir = TempDir::new().unwrap();
    let lock_path = temp_dir.path().join("jobs.lock");

    // A crashed process leaves its metadata but not its OS lock.
    let leftover = LockMetadata {
        owner: "crashed@host".to_string(),
        pid: 12345,
        action: "update_many".to_string(),
        acquired_at: Utc::now() - chrono::Duration::minutes(10),
    };
    std::fs::write(&lock_path, serde_json::to_string(&leftover).unwrap()).unwrap();

    let guard = acquire_table_lock(&lock_path, "update_many", options()).unwrap();
    let meta = LockMetadata::read(guard.path()).unwrap();
    assert_ne!(meta.owner, "crashed@host");
    assert_eq!(meta.pid, std::process::id());
}

#[test]
fn test_live_holder_with_old_metadata_is_never_displaced() {
    let temp_dir = TempDir::new().unwrap();
    let lock_path = temp_dir.path().join("jobs.lock");
    let held = acquire_table_lock(&lock_path, "update_many", options()).unwrap();

    // Metadata claiming the holder is ancient changes nothing.
    let ancient = LockMetadata {
        owner: "slow@host".to_string(),
        pid: 1,
        action: "update_many".to_string(),
        acquired_at: Utc::now() - chrono::Duration::hours(3),
    };
    std::fs::write(&lock_path, serde_json::to_string(&ancient).unwrap()).unwrap();

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let path = lock_path.clone();
            std::thread::spawn(move || acquire_table_lock(&path, "insert", options()).is_ok())
        })
        .collect();
    for waiter in waiters {
        assert!(!waiter.join().unwrap());
    }
    assert_eq!(LockMetadata::read(&lock_path), Some(ancient));

    held.release().unwrap();
    acquire_table_lock(&lock_path, "insert", options()).unwrap();
}

#[test]
fn test_contending_threads_never_overlap() {
    let temp_dir = TempDir::new().unwrap();
    let lock_path = temp_dir.path().join("jobs.lock");
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let entries = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let path = lock_path.clone();
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            let entries = Arc::clone(&entries);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    let guard = acquire_table_lock(&path, "update_many", patient()).unwrap();
                    let now_active = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now_active, Ordering::SeqCst);
                    entries.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_micros(200));
                    active.fetch_sub(1, Ordering::SeqCst);
                    guard.release().unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert_eq!(entries.load(Ordering::SeqCst), 200);
}

#[test]
fn test_lock_released_by_other_thread_is_acquired() {
    let temp_dir = TempDir::new().unwrap();
    let lock_path = temp_dir.path().join("jobs.lock");
    let held = acquire_table_lock(&lock_path, "insert", options()).unwrap();

    let path = lock_path.clone();
    let waiter = std::thread::spawn(move || {
        acquire_table_lock(&path, "update_many", patient()).map(|guard| guard.release())
    });

    std::thread::sleep(Duration::from_millis(20));
    drop(held);

    waiter.join().unwrap().unwrap().unwrap();
}

#[test]
fn test_get_owner_string() {
    let owner = get_owner_string();
    assert!(owner.contains('@'));
}
