//! Tests for command implementations.

use super::*;
use crate::cli::{AddArgs, ClaimArgs, JobsArgs, PollArgs};
use crate::config::DefinitionConfig;
use crate::context::resolve_context;
use crate::error::JobLockError;
use crate::events::{EventKind, read_events};
use crate::exit_codes;
use crate::job::LockState;
use crate::store::JobStore;
use crate::test_support::{create_initialized_root, create_root_with_config, fixed_now};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use tempfile::TempDir;

fn add_args(name: &str) -> AddArgs {
    AddArgs {
        name: name.to_string(),
        in_secs: None,
        at: None,
        priority: 0,
        disabled: false,
        data: None,
    }
}

fn claim_args(name: &str) -> ClaimArgs {
    ClaimArgs {
        name: name.to_string(),
        lock_lifetime_ms: None,
    }
}

fn config_with_definitions() -> Config {
    let mut config = Config::default();
    config.definitions.insert(
        "send-email".to_string(),
        DefinitionConfig {
            lock_lifetime_ms: Some(60_000),
        },
    );
    config
}

#[tokio::test]
async fn init_creates_layout_and_indexes() {
    let temp_dir = TempDir::new().unwrap();

    init::cmd_init(Some(temp_dir.path())).await.unwrap();

    let ctx = resolve_context(Some(temp_dir.path())).unwrap();
    assert!(ctx.is_initialized());
    assert!(ctx.collections_dir.is_dir());
    assert!(ctx.events_dir().is_dir());

    let session = Session::open(Some(temp_dir.path())).unwrap();
    assert!(session.store.table_path().is_file());
    assert_eq!(session.store.list_indexes().await.unwrap().len(), 2);
}

#[tokio::test]
async fn init_is_idempotent_and_keeps_existing_config() {
    let mut config = Config::default();
    config.collection = "scheduled_jobs".to_string();
    let temp_dir = create_root_with_config(&config);

    init::cmd_init(Some(temp_dir.path())).await.unwrap();
    init::cmd_init(Some(temp_dir.path())).await.unwrap();

    let session = Session::open(Some(temp_dir.path())).unwrap();
    assert_eq!(session.config.collection, "scheduled_jobs");
    assert!(session.store.table_path().ends_with("scheduled_jobs.json"));
    assert_eq!(session.store.list_indexes().await.unwrap().len(), 2);

    let events = read_events(&session.ctx.events_file()).unwrap();
    let ready = events
        .iter()
        .filter(|event| event.kind == EventKind::Ready)
        .count();
    assert_eq!(ready, 2);
}

#[tokio::test]
async fn commands_require_initialized_root() {
    let temp_dir = TempDir::new().unwrap();

    let err = add::cmd_add(Some(temp_dir.path()), add_args("send-email"))
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    assert!(err.to_string().contains("joblock init"));

    let err = jobs::cmd_jobs(Some(temp_dir.path()), JobsArgs { name: None })
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
}

#[tokio::test]
async fn add_builds_record_from_arguments() {
    let temp_dir = create_initialized_root();
    let session = Session::open(Some(temp_dir.path())).unwrap();
    let now = fixed_now();

    let mut args = add_args("send-email");
    args.in_secs = Some(-30);
    args.priority = 7;
    args.data = Some(r#"{"to":"a@example.com"}"#.to_string());
    let record = add::add_job(&session, &args, now).await.unwrap();

    assert_eq!(record.next_run_at, Some(now - ChronoDuration::seconds(30)));
    assert_eq!(record.priority, 7);
    assert_eq!(record.data, json!({"to": "a@example.com"}));
    assert!(!record.disabled);

    let mut args = add_args("report");
    args.at = Some("2030-01-02T03:04:05Z".to_string());
    args.disabled = true;
    let record = add::add_job(&session, &args, now).await.unwrap();
    assert_eq!(
        record.next_run_at.unwrap().to_rfc3339(),
        "2030-01-02T03:04:05+00:00"
    );
    assert!(record.disabled);

    let stored = session
        .store
        .find(&crate::store::Filter::All, &session.config.sort)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn add_rejects_bad_arguments() {
    let temp_dir = create_initialized_root();
    let session = Session::open(Some(temp_dir.path())).unwrap();

    let mut bad_data = add_args("send-email");
    bad_data.data = Some("{not json".to_string());
    let err = add::add_job(&session, &bad_data, Utc::now())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("--data"));

    let mut bad_at = add_args("send-email");
    bad_at.at = Some("tomorrow".to_string());
    let err = add::add_job(&session, &bad_at, Utc::now())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("RFC3339"));

    let err = add::add_job(&session, &add_args("  "), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, JobLockError::UserError(_)));
}

#[tokio::test]
async fn claim_locks_due_jobs_once() {
    let temp_dir = create_root_with_config(&config_with_definitions());
    let session = Session::open(Some(temp_dir.path())).unwrap();
    for _ in 0..2 {
        add::add_job(&session, &add_args("send-email"), Utc::now())
            .await
            .unwrap();
    }

    let first = claim::claim_jobs(&session, &claim_args("send-email"))
        .await
        .unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].claim_token(), first[1].claim_token());

    let second = claim::claim_jobs(&session, &claim_args("send-email"))
        .await
        .unwrap();
    assert!(second.is_empty());

    // A zero lifetime treats every lock as stale.
    let override_args = ClaimArgs {
        name: "send-email".to_string(),
        lock_lifetime_ms: Some(0),
    };
    let reclaimed = claim::claim_jobs(&session, &override_args).await.unwrap();
    assert_eq!(reclaimed.len(), 2);
    assert_ne!(reclaimed[0].claim_token(), first[0].claim_token());

    let line = claim::job_json_line(&reclaimed[0]).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed["record"]["name"], "send-email");
    assert!(parsed["record"]["lockedUuid"].is_string());

    session.locker.events().flush().await;
    let events = read_events(&session.ctx.events_file()).unwrap();
    assert_eq!(
        events
            .iter()
            .filter(|event| event.kind == EventKind::Claim)
            .count(),
        2
    );
}

#[tokio::test]
async fn jobs_reports_lock_states() {
    let temp_dir = create_root_with_config(&config_with_definitions());
    let session = Session::open(Some(temp_dir.path())).unwrap();
    let now = Utc::now();

    add::add_job(&session, &add_args("send-email"), now)
        .await
        .unwrap();
    claim::claim_jobs(&session, &claim_args("send-email"))
        .await
        .unwrap();
    add::add_job(&session, &add_args("send-email"), now)
        .await
        .unwrap();
    let mut disabled = add_args("report");
    disabled.disabled = true;
    add::add_job(&session, &disabled, now).await.unwrap();

    let listed = jobs::list_jobs(&session, None, now).await.unwrap();
    let mut states: Vec<LockState> = listed.iter().map(|(_, state)| *state).collect();
    states.sort_by_key(|state| state.to_string());
    assert_eq!(
        states,
        vec![LockState::Disabled, LockState::Free, LockState::Locked]
    );

    // The send-email lifetime is one minute.
    let later = Utc::now() + ChronoDuration::minutes(2);
    let send_email = jobs::list_jobs(&session, Some("send-email"), later)
        .await
        .unwrap();
    assert_eq!(send_email.len(), 2);
    assert!(
        send_email
            .iter()
            .any(|(_, state)| *state == LockState::Stale)
    );
}

#[tokio::test]
async fn poll_requires_definitions() {
    let temp_dir = create_initialized_root();

    let err = poll::cmd_poll(Some(temp_dir.path()), PollArgs { once: true })
        .await
        .unwrap_err();
    assert!(matches!(err, JobLockError::UserError(_)));
    assert!(err.to_string().contains("definitions"));
}

#[tokio::test]
async fn poll_once_provisions_and_claims() {
    let temp_dir = create_root_with_config(&config_with_definitions());
    {
        let session = Session::open(Some(temp_dir.path())).unwrap();
        add::add_job(&session, &add_args("send-email"), Utc::now())
            .await
            .unwrap();
    }

    poll::cmd_poll(Some(temp_dir.path()), PollArgs { once: true })
        .await
        .unwrap();

    let session = Session::open(Some(temp_dir.path())).unwrap();
    assert_eq!(session.store.list_indexes().await.unwrap().len(), 2);
    let listed = jobs::list_jobs(&session, None, Utc::now()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].1, LockState::Locked);

    // The command returns only after its events reach the journal.
    let kinds: Vec<EventKind> = read_events(&session.ctx.events_file())
        .unwrap()
        .into_iter()
        .map(|event| event.kind)
        .collect();
    assert_eq!(kinds, vec![EventKind::Ready, EventKind::Claim]);
}

#[tokio::test]
async fn missing_store_dir_without_reconnect_is_fatal() {
    let mut config = config_with_definitions();
    config.auto_reconnect = false;
    let temp_dir = create_root_with_config(&config);
    let ctx = resolve_context(Some(temp_dir.path())).unwrap();
    std::fs::remove_dir_all(&ctx.collections_dir).unwrap();

    let err = Session::open(Some(temp_dir.path()))
        .unwrap()
        .locker
        .find_and_lock("send-email", &config.definition("send-email"))
        .await
        .unwrap_err();
    assert!(matches!(err, JobLockError::ConnectionLost(_)));
    assert_eq!(err.exit_code(), exit_codes::CONNECTION_LOST);
}
