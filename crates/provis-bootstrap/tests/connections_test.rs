//! Integration tests for UpdateConnections

mod common;

use common::registry::Calls;
use common::{TOKEN, harness, ids};
use provis_auth::EDIT_PERMISSION;
use provis_bootstrap::Failure;
use provis_common::ProvisError;
use provis_common::error::ErrorKind;
use provis_persistence::{ConfigPersistence, State};

#[tokio::test]
async fn test_inactive_config_only_changes_desired_set() {
    let h = harness();
    let cfg = h.add_config("ext-1", &["a"]).await;
    h.seed_channels(&["b"]);
    h.registry.reset_calls();

    h.service
        .update_connections(TOKEN, &cfg.thing_id, &ids(&["a", "b"]))
        .await
        .unwrap();

    assert_eq!(h.registry.calls.link_changes(), 0);
    let stored = h.stored(&cfg.thing_id).await;
    let mut channel_ids = stored.channel_ids();
    channel_ids.sort();
    assert_eq!(channel_ids, vec!["a", "b"]);
    assert_eq!(stored.state, State::Inactive);
}

#[tokio::test]
async fn test_active_config_links_the_difference() {
    let h = harness();
    let cfg = h.add_config("ext-1", &["a", "b"]).await;
    h.service
        .change_state(TOKEN, &cfg.thing_id, State::Active)
        .await
        .unwrap();
    h.seed_channels(&["c"]);
    h.registry.reset_calls();

    h.service
        .update_connections(TOKEN, &cfg.thing_id, &ids(&["b", "c"]))
        .await
        .unwrap();

    // b is kept without churn
    assert_eq!(Calls::get(&h.registry.calls.disconnect), 1);
    assert_eq!(Calls::get(&h.registry.calls.connect), 1);
    assert_eq!(
        h.registry.inner.connected_channels(&cfg.thing_id),
        vec!["b", "c"]
    );

    let stored = h.stored(&cfg.thing_id).await;
    let mut channel_ids = stored.channel_ids();
    channel_ids.sort();
    assert_eq!(channel_ids, vec!["b", "c"]);
}

#[tokio::test]
async fn test_missing_link_on_disconnect_is_ignored() {
    let h = harness();
    let cfg = h.add_config("ext-1", &["a", "b"]).await;
    h.service
        .change_state(TOKEN, &cfg.thing_id, State::Active)
        .await
        .unwrap();
    h.registry
        .fail_disconnect("a", ProvisError::not_found("connection"));

    h.service
        .update_connections(TOKEN, &cfg.thing_id, &ids(&["b"]))
        .await
        .unwrap();

    assert_eq!(h.stored(&cfg.thing_id).await.channel_ids(), vec!["b"]);
}

#[tokio::test]
async fn test_connect_failure_leaves_config_unchanged() {
    let h = harness();
    let cfg = h.add_config("ext-1", &["a"]).await;
    h.service
        .change_state(TOKEN, &cfg.thing_id, State::Active)
        .await
        .unwrap();
    h.seed_channels(&["b"]);
    h.registry
        .fail_connect("b", ProvisError::RemoteFailure("503".into()));

    let err = h
        .service
        .update_connections(TOKEN, &cfg.thing_id, &ids(&["b"]))
        .await
        .unwrap_err();

    assert!(err.is_things());
    assert_eq!(err.kind(), ErrorKind::RemoteFailure);
    let stored = h.stored(&cfg.thing_id).await;
    assert_eq!(stored.channel_ids(), vec!["a"]);
    assert_eq!(stored.state, State::Active);
}

#[tokio::test]
async fn test_disconnect_failure_leaves_config_unchanged() {
    let h = harness();
    let cfg = h.add_config("ext-1", &["a", "b"]).await;
    h.service
        .change_state(TOKEN, &cfg.thing_id, State::Active)
        .await
        .unwrap();
    h.registry
        .fail_disconnect("a", ProvisError::RemoteFailure("503".into()));

    let err = h
        .service
        .update_connections(TOKEN, &cfg.thing_id, &ids(&["b"]))
        .await
        .unwrap_err();

    assert!(matches!(err.failure, Failure::Things));
    let mut channel_ids = h.stored(&cfg.thing_id).await.channel_ids();
    channel_ids.sort();
    assert_eq!(channel_ids, vec!["a", "b"]);
}

#[tokio::test]
async fn test_unresolvable_channel_adds_nothing() {
    let h = harness();
    let cfg = h.add_config("ext-1", &["a"]).await;
    h.seed_channels(&["b"]);
    h.registry
        .fail_channel("c", ProvisError::RemoteFailure("503".into()));

    let err = h
        .service
        .update_connections(TOKEN, &cfg.thing_id, &ids(&["a", "b", "c"]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedEntity);
    assert_eq!(h.stored(&cfg.thing_id).await.channel_ids(), vec!["a"]);
    assert!(h.store.cached_channel("b").is_none());
}

#[tokio::test]
async fn test_unknown_config() {
    let h = harness();

    let err = h
        .service
        .update_connections(TOKEN, "missing", &ids(&["a"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_requires_edit_permission() {
    let h = harness();
    let cfg = h.add_config("ext-1", &["a"]).await;
    h.auth.deny(EDIT_PERMISSION, &cfg.thing_id);
    h.registry.reset_calls();

    let err = h
        .service
        .update_connections(TOKEN, &cfg.thing_id, &ids(&[]))
        .await
        .unwrap_err();

    assert!(matches!(err.failure, Failure::Authorization));
    assert_eq!(h.registry.calls.total(), 0);
    assert_eq!(h.stored(&cfg.thing_id).await.channel_ids(), vec!["a"]);
}

#[tokio::test]
async fn test_emptying_connections() {
    let h = harness();
    let cfg = h.add_config("ext-1", &["a", "b"]).await;

    h.service
        .update_connections(TOKEN, &cfg.thing_id, &[])
        .await
        .unwrap();

    let stored = h
        .store
        .retrieve_by_id(common::DOMAIN, &cfg.thing_id)
        .await
        .unwrap();
    assert!(stored.channels.is_empty());
}
