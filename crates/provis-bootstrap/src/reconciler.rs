//! Channel-set reconciliation
//!
//! Set arithmetic between a config's channels and a desired channel list.
//! Membership is decided with hash sets; results follow input order but
//! callers must not rely on any ordering.

use std::collections::HashSet;

use tracing::warn;

use provis_common::{ProvisError, dedup_ids};
use provis_persistence::Channel;
use provis_things::ThingsRegistry;

/// Channels to connect and disconnect to move from the current set to the desired one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelDiff {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl ChannelDiff {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Diff the current channels of a config against the desired ids
pub fn update_list(current: &[Channel], desired: &[String]) -> ChannelDiff {
    let current_ids: HashSet<&str> = current.iter().map(|ch| ch.id.as_str()).collect();
    let desired_ids: HashSet<&str> = desired.iter().map(String::as_str).collect();

    let add = dedup_ids(desired)
        .into_iter()
        .filter(|id| !current_ids.contains(id.as_str()))
        .collect();

    let remove = dedup_ids(&current.iter().map(|ch| ch.id.as_str()).collect::<Vec<_>>())
        .into_iter()
        .filter(|id| !desired_ids.contains(id.as_str()))
        .collect();

    ChannelDiff { add, remove }
}

/// Desired ids not already known locally
pub fn channels_to_fetch(desired: &[String], existing: &[String]) -> Vec<String> {
    let existing: HashSet<&str> = existing.iter().map(String::as_str).collect();
    dedup_ids(desired)
        .into_iter()
        .filter(|id| !existing.contains(id.as_str()))
        .collect()
}

/// Fetch every desired channel that is not known locally
///
/// All or nothing: the first failed fetch aborts with `MalformedEntity` and
/// no channel is returned. Known channels are not part of the result.
pub async fn connection_channels(
    registry: &dyn ThingsRegistry,
    desired: &[String],
    existing: &[String],
    token: &str,
) -> anyhow::Result<Vec<Channel>> {
    let to_fetch = channels_to_fetch(desired, existing);
    let mut channels = Vec::with_capacity(to_fetch.len());

    for id in to_fetch {
        let remote = registry.channel(&id, token).await.map_err(|e| {
            warn!(channel_id = %id, error = %e, "Failed to fetch channel");
            ProvisError::MalformedEntity(format!("channel {} cannot be resolved", id))
        })?;
        channels.push(cached_copy(remote));
    }

    Ok(channels)
}

/// Local cached copy of a remote channel
pub fn cached_copy(remote: provis_things::Channel) -> Channel {
    Channel {
        id: remote.id,
        name: remote.name,
        metadata: remote.metadata,
        domain_id: remote.domain_id,
        description: remote.description,
        updated_at: remote.updated_at,
        updated_by: remote.updated_by,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;
    use provis_common::error::{ErrorKind, kind_of};
    use provis_things::MemoryThingsRegistry;

    use super::*;

    fn channels(ids: &[&str]) -> Vec<Channel> {
        ids.iter().map(|id| Channel::with_id(*id)).collect()
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn remote(id: &str) -> provis_things::Channel {
        provis_things::Channel {
            id: id.to_string(),
            name: format!("channel {}", id),
            ..Default::default()
        }
    }

    #[test]
    fn test_update_list() {
        let diff = update_list(&channels(&["a", "b"]), &ids(&["b", "c", "c"]));
        assert_eq!(diff.add, vec!["c"]);
        assert_eq!(diff.remove, vec!["a"]);

        let diff = update_list(&channels(&["a"]), &ids(&["a", "b"]));
        assert_eq!(diff.add, vec!["b"]);
        assert!(diff.remove.is_empty());

        assert!(update_list(&channels(&["a", "b"]), &ids(&["b", "a"])).is_empty());
        assert!(update_list(&[], &[]).is_empty());
    }

    #[test]
    fn test_channels_to_fetch() {
        let fetch = channels_to_fetch(&ids(&["a", "b", "a", "c"]), &ids(&["b"]));
        assert_eq!(fetch, vec!["a", "c"]);
        assert!(channels_to_fetch(&ids(&["a"]), &ids(&["a"])).is_empty());
    }

    #[tokio::test]
    async fn test_connection_channels_fetches_unknown_only() {
        let registry = MemoryThingsRegistry::new();
        registry.add_channel(remote("a"));
        registry.add_channel(remote("b"));

        let fetched = connection_channels(&registry, &ids(&["a", "b"]), &ids(&["a"]), "tok")
            .await
            .unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, "b");
        assert_eq!(fetched[0].name, "channel b");
    }

    #[tokio::test]
    async fn test_connection_channels_all_or_nothing() {
        let registry = MemoryThingsRegistry::new();
        registry.add_channel(remote("a"));

        let err = connection_channels(&registry, &ids(&["a", "missing"]), &[], "tok")
            .await
            .unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::MalformedEntity));
    }

    fn id_list() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-f]", 0..8)
    }

    proptest! {
        #[test]
        fn prop_update_list_is_set_difference(current in id_list(), desired in id_list()) {
            let current_channels: Vec<Channel> =
                current.iter().map(|id| Channel::with_id(id.clone())).collect();
            let diff = update_list(&current_channels, &desired);

            let c: BTreeSet<String> = current.iter().cloned().collect();
            let d: BTreeSet<String> = desired.iter().cloned().collect();
            let add: BTreeSet<String> = diff.add.iter().cloned().collect();
            let remove: BTreeSet<String> = diff.remove.iter().cloned().collect();

            let expected_add: BTreeSet<String> = d.difference(&c).cloned().collect();
            let expected_remove: BTreeSet<String> = c.difference(&d).cloned().collect();

            prop_assert_eq!(&add, &expected_add);
            prop_assert_eq!(&remove, &expected_remove);
            prop_assert!(add.is_disjoint(&remove));
            prop_assert_eq!(add.len(), diff.add.len());
            prop_assert_eq!(remove.len(), diff.remove.len());
        }

        #[test]
        fn prop_update_list_same_set_is_empty(current in id_list()) {
            let current_channels: Vec<Channel> =
                current.iter().map(|id| Channel::with_id(id.clone())).collect();
            let mut desired = current.clone();
            desired.reverse();
            prop_assert!(update_list(&current_channels, &desired).is_empty());
        }
    }
}
