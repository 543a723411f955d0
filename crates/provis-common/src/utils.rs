//! Utility functions and id generation

/// Source of unique entity identifiers
pub trait IdProvider: Send + Sync {
    /// Generate a new unique id
    fn id(&self) -> anyhow::Result<String>;
}

/// Random UUID (v4) id provider
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn id(&self) -> anyhow::Result<String> {
        Ok(uuid::Uuid::new_v4().to_string())
    }
}

/// Deduplicate ids, keeping the first occurrence of each
pub fn dedup_ids<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter()
        .map(|id| id.as_ref())
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}
