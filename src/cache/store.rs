//! Result store and type index
//!
//! Both maps are plain owned state. They are mutated only from the cache
//! exchange's event handlers, which process one event at a time, so no
//! locking is involved. Wrap the owning exchange in a lock before sharing it
//! between independently driven pipelines.

use crate::cache::{
    entry::CachedResult,
    invalidation::{InvalidationEvent, InvalidationReason, Sweep},
};
use crate::operation::{OperationKey, OperationResult};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Last successful result per operation identity
#[derive(Debug, Default)]
pub struct ResultStore {
    entries: HashMap<OperationKey, CachedResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &OperationKey) -> Option<&CachedResult> {
        self.entries.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &OperationKey) -> Option<&mut CachedResult> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &OperationKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or overwrite the entry for `key`
    pub fn insert(&mut self, key: OperationKey, entry: CachedResult) -> Option<CachedResult> {
        self.entries.insert(key, entry)
    }

    pub fn remove(&mut self, key: &OperationKey) -> Option<CachedResult> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OperationKey, &CachedResult)> {
        self.entries.iter()
    }

    pub fn clear(&mut self) -> Vec<OperationKey> {
        self.entries.drain().map(|(key, _)| key).collect()
    }
}

/// Type name to the identities whose stored result contains it
///
/// Buckets are created on first reference and emptied, not removed, when
/// swept.
#[derive(Debug, Default)]
pub struct TypeIndex {
    buckets: HashMap<String, HashSet<OperationKey>>,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key` under each type name
    pub fn track<'a>(&mut self, key: OperationKey, type_names: impl IntoIterator<Item = &'a String>) {
        for type_name in type_names {
            self.buckets
                .entry(type_name.clone())
                .or_default()
                .insert(key);
        }
    }

    /// Current members of a bucket, if the bucket exists
    pub fn bucket(&self, type_name: &str) -> Option<&HashSet<OperationKey>> {
        self.buckets.get(type_name)
    }

    /// Whether `key` is recorded under `type_name`
    pub fn contains(&self, type_name: &str, key: &OperationKey) -> bool {
        self.buckets
            .get(type_name)
            .map(|bucket| bucket.contains(key))
            .unwrap_or(false)
    }

    /// Take the members of a bucket, leaving it empty
    pub fn take(&mut self, type_name: &str) -> HashSet<OperationKey> {
        let bucket = self.buckets.entry(type_name.to_string()).or_default();
        std::mem::take(bucket)
    }

    /// Number of buckets, empty ones included
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

/// The result store and type index, kept consistent with each other
#[derive(Debug, Default)]
pub struct CacheStore {
    results: ResultStore,
    types: TypeIndex,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    pub fn types(&self) -> &TypeIndex {
        &self.types
    }

    pub fn get(&self, key: &OperationKey) -> Option<&CachedResult> {
        self.results.get(key)
    }

    pub fn contains(&self, key: &OperationKey) -> bool {
        self.results.contains(key)
    }

    /// Read a stored result for serving, counting the hit on the entry
    pub fn serve(&mut self, key: &OperationKey) -> Option<OperationResult> {
        let entry = self.results.get_mut(key)?;
        entry.mark_served();
        Some(entry.result.clone())
    }

    /// Store a query result and index it under its type names
    pub fn store(&mut self, result: OperationResult, type_names: BTreeSet<String>) {
        let key = result.operation.key;
        self.types.track(key, &type_names);
        if self
            .results
            .insert(key, CachedResult::new(result, type_names))
            .is_some()
        {
            debug!("Refreshed cached result: {}", key.short());
        } else {
            debug!("Cached new result: {}", key.short());
        }
    }

    /// Empty the buckets for `type_names` and remove every stored entry they
    /// referenced
    ///
    /// Each identity is removed at most once however many of the swept types
    /// it appeared under. Identities no longer in the store are skipped.
    pub fn sweep(&mut self, type_names: &BTreeSet<String>, reason: InvalidationReason) -> Sweep {
        let mut pending = BTreeSet::new();
        for type_name in type_names {
            pending.extend(self.types.take(type_name));
        }

        let mut keys = Vec::new();
        let mut stale = Vec::new();
        for key in pending {
            if let Some(entry) = self.results.remove(&key) {
                keys.push(key);
                stale.push(entry.result.operation);
            }
        }

        let context = format!(
            "swept {} type(s), removed {} entr{}",
            type_names.len(),
            keys.len(),
            if keys.len() == 1 { "y" } else { "ies" }
        );

        Sweep {
            event: InvalidationEvent::new(reason, keys).with_context(context),
            stale,
        }
    }

    /// Drop every entry and bucket
    pub fn clear(&mut self) -> InvalidationEvent {
        let keys = self.results.clear();
        self.types.clear();
        InvalidationEvent::new(InvalidationReason::Cleared, keys)
    }

    /// Every stored identity is indexed under every type its result carried
    pub fn is_consistent(&self) -> bool {
        self.results.iter().all(|(key, entry)| {
            entry
                .metadata
                .type_names
                .iter()
                .all(|type_name| self.types.contains(type_name, key))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use serde_json::json;

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn result(query: &str) -> OperationResult {
        OperationResult::data(Operation::query(query, json!({})), json!({"ok": true}))
    }

    #[test]
    fn test_store_indexes_types() {
        let mut store = CacheStore::new();
        let res = result("{ user { id } }");
        let key = res.operation.key;

        store.store(res, names(&["User", "Post"]));

        assert!(store.contains(&key));
        assert!(store.types().contains("User", &key));
        assert!(store.types().contains("Post", &key));
        assert!(store.is_consistent());
    }

    #[test]
    fn test_store_overwrites_entry() {
        let mut store = CacheStore::new();
        let first = result("{ user { id } }");
        let key = first.operation.key;
        let mut second = first.clone();
        second.data = Some(json!({"ok": false}));

        store.store(first, names(&["User"]));
        store.store(second, names(&["User"]));

        assert_eq!(store.results().len(), 1);
        assert_eq!(store.get(&key).unwrap().result.data, Some(json!({"ok": false})));
    }

    #[test]
    fn test_serve_counts_hits() {
        let mut store = CacheStore::new();
        let res = result("{ a }");
        let key = res.operation.key;
        store.store(res.clone(), BTreeSet::new());

        assert_eq!(store.serve(&key), Some(res));
        assert_eq!(store.get(&key).unwrap().metadata.serve_count, 1);

        let missing = Operation::query("{ b }", json!({})).key;
        assert!(store.serve(&missing).is_none());
    }

    #[test]
    fn test_sweep_deduplicates_across_types() {
        let mut store = CacheStore::new();
        let both = result("{ user { posts { id } } }");
        let user_only = result("{ user { id } }");
        let post_only = result("{ posts { id } }");
        let (both_key, user_key, post_key) =
            (both.operation.key, user_only.operation.key, post_only.operation.key);

        store.store(both, names(&["User", "Post"]));
        store.store(user_only, names(&["User"]));
        store.store(post_only, names(&["Post"]));

        let sweep = store.sweep(
            &names(&["User", "Post"]),
            InvalidationReason::Manual {
                type_names: names(&["User", "Post"]),
            },
        );

        assert_eq!(sweep.stale.len(), 3);
        assert_eq!(sweep.event.keys.len(), 3);
        for key in [both_key, user_key, post_key] {
            assert_eq!(sweep.stale.iter().filter(|op| op.key == key).count(), 1);
            assert!(!store.contains(&key));
        }
        assert!(store.types().bucket("User").unwrap().is_empty());
        assert!(store.types().bucket("Post").unwrap().is_empty());
    }

    #[test]
    fn test_sweep_leaves_other_types_alone() {
        let mut store = CacheStore::new();
        let user = result("{ user { id } }");
        let post = result("{ posts { id } }");
        let (user_key, post_key) = (user.operation.key, post.operation.key);
        store.store(user, names(&["User"]));
        store.store(post, names(&["Post"]));

        let sweep = store.sweep(
            &names(&["Post"]),
            InvalidationReason::MutationResult {
                type_names: names(&["Post"]),
            },
        );

        assert_eq!(sweep.event.keys, vec![post_key]);
        assert!(store.contains(&user_key));
        assert!(!store.contains(&post_key));
        assert!(store.is_consistent());
    }

    #[test]
    fn test_sweep_creates_missing_bucket_and_skips_absent_keys() {
        let mut store = CacheStore::new();
        let sweep = store.sweep(&names(&["Comment"]), InvalidationReason::Cleared);
        assert!(sweep.stale.is_empty());
        assert!(store.types().bucket("Comment").is_some());

        // Key indexed under two types; the first sweep removes the entry,
        // the second only finds a stale bucket member.
        let res = result("{ x }");
        store.store(res, names(&["A", "B"]));
        assert_eq!(store.sweep(&names(&["A"]), InvalidationReason::Cleared).stale.len(), 1);
        assert!(store.sweep(&names(&["B"]), InvalidationReason::Cleared).stale.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut store = CacheStore::new();
        store.store(result("{ a }"), names(&["A"]));
        store.store(result("{ b }"), names(&["B"]));

        let event = store.clear();
        assert_eq!(event.keys.len(), 2);
        assert!(store.results().is_empty());
        assert!(store.types().is_empty());
    }
}
