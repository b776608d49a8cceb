// erasure-core/src/domain/grouping.rs

use std::collections::BTreeMap;

/// Buckets `items` by `key`, whatever the input order.
///
/// Groups come out ordered by key; items keep their relative input order inside a group.
pub fn partition_by<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<(K, Vec<T>)>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut buckets: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for item in items {
        buckets.entry(key(&item)).or_default().push(item);
    }
    buckets.into_iter().collect()
}
