// erasure-core/src/domain/unique_id.rs

use crate::domain::record::FieldRecord;

/// Picks the record whose column safely scopes row-level updates in a proximity group.
///
/// The catalog's designated identity unique id wins over any detected primary key.
/// `None` means the group must not be updated at all.
pub fn select_unique_id_record(group: &[FieldRecord]) -> Option<&FieldRecord> {
    group
        .iter()
        .find(|r| r.is_identity_unique_id)
        .or_else(|| group.iter().find(|r| r.is_primary_key))
}
