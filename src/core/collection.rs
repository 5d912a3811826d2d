//! Layer 4: Collection machinery
//!
//! SubRecord/Sequenced: the traits every keyed sub-record implements,
//! letting one allocator and one delete path serve all fourteen
//! categories.
//! next_pk_id/next_seq_num: pure allocation over the current collection.
//! CollectionPatch: replace-or-keep patch slot for reconciliation.

use super::domain::ChangeType;
use super::identity::{PkId, SeqNum};

/// A keyed record inside one of the street's collections.
pub trait SubRecord {
    fn pk_id(&self) -> PkId;
    fn change_type(&self) -> Option<ChangeType>;
    fn set_change_type(&mut self, change_type: Option<ChangeType>);

    /// Tombstoned records stay in their collection but are not live.
    fn is_live(&self) -> bool {
        self.change_type() != Some(ChangeType::Delete)
    }

    /// Classify an edit: unsaved records stay inserts, persisted ones
    /// become updates. Tombstones and existing inserts are left alone.
    fn mark_edited(&mut self) {
        match self.change_type() {
            Some(ChangeType::Insert) | Some(ChangeType::Delete) => {}
            _ => {
                let next = if self.pk_id().is_unsaved() {
                    ChangeType::Insert
                } else {
                    ChangeType::Update
                };
                self.set_change_type(Some(next));
            }
        }
    }
}

/// A sub-record carrying an ordering position.
pub trait Sequenced: SubRecord {
    fn seq_num(&self) -> SeqNum;
}

/// Next synthetic primary key for an unsaved insert.
///
/// Starts at `PkId::SYNTHETIC_FLOOR` and decreases strictly from the
/// collection's minimum, so ids stay unique however many inserts pile up
/// before a save. Must be called against the latest collection, never a
/// stale snapshot.
pub fn next_pk_id<R: SubRecord>(records: &[R]) -> PkId {
    synthetic_below(records.iter().map(|r| r.pk_id().value()).min())
}

/// Floor rule shared by per-collection and street-wide allocation.
pub(crate) fn synthetic_below(lowest: Option<i64>) -> PkId {
    match lowest {
        Some(min) if min <= PkId::SYNTHETIC_FLOOR => PkId::synthetic(min - 1),
        _ => PkId::synthetic(PkId::SYNTHETIC_FLOOR),
    }
}

/// Next ordering position: one past the current maximum, 1 when empty.
pub fn next_seq_num<R: Sequenced>(records: &[R]) -> SeqNum {
    records
        .iter()
        .map(|r| r.seq_num())
        .max()
        .map(|max| max.next())
        .unwrap_or(SeqNum::FIRST)
}

/// What deleting a record did to its collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Unsaved insert: dropped from the collection entirely.
    Removed,
    /// Persisted record: retained with a delete marker for the backend.
    Tombstoned,
}

/// Delete by key: tombstone persisted records, remove unsaved inserts.
///
/// Returns `None` when no record carries the key.
pub fn delete_record<R: SubRecord>(records: &mut Vec<R>, pk_id: PkId) -> Option<DeleteOutcome> {
    delete_record_with(records, pk_id, |r| r.set_change_type(Some(ChangeType::Delete)))
}

/// [`delete_record`] with a caller-supplied tombstoning step, for record
/// families that also end-date on delete.
pub fn delete_record_with<R: SubRecord>(
    records: &mut Vec<R>,
    pk_id: PkId,
    tombstone: impl FnOnce(&mut R),
) -> Option<DeleteOutcome> {
    let idx = records.iter().position(|r| r.pk_id() == pk_id)?;
    if records[idx].pk_id().is_unsaved() {
        records.remove(idx);
        Some(DeleteOutcome::Removed)
    } else {
        tombstone(&mut records[idx]);
        Some(DeleteOutcome::Tombstoned)
    }
}

/// Replace-or-keep slot for one collection in a reconciliation pass.
///
/// `Keep` means "do not change this category"; clearing is never
/// requested by callers, it falls out of jurisdiction gating.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CollectionPatch<T> {
    #[default]
    Keep,
    Replace(Vec<T>),
}

impl<T> CollectionPatch<T> {
    pub fn apply(self, current: Vec<T>) -> Vec<T> {
        match self {
            CollectionPatch::Keep => current,
            CollectionPatch::Replace(next) => next,
        }
    }

    /// In-place form of [`apply`](Self::apply) for a slot already owned
    /// by the new aggregate.
    pub fn apply_to(self, slot: &mut Vec<T>) {
        if let CollectionPatch::Replace(records) = self {
            *slot = records;
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, CollectionPatch::Keep)
    }

    pub fn as_replace(&self) -> Option<&[T]> {
        match self {
            CollectionPatch::Keep => None,
            CollectionPatch::Replace(records) => Some(records),
        }
    }
}
