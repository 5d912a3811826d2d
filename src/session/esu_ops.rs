//! Unit surgery: dividing one ESU into two and merging two into one.
//!
//! Both operations run whole, not through an editor. The affected
//! units are retired and their replacements inserted in a single
//! aggregate step, and the fresh keys are protected so a later editor
//! discard cannot unpick half an operation.

use thiserror::Error;
use time::Date;

use crate::core::collection::SubRecord;
use crate::core::dates::today;
use crate::core::domain::ChangeType;
use crate::core::error::GeometryError;
use crate::core::esu::{Esu, HighwayDedication, OneWayExemption};
use crate::core::geometry::LineString;
use crate::core::identity::{EsuId, PkId};
use crate::core::reconcile::{ReconcileError, StreetPatches};
use crate::core::street::Street;
use crate::error::{Effect, Transience};
use crate::index::StreetIndexEntry;

use super::EditorSession;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EsuOpError {
    #[error("no esu {0} on this street")]
    UnknownEsu(EsuId),
    #[error("esu {0} is closed and cannot be reshaped")]
    NotLive(EsuId),
    #[error("merging needs two distinct esus")]
    SameEsu,
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl EsuOpError {
    pub fn transience(&self) -> Transience {
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}

#[derive(Clone, Debug)]
pub struct DivideOutcome {
    pub retired: EsuId,
    pub parts: [EsuId; 2],
    pub entry: StreetIndexEntry,
}

#[derive(Clone, Debug)]
pub struct MergeOutcome {
    pub retired: [EsuId; 2],
    pub merged: EsuId,
    pub entry: StreetIndexEntry,
}

/// Running key allocator for one operation. Every key handed out is
/// remembered so the whole batch can be protected at commit.
struct Minted {
    next: i64,
    taken: Vec<PkId>,
}

impl Minted {
    fn from_street(street: &Street) -> Self {
        Self {
            next: street.next_pk_id().value(),
            taken: Vec::new(),
        }
    }

    fn take(&mut self) -> PkId {
        let pk_id = PkId::synthetic(self.next);
        self.next -= 1;
        self.taken.push(pk_id);
        pk_id
    }
}

impl EditorSession {
    /// Split a live unit into two parts along geometry the caller has
    /// already drawn. The original is retired and both parts enter as
    /// inserts carrying its attributes, with its live children copied
    /// onto each part under fresh keys.
    pub fn divide_esu(
        &mut self,
        esu_id: EsuId,
        first_wkt: &str,
        second_wkt: &str,
    ) -> Result<DivideOutcome, EsuOpError> {
        LineString::parse(first_wkt)?;
        LineString::parse(second_wkt)?;
        let original = self
            .current
            .esu(esu_id)
            .ok_or(EsuOpError::UnknownEsu(esu_id))?;
        if !original.is_live() {
            return Err(EsuOpError::NotLive(esu_id));
        }
        let original = original.clone();

        let mut minted = Minted::from_street(&self.current);
        let today = today();
        let first = division_part(&original, first_wkt, &mut minted, today);
        let second = division_part(&original, second_wkt, &mut minted, today);
        let parts = [first.esu_id, second.esu_id];

        let mut esus = self.current.core.esus.clone();
        retire(&mut esus, original.pk_id, today);
        esus.push(first);
        esus.push(second);
        self.commit_units(esus, minted)?;
        Ok(DivideOutcome {
            retired: esu_id,
            parts,
            entry: self.index_entry(),
        })
    }

    /// Replace two live units with one covering their union geometry.
    ///
    /// When the two agree on attributes and live children the merged
    /// unit inherits them from the first; otherwise it starts from the
    /// authority defaults with no children, for the user to redo.
    pub fn merge_esus(
        &mut self,
        first: EsuId,
        second: EsuId,
        union_wkt: &str,
    ) -> Result<MergeOutcome, EsuOpError> {
        if first == second {
            return Err(EsuOpError::SameEsu);
        }
        LineString::parse(union_wkt)?;
        let a = self
            .current
            .esu(first)
            .ok_or(EsuOpError::UnknownEsu(first))?;
        let b = self
            .current
            .esu(second)
            .ok_or(EsuOpError::UnknownEsu(second))?;
        if !a.is_live() {
            return Err(EsuOpError::NotLive(first));
        }
        if !b.is_live() {
            return Err(EsuOpError::NotLive(second));
        }
        let mergeable = mergeable(a, b);
        let (a_pk, b_pk) = (a.pk_id, b.pk_id);
        let a = a.clone();

        let mut minted = Minted::from_street(&self.current);
        let today = today();
        let merged = if mergeable {
            division_part(&a, union_wkt, &mut minted, today)
        } else {
            let mut merged = self.template.new_esu(minted.take(), today);
            merged.wkt_geometry = union_wkt.to_owned();
            merged
        };
        let merged_id = merged.esu_id;

        let mut esus = self.current.core.esus.clone();
        retire(&mut esus, a_pk, today);
        retire(&mut esus, b_pk, today);
        esus.push(merged);
        self.commit_units(esus, minted)?;
        Ok(MergeOutcome {
            retired: [first, second],
            merged: merged_id,
            entry: self.index_entry(),
        })
    }

    fn commit_units(&mut self, esus: Vec<Esu>, minted: Minted) -> Result<(), ReconcileError> {
        self.reconcile_current(StreetPatches::default().with_esus(esus))?;
        self.protected.extend(minted.taken);
        Ok(())
    }
}

/// One replacement unit: the original's attributes on new geometry, its
/// live children re-keyed and re-parented.
fn division_part(original: &Esu, wkt: &str, minted: &mut Minted, today: Date) -> Esu {
    let pk_id = minted.take();
    let esu_id = EsuId::synthetic(pk_id.value());
    Esu {
        pk_id,
        esu_id,
        wkt_geometry: wkt.to_owned(),
        esu_start_date: Some(today),
        esu_end_date: None,
        esu_direction: original.esu_direction,
        esu_tolerance: original.esu_tolerance,
        esu_classification: original.esu_classification,
        assign_unassign: original.assign_unassign,
        change_type: Some(ChangeType::Insert),
        highway_dedications: adopted_dedications(original, esu_id, minted),
        one_way_exemptions: adopted_exemptions(original, esu_id, minted),
    }
}

fn adopted_dedications(
    original: &Esu,
    esu_id: EsuId,
    minted: &mut Minted,
) -> Vec<HighwayDedication> {
    original
        .live_highway_dedications()
        .map(|hd| {
            let mut hd = hd.clone();
            hd.pk_id = minted.take();
            hd.esu_id = esu_id;
            hd.change_type = Some(ChangeType::Insert);
            hd
        })
        .collect()
}

fn adopted_exemptions(original: &Esu, esu_id: EsuId, minted: &mut Minted) -> Vec<OneWayExemption> {
    original
        .live_one_way_exemptions()
        .map(|owe| {
            let mut owe = owe.clone();
            owe.pk_id = minted.take();
            owe.esu_id = esu_id;
            owe.change_type = Some(ChangeType::Insert);
            owe
        })
        .collect()
}

/// Unsaved units vanish outright; persisted ones are tombstoned with
/// their children.
fn retire(esus: &mut Vec<Esu>, pk_id: PkId, end: Date) {
    if let Some(idx) = esus.iter().position(|e| e.pk_id == pk_id) {
        if esus[idx].pk_id.is_unsaved() {
            esus.remove(idx);
        } else {
            esus[idx].tombstone(end);
        }
    }
}

/// Whether a merged unit can inherit rather than reset. Keys and dates
/// are expected to differ; attributes and live children must not.
fn mergeable(a: &Esu, b: &Esu) -> bool {
    a.esu_direction == b.esu_direction
        && a.esu_tolerance == b.esu_tolerance
        && a.esu_classification == b.esu_classification
        && children_agree(
            a.live_highway_dedications(),
            b.live_highway_dedications(),
            HighwayDedication::merge_eq,
        )
        && children_agree(
            a.live_one_way_exemptions(),
            b.live_one_way_exemptions(),
            OneWayExemption::merge_eq,
        )
}

fn children_agree<'a, R: 'a>(
    a: impl IntoIterator<Item = &'a R>,
    b: impl IntoIterator<Item = &'a R>,
    eq: impl Fn(&R, &R) -> bool,
) -> bool {
    let a: Vec<&R> = a.into_iter().collect();
    let b: Vec<&R> = b.into_iter().collect();
    a.len() == b.len() && a.iter().zip(&b).all(|(x, y)| eq(x, y))
}
