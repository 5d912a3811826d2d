//! The editor session: one street aggregate under edit.
//!
//! A session keeps two aggregates. `source` is the last canonical shape
//! adopted from persistence; `current` is source plus every edit made
//! since. Edits land in `current` as they are staged, so closing an
//! editor is pure bookkeeping: a commit protects the record's unsaved
//! inserts from later discards, a discard drops the inserts that were
//! never accepted. Nothing reverts a persisted record short of
//! refetching the street.

mod esu_ops;
mod save;

pub use esu_ops::{DivideOutcome, EsuOpError, MergeOutcome};
pub use save::{
    ConfirmDecision, ConfirmEdit, ConfirmPrompt, FieldError, PersistStreet, SaveError,
    SaveOutcome, TransportError, ValidateStreet, ValidationOutcome, classify_response,
};

use std::collections::BTreeSet;

use thiserror::Error;

use crate::config::GazetteerConfig;
use crate::core::asd::{
    AsdCommon, AsdRecord, Construction, HeightWidthWeight, Interest, MaintenanceResponsibility,
    OsSpecialDesignation, PublicRightOfWay, ReinstatementCategory, SpecialDesignation,
};
use crate::core::collection::{self, DeleteOutcome, SubRecord};
use crate::core::dates::today;
use crate::core::descriptor::StreetDescriptor;
use crate::core::domain::{AsdCategory, EditorCategory, Jurisdiction, Language};
use crate::core::error::CoreError;
use crate::core::esu::{Esu, HighwayDedication, OneWayExemption};
use crate::core::geometry;
use crate::core::identity::{EsuId, PkId};
use crate::core::note::StreetNote;
use crate::core::reconcile::{AsdSlot, ReconcileError, ReconcileOptions, StreetPatches, reconcile};
use crate::core::street::{Street, StreetCore, StreetData};
use crate::core::successor::SuccessorCrossRef;
use crate::error::{Effect, Transience};
use crate::index::{EditFocus, StreetIndexEntry};
use crate::lookup::{DescriptorDefaults, StreetLookup};
use crate::template::StreetTemplate;

/// Expand one generic expression per additional street data category,
/// with `$R` bound to the record type of the matched arm.
macro_rules! for_asd {
    ($cat:expr, $R:ident => $body:expr) => {
        match $cat {
            AsdCategory::MaintenanceResponsibility => {
                type $R = MaintenanceResponsibility;
                $body
            }
            AsdCategory::ReinstatementCategory => {
                type $R = ReinstatementCategory;
                $body
            }
            AsdCategory::OsSpecialDesignation => {
                type $R = OsSpecialDesignation;
                $body
            }
            AsdCategory::Interest => {
                type $R = Interest;
                $body
            }
            AsdCategory::Construction => {
                type $R = Construction;
                $body
            }
            AsdCategory::SpecialDesignation => {
                type $R = SpecialDesignation;
                $body
            }
            AsdCategory::HeightWidthWeight => {
                type $R = HeightWidthWeight;
                $body
            }
            AsdCategory::PublicRightOfWay => {
                type $R = PublicRightOfWay;
                $body
            }
        }
    };
}

macro_rules! staged_dispatch {
    ($staged:expr, $r:ident => $body:expr) => {
        match $staged {
            StagedRecord::Descriptor($r) => $body,
            StagedRecord::Esu($r) => $body,
            StagedRecord::HighwayDedication($r) => $body,
            StagedRecord::OneWayExemption($r) => $body,
            StagedRecord::Note($r) => $body,
            StagedRecord::SuccessorCrossRef($r) => $body,
            StagedRecord::MaintenanceResponsibility($r) => $body,
            StagedRecord::ReinstatementCategory($r) => $body,
            StagedRecord::OsSpecialDesignation($r) => $body,
            StagedRecord::Interest($r) => $body,
            StagedRecord::Construction($r) => $body,
            StagedRecord::SpecialDesignation($r) => $body,
            StagedRecord::HeightWidthWeight($r) => $body,
            StagedRecord::PublicRightOfWay($r) => $body,
        }
    };
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no {} record {} on this street", .category.as_str(), .pk_id)]
    UnknownRecord {
        category: EditorCategory,
        pk_id: PkId,
    },
    #[error("no esu {0} on this street")]
    UnknownEsu(EsuId),
    #[error("{} records need a parent esu", .0.as_str())]
    MissingParent(EditorCategory),
    #[error("no editor is open")]
    NothingOpen,
    #[error("staged {} record {} does not match the open editor", .category.as_str(), .pk_id)]
    EditorMismatch {
        category: EditorCategory,
        pk_id: PkId,
    },
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl SessionError {
    pub fn transience(&self) -> Transience {
        match self {
            Self::Reconcile(e) => e.transience(),
            _ => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Self::Reconcile(e) => e.effect(),
            _ => Effect::None,
        }
    }
}

/// How a select signal resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Close whatever editor is open.
    Close,
    /// Allocate a fresh record and open it.
    New,
    /// Open an existing record by key.
    Existing(PkId),
}

impl Selection {
    /// Decode the wire signal: -1 closes, 0 allocates, anything else
    /// names an existing key.
    pub fn from_signal(signal: i64) -> Result<Self, CoreError> {
        match signal {
            -1 => Ok(Self::Close),
            0 => Ok(Self::New),
            other => Ok(Self::Existing(PkId::new(other)?)),
        }
    }
}

/// What a select call did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SelectOutcome {
    /// No editor is open any more.
    Closed,
    /// An editor opened; the focus says what the map should highlight.
    Opened(EditFocus),
}

impl SelectOutcome {
    pub fn focus(&self) -> Option<EditFocus> {
        match self {
            Self::Closed => None,
            Self::Opened(focus) => Some(*focus),
        }
    }
}

/// Bookkeeping for the one editor allowed open at a time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OpenEditor {
    pub category: EditorCategory,
    pub pk_id: PkId,
    /// Owning unit, for the two child-record categories.
    pub parent: Option<EsuId>,
    /// Position of the record within its collection.
    pub index: usize,
    /// Record count of that collection.
    pub total: usize,
}

/// The three home-button flavours an editor form offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HomeAction {
    /// Compare first; prompt only when the record changed.
    Check,
    Save,
    Discard,
}

/// What a home click left behind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HomeOutcome {
    /// The editor is closed.
    pub closed: bool,
    /// Validation rejected the commit and the editor stayed open.
    pub failed_validation: bool,
}

/// One record's live editor value, typed per category.
#[derive(Clone, Debug)]
pub enum StagedRecord {
    Descriptor(StreetDescriptor),
    Esu(Esu),
    HighwayDedication(HighwayDedication),
    OneWayExemption(OneWayExemption),
    Note(StreetNote),
    SuccessorCrossRef(SuccessorCrossRef),
    MaintenanceResponsibility(MaintenanceResponsibility),
    ReinstatementCategory(ReinstatementCategory),
    OsSpecialDesignation(OsSpecialDesignation),
    Interest(Interest),
    Construction(Construction),
    SpecialDesignation(SpecialDesignation),
    HeightWidthWeight(HeightWidthWeight),
    PublicRightOfWay(PublicRightOfWay),
}

impl StagedRecord {
    pub fn category(&self) -> EditorCategory {
        match self {
            Self::Descriptor(_) => EditorCategory::Descriptor,
            Self::Esu(_) => EditorCategory::Esu,
            Self::HighwayDedication(_) => EditorCategory::HighwayDedication,
            Self::OneWayExemption(_) => EditorCategory::OneWayExemption,
            Self::Note(_) => EditorCategory::Note,
            Self::SuccessorCrossRef(_) => EditorCategory::SuccessorCrossRef,
            Self::MaintenanceResponsibility(_) => {
                EditorCategory::Asd(AsdCategory::MaintenanceResponsibility)
            }
            Self::ReinstatementCategory(_) => {
                EditorCategory::Asd(AsdCategory::ReinstatementCategory)
            }
            Self::OsSpecialDesignation(_) => EditorCategory::Asd(AsdCategory::OsSpecialDesignation),
            Self::Interest(_) => EditorCategory::Asd(AsdCategory::Interest),
            Self::Construction(_) => EditorCategory::Asd(AsdCategory::Construction),
            Self::SpecialDesignation(_) => EditorCategory::Asd(AsdCategory::SpecialDesignation),
            Self::HeightWidthWeight(_) => EditorCategory::Asd(AsdCategory::HeightWidthWeight),
            Self::PublicRightOfWay(_) => EditorCategory::Asd(AsdCategory::PublicRightOfWay),
        }
    }

    pub fn pk_id(&self) -> PkId {
        staged_dispatch!(self, r => r.pk_id())
    }
}

/// Staging controller for one street.
#[derive(Clone, Debug)]
pub struct EditorSession {
    jurisdiction: Jurisdiction,
    options: ReconcileOptions,
    template: StreetTemplate,
    defaults: DescriptorDefaults,
    /// Display name stamped onto notes this session touches.
    user: Option<String>,
    source: Street,
    current: Street,
    open: Option<OpenEditor>,
    /// Category just intentionally closed; suppresses one re-derivation
    /// of the open editor when the aggregate is replaced.
    clearing: Option<EditorCategory>,
    /// Unsaved inserts accepted by a commit or minted by divide/merge.
    /// Discard never removes these.
    protected: BTreeSet<PkId>,
    failed_validation: bool,
}

impl EditorSession {
    /// Session over a fetched aggregate. The incoming shape is conformed
    /// to the jurisdiction gating before anything else sees it.
    pub fn for_street(
        street: Street,
        jurisdiction: Jurisdiction,
        config: &GazetteerConfig,
        lookup: &dyn StreetLookup,
    ) -> Result<Self, ReconcileError> {
        let options = config.reconcile_options();
        let source = reconcile(&street, StreetPatches::default(), &jurisdiction, &options)?;
        Ok(Self {
            jurisdiction,
            options,
            template: config.template(),
            defaults: DescriptorDefaults::resolve(lookup, Language::Eng),
            user: None,
            current: source.clone(),
            source,
            open: None,
            clearing: None,
            protected: BTreeSet::new(),
            failed_validation: false,
        })
    }

    /// Session over a brand-new provisional street.
    pub fn new_street(
        jurisdiction: Jurisdiction,
        config: &GazetteerConfig,
        lookup: &dyn StreetLookup,
    ) -> Self {
        let template = config.template();
        let source = template.new_street(&jurisdiction, today());
        Self {
            jurisdiction,
            options: config.reconcile_options(),
            template,
            defaults: DescriptorDefaults::resolve(lookup, Language::Eng),
            user: None,
            current: source.clone(),
            source,
            open: None,
            clearing: None,
            protected: BTreeSet::new(),
            failed_validation: false,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn current(&self) -> &Street {
        &self.current
    }

    pub fn source(&self) -> &Street {
        &self.source
    }

    pub fn jurisdiction(&self) -> &Jurisdiction {
        &self.jurisdiction
    }

    pub fn open_editor(&self) -> Option<OpenEditor> {
        self.open
    }

    pub fn failed_validation(&self) -> bool {
        self.failed_validation
    }

    /// Anything unsaved anywhere in the aggregate.
    pub fn is_dirty(&self) -> bool {
        self.current != self.source
    }

    pub fn index_entry(&self) -> StreetIndexEntry {
        StreetIndexEntry::from_street(&self.current)
    }

    /// Route a selection: close, allocate-and-open, or open existing.
    ///
    /// `parent` names the owning unit when allocating a child record;
    /// other categories ignore it. Opening replaces whatever editor was
    /// open before, its staged data staying in the aggregate.
    pub fn select(
        &mut self,
        category: EditorCategory,
        selection: Selection,
        parent: Option<EsuId>,
    ) -> Result<SelectOutcome, SessionError> {
        match selection {
            Selection::Close => {
                if let Some(open) = self.open.take() {
                    self.clearing = Some(open.category);
                }
                Ok(SelectOutcome::Closed)
            }
            Selection::Existing(pk_id) => self.open_on(category, pk_id),
            Selection::New => {
                let pk_id = self.insert_new(category, parent)?;
                self.open_on(category, pk_id)
            }
        }
    }

    fn open_on(&mut self, category: EditorCategory, pk_id: PkId) -> Result<SelectOutcome, SessionError> {
        let open = locate(&self.current, category, pk_id)
            .ok_or(SessionError::UnknownRecord { category, pk_id })?;
        self.clearing = None;
        self.open = Some(open);
        Ok(SelectOutcome::Opened(EditFocus {
            object_type: category,
            id: pk_id,
        }))
    }

    /// Allocate one record at the authority defaults and fold it into
    /// the aggregate. Returns the synthetic key.
    fn insert_new(
        &mut self,
        category: EditorCategory,
        parent: Option<EsuId>,
    ) -> Result<PkId, SessionError> {
        let pk_id = self.current.next_pk_id();
        let usrn = self.current.core.usrn;
        let today = today();
        let patches = match category {
            EditorCategory::Descriptor => {
                let mut records = self.current.core.street_descriptors.clone();
                let primary = self.defaults.new_descriptor(pk_id, usrn, Language::Eng);
                // Bilingual gazetteers pair every new descriptor with a
                // second-language twin.
                let twin = self
                    .jurisdiction
                    .second_language()
                    .map(|language| primary.twin(PkId::synthetic(pk_id.value() - 1), language));
                records.push(primary);
                records.extend(twin);
                StreetPatches::default().with_street_descriptors(records)
            }
            EditorCategory::Esu => {
                let mut records = self.current.core.esus.clone();
                records.push(self.template.new_esu(pk_id, today));
                StreetPatches::default().with_esus(records)
            }
            EditorCategory::HighwayDedication => {
                let esu_id = parent.ok_or(SessionError::MissingParent(category))?;
                let mut esus = self.current.core.esus.clone();
                let esu = esus
                    .iter_mut()
                    .find(|e| e.esu_id == esu_id)
                    .ok_or(SessionError::UnknownEsu(esu_id))?;
                let seq_num = collection::next_seq_num(&esu.highway_dedications);
                esu.highway_dedications.push(self.template.new_highway_dedication(
                    pk_id, esu_id, usrn, seq_num, today,
                ));
                StreetPatches::default().with_esus(esus)
            }
            EditorCategory::OneWayExemption => {
                let esu_id = parent.ok_or(SessionError::MissingParent(category))?;
                let mut esus = self.current.core.esus.clone();
                let esu = esus
                    .iter_mut()
                    .find(|e| e.esu_id == esu_id)
                    .ok_or(SessionError::UnknownEsu(esu_id))?;
                let seq_num = collection::next_seq_num(&esu.one_way_exemptions);
                esu.one_way_exemptions
                    .push(self.template.new_one_way_exemption(pk_id, esu_id, seq_num, today));
                StreetPatches::default().with_esus(esus)
            }
            EditorCategory::Note => {
                let mut records = self.current.core.street_notes.clone();
                let mut note = StreetNote::unsaved(pk_id, usrn, collection::next_seq_num(&records));
                note.last_user = self.user.clone();
                records.push(note);
                StreetPatches::default().with_street_notes(records)
            }
            EditorCategory::SuccessorCrossRef => {
                let mut records = self
                    .current
                    .successor_cross_refs()
                    .ok_or(ReconcileError::ShapeMismatch { category })?
                    .clone();
                records.push(SuccessorCrossRef::unsaved(pk_id, usrn, today));
                StreetPatches::default().with_successor_cross_refs(records)
            }
            EditorCategory::Asd(cat) => {
                // New additional records start whole road, so their
                // geometry is the current unit union.
                let union = geometry::union_whole_road(
                    self.current.live_esu_wkts(),
                    self.options.geometry_epsilon,
                )
                .map_err(ReconcileError::from)?;
                for_asd!(cat, R => {
                    let slot = R::slot(&self.current)
                        .ok_or(ReconcileError::ShapeMismatch { category })?;
                    let seq_num = collection::next_seq_num(slot);
                    let mut records = slot.clone();
                    records.push(R::unsaved(AsdCommon::unsaved(pk_id, usrn, seq_num, union, today)));
                    R::patch(records)
                })
            }
        };
        self.reconcile_current(patches)?;
        Ok(pk_id)
    }

    /// Apply the live value of the open editor's record to the
    /// aggregate.
    ///
    /// The delta marker is derived against the canonical counterpart:
    /// staging a record back to its saved values clears the marker
    /// again.
    pub fn stage(&mut self, record: StagedRecord) -> Result<(), SessionError> {
        let open = self.open.ok_or(SessionError::NothingOpen)?;
        if open.category != record.category() || open.pk_id != record.pk_id() {
            return Err(SessionError::EditorMismatch {
                category: record.category(),
                pk_id: record.pk_id(),
            });
        }
        let unknown = SessionError::UnknownRecord {
            category: open.category,
            pk_id: open.pk_id,
        };
        let patches = match record {
            StagedRecord::Descriptor(d) => staged_into(
                &self.current.core.street_descriptors,
                &self.source.core.street_descriptors,
                d,
                StreetDescriptor::substantive_eq,
            )
            .map(|records| StreetPatches::default().with_street_descriptors(records))
            .ok_or(unknown)?,
            StagedRecord::Esu(mut e) => {
                // Children are owned by their own editors; the unit form
                // never replaces them.
                if let Some(existing) = self.current.core.esus.iter().find(|x| x.pk_id == e.pk_id) {
                    e.highway_dedications = existing.highway_dedications.clone();
                    e.one_way_exemptions = existing.one_way_exemptions.clone();
                }
                staged_into(
                    &self.current.core.esus,
                    &self.source.core.esus,
                    e,
                    Esu::substantive_eq,
                )
                .map(|records| StreetPatches::default().with_esus(records))
                .ok_or(unknown)?
            }
            StagedRecord::HighwayDedication(hd) => {
                let parent = hd.esu_id;
                let mut esus = self.current.core.esus.clone();
                let esu = esus
                    .iter_mut()
                    .find(|e| e.esu_id == parent)
                    .ok_or(SessionError::UnknownEsu(parent))?;
                let source = self
                    .source
                    .esu(parent)
                    .map(|e| e.highway_dedications.as_slice())
                    .unwrap_or_default();
                esu.highway_dedications = staged_into(
                    &esu.highway_dedications,
                    source,
                    hd,
                    HighwayDedication::substantive_eq,
                )
                .ok_or(unknown)?;
                StreetPatches::default().with_esus(esus)
            }
            StagedRecord::OneWayExemption(owe) => {
                let parent = owe.esu_id;
                let mut esus = self.current.core.esus.clone();
                let esu = esus
                    .iter_mut()
                    .find(|e| e.esu_id == parent)
                    .ok_or(SessionError::UnknownEsu(parent))?;
                let source = self
                    .source
                    .esu(parent)
                    .map(|e| e.one_way_exemptions.as_slice())
                    .unwrap_or_default();
                esu.one_way_exemptions = staged_into(
                    &esu.one_way_exemptions,
                    source,
                    owe,
                    OneWayExemption::substantive_eq,
                )
                .ok_or(unknown)?;
                StreetPatches::default().with_esus(esus)
            }
            StagedRecord::Note(mut n) => {
                n.last_user = self.user.clone();
                staged_into(
                    &self.current.core.street_notes,
                    &self.source.core.street_notes,
                    n,
                    StreetNote::substantive_eq,
                )
                .map(|records| StreetPatches::default().with_street_notes(records))
                .ok_or(unknown)?
            }
            StagedRecord::SuccessorCrossRef(s) => {
                let current = self
                    .current
                    .successor_cross_refs()
                    .ok_or(ReconcileError::ShapeMismatch {
                        category: open.category,
                    })?;
                let source = self
                    .source
                    .successor_cross_refs()
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                staged_into(current, source, s, SuccessorCrossRef::substantive_eq)
                    .map(|records| StreetPatches::default().with_successor_cross_refs(records))
                    .ok_or(unknown)?
            }
            StagedRecord::MaintenanceResponsibility(r) => self.asd_stage_patch(r)?,
            StagedRecord::ReinstatementCategory(r) => self.asd_stage_patch(r)?,
            StagedRecord::OsSpecialDesignation(r) => self.asd_stage_patch(r)?,
            StagedRecord::Interest(r) => self.asd_stage_patch(r)?,
            StagedRecord::Construction(r) => self.asd_stage_patch(r)?,
            StagedRecord::SpecialDesignation(r) => self.asd_stage_patch(r)?,
            StagedRecord::HeightWidthWeight(r) => self.asd_stage_patch(r)?,
            StagedRecord::PublicRightOfWay(r) => self.asd_stage_patch(r)?,
        };
        self.reconcile_current(patches)?;
        Ok(())
    }

    fn asd_stage_patch<R: AsdSlot>(&self, record: R) -> Result<StreetPatches, SessionError> {
        let category = EditorCategory::Asd(R::CATEGORY);
        let current = R::slot(&self.current).ok_or(ReconcileError::ShapeMismatch { category })?;
        let source = R::slot(&self.source).map(Vec::as_slice).unwrap_or_default();
        let pk_id = record.pk_id();
        let records = staged_into(current, source, record, |a, b| a.substantive_eq(b))
            .ok_or(SessionError::UnknownRecord { category, pk_id })?;
        Ok(R::patch(records))
    }

    /// Edit the street's own fields. Intended for the scalar fields;
    /// collection edits go through editors. Gating is re-enforced
    /// afterwards, so a record type change nulls newly ineligible
    /// collections. The street is marked edited.
    pub fn edit_street(&mut self, f: impl FnOnce(&mut StreetCore)) -> Result<(), ReconcileError> {
        let mut next = self.current.clone();
        f(&mut next.core);
        next.mark_edited();
        self.current = reconcile(&next, StreetPatches::default(), &self.jurisdiction, &self.options)?;
        Ok(())
    }

    /// Delete one record: unsaved inserts vanish, persisted records are
    /// tombstoned (and end-dated where the family carries dates). An
    /// editor open on the record closes.
    pub fn delete_record(
        &mut self,
        category: EditorCategory,
        pk_id: PkId,
    ) -> Result<DeleteOutcome, SessionError> {
        let end = today();
        let not_found = SessionError::UnknownRecord { category, pk_id };
        let (patches, outcome) = match category {
            EditorCategory::Descriptor => {
                let mut records = self.current.core.street_descriptors.clone();
                let outcome = collection::delete_record(&mut records, pk_id).ok_or(not_found)?;
                (StreetPatches::default().with_street_descriptors(records), outcome)
            }
            EditorCategory::Note => {
                let mut records = self.current.core.street_notes.clone();
                let outcome = collection::delete_record(&mut records, pk_id).ok_or(not_found)?;
                (StreetPatches::default().with_street_notes(records), outcome)
            }
            EditorCategory::Esu => {
                let mut records = self.current.core.esus.clone();
                let outcome =
                    collection::delete_record_with(&mut records, pk_id, |e| e.tombstone(end))
                        .ok_or(not_found)?;
                (StreetPatches::default().with_esus(records), outcome)
            }
            EditorCategory::HighwayDedication => {
                let mut esus = self.current.core.esus.clone();
                let outcome = esus
                    .iter_mut()
                    .find_map(|esu| {
                        collection::delete_record_with(&mut esu.highway_dedications, pk_id, |hd| {
                            hd.tombstone(end)
                        })
                    })
                    .ok_or(not_found)?;
                (StreetPatches::default().with_esus(esus), outcome)
            }
            EditorCategory::OneWayExemption => {
                let mut esus = self.current.core.esus.clone();
                let outcome = esus
                    .iter_mut()
                    .find_map(|esu| {
                        collection::delete_record_with(&mut esu.one_way_exemptions, pk_id, |owe| {
                            owe.tombstone(end)
                        })
                    })
                    .ok_or(not_found)?;
                (StreetPatches::default().with_esus(esus), outcome)
            }
            EditorCategory::SuccessorCrossRef => {
                let mut records = self
                    .current
                    .successor_cross_refs()
                    .ok_or(ReconcileError::ShapeMismatch { category })?
                    .clone();
                let outcome =
                    collection::delete_record_with(&mut records, pk_id, |s| s.tombstone(end))
                        .ok_or(not_found)?;
                (StreetPatches::default().with_successor_cross_refs(records), outcome)
            }
            EditorCategory::Asd(cat) => for_asd!(cat, R => {
                let mut records = R::slot(&self.current)
                    .ok_or(ReconcileError::ShapeMismatch { category })?
                    .clone();
                let outcome =
                    collection::delete_record_with(&mut records, pk_id, |r| r.tombstone(end))
                        .ok_or(not_found)?;
                (R::patch(records), outcome)
            }),
        };
        self.reconcile_current(patches)?;
        if self.open.map(|o| o.pk_id) == Some(pk_id) {
            self.open = None;
            self.clearing = Some(category);
        }
        self.close_if_gone();
        Ok(outcome)
    }

    /// Close the open editor via the home button.
    ///
    /// `Check` resolves to save or discard by comparing the record
    /// against its canonical counterpart and, when it differs, asking
    /// the confirmer. Commits are validated first; a failed validation
    /// leaves the editor open and the failure latched.
    pub fn home_click(
        &mut self,
        action: HomeAction,
        validator: &dyn ValidateStreet,
        confirmer: &mut dyn ConfirmEdit,
    ) -> Result<HomeOutcome, SessionError> {
        let open = self.open.ok_or(SessionError::NothingOpen)?;
        let commit = match action {
            HomeAction::Save => true,
            HomeAction::Discard => false,
            HomeAction::Check => {
                self.record_changed(open)
                    && confirmer.confirm(ConfirmPrompt::StagedEdit {
                        category: open.category,
                    }) == ConfirmDecision::Save
            }
        };
        if commit {
            Ok(self.commit_open(open, validator))
        } else {
            self.discard_open(open)
        }
    }

    /// Replace the aggregate wholesale: a canonical echo after a save, a
    /// navigation fetch, or a collaborator refresh. Delta markers are
    /// cleared and acceptance state resets. The open editor survives
    /// only if its record exists in the new aggregate and its category
    /// was not just intentionally closed.
    pub fn rehydrate(&mut self, street: Street) -> Result<(), ReconcileError> {
        let mut next = reconcile(&street, StreetPatches::default(), &self.jurisdiction, &self.options)?;
        strip_delta_markers(&mut next);
        self.source = next;
        self.current = self.source.clone();
        self.protected.clear();
        self.failed_validation = false;
        self.refresh_open();
        Ok(())
    }

    fn commit_open(&mut self, open: OpenEditor, validator: &dyn ValidateStreet) -> HomeOutcome {
        if !validator.validate(&self.current).valid {
            self.failed_validation = true;
            return HomeOutcome {
                closed: false,
                failed_validation: true,
            };
        }
        self.accept_open(open);
        HomeOutcome {
            closed: true,
            failed_validation: false,
        }
    }

    /// Accept the open editor's records without validating.
    fn accept_open(&mut self, open: OpenEditor) {
        self.protect_unsaved(open.category);
        self.failed_validation = false;
        self.open = None;
        self.clearing = Some(open.category);
    }

    fn discard_open(&mut self, open: OpenEditor) -> Result<HomeOutcome, SessionError> {
        self.discard_unsaved(open.category)?;
        self.failed_validation = false;
        self.open = None;
        self.clearing = Some(open.category);
        Ok(HomeOutcome {
            closed: true,
            failed_validation: false,
        })
    }

    /// Whether the open editor's record differs substantively from its
    /// canonical counterpart. A record with no counterpart counts as
    /// changed.
    fn record_changed(&self, open: OpenEditor) -> bool {
        let pk_id = open.pk_id;
        match open.category {
            EditorCategory::Descriptor => changed_in(
                &self.current.core.street_descriptors,
                &self.source.core.street_descriptors,
                pk_id,
                StreetDescriptor::substantive_eq,
            ),
            EditorCategory::Esu => changed_in(
                &self.current.core.esus,
                &self.source.core.esus,
                pk_id,
                Esu::substantive_eq,
            ),
            EditorCategory::Note => changed_in(
                &self.current.core.street_notes,
                &self.source.core.street_notes,
                pk_id,
                StreetNote::substantive_eq,
            ),
            EditorCategory::HighwayDedication => changed_in(
                self.current.core.esus.iter().flat_map(|e| &e.highway_dedications),
                self.source.core.esus.iter().flat_map(|e| &e.highway_dedications),
                pk_id,
                HighwayDedication::substantive_eq,
            ),
            EditorCategory::OneWayExemption => changed_in(
                self.current.core.esus.iter().flat_map(|e| &e.one_way_exemptions),
                self.source.core.esus.iter().flat_map(|e| &e.one_way_exemptions),
                pk_id,
                OneWayExemption::substantive_eq,
            ),
            EditorCategory::SuccessorCrossRef => changed_in(
                self.current.successor_cross_refs().into_iter().flatten(),
                self.source.successor_cross_refs().into_iter().flatten(),
                pk_id,
                SuccessorCrossRef::substantive_eq,
            ),
            EditorCategory::Asd(cat) => for_asd!(cat, R => changed_in(
                R::slot(&self.current).into_iter().flatten(),
                R::slot(&self.source).into_iter().flatten(),
                pk_id,
                |a: &R, b: &R| a.substantive_eq(b),
            )),
        }
    }

    /// Accept every unsaved insert of `category`, so later discards
    /// leave them alone.
    fn protect_unsaved(&mut self, category: EditorCategory) {
        let pks = unsaved_pks(&self.current, category);
        self.protected.extend(pks);
    }

    /// Drop every unsaved insert of `category` that was never accepted.
    fn discard_unsaved(&mut self, category: EditorCategory) -> Result<(), SessionError> {
        let patches = match category {
            EditorCategory::Descriptor => StreetPatches::default()
                .with_street_descriptors(self.retained(&self.current.core.street_descriptors)),
            EditorCategory::Note => StreetPatches::default()
                .with_street_notes(self.retained(&self.current.core.street_notes)),
            EditorCategory::Esu => {
                StreetPatches::default().with_esus(self.retained(&self.current.core.esus))
            }
            EditorCategory::HighwayDedication | EditorCategory::OneWayExemption => {
                let mut esus = self.current.core.esus.clone();
                for esu in &mut esus {
                    if category == EditorCategory::HighwayDedication {
                        esu.highway_dedications = self.retained(&esu.highway_dedications);
                    } else {
                        esu.one_way_exemptions = self.retained(&esu.one_way_exemptions);
                    }
                }
                StreetPatches::default().with_esus(esus)
            }
            EditorCategory::SuccessorCrossRef => match self.current.successor_cross_refs() {
                Some(records) => {
                    StreetPatches::default().with_successor_cross_refs(self.retained(records))
                }
                None => return Ok(()),
            },
            EditorCategory::Asd(cat) => for_asd!(cat, R => match R::slot(&self.current) {
                Some(records) => R::patch(self.retained(records)),
                None => return Ok(()),
            }),
        };
        self.reconcile_current(patches)?;
        Ok(())
    }

    fn retained<R: SubRecord + Clone>(&self, records: &[R]) -> Vec<R> {
        records
            .iter()
            .filter(|r| !self.droppable(r.pk_id()))
            .cloned()
            .collect()
    }

    fn droppable(&self, pk_id: PkId) -> bool {
        pk_id.is_unsaved() && !self.protected.contains(&pk_id)
    }

    /// Re-derive the open editor after the aggregate was replaced.
    fn refresh_open(&mut self) {
        let clearing = self.clearing.take();
        let Some(open) = self.open else { return };
        if clearing == Some(open.category) {
            self.open = None;
            return;
        }
        self.open = locate(&self.current, open.category, open.pk_id);
    }

    /// Close the editor when its record disappeared under it, e.g. an
    /// unsaved child removed with its parent.
    fn close_if_gone(&mut self) {
        if let Some(open) = self.open {
            if locate(&self.current, open.category, open.pk_id).is_none() {
                self.open = None;
                self.clearing = Some(open.category);
            }
        }
    }

    fn reconcile_current(&mut self, patches: StreetPatches) -> Result<(), ReconcileError> {
        self.current = reconcile(&self.current, patches, &self.jurisdiction, &self.options)?;
        Ok(())
    }
}

/// Find a record's editor bookkeeping: its collection position and, for
/// child records, the owning unit.
fn locate(street: &Street, category: EditorCategory, pk_id: PkId) -> Option<OpenEditor> {
    let place = |parent: Option<EsuId>, (index, total): (usize, usize)| OpenEditor {
        category,
        pk_id,
        parent,
        index,
        total,
    };
    match category {
        EditorCategory::Descriptor => {
            position_of(&street.core.street_descriptors, pk_id).map(|p| place(None, p))
        }
        EditorCategory::Esu => position_of(&street.core.esus, pk_id).map(|p| place(None, p)),
        EditorCategory::Note => {
            position_of(&street.core.street_notes, pk_id).map(|p| place(None, p))
        }
        EditorCategory::HighwayDedication => street.core.esus.iter().find_map(|e| {
            position_of(&e.highway_dedications, pk_id).map(|p| place(Some(e.esu_id), p))
        }),
        EditorCategory::OneWayExemption => street.core.esus.iter().find_map(|e| {
            position_of(&e.one_way_exemptions, pk_id).map(|p| place(Some(e.esu_id), p))
        }),
        EditorCategory::SuccessorCrossRef => street
            .successor_cross_refs()
            .and_then(|records| position_of(records, pk_id))
            .map(|p| place(None, p)),
        EditorCategory::Asd(cat) => for_asd!(cat, R => R::slot(street)
            .and_then(|records| position_of(records, pk_id))
            .map(|p| place(None, p))),
    }
}

fn position_of<R: SubRecord>(records: &[R], pk_id: PkId) -> Option<(usize, usize)> {
    records
        .iter()
        .position(|r| r.pk_id() == pk_id)
        .map(|index| (index, records.len()))
}

/// Replace `record`'s slot in a copy of `current`, deriving its delta
/// marker from the canonical `source` counterpart.
fn staged_into<R>(
    current: &[R],
    source: &[R],
    mut record: R,
    eq: impl Fn(&R, &R) -> bool,
) -> Option<Vec<R>>
where
    R: SubRecord + Clone,
{
    let idx = current.iter().position(|r| r.pk_id() == record.pk_id())?;
    match source.iter().find(|r| r.pk_id() == record.pk_id()) {
        Some(counterpart) if eq(&record, counterpart) => record.set_change_type(None),
        _ => {
            record.set_change_type(None);
            record.mark_edited();
        }
    }
    let mut records = current.to_vec();
    records[idx] = record;
    Some(records)
}

fn changed_in<'a, R, C, S>(current: C, source: S, pk_id: PkId, eq: impl Fn(&R, &R) -> bool) -> bool
where
    R: SubRecord + 'a,
    C: IntoIterator<Item = &'a R>,
    S: IntoIterator<Item = &'a R>,
{
    let Some(record) = current.into_iter().find(|r| r.pk_id() == pk_id) else {
        return false;
    };
    match source.into_iter().find(|r| r.pk_id() == pk_id) {
        Some(counterpart) => !eq(record, counterpart),
        None => true,
    }
}

fn unsaved_pks(street: &Street, category: EditorCategory) -> Vec<PkId> {
    match category {
        EditorCategory::Descriptor => collect_unsaved(&street.core.street_descriptors),
        EditorCategory::Note => collect_unsaved(&street.core.street_notes),
        EditorCategory::Esu => collect_unsaved(&street.core.esus),
        EditorCategory::HighwayDedication => {
            collect_unsaved(street.core.esus.iter().flat_map(|e| &e.highway_dedications))
        }
        EditorCategory::OneWayExemption => {
            collect_unsaved(street.core.esus.iter().flat_map(|e| &e.one_way_exemptions))
        }
        EditorCategory::SuccessorCrossRef => {
            collect_unsaved(street.successor_cross_refs().into_iter().flatten())
        }
        EditorCategory::Asd(cat) => {
            for_asd!(cat, R => collect_unsaved(R::slot(street).into_iter().flatten()))
        }
    }
}

fn collect_unsaved<'a, R, I>(records: I) -> Vec<PkId>
where
    R: SubRecord + 'a,
    I: IntoIterator<Item = &'a R>,
{
    records
        .into_iter()
        .map(|r| r.pk_id())
        .filter(|pk| pk.is_unsaved())
        .collect()
}

fn strip_delta_markers(street: &mut Street) {
    street.core.change_type = None;
    for d in &mut street.core.street_descriptors {
        d.change_type = None;
    }
    for n in &mut street.core.street_notes {
        n.change_type = None;
    }
    for esu in &mut street.core.esus {
        esu.change_type = None;
        for hd in &mut esu.highway_dedications {
            hd.change_type = None;
        }
        for owe in &mut esu.one_way_exemptions {
            owe.change_type = None;
        }
    }
    match &mut street.data {
        StreetData::Scottish(d) => {
            strip_slot(&mut d.maintenance_responsibilities);
            strip_slot(&mut d.reinstatement_categories);
            strip_slot(&mut d.special_designations);
            strip_slot(&mut d.successor_cross_refs);
        }
        StreetData::GeoPlaceAsd(d) => {
            strip_slot(&mut d.interests);
            strip_slot(&mut d.constructions);
            strip_slot(&mut d.special_designations);
            strip_slot(&mut d.height_width_weights);
            strip_slot(&mut d.public_right_of_ways);
        }
        StreetData::GeoPlace(_) => {}
    }
}

fn strip_slot<R: SubRecord>(slot: &mut Option<Vec<R>>) {
    for record in slot.iter_mut().flatten() {
        record.set_change_type(None);
    }
}
