//! Layer 7: The reconciler
//!
//! Every mutation of a street goes through [`reconcile`]: base aggregate
//! in, a set of proposed replacement collections in, new aggregate out.
//! Collections are replaced whole, derived geometry is recomputed when
//! the units change, and the jurisdiction gating is re-enforced on the
//! way out. The base is never mutated.

use thiserror::Error;

use super::asd::{
    AsdRecord, Construction, HeightWidthWeight, Interest, MaintenanceResponsibility,
    OsSpecialDesignation, PublicRightOfWay, ReinstatementCategory, SpecialDesignation,
};
use super::collection::{CollectionPatch, SubRecord};
use super::descriptor::StreetDescriptor;
use super::domain::{AsdCategory, EditorCategory, Jurisdiction};
use super::error::GeometryError;
use super::esu::Esu;
use super::geometry;
use super::note::StreetNote;
use super::street::{Street, StreetData};
use super::successor::SuccessorCrossRef;
use crate::error::{Effect, Transience};

/// Knobs the reconciler reads when refreshing derived geometry.
#[derive(Clone, Copy, Debug)]
pub struct ReconcileOptions {
    /// Endpoint snap distance for chaining unit geometry.
    pub geometry_epsilon: f64,
    /// Copy the whole-road endpoints onto the street extent fields.
    pub derive_street_extent: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            geometry_epsilon: geometry::JOIN_EPSILON,
            derive_street_extent: true,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReconcileError {
    /// A replacement was offered for a collection this street's shape
    /// does not carry.
    #[error("street shape has no {} collection", .category.as_str())]
    ShapeMismatch { category: EditorCategory },
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl ReconcileError {
    pub fn transience(&self) -> Transience {
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}

/// Proposed replacement collections, one slot per category. A slot left
/// at `Keep` means "do not change this category".
#[derive(Clone, Debug, Default)]
pub struct StreetPatches {
    pub esus: CollectionPatch<Esu>,
    pub street_descriptors: CollectionPatch<StreetDescriptor>,
    pub street_notes: CollectionPatch<StreetNote>,
    pub maintenance_responsibilities: CollectionPatch<MaintenanceResponsibility>,
    pub reinstatement_categories: CollectionPatch<ReinstatementCategory>,
    pub os_special_designations: CollectionPatch<OsSpecialDesignation>,
    pub successor_cross_refs: CollectionPatch<SuccessorCrossRef>,
    pub interests: CollectionPatch<Interest>,
    pub constructions: CollectionPatch<Construction>,
    pub special_designations: CollectionPatch<SpecialDesignation>,
    pub height_width_weights: CollectionPatch<HeightWidthWeight>,
    pub public_right_of_ways: CollectionPatch<PublicRightOfWay>,
}

macro_rules! patch_setter {
    ($name:ident, $field:ident, $ty:ty) => {
        pub fn $name(mut self, records: Vec<$ty>) -> Self {
            self.$field = CollectionPatch::Replace(records);
            self
        }
    };
}

/// Read-and-patch view of one additional street data category, tying a
/// record type to its slot on the aggregate and its patch setter.
pub trait AsdSlot: AsdRecord {
    fn slot(street: &Street) -> Option<&Vec<Self>>;
    fn patch(records: Vec<Self>) -> StreetPatches;
}

macro_rules! asd_slot_impl {
    ($ty:ty, $get:ident, $setter:ident) => {
        impl AsdSlot for $ty {
            fn slot(street: &Street) -> Option<&Vec<Self>> {
                street.$get()
            }

            fn patch(records: Vec<Self>) -> StreetPatches {
                StreetPatches::default().$setter(records)
            }
        }
    };
}

asd_slot_impl!(
    MaintenanceResponsibility,
    maintenance_responsibilities,
    with_maintenance_responsibilities
);
asd_slot_impl!(ReinstatementCategory, reinstatement_categories, with_reinstatement_categories);
asd_slot_impl!(OsSpecialDesignation, os_special_designations, with_os_special_designations);
asd_slot_impl!(Interest, interests, with_interests);
asd_slot_impl!(Construction, constructions, with_constructions);
asd_slot_impl!(SpecialDesignation, special_designations, with_special_designations);
asd_slot_impl!(HeightWidthWeight, height_width_weights, with_height_width_weights);
asd_slot_impl!(PublicRightOfWay, public_right_of_ways, with_public_right_of_ways);

impl StreetPatches {
    patch_setter!(with_esus, esus, Esu);
    patch_setter!(with_street_descriptors, street_descriptors, StreetDescriptor);
    patch_setter!(with_street_notes, street_notes, StreetNote);
    patch_setter!(
        with_maintenance_responsibilities,
        maintenance_responsibilities,
        MaintenanceResponsibility
    );
    patch_setter!(
        with_reinstatement_categories,
        reinstatement_categories,
        ReinstatementCategory
    );
    patch_setter!(
        with_os_special_designations,
        os_special_designations,
        OsSpecialDesignation
    );
    patch_setter!(with_successor_cross_refs, successor_cross_refs, SuccessorCrossRef);
    patch_setter!(with_interests, interests, Interest);
    patch_setter!(with_constructions, constructions, Construction);
    patch_setter!(with_special_designations, special_designations, SpecialDesignation);
    patch_setter!(with_height_width_weights, height_width_weights, HeightWidthWeight);
    patch_setter!(with_public_right_of_ways, public_right_of_ways, PublicRightOfWay);
}

/// Build the next aggregate from `base` and `patches`.
///
/// Replacing a category the shape carries but the record type gates off
/// is accepted and then nulled by the gating rule; replacing a category
/// the shape never carries is a caller bug and errors.
pub fn reconcile(
    base: &Street,
    patches: StreetPatches,
    jurisdiction: &Jurisdiction,
    options: &ReconcileOptions,
) -> Result<Street, ReconcileError> {
    let refresh_geometry = !patches.esus.is_keep();
    let StreetPatches {
        esus,
        street_descriptors,
        street_notes,
        maintenance_responsibilities,
        reinstatement_categories,
        os_special_designations,
        successor_cross_refs,
        interests,
        constructions,
        special_designations,
        height_width_weights,
        public_right_of_ways,
    } = patches;

    let mut street = base.clone();
    esus.apply_to(&mut street.core.esus);
    street_descriptors.apply_to(&mut street.core.street_descriptors);
    street_notes.apply_to(&mut street.core.street_notes);

    match &mut street.data {
        StreetData::Scottish(d) => {
            apply_slot(maintenance_responsibilities, &mut d.maintenance_responsibilities);
            apply_slot(reinstatement_categories, &mut d.reinstatement_categories);
            apply_slot(os_special_designations, &mut d.special_designations);
            apply_slot(successor_cross_refs, &mut d.successor_cross_refs);
            reject_slot(&interests, EditorCategory::Asd(AsdCategory::Interest))?;
            reject_slot(&constructions, EditorCategory::Asd(AsdCategory::Construction))?;
            reject_slot(
                &special_designations,
                EditorCategory::Asd(AsdCategory::SpecialDesignation),
            )?;
            reject_slot(
                &height_width_weights,
                EditorCategory::Asd(AsdCategory::HeightWidthWeight),
            )?;
            reject_slot(
                &public_right_of_ways,
                EditorCategory::Asd(AsdCategory::PublicRightOfWay),
            )?;
        }
        StreetData::GeoPlaceAsd(d) => {
            apply_slot(interests, &mut d.interests);
            apply_slot(constructions, &mut d.constructions);
            apply_slot(special_designations, &mut d.special_designations);
            apply_slot(height_width_weights, &mut d.height_width_weights);
            apply_slot(public_right_of_ways, &mut d.public_right_of_ways);
            reject_slot(
                &maintenance_responsibilities,
                EditorCategory::Asd(AsdCategory::MaintenanceResponsibility),
            )?;
            reject_slot(
                &reinstatement_categories,
                EditorCategory::Asd(AsdCategory::ReinstatementCategory),
            )?;
            reject_slot(
                &os_special_designations,
                EditorCategory::Asd(AsdCategory::OsSpecialDesignation),
            )?;
            reject_slot(&successor_cross_refs, EditorCategory::SuccessorCrossRef)?;
        }
        StreetData::GeoPlace(_) => {
            reject_slot(
                &maintenance_responsibilities,
                EditorCategory::Asd(AsdCategory::MaintenanceResponsibility),
            )?;
            reject_slot(
                &reinstatement_categories,
                EditorCategory::Asd(AsdCategory::ReinstatementCategory),
            )?;
            reject_slot(
                &os_special_designations,
                EditorCategory::Asd(AsdCategory::OsSpecialDesignation),
            )?;
            reject_slot(&successor_cross_refs, EditorCategory::SuccessorCrossRef)?;
            reject_slot(&interests, EditorCategory::Asd(AsdCategory::Interest))?;
            reject_slot(&constructions, EditorCategory::Asd(AsdCategory::Construction))?;
            reject_slot(
                &special_designations,
                EditorCategory::Asd(AsdCategory::SpecialDesignation),
            )?;
            reject_slot(
                &height_width_weights,
                EditorCategory::Asd(AsdCategory::HeightWidthWeight),
            )?;
            reject_slot(
                &public_right_of_ways,
                EditorCategory::Asd(AsdCategory::PublicRightOfWay),
            )?;
        }
    }

    let record_type = street.core.record_type;
    street.data.conform(jurisdiction, record_type);

    if refresh_geometry {
        refresh_derived_geometry(&mut street, options)?;
    }

    Ok(street)
}

fn apply_slot<T>(patch: CollectionPatch<T>, slot: &mut Option<Vec<T>>) {
    if let CollectionPatch::Replace(records) = patch {
        *slot = Some(records);
    }
}

fn reject_slot<T>(
    patch: &CollectionPatch<T>,
    category: EditorCategory,
) -> Result<(), ReconcileError> {
    if patch.is_keep() {
        Ok(())
    } else {
        Err(ReconcileError::ShapeMismatch { category })
    }
}

/// Recompute everything downstream of the unit geometry: the whole-road
/// union, the street extent, whole-road record geometry and right of
/// way lengths. Records are only re-marked when their derived value
/// actually moved, so refreshing twice is a no-op.
fn refresh_derived_geometry(
    street: &mut Street,
    options: &ReconcileOptions,
) -> Result<(), GeometryError> {
    let wkts: Vec<String> = street.live_esu_wkts().map(str::to_owned).collect();
    let union = geometry::union_whole_road(wkts.iter().map(String::as_str), options.geometry_epsilon)?;
    let length = geometry::total_length(wkts.iter().map(String::as_str))?;

    street.core.wkt_geometry = union.clone();
    if options.derive_street_extent {
        let ends = geometry::endpoints(&union);
        street.core.street_start_x = ends.map(|e| e.start_x);
        street.core.street_start_y = ends.map(|e| e.start_y);
        street.core.street_end_x = ends.map(|e| e.end_x);
        street.core.street_end_y = ends.map(|e| e.end_y);
    }

    match &mut street.data {
        StreetData::Scottish(d) => {
            refresh_whole_road(&mut d.maintenance_responsibilities, &union);
            refresh_whole_road(&mut d.reinstatement_categories, &union);
            refresh_whole_road(&mut d.special_designations, &union);
        }
        StreetData::GeoPlaceAsd(d) => {
            refresh_whole_road(&mut d.interests, &union);
            refresh_whole_road(&mut d.constructions, &union);
            refresh_whole_road(&mut d.special_designations, &union);
            refresh_whole_road(&mut d.height_width_weights, &union);
            refresh_whole_road(&mut d.public_right_of_ways, &union);
            if let Some(prows) = &mut d.public_right_of_ways {
                for prow in prows.iter_mut().filter(|p| p.is_live() && p.whole_road()) {
                    if prow.prow_length != length {
                        prow.prow_length = length;
                        prow.mark_edited();
                    }
                }
            }
        }
        StreetData::GeoPlace(_) => {}
    }

    Ok(())
}

fn refresh_whole_road<R: AsdRecord>(slot: &mut Option<Vec<R>>, union: &str) {
    let Some(records) = slot else { return };
    for rec in records.iter_mut() {
        if !rec.is_live() || !rec.whole_road() {
            continue;
        }
        if rec.common().wkt_geometry != union {
            rec.common_mut().wkt_geometry = union.to_owned();
            rec.mark_edited();
        }
    }
}
