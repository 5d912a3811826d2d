//! Layer 6: The street aggregate
//!
//! One value-owned tree per street: shared core fields and collections,
//! plus a jurisdiction-shaped extension selected once at load time and
//! carried explicitly from then on. Collections are replaced whole
//! through the reconciler or narrowed through the lens helpers here;
//! nothing outside this module pokes a sibling record in place.

use serde::{Deserialize, Serialize};
use time::Date;

use super::asd::{
    Construction, HeightWidthWeight, Interest, MaintenanceResponsibility, OsSpecialDesignation,
    PublicRightOfWay, ReinstatementCategory, SpecialDesignation,
};
use super::collection::{self, SubRecord};
use super::dates::wire_date_opt;
use super::descriptor::StreetDescriptor;
use super::domain::{ChangeType, Jurisdiction, Language, RecordType, StreetState, Tolerance};
use super::esu::Esu;
use super::identity::{EsuId, PkId, Usrn};
use super::note::StreetNote;
use super::successor::SuccessorCrossRef;

/// Fields and collections every jurisdiction carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreetCore {
    pub usrn: Usrn,
    /// Naming authority code.
    pub swa_org_ref_naming: u16,
    pub record_type: RecordType,
    pub state: StreetState,
    #[serde(default, with = "wire_date_opt", skip_serializing_if = "Option::is_none")]
    pub state_date: Option<Date>,
    pub street_tolerance: Tolerance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_start_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_start_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_end_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_end_y: Option<f64>,
    #[serde(default, with = "wire_date_opt", skip_serializing_if = "Option::is_none")]
    pub street_start_date: Option<Date>,
    #[serde(default, with = "wire_date_opt", skip_serializing_if = "Option::is_none")]
    pub street_end_date: Option<Date>,
    /// Derived union of live ESU geometry; recomputed, never edited.
    #[serde(default)]
    pub wkt_geometry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
    #[serde(default)]
    pub street_descriptors: Vec<StreetDescriptor>,
    #[serde(default)]
    pub esus: Vec<Esu>,
    #[serde(default)]
    pub street_notes: Vec<StreetNote>,
}

/// OneScotland extension collections.
///
/// Slots are nullable on the wire: `None` means the category does not
/// apply to this street's record type, `Some` (possibly empty) means it
/// does. Successor cross references are never gated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScottishData {
    pub maintenance_responsibilities: Option<Vec<MaintenanceResponsibility>>,
    pub reinstatement_categories: Option<Vec<ReinstatementCategory>>,
    pub special_designations: Option<Vec<OsSpecialDesignation>>,
    pub successor_cross_refs: Option<Vec<SuccessorCrossRef>>,
}

/// GeoPlace extension collections for an authority that maintains
/// additional street data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPlaceAsdData {
    pub interests: Option<Vec<Interest>>,
    pub constructions: Option<Vec<Construction>>,
    pub special_designations: Option<Vec<SpecialDesignation>>,
    pub height_width_weights: Option<Vec<HeightWidthWeight>>,
    pub public_right_of_ways: Option<Vec<PublicRightOfWay>>,
}

/// GeoPlace without additional street data carries nothing extra.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPlaceData {}

/// Jurisdiction-shaped extension of the aggregate.
///
/// Variants are tried in declaration order when decoding, so the shapes
/// with required keys come before the empty one. The nullable slots are
/// deliberately not defaulted: their presence is what identifies the
/// shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreetData {
    Scottish(ScottishData),
    GeoPlaceAsd(GeoPlaceAsdData),
    GeoPlace(GeoPlaceData),
}

fn conform_slot<T>(slot: &mut Option<Vec<T>>, applicable: bool) {
    if applicable {
        if slot.is_none() {
            *slot = Some(Vec::new());
        }
    } else {
        *slot = None;
    }
}

impl StreetData {
    /// Shape for a freshly templated street.
    pub fn empty_for(jurisdiction: &Jurisdiction, record_type: RecordType) -> StreetData {
        let mut data = if jurisdiction.is_one_scotland() {
            StreetData::Scottish(ScottishData {
                maintenance_responsibilities: None,
                reinstatement_categories: None,
                special_designations: None,
                successor_cross_refs: None,
            })
        } else if jurisdiction.has_asd {
            StreetData::GeoPlaceAsd(GeoPlaceAsdData {
                interests: None,
                constructions: None,
                special_designations: None,
                height_width_weights: None,
                public_right_of_ways: None,
            })
        } else {
            StreetData::GeoPlace(GeoPlaceData {})
        };
        data.conform(jurisdiction, record_type);
        data
    }

    /// Enforce the gating rule: categories that apply hold a collection
    /// (empty if nothing recorded), categories that do not are null.
    pub fn conform(&mut self, jurisdiction: &Jurisdiction, record_type: RecordType) {
        let applicable = jurisdiction.asd_applicable(record_type);
        match self {
            StreetData::Scottish(d) => {
                conform_slot(&mut d.maintenance_responsibilities, applicable);
                conform_slot(&mut d.reinstatement_categories, applicable);
                conform_slot(&mut d.special_designations, applicable);
                conform_slot(&mut d.successor_cross_refs, true);
            }
            StreetData::GeoPlaceAsd(d) => {
                conform_slot(&mut d.interests, applicable);
                conform_slot(&mut d.constructions, applicable);
                conform_slot(&mut d.special_designations, applicable);
                conform_slot(&mut d.height_width_weights, applicable);
                conform_slot(&mut d.public_right_of_ways, applicable);
            }
            StreetData::GeoPlace(_) => {}
        }
    }
}

/// The street aggregate. Core fields and the jurisdiction extension
/// share one flat wire object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Street {
    #[serde(flatten)]
    pub core: StreetCore,
    #[serde(flatten)]
    pub data: StreetData,
}

macro_rules! asd_slot {
    ($get:ident, $get_mut:ident, $variant:ident, $field:ident, $ty:ty) => {
        pub fn $get(&self) -> Option<&Vec<$ty>> {
            match &self.data {
                StreetData::$variant(d) => d.$field.as_ref(),
                _ => None,
            }
        }

        pub fn $get_mut(&mut self) -> Option<&mut Vec<$ty>> {
            match &mut self.data {
                StreetData::$variant(d) => d.$field.as_mut(),
                _ => None,
            }
        }
    };
}

impl Street {
    pub fn is_unsaved(&self) -> bool {
        self.core.usrn.is_provisional()
    }

    /// Street-level delta bookkeeping: a never-saved street stays an
    /// insert, a saved one becomes an update, tombstones are sticky.
    pub fn mark_edited(&mut self) {
        match self.core.change_type {
            Some(ChangeType::Insert | ChangeType::Delete) => {}
            _ => {
                let next = if self.is_unsaved() {
                    ChangeType::Insert
                } else {
                    ChangeType::Update
                };
                self.core.change_type = Some(next);
            }
        }
    }

    pub fn esu(&self, id: EsuId) -> Option<&Esu> {
        self.core.esus.iter().find(|e| e.esu_id == id)
    }

    pub fn esu_mut(&mut self, id: EsuId) -> Option<&mut Esu> {
        self.core.esus.iter_mut().find(|e| e.esu_id == id)
    }

    /// Lens over one unit: apply `f` to the matching ESU, leaving every
    /// sibling untouched. `None` when the id is unknown.
    pub fn with_esu<T>(&mut self, id: EsuId, f: impl FnOnce(&mut Esu) -> T) -> Option<T> {
        self.esu_mut(id).map(f)
    }

    pub fn live_esus(&self) -> impl Iterator<Item = &Esu> {
        self.core.esus.iter().filter(|e| e.is_live())
    }

    /// Geometry inputs for the whole-road union: live units that have
    /// been drawn.
    pub fn live_esu_wkts(&self) -> impl Iterator<Item = &str> {
        self.live_esus()
            .filter(|e| !e.wkt_geometry.is_empty())
            .map(|e| e.wkt_geometry.as_str())
    }

    /// Descriptor text shown in search results, English preferred.
    pub fn display_name(&self) -> Option<&str> {
        let live = || self.core.street_descriptors.iter().filter(|d| d.is_live());
        live()
            .find(|d| d.language == Language::Eng)
            .or_else(|| live().next())
            .map(|d| d.street_descriptor.as_str())
    }

    /// Next synthetic key, unique across every collection in the tree.
    ///
    /// Allocation reads the whole aggregate, not one collection, so two
    /// inserts in different categories can never collide.
    pub fn next_pk_id(&self) -> PkId {
        collection::synthetic_below(self.pk_values().into_iter().min())
    }

    fn pk_values(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::new();
        ids.extend(self.core.street_descriptors.iter().map(|d| d.pk_id.value()));
        ids.extend(self.core.street_notes.iter().map(|n| n.pk_id.value()));
        for esu in &self.core.esus {
            ids.push(esu.pk_id.value());
            ids.extend(esu.highway_dedications.iter().map(|hd| hd.pk_id.value()));
            ids.extend(esu.one_way_exemptions.iter().map(|owe| owe.pk_id.value()));
        }
        match &self.data {
            StreetData::Scottish(d) => {
                extend_pks(&mut ids, &d.maintenance_responsibilities);
                extend_pks(&mut ids, &d.reinstatement_categories);
                extend_pks(&mut ids, &d.special_designations);
                extend_pks(&mut ids, &d.successor_cross_refs);
            }
            StreetData::GeoPlaceAsd(d) => {
                extend_pks(&mut ids, &d.interests);
                extend_pks(&mut ids, &d.constructions);
                extend_pks(&mut ids, &d.special_designations);
                extend_pks(&mut ids, &d.height_width_weights);
                extend_pks(&mut ids, &d.public_right_of_ways);
            }
            StreetData::GeoPlace(_) => {}
        }
        ids
    }

    asd_slot!(
        maintenance_responsibilities,
        maintenance_responsibilities_mut,
        Scottish,
        maintenance_responsibilities,
        MaintenanceResponsibility
    );
    asd_slot!(
        reinstatement_categories,
        reinstatement_categories_mut,
        Scottish,
        reinstatement_categories,
        ReinstatementCategory
    );
    asd_slot!(
        os_special_designations,
        os_special_designations_mut,
        Scottish,
        special_designations,
        OsSpecialDesignation
    );
    asd_slot!(
        successor_cross_refs,
        successor_cross_refs_mut,
        Scottish,
        successor_cross_refs,
        SuccessorCrossRef
    );
    asd_slot!(interests, interests_mut, GeoPlaceAsd, interests, Interest);
    asd_slot!(
        constructions,
        constructions_mut,
        GeoPlaceAsd,
        constructions,
        Construction
    );
    asd_slot!(
        special_designations,
        special_designations_mut,
        GeoPlaceAsd,
        special_designations,
        SpecialDesignation
    );
    asd_slot!(
        height_width_weights,
        height_width_weights_mut,
        GeoPlaceAsd,
        height_width_weights,
        HeightWidthWeight
    );
    asd_slot!(
        public_right_of_ways,
        public_right_of_ways_mut,
        GeoPlaceAsd,
        public_right_of_ways,
        PublicRightOfWay
    );
}

fn extend_pks<R: SubRecord>(ids: &mut Vec<i64>, slot: &Option<Vec<R>>) {
    if let Some(records) = slot {
        ids.extend(records.iter().map(|r| r.pk_id().value()));
    }
}
