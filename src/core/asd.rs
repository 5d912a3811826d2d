//! Layer 5: Additional street data records
//!
//! Eight categories share one common shape (key, sequencing, whole-road
//! flag, location, derived geometry, dates, delta marker) plus a handful
//! of category-specific code fields. The shared shape is flattened into
//! each wire record; the `asd_record!` macro wires every category into
//! the generic collection machinery.

use serde::{Deserialize, Serialize};
use time::Date;

use super::collection::{Sequenced, SubRecord};
use super::dates::wire_date_opt;
use super::domain::{AsdCategory, ChangeType};
use super::identity::{PkId, SeqNum, Usrn};

/// Fields every additional street data record carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsdCommon {
    pub pk_id: PkId,
    pub usrn: Usrn,
    pub seq_num: SeqNum,
    pub whole_road: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_y: Option<f64>,
    /// Whole-road records derive this from the ESU union; never edited
    /// directly.
    #[serde(default)]
    pub wkt_geometry: String,
    #[serde(default, with = "wire_date_opt", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Date>,
    #[serde(default, with = "wire_date_opt", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
}

impl AsdCommon {
    /// Shape for a freshly allocated record: whole road, geometry seeded
    /// from the current ESU union, marked as an insert.
    pub fn unsaved(
        pk_id: PkId,
        usrn: Usrn,
        seq_num: SeqNum,
        union_wkt: String,
        start_date: Date,
    ) -> Self {
        Self {
            pk_id,
            usrn,
            seq_num,
            whole_road: true,
            specific_location: None,
            start_x: None,
            start_y: None,
            end_x: None,
            end_y: None,
            wkt_geometry: union_wkt,
            start_date: Some(start_date),
            end_date: None,
            change_type: Some(ChangeType::Insert),
        }
    }

    pub fn tombstone(&mut self, end: Date) {
        self.change_type = Some(ChangeType::Delete);
        self.end_date = Some(end);
    }

    /// User-editable fields; derived geometry and bookkeeping excluded.
    pub fn substantive_eq(&self, other: &Self) -> bool {
        self.whole_road == other.whole_road
            && self.specific_location == other.specific_location
            && self.start_x == other.start_x
            && self.start_y == other.start_y
            && self.end_x == other.end_x
            && self.end_y == other.end_y
            && self.start_date == other.start_date
            && self.end_date == other.end_date
    }
}

/// One of the eight additional street data record kinds.
pub trait AsdRecord: SubRecord + Sequenced + Clone {
    const CATEGORY: AsdCategory;

    fn common(&self) -> &AsdCommon;
    fn common_mut(&mut self) -> &mut AsdCommon;

    /// Allocate a new record around the shared shape, category fields at
    /// their blank defaults for the user to fill in.
    fn unsaved(common: AsdCommon) -> Self;

    fn substantive_eq(&self, other: &Self) -> bool;

    fn whole_road(&self) -> bool {
        self.common().whole_road
    }

    fn tombstone(&mut self, end: Date) {
        self.common_mut().tombstone(end);
    }
}

macro_rules! asd_record {
    ($ty:ident, $cat:expr, { $($field:ident: $default:expr),* $(,)? }) => {
        impl AsdRecord for $ty {
            const CATEGORY: AsdCategory = $cat;

            fn common(&self) -> &AsdCommon {
                &self.common
            }

            fn common_mut(&mut self) -> &mut AsdCommon {
                &mut self.common
            }

            fn unsaved(common: AsdCommon) -> Self {
                Self {
                    common,
                    $($field: $default),*
                }
            }

            fn substantive_eq(&self, other: &Self) -> bool {
                self.common.substantive_eq(&other.common)
                    $(&& self.$field == other.$field)*
            }
        }

        impl SubRecord for $ty {
            fn pk_id(&self) -> PkId {
                self.common.pk_id
            }
            fn change_type(&self) -> Option<ChangeType> {
                self.common.change_type
            }
            fn set_change_type(&mut self, change_type: Option<ChangeType>) {
                self.common.change_type = change_type;
            }
        }

        impl Sequenced for $ty {
            fn seq_num(&self) -> SeqNum {
                self.common.seq_num
            }
        }
    };
}

/// OneScotland 51: who maintains the street.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceResponsibility {
    #[serde(flatten)]
    pub common: AsdCommon,
    pub street_status: u8,
    pub custodian_code: u16,
    pub maintaining_authority_code: u16,
}

asd_record!(MaintenanceResponsibility, AsdCategory::MaintenanceResponsibility, {
    street_status: 0,
    custodian_code: 0,
    maintaining_authority_code: 0,
});

/// OneScotland 52: reinstatement category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReinstatementCategory {
    #[serde(flatten)]
    pub common: AsdCommon,
    pub reinstatement_category_code: u8,
    pub custodian_code: u16,
    pub reinstatement_authority_code: u16,
}

asd_record!(ReinstatementCategory, AsdCategory::ReinstatementCategory, {
    reinstatement_category_code: 0,
    custodian_code: 0,
    reinstatement_authority_code: 0,
});

/// OneScotland 53: special designation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsSpecialDesignation {
    #[serde(flatten)]
    pub common: AsdCommon,
    pub special_designation_code: u8,
    pub custodian_code: u16,
    pub authority_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

asd_record!(OsSpecialDesignation, AsdCategory::OsSpecialDesignation, {
    special_designation_code: 0,
    custodian_code: 0,
    authority_code: 0,
    description: None,
});

/// GeoPlace 61: interested organisation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interest {
    #[serde(flatten)]
    pub common: AsdCommon,
    pub street_status: u8,
    pub interest_type: u8,
    pub district_ref_authority: u16,
    pub swa_org_ref_authority: u16,
}

asd_record!(Interest, AsdCategory::Interest, {
    street_status: 0,
    interest_type: 0,
    district_ref_authority: 0,
    swa_org_ref_authority: 0,
});

/// GeoPlace 62: construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Construction {
    #[serde(flatten)]
    pub common: AsdCommon,
    pub construction_type: u8,
    pub reinstatement_type_code: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub construction_description: Option<String>,
}

asd_record!(Construction, AsdCategory::Construction, {
    construction_type: 0,
    reinstatement_type_code: 0,
    construction_description: None,
});

/// GeoPlace 63: special designation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialDesignation {
    #[serde(flatten)]
    pub common: AsdCommon,
    pub street_special_desig_code: u8,
    pub special_desig_periodicity_code: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_desig_description: Option<String>,
}

asd_record!(SpecialDesignation, AsdCategory::SpecialDesignation, {
    street_special_desig_code: 0,
    special_desig_periodicity_code: 0,
    special_desig_description: None,
});

/// GeoPlace 64: height, width or weight restriction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeightWidthWeight {
    #[serde(flatten)]
    pub common: AsdCommon,
    pub hww_restriction_code: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_metric: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_description: Option<String>,
}

asd_record!(HeightWidthWeight, AsdCategory::HeightWidthWeight, {
    hww_restriction_code: 0,
    value_metric: None,
    feature_description: None,
});

/// GeoPlace 66: public right of way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRightOfWay {
    #[serde(flatten)]
    pub common: AsdCommon,
    pub prow_rights: u8,
    pub prow_status: u8,
    /// Whole metres; recomputed from the ESU union for whole-road records.
    pub prow_length: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prow_details: Option<String>,
}

asd_record!(PublicRightOfWay, AsdCategory::PublicRightOfWay, {
    prow_rights: 0,
    prow_status: 0,
    prow_length: 0,
    prow_details: None,
});
