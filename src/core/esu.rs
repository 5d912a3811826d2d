//! Layer 5: Elementary street units and their child records
//!
//! An ESU is the geometry-bearing segment of a street and the attachment
//! point for highway dedications and one-way exemptions. Children carry
//! their parent's esu id; divide/merge rewrites it when re-parenting.

use serde::{Deserialize, Serialize};
use time::Date;

use super::collection::{SubRecord, Sequenced};
use super::dates::wire_date_opt;
use super::domain::{AssignUnassign, ChangeType, EsuClassification, EsuDirection, Tolerance};
use super::identity::{EsuId, PkId, SeqNum, Usrn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighwayDedication {
    pub pk_id: PkId,
    pub esu_id: EsuId,
    pub usrn: Usrn,
    pub seq_num: SeqNum,
    pub highway_dedication_code: u8,
    #[serde(default, with = "wire_date_opt", skip_serializing_if = "Option::is_none")]
    pub hd_start_date: Option<Date>,
    #[serde(default, with = "wire_date_opt", skip_serializing_if = "Option::is_none")]
    pub hd_end_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
}

impl HighwayDedication {
    pub fn tombstone(&mut self, end: Date) {
        self.change_type = Some(ChangeType::Delete);
        self.hd_end_date = Some(end);
    }

    /// User-editable fields, ignoring keys and bookkeeping.
    pub fn substantive_eq(&self, other: &Self) -> bool {
        self.highway_dedication_code == other.highway_dedication_code
            && self.hd_start_date == other.hd_start_date
            && self.hd_end_date == other.hd_end_date
    }

    /// Merge comparison: codes only, dates and keys are too volatile to
    /// decide inheritance on.
    pub fn merge_eq(&self, other: &Self) -> bool {
        self.highway_dedication_code == other.highway_dedication_code
    }
}

impl SubRecord for HighwayDedication {
    fn pk_id(&self) -> PkId {
        self.pk_id
    }
    fn change_type(&self) -> Option<ChangeType> {
        self.change_type
    }
    fn set_change_type(&mut self, change_type: Option<ChangeType>) {
        self.change_type = change_type;
    }
}

impl Sequenced for HighwayDedication {
    fn seq_num(&self) -> SeqNum {
        self.seq_num
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneWayExemption {
    pub pk_id: PkId,
    pub esu_id: EsuId,
    pub seq_num: SeqNum,
    pub one_way_exemption_type: u8,
    pub one_way_exemption_periodicity_code: u8,
    #[serde(default, with = "wire_date_opt", skip_serializing_if = "Option::is_none")]
    pub owe_start_date: Option<Date>,
    #[serde(default, with = "wire_date_opt", skip_serializing_if = "Option::is_none")]
    pub owe_end_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
}

impl OneWayExemption {
    pub fn tombstone(&mut self, end: Date) {
        self.change_type = Some(ChangeType::Delete);
        self.owe_end_date = Some(end);
    }

    pub fn substantive_eq(&self, other: &Self) -> bool {
        self.one_way_exemption_type == other.one_way_exemption_type
            && self.one_way_exemption_periodicity_code == other.one_way_exemption_periodicity_code
            && self.owe_start_date == other.owe_start_date
            && self.owe_end_date == other.owe_end_date
    }

    pub fn merge_eq(&self, other: &Self) -> bool {
        self.one_way_exemption_type == other.one_way_exemption_type
            && self.one_way_exemption_periodicity_code == other.one_way_exemption_periodicity_code
    }
}

impl SubRecord for OneWayExemption {
    fn pk_id(&self) -> PkId {
        self.pk_id
    }
    fn change_type(&self) -> Option<ChangeType> {
        self.change_type
    }
    fn set_change_type(&mut self, change_type: Option<ChangeType>) {
        self.change_type = change_type;
    }
}

impl Sequenced for OneWayExemption {
    fn seq_num(&self) -> SeqNum {
        self.seq_num
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Esu {
    pub pk_id: PkId,
    pub esu_id: EsuId,
    /// Line geometry text; empty until drawn.
    #[serde(default)]
    pub wkt_geometry: String,
    #[serde(default, with = "wire_date_opt", skip_serializing_if = "Option::is_none")]
    pub esu_start_date: Option<Date>,
    #[serde(default, with = "wire_date_opt", skip_serializing_if = "Option::is_none")]
    pub esu_end_date: Option<Date>,
    pub esu_direction: EsuDirection,
    pub esu_tolerance: Tolerance,
    pub esu_classification: EsuClassification,
    #[serde(default)]
    pub assign_unassign: AssignUnassign,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
    #[serde(default)]
    pub highway_dedications: Vec<HighwayDedication>,
    #[serde(default)]
    pub one_way_exemptions: Vec<OneWayExemption>,
}

impl Esu {
    /// Tombstone the unit and cascade to its children: persisted children
    /// are tombstoned alongside, unsaved ones vanish with their parent.
    pub fn tombstone(&mut self, end: Date) {
        self.change_type = Some(ChangeType::Delete);
        self.esu_end_date = Some(end);

        self.highway_dedications.retain(|hd| !hd.pk_id.is_unsaved());
        for hd in &mut self.highway_dedications {
            hd.tombstone(end);
        }
        self.one_way_exemptions.retain(|owe| !owe.pk_id.is_unsaved());
        for owe in &mut self.one_way_exemptions {
            owe.tombstone(end);
        }
    }

    pub fn live_highway_dedications(&self) -> impl Iterator<Item = &HighwayDedication> {
        self.highway_dedications.iter().filter(|hd| hd.is_live())
    }

    pub fn live_one_way_exemptions(&self) -> impl Iterator<Item = &OneWayExemption> {
        self.one_way_exemptions.iter().filter(|owe| owe.is_live())
    }

    /// User-editable scalar fields and geometry; children have their own
    /// editors and are compared separately.
    pub fn substantive_eq(&self, other: &Self) -> bool {
        self.wkt_geometry == other.wkt_geometry
            && self.esu_start_date == other.esu_start_date
            && self.esu_end_date == other.esu_end_date
            && self.esu_direction == other.esu_direction
            && self.esu_tolerance == other.esu_tolerance
            && self.esu_classification == other.esu_classification
            && self.assign_unassign == other.assign_unassign
    }
}

impl SubRecord for Esu {
    fn pk_id(&self) -> PkId {
        self.pk_id
    }
    fn change_type(&self) -> Option<ChangeType> {
        self.change_type
    }
    fn set_change_type(&mut self, change_type: Option<ChangeType>) {
        self.change_type = change_type;
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn make_esu(pk: i64) -> Esu {
        Esu {
            pk_id: PkId::new(pk).unwrap(),
            esu_id: EsuId::new(pk).unwrap(),
            wkt_geometry: "LINESTRING (0 0, 10 0)".into(),
            esu_start_date: Some(date!(2020 - 01 - 01)),
            esu_end_date: None,
            esu_direction: EsuDirection::TWO_WAY,
            esu_tolerance: Tolerance::default(),
            esu_classification: EsuClassification::ALL_VEHICLES,
            assign_unassign: AssignUnassign::NORMAL,
            change_type: None,
            highway_dedications: vec![],
            one_way_exemptions: vec![],
        }
    }

    fn make_hd(pk: i64, esu: i64, code: u8) -> HighwayDedication {
        HighwayDedication {
            pk_id: PkId::new(pk).unwrap(),
            esu_id: EsuId::new(esu).unwrap(),
            usrn: Usrn::new(12345).unwrap(),
            seq_num: SeqNum::FIRST,
            highway_dedication_code: code,
            hd_start_date: None,
            hd_end_date: None,
            change_type: None,
        }
    }

    #[test]
    fn tombstone_cascades_to_children() {
        let mut esu = make_esu(101);
        esu.highway_dedications = vec![make_hd(7, 101, 2), make_hd(-10, 101, 4)];

        esu.tombstone(date!(2024 - 06 - 01));

        assert_eq!(esu.change_type, Some(ChangeType::Delete));
        assert_eq!(esu.esu_end_date, Some(date!(2024 - 06 - 01)));
        // The unsaved child vanished, the persisted one is tombstoned.
        assert_eq!(esu.highway_dedications.len(), 1);
        assert_eq!(esu.highway_dedications[0].pk_id.value(), 7);
        assert_eq!(
            esu.highway_dedications[0].change_type,
            Some(ChangeType::Delete)
        );
        assert_eq!(esu.live_highway_dedications().count(), 0);
    }

    #[test]
    fn merge_eq_ignores_dates() {
        let mut a = make_hd(1, 5, 2);
        let mut b = make_hd(2, 6, 2);
        a.hd_start_date = Some(date!(2019 - 01 - 01));
        b.hd_start_date = Some(date!(2023 - 05 - 05));
        assert!(a.merge_eq(&b));
        assert!(!a.substantive_eq(&b));

        b.highway_dedication_code = 9;
        assert!(!a.merge_eq(&b));
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let esu = make_esu(42);
        let json = serde_json::to_string(&esu).unwrap();
        for key in [
            "\"pkId\"",
            "\"esuId\"",
            "\"wktGeometry\"",
            "\"esuStartDate\"",
            "\"esuDirection\"",
            "\"esuTolerance\"",
            "\"esuClassification\"",
            "\"assignUnassign\"",
            "\"highwayDedications\"",
            "\"oneWayExemptions\"",
        ] {
            assert!(json.contains(key), "{key} missing from {json}");
        }
        // Unchanged records carry no changeType key at all.
        assert!(!json.contains("changeType"));
    }

    #[test]
    fn esu_wire_roundtrip() {
        let mut esu = make_esu(42);
        esu.change_type = Some(ChangeType::Update);
        esu.one_way_exemptions = vec![OneWayExemption {
            pk_id: PkId::new(3).unwrap(),
            esu_id: EsuId::new(42).unwrap(),
            seq_num: SeqNum::FIRST,
            one_way_exemption_type: 1,
            one_way_exemption_periodicity_code: 2,
            owe_start_date: None,
            owe_end_date: None,
            change_type: None,
        }];

        let json = serde_json::to_string(&esu).unwrap();
        let back: Esu = serde_json::from_str(&json).unwrap();
        assert_eq!(back, esu);
        assert!(json.contains("\"changeType\":\"U\""));
    }
}
