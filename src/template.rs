//! Authority templates: the field defaults stamped onto new records.
//!
//! Every "add" path goes through one of the factories here so a freshly
//! allocated record always starts from the authority's configured
//! defaults rather than hard-coded literals at each call site.

use time::Date;

use crate::core::domain::{
    AssignUnassign, ChangeType, EsuClassification, EsuDirection, Jurisdiction, RecordType,
    StreetState, Tolerance,
};
use crate::core::esu::{Esu, HighwayDedication, OneWayExemption};
use crate::core::identity::{EsuId, PkId, SeqNum, Usrn};
use crate::core::street::{Street, StreetCore, StreetData};

#[derive(Clone, Copy, Debug)]
pub struct StreetDefaults {
    pub swa_org_ref_naming: u16,
    pub record_type: RecordType,
    pub state: StreetState,
    pub tolerance: Tolerance,
}

#[derive(Clone, Copy, Debug)]
pub struct EsuDefaults {
    pub direction: EsuDirection,
    pub tolerance: Tolerance,
    pub classification: EsuClassification,
}

#[derive(Clone, Copy, Debug)]
pub struct HighwayDedicationDefaults {
    pub dedication_code: u8,
}

#[derive(Clone, Copy, Debug)]
pub struct OneWayExemptionDefaults {
    pub exemption_type: u8,
    pub periodicity_code: u8,
}

/// Per-authority defaults for every record family.
#[derive(Clone, Copy, Debug)]
pub struct StreetTemplate {
    pub street: StreetDefaults,
    pub esu: EsuDefaults,
    pub highway_dedication: HighwayDedicationDefaults,
    pub one_way_exemption: OneWayExemptionDefaults,
}

impl Default for StreetTemplate {
    fn default() -> Self {
        Self {
            street: StreetDefaults {
                swa_org_ref_naming: 0,
                record_type: RecordType::OFFICIAL,
                state: StreetState::OPEN,
                tolerance: Tolerance::default(),
            },
            esu: EsuDefaults {
                direction: EsuDirection::TWO_WAY,
                tolerance: Tolerance::default(),
                classification: EsuClassification::ALL_VEHICLES,
            },
            highway_dedication: HighwayDedicationDefaults { dedication_code: 2 },
            one_way_exemption: OneWayExemptionDefaults {
                exemption_type: 1,
                periodicity_code: 1,
            },
        }
    }
}

impl StreetTemplate {
    pub fn for_authority(authority: u16) -> Self {
        let mut template = Self::default();
        template.street.swa_org_ref_naming = authority;
        template
    }

    /// A provisional street: usrn 0, shaped for the jurisdiction, marked
    /// as an insert from birth.
    pub fn new_street(&self, jurisdiction: &Jurisdiction, today: Date) -> Street {
        Street {
            core: StreetCore {
                usrn: Usrn::PROVISIONAL,
                swa_org_ref_naming: self.street.swa_org_ref_naming,
                record_type: self.street.record_type,
                state: self.street.state,
                state_date: Some(today),
                street_tolerance: self.street.tolerance,
                street_start_x: None,
                street_start_y: None,
                street_end_x: None,
                street_end_y: None,
                street_start_date: Some(today),
                street_end_date: None,
                wkt_geometry: String::new(),
                change_type: Some(ChangeType::Insert),
                street_descriptors: Vec::new(),
                esus: Vec::new(),
                street_notes: Vec::new(),
            },
            data: StreetData::empty_for(jurisdiction, self.street.record_type),
        }
    }

    /// A new unit: synthetic esu id mirrors the synthetic key until the
    /// server assigns real ones, geometry empty until drawn.
    pub fn new_esu(&self, pk_id: PkId, today: Date) -> Esu {
        Esu {
            pk_id,
            esu_id: EsuId::synthetic(pk_id.value()),
            wkt_geometry: String::new(),
            esu_start_date: Some(today),
            esu_end_date: None,
            esu_direction: self.esu.direction,
            esu_tolerance: self.esu.tolerance,
            esu_classification: self.esu.classification,
            assign_unassign: AssignUnassign::ASSIGNED,
            change_type: Some(ChangeType::Insert),
            highway_dedications: Vec::new(),
            one_way_exemptions: Vec::new(),
        }
    }

    pub fn new_highway_dedication(
        &self,
        pk_id: PkId,
        esu_id: EsuId,
        usrn: Usrn,
        seq_num: SeqNum,
        today: Date,
    ) -> HighwayDedication {
        HighwayDedication {
            pk_id,
            esu_id,
            usrn,
            seq_num,
            highway_dedication_code: self.highway_dedication.dedication_code,
            hd_start_date: Some(today),
            hd_end_date: None,
            change_type: Some(ChangeType::Insert),
        }
    }

    pub fn new_one_way_exemption(
        &self,
        pk_id: PkId,
        esu_id: EsuId,
        seq_num: SeqNum,
        today: Date,
    ) -> OneWayExemption {
        OneWayExemption {
            pk_id,
            esu_id,
            seq_num,
            one_way_exemption_type: self.one_way_exemption.exemption_type,
            one_way_exemption_periodicity_code: self.one_way_exemption.periodicity_code,
            owe_start_date: Some(today),
            owe_end_date: None,
            change_type: Some(ChangeType::Insert),
        }
    }
}
