//! Layer 5: Successor cross references
//!
//! OneScotland streets record where a closed street's records moved to.

use serde::{Deserialize, Serialize};
use time::Date;

use super::collection::SubRecord;
use super::dates::wire_date_opt;
use super::domain::ChangeType;
use super::identity::{PkId, Usrn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessorCrossRef {
    pub pk_id: PkId,
    /// Street the records moved from.
    pub predecessor: Usrn,
    /// Street the records moved to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successor: Option<Usrn>,
    #[serde(default, with = "wire_date_opt", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Date>,
    #[serde(default, with = "wire_date_opt", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
}

impl SuccessorCrossRef {
    pub fn unsaved(pk_id: PkId, predecessor: Usrn, start_date: Date) -> Self {
        Self {
            pk_id,
            predecessor,
            successor: None,
            start_date: Some(start_date),
            end_date: None,
            change_type: Some(ChangeType::Insert),
        }
    }

    pub fn tombstone(&mut self, end: Date) {
        self.change_type = Some(ChangeType::Delete);
        self.end_date = Some(end);
    }

    pub fn substantive_eq(&self, other: &Self) -> bool {
        self.predecessor == other.predecessor
            && self.successor == other.successor
            && self.start_date == other.start_date
            && self.end_date == other.end_date
    }
}

impl SubRecord for SuccessorCrossRef {
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

    #[test]
    fn unsaved_cross_ref_points_back_at_its_street() {
        let xref = SuccessorCrossRef::unsaved(
            PkId::new(-10).unwrap(),
            Usrn::new(12345).unwrap(),
            date!(2024 - 01 - 01),
        );
        assert_eq!(xref.predecessor.value(), 12345);
        assert_eq!(xref.successor, None);
        assert_eq!(xref.change_type, Some(ChangeType::Insert));
    }

    #[test]
    fn wire_dates_use_iso_calendar_form() {
        let mut xref = SuccessorCrossRef::unsaved(
            PkId::new(7).unwrap(),
            Usrn::new(12345).unwrap(),
            date!(2024 - 01 - 01),
        );
        xref.successor = Some(Usrn::new(67890).unwrap());
        xref.change_type = None;

        let json = serde_json::to_string(&xref).unwrap();
        assert!(json.contains("\"predecessor\":12345"));
        assert!(json.contains("\"successor\":67890"));
        assert!(json.contains("\"startDate\":\"2024-01-01\""));

        let back: SuccessorCrossRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, xref);
    }
}
