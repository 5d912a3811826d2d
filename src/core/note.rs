//! Layer 5: Street notes
//!
//! Free-text annotations on a street. Notes never appear in exports, so
//! the record is just key, sequencing and text.

use serde::{Deserialize, Serialize};

use super::collection::{Sequenced, SubRecord};
use super::domain::ChangeType;
use super::identity::{PkId, SeqNum, Usrn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreetNote {
    pub pk_id: PkId,
    pub usrn: Usrn,
    pub seq_num: SeqNum,
    #[serde(default)]
    pub note: String,
    /// Display name of whoever last touched the note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
}

impl StreetNote {
    pub fn unsaved(pk_id: PkId, usrn: Usrn, seq_num: SeqNum) -> Self {
        Self {
            pk_id,
            usrn,
            seq_num,
            note: String::new(),
            last_user: None,
            change_type: Some(ChangeType::Insert),
        }
    }

    pub fn substantive_eq(&self, other: &Self) -> bool {
        self.note == other.note
    }
}

impl SubRecord for StreetNote {
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

impl Sequenced for StreetNote {
    fn seq_num(&self) -> SeqNum {
        self.seq_num
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsaved_note_is_a_blank_insert() {
        let note = StreetNote::unsaved(
            PkId::new(-10).unwrap(),
            Usrn::new(12345).unwrap(),
            SeqNum::FIRST,
        );
        assert_eq!(note.note, "");
        assert_eq!(note.change_type, Some(ChangeType::Insert));
        assert!(note.is_live());
    }

    #[test]
    fn wire_shape_skips_unchanged_marker() {
        let mut note = StreetNote::unsaved(
            PkId::new(42).unwrap(),
            Usrn::new(12345).unwrap(),
            SeqNum::FIRST,
        );
        note.note = "awaiting adoption".into();
        note.change_type = None;

        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains("\"seqNum\":1"));
        assert!(json.contains("\"note\":\"awaiting adoption\""));
        assert!(!json.contains("changeType"));
    }
}
