//! Layer 5: Street descriptors
//!
//! One record per language. Locality, town, administrative area and
//! island are carried as reference ids with denormalised display text;
//! only the ids are authoritative.

use serde::{Deserialize, Serialize};

use super::collection::SubRecord;
use super::domain::{ChangeType, Language};
use super::identity::{PkId, Usrn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreetDescriptor {
    pub pk_id: PkId,
    pub usrn: Usrn,
    /// Street name or description text.
    #[serde(default)]
    pub street_descriptor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc_ref: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town_ref: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_area_ref: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrative_area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub island_ref: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub island: Option<String>,
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
}

impl StreetDescriptor {
    /// Companion record for a bilingual gazetteer: same places, blank
    /// text in the second language, staged as an insert.
    pub fn twin(&self, pk_id: PkId, language: Language) -> Self {
        Self {
            pk_id,
            usrn: self.usrn,
            street_descriptor: String::new(),
            locality: self.locality.clone(),
            town: self.town.clone(),
            administrative_area: self.administrative_area.clone(),
            island: self.island.clone(),
            language,
            change_type: Some(ChangeType::Insert),
            ..*self
        }
    }

    /// User-editable fields; display text for the reference ids excluded.
    pub fn substantive_eq(&self, other: &Self) -> bool {
        self.street_descriptor == other.street_descriptor
            && self.loc_ref == other.loc_ref
            && self.town_ref == other.town_ref
            && self.admin_area_ref == other.admin_area_ref
            && self.island_ref == other.island_ref
            && self.language == other.language
    }
}

impl SubRecord for StreetDescriptor {
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
