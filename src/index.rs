//! Search and map payloads.
//!
//! The map and search collaborators never see the full aggregate, only
//! the lightweight entries built here: per-unit geometry plus per-type
//! summaries of the additional street data, keyed by type code.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::asd::AsdRecord;
use crate::core::domain::EditorCategory;
use crate::core::identity::{EsuId, PkId, Usrn};
use crate::core::street::{Street, StreetData};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EsuIndexEntry {
    pub esu_id: EsuId,
    pub wkt_geometry: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsdIndexEntry {
    pub pk_id: PkId,
    pub whole_road: bool,
    pub wkt_geometry: String,
}

/// One street's footprint in the search index.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreetIndexEntry {
    pub usrn: Usrn,
    pub address: String,
    pub esus: Vec<EsuIndexEntry>,
    /// Live additional street data grouped by type code (51..53 for
    /// OneScotland, 61..66 for GeoPlace). Codes with no live records
    /// are absent.
    pub asd: BTreeMap<u8, Vec<AsdIndexEntry>>,
}

impl StreetIndexEntry {
    pub fn from_street(street: &Street) -> Self {
        let esus = street
            .live_esus()
            .filter(|e| !e.wkt_geometry.is_empty())
            .map(|e| EsuIndexEntry {
                esu_id: e.esu_id,
                wkt_geometry: e.wkt_geometry.clone(),
            })
            .collect();

        let mut asd = BTreeMap::new();
        match &street.data {
            StreetData::Scottish(d) => {
                insert_entries(&mut asd, &d.maintenance_responsibilities);
                insert_entries(&mut asd, &d.reinstatement_categories);
                insert_entries(&mut asd, &d.special_designations);
            }
            StreetData::GeoPlaceAsd(d) => {
                insert_entries(&mut asd, &d.interests);
                insert_entries(&mut asd, &d.constructions);
                insert_entries(&mut asd, &d.special_designations);
                insert_entries(&mut asd, &d.height_width_weights);
                insert_entries(&mut asd, &d.public_right_of_ways);
            }
            StreetData::GeoPlace(_) => {}
        }

        Self {
            usrn: street.core.usrn,
            address: street.display_name().unwrap_or_default().to_owned(),
            esus,
            asd,
        }
    }
}

fn insert_entries<R: AsdRecord>(
    asd: &mut BTreeMap<u8, Vec<AsdIndexEntry>>,
    slot: &Option<Vec<R>>,
) {
    let Some(records) = slot else { return };
    let entries: Vec<AsdIndexEntry> = records
        .iter()
        .filter(|r| r.is_live())
        .map(|r| AsdIndexEntry {
            pk_id: r.pk_id(),
            whole_road: r.whole_road(),
            wkt_geometry: r.common().wkt_geometry.clone(),
        })
        .collect();
    if !entries.is_empty() {
        asd.insert(R::CATEGORY.type_code(), entries);
    }
}

/// Highlight signal sent to the map when an editor opens.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditFocus {
    pub object_type: EditorCategory,
    pub id: PkId,
}
