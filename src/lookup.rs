//! Reference data lookups and the street address cache.
//!
//! Locality, town, administrative area and island live in authority
//! reference tables keyed by id and language. The editor only ever
//! resolves ids to display text and asks for the authority defaults, so
//! that is the whole trait surface.

use std::collections::BTreeMap;

use crate::core::collection::SubRecord;
use crate::core::descriptor::StreetDescriptor;
use crate::core::domain::{ChangeType, Language};
use crate::core::identity::{PkId, Usrn};
use crate::core::street::Street;

/// Reference ids a new descriptor starts from.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DescriptorRefs {
    pub loc_ref: Option<i64>,
    pub town_ref: Option<i64>,
    pub admin_area_ref: Option<i64>,
    pub island_ref: Option<i64>,
}

pub trait StreetLookup {
    fn locality(&self, loc_ref: i64, language: Language) -> Option<&str>;
    fn town(&self, town_ref: i64, language: Language) -> Option<&str>;
    fn admin_area(&self, admin_area_ref: i64, language: Language) -> Option<&str>;
    fn island(&self, island_ref: i64, language: Language) -> Option<&str>;

    /// Authority-wide defaults for a brand new descriptor.
    fn default_refs(&self) -> DescriptorRefs;
}

/// In-memory reference tables, loaded once at startup.
#[derive(Clone, Debug, Default)]
pub struct StaticLookup {
    localities: BTreeMap<(i64, Language), String>,
    towns: BTreeMap<(i64, Language), String>,
    admin_areas: BTreeMap<(i64, Language), String>,
    islands: BTreeMap<(i64, Language), String>,
    defaults: DescriptorRefs,
}

impl StaticLookup {
    pub fn with_locality(mut self, id: i64, language: Language, text: &str) -> Self {
        self.localities.insert((id, language), text.to_owned());
        self
    }

    pub fn with_town(mut self, id: i64, language: Language, text: &str) -> Self {
        self.towns.insert((id, language), text.to_owned());
        self
    }

    pub fn with_admin_area(mut self, id: i64, language: Language, text: &str) -> Self {
        self.admin_areas.insert((id, language), text.to_owned());
        self
    }

    pub fn with_island(mut self, id: i64, language: Language, text: &str) -> Self {
        self.islands.insert((id, language), text.to_owned());
        self
    }

    pub fn with_defaults(mut self, defaults: DescriptorRefs) -> Self {
        self.defaults = defaults;
        self
    }
}

impl StreetLookup for StaticLookup {
    fn locality(&self, loc_ref: i64, language: Language) -> Option<&str> {
        self.localities.get(&(loc_ref, language)).map(String::as_str)
    }

    fn town(&self, town_ref: i64, language: Language) -> Option<&str> {
        self.towns.get(&(town_ref, language)).map(String::as_str)
    }

    fn admin_area(&self, admin_area_ref: i64, language: Language) -> Option<&str> {
        self.admin_areas
            .get(&(admin_area_ref, language))
            .map(String::as_str)
    }

    fn island(&self, island_ref: i64, language: Language) -> Option<&str> {
        self.islands.get(&(island_ref, language)).map(String::as_str)
    }

    fn default_refs(&self) -> DescriptorRefs {
        self.defaults
    }
}

/// Authority defaults with their display text resolved, captured once
/// per editing session.
#[derive(Clone, Debug, Default)]
pub struct DescriptorDefaults {
    pub refs: DescriptorRefs,
    pub locality: Option<String>,
    pub town: Option<String>,
    pub admin_area: Option<String>,
    pub island: Option<String>,
}

impl DescriptorDefaults {
    pub fn resolve(lookup: &dyn StreetLookup, language: Language) -> Self {
        let refs = lookup.default_refs();
        Self {
            refs,
            locality: refs
                .loc_ref
                .and_then(|id| lookup.locality(id, language))
                .map(str::to_owned),
            town: refs
                .town_ref
                .and_then(|id| lookup.town(id, language))
                .map(str::to_owned),
            admin_area: refs
                .admin_area_ref
                .and_then(|id| lookup.admin_area(id, language))
                .map(str::to_owned),
            island: refs
                .island_ref
                .and_then(|id| lookup.island(id, language))
                .map(str::to_owned),
        }
    }

    /// A blank descriptor at the authority defaults, staged as an insert.
    pub fn new_descriptor(&self, pk_id: PkId, usrn: Usrn, language: Language) -> StreetDescriptor {
        StreetDescriptor {
            pk_id,
            usrn,
            street_descriptor: String::new(),
            loc_ref: self.refs.loc_ref,
            locality: self.locality.clone(),
            town_ref: self.refs.town_ref,
            town: self.town.clone(),
            admin_area_ref: self.refs.admin_area_ref,
            administrative_area: self.admin_area.clone(),
            island_ref: self.refs.island_ref,
            island: self.island.clone(),
            language,
            change_type: Some(ChangeType::Insert),
        }
    }
}

/// Usrn-to-address cache feeding search results.
#[derive(Clone, Debug, Default)]
pub struct DescriptorCache {
    entries: BTreeMap<Usrn, String>,
}

impl DescriptorCache {
    pub fn address(&self, usrn: Usrn) -> Option<&str> {
        self.entries.get(&usrn).map(String::as_str)
    }

    /// Refresh the entry from a saved aggregate.
    pub fn update_street(&mut self, street: &Street) {
        self.entries
            .insert(street.core.usrn, compose_address(street));
    }

    pub fn remove(&mut self, usrn: Usrn) {
        self.entries.remove(&usrn);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn compose_address(street: &Street) -> String {
    let descriptor = street
        .core
        .street_descriptors
        .iter()
        .filter(|d| d.is_live())
        .find(|d| d.language == Language::Eng)
        .or_else(|| {
            street
                .core
                .street_descriptors
                .iter()
                .find(|d| d.is_live())
        });
    let Some(descriptor) = descriptor else {
        return String::new();
    };

    let mut parts: Vec<&str> = vec![descriptor.street_descriptor.as_str()];
    for extra in [&descriptor.locality, &descriptor.town] {
        if let Some(text) = extra.as_deref() {
            if !text.is_empty() {
                parts.push(text);
            }
        }
    }
    parts.retain(|p| !p.is_empty());
    parts.join(", ")
}
