//! Layer 2: Domain codes
//!
//! ChangeType: I/U/D delta marker
//! Jurisdiction: Scottish / Welsh / GeoPlace flags and ASD gating
//! RecordType, StreetState, EsuDirection, EsuClassification, Tolerance,
//! AssignUnassign: validated numeric codes
//! AsdCategory, EditorCategory: the per-category dispatch axes

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{CoreError, InvalidCode, RangeError};

/// `Display` via `as_str`, shared by the code enums below.
macro_rules! fmt_as_str {
    () => {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.as_str())
        }
    };
}

/// Delta marker carried on every sub-record for downstream persistence.
///
/// Absent (`None` at the field level) means the record is unchanged since
/// the last save.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    #[serde(rename = "I")]
    Insert,
    #[serde(rename = "U")]
    Update,
    #[serde(rename = "D")]
    Delete,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "I",
            Self::Update => "U",
            Self::Delete => "D",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "I" => Ok(Self::Insert),
            "U" => Ok(Self::Update),
            "D" => Ok(Self::Delete),
            other => Err(InvalidCode {
                field: "changeType",
                raw: other.to_string(),
                reason: "expected I, U or D".into(),
            }
            .into()),
        }
    }
}

impl fmt::Display for ChangeType {
    fmt_as_str!();
}

/// Descriptor language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "ENG")]
    Eng,
    #[serde(rename = "CYM")]
    Cym,
    #[serde(rename = "GAE")]
    Gae,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eng => "ENG",
            Self::Cym => "CYM",
            Self::Gae => "GAE",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "ENG" => Ok(Self::Eng),
            "CYM" => Ok(Self::Cym),
            "GAE" => Ok(Self::Gae),
            other => Err(InvalidCode {
                field: "language",
                raw: other.to_string(),
                reason: "expected ENG, CYM or GAE".into(),
            }
            .into()),
        }
    }
}

impl fmt::Display for Language {
    fmt_as_str!();
}

/// Street record type, 1..=4.
///
/// 1 = officially designated, 2 = described by location, 3 = numbered,
/// 4 = unofficial. High values gate additional street data off: GeoPlace
/// drops ASD at 4, Scottish streets already at 3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordType(u8);

impl RecordType {
    pub const OFFICIAL: RecordType = RecordType(1);
    pub const DESCRIBED: RecordType = RecordType(2);
    pub const NUMBERED: RecordType = RecordType(3);
    pub const UNOFFICIAL: RecordType = RecordType(4);

    pub fn new(n: u8) -> Result<Self, CoreError> {
        if !(1..=4).contains(&n) {
            Err(RangeError {
                field: "recordType",
                value: n as i64,
                min: 1,
                max: 4,
            }
            .into())
        } else {
            Ok(Self(n))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for RecordType {
    fn default() -> Self {
        Self::OFFICIAL
    }
}

/// Street state code, 1..=5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreetState(u8);

impl StreetState {
    pub const UNDER_CONSTRUCTION: StreetState = StreetState(1);
    pub const OPEN: StreetState = StreetState(2);
    pub const PERMANENTLY_CLOSED: StreetState = StreetState(4);
    pub const ADDRESSING_ONLY: StreetState = StreetState(5);

    pub fn new(n: u8) -> Result<Self, CoreError> {
        if !(1..=5).contains(&n) {
            Err(RangeError {
                field: "state",
                value: n as i64,
                min: 1,
                max: 5,
            }
            .into())
        } else {
            Ok(Self(n))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for StreetState {
    fn default() -> Self {
        Self::OPEN
    }
}

/// ESU direction of traffic flow, 1..=3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EsuDirection(u8);

impl EsuDirection {
    pub const TWO_WAY: EsuDirection = EsuDirection(1);
    pub const ONE_WAY: EsuDirection = EsuDirection(2);
    pub const ONE_WAY_REVERSED: EsuDirection = EsuDirection(3);

    pub fn new(n: u8) -> Result<Self, CoreError> {
        if !(1..=3).contains(&n) {
            Err(RangeError {
                field: "esuDirection",
                value: n as i64,
                min: 1,
                max: 3,
            }
            .into())
        } else {
            Ok(Self(n))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for EsuDirection {
    fn default() -> Self {
        Self::TWO_WAY
    }
}

/// ESU classification code, 1..=12.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EsuClassification(u8);

impl EsuClassification {
    pub const ALL_VEHICLES: EsuClassification = EsuClassification(4);
    pub const RESTRICTED: EsuClassification = EsuClassification(6);
    pub const PEDESTRIAN: EsuClassification = EsuClassification(9);

    pub fn new(n: u8) -> Result<Self, CoreError> {
        if !(1..=12).contains(&n) {
            Err(RangeError {
                field: "esuClassification",
                value: n as i64,
                min: 1,
                max: 12,
            }
            .into())
        } else {
            Ok(Self(n))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for EsuClassification {
    fn default() -> Self {
        Self::ALL_VEHICLES
    }
}

/// Capture tolerance in metres, 0..=99.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tolerance(u8);

impl Tolerance {
    pub fn new(n: u8) -> Result<Self, CoreError> {
        if n > 99 {
            Err(RangeError {
                field: "tolerance",
                value: n as i64,
                min: 0,
                max: 99,
            }
            .into())
        } else {
            Ok(Self(n))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self(10)
    }
}

/// ESU assignment tri-state: 0 normal, 1 newly assigned, -1 pending unassign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignUnassign(i8);

impl AssignUnassign {
    pub const NORMAL: AssignUnassign = AssignUnassign(0);
    pub const ASSIGNED: AssignUnassign = AssignUnassign(1);
    pub const PENDING_UNASSIGN: AssignUnassign = AssignUnassign(-1);

    pub fn new(n: i8) -> Result<Self, CoreError> {
        if !(-1..=1).contains(&n) {
            Err(RangeError {
                field: "assignUnassign",
                value: n as i64,
                min: -1,
                max: 1,
            }
            .into())
        } else {
            Ok(Self(n))
        }
    }

    pub fn value(&self) -> i8 {
        self.0
    }
}

impl Default for AssignUnassign {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Jurisdiction flags carried through every reconciliation.
///
/// Scottish authorities record OneScotland ASD (51/52/53); GeoPlace
/// authorities with ASD record 61..66. The Welsh flag only switches the
/// second descriptor language, never the ASD shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jurisdiction {
    pub scottish: bool,
    pub welsh: bool,
    pub has_asd: bool,
}

impl Jurisdiction {
    pub fn scottish() -> Self {
        Self {
            scottish: true,
            welsh: false,
            has_asd: true,
        }
    }

    pub fn geoplace(has_asd: bool) -> Self {
        Self {
            scottish: false,
            welsh: false,
            has_asd,
        }
    }

    pub fn welsh(has_asd: bool) -> Self {
        Self {
            scottish: false,
            welsh: true,
            has_asd,
        }
    }

    pub fn is_one_scotland(&self) -> bool {
        self.scottish
    }

    /// Whether ASD collections are legal for a street of this record type.
    pub fn asd_applicable(&self, record_type: RecordType) -> bool {
        if self.scottish {
            record_type.value() < 3
        } else {
            self.has_asd && record_type.value() < 4
        }
    }

    /// Second descriptor language, when the gazetteer is bilingual.
    pub fn second_language(&self) -> Option<Language> {
        if self.welsh {
            Some(Language::Cym)
        } else if self.scottish {
            Some(Language::Gae)
        } else {
            None
        }
    }
}

/// The eight additional street data categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AsdCategory {
    MaintenanceResponsibility,
    ReinstatementCategory,
    OsSpecialDesignation,
    Interest,
    Construction,
    SpecialDesignation,
    HeightWidthWeight,
    PublicRightOfWay,
}

impl AsdCategory {
    const ONE_SCOTLAND: [AsdCategory; 3] = [
        AsdCategory::MaintenanceResponsibility,
        AsdCategory::ReinstatementCategory,
        AsdCategory::OsSpecialDesignation,
    ];

    const GEOPLACE: [AsdCategory; 5] = [
        AsdCategory::Interest,
        AsdCategory::Construction,
        AsdCategory::SpecialDesignation,
        AsdCategory::HeightWidthWeight,
        AsdCategory::PublicRightOfWay,
    ];

    /// Wire type code used by the search/map collaborators.
    pub fn type_code(&self) -> u8 {
        match self {
            Self::MaintenanceResponsibility => 51,
            Self::ReinstatementCategory => 52,
            Self::OsSpecialDesignation => 53,
            Self::Interest => 61,
            Self::Construction => 62,
            Self::SpecialDesignation => 63,
            Self::HeightWidthWeight => 64,
            Self::PublicRightOfWay => 66,
        }
    }

    pub fn is_one_scotland(&self) -> bool {
        self.type_code() < 60
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaintenanceResponsibility => "maintenanceResponsibility",
            Self::ReinstatementCategory => "reinstatementCategory",
            Self::OsSpecialDesignation => "osSpecialDesignation",
            Self::Interest => "interest",
            Self::Construction => "construction",
            Self::SpecialDesignation => "specialDesignation",
            Self::HeightWidthWeight => "heightWidthWeight",
            Self::PublicRightOfWay => "publicRightOfWay",
        }
    }

    /// Categories legal for the given jurisdiction, in wire order.
    pub fn for_jurisdiction(jurisdiction: &Jurisdiction) -> &'static [AsdCategory] {
        if jurisdiction.scottish {
            &Self::ONE_SCOTLAND
        } else if jurisdiction.has_asd {
            &Self::GEOPLACE
        } else {
            &[]
        }
    }
}

impl fmt::Display for AsdCategory {
    fmt_as_str!();
}

/// Editor category axis: every sub-record kind one editor can hold open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EditorCategory {
    Descriptor,
    Esu,
    HighwayDedication,
    OneWayExemption,
    Note,
    SuccessorCrossRef,
    Asd(AsdCategory),
}

impl EditorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Descriptor => "descriptor",
            Self::Esu => "esu",
            Self::HighwayDedication => "highwayDedication",
            Self::OneWayExemption => "oneWayExemption",
            Self::Note => "note",
            Self::SuccessorCrossRef => "successorCrossRef",
            Self::Asd(cat) => cat.as_str(),
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "descriptor" => Ok(Self::Descriptor),
            "esu" => Ok(Self::Esu),
            "highwayDedication" => Ok(Self::HighwayDedication),
            "oneWayExemption" => Ok(Self::OneWayExemption),
            "note" => Ok(Self::Note),
            "successorCrossRef" => Ok(Self::SuccessorCrossRef),
            "maintenanceResponsibility" => Ok(Self::Asd(AsdCategory::MaintenanceResponsibility)),
            "reinstatementCategory" => Ok(Self::Asd(AsdCategory::ReinstatementCategory)),
            "osSpecialDesignation" => Ok(Self::Asd(AsdCategory::OsSpecialDesignation)),
            "interest" => Ok(Self::Asd(AsdCategory::Interest)),
            "construction" => Ok(Self::Asd(AsdCategory::Construction)),
            "specialDesignation" => Ok(Self::Asd(AsdCategory::SpecialDesignation)),
            "heightWidthWeight" => Ok(Self::Asd(AsdCategory::HeightWidthWeight)),
            "publicRightOfWay" => Ok(Self::Asd(AsdCategory::PublicRightOfWay)),
            other => Err(InvalidCode {
                field: "category",
                raw: other.to_string(),
                reason: "unknown editor category".into(),
            }
            .into()),
        }
    }

    /// True for the categories parented by an ESU rather than the street.
    pub fn is_esu_child(&self) -> bool {
        matches!(self, Self::HighwayDedication | Self::OneWayExemption)
    }
}

impl fmt::Display for EditorCategory {
    fmt_as_str!();
}

impl Serialize for EditorCategory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EditorCategory {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        EditorCategory::parse(&raw).map_err(serde::de::Error::custom)
    }
}
