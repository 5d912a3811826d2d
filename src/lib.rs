#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod error;
pub mod index;
pub mod lookup;
pub mod session;
pub mod telemetry;
pub mod template;

pub use error::{Effect, Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export core types at crate root for convenience
pub use crate::core::{
    AsdCategory, AsdCommon, AsdRecord, ChangeType, Construction, EditorCategory, Esu, EsuId,
    HeightWidthWeight, HighwayDedication, Interest, Jurisdiction, Language, LineString,
    MaintenanceResponsibility, OneWayExemption, OsSpecialDesignation, PkId, PublicRightOfWay,
    ReconcileOptions, RecordType, ReinstatementCategory, SeqNum, SpecialDesignation, Street,
    StreetCore, StreetData, StreetDescriptor, StreetNote, SuccessorCrossRef, Usrn,
};
