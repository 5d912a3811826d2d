//! Core domain types for the gazetteer (Layers 0-7)
//!
//! Module hierarchy follows type dependency order:
//! - error: invalid-input taxonomy (Layer 0)
//! - dates: wire calendar format (Layer 0)
//! - identity: Usrn, PkId, EsuId, SeqNum (Layer 1)
//! - domain: code sets, Jurisdiction, editor categories (Layer 2)
//! - geometry: WKT line helpers, whole-road union (Layer 3)
//! - collection: SubRecord machinery, allocation, patches (Layer 4)
//! - esu, asd, descriptor, note, successor: record families (Layer 5)
//! - street: the jurisdiction-shaped aggregate (Layer 6)
//! - reconcile: aggregate-in, aggregate-out rebuild (Layer 7)

pub mod asd;
pub mod collection;
pub mod dates;
pub mod descriptor;
pub mod domain;
pub mod error;
pub mod esu;
pub mod geometry;
pub mod identity;
pub mod note;
pub mod reconcile;
pub mod street;
pub mod successor;

pub use asd::{
    AsdCommon, AsdRecord, Construction, HeightWidthWeight, Interest, MaintenanceResponsibility,
    OsSpecialDesignation, PublicRightOfWay, ReinstatementCategory, SpecialDesignation,
};
pub use collection::{
    CollectionPatch, DeleteOutcome, Sequenced, SubRecord, delete_record, delete_record_with,
    next_pk_id, next_seq_num,
};
pub use dates::{format_wire_date, parse_wire_date, today};
pub use descriptor::StreetDescriptor;
pub use domain::{
    AsdCategory, AssignUnassign, ChangeType, EditorCategory, EsuClassification, EsuDirection,
    Jurisdiction, Language, RecordType, StreetState, Tolerance,
};
pub use error::{CoreError, DateError, GeometryError, InvalidCode, InvalidId, RangeError};
pub use esu::{Esu, HighwayDedication, OneWayExemption};
pub use geometry::{Endpoints, LineString, Point, endpoints, total_length, union_whole_road};
pub use identity::{EsuId, PkId, SeqNum, Usrn};
pub use note::StreetNote;
pub use reconcile::{AsdSlot, ReconcileError, ReconcileOptions, StreetPatches, reconcile};
pub use street::{GeoPlaceAsdData, GeoPlaceData, ScottishData, Street, StreetCore, StreetData};
pub use successor::SuccessorCrossRef;
