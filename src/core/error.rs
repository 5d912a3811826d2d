//! Core capability errors (parsing, validation, shaping invariants).
//!
//! These are bounded and stable: core errors represent domain/refusal states,
//! not library implementation details.

use thiserror::Error;

use crate::error::{Effect, Transience};

/// Invalid identifier.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum InvalidId {
    #[error("usrn `{raw}` is invalid: {reason}")]
    Usrn { raw: i64, reason: String },
    #[error("pk id `{raw}` is invalid: {reason}")]
    Pk { raw: i64, reason: String },
    #[error("esu id `{raw}` is invalid: {reason}")]
    Esu { raw: i64, reason: String },
    #[error("sequence number `{raw}` is invalid: {reason}")]
    Seq { raw: u32, reason: String },
}

/// Invalid domain code string.
#[derive(Debug, Error, Clone)]
#[error("{field} code `{raw}` is invalid: {reason}")]
pub struct InvalidCode {
    pub field: &'static str,
    pub raw: String,
    pub reason: String,
}

/// Generic range violation.
#[derive(Debug, Error, Clone)]
#[error("{field} value {value} out of range {min}..={max}")]
pub struct RangeError {
    pub field: &'static str,
    pub value: i64,
    pub min: i64,
    pub max: i64,
}

/// Unparsable or degenerate geometry text.
#[derive(Debug, Error, Clone)]
#[error("geometry `{raw}` is invalid: {reason}")]
pub struct GeometryError {
    pub raw: String,
    pub reason: String,
}

/// Unparsable wire date.
#[derive(Debug, Error, Clone)]
#[error("date `{raw}` is invalid: {reason}")]
pub struct DateError {
    pub raw: String,
    pub reason: String,
}

/// Canonical error enum for core capability.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum CoreError {
    #[error(transparent)]
    InvalidId(#[from] InvalidId),
    #[error(transparent)]
    InvalidCode(#[from] InvalidCode),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Date(#[from] DateError),
}

impl CoreError {
    pub fn transience(&self) -> Transience {
        // Core errors are pure domain/input failures.
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}
