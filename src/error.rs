use thiserror::Error;

use crate::config::ConfigError;
use crate::core::error::CoreError;
use crate::core::reconcile::ReconcileError;
use crate::session::{EsuOpError, SaveError, SessionError};

/// Whether retrying this operation may succeed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transience {
    /// Retry will never help without changing inputs/state.
    Permanent,
    /// Retry may help (transient contention/outage).
    Retryable,
    /// Unknown if retry will help.
    Unknown,
}

impl Transience {
    pub fn is_retryable(self) -> bool {
        matches!(self, Transience::Retryable)
    }
}

/// What we know about persisted side effects when an error is returned.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Effect {
    /// Definitely nothing reached persistence.
    None,
    /// Persistence definitely changed.
    Some,
    /// We don't know whether persistence changed.
    Unknown,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::None => "none",
            Effect::Some => "some",
            Effect::Unknown => "unknown",
        }
    }
}

/// Crate-level convenience error.
///
/// Not a "god error": it is a thin wrapper over canonical capability errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    EsuOp(#[from] EsuOpError),

    #[error(transparent)]
    Save(#[from] SaveError),
}

impl Error {
    pub fn transience(&self) -> Transience {
        match self {
            Error::Core(e) => e.transience(),
            Error::Config(e) => e.transience(),
            Error::Reconcile(e) => e.transience(),
            Error::Session(e) => e.transience(),
            Error::EsuOp(e) => e.transience(),
            Error::Save(e) => e.transience(),
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Error::Core(e) => e.effect(),
            Error::Config(e) => e.effect(),
            Error::Reconcile(e) => e.effect(),
            Error::Session(e) => e.effect(),
            Error::EsuOp(e) => e.effect(),
            Error::Save(e) => e.effect(),
        }
    }
}
