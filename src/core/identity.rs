//! Layer 1: Identity atoms
//!
//! Usrn: street-level external identifier
//! PkId: record key within a collection (negative = unsaved insert)
//! EsuId: elementary street unit identity, the parent key for child records
//! SeqNum: ordering position within a collection

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{CoreError, InvalidId};

/// Unique Street Reference Number.
///
/// Zero marks a provisional street that has never been persisted; the
/// backend assigns the real number on first save.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Usrn(i64);

impl Usrn {
    pub const PROVISIONAL: Usrn = Usrn(0);

    pub fn new(n: i64) -> Result<Self, CoreError> {
        if n < 0 {
            Err(InvalidId::Usrn {
                raw: n,
                reason: "must not be negative".into(),
            }
            .into())
        } else {
            Ok(Self(n))
        }
    }

    pub fn is_provisional(&self) -> bool {
        self.0 == 0
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for Usrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Usrn({})", self.0)
    }
}

impl fmt::Display for Usrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Usrn {
    type Error = CoreError;
    fn try_from(n: i64) -> Result<Self, Self::Error> {
        Usrn::new(n)
    }
}

impl From<Usrn> for i64 {
    fn from(u: Usrn) -> i64 {
        u.0
    }
}

/// Record primary key within its owning collection.
///
/// Positive values are backend-assigned. Values at or below
/// `SYNTHETIC_FLOOR` are synthetic ids for unsaved inserts, allocated
/// strictly decreasing. `-1..=-9` are reserved sentinels elsewhere in the
/// system and are never valid record keys, nor is zero.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct PkId(i64);

impl PkId {
    /// Highest (closest to zero) synthetic id an allocator may hand out.
    pub const SYNTHETIC_FLOOR: i64 = -10;

    pub fn new(n: i64) -> Result<Self, CoreError> {
        if n == 0 {
            Err(InvalidId::Pk {
                raw: n,
                reason: "zero is not a record key".into(),
            }
            .into())
        } else if (Self::SYNTHETIC_FLOOR + 1..0).contains(&n) {
            Err(InvalidId::Pk {
                raw: n,
                reason: "reserved sentinel band".into(),
            }
            .into())
        } else {
            Ok(Self(n))
        }
    }

    /// Construct a synthetic id. Callers guarantee `n <= SYNTHETIC_FLOOR`.
    pub(crate) fn synthetic(n: i64) -> Self {
        debug_assert!(n <= Self::SYNTHETIC_FLOOR);
        Self(n)
    }

    /// True for records that have never been persisted.
    pub fn is_unsaved(&self) -> bool {
        self.0 < 0
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for PkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PkId({})", self.0)
    }
}

impl fmt::Display for PkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for PkId {
    type Error = CoreError;
    fn try_from(n: i64) -> Result<Self, Self::Error> {
        PkId::new(n)
    }
}

impl From<PkId> for i64 {
    fn from(id: PkId) -> i64 {
        id.0
    }
}

/// Elementary street unit identity.
///
/// Shares the numeric conventions of [`PkId`]: positive once persisted,
/// synthetic negative while unsaved. Child records reference their parent
/// unit through this id, so re-parenting after divide/merge rewrites it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct EsuId(i64);

impl EsuId {
    pub fn new(n: i64) -> Result<Self, CoreError> {
        if n == 0 {
            Err(InvalidId::Esu {
                raw: n,
                reason: "zero is not an esu id".into(),
            }
            .into())
        } else if (PkId::SYNTHETIC_FLOOR + 1..0).contains(&n) {
            Err(InvalidId::Esu {
                raw: n,
                reason: "reserved sentinel band".into(),
            }
            .into())
        } else {
            Ok(Self(n))
        }
    }

    /// Construct a synthetic id. Callers guarantee `n <= PkId::SYNTHETIC_FLOOR`.
    pub(crate) fn synthetic(n: i64) -> Self {
        debug_assert!(n <= PkId::SYNTHETIC_FLOOR);
        Self(n)
    }

    pub fn is_unsaved(&self) -> bool {
        self.0 < 0
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for EsuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EsuId({})", self.0)
    }
}

impl fmt::Display for EsuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for EsuId {
    type Error = CoreError;
    fn try_from(n: i64) -> Result<Self, Self::Error> {
        EsuId::new(n)
    }
}

impl From<EsuId> for i64 {
    fn from(id: EsuId) -> i64 {
        id.0
    }
}

/// One-based ordering position within a collection.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SeqNum(u32);

impl SeqNum {
    pub const FIRST: SeqNum = SeqNum(1);

    pub fn new(n: u32) -> Result<Self, CoreError> {
        if n == 0 {
            Err(InvalidId::Seq {
                raw: n,
                reason: "sequence numbers start at 1".into(),
            }
            .into())
        } else {
            Ok(Self(n))
        }
    }

    pub fn next(&self) -> SeqNum {
        SeqNum(self.0.saturating_add(1))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeqNum({})", self.0)
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for SeqNum {
    type Error = CoreError;
    fn try_from(n: u32) -> Result<Self, Self::Error> {
        SeqNum::new(n)
    }
}

impl From<SeqNum> for u32 {
    fn from(seq: SeqNum) -> u32 {
        seq.0
    }
}
