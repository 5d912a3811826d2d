//! Save pipeline: confirm, validate, persist, adopt the echo.
//!
//! The session never talks to a server itself. Persistence, validation
//! and user confirmation come in as traits, so the pipeline runs the
//! same under a real HTTP client and under the test mocks. What the
//! session owns is the ordering: an open editor is resolved first, the
//! aggregate is validated next, and only a clean aggregate goes out.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::core::domain::EditorCategory;
use crate::core::identity::Usrn;
use crate::core::street::Street;
use crate::error::{Effect, Transience};
use crate::index::StreetIndexEntry;
use crate::lookup::DescriptorCache;

use super::{EditorSession, SessionError};

/// One failed server or client check, tied to a record by its position
/// in the category collection.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    #[serde(default)]
    pub index: usize,
    pub field: String,
    pub message: String,
}

/// Verdict of a validation pass over the whole aggregate.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: BTreeMap<EditorCategory, Vec<FieldError>>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: BTreeMap::new(),
        }
    }

    pub fn failed(errors: BTreeMap<EditorCategory, Vec<FieldError>>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// Client-side checks run before anything leaves the session.
pub trait ValidateStreet {
    fn validate(&self, street: &Street) -> ValidationOutcome;
}

/// The user's answer to a keep-or-drop prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmDecision {
    Save,
    Discard,
    Cancel,
}

/// Why the user is being asked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmPrompt {
    /// Street save requested while an editor holds a changed record.
    AssociatedChanges { category: EditorCategory },
    /// Editor closing over a changed record.
    StagedEdit { category: EditorCategory },
}

pub trait ConfirmEdit {
    fn confirm(&mut self, prompt: ConfirmPrompt) -> ConfirmDecision;
}

/// The persistence boundary. A successful save echoes the canonical
/// aggregate back, server-allocated keys included.
pub trait PersistStreet {
    fn save(&mut self, street: &Street) -> Result<Street, TransportError>;
    fn delete(&mut self, usrn: Usrn) -> Result<bool, TransportError>;
    fn rename_usrn(&mut self, from: Usrn, to: Usrn) -> Result<Street, TransportError>;
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("the street failed server-side validation")]
    FieldErrors {
        errors: BTreeMap<EditorCategory, Vec<FieldError>>,
    },
    #[error("your session has expired, sign in again to continue")]
    SessionExpired,
    #[error("you do not have permission to edit this street")]
    Forbidden,
    #[error("the save failed ({status}): {title}")]
    Failed {
        status: u16,
        title: String,
        detail: Option<String>,
    },
}

impl TransportError {
    /// Status-bar text; the detail line is appended when the server
    /// sent one.
    pub fn user_message(&self) -> String {
        match self {
            Self::Failed {
                detail: Some(detail),
                ..
            } => format!("{self}: {detail}"),
            _ => self.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.transience().is_retryable()
    }

    pub fn transience(&self) -> Transience {
        match self {
            Self::Failed { status, .. } if *status >= 500 => Transience::Retryable,
            _ => Transience::Permanent,
        }
    }

    /// A failed status may still have landed server-side; the rejection
    /// variants definitely did not.
    pub fn effect(&self) -> Effect {
        match self {
            Self::Failed { .. } => Effect::Unknown,
            _ => Effect::None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    errors: Option<BTreeMap<EditorCategory, Vec<FieldError>>>,
    title: Option<String>,
    detail: Option<String>,
}

/// Sort a non-success response into the transport error taxonomy.
///
/// A 400 carrying a parseable field-error map becomes per-record
/// errors; everything else degrades through problem-JSON title, first
/// text line, then a generic message.
pub fn classify_response(status: u16, body: &str) -> TransportError {
    match status {
        400 => {
            if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
                if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
                    return TransportError::FieldErrors { errors };
                }
            }
            failed(status, body)
        }
        401 => TransportError::SessionExpired,
        403 => TransportError::Forbidden,
        _ => failed(status, body),
    }
}

fn failed(status: u16, body: &str) -> TransportError {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(title) = parsed.title.filter(|t| !t.trim().is_empty()) {
            return TransportError::Failed {
                status,
                title,
                detail: parsed.detail,
            };
        }
    }
    let title = body
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unexpected error, contact support")
        .to_owned();
    TransportError::Failed {
        status,
        title,
        detail: None,
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("the street failed validation")]
    Validation(ValidationOutcome),
    #[error("the save was cancelled")]
    Cancelled,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl SaveError {
    pub fn transience(&self) -> Transience {
        match self {
            // The user may answer the prompt differently next time.
            Self::Cancelled => Transience::Unknown,
            Self::Validation(_) => Transience::Permanent,
            Self::Transport(e) => e.transience(),
            Self::Session(e) => e.transience(),
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Self::Cancelled | Self::Validation(_) => Effect::None,
            Self::Transport(e) => e.effect(),
            Self::Session(e) => e.effect(),
        }
    }
}

/// What a completed save hands back for search and navigation.
#[derive(Clone, Debug)]
pub struct SaveOutcome {
    pub usrn: Usrn,
    pub entry: StreetIndexEntry,
}

impl EditorSession {
    /// Persist the aggregate.
    ///
    /// An open editor whose record changed asks the user first; cancel
    /// aborts with nothing touched. Validation failures latch and stop
    /// before transport, as do server-side field errors, so the staged
    /// state stays put for correction. On success the echo replaces
    /// both aggregates and the address cache is refreshed.
    pub fn save(
        &mut self,
        persist: &mut dyn PersistStreet,
        validator: &dyn ValidateStreet,
        confirmer: &mut dyn ConfirmEdit,
        cache: &mut DescriptorCache,
    ) -> Result<SaveOutcome, SaveError> {
        if let Some(open) = self.open {
            if self.record_changed(open) {
                match confirmer.confirm(ConfirmPrompt::AssociatedChanges {
                    category: open.category,
                }) {
                    ConfirmDecision::Cancel => return Err(SaveError::Cancelled),
                    ConfirmDecision::Save => self.accept_open(open),
                    ConfirmDecision::Discard => {
                        self.discard_open(open)?;
                    }
                }
            } else {
                self.accept_open(open);
            }
        }

        let outcome = validator.validate(&self.current);
        if !outcome.valid {
            self.failed_validation = true;
            return Err(SaveError::Validation(outcome));
        }

        let echo = match persist.save(&self.current) {
            Ok(echo) => echo,
            Err(err) => {
                if matches!(err, TransportError::FieldErrors { .. }) {
                    self.failed_validation = true;
                }
                return Err(SaveError::Transport(err));
            }
        };
        self.rehydrate(echo).map_err(SessionError::from)?;
        cache.update_street(&self.current);
        Ok(SaveOutcome {
            usrn: self.current.core.usrn,
            entry: self.index_entry(),
        })
    }

    /// Remove the street from persistence and the address cache. Local
    /// state is left alone; callers drop the session on `true`.
    pub fn delete_street(
        &mut self,
        persist: &mut dyn PersistStreet,
        cache: &mut DescriptorCache,
    ) -> Result<bool, TransportError> {
        let usrn = self.current.core.usrn;
        let deleted = persist.delete(usrn)?;
        if deleted {
            cache.remove(usrn);
        }
        Ok(deleted)
    }

    /// Move the street to a new usrn. The server performs the move and
    /// echoes the re-keyed aggregate; the cache entry follows.
    pub fn rename_usrn(
        &mut self,
        to: Usrn,
        persist: &mut dyn PersistStreet,
        cache: &mut DescriptorCache,
    ) -> Result<Usrn, SaveError> {
        let from = self.current.core.usrn;
        let echo = persist.rename_usrn(from, to)?;
        cache.remove(from);
        self.rehydrate(echo)
            .map_err(SessionError::from)?;
        cache.update_street(&self.current);
        Ok(self.current.core.usrn)
    }
}
