#![allow(dead_code)]

use std::collections::BTreeMap;

use street_gazetteer::core::{ChangeType, EditorCategory, EsuId, PkId, Street, StreetData, Usrn};
use street_gazetteer::session::{
    ConfirmDecision, ConfirmEdit, ConfirmPrompt, FieldError, PersistStreet, TransportError,
    ValidateStreet, ValidationOutcome, classify_response,
};

pub struct Approve;

impl ValidateStreet for Approve {
    fn validate(&self, _street: &Street) -> ValidationOutcome {
        ValidationOutcome::ok()
    }
}

/// Rejects every aggregate with one field error.
pub struct Reject {
    pub category: EditorCategory,
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidateStreet for Reject {
    fn validate(&self, _street: &Street) -> ValidationOutcome {
        let mut errors = BTreeMap::new();
        errors.insert(
            self.category,
            vec![FieldError {
                index: 0,
                field: self.field.to_owned(),
                message: self.message.to_owned(),
            }],
        );
        ValidationOutcome::failed(errors)
    }
}

/// Answers prompts from a script, in order.
pub struct Scripted {
    answers: Vec<ConfirmDecision>,
}

impl Scripted {
    pub fn new(answers: &[ConfirmDecision]) -> Self {
        Self {
            answers: answers.to_vec(),
        }
    }
}

impl ConfirmEdit for Scripted {
    fn confirm(&mut self, _prompt: ConfirmPrompt) -> ConfirmDecision {
        assert!(!self.answers.is_empty(), "prompted more often than scripted");
        self.answers.remove(0)
    }
}

/// Panics if the flow under test prompts at all.
pub struct NeverAsked;

impl ConfirmEdit for NeverAsked {
    fn confirm(&mut self, prompt: ConfirmPrompt) -> ConfirmDecision {
        panic!("unexpected prompt: {prompt:?}");
    }
}

/// Stand-in server: logs payloads, echoes aggregates back the way the
/// real one does, with tombstoned records dropped and synthetic keys
/// replaced by server-allocated ones.
pub struct MockPersist {
    pub saves: Vec<Street>,
    pub deletes: Vec<Usrn>,
    pub fail: Option<(u16, String)>,
    stored: Option<Street>,
    next_key: i64,
    next_usrn: i64,
}

impl MockPersist {
    pub fn new() -> Self {
        Self {
            saves: Vec::new(),
            deletes: Vec::new(),
            fail: None,
            stored: None,
            next_key: 9000,
            next_usrn: 90000,
        }
    }

    pub fn failing(status: u16, body: &str) -> Self {
        let mut persist = Self::new();
        persist.fail = Some((status, body.to_owned()));
        persist
    }

    pub fn clear_failure(&mut self) {
        self.fail = None;
    }
}

impl PersistStreet for MockPersist {
    fn save(&mut self, street: &Street) -> Result<Street, TransportError> {
        self.saves.push(street.clone());
        if let Some((status, body)) = &self.fail {
            return Err(classify_response(*status, body));
        }
        let mut echo = street.clone();
        adopt_aggregate(&mut echo, &mut self.next_key, &mut self.next_usrn);
        self.stored = Some(echo.clone());
        Ok(echo)
    }

    fn delete(&mut self, usrn: Usrn) -> Result<bool, TransportError> {
        self.deletes.push(usrn);
        if self.stored.as_ref().is_some_and(|s| s.core.usrn == usrn) {
            self.stored = None;
            return Ok(true);
        }
        Ok(false)
    }

    fn rename_usrn(&mut self, from: Usrn, to: Usrn) -> Result<Street, TransportError> {
        let mut street = self.stored.take().expect("rename needs a saved street");
        assert_eq!(street.core.usrn, from, "rename from the stored usrn");
        rekey_usrn(&mut street, to);
        self.stored = Some(street.clone());
        Ok(street)
    }
}

fn adopt(pk: &mut PkId, next: &mut i64) {
    if pk.value() < 0 {
        *next += 1;
        *pk = PkId::new(*next).unwrap();
    }
}

/// What the server does to a payload before echoing it: assign real
/// keys, re-key synthetic esu ids, drop deletions, clear delta markers.
fn adopt_aggregate(street: &mut Street, next: &mut i64, next_usrn: &mut i64) {
    if street.core.usrn.is_provisional() {
        *next_usrn += 1;
        street.core.usrn = Usrn::new(*next_usrn).unwrap();
    }
    let usrn = street.core.usrn;
    street.core.change_type = None;

    street
        .core
        .street_descriptors
        .retain(|d| d.change_type != Some(ChangeType::Delete));
    for descriptor in &mut street.core.street_descriptors {
        adopt(&mut descriptor.pk_id, next);
        descriptor.usrn = usrn;
        descriptor.change_type = None;
    }

    street
        .core
        .street_notes
        .retain(|n| n.change_type != Some(ChangeType::Delete));
    for note in &mut street.core.street_notes {
        adopt(&mut note.pk_id, next);
        note.usrn = usrn;
        note.change_type = None;
    }

    street
        .core
        .esus
        .retain(|e| e.change_type != Some(ChangeType::Delete));
    for esu in &mut street.core.esus {
        let minted = esu.esu_id.value() < 0;
        adopt(&mut esu.pk_id, next);
        if minted {
            esu.esu_id = EsuId::new(esu.pk_id.value()).unwrap();
        }
        esu.change_type = None;
        esu.highway_dedications
            .retain(|h| h.change_type != Some(ChangeType::Delete));
        for hd in &mut esu.highway_dedications {
            adopt(&mut hd.pk_id, next);
            hd.esu_id = esu.esu_id;
            hd.usrn = usrn;
            hd.change_type = None;
        }
        esu.one_way_exemptions
            .retain(|o| o.change_type != Some(ChangeType::Delete));
        for owe in &mut esu.one_way_exemptions {
            adopt(&mut owe.pk_id, next);
            owe.esu_id = esu.esu_id;
            owe.change_type = None;
        }
    }

    // Only the slots the seeded streets populate.
    if let StreetData::GeoPlaceAsd(data) = &mut street.data {
        if let Some(interests) = &mut data.interests {
            interests.retain(|i| i.common.change_type != Some(ChangeType::Delete));
            for interest in interests {
                adopt(&mut interest.common.pk_id, next);
                interest.common.usrn = usrn;
                interest.common.change_type = None;
            }
        }
    }
}

fn rekey_usrn(street: &mut Street, to: Usrn) {
    street.core.usrn = to;
    for descriptor in &mut street.core.street_descriptors {
        descriptor.usrn = to;
    }
    for note in &mut street.core.street_notes {
        note.usrn = to;
    }
    for esu in &mut street.core.esus {
        for hd in &mut esu.highway_dedications {
            hd.usrn = to;
        }
    }
    if let StreetData::GeoPlaceAsd(data) = &mut street.data {
        if let Some(interests) = &mut data.interests {
            for interest in interests {
                interest.common.usrn = to;
            }
        }
    }
}
