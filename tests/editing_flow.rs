//! End-to-end editing flows: select, stage, close, save, adopt.

mod fixtures;

use fixtures::persist::{Approve, MockPersist, NeverAsked, Reject, Scripted};
use fixtures::streets::{config, jurisdiction, lookup, opened, seeded_session};
use street_gazetteer::core::{ChangeType, EditorCategory, SeqNum, Usrn};
use street_gazetteer::lookup::DescriptorCache;
use street_gazetteer::session::{
    ConfirmDecision, EditorSession, HomeAction, SaveError, Selection, StagedRecord, TransportError,
};

#[test]
fn staged_edits_save_and_adopt_the_server_echo() {
    let mut session = seeded_session().with_user("kroberts");

    let note_pk = opened(
        session
            .select(EditorCategory::Note, Selection::New, None)
            .expect("open note editor"),
    );
    assert_eq!(note_pk.value(), -10);
    let mut note = session
        .current()
        .core
        .street_notes
        .iter()
        .find(|n| n.pk_id == note_pk)
        .expect("allocated note")
        .clone();
    note.note = "Carriageway resurfaced".into();
    session.stage(StagedRecord::Note(note)).expect("stage note");
    session
        .home_click(HomeAction::Save, &Approve, &mut NeverAsked)
        .expect("commit note");

    let esu_pk = opened(
        session
            .select(EditorCategory::Esu, Selection::New, None)
            .expect("open esu editor"),
    );
    let mut esu = session
        .current()
        .core
        .esus
        .iter()
        .find(|e| e.pk_id == esu_pk)
        .expect("allocated esu")
        .clone();
    esu.wkt_geometry = "LINESTRING (20 0, 30 0)".into();
    session.stage(StagedRecord::Esu(esu)).expect("stage esu");
    session
        .home_click(HomeAction::Save, &Approve, &mut NeverAsked)
        .expect("commit esu");

    assert!(session.is_dirty());
    assert_eq!(
        session.current().core.wkt_geometry,
        "LINESTRING (0 0, 10 0, 20 0, 30 0)"
    );

    let mut persist = MockPersist::new();
    let mut cache = DescriptorCache::default();
    let outcome = session
        .save(&mut persist, &Approve, &mut NeverAsked, &mut cache)
        .expect("save");

    assert_eq!(outcome.usrn.value(), 12345);
    assert!(!session.is_dirty());
    assert!(!session.failed_validation());
    assert_eq!(persist.saves.len(), 1);
    let sent = &persist.saves[0];
    assert!(
        sent.core
            .street_notes
            .iter()
            .any(|n| n.change_type == Some(ChangeType::Insert))
    );

    let current = session.current();
    assert!(current.core.esus.iter().all(|e| e.pk_id.value() > 0));
    assert!(current.core.esus.iter().all(|e| e.esu_id.value() > 0));
    let note = current
        .core
        .street_notes
        .iter()
        .find(|n| n.note == "Carriageway resurfaced")
        .expect("note survived the echo");
    assert!(note.pk_id.value() > 0);
    assert_eq!(note.last_user.as_deref(), Some("kroberts"));
    assert_eq!(outcome.entry.esus.len(), 3);
    assert_eq!(
        cache.address(outcome.usrn),
        Some("HIGH STREET, KINGSWAY, EXTON")
    );
}

#[test]
fn a_drawn_unit_and_its_dedication_survive_the_save() {
    let mut session = seeded_session();

    let esu_pk = opened(
        session
            .select(EditorCategory::Esu, Selection::New, None)
            .expect("open esu editor"),
    );
    let mut esu = session
        .current()
        .core
        .esus
        .iter()
        .find(|e| e.pk_id == esu_pk)
        .expect("allocated esu")
        .clone();
    esu.wkt_geometry = "LINESTRING (20 0, 30 0)".into();
    session.stage(StagedRecord::Esu(esu)).expect("stage esu");
    session
        .home_click(HomeAction::Save, &Approve, &mut NeverAsked)
        .expect("commit esu");

    let parent_id = session
        .current()
        .core
        .esus
        .iter()
        .find(|e| e.pk_id == esu_pk)
        .expect("accepted esu")
        .esu_id;
    assert!(parent_id.value() < 0);

    let hd_pk = opened(
        session
            .select(
                EditorCategory::HighwayDedication,
                Selection::New,
                Some(parent_id),
            )
            .expect("open dedication editor"),
    );
    let parent = session.current().esu(parent_id).expect("parent unit");
    let hd = parent
        .highway_dedications
        .iter()
        .find(|h| h.pk_id == hd_pk)
        .expect("allocated dedication");
    assert!(hd.pk_id.value() < 0);
    assert_eq!(hd.esu_id, parent_id);
    assert_eq!(hd.seq_num, SeqNum::FIRST);
    assert_eq!(hd.highway_dedication_code, 2);
    assert_eq!(hd.change_type, Some(ChangeType::Insert));
    session
        .home_click(HomeAction::Save, &Approve, &mut NeverAsked)
        .expect("commit dedication");

    let mut persist = MockPersist::new();
    let mut cache = DescriptorCache::default();
    let outcome = session
        .save(&mut persist, &Approve, &mut NeverAsked, &mut cache)
        .expect("save");

    let unit = session
        .current()
        .core
        .esus
        .iter()
        .find(|e| e.wkt_geometry == "LINESTRING (20 0, 30 0)")
        .expect("drawn unit survived the echo");
    assert!(unit.pk_id.value() > 0);
    assert!(unit.esu_id.value() > 0);
    assert_eq!(unit.highway_dedications.len(), 1);
    let hd = &unit.highway_dedications[0];
    assert!(hd.pk_id.value() > 0);
    assert_eq!(hd.esu_id, unit.esu_id);
    assert_eq!(hd.seq_num, SeqNum::FIRST);
    assert_eq!(hd.change_type, None);
    assert_eq!(outcome.entry.esus.len(), 3);
}

#[test]
fn home_discard_drops_an_unaccepted_unit() {
    let mut session = seeded_session();
    let before = session.current().clone();

    let pk = opened(
        session
            .select(EditorCategory::Esu, Selection::New, None)
            .expect("open esu editor"),
    );
    let mut esu = session
        .current()
        .core
        .esus
        .iter()
        .find(|e| e.pk_id == pk)
        .expect("allocated esu")
        .clone();
    esu.wkt_geometry = "LINESTRING (20 0, 30 0)".into();
    session.stage(StagedRecord::Esu(esu)).expect("stage esu");
    assert_eq!(session.current().core.esus.len(), 3);

    let outcome = session
        .home_click(HomeAction::Discard, &Approve, &mut NeverAsked)
        .expect("discard");
    assert!(outcome.closed);
    assert!(session.open_editor().is_none());
    assert_eq!(*session.current(), before);
    assert!(!session.is_dirty());
}

#[test]
fn switching_editors_keeps_earlier_staged_work() {
    let mut session = seeded_session();

    let esu_pk = opened(
        session
            .select(EditorCategory::Esu, Selection::New, None)
            .expect("open esu editor"),
    );
    let mut esu = session
        .current()
        .core
        .esus
        .iter()
        .find(|e| e.pk_id == esu_pk)
        .expect("allocated esu")
        .clone();
    esu.wkt_geometry = "LINESTRING (20 0, 30 0)".into();
    session.stage(StagedRecord::Esu(esu)).expect("stage esu");

    // a second selection replaces the open editor, not the staged data
    let note_pk = opened(
        session
            .select(EditorCategory::Note, Selection::New, None)
            .expect("open note editor"),
    );
    let open = session.open_editor().expect("editor open");
    assert_eq!(open.category, EditorCategory::Note);
    assert_eq!(open.pk_id, note_pk);
    let staged = session
        .current()
        .core
        .esus
        .iter()
        .find(|e| e.pk_id == esu_pk)
        .expect("staged unit still present");
    assert_eq!(staged.wkt_geometry, "LINESTRING (20 0, 30 0)");

    // discarding the note editor leaves the unit alone
    session
        .home_click(HomeAction::Discard, &Approve, &mut NeverAsked)
        .expect("discard note");
    assert!(session.current().core.street_notes.is_empty());
    assert!(session.current().core.esus.iter().any(|e| e.pk_id == esu_pk));
}

#[test]
fn a_new_street_becomes_real_on_first_save() {
    let mut session = EditorSession::new_street(jurisdiction(), &config(), &lookup());
    assert!(session.current().is_unsaved());
    assert_eq!(session.current().core.change_type, Some(ChangeType::Insert));

    let pk = opened(
        session
            .select(EditorCategory::Descriptor, Selection::New, None)
            .expect("open descriptor editor"),
    );
    let mut descriptor = session
        .current()
        .core
        .street_descriptors
        .iter()
        .find(|d| d.pk_id == pk)
        .expect("allocated descriptor")
        .clone();
    assert_eq!(descriptor.locality.as_deref(), Some("KINGSWAY"));
    descriptor.street_descriptor = "MILL LANE".into();
    session
        .stage(StagedRecord::Descriptor(descriptor))
        .expect("stage descriptor");
    session
        .home_click(HomeAction::Save, &Approve, &mut NeverAsked)
        .expect("commit descriptor");

    let mut persist = MockPersist::new();
    let mut cache = DescriptorCache::default();
    let outcome = session
        .save(&mut persist, &Approve, &mut NeverAsked, &mut cache)
        .expect("save");

    assert!(outcome.usrn.value() > 0);
    assert!(!session.current().is_unsaved());
    assert_eq!(session.current().core.usrn, outcome.usrn);
    assert_eq!(session.current().core.change_type, None);
    let descriptor = &session.current().core.street_descriptors[0];
    assert!(descriptor.pk_id.value() > 0);
    assert_eq!(descriptor.usrn, outcome.usrn);
    assert_eq!(
        cache.address(outcome.usrn),
        Some("MILL LANE, KINGSWAY, EXTON")
    );
    assert!(!session.is_dirty());
}

#[test]
fn rejected_saves_keep_the_draft_for_correction() {
    let mut session = seeded_session();
    let pk = opened(
        session
            .select(EditorCategory::Note, Selection::New, None)
            .expect("open note editor"),
    );
    let mut note = session
        .current()
        .core
        .street_notes
        .iter()
        .find(|n| n.pk_id == pk)
        .expect("allocated note")
        .clone();
    note.note = "Needs checking".into();
    session.stage(StagedRecord::Note(note)).expect("stage note");
    session
        .home_click(HomeAction::Save, &Approve, &mut NeverAsked)
        .expect("commit note");

    let body = r#"{"errors":{"note":[{"field":"note","message":"free text too long"}]}}"#;
    let mut persist = MockPersist::failing(400, body);
    let mut cache = DescriptorCache::default();
    let err = session
        .save(&mut persist, &Approve, &mut NeverAsked, &mut cache)
        .expect_err("save should fail");
    match err {
        SaveError::Transport(TransportError::FieldErrors { errors }) => {
            let notes = errors.get(&EditorCategory::Note).expect("note errors");
            assert_eq!(notes[0].message, "free text too long");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(session.failed_validation());
    assert!(session.is_dirty());
    assert!(cache.address(Usrn::new(12345).unwrap()).is_none());

    // the draft survives and a corrected retry goes through
    persist.clear_failure();
    let outcome = session
        .save(&mut persist, &Approve, &mut NeverAsked, &mut cache)
        .expect("retry");
    assert!(!session.failed_validation());
    assert!(!session.is_dirty());
    assert_eq!(persist.saves.len(), 2);
    assert_eq!(outcome.usrn.value(), 12345);
}

#[test]
fn expired_sessions_surface_as_transport_errors() {
    let mut session = seeded_session();
    let mut persist = MockPersist::failing(401, "");
    let mut cache = DescriptorCache::default();
    let err = session
        .save(&mut persist, &Approve, &mut NeverAsked, &mut cache)
        .expect_err("save should fail");
    match err {
        SaveError::Transport(err) => {
            assert!(matches!(err, TransportError::SessionExpired));
            assert!(!err.is_retryable());
        }
        other => panic!("unexpected error: {other}"),
    }
    // an auth failure is not a validation failure
    assert!(!session.failed_validation());
}

#[test]
fn client_validation_stops_before_transport() {
    let mut session = seeded_session();
    let reject = Reject {
        category: EditorCategory::Descriptor,
        field: "streetDescriptor",
        message: "descriptor is required",
    };
    let mut persist = MockPersist::new();
    let mut cache = DescriptorCache::default();
    let err = session
        .save(&mut persist, &reject, &mut NeverAsked, &mut cache)
        .expect_err("validation should fail");
    match err {
        SaveError::Validation(outcome) => {
            assert!(!outcome.valid);
            assert!(outcome.errors.contains_key(&EditorCategory::Descriptor));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(persist.saves.is_empty());
    assert!(session.failed_validation());
}

#[test]
fn save_prompts_when_an_editor_holds_changes() {
    let mut session = seeded_session();
    let pk = opened(
        session
            .select(EditorCategory::Note, Selection::New, None)
            .expect("open note editor"),
    );
    let mut note = session
        .current()
        .core
        .street_notes
        .iter()
        .find(|n| n.pk_id == pk)
        .expect("allocated note")
        .clone();
    note.note = "Half-finished".into();
    session.stage(StagedRecord::Note(note)).expect("stage note");

    // cancel: nothing saved, editor still open
    let mut persist = MockPersist::new();
    let mut cache = DescriptorCache::default();
    let mut cancel = Scripted::new(&[ConfirmDecision::Cancel]);
    let err = session
        .save(&mut persist, &Approve, &mut cancel, &mut cache)
        .expect_err("cancelled");
    assert!(matches!(err, SaveError::Cancelled));
    assert!(persist.saves.is_empty());
    assert!(session.open_editor().is_some());

    // discard: the half-finished note is dropped, the save proceeds
    let mut discard = Scripted::new(&[ConfirmDecision::Discard]);
    session
        .save(&mut persist, &Approve, &mut discard, &mut cache)
        .expect("save");
    assert!(session.open_editor().is_none());
    assert!(session.current().core.street_notes.is_empty());
    assert_eq!(persist.saves.len(), 1);
}

#[test]
fn deleting_a_street_clears_the_cache() {
    let mut session = seeded_session();
    let mut persist = MockPersist::new();
    let mut cache = DescriptorCache::default();
    session
        .save(&mut persist, &Approve, &mut NeverAsked, &mut cache)
        .expect("save");
    let usrn = Usrn::new(12345).unwrap();
    assert!(cache.address(usrn).is_some());

    let deleted = session
        .delete_street(&mut persist, &mut cache)
        .expect("delete");
    assert!(deleted);
    assert!(cache.address(usrn).is_none());
    assert_eq!(persist.deletes, vec![usrn]);
}

#[test]
fn renaming_a_street_moves_its_cache_entry() {
    let mut session = seeded_session();
    let mut persist = MockPersist::new();
    let mut cache = DescriptorCache::default();
    session
        .save(&mut persist, &Approve, &mut NeverAsked, &mut cache)
        .expect("save");

    let from = Usrn::new(12345).unwrap();
    let to = Usrn::new(67890).unwrap();
    let renamed = session
        .rename_usrn(to, &mut persist, &mut cache)
        .expect("rename");
    assert_eq!(renamed, to);
    assert_eq!(session.current().core.usrn, to);
    assert!(
        session
            .current()
            .core
            .street_descriptors
            .iter()
            .all(|d| d.usrn == to)
    );
    assert!(cache.address(from).is_none());
    assert_eq!(cache.address(to), Some("HIGH STREET, KINGSWAY, EXTON"));
    assert!(!session.is_dirty());
}
