//! Divide and merge flows over the public session API.

mod fixtures;

use time::macros::date;

use fixtures::persist::{Approve, MockPersist, NeverAsked};
use fixtures::streets::{opened, seeded_session};
use street_gazetteer::core::{
    ChangeType, EditorCategory, EsuClassification, EsuDirection, EsuId, PkId,
};
use street_gazetteer::lookup::DescriptorCache;
use street_gazetteer::session::{EsuOpError, HomeAction, Selection, StagedRecord};

#[test]
fn dividing_a_unit_replaces_it_with_two_connected_parts() {
    let mut session = seeded_session();
    let original = EsuId::new(100).unwrap();

    let outcome = session
        .divide_esu(original, "LINESTRING (0 0, 5 0)", "LINESTRING (5 0, 10 0)")
        .expect("divide");

    assert_eq!(outcome.retired, original);
    assert_eq!(outcome.entry.esus.len(), 3);
    let current = session.current();
    assert_eq!(
        current.core.wkt_geometry,
        "LINESTRING (0 0, 5 0, 10 0, 20 0)"
    );
    let retired = current.esu(original).expect("retired unit kept");
    assert_eq!(retired.change_type, Some(ChangeType::Delete));
    assert!(retired.esu_end_date.is_some());

    for part in outcome.parts {
        let esu = current.esu(part).expect("part");
        assert_eq!(esu.change_type, Some(ChangeType::Insert));
        assert!(esu.pk_id.value() < 0);
        // attributes and children come from the original
        assert_eq!(esu.esu_direction, EsuDirection::ONE_WAY);
        assert_eq!(esu.esu_classification, EsuClassification::RESTRICTED);
        assert_eq!(esu.highway_dedications.len(), 1);
        let hd = &esu.highway_dedications[0];
        assert_eq!(hd.highway_dedication_code, 2);
        assert_eq!(hd.hd_start_date, Some(date!(2021 - 03 - 15)));
        assert_eq!(hd.esu_id, esu.esu_id);
        assert!(hd.pk_id.value() < 0);
    }

    // the whole-road records follow the new footprint
    let interests = outcome.entry.asd.get(&61).expect("interest entries");
    assert_eq!(interests[0].wkt_geometry, current.core.wkt_geometry);
}

#[test]
fn merging_agreeing_units_inherits_attributes_and_children() {
    let mut session = seeded_session();
    let first = EsuId::new(100).unwrap();
    let second = EsuId::new(200).unwrap();

    let outcome = session
        .merge_esus(first, second, "LINESTRING (0 0, 10 0, 20 0)")
        .expect("merge");

    assert_eq!(outcome.retired, [first, second]);
    assert_eq!(outcome.entry.esus.len(), 1);
    let current = session.current();
    assert_eq!(current.core.wkt_geometry, "LINESTRING (0 0, 10 0, 20 0)");

    let merged = current.esu(outcome.merged).expect("merged unit");
    assert_eq!(merged.change_type, Some(ChangeType::Insert));
    assert_eq!(merged.esu_direction, EsuDirection::ONE_WAY);
    assert_eq!(merged.esu_classification, EsuClassification::RESTRICTED);
    assert_eq!(merged.highway_dedications.len(), 1);
    assert_eq!(merged.highway_dedications[0].highway_dedication_code, 2);

    for id in outcome.retired {
        let retired = current.esu(id).expect("retired unit kept");
        assert_eq!(retired.change_type, Some(ChangeType::Delete));
    }
}

#[test]
fn merging_divergent_units_starts_from_authority_defaults() {
    let mut session = seeded_session();

    // reclassify the second unit through its editor first
    opened(
        session
            .select(EditorCategory::Esu, Selection::Existing(PkId::new(2).unwrap()), None)
            .expect("open esu editor"),
    );
    let mut esu = session
        .current()
        .esu(EsuId::new(200).unwrap())
        .expect("second unit")
        .clone();
    esu.esu_classification = EsuClassification::ALL_VEHICLES;
    session.stage(StagedRecord::Esu(esu)).expect("stage esu");
    session
        .home_click(HomeAction::Save, &Approve, &mut NeverAsked)
        .expect("commit esu");

    let outcome = session
        .merge_esus(
            EsuId::new(100).unwrap(),
            EsuId::new(200).unwrap(),
            "LINESTRING (0 0, 10 0, 20 0)",
        )
        .expect("merge");

    let merged = session.current().esu(outcome.merged).expect("merged unit");
    assert_eq!(merged.esu_direction, EsuDirection::TWO_WAY);
    assert!(merged.highway_dedications.is_empty());
    assert_eq!(merged.change_type, Some(ChangeType::Insert));
    assert_eq!(merged.wkt_geometry, "LINESTRING (0 0, 10 0, 20 0)");
}

#[test]
fn reshaping_dead_or_missing_units_is_refused() {
    let mut session = seeded_session();
    let before = session.current().clone();

    let missing = EsuId::new(999).unwrap();
    let err = session
        .divide_esu(missing, "LINESTRING (0 0, 5 0)", "LINESTRING (5 0, 10 0)")
        .expect_err("unknown unit");
    assert!(matches!(err, EsuOpError::UnknownEsu(id) if id == missing));
    assert_eq!(*session.current(), before);

    session
        .delete_record(EditorCategory::Esu, PkId::new(1).unwrap())
        .expect("retire the first unit");
    let dead = EsuId::new(100).unwrap();
    let err = session
        .divide_esu(dead, "LINESTRING (0 0, 5 0)", "LINESTRING (5 0, 10 0)")
        .expect_err("dead unit");
    assert!(matches!(err, EsuOpError::NotLive(id) if id == dead));

    let err = session
        .merge_esus(dead, EsuId::new(200).unwrap(), "LINESTRING (0 0, 10 0, 20 0)")
        .expect_err("dead unit");
    assert!(matches!(err, EsuOpError::NotLive(id) if id == dead));
}

#[test]
fn division_survives_the_save_round_trip() {
    let mut session = seeded_session();
    session
        .divide_esu(
            EsuId::new(100).unwrap(),
            "LINESTRING (0 0, 5 0)",
            "LINESTRING (5 0, 10 0)",
        )
        .expect("divide");

    let mut persist = MockPersist::new();
    let mut cache = DescriptorCache::default();
    let outcome = session
        .save(&mut persist, &Approve, &mut NeverAsked, &mut cache)
        .expect("save");

    // the payload carried the retirement, the echo dropped it
    let sent = &persist.saves[0];
    assert_eq!(sent.core.esus.len(), 4);
    assert!(
        sent.core
            .esus
            .iter()
            .any(|e| e.change_type == Some(ChangeType::Delete))
    );

    let current = session.current();
    assert_eq!(current.core.esus.len(), 3);
    assert!(current.core.esus.iter().all(|e| e.pk_id.value() > 0));
    assert!(current.core.esus.iter().all(|e| e.esu_id.value() > 0));
    assert_eq!(
        current.core.wkt_geometry,
        "LINESTRING (0 0, 5 0, 10 0, 20 0)"
    );
    for esu in current.core.esus.iter().filter(|e| e.esu_id.value() != 200) {
        assert_eq!(esu.highway_dedications[0].esu_id, esu.esu_id);
    }
    assert_eq!(outcome.entry.esus.len(), 3);
    assert!(!session.is_dirty());
}
