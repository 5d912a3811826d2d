#![allow(dead_code)]

use time::macros::date;

use street_gazetteer::config::GazetteerConfig;
use street_gazetteer::core::{
    AsdCommon, AssignUnassign, ChangeType, Esu, EsuClassification, EsuDirection, EsuId,
    HighwayDedication, Interest, Jurisdiction, Language, PkId, RecordType, SeqNum, Street,
    StreetCore, StreetData, StreetDescriptor, StreetState, Tolerance, Usrn,
};
use street_gazetteer::lookup::{DescriptorRefs, StaticLookup};
use street_gazetteer::session::{EditorSession, SelectOutcome};

pub fn lookup() -> StaticLookup {
    StaticLookup::default()
        .with_locality(700, Language::Eng, "KINGSWAY")
        .with_town(800, Language::Eng, "EXTON")
        .with_admin_area(900, Language::Eng, "EXSHIRE")
        .with_defaults(DescriptorRefs {
            loc_ref: Some(700),
            town_ref: Some(800),
            admin_area_ref: Some(900),
            island_ref: None,
        })
}

pub fn config() -> GazetteerConfig {
    GazetteerConfig {
        authority_code: 1110,
        ..GazetteerConfig::default()
    }
}

pub fn jurisdiction() -> Jurisdiction {
    Jurisdiction::geoplace(true)
}

pub fn make_descriptor(pk: i64, usrn: Usrn, text: &str) -> StreetDescriptor {
    StreetDescriptor {
        pk_id: PkId::new(pk).unwrap(),
        usrn,
        street_descriptor: text.into(),
        loc_ref: Some(700),
        locality: Some("KINGSWAY".into()),
        town_ref: Some(800),
        town: Some("EXTON".into()),
        admin_area_ref: Some(900),
        administrative_area: Some("EXSHIRE".into()),
        island_ref: None,
        island: None,
        language: Language::Eng,
        change_type: None,
    }
}

pub fn make_esu(pk: i64, esu: i64, wkt: &str) -> Esu {
    Esu {
        pk_id: PkId::new(pk).unwrap(),
        esu_id: EsuId::new(esu).unwrap(),
        wkt_geometry: wkt.into(),
        esu_start_date: Some(date!(2019 - 04 - 01)),
        esu_end_date: None,
        esu_direction: EsuDirection::ONE_WAY,
        esu_tolerance: Tolerance::default(),
        esu_classification: EsuClassification::RESTRICTED,
        assign_unassign: AssignUnassign::NORMAL,
        change_type: None,
        highway_dedications: Vec::new(),
        one_way_exemptions: Vec::new(),
    }
}

pub fn make_dedication(pk: i64, esu: i64, usrn: Usrn, code: u8) -> HighwayDedication {
    HighwayDedication {
        pk_id: PkId::new(pk).unwrap(),
        esu_id: EsuId::new(esu).unwrap(),
        usrn,
        seq_num: SeqNum::FIRST,
        highway_dedication_code: code,
        hd_start_date: Some(date!(2021 - 03 - 15)),
        hd_end_date: None,
        change_type: None,
    }
}

pub fn make_interest(pk: i64, usrn: Usrn) -> Interest {
    let mut common = AsdCommon::unsaved(
        PkId::new(pk).unwrap(),
        usrn,
        SeqNum::FIRST,
        String::new(),
        date!(2022 - 01 - 01),
    );
    common.change_type = None;
    Interest {
        common,
        street_status: 1,
        interest_type: 1,
        district_ref_authority: 1110,
        swa_org_ref_authority: 1110,
    }
}

/// A persisted two-unit street with an address, a dedication on each
/// unit and one whole-road interest.
pub fn seeded_street() -> Street {
    let usrn = Usrn::new(12345).unwrap();
    let mut first = make_esu(1, 100, "LINESTRING (0 0, 10 0)");
    first.highway_dedications.push(make_dedication(5, 100, usrn, 2));
    let mut second = make_esu(2, 200, "LINESTRING (10 0, 20 0)");
    second.highway_dedications.push(make_dedication(6, 200, usrn, 2));

    let mut street = Street {
        core: StreetCore {
            usrn,
            swa_org_ref_naming: 1110,
            record_type: RecordType::OFFICIAL,
            state: StreetState::OPEN,
            state_date: None,
            street_tolerance: Tolerance::default(),
            street_start_x: None,
            street_start_y: None,
            street_end_x: None,
            street_end_y: None,
            street_start_date: Some(date!(2019 - 04 - 01)),
            street_end_date: None,
            wkt_geometry: String::new(),
            change_type: None,
            street_descriptors: vec![make_descriptor(11, usrn, "HIGH STREET")],
            esus: vec![first, second],
            street_notes: Vec::new(),
        },
        data: StreetData::empty_for(&jurisdiction(), RecordType::OFFICIAL),
    };
    if let Some(interests) = street.interests_mut() {
        interests.push(make_interest(60, usrn));
    }
    street
}

pub fn seeded_session() -> EditorSession {
    street_gazetteer::telemetry::init_for_tests();
    EditorSession::for_street(seeded_street(), jurisdiction(), &config(), &lookup())
        .expect("seed session")
}

pub fn opened(outcome: SelectOutcome) -> PkId {
    match outcome {
        SelectOutcome::Opened(focus) => focus.id,
        SelectOutcome::Closed => panic!("expected an editor to open"),
    }
}
