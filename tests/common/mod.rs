#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use cynosure::catalog::Catalog;
use cynosure::config::Config;
use cynosure::portal::Portal;
use cynosure::store::{MemoryBackend, Store};

pub const CATALOG_JSON: &str = r#"{
  "events": [
    {
      "name": "Solo Singing",
      "category": "Music",
      "age_category": "Category I, II",
      "date": "FRIDAY",
      "time": "10:00 AM to 12:00 PM",
      "venue": "Main Hall",
      "teacher_in_charge": "Ms. Rao",
      "brochure_block": "Age Category: Category I: 1st to 4th Category II: 5th to 8th Duration: 3 min"
    },
    {
      "name": "Group Dance",
      "category": "Dance",
      "date": "SATURDAY",
      "time": "2 pm",
      "venue": "Auditorium",
      "teacher_in_charge": "Mr. Das",
      "brochure_block": "Girls team of 6 and Boys team of 6. Age Category: 9th to 12th"
    },
    {
      "name": "Quiz",
      "category": "Literary",
      "date_info_duty": "BOTH",
      "venue": "Library",
      "teacher_in_charge": "Mrs. Iyer"
    },
    {
      "name": "Poster Making",
      "category": "Art",
      "date": "TBA"
    }
  ]
}"#;

pub fn catalog() -> Catalog {
    Catalog::from_json(CATALOG_JSON).unwrap()
}

pub fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 9, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

pub fn memory_store() -> Store<MemoryBackend> {
    Store::new(MemoryBackend::new())
}

pub fn portal() -> Portal<MemoryBackend> {
    let mut config = Config::default();
    config.auth.admin_password = "letmein".into();
    Portal::new(config, catalog(), memory_store())
}
