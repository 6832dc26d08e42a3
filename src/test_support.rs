//! Shared in-memory catalog used by the tests.
//!
//! | media | rating | description | relations |
//! |---|---|---|---|
//! | m1 | 3 (file says 1) | Beach day | Album 2, Tag 2 |
//! | m2 | 5 (file) | An evening | Album 4, Tag 1, Person 1 (located) |
//! | m3 | - | - | Album 1 |
//! | m4 | 3 (file) | - | |
//! | m5 | - (unprocessed) | Banana | Person 2 |
//! | m6 | - (newer file has none) | Mountain | Album 3 |
//! | m7 | 5, deleted | | |
//! | m8 | 5, other catalog | | |
//!
//! Album 1 > Album 2 > Album 3 and Tag 1 > Tag 2 are hierarchies.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};

use crate::db::{Database, Location, MediaViewRow, Metadata, NewFile};
use crate::query::RelationKind;

pub struct Fixture {
    pub db: Database,
    pub user: String,
    pub reader: String,
    pub catalog: String,
    pub other_catalog: String,
    pub album1: String,
    pub album2: String,
    pub album3: String,
    pub album4: String,
    pub tag1: String,
    pub tag2: String,
    pub person1: String,
    pub person2: String,
    media: BTreeMap<&'static str, String>,
}

fn at(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

fn utc(s: &str) -> DateTime<Utc> {
    at(s).with_timezone(&Utc)
}

fn file(name: &str, metadata: Metadata) -> NewFile {
    NewFile {
        file_name: name.to_string(),
        file_size: 1024,
        width: 4000,
        height: 3000,
        mimetype: "image/jpeg".to_string(),
        metadata,
        ..Default::default()
    }
}

impl Fixture {
    pub fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let user = "owner@example.com".to_string();
        let reader = "reader@example.com".to_string();
        db.create_user(&user, "Owner").unwrap();
        db.create_user(&reader, "Reader").unwrap();

        let catalog = db.create_catalog("Family").unwrap();
        let other_catalog = db.create_catalog("Work").unwrap();
        db.grant(&user, &catalog, true).unwrap();
        db.grant(&user, &other_catalog, true).unwrap();
        db.grant(&reader, &catalog, false).unwrap();

        let album1 = db.create_album(&catalog, "Album 1", None).unwrap().id;
        let album2 = db.create_album(&catalog, "Album 2", Some(&album1)).unwrap().id;
        let album3 = db.create_album(&catalog, "Album 3", Some(&album2)).unwrap().id;
        let album4 = db.create_album(&catalog, "Album 4", None).unwrap().id;
        let tag1 = db.create_tag(&catalog, "Tag 1", None).unwrap().id;
        let tag2 = db.create_tag(&catalog, "Tag 2", Some(&tag1)).unwrap().id;
        let person1 = db.create_person(&catalog, "Person 1").unwrap().id;
        let person2 = db.create_person(&catalog, "Person 2").unwrap().id;

        let mut media = BTreeMap::new();

        let m1 = db
            .create_media(
                &catalog,
                &Metadata {
                    rating: Some(3),
                    description: Some("Beach day".into()),
                    taken: Some(at("2020-06-01T12:00:00+02:00")),
                    ..Default::default()
                },
            )
            .unwrap();
        let m1_file = Metadata {
            rating: Some(1),
            taken: Some(at("2019-01-01T00:00:00Z")),
            taken_zone: Some("UTC".into()),
            ..Default::default()
        };
        db.add_media_file(&m1, &file("m1.jpg", m1_file), utc("2020-06-02T00:00:00Z"))
            .unwrap();
        media.insert("m1", m1);

        let m2 = db
            .create_media(
                &catalog,
                &Metadata {
                    description: Some("An evening".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let m2_file = Metadata {
            rating: Some(5),
            taken: Some(at("2022-08-15T09:00:00Z")),
            ..Default::default()
        };
        db.add_media_file(&m2, &file("m2.jpg", m2_file), utc("2022-08-16T00:00:00Z"))
            .unwrap();
        media.insert("m2", m2);

        // Two versions uploaded at the same moment.
        let m3 = db.create_media(&catalog, &Metadata::default()).unwrap();
        for title in ["First", "Second"] {
            let metadata = Metadata {
                title: Some(title.into()),
                ..Default::default()
            };
            db.add_media_file(&m3, &file("m3.jpg", metadata), utc("2021-05-01T00:00:00Z"))
                .unwrap();
        }
        media.insert("m3", m3);

        // Zone override without a taken override.
        let m4 = db
            .create_media(
                &catalog,
                &Metadata {
                    taken_zone: Some("+09:00".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let m4_file = Metadata {
            rating: Some(3),
            taken: Some(at("2021-03-04T05:06:07Z")),
            taken_zone: Some("-05:00".into()),
            ..Default::default()
        };
        db.add_media_file(&m4, &file("m4.jpg", m4_file), utc("2021-03-05T00:00:00Z"))
            .unwrap();
        media.insert("m4", m4);

        let m5 = db
            .create_media(
                &catalog,
                &Metadata {
                    description: Some("Banana".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        media.insert("m5", m5);

        let m6 = db
            .create_media(
                &catalog,
                &Metadata {
                    description: Some("Mountain".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let rated = Metadata {
            rating: Some(4),
            ..Default::default()
        };
        db.add_media_file(&m6, &file("m6.jpg", rated), utc("2021-01-01T00:00:00Z"))
            .unwrap();
        db.add_media_file(&m6, &file("m6.jpg", Metadata::default()), utc("2021-02-01T00:00:00Z"))
            .unwrap();
        media.insert("m6", m6);

        let five = Metadata {
            rating: Some(5),
            ..Default::default()
        };
        let m7 = db.create_media(&catalog, &five).unwrap();
        db.delete_media(&m7).unwrap();
        media.insert("m7", m7);

        let m8 = db.create_media(&other_catalog, &five).unwrap();
        media.insert("m8", m8);

        let link = |kind, media_name: &str, entity: &str| {
            db.add_relations(kind, &catalog, &[media[media_name].as_str()], &[entity])
                .unwrap();
        };
        link(RelationKind::Album, "m3", &album1);
        link(RelationKind::Album, "m1", &album2);
        link(RelationKind::Album, "m6", &album3);
        link(RelationKind::Album, "m2", &album4);
        link(RelationKind::Tag, "m2", &tag1);
        link(RelationKind::Tag, "m1", &tag2);
        link(RelationKind::Person, "m2", &person1);
        link(RelationKind::Person, "m5", &person2);

        let face = Location {
            left: 0.25,
            right: 0.5,
            top: 0.1,
            bottom: 0.4,
        };
        db.set_person_location(&media["m2"], &person1, Some(&face))
            .unwrap();

        Fixture {
            db,
            user,
            reader,
            catalog,
            other_catalog,
            album1,
            album2,
            album3,
            album4,
            tag1,
            tag2,
            person1,
            person2,
            media,
        }
    }

    /// Id of a fixture media item by name.
    pub fn media(&self, name: &str) -> &str {
        match self.media.get(name) {
            Some(id) => id,
            None => panic!("no fixture media named {name}"),
        }
    }

    /// Sorted fixture names of the given rows.
    pub fn names(&self, rows: &[MediaViewRow]) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = rows
            .iter()
            .map(|row| {
                self.media
                    .iter()
                    .find(|(_, id)| **id == row.id)
                    .map(|(name, _)| *name)
                    .unwrap_or_else(|| panic!("unknown media {}", row.id))
            })
            .collect();
        names.sort();
        names
    }
}
