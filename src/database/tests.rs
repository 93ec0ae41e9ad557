// Edge-case tests for episode and show-note storage
// Run with: cargo test --package podnotes --lib database::tests

#[cfg(test)]
mod storage_tests {
    use crate::database::{Database, NewEpisode, NewShowNote};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn setup_test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, temp_dir)
    }

    fn episode_fixture(guid: &str, title: &str, day: u32) -> NewEpisode {
        NewEpisode {
            guid: guid.to_string(),
            number: None,
            title: title.to_string(),
            description: "<h2>Links</h2>stuff".to_string(),
            audio_url: format!("https://pod.example/{}.mp3", guid),
            publication_date: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
            duration: "1:02:03".to_string(),
            url: format!("https://pod.example/ep/{}", guid),
            tags: vec!["tech".to_string()],
        }
    }

    // =========================================================================
    // Episode creation
    // =========================================================================

    #[test]
    fn test_create_episode_basic() {
        let (db, _temp) = setup_test_db();
        let ep = db.create_episode(&episode_fixture("g1", "Ep one", 1)).unwrap();
        assert!(ep.id > 0);
        assert_eq!(ep.guid, "g1");
        assert_eq!(ep.number, None);

        let all = db.get_episodes().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Ep one");
        assert_eq!(all[0].tags, vec!["tech".to_string()]);
    }

    #[test]
    fn test_create_episode_duplicate_guid_fails() {
        let (db, _temp) = setup_test_db();
        db.create_episode(&episode_fixture("g1", "Ep one", 1)).unwrap();

        let result = db.create_episode(&episode_fixture("g1", "Ep one again", 2));
        assert!(result.is_err());
        assert_eq!(db.episode_count().unwrap(), 1);
    }

    #[test]
    fn test_roundtrip_preserves_date_and_unicode() {
        let (db, _temp) = setup_test_db();
        let fixture = episode_fixture("g1", "#100 テスト 🎙", 5);
        let created = db.create_episode(&fixture).unwrap();

        let loaded = db.get_episode_by_id(created.id).unwrap().unwrap();
        assert_eq!(loaded.title, "#100 テスト 🎙");
        assert_eq!(loaded.publication_date, fixture.publication_date);
        assert_eq!(loaded.duration, "1:02:03");
    }

    #[test]
    fn test_get_episode_by_guid_and_number() {
        let (db, _temp) = setup_test_db();
        let mut fixture = episode_fixture("g1", "123. Ep", 1);
        fixture.number = Some("123".to_string());
        db.create_episode(&fixture).unwrap();

        assert!(db.get_episode_by_guid("g1").unwrap().is_some());
        assert!(db.get_episode_by_guid("nope").unwrap().is_none());
        assert!(db.get_episode_by_number("123").unwrap().is_some());
        assert!(db.get_episode_by_number("999").unwrap().is_none());
    }

    #[test]
    fn test_update_episode_number() {
        let (db, _temp) = setup_test_db();
        let ep = db.create_episode(&episode_fixture("g1", "Ep", 1)).unwrap();

        assert_eq!(db.episodes_missing_number().unwrap().len(), 1);
        db.update_episode_number(ep.id, "42").unwrap();
        assert!(db.episodes_missing_number().unwrap().is_empty());

        let loaded = db.get_episode_by_id(ep.id).unwrap().unwrap();
        assert_eq!(loaded.number.as_deref(), Some("42"));
    }

    #[test]
    fn test_update_number_of_unknown_episode_fails() {
        let (db, _temp) = setup_test_db();
        assert!(db.update_episode_number(999, "1").is_err());
    }

    // =========================================================================
    // Show notes
    // =========================================================================

    #[test]
    fn test_show_notes_belong_to_episode_in_order() {
        let (db, _temp) = setup_test_db();
        let ep = db.create_episode(&episode_fixture("g1", "Ep", 1)).unwrap();
        let other = db.create_episode(&episode_fixture("g2", "Ep2", 2)).unwrap();

        for title in ["One", "Two", "Three"] {
            db.create_show_note(&NewShowNote {
                title: title.to_string(),
                content: String::new(),
                timestamp: None,
                episode_id: ep.id,
            })
            .unwrap();
        }
        db.create_show_note(&NewShowNote {
            title: "Elsewhere".to_string(),
            content: String::new(),
            timestamp: None,
            episode_id: other.id,
        })
        .unwrap();

        let notes = db.get_show_notes(ep.id).unwrap();
        let titles: Vec<_> = notes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
        assert_eq!(db.get_show_notes(other.id).unwrap().len(), 1);
    }

    #[test]
    fn test_show_note_timestamp_roundtrip() {
        let (db, _temp) = setup_test_db();
        let ep = db.create_episode(&episode_fixture("g1", "Ep", 1)).unwrap();
        let note = db
            .create_show_note(&NewShowNote {
                title: "Topic".to_string(),
                content: "at 0:12:34".to_string(),
                timestamp: Some("0:12:34".to_string()),
                episode_id: ep.id,
            })
            .unwrap();

        let loaded = &db.get_show_notes(ep.id).unwrap()[0];
        assert_eq!(loaded.id, note.id);
        assert_eq!(loaded.timestamp.as_deref(), Some("0:12:34"));
    }

    // =========================================================================
    // Ordering and pagination
    // =========================================================================

    #[test]
    fn test_latest_episodes_date_descending() {
        let (db, _temp) = setup_test_db();
        // insertion order deliberately not chronological
        for day in [3u32, 1, 4, 2] {
            db.create_episode(&episode_fixture(&format!("g{}", day), &format!("Ep {}", day), day))
                .unwrap();
        }

        let latest = db.latest_episodes(10, 0).unwrap();
        let titles: Vec<_> = latest.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Ep 4", "Ep 3", "Ep 2", "Ep 1"]);
    }

    #[test]
    fn test_latest_episodes_limit_offset() {
        let (db, _temp) = setup_test_db();
        for day in 1..=5u32 {
            db.create_episode(&episode_fixture(&format!("g{}", day), &format!("Ep {}", day), day))
                .unwrap();
        }

        let page = db.latest_episodes(2, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].title, "Ep 3");
        assert_eq!(page[1].title, "Ep 2");

        let beyond = db.latest_episodes(10, 50).unwrap();
        assert!(beyond.is_empty());
    }

    // =========================================================================
    // Store interchangeability
    // =========================================================================

    #[test]
    fn test_in_memory_store_same_contract() {
        let db = Database::open_in_memory().unwrap();
        let ep = db.create_episode(&episode_fixture("g1", "Ep", 1)).unwrap();
        db.create_show_note(&NewShowNote {
            title: "T".to_string(),
            content: String::new(),
            timestamp: None,
            episode_id: ep.id,
        })
        .unwrap();

        assert_eq!(db.episode_count().unwrap(), 1);
        assert_eq!(db.get_show_notes(ep.id).unwrap().len(), 1);
    }

    #[test]
    fn test_durable_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        {
            let db = Database::open(&db_path).unwrap();
            db.create_episode(&episode_fixture("g1", "Ep", 1)).unwrap();
        }

        let db = Database::open(&db_path).unwrap();
        assert_eq!(db.episode_count().unwrap(), 1);
        assert!(db.get_episode_by_guid("g1").unwrap().is_some());
    }
}
