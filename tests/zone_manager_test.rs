use chrono::NaiveDate;
use std::fs;
use std::thread;
use tempfile::tempdir;
use zonekeeper::ManagerError;
use zonekeeper::zone::{Record, RecordType, ZoneManager};

#[test]
fn test_create_has_single_soa_and_ns() {
    let dir = tempdir().unwrap();
    let manager = ZoneManager::new(dir.path());

    manager.create("example.com").unwrap();
    assert!(manager.exists("example.com"));

    let raw = fs::read_to_string(dir.path().join("db.example.com")).unwrap();
    assert_eq!(raw.matches(" IN SOA ").count(), 1);
    assert_eq!(raw.matches(" IN NS ").count(), 1);
    assert!(raw.contains("$ORIGIN example.com.\n"));
    assert!(raw.contains("@ IN NS ns1.example.com.\n"));

    let zone = manager.read("example.com").unwrap();
    assert!(zone.soa.is_some());
    // Apex NS is not part of the editable set
    assert!(zone.records.is_empty());

    assert!(matches!(
        manager.create("example.com"),
        Err(ManagerError::AlreadyExists(_))
    ));
}

#[test]
fn test_add_record_then_read() {
    let dir = tempdir().unwrap();
    let manager = ZoneManager::new(dir.path());
    manager.create("example.com").unwrap();
    let before = manager.read("example.com").unwrap().soa.unwrap().serial;

    manager
        .add_record(
            "example.com",
            &Record::new("app", RecordType::A, "10.0.0.1"),
        )
        .unwrap();

    let zone = manager.read("example.com").unwrap();
    let app: Vec<&Record> = zone.records.iter().filter(|r| r.name == "app").collect();
    assert_eq!(app.len(), 1);
    assert_eq!(app[0].rtype, RecordType::A);
    assert_eq!(app[0].value, "10.0.0.1");
    assert_eq!(app[0].ttl, 3600);

    let after = zone.soa.unwrap().serial;
    assert!(after > before, "serial {} should be above {}", after, before);
    assert!(zone.raw.ends_with("app IN A 10.0.0.1\n"));
}

#[test]
fn test_add_mx_and_txt_records() {
    let dir = tempdir().unwrap();
    let manager = ZoneManager::new(dir.path());
    manager.create("example.com").unwrap();

    manager
        .add_record(
            "example.com",
            &Record::new("@", RecordType::Mx, "mail.example.com.").with_priority(10),
        )
        .unwrap();
    manager
        .add_record(
            "example.com",
            &Record::new("@", RecordType::Txt, "v=spf1 mx -all").with_ttl(300),
        )
        .unwrap();

    let zone = manager.read("example.com").unwrap();
    assert_eq!(zone.records.len(), 2);
    assert_eq!(zone.records[0].priority, 10);
    assert_eq!(zone.records[1].value, "v=spf1 mx -all");
    assert_eq!(zone.records[1].ttl, 300);
}

#[test]
fn test_add_invalid_record_leaves_file() {
    let dir = tempdir().unwrap();
    let manager = ZoneManager::new(dir.path());
    manager.create("example.com").unwrap();
    let before = manager.read_raw("example.com").unwrap();

    for record in [
        Record::new("app", RecordType::A, "not-an-address"),
        Record::new("@", RecordType::Ns, "ns2.example.com."),
        Record::new("v6", RecordType::Aaaa, "10.0.0.1"),
    ] {
        assert!(matches!(
            manager.add_record("example.com", &record),
            Err(ManagerError::Validation(_))
        ));
    }
    assert_eq!(manager.read_raw("example.com").unwrap(), before);
}

#[test]
fn test_remove_record() {
    let dir = tempdir().unwrap();
    let manager = ZoneManager::new(dir.path());
    manager.create("example.com").unwrap();
    manager
        .add_record(
            "example.com",
            &Record::new("www", RecordType::Cname, "app.example.com."),
        )
        .unwrap();

    // Relative and fully qualified targets both match
    manager
        .remove_record("example.com", "www", RecordType::Cname, "app")
        .unwrap();
    assert!(manager.read("example.com").unwrap().records.is_empty());
}

#[test]
fn test_remove_missing_record_is_not_found() {
    let dir = tempdir().unwrap();
    let manager = ZoneManager::new(dir.path());
    manager.create("example.com").unwrap();
    let before = manager.read_raw("example.com").unwrap();

    let err = manager
        .remove_record("example.com", "ghost", RecordType::A, "10.0.0.9")
        .unwrap_err();
    assert!(matches!(err, ManagerError::NotFound(_)));
    assert_eq!(manager.read_raw("example.com").unwrap(), before);
}

#[test]
fn test_apex_ns_cannot_be_removed() {
    let dir = tempdir().unwrap();
    let manager = ZoneManager::new(dir.path());
    manager.create("example.com").unwrap();
    let before = manager.read_raw("example.com").unwrap();

    let err = manager
        .remove_record("example.com", "@", RecordType::Ns, "ns1.example.com.")
        .unwrap_err();
    assert!(matches!(err, ManagerError::Validation(_)));
    assert_eq!(manager.read_raw("example.com").unwrap(), before);
    assert_eq!(before.matches(" IN NS ").count(), 1);
}

fn fixed_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

#[test]
fn test_concurrent_adds_are_not_lost() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 10;

    let dir = tempdir().unwrap();
    let manager = ZoneManager::new(dir.path()).with_clock(fixed_day);
    manager.create("example.com").unwrap();

    thread::scope(|s| {
        for t in 0..THREADS {
            let manager = &manager;
            s.spawn(move || {
                for i in 0..PER_THREAD {
                    let record = Record::new(
                        format!("host-{}-{}", t, i),
                        RecordType::A,
                        format!("10.0.{}.{}", t, i),
                    );
                    manager.add_record("example.com", &record).unwrap();
                }
            });
        }
    });

    let zone = manager.read("example.com").unwrap();
    assert_eq!(zone.records.len(), THREADS * PER_THREAD);
    // One bump per add on top of the initial 01
    assert_eq!(
        zone.soa.unwrap().serial,
        2024010101 + (THREADS * PER_THREAD) as u32
    );
}

#[test]
fn test_save_validates_and_write_does_not() {
    let dir = tempdir().unwrap();
    let manager = ZoneManager::new(dir.path());

    let no_soa = "$ORIGIN example.com.\nwww IN A 10.0.0.1\n";
    assert!(matches!(
        manager.save("example.com", no_soa),
        Err(ManagerError::Validation(_))
    ));
    assert!(!manager.exists("example.com"));

    manager.write("example.com", no_soa).unwrap();
    let zone = manager.read("example.com").unwrap();
    assert!(zone.soa.is_none());
    assert_eq!(zone.records.len(), 1);
}

#[test]
fn test_write_normalizes_line_endings() {
    let dir = tempdir().unwrap();
    let manager = ZoneManager::new(dir.path());

    manager
        .write("example.com", "www IN A 10.0.0.1\r\nftp IN A 10.0.0.2")
        .unwrap();
    assert_eq!(
        manager.read_raw("example.com").unwrap(),
        "www IN A 10.0.0.1\nftp IN A 10.0.0.2\n"
    );
}

#[test]
fn test_read_and_delete_missing() {
    let dir = tempdir().unwrap();
    let manager = ZoneManager::new(dir.path());

    assert!(manager.read("example.com").unwrap_err().is_not_found());
    assert!(matches!(
        manager.delete("example.com"),
        Err(ManagerError::NotFound(_))
    ));

    manager.create("example.com").unwrap();
    manager.delete("example.com").unwrap();
    assert!(!manager.exists("example.com"));
}

#[test]
fn test_invalid_domains_rejected_everywhere() {
    let dir = tempdir().unwrap();
    let manager = ZoneManager::new(dir.path());

    for domain in ["../etc/passwd", "a/b", "", "-x.com"] {
        assert!(matches!(
            manager.read(domain),
            Err(ManagerError::InvalidDomain(_))
        ));
        assert!(matches!(
            manager.create(domain),
            Err(ManagerError::InvalidDomain(_))
        ));
        assert!(matches!(
            manager.validate(domain, "x"),
            Err(ManagerError::InvalidDomain(_))
        ));
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
