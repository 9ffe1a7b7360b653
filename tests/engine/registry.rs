//! Registry: uniqueness, release, reset, save_all

use crate::common::*;
use std::sync::Arc;

#[test]
fn second_create_fails_and_first_is_kept() {
    let stash = MemoryStash::new();
    let first = stash.registry.collection("notes").unwrap();
    let doc = text_doc("original", &[1.0]);
    let id = doc.id();
    first.add_document(doc, false);

    assert!(matches!(
        stash.registry.collection("notes"),
        Err(Error::CollectionAlreadyExists(ref n)) if n == "notes"
    ));

    let looked_up = stash.registry.get_collection("notes").unwrap();
    assert!(Arc::ptr_eq(&first, &looked_up));
    assert!(looked_up.contains(&id));
    assert_eq!(stash.registry.len(), 1);
}

#[test]
fn collection_loads_existing_state() {
    let stash = DiskStash::new();
    let doc = text_doc("persisted", &[0.6, 0.8]);
    {
        let coll = stash.registry.collection("kept").unwrap();
        coll.add_document(doc.clone(), false);
        stash.registry.save_all().unwrap();
    }
    assert!(stash.registry.release_collection("kept"));

    let again = stash.registry.collection("kept").unwrap();
    assert_eq!(*again.get_document(&doc.id()).unwrap(), doc);
}

#[test]
fn release_does_not_force_a_save() {
    let stash = MemoryStash::new();
    let coll = stash.registry.collection("transient").unwrap();
    coll.add_document(text_doc("unsaved", &[1.0]), false);

    assert!(stash.registry.release_collection("transient"));
    std::thread::sleep(SETTLE);
    assert_eq!(stash.writes("transient"), 0);

    // The released handle still works in memory
    assert_eq!(coll.len(), 1);
    assert!(matches!(coll.save_now(), Err(Error::CollectionClosed(_))));
}

#[test]
fn release_unknown_is_false() {
    let stash = MemoryStash::new();
    assert!(!stash.registry.release_collection("nobody"));
}

#[test]
fn reset_empties_collections_and_directory() {
    let stash = DiskStash::new();
    let names = ["alpha", "beta", "gamma"];
    let handles: Vec<_> = names
        .iter()
        .map(|name| {
            let coll = stash.registry.collection(name).unwrap();
            coll.add_document(text_doc(name, &[1.0, 0.5]), true);
            coll
        })
        .collect();
    assert_eq!(stash.registry.names(), names);

    stash.registry.reset();
    assert!(stash.registry.is_empty());
    assert!(stash.registry.names().is_empty());
    for coll in &handles {
        assert!(coll.is_empty());
        assert!(coll.is_closed());
    }

    // Empty state was persisted before close
    let restarted = stash.reopen();
    for name in names {
        assert!(restarted.collection(name).unwrap().is_empty());
    }
}

#[test]
fn save_all_writes_every_collection() {
    let stash = MemoryStash::with_delay(60_000);
    for name in ["a", "b", "c", "d"] {
        let coll = stash.registry.collection(name).unwrap();
        coll.add_document(text_doc(name, &[1.0]), false);
    }

    stash.registry.save_all().unwrap();
    assert_eq!(stash.store.total_writes(), 4);
    for name in ["a", "b", "c", "d"] {
        assert_eq!(stash.writes(name), 1);
    }
}

#[test]
fn open_dir_honors_config_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(stashdb::CONFIG_FILE_NAME),
        "save_delay_ms = 42\ncodec = \"identity\"\n",
    )
    .unwrap();

    let registry = Registry::open_dir(dir.path()).unwrap();
    assert_eq!(registry.config().save_delay_ms, 42);
    assert_eq!(registry.config().codec, "identity");

    let coll = registry.collection("cfg").unwrap();
    assert_eq!(coll.save_delay(), std::time::Duration::from_millis(42));
}
