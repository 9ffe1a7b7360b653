//! Collection behavior through the public API

use crate::common::*;
use proptest::prelude::*;
use std::collections::HashMap;

// ============================================================================
// Mutations
// ============================================================================

#[test]
fn add_is_visible_immediately() {
    let stash = MemoryStash::new();
    let notes = stash.registry.collection("notes").unwrap();

    let a = text_doc("a", &[1.0, 0.0]);
    let b = text_doc("b", &[0.0, 1.0]);
    let (id_a, id_b) = (a.id(), b.id());
    notes.add_document(a, false);
    notes.add_documents(vec![b], false);

    let mut expected = vec![id_a, id_b];
    expected.sort();
    assert_eq!(sorted_ids(&notes), expected);
    assert_eq!(notes.get_document(&id_b).unwrap().text(), "b");
}

#[test]
fn readding_same_id_is_idempotent() {
    let stash = MemoryStash::new();
    let notes = stash.registry.collection("notes").unwrap();

    let doc = text_doc("same", &[0.3, 0.4]);
    let id = doc.id();
    for _ in 0..5 {
        notes.add_document(doc.clone(), false);
    }

    assert_eq!(notes.len(), 1);
    assert_eq!(notes.get_all_documents().len(), 1);
    assert_eq!(*notes.get_document(&id).unwrap(), doc);
}

#[test]
fn remove_and_clear() {
    let stash = MemoryStash::new();
    let notes = stash.registry.collection("notes").unwrap();

    let keep = text_doc("keep", &[1.0]);
    let gone = text_doc("gone", &[1.0]);
    let drop_id = gone.id();
    notes.add_documents(vec![keep, gone], false);

    assert!(notes.remove_document(&drop_id, false));
    assert!(!notes.remove_document(&drop_id, false));
    assert_eq!(notes.len(), 1);

    notes.clear(false);
    assert!(notes.is_empty());
    assert!(notes.get_all_documents().is_empty());
}

#[derive(Debug, Clone)]
enum Op {
    Add(u8, f32),
    Remove(u8),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0u8..16, -1.0f32..1.0).prop_map(|(k, v)| Op::Add(k, v)),
        3 => (0u8..16).prop_map(Op::Remove),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn documents_track_mutations(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let stash = MemoryStash::with_delay(60_000);
        let coll = stash.registry.collection("model").unwrap();
        let keys: Vec<Uuid> = (0..16).map(|_| Uuid::new_v4()).collect();
        let mut model: HashMap<Uuid, f32> = HashMap::new();

        for op in ops {
            match op {
                Op::Add(k, v) => {
                    let id = keys[k as usize];
                    coll.add_document(TextDocument::with_id(id, "m", vec![v, 1.0]), false);
                    model.insert(id, v);
                }
                Op::Remove(k) => {
                    let id = keys[k as usize];
                    let removed = coll.remove_document(&id, false);
                    prop_assert_eq!(removed, model.remove(&id).is_some());
                }
                Op::Clear => {
                    coll.clear(false);
                    model.clear();
                }
            }

            prop_assert_eq!(coll.len(), model.len());
            for doc in coll.get_all_documents() {
                prop_assert_eq!(model.get(&doc.id()).copied(), Some(doc.embedding()[0]));
            }
        }
    }
}

// ============================================================================
// Search
// ============================================================================

fn axes() -> (MemoryStash, std::sync::Arc<Collection>, [Uuid; 3]) {
    let stash = MemoryStash::new();
    let coll = stash.registry.collection("axes").unwrap();
    let x = text_doc("x", &[1.0, 0.0]);
    let y = text_doc("y", &[0.0, 1.0]);
    let xy = text_doc("xy", &[1.0, 1.0]);
    let ids = [x.id(), y.id(), xy.id()];
    coll.add_documents(vec![x, y, xy], false);
    (stash, coll, ids)
}

#[test]
fn search_orders_by_cosine() {
    let (_stash, coll, [x, y, xy]) = axes();

    let results = coll.search(&[1.0, 0.0], DEFAULT_NUM_RESULTS, None);
    assert_eq!(ids(&results), vec![x, xy, y]);
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert!((results[1].score - 0.707_106_8).abs() < 1e-5);
    assert!(results[2].score.abs() < 1e-6);
}

#[test]
fn search_threshold_filters() {
    let (_stash, coll, [x, _, xy]) = axes();
    let results = coll.search(&[1.0, 0.0], DEFAULT_NUM_RESULTS, Some(0.5));
    assert_eq!(ids(&results), vec![x, xy]);
}

#[test]
fn search_limits_results() {
    let (_stash, coll, [x, _, xy]) = axes();
    assert_eq!(ids(&coll.search(&[1.0, 0.0], 2, None)), vec![x, xy]);
    assert!(coll.search(&[1.0, 0.0], 0, None).is_empty());
}

#[test]
fn search_default_count_is_ten() {
    let stash = MemoryStash::new();
    let coll = stash.registry.collection("many").unwrap();
    coll.add_documents((0..25).map(|i| text_doc("n", &[1.0, i as f32 / 25.0])), false);

    assert_eq!(coll.nearest(&[1.0, 0.0]).len(), DEFAULT_NUM_RESULTS);
    assert_eq!(coll.search(&[1.0, 0.0], 100, None).len(), 25);
}

#[test]
fn search_scores_are_descending() {
    let stash = MemoryStash::new();
    let coll = stash.registry.collection("desc").unwrap();
    coll.add_documents(
        (0..40).map(|i| {
            let angle = i as f32 * 0.15;
            text_doc("p", &[angle.cos(), angle.sin(), 0.1])
        }),
        false,
    );

    let results = coll.search(&[0.2, 0.9, 0.0], 40, None);
    assert_eq!(results.len(), 40);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn search_survives_huge_embeddings_after_reload() {
    let stash = DiskStash::new();
    let coll = stash.registry.collection("huge").unwrap();
    let big = text_doc("big", &[1e20, 0.0]);
    let small = text_doc("small", &[1.0, 1.0]);
    let neg = text_doc("neg", &[-1.0, -1.0]);
    let expected = vec![small.id(), big.id(), neg.id()];
    coll.add_documents(vec![big, small, neg], false);
    coll.save_now().unwrap();

    let reopened = stash.reopen();
    let coll = reopened.collection("huge").unwrap();
    let results = coll.search(&[1e20, 1e20], 10, None);
    let got: Vec<Uuid> = results.iter().map(|r| r.id).collect();
    assert_eq!(got, expected);
    for pair in results.windows(2) {
        assert!(pair[0].score.is_finite());
        assert!(pair[0].score > pair[1].score);
    }
}

#[test]
fn strict_search_reports_dimension_mismatch() {
    let (_stash, coll, _) = axes();
    coll.add_document(text_doc("3d", &[1.0, 0.0, 0.0]), false);

    assert_eq!(coll.search(&[1.0, 0.0], 10, None).len(), 4);
    assert!(matches!(
        coll.search_strict(&[1.0, 0.0], 10, None),
        Err(Error::DimensionMismatch { expected: 2, actual: 3 })
    ));
}

#[test]
fn custom_document_type() {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Image {
        id: Uuid,
        path: String,
        embedding: Vec<f32>,
    }

    impl Document for Image {
        fn id(&self) -> Uuid {
            self.id
        }
        fn embedding(&self) -> &[f32] {
            &self.embedding
        }
        fn magnitude(&self) -> f32 {
            stashdb::magnitude(&self.embedding)
        }
    }

    let stash = MemoryStash::new();
    let images = stash.registry.collection_of::<Image>("images").unwrap();
    let cat = Image {
        id: Uuid::new_v4(),
        path: "cat.png".to_string(),
        embedding: vec![0.9, 0.1],
    };
    let cat_id = cat.id;
    images.add_document(cat, false);

    let hits = images.search(&[1.0, 0.0], 1, Some(0.5));
    assert_eq!(ids(&hits), vec![cat_id]);
    assert_eq!(hits[0].document.path, "cat.png");
}
