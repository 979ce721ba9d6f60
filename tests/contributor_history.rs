use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use kyro_tally::{ConsensusEngine, EntityKey, InMemoryRecordStore, Sample, ScalarField};

#[test]
fn history_lists_every_touched_entity_newest_first() {
    let engine = ConsensusEngine::new(Arc::new(InMemoryRecordStore::new()));
    let t0 = Utc::now();

    let submissions = [
        ("Cohiba", "Siglo II", "u-1", 0),
        ("Padron", "1964 Anniversary", "u-2", 1),
        ("Arturo Fuente", "Hemingway", "u-1", 2),
        ("Cohiba", "Siglo II", "u-2", 3),
        ("Oliva", "Serie V", "u-3", 4),
    ];
    for (brand, name, contributor, offset) in submissions {
        let sample = Sample::new(brand, name)
            .with_scalar(ScalarField::Origin, "Somewhere")
            .with_contributor(contributor, contributor.to_uppercase());
        engine
            .ingest_at(&sample, t0 + Duration::seconds(offset))
            .unwrap();
    }

    let history = engine.find_by_contributor("u-1").unwrap();
    let keys: Vec<EntityKey> = history.iter().map(|(k, _)| k.clone()).collect();
    assert_eq!(
        keys,
        [
            EntityKey::from_parts("Cohiba", "Siglo II"),
            EntityKey::from_parts("Arturo Fuente", "Hemingway"),
        ]
    );

    // The view reflects every contributor, not only the one queried.
    let (_, siglo) = &history[0];
    assert_eq!(siglo.unique_contributors, 2);
    assert_eq!(siglo.total_recognitions, 2);
    assert_eq!(siglo.last_recognized_at, t0 + Duration::seconds(3));

    let u2 = engine.find_by_contributor("u-2").unwrap();
    assert_eq!(u2[0].0, EntityKey::from_parts("Cohiba", "Siglo II"));
    assert_eq!(u2.len(), 2);

    assert!(engine.find_by_contributor("u-404").unwrap().is_empty());
}

#[test]
fn view_serializes_for_callers() {
    let engine = ConsensusEngine::new(Arc::new(InMemoryRecordStore::new()));
    engine
        .ingest_json(&json!({
            "brand": "Cohiba",
            "name": "Siglo II",
            "origin": "Cuba",
            "wrapper": "Cuban",
            "rating": 91,
            "contributorId": "u-1",
            "contributorName": "Ana",
        }))
        .unwrap();

    let (_, view) = engine.find_by_contributor("u-1").unwrap().remove(0);
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["origin"], "Cuba");
    assert_eq!(json["rating"], 91.0);
    assert_eq!(json["wrappers"][0]["value"], "Cuban");
    assert_eq!(json["wrappers"][0]["percentage"], 100.0);
    assert_eq!(json["contributors"][0]["name"], "Ana");
    assert_eq!(json["uniqueContributors"], 1);

    let key = EntityKey::from_normalized(json["key"].as_str().unwrap());
    assert_eq!(key, view.key);
    assert_eq!(key, EntityKey::from_parts("COHIBA", "siglo ii"));
    assert!(engine.consensus_for_key(&key).unwrap().is_some());
}
