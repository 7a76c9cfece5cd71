//! Bridge scenarios across encoder, store and snapshot files

use kbridge_cognition::{Encoder, MemoryBridge};
use kbridge_core::{Cue, EncoderConfig, Triple};
use kbridge_persistence::PersistenceError;
use tempfile::TempDir;

fn facts() -> Vec<Triple> {
    vec![
        Triple::new("Paris", "capitalOf", "France"),
        Triple::new("London", "capitalOf", "UK"),
        Triple::new("Tokyo", "capitalOf", "Japan"),
        Triple::new("Water", "boilsAt", "100C"),
        Triple::new("Iron", "meltsAt", "1538C"),
    ]
}

fn bridge_with_seed(seed: u64) -> MemoryBridge {
    MemoryBridge::new(Encoder::new(EncoderConfig::default().with_seed(seed)).unwrap())
}

fn populated() -> MemoryBridge {
    let mut bridge = bridge_with_seed(42);
    for triple in facts() {
        bridge.store_knowledge(&triple).unwrap();
    }
    bridge
}

#[test]
fn test_capital_cue_ranks_capitals_first() {
    let mut bridge = populated();
    let cue = Cue::any()
        .subject("Berlin")
        .predicate("capitalOf")
        .object("Germany");

    let results = bridge.retrieve_by_cue(&cue, 3).unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|(t, _)| t.predicate == "capitalOf"));

    let mut subjects: Vec<&str> = results.iter().map(|(t, _)| t.subject.as_str()).collect();
    subjects.sort_unstable();
    assert_eq!(subjects, vec!["London", "Paris", "Tokyo"]);

    // Scores are non-increasing
    assert!(results.windows(2).all(|w| w[0].1 >= w[1].1));
}

#[test]
fn test_exact_lookup_hit_and_miss() {
    let bridge = populated();
    assert_eq!(
        bridge.retrieve_exact("Paris", "capitalOf", "France"),
        Some(Triple::new("Paris", "capitalOf", "France"))
    );
    assert_eq!(bridge.retrieve_exact("Paris", "capitalOf", "Germany"), None);
}

#[test]
fn test_snapshot_restores_into_other_seed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state").join("bridge.json");

    let mut original = populated();
    original.save(&path).unwrap();

    let mut restored = bridge_with_seed(7);
    restored
        .store_knowledge(&Triple::new("Stale", "fact", "here"))
        .unwrap();
    restored.load(&path).unwrap();

    assert_eq!(restored.entries(), original.entries());
    assert_eq!(restored.retrieve_exact("Stale", "fact", "here"), None);
    assert!(!restored.encoder().entities().contains("Stale"));
    assert_eq!(
        restored.get_stats().encoder,
        original.get_stats().encoder
    );

    // Known names keep their saved codes
    let paris = original.encoder_mut().encode_entity("Paris").unwrap();
    assert_eq!(restored.encoder_mut().encode_entity("Paris").unwrap(), paris);

    // Secondary index survives
    for entry in original.entries() {
        assert_eq!(
            restored.lookup_by_positions(&entry.assembly),
            Some(entry.key.as_str())
        );
    }

    // A cue built only from saved names ranks identically
    let cue = Cue::from(Triple::new("Paris", "capitalOf", "France"));
    let a = original.retrieve_by_cue(&cue, 5).unwrap();
    let b = restored.retrieve_by_cue(&cue, 5).unwrap();
    assert_eq!(a, b);
    assert_eq!(a[0].0.subject, "Paris");

    // The generator is not part of the snapshot: unseen names draw from
    // each encoder's own stream
    let fresh = original.encoder_mut().encode_entity("Unseen").unwrap();
    assert_ne!(restored.encoder_mut().encode_entity("Unseen").unwrap(), fresh);
}

#[test]
fn test_tampered_snapshot_leaves_state_alone() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bridge.json");
    populated().save(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, content.replace("Tokyo", "Kyoto")).unwrap();

    let mut bridge = bridge_with_seed(1);
    bridge
        .store_knowledge(&Triple::new("Kept", "is", "here"))
        .unwrap();
    let err = bridge.load(&path).unwrap_err();
    assert!(matches!(err, PersistenceError::ChecksumMismatch { .. }));
    assert_eq!(bridge.len(), 1);
    assert!(bridge.retrieve_exact("Kept", "is", "here").is_some());
}
