use merkle_partition_engine::engine::{update_partitions, UpdateOutcome};
use merkle_partition_engine::key::Key;
use merkle_partition_engine::partition::{from_records, Params, PartitionRef};
use merkle_partition_engine::patch::PatchValue;
use merkle_partition_engine::record::record;
use merkle_partition_engine::store::MemoryStore;

fn put(key: &'static str) -> (Key, PatchValue) {
    (Key::from(key), PatchValue::Put(record([("a", "v")])))
}

fn put_owned(key: String) -> (Key, PatchValue) {
    (Key::from(key), PatchValue::Put(record([("a", "v")])))
}

#[test_log::test]
fn a_large_patch_splits_into_two_partitions() -> merkle_partition_engine::Result<()> {
    let store = MemoryStore::new();
    let params = Params::new(6);
    assert_eq!(params.half_full(), 3);
    assert_eq!(params.emit_threshold(), 9);

    let p = from_records(&store, &params, vec![put("K1"), put("K2"), put("K3"), put("K4"), put("K5")])?
        .expect("non-empty");

    let changes = (6..=12).map(|i| put_owned(format!("K{i}"))).collect();
    let outcome = update_partitions(&store, &params, None, vec![(PartitionRef::Link(p.link), changes)])?;

    let UpdateOutcome::Partitions(parts) = outcome else {
        panic!("expected a partition list");
    };
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].node.count, 6);
    assert_eq!(parts[1].node.count, 6);
    assert_eq!(parts.iter().map(|p| p.node.count).sum::<usize>(), 12);

    Ok(())
}
