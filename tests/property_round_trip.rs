use merkle_partition_engine::engine::{update_partitions, UpdateOutcome};
use merkle_partition_engine::key::Key;
use merkle_partition_engine::partition::{from_records, read, Params, PartitionRef};
use merkle_partition_engine::patch::{apply_patch, PatchValue};
use merkle_partition_engine::record::record;
use merkle_partition_engine::store::MemoryStore;
use merkle_partition_engine::tablet::Tablet;
use std::collections::BTreeSet;

#[test_log::test]
fn reading_the_output_matches_applying_the_same_patches_directly() -> merkle_partition_engine::Result<()> {
    let store = MemoryStore::new();
    let params = Params::new(8);

    let a = from_records(
        &store,
        &params,
        vec![
            (Key::from("K1"), PatchValue::Put(record([("a", "1")]))),
            (Key::from("K2"), PatchValue::Put(record([("a", "2")]))),
            (Key::from("K3"), PatchValue::Put(record([("a", "3")]))),
        ],
    )?
    .expect("non-empty");
    let b = from_records(
        &store,
        &params,
        vec![
            (Key::from("K4"), PatchValue::Put(record([("a", "4")]))),
            (Key::from("K5"), PatchValue::Put(record([("a", "5")]))),
        ],
    )?
    .expect("non-empty");

    let changes_a = vec![
        (Key::from("K2"), PatchValue::Put(record([("a", "20")]))),
        (Key::from("K3"), PatchValue::Tombstone),
    ]
    .into_iter()
    .collect();
    let changes_b = vec![(Key::from("K6"), PatchValue::Put(record([("a", "6")])))]
        .into_iter()
        .collect();

    let a_before = read::read_all(&store, &a.node, &BTreeSet::new())?;
    let b_before = read::read_all(&store, &b.node, &BTreeSet::new())?;
    let expected = apply_patch(&Tablet::from_records(a_before), &changes_a)
        .unwrap()
        .read_all()
        .chain(apply_patch(&Tablet::from_records(b_before), &changes_b).unwrap().read_all())
        .collect::<Vec<_>>();

    let outcome = update_partitions(
        &store,
        &params,
        None,
        vec![(PartitionRef::Link(a.link), changes_a), (PartitionRef::Link(b.link), changes_b)],
    )?;

    let UpdateOutcome::Partitions(parts) = outcome else {
        panic!("expected a partition list");
    };
    let mut actual = Vec::new();
    for part in &parts {
        actual.extend(read::read_all(&store, &part.node, &BTreeSet::new())?);
    }

    assert_eq!(actual, expected);

    Ok(())
}
