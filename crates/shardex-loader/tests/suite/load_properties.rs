use std::collections::HashSet;

use shardex_core::{FileDigest, Uri};
use shardex_loader::{load_index_shards, ShardLoader, ShardState};
use shardex_storage::{IncludeGraphNode, IndexShard, SourceFlags};

use super::support::{find, sorted_paths, Graph};

/// A small project with a diamond, a cycle and a missing header.
fn tangled() -> (Graph, Vec<shardex_core::AbsPathBuf>) {
    let graph = Graph::new();
    let main = graph.add_tu("main.cc", &["left.h", "right.h"]);
    let test = graph.add_tu("test.cc", &["right.h", "missing.h"]);
    graph.add_header("left.h", &["base.h"]);
    graph.add_header("right.h", &["base.h", "cycle_a.h"]);
    graph.add_header("base.h", &[]);
    graph.add_header("cycle_a.h", &["cycle_b.h"]);
    graph.add_header("cycle_b.h", &["cycle_a.h", "right.h"]);
    (graph, vec![main, test])
}

#[test]
fn each_path_is_loaded_at_most_once() {
    let (graph, entries) = tangled();

    let shards = load_index_shards(&entries, &graph.storage);

    for shard in &shards {
        assert_eq!(
            graph.storage.load_count(&shard.absolute_path),
            1,
            "{} loaded more than once",
            shard.absolute_path
        );
    }
    assert_eq!(graph.storage.total_loads(), shards.len());
}

#[test]
fn result_has_one_shard_per_reachable_path() {
    let (graph, entries) = tangled();

    let shards = load_index_shards(&entries, &graph.storage);

    let unique: HashSet<_> = shards.iter().map(|s| &s.absolute_path).collect();
    assert_eq!(unique.len(), shards.len());

    let mut expected: Vec<_> = [
        "main.cc",
        "test.cc",
        "left.h",
        "right.h",
        "base.h",
        "cycle_a.h",
        "cycle_b.h",
        "missing.h",
    ]
    .iter()
    .map(|file| graph.path(file))
    .collect();
    expected.sort();
    assert_eq!(sorted_paths(&shards), expected);
}

#[test]
fn loaded_shards_never_carry_an_empty_digest() {
    let (graph, entries) = tangled();

    let shards = load_index_shards(&entries, &graph.storage);

    let mut tombstones = 0;
    for shard in &shards {
        match &shard.state {
            ShardState::Loaded { digest, .. } => assert!(!digest.is_zero()),
            ShardState::Tombstone(_) => {
                tombstones += 1;
                assert!(!shard.count_references);
            }
        }
    }
    assert_eq!(tombstones, 1);
}

#[test]
fn every_shard_is_attributed_to_an_entry_file() {
    let (graph, entries) = tangled();

    let shards = load_index_shards(&entries, &graph.storage);

    for shard in &shards {
        assert!(
            entries.contains(&shard.dependent_tu),
            "{} attributed to non-entry {}",
            shard.absolute_path,
            shard.dependent_tu
        );
    }
}

#[test]
fn reloading_the_same_batch_gives_the_same_shards() {
    let (graph, entries) = tangled();

    let first = load_index_shards(&entries, &graph.storage);
    let second = load_index_shards(&entries, &graph.storage);

    assert_eq!(first, second);
    assert_eq!(graph.storage.total_loads(), 2 * first.len());
}

#[test]
fn only_translation_units_count_references() {
    let (graph, entries) = tangled();

    let shards = load_index_shards(&entries, &graph.storage);

    let counted: HashSet<_> = shards
        .iter()
        .filter(|s| s.count_references)
        .map(|s| s.absolute_path.clone())
        .collect();
    assert_eq!(counted, entries.iter().cloned().collect());
}

#[test]
fn had_errors_is_taken_from_the_own_entry() {
    let graph = Graph::new();
    let broken = graph.add(
        "broken.cc",
        &["ok.h"],
        SourceFlags::IS_TU | SourceFlags::HAD_ERRORS,
    );
    let ok = graph.add_header("ok.h", &[]);

    let shards = load_index_shards(&[broken.clone()], &graph.storage);

    assert!(find(&shards, &broken).had_errors);
    assert!(find(&shards, &broken).count_references);
    assert!(!find(&shards, &ok).had_errors);
}

#[test]
fn bad_reference_does_not_hide_sibling_edges() {
    let graph = Graph::new();
    let a = graph.path("a.cc");
    let b = graph.add_header("b.h", &[]);
    let c = graph.add_header("c.h", &[]);
    graph.storage.insert(
        a.clone(),
        IndexShard::new()
            .with_source(
                graph.uri("a.cc"),
                IncludeGraphNode::new(FileDigest::of_content(b"a"), SourceFlags::IS_TU),
            )
            .with_source(graph.uri("b.h"), IncludeGraphNode::default())
            .with_source("bogus:///c.h", IncludeGraphNode::default())
            .with_source(
                Uri::from_path(&c).to_string(),
                IncludeGraphNode::default(),
            ),
    );

    let mut loader = ShardLoader::new(&graph.storage);
    loader.load(&a);
    let stats = loader.stats();
    let shards = loader.finish();

    assert_eq!(stats.skipped_references, 1);
    assert_eq!(stats.fresh_loads, 3);
    assert_eq!(stats.tombstones, 0);
    assert_eq!(find(&shards, &a).dependencies, 2);
    assert_eq!(find(&shards, &b).dependencies, 0);
    let mut expected = vec![a, b, c];
    expected.sort();
    assert_eq!(sorted_paths(&shards), expected);
}
