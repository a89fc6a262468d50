use shardex_core::AbsPathBuf;
use shardex_loader::load_index_shards;

use super::support::{find, Graph};

struct Diamond {
    graph: Graph,
    a: AbsPathBuf,
    b: AbsPathBuf,
    c: AbsPathBuf,
    d: AbsPathBuf,
}

/// `a.cc` and `c.cc` both include `b.h`, which includes `d.h`.
fn shared_header() -> Diamond {
    let graph = Graph::new();
    let a = graph.add_tu("a.cc", &["b.h"]);
    let c = graph.add_tu("c.cc", &["b.h"]);
    let b = graph.add_header("b.h", &["d.h"]);
    let d = graph.add_header("d.h", &[]);
    Diamond { graph, a, b, c, d }
}

fn owner_of(shards: &[shardex_loader::LoadedShard], path: &AbsPathBuf) -> AbsPathBuf {
    find(shards, path).dependent_tu.clone()
}

#[test]
fn entry_order_decides_shared_owner() {
    let Diamond { graph, a, b, c, d } = shared_header();

    let shards = load_index_shards(&[c.clone(), a.clone()], &graph.storage);

    assert_eq!(owner_of(&shards, &a), a);
    assert_eq!(owner_of(&shards, &c), c);
    assert_eq!(owner_of(&shards, &b), a);
    assert_eq!(owner_of(&shards, &d), c);
}

#[test]
fn entry_file_that_is_also_a_dependency_claims_itself() {
    let Diamond { graph, a, b, d, .. } = shared_header();

    let shards = load_index_shards(&[a.clone(), b.clone()], &graph.storage);

    assert_eq!(shards.len(), 3);
    assert_eq!(owner_of(&shards, &a), a);
    assert_eq!(owner_of(&shards, &b), b);
    // `b.h` was already cached, so the second round stops there.
    assert_eq!(owner_of(&shards, &d), a);
    assert!(!find(&shards, &b).count_references);
}

#[test]
fn dependency_loaded_first_as_entry_is_reclaimed() {
    let Diamond { graph, a, b, d, .. } = shared_header();

    let shards = load_index_shards(&[b.clone(), a.clone()], &graph.storage);

    assert_eq!(owner_of(&shards, &b), a);
    assert_eq!(owner_of(&shards, &d), b);
    assert_eq!(owner_of(&shards, &a), a);
}

#[test]
fn repeated_entry_only_reclaims_itself() {
    let Diamond { graph, a, b, c, d } = shared_header();

    let shards = load_index_shards(&[a.clone(), c.clone(), a.clone()], &graph.storage);

    assert_eq!(shards.len(), 4);
    assert_eq!(owner_of(&shards, &a), a);
    assert_eq!(owner_of(&shards, &b), c);
    assert_eq!(owner_of(&shards, &d), a);
    assert_eq!(graph.storage.total_loads(), 4);
}

#[test]
fn tombstones_are_attributed_like_loaded_shards() {
    let graph = Graph::new();
    let a = graph.add_tu("a.cc", &["gone.h"]);
    let c = graph.add_tu("c.cc", &["gone.h"]);
    let gone = graph.path("gone.h");

    let shards = load_index_shards(&[a, c.clone()], &graph.storage);

    let tombstone = find(&shards, &gone);
    assert!(!tombstone.is_loaded());
    assert_eq!(tombstone.dependent_tu, c);
    assert_eq!(graph.storage.load_count(&gone), 1);
}
