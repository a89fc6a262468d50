use shardex_core::{AbsPathBuf, FileDigest, ProjectScheme, Uri, UriResolver};
use shardex_loader::{ShardLoader, TombstoneReason};
use shardex_storage::{
    DiskStorageFactory, IncludeGraphNode, IndexShard, ShardStorageFactory, SourceFlags,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

fn own_node(content: &str, flags: SourceFlags) -> IncludeGraphNode {
    IncludeGraphNode::new(FileDigest::of_content(content.as_bytes()), flags)
}

struct Workspace {
    _tmp: tempfile::TempDir,
    project: AbsPathBuf,
    system: AbsPathBuf,
    factory: DiskStorageFactory,
}

impl Workspace {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let base = AbsPathBuf::new(tmp.path()).unwrap();
        let project = base.join("project");
        let system = base.join("sysroot");
        let factory = DiskStorageFactory::with_fallback_dir(
            [project.clone()],
            base.join("cache").into_path_buf(),
        );
        Self {
            _tmp: tmp,
            project,
            system,
            factory,
        }
    }

    fn store(&self, file: &AbsPathBuf, shard: IndexShard) {
        self.factory
            .storage_for(file)
            .store_shard(file, &shard)
            .unwrap();
    }
}

#[test]
fn loads_project_relative_graph_from_disk() {
    init_tracing();
    let ws = Workspace::new();
    let main = ws.project.join("src/main.cc");
    let util = ws.project.join("include/util.h");
    let vector = ws.system.join("vector");

    ws.store(
        &main,
        IndexShard::new()
            .with_source(
                "project:///src/main.cc",
                own_node("main", SourceFlags::IS_TU)
                    .with_includes(["project:///include/util.h"]),
            )
            .with_source("project:///include/util.h", IncludeGraphNode::default())
            .with_payload(b"symbols of main".to_vec()),
    );
    ws.store(
        &util,
        IndexShard::new()
            .with_source("project:///include/util.h", own_node("util", SourceFlags::NONE))
            .with_source(
                Uri::from_path(&vector).to_string(),
                IncludeGraphNode::default(),
            ),
    );
    ws.store(
        &vector,
        IndexShard::new().with_source(
            Uri::from_path(&vector).to_string(),
            own_node("vector", SourceFlags::NONE),
        ),
    );

    let resolver =
        UriResolver::default().with_scheme(ProjectScheme::new([ws.project.clone()]));
    let mut loader = ShardLoader::new(&ws.factory).with_resolver(resolver);
    loader.load(&main);
    let stats = loader.stats();
    let shards = loader.finish();

    assert_eq!(stats.fresh_loads, 3);
    assert_eq!(stats.tombstones, 0);
    assert_eq!(stats.skipped_references, 0);

    let paths: Vec<_> = shards.iter().map(|s| s.absolute_path.clone()).collect();
    assert_eq!(paths, vec![main.clone(), util.clone(), vector.clone()]);
    assert!(shards.iter().all(|s| s.is_loaded() && s.dependent_tu == main));

    assert_eq!(
        shards[0].shard().map(|s| s.payload.as_slice()),
        Some(&b"symbols of main"[..])
    );
    assert_eq!(shards[0].digest(), Some(FileDigest::of_content(b"main")));
    assert!(shards[0].count_references);
    assert!(!shards[1].count_references);
}

#[test]
fn project_references_outside_a_project_are_skipped() {
    init_tracing();
    let ws = Workspace::new();
    let vector = ws.system.join("vector");
    ws.store(
        &vector,
        IndexShard::new()
            .with_source(
                Uri::from_path(&vector).to_string(),
                own_node("vector", SourceFlags::IS_TU),
            )
            // There is no project root above the sysroot to resolve this against.
            .with_source("project:///include/util.h", IncludeGraphNode::default()),
    );

    let resolver =
        UriResolver::default().with_scheme(ProjectScheme::new([ws.project.clone()]));
    let mut loader = ShardLoader::new(&ws.factory).with_resolver(resolver);
    loader.load(&vector);
    assert_eq!(loader.stats().skipped_references, 1);
    let shards = loader.finish();

    assert_eq!(shards.len(), 1);
    assert!(shards[0].is_loaded());
}

#[test]
fn unreadable_shard_on_disk_is_a_tombstone() {
    init_tracing();
    let ws = Workspace::new();
    let main = ws.project.join("main.cc");
    let broken = ws.project.join("broken.h");
    ws.store(
        &main,
        IndexShard::new()
            .with_source(
                Uri::from_path(&main).to_string(),
                own_node("main", SourceFlags::IS_TU),
            )
            .with_source(
                Uri::from_path(&broken).to_string(),
                IncludeGraphNode::default(),
            ),
    );
    let broken_file = ws.factory.disk_storage_for(&broken).shard_path(&broken);
    std::fs::create_dir_all(broken_file.parent().unwrap()).unwrap();
    std::fs::write(&broken_file, b"definitely not a shard").unwrap();

    let mut loader = ShardLoader::new(&ws.factory);
    loader.load(&main);
    let shards = loader.finish();

    assert_eq!(shards.len(), 2);
    assert_eq!(shards[1].absolute_path, broken);
    assert_eq!(shards[1].tombstone_reason(), Some(TombstoneReason::NotFound));
    assert_eq!(shards[1].dependent_tu, main);
}
