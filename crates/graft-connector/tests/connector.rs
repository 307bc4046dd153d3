//! Connector behavior through the public API.

use std::ffi::OsStr;
use std::sync::Arc;

use graft_connector::{
    ConnectorConfig, ConnectorError, FileAttr, FileSystemConnector, FileSystemOptions,
    MemoryFileSystem, MountId, NodeId, Notification, Owner, RecordingNotifier,
};

fn connector_with(config: ConnectorConfig) -> FileSystemConnector {
    graft_telemetry::init_for_tests();
    FileSystemConnector::new(Arc::new(MemoryFileSystem::new("root")), config)
}

fn connector() -> FileSystemConnector {
    connector_with(ConnectorConfig {
        verify_tree: true,
        ..Default::default()
    })
}

fn os(name: &str) -> &OsStr {
    OsStr::new(name)
}

fn dir(conn: &FileSystemConnector, parent: NodeId, name: &str) -> NodeId {
    conn.lookup_update(parent, os(name), true, 1).unwrap().node_id()
}

fn file(conn: &FileSystemConnector, parent: NodeId, name: &str) -> NodeId {
    conn.lookup_update(parent, os(name), false, 1).unwrap().node_id()
}

#[test]
fn lookup_forget_pairing_collects_leaf() {
    let conn = connector();
    let id = file(&conn, NodeId::ROOT, "f");
    assert_eq!(conn.lookup_update(NodeId::ROOT, os("f"), false, 2).unwrap().node_id(), id);
    assert_eq!(conn.lookup_count(id).unwrap(), 3);
    assert_eq!(conn.inode_count(), 2);

    conn.forget_update(id, 2).unwrap();
    assert!(conn.inode(id).is_ok());
    conn.forget_update(id, 1).unwrap();

    assert!(conn.inode(id).unwrap_err().is_invariant());
    assert!(conn.children(NodeId::ROOT).unwrap().is_empty());
    assert_eq!(conn.inode_count(), 1);
}

#[test]
fn stale_node_id_in_fast_mode() {
    let conn = connector_with(ConnectorConfig {
        options: FileSystemOptions {
            skip_check_handles: true,
            ..Default::default()
        },
        verify_tree: true,
    });
    let id = file(&conn, NodeId::ROOT, "f");
    conn.forget_update(id, 1).unwrap();
    assert!(matches!(conn.inode(id), Err(ConnectorError::StaleHandle(h)) if h == id.get()));

    // The slot is reused under a new generation; the old id stays dead.
    let again = file(&conn, NodeId::ROOT, "f");
    assert_ne!(again, id);
    assert!(matches!(conn.forget_update(id, 1), Err(ConnectorError::StaleHandle(_))));
}

#[test]
fn forgetting_a_leaf_releases_empty_ancestors() {
    let conn = connector();
    let a = dir(&conn, NodeId::ROOT, "a");
    let b = dir(&conn, a, "b");
    let c = file(&conn, b, "c");

    conn.forget_update(a, 1).unwrap();
    conn.forget_update(b, 1).unwrap();
    // Both still hold children.
    assert!(conn.inode(a).is_ok());
    assert!(conn.inode(b).is_ok());

    conn.forget_update(c, 1).unwrap();
    assert!(conn.inode(c).is_err());
    assert!(conn.inode(b).is_err());
    assert!(conn.inode(a).is_err());
    assert_eq!(conn.inode_count(), 1);
}

#[test]
fn collection_never_takes_pinned_nodes() {
    let conn = connector();
    let a = dir(&conn, NodeId::ROOT, "a");
    let counted = file(&conn, a, "counted");
    let open = file(&conn, a, "open");
    let parent = dir(&conn, a, "parent");
    let child = file(&conn, parent, "child");
    conn.mount("/a/mnt", Arc::new(MemoryFileSystem::new("sub")), None)
        .unwrap();
    let mnt = conn.find_inode("/a/mnt").unwrap().node_id();

    let fh = conn.open_file(open, 0).unwrap();
    conn.forget_update(open, 1).unwrap();
    conn.forget_update(parent, 1).unwrap();
    conn.forget_update(a, 1).unwrap();
    let other = file(&conn, NodeId::ROOT, "other");
    conn.forget_update(other, 1).unwrap();

    for id in [a, counted, open, parent, child, mnt] {
        assert!(conn.inode(id).is_ok(), "{id:?} was collected");
    }
    assert_eq!(conn.lookup_count(open).unwrap(), 0);
    assert_eq!(conn.open_file_count(open).unwrap(), 1);

    // Releasing the last file of a forgotten inode collects it.
    conn.release_file(open, fh).unwrap();
    assert!(conn.inode(open).is_err());
    assert!(conn.inode(counted).is_ok());
}

#[test]
fn mount_point_is_pinned_until_unmounted() {
    let conn = connector();
    conn.mount("/data", Arc::new(MemoryFileSystem::new("a")), None)
        .unwrap();
    let root = conn.lookup_update(NodeId::ROOT, os("data"), true, 1).unwrap();
    let id = root.node_id();
    assert!(conn.is_mount_point(id));

    conn.forget_update(id, 1).unwrap();
    assert_eq!(conn.lookup_count(id).unwrap(), 0);
    assert!(conn.inode(id).is_ok());
    assert_eq!(conn.find_inode("/data").unwrap().node_id(), id);
    assert!(!conn.is_mount_point(NodeId::ROOT));
}

#[test]
fn rename_over_existing_entry() {
    let conn = connector();
    let a = dir(&conn, NodeId::ROOT, "a");
    let x = file(&conn, a, "x");
    let y = file(&conn, a, "y");
    conn.lookup_update(a, os("x"), false, 4).unwrap();

    conn.rename_update(a, os("x"), a, os("y")).unwrap();

    let children = conn.children(a).unwrap();
    assert_eq!(children, vec![(os("y").to_owned(), x)]);
    assert_eq!(conn.lookup_count(x).unwrap(), 5);
    // The displaced node still has a kernel reference: orphaned, not freed.
    assert!(conn.inode(y).is_ok());
    conn.forget_update(y, 1).unwrap();
    assert!(conn.inode(y).is_err());
    assert_eq!(conn.find_inode("/a/y").unwrap().node_id(), x);
    assert!(conn.find_inode("/a/x").is_err());
}

#[test]
fn rename_between_directories_keeps_identity() {
    let conn = connector();
    let a = dir(&conn, NodeId::ROOT, "a");
    let b = dir(&conn, NodeId::ROOT, "b");
    let x = dir(&conn, a, "x");
    let inner = file(&conn, x, "inner");

    conn.rename_update(a, os("x"), b, os("z")).unwrap();
    assert!(conn.children(a).unwrap().is_empty());
    assert_eq!(conn.find_inode("/b/z/inner").unwrap().node_id(), inner);
    assert_eq!(conn.lookup_count(x).unwrap(), 1);

    // Same name in place is a no-op.
    conn.rename_update(b, os("z"), b, os("z")).unwrap();
    assert_eq!(conn.find_inode("/b/z").unwrap().node_id(), x);
}

#[test]
fn rename_across_mounts_is_an_invariant_violation() {
    let conn = connector();
    let a = dir(&conn, NodeId::ROOT, "a");
    file(&conn, a, "x");
    conn.mount("/mnt", Arc::new(MemoryFileSystem::new("sub")), None)
        .unwrap();
    let mnt = conn.lookup_update(NodeId::ROOT, os("mnt"), true, 1).unwrap().node_id();

    let err = conn.rename_update(a, os("x"), mnt, os("x")).unwrap_err();
    assert!(err.is_invariant());
    assert!(conn.find_inode("/a/x").is_ok());
    assert!(conn.children(mnt).unwrap().is_empty());
}

#[test]
fn rename_errors_leave_tree_unchanged() {
    let conn = connector();
    let a = dir(&conn, NodeId::ROOT, "a");
    file(&conn, a, "x");
    conn.mount("/a/m", Arc::new(MemoryFileSystem::new("sub")), None)
        .unwrap();

    assert!(matches!(
        conn.rename_update(a, os("m"), a, os("n")),
        Err(ConnectorError::Busy(_))
    ));
    assert!(matches!(
        conn.rename_update(a, os("x"), a, os("m")),
        Err(ConnectorError::Busy(_))
    ));
    assert!(conn.rename_update(a, os("missing"), a, os("y")).unwrap_err().is_invariant());

    let names: Vec<_> = conn.children(a).unwrap().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, [os("m"), os("x")]);
    conn.check_tree().unwrap();
}

#[test]
fn unlink_orphans_referenced_nodes() {
    let conn = connector();
    let a = dir(&conn, NodeId::ROOT, "a");
    let x = file(&conn, a, "x");

    conn.unlink_update(a, os("x")).unwrap();
    assert!(conn.find_inode("/a/x").is_err());
    assert_eq!(conn.lookup_count(x).unwrap(), 1);

    conn.forget_update(x, 1).unwrap();
    assert!(conn.inode(x).is_err());

    // Absent names are fine.
    conn.unlink_update(a, os("x")).unwrap();

    conn.mount("/a/m", Arc::new(MemoryFileSystem::new("sub")), None)
        .unwrap();
    assert!(matches!(conn.unlink_update(a, os("m")), Err(ConnectorError::Busy(_))));
}

#[test]
fn unlink_frees_unreferenced_subtree() {
    let conn = connector();
    let a = dir(&conn, NodeId::ROOT, "a");
    let b = dir(&conn, a, "b");
    conn.forget_update(b, 1).unwrap();
    assert!(conn.inode(b).is_err());

    let b = dir(&conn, a, "b");
    let c = file(&conn, b, "c");
    conn.forget_update(c, 1).unwrap();
    conn.forget_update(b, 1).unwrap();
    assert!(conn.inode(b).is_err());

    let d = dir(&conn, a, "d");
    let e = file(&conn, d, "e");
    conn.lookup_update(a, os("d"), true, -1).unwrap();
    conn.lookup_update(d, os("e"), false, -1).unwrap();
    conn.unlink_update(a, os("d")).unwrap();
    assert!(conn.inode(d).is_err());
    assert!(conn.inode(e).is_err());
}

#[test]
fn path_resolution() {
    let conn = connector();
    let a = dir(&conn, NodeId::ROOT, "a");
    let b = dir(&conn, a, "b");
    let c = file(&conn, b, "c");

    assert_eq!(conn.find_inode("/a/b/c").unwrap().node_id(), c);
    assert_eq!(conn.find_inode("a//b/./c/").unwrap().node_id(), c);
    assert_eq!(conn.find_inode("/a/b/../b/c").unwrap().node_id(), c);
    assert_eq!(conn.find_inode("/").unwrap().node_id(), NodeId::ROOT);
    assert!(matches!(conn.find_inode("/a/x/c"), Err(ConnectorError::NotFound(_))));

    let (inode, rest) = conn.find_last_known_inode("/a/b/d/e").unwrap();
    assert_eq!(inode.node_id(), b);
    assert_eq!(rest, [os("d"), os("e")]);

    let (inode, rest) = conn.find_last_known_inode("/nope").unwrap();
    assert!(inode.node_id().is_root());
    assert_eq!(rest, [os("nope")]);
}

#[test]
fn path_resolution_crosses_mounts() {
    let conn = connector();
    dir(&conn, NodeId::ROOT, "a");
    conn.mount("/a/m", Arc::new(MemoryFileSystem::new("sub")), None)
        .unwrap();
    let m = conn.lookup_update(
        conn.find_inode("/a").unwrap().node_id(),
        os("m"),
        true,
        1,
    )
    .unwrap();
    let inner = dir(&conn, m.node_id(), "inner");

    let found = conn.find_inode("/a/m/inner").unwrap();
    assert_eq!(found.node_id(), inner);
    assert_eq!(found.mount_id(), m.mount_id());
    assert_ne!(m.mount_id(), MountId::ROOT);
}

#[test]
fn mount_errors() {
    let conn = connector();
    let a = dir(&conn, NodeId::ROOT, "a");
    file(&conn, a, "f");
    let backend = || Arc::new(MemoryFileSystem::new("sub"));

    assert!(matches!(conn.mount("/missing/m", backend(), None), Err(ConnectorError::NotFound(_))));
    assert!(matches!(conn.mount("/a/f", backend(), None), Err(ConnectorError::Busy(_))));
    assert!(matches!(conn.mount("/a/f/x", backend(), None), Err(ConnectorError::NotADirectory(_))));
    assert!(matches!(conn.mount("/", backend(), None), Err(ConnectorError::Busy(_))));

    conn.mount("/a/m", backend(), None).unwrap();
    assert!(matches!(conn.mount("/a/m", backend(), None), Err(ConnectorError::Busy(_))));
    assert_eq!(conn.lookup_count(a).unwrap(), 1);
    assert_eq!(conn.list_mounts().len(), 2);
}

#[test]
fn root_backend_replacement() {
    graft_telemetry::init_for_tests();
    let old = Arc::new(MemoryFileSystem::new("old"));
    let conn = FileSystemConnector::new(old.clone(), ConnectorConfig::default());
    assert_eq!(old.mount_count(), 1);

    // A zero-count lookup still files the entry, which blocks replacement.
    let x = conn.lookup_update(NodeId::ROOT, os("x"), true, 0).unwrap().node_id();
    let new = Arc::new(MemoryFileSystem::new("new"));
    assert!(matches!(conn.mount("", new.clone(), None), Err(ConnectorError::Busy(_))));

    conn.forget_update(x, 0).unwrap();
    assert!(conn.children(NodeId::ROOT).unwrap().is_empty());

    assert_eq!(conn.mount("/", new.clone(), None).unwrap(), MountId::ROOT);
    assert_eq!(old.unmount_count(), 1);
    assert_eq!(new.mount_count(), 1);
    assert_eq!(conn.list_mounts()[0].backend, "new");
    assert_eq!(conn.list_mounts().len(), 1);
}

#[test]
fn entry_replies_use_mount_options() {
    let conn = connector();
    let opts = FileSystemOptions {
        attr_timeout: std::time::Duration::from_secs(7),
        negative_timeout: std::time::Duration::from_secs(3),
        owner: Some(Owner { uid: 42, gid: 43 }),
        ..Default::default()
    };
    conn.mount("/m", Arc::new(MemoryFileSystem::new("sub")), Some(opts))
        .unwrap();
    let m = conn.find_inode("/m").unwrap().node_id();

    let (entry, inode) = conn.create_child(m, os("f"), &FileAttr::file(10, 0o600)).unwrap();
    assert_eq!(entry.node_id, Some(inode.node_id()));
    assert_eq!(entry.attr_valid, std::time::Duration::from_secs(7));
    let attr = entry.attr.unwrap();
    assert_eq!((attr.uid, attr.gid), (Some(42), Some(43)));
    assert_eq!(conn.lookup_count(inode.node_id()).unwrap(), 1);

    let negative = conn.negative_entry(m).unwrap();
    assert_eq!(negative.node_id, None);
    assert_eq!(negative.entry_valid, std::time::Duration::from_secs(3));

    let (root_entry, _) = conn.create_child(NodeId::ROOT, os("g"), &FileAttr::directory(0o755)).unwrap();
    assert_eq!(root_entry.attr_valid, std::time::Duration::from_secs(1));
}

#[test]
fn unmount_busy_with_open_files_or_nested_mounts() {
    let conn = connector();
    conn.mount("/m", Arc::new(MemoryFileSystem::new("sub")), None)
        .unwrap();
    let m = conn.lookup_update(NodeId::ROOT, os("m"), true, 1).unwrap().node_id();
    let f = file(&conn, m, "f");
    let fh = conn.open_file(f, 0).unwrap();

    assert!(matches!(conn.unmount("/m"), Err(ConnectorError::Busy(_))));
    assert_eq!(conn.find_inode("/m/f").unwrap().node_id(), f);

    conn.release_file(f, fh).unwrap();
    conn.forget_update(f, 1).unwrap();
    conn.forget_update(m, 1).unwrap();
    let d = dir(&conn, m, "d");
    conn.mount("/m/d/nested", Arc::new(MemoryFileSystem::new("nested")), None)
        .unwrap();
    conn.forget_update(d, 1).unwrap();
    assert!(matches!(conn.unmount("/m"), Err(ConnectorError::Busy(_))));
    assert!(conn.find_inode("/m/d/nested").is_ok());

    conn.unmount("/m/d/nested").unwrap();
    conn.unmount("/m").unwrap();
    assert_eq!(conn.inode_count(), 1);
}

#[test]
fn unmount_invalid_paths() {
    let conn = connector();
    dir(&conn, NodeId::ROOT, "plain");
    assert!(matches!(conn.unmount("/"), Err(ConnectorError::Invalid(_))));
    assert!(matches!(conn.unmount("/plain"), Err(ConnectorError::Invalid(_))));
    assert!(matches!(conn.unmount("/missing/m"), Err(ConnectorError::Invalid(_))));
}

#[test]
fn clean_unmount_notifies_once() {
    let conn = connector();
    let notifier = Arc::new(RecordingNotifier::new());
    conn.init(notifier.clone());
    let backend = Arc::new(MemoryFileSystem::new("sub"));
    conn.mount("/m", backend.clone(), None).unwrap();
    assert_eq!(backend.mount_count(), 1);

    conn.unmount("/m").unwrap();
    assert_eq!(backend.unmount_count(), 1);
    assert!(conn.children(NodeId::ROOT).unwrap().is_empty());
    assert_eq!(conn.list_mounts().len(), 1);

    let sent = notifier.drain();
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        &sent[0],
        Notification::Entry(e) if e.parent == NodeId::ROOT && e.name == "m"
    ));
}

#[test]
fn unmount_busy_while_kernel_holds_lookups() {
    let conn = connector();
    let notifier = Arc::new(RecordingNotifier::new());
    conn.init(notifier.clone());
    let backend = Arc::new(MemoryFileSystem::new("sub"));
    conn.mount("/m", backend.clone(), None).unwrap();
    let m = conn.lookup_update(NodeId::ROOT, os("m"), true, 1).unwrap().node_id();
    let f = file(&conn, m, "f");

    // Leaf still referenced.
    conn.forget_update(m, 1).unwrap();
    assert!(matches!(conn.unmount("/m"), Err(ConnectorError::Busy(_))));
    assert_eq!(conn.find_inode("/m/f").unwrap().node_id(), f);
    assert!(conn.is_mount_point(m));
    assert_eq!(conn.lookup_count(f).unwrap(), 1);

    // Mount root still referenced.
    conn.forget_update(f, 1).unwrap();
    conn.lookup_update(NodeId::ROOT, os("m"), true, 1).unwrap();
    assert!(matches!(conn.unmount("/m"), Err(ConnectorError::Busy(_))));
    assert_eq!(conn.find_inode("/m").unwrap().node_id(), m);
    assert_eq!(backend.unmount_count(), 0);
    assert!(notifier.drain().is_empty());

    conn.forget_update(m, 1).unwrap();
    conn.unmount("/m").unwrap();
    assert!(matches!(conn.find_inode("/m"), Err(ConnectorError::NotFound(_))));
    assert!(conn.inode(m).is_err());
    assert_eq!(conn.list_mounts().len(), 1);
    assert_eq!(conn.inode_count(), 1);
    assert_eq!(notifier.drain().len(), 1);
}

#[test]
fn unmount_collects_unreferenced_inodes() {
    let conn = connector();
    conn.mount("/m", Arc::new(MemoryFileSystem::new("sub")), None)
        .unwrap();
    let m = conn.find_inode("/m").unwrap().node_id();
    let d = conn.lookup_update(m, os("d"), true, 0).unwrap().node_id();
    let f = conn.lookup_update(d, os("f"), false, 0).unwrap().node_id();
    assert_eq!(conn.inode_count(), 4);

    conn.unmount("/m").unwrap();
    assert!(conn.inode(d).is_err());
    assert!(conn.inode(f).is_err());
    assert_eq!(conn.inode_count(), 1);
    let ids: Vec<_> = conn.list_mounts().into_iter().map(|info| info.id).collect();
    assert_eq!(ids, [MountId::ROOT]);
}

#[test]
fn data_mount_scenario() {
    let conn = connector();
    conn.mount("/data", Arc::new(MemoryFileSystem::new("backend-a")), None)
        .unwrap();

    let node = conn.lookup_update(NodeId::ROOT, os("data"), true, 1).unwrap();
    assert_eq!(conn.lookup_count(node.node_id()).unwrap(), 1);

    conn.forget_update(node.node_id(), 1).unwrap();
    assert!(conn.inode(node.node_id()).is_ok());

    conn.unmount("/data").unwrap();
    assert!(matches!(conn.find_inode("/data"), Err(ConnectorError::NotFound(_))));
}

#[test]
fn notifications() {
    let conn = connector();
    let notifier = Arc::new(RecordingNotifier::new());
    conn.init(notifier.clone());
    let a = dir(&conn, NodeId::ROOT, "a");
    let f = file(&conn, a, "f");

    conn.file_notify("/a/f", 10, 20).unwrap();
    conn.entry_notify("/a", "gone").unwrap();
    conn.notify("/a/f").unwrap();
    conn.notify("/a/new/deeper").unwrap();
    assert!(matches!(conn.file_notify("/a/zzz", 0, 0), Err(ConnectorError::NotFound(_))));
    assert!(matches!(conn.entry_notify("/zzz", "x"), Err(ConnectorError::NotFound(_))));

    let sent = notifier.drain();
    assert_eq!(sent.len(), 4);
    assert!(matches!(&sent[0], Notification::Inode(n) if n.node_id == f && n.offset == 10 && n.length == 20));
    assert!(matches!(&sent[1], Notification::Entry(e) if e.parent == a && e.name == "gone"));
    assert!(matches!(&sent[2], Notification::Inode(n) if n.node_id == f && n.length == 0));
    assert!(matches!(&sent[3], Notification::Entry(e) if e.parent == a && e.name == "new"));
}

#[test]
fn notifier_errors_propagate() {
    struct Broken;
    impl graft_connector::KernelNotifier for Broken {
        fn inode_notify(&self, _: &graft_connector::NotifyInvalInode) -> std::io::Result<()> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }
        fn entry_notify(&self, _: &graft_connector::NotifyInvalEntry) -> std::io::Result<()> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }
    }

    let conn = connector();
    conn.init(Arc::new(Broken));
    let err = conn.notify("/").unwrap_err();
    assert!(matches!(err, ConnectorError::Io(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));
}

#[test]
fn concurrent_lookup_forget_balances() {
    let conn = connector_with(ConnectorConfig::default());
    let shared = dir(&conn, NodeId::ROOT, "shared");
    conn.mount("/shared/m", Arc::new(MemoryFileSystem::new("sub")), None)
        .unwrap();

    std::thread::scope(|s| {
        for t in 0..4 {
            let conn = &conn;
            s.spawn(move || {
                for i in 0..200 {
                    let name = format!("f{}", i % 8);
                    let node = conn.lookup_update(shared, OsStr::new(&name), false, 1).unwrap();
                    let m = conn.lookup_update(shared, os("m"), true, 1).unwrap();
                    let mine = conn
                        .lookup_update(m.node_id(), OsStr::new(&format!("t{t}")), true, 1)
                        .unwrap();
                    conn.find_inode(&format!("/shared/m/t{t}")).unwrap();
                    conn.forget_update(mine.node_id(), 1).unwrap();
                    conn.forget_update(m.node_id(), 1).unwrap();
                    conn.forget_update(node.node_id(), 1).unwrap();
                }
            });
        }
    });

    conn.check_tree().unwrap();
    let m = conn.find_inode("/shared/m").unwrap().node_id();
    assert_eq!(conn.lookup_count(m).unwrap(), 0);
    assert!(conn.children(m).unwrap().is_empty());
    let names: Vec<_> = conn.children(shared).unwrap().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, [os("m")]);
    // root, shared, mount root
    assert_eq!(conn.inode_count(), 3);
}

#[test]
fn open_files_survive_root_backend_swaps() {
    let conn = connector_with(ConnectorConfig::default());

    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 0..200 {
                let backend = Arc::new(MemoryFileSystem::new(format!("root{i}")));
                match conn.mount("/", backend, None) {
                    Ok(id) => assert_eq!(id, MountId::ROOT),
                    Err(ConnectorError::Busy(_)) => {}
                    Err(e) => panic!("unexpected mount error: {e}"),
                }
            }
        });
        for _ in 0..2 {
            s.spawn(|| {
                for _ in 0..200 {
                    let fh = conn.open_file(NodeId::ROOT, 0).unwrap();
                    conn.release_file(NodeId::ROOT, fh).unwrap();
                }
            });
        }
    });

    assert_eq!(conn.open_file_count(NodeId::ROOT).unwrap(), 0);
    assert_eq!(conn.list_mounts()[0].open_files, 0);
    conn.check_tree().unwrap();
}
