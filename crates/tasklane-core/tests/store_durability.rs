use std::fs;

use tasklane_core::kv::{FileKv, KvStore};
use tasklane_core::lifecycle::{Transition, apply};
use tasklane_core::store::{ListWrite, TaskStore};
use tasklane_core::task::{ListKind, Task, TaskId};
use tasklane_core::view::ViewSync;
use tempfile::tempdir;

fn task(text: &str, id: &str) -> Task {
    Task::new(text, TaskId::from(id))
}

#[test]
fn save_then_load_round_trips_on_disk() {
    let temp = tempdir().expect("tempdir");
    let kv = FileKv::open(temp.path()).expect("open kv");
    let store = TaskStore::open(kv.clone()).expect("open store");

    let tasks = vec![task("Buy milk", "1"), task("Call \"mum\" ☎", "12691995342")];
    store.save(ListKind::Completed, &tasks).expect("save");

    let reopened = TaskStore::open(FileKv::open(temp.path()).expect("reopen kv")).expect("reopen");
    assert_eq!(reopened.load(ListKind::Completed).expect("load"), tasks);
    assert_eq!(reopened.load(ListKind::Trash).expect("load"), vec![]);
    assert_eq!(kv.path_for("completed"), temp.path().join("completed.json"));
    assert!(kv.path_for("completed").exists());
}

#[test]
fn reads_payloads_written_by_the_browser_build() {
    let temp = tempdir().expect("tempdir");
    let kv = FileKv::open(temp.path()).expect("open kv");
    kv.set("todos", r#"[{"text":"Buy milk","id":"1269199530"}]"#)
        .expect("seed");
    kv.set("trash", "null").expect("seed");

    let store = TaskStore::open(kv).expect("open store");
    assert_eq!(
        store.load(ListKind::Active).expect("load"),
        vec![task("Buy milk", "1269199530")]
    );
    assert_eq!(store.load(ListKind::Trash).expect("load"), vec![]);
}

#[test]
fn malformed_payloads_load_as_empty() {
    let temp = tempdir().expect("tempdir");
    let kv = FileKv::open(temp.path()).expect("open kv");
    kv.set("todos", "{not json").expect("seed");
    kv.set("completed", r#"{"text":"not a list","id":"1"}"#)
        .expect("seed");
    kv.set("trash", r#"[{"text":"missing id"}, null]"#)
        .expect("seed");

    let store = TaskStore::open(kv.clone()).expect("open store");
    for list in ListKind::ALL {
        assert_eq!(store.load(list).expect("load"), vec![], "{list}");
    }

    let mut sync = ViewSync::open(kv).expect("open view sync");
    let created = sync
        .create_task("Fresh start")
        .expect("create")
        .expect("created");
    assert_eq!(sync.list_active().expect("list"), vec![created]);
}

#[test]
fn interrupted_commit_is_replayed_on_open() {
    let temp = tempdir().expect("tempdir");
    let kv = FileKv::open(temp.path()).expect("open kv");
    let store = TaskStore::open(kv.clone()).expect("open store");

    let t1 = task("Buy milk", "1");
    store.save(ListKind::Active, &[t1.clone()]).expect("seed");

    let outcome = apply(
        Transition::Complete,
        &store.snapshot().expect("snapshot"),
        &t1.id,
    )
    .expect("plan");

    // Simulate a crash after the journal and the first list write.
    let journal = serde_json::json!({ "writes": outcome.writes });
    kv.set("journal", &journal.to_string()).expect("journal");
    store
        .save(outcome.writes[0].list, &outcome.writes[0].tasks)
        .expect("first write");

    let before_replay = store.snapshot().expect("snapshot");
    assert_eq!(before_replay.duplicate_ids(), vec![t1.id.clone()]);

    let recovered = TaskStore::open(kv.clone()).expect("reopen");
    let after = recovered.snapshot().expect("snapshot");
    assert!(after.active.is_empty());
    assert_eq!(after.completed, vec![t1]);
    assert!(after.duplicate_ids().is_empty());
    assert_eq!(kv.get("journal").expect("get"), None);
}

#[test]
fn commit_leaves_no_journal_behind() {
    let temp = tempdir().expect("tempdir");
    let kv = FileKv::open(temp.path()).expect("open kv");
    let store = TaskStore::open(kv.clone()).expect("open store");

    store
        .commit(&[
            ListWrite::new(ListKind::Trash, vec![task("old", "1")]),
            ListWrite::new(ListKind::Completed, vec![]),
        ])
        .expect("commit");

    assert_eq!(kv.get("journal").expect("get"), None);
    assert_eq!(store.load(ListKind::Trash).expect("load"), vec![task("old", "1")]);

    let leftovers: Vec<String> = fs::read_dir(temp.path())
        .expect("read dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| !name.ends_with(".json"))
        .collect();
    assert!(leftovers.is_empty(), "stray files: {leftovers:?}");
}

#[test]
fn malformed_journal_is_discarded() {
    let temp = tempdir().expect("tempdir");
    let kv = FileKv::open(temp.path()).expect("open kv");
    kv.set("journal", "garbage").expect("seed");

    let store = TaskStore::open(kv.clone()).expect("open store");
    assert_eq!(kv.get("journal").expect("get"), None);
    assert_eq!(store.snapshot().expect("snapshot").total(), 0);
}
