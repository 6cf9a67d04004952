use std::collections::BTreeMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::kv::KvStore;
use crate::task::{ListKind, Task, TaskId};

const JOURNAL_KEY: &str = "journal";

/// One list replacement inside a [`TaskStore::commit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListWrite {
    pub list: ListKind,
    pub tasks: Vec<Task>,
}

impl ListWrite {
    pub fn new(list: ListKind, tasks: Vec<Task>) -> Self {
        Self { list, tasks }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Journal {
    writes: Vec<ListWrite>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub active: Vec<Task>,
    pub completed: Vec<Task>,
    pub trash: Vec<Task>,
}

impl Snapshot {
    pub fn list(&self, list: ListKind) -> &[Task] {
        match list {
            ListKind::Active => &self.active,
            ListKind::Completed => &self.completed,
            ListKind::Trash => &self.trash,
        }
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.locate(id).is_some()
    }

    pub fn locate(&self, id: &TaskId) -> Option<ListKind> {
        ListKind::ALL
            .into_iter()
            .find(|list| self.list(*list).iter().any(|task| &task.id == id))
    }

    /// Ids present more than once across (or within) the three lists.
    pub fn duplicate_ids(&self) -> Vec<TaskId> {
        let mut seen: BTreeMap<&TaskId, usize> = BTreeMap::new();
        for list in ListKind::ALL {
            for task in self.list(list) {
                *seen.entry(&task.id).or_default() += 1;
            }
        }
        seen.into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.active.len() + self.completed.len() + self.trash.len()
    }
}

/// Typed access to the three persisted task lists. Nothing else reads or
/// writes the list keys.
#[derive(Debug, Clone)]
pub struct TaskStore<K: KvStore> {
    kv: K,
}

impl<K: KvStore> TaskStore<K> {
    /// Wraps `kv` and replays any commit that was interrupted part-way.
    #[tracing::instrument(skip(kv))]
    pub fn open(kv: K) -> anyhow::Result<Self> {
        let store = Self { kv };
        store.replay_journal()?;

        let snapshot = store.snapshot()?;
        let duplicates = snapshot.duplicate_ids();
        if !duplicates.is_empty() {
            warn!(?duplicates, "task ids present in more than one slot");
        }
        info!(
            active = snapshot.active.len(),
            completed = snapshot.completed.len(),
            trash = snapshot.trash.len(),
            "opened task store"
        );
        Ok(store)
    }

    /// Malformed payloads load as an empty list.
    #[tracing::instrument(skip(self))]
    pub fn load(&self, list: ListKind) -> anyhow::Result<Vec<Task>> {
        let key = list.storage_key();
        let Some(raw) = self
            .kv
            .get(key)
            .with_context(|| format!("failed to load {key}"))?
        else {
            return Ok(vec![]);
        };

        match serde_json::from_str::<Option<Vec<Task>>>(&raw) {
            Ok(tasks) => {
                let tasks = tasks.unwrap_or_default();
                debug!(key, count = tasks.len(), "loaded list");
                Ok(tasks)
            }
            Err(err) => {
                warn!(key, error = %err, "stored list is malformed; treating as empty");
                Ok(vec![])
            }
        }
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn save(&self, list: ListKind, tasks: &[Task]) -> anyhow::Result<()> {
        let key = list.storage_key();
        let payload = serde_json::to_string(tasks)?;
        self.kv
            .set(key, &payload)
            .with_context(|| format!("failed to save {key}"))
    }

    /// Persists every write as one unit, in the order given.
    #[tracing::instrument(skip(self, writes), fields(writes = writes.len()))]
    pub fn commit(&self, writes: &[ListWrite]) -> anyhow::Result<()> {
        if let [single] = writes {
            return self.save(single.list, &single.tasks);
        }

        let journal = Journal {
            writes: writes.to_vec(),
        };
        self.kv
            .set(JOURNAL_KEY, &serde_json::to_string(&journal)?)
            .context("failed to write commit journal")?;

        self.apply(writes)?;

        self.kv
            .remove(JOURNAL_KEY)
            .context("failed to clear commit journal")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn snapshot(&self) -> anyhow::Result<Snapshot> {
        Ok(Snapshot {
            active: self.load(ListKind::Active)?,
            completed: self.load(ListKind::Completed)?,
            trash: self.load(ListKind::Trash)?,
        })
    }

    fn apply(&self, writes: &[ListWrite]) -> anyhow::Result<()> {
        for write in writes {
            self.save(write.list, &write.tasks)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn replay_journal(&self) -> anyhow::Result<()> {
        let Some(raw) = self.kv.get(JOURNAL_KEY)? else {
            return Ok(());
        };

        match serde_json::from_str::<Journal>(&raw) {
            Ok(journal) => {
                info!(writes = journal.writes.len(), "replaying interrupted commit");
                self.apply(&journal.writes)?;
            }
            Err(err) => {
                warn!(error = %err, "commit journal is malformed; discarding");
            }
        }

        self.kv.remove(JOURNAL_KEY)
    }
}
