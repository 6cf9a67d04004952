//! Legal list transitions and their effect on list contents.
//!
//! ```text
//! Active ──complete──▶ Completed
//! Completed ──incomplete──▶ Active
//! Completed ──to-trash──▶ Trash
//! Trash ──recover──▶ Completed
//! Trash ──delete──▶ (destroyed)
//! ```
//!
//! Everything here is pure: functions take the current list contents and
//! return the replacement contents plus the order they must be written in.
//! A failed precondition returns an error and produces no writes.

use std::fmt;

use thiserror::Error;

use crate::store::{ListWrite, Snapshot};
use crate::task::{ListKind, Task, TaskId, normalize_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Complete,
    Incomplete,
    ToTrash,
    Recover,
    Delete,
}

impl Transition {
    pub const ALL: [Transition; 5] = [
        Transition::Complete,
        Transition::Incomplete,
        Transition::ToTrash,
        Transition::Recover,
        Transition::Delete,
    ];

    pub fn source(self) -> ListKind {
        match self {
            Transition::Complete => ListKind::Active,
            Transition::Incomplete | Transition::ToTrash => ListKind::Completed,
            Transition::Recover | Transition::Delete => ListKind::Trash,
        }
    }

    /// `None` for `Delete`: the task leaves the model.
    pub fn destination(self) -> Option<ListKind> {
        match self {
            Transition::Complete | Transition::Recover => Some(ListKind::Completed),
            Transition::Incomplete => Some(ListKind::Active),
            Transition::ToTrash => Some(ListKind::Trash),
            Transition::Delete => None,
        }
    }

    pub fn between(source: ListKind, destination: ListKind) -> Option<Transition> {
        Transition::ALL
            .into_iter()
            .find(|t| t.source() == source && t.destination() == Some(destination))
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Transition::Complete => "complete",
            Transition::Incomplete => "incomplete",
            Transition::ToTrash => "to-trash",
            Transition::Recover => "recover",
            Transition::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("task {id} not found in {list}")]
    NotFound { id: TaskId, list: ListKind },

    #[error("no transition from {source_list} to {destination}")]
    IllegalTransition {
        source_list: ListKind,
        destination: ListKind,
    },

    #[error("task text is empty")]
    EmptyText,
}

/// Result of a transition: the moved task and the lists to persist, in
/// write order (destination first, then source).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub transition: Transition,
    pub task: Task,
    pub writes: Vec<ListWrite>,
}

impl Outcome {
    pub fn affected(&self) -> impl Iterator<Item = ListKind> + '_ {
        self.writes.iter().map(|write| write.list)
    }
}

/// Removes `id` from `source`, keeping the order of the rest.
pub fn take_task(
    source: &[Task],
    list: ListKind,
    id: &TaskId,
) -> Result<(Task, Vec<Task>), LifecycleError> {
    let idx = source
        .iter()
        .position(|task| &task.id == id)
        .ok_or_else(|| LifecycleError::NotFound {
            id: id.clone(),
            list,
        })?;

    let mut remaining = source.to_vec();
    let task = remaining.remove(idx);
    Ok((task, remaining))
}

#[tracing::instrument(skip(snapshot, id), fields(id = %id))]
pub fn apply(
    transition: Transition,
    snapshot: &Snapshot,
    id: &TaskId,
) -> Result<Outcome, LifecycleError> {
    let source = transition.source();
    let (task, remaining) = take_task(snapshot.list(source), source, id)?;

    let mut writes = Vec::with_capacity(2);
    if let Some(destination) = transition.destination() {
        let mut grown = snapshot.list(destination).to_vec();
        grown.push(task.clone());
        writes.push(ListWrite::new(destination, grown));
    }
    writes.push(ListWrite::new(source, remaining));

    tracing::debug!(%transition, "planned transition");
    Ok(Outcome {
        transition,
        task,
        writes,
    })
}

/// Moves `id` from `source` to `destination` if that edge exists.
pub fn move_between(
    snapshot: &Snapshot,
    source: ListKind,
    destination: ListKind,
    id: &TaskId,
) -> Result<Outcome, LifecycleError> {
    let transition = Transition::between(source, destination).ok_or(
        LifecycleError::IllegalTransition {
            source_list: source,
            destination,
        },
    )?;
    apply(transition, snapshot, id)
}

/// Appends a new task to Active. The caller supplies a free id.
pub fn create(active: &[Task], raw_text: &str, id: TaskId) -> Result<(Task, Vec<Task>), LifecycleError> {
    let text = normalize_text(raw_text).ok_or(LifecycleError::EmptyText)?;
    let task = Task::new(text, id);
    let mut grown = active.to_vec();
    grown.push(task.clone());
    Ok((task, grown))
}

/// Replaces the text of an Active task in place; id and position are kept.
pub fn edit(active: &[Task], id: &TaskId, raw_text: &str) -> Result<(Task, Vec<Task>), LifecycleError> {
    let text = normalize_text(raw_text).ok_or(LifecycleError::EmptyText)?;
    let mut updated = active.to_vec();
    let task = updated
        .iter_mut()
        .find(|task| &task.id == id)
        .ok_or_else(|| LifecycleError::NotFound {
            id: id.clone(),
            list: ListKind::Active,
        })?;
    task.text = text;
    let edited = task.clone();
    Ok((edited, updated))
}

#[cfg(test)]
mod tests {
    use super::{LifecycleError, Transition, apply, create, edit, move_between};
    use crate::store::{ListWrite, Snapshot};
    use crate::task::{ListKind, Task, TaskId};

    fn task(text: &str, id: &str) -> Task {
        Task::new(text, TaskId::from(id))
    }

    #[test]
    fn edges_match_the_state_machine() {
        assert_eq!(
            Transition::between(ListKind::Active, ListKind::Completed),
            Some(Transition::Complete)
        );
        assert_eq!(
            Transition::between(ListKind::Trash, ListKind::Completed),
            Some(Transition::Recover)
        );
        assert_eq!(Transition::between(ListKind::Active, ListKind::Trash), None);
        assert_eq!(Transition::between(ListKind::Trash, ListKind::Active), None);
        assert_eq!(Transition::Delete.destination(), None);
    }

    #[test]
    fn complete_writes_destination_then_source() {
        let snapshot = Snapshot {
            active: vec![task("a", "1"), task("b", "2"), task("c", "3")],
            completed: vec![task("z", "9")],
            trash: vec![],
        };

        let outcome = apply(Transition::Complete, &snapshot, &TaskId::from("2")).expect("apply");
        assert_eq!(outcome.task, task("b", "2"));
        assert_eq!(
            outcome.writes,
            vec![
                ListWrite::new(ListKind::Completed, vec![task("z", "9"), task("b", "2")]),
                ListWrite::new(ListKind::Active, vec![task("a", "1"), task("c", "3")]),
            ]
        );
    }

    #[test]
    fn delete_only_writes_trash() {
        let snapshot = Snapshot {
            trash: vec![task("a", "1")],
            ..Snapshot::default()
        };
        let outcome = apply(Transition::Delete, &snapshot, &TaskId::from("1")).expect("apply");
        assert_eq!(outcome.writes, vec![ListWrite::new(ListKind::Trash, vec![])]);
    }

    #[test]
    fn missing_task_is_not_found() {
        let snapshot = Snapshot {
            active: vec![task("a", "1")],
            ..Snapshot::default()
        };
        let err = apply(Transition::Incomplete, &snapshot, &TaskId::from("1")).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::NotFound {
                id: TaskId::from("1"),
                list: ListKind::Completed,
            }
        );
    }

    #[test]
    fn illegal_edge_is_rejected() {
        let snapshot = Snapshot {
            active: vec![task("a", "1")],
            ..Snapshot::default()
        };
        let err = move_between(&snapshot, ListKind::Active, ListKind::Trash, &TaskId::from("1"))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::IllegalTransition { .. }));
    }

    #[test]
    fn create_and_edit_validate_text() {
        assert_eq!(
            create(&[], "   ", TaskId::from("1")).unwrap_err(),
            LifecycleError::EmptyText
        );

        let (created, active) = create(&[], " Buy\nmilk ", TaskId::from("1")).expect("create");
        assert_eq!(created.text, "Buy milk");

        let (edited, active) = edit(&active, &TaskId::from("1"), "Buy oat milk").expect("edit");
        assert_eq!(edited, task("Buy oat milk", "1"));
        assert_eq!(active, vec![task("Buy oat milk", "1")]);
        assert_eq!(
            edit(&active, &TaskId::from("1"), "\n").unwrap_err(),
            LifecycleError::EmptyText
        );
    }
}
