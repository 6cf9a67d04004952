//! Keeps the visible task lists in step with the persisted ones.
//!
//! `ViewSync` owns one [`ListView`] per mounted list. The Active list is
//! always mounted; Completed and Trash are mounted while their panel is
//! open. Every mutation persists first and then reconciles each mounted
//! view it touched, emitting [`ViewEvent`]s to subscribed observers. The
//! views hold no state the store does not also hold.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ids;
use crate::kv::KvStore;
use crate::lifecycle::{self, LifecycleError, Transition};
use crate::prefs::{PreferenceStore, Theme};
use crate::store::{ListWrite, TaskStore};
use crate::task::{ListKind, Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    Edit,
    Complete,
    Incomplete,
    ToTrash,
    Recover,
    Delete,
}

impl Gesture {
    /// The task menu for an entry rendered in `origin`.
    pub fn offered_in(origin: ListKind) -> &'static [Gesture] {
        match origin {
            ListKind::Active => &[Gesture::Edit, Gesture::Complete],
            ListKind::Completed => &[Gesture::Incomplete, Gesture::ToTrash],
            ListKind::Trash => &[Gesture::Recover, Gesture::Delete],
        }
    }

    pub fn transition(self) -> Option<Transition> {
        match self {
            Gesture::Edit => None,
            Gesture::Complete => Some(Transition::Complete),
            Gesture::Incomplete => Some(Transition::Incomplete),
            Gesture::ToTrash => Some(Transition::ToTrash),
            Gesture::Recover => Some(Transition::Recover),
            Gesture::Delete => Some(Transition::Delete),
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.transition() {
            Some(transition) => fmt::Display::fmt(&transition, f),
            None => f.write_str("edit"),
        }
    }
}

impl FromStr for Gesture {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edit" => Ok(Gesture::Edit),
            "complete" => Ok(Gesture::Complete),
            "incomplete" => Ok(Gesture::Incomplete),
            "to-trash" | "trash" => Ok(Gesture::ToTrash),
            "recover" => Ok(Gesture::Recover),
            "delete" => Ok(Gesture::Delete),
            other => Err(anyhow!("unknown gesture: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GestureError {
    #[error("{gesture} is not offered for tasks in {origin}")]
    NotOffered { gesture: Gesture, origin: ListKind },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Panel {
    Completed,
    Trash,
    Theme,
    NewTask,
    EditTask(TaskId),
}

impl Panel {
    pub fn list(&self) -> Option<ListKind> {
        match self {
            Panel::Completed => Some(ListKind::Completed),
            Panel::Trash => Some(ListKind::Trash),
            _ => None,
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            Panel::Completed => "Completed Tasks",
            Panel::Trash => "Trash",
            Panel::Theme => "Theme Selector",
            Panel::NewTask => "New Task",
            Panel::EditTask(_) => "Edit Task",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Task(Task),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Activated(Panel),
    Closed(Panel),
    Cleared(ListKind),
    EntryAppended { list: ListKind, task: Task },
    EntryRemoved { list: ListKind, id: TaskId },
    PlaceholderShown { list: ListKind, message: String },
    PlaceholderHidden { list: ListKind },
    ThemeApplied(Theme),
}

/// Visible entries of one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    list: ListKind,
    entries: Vec<Entry>,
}

impl ListView {
    pub fn new(list: ListKind) -> Self {
        Self {
            list,
            entries: vec![],
        }
    }

    pub fn list(&self) -> ListKind {
        self.list
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Task(task) => Some(task),
            Entry::Placeholder(_) => None,
        })
    }

    pub fn has_placeholder(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(entry, Entry::Placeholder(_)))
    }

    /// Clears the view and renders `persisted` in order.
    pub fn rebuild(&mut self, persisted: &[Task]) -> Vec<ViewEvent> {
        self.entries.clear();
        let mut events = vec![ViewEvent::Cleared(self.list)];
        for task in persisted {
            events.extend(self.push_task(task.clone()));
        }
        events.extend(self.sync_placeholder(persisted.is_empty()));
        events
    }

    /// Brings the view to exactly `persisted`, touching as few entries as
    /// possible. Falls back to [`ListView::rebuild`] when the surviving
    /// entries are not a prefix of `persisted`.
    pub fn reconcile(&mut self, persisted: &[Task]) -> Vec<ViewEvent> {
        let mut events = Vec::new();

        let stale: Vec<TaskId> = self
            .tasks()
            .filter(|task| !persisted.contains(task))
            .map(|task| task.id.clone())
            .collect();
        for id in stale {
            self.entries
                .retain(|entry| !matches!(entry, Entry::Task(task) if task.id == id));
            events.push(ViewEvent::EntryRemoved {
                list: self.list,
                id,
            });
        }

        let visible = self.tasks().count();
        let is_prefix = visible <= persisted.len()
            && self
                .tasks()
                .zip(persisted)
                .all(|(shown, stored)| shown == stored);
        if !is_prefix {
            debug!(list = %self.list, "visible order diverged; rebuilding");
            events.extend(self.rebuild(persisted));
            return events;
        }

        for task in &persisted[visible..] {
            events.extend(self.push_task(task.clone()));
        }
        events.extend(self.sync_placeholder(persisted.is_empty()));
        events
    }

    fn push_task(&mut self, task: Task) -> Vec<ViewEvent> {
        let mut events = self.sync_placeholder(false);
        self.entries.push(Entry::Task(task.clone()));
        events.push(ViewEvent::EntryAppended {
            list: self.list,
            task,
        });
        events
    }

    fn sync_placeholder(&mut self, empty: bool) -> Vec<ViewEvent> {
        match (empty, self.has_placeholder()) {
            (true, false) => {
                let message = self.list.empty_message();
                self.entries.push(Entry::Placeholder(message.clone()));
                vec![ViewEvent::PlaceholderShown {
                    list: self.list,
                    message,
                }]
            }
            (false, true) => {
                self.entries
                    .retain(|entry| !matches!(entry, Entry::Placeholder(_)));
                vec![ViewEvent::PlaceholderHidden { list: self.list }]
            }
            _ => vec![],
        }
    }
}

type Observer = Box<dyn FnMut(&ViewEvent)>;

pub struct ViewSync<K: KvStore> {
    store: TaskStore<K>,
    prefs: PreferenceStore<K>,
    active_view: ListView,
    panel: Option<Panel>,
    panel_view: Option<ListView>,
    observers: Vec<Observer>,
}

impl<K: KvStore + Clone> ViewSync<K> {
    /// Opens the task and preference stores over one medium.
    pub fn open(kv: K) -> anyhow::Result<Self> {
        let store = TaskStore::open(kv.clone())?;
        Self::new(store, PreferenceStore::new(kv))
    }
}

impl<K: KvStore> ViewSync<K> {
    #[tracing::instrument(skip_all)]
    pub fn new(store: TaskStore<K>, prefs: PreferenceStore<K>) -> anyhow::Result<Self> {
        let mut active_view = ListView::new(ListKind::Active);
        active_view.rebuild(&store.load(ListKind::Active)?);

        Ok(Self {
            store,
            prefs,
            active_view,
            panel: None,
            panel_view: None,
            observers: vec![],
        })
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&ViewEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn store(&self) -> &TaskStore<K> {
        &self.store
    }

    pub fn panel(&self) -> Option<&Panel> {
        self.panel.as_ref()
    }

    pub fn active_view(&self) -> &ListView {
        &self.active_view
    }

    /// The mounted view for `list`, if any.
    pub fn view(&self, list: ListKind) -> Option<&ListView> {
        if list == ListKind::Active {
            return Some(&self.active_view);
        }
        self.panel_view.as_ref().filter(|view| view.list() == list)
    }

    pub fn options_for(&self, origin: ListKind) -> &'static [Gesture] {
        Gesture::offered_in(origin)
    }

    /// The menu for one task, only when that task is in `origin`.
    pub fn options_for_task(&self, origin: ListKind, id: &TaskId) -> anyhow::Result<&'static [Gesture]> {
        self.require_in(origin, id)?;
        Ok(Gesture::offered_in(origin))
    }

    fn require_in(&self, list: ListKind, id: &TaskId) -> anyhow::Result<()> {
        if self.store.load(list)?.iter().any(|t| &t.id == id) {
            return Ok(());
        }
        Err(LifecycleError::NotFound {
            id: id.clone(),
            list,
        }
        .into())
    }

    pub fn list_active(&self) -> anyhow::Result<Vec<Task>> {
        self.store.load(ListKind::Active)
    }

    pub fn list_completed(&self) -> anyhow::Result<Vec<Task>> {
        self.store.load(ListKind::Completed)
    }

    pub fn list_trash(&self) -> anyhow::Result<Vec<Task>> {
        self.store.load(ListKind::Trash)
    }

    /// Opens `panel` in place of any open one. List panels are rebuilt from
    /// storage before `Activated` fires.
    #[tracing::instrument(skip(self))]
    pub fn open_panel(&mut self, panel: Panel) -> anyhow::Result<()> {
        if self.panel.is_some() {
            self.close_panel()?;
        }

        let mut events = Vec::new();
        self.panel_view = match panel.list() {
            Some(list) => {
                let mut view = ListView::new(list);
                events.extend(view.rebuild(&self.store.load(list)?));
                Some(view)
            }
            None => None,
        };
        self.panel = Some(panel.clone());
        events.push(ViewEvent::Activated(panel));

        info!(panel = ?self.panel, "panel opened");
        self.emit(events);
        Ok(())
    }

    /// Returns to the main view, rebuilding the Active list.
    #[tracing::instrument(skip(self))]
    pub fn close_panel(&mut self) -> anyhow::Result<()> {
        let mut events = Vec::new();
        if let Some(panel) = self.panel.take() {
            events.push(ViewEvent::Closed(panel));
        }
        self.panel_view = None;

        let persisted = self.store.load(ListKind::Active)?;
        events.extend(self.active_view.rebuild(&persisted));
        self.emit(events);
        Ok(())
    }

    /// Runs a menu gesture for a task rendered in `origin`.
    #[tracing::instrument(skip(self, id), fields(id = %id))]
    pub fn handle_gesture(
        &mut self,
        origin: ListKind,
        gesture: Gesture,
        id: &TaskId,
    ) -> anyhow::Result<()> {
        if !Gesture::offered_in(origin).contains(&gesture) {
            warn!(%gesture, %origin, "gesture not offered for origin");
            return Err(GestureError::NotOffered { gesture, origin }.into());
        }

        match gesture.transition() {
            Some(transition) => self.run(transition, id).map(|_| ()),
            None => {
                self.require_in(ListKind::Active, id)?;
                self.open_panel(Panel::EditTask(id.clone()))
            }
        }
    }

    /// Returns `None` when the text is blank; nothing is written then.
    #[tracing::instrument(skip(self, text))]
    pub fn create_task(&mut self, text: &str) -> anyhow::Result<Option<Task>> {
        let snapshot = self.store.snapshot()?;
        let id = ids::next_id(&snapshot);

        let (task, active) = match lifecycle::create(&snapshot.active, text, id) {
            Ok(created) => created,
            Err(LifecycleError::EmptyText) => {
                debug!("blank task text; nothing created");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        self.store.commit(&[ListWrite::new(ListKind::Active, active)])?;
        info!(id = %task.id, "task created");
        self.reconcile(ListKind::Active)?;
        Ok(Some(task))
    }

    /// Replaces the text of an Active task. Blank text declines like
    /// [`ViewSync::create_task`].
    #[tracing::instrument(skip(self, id, text), fields(id = %id))]
    pub fn edit_task(&mut self, id: &TaskId, text: &str) -> anyhow::Result<Option<Task>> {
        let active = self.store.load(ListKind::Active)?;
        let (task, active) = match lifecycle::edit(&active, id, text) {
            Ok(edited) => edited,
            Err(LifecycleError::EmptyText) => {
                debug!("blank task text; edit declined");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        self.store.commit(&[ListWrite::new(ListKind::Active, active)])?;
        info!("task edited");
        self.reconcile(ListKind::Active)?;
        Ok(Some(task))
    }

    pub fn complete(&mut self, id: &TaskId) -> anyhow::Result<Task> {
        self.run(Transition::Complete, id)
    }

    pub fn mark_incomplete(&mut self, id: &TaskId) -> anyhow::Result<Task> {
        self.run(Transition::Incomplete, id)
    }

    pub fn move_to_trash(&mut self, id: &TaskId) -> anyhow::Result<Task> {
        self.run(Transition::ToTrash, id)
    }

    pub fn recover(&mut self, id: &TaskId) -> anyhow::Result<Task> {
        self.run(Transition::Recover, id)
    }

    pub fn delete_forever(&mut self, id: &TaskId) -> anyhow::Result<Task> {
        self.run(Transition::Delete, id)
    }

    pub fn theme(&self) -> anyhow::Result<Theme> {
        self.prefs.theme()
    }

    /// Returns `false` when `theme` is already selected.
    #[tracing::instrument(skip(self))]
    pub fn select_theme(&mut self, theme: Theme) -> anyhow::Result<bool> {
        if self.prefs.theme()? == theme {
            return Ok(false);
        }
        self.prefs.set_theme(theme)?;
        self.emit(vec![ViewEvent::ThemeApplied(theme)]);
        Ok(true)
    }

    #[tracing::instrument(skip(self, id), fields(id = %id))]
    fn run(&mut self, transition: Transition, id: &TaskId) -> anyhow::Result<Task> {
        let snapshot = self.store.snapshot()?;
        let outcome = lifecycle::apply(transition, &snapshot, id)?;
        self.store.commit(&outcome.writes)?;
        info!(%transition, "transition committed");

        let affected: Vec<ListKind> = outcome.affected().collect();
        for list in affected {
            self.reconcile(list)?;
        }
        Ok(outcome.task)
    }

    fn reconcile(&mut self, list: ListKind) -> anyhow::Result<()> {
        let mounted = list == ListKind::Active
            || self.panel_view.as_ref().is_some_and(|view| view.list() == list);
        if !mounted {
            return Ok(());
        }

        let persisted = self.store.load(list)?;
        let view = if list == ListKind::Active {
            &mut self.active_view
        } else {
            match self.panel_view.as_mut() {
                Some(view) => view,
                None => return Ok(()),
            }
        };
        let events = view.reconcile(&persisted);
        self.emit(events);
        Ok(())
    }

    fn emit(&mut self, events: Vec<ViewEvent>) {
        for event in &events {
            for observer in self.observers.iter_mut() {
                observer(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Entry, Gesture, ListView, ViewEvent};
    use crate::task::{ListKind, Task, TaskId};

    fn task(text: &str, id: &str) -> Task {
        Task::new(text, TaskId::from(id))
    }

    #[test]
    fn menus_only_offer_gestures_whose_source_matches() {
        for origin in ListKind::ALL {
            for gesture in Gesture::offered_in(origin) {
                if let Some(transition) = gesture.transition() {
                    assert_eq!(transition.source(), origin);
                } else {
                    assert_eq!(origin, ListKind::Active);
                }
            }
        }
        assert!(!Gesture::offered_in(ListKind::Active).contains(&Gesture::ToTrash));
        assert!(!Gesture::offered_in(ListKind::Trash).contains(&Gesture::Incomplete));
    }

    #[test]
    fn rebuild_of_empty_list_shows_placeholder() {
        let mut view = ListView::new(ListKind::Trash);
        let events = view.rebuild(&[]);
        assert_eq!(
            events,
            vec![
                ViewEvent::Cleared(ListKind::Trash),
                ViewEvent::PlaceholderShown {
                    list: ListKind::Trash,
                    message: "No tasks in Trash.".to_string(),
                },
            ]
        );
        assert_eq!(
            view.entries(),
            &[Entry::Placeholder("No tasks in Trash.".to_string())]
        );
    }

    #[test]
    fn reconcile_appends_and_removes_incrementally() {
        let mut view = ListView::new(ListKind::Active);
        view.rebuild(&[]);

        let events = view.reconcile(&[task("a", "1")]);
        assert_eq!(
            events,
            vec![
                ViewEvent::PlaceholderHidden {
                    list: ListKind::Active
                },
                ViewEvent::EntryAppended {
                    list: ListKind::Active,
                    task: task("a", "1"),
                },
            ]
        );

        view.reconcile(&[task("a", "1"), task("b", "2")]);
        let events = view.reconcile(&[task("b", "2")]);
        assert_eq!(
            events,
            vec![ViewEvent::EntryRemoved {
                list: ListKind::Active,
                id: TaskId::from("1"),
            }]
        );
        assert_eq!(view.tasks().cloned().collect::<Vec<_>>(), vec![task("b", "2")]);
        assert!(view.reconcile(&[task("b", "2")]).is_empty());
    }

    #[test]
    fn reconcile_rebuilds_when_order_diverges() {
        let mut view = ListView::new(ListKind::Completed);
        view.rebuild(&[task("a", "1"), task("b", "2")]);

        let events = view.reconcile(&[task("b", "2"), task("a", "1")]);
        assert_eq!(events.first(), Some(&ViewEvent::Cleared(ListKind::Completed)));
        assert_eq!(
            view.tasks().cloned().collect::<Vec<_>>(),
            vec![task("b", "2"), task("a", "1")]
        );
    }

    #[test]
    fn emptied_list_gets_placeholder_back() {
        let mut view = ListView::new(ListKind::Trash);
        view.rebuild(&[task("a", "1")]);
        let events = view.reconcile(&[]);
        assert_eq!(
            events,
            vec![
                ViewEvent::EntryRemoved {
                    list: ListKind::Trash,
                    id: TaskId::from("1"),
                },
                ViewEvent::PlaceholderShown {
                    list: ListKind::Trash,
                    message: "No tasks in Trash.".to_string(),
                },
            ]
        );
    }
}
