use tracing::{debug, info, instrument};

use crate::cli::Command;
use crate::config::Config;
use crate::kv::KvStore;
use crate::render::Renderer;
use crate::task::{ListKind, TaskId};
use crate::view::{Gesture, Panel, ViewSync};

#[instrument(skip(sync, cfg, renderer))]
pub fn dispatch<K: KvStore>(
    sync: &mut ViewSync<K>,
    cfg: &Config,
    renderer: &Renderer,
    command: Option<Command>,
) -> anyhow::Result<()> {
    sync.subscribe(|event| debug!(?event, "view event"));

    let command = match command {
        Some(command) => command,
        None => Command::List {
            list: Some(cfg.default_list()?),
        },
    };

    match command {
        Command::Add { text } => cmd_add(sync, renderer, &text.join(" ")),
        Command::List { list } => {
            let list = match list {
                Some(list) => list,
                None => cfg.default_list()?,
            };
            show_list(sync, renderer, list)
        }
        Command::Complete { id } => cmd_gesture(sync, renderer, ListKind::Active, Gesture::Complete, id),
        Command::Incomplete { id } => {
            cmd_gesture(sync, renderer, ListKind::Completed, Gesture::Incomplete, id)
        }
        Command::Trash { id } => cmd_gesture(sync, renderer, ListKind::Completed, Gesture::ToTrash, id),
        Command::Recover { id } => cmd_gesture(sync, renderer, ListKind::Trash, Gesture::Recover, id),
        Command::Delete { id } => cmd_gesture(sync, renderer, ListKind::Trash, Gesture::Delete, id),
        Command::Edit { id, text } => cmd_edit(sync, renderer, TaskId::new(id), &text.join(" ")),
        Command::Options { list, id } => {
            let id = TaskId::new(id);
            renderer.print_options(list, &id, sync.options_for_task(list, &id)?)
        }
        Command::Theme { theme } => cmd_theme(sync, renderer, theme),
    }
}

fn cmd_add<K: KvStore>(sync: &mut ViewSync<K>, renderer: &Renderer, text: &str) -> anyhow::Result<()> {
    info!("command add");
    match sync.create_task(text)? {
        Some(task) => println!("Created task {}.", task.id),
        None => println!("Nothing to add."),
    }
    show_list(sync, renderer, ListKind::Active)
}

fn cmd_gesture<K: KvStore>(
    sync: &mut ViewSync<K>,
    renderer: &Renderer,
    origin: ListKind,
    gesture: Gesture,
    id: String,
) -> anyhow::Result<()> {
    info!(%gesture, "command gesture");
    if let Some(panel) = panel_for(origin) {
        sync.open_panel(panel)?;
    }
    sync.handle_gesture(origin, gesture, &TaskId::new(id))?;
    show_list(sync, renderer, origin)
}

fn cmd_edit<K: KvStore>(
    sync: &mut ViewSync<K>,
    renderer: &Renderer,
    id: TaskId,
    text: &str,
) -> anyhow::Result<()> {
    info!("command edit");
    sync.handle_gesture(ListKind::Active, Gesture::Edit, &id)?;
    if sync.edit_task(&id, text)?.is_none() {
        println!("Task text cannot be empty; nothing changed.");
    }
    sync.close_panel()?;
    show_list(sync, renderer, ListKind::Active)
}

fn cmd_theme<K: KvStore>(
    sync: &mut ViewSync<K>,
    renderer: &Renderer,
    theme: Option<crate::prefs::Theme>,
) -> anyhow::Result<()> {
    if let Some(theme) = theme {
        sync.open_panel(Panel::Theme)?;
        if !sync.select_theme(theme)? {
            debug!(%theme, "theme already selected");
        }
        sync.close_panel()?;
    }
    renderer.print_theme(sync.theme()?)
}

fn show_list<K: KvStore>(sync: &mut ViewSync<K>, renderer: &Renderer, list: ListKind) -> anyhow::Result<()> {
    match panel_for(list) {
        Some(panel) => {
            if sync.panel() != Some(&panel) {
                sync.open_panel(panel.clone())?;
            }
            let view = sync
                .view(list)
                .ok_or_else(|| anyhow::anyhow!("{list} view is not mounted"))?;
            renderer.print_list(panel.header(), view)
        }
        None => renderer.print_list(ListKind::Active.label(), sync.active_view()),
    }
}

fn panel_for(list: ListKind) -> Option<Panel> {
    match list {
        ListKind::Active => None,
        ListKind::Completed => Some(Panel::Completed),
        ListKind::Trash => Some(Panel::Trash),
    }
}
