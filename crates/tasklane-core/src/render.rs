use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::prefs::Theme;
use crate::task::{ListKind, TaskId};
use crate::view::{Entry, Gesture, ListView};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self { color: cfg.color()? })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, view), fields(list = %view.list()))]
    pub fn print_list(&self, header: &str, view: &ListView) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_list(&mut out, header, view)
    }

    pub fn write_list<W: Write>(
        &self,
        mut out: W,
        header: &str,
        view: &ListView,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(header, "1"))?;

        let mut rows = Vec::new();
        for entry in view.entries() {
            match entry {
                Entry::Task(task) => {
                    rows.push(vec![self.paint(task.id.as_str(), "33"), task.text.clone()]);
                }
                Entry::Placeholder(message) => {
                    writeln!(out, "{message}")?;
                }
            }
        }

        if !rows.is_empty() {
            write_table(&mut out, vec!["ID".to_string(), "Task".to_string()], rows)?;
        }
        Ok(())
    }

    pub fn print_options(&self, origin: ListKind, id: &TaskId, gestures: &[Gesture]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{id} ({origin}):")?;
        for gesture in gestures {
            writeln!(out, "  {gesture}")?;
        }
        Ok(())
    }

    pub fn print_theme(&self, theme: Theme) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "theme     {}", self.paint(theme.storage_value(), "36"))?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
