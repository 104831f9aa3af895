use crate::filter::FilterState;
use crate::render::{Block, BlockBody, Panel, SequenceStyle};
use crate::status::StatusView;
use crate::store::{LogEntry, StructureSummary};
use std::fmt::{self, Write as _};

const TREE_COLUMNS: usize = 60;

/// One frame of the terminal dashboard.
#[derive(Debug, Clone)]
pub struct Screen<'a> {
    pub status: StatusView,
    pub filter: FilterState,
    /// Rows with their highlight flag.
    pub structures: Vec<(StructureSummary, bool)>,
    /// Rows with their recent flag.
    pub log: Vec<(LogEntry, bool)>,
    pub panels: Vec<&'a Panel>,
}

impl fmt::Display for Screen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dsviz  [{}]", self.status.text)?;
        if self.status.reconnect_enabled {
            f.write_str("  (type `reconnect` to retry)")?;
        }
        writeln!(f)?;

        f.write_str("Filter:")?;
        for choice in FilterState::ALL {
            if choice == self.filter {
                write!(f, " [{choice}]")?;
            } else {
                write!(f, " {choice}")?;
            }
        }
        writeln!(f)?;

        writeln!(f, "\nStructures")?;
        if self.structures.is_empty() {
            writeln!(f, "  No data structures")?;
        }
        for (row, highlighted) in &self.structures {
            let mark = if *highlighted { '*' } else { ' ' };
            writeln!(f, "{mark} {:<12} {:<12} {}", row.id, row.type_label, row.size_text)?;
        }

        writeln!(f, "\nOperations")?;
        if self.log.is_empty() {
            writeln!(f, "  No operations yet")?;
        }
        for (entry, recent) in &self.log {
            let mark = if *recent { '+' } else { ' ' };
            write!(f, "{mark} {:<10} {} {}", entry.op_type, entry.time_text(), entry.target)?;
            if let Some(params) = &entry.params_text {
                write!(f, "  {params}")?;
            }
            writeln!(f)?;
        }

        writeln!(f)?;
        if let Some(placeholder) = self.status.placeholder {
            return writeln!(f, "{placeholder}");
        }
        for panel in &self.panels {
            if let Some(placeholder) = panel.placeholder {
                writeln!(f, "{placeholder}")?;
            }
            for block in &panel.blocks {
                f.write_str(&block_text(block))?;
            }
        }
        Ok(())
    }
}

pub fn block_text(block: &Block) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", block.header);
    match &block.body {
        BlockBody::Empty(text) => {
            let _ = writeln!(out, "  {text}");
        }
        BlockBody::Sequence { items, style } => {
            let line = match style {
                SequenceStyle::Indexed => items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| format!("{i}:{item}"))
                    .collect::<Vec<_>>()
                    .join("  "),
                SequenceStyle::Stacked => items
                    .iter()
                    .rev()
                    .map(|item| format!("[{item}]"))
                    .collect::<Vec<_>>()
                    .join(" "),
                SequenceStyle::Queued => format!("front > {} > rear", items.join(" | ")),
            };
            let _ = writeln!(out, "  {line}");
        }
        BlockBody::Tree(drawing) => {
            for line in drawing.to_text(TREE_COLUMNS) {
                let _ = writeln!(out, "  {line}");
            }
        }
    }
    out
}
