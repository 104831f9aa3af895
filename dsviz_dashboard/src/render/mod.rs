//! Per-type presentation. Each renderer keeps its own id -> snapshot cache,
//! fed only through `update_data` / `remove_data`, and otherwise renders as a
//! pure function of that cache and the active filter.

pub mod layout;
pub mod list;
pub mod queue;
pub mod stack;
pub mod tree;

use crate::filter::FilterState;
use dsviz_protocol::{StructureKind, StructureSnapshot};
use serde_json::Value;
use std::collections::BTreeMap;

pub use layout::{HierarchyNode, LayeredLayout, PlacedNode, TreeDrawing, TreeLayout};
pub use list::ListRenderer;
pub use queue::QueueRenderer;
pub use stack::StackRenderer;
pub use tree::TreeRenderer;

/// Text for an item value: strings bare, everything else as JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotCache {
    entries: BTreeMap<String, StructureSnapshot>,
}

impl SnapshotCache {
    pub fn insert(&mut self, snapshot: &StructureSnapshot) {
        self.entries.insert(snapshot.id.clone(), snapshot.clone());
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StructureSnapshot> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStyle {
    /// Left to right with indices.
    Indexed,
    /// Top of the stack first.
    Stacked,
    /// Front on the left, rear on the right.
    Queued,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockBody {
    Sequence {
        items: Vec<String>,
        style: SequenceStyle,
    },
    Tree(TreeDrawing),
    Empty(&'static str),
}

/// Rendered view of one structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: String,
    pub header: String,
    pub body: BlockBody,
}

/// Everything one renderer contributes to the visualization container.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub kind: StructureKind,
    pub blocks: Vec<Block>,
    /// Shown instead of blocks when the filter selects this type alone and
    /// there is nothing cached.
    pub placeholder: Option<&'static str>,
}

pub trait StructureRenderer {
    fn kind(&self) -> StructureKind;

    fn cache(&self) -> &SnapshotCache;

    fn cache_mut(&mut self) -> &mut SnapshotCache;

    fn block(&self, snapshot: &StructureSnapshot) -> Block;

    fn nothing_to_display(&self) -> &'static str;

    fn update_data(&mut self, snapshot: &StructureSnapshot) {
        self.cache_mut().insert(snapshot);
    }

    /// Removing an id that is not cached is a no-op.
    fn remove_data(&mut self, id: &str) -> bool {
        self.cache_mut().remove(id)
    }

    fn clear(&mut self) {
        self.cache_mut().clear();
    }

    /// `None` when the filter excludes this renderer's type.
    fn render(&self, filter: FilterState) -> Option<Panel> {
        let kind = self.kind();
        if !filter.admits(&kind) {
            return None;
        }
        let blocks: Vec<Block> = self.cache().iter().map(|s| self.block(s)).collect();
        let placeholder =
            (blocks.is_empty() && filter.selects_only(&kind)).then(|| self.nothing_to_display());
        Some(Panel {
            kind,
            blocks,
            placeholder,
        })
    }
}

fn sequence(items: &[Value], style: SequenceStyle, empty: &'static str) -> BlockBody {
    if items.is_empty() {
        return BlockBody::Empty(empty);
    }
    BlockBody::Sequence {
        items: items.iter().map(value_text).collect(),
        style,
    }
}
