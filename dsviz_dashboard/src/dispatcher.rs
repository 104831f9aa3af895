use crate::config::HIGHLIGHT_TTL;
use crate::filter::FilterState;
use crate::render::{
    ListRenderer, Panel, QueueRenderer, StackRenderer, StructureRenderer, TreeLayout, TreeRenderer,
};
use dsviz_protocol::{StructureKind, StructureSnapshot};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const SLOTS: usize = 4;

/// Routes snapshots to the renderer for their type, owns the active filter and
/// the structure-list highlight deadlines. Rendered panels are cached per type
/// and only the affected type is re-rendered after an update.
pub struct ViewDispatcher {
    filter: FilterState,
    lists: ListRenderer,
    stacks: StackRenderer,
    queues: QueueRenderer,
    trees: TreeRenderer,
    routes: HashMap<String, StructureKind>,
    highlights: HashMap<String, Instant>,
    highlight_ttl: Duration,
    panels: [Option<Panel>; SLOTS],
}

impl Default for ViewDispatcher {
    fn default() -> Self {
        Self::new(FilterState::All, HIGHLIGHT_TTL)
    }
}

fn slot(kind: &StructureKind) -> Option<usize> {
    match kind {
        StructureKind::List => Some(0),
        StructureKind::Stack => Some(1),
        StructureKind::Queue => Some(2),
        StructureKind::BinaryTree => Some(3),
        StructureKind::Other(_) => None,
    }
}

impl ViewDispatcher {
    pub fn new(filter: FilterState, highlight_ttl: Duration) -> Self {
        Self::with_trees(filter, highlight_ttl, TreeRenderer::default())
    }

    pub fn with_layout(
        filter: FilterState,
        highlight_ttl: Duration,
        layout: Box<dyn TreeLayout + Send>,
    ) -> Self {
        Self::with_trees(filter, highlight_ttl, TreeRenderer::with_layout(layout))
    }

    fn with_trees(filter: FilterState, highlight_ttl: Duration, trees: TreeRenderer) -> Self {
        let mut views = Self {
            filter,
            lists: ListRenderer::default(),
            stacks: StackRenderer::default(),
            queues: QueueRenderer::default(),
            trees,
            routes: HashMap::new(),
            highlights: HashMap::new(),
            highlight_ttl,
            panels: Default::default(),
        };
        views.refresh_all();
        views
    }

    fn renderer(&self, kind: &StructureKind) -> Option<&dyn StructureRenderer> {
        match kind {
            StructureKind::List => Some(&self.lists),
            StructureKind::Stack => Some(&self.stacks),
            StructureKind::Queue => Some(&self.queues),
            StructureKind::BinaryTree => Some(&self.trees),
            StructureKind::Other(_) => None,
        }
    }

    fn renderer_mut(&mut self, kind: &StructureKind) -> Option<&mut dyn StructureRenderer> {
        match kind {
            StructureKind::List => Some(&mut self.lists),
            StructureKind::Stack => Some(&mut self.stacks),
            StructureKind::Queue => Some(&mut self.queues),
            StructureKind::BinaryTree => Some(&mut self.trees),
            StructureKind::Other(_) => None,
        }
    }

    fn refresh(&mut self, kind: &StructureKind) {
        let Some(i) = slot(kind) else { return };
        let panel = self.renderer(kind).and_then(|r| r.render(self.filter));
        self.panels[i] = panel;
    }

    fn refresh_all(&mut self) {
        for kind in StructureKind::KNOWN {
            self.refresh(&kind);
        }
    }

    /// Hands the snapshot to exactly one renderer. An id that changes type
    /// leaves its previous renderer first. Returns false when the new type has
    /// no renderer.
    pub fn update_snapshot(&mut self, snapshot: &StructureSnapshot) -> bool {
        if let Some(previous) = self.routes.get(&snapshot.id).cloned() {
            if previous != snapshot.kind {
                tracing::debug!(id = %snapshot.id, from = %previous, to = %snapshot.kind, "type changed");
                self.remove_data_structure(&snapshot.id, &previous);
                self.routes.remove(&snapshot.id);
            }
        }

        if self.renderer(&snapshot.kind).is_none() {
            tracing::info!(id = %snapshot.id, kind = %snapshot.kind, "no renderer for type, dropped");
            return false;
        }

        if let Some(r) = self.renderer_mut(&snapshot.kind) {
            r.update_data(snapshot);
        }
        self.routes.insert(snapshot.id.clone(), snapshot.kind.clone());
        self.refresh(&snapshot.kind);
        true
    }

    /// Removing an id the renderer does not hold is a no-op.
    pub fn remove_data_structure(&mut self, id: &str, kind: &StructureKind) -> bool {
        let removed = self
            .renderer_mut(kind)
            .map(|r| r.remove_data(id))
            .unwrap_or(false);
        if removed {
            if self.routes.get(id) == Some(kind) {
                self.routes.remove(id);
            }
            self.refresh(kind);
        }
        removed
    }

    /// Re-renders every type from its cache; no cache is touched.
    pub fn set_filter(&mut self, filter: FilterState) {
        self.filter = filter;
        self.refresh_all();
    }

    pub fn filter(&self) -> FilterState {
        self.filter
    }

    pub fn clear(&mut self) {
        self.lists.clear();
        self.stacks.clear();
        self.queues.clear();
        self.trees.clear();
        self.routes.clear();
        self.highlights.clear();
        self.refresh_all();
    }

    /// Visible panels in list, stack, queue, tree order.
    pub fn render(&self) -> Vec<&Panel> {
        self.panels.iter().flatten().collect()
    }

    /// Restarts the window if the id is already highlighted.
    pub fn highlight(&mut self, id: &str, now: Instant) {
        self.highlights.insert(id.to_string(), now + self.highlight_ttl);
    }

    pub fn is_highlighted(&self, id: &str, now: Instant) -> bool {
        self.highlights.get(id).is_some_and(|deadline| *deadline > now)
    }

    /// Drops every highlight whose deadline has passed, returning their ids.
    pub fn expire_highlights(&mut self, now: Instant) -> Vec<String> {
        let mut expired: Vec<String> = self
            .highlights
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.highlights.remove(id);
        }
        expired.sort();
        expired
    }

    pub fn cached_ids(&self, kind: &StructureKind) -> Vec<String> {
        self.renderer(kind)
            .map(|r| r.cache().ids().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
