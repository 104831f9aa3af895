use super::{Block, BlockBody, HierarchyNode, LayeredLayout, SnapshotCache, StructureRenderer, TreeLayout};
use dsviz_protocol::{StructureKind, StructurePayload, StructureSnapshot};

pub struct TreeRenderer {
    cache: SnapshotCache,
    layout: Box<dyn TreeLayout + Send>,
}

impl Default for TreeRenderer {
    fn default() -> Self {
        Self::with_layout(Box::new(LayeredLayout::default()))
    }
}

impl std::fmt::Debug for TreeRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeRenderer")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl TreeRenderer {
    pub fn with_layout(layout: Box<dyn TreeLayout + Send>) -> Self {
        Self {
            cache: SnapshotCache::default(),
            layout,
        }
    }
}

impl StructureRenderer for TreeRenderer {
    fn kind(&self) -> StructureKind {
        StructureKind::BinaryTree
    }

    fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut SnapshotCache {
        &mut self.cache
    }

    fn nothing_to_display(&self) -> &'static str {
        "No trees to display"
    }

    fn block(&self, snapshot: &StructureSnapshot) -> Block {
        let tree = match snapshot.payload() {
            StructurePayload::BinaryTree(tree) => tree,
            _ => Default::default(),
        };
        let body = match &tree.root {
            None => BlockBody::Empty("Empty tree"),
            Some(root) => BlockBody::Tree(self.layout.layout(&HierarchyNode::from_tree(root))),
        };
        Block {
            id: snapshot.id.clone(),
            header: format!(
                "Binary Tree: {} (Size: {}, Height: {})",
                snapshot.id, tree.size, tree.height
            ),
            body,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::filter::FilterState;
    use crate::render::TreeDrawing;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Layout that records how often it was asked to place a hierarchy.
    #[derive(Clone, Default)]
    pub(crate) struct CountingLayout(pub Arc<AtomicUsize>);

    impl CountingLayout {
        pub(crate) fn calls(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl TreeLayout for CountingLayout {
        fn layout(&self, root: &HierarchyNode) -> TreeDrawing {
            self.0.fetch_add(1, Ordering::SeqCst);
            LayeredLayout::default().layout(root)
        }
    }

    pub(crate) fn tree(id: &str, root: serde_json::Value, size: u64) -> StructureSnapshot {
        let mut meta = serde_json::Map::new();
        meta.insert("height".into(), json!(if root.is_null() { 0 } else { 1 }));
        StructureSnapshot::new(
            id,
            StructureKind::BinaryTree,
            json!({"root": root, "size": size}),
        )
        .with_metadata(meta)
    }

    #[test]
    fn null_root_never_reaches_layout() {
        let counter = CountingLayout::default();
        let mut r = TreeRenderer::with_layout(Box::new(counter.clone()));
        r.update_data(&tree("t0", serde_json::Value::Null, 0));

        let panel = r.render(FilterState::All).unwrap();
        assert_eq!(panel.blocks[0].header, "Binary Tree: t0 (Size: 0, Height: 0)");
        assert_eq!(panel.blocks[0].body, BlockBody::Empty("Empty tree"));
        assert_eq!(counter.calls(), 0);
    }

    #[test]
    fn layout_runs_once_per_tree_per_render() {
        let counter = CountingLayout::default();
        let mut r = TreeRenderer::with_layout(Box::new(counter.clone()));
        r.update_data(&tree("a", json!({"value": 1}), 1));
        r.update_data(&tree("b", json!({"value": 2, "left": {"value": 1}}), 2));
        r.update_data(&tree("c", serde_json::Value::Null, 0));

        r.render(FilterState::BinaryTree);
        assert_eq!(counter.calls(), 2);
        r.render(FilterState::All);
        assert_eq!(counter.calls(), 4);
        assert!(r.render(FilterState::List).is_none());
        assert_eq!(counter.calls(), 4);
    }
}
