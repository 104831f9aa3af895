use crate::render::value_text;
use dsviz_protocol::TreeNode;

/// Generic hierarchy handed to a layout. Children are ordered left then right;
/// absent children are skipped, so a node without children ends the recursion.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    pub label: String,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn from_tree(node: &TreeNode) -> Self {
        let children = [node.left.as_deref(), node.right.as_deref()]
            .into_iter()
            .flatten()
            .map(HierarchyNode::from_tree)
            .collect();
        Self {
            label: value_text(&node.value),
            children,
        }
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(HierarchyNode::count).sum::<usize>()
    }

    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedNode {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub depth: usize,
}

/// Output of a layout: nodes in pre-order plus parent -> child links as
/// indices into `nodes`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeDrawing {
    pub width: f64,
    pub height: f64,
    pub nodes: Vec<PlacedNode>,
    pub links: Vec<(usize, usize)>,
}

impl TreeDrawing {
    /// One line per depth, labels placed at their scaled x column.
    pub fn to_text(&self, cols: usize) -> Vec<String> {
        let cols = cols.max(1);
        let depth = self.nodes.iter().map(|n| n.depth).max().unwrap_or(0);
        let mut rows: Vec<Vec<char>> = vec![vec![' '; cols]; depth + 1];
        for node in &self.nodes {
            let frac = if self.width > 0.0 { node.x / self.width } else { 0.5 };
            let label: Vec<char> = node.label.chars().collect();
            let center = (frac * (cols - 1) as f64).round() as usize;
            let start = center
                .saturating_sub(label.len() / 2)
                .min(cols.saturating_sub(label.len()));
            let row = &mut rows[node.depth];
            for (offset, ch) in label.into_iter().enumerate() {
                if let Some(slot) = row.get_mut(start + offset) {
                    *slot = ch;
                }
            }
        }
        rows.into_iter()
            .map(|r| r.into_iter().collect::<String>().trim_end().to_string())
            .collect()
    }
}

/// Assigns 2-D coordinates to a hierarchy.
pub trait TreeLayout {
    fn layout(&self, root: &HierarchyNode) -> TreeDrawing;
}

/// Leaves take evenly spaced slots in left-to-right order, each parent sits
/// midway between its first and last child, depth maps linearly to y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayeredLayout {
    pub width: f64,
    pub height: f64,
}

impl Default for LayeredLayout {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 200.0,
        }
    }
}

impl LayeredLayout {
    fn place(
        node: &HierarchyNode,
        depth: usize,
        next_leaf: &mut usize,
        parent: Option<usize>,
        drawing: &mut TreeDrawing,
    ) -> f64 {
        let index = drawing.nodes.len();
        drawing.nodes.push(PlacedNode {
            label: node.label.clone(),
            x: 0.0,
            y: depth as f64,
            depth,
        });
        if let Some(parent) = parent {
            drawing.links.push((parent, index));
        }

        let slot = if node.children.is_empty() {
            let slot = *next_leaf as f64;
            *next_leaf += 1;
            slot
        } else {
            let xs: Vec<f64> = node
                .children
                .iter()
                .map(|child| Self::place(child, depth + 1, next_leaf, Some(index), drawing))
                .collect();
            let first = xs.first().copied().unwrap_or(0.0);
            let last = xs.last().copied().unwrap_or(first);
            (first + last) / 2.0
        };
        drawing.nodes[index].x = slot;
        slot
    }
}

impl TreeLayout for LayeredLayout {
    fn layout(&self, root: &HierarchyNode) -> TreeDrawing {
        let mut drawing = TreeDrawing {
            width: self.width,
            height: self.height,
            ..TreeDrawing::default()
        };
        let mut leaves = 0usize;
        Self::place(root, 0, &mut leaves, None, &mut drawing);

        let min_x = drawing.nodes.iter().map(|n| n.x).fold(f64::INFINITY, f64::min);
        let max_x = drawing.nodes.iter().map(|n| n.x).fold(f64::NEG_INFINITY, f64::max);
        let max_depth = root.depth();
        for node in &mut drawing.nodes {
            node.x = if max_x > min_x {
                (node.x - min_x) / (max_x - min_x) * self.width
            } else {
                self.width / 2.0
            };
            node.y = if max_depth > 0 {
                node.depth as f64 / max_depth as f64 * self.height
            } else {
                0.0
            };
        }
        drawing
    }
}
