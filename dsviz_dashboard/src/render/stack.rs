use super::{sequence, value_text, Block, SequenceStyle, SnapshotCache, StructureRenderer};
use dsviz_protocol::{StructureKind, StructurePayload, StructureSnapshot};

#[derive(Debug, Default)]
pub struct StackRenderer {
    cache: SnapshotCache,
}

impl StructureRenderer for StackRenderer {
    fn kind(&self) -> StructureKind {
        StructureKind::Stack
    }

    fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut SnapshotCache {
        &mut self.cache
    }

    fn nothing_to_display(&self) -> &'static str {
        "No stacks to display"
    }

    fn block(&self, snapshot: &StructureSnapshot) -> Block {
        let stack = match snapshot.payload() {
            StructurePayload::Stack(stack) => stack,
            _ => Default::default(),
        };
        let mut header = format!("Stack: {} (Size: {})", snapshot.id, stack.size);
        if let Some(top) = &stack.top {
            header.push_str(&format!(" | Top: {}", value_text(top)));
        }
        Block {
            id: snapshot.id.clone(),
            header,
            body: sequence(&stack.items, SequenceStyle::Stacked, "Empty stack"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::BlockBody;
    use serde_json::json;

    #[test]
    fn header_includes_top_when_present() {
        let r = StackRenderer::default();
        let block = r.block(&StructureSnapshot::new(
            "s1",
            StructureKind::Stack,
            json!({"items": [1, 2, 3], "size": 3, "top": 3}),
        ));
        assert_eq!(block.header, "Stack: s1 (Size: 3) | Top: 3");

        let empty = r.block(&StructureSnapshot::new(
            "s2",
            StructureKind::Stack,
            json!({"items": [], "size": 0}),
        ));
        assert_eq!(empty.header, "Stack: s2 (Size: 0)");
        assert_eq!(empty.body, BlockBody::Empty("Empty stack"));
    }
}
