use super::{sequence, Block, SequenceStyle, SnapshotCache, StructureRenderer};
use dsviz_protocol::{StructureKind, StructurePayload, StructureSnapshot};

#[derive(Debug, Default)]
pub struct ListRenderer {
    cache: SnapshotCache,
}

impl StructureRenderer for ListRenderer {
    fn kind(&self) -> StructureKind {
        StructureKind::List
    }

    fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut SnapshotCache {
        &mut self.cache
    }

    fn nothing_to_display(&self) -> &'static str {
        "No lists to display"
    }

    fn block(&self, snapshot: &StructureSnapshot) -> Block {
        let list = match snapshot.payload() {
            StructurePayload::List(list) => list,
            _ => Default::default(),
        };
        Block {
            id: snapshot.id.clone(),
            header: format!("List: {} (Length: {})", snapshot.id, list.length),
            body: sequence(&list.items, SequenceStyle::Indexed, "Empty list"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::BlockBody;
    use serde_json::json;

    #[test]
    fn renders_items_in_order() {
        let r = ListRenderer::default();
        let block = r.block(&StructureSnapshot::new(
            "l1",
            StructureKind::List,
            json!({"items": ["a", 2], "length": 2}),
        ));
        assert_eq!(block.header, "List: l1 (Length: 2)");
        assert_eq!(
            block.body,
            BlockBody::Sequence {
                items: vec!["a".into(), "2".into()],
                style: SequenceStyle::Indexed
            }
        );
    }

    #[test]
    fn empty_list() {
        let r = ListRenderer::default();
        let block = r.block(&StructureSnapshot::new("l1", StructureKind::List, json!({})));
        assert_eq!(block.header, "List: l1 (Length: 0)");
        assert_eq!(block.body, BlockBody::Empty("Empty list"));
    }
}
