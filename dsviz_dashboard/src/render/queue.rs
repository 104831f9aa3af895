use super::{sequence, value_text, Block, SequenceStyle, SnapshotCache, StructureRenderer};
use dsviz_protocol::{StructureKind, StructurePayload, StructureSnapshot};

#[derive(Debug, Default)]
pub struct QueueRenderer {
    cache: SnapshotCache,
}

impl StructureRenderer for QueueRenderer {
    fn kind(&self) -> StructureKind {
        StructureKind::Queue
    }

    fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut SnapshotCache {
        &mut self.cache
    }

    fn nothing_to_display(&self) -> &'static str {
        "No queues to display"
    }

    fn block(&self, snapshot: &StructureSnapshot) -> Block {
        let queue = match snapshot.payload() {
            StructurePayload::Queue(queue) => queue,
            _ => Default::default(),
        };
        let mut header = format!("Queue: {} (Size: {})", snapshot.id, queue.size);
        if let Some(front) = &queue.front {
            header.push_str(&format!(" | Front: {}", value_text(front)));
        }
        if let Some(rear) = &queue.rear {
            header.push_str(&format!(" | Rear: {}", value_text(rear)));
        }
        Block {
            id: snapshot.id.clone(),
            header,
            body: sequence(&queue.items, SequenceStyle::Queued, "Empty queue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_lists_front_and_rear() {
        let r = QueueRenderer::default();
        let block = r.block(&StructureSnapshot::new(
            "q1",
            StructureKind::Queue,
            json!({"items": ["a", "b"], "size": 2, "front": "a", "rear": "b"}),
        ));
        assert_eq!(block.header, "Queue: q1 (Size: 2) | Front: a | Rear: b");
    }
}
