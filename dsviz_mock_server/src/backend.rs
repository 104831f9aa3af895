use crate::error::BackendError;
use chrono::Utc;
use dsviz_protocol::{OperationRecord, StructureKind, StructureSnapshot};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BstNode {
    pub value: i64,
    pub left: Option<Box<BstNode>>,
    pub right: Option<Box<BstNode>>,
}

impl BstNode {
    fn insert(slot: &mut Option<Box<BstNode>>, value: i64) -> bool {
        match slot {
            None => {
                *slot = Some(Box::new(BstNode {
                    value,
                    left: None,
                    right: None,
                }));
                true
            }
            Some(node) if value < node.value => Self::insert(&mut node.left, value),
            Some(node) if value > node.value => Self::insert(&mut node.right, value),
            Some(_) => false,
        }
    }

    fn to_json(&self) -> Value {
        let mut node = Map::new();
        node.insert("value".into(), json!(self.value));
        if let Some(left) = &self.left {
            node.insert("left".into(), left.to_json());
        }
        if let Some(right) = &self.right {
            node.insert("right".into(), right.to_json());
        }
        Value::Object(node)
    }

    fn height(slot: &Option<Box<BstNode>>) -> u64 {
        match slot {
            None => 0,
            Some(node) => 1 + Self::height(&node.left).max(Self::height(&node.right)),
        }
    }

    fn size(slot: &Option<Box<BstNode>>) -> u64 {
        match slot {
            None => 0,
            Some(node) => 1 + Self::size(&node.left) + Self::size(&node.right),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemoStructure {
    List(Vec<i64>),
    Stack(Vec<i64>),
    Queue(VecDeque<i64>),
    Tree(Option<Box<BstNode>>),
}

impl DemoStructure {
    pub fn tree_from(values: &[i64]) -> Self {
        let mut root = None;
        for v in values {
            BstNode::insert(&mut root, *v);
        }
        DemoStructure::Tree(root)
    }

    pub fn kind(&self) -> StructureKind {
        match self {
            DemoStructure::List(_) => StructureKind::List,
            DemoStructure::Stack(_) => StructureKind::Stack,
            DemoStructure::Queue(_) => StructureKind::Queue,
            DemoStructure::Tree(_) => StructureKind::BinaryTree,
        }
    }

    pub fn snapshot(&self, id: &str) -> StructureSnapshot {
        let mut metadata = Map::new();
        let data = match self {
            DemoStructure::List(items) => json!({"items": items, "length": items.len()}),
            DemoStructure::Stack(items) => {
                metadata.insert("capacity".into(), json!(items.capacity()));
                let mut data = json!({"items": items, "size": items.len()});
                if let Some(top) = items.last() {
                    data["top"] = json!(top);
                }
                data
            }
            DemoStructure::Queue(items) => {
                let mut data = json!({"items": items, "size": items.len()});
                if let (Some(front), Some(rear)) = (items.front(), items.back()) {
                    data["front"] = json!(front);
                    data["rear"] = json!(rear);
                }
                data
            }
            DemoStructure::Tree(root) => {
                metadata.insert("height".into(), json!(BstNode::height(root)));
                let mut data = json!({"size": BstNode::size(root)});
                if let Some(root) = root {
                    data["root"] = root.to_json();
                }
                data
            }
        };

        let mut snapshot = StructureSnapshot::new(id, self.kind(), data);
        if !metadata.is_empty() {
            snapshot = snapshot.with_metadata(metadata);
        }
        snapshot.timestamp = Some(Utc::now());
        snapshot
    }

    fn kind_name(&self) -> &'static str {
        match self {
            DemoStructure::List(_) => "list",
            DemoStructure::Stack(_) => "stack",
            DemoStructure::Queue(_) => "queue",
            DemoStructure::Tree(_) => "binary_tree",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Append(i64),
    Push(i64),
    Pop,
    Enqueue(i64),
    Dequeue,
    Insert(i64),
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Append(_) => "append",
            Mutation::Push(_) => "push",
            Mutation::Pop => "pop",
            Mutation::Enqueue(_) => "enqueue",
            Mutation::Dequeue => "dequeue",
            Mutation::Insert(_) => "insert",
        }
    }

    fn parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        match self {
            Mutation::Append(v) | Mutation::Push(v) | Mutation::Enqueue(v) => {
                params.insert("item".into(), json!(v));
            }
            Mutation::Insert(v) => {
                params.insert("value".into(), json!(v));
            }
            Mutation::Pop | Mutation::Dequeue => {}
        }
        params
    }
}

/// Minimal in-memory event source: a handful of named structures and a
/// monotonically numbered operation log.
#[derive(Debug, Default)]
pub struct Backend {
    structures: BTreeMap<String, DemoStructure>,
    next_op: u64,
}

impl Backend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_demo_data() -> Self {
        let mut backend = Self::new();
        backend.insert("l1", DemoStructure::List(vec![10, 20, 30]));
        backend.insert("s1", DemoStructure::Stack(vec![1, 2, 3]));
        backend.insert("q1", DemoStructure::Queue(VecDeque::from([5, 6])));
        backend.insert("t1", DemoStructure::tree_from(&[50, 30, 70, 20, 60]));
        backend
    }

    pub fn insert(&mut self, id: impl Into<String>, structure: DemoStructure) {
        self.structures.insert(id.into(), structure);
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.structures.keys().map(String::as_str)
    }

    pub fn get(&self, id: &str) -> Option<&DemoStructure> {
        self.structures.get(id)
    }

    pub fn snapshot(&self, id: &str) -> Option<StructureSnapshot> {
        self.structures.get(id).map(|s| s.snapshot(id))
    }

    pub fn snapshots(&self) -> BTreeMap<String, StructureSnapshot> {
        self.structures
            .iter()
            .map(|(id, s)| (id.clone(), s.snapshot(id)))
            .collect()
    }

    /// Mutates one structure and returns the operation record carrying its
    /// before/after snapshots. Nothing changes on error.
    pub fn apply(&mut self, id: &str, mutation: Mutation) -> Result<OperationRecord, BackendError> {
        let structure = self
            .structures
            .get_mut(id)
            .ok_or_else(|| BackendError::UnknownStructure(id.to_string()))?;
        let before = structure.snapshot(id);
        let op = mutation.name();

        let wrong_kind = |s: &DemoStructure| BackendError::WrongKind {
            id: id.to_string(),
            op,
            kind: s.kind_name(),
        };
        let empty = || BackendError::Empty {
            id: id.to_string(),
            op,
        };

        match (&mut *structure, mutation) {
            (DemoStructure::List(items), Mutation::Append(v)) => items.push(v),
            (DemoStructure::Stack(items), Mutation::Push(v)) => items.push(v),
            (DemoStructure::Stack(items), Mutation::Pop) => {
                items.pop().ok_or_else(empty)?;
            }
            (DemoStructure::Queue(items), Mutation::Enqueue(v)) => items.push_back(v),
            (DemoStructure::Queue(items), Mutation::Dequeue) => {
                items.pop_front().ok_or_else(empty)?;
            }
            (DemoStructure::Tree(root), Mutation::Insert(v)) => {
                BstNode::insert(root, v);
            }
            (other, _) => return Err(wrong_kind(&*other)),
        }

        self.next_op += 1;
        Ok(OperationRecord {
            id: Some(format!("op-{}", self.next_op)),
            op_type: op.to_string(),
            data_structure: id.to_string(),
            parameters: mutation.parameters(),
            timestamp: Utc::now(),
            before: Some(before),
            after: Some(structure.snapshot(id)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsviz_protocol::StructurePayload;

    #[test]
    fn push_records_before_and_after() {
        let mut backend = Backend::with_demo_data();
        let op = backend.apply("s1", Mutation::Push(4)).unwrap();
        assert_eq!(op.op_type, "push");
        assert_eq!(op.parameters.get("item"), Some(&json!(4)));
        assert_eq!(op.id.as_deref(), Some("op-1"));

        let before = op.before.unwrap().payload();
        let after = op.after.unwrap().payload();
        assert!(matches!(before, StructurePayload::Stack(s) if s.size == 3));
        assert!(matches!(after, StructurePayload::Stack(s) if s.size == 4 && s.top == Some(json!(4))));
    }

    #[test]
    fn errors_leave_state_alone() {
        let mut backend = Backend::new();
        backend.insert("s", DemoStructure::Stack(vec![]));
        assert_eq!(
            backend.apply("s", Mutation::Pop),
            Err(BackendError::Empty {
                id: "s".into(),
                op: "pop"
            })
        );
        assert!(matches!(
            backend.apply("s", Mutation::Enqueue(1)),
            Err(BackendError::WrongKind { kind: "stack", .. })
        ));
        assert_eq!(
            backend.apply("nope", Mutation::Pop),
            Err(BackendError::UnknownStructure("nope".into()))
        );
        assert_eq!(backend.get("s"), Some(&DemoStructure::Stack(vec![])));
    }

    #[test]
    fn tree_snapshot_carries_height() {
        let backend = Backend::with_demo_data();
        let snapshot = backend.snapshot("t1").unwrap();
        match snapshot.payload() {
            StructurePayload::BinaryTree(tree) => {
                assert_eq!(tree.size, 5);
                assert_eq!(tree.height, 3);
                let root = tree.root.unwrap();
                assert_eq!(root.value, json!(50));
                assert_eq!(root.left.unwrap().left.unwrap().value, json!(20));
            }
            other => panic!("expected tree, got {other:?}"),
        }

        let empty = DemoStructure::Tree(None).snapshot("t0");
        assert!(matches!(empty.payload(), StructurePayload::BinaryTree(t) if t.root.is_none()));
    }
}
