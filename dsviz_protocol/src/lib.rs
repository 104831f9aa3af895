use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Structure kinds the server publishes. Anything else decodes as `Other` so a
/// newer server never breaks an older client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum StructureKind {
    List,
    Stack,
    Queue,
    BinaryTree,
    Other(String),
}

impl StructureKind {
    pub const KNOWN: [StructureKind; 4] = [
        StructureKind::List,
        StructureKind::Stack,
        StructureKind::Queue,
        StructureKind::BinaryTree,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            StructureKind::List => "list",
            StructureKind::Stack => "stack",
            StructureKind::Queue => "queue",
            StructureKind::BinaryTree => "binary_tree",
            StructureKind::Other(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, StructureKind::Other(_))
    }

    /// Human label used by the structure list.
    pub fn label(&self) -> String {
        match self {
            StructureKind::BinaryTree => "Binary Tree".to_string(),
            other => {
                let raw = other.as_str();
                let mut chars = raw.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }
}

impl From<String> for StructureKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "list" => StructureKind::List,
            "stack" => StructureKind::Stack,
            "queue" => StructureKind::Queue,
            "binary_tree" => StructureKind::BinaryTree,
            _ => StructureKind::Other(value),
        }
    }
}

impl From<StructureKind> for String {
    fn from(value: StructureKind) -> Self {
        match value {
            StructureKind::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for StructureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StructureSnapshot {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StructureKind,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::optional"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl StructureSnapshot {
    pub fn new(id: impl Into<String>, kind: StructureKind, data: Value) -> Self {
        Self {
            id: id.into(),
            kind,
            data,
            metadata: None,
            timestamp: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Typed view of `data`. Missing or mistyped fields fall back to zero/empty
    /// instead of failing, since servers send partially populated payloads.
    pub fn payload(&self) -> StructurePayload {
        let empty = Map::new();
        let data = self.data.as_object().unwrap_or(&empty);
        match self.kind {
            StructureKind::List => StructurePayload::List(ListData {
                items: items_field(data),
                length: count_field(data, "length"),
            }),
            StructureKind::Stack => StructurePayload::Stack(StackData {
                items: items_field(data),
                size: count_field(data, "size"),
                top: data.get("top").cloned(),
            }),
            StructureKind::Queue => StructurePayload::Queue(QueueData {
                items: items_field(data),
                size: count_field(data, "size"),
                front: data.get("front").cloned(),
                rear: data.get("rear").cloned(),
            }),
            StructureKind::BinaryTree => StructurePayload::BinaryTree(TreeData {
                root: data.get("root").and_then(TreeNode::from_value),
                size: count_field(data, "size"),
                height: self
                    .metadata
                    .as_ref()
                    .map(|m| count_field(m, "height"))
                    .unwrap_or(0),
            }),
            StructureKind::Other(_) => StructurePayload::Unknown,
        }
    }
}

fn items_field(data: &Map<String, Value>) -> Vec<Value> {
    data.get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn count_field(data: &Map<String, Value>, key: &str) -> u64 {
    match data.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        _ => 0,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructurePayload {
    List(ListData),
    Stack(StackData),
    Queue(QueueData),
    BinaryTree(TreeData),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListData {
    pub items: Vec<Value>,
    pub length: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackData {
    pub items: Vec<Value>,
    pub size: u64,
    pub top: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueueData {
    pub items: Vec<Value>,
    pub size: u64,
    pub front: Option<Value>,
    pub rear: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeData {
    pub root: Option<TreeNode>,
    pub size: u64,
    pub height: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<Box<TreeNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<Box<TreeNode>>,
}

impl TreeNode {
    pub fn leaf(value: Value) -> Self {
        Self {
            value,
            left: None,
            right: None,
        }
    }

    /// Lenient decode: anything that is not an object is treated as "no node".
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            value: obj.get("value").cloned().unwrap_or(Value::Null),
            left: obj.get("left").and_then(Self::from_value).map(Box::new),
            right: obj.get("right").and_then(Self::from_value).map(Box::new),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OperationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(rename = "dataStructure")]
    pub data_structure: String,
    #[serde(
        default,
        skip_serializing_if = "Map::is_empty",
        deserialize_with = "null_as_empty"
    )]
    pub parameters: Map<String, Value>,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<StructureSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<StructureSnapshot>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type", content = "data")]
pub enum ServerMessage {
    InitialState(BTreeMap<String, StructureSnapshot>),
    Operation(OperationRecord),
    Snapshot(StructureSnapshot),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ClientCommand {
    GetSnapshot { id: String },
}

/// RFC 3339 on the way out; RFC 3339 (any offset) or epoch milliseconds on the way in.
pub mod timestamp {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(String),
        Millis(i64),
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Text(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| D::Error::custom(format!("invalid timestamp {s:?}: {e}"))),
            RawTimestamp::Millis(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {ms}"))),
        }
    }

    pub mod optional {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            #[derive(Deserialize)]
            struct Wrapped(#[serde(with = "super")] DateTime<Utc>);

            Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(dt)| dt))
        }
    }
}
