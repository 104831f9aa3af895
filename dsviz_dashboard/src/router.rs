use crate::error::FrameError;
use crate::store::StateStore;
use dsviz_protocol::{ServerMessage, StructureSnapshot};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Classifies one inbound frame. Unknown kinds are reported separately from
/// malformed frames so callers can treat them as forward-compatible noise.
pub fn decode_frame(text: &str) -> Result<ServerMessage, FrameError> {
    let Envelope { kind, data } = serde_json::from_str(text)?;
    match kind.as_str() {
        "initial_state" => serde_json::from_value(data)
            .map(ServerMessage::InitialState)
            .map_err(|source| FrameError::BadPayload {
                kind: "initial_state",
                source,
            }),
        "operation" => serde_json::from_value(data)
            .map(ServerMessage::Operation)
            .map_err(|source| FrameError::BadPayload {
                kind: "operation",
                source,
            }),
        "snapshot" => serde_json::from_value(data)
            .map(ServerMessage::Snapshot)
            .map_err(|source| FrameError::BadPayload {
                kind: "snapshot",
                source,
            }),
        _ => Err(FrameError::UnknownKind(kind)),
    }
}

/// What a routed message changed, for the view side to follow up on.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Reset,
    Operation {
        target: String,
        updated: Option<StructureSnapshot>,
    },
    Snapshot(StructureSnapshot),
}

pub fn route(store: &mut StateStore, msg: ServerMessage) -> Routed {
    match msg {
        ServerMessage::InitialState(snapshots) => {
            tracing::info!(structures = snapshots.len(), "initial state");
            store.reset_with(snapshots);
            Routed::Reset
        }
        ServerMessage::Operation(op) => {
            tracing::debug!(op = %op.op_type, target = %op.data_structure, "operation");
            let target = op.data_structure.clone();
            let updated = op.after.clone();
            store.record_operation(op);
            Routed::Operation { target, updated }
        }
        ServerMessage::Snapshot(snapshot) => {
            tracing::debug!(id = %snapshot.id, "snapshot");
            store.apply_snapshot(snapshot.clone());
            Routed::Snapshot(snapshot)
        }
    }
}
