use crate::backend::{Backend, DemoStructure, Mutation};
use crate::error::BackendError;
use crate::protocol::{ClientCommand, ClientId, InboundMsg, OperationRecord, OutboundMsg, ServerMessage};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::collections::BTreeSet;

/// Owns the backend. Each `tick` drains the network thread's inbound queue:
/// new clients get the full `initial_state`, `get_snapshot` is answered to the
/// asking client only. Mutations are pushed to every client as operations.
pub struct MainLoop {
    inbound_rx: Receiver<InboundMsg>,
    outbound_tx: Sender<OutboundMsg>,
    backend: Backend,
    clients: BTreeSet<ClientId>,
}

impl MainLoop {
    pub fn new(
        inbound_rx: Receiver<InboundMsg>,
        outbound_tx: Sender<OutboundMsg>,
        backend: Backend,
    ) -> Self {
        Self {
            inbound_rx,
            outbound_tx,
            backend,
            clients: BTreeSet::new(),
        }
    }

    pub fn tick(&mut self) {
        loop {
            match self.inbound_rx.try_recv() {
                Ok(InboundMsg::ClientConnected { client_id, .. }) => {
                    self.clients.insert(client_id);
                    self.try_send(OutboundMsg::SendTo {
                        client_id,
                        msg: ServerMessage::InitialState(self.backend.snapshots()),
                    });
                }
                Ok(InboundMsg::ClientDisconnected { client_id }) => {
                    self.clients.remove(&client_id);
                }
                Ok(InboundMsg::Command { client_id, cmd }) => self.handle_command(client_id, cmd),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn handle_command(&mut self, client_id: ClientId, cmd: ClientCommand) {
        match cmd {
            ClientCommand::GetSnapshot { id } => match self.backend.snapshot(&id) {
                Some(snapshot) => self.try_send(OutboundMsg::SendTo {
                    client_id,
                    msg: ServerMessage::Snapshot(snapshot),
                }),
                None => tracing::warn!(client_id, %id, "snapshot requested for unknown structure"),
            },
        }
    }

    /// Applies a mutation and broadcasts the resulting operation.
    pub fn apply(&mut self, id: &str, mutation: Mutation) -> Result<OperationRecord, BackendError> {
        let op = self.backend.apply(id, mutation)?;
        tracing::debug!(id, op = %op.op_type, "broadcasting operation");
        self.broadcast(ServerMessage::Operation(op.clone()));
        Ok(op)
    }

    /// Adds or replaces a structure and pushes its snapshot unsolicited.
    pub fn register(&mut self, id: &str, structure: DemoStructure) {
        let snapshot = structure.snapshot(id);
        self.backend.insert(id, structure);
        self.broadcast(ServerMessage::Snapshot(snapshot));
    }

    pub fn broadcast(&mut self, msg: ServerMessage) {
        self.try_send(OutboundMsg::Broadcast { msg });
    }

    pub fn broadcast_raw(&mut self, text: impl Into<String>) {
        self.try_send(OutboundMsg::BroadcastRaw { text: text.into() });
    }

    pub fn drop_clients(&mut self) {
        self.try_send(OutboundMsg::DropClients);
    }

    pub fn try_send(&mut self, msg: OutboundMsg) {
        if self.outbound_tx.try_send(msg).is_err() {
            tracing::warn!("outbound queue full, message dropped");
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use dsviz_protocol::StructureKind;

    fn harness() -> (MainLoop, Sender<InboundMsg>, Receiver<OutboundMsg>) {
        let (in_tx, in_rx) = bounded(16);
        let (out_tx, out_rx) = bounded(16);
        (MainLoop::new(in_rx, out_tx, Backend::with_demo_data()), in_tx, out_rx)
    }

    #[test]
    fn new_client_gets_initial_state() {
        let (mut main_loop, in_tx, out_rx) = harness();
        in_tx
            .send(InboundMsg::ClientConnected {
                client_id: 7,
                socket_addr: "127.0.0.1:1".parse().unwrap(),
            })
            .unwrap();
        main_loop.tick();
        assert_eq!(main_loop.client_count(), 1);

        match out_rx.try_recv().unwrap() {
            OutboundMsg::SendTo {
                client_id: 7,
                msg: ServerMessage::InitialState(all),
            } => {
                assert_eq!(all.len(), 4);
                assert_eq!(all["s1"].kind, StructureKind::Stack);
            }
            _ => panic!("expected initial state for client 7"),
        }
    }

    #[test]
    fn snapshot_requests_answer_only_known_ids() {
        let (mut main_loop, in_tx, out_rx) = harness();
        for id in ["q1", "missing"] {
            in_tx
                .send(InboundMsg::Command {
                    client_id: 3,
                    cmd: ClientCommand::GetSnapshot { id: id.into() },
                })
                .unwrap();
        }
        main_loop.tick();

        match out_rx.try_recv().unwrap() {
            OutboundMsg::SendTo {
                client_id: 3,
                msg: ServerMessage::Snapshot(s),
            } => assert_eq!(s.id, "q1"),
            _ => panic!("expected snapshot reply"),
        }
        assert!(out_rx.try_recv().is_err());
    }

    #[test]
    fn apply_broadcasts_operation() {
        let (mut main_loop, _in_tx, out_rx) = harness();
        main_loop.apply("q1", Mutation::Enqueue(9)).unwrap();
        match out_rx.try_recv().unwrap() {
            OutboundMsg::Broadcast {
                msg: ServerMessage::Operation(op),
            } => {
                assert_eq!(op.op_type, "enqueue");
                assert_eq!(op.data_structure, "q1");
                assert!(op.after.is_some());
            }
            _ => panic!("expected broadcast operation"),
        }

        assert!(main_loop.apply("q1", Mutation::Push(1)).is_err());
        assert!(out_rx.try_recv().is_err());
    }
}
