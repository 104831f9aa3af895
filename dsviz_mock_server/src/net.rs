use crate::error::ServerError;
use crate::protocol::{ClientCommand, ClientId, InboundMsg, OutboundMsg, ServerMessage};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::protocol::Message;

const READ_TIMEOUT: Duration = Duration::from_millis(5);
const WRITE_TIMEOUT: Duration = Duration::from_millis(200);
const IDLE_SLEEP: Duration = Duration::from_millis(10);

struct Client {
    id: ClientId,
    ws: tungstenite::WebSocket<TcpStream>,
    socket_addr: SocketAddr,
}

/// Websocket server thread. Every accepted client receives broadcasts; the
/// main loop addresses single clients by id.
pub struct NetworkThread {
    listen_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl NetworkThread {
    pub fn spawn_with_addr(
        addr: &str,
        in_tx: Sender<InboundMsg>,
        out_rx: Receiver<OutboundMsg>,
    ) -> Result<Self, ServerError> {
        let bind_err = |source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        };
        let listener = TcpListener::bind(addr).map_err(bind_err)?;
        let listen_addr = listener.local_addr().map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_for_thread = Arc::clone(&shutdown);
        let join_handle =
            thread::spawn(move || run_server(listener, in_tx, out_rx, shutdown_for_thread));

        tracing::info!(%listen_addr, "mock server listening");
        Ok(Self {
            listen_addr,
            shutdown,
            join_handle: Mutex::new(Some(join_handle)),
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Ok(mut h) = self.join_handle.lock() {
            if let Some(h) = h.take() {
                let _ = h.join();
            }
        }
    }
}

impl Drop for NetworkThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_server(
    listener: TcpListener,
    in_tx: Sender<InboundMsg>,
    out_rx: Receiver<OutboundMsg>,
    shutdown: Arc<AtomicBool>,
) {
    let mut clients: Vec<Client> = Vec::new();
    let mut next_id: ClientId = 0;

    while !shutdown.load(Ordering::Relaxed) {
        loop {
            match listener.accept() {
                Ok((stream, socket_addr)) => {
                    if let Some(client) = accept_client(stream, socket_addr, next_id + 1) {
                        next_id = client.id;
                        tracing::info!(client_id = client.id, %socket_addr, "client connected");
                        let _ = in_tx.try_send(InboundMsg::ClientConnected {
                            client_id: client.id,
                            socket_addr,
                        });
                        clients.push(client);
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    tracing::warn!(error = %e, "ws accept failed");
                    break;
                }
            }
        }

        let mut dropped: Vec<ClientId> = Vec::new();
        loop {
            match out_rx.try_recv() {
                Ok(OutboundMsg::Broadcast { msg }) => {
                    if let Some(text) = encode(&msg) {
                        for client in &mut clients {
                            if send_text(client, &text).is_err() {
                                dropped.push(client.id);
                            }
                        }
                    }
                }
                Ok(OutboundMsg::SendTo { client_id, msg }) => {
                    let Some(text) = encode(&msg) else { continue };
                    if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                        if send_text(client, &text).is_err() {
                            dropped.push(client.id);
                        }
                    }
                }
                Ok(OutboundMsg::BroadcastRaw { text }) => {
                    for client in &mut clients {
                        if send_text(client, &text).is_err() {
                            dropped.push(client.id);
                        }
                    }
                }
                Ok(OutboundMsg::DropClients) => {
                    for client in &mut clients {
                        let _ = client.ws.close(None);
                        let _ = client.ws.flush();
                        dropped.push(client.id);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }

        for client in &mut clients {
            if dropped.contains(&client.id) {
                continue;
            }
            match client.ws.read() {
                Ok(msg) => {
                    if handle_inbound(&in_tx, client, msg).is_err() {
                        dropped.push(client.id);
                    }
                }
                Err(tungstenite::Error::Io(e))
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => {
                    tracing::debug!(client_id = client.id, error = %e, "client read ended");
                    dropped.push(client.id);
                }
            }
        }

        if !dropped.is_empty() {
            clients.retain(|c| {
                if !dropped.contains(&c.id) {
                    return true;
                }
                tracing::info!(client_id = c.id, socket_addr = %c.socket_addr, "client disconnected");
                let _ = in_tx.try_send(InboundMsg::ClientDisconnected { client_id: c.id });
                false
            });
        }

        if clients.is_empty() {
            thread::sleep(IDLE_SLEEP);
        }
    }

    for mut client in clients {
        let _ = client.ws.close(None);
        let _ = client.ws.flush();
    }
}

fn accept_client(stream: TcpStream, socket_addr: SocketAddr, id: ClientId) -> Option<Client> {
    // Accepted sockets may inherit the listener's non-blocking mode.
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_nodelay(true);
    let _ = stream.set_read_timeout(Some(Duration::from_millis(200)));
    let _ = stream.set_write_timeout(Some(WRITE_TIMEOUT));

    let ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(%socket_addr, error = %e, "ws handshake failed");
            return None;
        }
    };
    let _ = ws.get_ref().set_read_timeout(Some(READ_TIMEOUT));
    Some(Client {
        id,
        ws,
        socket_addr,
    })
}

fn handle_inbound(in_tx: &Sender<InboundMsg>, client: &mut Client, msg: Message) -> Result<(), ()> {
    let text = match msg {
        Message::Text(s) => s,
        Message::Binary(_) => return Ok(()),
        Message::Ping(payload) => {
            let _ = client.ws.send(Message::Pong(payload));
            return Ok(());
        }
        Message::Pong(_) => return Ok(()),
        Message::Close(_) => return Err(()),
        Message::Frame(_) => return Ok(()),
    };

    let cmd: ClientCommand = match serde_json::from_str(&text) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(client_id = client.id, error = %e, "ignoring invalid command");
            return Ok(());
        }
    };

    if in_tx
        .try_send(InboundMsg::Command {
            client_id: client.id,
            cmd,
        })
        .is_err()
    {
        tracing::warn!(client_id = client.id, "main loop busy, command dropped");
    }
    Ok(())
}

fn encode(msg: &ServerMessage) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode server message");
            None
        }
    }
}

fn send_text(client: &mut Client, text: &str) -> Result<(), ()> {
    client
        .ws
        .send(Message::Text(text.to_string().into()))
        .map_err(|e| {
            tracing::debug!(client_id = client.id, error = %e, "send failed");
        })
}
