use crate::app_state::{ChannelEvent, UiCommand};
use crate::connection::{BackoffPolicy, ConnectionHandle, ConnectionMachine, Retry, StatusSink};
use crate::status::ConnectionState;
use dsviz_protocol::ClientCommand;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

const COMMAND_CAP: usize = 256;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;

/// Starts the connection actor. The actor stays idle until `connect()`.
pub fn spawn(
    endpoint: Url,
    policy: BackoffPolicy,
) -> (ConnectionHandle, mpsc::UnboundedReceiver<ChannelEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(COMMAND_CAP);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let join = tokio::spawn(run(rx, events_tx, endpoint, policy));
    (ConnectionHandle::from_sender(tx), events_rx, join)
}

enum ServeEnd {
    Lost,
    Disconnect,
    Reconnect,
    Shutdown,
}

pub async fn run(
    mut rx: mpsc::Receiver<UiCommand>,
    events: mpsc::UnboundedSender<ChannelEvent>,
    endpoint: Url,
    policy: BackoffPolicy,
) {
    let mut machine = ConnectionMachine::new(policy, events.clone());
    let mut pending: Option<(Instant, u64)> = None;

    loop {
        if events.is_closed() {
            return;
        }

        match machine.state() {
            ConnectionState::Connecting => {
                let epoch = machine.epoch();
                let connect = tokio::time::timeout(
                    policy.connect_timeout,
                    tokio_tungstenite::connect_async(endpoint.as_str()),
                );
                tokio::pin!(connect);

                let outcome = loop {
                    tokio::select! {
                        res = &mut connect => break Some(res),
                        cmd = rx.recv() => {
                            let Some(cmd) = cmd else { return };
                            apply_offline(&mut machine, cmd);
                            if machine.epoch() != epoch {
                                break None;
                            }
                        }
                    }
                };

                match outcome {
                    None => continue,
                    Some(Ok(Ok((socket, _)))) => {
                        tracing::info!(url = %endpoint, "connected");
                        machine.on_open();
                        match serve(socket, &mut rx, &events).await {
                            ServeEnd::Lost => pending = lost(&mut machine),
                            ServeEnd::Disconnect => machine.disconnect(),
                            ServeEnd::Reconnect => machine.manual_reconnect(),
                            ServeEnd::Shutdown => return,
                        }
                    }
                    Some(Ok(Err(e))) => {
                        tracing::warn!(url = %endpoint, error = %e, "connect failed");
                        pending = lost(&mut machine);
                    }
                    Some(Err(_)) => {
                        tracing::warn!(url = %endpoint, timeout = ?policy.connect_timeout, "connect timed out");
                        pending = lost(&mut machine);
                    }
                }
            }
            ConnectionState::Reconnecting { attempt, max } => {
                let Some((at, epoch)) = pending else {
                    machine.request_connect();
                    continue;
                };
                tracing::debug!(attempt, max, "waiting to reconnect");
                tokio::select! {
                    _ = tokio::time::sleep_until(at) => {
                        pending = None;
                        machine.retry_due(epoch);
                    }
                    cmd = rx.recv() => {
                        let Some(cmd) = cmd else { return };
                        apply_offline(&mut machine, cmd);
                        if !matches!(machine.state(), ConnectionState::Reconnecting { .. }) {
                            pending = None;
                        }
                    }
                }
            }
            // serve() always leaves Connected before returning, so only the
            // resting states wait here.
            ConnectionState::Idle
            | ConnectionState::Disconnected
            | ConnectionState::Failed
            | ConnectionState::Connected => {
                let Some(cmd) = rx.recv().await else { return };
                apply_offline(&mut machine, cmd);
            }
        }
    }
}

fn lost<S: StatusSink>(machine: &mut ConnectionMachine<S>) -> Option<(Instant, u64)> {
    let retry = machine.on_lost();
    if machine.state() == ConnectionState::Failed {
        tracing::error!("reconnect attempts exhausted; waiting for manual reconnect");
    }
    retry.map(|Retry { delay, epoch }| (Instant::now() + delay, epoch))
}

/// Commands received while no channel is open.
fn apply_offline<S: StatusSink>(machine: &mut ConnectionMachine<S>, cmd: UiCommand) {
    match cmd {
        UiCommand::Connect => {
            machine.request_connect();
        }
        UiCommand::Reconnect => machine.manual_reconnect(),
        UiCommand::Disconnect => {
            if machine.state() != ConnectionState::Disconnected {
                machine.disconnect();
            }
        }
        UiCommand::Send(cmd) => {
            tracing::debug!(?cmd, state = %machine.state(), "not connected, message dropped");
        }
    }
}

async fn serve(
    socket: WsStream,
    rx: &mut mpsc::Receiver<UiCommand>,
    events: &mpsc::UnboundedSender<ChannelEvent>,
) -> ServeEnd {
    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                match cmd {
                    None => {
                        let _ = write.close().await;
                        return ServeEnd::Shutdown;
                    }
                    Some(UiCommand::Connect) => {}
                    Some(UiCommand::Disconnect) => {
                        let _ = write.close().await;
                        return ServeEnd::Disconnect;
                    }
                    Some(UiCommand::Reconnect) => {
                        let _ = write.close().await;
                        return ServeEnd::Reconnect;
                    }
                    Some(UiCommand::Send(cmd)) => {
                        if let Err(e) = send_json(&mut write, &cmd).await {
                            tracing::warn!(error = %e, "send failed");
                            return ServeEnd::Lost;
                        }
                    }
                }
            }
            incoming = read.next() => {
                if let Some(end) = on_incoming(incoming, events) {
                    return end;
                }
            }
        }
    }
}

fn on_incoming(
    incoming: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
    events: &mpsc::UnboundedSender<ChannelEvent>,
) -> Option<ServeEnd> {
    let text = match incoming {
        Some(Ok(Message::Text(text))) => text.as_str().to_string(),
        Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!(len = bytes.len(), "non-utf8 binary frame dropped");
                return None;
            }
        },
        Some(Ok(Message::Close(frame))) => {
            tracing::warn!(?frame, "server closed the channel");
            return Some(ServeEnd::Lost);
        }
        Some(Ok(_)) => return None,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "channel error");
            return Some(ServeEnd::Lost);
        }
        None => {
            tracing::warn!("channel ended");
            return Some(ServeEnd::Lost);
        }
    };

    if events.send(ChannelEvent::Frame(text)).is_err() {
        return Some(ServeEnd::Shutdown);
    }
    None
}

async fn send_json(
    write: &mut WsWrite,
    cmd: &ClientCommand,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let payload = serde_json::to_string(cmd)
        .map_err(|e| tokio_tungstenite::tungstenite::Error::Io(std::io::Error::other(e)))?;
    write.send(Message::Text(payload.into())).await
}
