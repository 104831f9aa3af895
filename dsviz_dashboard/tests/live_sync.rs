use crossbeam_channel::{bounded, unbounded, Sender};
use dsviz_dashboard::{
    spawn_connection, BackoffPolicy, ChannelEvent, ConnectionState, Dashboard, DashboardConfig,
    FilterState,
};
use dsviz_mock_server::{Backend, MainLoop, Mutation, NetworkThread};
use std::net::{SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;

enum Control {
    Apply(&'static str, Mutation),
    Raw(&'static str),
    DropClients,
    Stop,
}

struct MockServer {
    addr: SocketAddr,
    control: Sender<Control>,
    join: Option<JoinHandle<()>>,
}

impl MockServer {
    fn start() -> Self {
        let (in_tx, in_rx) = bounded(dsviz_mock_server::INBOUND_CAP);
        let (out_tx, out_rx) = bounded(dsviz_mock_server::OUTBOUND_CAP);
        let net = NetworkThread::spawn_with_addr("127.0.0.1:0", in_tx, out_rx).expect("spawn net");
        let addr = net.listen_addr();
        let (control, control_rx) = unbounded();

        let join = thread::spawn(move || {
            let mut main_loop = MainLoop::new(in_rx, out_tx, Backend::with_demo_data());
            loop {
                main_loop.tick();
                match control_rx.try_recv() {
                    Ok(Control::Apply(id, mutation)) => {
                        main_loop.apply(id, mutation).expect("mutation applies");
                    }
                    Ok(Control::Raw(text)) => main_loop.broadcast_raw(text),
                    Ok(Control::DropClients) => main_loop.drop_clients(),
                    Ok(Control::Stop) => break,
                    Err(_) => {}
                }
                thread::sleep(Duration::from_millis(5));
            }
            net.shutdown();
        });

        Self {
            addr,
            control,
            join: Some(join),
        }
    }

    fn endpoint(&self) -> Url {
        Url::parse(&format!("ws://{}/ws", self.addr)).expect("endpoint url")
    }

    fn send(&self, cmd: Control) {
        self.control.send(cmd).expect("mock server running");
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        let _ = self.control.send(Control::Stop);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn fast_policy(max_attempts: u32) -> BackoffPolicy {
    BackoffPolicy {
        base_delay: Duration::from_millis(20),
        max_attempts,
        connect_timeout: Duration::from_millis(300),
    }
}

/// Feeds channel events into the dashboard until `done` holds, collecting
/// every status seen on the way.
async fn pump_until(
    dash: &mut Dashboard,
    events: &mut UnboundedReceiver<ChannelEvent>,
    statuses: &mut Vec<ConnectionState>,
    what: &str,
    done: impl Fn(&Dashboard) -> bool,
) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !done(&*dash) {
        let event = tokio::time::timeout_at(deadline, events.recv())
            .await
            .unwrap_or_else(|_| panic!("timeout waiting for {what}; statuses: {statuses:?}"))
            .expect("connection actor alive");
        if let ChannelEvent::Status(s) = &event {
            statuses.push(*s);
        }
        dash.handle_channel_event(event, Instant::now());
    }
}

fn size_of(dash: &Dashboard, id: &str) -> Option<String> {
    dash.store()
        .structure_summaries()
        .into_iter()
        .find(|row| row.id == id)
        .map(|row| row.size_text)
}

#[tokio::test]
async fn mirrors_server_and_survives_garbage() {
    let server = MockServer::start();
    let config = DashboardConfig::default()
        .with_endpoint(server.endpoint())
        .with_backoff(fast_policy(5));
    let (handle, mut events, actor) = spawn_connection(config.endpoint.clone(), config.backoff);
    let mut dash = Dashboard::new(&config, FilterState::All, handle.clone());
    let mut statuses = Vec::new();

    handle.connect();
    pump_until(&mut dash, &mut events, &mut statuses, "initial state", |d| {
        d.status() == ConnectionState::Connected && d.store().len() == 4
    })
    .await;
    assert_eq!(size_of(&dash, "s1").as_deref(), Some("Size: 3"));

    server.send(Control::Apply("s1", Mutation::Push(4)));
    pump_until(&mut dash, &mut events, &mut statuses, "push", |d| {
        size_of(d, "s1").as_deref() == Some("Size: 4")
    })
    .await;
    let log = dash.store().log_entries();
    assert_eq!(log[0].op_type, "push");
    assert_eq!(log[0].target, "s1");
    assert!(dash.views().is_highlighted("s1", Instant::now()));

    server.send(Control::Raw("this is not json"));
    server.send(Control::Raw(r#"{"type":"heartbeat","data":{}}"#));
    server.send(Control::Apply("l1", Mutation::Append(40)));
    pump_until(&mut dash, &mut events, &mut statuses, "append after garbage", |d| {
        size_of(d, "l1").as_deref() == Some("Length: 4")
    })
    .await;
    assert_eq!(dash.store().history().count(), 2);
    assert_eq!(
        statuses,
        vec![ConnectionState::Connecting, ConnectionState::Connected],
        "garbage frames must not drop the channel"
    );

    handle.disconnect();
    pump_until(&mut dash, &mut events, &mut statuses, "disconnect", |d| {
        d.status() == ConnectionState::Disconnected
    })
    .await;

    // An explicit disconnect never schedules a reconnect.
    let quiet = tokio::time::timeout(Duration::from_millis(200), events.recv()).await;
    assert!(quiet.is_err(), "unexpected event after disconnect: {quiet:?}");
    assert_eq!(dash.status_view().text, "Disconnected");

    drop(handle);
    drop(dash);
    let _ = tokio::time::timeout(Duration::from_secs(1), actor).await;
}

#[tokio::test]
async fn server_drop_reconnects_and_resyncs() {
    let server = MockServer::start();
    let config = DashboardConfig::default()
        .with_endpoint(server.endpoint())
        .with_backoff(fast_policy(5));
    let (handle, mut events, _actor) = spawn_connection(config.endpoint.clone(), config.backoff);
    let mut dash = Dashboard::new(&config, FilterState::All, handle.clone());
    let mut statuses = Vec::new();

    handle.connect();
    pump_until(&mut dash, &mut events, &mut statuses, "initial state", |d| d.store().len() == 4).await;

    server.send(Control::Apply("q1", Mutation::Enqueue(7)));
    pump_until(&mut dash, &mut events, &mut statuses, "enqueue", |d| {
        d.store().history().count() == 1
    })
    .await;

    statuses.clear();
    server.send(Control::DropClients);
    pump_until(&mut dash, &mut events, &mut statuses, "resync", |d| {
        d.status() == ConnectionState::Connected && d.store().history().count() == 0
    })
    .await;

    assert_eq!(
        &statuses[..3],
        &[
            ConnectionState::Reconnecting { attempt: 1, max: 5 },
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ]
    );
    assert_eq!(size_of(&dash, "q1").as_deref(), Some("Size: 3"));
}

#[tokio::test]
async fn unreachable_server_ends_in_failed() {
    let addr = {
        let probe = TcpListener::bind("127.0.0.1:0").expect("bind probe");
        probe.local_addr().expect("probe addr")
    };
    let endpoint = Url::parse(&format!("ws://{addr}/ws")).expect("endpoint url");
    let config = DashboardConfig::default()
        .with_endpoint(endpoint)
        .with_backoff(fast_policy(3));
    let (handle, mut events, _actor) = spawn_connection(config.endpoint.clone(), config.backoff);
    let mut dash = Dashboard::new(&config, FilterState::All, handle.clone());
    let mut statuses = Vec::new();

    handle.connect();
    pump_until(&mut dash, &mut events, &mut statuses, "failure", |d| {
        d.status() == ConnectionState::Failed
    })
    .await;

    assert_eq!(
        statuses,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Reconnecting { attempt: 1, max: 3 },
            ConnectionState::Connecting,
            ConnectionState::Reconnecting { attempt: 2, max: 3 },
            ConnectionState::Connecting,
            ConnectionState::Reconnecting { attempt: 3, max: 3 },
            ConnectionState::Connecting,
            ConnectionState::Failed,
        ]
    );
    let view = dash.status_view();
    assert_eq!(view.text, "Connection failed");
    assert!(view.reconnect_enabled);

    // No fourth automatic attempt.
    let quiet = tokio::time::timeout(Duration::from_millis(200), events.recv()).await;
    assert!(quiet.is_err(), "unexpected event after failure: {quiet:?}");

    // Manual reconnect starts over.
    handle.reconnect();
    pump_until(&mut dash, &mut events, &mut statuses, "manual retry", |d| {
        d.status() == ConnectionState::Connecting
    })
    .await;
}

#[tokio::test]
async fn silent_handshake_times_out_into_backoff() {
    // Accepts TCP (via the backlog) but never answers the upgrade request.
    let silent = TcpListener::bind("127.0.0.1:0").expect("bind silent listener");
    let addr = silent.local_addr().expect("silent addr");
    let endpoint = Url::parse(&format!("ws://{addr}/ws")).expect("endpoint url");
    let config = DashboardConfig::default()
        .with_endpoint(endpoint)
        .with_backoff(BackoffPolicy {
            connect_timeout: Duration::from_millis(100),
            ..fast_policy(1)
        });
    let (handle, mut events, _actor) = spawn_connection(config.endpoint.clone(), config.backoff);
    let mut dash = Dashboard::new(&config, FilterState::All, handle.clone());
    let mut statuses = Vec::new();

    handle.connect();
    pump_until(&mut dash, &mut events, &mut statuses, "handshake timeout", |d| {
        d.status() == ConnectionState::Failed
    })
    .await;

    assert_eq!(
        statuses,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Reconnecting { attempt: 1, max: 1 },
            ConnectionState::Connecting,
            ConnectionState::Failed,
        ]
    );
    drop(silent);
}
