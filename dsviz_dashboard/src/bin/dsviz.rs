use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use dsviz_dashboard::{
    endpoint_for, load_env_file, parse_url, spawn_connection, BackoffPolicy, Dashboard,
    DashboardConfig, FilterState, UserAction, DEFAULT_PAGE_URL, HELP,
};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dsviz", about = "Live terminal dashboard for remote data structures")]
struct Args {
    /// Page the dashboard is served from; the websocket endpoint is derived from it.
    #[arg(long, env = "DSVIZ_PAGE_URL", default_value = DEFAULT_PAGE_URL)]
    page_url: String,

    /// Explicit websocket endpoint, overrides --page-url.
    #[arg(long, env = "DSVIZ_WS_URL")]
    ws_url: Option<String>,

    #[arg(long, env = "DSVIZ_BASE_DELAY_MS", default_value_t = 1000)]
    base_delay_ms: u64,

    #[arg(long, env = "DSVIZ_MAX_ATTEMPTS", default_value_t = 5)]
    max_attempts: u32,

    #[arg(long, env = "DSVIZ_CONNECT_TIMEOUT_MS", default_value_t = 10_000)]
    connect_timeout_ms: u64,

    #[arg(long, default_value = "all")]
    filter: FilterState,
}

impl Args {
    fn config(&self) -> anyhow::Result<DashboardConfig> {
        let endpoint = match self.ws_url.as_deref() {
            Some(raw) => endpoint_for(&parse_url(raw)?)?,
            None => endpoint_for(&parse_url(&self.page_url)?)?,
        };
        Ok(DashboardConfig::default()
            .with_endpoint(endpoint)
            .with_backoff(BackoffPolicy {
                base_delay: Duration::from_millis(self.base_delay_ms),
                max_attempts: self.max_attempts,
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            }))
    }
}

fn draw(dash: &Dashboard) {
    let screen = dash.screen(Instant::now(), Utc::now());
    let mut out = std::io::stdout().lock();
    let _ = write!(out, "\x1b[2J\x1b[H{screen}\n{HELP}\n> ");
    let _ = out.flush();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    load_env_file(Path::new(".env"));
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config().context("invalid connection settings")?;
    tracing::info!(endpoint = %config.endpoint, "starting dashboard");

    let (connection, mut events, actor) = spawn_connection(config.endpoint.clone(), config.backoff);
    let mut dash = Dashboard::new(&config, args.filter, connection);
    dash.connection().connect();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(config.tick_interval);
    draw(&dash);

    loop {
        let changed = tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                dash.handle_channel_event(event, Instant::now())
            }
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else { break };
                if line.trim().is_empty() {
                    true
                } else {
                    match line.parse::<UserAction>() {
                        Ok(action) => {
                            if !dash.handle_action(action) {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "bad command"),
                    }
                    true
                }
            }
            _ = ticker.tick() => dash.tick(Instant::now(), Utc::now()),
        };
        if changed {
            draw(&dash);
        }
    }

    dash.connection().disconnect();
    drop(dash);
    let _ = tokio::time::timeout(Duration::from_secs(1), actor).await;
    Ok(())
}
