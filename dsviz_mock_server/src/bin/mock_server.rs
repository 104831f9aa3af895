use crossbeam_channel::bounded;
use dsviz_mock_server::{Backend, DemoStructure, MainLoop, Mutation, NetworkThread};
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const TICK: Duration = Duration::from_millis(33);
/// Every this many demo steps a fresh tree is registered and pushed as a snapshot.
const REGISTER_EVERY: u32 = 10;

fn parse_arg_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn random_mutation(backend: &Backend) -> Option<(String, Mutation)> {
    let mut rng = thread_rng();
    let ids: Vec<&str> = backend.ids().collect();
    let id = *ids.choose(&mut rng)?;
    let value = rng.gen_range(1..100);
    let mutation = match backend.get(id)? {
        DemoStructure::List(_) => Mutation::Append(value),
        DemoStructure::Stack(items) if items.len() > 6 || (!items.is_empty() && rng.gen_bool(0.4)) => {
            Mutation::Pop
        }
        DemoStructure::Stack(_) => Mutation::Push(value),
        DemoStructure::Queue(items) if items.len() > 6 || (!items.is_empty() && rng.gen_bool(0.4)) => {
            Mutation::Dequeue
        }
        DemoStructure::Queue(_) => Mutation::Enqueue(value),
        DemoStructure::Tree(_) => Mutation::Insert(value),
    };
    Some((id.to_string(), mutation))
}

fn random_tree() -> DemoStructure {
    let mut rng = thread_rng();
    let len = rng.gen_range(3..8);
    let values: Vec<i64> = (0..len).map(|_| rng.gen_range(1..100)).collect();
    DemoStructure::tree_from(&values)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    let addr = parse_arg_value(&args, "--addr")
        .or_else(|| std::env::var("DSVIZ_MOCK_ADDR").ok())
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let addr_file = parse_arg_value(&args, "--addr-file").map(PathBuf::from);
    let run_for = parse_arg_value(&args, "--run-for-ms")
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis);
    let interval = parse_arg_value(&args, "--interval-ms")
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(1500));

    let (in_tx, in_rx) = bounded(dsviz_mock_server::INBOUND_CAP);
    let (out_tx, out_rx) = bounded(dsviz_mock_server::OUTBOUND_CAP);

    let net = match NetworkThread::spawn_with_addr(&addr, in_tx, out_rx) {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "failed to start");
            std::process::exit(1);
        }
    };

    if let Some(path) = &addr_file {
        if let Err(e) = fs::write(path, net.listen_addr().to_string()) {
            tracing::warn!(path = %path.display(), error = %e, "could not write addr file");
        }
    }

    println!("mock_server listening on ws://{}/ws", net.listen_addr());

    let mut main_loop = MainLoop::new(in_rx, out_tx, Backend::with_demo_data());

    let start = Instant::now();
    let mut next_mutation = start + interval;
    let mut steps: u32 = 0;
    loop {
        main_loop.tick();

        if Instant::now() >= next_mutation {
            next_mutation += interval;
            steps += 1;
            if steps % REGISTER_EVERY == 0 {
                main_loop.register("t2", random_tree());
            } else if let Some((id, mutation)) = random_mutation(main_loop.backend()) {
                if let Err(e) = main_loop.apply(&id, mutation) {
                    tracing::warn!(%id, error = %e, "demo mutation rejected");
                }
            }
        }

        thread::sleep(TICK);
        if let Some(max) = run_for {
            if start.elapsed() >= max {
                break;
            }
        }
    }

    net.shutdown();
}
