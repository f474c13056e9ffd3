use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use schemagate_registry::Snapshot;

use crate::cmd::{open_registry, WatchArgs};
use crate::exit::{registry_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct PublishOutput {
    schema_id: &'static str,
    generation: u64,
    loaded: Vec<String>,
    failures: Vec<String>,
}

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let registry = open_registry(&args.dir, false)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut seen = registry.snapshot();
    print_publish(&seen, format);

    let handle = registry
        .watch(interval)
        .map_err(|err| registry_error("starting watcher", err))?;
    info!(
        dir = %args.dir.display(),
        ?interval,
        event_driven = handle.is_event_driven(),
        "watching schema directory"
    );

    let tick = interval.min(Duration::from_millis(100));
    while running.load(Ordering::SeqCst) {
        thread::sleep(tick);
        let current = registry.snapshot();
        if current.generation() != seen.generation() {
            print_publish(&current, format);
            seen = current;
        }
    }

    handle.stop();
    info!("schema watcher stopped");
    Ok(SUCCESS)
}

fn print_publish(snapshot: &Snapshot, format: OutputFormat) {
    let failures: Vec<String> = snapshot
        .failures()
        .iter()
        .map(|failure| format!("{}: {}", failure.name, failure.error))
        .collect();

    match format {
        OutputFormat::Json => print_json(&PublishOutput {
            schema_id: "https://schemas.3leaps.dev/schemagate/cli/v1/publish-event.schema.json",
            generation: snapshot.generation(),
            loaded: snapshot.names(),
            failures,
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "generation {}: {} loaded, {} failed",
                snapshot.generation(),
                snapshot.len(),
                failures.len()
            );
            for failure in &failures {
                println!("  [FAIL] {failure}");
            }
        }
        OutputFormat::Raw => println!("{}", snapshot.generation()),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
