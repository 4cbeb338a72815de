use clap::Parser;
use spdlog::prelude::*;
use stagger_log::{StaggerOptions, StaggerRegistry, spdlog_shared_sink};
use std::thread;
use std::time::{Duration, Instant};

/// Replays bursty event traffic through a stagger registry and prints the
/// coalesced summary lines.
#[derive(Parser)]
struct Args {
    /// Message to report; repeat for several independent streams.
    #[arg(long = "message", default_values_t = [String::from("Error")])]
    messages: Vec<String>,

    /// Number of bursts per message.
    #[arg(long, default_value_t = 12)]
    bursts: u32,

    /// Events fired per burst.
    #[arg(long, default_value_t = 50)]
    events: u32,

    /// Pause between two events of a burst.
    #[arg(long, default_value_t = 2)]
    spacing_ms: u64,

    /// Quiet time between bursts.
    #[arg(long, default_value_t = 150)]
    pause_ms: u64,

    /// Finest window length.
    #[arg(long, default_value_t = 100)]
    base_interval_ms: u64,

    /// Cap on window doublings.
    #[arg(long, default_value_t = 9)]
    max_factor: u32,

    /// Silence needed to undo one doubling.
    #[arg(long, default_value_t = 1000)]
    cooldown_ms: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let options = StaggerOptions {
        base_interval: Duration::from_millis(args.base_interval_ms),
        max_interval_factor: args.max_factor,
        cooldown: Duration::from_millis(args.cooldown_ms),
    };
    let registry = StaggerRegistry::new(options, Some(spdlog_shared_sink(Level::Info)))?;

    info!(
        "[Demo] {} stream(s), {} bursts of {} events",
        args.messages.len(),
        args.bursts,
        args.events
    );
    let start = Instant::now();

    thread::scope(|scope| {
        for message in &args.messages {
            let registry = &registry;
            let args = &args;
            scope.spawn(move || {
                for _ in 0..args.bursts {
                    for _ in 0..args.events {
                        registry.record(message);
                        thread::sleep(Duration::from_millis(args.spacing_ms));
                    }
                    thread::sleep(Duration::from_millis(args.pause_ms));
                }
            });
        }
    });

    // Let the windows still open report before tearing down.
    let linger = args
        .messages
        .iter()
        .filter_map(|message| registry.logger(message).ok())
        .map(|logger| logger.snapshot())
        .filter(|snapshot| snapshot.collecting)
        .map(|snapshot| snapshot.interval)
        .max()
        .unwrap_or_default();
    thread::sleep(linger);

    let total = u64::from(args.bursts) * u64::from(args.events) * args.messages.len() as u64;
    info!(
        "[Demo] recorded {} events in {:?}",
        total,
        start.elapsed()
    );
    Ok(())
}
