// src/main.rs

//! Process bootstrap (§1, §10): parse CLI flags, load configuration, set up
//! logging, and hand off to `server::run`. Everything here is thin shell
//! duty — the scheduler core never sees a `std::env::args()`.

use anyhow::Result;
use nebula_scheduler::config::Config;
use nebula_scheduler::server;
use std::env;
use std::fs::File;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*, reload};

#[tokio::main]
async fn main() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--version") {
        println!("nebula-scheduler {VERSION}");
        return Ok(());
    }

    let flag_value = |name: &str| -> Option<String> {
        args.iter()
            .position(|a| a == name)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };

    let config_path = flag_value("--config").unwrap_or_else(|| "config.toml".to_string());

    let mut config = match Config::from_file(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load configuration from '{config_path}': {e}");
            std::process::exit(1);
        }
    };

    if let Some(cert) = flag_value("--cert") {
        config.tls.cert_path = Some(cert);
    }
    if let Some(cacert) = flag_value("--cacert") {
        config.tls.ca_path = Some(cacert);
    }
    if let Some(secs) = flag_value("--heartbeat") {
        match secs.parse::<u64>() {
            Ok(v) => config.heartbeat_interval_secs = v,
            Err(_) => {
                eprintln!("--heartbeat requires an integer number of seconds");
                std::process::exit(1);
            }
        }
    }

    let initial_log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    let (filter, reload_handle) = reload::Layer::new(EnvFilter::new(initial_log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact().with_ansi(true))
        .init();
    let reload_handle = Arc::new(reload_handle);

    let cpuprofile_path = flag_value("--cpuprofile");
    let profiler_guard = cpuprofile_path
        .as_deref()
        .map(start_profiler)
        .transpose()?;

    info!(version = VERSION, "starting nebula-scheduler");

    let result = server::run(config, reload_handle).await;

    if let (Some(guard), Some(path)) = (profiler_guard, cpuprofile_path.as_deref()) {
        write_flamegraph(guard, path);
    }

    if let Err(e) = &result {
        error!("scheduler exited with an error: {e}");
    }
    result
}

/// Starts a CPU profiler for the duration of the run (§10, `--cpuprofile`).
/// Purely a diagnostic convenience; failure to start is fatal only here,
/// never inside `server::run`.
fn start_profiler(_path: &str) -> Result<pprof::ProfilerGuard<'static>> {
    pprof::ProfilerGuardBuilder::default()
        .frequency(1000)
        .blocklist(&["libc", "libgcc", "pthread", "vdso"])
        .build()
        .map_err(|e| anyhow::anyhow!("failed to start CPU profiler: {e}"))
}

fn write_flamegraph(guard: pprof::ProfilerGuard<'static>, path: &str) {
    match guard.report().build() {
        Ok(report) => match File::create(path) {
            Ok(file) => {
                if let Err(e) = report.flamegraph(file) {
                    error!("failed to write flamegraph to '{path}': {e}");
                } else {
                    info!("wrote CPU profile flamegraph to '{path}'");
                }
            }
            Err(e) => error!("failed to create flamegraph file '{path}': {e}"),
        },
        Err(e) => error!("failed to build CPU profile report: {e}"),
    }
}
