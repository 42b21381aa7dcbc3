//! SetuBridge daemon
//!
//! Reads bus traffic from a recording or over TCP, keeps the live and
//! mission maps rendered under the output directory, and pushes
//! notifications to TCP clients.

use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use setu_bridge::config::SourceKind;
use setu_bridge::io::{self, ReplaySource, TcpServer};
use setu_bridge::{
    ArtifactStore, Bridge, Broadcaster, Config, Error, FileStore, Notifier, Result,
};

/// How long to let queued renders finish before shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["setu-bridge.toml", "/etc/setu-bridge.toml"];

struct Args {
    config_path: Option<String>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args { config_path: None };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    result.config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn print_help() {
    println!("setu-bridge - map render bridge for robot fleets");
    println!();
    println!("USAGE:");
    println!("    setu-bridge [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>     Configuration file (default: setu-bridge.toml)");
    println!("    -h, --help              Print help information");
    println!();
    println!("CONFIGURATION:");
    println!("    - [input] source: replay | tcp");
    println!("    - [input] replay_file, speed, loop_playback: recording playback");
    println!("    - [input] bind_address: TCP listen address");
    println!("    - [topics] map, odometry, trajectory_prefix, mission_status_prefix");
    println!("    - [output] directory: where rendered maps are written");
    println!("    - [render] convention, marker_half_width, palette");
}

/// Result of config discovery. Logged once the logger exists.
struct LoadedConfig {
    config: Config,
    source: Option<String>,
    warning: Option<String>,
}

fn load_config(args: &Args) -> LoadedConfig {
    match &args.config_path {
        Some(path) => match Config::from_file(path) {
            Ok(config) => LoadedConfig {
                config,
                source: Some(path.clone()),
                warning: None,
            },
            Err(e) => LoadedConfig {
                config: Config::default(),
                source: None,
                warning: Some(format!("Failed to load config {}: {}", path, e)),
            },
        },
        None => {
            for path in DEFAULT_CONFIG_PATHS {
                if fs::metadata(path).is_ok()
                    && let Ok(config) = Config::from_file(path)
                {
                    return LoadedConfig {
                        config,
                        source: Some(path.to_string()),
                        warning: None,
                    };
                }
            }
            LoadedConfig {
                config: Config::default(),
                source: None,
                warning: None,
            }
        }
    }
}

fn open_store(config: &Config) -> Result<FileStore> {
    match FileStore::new(&config.output.directory) {
        Ok(store) => Ok(store),
        Err(e) => {
            log::warn!(
                "Output directory {} unusable: {}",
                config.output.directory,
                e
            );
            let temp_path = std::env::temp_dir().join("setu_maps");
            let store = FileStore::new(&temp_path)?;
            log::info!("Using temp output directory: {:?}", temp_path);
            Ok(store)
        }
    }
}

fn main() -> Result<()> {
    let args = parse_args();
    let loaded = load_config(&args);
    let config = loaded.config;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .format(|buf, record| {
        writeln!(
            buf,
            "[{}] {} - {}",
            record.level(),
            record.target(),
            record.args()
        )
    })
    .init();

    log::info!("setu-bridge starting");
    if let Some(warning) = loaded.warning {
        log::warn!("{}", warning);
    }
    match loaded.source {
        Some(path) => log::info!("  Config: {}", path),
        None => log::info!("  Config: defaults"),
    }
    log::info!("  Output: {}", config.output.directory);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let store: Arc<dyn ArtifactStore> = Arc::new(open_store(&config)?);
    let broadcaster = Arc::new(Broadcaster::new());
    let notifier: Arc<dyn Notifier> = broadcaster.clone();
    let bridge = Arc::new(Bridge::new(
        &config,
        store,
        notifier,
        Arc::clone(&running),
    )?);

    let result = run_source(&config, &bridge, broadcaster, &running);
    if let Err(ref e) = result {
        log::error!("Input error: {}", e);
    }

    // Workers stop with the running flag, so only drain on a normal end of input.
    if running.load(Ordering::Relaxed) && !bridge.wait_idle(DRAIN_TIMEOUT) {
        log::warn!("Renders still pending after {:?}", DRAIN_TIMEOUT);
    }
    running.store(false, Ordering::Relaxed);

    log::info!("Shutting down...");
    log::info!("{}", bridge.metrics().snapshot());
    match Arc::try_unwrap(bridge) {
        Ok(bridge) => bridge.shutdown(),
        Err(_) => log::warn!("Bridge still shared at shutdown, not joining workers"),
    }

    log::info!("setu-bridge stopped");
    result
}

fn run_source(
    config: &Config,
    bridge: &Arc<Bridge>,
    broadcaster: Arc<Broadcaster>,
    running: &Arc<AtomicBool>,
) -> Result<()> {
    match config.input.source {
        SourceKind::Replay => {
            let path = config
                .input
                .replay_file
                .as_deref()
                .ok_or_else(|| Error::Other("input.replay_file is not set".to_string()))?;
            log::info!(
                "  Input: recording {} (speed {}, loop {})",
                path,
                config.input.speed,
                config.input.loop_playback
            );
            let mut source = ReplaySource::open(path)?;
            source.set_speed(config.input.speed);
            io::play(&mut source, bridge, running, config.input.loop_playback)?;
            Ok(())
        }
        SourceKind::Tcp => {
            let server = TcpServer::bind(
                &config.input.bind_address,
                Arc::clone(bridge),
                broadcaster,
                Arc::clone(running),
            )?;
            log::info!("setu-bridge running. Press Ctrl-C to stop.");
            server.run();
            Ok(())
        }
    }
}
