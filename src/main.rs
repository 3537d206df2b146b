//! DhruvaMCL - Monte Carlo Localization daemon.
//!
//! Localizes a robot on a known occupancy map from UDP odometry and
//! lidar scans, streaming pose estimates, particle clouds and the
//! map->odom correction to TCP clients.
//!
//! # Usage
//!
//! ```bash
//! # With default config
//! cargo run --release -- --map maps/office.json
//!
//! # With custom config file
//! cargo run --release -- --config dhruva-mcl.toml
//! ```

use std::fs;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Deserialize;

use dhruva_mcl::io::{PublisherConfig, ReceiverConfig, SensorReceiver, StreamPublisher, StreamServer};
use dhruva_mcl::localization::{
    FilterConfig, MclFilter, MotionModelConfig, ResamplerConfig, SensorModelConfig,
};
use dhruva_mcl::map::OccupancyField;
use dhruva_mcl::state::create_shared_state;
use dhruva_mcl::tf::CorrectionSlot;
use dhruva_mcl::threads::{
    CorrectionThread, CorrectionThreadConfig, EstimationThread, EstimationThreadConfig,
    PublisherThread, PublisherThreadConfig,
};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Deserialize, Default)]
struct Config {
    #[serde(default)]
    source: SourceConfig,
    #[serde(default)]
    output: OutputConfig,
    #[serde(default)]
    map: MapConfig,
    #[serde(default)]
    filter: FilterCfg,
    #[serde(default)]
    noise: NoiseConfig,
    #[serde(default)]
    sensor: SensorConfig,
    #[serde(default)]
    estimation: EstimationConfig,
    #[serde(default)]
    transform: TransformConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SourceConfig {
    /// UDP port for incoming sensor data.
    udp_port: u16,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { udp_port: 5600 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OutputConfig {
    /// TCP port for visualization clients.
    bind_port: u16,
    /// State publish rate period (milliseconds).
    publish_period_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bind_port: 5601,
            publish_period_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct MapConfig {
    /// Path to the map file (JSON with base64 cells).
    file: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FilterCfg {
    initial_particles: usize,
    min_particles: usize,
    decay_rate: f64,
    /// Per-axis linear update threshold (meters).
    d_thresh: f64,
    /// Angular update threshold (radians).
    a_thresh: f64,
    /// Random seed (0 for entropy).
    seed: u64,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            initial_particles: 300,
            min_particles: 50,
            decay_rate: 0.98,
            d_thresh: 0.02,
            a_thresh: std::f64::consts::PI / 6.0,
            seed: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct NoiseConfig {
    sigma_xy_odom: f64,
    sigma_theta_odom: f64,
    sigma_xy_resample: f64,
    sigma_theta_resample: f64,
    sigma_xy_init: f64,
    sigma_theta_init: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            sigma_xy_odom: 0.1,
            sigma_theta_odom: 0.1,
            sigma_xy_resample: 0.07,
            sigma_theta_resample: 0.3,
            sigma_xy_init: 0.4,
            sigma_theta_init: 0.3,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SensorConfig {
    /// Scan endpoints closer than this to an obstacle count as hits (meters).
    close_obstacle_dist: f64,
    /// Lidar mounting offset along the robot x axis (meters).
    lidar_offset_x: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            close_obstacle_dist: 0.01,
            lidar_offset_x: -0.084,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct EstimationConfig {
    /// Estimation loop poll interval (milliseconds).
    poll_interval_ms: u64,
    /// Odometry history retention (milliseconds).
    odom_retention_ms: u64,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            odom_retention_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TransformConfig {
    /// Correction publish period (milliseconds).
    publish_period_ms: u64,
    /// Future stamp offset for published corrections (milliseconds).
    lookahead_ms: u64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            publish_period_ms: 50,
            lookahead_ms: 100,
        }
    }
}

// ============================================================================
// Argument parsing
// ============================================================================

struct Args {
    config_path: Option<String>,
    map_path: Option<String>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args {
        config_path: None,
        map_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    result.config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--map" | "-m" => {
                if i + 1 < args.len() {
                    result.map_path = Some(args[i + 1].clone());
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
    println!("dhruva-mcl - Monte Carlo Localization daemon");
    println!();
    println!("USAGE:");
    println!("    dhruva-mcl [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>   Config file path (TOML)");
    println!("    -m, --map <FILE>      Map file path (overrides config)");
    println!("    -h, --help            Print help");
}

fn load_config(args: &Args) -> Config {
    match &args.config_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(contents) => match basic_toml::from_str(&contents) {
                Ok(cfg) => {
                    log::info!("Loaded config from {}", path);
                    cfg
                }
                Err(e) => {
                    log::warn!("Failed to parse config {}: {}", path, e);
                    Config::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read config {}: {}", path, e);
                Config::default()
            }
        },
        None => {
            for path in &["dhruva-mcl.toml", "/etc/dhruva-mcl.toml"] {
                if let Ok(contents) = fs::read_to_string(path) {
                    if let Ok(cfg) = basic_toml::from_str(&contents) {
                        log::info!("Loaded config from {}", path);
                        return cfg;
                    }
                }
            }
            log::info!("No config file found, using defaults");
            Config::default()
        }
    }
}

fn filter_config(config: &Config) -> FilterConfig {
    FilterConfig {
        initial_particles: config.filter.initial_particles,
        min_particles: config.filter.min_particles,
        decay_rate: config.filter.decay_rate,
        d_thresh: config.filter.d_thresh,
        a_thresh: config.filter.a_thresh,
        sigma_xy_init: config.noise.sigma_xy_init,
        sigma_theta_init: config.noise.sigma_theta_init,
        motion: MotionModelConfig {
            sigma_xy: config.noise.sigma_xy_odom,
            sigma_theta: config.noise.sigma_theta_odom,
        },
        sensor: SensorModelConfig {
            close_obstacle_dist: config.sensor.close_obstacle_dist,
            lidar_offset_x: config.sensor.lidar_offset_x,
        },
        resample: ResamplerConfig {
            sigma_xy: config.noise.sigma_xy_resample,
            sigma_theta: config.noise.sigma_theta_resample,
        },
        seed: config.filter.seed,
    }
}

// ============================================================================
// Daemon
// ============================================================================

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
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

    let args = parse_args();
    let config = load_config(&args);

    log::info!("dhruva-mcl starting");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .expect("Error setting Ctrl-C handler");

    if let Err(e) = run_daemon(&config, &args, running) {
        log::error!("Daemon error: {}", e);
        std::process::exit(1);
    }

    log::info!("dhruva-mcl shutdown complete");
}

fn run_daemon(
    config: &Config,
    args: &Args,
    running: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load the map
    let map_path = args
        .map_path
        .as_ref()
        .or(config.map.file.as_ref())
        .ok_or("no map file configured (use --map or [map] file in config)")?;
    let map = Arc::new(OccupancyField::load(map_path)?);
    let (width, height) = map.dimensions();
    log::info!(
        "Loaded map {} ({}x{} cells @ {:.3} m, {} free)",
        map_path,
        width,
        height,
        map.resolution(),
        map.free_cell_count()
    );

    // 2. Shared state and correction slot
    let shared_state = create_shared_state();
    let correction_slot = CorrectionSlot::new();

    // 3. Filter
    let filter = MclFilter::new(filter_config(config), Arc::clone(&map))?;

    // 4. Sensor input (UDP)
    let receiver_config = ReceiverConfig {
        bind_addr: format!("0.0.0.0:{}", config.source.udp_port),
    };
    let (receiver, odom_rx, scan_rx, command_rx) =
        SensorReceiver::new(receiver_config, Arc::clone(&running))?;
    let receiver_handle = std::thread::Builder::new()
        .name("sensor-rx".into())
        .spawn(move || receiver.run())?;

    // 5. Stream output (TCP)
    let publisher_config = PublisherConfig {
        bind_addr: format!("0.0.0.0:{}", config.output.bind_port),
    };
    let server = StreamServer::new(publisher_config, Arc::clone(&running))?;
    let publisher = StreamPublisher::new(server.clients());
    let server_handle = std::thread::Builder::new()
        .name("stream-accept".into())
        .spawn(move || server.run())?;

    // 6. Worker threads
    let estimation = EstimationThread::spawn(
        EstimationThreadConfig {
            poll_interval_ms: config.estimation.poll_interval_ms,
            odom_retention_us: config.estimation.odom_retention_ms * 1_000,
        },
        filter,
        odom_rx,
        scan_rx,
        command_rx,
        Arc::clone(&shared_state),
        correction_slot.clone(),
        Arc::clone(&running),
    );
    let correction = CorrectionThread::spawn(
        CorrectionThreadConfig {
            publish_period_ms: config.transform.publish_period_ms,
            lookahead_ms: config.transform.lookahead_ms,
        },
        correction_slot,
        publisher.clone(),
        Arc::clone(&running),
    );
    let state_publisher = PublisherThread::spawn(
        PublisherThreadConfig {
            publish_period_ms: config.output.publish_period_ms,
        },
        shared_state,
        publisher,
        Arc::clone(&running),
    );

    log::info!(
        "Daemon running (sensor UDP :{}, stream TCP :{})",
        config.source.udp_port,
        config.output.bind_port
    );

    // 7. Wait for shutdown
    if estimation.join().is_err() {
        log::error!("estimation thread panicked");
    }
    if correction.join().is_err() {
        log::error!("correction thread panicked");
    }
    if state_publisher.join().is_err() {
        log::error!("publisher thread panicked");
    }
    if receiver_handle.join().is_err() {
        log::error!("sensor receiver thread panicked");
    }
    if server_handle.join().is_err() {
        log::error!("stream server thread panicked");
    }

    Ok(())
}
