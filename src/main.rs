//! Lamp Agent - Main Entry Point
//!
//! Bridges an MQTT broker to the relay pin described by the configuration
//! file and runs until SIGINT/SIGTERM.

use clap::{Parser, Subcommand};
use lamp_agent::agent::AgentLifecycle;
use lamp_agent::config::{AgentConfig, ConfigError, GpioBackend};
use lamp_agent::gpio::{LampPin, MemoryPin};
use lamp_agent::observability::init_default_logging;
use lamp_agent::protocol::online_payload;
use lamp_agent::transport::mqtt::{MqttClient, WillMessage};
use std::path::PathBuf;
use std::process;
use tokio::signal;
use tracing::{error, info};

/// MQTT lamp agent
#[derive(Parser)]
#[command(name = "lamp-agent")]
#[command(about = "Expose a GPIO relay as an MQTT-controlled lamp")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent
    Run,
    /// Validate configuration
    Config {
        /// Show the resolved configuration
        #[arg(long)]
        show: bool,
    },
}

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["lamp-agent.toml", "config/lamp-agent.toml"];

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging(cli.verbose);

    info!("Starting lamp agent v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_agent(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn load_configuration(config_path: Option<&PathBuf>) -> Result<AgentConfig, ConfigError> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return AgentConfig::load_from_file(path);
    }

    for path_str in DEFAULT_CONFIG_PATHS {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return AgentConfig::load_from_file(&path);
        }
    }

    Err(ConfigError::InvalidConfig(
        "No configuration file found. Provide one with -c/--config or create lamp-agent.toml"
            .to_string(),
    ))
}

async fn run_agent(config: AgentConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        agent_id = %config.agent.id,
        pin = config.gpio.pin,
        protocol = ?config.lamp.protocol,
        "Application starting"
    );

    match config.gpio.backend {
        GpioBackend::Memory => run_with_pin(&config, MemoryPin::new(config.gpio.pin)).await,
        #[cfg(feature = "rpi")]
        GpioBackend::Rppal => {
            run_with_pin(&config, lamp_agent::gpio::RppalPin::new(config.gpio.pin)).await
        }
        #[cfg(not(feature = "rpi"))]
        GpioBackend::Rppal => Err(ConfigError::InvalidConfig(
            "gpio backend 'rppal' requires the 'rpi' feature".to_string(),
        )
        .into()),
    }
}

/// Wire the pin and MQTT client together and run until a signal arrives
async fn run_with_pin<P: LampPin>(
    config: &AgentConfig,
    pin: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let will = build_will(config)?;
    let transport = MqttClient::new(&config.agent.id, &config.mqtt, will)?;

    let mut agent = AgentLifecycle::new(config, pin, transport)?;
    agent.start().await?;

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
        }
    };

    agent.run_until(shutdown).await?;
    Ok(())
}

/// Last will: a retained "false" on the online topic, if the variant has one
fn build_will(config: &AgentConfig) -> Result<Option<WillMessage>, ConfigError> {
    let qos = config.qos()?;
    Ok(config.lamp.topic_set().online.map(|topic| WillMessage {
        topic,
        payload: online_payload(false).to_vec(),
        qos,
        retain: true,
    }))
}

fn handle_config_command(
    config: &AgentConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
