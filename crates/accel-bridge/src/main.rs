// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MQTT to InfluxDB Bridge CLI
//!
//! # Usage
//!
//! ```bash
//! # Run with built-in defaults
//! accel-bridge
//!
//! # Using configuration file
//! accel-bridge --config bridge.toml
//!
//! # Generate / check a configuration file
//! accel-bridge gen-config --output bridge.toml
//! accel-bridge validate --config bridge.toml
//! ```

use accel_bridge::transport::mqtt_client;
use accel_bridge::{
    bootstrap, BridgeConfig, InfluxClient, IngestPipeline, PipelineStatsSnapshot,
    TransportAdapter,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// MQTT to InfluxDB bridge for motion-sensor readings
#[derive(Parser, Debug)]
#[command(name = "accel-bridge")]
#[command(about = "MQTT to InfluxDB bridge for motion-sensor readings")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a configuration file holding the defaults
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "bridge.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(cmd) = args.command {
        return match cmd {
            Commands::GenConfig { output } => cmd_gen_config(output),
            Commands::Validate { config } => cmd_validate(config),
        };
    }

    let config = match args.config {
        Some(ref path) => BridgeConfig::from_file(path)?,
        None => BridgeConfig::default(),
    };

    // Initialize logging
    let level = args.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::info!("{} v{}", config.name, env!("CARGO_PKG_VERSION"));

    // Store first: no message is accepted without a confirmed write target.
    let store = Arc::new(InfluxClient::new(&config.influxdb)?);
    let database = match bootstrap(store.as_ref(), &config.influxdb.database).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!("Bootstrap against {} failed: {}", config.influxdb.url(), err);
            return Err(err.into());
        }
    };
    let pipeline = IngestPipeline::new(store, database);
    tracing::info!(
        "Connected to InfluxDB at {}, database '{}'",
        config.influxdb.url(),
        pipeline.database()
    );
    let stats = pipeline.stats();

    let (tx, rx) = mpsc::channel(config.mqtt.channel_capacity);
    let (client, eventloop) = mqtt_client(&config.mqtt);
    let adapter = TransportAdapter::new(client, config.mqtt.topic.clone(), tx);
    let reconnect_delay = config.mqtt.reconnect_delay();

    tracing::info!(
        "Connecting to MQTT broker {}:{} as '{}', topic '{}'",
        config.mqtt.host,
        config.mqtt.port,
        config.mqtt.client_id,
        adapter.topic()
    );
    let transport = tokio::spawn(async move {
        if let Err(err) = adapter.run(eventloop, reconnect_delay).await {
            tracing::info!("Transport stopped: {}", err);
        }
    });

    // Stats reporting task
    let stats_interval = config.stats_interval_secs;
    if stats_interval > 0 {
        let stats = Arc::clone(&stats);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(stats_interval));
            interval.tick().await;
            loop {
                interval.tick().await;
                log_stats(&stats.snapshot());
            }
        });
    }

    let mut pipeline_task = tokio::spawn(async move { pipeline.run(rx).await });

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down...");
            // Dropping the adapter closes the channel; the pipeline then
            // drains what is already queued and returns.
            transport.abort();
            if let Err(e) = transport.await {
                if !e.is_cancelled() {
                    tracing::error!("Transport task failed: {}", e);
                }
            }
            if let Err(e) = pipeline_task.await {
                tracing::error!("Pipeline task failed while draining: {}", e);
            }
        }
        result = &mut pipeline_task => {
            match result {
                Ok(()) => tracing::warn!("Pipeline exited"),
                Err(e) => tracing::error!("Pipeline task failed: {}", e),
            }
        }
    }

    tracing::info!("Final statistics:");
    log_stats(&stats.snapshot());

    Ok(())
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = toml::to_string_pretty(&BridgeConfig::default())?;

    let content = format!(
        r#"# MQTT to InfluxDB Bridge Configuration
# Generated by accel-bridge gen-config

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match BridgeConfig::from_file(&config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Bridge:   {}", config.name);
            println!(
                "InfluxDB: {} (database '{}')",
                config.influxdb.url(),
                config.influxdb.database
            );
            println!(
                "MQTT:     {}:{} topic '{}' client '{}'",
                config.mqtt.host, config.mqtt.port, config.mqtt.topic, config.mqtt.client_id
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

fn log_stats(stats: &PipelineStatsSnapshot) {
    tracing::info!(
        "{} msgs ({:.1} msg/s), {} decoded, {} decode errors, {} batches / {} points written, {} write errors",
        stats.messages_received,
        stats.messages_per_second(),
        stats.messages_decoded,
        stats.decode_errors,
        stats.batches_written,
        stats.points_written,
        stats.write_errors
    );
}
