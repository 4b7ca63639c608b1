// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use ucp_runner::archive::MemoryArchive;
use ucp_runner::config::{load_and_validate_config, EngineConfig, RuntimeBuilder};
use ucp_runner::engine::ReceiptStatus;
use ucp_runner::packet::Packet;

/// Initialize tracing subscriber for logging
fn init_logging() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}

fn load_packet(path: &str) -> Result<Packet> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read packet {}", path))?;
    Packet::from_json_str(&text).map_err(|errors| {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::anyhow!("Invalid packet {}:\n  {}", path, details.join("\n  "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <packet.json> [engine.yaml]", args[0]);
        eprintln!("Example: {} demos/packets/fan-out.json demos/engine.yaml", args[0]);
        std::process::exit(2);
    }

    init_logging()?;

    let config = match args.get(2) {
        Some(path) => load_and_validate_config(path)
            .with_context(|| format!("Failed to load engine config {}", path))?,
        None => EngineConfig::default(),
    };
    let packet = load_packet(&args[1])?;

    let runtime = RuntimeBuilder::from_config(config)
        .with_archive(Arc::new(MemoryArchive::new()))
        .build();
    let engine = runtime.engine(packet);

    let cancel = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, aborting packet");
            cancel.cancel();
        }
    });

    let started = Instant::now();
    let receipt = engine.execute().await?;
    eprintln!(
        "{} {} in {:?} ({} operations)",
        receipt.status,
        receipt.packet_id,
        started.elapsed(),
        receipt.all_outcomes().len()
    );
    println!("{}", serde_json::to_string_pretty(&receipt)?);

    if receipt.status == ReceiptStatus::Failed {
        bail!("Packet {} failed", receipt.packet_id);
    }
    Ok(())
}
