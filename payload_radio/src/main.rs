// src/main.rs
mod commands;
mod config;
mod downlink;
mod errors;
mod logging;
mod radio;
mod transport;
mod uplink;

use anyhow::Result;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::radio::{PollOutcome, Radio};
use crate::transport::udp::UdpTransport;

#[tokio::main]
async fn main() -> Result<()> {
    // -------- logging ----------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("payload_radio=info".parse().unwrap())
                .add_directive("link_protocol=info".parse().unwrap()),
        )
        .compact()
        .init();

    // -------- config + transport ----------
    let cfg = config::Cli::parse_and_build_config()?;
    info!(?cfg, "payload radio starting");
    let transport = UdpTransport::connect(&cfg)?;

    // -------- protocol engine ----------
    let mut radio = Radio::new(&cfg, transport);
    if let Err(e) = radio.packager_mut().send_string("payload radio online") {
        warn!(%e, "boot banner downlink failed");
    }

    // -------- poll loop ----------
    let mut tick = time::interval(Duration::from_millis(cfg.poll_ms));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(poll_ms = cfg.poll_ms, "radio running. Press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = tick.tick() => {
                match radio.poll() {
                    Ok(PollOutcome::Idle) => {}
                    Ok(PollOutcome::Responded(code)) => info!(?code, "telecommand handled"),
                    Err(e) => warn!(%e, "poll error"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received; exiting.");
                break;
            }
        }
    }
    Ok(())
}
