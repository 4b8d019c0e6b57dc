// runtime configuration (link endpoints, polling cadence, file locations)
use anyhow::Result;
use clap::Parser;

#[derive(Debug, Clone)]
pub struct Config {
    pub ground_addr: String,
    pub bind_addr: String,
    pub poll_ms: u64,
    pub upload_timeout_s: u64,
    pub history_path: String,
    pub history_keep: usize,
    pub health_path: String,
    pub debug_led: u8,
}

#[derive(Parser, Debug, Clone)]
pub struct Cli {
    #[arg(long, default_value = "127.0.0.1:7891")] pub ground_addr: String,
    #[arg(long, default_value = "0.0.0.0:7892")]   pub bind_addr: String,
    /// Receive-poll cadence of the protocol loop.
    #[arg(long, default_value_t = 100)]            pub poll_ms: u64,
    /// Give up on a multi-packet upload after this long without progress (0 disables).
    #[arg(long, default_value_t = 60)]             pub upload_timeout_s: u64,
    #[arg(long, default_value = "history.d3")]     pub history_path: String,
    #[arg(long, default_value_t = 10)]             pub history_keep: usize,
    #[arg(long, default_value = "health.csv")]     pub health_path: String,
    #[arg(long, default_value_t = 0)]              pub debug_led: u8,
}

impl Cli {
    pub fn parse_and_build_config() -> Result<Config> {
        let c = <Cli as Parser>::parse();
        Ok(Config {
            ground_addr: c.ground_addr,
            bind_addr: c.bind_addr,
            poll_ms: c.poll_ms,
            upload_timeout_s: c.upload_timeout_s,
            history_path: c.history_path,
            history_keep: c.history_keep,
            health_path: c.health_path,
            debug_led: c.debug_led,
        })
    }
}
