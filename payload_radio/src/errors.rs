// thiserror-based error types for the protocol engine
use std::path::PathBuf;

use link_protocol::ProtocolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RadioError {
    #[error("protocol: {0}")] Protocol(#[from] ProtocolError),
    #[error("IO: {0}")] Io(#[from] std::io::Error),
    #[error("no backup exists for {}", .0.display())] NoBackup(PathBuf),
    #[error("file unavailable: {}", .0.display())] FileUnavailable(PathBuf),
    #[error("unknown telecommand 0x{0:02x}")] UnknownTelecommand(u8),
    #[error("malformed parameters for {0:?}")] BadParams(link_protocol::Telecommand),
}

pub type Result<T> = std::result::Result<T, RadioError>;
