use std::fs;
use std::path::Path;

use link_protocol::{
    EOF_MARKER, MAX_CHUNK_LEN, MAX_FIRST_CHUNK_LEN, Packet, SOF_MARKER, Telecommand, num_packets,
};
use tracing::{debug, warn};

use crate::errors::{RadioError, Result};
use crate::transport::Transport;

/// Outbound packetizer: splits a logical payload into envelope-sized packets
/// and drives them through the transport. The return path carries no
/// acknowledgments; the ground station re-uplinks if it wants a retransmit.
///
/// First packet payload:        `code | seq=1 | total | data`
/// Continuation packet payload: `code | seq   | data`
pub struct Packager<T: Transport> {
    transport: T,
}

impl<T: Transport> Packager<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn send(&mut self, code: Telecommand, data: &[u8]) -> Result<()> {
        let total = num_packets(data.len())?;

        let first_len = data.len().min(MAX_FIRST_CHUNK_LEN);
        let mut payload = Vec::with_capacity(3 + first_len);
        payload.push(code.code());
        payload.push(1);
        payload.push(total);
        payload.extend_from_slice(&data[..first_len]);
        self.send_frame(payload)?;

        for (i, chunk) in data[first_len..].chunks(MAX_CHUNK_LEN).enumerate() {
            let mut payload = Vec::with_capacity(2 + chunk.len());
            payload.push(code.code());
            payload.push((i + 2) as u8);
            payload.extend_from_slice(chunk);
            self.send_frame(payload)?;
        }

        debug!(?code, packets = total, bytes = data.len(), "downlink sent");
        Ok(())
    }

    /// Downlinks a whole file, delimited by the start/end-of-file markers the
    /// ground station strips on reassembly. An unreadable file is reported to
    /// the far end with the single `FileUnavailable` signal byte.
    pub fn send_file(&mut self, path: &Path) -> Result<()> {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), %e, "file unavailable for downlink");
                self.send_signal(Telecommand::FileUnavailable)?;
                return Err(RadioError::FileUnavailable(path.to_path_buf()));
            }
        };
        let mut data = Vec::with_capacity(content.len() + 2);
        data.push(SOF_MARKER);
        data.extend_from_slice(&content);
        data.push(EOF_MARKER);
        self.send(Telecommand::DownlinkFile, &data)
    }

    pub fn send_string(&mut self, text: &str) -> Result<()> {
        self.send(Telecommand::DownlinkString, text.as_bytes())
    }

    /// One-packet status/error downlink carrying nothing but the code.
    pub fn send_signal(&mut self, code: Telecommand) -> Result<()> {
        self.send(code, &[])
    }

    pub fn debug_on(&mut self, led: u8) -> Result<()> {
        self.transport.led_on(led)?;
        Ok(())
    }

    pub fn debug_off(&mut self, led: u8) -> Result<()> {
        self.transport.led_off(led)?;
        Ok(())
    }

    pub fn debug_toggle(&mut self, led: u8) -> Result<()> {
        self.transport.led_toggle(led)?;
        Ok(())
    }

    fn send_frame(&mut self, payload: Vec<u8>) -> Result<()> {
        let packet = Packet::encode(payload)?;
        self.transport.send(&packet.to_bytes())?;
        Ok(())
    }
}
