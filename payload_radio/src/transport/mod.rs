use std::io;

#[cfg(test)]
use mockall::automock;

pub mod udp;

#[cfg(test)]
pub mod memory;

/// Byte-stream and debug-GPIO surface of the transceiver hardware. The
/// protocol engine only ever talks to the radio through this boundary, so it
/// runs unmodified against UDP on the bench and against the I2C-backed
/// implementation on the flight computer.
#[cfg_attr(test, automock)]
pub trait Transport {
    /// Non-blocking receive; returns an empty buffer when the link is idle.
    fn receive(&mut self) -> io::Result<Vec<u8>>;

    /// Blocking send of one framed packet.
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn led_on(&mut self, led: u8) -> io::Result<()>;
    fn led_off(&mut self, led: u8) -> io::Result<()>;
    fn led_toggle(&mut self, led: u8) -> io::Result<()>;
}
