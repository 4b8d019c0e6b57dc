use std::collections::VecDeque;
use std::io;

use super::Transport;

/// In-memory transport for unit tests: queued inbound frames, captured
/// outbound frames, recorded LED actions.
#[derive(Default)]
pub struct MemoryTransport {
    pub inbound: VecDeque<Vec<u8>>,
    pub sent: Vec<Vec<u8>>,
    pub led_events: Vec<(u8, &'static str)>,
}

impl MemoryTransport {
    pub fn queue(&mut self, frame: Vec<u8>) {
        self.inbound.push_back(frame);
    }
}

impl Transport for MemoryTransport {
    fn receive(&mut self) -> io::Result<Vec<u8>> {
        Ok(self.inbound.pop_front().unwrap_or_default())
    }

    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.sent.push(bytes.to_vec());
        Ok(())
    }

    fn led_on(&mut self, led: u8) -> io::Result<()> {
        self.led_events.push((led, "on"));
        Ok(())
    }

    fn led_off(&mut self, led: u8) -> io::Result<()> {
        self.led_events.push((led, "off"));
        Ok(())
    }

    fn led_toggle(&mut self, led: u8) -> io::Result<()> {
        self.led_events.push((led, "toggle"));
        Ok(())
    }
}
