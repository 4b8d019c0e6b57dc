use std::io;
use std::net::UdpSocket;

use tracing::info;

use super::Transport;
use crate::config::Config;

/// Bench transport: one socket connected towards the ground station for
/// sends, one non-blocking socket bound locally for receives. LED actions
/// have no GPIO here and are logged instead.
pub struct UdpTransport {
    tx: UdpSocket,
    rx: UdpSocket,
}

impl UdpTransport {
    pub fn connect(cfg: &Config) -> io::Result<Self> {
        let tx = UdpSocket::bind("0.0.0.0:0")?;
        tx.connect(&cfg.ground_addr)?;
        let rx = UdpSocket::bind(&cfg.bind_addr)?;
        rx.set_nonblocking(true)?;
        Ok(Self { tx, rx })
    }
}

impl Transport for UdpTransport {
    fn receive(&mut self) -> io::Result<Vec<u8>> {
        // largest frame is 255 + 4 bytes; one datagram carries one frame
        let mut buf = [0u8; 512];
        match self.rx.recv_from(&mut buf) {
            Ok((n, _from)) => Ok(buf[..n].to_vec()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.tx.send(bytes)?;
        Ok(())
    }

    fn led_on(&mut self, led: u8) -> io::Result<()> {
        info!(led, "debug LED on");
        Ok(())
    }

    fn led_off(&mut self, led: u8) -> io::Result<()> {
        info!(led, "debug LED off");
        Ok(())
    }

    fn led_toggle(&mut self, led: u8) -> io::Result<()> {
        info!(led, "debug LED toggled");
        Ok(())
    }
}
