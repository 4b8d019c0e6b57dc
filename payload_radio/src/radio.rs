use std::time::{Duration, Instant};

use link_protocol::{Command, Packet, Telecommand};
use tracing::{debug, warn};

use crate::commands::handler::Handler;
use crate::config::Config;
use crate::downlink::Packager;
use crate::errors::Result;
use crate::logging::history::HistoryLog;
use crate::transport::Transport;
use crate::uplink::{Disposition, Interpreter, UploadOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Idle,
    Responded(Telecommand),
}

/// One half-duplex protocol engine: receive → decode → reassemble → dispatch
/// → respond, one inbound frame per poll. The caller owns the pacing.
pub struct Radio<T: Transport> {
    packager: Packager<T>,
    interpreter: Interpreter,
    handler: Handler,
    history: HistoryLog,
    upload_timeout: Option<Duration>,
    upload_deadline: Option<Instant>,
}

impl<T: Transport> Radio<T> {
    pub fn new(cfg: &Config, transport: T) -> Self {
        Self {
            packager: Packager::new(transport),
            interpreter: Interpreter::default(),
            handler: Handler::new(cfg.health_path.clone().into(), cfg.debug_led),
            history: HistoryLog::new(cfg.history_path.clone().into(), cfg.history_keep),
            upload_timeout: (cfg.upload_timeout_s > 0)
                .then(|| Duration::from_secs(cfg.upload_timeout_s)),
            upload_deadline: None,
        }
    }

    pub fn packager_mut(&mut self) -> &mut Packager<T> {
        &mut self.packager
    }

    pub fn poll(&mut self) -> Result<PollOutcome> {
        self.expire_stale_upload();

        let frame = self.packager.transport_mut().receive()?;
        if frame.is_empty() {
            return Ok(PollOutcome::Idle);
        }
        debug!(bytes = frame.len(), "uplink frame received");

        let command = match Packet::decode(&frame).and_then(|p| Command::from_packet(&p)) {
            Ok(command) => command,
            Err(e) => {
                warn!(%e, "uplink frame rejected");
                self.packager.send_signal(Telecommand::FormatError)?;
                return Err(e.into());
            }
        };

        // the raw uplinked code/params go on record before reassembly can
        // turn them into an error response
        if let Err(e) = self.history.append(&command) {
            warn!(%e, "history append failed");
        }

        let disposition = self.interpreter.interpret(&command);
        self.track_upload(disposition);
        let response =
            self.handler
                .process(&command, disposition, &mut self.packager, &self.history)?;
        Ok(PollOutcome::Responded(response))
    }

    /// The link itself has no cancel; a transfer that stops making progress
    /// is dropped here so its continuations read as packet loss.
    fn expire_stale_upload(&mut self) {
        if let Some(deadline) = self.upload_deadline {
            if Instant::now() >= deadline {
                warn!("upload stalled past its deadline");
                self.interpreter.abandon_session();
                self.upload_deadline = None;
            }
        }
    }

    fn track_upload(&mut self, disposition: Disposition) {
        let Some(timeout) = self.upload_timeout else {
            return;
        };
        if let Disposition::Upload(outcome) = disposition {
            match outcome {
                UploadOutcome::Accepted | UploadOutcome::SupersededReset => {
                    self.upload_deadline = Some(Instant::now() + timeout);
                }
                UploadOutcome::Completed => self.upload_deadline = None,
                // loss and error packets do not advance the session, so the
                // running deadline stays as it is
                _ => {}
            }
        }
    }
}
