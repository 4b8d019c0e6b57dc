use std::path::PathBuf;

use link_protocol::{Command, Telecommand};
use tracing::{info, warn};

use crate::commands::actions;
use crate::downlink::Packager;
use crate::errors::{RadioError, Result};
use crate::logging::history::HistoryLog;
use crate::transport::Transport;
use crate::uplink::Disposition;

/// Maps each received command onto exactly one response action. Nothing here
/// retries; every branch resolves to a definite downlink and a definite
/// result for the poll loop to log.
pub struct Handler {
    health_path: PathBuf,
    debug_led: u8,
}

impl Handler {
    pub fn new(health_path: PathBuf, debug_led: u8) -> Self {
        Self {
            health_path,
            debug_led,
        }
    }

    /// Returns the telecommand code that went out as the response.
    pub fn process<T: Transport>(
        &self,
        command: &Command,
        disposition: Disposition,
        packager: &mut Packager<T>,
        history: &HistoryLog,
    ) -> Result<Telecommand> {
        match disposition {
            Disposition::Upload(outcome) => {
                let response = outcome.response();
                packager.send_signal(response)?;
                Ok(response)
            }
            Disposition::Plain => self.dispatch(command, packager, history),
        }
    }

    fn dispatch<T: Transport>(
        &self,
        command: &Command,
        packager: &mut Packager<T>,
        history: &HistoryLog,
    ) -> Result<Telecommand> {
        match command.telecommand() {
            Some(Telecommand::UndoUpload) => {
                let path = match std::str::from_utf8(&command.params) {
                    Ok(s) if !s.is_empty() => PathBuf::from(s),
                    _ => {
                        warn!("undo-upload carries an unusable path");
                        packager.send_signal(Telecommand::Error)?;
                        return Err(RadioError::BadParams(Telecommand::UndoUpload));
                    }
                };
                match actions::undo_upload(&path) {
                    Ok(()) => self.acknowledge(packager),
                    Err(e) => {
                        warn!(path = %path.display(), %e, "undo failed");
                        packager.send_signal(Telecommand::Error)?;
                        Err(e)
                    }
                }
            }
            Some(Telecommand::GetHistory) => {
                if let Err(e) = history.compact() {
                    warn!(%e, "history compaction failed");
                    packager.send_signal(Telecommand::Error)?;
                    return Err(e.into());
                }
                packager.send_file(history.path())?;
                Ok(Telecommand::DownlinkFile)
            }
            Some(Telecommand::GetHealth) => {
                packager.send_file(&self.health_path)?;
                Ok(Telecommand::DownlinkFile)
            }
            Some(Telecommand::DebugOn) => {
                packager.debug_on(self.debug_led)?;
                self.acknowledge(packager)
            }
            Some(Telecommand::DebugOff) => {
                packager.debug_off(self.debug_led)?;
                self.acknowledge(packager)
            }
            Some(Telecommand::DebugToggle) => {
                packager.debug_toggle(self.debug_led)?;
                self.acknowledge(packager)
            }
            Some(Telecommand::OverrideAntenna) => {
                // deployment override is handled by the antenna controller;
                // the radio only confirms receipt
                info!("antenna override acknowledged");
                self.acknowledge(packager)
            }
            _ => {
                warn!(code = command.code, "unrecognized telecommand");
                packager.send_signal(Telecommand::Error)?;
                Err(RadioError::UnknownTelecommand(command.code))
            }
        }
    }

    fn acknowledge<T: Transport>(&self, packager: &mut Packager<T>) -> Result<Telecommand> {
        packager.send_signal(Telecommand::Acknowledge)?;
        Ok(Telecommand::Acknowledge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use crate::transport::memory::MemoryTransport;
    use crate::uplink::{UploadOutcome, backup_path};
    use link_protocol::Packet;
    use mockall::predicate::eq;
    use std::fs;
    use std::io;

    fn command(code: u8, params: &[u8]) -> Command {
        Command {
            code,
            params: params.to_vec(),
        }
    }

    fn history_at(dir: &tempfile::TempDir) -> HistoryLog {
        HistoryLog::new(dir.path().join("history.d3"), 10)
    }

    fn sent_payloads(packager: &mut Packager<MemoryTransport>) -> Vec<Vec<u8>> {
        packager
            .transport_mut()
            .sent
            .iter()
            .map(|frame| Packet::decode(frame).unwrap().payload)
            .collect()
    }

    #[test]
    fn upload_outcomes_map_to_signal_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let handler = Handler::new(dir.path().join("health.csv"), 0);
        let history = history_at(&dir);

        let cases = [
            (UploadOutcome::Accepted, 0xCC),
            (UploadOutcome::Completed, 0x99),
            (UploadOutcome::SupersededReset, 0xE2),
            (UploadOutcome::Loss, 0xE1),
            (UploadOutcome::Format, 0xE3),
            (UploadOutcome::Failed, 0xEE),
        ];
        for (outcome, code) in cases {
            let mut packager = Packager::new(MemoryTransport::default());
            let sent = handler
                .process(
                    &command(0x55, &[2, b'x']),
                    Disposition::Upload(outcome),
                    &mut packager,
                    &history,
                )
                .unwrap();
            assert_eq!(sent, outcome.response());
            assert_eq!(sent_payloads(&mut packager), vec![vec![code, 1, 1]]);
        }
    }

    #[test]
    fn debug_toggle_drives_the_led_and_acks() {
        let dir = tempfile::tempdir().unwrap();
        let handler = Handler::new(dir.path().join("health.csv"), 3);
        let history = history_at(&dir);

        let mut mock = MockTransport::new();
        mock.expect_led_toggle()
            .with(eq(3))
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_send().times(1).returning(|_| Ok(()));

        let mut packager = Packager::new(mock);
        let response = handler
            .process(
                &command(0xAA, &[]),
                Disposition::Plain,
                &mut packager,
                &history,
            )
            .unwrap();
        assert_eq!(response, Telecommand::Acknowledge);
    }

    #[test]
    fn transport_failure_surfaces_to_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let handler = Handler::new(dir.path().join("health.csv"), 0);
        let history = history_at(&dir);

        let mut mock = MockTransport::new();
        mock.expect_led_on().times(1).returning(|_| Ok(()));
        mock.expect_send()
            .times(1)
            .returning(|_| Err(io::Error::other("tx buffer full")));

        let mut packager = Packager::new(mock);
        let err = handler
            .process(
                &command(0xF0, &[]),
                Disposition::Plain,
                &mut packager,
                &history,
            )
            .unwrap_err();
        assert!(matches!(err, RadioError::Io(_)));
    }

    #[test]
    fn override_antenna_just_acks() {
        let dir = tempfile::tempdir().unwrap();
        let handler = Handler::new(dir.path().join("health.csv"), 0);
        let history = history_at(&dir);

        let mut packager = Packager::new(MemoryTransport::default());
        let response = handler
            .process(
                &command(0x6A, &[]),
                Disposition::Plain,
                &mut packager,
                &history,
            )
            .unwrap();
        assert_eq!(response, Telecommand::Acknowledge);
        assert_eq!(sent_payloads(&mut packager), vec![vec![0xCC, 1, 1]]);
    }

    #[test]
    fn unknown_code_sends_error_signal_and_fails() {
        let dir = tempfile::tempdir().unwrap();
        let handler = Handler::new(dir.path().join("health.csv"), 0);
        let history = history_at(&dir);

        let mut packager = Packager::new(MemoryTransport::default());
        let err = handler
            .process(
                &command(0x01, &[1, 2]),
                Disposition::Plain,
                &mut packager,
                &history,
            )
            .unwrap_err();
        assert!(matches!(err, RadioError::UnknownTelecommand(0x01)));
        assert_eq!(sent_payloads(&mut packager), vec![vec![0xEE, 1, 1]]);
    }

    #[test]
    fn get_health_downlinks_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let health = dir.path().join("health.csv");
        fs::write(&health, b"pa_temp,31\n").unwrap();
        let handler = Handler::new(health, 0);
        let history = history_at(&dir);

        let mut packager = Packager::new(MemoryTransport::default());
        let response = handler
            .process(
                &command(0x4D, &[]),
                Disposition::Plain,
                &mut packager,
                &history,
            )
            .unwrap();
        assert_eq!(response, Telecommand::DownlinkFile);
        let payloads = sent_payloads(&mut packager);
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0][0], 0xDF);
    }

    #[test]
    fn get_health_with_missing_report_signals_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let handler = Handler::new(dir.path().join("health.csv"), 0);
        let history = history_at(&dir);

        let mut packager = Packager::new(MemoryTransport::default());
        let err = handler
            .process(
                &command(0x4D, &[]),
                Disposition::Plain,
                &mut packager,
                &history,
            )
            .unwrap_err();
        assert!(matches!(err, RadioError::FileUnavailable(_)));
        assert_eq!(sent_payloads(&mut packager), vec![vec![0xE4, 1, 1]]);
    }

    #[test]
    fn get_history_compacts_then_downlinks() {
        let dir = tempfile::tempdir().unwrap();
        let handler = Handler::new(dir.path().join("health.csv"), 0);
        let history = HistoryLog::new(dir.path().join("history.d3"), 2);
        for i in 0..5u8 {
            history.append(&command(0x4D, &[i])).unwrap();
        }

        let mut packager = Packager::new(MemoryTransport::default());
        let response = handler
            .process(
                &command(0x48, &[]),
                Disposition::Plain,
                &mut packager,
                &history,
            )
            .unwrap();
        assert_eq!(response, Telecommand::DownlinkFile);

        let contents = fs::read_to_string(history.path()).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(!sent_payloads(&mut packager).is_empty());
    }

    #[test]
    fn undo_dispatch_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let handler = Handler::new(dir.path().join("health.csv"), 0);
        let history = history_at(&dir);

        let target = dir.path().join("cfg.txt");
        fs::write(&target, b"uploaded").unwrap();
        fs::write(backup_path(&target), b"original").unwrap();

        let params = target.to_str().unwrap().as_bytes().to_vec();
        let mut packager = Packager::new(MemoryTransport::default());
        let response = handler
            .process(
                &command(0x5A, &params),
                Disposition::Plain,
                &mut packager,
                &history,
            )
            .unwrap();
        assert_eq!(response, Telecommand::Acknowledge);
        assert_eq!(fs::read(&target).unwrap(), b"original");

        // backup is consumed; a second undo downlinks the error signal
        let mut packager = Packager::new(MemoryTransport::default());
        let err = handler
            .process(
                &command(0x5A, &params),
                Disposition::Plain,
                &mut packager,
                &history,
            )
            .unwrap_err();
        assert!(matches!(err, RadioError::NoBackup(_)));
        assert_eq!(sent_payloads(&mut packager), vec![vec![0xEE, 1, 1]]);
    }
}
