use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use link_protocol::{Command, EOF_MARKER, MAX_DATA_LEN, SOF_MARKER, Telecommand};
use tracing::{info, warn};

/// Appended to a destination path to name its pre-upload backup.
pub const BACKUP_SUFFIX: &str = ".bak";

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// What a received upload packet did to the transfer, mapped one-to-one onto
/// the downlink signal the ground station sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// First or interior packet accepted and committed.
    Accepted,
    /// Final packet accepted; the destination file is complete.
    Completed,
    /// A new transfer arrived while the previous one was unfinished; the old
    /// partial file was dropped and the new header accepted.
    SupersededReset,
    /// Sequence break, stale continuation, or missing end marker.
    Loss,
    /// Malformed first-packet header.
    Format,
    /// Local file I/O failed; the packet was not committed.
    Failed,
}

impl UploadOutcome {
    pub fn response(self) -> Telecommand {
        match self {
            Self::Accepted => Telecommand::Acknowledge,
            Self::Completed => Telecommand::LastPacketReceived,
            Self::SupersededReset => Telecommand::PacketLossReset,
            Self::Loss => Telecommand::PacketLoss,
            Self::Format => Telecommand::FormatError,
            Self::Failed => Telecommand::Error,
        }
    }
}

/// How a decoded command should be dispatched after reassembly has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Not part of a transfer; dispatch on the command code itself.
    Plain,
    /// Upload packet consumed by the state machine.
    Upload(UploadOutcome),
}

/// The single in-flight (or last-completed) multi-packet transfer. Zeroed at
/// boot, which counts as settled so the first upload never trips recovery.
#[derive(Debug, Default)]
struct UploadSession {
    telecommand: u8,
    expected_packets: u8,
    dest: PathBuf,
    next_seq: u8,
}

impl UploadSession {
    fn settled(&self) -> bool {
        self.next_seq == self.expected_packets
    }
}

/// Consumes decoded commands and advances the upload state machine. Owns the
/// one session; everything else it touches is the filesystem.
#[derive(Debug, Default)]
pub struct Interpreter {
    session: UploadSession,
}

/*
 * First packet params field:
 *   | seq=1 | total packets | dest length | dest ... | SOF | data ... |
 *
 * Continuation params field:
 *   | seq | data ... |
 *
 * The last packet's data ends with the EOF marker.
 */
impl Interpreter {
    pub fn interpret(&mut self, command: &Command) -> Disposition {
        if command.telecommand() == Some(Telecommand::UploadFile) {
            Disposition::Upload(self.advance_upload(command))
        } else {
            Disposition::Plain
        }
    }

    /// Drops the in-flight session, e.g. when the embedding loop decides the
    /// ground station went quiet mid-transfer. Continuations of the dropped
    /// transfer will read as packet loss; a fresh first packet starts clean.
    pub fn abandon_session(&mut self) {
        if !self.session.settled() {
            warn!(
                dest = %self.session.dest.display(),
                received = self.session.next_seq,
                expected = self.session.expected_packets,
                "abandoning unsettled upload session"
            );
        }
        self.session = UploadSession::default();
    }

    fn advance_upload(&mut self, command: &Command) -> UploadOutcome {
        match command.params.first() {
            Some(&1) => self.begin_transfer(command),
            Some(_) => self.continue_transfer(command),
            None => {
                warn!("upload packet with empty params");
                UploadOutcome::Format
            }
        }
    }

    fn begin_transfer(&mut self, command: &Command) -> UploadOutcome {
        let mut superseded = false;
        if !self.session.settled() {
            warn!(
                dest = %self.session.dest.display(),
                received = self.session.next_seq,
                expected = self.session.expected_packets,
                "previous transfer incomplete; accepting new header"
            );
            // the new header always wins; drop the partial file
            let _ = fs::remove_file(&self.session.dest);
            superseded = true;
        }

        let params = &command.params;
        if params.len() < 3 {
            warn!(len = params.len(), "first packet shorter than its header");
            return UploadOutcome::Format;
        }
        let expected_packets = params[1];
        if expected_packets == 0 {
            warn!("first packet announces a zero-packet transfer");
            return UploadOutcome::Format;
        }
        let dest_len = params[2] as usize;
        let start_of_data = 3 + dest_len;
        if start_of_data > MAX_DATA_LEN - 2 {
            warn!(start_of_data, "destination field overruns the packet");
            return UploadOutcome::Format;
        }
        if params.len() < start_of_data + 1 {
            warn!(len = params.len(), "first packet truncated before the SOF marker");
            return UploadOutcome::Format;
        }
        let dest = match std::str::from_utf8(&params[3..start_of_data]) {
            Ok(s) if !s.is_empty() => PathBuf::from(s),
            _ => {
                warn!("destination field is empty or not UTF-8");
                return UploadOutcome::Format;
            }
        };
        if params[start_of_data] != SOF_MARKER {
            warn!(dest = %dest.display(), "start-of-file marker missing");
            return UploadOutcome::Format;
        }

        let mut data = &params[start_of_data + 1..];
        let single_packet = expected_packets == 1;
        if single_packet {
            match data.split_last() {
                Some((&EOF_MARKER, rest)) => data = rest,
                _ => {
                    warn!(dest = %dest.display(), "single-packet transfer missing EOF marker");
                    return UploadOutcome::Loss;
                }
            }
        }

        if let Err(e) = backup_file(&dest) {
            warn!(dest = %dest.display(), %e, "backup of existing file failed");
            return UploadOutcome::Failed;
        }
        if let Err(e) = fs::write(&dest, data) {
            warn!(dest = %dest.display(), %e, "creating destination file failed");
            return UploadOutcome::Failed;
        }

        self.session = UploadSession {
            telecommand: command.code,
            expected_packets,
            dest,
            next_seq: 1,
        };

        if single_packet {
            info!(
                dest = %self.session.dest.display(),
                "single-packet upload complete"
            );
            return if superseded {
                UploadOutcome::SupersededReset
            } else {
                UploadOutcome::Completed
            };
        }
        info!(
            dest = %self.session.dest.display(),
            expected = expected_packets,
            "upload transfer started"
        );
        if superseded {
            UploadOutcome::SupersededReset
        } else {
            UploadOutcome::Accepted
        }
    }

    fn continue_transfer(&mut self, command: &Command) -> UploadOutcome {
        if command.code != self.session.telecommand {
            warn!("continuation packet for an abandoned or unknown transfer");
            return UploadOutcome::Loss;
        }

        let seq = command.params[0];
        let expected_next = u16::from(self.session.next_seq) + 1;
        if u16::from(seq) != expected_next {
            warn!(
                got = seq,
                expected = expected_next,
                "sequence break; a packet was lost"
            );
            return UploadOutcome::Loss;
        }
        if expected_next > u16::from(self.session.expected_packets) {
            warn!(
                got = seq,
                expected_packets = self.session.expected_packets,
                "more packets than the transfer announced"
            );
            return UploadOutcome::Failed;
        }

        let mut data = &command.params[1..];
        let final_packet = expected_next == u16::from(self.session.expected_packets);
        if final_packet {
            match data.split_last() {
                Some((&EOF_MARKER, rest)) => data = rest,
                _ => {
                    warn!(dest = %self.session.dest.display(), "final packet missing EOF marker");
                    return UploadOutcome::Loss;
                }
            }
        }

        if let Err(e) = append_to(&self.session.dest, data) {
            warn!(dest = %self.session.dest.display(), %e, "appending to destination failed");
            return UploadOutcome::Failed;
        }
        self.session.next_seq = seq;

        if final_packet {
            info!(
                dest = %self.session.dest.display(),
                packets = self.session.expected_packets,
                "upload transfer complete"
            );
            UploadOutcome::Completed
        } else {
            UploadOutcome::Accepted
        }
    }
}

/// Moves an existing destination aside as `<dest>.bak`, replacing any older
/// backup. Missing destination means a fresh upload; nothing to save.
fn backup_file(dest: &Path) -> io::Result<()> {
    if dest.exists() {
        let backup = backup_path(dest);
        let _ = fs::remove_file(&backup);
        fs::rename(dest, &backup)?;
    }
    Ok(())
}

fn append_to(dest: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().append(true).open(dest)?;
    file.write_all(data)
}
