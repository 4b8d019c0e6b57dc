// lib.rs: wire protocol shared by the payload radio and the ground station
// (packet envelope codec, telecommand registry, chunking arithmetic)

use thiserror::Error;

// =============================== Constants ==================================

/// 16-bit sync word opening every frame on the half-duplex UHF link.
pub const PREAMBLE: u16 = 0x1ACF;

/// Most payload bytes a single packet can carry (the length field is one byte).
pub const MAX_DATA_LEN: usize = 255;

/// Envelope bytes around the payload: preamble(2) + length(1) + checksum(1).
pub const PACKET_OVERHEAD: usize = 4;

/// Data capacity of a continuation packet: payload minus code and sequence bytes.
pub const MAX_CHUNK_LEN: usize = MAX_DATA_LEN - 2;

/// Data capacity of a first packet, which also carries the total-packet count.
pub const MAX_FIRST_CHUNK_LEN: usize = MAX_DATA_LEN - 3;

/// Sentinel byte preceding uploaded file content in the first packet of a transfer.
pub const SOF_MARKER: u8 = 0x02;

/// Sentinel byte closing uploaded file content in the last packet of a transfer.
pub const EOF_MARKER: u8 = 0x03;

// ================================ Errors ====================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("frame too short: {0} bytes")] TooShort(usize),
    #[error("bad preamble: 0x{0:04x}")] BadPreamble(u16),
    #[error("truncated frame: header announces {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("checksum mismatch: computed 0x{computed:02x}, got 0x{got:02x}")]
    ChecksumMismatch { computed: u8, got: u8 },
    #[error("payload too large: {0} bytes (max 255)")] PayloadTooLarge(usize),
    #[error("{0} bytes of data exceed the 255-packet transfer limit")] TooManyPackets(usize),
    #[error("empty payload carries no telecommand")] EmptyPayload,
}

// ============================= Telecommands =================================

/// Every code that can travel on the link. The uplink set is what the ground
/// station may command; the rest only ever appear on the downlink as status,
/// error, or data-carrier codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Telecommand {
    // uplink
    UploadFile,
    UndoUpload,
    GetHistory,
    GetHealth,
    DebugOn,
    DebugOff,
    DebugToggle,
    OverrideAntenna,
    // downlink
    Acknowledge,
    DownlinkString,
    DownlinkFile,
    LastPacketReceived,
    PacketLoss,
    PacketLossReset,
    FormatError,
    FileUnavailable,
    Error,
}

impl Telecommand {
    pub const fn code(self) -> u8 {
        match self {
            Self::UploadFile => 0x55,
            Self::UndoUpload => 0x5A,
            Self::GetHistory => 0x48,
            Self::GetHealth => 0x4D,
            Self::DebugOn => 0xF0,
            Self::DebugOff => 0x0F,
            Self::DebugToggle => 0xAA,
            Self::OverrideAntenna => 0x6A,
            Self::Acknowledge => 0xCC,
            Self::DownlinkString => 0xD5,
            Self::DownlinkFile => 0xDF,
            Self::LastPacketReceived => 0x99,
            Self::PacketLoss => 0xE1,
            Self::PacketLossReset => 0xE2,
            Self::FormatError => 0xE3,
            Self::FileUnavailable => 0xE4,
            Self::Error => 0xEE,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x55 => Some(Self::UploadFile),
            0x5A => Some(Self::UndoUpload),
            0x48 => Some(Self::GetHistory),
            0x4D => Some(Self::GetHealth),
            0xF0 => Some(Self::DebugOn),
            0x0F => Some(Self::DebugOff),
            0xAA => Some(Self::DebugToggle),
            0x6A => Some(Self::OverrideAntenna),
            0xCC => Some(Self::Acknowledge),
            0xD5 => Some(Self::DownlinkString),
            0xDF => Some(Self::DownlinkFile),
            0x99 => Some(Self::LastPacketReceived),
            0xE1 => Some(Self::PacketLoss),
            0xE2 => Some(Self::PacketLossReset),
            0xE3 => Some(Self::FormatError),
            0xE4 => Some(Self::FileUnavailable),
            0xEE => Some(Self::Error),
            _ => None,
        }
    }
}

// ================================ Packet ====================================

/// One wire frame: `[preamble:2 BE][length:1][payload:length][checksum:1]`.
/// The length field is derived from the payload and not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub preamble: u16,
    pub payload: Vec<u8>,
    pub checksum: u8,
}

/// Unsigned 8-bit wrapping sum of the payload, matching the single checksum
/// byte the transceiver appends.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

impl Packet {
    pub fn encode(payload: Vec<u8>) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_DATA_LEN {
            return Err(ProtocolError::PayloadTooLarge(payload.len()));
        }
        let checksum = checksum(&payload);
        Ok(Self {
            preamble: PREAMBLE,
            payload,
            checksum,
        })
    }

    /// The length byte is authoritative: bytes past `length + 4` are ignored,
    /// which lets a transport hand over a padded receive buffer unchanged.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < PACKET_OVERHEAD {
            return Err(ProtocolError::TooShort(bytes.len()));
        }
        let preamble = u16::from_be_bytes([bytes[0], bytes[1]]);
        if preamble != PREAMBLE {
            return Err(ProtocolError::BadPreamble(preamble));
        }
        let len = bytes[2] as usize;
        let expected = len + PACKET_OVERHEAD;
        if bytes.len() < expected {
            return Err(ProtocolError::Truncated {
                expected,
                got: bytes.len(),
            });
        }
        let payload = bytes[3..3 + len].to_vec();
        let got = bytes[3 + len];
        let computed = checksum(&payload);
        if computed != got {
            return Err(ProtocolError::ChecksumMismatch { computed, got });
        }
        Ok(Self {
            preamble,
            payload,
            checksum: got,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload.len() + PACKET_OVERHEAD);
        out.extend_from_slice(&self.preamble.to_be_bytes());
        out.push(self.payload.len() as u8);
        out.extend_from_slice(&self.payload);
        out.push(self.checksum);
        out
    }
}

// ================================ Command ===================================

/// Decoded application message: first payload byte is the telecommand code,
/// the remainder is the code-specific parameter field. The code stays a raw
/// byte so unrecognized uplinks still reach history logging and dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub code: u8,
    pub params: Vec<u8>,
}

impl Command {
    pub fn from_packet(packet: &Packet) -> Result<Self, ProtocolError> {
        let (&code, params) = packet
            .payload
            .split_first()
            .ok_or(ProtocolError::EmptyPayload)?;
        Ok(Self {
            code,
            params: params.to_vec(),
        })
    }

    pub fn telecommand(&self) -> Option<Telecommand> {
        Telecommand::from_code(self.code)
    }
}

// =============================== Chunking ===================================

/// Packets needed to carry `data_len` bytes once the per-packet framing is
/// accounted for. The `+ 1` covers the total-count byte that only the first
/// packet carries.
pub fn num_packets(data_len: usize) -> Result<u8, ProtocolError> {
    let total = (data_len + 1).div_ceil(MAX_CHUNK_LEN);
    if total > u8::MAX as usize {
        return Err(ProtocolError::TooManyPackets(data_len));
    }
    Ok(total as u8)
}

// ================================= Tests ====================================
