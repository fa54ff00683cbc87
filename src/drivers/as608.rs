//! AS608 / R307 packet codec.
//!
//! Wire format (all multi-byte fields big-endian):
//! ```text
//! ┌──────────┬──────────────┬─────┬────────────┬─────────────┬──────────┐
//! │ 0xEF 0x01│ Address (4B) │ PID │ Length (2B)│ Payload     │ Sum (2B) │
//! └──────────┴──────────────┴─────┴────────────┴─────────────┴──────────┘
//! ```
//! `Length` counts the payload plus the two checksum bytes.  The checksum
//! is the low 16 bits of the sum of PID, both length bytes and the payload.
//!
//! The decoder accumulates bytes across calls, so a UART read that returns
//! half a header or a packet split over several reads is handled.  Garbage
//! before a header is skipped and packets with a bad checksum are dropped.

use heapless::Vec;

/// Packet start marker.
pub const HEADER: [u8; 2] = [0xEF, 0x01];
/// Factory default module address.
pub const DEFAULT_ADDRESS: u32 = 0xFFFF_FFFF;

/// Largest payload the decoder accepts.
pub const MAX_PAYLOAD: usize = 256;

/// Bytes from the header up to and including the length field.
const PREAMBLE_LEN: usize = 9;
const CHECKSUM_LEN: usize = 2;

// ---------------------------------------------------------------------------
// Packet identifiers and instruction codes
// ---------------------------------------------------------------------------

pub mod pid {
    pub const COMMAND: u8 = 0x01;
    pub const DATA: u8 = 0x02;
    pub const ACK: u8 = 0x07;
    pub const END_DATA: u8 = 0x08;
}

pub mod instr {
    pub const GEN_IMAGE: u8 = 0x01;
    pub const IMAGE_TO_TZ: u8 = 0x02;
    pub const SEARCH: u8 = 0x04;
    pub const REG_MODEL: u8 = 0x05;
    pub const STORE: u8 = 0x06;
    pub const LOAD_CHAR: u8 = 0x07;
    pub const DELETE_CHAR: u8 = 0x0C;
    pub const EMPTY: u8 = 0x0D;
    pub const VERIFY_PASSWORD: u8 = 0x13;
    pub const HIGH_SPEED_SEARCH: u8 = 0x1B;
    pub const TEMPLATE_COUNT: u8 = 0x1D;
}

/// Confirmation codes the driver interprets.  Anything else is reported raw.
pub mod code {
    pub const OK: u8 = 0x00;
    pub const PACKET_RECEIVE_ERR: u8 = 0x01;
    pub const NO_FINGER: u8 = 0x02;
    pub const NOT_FOUND: u8 = 0x09;
    pub const BAD_LOCATION: u8 = 0x0B;
    pub const READ_TEMPLATE_ERR: u8 = 0x0C;
}

fn checksum(pid: u8, len: u16, payload: &[u8]) -> u16 {
    let [hi, lo] = len.to_be_bytes();
    payload
        .iter()
        .fold(u16::from(pid) + u16::from(hi) + u16::from(lo), |acc, &b| {
            acc.wrapping_add(u16::from(b))
        })
}

/// Encode a command packet carrying `instruction` followed by `params`.
///
/// Returns the number of bytes written to `out`, or `None` if it is too
/// small.
pub fn encode_command(address: u32, instruction: u8, params: &[u8], out: &mut [u8]) -> Option<usize> {
    let payload_len = 1 + params.len();
    let total = PREAMBLE_LEN + payload_len + CHECKSUM_LEN;
    if total > out.len() || payload_len > MAX_PAYLOAD {
        return None;
    }
    let len = (payload_len + CHECKSUM_LEN) as u16;

    out[..2].copy_from_slice(&HEADER);
    out[2..6].copy_from_slice(&address.to_be_bytes());
    out[6] = pid::COMMAND;
    out[7..9].copy_from_slice(&len.to_be_bytes());
    out[9] = instruction;
    out[10..10 + params.len()].copy_from_slice(params);

    let sum = checksum(pid::COMMAND, len, &out[9..9 + payload_len]);
    out[9 + payload_len..total].copy_from_slice(&sum.to_be_bytes());
    Some(total)
}

/// A decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub address: u32,
    pub pid: u8,
    pub payload: Vec<u8, MAX_PAYLOAD>,
}

impl Packet {
    /// Confirmation code of an acknowledge packet.
    pub fn confirmation(&self) -> Option<u8> {
        (self.pid == pid::ACK).then(|| self.payload.first().copied()).flatten()
    }

    /// Big-endian `u16` at byte `offset` of the payload.
    pub fn u16_at(&self, offset: usize) -> Option<u16> {
        let bytes = self.payload.get(offset..offset + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

enum DecoderState {
    /// Collecting the fixed preamble (header, address, pid, length).
    Preamble { collected: usize },
    /// Collecting payload plus checksum.
    Body { expected: usize, collected: usize },
}

/// Streaming packet decoder.
pub struct PacketDecoder {
    state: DecoderState,
    preamble: [u8; PREAMBLE_LEN],
    body: [u8; MAX_PAYLOAD + CHECKSUM_LEN],
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Preamble { collected: 0 },
            preamble: [0; PREAMBLE_LEN],
            body: [0; MAX_PAYLOAD + CHECKSUM_LEN],
        }
    }

    /// Feed bytes into the decoder.
    ///
    /// Stops at the first complete packet and returns it together with the
    /// number of bytes of `data` consumed.  Feed the rest in a later call.
    pub fn feed(&mut self, data: &[u8]) -> (usize, Option<Packet>) {
        let mut offset = 0;

        while offset < data.len() {
            match &mut self.state {
                DecoderState::Preamble { collected } => {
                    let b = data[offset];
                    offset += 1;

                    // Resynchronise on the two header bytes.
                    if *collected < HEADER.len() && b != HEADER[*collected] {
                        *collected = usize::from(b == HEADER[0]);
                        if *collected == 1 {
                            self.preamble[0] = b;
                        }
                        continue;
                    }

                    self.preamble[*collected] = b;
                    *collected += 1;

                    if *collected == PREAMBLE_LEN {
                        let len = u16::from_be_bytes([self.preamble[7], self.preamble[8]]) as usize;
                        if len < CHECKSUM_LEN || len > MAX_PAYLOAD + CHECKSUM_LEN {
                            self.state = DecoderState::Preamble { collected: 0 };
                            continue;
                        }
                        self.state = DecoderState::Body {
                            expected: len,
                            collected: 0,
                        };
                    }
                }

                DecoderState::Body { expected, collected } => {
                    let to_copy = (*expected - *collected).min(data.len() - offset);
                    self.body[*collected..*collected + to_copy]
                        .copy_from_slice(&data[offset..offset + to_copy]);
                    *collected += to_copy;
                    offset += to_copy;

                    if *collected == *expected {
                        let len = *expected;
                        self.state = DecoderState::Preamble { collected: 0 };
                        if let Some(packet) = self.finish(len) {
                            return (offset, Some(packet));
                        }
                    }
                }
            }
        }

        (offset, None)
    }

    /// Reset decoder state (e.g. before a new command).
    pub fn reset(&mut self) {
        self.state = DecoderState::Preamble { collected: 0 };
    }

    fn finish(&self, len: usize) -> Option<Packet> {
        let pid = self.preamble[6];
        let payload = &self.body[..len - CHECKSUM_LEN];
        let sum = u16::from_be_bytes([self.body[len - 2], self.body[len - 1]]);
        if sum != checksum(pid, len as u16, payload) {
            log::debug!("as608: checksum mismatch, packet dropped");
            return None;
        }
        let address = u32::from_be_bytes([
            self.preamble[2],
            self.preamble[3],
            self.preamble[4],
            self.preamble[5],
        ]);
        Some(Packet {
            address,
            pid,
            payload: Vec::from_slice(payload).ok()?,
        })
    }
}
