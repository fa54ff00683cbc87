//! AS608 fingerprint module driver.
//!
//! Wraps the packet codec in request/acknowledge transactions and maps
//! confirmation codes onto the [`FingerprintPort`] vocabulary.  Each call
//! sends one command and waits a bounded time for the acknowledgement;
//! no reply maps to [`SensorError::TIMEOUT`].

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use super::as608::{self, PacketDecoder, code, instr};
use super::transport::Transport;
use crate::app::ports::{
    Capture, CharBuffer, FingerprintPort, Occupancy, SearchHit, SensorError,
};
use crate::slots::SlotId;

/// How long to wait for an acknowledgement.
pub const REPLY_TIMEOUT_MS: u32 = 1_000;
/// Poll spacing while waiting for a reply.
const POLL_STEP_MS: u32 = 2;

pub struct FingerprintDriver<T: Transport, D: DelayNs> {
    transport: T,
    delay: D,
    decoder: PacketDecoder,
    address: u32,
    password: u32,
    capacity: u16,
    reply_timeout_ms: u32,
}

impl<T: Transport, D: DelayNs> FingerprintDriver<T, D> {
    pub fn new(transport: T, delay: D, capacity: u16) -> Self {
        Self {
            transport,
            delay,
            decoder: PacketDecoder::new(),
            address: as608::DEFAULT_ADDRESS,
            password: 0,
            capacity,
            reply_timeout_ms: REPLY_TIMEOUT_MS,
        }
    }

    pub fn with_reply_timeout(mut self, ms: u32) -> Self {
        self.reply_timeout_ms = ms;
        self
    }

    /// Handshake with the module using the configured password.
    pub fn verify_password(&mut self) -> Result<(), SensorError> {
        let pwd = self.password.to_be_bytes();
        self.command(instr::VERIFY_PASSWORD, &pwd)?;
        info!("fingerprint: module at 0x{:08X} answered", self.address);
        Ok(())
    }

    /// Number of stored templates.
    pub fn template_count(&mut self) -> Result<u16, SensorError> {
        let ack = self.transact(instr::TEMPLATE_COUNT, &[])?;
        Self::expect_ok(&ack)?;
        ack.u16_at(1).ok_or(SensorError::PACKET)
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ── Transactions ──────────────────────────────────────────

    /// Send a command and return its acknowledgement packet.
    fn transact(&mut self, instruction: u8, params: &[u8]) -> Result<as608::Packet, SensorError> {
        let mut buf = [0u8; 32];
        let n = as608::encode_command(self.address, instruction, params, &mut buf)
            .ok_or(SensorError::PACKET)?;

        if let Err(e) = self.transport.discard_input() {
            debug!("fingerprint: stale input not flushed: {:?}", e);
        }
        self.decoder.reset();
        self.transport.write(&buf[..n]).map_err(|e| {
            warn!("fingerprint: write failed: {:?}", e);
            SensorError::PACKET
        })?;

        let mut rx = [0u8; 64];
        let mut waited = 0;
        while waited <= self.reply_timeout_ms {
            let got = self.transport.read(&mut rx).map_err(|e| {
                warn!("fingerprint: read failed: {:?}", e);
                SensorError::PACKET
            })?;

            let mut offset = 0;
            while offset < got {
                let (used, packet) = self.decoder.feed(&rx[offset..got]);
                offset += used;
                match packet {
                    Some(p) if p.pid == as608::pid::ACK && p.address == self.address => {
                        return Ok(p);
                    }
                    Some(p) => debug!("fingerprint: ignoring packet pid=0x{:02X}", p.pid),
                    None => {}
                }
            }

            if got == 0 {
                self.delay.delay_ms(POLL_STEP_MS);
                waited += POLL_STEP_MS;
            }
        }

        debug!("fingerprint: no reply to 0x{:02X}", instruction);
        Err(SensorError::TIMEOUT)
    }

    fn expect_ok(ack: &as608::Packet) -> Result<(), SensorError> {
        match ack.confirmation() {
            Some(code::OK) => Ok(()),
            Some(c) => Err(SensorError::new(c)),
            None => Err(SensorError::PACKET),
        }
    }

    /// Send a command that only reports success or a code.
    fn command(&mut self, instruction: u8, params: &[u8]) -> Result<(), SensorError> {
        let ack = self.transact(instruction, params)?;
        Self::expect_ok(&ack)
    }
}

// ── FingerprintPort implementation ────────────────────────────

impl<T: Transport, D: DelayNs> FingerprintPort for FingerprintDriver<T, D> {
    fn capture(&mut self) -> Result<Capture, SensorError> {
        let ack = self.transact(instr::GEN_IMAGE, &[])?;
        match ack.confirmation() {
            Some(code::OK) => Ok(Capture::Image),
            Some(code::NO_FINGER) => Ok(Capture::NoFinger),
            _ => Self::expect_ok(&ack).map(|()| Capture::Image),
        }
    }

    fn vectorize(&mut self, buffer: CharBuffer) -> Result<(), SensorError> {
        self.command(instr::IMAGE_TO_TZ, &[buffer as u8])
    }

    fn combine(&mut self) -> Result<(), SensorError> {
        self.command(instr::REG_MODEL, &[])
    }

    fn search(&mut self) -> Result<SearchHit, SensorError> {
        let [count_hi, count_lo] = self.capacity.to_be_bytes();
        let params = [CharBuffer::One as u8, 0x00, 0x00, count_hi, count_lo];
        let ack = self.transact(instr::HIGH_SPEED_SEARCH, &params)?;
        match ack.confirmation() {
            Some(code::OK) => {
                let slot = ack.u16_at(1).ok_or(SensorError::PACKET)?;
                let confidence = ack.u16_at(3).unwrap_or(0);
                Ok(SearchHit::Found { slot, confidence })
            }
            Some(code::NOT_FOUND) => Ok(SearchHit::NotFound),
            _ => Self::expect_ok(&ack).map(|()| SearchHit::NotFound),
        }
    }

    fn persist(&mut self, slot: SlotId) -> Result<(), SensorError> {
        let [hi, lo] = slot.to_be_bytes();
        self.command(instr::STORE, &[CharBuffer::One as u8, hi, lo])
    }

    fn erase(&mut self, slot: SlotId) -> Result<(), SensorError> {
        let [hi, lo] = slot.to_be_bytes();
        self.command(instr::DELETE_CHAR, &[hi, lo, 0x00, 0x01])
    }

    fn probe(&mut self, slot: SlotId) -> Result<Occupancy, SensorError> {
        let [hi, lo] = slot.to_be_bytes();
        let ack = self.transact(instr::LOAD_CHAR, &[CharBuffer::One as u8, hi, lo])?;
        match ack.confirmation() {
            Some(code::OK) => Ok(Occupancy::Occupied),
            Some(code::READ_TEMPLATE_ERR) => Ok(Occupancy::Empty),
            _ => Self::expect_ok(&ack).map(|()| Occupancy::Occupied),
        }
    }

    fn erase_all(&mut self) -> Result<(), SensorError> {
        self.command(instr::EMPTY, &[])
    }
}
