//! Mock implementations for testing.
//!
//! `MockTransport` emulates an SDHC card at the byte level: it parses 6-byte
//! command frames, answers with R1/R3/R7 responses, serves data tokens with
//! real CRC16 trailers, and accepts single-block writes. The card protocol
//! driver is therefore tested against the same wire format it speaks.
//!
//! `MockBlockDevice` is a sparse in-memory block store for the layers above
//! the protocol driver.

#![cfg(any(test, feature = "std"))]
#![allow(clippy::indexing_slicing)] // test fixture; all indices bounded by construction
#![allow(clippy::arithmetic_side_effects)]

use std::collections::{BTreeMap, VecDeque};
use std::vec::Vec;

use crate::audio::AudioSink;
use crate::power::PowerControl;
use crate::storage::{Block, BlockDevice, BLOCK_SIZE};
use crate::transport::{BlockTransport, ClockSpeed};

/// CRC16-CCITT (polynomial 0x1021, init 0), as used for SD data blocks.
fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

// ---------------------------------------------------------------------------
// MockTransport — byte-level fake SDHC card
// ---------------------------------------------------------------------------

const START_TOKEN: u8 = 0xFE;
const DATA_ACCEPTED: u8 = 0x05;

#[derive(Debug)]
struct WriteCollect {
    address: u32,
    bytes: Vec<u8>,
}

/// Byte-level fake SDHC card behind the [`BlockTransport`] seam.
#[derive(Debug)]
pub struct MockTransport {
    blocks: BTreeMap<u32, Block>,
    out: VecDeque<u8>,
    frame: Vec<u8>,
    stream: Option<u32>,
    stream_buf: VecDeque<u8>,
    write_collect: Option<WriteCollect>,
    acmd_armed: bool,
    idle: bool,
    ready_countdown: u32,
    selected: bool,
    clock: ClockSpeed,
    /// Commands seen, in order (command index without the transmission bit).
    pub command_log: Vec<u8>,
    /// Number of CMD18 streaming sessions opened.
    pub stream_opens: usize,
    /// Respond to this many CMD17/CMD18 with an error R1 before recovering.
    pub fail_reads_r1: usize,
    /// Corrupt the CRC trailer on this many data blocks.
    pub corrupt_crc_reads: usize,
    /// Never leave idle (ACMD41 always busy) — init timeout injection.
    pub never_ready: bool,
    /// Answer CMD8 with an illegal-command R1 — voltage-check failure.
    pub reject_cmd8: bool,
    /// Answer the write data phase with this byte instead of accepting;
    /// the block is discarded.
    pub write_data_response: Option<u8>,
    /// Completely dead card: no response to anything.
    pub absent: bool,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// A powered but uninitialised card with an empty image.
    pub fn new() -> Self {
        Self {
            blocks: BTreeMap::new(),
            out: VecDeque::new(),
            frame: Vec::new(),
            stream: None,
            stream_buf: VecDeque::new(),
            write_collect: None,
            acmd_armed: false,
            idle: true,
            ready_countdown: 3,
            selected: false,
            clock: ClockSpeed::Init,
            command_log: Vec::new(),
            stream_opens: 0,
            fail_reads_r1: 0,
            corrupt_crc_reads: 0,
            never_ready: false,
            reject_cmd8: false,
            write_data_response: None,
            absent: false,
        }
    }

    /// Store one block in the card image.
    pub fn set_block(&mut self, address: u32, data: Block) {
        self.blocks.insert(address, data);
    }

    /// Lay `bytes` down across consecutive blocks starting at `start`.
    pub fn load_bytes(&mut self, start: u32, bytes: &[u8]) {
        for (i, chunk) in bytes.chunks(BLOCK_SIZE).enumerate() {
            let mut block = [0u8; BLOCK_SIZE];
            block[..chunk.len()].copy_from_slice(chunk);
            self.blocks.insert(start + i as u32, block);
        }
    }

    /// Read back a block of the image (zeros if never written).
    pub fn block(&self, address: u32) -> Block {
        self.blocks.get(&address).copied().unwrap_or([0u8; BLOCK_SIZE])
    }

    fn queue_data_block(&mut self, address: u32) {
        let payload = self.block(address);
        self.stream_buf.push_back(START_TOKEN);
        self.stream_buf.extend(payload.iter().copied());
        let mut crc = crc16_ccitt(&payload);
        if self.corrupt_crc_reads > 0 {
            self.corrupt_crc_reads -= 1;
            crc ^= 0xFFFF;
        }
        self.stream_buf.push_back((crc >> 8) as u8);
        self.stream_buf.push_back(crc as u8);
    }

    fn process_command(&mut self, cmd: u8, arg: u32) {
        self.out.clear();
        self.command_log.push(cmd);
        let acmd = self.acmd_armed;
        self.acmd_armed = false;
        match cmd {
            0 => {
                self.idle = true;
                self.stream = None;
                self.stream_buf.clear();
                self.out.push_back(0x01);
            }
            8 => {
                if self.reject_cmd8 {
                    self.out.push_back(0x05); // illegal command
                } else {
                    // R7: r1, then [31:12] echo of nothing, voltage nibble, check pattern
                    self.out.push_back(0x01);
                    self.out.push_back(0x00);
                    self.out.push_back(0x00);
                    self.out.push_back((arg >> 8) as u8 & 0x0F);
                    self.out.push_back(arg as u8);
                }
            }
            55 => {
                self.acmd_armed = true;
                self.out.push_back(if self.idle { 0x01 } else { 0x00 });
            }
            41 if acmd => {
                if self.never_ready || self.ready_countdown > 0 {
                    self.ready_countdown = self.ready_countdown.saturating_sub(1);
                    self.out.push_back(0x01);
                } else {
                    self.idle = false;
                    self.out.push_back(0x00);
                }
            }
            58 => {
                // R3: r1 + OCR. Power-up and CCS report only once out of idle.
                self.out.push_back(if self.idle { 0x01 } else { 0x00 });
                self.out.push_back(if self.idle { 0x00 } else { 0xC0 });
                self.out.push_back(0xFF); // 3.2–3.4 V window accepted
                self.out.push_back(0x80);
                self.out.push_back(0x00);
            }
            17 => {
                if self.fail_reads_r1 > 0 {
                    self.fail_reads_r1 -= 1;
                    self.out.push_back(0x04); // illegal command R1
                } else {
                    self.out.push_back(0x00);
                    self.queue_data_block(arg);
                }
            }
            18 => {
                if self.fail_reads_r1 > 0 {
                    self.fail_reads_r1 -= 1;
                    self.out.push_back(0x04);
                } else {
                    self.out.push_back(0x00);
                    self.stream = Some(arg);
                    self.stream_opens += 1;
                }
            }
            12 => {
                self.stream = None;
                self.stream_buf.clear();
                self.out.push_back(0xFF); // stuff byte
                self.out.push_back(0x00);
                self.out.push_back(0xFF); // not busy
            }
            24 => {
                self.out.push_back(0x00);
                self.write_collect = Some(WriteCollect {
                    address: arg,
                    bytes: Vec::new(),
                });
            }
            _ => {
                self.out.push_back(0x04); // illegal command
            }
        }
    }
}

impl BlockTransport for MockTransport {
    fn send_byte(&mut self, value: u8) -> u8 {
        if self.absent {
            return 0xFF;
        }
        // Data phase of a single-block write: token + 512 payload + CRC16.
        if let Some(collect) = self.write_collect.as_mut() {
            if collect.bytes.is_empty() && value != START_TOKEN {
                return 0xFF; // filler before the token
            }
            collect.bytes.push(value);
            if collect.bytes.len() == 1 + BLOCK_SIZE + 2 {
                if let Some(token) = self.write_data_response {
                    self.write_collect = None;
                    self.out.push_back(token);
                    self.out.push_back(0xFF);
                    return 0xFF;
                }
                let mut block = [0u8; BLOCK_SIZE];
                block.copy_from_slice(&collect.bytes[1..1 + BLOCK_SIZE]);
                let address = collect.address;
                self.blocks.insert(address, block);
                self.write_collect = None;
                self.out.push_back(DATA_ACCEPTED);
                self.out.push_back(0x00); // busy
                self.out.push_back(0x00);
                self.out.push_back(0xFF);
            }
            return 0xFF;
        }
        if self.frame.is_empty() {
            if value & 0xC0 != 0x40 {
                return 0xFF; // dummy / filler byte, not a command start
            }
            self.frame.push(value);
            return 0xFF;
        }
        self.frame.push(value);
        if self.frame.len() == 6 {
            let cmd = self.frame[0] & 0x3F;
            let arg = u32::from_be_bytes([self.frame[1], self.frame[2], self.frame[3], self.frame[4]]);
            self.frame.clear();
            self.process_command(cmd, arg);
        }
        0xFF
    }

    fn receive_byte(&mut self, _dummy: u8) -> u8 {
        if self.absent {
            return 0xFF;
        }
        if let Some(byte) = self.out.pop_front() {
            return byte;
        }
        // Pending data packet (CMD17 or the current CMD18 block) first, then
        // refill from the open stream.
        if let Some(byte) = self.stream_buf.pop_front() {
            return byte;
        }
        if let Some(next) = self.stream {
            self.queue_data_block(next);
            self.stream = Some(next.wrapping_add(1));
            if let Some(byte) = self.stream_buf.pop_front() {
                return byte;
            }
        }
        0xFF
    }

    fn select(&mut self) {
        self.selected = true;
    }

    fn deselect(&mut self) {
        self.selected = false;
    }

    fn set_clock(&mut self, speed: ClockSpeed) {
        self.clock = speed;
    }

    fn delay_ms(&mut self, _ms: u32) {}
}

// ---------------------------------------------------------------------------
// MockBlockDevice — sparse in-memory block store
// ---------------------------------------------------------------------------

/// Error type for [`MockBlockDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockDeviceError {
    /// Injected read failure.
    ReadFault,
    /// Injected write failure.
    WriteFault,
    /// Streaming call without an open stream.
    NoStream,
    /// Single-block call while a stream is open.
    StreamOpen,
}

/// In-memory [`BlockDevice`] for the asset, playback, and UI layers.
#[derive(Debug, Default)]
pub struct MockBlockDevice {
    blocks: BTreeMap<u32, Block>,
    stream: Option<u32>,
    /// Fail `read_block` this many more times.
    pub fail_reads: usize,
    /// Fail `next_stream_block` after this many successful fetches.
    pub fail_stream_after: Option<usize>,
    /// Fail every `write_block`.
    pub fail_writes: bool,
    /// Single-block reads issued.
    pub reads: usize,
    /// Addresses written, in order.
    pub writes: Vec<u32>,
    /// Streaming sessions opened.
    pub stream_opens: usize,
    /// Stream blocks served.
    pub stream_blocks: usize,
}

impl MockBlockDevice {
    /// An empty device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one block.
    pub fn set_block(&mut self, address: u32, data: Block) {
        self.blocks.insert(address, data);
    }

    /// Lay `bytes` down across consecutive blocks starting at `start`.
    pub fn load_bytes(&mut self, start: u32, bytes: &[u8]) {
        for (i, chunk) in bytes.chunks(BLOCK_SIZE).enumerate() {
            let mut block = [0u8; BLOCK_SIZE];
            block[..chunk.len()].copy_from_slice(chunk);
            self.blocks.insert(start + i as u32, block);
        }
    }

    /// Read back a block (zeros if never written).
    pub fn block(&self, address: u32) -> Block {
        self.blocks.get(&address).copied().unwrap_or([0u8; BLOCK_SIZE])
    }
}

impl BlockDevice for MockBlockDevice {
    type Error = MockDeviceError;

    fn read_block(&mut self, address: u32, buf: &mut Block) -> Result<(), Self::Error> {
        if self.stream.is_some() {
            return Err(MockDeviceError::StreamOpen);
        }
        if self.fail_reads > 0 {
            self.fail_reads -= 1;
            return Err(MockDeviceError::ReadFault);
        }
        self.reads += 1;
        buf.copy_from_slice(&self.block(address));
        Ok(())
    }

    fn write_block(&mut self, buf: &Block, address: u32) -> Result<(), Self::Error> {
        if self.stream.is_some() {
            return Err(MockDeviceError::StreamOpen);
        }
        if self.fail_writes {
            return Err(MockDeviceError::WriteFault);
        }
        self.blocks.insert(address, *buf);
        self.writes.push(address);
        Ok(())
    }

    fn begin_stream(&mut self, start_address: u32) -> Result<(), Self::Error> {
        if self.stream.is_some() {
            return Err(MockDeviceError::StreamOpen);
        }
        self.stream = Some(start_address);
        self.stream_opens += 1;
        Ok(())
    }

    fn next_stream_block(&mut self, buf: &mut Block) -> Result<(), Self::Error> {
        let next = self.stream.ok_or(MockDeviceError::NoStream)?;
        if let Some(remaining) = self.fail_stream_after.as_mut() {
            if *remaining == 0 {
                return Err(MockDeviceError::ReadFault);
            }
            *remaining -= 1;
        }
        buf.copy_from_slice(&self.block(next));
        self.stream = Some(next.wrapping_add(1));
        self.stream_blocks += 1;
        Ok(())
    }

    fn end_stream(&mut self) -> Result<(), Self::Error> {
        self.stream = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockSink / MockPower
// ---------------------------------------------------------------------------

/// Records what the stream engine pushes at the audio output.
#[derive(Debug, Default)]
pub struct MockSink {
    /// (sample_rate, bit_depth, channels) of the last `configure` call.
    pub configured: Option<(u32, u16, u16)>,
    /// Blocks accepted since the last enable.
    pub blocks: usize,
    /// Output path currently powered.
    pub enabled: bool,
}

impl MockSink {
    /// A silent sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSink for MockSink {
    fn configure(&mut self, sample_rate: u32, bit_depth: u16, channels: u16) {
        self.configured = Some((sample_rate, bit_depth, channels));
    }

    fn enable(&mut self) {
        self.enabled = true;
        self.blocks = 0;
    }

    fn push_block(&mut self, _block: &Block) {
        self.blocks += 1;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }
}

/// Records power intents instead of acting on hardware.
#[derive(Debug)]
pub struct MockPower {
    /// Current backlight state.
    pub backlight: bool,
    /// Times deep sleep was requested.
    pub deep_sleeps: usize,
}

impl Default for MockPower {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPower {
    /// Awake, backlight on.
    pub fn new() -> Self {
        Self {
            backlight: true,
            deep_sleeps: 0,
        }
    }
}

impl PowerControl for MockPower {
    fn backlight_on(&mut self) {
        self.backlight = true;
    }

    fn backlight_off(&mut self) {
        self.backlight = false;
    }

    fn enter_deep_sleep(&mut self) {
        // Real hardware never returns from this; the mock just records it.
        self.deep_sleeps += 1;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn load_bytes_spans_blocks() {
        let mut dev = MockBlockDevice::new();
        let data = [0xABu8; BLOCK_SIZE + 10];
        dev.load_bytes(100, &data);
        assert_eq!(dev.block(100)[511], 0xAB);
        assert_eq!(dev.block(101)[9], 0xAB);
        assert_eq!(dev.block(101)[10], 0x00);
    }

    #[test]
    fn mock_device_stream_advances() {
        let mut dev = MockBlockDevice::new();
        dev.set_block(5, [5u8; BLOCK_SIZE]);
        dev.set_block(6, [6u8; BLOCK_SIZE]);
        let mut buf = [0u8; BLOCK_SIZE];
        dev.begin_stream(5).unwrap();
        dev.next_stream_block(&mut buf).unwrap();
        assert_eq!(buf[0], 5);
        dev.next_stream_block(&mut buf).unwrap();
        assert_eq!(buf[0], 6);
        dev.end_stream().unwrap();
        assert_eq!(dev.stream_blocks, 2);
    }

    #[test]
    fn mock_device_rejects_read_during_stream() {
        let mut dev = MockBlockDevice::new();
        let mut buf = [0u8; BLOCK_SIZE];
        dev.begin_stream(0).unwrap();
        assert_eq!(
            dev.read_block(1, &mut buf),
            Err(MockDeviceError::StreamOpen)
        );
    }

    #[test]
    fn crc16_known_vector() {
        // 512 bytes of 0xFF has a well-known CCITT CRC of 0x7FA1.
        let data = [0xFFu8; BLOCK_SIZE];
        assert_eq!(crc16_ccitt(&data), 0x7FA1);
    }
}
