//! Card protocol driver.
//!
//! Owns the [`BlockTransport`] and sequences SPI-mode commands: the init
//! handshake, single-block read/write, and multi-block streaming reads. The
//! streaming session is tracked internally; single-block operations are
//! rejected while a stream is open because card operations are not reentrant.

use platform::{Block, BlockDevice, BlockTransport, ClockSpeed, BLOCK_SIZE};

use crate::error::{CardError, InitError, ProtocolError, ReadError, WriteError};
use crate::protocol::{
    crc16_ccitt, retry, ACMD41_CRC, ACMD41_HCS, ACMD41_RETRY_BOUND, ACMD_SEND_OP_COND,
    BUSY_POLL_BYTES, CMD0_CRC, CMD8_ARG, CMD8_CRC, CMD_APP_PREFIX, CMD_GO_IDLE, CMD_READ_MULTIPLE,
    CMD_READ_OCR, CMD_READ_SINGLE, CMD_SEND_IF_COND, CMD_STOP_TRANSMISSION, CMD_WRITE_SINGLE,
    DATA_ACCEPTED, DATA_CRC_REJECTED, DATA_RESPONSE_MASK, DATA_WRITE_REJECTED, DUMMY_CRC,
    INIT_CLOCK_BYTES, OCR_CCS, OCR_POWER_UP,
    OCR_VOLTAGE_WINDOW, R1_IDLE, R1_POLL_BYTES, R1_READY, READ_RETRY_BOUND, START_TOKEN,
    TOKEN_POLL_BYTES, TRANSMISSION_BIT,
};

/// Capabilities learned during the init handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CardInfo {
    /// SDHC/SDXC: commands take block addresses instead of byte addresses.
    pub high_capacity: bool,
}

/// SPI-mode SD card driver over a byte transport.
pub struct SdCard<T: BlockTransport> {
    transport: T,
    ready: bool,
    high_capacity: bool,
    stream_open: bool,
}

impl<T: BlockTransport> SdCard<T> {
    /// Wrap a transport. The card is unusable until
    /// [`enter_ready_state`](SdCard::enter_ready_state) succeeds.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            ready: false,
            high_capacity: false,
            stream_open: false,
        }
    }

    /// True once the init handshake has completed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// True while a multi-block read session is open.
    pub fn stream_open(&self) -> bool {
        self.stream_open
    }

    /// Give back the transport, e.g. to share the bus after shutdown.
    pub fn release(self) -> T {
        self.transport
    }

    /// Drive the card through idle → interface condition → ACMD41 polling →
    /// OCR read until it reports ready.
    ///
    /// # Errors
    ///
    /// [`InitError::NoResponse`] if the card never answers CMD0,
    /// [`InitError::UnsupportedVoltage`] if CMD8 or the OCR voltage window
    /// rejects 3.3 V, [`InitError::Timeout`] if ACMD41 polling exhausts its
    /// bound. Fatal to storage-dependent features; the caller must surface a
    /// hardware-fault UI state.
    pub fn enter_ready_state(&mut self) -> Result<CardInfo, InitError> {
        self.transport.set_clock(ClockSpeed::Init);
        self.transport.deselect();
        self.transport.delay_ms(2);
        // ≥74 clock pulses with CS high before the first command.
        for _ in 0..INIT_CLOCK_BYTES {
            self.transport.receive_byte(0xFF);
        }

        self.idle_sequence()?;
        self.interface_condition()?;

        // Pre-init OCR read: the card is still idle, only the voltage window
        // is meaningful here.
        let (_, [_, voltage_window, _, _]) =
            self.read_ocr().map_err(|_| InitError::NoResponse)?;
        if voltage_window & OCR_VOLTAGE_WINDOW == 0 {
            return Err(InitError::UnsupportedVoltage);
        }

        self.operating_condition_poll()?;

        // Re-read the OCR to learn power-up status and capacity class.
        let (r1, [status, _, _, _]) = self.read_ocr().map_err(|_| InitError::Timeout)?;
        if r1 != R1_READY || status & OCR_POWER_UP == 0 {
            return Err(InitError::Timeout);
        }
        self.high_capacity = status & OCR_CCS != 0;
        self.ready = true;
        self.transport.set_clock(ClockSpeed::Full);
        Ok(CardInfo {
            high_capacity: self.high_capacity,
        })
    }

    /// Read the single block at `address`, retrying transient failures up to
    /// [`READ_RETRY_BOUND`] attempts.
    ///
    /// The caller's buffer is only written on success; a failed read never
    /// exposes a partial block.
    ///
    /// # Errors
    ///
    /// [`ReadError::Status`] on a non-zero R1 after the retry bound,
    /// [`ReadError::TokenTimeout`] / [`ReadError::Checksum`] on framing
    /// failures, [`ReadError::StreamOpen`] while a stream session is open.
    pub fn read_block(&mut self, address: u32, buf: &mut Block) -> Result<(), ReadError> {
        if !self.ready {
            return Err(ReadError::NotReady);
        }
        if self.stream_open {
            return Err(ReadError::StreamOpen);
        }
        retry(READ_RETRY_BOUND, || self.try_read_block(address, buf))
    }

    /// Write the single block `buf` to `address`.
    ///
    /// Treated as non-fatal by callers: on failure the operation is
    /// abandoned and the error surfaced upward.
    ///
    /// # Errors
    ///
    /// [`WriteError::Rejected`] when the card's data response refuses the
    /// block, [`WriteError::BusyTimeout`] when programming never completes.
    pub fn write_block(&mut self, buf: &Block, address: u32) -> Result<(), WriteError> {
        if !self.ready {
            return Err(WriteError::NotReady);
        }
        if self.stream_open {
            return Err(WriteError::StreamOpen);
        }
        self.select();
        self.send_command(CMD_WRITE_SINGLE, self.command_address(address), DUMMY_CRC);
        let result = self.write_data_packet(buf);
        self.deselect();
        result
    }

    /// Open a streaming read session starting at `start_address`.
    ///
    /// Chip select stays asserted until [`stop_transmission`] closes the
    /// session; each [`next_stream_block`] call yields one further block
    /// without a new command round-trip.
    ///
    /// [`stop_transmission`]: SdCard::stop_transmission
    /// [`next_stream_block`]: SdCard::next_stream_block
    pub fn read_multiple_blocks(&mut self, start_address: u32) -> Result<(), ReadError> {
        if !self.ready {
            return Err(ReadError::NotReady);
        }
        if self.stream_open {
            return Err(ReadError::StreamOpen);
        }
        self.select();
        self.send_command(CMD_READ_MULTIPLE, self.command_address(start_address), DUMMY_CRC);
        let r1 = match self.read_r1() {
            Ok(value) => value,
            Err(e) => {
                self.deselect();
                return Err(e.into());
            }
        };
        if r1 != R1_READY {
            self.deselect();
            return Err(ReadError::Status(r1));
        }
        self.stream_open = true;
        Ok(())
    }

    /// Fetch the next block of the open streaming session.
    pub fn next_stream_block(&mut self, buf: &mut Block) -> Result<(), ReadError> {
        if !self.stream_open {
            return Err(ReadError::NoStream);
        }
        self.read_data_packet(buf)
    }

    /// Close the streaming session. A no-op when no stream is open.
    pub fn stop_transmission(&mut self) -> Result<(), ReadError> {
        if !self.stream_open {
            return Ok(());
        }
        self.send_command(CMD_STOP_TRANSMISSION, 0, DUMMY_CRC);
        self.transport.receive_byte(0xFF); // stuff byte before the R1
        let _ = self.read_r1();
        // Flush until the card releases the line.
        for _ in 0..BUSY_POLL_BYTES {
            if self.transport.receive_byte(0xFF) == 0xFF {
                break;
            }
        }
        self.deselect();
        self.stream_open = false;
        Ok(())
    }

    // -- command plumbing ---------------------------------------------------

    /// CS transitions are wrapped in dummy bytes so the card registers them.
    fn select(&mut self) {
        self.transport.send_byte(0xFF);
        self.transport.select();
        self.transport.send_byte(0xFF);
    }

    fn deselect(&mut self) {
        self.transport.send_byte(0xFF);
        self.transport.deselect();
        self.transport.send_byte(0xFF);
    }

    /// Send a 6-byte command frame: command, 4 argument bytes MSB-first, CRC.
    fn send_command(&mut self, command: u8, argument: u32, crc: u8) {
        self.transport.send_byte(command | TRANSMISSION_BIT);
        for &byte in argument.to_be_bytes().iter() {
            self.transport.send_byte(byte);
        }
        self.transport.send_byte(crc);
    }

    /// SDSC commands address bytes; SDHC/SDXC address blocks.
    fn command_address(&self, block: u32) -> u32 {
        if self.high_capacity {
            block
        } else {
            // SDSC caps at 2 GB so a block index never overflows when scaled.
            block.wrapping_shl(9)
        }
    }

    /// Poll for an R1 response: the first byte with the start bit clear.
    fn read_r1(&mut self) -> Result<u8, ProtocolError> {
        for _ in 0..R1_POLL_BYTES {
            let byte = self.transport.receive_byte(0xFF);
            if byte & 0x80 == 0 {
                return Ok(byte);
            }
        }
        Err(ProtocolError::NoResponse)
    }

    /// R3/R7: an R1 status byte followed by 4 payload bytes.
    fn read_r1_payload(&mut self) -> Result<(u8, [u8; 4]), ProtocolError> {
        let r1 = self.read_r1()?;
        let mut payload = [0u8; 4];
        for slot in payload.iter_mut() {
            *slot = self.transport.receive_byte(0xFF);
        }
        Ok((r1, payload))
    }

    fn idle_sequence(&mut self) -> Result<(), InitError> {
        self.select();
        self.send_command(CMD_GO_IDLE, 0, CMD0_CRC);
        let r1 = self.read_r1().map_err(|_| InitError::NoResponse);
        self.deselect();
        if r1? != R1_IDLE {
            return Err(InitError::NoResponse);
        }
        Ok(())
    }

    fn interface_condition(&mut self) -> Result<(), InitError> {
        self.select();
        self.send_command(CMD_SEND_IF_COND, CMD8_ARG, CMD8_CRC);
        let response = self.read_r1_payload().map_err(|_| InitError::NoResponse);
        self.deselect();
        let (r1, [_, _, voltage, pattern]) = response?;
        // Voltage nibble must accept 3.3 V; the check pattern must echo back.
        if r1 != R1_IDLE || voltage & 0x0F != 0x01 || pattern != CMD8_ARG as u8 {
            return Err(InitError::UnsupportedVoltage);
        }
        Ok(())
    }

    /// Repeat CMD55+ACMD41 until the card leaves idle or the bound expires.
    fn operating_condition_poll(&mut self) -> Result<(), InitError> {
        for _ in 0..ACMD41_RETRY_BOUND {
            self.select();
            self.send_command(CMD_APP_PREFIX, 0, DUMMY_CRC);
            let _ = self.read_r1();
            self.deselect();

            self.select();
            self.send_command(ACMD_SEND_OP_COND, ACMD41_HCS, ACMD41_CRC);
            let r1 = self.read_r1().map_err(|_| InitError::NoResponse);
            self.deselect();
            if r1? == R1_READY {
                return Ok(());
            }
        }
        Err(InitError::Timeout)
    }

    fn read_ocr(&mut self) -> Result<(u8, [u8; 4]), ProtocolError> {
        self.select();
        self.send_command(CMD_READ_OCR, 0, DUMMY_CRC);
        let response = self.read_r1_payload();
        self.deselect();
        response
    }

    fn try_read_block(&mut self, address: u32, buf: &mut Block) -> Result<(), ReadError> {
        self.select();
        self.send_command(CMD_READ_SINGLE, self.command_address(address), DUMMY_CRC);
        let result = match self.read_r1() {
            Ok(R1_READY) => self.read_data_packet(buf),
            Ok(status) => Err(ReadError::Status(status)),
            Err(e) => Err(e.into()),
        };
        self.deselect();
        result
    }

    /// Wait for the data start token, then read one block and verify its
    /// CRC16 trailer. The caller's buffer is untouched on failure.
    fn read_data_packet(&mut self, buf: &mut Block) -> Result<(), ReadError> {
        let mut token_seen = false;
        for _ in 0..TOKEN_POLL_BYTES {
            if self.transport.receive_byte(0xFF) == START_TOKEN {
                token_seen = true;
                break;
            }
        }
        if !token_seen {
            return Err(ReadError::TokenTimeout);
        }
        let mut payload = [0u8; BLOCK_SIZE];
        for slot in payload.iter_mut() {
            *slot = self.transport.receive_byte(0xFF);
        }
        let hi = self.transport.receive_byte(0xFF);
        let lo = self.transport.receive_byte(0xFF);
        if crc16_ccitt(&payload) != u16::from_be_bytes([hi, lo]) {
            return Err(ReadError::Checksum);
        }
        buf.copy_from_slice(&payload);
        Ok(())
    }

    fn write_data_packet(&mut self, buf: &Block) -> Result<(), WriteError> {
        let r1 = self.read_r1()?;
        if r1 != R1_READY {
            return Err(WriteError::Status(r1));
        }
        self.transport.send_byte(START_TOKEN);
        for &byte in buf.iter() {
            self.transport.send_byte(byte);
        }
        let [crc_hi, crc_lo] = crc16_ccitt(buf).to_be_bytes();
        self.transport.send_byte(crc_hi);
        self.transport.send_byte(crc_lo);

        // Data response: xxx0_sss1. The status bits name acceptance, a CRC
        // refusal, or a write refusal; anything else is a framing fault.
        let mut response = 0xFF;
        for _ in 0..R1_POLL_BYTES {
            response = self.transport.receive_byte(0xFF);
            if response != 0xFF {
                break;
            }
        }
        if response == 0xFF {
            return Err(WriteError::Protocol(ProtocolError::NoResponse));
        }
        match response & DATA_RESPONSE_MASK {
            DATA_ACCEPTED => {}
            status @ (DATA_CRC_REJECTED | DATA_WRITE_REJECTED) => {
                return Err(WriteError::Rejected(status));
            }
            _ => {
                return Err(WriteError::Protocol(ProtocolError::UnexpectedResponse(
                    response,
                )));
            }
        }
        // The card holds the line at 0x00 until programming completes.
        for _ in 0..BUSY_POLL_BYTES {
            if self.transport.receive_byte(0xFF) != 0x00 {
                return Ok(());
            }
        }
        Err(WriteError::BusyTimeout)
    }
}

impl<T: BlockTransport> BlockDevice for SdCard<T> {
    type Error = CardError;

    fn read_block(&mut self, address: u32, buf: &mut Block) -> Result<(), Self::Error> {
        SdCard::read_block(self, address, buf).map_err(CardError::from)
    }

    fn write_block(&mut self, buf: &Block, address: u32) -> Result<(), Self::Error> {
        SdCard::write_block(self, buf, address).map_err(CardError::from)
    }

    fn begin_stream(&mut self, start_address: u32) -> Result<(), Self::Error> {
        self.read_multiple_blocks(start_address).map_err(CardError::from)
    }

    fn next_stream_block(&mut self, buf: &mut Block) -> Result<(), Self::Error> {
        SdCard::next_stream_block(self, buf).map_err(CardError::from)
    }

    fn end_stream(&mut self) -> Result<(), Self::Error> {
        self.stop_transmission().map_err(CardError::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use platform::mocks::MockTransport;

    fn ready_card() -> SdCard<MockTransport> {
        let mut card = SdCard::new(MockTransport::new());
        card.enter_ready_state().unwrap();
        card
    }

    fn ready_card_with(f: impl FnOnce(&mut MockTransport)) -> SdCard<MockTransport> {
        let mut transport = MockTransport::new();
        f(&mut transport);
        let mut card = SdCard::new(transport);
        card.enter_ready_state().unwrap();
        card
    }

    #[test]
    fn init_reaches_ready_state() {
        let mut card = SdCard::new(MockTransport::new());
        let info = card.enter_ready_state().unwrap();
        assert!(info.high_capacity);
        assert!(card.is_ready());
    }

    #[test]
    fn init_issues_full_handshake() {
        let mut card = SdCard::new(MockTransport::new());
        card.enter_ready_state().unwrap();
        let log = &card.transport.command_log;
        assert_eq!(log.first(), Some(&0)); // CMD0 first
        assert!(log.contains(&8));
        assert!(log.contains(&55));
        assert!(log.contains(&41));
        assert!(log.contains(&58));
    }

    #[test]
    fn init_absent_card_is_no_response() {
        let mut transport = MockTransport::new();
        transport.absent = true;
        let mut card = SdCard::new(transport);
        assert_eq!(card.enter_ready_state(), Err(InitError::NoResponse));
        assert!(!card.is_ready());
    }

    #[test]
    fn init_stuck_busy_times_out() {
        let mut transport = MockTransport::new();
        transport.never_ready = true;
        let mut card = SdCard::new(transport);
        assert_eq!(card.enter_ready_state(), Err(InitError::Timeout));
    }

    #[test]
    fn init_cmd8_reject_is_unsupported_voltage() {
        let mut transport = MockTransport::new();
        transport.reject_cmd8 = true;
        let mut card = SdCard::new(transport);
        assert_eq!(card.enter_ready_state(), Err(InitError::UnsupportedVoltage));
    }

    #[test]
    fn read_block_returns_stored_data() {
        let mut card = ready_card_with(|t| t.set_block(7, [0x5Au8; 512]));
        let mut buf = [0u8; 512];
        card.read_block(7, &mut buf).unwrap();
        assert_eq!(buf, [0x5Au8; 512]);
    }

    #[test]
    fn read_block_before_init_is_not_ready() {
        let mut card = SdCard::new(MockTransport::new());
        let mut buf = [0u8; 512];
        assert_eq!(card.read_block(0, &mut buf), Err(ReadError::NotReady));
    }

    #[test]
    fn read_block_bad_r1_exhausts_retries_without_partial_buffer() {
        let mut card = ready_card();
        card.transport.fail_reads_r1 = usize::MAX;
        let mut buf = [0xAAu8; 512];
        assert_eq!(card.read_block(3, &mut buf), Err(ReadError::Status(0x04)));
        // The caller's buffer must be untouched after a failed read.
        assert_eq!(buf, [0xAAu8; 512]);
    }

    #[test]
    fn read_block_recovers_from_one_corrupt_crc() {
        let mut card = ready_card_with(|t| {
            t.set_block(9, [0x11u8; 512]);
            t.corrupt_crc_reads = 1;
        });
        let mut buf = [0u8; 512];
        card.read_block(9, &mut buf).unwrap();
        assert_eq!(buf[0], 0x11);
    }

    #[test]
    fn write_then_read_back() {
        let mut card = ready_card();
        let data = [0xC3u8; 512];
        card.write_block(&data, 42).unwrap();
        let mut buf = [0u8; 512];
        card.read_block(42, &mut buf).unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn write_rejected_data_response_surfaces() {
        let mut card = ready_card();
        card.transport.write_data_response = Some(0x0D); // write error status
        assert_eq!(
            card.write_block(&[0u8; 512], 5),
            Err(WriteError::Rejected(0x0D))
        );
    }

    #[test]
    fn write_garbage_data_response_is_a_protocol_error() {
        let mut card = ready_card();
        // 0x15 masks to a status no data response defines.
        card.transport.write_data_response = Some(0x15);
        assert_eq!(
            card.write_block(&[0u8; 512], 5),
            Err(WriteError::Protocol(ProtocolError::UnexpectedResponse(0x15)))
        );
    }

    #[test]
    fn stream_serves_sequential_blocks() {
        let mut card = ready_card_with(|t| {
            t.set_block(10, [10u8; 512]);
            t.set_block(11, [11u8; 512]);
            t.set_block(12, [12u8; 512]);
        });
        let mut buf = [0u8; 512];
        card.read_multiple_blocks(10).unwrap();
        for expected in 10u8..=12 {
            card.next_stream_block(&mut buf).unwrap();
            assert_eq!(buf[0], expected);
        }
        card.stop_transmission().unwrap();
        assert!(!card.stream_open());
    }

    #[test]
    fn single_block_ops_rejected_while_streaming() {
        let mut card = ready_card();
        card.read_multiple_blocks(0).unwrap();
        let mut buf = [0u8; 512];
        assert_eq!(card.read_block(1, &mut buf), Err(ReadError::StreamOpen));
        assert_eq!(
            card.write_block(&[0u8; 512], 1),
            Err(WriteError::StreamOpen)
        );
        card.stop_transmission().unwrap();
        card.read_block(1, &mut buf).unwrap();
    }

    #[test]
    fn stop_transmission_is_idempotent() {
        let mut card = ready_card();
        card.read_multiple_blocks(0).unwrap();
        card.stop_transmission().unwrap();
        card.stop_transmission().unwrap();
        assert!(!card.stream_open());
    }

    #[test]
    fn next_stream_block_without_session_errors() {
        let mut card = ready_card();
        let mut buf = [0u8; 512];
        assert_eq!(card.next_stream_block(&mut buf), Err(ReadError::NoStream));
    }
}
