//! SD SPI wire-format constants, data CRC, and the bounded retry combinator.
//!
//! Values must match the card protocol bit-for-bit; they mirror the SD
//! Physical Layer Simplified Specification for SPI mode.

/// GO_IDLE_STATE — software reset into SPI mode.
pub const CMD_GO_IDLE: u8 = 0;
/// SEND_IF_COND — voltage check, v2.0+ cards only.
pub const CMD_SEND_IF_COND: u8 = 8;
/// STOP_TRANSMISSION — terminate an open multi-block read.
pub const CMD_STOP_TRANSMISSION: u8 = 12;
/// READ_SINGLE_BLOCK.
pub const CMD_READ_SINGLE: u8 = 17;
/// READ_MULTIPLE_BLOCK — streaming read until CMD12.
pub const CMD_READ_MULTIPLE: u8 = 18;
/// WRITE_SINGLE_BLOCK.
pub const CMD_WRITE_SINGLE: u8 = 24;
/// APP_CMD — prefix announcing an application-specific command.
pub const CMD_APP_PREFIX: u8 = 55;
/// SD_SEND_OP_COND (ACMD41) — start card initialisation.
pub const ACMD_SEND_OP_COND: u8 = 41;
/// READ_OCR — operating conditions register.
pub const CMD_READ_OCR: u8 = 58;

/// Transmission bit, set on every command byte.
pub const TRANSMISSION_BIT: u8 = 0x40;

/// Filler CRC for commands where the CRC is ignored in SPI mode.
pub const DUMMY_CRC: u8 = 0x01;
/// Precomputed CRC7 for CMD0 with a zero argument.
pub const CMD0_CRC: u8 = 0x95;
/// Precomputed CRC7 for CMD8 with [`CMD8_ARG`].
pub const CMD8_CRC: u8 = 0x87;
/// Precomputed CRC7 for ACMD41 with [`ACMD41_HCS`].
pub const ACMD41_CRC: u8 = 0x77;

/// CMD8 voltage-supplied field: 2.7–3.6 V.
pub const CMD8_VHS_3V3: u32 = 0x0100;
/// CMD8 check pattern, echoed back by the card.
pub const CMD8_CHECK_PATTERN: u32 = 0xAA;
/// Full CMD8 argument.
pub const CMD8_ARG: u32 = CMD8_VHS_3V3 | CMD8_CHECK_PATTERN;
/// ACMD41 host-capacity-support bit (SDHC/SDXC accepted).
pub const ACMD41_HCS: u32 = 0x4000_0000;

/// Data start token for CMD17/18/24 blocks.
pub const START_TOKEN: u8 = 0xFE;
/// Mask isolating the write data-response status bits.
pub const DATA_RESPONSE_MASK: u8 = 0x1F;
/// Data-response value for an accepted write block.
pub const DATA_ACCEPTED: u8 = 0x05;
/// Data-response value for a block refused on its CRC.
pub const DATA_CRC_REJECTED: u8 = 0x0B;
/// Data-response value for a block refused by the write circuitry.
pub const DATA_WRITE_REJECTED: u8 = 0x0D;

/// R1 value while the card is still in the idle state.
pub const R1_IDLE: u8 = 0x01;
/// R1 value once initialisation completes.
pub const R1_READY: u8 = 0x00;

/// OCR[31:24]: power-up-complete bit.
pub const OCR_POWER_UP: u8 = 0x80;
/// OCR[31:24]: card-capacity-status bit (block addressing when set).
pub const OCR_CCS: u8 = 0x40;
/// OCR[23:16]: 3.2–3.4 V window bits.
pub const OCR_VOLTAGE_WINDOW: u8 = 0x60;

/// Response bytes polled before declaring no response.
pub const R1_POLL_BYTES: u32 = 8;
/// Bytes polled for a data start token before a token timeout.
pub const TOKEN_POLL_BYTES: u32 = 6000;
/// Bytes polled for write completion before a busy timeout.
pub const BUSY_POLL_BYTES: u32 = 7000;
/// ACMD41 repetitions before giving up on initialisation.
pub const ACMD41_RETRY_BOUND: u32 = 200;
/// Whole-operation retries for a transient single-block read failure.
pub const READ_RETRY_BOUND: u32 = 3;
/// Dummy bytes clocked with CS high before CMD0 (≥74 clock pulses).
pub const INIT_CLOCK_BYTES: u32 = 10;

/// Run `op` up to `attempts` times, returning the first success or the last
/// error. `attempts` of zero is treated as one.
pub fn retry<T, E>(attempts: u32, mut op: impl FnMut() -> Result<T, E>) -> Result<T, E> {
    let mut result = op();
    let mut remaining = attempts.saturating_sub(1);
    while result.is_err() && remaining > 0 {
        result = op();
        remaining = remaining.saturating_sub(1);
    }
    result
}

/// CRC16-CCITT (polynomial 0x1021, init 0) over a data block, as appended by
/// the card after every data token payload.
#[allow(clippy::arithmetic_side_effects)] // literal shift amounts cannot overflow
pub fn crc16_ccitt(data: &[u8]) -> u16 {
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn retry_returns_first_success() {
        let mut calls = 0;
        let result: Result<u32, ()> = retry(3, || {
            calls += 1;
            Ok(7)
        });
        assert_eq!(result, Ok(7));
        assert_eq!(calls, 1);
    }

    #[test]
    fn retry_recovers_on_second_attempt() {
        let mut calls = 0;
        let result: Result<u32, &str> = retry(3, || {
            calls += 1;
            if calls < 2 {
                Err("transient")
            } else {
                Ok(9)
            }
        });
        assert_eq!(result, Ok(9));
        assert_eq!(calls, 2);
    }

    #[test]
    fn retry_exhausts_bound() {
        let mut calls = 0;
        let result: Result<(), &str> = retry(3, || {
            calls += 1;
            Err("persistent")
        });
        assert_eq!(result, Err("persistent"));
        assert_eq!(calls, 3);
    }

    #[test]
    fn crc16_all_ones_block() {
        // 512 bytes of 0xFF is the canonical SD test vector.
        let data = [0xFFu8; 512];
        assert_eq!(crc16_ccitt(&data), 0x7FA1);
    }

    #[test]
    fn crc16_empty_is_zero() {
        assert_eq!(crc16_ccitt(&[]), 0);
    }
}
