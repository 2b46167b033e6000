//! StreamEngine — the audio transport state machine.
//!
//! `Idle → HeaderParsed → Playing ⇄ Paused → Idle`, with `stop` legal from
//! every state. The engine owns no device; every operation borrows the
//! block device for exactly its own I/O, which keeps the machine testable
//! and leaves the single card owner free between calls.

use assets::{AssetIndex, AssetTag};
use platform::{Block, BlockDevice, BLOCK_SIZE};

use crate::cursor::PlaybackCursor;
use crate::error::StreamError;
use crate::header::{self, AudioHeader, HeaderError};

/// Externally visible engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamState {
    /// No track loaded.
    Idle,
    /// Header parsed; streaming not yet started.
    HeaderParsed,
    /// Stream session open, blocks being consumed.
    Playing,
    /// Session closed with the cursor retained.
    Paused,
}

/// Outcome of one [`StreamEngine::consume`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Progress {
    /// A block was delivered; more remain.
    Streaming,
    /// The final block was delivered; the engine is idle again.
    Finished,
}

#[derive(Clone, Copy)]
enum State {
    Idle,
    HeaderParsed {
        header: AudioHeader,
        payload_start: u32,
    },
    Playing {
        header: AudioHeader,
        cursor: PlaybackCursor,
    },
    Paused {
        header: AudioHeader,
        cursor: PlaybackCursor,
    },
}

/// Transport state machine over a borrowed block device.
pub struct StreamEngine {
    state: State,
}

impl StreamEngine {
    /// An idle engine.
    pub const fn new() -> Self {
        StreamEngine { state: State::Idle }
    }

    /// Current transport state.
    pub fn state(&self) -> StreamState {
        match self.state {
            State::Idle => StreamState::Idle,
            State::HeaderParsed { .. } => StreamState::HeaderParsed,
            State::Playing { .. } => StreamState::Playing,
            State::Paused { .. } => StreamState::Paused,
        }
    }

    /// Header of the loaded track, if any.
    pub fn header(&self) -> Option<AudioHeader> {
        match self.state {
            State::Idle => None,
            State::HeaderParsed { header, .. }
            | State::Playing { header, .. }
            | State::Paused { header, .. } => Some(header),
        }
    }

    /// Cursor position while playing or paused.
    pub fn cursor(&self) -> Option<PlaybackCursor> {
        match self.state {
            State::Playing { cursor, .. } | State::Paused { cursor, .. } => Some(cursor),
            State::Idle | State::HeaderParsed { .. } => None,
        }
    }

    /// Resolve `tag` and parse its header.
    ///
    /// Transitions:
    /// - `Idle → HeaderParsed` on success
    /// - any prior track is stopped first (`stop` is legal from every state)
    ///
    /// No stream I/O is issued; a rejected start leaves the engine idle with
    /// no session to clean up.
    ///
    /// # Errors
    ///
    /// [`StreamError::AssetNotFound`] for an uncatalogued tag,
    /// [`StreamError::MalformedHeader`] for an unparseable or inconsistent
    /// header, [`StreamError::StreamRead`] for a device fault reading the
    /// header block. The engine is `Idle` after any error.
    pub fn start<D: BlockDevice, const N: usize>(
        &mut self,
        device: &mut D,
        index: &AssetIndex<N>,
        tag: AssetTag,
    ) -> Result<AudioHeader, StreamError<D::Error>> {
        self.stop(device)?;
        let entry = index.find(tag).ok_or(StreamError::AssetNotFound)?;
        let mut block: Block = [0; BLOCK_SIZE];
        device
            .read_block(entry.payload_start(), &mut block)
            .map_err(StreamError::StreamRead)?;
        let header = header::parse(&block)?;
        let payload_bytes = entry.payload_blocks().saturating_mul(BLOCK_SIZE as u32);
        if header.data_offset.saturating_add(header.data_size) > payload_bytes {
            return Err(StreamError::MalformedHeader(HeaderError::InconsistentSize));
        }
        self.state = State::HeaderParsed {
            header,
            payload_start: entry.payload_start(),
        };
        Ok(header)
    }

    /// Open the stream session at the data start.
    ///
    /// Transitions: `HeaderParsed → Playing`.
    ///
    /// # Errors
    ///
    /// [`StreamError::NotLoaded`] without a parsed header,
    /// [`StreamError::StreamRead`] when the session fails to open (the
    /// header stays loaded so the caller may retry).
    pub fn begin<D: BlockDevice>(&mut self, device: &mut D) -> Result<(), StreamError<D::Error>> {
        let State::HeaderParsed {
            header,
            payload_start,
        } = self.state
        else {
            return Err(StreamError::NotLoaded);
        };
        let start = payload_start.saturating_add(
            header
                .data_offset
                .checked_div(BLOCK_SIZE as u32)
                .unwrap_or(0),
        );
        device.begin_stream(start).map_err(StreamError::StreamRead)?;
        self.state = State::Playing {
            header,
            cursor: PlaybackCursor::new(start, header.data_size),
        };
        Ok(())
    }

    /// Fetch the next block into `buf` and advance the cursor.
    ///
    /// Transitions:
    /// - `Playing → Playing` returning [`Progress::Streaming`]
    /// - `Playing → Idle` returning [`Progress::Finished`] once the byte
    ///   budget drains; the session is closed before returning
    ///
    /// # Errors
    ///
    /// [`StreamError::NotPlaying`] outside `Playing`;
    /// [`StreamError::StreamRead`] on a device fault, after which the
    /// session is closed and the engine is `Idle` — "playback interrupted",
    /// not fatal.
    pub fn consume<D: BlockDevice>(
        &mut self,
        device: &mut D,
        buf: &mut Block,
    ) -> Result<Progress, StreamError<D::Error>> {
        let State::Playing { header, mut cursor } = self.state else {
            return Err(StreamError::NotPlaying);
        };
        if let Err(e) = device.next_stream_block(buf) {
            let _ = device.end_stream();
            self.state = State::Idle;
            return Err(StreamError::StreamRead(e));
        }
        cursor.advance();
        if cursor.finished() {
            self.state = State::Idle;
            device.end_stream().map_err(StreamError::StreamRead)?;
            return Ok(Progress::Finished);
        }
        self.state = State::Playing { header, cursor };
        Ok(Progress::Streaming)
    }

    /// Close the session, keeping the cursor.
    ///
    /// Transitions: `Playing → Paused`; a no-op in every other state.
    ///
    /// # Errors
    ///
    /// [`StreamError::StreamRead`] when closing the session faults; the
    /// engine falls back to `Idle` since the cursor can no longer be
    /// trusted against an unclosed stream.
    pub fn pause<D: BlockDevice>(&mut self, device: &mut D) -> Result<(), StreamError<D::Error>> {
        if let State::Playing { header, cursor } = self.state {
            match device.end_stream() {
                Ok(()) => self.state = State::Paused { header, cursor },
                Err(e) => {
                    self.state = State::Idle;
                    return Err(StreamError::StreamRead(e));
                }
            }
        }
        Ok(())
    }

    /// Reopen the session at the retained cursor.
    ///
    /// Transitions: `Paused → Playing`; a no-op in every other state. No
    /// block is re-read and the header is not re-parsed.
    ///
    /// # Errors
    ///
    /// [`StreamError::StreamRead`] when the session fails to reopen; the
    /// engine stays `Paused` so the caller may retry.
    pub fn resume<D: BlockDevice>(&mut self, device: &mut D) -> Result<(), StreamError<D::Error>> {
        if let State::Paused { header, cursor } = self.state {
            device
                .begin_stream(cursor.current_block)
                .map_err(StreamError::StreamRead)?;
            self.state = State::Playing { header, cursor };
        }
        Ok(())
    }

    /// Drop the track and close any open session. Always legal; calling it
    /// twice in a row is a no-op the second time.
    ///
    /// # Errors
    ///
    /// [`StreamError::StreamRead`] when closing the session faults. The
    /// engine is `Idle` regardless.
    pub fn stop<D: BlockDevice>(&mut self, device: &mut D) -> Result<(), StreamError<D::Error>> {
        let streaming = matches!(self.state, State::Playing { .. });
        self.state = State::Idle;
        if streaming {
            device.end_stream().map_err(StreamError::StreamRead)?;
        }
        Ok(())
    }
}

impl Default for StreamEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use crate::header::wav_block;
    use assets::{AssetEntry, SmallAssetIndex};
    use platform::mocks::{MockBlockDevice, MockDeviceError};

    const TAG: AssetTag = AssetTag::new([1, 2, 3, 4, 5]);
    const START: u32 = 15_000;

    /// Card image with one clip: descriptor at START, WAV payload after it.
    fn fixture(data_size: u32) -> (MockBlockDevice, SmallAssetIndex) {
        let mut dev = MockBlockDevice::new();
        dev.set_block(START + 1, wav_block(22_050, 16, 1, data_size));
        // Distinct payload blocks so monotonic consumption is observable.
        let payload_blocks = (44 + data_size).div_ceil(512);
        for i in 1..payload_blocks {
            dev.set_block(START + 1 + i, [(i & 0xFF) as u8; BLOCK_SIZE]);
        }
        let mut index = SmallAssetIndex::new();
        index
            .append(AssetEntry {
                tag: TAG,
                start_block: START,
                end_block: START + 1 + payload_blocks,
            })
            .unwrap();
        (dev, index)
    }

    #[test]
    fn start_parses_header_without_opening_stream() {
        let (mut dev, index) = fixture(1000);
        let mut engine = StreamEngine::new();
        let header = engine.start(&mut dev, &index, TAG).unwrap();
        assert_eq!(header.sample_rate, 22_050);
        assert_eq!(engine.state(), StreamState::HeaderParsed);
        assert_eq!(dev.stream_opens, 0);
    }

    #[test]
    fn start_unknown_tag_is_not_found() {
        let (mut dev, index) = fixture(1000);
        let mut engine = StreamEngine::new();
        let missing = AssetTag::new([9, 9, 9, 9, 9]);
        assert_eq!(
            engine.start(&mut dev, &index, missing),
            Err(StreamError::AssetNotFound)
        );
        assert_eq!(engine.state(), StreamState::Idle);
        // Rejected before any card traffic.
        assert_eq!(dev.reads, 0);
        assert_eq!(dev.stream_opens, 0);
    }

    #[test]
    fn start_malformed_header_stays_idle() {
        let (mut dev, index) = fixture(1000);
        dev.set_block(START + 1, [0u8; BLOCK_SIZE]);
        let mut engine = StreamEngine::new();
        assert_eq!(
            engine.start(&mut dev, &index, TAG),
            Err(StreamError::MalformedHeader(HeaderError::BadSignature))
        );
        assert_eq!(engine.state(), StreamState::Idle);
    }

    #[test]
    fn start_rejects_data_past_the_payload() {
        let mut dev = MockBlockDevice::new();
        // Container claims 10 KB of samples but the entry spans one block.
        let mut block = wav_block(22_050, 16, 1, 10_000);
        block[4..8].copy_from_slice(&(36 + 10_000u32).to_le_bytes());
        dev.set_block(START + 1, block);
        let mut index = SmallAssetIndex::new();
        index
            .append(AssetEntry {
                tag: TAG,
                start_block: START,
                end_block: START + 2,
            })
            .unwrap();
        let mut engine = StreamEngine::new();
        assert_eq!(
            engine.start(&mut dev, &index, TAG),
            Err(StreamError::MalformedHeader(HeaderError::InconsistentSize))
        );
    }

    #[test]
    fn full_cycle_finishes_and_closes_the_stream() {
        let (mut dev, index) = fixture(1000);
        let mut engine = StreamEngine::new();
        engine.start(&mut dev, &index, TAG).unwrap();
        engine.begin(&mut dev).unwrap();
        assert_eq!(engine.state(), StreamState::Playing);

        let mut buf = [0u8; BLOCK_SIZE];
        // 44-byte header + 1000 bytes of samples: two blocks.
        assert_eq!(engine.consume(&mut dev, &mut buf).unwrap(), Progress::Streaming);
        assert_eq!(engine.consume(&mut dev, &mut buf).unwrap(), Progress::Finished);
        assert_eq!(engine.state(), StreamState::Idle);
        // Stream closed: a plain read must succeed immediately.
        dev.read_block(START + 1, &mut buf).unwrap();
    }

    #[test]
    fn pause_resume_never_rereads_a_block() {
        let (mut dev, index) = fixture(2000);
        let mut engine = StreamEngine::new();
        engine.start(&mut dev, &index, TAG).unwrap();
        engine.begin(&mut dev).unwrap();

        let mut buf = [0u8; BLOCK_SIZE];
        engine.consume(&mut dev, &mut buf).unwrap();
        let before = engine.cursor().unwrap();
        engine.pause(&mut dev).unwrap();
        assert_eq!(engine.state(), StreamState::Paused);
        assert_eq!(engine.cursor().unwrap(), before);

        engine.resume(&mut dev).unwrap();
        engine.consume(&mut dev, &mut buf).unwrap();
        // Second session, and the cursor moved strictly forward.
        assert_eq!(dev.stream_opens, 2);
        assert!(engine.cursor().unwrap().current_block > before.current_block);
        // The block served after resume is the one the cursor pointed at.
        assert_eq!(buf[0], 1);
    }

    #[test]
    fn mid_stream_fault_interrupts_to_idle() {
        let (mut dev, index) = fixture(2000);
        dev.fail_stream_after = Some(1);
        let mut engine = StreamEngine::new();
        engine.start(&mut dev, &index, TAG).unwrap();
        engine.begin(&mut dev).unwrap();

        let mut buf = [0u8; BLOCK_SIZE];
        engine.consume(&mut dev, &mut buf).unwrap();
        assert_eq!(
            engine.consume(&mut dev, &mut buf),
            Err(StreamError::StreamRead(MockDeviceError::ReadFault))
        );
        assert_eq!(engine.state(), StreamState::Idle);
        // Session was closed on the way down.
        dev.read_block(START + 1, &mut buf).unwrap();
    }

    #[test]
    fn stop_is_idempotent_and_pause_when_idle_is_a_noop() {
        let (mut dev, index) = fixture(1000);
        let mut engine = StreamEngine::new();
        engine.stop(&mut dev).unwrap();
        engine.pause(&mut dev).unwrap();
        engine.resume(&mut dev).unwrap();
        assert_eq!(engine.state(), StreamState::Idle);

        engine.start(&mut dev, &index, TAG).unwrap();
        engine.begin(&mut dev).unwrap();
        engine.stop(&mut dev).unwrap();
        engine.stop(&mut dev).unwrap();
        assert_eq!(engine.state(), StreamState::Idle);
    }

    #[test]
    fn begin_without_header_is_rejected() {
        let (mut dev, _) = fixture(1000);
        let mut engine = StreamEngine::new();
        assert_eq!(engine.begin(&mut dev), Err(StreamError::NotLoaded));
        let mut buf = [0u8; BLOCK_SIZE];
        assert_eq!(
            engine.consume(&mut dev, &mut buf),
            Err(StreamError::NotPlaying)
        );
    }
}
