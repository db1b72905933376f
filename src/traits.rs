//! # Decode Pipeline Traits
//!
//! Core abstractions for the buffer-driven decode pump. The pump converts one
//! elementary stream from compressed access units into decoded units delivered,
//! in order, to a streaming sink. Demuxing, codec internals, and audio device
//! management live behind the three collaborator traits defined here.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  AccessUnit   ┌───────────────┐  DecodedUnit  ┌────────────┐
//! │ StreamSource │ ────────────▶ │ StreamDecoder │ ────────────▶ │ StreamSink │
//! └──────────────┘  (feed phase) └───────────────┘ (drain phase) └────────────┘
//!                        ▲ pump owns the control loop ▲
//! ```
//!
//! The decoder is allowed to be internally concurrent or hardware-backed; the
//! pump treats it as synchronous through bounded polls. Output is not 1:1 or
//! immediately paired with input, which is why the feed and drain phases are
//! decoupled and every poll returns a tagged result rather than a sentinel
//! index.
//!
//! ## Threading Model
//!
//! A pump run exclusively owns its source/decoder/sink triple for its whole
//! duration. Traits are `Send` so a run can be moved onto a background task;
//! any concurrency inside a collaborator stays encapsulated behind it.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Stream Format Types
// ============================================================================

/// Recognized compressed-stream MIME identifiers.
///
/// A closed variant set replaces untyped string dispatch: the decoder factory
/// resolves a `MimeType` exactly once at configuration time and fails with
/// [`PumpError::UnsupportedCodec`](crate::PumpError::UnsupportedCodec) when no
/// decoder is registered for it. Use [`MimeType::Other`] for types outside the
/// recognized set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeType {
    /// Advanced Audio Coding (`audio/mp4a-latm`)
    Aac,
    /// MPEG-1 Audio Layer 3 (`audio/mpeg`)
    Mp3,
    /// Ogg Vorbis (`audio/vorbis`)
    Vorbis,
    /// Opus (`audio/opus`)
    Opus,
    /// Free Lossless Audio Codec (`audio/flac`)
    Flac,
    /// Uncompressed PCM (`audio/raw`)
    Pcm,
    /// MIME type outside the recognized set.
    Other(String),
}

impl MimeType {
    /// Parse a MIME string into the closed variant set.
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            "audio/mp4a-latm" | "audio/aac" => MimeType::Aac,
            "audio/mpeg" | "audio/mp3" => MimeType::Mp3,
            "audio/vorbis" => MimeType::Vorbis,
            "audio/opus" => MimeType::Opus,
            "audio/flac" => MimeType::Flac,
            "audio/raw" => MimeType::Pcm,
            other => MimeType::Other(other.to_string()),
        }
    }

    /// Canonical MIME string for this type.
    pub fn as_mime(&self) -> &str {
        match self {
            MimeType::Aac => "audio/mp4a-latm",
            MimeType::Mp3 => "audio/mpeg",
            MimeType::Vorbis => "audio/vorbis",
            MimeType::Opus => "audio/opus",
            MimeType::Flac => "audio/flac",
            MimeType::Pcm => "audio/raw",
            MimeType::Other(s) => s.as_str(),
        }
    }

    /// Returns `true` if this type identifies an audio elementary stream.
    ///
    /// Used by track discovery to pick the audio track out of a container that
    /// also carries video or subtitle tracks.
    pub fn is_audio(&self) -> bool {
        match self {
            MimeType::Other(s) => s.starts_with("audio/"),
            _ => true,
        }
    }
}

impl std::fmt::Display for MimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_mime())
    }
}

/// Channel layout of the decoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    /// Single channel.
    Mono,
    /// Two channels, interleaved LR.
    Stereo,
    /// More than two channels.
    Multi(u16),
}

impl ChannelLayout {
    /// Number of channels in this layout.
    pub fn channels(&self) -> u16 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
            ChannelLayout::Multi(n) => *n,
        }
    }

    /// Build a layout from a raw channel count.
    pub fn from_channels(channels: u16) -> Self {
        match channels {
            0 | 1 => ChannelLayout::Mono,
            2 => ChannelLayout::Stereo,
            n => ChannelLayout::Multi(n),
        }
    }
}

/// Sample encoding of decoded payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    /// Signed 16-bit little-endian PCM.
    PcmI16,
    /// 32-bit float PCM.
    PcmF32,
}

impl SampleEncoding {
    /// Bytes occupied by one sample of one channel.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleEncoding::PcmI16 => 2,
            SampleEncoding::PcmF32 => 4,
        }
    }
}

/// Format of one elementary stream.
///
/// Replaced wholesale whenever the decoder announces a format change; the pump
/// never patches individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFormat {
    /// MIME identifier of the compressed stream.
    pub mime: MimeType,
    /// Sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: u32,
    /// Channel layout of the decoded output.
    pub channel_layout: ChannelLayout,
    /// Largest access unit the stream will produce, if the container knows it.
    pub max_input_size: Option<usize>,
    /// Encoding of the decoded payload bytes.
    pub encoding: SampleEncoding,
}

impl StreamFormat {
    /// Create a format descriptor with default encoding (16-bit PCM).
    pub fn new(mime: MimeType, sample_rate: u32, channel_layout: ChannelLayout) -> Self {
        Self {
            mime,
            sample_rate,
            channel_layout,
            max_input_size: None,
            encoding: SampleEncoding::PcmI16,
        }
    }

    /// Set the maximum access unit size reported by the container.
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = Some(size);
        self
    }

    /// Set the decoded sample encoding.
    pub fn with_encoding(mut self, encoding: SampleEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Bytes occupied by one decoded frame (one sample per channel).
    pub fn bytes_per_frame(&self) -> usize {
        self.encoding.bytes_per_sample() * self.channel_layout.channels() as usize
    }
}

// ============================================================================
// Stream Units
// ============================================================================

/// One demultiplexed, still-compressed chunk of a single track.
///
/// Produced by the source, consumed exactly once by the pump, immutable.
#[derive(Debug, Clone)]
pub struct AccessUnit {
    /// Compressed payload bytes.
    pub payload: Bytes,
    /// Presentation timestamp, monotonic microseconds.
    pub timestamp_us: i64,
    /// No further units follow on this stream.
    pub end_of_stream: bool,
}

impl AccessUnit {
    /// Create an access unit carrying payload.
    pub fn new(payload: Bytes, timestamp_us: i64) -> Self {
        Self {
            payload,
            timestamp_us,
            end_of_stream: false,
        }
    }

    /// Create the zero-length terminal unit.
    pub fn end_of_stream(timestamp_us: i64) -> Self {
        Self {
            payload: Bytes::new(),
            timestamp_us,
            end_of_stream: true,
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if the unit carries no payload.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// One decoded chunk produced by the decoder.
///
/// Consumed exactly once by the sink via the pump, immutable. A zero-size unit
/// flagged `end_of_stream` marks the end of decoded output.
#[derive(Debug, Clone)]
pub struct DecodedUnit {
    /// Decoded payload bytes.
    pub payload: Bytes,
    /// No further decoded units follow.
    pub end_of_stream: bool,
}

impl DecodedUnit {
    /// Create a decoded unit carrying payload.
    pub fn new(payload: Bytes) -> Self {
        Self {
            payload,
            end_of_stream: false,
        }
    }

    /// Create the zero-size terminal unit.
    pub fn end_of_stream() -> Self {
        Self {
            payload: Bytes::new(),
            end_of_stream: true,
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if the unit carries no payload.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

// ============================================================================
// Poll Results
// ============================================================================

/// Index of a reusable buffer slot owned by the decoder.
pub type SlotIndex = usize;

/// Outcome of polling the decoder for a free input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPoll {
    /// A free input slot is ready for submission.
    Slot(SlotIndex),
    /// No slot freed up within the bounded wait. Not an error.
    Unavailable,
}

/// Outcome of polling the decoder for produced output.
#[derive(Debug, Clone)]
pub enum OutputPoll {
    /// A decoded unit is ready in the given slot. The slot must be returned
    /// via [`StreamDecoder::release_output_slot`] after the unit is consumed.
    Unit {
        /// Slot holding the decoded unit.
        slot: SlotIndex,
        /// The decoded unit itself.
        unit: DecodedUnit,
    },
    /// The decoder replaced its output slot set; the caller must refresh its
    /// view before draining further. No data this poll.
    OutputSetChanged,
    /// Subsequent output conforms to a new [`StreamFormat`], retrievable via
    /// [`StreamDecoder::output_format`]. No data this poll.
    FormatChanged,
    /// No output produced within the bounded wait. Not an error.
    Unavailable,
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Supplier of compressed access units for one selected track.
///
/// The source owns the container handle and its read cursor. Reading and
/// advancing are separate steps: [`next_access_unit`](Self::next_access_unit)
/// returns the unit at the cursor without moving it, and
/// [`advance`](Self::advance) moves to the next unit. The pump only advances
/// after a successful submission, so a stalled decoder never skips units.
///
/// End of stream is reported either as `Ok(None)` or as a final (possibly
/// zero-length) unit flagged `end_of_stream`.
#[async_trait]
pub trait StreamSource: Send {
    /// Number of tracks in the container.
    fn track_count(&self) -> usize;

    /// Format of the given track.
    ///
    /// # Errors
    ///
    /// Returns an error if the track index is out of range or the container
    /// metadata is unreadable.
    fn format_of(&self, track: usize) -> Result<StreamFormat>;

    /// Restrict subsequent reads to the given track.
    fn select_track(&mut self, track: usize) -> Result<()>;

    /// Read the access unit at the current cursor.
    ///
    /// Returns `Ok(None)` once the stream is exhausted.
    async fn next_access_unit(&mut self) -> Result<Option<AccessUnit>>;

    /// Move the read cursor to the next access unit.
    async fn advance(&mut self) -> Result<()>;

    /// Release the container handle. Called on every pump exit path.
    fn release(&mut self);
}

/// Stateful decoder for one elementary stream.
///
/// Opaque codec accepting compressed units and producing decoded units. Output
/// is not paired 1:1 with input: the decoder buffers internally and may emit
/// format or slot-set changes between units. Both dequeue operations use a
/// bounded timeout and report "nothing yet" through their tagged poll results
/// rather than an error.
#[async_trait]
pub trait StreamDecoder: Send {
    /// Configure the decoder for the given stream format.
    ///
    /// # Errors
    ///
    /// Returns [`PumpError::ConfigRejected`](crate::PumpError::ConfigRejected)
    /// if the decoder cannot handle the format.
    fn configure(&mut self, format: &StreamFormat) -> Result<()>;

    /// Start the decoder. Must be called after [`configure`](Self::configure).
    fn start(&mut self) -> Result<()>;

    /// Poll for a free input slot, waiting at most `timeout`.
    async fn dequeue_input_slot(&mut self, timeout: Duration) -> Result<InputPoll>;

    /// Submit a compressed payload into a previously dequeued input slot.
    ///
    /// A zero-length payload with `end_of_stream` set is the terminal
    /// submission; no further input may follow it.
    fn submit_input(
        &mut self,
        slot: SlotIndex,
        payload: &[u8],
        timestamp_us: i64,
        end_of_stream: bool,
    ) -> Result<()>;

    /// Poll for produced output, waiting at most `timeout`.
    async fn dequeue_output_slot(&mut self, timeout: Duration) -> Result<OutputPoll>;

    /// Re-acquire the output slot set after [`OutputPoll::OutputSetChanged`].
    fn refresh_output_slots(&mut self) -> Result<()>;

    /// Current output format. Fetched after [`OutputPoll::FormatChanged`].
    fn output_format(&self) -> Result<StreamFormat>;

    /// Return a drained output slot to the decoder's pool.
    fn release_output_slot(&mut self, slot: SlotIndex) -> Result<()>;

    /// Stop decoding. The decoder may be restarted with a fresh `configure`.
    fn stop(&mut self);

    /// Release codec resources. Called on every pump exit path.
    fn release(&mut self);
}

impl std::fmt::Debug for dyn StreamDecoder + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn StreamDecoder")
    }
}

/// Streaming consumer of decoded payload bytes.
///
/// Accepts decoded payload in arrival order. Writes may be partial; the pump
/// retries until a unit is fully delivered. On a decoder format change the
/// pump calls [`set_playback_rate`](Self::set_playback_rate) before forwarding
/// any further bytes.
#[async_trait]
pub trait StreamSink: Send {
    /// Configure the sink for the decoded output format.
    fn configure(
        &mut self,
        sample_rate: u32,
        channel_layout: ChannelLayout,
        encoding: SampleEncoding,
    ) -> Result<()>;

    /// Start consuming. Must be called after [`configure`](Self::configure).
    fn start(&mut self) -> Result<()>;

    /// Write decoded bytes, returning how many were accepted.
    async fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Adjust the playback sample rate after a decoder format change.
    fn set_playback_rate(&mut self, sample_rate: u32) -> Result<()>;

    /// Stop consuming and release the output device. Called on every pump
    /// exit path.
    fn stop(&mut self);
}

// ============================================================================
// Tests
// ============================================================================
