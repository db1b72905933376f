//! # Decode Pump Error Types
//!
//! Error taxonomy for a single pump run. Every variant is terminal to the run
//! that raised it; the pump performs no retries itself. "Nothing available yet"
//! responses from bounded polls are ordinary poll outcomes, not errors, and
//! never surface here.

use thiserror::Error;

/// Errors that can abort a decode pump run.
#[derive(Error, Debug)]
pub enum PumpError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Container is malformed, unreadable, or a read failed mid-stream.
    #[error("Source failure: {0}")]
    SourceFailure(String),

    /// No track in the container carries an audio MIME type.
    #[error("No audio track found ({tracks} tracks scanned)")]
    NoAudioTrack {
        /// Number of tracks the container reported.
        tracks: usize,
    },

    /// Requested track index does not exist.
    #[error("Track {0} out of range")]
    TrackOutOfRange(usize),

    // ========================================================================
    // Decoder Errors
    // ========================================================================
    /// No decoder is registered for the stream's MIME type.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// Decoder rejected the stream format during configuration.
    #[error("Decoder rejected configuration: {0}")]
    ConfigRejected(String),

    /// Decoder reported an internal codec fault.
    #[error("Decoder failure: {0}")]
    DecoderFailure(String),

    // ========================================================================
    // Sink Errors
    // ========================================================================
    /// Sink device is unavailable or rejected a write.
    #[error("Sink failure: {0}")]
    SinkFailure(String),

    /// Sink accepted zero bytes while a payload was still pending.
    #[error("Sink made no progress with {remaining} bytes pending")]
    SinkStalled {
        /// Bytes of the current decoded unit still undelivered.
        remaining: usize,
    },

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PumpError {
    /// Returns `true` if this error originated in the stream source.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            PumpError::SourceFailure(_)
                | PumpError::NoAudioTrack { .. }
                | PumpError::TrackOutOfRange(_)
        )
    }

    /// Returns `true` if this error originated in the decoder.
    pub fn is_decoder_error(&self) -> bool {
        matches!(
            self,
            PumpError::UnsupportedCodec(_)
                | PumpError::ConfigRejected(_)
                | PumpError::DecoderFailure(_)
        )
    }

    /// Returns `true` if this error originated in the streaming sink.
    pub fn is_sink_error(&self) -> bool {
        matches!(
            self,
            PumpError::SinkFailure(_) | PumpError::SinkStalled { .. }
        )
    }
}

/// Result type for decode pump operations.
pub type Result<T> = std::result::Result<T, PumpError>;
