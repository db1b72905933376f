//! # Decoder Factory
//!
//! Capability lookup from [`MimeType`] to a started decoder instance.
//!
//! The factory is resolved exactly once, at configuration time, replacing
//! string-keyed decoder dispatch scattered through call sites. Registration is
//! explicit: hosts register a builder per MIME type they can decode, and an
//! unregistered type fails with [`PumpError::UnsupportedCodec`].

use crate::error::{PumpError, Result};
use crate::traits::{MimeType, StreamDecoder, StreamFormat};
use std::collections::HashMap;
use tracing::debug;

/// Builder closure producing a fresh, unconfigured decoder for a format.
pub type DecoderBuilder = Box<dyn Fn(&StreamFormat) -> Result<Box<dyn StreamDecoder>> + Send + Sync>;

/// Registry of decoder builders keyed by MIME type.
#[derive(Default)]
pub struct DecoderFactory {
    builders: HashMap<MimeType, DecoderBuilder>,
}

impl DecoderFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Register a decoder builder for a MIME type.
    ///
    /// A later registration for the same type replaces the earlier one.
    pub fn register<F>(&mut self, mime: MimeType, builder: F)
    where
        F: Fn(&StreamFormat) -> Result<Box<dyn StreamDecoder>> + Send + Sync + 'static,
    {
        self.builders.insert(mime, Box::new(builder));
    }

    /// Returns `true` if a decoder is registered for the MIME type.
    pub fn supports(&self, mime: &MimeType) -> bool {
        self.builders.contains_key(mime)
    }

    /// MIME types with a registered decoder.
    pub fn supported_types(&self) -> Vec<MimeType> {
        self.builders.keys().cloned().collect()
    }

    /// Resolve, configure, and start a decoder for the given stream format.
    ///
    /// # Errors
    ///
    /// Returns [`PumpError::UnsupportedCodec`] if no builder is registered for
    /// the format's MIME type, or whatever the builder/decoder raised during
    /// construction, configuration, or start.
    pub fn create(&self, format: &StreamFormat) -> Result<Box<dyn StreamDecoder>> {
        let builder = self
            .builders
            .get(&format.mime)
            .ok_or_else(|| PumpError::UnsupportedCodec(format.mime.as_mime().to_string()))?;

        debug!(mime = %format.mime, sample_rate = format.sample_rate, "creating decoder");

        let mut decoder = builder(format)?;
        decoder.configure(format)?;
        decoder.start()?;
        Ok(decoder)
    }
}

impl std::fmt::Debug for DecoderFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderFactory")
            .field("supported_types", &self.supported_types())
            .finish()
    }
}
