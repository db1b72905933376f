//! # Decode Pump Module
//!
//! Buffer-driven decode pump for elementary audio streams.
//!
//! ## Overview
//!
//! This crate handles:
//! - Driving a stateful decoder through alternating feed and drain phases
//! - Re-sequencing decoded output for a streaming consumer, in arrival order
//! - Format and slot-set change handling mid-stream
//! - Decoder resolution by MIME type through a registered factory
//!
//! Container demuxing, codec internals, and audio device management are
//! opaque collaborators behind the [`StreamSource`], [`StreamDecoder`], and
//! [`StreamSink`] traits.

pub mod config;
pub mod error;
pub mod factory;
pub mod pump;
pub mod traits;

pub use config::{PumpConfig, PumpState, PumpStats};
pub use error::{PumpError, Result};
pub use factory::{DecoderBuilder, DecoderFactory};
pub use pump::DecodePump;
pub use traits::{
    AccessUnit, ChannelLayout, DecodedUnit, InputPoll, MimeType, OutputPoll, SampleEncoding,
    SlotIndex, StreamDecoder, StreamFormat, StreamSink, StreamSource,
};
