//! # Decode Pump
//!
//! Drives exactly one forward pass over an elementary stream to completion,
//! converting compressed access units into decoded units delivered, in order,
//! to a streaming sink.
//!
//! ## Control Loop
//!
//! The pump owns the loop; source, decoder, and sink are polled or pushed
//! through their traits. Each iteration runs a feed phase (skipped once end of
//! input is reached) and a drain phase:
//!
//! 1. **Feed**: poll the decoder for a free input slot with a bounded timeout.
//!    On a slot, read the next access unit from the source and submit it; when
//!    the source is exhausted, submit a zero-length terminal unit exactly once.
//!    No slot available is ordinary backoff, not an error.
//! 2. **Drain**: poll the decoder for produced output with the same timeout.
//!    Nonzero units go to the sink in arrival order and their slots are
//!    released immediately. Slot-set changes trigger a refresh; format changes
//!    update the sink's playback rate before any further bytes are forwarded.
//!
//! The run finishes only after end of input has been signaled **and** the
//! decoder's own end-of-stream output unit has been drained, so buffered tail
//! samples are never lost.
//!
//! ## Ownership and Teardown
//!
//! A run exclusively owns its source/decoder/sink triple for its duration and
//! stops and releases them in reverse acquisition order on every exit path:
//! success, error, or cancellation. Cancellation is checked at the top of each
//! iteration.

use crate::config::{PumpConfig, PumpState, PumpStats};
use crate::error::{PumpError, Result};
use crate::factory::DecoderFactory;
use crate::traits::{InputPoll, OutputPoll, StreamDecoder, StreamSink, StreamSource};
use parking_lot::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// The buffer-driven decode pump.
///
/// Stateless across runs: state and statistics are reset at the start of every
/// [`run`](Self::run) and observable concurrently through [`state`](Self::state)
/// and [`stats`](Self::stats).
pub struct DecodePump {
    config: PumpConfig,
    state: Mutex<PumpState>,
    stats: Mutex<PumpStats>,
}

impl DecodePump {
    /// Create a pump with the given configuration.
    pub fn new(config: PumpConfig) -> Self {
        Self {
            config,
            state: Mutex::new(PumpState::Feeding),
            stats: Mutex::new(PumpStats::default()),
        }
    }

    /// Current pump state.
    pub fn state(&self) -> PumpState {
        *self.state.lock()
    }

    /// Statistics for the current or most recent run.
    pub fn stats(&self) -> PumpStats {
        self.stats.lock().clone()
    }

    /// Discover the audio track of a container source, resolve a decoder for
    /// it, configure the sink from the track format, and run the pump.
    ///
    /// This is the container-to-sink convenience path: the first track whose
    /// MIME type is audio is selected; the sink inherits the track's sample
    /// rate, channel layout, and encoding.
    ///
    /// # Errors
    ///
    /// Returns [`PumpError::NoAudioTrack`] if the container carries no audio
    /// track, [`PumpError::UnsupportedCodec`] if the factory has no decoder
    /// for the track's MIME type, or any collaborator failure from the run
    /// itself. The source is released on every exit path, including setup
    /// failures before the loop starts.
    #[instrument(skip_all)]
    pub async fn run_audio_track(
        &self,
        source: &mut dyn StreamSource,
        factory: &DecoderFactory,
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        match self.stage(source, factory, sink) {
            Ok(mut decoder) => self.run(source, decoder.as_mut(), sink, cancel).await,
            Err(e) => {
                sink.stop();
                source.release();
                Err(e)
            }
        }
    }

    /// Select the audio track and bring up sink and decoder.
    fn stage(
        &self,
        source: &mut dyn StreamSource,
        factory: &DecoderFactory,
        sink: &mut dyn StreamSink,
    ) -> Result<Box<dyn StreamDecoder>> {
        let tracks = source.track_count();
        debug!(tracks, "scanning container tracks");

        let track = (0..tracks)
            .find(|&i| {
                source
                    .format_of(i)
                    .map(|f| f.mime.is_audio())
                    .unwrap_or(false)
            })
            .ok_or(PumpError::NoAudioTrack { tracks })?;

        let format = source.format_of(track)?;
        debug!(track, mime = %format.mime, sample_rate = format.sample_rate, "selected audio track");
        source.select_track(track)?;

        // Sink comes up before the decoder exists: a sink bring-up failure
        // must not strand a started decoder.
        sink.configure(format.sample_rate, format.channel_layout, format.encoding)?;
        sink.start()?;

        factory.create(&format)
    }

    /// Run one forward pass over an already-selected elementary stream.
    ///
    /// The decoder must be configured and started, the sink configured and
    /// started. All three collaborators are stopped and released before this
    /// returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns the first [`PumpError`] raised by a collaborator. The pump
    /// performs no retries; retry policy, if any, belongs to the caller.
    /// Cancellation is not an error: a cancelled run returns `Ok(())` with the
    /// pump state short of [`PumpState::Finished`].
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        source: &mut dyn StreamSource,
        decoder: &mut dyn StreamDecoder,
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        // An invalid config still takes the teardown path below: the
        // collaborators were handed over for this run and must not leak.
        let result = match self.config.validate() {
            Ok(()) => {
                *self.state.lock() = PumpState::Feeding;
                *self.stats.lock() = PumpStats::default();
                self.drive(source, decoder, sink, cancel).await
            }
            Err(e) => Err(PumpError::Internal(format!("invalid pump config: {e}"))),
        };

        if let Err(e) = &result {
            warn!(error = %e, "decode pump aborted");
        }

        // Reverse acquisition order, on every exit path.
        sink.stop();
        decoder.stop();
        decoder.release();
        source.release();

        result
    }

    /// The feed/drain control loop.
    async fn drive(
        &self,
        source: &mut dyn StreamSource,
        decoder: &mut dyn StreamDecoder,
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let timeout = self.config.poll_timeout;
        let mut saw_input_eos = false;
        let mut saw_output_eos = false;

        loop {
            if cancel.is_cancelled() {
                info!("decode pump cancelled");
                return Ok(());
            }

            let mut progressed = false;

            // Feed phase. Skipped entirely once end of input is reached, so
            // the terminal unit is submitted exactly once.
            if !saw_input_eos {
                *self.state.lock() = PumpState::Feeding;

                match decoder.dequeue_input_slot(timeout).await? {
                    InputPoll::Unavailable => {
                        self.stats.lock().input_stalls += 1;
                    }
                    InputPoll::Slot(slot) => {
                        progressed = true;

                        match source.next_access_unit().await? {
                            Some(unit) => {
                                decoder.submit_input(
                                    slot,
                                    &unit.payload,
                                    unit.timestamp_us,
                                    unit.end_of_stream,
                                )?;

                                {
                                    let mut stats = self.stats.lock();
                                    stats.units_submitted += 1;
                                    stats.bytes_submitted += unit.payload.len() as u64;
                                }

                                if unit.end_of_stream {
                                    debug!(
                                        units = self.stats.lock().units_submitted,
                                        "end of input signaled"
                                    );
                                    saw_input_eos = true;
                                    *self.state.lock() = PumpState::EndOfInput;
                                } else {
                                    source.advance().await?;
                                }
                            }
                            None => {
                                decoder.submit_input(slot, &[], 0, true)?;
                                self.stats.lock().units_submitted += 1;

                                debug!(
                                    units = self.stats.lock().units_submitted,
                                    "end of input signaled"
                                );
                                saw_input_eos = true;
                                *self.state.lock() = PumpState::EndOfInput;
                            }
                        }
                    }
                }
            }

            // Drain phase.
            if !saw_input_eos {
                *self.state.lock() = PumpState::Draining;
            }

            match decoder.dequeue_output_slot(timeout).await? {
                OutputPoll::Unit { slot, unit } => {
                    progressed = true;

                    if !unit.payload.is_empty() {
                        self.write_all(sink, &unit.payload).await?;

                        let mut stats = self.stats.lock();
                        stats.units_delivered += 1;
                        stats.bytes_delivered += unit.payload.len() as u64;
                    }

                    decoder.release_output_slot(slot)?;

                    if unit.end_of_stream {
                        saw_output_eos = true;
                    }
                }
                OutputPoll::OutputSetChanged => {
                    progressed = true;
                    decoder.refresh_output_slots()?;
                    self.stats.lock().output_set_refreshes += 1;
                    debug!("decoder output slot set refreshed");
                }
                OutputPoll::FormatChanged => {
                    progressed = true;
                    let format = decoder.output_format()?;
                    sink.set_playback_rate(format.sample_rate)?;
                    self.stats.lock().format_changes += 1;
                    info!(
                        sample_rate = format.sample_rate,
                        "decoder output format changed"
                    );
                }
                OutputPoll::Unavailable => {
                    self.stats.lock().output_stalls += 1;
                }
            }

            if saw_input_eos && saw_output_eos {
                *self.state.lock() = PumpState::Finished;
                let stats = self.stats.lock();
                info!(
                    units = stats.units_delivered,
                    bytes = stats.bytes_delivered,
                    "elementary stream drained"
                );
                return Ok(());
            }

            if !progressed && !self.config.idle_backoff.is_zero() {
                sleep(self.config.idle_backoff).await;
            }
        }
    }

    /// Deliver one decoded payload to the sink completely, honoring partial
    /// writes and the configured write chunk cap.
    async fn write_all(&self, sink: &mut dyn StreamSink, mut bytes: &[u8]) -> Result<()> {
        while !bytes.is_empty() {
            let slice = &bytes[..bytes.len().min(self.config.max_write_chunk)];
            let written = sink.write(slice).await?;

            if written == 0 {
                return Err(PumpError::SinkStalled {
                    remaining: bytes.len(),
                });
            }

            bytes = &bytes[written.min(bytes.len())..];
        }
        Ok(())
    }
}

impl Default for DecodePump {
    fn default() -> Self {
        Self::new(PumpConfig::default())
    }
}
