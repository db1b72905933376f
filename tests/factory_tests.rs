//! Decoder factory resolution tests.
//!
//! Verifies MIME-type registration and lookup, configure/start ordering on
//! the created decoder, and failure on unsupported types.

use core_decode::{
    ChannelLayout, DecoderFactory, InputPoll, MimeType, OutputPoll, PumpError, Result, SlotIndex,
    StreamDecoder, StreamFormat,
};
use mockall::mock;
use mockall::Sequence;
use std::time::Duration;

mock! {
    pub Decoder {}

    #[async_trait::async_trait]
    impl StreamDecoder for Decoder {
        fn configure(&mut self, format: &StreamFormat) -> Result<()>;
        fn start(&mut self) -> Result<()>;
        async fn dequeue_input_slot(&mut self, timeout: Duration) -> Result<InputPoll>;
        fn submit_input(
            &mut self,
            slot: SlotIndex,
            payload: &[u8],
            timestamp_us: i64,
            end_of_stream: bool,
        ) -> Result<()>;
        async fn dequeue_output_slot(&mut self, timeout: Duration) -> Result<OutputPoll>;
        fn refresh_output_slots(&mut self) -> Result<()>;
        fn output_format(&self) -> Result<StreamFormat>;
        fn release_output_slot(&mut self, slot: SlotIndex) -> Result<()>;
        fn stop(&mut self);
        fn release(&mut self);
    }
}

fn aac_format() -> StreamFormat {
    StreamFormat::new(MimeType::Aac, 44100, ChannelLayout::Stereo)
}

#[test]
fn create_configures_then_starts() {
    let mut factory = DecoderFactory::new();
    factory.register(MimeType::Aac, |format| {
        let expected = format.clone();
        let mut decoder = MockDecoder::new();
        let mut seq = Sequence::new();

        decoder
            .expect_configure()
            .withf(move |f| *f == expected)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        decoder
            .expect_start()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));

        Ok(Box::new(decoder))
    });

    // Expectations are verified when the mock drops.
    let _decoder = factory.create(&aac_format()).unwrap();
}

#[test]
fn unsupported_mime_type_is_rejected() {
    let factory = DecoderFactory::new();

    let err = factory.create(&aac_format()).unwrap_err();
    assert!(matches!(err, PumpError::UnsupportedCodec(_)));
    assert_eq!(err.to_string(), "Unsupported codec: audio/mp4a-latm");
}

#[test]
fn registration_is_per_mime_type() {
    let mut factory = DecoderFactory::new();
    factory.register(MimeType::Mp3, |_| {
        let mut decoder = MockDecoder::new();
        decoder.expect_configure().returning(|_| Ok(()));
        decoder.expect_start().returning(|| Ok(()));
        Ok(Box::new(decoder))
    });

    assert!(factory.supports(&MimeType::Mp3));
    assert!(!factory.supports(&MimeType::Aac));
    assert_eq!(factory.supported_types(), vec![MimeType::Mp3]);

    assert!(factory.create(&aac_format()).is_err());
    let mp3 = StreamFormat::new(MimeType::Mp3, 44100, ChannelLayout::Stereo);
    assert!(factory.create(&mp3).is_ok());
}

#[test]
fn builder_failure_propagates() {
    let mut factory = DecoderFactory::new();
    factory.register(MimeType::Aac, |_| {
        Err(PumpError::DecoderFailure("no hardware codec available".into()))
    });

    let err = factory.create(&aac_format()).unwrap_err();
    assert!(matches!(err, PumpError::DecoderFailure(_)));
}

#[test]
fn configuration_rejection_propagates() {
    let mut factory = DecoderFactory::new();
    factory.register(MimeType::Aac, |_| {
        let mut decoder = MockDecoder::new();
        decoder
            .expect_configure()
            .returning(|_| Err(PumpError::ConfigRejected("sample rate".into())));
        Ok(Box::new(decoder))
    });

    let err = factory.create(&aac_format()).unwrap_err();
    assert!(matches!(err, PumpError::ConfigRejected(_)));
    assert!(err.is_decoder_error());
}
