//! Recognition channel: the bridge to the external streaming STT service.
//!
//! One channel is one recognition pass: audio frames in through the sink,
//! zero or more partial transcripts and exactly one terminal event out of
//! the stream. The production backend speaks JSON over NATS.

pub mod channel;
pub mod messages;
pub mod nats;

pub use channel::{
    RecognitionChannel, RecognitionError, RecognitionRequest, RecognitionSink,
    RecognizerBackend, TranscriptEvent, TranscriptStream,
};
pub use messages::{AudioFrameMessage, RecognitionErrorMessage, TranscriptMessage};
pub use nats::NatsRecognizer;
