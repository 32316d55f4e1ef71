use serde::{Deserialize, Serialize};

/// Audio frame message published to the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u32,
    pub pcm: String, // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    /// BCP 47 tag for the recognition locale (e.g. "ja-JP")
    pub locale: String,
    pub timestamp: String, // RFC3339 timestamp
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Transcript message received from the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    pub confidence: Option<f32>,
}

/// Error message received from the STT service
///
/// `code` is the service's stable error identifier; anything unrecognized
/// maps to a generic service error.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecognitionErrorMessage {
    pub session_id: String,
    pub code: String,
    pub message: String,
    pub timestamp: String,
}
