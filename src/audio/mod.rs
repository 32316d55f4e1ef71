pub mod backend;
pub mod microphone;

pub use backend::{AudioBackend, AudioBackendFactory, AudioCaptureError, AudioFrame};
pub use microphone::{MicrophoneBackend, MicrophoneFactory};
