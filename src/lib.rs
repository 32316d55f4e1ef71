pub mod audio;
pub mod authorization;
pub mod config;
pub mod entry;
pub mod http;
pub mod location;
pub mod recognizer;
pub mod session;

pub use audio::{
    AudioBackend, AudioBackendFactory, AudioCaptureError, AudioFrame, MicrophoneBackend,
    MicrophoneFactory,
};
pub use authorization::{AuthorizationGate, AuthorizationStatus, ConfigAuthorizationGate};
pub use config::Config;
pub use entry::{Entry, EntryStore, JsonEntryStore, NewEntry, StorageError};
pub use http::{create_router, AppState};
pub use location::{Accuracy, Coordinate, HttpLocationProvider, LocationError, LocationProvider};
pub use recognizer::{
    NatsRecognizer, RecognitionChannel, RecognitionError, RecognitionRequest, RecognitionSink,
    RecognizerBackend, TranscriptEvent, TranscriptStream,
};
pub use session::{
    merge_transcript, CaptureError, CaptureService, SessionConfig, SessionState, SessionUpdate,
};
