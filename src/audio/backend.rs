use thiserror::Error;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Frame duration derived from sample count and format.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }
}

/// Errors from the capture pipeline
#[derive(Debug, Clone, Error)]
pub enum AudioCaptureError {
    /// No usable input device on this host
    #[error("no audio input device available")]
    DeviceUnavailable,

    /// The device exists but the capture engine could not start
    #[error("audio engine failed to start: {0}")]
    EngineStartFailed(String),
}

/// Audio capture backend trait
///
/// Implementations own the hardware stream. Frames are delivered through the
/// returned channel in capture order, exactly once, with no frames dropped by
/// this layer; the channel is unbounded and backpressure is the consumer's
/// concern.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames in the
    /// device's current native format (sample rate and channel count are
    /// read from the device, not assumed).
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<AudioFrame>, AudioCaptureError>;

    /// Stop capturing audio
    ///
    /// Idempotent: stopping an already-stopped backend is a no-op.
    async fn stop(&mut self) -> Result<(), AudioCaptureError>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Provides capture backends to the session layer.
///
/// The session acquires a fresh backend per recording attempt; tests inject
/// scripted implementations through this seam.
pub trait AudioBackendFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn AudioBackend>, AudioCaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_duration_from_format() {
        let frame = AudioFrame {
            samples: vec![0i16; 1600],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: 0,
        };
        assert_eq!(frame.duration_ms(), 100);
    }

    #[test]
    fn frame_duration_counts_interleaved_channels_once() {
        let frame = AudioFrame {
            samples: vec![0i16; 3200], // 1600 frames of stereo
            sample_rate: 16000,
            channels: 2,
            timestamp_ms: 0,
        };
        assert_eq!(frame.duration_ms(), 100);
    }

    #[test]
    fn frame_duration_zero_rate() {
        let frame = AudioFrame {
            samples: vec![0i16; 100],
            sample_rate: 0,
            channels: 1,
            timestamp_ms: 0,
        };
        assert_eq!(frame.duration_ms(), 0);
    }
}
