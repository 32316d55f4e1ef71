// Microphone capture backend built on cpal.
//
// cpal streams are not Send, so the stream lives on a dedicated capture
// thread for its whole lifetime. The data callback converts samples to
// i16 PCM and pushes frames into an unbounded channel; an atomic stop
// flag ends the thread, which drops the stream and halts the hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use super::backend::{AudioBackend, AudioBackendFactory, AudioCaptureError, AudioFrame};

/// Captures from the host's default input device in its native format.
pub struct MicrophoneBackend {
    stop_flag: Arc<AtomicBool>,
    capturing: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new() -> Self {
        Self {
            stop_flag: Arc::new(AtomicBool::new(false)),
            capturing: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

impl Default for MicrophoneBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(
        &mut self,
    ) -> Result<mpsc::UnboundedReceiver<AudioFrame>, AudioCaptureError> {
        if self.is_capturing() {
            return Err(AudioCaptureError::EngineStartFailed(
                "capture already running".to_string(),
            ));
        }

        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        self.stop_flag.store(false, Ordering::SeqCst);
        let stop_flag = Arc::clone(&self.stop_flag);
        let capturing = Arc::clone(&self.capturing);

        let handle = thread::Builder::new()
            .name("quickmemo-capture".to_string())
            .spawn(move || capture_thread(frame_tx, ready_tx, stop_flag, capturing))
            .map_err(|e| AudioCaptureError::EngineStartFailed(e.to_string()))?;
        self.thread = Some(handle);

        match ready_rx.await {
            Ok(Ok(())) => Ok(frame_rx),
            Ok(Err(e)) => {
                self.join_thread().await;
                Err(e)
            }
            Err(_) => {
                self.join_thread().await;
                Err(AudioCaptureError::EngineStartFailed(
                    "capture thread exited during startup".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), AudioCaptureError> {
        self.stop_flag.store(true, Ordering::SeqCst);
        self.join_thread().await;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

impl MicrophoneBackend {
    async fn join_thread(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        // The capture thread watches this flag and exits on its own.
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

fn capture_thread(
    frame_tx: mpsc::UnboundedSender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<(), AudioCaptureError>>,
    stop_flag: Arc<AtomicBool>,
    capturing: Arc<AtomicBool>,
) {
    let stream = match open_input_stream(frame_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(AudioCaptureError::EngineStartFailed(e.to_string())));
        return;
    }

    capturing.store(true, Ordering::SeqCst);
    let _ = ready_tx.send(Ok(()));

    while !stop_flag.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(20));
    }

    // Dropping the stream halts hardware capture.
    drop(stream);
    capturing.store(false, Ordering::SeqCst);
    info!("microphone capture stopped");
}

fn open_input_stream(
    frame_tx: mpsc::UnboundedSender<AudioFrame>,
) -> Result<cpal::Stream, AudioCaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AudioCaptureError::DeviceUnavailable)?;

    // Read the device's current native format rather than assuming one.
    let supported = device
        .default_input_config()
        .map_err(|e| AudioCaptureError::EngineStartFailed(e.to_string()))?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let sample_format = supported.sample_format();

    let config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    info!(
        "opening input stream: {}Hz, {} channels, {:?}",
        sample_rate, channels, sample_format
    );

    let stream = match sample_format {
        cpal::SampleFormat::F32 => {
            let mut frames_seen: u64 = 0;
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let samples: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect();
                    let timestamp_ms = frames_seen * 1000 / sample_rate as u64;
                    frames_seen += (data.len() / channels as usize) as u64;
                    let _ = frame_tx.send(AudioFrame {
                        samples,
                        sample_rate,
                        channels,
                        timestamp_ms,
                    });
                },
                log_stream_error,
                None,
            )
        }
        cpal::SampleFormat::I16 => {
            let mut frames_seen: u64 = 0;
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let timestamp_ms = frames_seen * 1000 / sample_rate as u64;
                    frames_seen += (data.len() / channels as usize) as u64;
                    let _ = frame_tx.send(AudioFrame {
                        samples: data.to_vec(),
                        sample_rate,
                        channels,
                        timestamp_ms,
                    });
                },
                log_stream_error,
                None,
            )
        }
        format => {
            return Err(AudioCaptureError::EngineStartFailed(format!(
                "unsupported sample format: {:?}",
                format
            )));
        }
    }
    .map_err(|e| AudioCaptureError::EngineStartFailed(e.to_string()))?;

    Ok(stream)
}

fn log_stream_error(err: cpal::StreamError) {
    error!("audio stream error: {}", err);
}

/// Factory producing default-device microphone backends.
pub struct MicrophoneFactory;

impl AudioBackendFactory for MicrophoneFactory {
    fn create(&self) -> Result<Box<dyn AudioBackend>, AudioCaptureError> {
        Ok(Box::new(MicrophoneBackend::new()))
    }
}
