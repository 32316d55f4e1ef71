// NATS transport to the streaming STT service.
//
// Frames are published as JSON on `audio.frame.<session>`; the service
// publishes transcripts on `stt.text.>` and failures on `stt.error.>`.
// Subscriptions are wide and filtered by session id in the payload.

use async_nats::Subscriber;
use base64::Engine;
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::channel::{
    RecognitionChannel, RecognitionError, RecognitionRequest, RecognitionSink,
    RecognizerBackend, TranscriptEvent, TranscriptStream,
};
use super::messages::{AudioFrameMessage, RecognitionErrorMessage, TranscriptMessage};
use crate::audio::AudioFrame;

const TEXT_SUBJECT: &str = "stt.text.>";
const ERROR_SUBJECT: &str = "stt.error.>";

/// Recognition backend that talks to the STT worker over NATS.
pub struct NatsRecognizer {
    url: String,
}

impl NatsRecognizer {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait::async_trait]
impl RecognizerBackend for NatsRecognizer {
    async fn open(
        &self,
        request: RecognitionRequest,
    ) -> Result<RecognitionChannel, RecognitionError> {
        info!("connecting to recognition service at {}", self.url);

        let client = async_nats::connect(&self.url)
            .await
            .map_err(|e| RecognitionError::RecognizerUnavailable(e.to_string()))?;

        let text_sub = client
            .subscribe(TEXT_SUBJECT)
            .await
            .map_err(|e| RecognitionError::RecognizerUnavailable(e.to_string()))?;
        let error_sub = client
            .subscribe(ERROR_SUBJECT)
            .await
            .map_err(|e| RecognitionError::RecognizerUnavailable(e.to_string()))?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let listener = tokio::spawn(listen(
            text_sub,
            error_sub,
            request.session_id.clone(),
            event_tx,
        ));

        info!("recognition channel open (session: {})", request.session_id);

        Ok(RecognitionChannel {
            sink: Box::new(NatsSink {
                client,
                session_id: request.session_id,
                locale: request.locale,
                sequence: 0,
                last_sample_rate: 16000,
                last_channels: 1,
            }),
            events: TranscriptStream::new(event_rx, Some(listener)),
        })
    }

    fn name(&self) -> &str {
        "nats-recognizer"
    }
}

/// Translates service messages into transcript events. Stops after the
/// first terminal event for this session.
async fn listen(
    mut text_sub: Subscriber,
    mut error_sub: Subscriber,
    session_id: String,
    event_tx: mpsc::UnboundedSender<TranscriptEvent>,
) {
    loop {
        let event = tokio::select! {
            msg = text_sub.next() => match msg {
                Some(msg) => match serde_json::from_slice::<TranscriptMessage>(&msg.payload) {
                    Ok(transcript) if transcript.session_id == session_id => {
                        if transcript.partial {
                            Some(TranscriptEvent::Partial(transcript.text))
                        } else {
                            Some(TranscriptEvent::Final(transcript.text))
                        }
                    }
                    Ok(_) => None, // another session's transcript
                    Err(e) => {
                        warn!("failed to parse transcript message: {}", e);
                        None
                    }
                },
                None => Some(TranscriptEvent::Failed(RecognitionError::ServiceError(
                    "transcript stream closed by service".to_string(),
                ))),
            },
            msg = error_sub.next() => match msg {
                Some(msg) => match serde_json::from_slice::<RecognitionErrorMessage>(&msg.payload) {
                    Ok(error) if error.session_id == session_id => {
                        Some(TranscriptEvent::Failed(map_service_error(&error)))
                    }
                    Ok(_) => None,
                    Err(e) => {
                        warn!("failed to parse error message: {}", e);
                        None
                    }
                },
                None => Some(TranscriptEvent::Failed(RecognitionError::ServiceError(
                    "error stream closed by service".to_string(),
                ))),
            },
        };

        if let Some(event) = event {
            let terminal = event.is_terminal();
            if event_tx.send(event).is_err() {
                break; // consumer gone
            }
            if terminal {
                break;
            }
        }
    }
}

fn map_service_error(msg: &RecognitionErrorMessage) -> RecognitionError {
    match msg.code.as_str() {
        "authorization_lost" => RecognitionError::AuthorizationLost(msg.message.clone()),
        "recognizer_unavailable" => {
            RecognitionError::RecognizerUnavailable(msg.message.clone())
        }
        _ => RecognitionError::ServiceError(format!("{}: {}", msg.code, msg.message)),
    }
}

struct NatsSink {
    client: async_nats::Client,
    session_id: String,
    locale: String,
    sequence: u32,
    last_sample_rate: u32,
    last_channels: u16,
}

impl NatsSink {
    async fn publish(
        &mut self,
        pcm_bytes: &[u8],
        sample_rate: u32,
        channels: u16,
        final_frame: bool,
    ) -> anyhow::Result<()> {
        let subject = format!("audio.frame.{}", self.session_id);

        let message = AudioFrameMessage {
            session_id: self.session_id.clone(),
            sequence: self.sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(pcm_bytes),
            sample_rate,
            channels,
            locale: self.locale.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame,
        };
        self.sequence += 1;

        let payload = serde_json::to_vec(&message)?;
        self.client.publish(subject, payload.into()).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecognitionSink for NatsSink {
    async fn feed(&mut self, frame: &AudioFrame) {
        let pcm_bytes: Vec<u8> = frame
            .samples
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();

        self.last_sample_rate = frame.sample_rate;
        self.last_channels = frame.channels;

        if let Err(e) = self
            .publish(&pcm_bytes, frame.sample_rate, frame.channels, false)
            .await
        {
            // Keep feeding; a dead service shows up as a Failed event or
            // a closed stream on the event side.
            warn!("failed to publish audio frame: {}", e);
        }
    }

    async fn finish(&mut self) {
        let sample_rate = self.last_sample_rate;
        let channels = self.last_channels;
        if let Err(e) = self.publish(&[], sample_rate, channels, true).await {
            warn!("failed to publish end-of-audio marker: {}", e);
        }
    }
}
