//! Voice input capability.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Transcript(String),
    Error(String),
    Ended,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpeechInputError {
    #[error("Speech recognition is not supported in this environment.")]
    Unsupported,

    #[error("already listening")]
    AlreadyListening,
}

/// A source of recognized speech.
///
/// Events are only delivered between `start` and `stop`.
#[async_trait]
pub trait SpeechInputProvider: Send {
    async fn start(&mut self) -> Result<(), SpeechInputError>;

    async fn stop(&mut self);

    /// Next event, `None` once the provider is stopped or exhausted.
    async fn next_event(&mut self) -> Option<SpeechEvent>;
}

/// A provider fed through an mpsc channel by an external recognizer.
pub struct ChannelSpeechInput {
    receiver: Option<mpsc::Receiver<SpeechEvent>>,
    listening: bool,
}

impl ChannelSpeechInput {
    pub fn new(capacity: usize) -> (mpsc::Sender<SpeechEvent>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (
            sender,
            ChannelSpeechInput {
                receiver: Some(receiver),
                listening: false,
            },
        )
    }

    /// A provider with no recognizer behind it.
    pub fn unsupported() -> Self {
        ChannelSpeechInput {
            receiver: None,
            listening: false,
        }
    }
}

#[async_trait]
impl SpeechInputProvider for ChannelSpeechInput {
    async fn start(&mut self) -> Result<(), SpeechInputError> {
        if self.receiver.is_none() {
            return Err(SpeechInputError::Unsupported);
        }
        if self.listening {
            return Err(SpeechInputError::AlreadyListening);
        }
        self.listening = true;
        Ok(())
    }

    async fn stop(&mut self) {
        self.listening = false;
    }

    async fn next_event(&mut self) -> Option<SpeechEvent> {
        if !self.listening {
            return None;
        }
        let event = self.receiver.as_mut()?.recv().await;
        if matches!(event, None | Some(SpeechEvent::Ended)) {
            self.listening = false;
        }
        event
    }
}
