//! Multi-language text-to-speech.

use crate::config::AppConfig;
use crate::core::error::FlowError;
use crate::core::model::{GenerateRequest, Modality};
use crate::core::schemas::{TextToSpeechInput, TextToSpeechOutput};
use crate::core::traits::GenerativeModel;
use crate::core::wav::{self, WavSpec};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use std::ops::RangeInclusive;

pub const FLOW: &str = "multiLanguageTextToSpeechFlow";
pub const DEFAULT_VOICE: &str = "Puck";
pub const AUDIO_DATA_URI_PREFIX: &str = "data:audio/wav;base64,";

const VOICES: &[(&str, &str)] = &[
    ("en", "Puck"),
    ("es", "Chitra"),
    ("fr", "Chitra"),
    ("de", "Puck"),
    ("it", "Chitra"),
    ("pt", "Puck"),
    ("ru", "Chitra"),
    ("ja", "Himari"),
    ("ko", "Chitra"),
    ("zh", "Himari"),
    ("ar", "Salim"),
    ("hi", "Chitra"),
];

/// Picks the prebuilt voice for the primary subtag of `language_code`.
pub fn voice_for_language(language_code: Option<&str>) -> &'static str {
    let Some(code) = language_code else {
        return DEFAULT_VOICE;
    };
    let primary = code.split('-').next().unwrap_or_default();

    VOICES
        .iter()
        .find(|(language, _)| *language == primary)
        .map(|(_, voice)| *voice)
        .unwrap_or(DEFAULT_VOICE)
}

const SAMPLE_RATES: RangeInclusive<u32> = 1..=192_000;

/// Sample rate announced by a PCM mime type such as `audio/L16;codec=pcm;rate=24000`.
///
/// Rates outside 1..=192000 Hz are ignored.
fn sample_rate_of(mime_type: &str) -> Option<u32> {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
        .filter(|rate| SAMPLE_RATES.contains(rate))
}

pub async fn text_to_speech(
    model: &dyn GenerativeModel,
    config: &AppConfig,
    input: &TextToSpeechInput,
) -> Result<TextToSpeechOutput, FlowError> {
    let voice = voice_for_language(input.language_code.as_deref());
    debug!("synthesizing {} chars with voice {voice}", input.text.len());

    let request = GenerateRequest::new(&config.tts_model, &input.text)
        .with_modalities(&[Modality::Audio])
        .with_voice(voice);

    let response = model.generate(request).await?;
    let (mime_type, pcm) = response
        .media("audio/")
        .ok_or(FlowError::NoMediaReturned)?;

    let spec = WavSpec {
        sample_rate: sample_rate_of(mime_type).unwrap_or(WavSpec::default().sample_rate),
        ..WavSpec::default()
    };
    let container = wav::encode(pcm, spec).map_err(|e| FlowError::upstream(e.to_string()))?;

    Ok(TextToSpeechOutput {
        audio: format!("{AUDIO_DATA_URI_PREFIX}{}", STANDARD.encode(container)),
    })
}
