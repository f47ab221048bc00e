//! Runtime configuration, read from `.env` and the process environment.

use di::{inject, injectable};
use log::warn;
use std::env;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

static TEST_CONFIG: Mutex<Option<AppConfig>> = Mutex::new(None);

/// Whether visual explanations include a generated diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplanationMode {
    TextOnly,
    TextAndDiagram,
}

impl FromStr for ExplanationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text-only" | "text" => Ok(ExplanationMode::TextOnly),
            "text-and-diagram" | "text+diagram" | "diagram" => Ok(ExplanationMode::TextAndDiagram),
            other => Err(format!("unknown explanation mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub base_url: String,
    pub text_model: String,
    pub tts_model: String,
    pub image_model: String,
    pub explanation_mode: ExplanationMode,
    /// Synthesize speech for every assistant reply.
    pub speak_responses: bool,
    pub find_bag_delay: Duration,
    /// Time an emergency drone spends dispatching before it is en route.
    pub emergency_en_route_delay: Duration,
    pub request_timeout: Duration,
    pub database_url: String,
    pub bind_address: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            text_model: DEFAULT_TEXT_MODEL.to_owned(),
            tts_model: DEFAULT_TTS_MODEL.to_owned(),
            image_model: DEFAULT_IMAGE_MODEL.to_owned(),
            explanation_mode: ExplanationMode::TextOnly,
            speak_responses: true,
            find_bag_delay: Duration::from_millis(1500),
            emergency_en_route_delay: Duration::from_millis(3000),
            request_timeout: Duration::from_secs(120),
            database_url: "sqlite://greenbox.db?mode=rwc".to_owned(),
            bind_address: "0.0.0.0:3000".to_owned(),
        }
    }
}

#[injectable]
impl AppConfig {
    #[inject]
    pub fn create() -> AppConfig {
        if let Some(config) = TEST_CONFIG.lock().ok().and_then(|guard| guard.clone()) {
            return config;
        }

        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup, falling back to
    /// defaults for missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppConfig {
        let defaults = AppConfig::default();

        let api_key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("GOOGLE_API_KEY"))
            .unwrap_or_default();
        if api_key.is_empty() {
            warn!("GEMINI_API_KEY is not set, upstream calls will be rejected");
        }

        AppConfig {
            api_key,
            base_url: lookup("GENAI_BASE_URL").unwrap_or(defaults.base_url),
            text_model: lookup("TEXT_MODEL").unwrap_or(defaults.text_model),
            tts_model: lookup("TTS_MODEL").unwrap_or(defaults.tts_model),
            image_model: lookup("IMAGE_MODEL").unwrap_or(defaults.image_model),
            explanation_mode: parsed(&lookup, "EXPLANATION_MODE", defaults.explanation_mode),
            speak_responses: parsed(&lookup, "SPEAK_RESPONSES", defaults.speak_responses),
            find_bag_delay: lookup("FIND_BAG_DELAY_MS")
                .and_then(|s| u64::from_str(&s).ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.find_bag_delay),
            emergency_en_route_delay: lookup("EMERGENCY_EN_ROUTE_DELAY_MS")
                .and_then(|s| u64::from_str(&s).ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.emergency_en_route_delay),
            request_timeout: lookup("REQUEST_TIMEOUT_SECS")
                .and_then(|s| u64::from_str(&s).ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_address: lookup("BIND_ADDRESS").unwrap_or(defaults.bind_address),
        }
    }

    /// Makes every DI-created `AppConfig` a copy of `config`.
    pub fn set_test_config(config: AppConfig) {
        if let Ok(mut guard) = TEST_CONFIG.lock() {
            *guard = Some(config);
        }
    }

    pub fn clear_test_config() {
        if let Ok(mut guard) = TEST_CONFIG.lock() {
            *guard = None;
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("ignoring invalid value `{raw}` for {key}");
            default
        }),
        None => default,
    }
}
