pub mod conversation;
pub mod envelope;
pub mod equipment;
pub mod error;
pub mod flows;
pub mod model;
pub mod orchestrator;
pub mod prompts;
pub mod router;
pub mod schemas;
pub mod services;
pub mod session;
pub mod speech_input;
pub mod traits;
pub mod wav;
