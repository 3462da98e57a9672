pub mod browser;
pub mod config;
pub mod error;
pub mod exchange;
pub mod fetch;
pub mod http;
pub mod listener;
pub mod orchestrator;
pub mod provider;
pub mod session;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult, TransportError};
pub use fetch::{FetchOutcome, FetchWorker, ScreenerConfig};
pub use orchestrator::{AuthOrchestrator, FlowHandle, FlowReport, FlowState};
pub use provider::Provider;
pub use session::{AccessToken, Quote, SessionSnapshot, SharedSessionState};
