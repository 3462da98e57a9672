use gainers_auth::{FetchOutcome, FlowState};

pub enum AppAsyncEvent {
    LoginFinished {
        state: FlowState,
        error: Option<String>,
        fetch: Option<FetchOutcome>,
    },
    FetchFinished {
        outcome: Option<FetchOutcome>,
    },
}
