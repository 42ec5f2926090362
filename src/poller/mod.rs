pub mod batch;
pub mod cli_fallback;
pub mod orchestrator;

pub use batch::{poll_and_store, BatchEntry, BatchReport, BatchRunner};
pub use cli_fallback::{CliFallback, CliRunner, SnmpwalkRunner};
pub use orchestrator::{
    community_candidates, Attempt, AttemptOutcome, AttemptPath, PollReport, PollStage, Poller,
};
