//! The pipeline steps and the orchestration around them.

pub mod check;
pub mod clear;
pub mod fetch;
pub mod pipeline;
pub mod submit;
pub mod update;

pub use check::{run_checks, CheckReport, CheckStatus, ConnectivityProbe, LiveProbe};
pub use clear::{clear_stocks, ClearSummary};
pub use fetch::{download_attachment, open_mailbox, process_attachment, FetchSummary};
pub use pipeline::{run_pipeline, FailurePolicy, PipelineReport, PipelineStep, StepStatus};
pub use submit::{BatchTally, SubmitOptions};
pub use update::{update_prices_and_stocks, UpdateOptions, UpdatePlan, UpdateSummary};
