pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod pricelist;
pub mod pricing;
pub mod retry;
pub mod steps;
pub mod wildberries;

// Re-export commonly used items
pub use catalog::CatalogMapping;
pub use config::{load_dotenv, load_env_file, Config, Env};
pub use error::{Result, SyncError};
pub use mailbox::{AttachmentQuery, FoundAttachment, Mailbox};
pub use steps::{
    ClearSummary, FailurePolicy, FetchSummary, PipelineReport, StepStatus, UpdateSummary,
};
pub use wildberries::{MarketplaceApi, WildberriesClient};

/// Initializes `env_logger`. Set RUST_LOG to control the level,
/// e.g. RUST_LOG=debug or RUST_LOG=wb_price_sync=trace.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
