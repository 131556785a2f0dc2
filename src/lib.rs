pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{elastic::ElasticSink, logpull::LogpullClient, storage::LocalArtifactStore};
pub use config::{cli::CliArgs, toml_config::FileConfig, PusherConfig};
pub use core::{
    clock::WindowClock,
    coordinator::RunCoordinator,
    run_state::RunState,
    worker::{WindowOutcome, WindowWorker, WorkerSettings},
};
pub use utils::error::{PusherError, Result};
