pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::TomlConfig;

#[cfg(feature = "postgres")]
pub use adapters::PostgresSink;
pub use adapters::LocalStorage;

pub use crate::core::{
    context::RunContext,
    etl::{EtlEngine, RunReport},
    pipeline::UserPipeline,
    transformer::{serialize, transform, transform_payload},
};
pub use domain::model::{FlatUserRow, RawUserRecord};
pub use utils::error::{EtlError, Result};
