pub mod context;
pub mod etl;
pub mod pipeline;
pub mod probe;
pub mod transformer;

pub use crate::domain::model::{FlatUserRow, RawUserRecord, StagedArtifact};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage, UserSink};
pub use crate::utils::error::Result;
