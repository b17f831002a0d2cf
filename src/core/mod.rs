pub mod classifier;
pub mod enricher;
pub mod etl;
pub mod merge;

pub use crate::domain::model::{Record, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
