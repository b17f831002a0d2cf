pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::pipelines::enrichment_pipeline::EnrichmentPipeline;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::{classifier::Classifier, enricher::Enricher, etl::EtlEngine, merge::merge};
pub use domain::institution::{InstitutionCategory, InstitutionRecord, ManualMetadata};
pub use domain::model::{
    DerivedMetadata, EnrichedMetadata, EnrichmentStatus, Proficiency, Record, RecordOutcome,
    ToolTag,
};
pub use domain::rules::{Contribution, PatternRule, RuleGroup, RuleSet};
pub use utils::error::{EtlError, Result};
