pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{
    validate_file_extensions, validate_one_of, validate_path, validate_positive_number, Validate,
};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

pub const SUPPORTED_OUTPUT_FORMATS: &[&str] = &["json", "csv", "tsv"];

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "skillmap-etl")]
#[command(about = "Infer capability metadata for institution records")]
pub struct CliConfig {
    /// JSON file with institution records
    #[arg(long, default_value = "./data/institutions.json")]
    pub input: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// TOML rule table replacing the built-in rules
    #[arg(long)]
    pub rules: Option<String>,

    #[arg(long, value_delimiter = ',', default_values_t = vec!["json".to_string(), "csv".to_string()])]
    pub formats: Vec<String>,

    #[arg(long)]
    pub max_records: Option<usize>,

    /// Also bundle all outputs into this ZIP file
    #[arg(long)]
    pub bundle: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn pipeline_name(&self) -> &str {
        "skillmap-cli"
    }

    fn input_path(&self) -> &str {
        &self.input
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.formats
    }

    fn rules_path(&self) -> Option<&str> {
        self.rules.as_deref()
    }

    fn max_records(&self) -> Option<usize> {
        self.max_records
    }

    fn bundle_filename(&self) -> Option<&str> {
        self.bundle.as_deref()
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("input", &self.input)?;
        validate_file_extensions("input", std::slice::from_ref(&self.input), &["json"])?;
        validate_path("output_path", &self.output_path)?;
        validate_one_of("formats", &self.formats, SUPPORTED_OUTPUT_FORMATS)?;

        if let Some(rules) = &self.rules {
            validate_file_extensions("rules", std::slice::from_ref(rules), &["toml"])?;
        }
        if let Some(max) = self.max_records {
            validate_positive_number("max_records", max, 1)?;
        }
        if let Some(bundle) = &self.bundle {
            validate_file_extensions("bundle", std::slice::from_ref(bundle), &["zip"])?;
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let config = CliConfig::parse_from(["skillmap-etl"]);
        assert_eq!(config.input, "./data/institutions.json");
        assert_eq!(config.formats, vec!["json".to_string(), "csv".to_string()]);
        assert!(config.rules_path().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_formats_and_validation() {
        let config = CliConfig::parse_from([
            "skillmap-etl",
            "--input",
            "colleges.json",
            "--formats",
            "json,tsv",
            "--rules",
            "rules.toml",
        ]);
        assert_eq!(config.formats, vec!["json".to_string(), "tsv".to_string()]);
        assert_eq!(config.rules_path(), Some("rules.toml"));
        assert!(config.validate().is_ok());

        let config = CliConfig::parse_from(["skillmap-etl", "--formats", "xml"]);
        assert!(config.validate().is_err());

        let config = CliConfig::parse_from(["skillmap-etl", "--input", "colleges.csv"]);
        assert!(config.validate().is_err());

        let config = CliConfig::parse_from(["skillmap-etl", "--max-records", "0"]);
        assert!(config.validate().is_err());
    }
}
