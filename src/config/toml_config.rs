use crate::config::SUPPORTED_OUTPUT_FORMATS;
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_one_of, validate_path,
    validate_positive_number, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    pub extract: Option<ExtractConfig>,
    pub classifier: Option<ClassifierConfig>,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub input_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub max_records: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// 外部規則表；未設定時使用內建規則
    pub rules_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
    pub filenames: Option<FilenameConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilenameConfig {
    pub json: Option<String>,
    pub csv: Option<String>,
    pub tsv: Option<String>,
    pub report: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，找不到的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        validate_path("source.input_path", &self.source.input_path)?;
        validate_file_extensions(
            "source.input_path",
            std::slice::from_ref(&self.source.input_path),
            &["json"],
        )?;

        validate_path("load.output_path", &self.load.output_path)?;

        if let Some(max) = self.max_records() {
            validate_positive_number("extract.max_records", max, 1)?;
        }

        if let Some(rules_file) = self.rules_file() {
            validate_file_extensions(
                "classifier.rules_file",
                std::slice::from_ref(&rules_file.to_string()),
                &["toml"],
            )?;
        }

        if self.load.output_formats.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "load.output_formats".to_string(),
            });
        }
        validate_one_of(
            "load.output_formats",
            &self.load.output_formats,
            SUPPORTED_OUTPUT_FORMATS,
        )?;

        if let Some(compression) = &self.load.compression {
            if compression.enabled {
                validate_file_extensions(
                    "load.compression.filename",
                    std::slice::from_ref(&compression.filename),
                    &["zip"],
                )?;
            }
        }

        Ok(())
    }

    pub fn max_records(&self) -> Option<usize> {
        self.extract.as_ref().and_then(|e| e.max_records)
    }

    pub fn rules_file(&self) -> Option<&str> {
        self.classifier
            .as_ref()
            .and_then(|c| c.rules_file.as_deref())
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    /// `[monitoring] log_level = "debug"` 等同 `--verbose`
    pub fn debug_logging(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_level.as_deref())
            .is_some_and(|level| level.eq_ignore_ascii_case("debug"))
    }
}

impl ConfigProvider for TomlConfig {
    fn pipeline_name(&self) -> &str {
        &self.pipeline.name
    }

    fn input_path(&self) -> &str {
        &self.source.input_path
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn rules_path(&self) -> Option<&str> {
        self.rules_file()
    }

    fn max_records(&self) -> Option<usize> {
        TomlConfig::max_records(self)
    }

    fn output_filename(&self, format: &str) -> String {
        let custom = self.load.filenames.as_ref().and_then(|names| match format {
            "json" => names.json.clone(),
            "csv" => names.csv.clone(),
            "tsv" => names.tsv.clone(),
            "report" => names.report.clone(),
            _ => None,
        });

        custom.unwrap_or_else(|| match format {
            "csv" => "summary.csv".to_string(),
            "tsv" => "summary.tsv".to_string(),
            "report" => "run_report.json".to_string(),
            _ => "enriched.json".to_string(),
        })
    }

    fn bundle_filename(&self) -> Option<&str> {
        self.load
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| c.filename.as_str())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
