use crate::core::enricher::Enricher;
use crate::core::{ConfigProvider, Pipeline, Record, Storage, TransformResult};
use crate::domain::model::{BatchSummary, RecordOutcome};
use crate::domain::rules::RuleSet;
use crate::utils::error::{EtlError, Result};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

/// 機構能力補全 Pipeline：讀取 JSON 記錄、逐筆分類合併、輸出結果
pub struct EnrichmentPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) enricher: Enricher,
}

impl<S: Storage, C: ConfigProvider> EnrichmentPipeline<S, C> {
    /// 使用內建規則表
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            enricher: Enricher::default(),
        }
    }

    /// 有設定 `rules_path` 時改用外部規則表
    pub fn from_config(storage: S, config: C) -> Result<Self> {
        let rules = match config.rules_path() {
            Some(path) => RuleSet::from_file(path)?,
            None => RuleSet::builtin(),
        };
        Ok(Self::new(storage, config).with_rules(rules))
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.enricher = Enricher::new(rules);
        self
    }

    pub fn config(&self) -> &C {
        &self.config
    }
}

/// 接受頂層陣列，或帶有 `institutions` / `records` 陣列的物件
fn unwrap_batch(json: Value) -> Result<Vec<Value>> {
    match json {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => {
            for key in ["institutions", "records"] {
                if let Some(Value::Array(items)) = obj.remove(key) {
                    return Ok(items);
                }
            }
            Err(EtlError::ProcessingError {
                message: "input object has no 'institutions' or 'records' array".to_string(),
            })
        }
        _ => Err(EtlError::ProcessingError {
            message: "input must be a JSON array of institution records".to_string(),
        }),
    }
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    id: String,
    name: String,
    category: String,
    status: &'static str,
    top_domain: String,
    top_score: Option<u8>,
    tool_count: usize,
    specialization_count: usize,
}

impl From<&RecordOutcome> for SummaryRow {
    fn from(outcome: &RecordOutcome) -> Self {
        let top = outcome.metadata.top_domain();
        SummaryRow {
            id: outcome.identifier.clone(),
            name: outcome.record.get_str("name").unwrap_or_default().to_string(),
            category: outcome
                .record
                .get_str("category")
                .unwrap_or_default()
                .to_string(),
            status: if outcome.is_degraded() {
                "degraded"
            } else {
                "enriched"
            },
            top_domain: top.map(|(domain, _)| domain.to_string()).unwrap_or_default(),
            top_score: top.map(|(_, score)| score),
            tool_count: outcome.metadata.tools.len(),
            specialization_count: outcome.metadata.specializations.len(),
        }
    }
}

fn write_summary(rows: &[SummaryRow], delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| EtlError::ProcessingError {
        message: format!("failed to flush summary: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
        message: format!("summary is not valid UTF-8: {}", e),
    })
}

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    pipeline: &'a str,
    generated_at: String,
    input: &'a str,
    rule_groups: usize,
    rule_patterns: usize,
    summary: &'a BatchSummary,
    outputs: Vec<String>,
}

fn bundle_files(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, data) in files {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(data)?;
    }

    // 完成並取回底層 Vec<u8>
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for EnrichmentPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let input = self.config.input_path();
        tracing::debug!("Reading institution records from: {}", input);

        let bytes = self.storage.read_file(input).await?;
        let json: Value = serde_json::from_slice(&bytes)?;

        let mut records = Vec::new();
        for (index, item) in unwrap_batch(json)?.into_iter().enumerate() {
            match item {
                Value::Object(data) => records.push(Record::new(data).with_source_index(index)),
                other => {
                    tracing::warn!(
                        record = %format!("#{}", index),
                        "Skipping non-object entry in input: {}",
                        other
                    );
                }
            }
        }

        if let Some(max) = self.config.max_records() {
            if records.len() > max {
                tracing::info!("✂️ Limiting batch to first {} of {} records", max, records.len());
                records.truncate(max);
            }
        }

        Ok(records)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let outcomes = self.enricher.enrich_batch(&data);
        let summary = BatchSummary::from_outcomes(&outcomes);

        let rows: Vec<SummaryRow> = outcomes.iter().map(SummaryRow::from).collect();
        let csv_output = write_summary(&rows, b',')?;
        let tsv_output = write_summary(&rows, b'\t')?;

        let mut processed_records = Vec::with_capacity(outcomes.len());
        let mut intermediate_data = Vec::new();
        for outcome in outcomes {
            if outcome.is_degraded() {
                intermediate_data.push(outcome.record.clone());
            }
            processed_records.push(outcome.record);
        }

        if summary.degraded > 0 {
            tracing::warn!(
                "⚠️ {} of {} records degraded to manual metadata",
                summary.degraded,
                summary.total
            );
        }

        Ok(TransformResult {
            processed_records,
            csv_output,
            tsv_output,
            intermediate_data,
            summary,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();

        for format in self.config.output_formats() {
            let data = match format.as_str() {
                "json" => serde_json::to_vec_pretty(&result.processed_records)?,
                "csv" => result.csv_output.clone().into_bytes(),
                "tsv" => result.tsv_output.clone().into_bytes(),
                other => {
                    tracing::warn!("Skipping unsupported output format: {}", other);
                    continue;
                }
            };
            files.push((self.config.output_filename(format), data));
        }

        if !result.intermediate_data.is_empty() {
            files.push((
                "degraded.json".to_string(),
                serde_json::to_vec_pretty(&result.intermediate_data)?,
            ));
        }

        let rules = self.enricher.classifier().rules();
        let report = RunReport {
            pipeline: self.config.pipeline_name(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            input: self.config.input_path(),
            rule_groups: rules.groups.len(),
            rule_patterns: rules.pattern_count(),
            summary: &result.summary,
            outputs: files.iter().map(|(name, _)| name.clone()).collect(),
        };
        files.push((
            self.config.output_filename("report"),
            serde_json::to_vec_pretty(&report)?,
        ));

        for (name, data) in &files {
            tracing::debug!("Writing {} ({} bytes)", name, data.len());
            self.storage.write_file(name, data).await?;
        }

        let primary = match self.config.bundle_filename() {
            Some(bundle) => {
                let zip_data = bundle_files(&files)?;
                tracing::debug!("Writing ZIP bundle ({} bytes) to storage", zip_data.len());
                self.storage.write_file(bundle, &zip_data).await?;
                bundle.to_string()
            }
            None => files
                .first()
                .map(|(name, _)| name.clone())
                .unwrap_or_default(),
        };

        Ok(format!("{}/{}", self.config.output_path(), primary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn with_input(path: &str, data: &str) -> Self {
            let mut files = HashMap::new();
            files.insert(path.to_string(), data.as_bytes().to_vec());
            Self {
                files: Arc::new(Mutex::new(files)),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct TestConfig {
        formats: Vec<String>,
        max_records: Option<usize>,
        bundle: Option<String>,
    }

    impl TestConfig {
        fn new(formats: &[&str]) -> Self {
            Self {
                formats: formats.iter().map(|f| f.to_string()).collect(),
                max_records: None,
                bundle: None,
            }
        }
    }

    impl ConfigProvider for TestConfig {
        fn pipeline_name(&self) -> &str {
            "unit-test"
        }

        fn input_path(&self) -> &str {
            "input.json"
        }

        fn output_path(&self) -> &str {
            "./out"
        }

        fn output_formats(&self) -> &[String] {
            &self.formats
        }

        fn rules_path(&self) -> Option<&str> {
            None
        }

        fn max_records(&self) -> Option<usize> {
            self.max_records
        }

        fn bundle_filename(&self) -> Option<&str> {
            self.bundle.as_deref()
        }
    }

    const INPUT: &str = r#"{
        "institutions": [
            {"id": "u1", "name": "City Engineering College", "category": "university",
             "academicPrograms": [{"name": "B.E.", "specializations": ["CSE", "ECE"]}]},
            "not a record",
            {"id": "p1", "name": "Broken Polytechnic", "category": "polytechnic",
             "academicPrograms": {"oops": true}, "manualSpecializations": ["Tool Room"]},
            {"id": "t1", "name": "Skill Hub", "category": "training_center"}
        ]
    }"#;

    #[tokio::test]
    async fn test_extract_unwraps_and_skips_non_objects() {
        let storage = MockStorage::with_input("input.json", INPUT);
        let pipeline = EnrichmentPipeline::new(storage, TestConfig::new(&["json"]));

        let records = pipeline.extract().await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get_str("id"), Some("u1"));
    }

    #[tokio::test]
    async fn test_fallback_identifier_uses_input_position() {
        let input = r#"[
            "not a record",
            {"category": "iti"},
            {"category": "polytechnic", "academicPrograms": "Diploma"}
        ]"#;
        let storage = MockStorage::with_input("input.json", input);
        let pipeline = EnrichmentPipeline::new(storage, TestConfig::new(&["json"]));

        let records = pipeline.extract().await.unwrap();
        assert_eq!(records[0].source_index, Some(1));

        let result = pipeline.transform(records).await.unwrap();
        assert_eq!(result.summary.degraded_records[0].identifier, "#2");
        assert!(result.csv_output.contains("\n#1,,iti,enriched,"));
    }

    #[tokio::test]
    async fn test_extract_respects_max_records() {
        let storage = MockStorage::with_input("input.json", INPUT);
        let mut config = TestConfig::new(&["json"]);
        config.max_records = Some(1);
        let pipeline = EnrichmentPipeline::new(storage, config);

        let records = pipeline.extract().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_extract_rejects_scalar_input() {
        let storage = MockStorage::with_input("input.json", "42");
        let pipeline = EnrichmentPipeline::new(storage, TestConfig::new(&["json"]));
        assert!(matches!(
            pipeline.extract().await,
            Err(EtlError::ProcessingError { .. })
        ));
    }

    #[tokio::test]
    async fn test_transform_builds_summaries_and_degraded_list() {
        let storage = MockStorage::with_input("input.json", INPUT);
        let pipeline = EnrichmentPipeline::new(storage, TestConfig::new(&["json", "csv"]));

        let records = pipeline.extract().await.unwrap();
        let result = pipeline.transform(records).await.unwrap();

        assert_eq!(result.summary.total, 3);
        assert_eq!(result.summary.degraded, 1);
        assert_eq!(result.summary.degraded_records[0].identifier, "p1");
        assert_eq!(result.intermediate_data.len(), 1);

        let mut lines = result.csv_output.lines();
        assert_eq!(
            lines.next(),
            Some("id,name,category,status,top_domain,top_score,tool_count,specialization_count")
        );
        assert!(result.csv_output.contains("p1,Broken Polytechnic,polytechnic,degraded,,,0,1"));
        assert!(result.tsv_output.contains("u1\tCity Engineering College\tuniversity\tenriched"));
    }

    #[tokio::test]
    async fn test_load_writes_configured_outputs_and_bundle() {
        let storage = MockStorage::with_input("input.json", INPUT);
        let mut config = TestConfig::new(&["json", "tsv"]);
        config.bundle = Some("bundle.zip".to_string());
        let pipeline = EnrichmentPipeline::new(storage.clone(), config);

        let records = pipeline.extract().await.unwrap();
        let result = pipeline.transform(records).await.unwrap();
        let output = pipeline.load(result).await.unwrap();

        assert_eq!(output, "./out/bundle.zip");
        assert!(storage.get_file("enriched.json").await.is_some());
        assert!(storage.get_file("summary.tsv").await.is_some());
        assert!(storage.get_file("summary.csv").await.is_none());
        assert!(storage.get_file("degraded.json").await.is_some());

        let report: Value =
            serde_json::from_slice(&storage.get_file("run_report.json").await.unwrap()).unwrap();
        assert_eq!(report["pipeline"], "unit-test");
        assert_eq!(report["summary"]["enriched"], 2);
        assert_eq!(report["rule_groups"], 5);

        let zip_data = storage.get_file("bundle.zip").await.unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
        assert_eq!(archive.len(), 4);
    }
}
