use crate::core::classifier::Classifier;
use crate::core::merge::merge;
use crate::domain::institution::{InstitutionRecord, ManualMetadata};
use crate::domain::model::{EnrichedMetadata, EnrichmentStatus, Record, RecordOutcome};
use crate::domain::rules::RuleSet;

/// 逐筆執行 正規化 -> 分類 -> 合併，單筆失敗不影響其他記錄
#[derive(Debug, Clone, Default)]
pub struct Enricher {
    classifier: Classifier,
}

impl Enricher {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            classifier: Classifier::new(rules),
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn enrich_record(&self, index: usize, record: &Record) -> RecordOutcome {
        let identifier = record.identifier(index);
        let manual = ManualMetadata::from_json(&record.data);

        let (status, metadata) = match InstitutionRecord::from_json(&record.data) {
            Ok(institution) => {
                let derived = self.classifier.classify(&institution);
                tracing::debug!(
                    record = %identifier,
                    domains = derived.domains.len(),
                    tools = derived.tools.len(),
                    "classified record"
                );
                (EnrichmentStatus::Enriched, merge(&derived, &manual))
            }
            Err(e) => {
                tracing::warn!(
                    record = %identifier,
                    error = %e,
                    "⚠️ Classification failed, keeping manual metadata only"
                );
                (
                    EnrichmentStatus::Degraded {
                        reason: e.to_string(),
                    },
                    EnrichedMetadata::from_manual(&manual),
                )
            }
        };

        RecordOutcome {
            index,
            identifier,
            record: record.with_metadata(&metadata),
            status,
            metadata,
        }
    }

    pub fn enrich_batch(&self, records: &[Record]) -> Vec<RecordOutcome> {
        records
            .iter()
            .enumerate()
            .map(|(position, record)| {
                self.enrich_record(record.source_index.unwrap_or(position), record)
            })
            .collect()
    }
}
