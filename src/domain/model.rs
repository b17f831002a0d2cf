use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// 領域分數上限（含）
pub const MAX_DOMAIN_SCORE: u8 = 10;

/// 已知的能力領域，規則表只能引用這些名稱
pub const KNOWN_DOMAINS: &[&str] = &[
    "Software Development",
    "AI",
    "Data Engineering",
    "Embedded Systems",
    "Networking",
    "Design",
    "Manufacturing",
    "Electrical Systems",
    "Construction",
    "Business",
];

/// 領域名稱 -> 分數。BTreeMap 保證輸出順序固定
pub type DomainScores = BTreeMap<String, u8>;

/// 一筆原始機構記錄，保留所有欄位原樣
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: Map<String, Value>,
    /// 在輸入陣列中的原始位置，略過非物件項目後仍沿用
    #[serde(skip)]
    pub source_index: Option<usize>,
}

impl Record {
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            data,
            source_index: None,
        }
    }

    pub fn with_source_index(mut self, index: usize) -> Self {
        self.source_index = Some(index);
        self
    }

    /// 日誌用識別碼：`id`，其次 `name`，最後退回批次索引
    pub fn identifier(&self, index: usize) -> String {
        for key in ["id", "name"] {
            match self.data.get(key) {
                Some(Value::String(s)) if !s.trim().is_empty() => return s.clone(),
                Some(Value::Number(n)) => return n.to_string(),
                _ => {}
            }
        }
        format!("#{}", index)
    }

    /// 以合併後的結果取代 `domains`、`tools`、`specializations`，其他欄位不動
    pub fn with_metadata(&self, metadata: &EnrichedMetadata) -> Record {
        let mut data = self.data.clone();
        data.insert("domains".to_string(), domains_to_json(&metadata.domains));
        data.insert(
            "tools".to_string(),
            Value::Array(metadata.tools.iter().map(Value::from).collect()),
        );
        data.insert(
            "specializations".to_string(),
            Value::Array(
                metadata
                    .specializations
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );
        Record {
            data,
            source_index: self.source_index,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

fn domains_to_json(domains: &DomainScores) -> Value {
    Value::Object(
        domains
            .iter()
            .map(|(domain, score)| (domain.clone(), Value::from(*score)))
            .collect(),
    )
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Proficiency {
    #[default]
    #[serde(alias = "basic")]
    Basic,
    #[serde(alias = "intermediate")]
    Intermediate,
    #[serde(alias = "advanced")]
    Advanced,
    #[serde(alias = "expert")]
    Expert,
}

impl Proficiency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Proficiency::Basic => "Basic",
            Proficiency::Intermediate => "Intermediate",
            Proficiency::Advanced => "Advanced",
            Proficiency::Expert => "Expert",
        }
    }
}

impl fmt::Display for Proficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 工具標籤，`name` 在單筆記錄的工具清單中唯一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolTag {
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub proficiency: Proficiency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ToolTag {
    pub fn new(name: &str, domain: &str, proficiency: Proficiency) -> Self {
        Self {
            name: name.to_string(),
            domain: domain.to_string(),
            proficiency,
            category: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }
}

impl From<&ToolTag> for Value {
    fn from(tool: &ToolTag) -> Self {
        let mut obj = Map::new();
        obj.insert("name".to_string(), Value::String(tool.name.clone()));
        obj.insert("domain".to_string(), Value::String(tool.domain.clone()));
        obj.insert(
            "proficiency".to_string(),
            Value::String(tool.proficiency.as_str().to_string()),
        );
        if let Some(category) = &tool.category {
            obj.insert("category".to_string(), Value::String(category.clone()));
        }
        Value::Object(obj)
    }
}

/// 分類器輸出（尚未與手動資料合併）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DerivedMetadata {
    pub domains: DomainScores,
    pub tools: Vec<ToolTag>,
    pub specializations: Vec<String>,
}

impl DerivedMetadata {
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.tools.is_empty() && self.specializations.is_empty()
    }
}

/// 合併後的最終結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichedMetadata {
    pub domains: DomainScores,
    pub tools: Vec<ToolTag>,
    pub specializations: Vec<String>,
}

impl EnrichedMetadata {
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.tools.is_empty() && self.specializations.is_empty()
    }

    /// 分數最高的領域；同分時取名稱排序最前者
    pub fn top_domain(&self) -> Option<(&str, u8)> {
        self.domains
            .iter()
            .fold(None, |best: Option<(&str, u8)>, (domain, score)| match best {
                Some((_, best_score)) if best_score >= *score => best,
                _ => Some((domain.as_str(), *score)),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Enriched,
    /// 分類失敗，只保留手動資料
    Degraded { reason: String },
}

/// 單筆記錄的處理結果
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub index: usize,
    pub identifier: String,
    pub status: EnrichmentStatus,
    pub metadata: EnrichedMetadata,
    pub record: Record,
}

impl RecordOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, EnrichmentStatus::Degraded { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DegradedRecord {
    pub identifier: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub enriched: usize,
    pub degraded: usize,
    pub degraded_records: Vec<DegradedRecord>,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[RecordOutcome]) -> Self {
        let degraded_records: Vec<DegradedRecord> = outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                EnrichmentStatus::Degraded { reason } => Some(DegradedRecord {
                    identifier: outcome.identifier.clone(),
                    reason: reason.clone(),
                }),
                EnrichmentStatus::Enriched => None,
            })
            .collect();

        Self {
            total: outcomes.len(),
            enriched: outcomes.len() - degraded_records.len(),
            degraded: degraded_records.len(),
            degraded_records,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub processed_records: Vec<Record>,
    pub csv_output: String,
    pub tsv_output: String,
    /// 降級的記錄，另外輸出方便人工檢查
    pub intermediate_data: Vec<Record>,
    pub summary: BatchSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(data) => Record::new(data),
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn test_identifier_prefers_id_then_name() {
        assert_eq!(record(json!({"id": 42, "name": "RVCE"})).identifier(0), "42");
        assert_eq!(record(json!({"name": "RVCE"})).identifier(0), "RVCE");
        assert_eq!(record(json!({"id": "", "city": "Mysuru"})).identifier(7), "#7");
    }

    #[test]
    fn test_with_metadata_replaces_only_enriched_fields() {
        let original = record(json!({
            "id": "inst-1",
            "location": {"city": "Hubballi"},
            "domains": {"stale": 1},
            "manualDomains": {"AI": 2}
        }));
        let mut metadata = EnrichedMetadata::default();
        metadata.domains.insert("AI".to_string(), 2);
        metadata
            .tools
            .push(ToolTag::new("Python", "AI", Proficiency::Advanced).with_category("Language"));
        metadata.specializations.push("AI & ML".to_string());

        let enriched = original.with_metadata(&metadata);

        assert_eq!(enriched.data["domains"], json!({"AI": 2}));
        assert_eq!(
            enriched.data["tools"],
            json!([{"name": "Python", "domain": "AI", "proficiency": "Advanced", "category": "Language"}])
        );
        assert_eq!(enriched.data["specializations"], json!(["AI & ML"]));
        assert_eq!(enriched.data["location"], json!({"city": "Hubballi"}));
        assert_eq!(enriched.data["manualDomains"], json!({"AI": 2}));
        // 原始記錄不被修改
        assert_eq!(original.data["domains"], json!({"stale": 1}));
    }

    #[test]
    fn test_proficiency_is_ordered_and_accepts_lowercase() {
        assert!(Proficiency::Basic < Proficiency::Intermediate);
        assert!(Proficiency::Advanced < Proficiency::Expert);
        let parsed: Proficiency = serde_json::from_value(json!("expert")).unwrap();
        assert_eq!(parsed, Proficiency::Expert);
    }

    #[test]
    fn test_top_domain_breaks_ties_by_name() {
        let mut metadata = EnrichedMetadata::default();
        metadata.domains.insert("Design".to_string(), 6);
        metadata.domains.insert("AI".to_string(), 6);
        metadata.domains.insert("Business".to_string(), 2);
        assert_eq!(metadata.top_domain(), Some(("AI", 6)));
        assert_eq!(EnrichedMetadata::default().top_domain(), None);
    }
}
