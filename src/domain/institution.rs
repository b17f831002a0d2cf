//! 機構記錄的正規化邊界。
//!
//! 原始記錄是鬆散的 JSON 物件；在這裡一次性轉成有型別的 [`InstitutionRecord`]，
//! 缺少或為 `null` 的選填欄位一律視為空容器，型別錯誤才回報 `MalformedRecord`。
//! 手動資料（[`ManualMetadata`]）採寬鬆解析，永遠不會失敗。

use crate::domain::model::{DomainScores, ToolTag, MAX_DOMAIN_SCORE};
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstitutionCategory {
    /// 可授予學位的大學 / 工程學院
    University,
    /// 專科（文憑）學校
    Polytechnic,
    /// 職業訓練學校
    Iti,
    /// 短期課程訓練中心
    TrainingCenter,
    /// 大學預科 / 中學
    PuCollege,
}

impl InstitutionCategory {
    pub const ALL: [InstitutionCategory; 5] = [
        InstitutionCategory::University,
        InstitutionCategory::Polytechnic,
        InstitutionCategory::Iti,
        InstitutionCategory::TrainingCenter,
        InstitutionCategory::PuCollege,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstitutionCategory::University => "university",
            InstitutionCategory::Polytechnic => "polytechnic",
            InstitutionCategory::Iti => "iti",
            InstitutionCategory::TrainingCenter => "training_center",
            InstitutionCategory::PuCollege => "pu_college",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            InstitutionCategory::University => &[
                "degree-granting institution",
                "engineering_college",
                "degree_college",
                "college",
            ],
            InstitutionCategory::Polytechnic => &["diploma institute"],
            InstitutionCategory::Iti => &["vocational-training institute", "vocational"],
            InstitutionCategory::TrainingCenter => &["short-course training center", "skill_center"],
            InstitutionCategory::PuCollege => &[
                "pre-university/secondary institution",
                "secondary",
                "school",
            ],
        }
    }

    /// 不分大小寫比對標準名稱與別名；未知類別回傳 `None`
    pub fn parse(raw: &str) -> Option<Self> {
        let needle = raw.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        Self::ALL.into_iter().find(|category| {
            category.as_str() == needle || category.aliases().iter().any(|alias| *alias == needle)
        })
    }

    /// 此類別是否帶有結構化的課程資料
    pub fn has_programs(&self) -> bool {
        !matches!(self, InstitutionCategory::TrainingCenter)
    }
}

impl fmt::Display for InstitutionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcademicProgram {
    pub name: String,
    pub specializations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcademicOfferings {
    pub programs: Vec<AcademicProgram>,
}

impl AcademicOfferings {
    /// 依課程順序攤平所有專長字串
    pub fn specializations(&self) -> Vec<&str> {
        self.programs
            .iter()
            .flat_map(|program| program.specializations.iter().map(String::as_str))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

/// 依類別區分的機構記錄
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstitutionRecord {
    University(AcademicOfferings),
    Polytechnic(AcademicOfferings),
    Iti(AcademicOfferings),
    TrainingCenter,
    PuCollege(AcademicOfferings),
    Unrecognized { category: Option<String> },
}

impl InstitutionRecord {
    pub fn from_json(data: &Map<String, Value>) -> Result<Self> {
        let raw_category = match data.get("category") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(other) => return Err(malformed("category", "a string", other)),
        };

        let category = match raw_category.and_then(InstitutionCategory::parse) {
            Some(category) => category,
            None => {
                return Ok(InstitutionRecord::Unrecognized {
                    category: raw_category.map(str::to_string),
                })
            }
        };

        if !category.has_programs() {
            if data.contains_key("academicPrograms") {
                tracing::debug!(
                    category = %category,
                    "ignoring academicPrograms for a category without structured programs"
                );
            }
            return Ok(InstitutionRecord::TrainingCenter);
        }

        let offerings = parse_offerings(data)?;
        Ok(match category {
            InstitutionCategory::University => InstitutionRecord::University(offerings),
            InstitutionCategory::Polytechnic => InstitutionRecord::Polytechnic(offerings),
            InstitutionCategory::Iti => InstitutionRecord::Iti(offerings),
            InstitutionCategory::PuCollege => InstitutionRecord::PuCollege(offerings),
            InstitutionCategory::TrainingCenter => InstitutionRecord::TrainingCenter,
        })
    }

    pub fn category(&self) -> Option<InstitutionCategory> {
        match self {
            InstitutionRecord::University(_) => Some(InstitutionCategory::University),
            InstitutionRecord::Polytechnic(_) => Some(InstitutionCategory::Polytechnic),
            InstitutionRecord::Iti(_) => Some(InstitutionCategory::Iti),
            InstitutionRecord::TrainingCenter => Some(InstitutionCategory::TrainingCenter),
            InstitutionRecord::PuCollege(_) => Some(InstitutionCategory::PuCollege),
            InstitutionRecord::Unrecognized { .. } => None,
        }
    }

    pub fn offerings(&self) -> Option<&AcademicOfferings> {
        match self {
            InstitutionRecord::University(offerings)
            | InstitutionRecord::Polytechnic(offerings)
            | InstitutionRecord::Iti(offerings)
            | InstitutionRecord::PuCollege(offerings) => Some(offerings),
            InstitutionRecord::TrainingCenter | InstitutionRecord::Unrecognized { .. } => None,
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn malformed(field: &str, expected: &str, found: &Value) -> EtlError {
    EtlError::MalformedRecord {
        field: field.to_string(),
        reason: format!("expected {}, found {}", expected, type_name(found)),
    }
}

/// `academicPrograms`，或舊格式的 `academicOfferings.programs`
fn parse_offerings(data: &Map<String, Value>) -> Result<AcademicOfferings> {
    let (field, programs) = match data.get("academicPrograms") {
        Some(value) if !value.is_null() => ("academicPrograms", Some(value)),
        _ => match data.get("academicOfferings") {
            None | Some(Value::Null) => ("academicOfferings", None),
            Some(Value::Object(nested)) => ("academicOfferings.programs", nested.get("programs")),
            Some(other) => return Err(malformed("academicOfferings", "an object", other)),
        },
    };

    let items = match programs {
        None | Some(Value::Null) => return Ok(AcademicOfferings::default()),
        Some(Value::Array(items)) => items,
        Some(other) => return Err(malformed(field, "an array", other)),
    };

    let mut parsed = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let program = match item {
            Value::Null => continue,
            Value::Object(program) => program,
            other => return Err(malformed(&format!("{}[{}]", field, i), "an object", other)),
        };
        parsed.push(parse_program(program, &format!("{}[{}]", field, i))?);
    }

    Ok(AcademicOfferings { programs: parsed })
}

fn parse_program(program: &Map<String, Value>, path: &str) -> Result<AcademicProgram> {
    let name = match program.get("name") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => return Err(malformed(&format!("{}.name", path), "a string", other)),
    };

    let specializations = match program.get("specializations") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(labels)) => {
            let mut out = Vec::with_capacity(labels.len());
            for (j, label) in labels.iter().enumerate() {
                match label {
                    Value::Null => {}
                    Value::String(s) => out.push(s.clone()),
                    other => {
                        return Err(malformed(
                            &format!("{}.specializations[{}]", path, j),
                            "a string",
                            other,
                        ))
                    }
                }
            }
            out
        }
        Some(other) => {
            return Err(malformed(
                &format!("{}.specializations", path),
                "an array",
                other,
            ))
        }
    };

    Ok(AcademicProgram {
        name,
        specializations,
    })
}

/// 人工整理的資料，直接掛在記錄上
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualMetadata {
    #[serde(default)]
    pub domains: DomainScores,
    #[serde(default)]
    pub tools: Vec<ToolTag>,
    #[serde(default)]
    pub specializations: Vec<String>,
}

impl ManualMetadata {
    /// 寬鬆解析 `manualDomains` / `manualTools` / `manualSpecializations`，無法使用的項目直接略過
    pub fn from_json(data: &Map<String, Value>) -> Self {
        Self {
            domains: parse_manual_domains(data.get("manualDomains")),
            tools: parse_manual_tools(data.get("manualTools")),
            specializations: parse_manual_specializations(data.get("manualSpecializations")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.tools.is_empty() && self.specializations.is_empty()
    }
}

fn parse_manual_domains(value: Option<&Value>) -> DomainScores {
    let mut domains = DomainScores::new();
    let Some(Value::Object(entries)) = value else {
        return domains;
    };

    for (domain, score) in entries {
        match whole_score(score) {
            Some(score) => {
                if score > u64::from(MAX_DOMAIN_SCORE) {
                    tracing::warn!(
                        domain = %domain,
                        score,
                        "manual domain score above {}, clamping",
                        MAX_DOMAIN_SCORE
                    );
                }
                let clamped = score.min(u64::from(MAX_DOMAIN_SCORE)) as u8;
                domains.insert(domain.clone(), clamped);
            }
            None => {
                tracing::debug!(domain = %domain, "skipping non-integer manual domain score");
            }
        }
    }
    domains
}

/// 非負整數，`2.0` 這類整數值的浮點數也接受
fn whole_score(score: &Value) -> Option<u64> {
    if let Some(score) = score.as_u64() {
        return Some(score);
    }
    let score = score.as_f64()?;
    if score.is_finite() && score >= 0.0 && score.fract() == 0.0 {
        Some(score.min(u64::MAX as f64) as u64)
    } else {
        None
    }
}

fn parse_manual_tools(value: Option<&Value>) -> Vec<ToolTag> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<ToolTag>(entry.clone()) {
            Ok(tool) => Some(tool),
            Err(e) => {
                tracing::debug!("skipping unusable manual tool entry: {}", e);
                None
            }
        })
        .collect()
}

fn parse_manual_specializations(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(Value::as_str)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}
