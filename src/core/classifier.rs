use crate::domain::institution::InstitutionRecord;
use crate::domain::model::{DerivedMetadata, DomainScores, ToolTag, MAX_DOMAIN_SCORE};
use crate::domain::rules::{Contribution, RuleSet};
use std::collections::HashSet;

/// 單次分類過程中收集各規則的貢獻
///
/// - 領域分數取最大值
/// - 工具以名稱為鍵，先寫先贏
/// - 專長標籤去重，保留第一次出現的順序
#[derive(Debug, Default)]
pub struct MetadataAccumulator {
    domains: DomainScores,
    tools: Vec<ToolTag>,
    tool_names: HashSet<String>,
    specializations: Vec<String>,
    seen_specializations: HashSet<String>,
}

impl MetadataAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&mut self, domain: &str, score: u8) {
        let score = score.min(MAX_DOMAIN_SCORE);
        self.domains
            .entry(domain.to_string())
            .and_modify(|current| *current = (*current).max(score))
            .or_insert(score);
    }

    /// 回傳是否被採用；同名工具已存在時丟棄
    pub fn add_tool(&mut self, tool: &ToolTag) -> bool {
        if !self.tool_names.insert(tool.name.clone()) {
            return false;
        }
        self.tools.push(tool.clone());
        true
    }

    pub fn add_specialization(&mut self, label: &str) -> bool {
        if !self.seen_specializations.insert(label.to_string()) {
            return false;
        }
        self.specializations.push(label.to_string());
        true
    }

    pub fn apply(&mut self, contribution: &Contribution) {
        match contribution {
            Contribution::Raise { domain, score } => self.raise(domain, *score),
            Contribution::AddTool(tool) => {
                if !self.add_tool(tool) {
                    tracing::trace!(tool = %tool.name, "tool already contributed, dropping");
                }
            }
            Contribution::AddSpecialization { label } => {
                self.add_specialization(label);
            }
        }
    }

    pub fn apply_all(&mut self, contributions: &[Contribution]) {
        for contribution in contributions {
            self.apply(contribution);
        }
    }

    pub fn finish(self) -> DerivedMetadata {
        DerivedMetadata {
            domains: self.domains,
            tools: self.tools,
            specializations: self.specializations,
        }
    }
}

/// 規則分類器：記錄 -> 推導出的能力資料
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: RuleSet,
}

impl Classifier {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn builtin() -> Self {
        Self::new(RuleSet::builtin())
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// 評估順序：群組 baseline，再依宣告順序評估 pattern。
    /// 未知類別或沒有對應群組時回傳空結果。
    pub fn classify(&self, record: &InstitutionRecord) -> DerivedMetadata {
        let Some(category) = record.category() else {
            tracing::debug!(?record, "unrecognized category, no rules apply");
            return DerivedMetadata::default();
        };

        let Some(group) = self.rules.group_for(category) else {
            tracing::debug!(category = %category, "no rule group for category");
            return DerivedMetadata::default();
        };

        let mut acc = MetadataAccumulator::new();
        acc.apply_all(&group.baseline);

        let specializations = record
            .offerings()
            .map(|offerings| offerings.specializations())
            .unwrap_or_default();

        for pattern in &group.patterns {
            if pattern.matches(&specializations) {
                tracing::debug!(category = %category, pattern = %pattern.name, "pattern rule fired");
                acc.apply_all(&pattern.contributions);
            }
        }

        acc.finish()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::institution::{AcademicOfferings, AcademicProgram, InstitutionCategory};
    use crate::domain::model::Proficiency;
    use crate::domain::rules::{PatternRule, RuleGroup};

    fn university(specializations: &[&str]) -> InstitutionRecord {
        InstitutionRecord::University(AcademicOfferings {
            programs: vec![AcademicProgram {
                name: "B.E.".to_string(),
                specializations: specializations.iter().map(|s| s.to_string()).collect(),
            }],
        })
    }

    fn two_rule_set(first: Vec<Contribution>, second: Vec<Contribution>) -> RuleSet {
        RuleSet::new(vec![RuleGroup {
            category: InstitutionCategory::University,
            baseline: Vec::new(),
            patterns: vec![
                PatternRule::new("first", &["X"], first),
                PatternRule::new("second", &["X"], second),
            ],
        }])
    }

    #[test]
    fn test_raise_keeps_maximum_regardless_of_order() {
        let low_then_high = Classifier::new(two_rule_set(
            vec![Contribution::raise("AI", 3)],
            vec![Contribution::raise("AI", 8)],
        ));
        let high_then_low = Classifier::new(two_rule_set(
            vec![Contribution::raise("AI", 8)],
            vec![Contribution::raise("AI", 3)],
        ));

        let record = university(&["X"]);
        assert_eq!(low_then_high.classify(&record).domains["AI"], 8);
        assert_eq!(high_then_low.classify(&record).domains["AI"], 8);
    }

    #[test]
    fn test_first_tool_contribution_wins() {
        let classifier = Classifier::new(two_rule_set(
            vec![Contribution::tool("Python", "AI", Proficiency::Basic, "Language")],
            vec![Contribution::tool("Python", "AI", Proficiency::Expert, "Language")],
        ));

        let derived = classifier.classify(&university(&["X"]));
        assert_eq!(derived.tools.len(), 1);
        assert_eq!(derived.tools[0].proficiency, Proficiency::Basic);
    }

    #[test]
    fn test_accumulator_clamps_and_dedups() {
        let mut acc = MetadataAccumulator::new();
        acc.raise("Design", 42);
        assert!(acc.add_specialization("CAD"));
        assert!(!acc.add_specialization("CAD"));
        assert!(acc.add_specialization("cad"));
        let derived = acc.finish();
        assert_eq!(derived.domains["Design"], MAX_DOMAIN_SCORE);
        assert_eq!(derived.specializations, vec!["CAD".to_string(), "cad".to_string()]);
    }

    #[test]
    fn test_no_programs_gets_baseline_only() {
        let classifier = Classifier::builtin();
        let derived = classifier.classify(&InstitutionRecord::University(AcademicOfferings::default()));

        assert_eq!(derived.domains["Software Development"], 5);
        assert_eq!(derived.domains["AI"], 4);
        assert!(derived.tools.iter().any(|t| t.name == "Git"));
        assert!(!derived.tools.iter().any(|t| t.name == "Python"));
        assert!(derived.specializations.is_empty());
    }

    #[test]
    fn test_unrecognized_category_is_empty() {
        let classifier = Classifier::builtin();
        let derived = classifier.classify(&InstitutionRecord::Unrecognized {
            category: Some("hospital".to_string()),
        });
        assert!(derived.is_empty());
    }

    #[test]
    fn test_category_without_group_is_empty() {
        let classifier = Classifier::new(RuleSet::empty());
        assert!(classifier.classify(&university(&["CSE"])).is_empty());
    }

    #[test]
    fn test_only_dispatched_group_fires() {
        let classifier = Classifier::builtin();
        let derived = classifier.classify(&InstitutionRecord::Iti(AcademicOfferings {
            programs: vec![AcademicProgram {
                name: "Trades".to_string(),
                specializations: vec!["Electrician".to_string(), "CSE".to_string()],
            }],
        }));

        // ITI 沒有 computing pattern，"CSE" 不會觸發大學的規則
        assert_eq!(derived.domains["Electrical Systems"], 7);
        assert!(!derived.tools.iter().any(|t| t.name == "Java"));
        assert_eq!(derived.specializations, vec!["Electrician Trade".to_string()]);
    }

    #[test]
    fn test_training_center_baseline() {
        let derived = Classifier::builtin().classify(&InstitutionRecord::TrainingCenter);
        assert_eq!(derived.domains.len(), 3);
        assert_eq!(derived.specializations, vec!["Short-Term Skill Courses".to_string()]);
        let names: Vec<&str> = derived.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["MS Office", "HTML/CSS", "Canva"]);
    }

    #[test]
    fn test_builtin_overlapping_patterns_keep_first_tool() {
        // computing 先於 ai_data 宣告，Python 保留 computing 的版本
        let derived = Classifier::builtin().classify(&university(&["CSE", "AI-ML"]));
        let python: Vec<&ToolTag> = derived.tools.iter().filter(|t| t.name == "Python").collect();
        assert_eq!(python.len(), 1);
        assert_eq!(python[0].domain, "Software Development");
        assert_eq!(derived.domains["AI"], 9);
        assert_eq!(derived.domains["Software Development"], 8);
    }
}
