use crate::domain::institution::ManualMetadata;
use crate::domain::model::{DerivedMetadata, EnrichedMetadata, ToolTag};
use std::collections::HashSet;

/// 合併推導結果與手動資料
///
/// - 領域：手動值直接覆蓋同名的推導值（不取最大值）
/// - 工具：推導在前、手動在後，依名稱保留第一筆，所以推導結果優先
/// - 專長：手動在前、推導在後，去除空字串與重複
pub fn merge(derived: &DerivedMetadata, manual: &ManualMetadata) -> EnrichedMetadata {
    // NOTE: 手動覆蓋與分類器內部的取最大值規則不一致，維持現行行為
    let mut domains = derived.domains.clone();
    for (domain, score) in &manual.domains {
        domains.insert(domain.clone(), *score);
    }

    let tools = dedup_tools(derived.tools.iter().chain(manual.tools.iter()));

    let specializations = dedup_labels(
        manual
            .specializations
            .iter()
            .chain(derived.specializations.iter()),
    );

    EnrichedMetadata {
        domains,
        tools,
        specializations,
    }
}

fn dedup_tools<'a>(tools: impl Iterator<Item = &'a ToolTag>) -> Vec<ToolTag> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for tool in tools {
        // 缺少名稱的項目無法作為鍵
        if tool.name.trim().is_empty() {
            continue;
        }
        if seen.insert(tool.name.as_str()) {
            out.push(tool.clone());
        }
    }
    out
}

fn dedup_labels<'a>(labels: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for label in labels {
        if !label.is_empty() && seen.insert(label.as_str()) {
            out.push(label.clone());
        }
    }
    out
}

impl EnrichedMetadata {
    /// 分類失敗時原樣保留手動資料
    pub fn from_manual(manual: &ManualMetadata) -> Self {
        Self {
            domains: manual.domains.clone(),
            tools: manual.tools.clone(),
            specializations: manual.specializations.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Proficiency;

    fn derived() -> DerivedMetadata {
        let mut derived = DerivedMetadata::default();
        derived.domains.insert("AI".to_string(), 6);
        derived.domains.insert("Software Development".to_string(), 8);
        derived.tools.push(ToolTag::new("Python", "Software Development", Proficiency::Advanced));
        derived.tools.push(ToolTag::new("Java", "Software Development", Proficiency::Advanced));
        derived.specializations.push("Computer Science".to_string());
        derived
    }

    #[test]
    fn test_manual_domain_overrides_even_when_lower() {
        let mut manual = ManualMetadata::default();
        manual.domains.insert("AI".to_string(), 2);
        manual.domains.insert("Design".to_string(), 7);

        let merged = merge(&derived(), &manual);
        assert_eq!(merged.domains["AI"], 2);
        assert_eq!(merged.domains["Design"], 7);
        assert_eq!(merged.domains["Software Development"], 8);
    }

    #[test]
    fn test_derived_tool_wins_and_manual_appends() {
        let mut manual = ManualMetadata::default();
        manual.tools.push(ToolTag::new("Python", "", Proficiency::Expert));
        manual.tools.push(ToolTag::new("Figma", "Design", Proficiency::Intermediate));
        manual.tools.push(ToolTag::new("Figma", "Design", Proficiency::Expert));
        manual.tools.push(ToolTag::new("  ", "Design", Proficiency::Expert));

        let merged = merge(&derived(), &manual);
        let names: Vec<&str> = merged.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Python", "Java", "Figma"]);
        assert_eq!(merged.tools[0].proficiency, Proficiency::Advanced);
        assert_eq!(merged.tools[2].proficiency, Proficiency::Intermediate);
    }

    #[test]
    fn test_specializations_manual_first_without_duplicates() {
        let mut manual = ManualMetadata::default();
        manual.specializations = vec![
            "Robotics".to_string(),
            String::new(),
            "Computer Science".to_string(),
            "Robotics".to_string(),
        ];

        let merged = merge(&derived(), &manual);
        assert_eq!(
            merged.specializations,
            vec!["Robotics".to_string(), "Computer Science".to_string()]
        );
    }

    #[test]
    fn test_merge_of_empty_inputs_is_empty() {
        let merged = merge(&DerivedMetadata::default(), &ManualMetadata::default());
        assert!(merged.is_empty());
    }

    #[test]
    fn test_merge_is_repeatable() {
        let mut manual = ManualMetadata::default();
        manual.domains.insert("Networking".to_string(), 3);
        manual.tools.push(ToolTag::new("Linux", "Networking", Proficiency::Basic));
        let first = merge(&derived(), &manual);
        let second = merge(&derived(), &manual);
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_manual_passes_through_unchanged() {
        let mut manual = ManualMetadata::default();
        manual.tools.push(ToolTag::new("Figma", "Design", Proficiency::Basic));
        manual.tools.push(ToolTag::new("Figma", "Design", Proficiency::Expert));
        manual.specializations.push("UX".to_string());

        let passed = EnrichedMetadata::from_manual(&manual);
        assert_eq!(passed.tools.len(), 2);
        assert_eq!(passed.specializations, vec!["UX".to_string()]);
    }
}
