//! 規則表。
//!
//! 規則以資料宣告：`RuleSet.groups` 依宣告順序排列，每個類別最多一個群組；
//! 群組先套用 `baseline`，再依宣告順序評估 `patterns`。工具採「先寫先贏」，
//! 所以這個順序就是輸出的一部分。

use crate::domain::institution::InstitutionCategory;
use crate::domain::model::{Proficiency, ToolTag, KNOWN_DOMAINS, MAX_DOMAIN_SCORE};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Contribution {
    Raise { domain: String, score: u8 },
    AddTool(ToolTag),
    AddSpecialization { label: String },
}

impl Contribution {
    pub fn raise(domain: &str, score: u8) -> Self {
        Contribution::Raise {
            domain: domain.to_string(),
            score,
        }
    }

    pub fn tool(name: &str, domain: &str, proficiency: Proficiency, category: &str) -> Self {
        Contribution::AddTool(ToolTag::new(name, domain, proficiency).with_category(category))
    }

    pub fn specialization(label: &str) -> Self {
        Contribution::AddSpecialization {
            label: label.to_string(),
        }
    }
}

/// 專長字串包含任一觸發子字串（區分大小寫）時觸發
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    pub name: String,
    pub triggers: Vec<String>,
    #[serde(default)]
    pub contributions: Vec<Contribution>,
}

impl PatternRule {
    pub fn new(name: &str, triggers: &[&str], contributions: Vec<Contribution>) -> Self {
        Self {
            name: name.to_string(),
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            contributions,
        }
    }

    pub fn matches(&self, specializations: &[&str]) -> bool {
        specializations.iter().any(|specialization| {
            self.triggers
                .iter()
                .any(|trigger| specialization.contains(trigger.as_str()))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub category: InstitutionCategory,
    /// 無條件套用
    #[serde(default)]
    pub baseline: Vec<Contribution>,
    #[serde(default)]
    pub patterns: Vec<PatternRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
}

impl RuleSet {
    pub fn new(groups: Vec<RuleGroup>) -> Self {
        Self { groups }
    }

    pub fn empty() -> Self {
        Self { groups: Vec::new() }
    }

    /// 依宣告順序找第一個符合的群組
    pub fn group_for(&self, category: InstitutionCategory) -> Option<&RuleGroup> {
        self.groups.iter().find(|group| group.category == category)
    }

    pub fn pattern_count(&self) -> usize {
        self.groups.iter().map(|group| group.patterns.len()).sum()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let rules: RuleSet = toml::from_str(content).map_err(|e| EtlError::RuleSetError {
            message: format!("TOML parsing error: {}", e),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let rules = Self::from_toml_str(&content)?;
        tracing::info!(
            "📐 Loaded {} rule groups ({} patterns) from {}",
            rules.groups.len(),
            rules.pattern_count(),
            path.as_ref().display()
        );
        Ok(rules)
    }

    /// 內建規則表
    pub fn builtin() -> Self {
        use Contribution as C;
        use Proficiency::*;

        let university = RuleGroup {
            category: InstitutionCategory::University,
            baseline: vec![
                C::raise("Software Development", 5),
                C::raise("AI", 4),
                C::raise("Data Engineering", 3),
                C::raise("Design", 2),
                C::tool("Git", "Software Development", Intermediate, "Version Control"),
                C::tool("MS Excel", "Business", Intermediate, "Productivity"),
            ],
            patterns: vec![
                PatternRule::new(
                    "computing",
                    &["CSE", "ISE", "Computer", "Information Science"],
                    vec![
                        C::raise("Software Development", 8),
                        C::raise("AI", 6),
                        C::raise("Data Engineering", 5),
                        C::tool("Python", "Software Development", Advanced, "Language"),
                        C::tool("Java", "Software Development", Advanced, "Language"),
                        C::tool("C++", "Software Development", Intermediate, "Language"),
                        C::tool("SQL", "Data Engineering", Intermediate, "Database"),
                        C::specialization("Computer Science"),
                    ],
                ),
                PatternRule::new(
                    "ai_data",
                    &["AI", "Machine Learning", "Data Science", "Artificial Intelligence"],
                    vec![
                        C::raise("AI", 9),
                        C::raise("Data Engineering", 7),
                        C::raise("Software Development", 6),
                        C::tool("Python", "AI", Advanced, "Language"),
                        C::tool("TensorFlow", "AI", Intermediate, "Framework"),
                        C::tool("Pandas", "Data Engineering", Advanced, "Library"),
                        C::specialization("Artificial Intelligence & ML"),
                    ],
                ),
                PatternRule::new(
                    "electronics",
                    &["ECE", "Electronics", "Telecommunication", "VLSI"],
                    vec![
                        C::raise("Embedded Systems", 8),
                        C::raise("Networking", 5),
                        C::tool("Embedded C", "Embedded Systems", Advanced, "Language"),
                        C::tool("MATLAB", "Embedded Systems", Intermediate, "Simulation"),
                        C::tool("Verilog", "Embedded Systems", Intermediate, "HDL"),
                        C::specialization("Electronics & Communication"),
                    ],
                ),
                PatternRule::new(
                    "electrical",
                    &["EEE", "Electrical"],
                    vec![
                        C::raise("Electrical Systems", 8),
                        C::raise("Embedded Systems", 5),
                        C::tool("MATLAB", "Electrical Systems", Advanced, "Simulation"),
                        C::tool("PLC Programming", "Electrical Systems", Intermediate, "Automation"),
                        C::specialization("Electrical Engineering"),
                    ],
                ),
                PatternRule::new(
                    "mechanical",
                    &["MECH", "Mechanical", "Automobile", "Aeronautical"],
                    vec![
                        C::raise("Manufacturing", 8),
                        C::raise("Design", 6),
                        C::tool("AutoCAD", "Design", Advanced, "CAD"),
                        C::tool("SolidWorks", "Design", Intermediate, "CAD"),
                        C::tool("ANSYS", "Manufacturing", Intermediate, "Simulation"),
                        C::specialization("Mechanical Engineering"),
                    ],
                ),
                PatternRule::new(
                    "civil",
                    &["CIVIL", "Civil", "Architecture"],
                    vec![
                        C::raise("Construction", 8),
                        C::raise("Design", 5),
                        C::tool("AutoCAD", "Design", Intermediate, "CAD"),
                        C::tool("STAAD Pro", "Construction", Intermediate, "Structural Analysis"),
                        C::tool("Revit", "Design", Basic, "BIM"),
                        C::specialization("Civil Engineering"),
                    ],
                ),
                PatternRule::new(
                    "networking",
                    &["Network", "Cyber", "Cloud"],
                    vec![
                        C::raise("Networking", 8),
                        C::raise("Software Development", 6),
                        C::tool("Linux", "Networking", Intermediate, "Operating System"),
                        C::tool("Cisco Packet Tracer", "Networking", Intermediate, "Simulation"),
                        C::tool("AWS", "Networking", Basic, "Cloud"),
                        C::specialization("Networking & Security"),
                    ],
                ),
                PatternRule::new(
                    "management",
                    &["MBA", "Management", "Commerce"],
                    vec![
                        C::raise("Business", 7),
                        C::tool("MS Excel", "Business", Advanced, "Productivity"),
                        C::tool("Tally", "Business", Intermediate, "Accounting"),
                        C::specialization("Business Management"),
                    ],
                ),
            ],
        };

        let polytechnic = RuleGroup {
            category: InstitutionCategory::Polytechnic,
            baseline: vec![
                C::raise("Manufacturing", 5),
                C::raise("Electrical Systems", 4),
                C::raise("Software Development", 3),
                C::raise("Design", 3),
                C::tool("AutoCAD", "Design", Basic, "CAD"),
                C::tool("MS Office", "Business", Basic, "Productivity"),
            ],
            patterns: vec![
                PatternRule::new(
                    "computing",
                    &["CSE", "Computer", "Information Science"],
                    vec![
                        C::raise("Software Development", 6),
                        C::raise("Networking", 4),
                        C::tool("Python", "Software Development", Intermediate, "Language"),
                        C::tool("C", "Software Development", Intermediate, "Language"),
                        C::tool("HTML/CSS", "Software Development", Intermediate, "Web"),
                        C::specialization("Computer Engineering (Diploma)"),
                    ],
                ),
                PatternRule::new(
                    "electronics",
                    &["ECE", "Electronics"],
                    vec![
                        C::raise("Embedded Systems", 6),
                        C::tool("Arduino", "Embedded Systems", Intermediate, "Hardware"),
                        C::tool("Multisim", "Embedded Systems", Basic, "Simulation"),
                        C::specialization("Electronics (Diploma)"),
                    ],
                ),
                PatternRule::new(
                    "mechanical",
                    &["MECH", "Mechanical", "Automobile"],
                    vec![
                        C::raise("Manufacturing", 7),
                        C::raise("Design", 5),
                        C::tool("CNC Programming", "Manufacturing", Intermediate, "Machining"),
                        C::tool("AutoCAD", "Design", Intermediate, "CAD"),
                        C::specialization("Mechanical (Diploma)"),
                    ],
                ),
                PatternRule::new(
                    "civil",
                    &["CIVIL", "Civil"],
                    vec![
                        C::raise("Construction", 7),
                        C::tool("Surveying", "Construction", Intermediate, "Field"),
                        C::specialization("Civil (Diploma)"),
                    ],
                ),
                PatternRule::new(
                    "electrical",
                    &["EEE", "Electrical"],
                    vec![
                        C::raise("Electrical Systems", 7),
                        C::tool(
                            "Wiring & Installation",
                            "Electrical Systems",
                            Intermediate,
                            "Installation",
                        ),
                        C::specialization("Electrical (Diploma)"),
                    ],
                ),
            ],
        };

        let iti = RuleGroup {
            category: InstitutionCategory::Iti,
            baseline: vec![
                C::raise("Manufacturing", 4),
                C::raise("Electrical Systems", 3),
                C::tool("Hand Tools", "Manufacturing", Intermediate, "Workshop"),
            ],
            patterns: vec![
                PatternRule::new(
                    "electrician",
                    &["Electrician", "Wireman"],
                    vec![
                        C::raise("Electrical Systems", 7),
                        C::tool("Electrical Wiring", "Electrical Systems", Advanced, "Installation"),
                        C::tool("Multimeter", "Electrical Systems", Advanced, "Instrument"),
                        C::specialization("Electrician Trade"),
                    ],
                ),
                PatternRule::new(
                    "fitter_machinist",
                    &["Fitter", "Machinist", "Turner", "Welder"],
                    vec![
                        C::raise("Manufacturing", 7),
                        C::tool("Lathe Operation", "Manufacturing", Advanced, "Machining"),
                        C::tool("Arc Welding", "Manufacturing", Intermediate, "Fabrication"),
                        C::specialization("Fitting & Machining"),
                    ],
                ),
                PatternRule::new(
                    "computer_operator",
                    &["COPA", "Computer Operator"],
                    vec![
                        C::raise("Software Development", 4),
                        C::raise("Business", 4),
                        C::tool("MS Office", "Business", Advanced, "Productivity"),
                        C::tool("Python", "Software Development", Basic, "Language"),
                        C::specialization("Computer Operator (COPA)"),
                    ],
                ),
                PatternRule::new(
                    "electronics_mechanic",
                    &["Electronics Mechanic", "Electronic"],
                    vec![
                        C::raise("Embedded Systems", 5),
                        C::tool("Soldering", "Embedded Systems", Advanced, "Hardware"),
                        C::specialization("Electronics Mechanic"),
                    ],
                ),
            ],
        };

        let training_center = RuleGroup {
            category: InstitutionCategory::TrainingCenter,
            baseline: vec![
                C::raise("Software Development", 4),
                C::raise("Design", 3),
                C::raise("Business", 3),
                C::tool("MS Office", "Business", Intermediate, "Productivity"),
                C::tool("HTML/CSS", "Software Development", Basic, "Web"),
                C::tool("Canva", "Design", Basic, "Design Tool"),
                C::specialization("Short-Term Skill Courses"),
            ],
            patterns: Vec::new(),
        };

        let pu_college = RuleGroup {
            category: InstitutionCategory::PuCollege,
            baseline: vec![
                C::raise("Software Development", 2),
                C::raise("Business", 2),
                C::tool("MS Office", "Business", Basic, "Productivity"),
            ],
            patterns: vec![
                PatternRule::new(
                    "science",
                    &["PCM", "Science"],
                    vec![
                        C::raise("Software Development", 3),
                        C::raise("AI", 2),
                        C::tool("Python", "Software Development", Basic, "Language"),
                        C::specialization("Science Stream"),
                    ],
                ),
                PatternRule::new(
                    "computer_science",
                    &["PCMC", "Computer"],
                    vec![
                        C::raise("Software Development", 4),
                        C::tool("C++", "Software Development", Basic, "Language"),
                        C::specialization("Computer Science Stream"),
                    ],
                ),
                PatternRule::new(
                    "commerce",
                    &["Commerce", "CEBA", "SEBA"],
                    vec![
                        C::raise("Business", 4),
                        C::tool("Tally", "Business", Basic, "Accounting"),
                        C::specialization("Commerce Stream"),
                    ],
                ),
            ],
        };

        Self::new(vec![university, polytechnic, iti, training_center, pu_college])
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

fn validate_contribution(path: &str, contribution: &Contribution) -> Result<()> {
    let check_domain = |domain: &str| -> Result<()> {
        if KNOWN_DOMAINS.contains(&domain) {
            Ok(())
        } else {
            Err(EtlError::RuleSetError {
                message: format!(
                    "{}: unknown domain '{}'. Known domains: {}",
                    path,
                    domain,
                    KNOWN_DOMAINS.join(", ")
                ),
            })
        }
    };

    match contribution {
        Contribution::Raise { domain, score } => {
            check_domain(domain)?;
            if *score > MAX_DOMAIN_SCORE {
                return Err(EtlError::RuleSetError {
                    message: format!(
                        "{}: score {} for '{}' exceeds {}",
                        path, score, domain, MAX_DOMAIN_SCORE
                    ),
                });
            }
        }
        Contribution::AddTool(tool) => {
            validate_non_empty_string(&format!("{}.name", path), &tool.name)?;
            check_domain(&tool.domain)?;
        }
        Contribution::AddSpecialization { label } => {
            validate_non_empty_string(&format!("{}.label", path), label)?;
        }
    }
    Ok(())
}

impl Validate for RuleSet {
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (g, group) in self.groups.iter().enumerate() {
            if !seen.insert(group.category) {
                return Err(EtlError::RuleSetError {
                    message: format!("groups[{}]: duplicate group for category '{}'", g, group.category),
                });
            }

            for (c, contribution) in group.baseline.iter().enumerate() {
                validate_contribution(&format!("groups[{}].baseline[{}]", g, c), contribution)?;
            }

            for (p, pattern) in group.patterns.iter().enumerate() {
                let path = format!("groups[{}].patterns[{}]", g, p);
                if pattern.triggers.is_empty() || pattern.triggers.iter().any(|t| t.is_empty()) {
                    return Err(EtlError::RuleSetError {
                        message: format!(
                            "{} ('{}'): triggers must be non-empty strings",
                            path, pattern.name
                        ),
                    });
                }
                for (c, contribution) in pattern.contributions.iter().enumerate() {
                    validate_contribution(&format!("{}.contributions[{}]", path, c), contribution)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules_are_valid() {
        let rules = RuleSet::builtin();
        assert!(rules.validate().is_ok());
        assert_eq!(rules.groups.len(), 5);
        for category in InstitutionCategory::ALL {
            assert!(rules.group_for(category).is_some(), "missing group for {}", category);
        }
    }

    #[test]
    fn test_pattern_matching_is_case_sensitive_substring() {
        let rule = PatternRule::new("computing", &["CSE", "Computer"], Vec::new());
        assert!(rule.matches(&["B.E. CSE (AI)"]));
        assert!(rule.matches(&["ECE", "Computer Applications"]));
        assert!(!rule.matches(&["cse"]));
        assert!(!rule.matches(&[]));
    }

    #[test]
    fn test_rules_from_toml() {
        let content = r#"
[[groups]]
category = "iti"
baseline = [
    { op = "raise", domain = "Manufacturing", score = 4 },
    { op = "add_tool", name = "Hand Tools", domain = "Manufacturing", proficiency = "Intermediate", category = "Workshop" },
]

[[groups.patterns]]
name = "welding"
triggers = ["Welder"]
contributions = [
    { op = "raise", domain = "Manufacturing", score = 7 },
    { op = "add_specialization", label = "Welding" },
]
"#;
        let rules = RuleSet::from_toml_str(content).unwrap();
        let group = rules.group_for(InstitutionCategory::Iti).unwrap();
        assert_eq!(group.baseline.len(), 2);
        assert_eq!(
            group.baseline[1],
            Contribution::tool("Hand Tools", "Manufacturing", Proficiency::Intermediate, "Workshop")
        );
        assert_eq!(group.patterns[0].triggers, vec!["Welder".to_string()]);
        assert_eq!(rules.pattern_count(), 1);
    }

    #[test]
    fn test_rules_validation_rejects_bad_tables() {
        let unknown_domain = r#"
[[groups]]
category = "university"
baseline = [{ op = "raise", domain = "Cooking", score = 4 }]
"#;
        assert!(matches!(
            RuleSet::from_toml_str(unknown_domain),
            Err(EtlError::RuleSetError { .. })
        ));

        let score_too_high = r#"
[[groups]]
category = "university"
baseline = [{ op = "raise", domain = "AI", score = 11 }]
"#;
        assert!(RuleSet::from_toml_str(score_too_high).is_err());

        let empty_trigger = r#"
[[groups]]
category = "university"

[[groups.patterns]]
name = "everything"
triggers = [""]
"#;
        assert!(RuleSet::from_toml_str(empty_trigger).is_err());

        let duplicate_group = r#"
[[groups]]
category = "polytechnic"

[[groups]]
category = "polytechnic"
"#;
        assert!(RuleSet::from_toml_str(duplicate_group).is_err());

        let unknown_category = r#"
[[groups]]
category = "hospital"
"#;
        assert!(RuleSet::from_toml_str(unknown_category).is_err());
    }
}
