//! Machine-readable analysis report.

use serde::{Deserialize, Serialize};

use contract_fv_analysis::{ChcAnalyzer, TargetKind, Warning};

/// One verdict entry in the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetVerdict {
    pub node: u32,
    pub kind: String,
    pub verdict: String,
}

/// One diagnostic entry in the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportedWarning {
    pub report_id: u32,
    pub node: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterexample: Option<String>,
}

/// The full result of one analysis, serializable to JSON.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisReport {
    pub targets: Vec<TargetVerdict>,
    pub warnings: Vec<ReportedWarning>,
    pub unhandled_queries: usize,
}

fn kind_name(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Assert => "assert",
        TargetKind::Underflow => "underflow",
        TargetKind::Overflow => "overflow",
        TargetKind::UnderOverflow => "underoverflow",
        TargetKind::DivByZero => "divByZero",
        TargetKind::PopEmptyArray => "popEmptyArray",
    }
}

impl AnalysisReport {
    /// Assemble the report from a finished analysis and its warnings.
    pub fn from_analysis(analyzer: &ChcAnalyzer, warnings: &[Warning]) -> Self {
        let mut targets = Vec::new();
        for (node, kinds) in &analyzer.safe_targets {
            for kind in kinds {
                targets.push(TargetVerdict {
                    node: *node,
                    kind: kind_name(*kind).to_string(),
                    verdict: "safe".to_string(),
                });
            }
        }
        for (node, kinds) in &analyzer.unsafe_targets {
            for kind in kinds {
                targets.push(TargetVerdict {
                    node: *node,
                    kind: kind_name(*kind).to_string(),
                    verdict: "unsafe".to_string(),
                });
            }
        }
        let warnings = warnings
            .iter()
            .map(|w| ReportedWarning {
                report_id: w.report_id,
                node: w.node,
                message: w.message.clone(),
                counterexample: w.secondary.clone(),
            })
            .collect();
        Self {
            targets,
            warnings,
            unhandled_queries: analyzer.unhandled_queries().len(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("report serialization cannot fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_round_trips_through_json() {
        let report = AnalysisReport {
            targets: vec![TargetVerdict {
                node: 5,
                kind: "overflow".to_string(),
                verdict: "unsafe".to_string(),
            }],
            warnings: vec![ReportedWarning {
                report_id: 4984,
                node: 5,
                message: "CHC: Overflow".to_string(),
                counterexample: None,
            }],
            unhandled_queries: 1,
        };
        let json = report.to_json();
        let parsed: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.targets, report.targets);
        assert_eq!(parsed.warnings, report.warnings);
        assert_eq!(parsed.unhandled_queries, 1);
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(kind_name(TargetKind::Assert), "assert");
        assert_eq!(kind_name(TargetKind::PopEmptyArray), "popEmptyArray");
    }
}
