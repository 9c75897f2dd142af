use crate::domain::model::{AlignResult, RuleStatus};
use chrono::NaiveDateTime;
use std::fmt::Write;

pub const REPORT_BANNER: &str = "RealNex CoStar Import – Run Report\n\
==================================\n\
\n\
Processed successfully using built-in RealNex Template and Mapping Sheet.\n";

/// 規則解析狀態統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleCounts {
    pub total: usize,
    pub matched: usize,
    pub combined: usize,
    pub no_match: usize,
    pub unmapped: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub generated_at: NaiveDateTime,
    pub source_name: String,
    pub rows: usize,
    pub columns: usize,
    pub counts: RuleCounts,
    pub duplicate_headers: Vec<String>,
    pub enriched: bool,
    /// 範本有、但沒有任何規則產生的欄位；None 表示未設定範本
    pub template_without_rule: Option<Vec<String>>,
    pub rules_not_in_template: Option<Vec<String>>,
}

impl RunReport {
    pub fn new(result: &AlignResult, template_headers: Option<&[String]>, generated_at: NaiveDateTime) -> Self {
        let mut counts = RuleCounts::default();
        for outcome in &result.outcomes {
            counts.total += 1;
            match outcome.status {
                RuleStatus::Matched => counts.matched += 1,
                RuleStatus::Combined { .. } => counts.combined += 1,
                RuleStatus::NoMatch => counts.no_match += 1,
                RuleStatus::Unmapped => counts.unmapped += 1,
                RuleStatus::EmptyHeader => counts.skipped += 1,
            }
        }

        let produced = result.destination.column_names();
        let template_without_rule = template_headers.map(|headers| {
            headers
                .iter()
                .filter(|header| !produced.contains(header))
                .cloned()
                .collect()
        });
        let rules_not_in_template = template_headers.map(|headers| {
            let mut missing: Vec<String> = Vec::new();
            for outcome in &result.outcomes {
                if outcome.status == RuleStatus::EmptyHeader
                    || headers.contains(&outcome.destination)
                    || missing.contains(&outcome.destination)
                {
                    continue;
                }
                missing.push(outcome.destination.clone());
            }
            missing
        });

        Self {
            generated_at,
            source_name: result.source_name.clone(),
            rows: result.destination.row_count(),
            columns: result.destination.column_count(),
            counts,
            duplicate_headers: result.duplicate_headers.clone(),
            enriched: result.enriched,
            template_without_rule,
            rules_not_in_template,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::from(REPORT_BANNER);
        let counts = &self.counts;

        // String 的 fmt::Write 不會失敗
        let _ = writeln!(out);
        let _ = writeln!(out, "Run summary");
        let _ = writeln!(out, "-----------");
        let _ = writeln!(out, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "Source: {}", self.source_name);
        let _ = writeln!(out, "Rows: {}", self.rows);
        let _ = writeln!(out, "Destination columns: {}", self.columns);
        let _ = writeln!(
            out,
            "Rules: {} (matched {}, combined {}, blank no match {}, blank unmapped {}, skipped {})",
            counts.total, counts.matched, counts.combined, counts.no_match, counts.unmapped, counts.skipped
        );
        let _ = writeln!(out, "Duplicate template headers: {}", list_or_none(&self.duplicate_headers));
        let _ = writeln!(out, "Name enrichment: {}", if self.enriched { "on" } else { "off" });

        match (&self.template_without_rule, &self.rules_not_in_template) {
            (Some(without_rule), Some(not_in_template)) => {
                let _ = writeln!(out, "Template columns without a rule: {}", list_or_none(without_rule));
                let _ = writeln!(out, "Rule headers not in template: {}", list_or_none(not_in_template));
            }
            _ => {
                let _ = writeln!(out, "Template check: not configured");
            }
        }

        out
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{MappingRule, RuleOutcome, Table};
    use chrono::NaiveDate;

    fn outcome(destination: &str, status: RuleStatus) -> RuleOutcome {
        RuleOutcome {
            rule: MappingRule::new(destination, None),
            destination: destination.to_string(),
            status,
        }
    }

    fn sample_result() -> AlignResult {
        let mut destination = Table::new(2);
        destination.set_column("Buyer Name", vec!["a".into(), "b".into()]);
        destination.set_column("Notes", vec!["".into(), "".into()]);
        AlignResult {
            source_name: "comps.xlsx".to_string(),
            destination,
            outcomes: vec![
                outcome("Buyer Name", RuleStatus::Matched),
                outcome("Notes", RuleStatus::Unmapped),
                outcome("Notes", RuleStatus::NoMatch),
                outcome("", RuleStatus::EmptyHeader),
            ],
            duplicate_headers: vec!["Notes".to_string()],
            enriched: false,
        }
    }

    fn at_noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_report_starts_with_banner() {
        let report = RunReport::new(&sample_result(), None, at_noon()).render();

        assert!(report.starts_with(
            "RealNex CoStar Import – Run Report\n==================================\n\nProcessed successfully using built-in RealNex Template and Mapping Sheet.\n"
        ));
        assert!(report.contains("Generated: 2024-05-01 12:00:00"));
        assert!(report.contains("Rows: 2"));
        assert!(report.contains(
            "Rules: 4 (matched 1, combined 0, blank no match 1, blank unmapped 1, skipped 1)"
        ));
        assert!(report.contains("Duplicate template headers: Notes"));
        assert!(report.contains("Template check: not configured"));
    }

    #[test]
    fn test_template_gaps() {
        let template = vec!["Buyer Name".to_string(), "Sale Date".to_string()];
        let report = RunReport::new(&sample_result(), Some(&template), at_noon());

        assert_eq!(report.template_without_rule, Some(vec!["Sale Date".to_string()]));
        assert_eq!(report.rules_not_in_template, Some(vec!["Notes".to_string()]));

        let text = report.render();
        assert!(text.contains("Template columns without a rule: Sale Date"));
        assert!(text.contains("Rule headers not in template: Notes"));
    }
}
