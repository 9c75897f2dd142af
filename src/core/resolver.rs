//! Mapping rule resolution: builds the destination table one rule at a time.

use crate::core::text::clean_text;
use crate::domain::model::{CellValue, MappingTable, RuleOutcome, RuleStatus, Table};
use crate::utils::error::{AlignError, Result};
use std::collections::HashMap;

/// 解析後的來源運算式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceExpression {
    Unmapped,
    Single(String),
    Concat(Vec<String>),
}

impl SourceExpression {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return SourceExpression::Unmapped;
        };

        let expression = raw.trim();
        if expression.contains('+') {
            SourceExpression::Concat(
                expression
                    .split('+')
                    .map(|token| token.trim().to_string())
                    .collect(),
            )
        } else {
            SourceExpression::Single(expression.to_string())
        }
    }
}

/// 依單一運算式產生目的欄；無法解析時退化為空白欄，不視為錯誤
pub fn resolve_expression(expression: &SourceExpression, source: &Table) -> (Vec<CellValue>, RuleStatus) {
    match expression {
        SourceExpression::Unmapped => (source.blank_column(), RuleStatus::Unmapped),
        SourceExpression::Single(name) => match source.values(name) {
            Some(values) => (values.to_vec(), RuleStatus::Matched),
            None => (source.blank_column(), RuleStatus::NoMatch),
        },
        SourceExpression::Concat(tokens) => {
            let valid: Vec<&[CellValue]> = tokens
                .iter()
                .filter_map(|token| source.values(token))
                .collect();
            if valid.is_empty() {
                return (source.blank_column(), RuleStatus::NoMatch);
            }

            let values = (0..source.row_count())
                .map(|row| {
                    let joined = valid
                        .iter()
                        .map(|column| column[row].to_string())
                        .collect::<Vec<_>>()
                        .join(" ");
                    let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
                    CellValue::Text(clean_text(&collapsed))
                })
                .collect();
            let status = RuleStatus::Combined {
                used: valid.len(),
                requested: tokens.len(),
            };
            (values, status)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub table: Table,
    pub outcomes: Vec<RuleOutcome>,
    pub duplicate_headers: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MappingResolver {
    strict_headers: bool,
}

impl MappingResolver {
    pub fn new(strict_headers: bool) -> Self {
        Self { strict_headers }
    }

    pub fn resolve(&self, source: &Table, mapping: &MappingTable) -> Result<Resolution> {
        let mut table = Table::new(source.row_count());
        let mut outcomes = Vec::with_capacity(mapping.len());
        let mut duplicate_headers = Vec::new();
        // 目的欄名 -> 第一次出現的規則序號 (1-based)
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (index, rule) in mapping.rules.iter().enumerate() {
            let rule_number = index + 1;
            let destination = rule.destination_header.trim().to_string();

            // 空白欄名仍保留一欄空值，維持目的表欄數
            if destination.is_empty() {
                tracing::warn!("Mapping rule {} has an empty template header, left blank", rule_number);
                table.set_column(&destination, source.blank_column());
                outcomes.push(RuleOutcome {
                    rule: rule.clone(),
                    destination,
                    status: RuleStatus::EmptyHeader,
                });
                continue;
            }

            if let Some(first_row) = seen.get(&destination) {
                if self.strict_headers {
                    return Err(AlignError::DuplicateHeaderError {
                        header: destination,
                        first_row: *first_row,
                        second_row: rule_number,
                    });
                }
                tracing::debug!(
                    "Template header '{}' repeated at rule {}, later rule wins",
                    destination,
                    rule_number
                );
                if !duplicate_headers.contains(&destination) {
                    duplicate_headers.push(destination.clone());
                }
            } else {
                seen.insert(destination.clone(), rule_number);
            }

            let expression = SourceExpression::parse(rule.source_expression.as_deref());
            let (values, status) = resolve_expression(&expression, source);
            tracing::debug!("Rule {}: '{}' <- {:?} => {}", rule_number, destination, expression, status);

            table.set_column(&destination, values);
            outcomes.push(RuleOutcome {
                rule: rule.clone(),
                destination,
                status,
            });
        }

        Ok(Resolution {
            table,
            outcomes,
            duplicate_headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::MappingRule;

    fn source_table() -> Table {
        Table::from_rows(
            vec![
                "Buyer Name".to_string(),
                "City".to_string(),
                "State".to_string(),
                "Sale Price".to_string(),
            ],
            vec![
                vec!["O'Neil, Pat".into(), "Austin  ".into(), "TX".into(), 500000.0.into()],
                vec![CellValue::Empty, CellValue::Empty, "NM".into(), CellValue::Empty],
                vec!["Acme".into(), "Santa  Fe".into(), CellValue::Empty, 12.5.into()],
            ],
        )
    }

    fn texts(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::text(*v)).collect()
    }

    fn resolve(rules: Vec<MappingRule>) -> Resolution {
        MappingResolver::default()
            .resolve(&source_table(), &MappingTable::new(rules))
            .unwrap()
    }

    #[test]
    fn test_parse_expression() {
        assert_eq!(SourceExpression::parse(None), SourceExpression::Unmapped);
        assert_eq!(
            SourceExpression::parse(Some("  Buyer Name ")),
            SourceExpression::Single("Buyer Name".to_string())
        );
        assert_eq!(
            SourceExpression::parse(Some("City + State+ Zip")),
            SourceExpression::Concat(vec![
                "City".to_string(),
                "State".to_string(),
                "Zip".to_string()
            ])
        );
    }

    #[test]
    fn test_single_column_passes_raw_values() {
        let resolution = resolve(vec![
            MappingRule::new("Buyer.Name", Some("Buyer Name")),
            MappingRule::new("Price", Some("Sale Price")),
        ]);

        let table = &resolution.table;
        assert_eq!(
            table.values("Buyer.Name").unwrap(),
            &["O'Neil, Pat".into(), CellValue::Empty, "Acme".into()]
        );
        assert_eq!(
            table.values("Price").unwrap(),
            &[500000.0.into(), CellValue::Empty, 12.5.into()]
        );
        assert_eq!(resolution.outcomes[0].status, RuleStatus::Matched);
    }

    #[test]
    fn test_concatenation_normalizes_each_cell() {
        let resolution = resolve(vec![MappingRule::new("Location", Some("City + State"))]);

        assert_eq!(
            resolution.table.values("Location").unwrap(),
            texts(&["Austin TX", "NM", "Santa Fe"]).as_slice()
        );
        assert_eq!(
            resolution.outcomes[0].status,
            RuleStatus::Combined { used: 2, requested: 2 }
        );
    }

    #[test]
    fn test_concatenation_skips_unknown_tokens() {
        let resolution = resolve(vec![MappingRule::new("Notes", Some("Zip + Buyer Name + County"))]);

        assert_eq!(
            resolution.table.values("Notes").unwrap(),
            texts(&["ONeil Pat", "", "Acme"]).as_slice()
        );
        assert_eq!(
            resolution.outcomes[0].status,
            RuleStatus::Combined { used: 1, requested: 3 }
        );
    }

    #[test]
    fn test_unresolvable_rules_degrade_to_blank() {
        let resolution = resolve(vec![
            MappingRule::new("A", Some("Zip + County")),
            MappingRule::new("B", Some("Not A Column")),
            MappingRule::new("C", None),
            MappingRule::new("D", Some("   ")),
        ]);

        for name in ["A", "B", "C", "D"] {
            let values = resolution.table.values(name).unwrap();
            assert_eq!(values.len(), 3);
            assert!(values.iter().all(|v| *v == CellValue::text("")), "column {}", name);
        }
        assert_eq!(resolution.outcomes[0].status, RuleStatus::NoMatch);
        assert_eq!(resolution.outcomes[1].status, RuleStatus::NoMatch);
        assert_eq!(resolution.outcomes[2].status, RuleStatus::Unmapped);
        assert_eq!(resolution.table.row_count(), 3);
    }

    #[test]
    fn test_empty_header_becomes_blank_column() {
        let resolution = resolve(vec![
            MappingRule::new("   ", Some("City")),
            MappingRule::new("X", None),
        ]);

        assert_eq!(resolution.table.column_count(), 2);
        assert_eq!(resolution.table.column_names(), vec!["", "X"]);
        assert_eq!(resolution.table.values("").unwrap(), texts(&["", "", ""]).as_slice());
        assert_eq!(resolution.outcomes[0].status, RuleStatus::EmptyHeader);
    }

    #[test]
    fn test_duplicate_header_last_rule_wins_in_place() {
        let resolution = resolve(vec![
            MappingRule::new("Price", Some("City")),
            MappingRule::new(" Buyer ", Some("Buyer Name")),
            MappingRule::new("Price ", Some("Sale Price")),
        ]);

        assert_eq!(resolution.table.column_names(), vec!["Price", "Buyer"]);
        assert_eq!(resolution.table.values("Price").unwrap()[0], CellValue::Number(500000.0));
        assert_eq!(resolution.duplicate_headers, vec!["Price"]);
    }

    #[test]
    fn test_strict_mode_rejects_duplicate_headers() {
        let mapping = MappingTable::new(vec![
            MappingRule::new("Price", Some("City")),
            MappingRule::new("Price", Some("Sale Price")),
        ]);

        let err = MappingResolver::new(true)
            .resolve(&source_table(), &mapping)
            .unwrap_err();
        assert!(matches!(
            err,
            AlignError::DuplicateHeaderError { first_row: 1, second_row: 2, .. }
        ));
    }

    #[test]
    fn test_end_to_end_scenario() {
        let source = Table::from_rows(
            vec!["Seller Name".to_string(), "Sale Price".to_string()],
            vec![vec!["Jane Q Public".into(), 500000.0.into()]],
        );
        let mapping = MappingTable::new(vec![
            MappingRule::new("Buyer.Name", Some("Seller Name")),
            MappingRule::new("Price", Some("Sale Price")),
            MappingRule::new("Notes", None),
        ]);

        let resolution = MappingResolver::default().resolve(&source, &mapping).unwrap();
        let table = resolution.table;

        assert_eq!(table.column_names(), vec!["Buyer.Name", "Price", "Notes"]);
        assert_eq!(table.values("Buyer.Name").unwrap(), texts(&["Jane Q Public"]).as_slice());
        assert_eq!(table.values("Price").unwrap(), &[CellValue::Number(500000.0)]);
        assert_eq!(table.values("Notes").unwrap(), texts(&[""]).as_slice());
    }

    #[test]
    fn test_empty_source_keeps_shape() {
        let source = Table::from_rows(vec!["City".to_string()], vec![]);
        let mapping = MappingTable::new(vec![
            MappingRule::new("City", Some("City")),
            MappingRule::new("Location", Some("City + State")),
        ]);

        let table = MappingResolver::default().resolve(&source, &mapping).unwrap().table;
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_names(), vec!["City", "Location"]);
    }
}
