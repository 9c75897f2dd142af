//! 衍生欄位：姓名拆解、經紀人姓名、公司名稱清理。
//! 必須在所有對照規則解析完之後執行。

use crate::core::text::{normalize, safe_fullname, split_name};
use crate::domain::model::{CellValue, Table};

const BUYER_AGENT_FIRST: &str = "Buyers Broker Agent First Name";
const BUYER_AGENT_LAST: &str = "Buyers Broker Agent Last Name";
const BUYER_AGENT_TARGET: &str = "Proc Agent.Name";
const LISTING_AGENT_FIRST: &str = "Listing Broker Agent First Name";
const LISTING_AGENT_LAST: &str = "Listing Broker Agent Last Name";
const LISTING_AGENT_TARGET: &str = "List Agent.Name";

fn is_full_name_column(name: &str) -> bool {
    name.contains("Full Name")
}

#[derive(Debug, Clone, Default)]
pub struct NameEnricher;

impl NameEnricher {
    pub fn new() -> Self {
        Self
    }

    /// 回傳新增的欄位名稱
    pub fn enrich(&self, table: &mut Table) -> Vec<String> {
        let mut added = Vec::new();

        // 以快照迭代，避免處理到本輪新增的欄位
        for name in table.column_names() {
            if !name.contains("Name") || is_full_name_column(&name) {
                continue;
            }
            if name.contains("First") {
                added.extend(self.join_first_last(table, &name));
            } else if !name.contains("Last") {
                added.extend(self.split_full_name(table, &name));
            }
        }

        for (first, last, target) in [
            (BUYER_AGENT_FIRST, BUYER_AGENT_LAST, BUYER_AGENT_TARGET),
            (LISTING_AGENT_FIRST, LISTING_AGENT_LAST, LISTING_AGENT_TARGET),
        ] {
            if let (Some(firsts), Some(lasts)) = (table.values(first), table.values(last)) {
                let values = firsts
                    .iter()
                    .zip(lasts)
                    .map(|(f, l)| CellValue::Text(safe_fullname(&f.to_string(), &l.to_string())))
                    .collect();
                table.set_column(target, values);
                tracing::debug!("Derived '{}' from broker agent name columns", target);
                added.push(target.to_string());
            }
        }

        for name in table.column_names() {
            if !name.contains("Company") {
                continue;
            }
            if let Some(column) = table.column_mut(&name) {
                for value in column.values.iter_mut() {
                    *value = CellValue::Text(normalize(value));
                }
            }
        }

        added
    }

    fn split_full_name(&self, table: &mut Table, name: &str) -> Vec<String> {
        let Some(values) = table.values(name) else {
            return Vec::new();
        };

        let mut firsts = Vec::with_capacity(values.len());
        let mut lasts = Vec::with_capacity(values.len());
        let mut fulls = Vec::with_capacity(values.len());
        for value in values {
            let (first, last) = split_name(value);
            fulls.push(CellValue::Text(format!("{} {}", first, last).trim().to_string()));
            firsts.push(CellValue::Text(first));
            lasts.push(CellValue::Text(last));
        }

        let targets = [
            name.replace("Name", "First name"),
            name.replace("Name", "Last name"),
            name.replace("Name", "Full Name"),
        ];
        for (target, values) in targets.iter().zip([firsts, lasts, fulls]) {
            table.set_column(target, values);
        }
        tracing::debug!("Split '{}' into first/last/full name columns", name);
        targets.to_vec()
    }

    fn join_first_last(&self, table: &mut Table, name: &str) -> Option<String> {
        let sibling = name.replace("First", "Last");
        let firsts = table.values(name)?;
        let lasts = table.values(&sibling)?;

        let values = firsts
            .iter()
            .zip(lasts)
            .map(|(first, last)| {
                let parts: Vec<String> = [normalize(first), normalize(last)]
                    .into_iter()
                    .filter(|part| !part.is_empty())
                    .collect();
                CellValue::Text(parts.join(" "))
            })
            .collect();

        let target = name.replace("First", "Full");
        table.set_column(&target, values);
        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::text(*v)).collect()
    }

    #[test]
    fn test_full_name_column_is_split() {
        let mut table = Table::from_rows(
            vec!["Buyer.Name".to_string()],
            vec![
                vec!["Jane Q. Public".into()],
                vec!["Cher".into()],
                vec![CellValue::Empty],
            ],
        );

        let added = NameEnricher::new().enrich(&mut table);

        assert_eq!(
            added,
            vec!["Buyer.First name", "Buyer.Last name", "Buyer.Full Name"]
        );
        assert_eq!(table.values("Buyer.First name").unwrap(), texts(&["Jane", "Cher", ""]).as_slice());
        assert_eq!(table.values("Buyer.Last name").unwrap(), texts(&["Public", "", ""]).as_slice());
        assert_eq!(
            table.values("Buyer.Full Name").unwrap(),
            texts(&["Jane Public", "Cher", ""]).as_slice()
        );
        // 原欄位不變
        assert_eq!(table.values("Buyer.Name").unwrap()[0], CellValue::text("Jane Q. Public"));
    }

    #[test]
    fn test_first_last_pair_builds_full_name() {
        let mut table = Table::from_rows(
            vec!["Seller First Name".to_string(), "Seller Last Name".to_string()],
            vec![
                vec!["Ann-Marie".into(), "Smith".into()],
                vec![CellValue::Empty, "O'Hara".into()],
            ],
        );

        NameEnricher::new().enrich(&mut table);

        assert_eq!(
            table.values("Seller Full Name").unwrap(),
            texts(&["AnnMarie Smith", "OHara"]).as_slice()
        );
    }

    #[test]
    fn test_first_without_last_sibling_is_ignored() {
        let mut table = Table::from_rows(
            vec!["Seller First Name".to_string()],
            vec![vec!["Ann".into()]],
        );

        let added = NameEnricher::new().enrich(&mut table);

        assert!(added.is_empty());
        assert_eq!(table.column_count(), 1);
    }

    #[test]
    fn test_broker_agent_names() {
        let mut table = Table::from_rows(
            vec![
                BUYER_AGENT_FIRST.to_string(),
                BUYER_AGENT_LAST.to_string(),
                LISTING_AGENT_FIRST.to_string(),
            ],
            vec![vec!["Jane!".into(), "Doe#2".into(), "Sam".into()]],
        );

        NameEnricher::new().enrich(&mut table);

        assert_eq!(table.values("Proc Agent.Name").unwrap(), texts(&["Jane Doe2"]).as_slice());
        assert!(!table.contains("List Agent.Name"));
    }

    #[test]
    fn test_company_columns_are_normalized_in_place() {
        let mut table = Table::from_rows(
            vec!["Buyer Company".to_string(), "Notes".to_string()],
            vec![vec!["Smith & Co., LLC".into(), "a&b".into()], vec![CellValue::Empty, "x".into()]],
        );

        NameEnricher::new().enrich(&mut table);

        assert_eq!(
            table.values("Buyer Company").unwrap(),
            texts(&["Smith  Co LLC", ""]).as_slice()
        );
        assert_eq!(table.values("Notes").unwrap()[0], CellValue::text("a&b"));
        assert_eq!(table.column_names(), vec!["Buyer Company", "Notes"]);
    }

    #[test]
    fn test_full_name_columns_are_not_split_again() {
        let mut table = Table::from_rows(
            vec!["Buyer Full Name".to_string(), "Buyer Last Name".to_string()],
            vec![vec!["Jane Doe".into(), "Doe".into()]],
        );

        let added = NameEnricher::new().enrich(&mut table);

        assert!(added.is_empty());
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_full_name_exclusion_is_case_sensitive() {
        let mut table = Table::from_rows(
            vec!["Seller Name (Full name)".to_string()],
            vec![vec!["Jane Doe".into()]],
        );

        let added = NameEnricher::new().enrich(&mut table);

        assert_eq!(
            added,
            vec![
                "Seller First name (Full name)",
                "Seller Last name (Full name)",
                "Seller Full Name (Full name)",
            ]
        );
        assert_eq!(table.values("Seller Last name (Full name)").unwrap()[0], CellValue::text("Doe"));
    }
}
