//! 文字正規化與姓名拆解

use crate::domain::model::CellValue;

/// 只保留 ASCII 英數字與空白，順序與間距不變
pub fn clean_text(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect()
}

/// 缺值回傳空字串，其餘取字串形式後清理
pub fn normalize(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        other => clean_text(&other.to_string()),
    }
}

/// 拆成 (名, 姓)；三個以上的詞只保留頭尾，中間名捨棄
pub fn split_name(full_name: &CellValue) -> (String, String) {
    if matches!(full_name, CellValue::Empty) {
        return (String::new(), String::new());
    }

    let name = normalize(full_name);
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.as_slice() {
        [] => (String::new(), String::new()),
        [only] => (only.to_string(), String::new()),
        [first, .., last] => (first.to_string(), last.to_string()),
    }
}

pub fn safe_fullname(first: &str, last: &str) -> String {
    let first = clean_text(first);
    let last = clean_text(last);
    match (first.is_empty(), last.is_empty()) {
        (false, false) => format!("{} {}", first, last).trim().to_string(),
        (false, true) => first,
        (true, false) => last,
        (true, true) => String::new(),
    }
}
