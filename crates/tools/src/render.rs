//! Record rendering for model consumption.
//!
//! The model reads natural language, not JSON, so every tool result is a
//! compact plain-text rendering. One-line formats are entity-kind-specific
//! and shared by search previews, result pages, and task listings.

use crmpilot_core::crm::{EntityKind, Record};
use serde_json::Value;

/// A record field as display text, with "N/A" for missing values.
pub fn field(record: &Record, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        // Lookup fields come back as {"name": ..., "id": ...}
        Some(Value::Object(o)) => o
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string(),
        _ => "N/A".to_string(),
    }
}

/// $15,000.50 style, with thousands separators.
pub(crate) fn dollars(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;
    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if negative { "-" } else { "" };
    format!("{sign}${grouped}.{frac:02}")
}

/// Thousands-grouped integer, for record counts.
pub(crate) fn grouped_count(count: usize) -> String {
    let digits = count.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

fn money(record: &Record, key: &str) -> String {
    match record.get(key).and_then(Value::as_f64) {
        Some(amount) => dollars(amount),
        None => "N/A".to_string(),
    }
}

pub(crate) fn person_name(record: &Record) -> String {
    let first = match record.get("First_Name").and_then(Value::as_str) {
        Some(s) => s,
        None => "",
    };
    let last = match record.get("Last_Name").and_then(Value::as_str) {
        Some(s) => s,
        None => "",
    };
    let name = format!("{first} {last}").trim().to_string();
    if name.is_empty() { "N/A".to_string() } else { name }
}

/// Format a single record as a one-line summary.
pub fn one_liner(record: &Record, kind: EntityKind) -> String {
    let id = field(record, "id");

    match kind {
        EntityKind::Leads => format!(
            "{} - {} ({}) [ID: {id}]",
            person_name(record),
            field(record, "Company"),
            field(record, "Lead_Status"),
        ),
        EntityKind::Contacts => format!(
            "{} - {} [ID: {id}]",
            person_name(record),
            field(record, "Email"),
        ),
        EntityKind::Accounts => format!(
            "{} - {} [ID: {id}]",
            field(record, "Account_Name"),
            field(record, "Industry"),
        ),
        EntityKind::Deals => format!(
            "{} - {} ({}) [ID: {id}]",
            field(record, "Deal_Name"),
            field(record, "Stage"),
            money(record, "Amount"),
        ),
        EntityKind::Products => format!(
            "{} - {} [ID: {id}]",
            field(record, "Product_Name"),
            money(record, "Unit_Price"),
        ),
        EntityKind::Tasks => format!(
            "{} - {} (Due: {}) [ID: {id}]",
            field(record, "Subject"),
            field(record, "Status"),
            field(record, "Due_Date"),
        ),
        EntityKind::Vendors => format!(
            "{} - {} [ID: {id}]",
            field(record, "Vendor_Name"),
            field(record, "Email"),
        ),
        // Generic fallback for Quotes, Sales_Orders, Purchase_Orders, Invoices
        _ => {
            let name = match record.get("Subject").and_then(Value::as_str) {
                Some(s) if !s.is_empty() => s.to_string(),
                _ => field(record, "Name"),
            };
            let status = match record.get("Status").and_then(Value::as_str) {
                Some(s) if !s.is_empty() => s.to_string(),
                _ => field(record, "Quote_Stage"),
            };
            format!("{name} - {status} [ID: {id}]")
        }
    }
}

/// Render a full record as "Key: value" lines, skipping null fields.
/// Used by the get-record tools.
pub fn details(record: &Record) -> String {
    let mut lines = Vec::new();
    for (key, value) in record {
        let rendered = match value {
            Value::Null => continue,
            Value::String(s) if s.is_empty() => continue,
            Value::String(s) => s.clone(),
            Value::Object(o) => match o.get("name").and_then(Value::as_str) {
                Some(name) => name.to_string(),
                None => continue,
            },
            Value::Array(_) => continue,
            other => other.to_string(),
        };
        lines.push(format!("{key}: {rendered}"));
    }
    lines.join("\n")
}

/// Render a short "Found N ..." listing for small result sets.
pub fn listing(records: &[Record], kind: EntityKind, noun: &str) -> String {
    let mut output = format!("Found {} {noun}:\n\n", records.len());
    for (i, record) in records.iter().enumerate() {
        output.push_str(&format!("{}. {}\n", i + 1, one_liner(record, kind)));
    }
    output
}

#[cfg(test)]
pub(crate) fn test_record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lead_one_liner() {
        let record = test_record(&[
            ("id", json!("123")),
            ("First_Name", json!("John")),
            ("Last_Name", json!("Smith")),
            ("Company", json!("Acme Corp")),
            ("Lead_Status", json!("Contacted")),
        ]);
        assert_eq!(
            one_liner(&record, EntityKind::Leads),
            "John Smith - Acme Corp (Contacted) [ID: 123]"
        );
    }

    #[test]
    fn lead_with_missing_fields_renders_na() {
        let record = test_record(&[("id", json!("9"))]);
        assert_eq!(one_liner(&record, EntityKind::Leads), "N/A - N/A (N/A) [ID: 9]");
    }

    #[test]
    fn deal_one_liner_formats_amount() {
        let record = test_record(&[
            ("id", json!("7")),
            ("Deal_Name", json!("Big Deal")),
            ("Stage", json!("Negotiation")),
            ("Amount", json!(15000.5)),
        ]);
        assert_eq!(
            one_liner(&record, EntityKind::Deals),
            "Big Deal - Negotiation ($15,000.50) [ID: 7]"
        );
    }

    #[test]
    fn small_amount_has_no_separator() {
        let record = test_record(&[
            ("id", json!("p1")),
            ("Product_Name", json!("Widget")),
            ("Unit_Price", json!(99.9)),
        ]);
        assert_eq!(
            one_liner(&record, EntityKind::Products),
            "Widget - $99.90 [ID: p1]"
        );
    }

    #[test]
    fn quote_falls_back_to_subject_and_stage() {
        let record = test_record(&[
            ("id", json!("q1")),
            ("Subject", json!("Quarterly quote")),
            ("Quote_Stage", json!("Draft")),
        ]);
        assert_eq!(
            one_liner(&record, EntityKind::Quotes),
            "Quarterly quote - Draft [ID: q1]"
        );
    }

    #[test]
    fn lookup_fields_render_their_name() {
        let record = test_record(&[
            ("id", json!("t1")),
            ("Subject", json!("Call back")),
            ("Status", json!("Open")),
            ("Due_Date", json!("2026-09-01")),
            ("Who_Id", json!({"name": "John Smith", "id": "123"})),
        ]);
        assert_eq!(field(&record, "Who_Id"), "John Smith");
        assert!(details(&record).contains("Who_Id: John Smith"));
    }

    #[test]
    fn details_skips_nulls_and_empties() {
        let record = test_record(&[
            ("Company", json!("Acme")),
            ("Email", json!("")),
            ("Phone", json!(null)),
        ]);
        let rendered = details(&record);
        assert_eq!(rendered, "Company: Acme");
    }

    #[test]
    fn counts_group_thousands() {
        assert_eq!(grouped_count(7), "7");
        assert_eq!(grouped_count(1204), "1,204");
        assert_eq!(grouped_count(1_000_000), "1,000,000");
    }

    #[test]
    fn listing_numbers_from_one() {
        let records = vec![
            test_record(&[("id", json!("1")), ("Last_Name", json!("A")), ("Company", json!("X"))]),
            test_record(&[("id", json!("2")), ("Last_Name", json!("B")), ("Company", json!("Y"))]),
        ];
        let out = listing(&records, EntityKind::Leads, "lead(s)");
        assert!(out.starts_with("Found 2 lead(s):"));
        assert!(out.contains("1. A - X"));
        assert!(out.contains("2. B - Y"));
    }
}
