//! CSV report writer — the file-generation collaborator behind result-set
//! export.
//!
//! Column layouts are per entity kind, with a handful of virtual fields
//! (full name, formatted amounts, lookup names) assembled from the raw
//! record. Unknown kinds fall back to a generic name/created/modified/id
//! layout.

use std::path::PathBuf;

use chrono::Utc;
use crmpilot_core::crm::{EntityKind, Record};
use crmpilot_core::error::ReportError;
use crmpilot_core::report::ReportRenderer;
use serde_json::Value;
use tracing::info;

/// Writes record sets as CSV files into a configured directory.
pub struct CsvReportWriter {
    output_dir: PathBuf,
}

/// A column: header plus the field to extract. Fields starting with `_`
/// are virtual and assembled in `extract`.
type Column = (&'static str, &'static str);

fn columns(kind: EntityKind) -> &'static [Column] {
    match kind {
        EntityKind::Leads => &[
            ("Name", "_full_name"),
            ("Company", "Company"),
            ("Email", "Email"),
            ("Phone", "Phone"),
            ("Status", "Lead_Status"),
            ("Source", "Lead_Source"),
            ("Created", "Created_Time"),
        ],
        EntityKind::Contacts => &[
            ("Name", "_full_name"),
            ("Email", "Email"),
            ("Phone", "Phone"),
            ("Account", "_account_name"),
            ("Created", "Created_Time"),
            ("ID", "id"),
        ],
        EntityKind::Accounts => &[
            ("Account Name", "Account_Name"),
            ("Phone", "Phone"),
            ("Website", "Website"),
            ("Industry", "Industry"),
            ("Created", "Created_Time"),
            ("ID", "id"),
        ],
        EntityKind::Deals => &[
            ("Deal Name", "Deal_Name"),
            ("Stage", "Stage"),
            ("Amount", "Amount"),
            ("Closing Date", "Closing_Date"),
            ("Account", "_account_name"),
            ("Created", "Created_Time"),
            ("ID", "id"),
        ],
        EntityKind::Products => &[
            ("Product Name", "Product_Name"),
            ("Unit Price", "Unit_Price"),
            ("Product Code", "Product_Code"),
            ("Description", "Description"),
            ("ID", "id"),
        ],
        EntityKind::Vendors => &[
            ("Vendor Name", "Vendor_Name"),
            ("Email", "Email"),
            ("Phone", "Phone"),
            ("Website", "Website"),
            ("ID", "id"),
        ],
        EntityKind::Quotes => &[
            ("Subject", "Subject"),
            ("Stage", "Quote_Stage"),
            ("Deal", "Deal_Name"),
            ("Account", "Account_Name"),
            ("ID", "id"),
        ],
        EntityKind::SalesOrders | EntityKind::Invoices => &[
            ("Subject", "Subject"),
            ("Status", "Status"),
            ("Account", "Account_Name"),
            ("Grand Total", "Grand_Total"),
            ("ID", "id"),
        ],
        EntityKind::PurchaseOrders => &[
            ("Subject", "Subject"),
            ("Status", "Status"),
            ("Vendor", "Vendor_Name"),
            ("Grand Total", "Grand_Total"),
            ("ID", "id"),
        ],
        EntityKind::Tasks => &[
            ("Subject", "Subject"),
            ("Status", "Status"),
            ("Priority", "Priority"),
            ("Due Date", "Due_Date"),
            ("Related To", "_what_id_name"),
            ("ID", "id"),
        ],
    }
}

fn plain(record: &Record, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Object(o)) => o
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn extract(record: &Record, field: &str) -> String {
    match field {
        "_full_name" => {
            let first = plain(record, "First_Name");
            let last = plain(record, "Last_Name");
            format!("{first} {last}").trim().to_string()
        }
        "_account_name" => plain(record, "Account_Name"),
        "_what_id_name" => plain(record, "What_Id"),
        _ => plain(record, field),
    }
}

/// Quote a CSV cell per RFC 4180 when it contains a delimiter, quote, or
/// newline.
fn csv_cell(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl CsvReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn render_csv(records: &[Record], kind: EntityKind) -> String {
        let cols = columns(kind);
        let mut out = String::new();
        out.push_str(
            &cols
                .iter()
                .map(|(header, _)| csv_cell(header))
                .collect::<Vec<_>>()
                .join(","),
        );
        out.push('\n');
        for record in records {
            out.push_str(
                &cols
                    .iter()
                    .map(|(_, field)| csv_cell(&extract(record, field)))
                    .collect::<Vec<_>>()
                    .join(","),
            );
            out.push('\n');
        }
        out
    }
}

impl ReportRenderer for CsvReportWriter {
    fn render(
        &self,
        records: &[Record],
        kind: EntityKind,
        title: &str,
    ) -> Result<PathBuf, ReportError> {
        let safe_title: String = title
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let filename = format!(
            "{}_{}.csv",
            safe_title,
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.output_dir.join(filename);

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| ReportError::Io(format!("create output dir: {e}")))?;
        std::fs::write(&path, Self::render_csv(records, kind))
            .map_err(|e| ReportError::Io(format!("write {}: {e}", path.display())))?;

        info!(path = %path.display(), records = records.len(), kind = %kind, "Report written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_record;
    use serde_json::json;

    #[test]
    fn lead_csv_layout() {
        let records = vec![test_record(&[
            ("id", json!("1")),
            ("First_Name", json!("John")),
            ("Last_Name", json!("Smith")),
            ("Company", json!("Acme, Inc.")),
            ("Email", json!("john@acme.test")),
            ("Lead_Status", json!("New")),
        ])];
        let csv = CsvReportWriter::render_csv(&records, EntityKind::Leads);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Name,Company,Email,Phone,Status,Source,Created"
        );
        // Comma-bearing company is quoted
        assert_eq!(
            lines.next().unwrap(),
            "John Smith,\"Acme, Inc.\",john@acme.test,,New,,"
        );
    }

    #[test]
    fn lookup_fields_flatten_to_names() {
        let records = vec![test_record(&[
            ("id", json!("t1")),
            ("Subject", json!("Call back")),
            ("Status", json!("Open")),
            ("What_Id", json!({"name": "Acme Corp", "id": "9"})),
        ])];
        let csv = CsvReportWriter::render_csv(&records, EntityKind::Tasks);
        assert!(csv.contains("Call back,Open,,,Acme Corp,t1"));
    }

    #[test]
    fn cell_quoting() {
        assert_eq!(csv_cell("plain"), "plain");
        assert_eq!(csv_cell("a,b"), "\"a,b\"");
        assert_eq!(csv_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn writes_file_into_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CsvReportWriter::new(dir.path());
        let records = vec![test_record(&[("id", json!("1")), ("Account_Name", json!("Acme"))])];

        let path = writer
            .render(&records, EntityKind::Accounts, "Accounts Report - 1 records")
            .unwrap();
        assert!(path.exists());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Account Name,Phone,Website,Industry,Created,ID"));
        assert!(content.contains("Acme"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("Accounts_Report"));
        assert!(name.ends_with(".csv"));
    }
}
