//! Follow-up tools for cached large result sets: page browsing and report
//! export. Both resolve fingerprints through the shared `ResultCache`.

use std::sync::Arc;

use async_trait::async_trait;
use crmpilot_core::error::ToolError;
use crmpilot_core::tool::{Tool, int_or, optional_str, required_str};
use serde_json::{Value, json};

use crate::result_cache::ResultCache;

pub struct BrowseResultPageTool {
    cache: Arc<ResultCache>,
}

impl BrowseResultPageTool {
    pub fn new(cache: Arc<ResultCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Tool for BrowseResultPageTool {
    fn name(&self) -> &str {
        "browse_result_page"
    }
    fn description(&self) -> &str {
        "Show one page of a previously cached large result set."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "result_set_id": {
                    "type": "string",
                    "description": "The result set fingerprint from a LARGE_RESULT_SET marker"
                },
                "page": { "type": "integer", "description": "Page number, starting at 1" }
            },
            "required": ["result_set_id"]
        })
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let fingerprint = required_str(&arguments, "result_set_id")?;
        let page = int_or(&arguments, "page", 1) as usize;
        Ok(self.cache.get_page(fingerprint, page))
    }
}

pub struct ExportResultsReportTool {
    cache: Arc<ResultCache>,
}

impl ExportResultsReportTool {
    pub fn new(cache: Arc<ResultCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Tool for ExportResultsReportTool {
    fn name(&self) -> &str {
        "export_results_report"
    }
    fn description(&self) -> &str {
        "Export a previously cached large result set as a report file for the user."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "result_set_id": {
                    "type": "string",
                    "description": "The result set fingerprint from a LARGE_RESULT_SET marker"
                },
                "title": { "type": "string", "description": "Optional report title" }
            },
            "required": ["result_set_id"]
        })
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let fingerprint = required_str(&arguments, "result_set_id")?;
        let title = optional_str(&arguments, "title");
        Ok(self.cache.export(fingerprint, title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_record;
    use crate::report::CsvReportWriter;
    use crate::result_cache::CacheParams;
    use crmpilot_core::crm::{EntityKind, Record};
    use crmpilot_core::markers;
    use serde_json::json;

    fn cached_set(n: usize) -> (Arc<ResultCache>, String) {
        let cache = Arc::new(ResultCache::new(
            CacheParams::default(),
            Arc::new(CsvReportWriter::new(
                tempfile::tempdir().unwrap().keep(),
            )),
        ));
        let records: Vec<Record> = (1..=n)
            .map(|i| {
                test_record(&[
                    ("id", json!(i.to_string())),
                    ("Last_Name", json!(format!("L{i}"))),
                    ("Company", json!("Acme")),
                ])
            })
            .collect();
        let summary = cache.summarize_and_cache(records, EntityKind::Leads);
        let fingerprint = markers::extract_fingerprints(&summary).remove(0);
        (cache, fingerprint)
    }

    #[tokio::test]
    async fn browse_defaults_to_page_one() {
        let (cache, fingerprint) = cached_set(60);
        let tool = BrowseResultPageTool::new(cache);

        let result = tool
            .execute(json!({"result_set_id": fingerprint}))
            .await
            .unwrap();
        assert!(result.starts_with("Page 1/3 (60 total leads):"));
    }

    #[tokio::test]
    async fn browse_unknown_set_explains_expiry() {
        let (cache, _) = cached_set(60);
        let tool = BrowseResultPageTool::new(cache);

        let result = tool
            .execute(json!({"result_set_id": "gone", "page": 2}))
            .await
            .unwrap();
        assert!(result.contains("Result set expired or not found"));
    }

    #[tokio::test]
    async fn export_returns_send_file_marker() {
        let (cache, fingerprint) = cached_set(55);
        let tool = ExportResultsReportTool::new(cache);

        let result = tool
            .execute(json!({"result_set_id": fingerprint, "title": "Q3 Leads"}))
            .await
            .unwrap();
        assert!(result.starts_with("Report generated with 55 leads."));
        let files = markers::extract_send_files(&result);
        assert_eq!(files.len(), 1);
        assert!(files[0].exists());
    }
}
