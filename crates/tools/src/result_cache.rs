//! Bounded result cache and pagination bridge.
//!
//! Search handlers whose result list exceeds the configured threshold do not
//! inline all records into the conversation. They divert the full set here,
//! keyed by a fresh 8-character fingerprint, and hand the model a summary
//! carrying a `[LARGE_RESULT_SET:<fingerprint>]` marker plus instructions
//! for the two follow-up tools (browse a page, export a report).
//!
//! Entries live for the TTL (default 600 s) and only within this process.
//! Expiry is swept lazily at the start of every cache operation; there is no
//! background timer. A miss always gets the explicit "re-run the original
//! search" instruction, never stale data.
//!
//! Fingerprints are not scoped per user: anyone holding the string can page
//! or export that set. Scoping them per user is a product decision that has
//! deliberately not been made here.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crmpilot_core::crm::{EntityKind, Record};
use crmpilot_core::markers;
use crmpilot_core::report::ReportRenderer;
use tracing::{debug, info};
use uuid::Uuid;

use crate::render;

/// Cache bounds. Defaults match the documented contract: threshold 50,
/// page size 20, TTL 600 seconds.
#[derive(Debug, Clone)]
pub struct CacheParams {
    /// Result lists strictly longer than this are cached
    pub large_result_threshold: usize,
    /// Records per browse page
    pub page_size: usize,
    /// Entry lifetime
    pub ttl: Duration,
}

impl Default for CacheParams {
    fn default() -> Self {
        Self {
            large_result_threshold: 50,
            page_size: 20,
            ttl: Duration::from_secs(600),
        }
    }
}

struct CacheEntry {
    records: Vec<Record>,
    kind: EntityKind,
    created_at: Instant,
}

/// In-process cache of oversized result sets.
pub struct ResultCache {
    params: CacheParams,
    renderer: Arc<dyn ReportRenderer>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new(params: CacheParams, renderer: Arc<dyn ReportRenderer>) -> Self {
        Self {
            params,
            renderer,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a result list of this length must be diverted through the
    /// cache. Exactly `threshold` records stay inline; one more does not.
    pub fn is_large(&self, count: usize) -> bool {
        count > self.params.large_result_threshold
    }

    fn sweep(entries: &mut HashMap<String, CacheEntry>, ttl: Duration) {
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at.elapsed() <= ttl);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Swept expired result sets");
        }
    }

    fn miss_message() -> String {
        "Result set expired or not found (cache clears on restart and after 10 minutes). \
         You MUST re-run the original search to generate a new result set, then use the new result_set_id. \
         Tell the user: the previous results expired and you're re-running the search now."
            .to_string()
    }

    fn total_pages(&self, count: usize) -> usize {
        count.div_ceil(self.params.page_size)
    }

    /// Cache a large result set and return a summary for the model.
    pub fn summarize_and_cache(&self, records: Vec<Record>, kind: EntityKind) -> String {
        let mut entries = self.entries.lock().expect("result cache poisoned");
        Self::sweep(&mut entries, self.params.ttl);

        let fingerprint = Uuid::new_v4().to_string()[..8].to_string();
        let total = records.len();
        let total_pages = self.total_pages(total);
        let label = kind.label();

        let preview: String = records
            .iter()
            .take(5)
            .enumerate()
            .map(|(i, record)| format!("  {}. {}", i + 1, render::one_liner(record, kind)))
            .collect::<Vec<_>>()
            .join("\n");

        let marker = markers::large_result_set(&fingerprint);
        let summary = format!(
            "Found {total} {label} (showing first 5 of {total}):\n\n\
             {preview}\n\n\
             ... and {more} more records.\n\n\
             {marker}\n\n\
             This result set has {total_pages} pages of {page_size} records each.\n\
             Ask the user: would they like to browse in groups of {page_size}, \
             or get a report file of all {total} records?\n\
             - To browse: call browse_result_page with result_set_id=\"{fingerprint}\" and page=1\n\
             - To export: call export_results_report with result_set_id=\"{fingerprint}\"",
            more = total - 5,
            page_size = self.params.page_size,
        );

        info!(fingerprint, total, kind = %kind, "Cached large result set");
        entries.insert(
            fingerprint,
            CacheEntry {
                records,
                kind,
                created_at: Instant::now(),
            },
        );

        summary
    }

    /// Return a page of records from a cached result set.
    pub fn get_page(&self, fingerprint: &str, page: usize) -> String {
        let mut entries = self.entries.lock().expect("result cache poisoned");
        Self::sweep(&mut entries, self.params.ttl);

        let Some(entry) = entries.get(fingerprint) else {
            return Self::miss_message();
        };

        let total = entry.records.len();
        let total_pages = self.total_pages(total);
        if page < 1 || page > total_pages {
            return format!("Invalid page {page}. Valid range: 1-{total_pages}");
        }

        let start = (page - 1) * self.params.page_size;
        let end = (start + self.params.page_size).min(total);
        let label = entry.kind.label();

        let mut output = format!("Page {page}/{total_pages} ({total} total {label}):\n\n");
        for (i, record) in entry.records[start..end].iter().enumerate() {
            output.push_str(&format!(
                "{}. {}\n",
                start + i + 1,
                render::one_liner(record, entry.kind)
            ));
        }
        output.push_str(&format!("\nShowing {}-{end} of {total}.", start + 1));
        if page < total_pages {
            output.push_str(&format!(
                " Next page: browse_result_page with result_set_id=\"{fingerprint}\", page={}",
                page + 1
            ));
        }
        output
    }

    /// Export the full cached set through the report renderer. The returned
    /// string embeds a `[SEND_FILE:<path>]` marker on success.
    pub fn export(&self, fingerprint: &str, title: Option<&str>) -> String {
        let mut entries = self.entries.lock().expect("result cache poisoned");
        Self::sweep(&mut entries, self.params.ttl);

        let Some(entry) = entries.get(fingerprint) else {
            return Self::miss_message();
        };

        let total = entry.records.len();
        let label = entry.kind.label();
        let default_title = format!("{} Report - {total} records", entry.kind.api_name());
        let title = title.unwrap_or(&default_title);

        match self.renderer.render(&entry.records, entry.kind, title) {
            Ok(path) => format!(
                "Report generated with {total} {label}.\n{}",
                markers::send_file(&path)
            ),
            Err(e) => format!("Error generating report: {e}"),
        }
    }

    #[cfg(test)]
    fn backdate(&self, fingerprint: &str, age: Duration) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(fingerprint) {
            entry.created_at = Instant::now() - age;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmpilot_core::error::ReportError;
    use serde_json::json;
    use std::path::PathBuf;

    struct FakeRenderer;

    impl ReportRenderer for FakeRenderer {
        fn render(
            &self,
            records: &[Record],
            kind: EntityKind,
            _title: &str,
        ) -> Result<PathBuf, ReportError> {
            Ok(PathBuf::from(format!(
                "/tmp/{}_{}.csv",
                kind.label(),
                records.len()
            )))
        }
    }

    fn cache() -> ResultCache {
        ResultCache::new(CacheParams::default(), Arc::new(FakeRenderer))
    }

    fn leads(n: usize) -> Vec<Record> {
        (1..=n)
            .map(|i| {
                render::test_record(&[
                    ("id", json!(i.to_string())),
                    ("First_Name", json!("Lead")),
                    ("Last_Name", json!(format!("{i}"))),
                    ("Company", json!("Acme")),
                    ("Lead_Status", json!("New")),
                ])
            })
            .collect()
    }

    fn fingerprint_of(summary: &str) -> String {
        markers::extract_fingerprints(summary).remove(0)
    }

    #[test]
    fn threshold_is_strictly_greater() {
        let cache = cache();
        assert!(!cache.is_large(50));
        assert!(cache.is_large(51));
    }

    #[test]
    fn summary_previews_first_five_with_marker() {
        let cache = cache();
        let summary = cache.summarize_and_cache(leads(73), EntityKind::Leads);

        assert!(summary.starts_with("Found 73 leads (showing first 5 of 73):"));
        assert!(summary.contains("1. Lead 1 - Acme (New) [ID: 1]"));
        assert!(summary.contains("5. Lead 5 - Acme (New) [ID: 5]"));
        assert!(!summary.contains("6. Lead 6"));
        assert!(summary.contains("... and 68 more records."));
        assert!(summary.contains("This result set has 4 pages of 20 records each."));

        let fp = fingerprint_of(&summary);
        assert_eq!(fp.len(), 8);
        assert!(summary.contains(&format!("[LARGE_RESULT_SET:{fp}]")));
    }

    #[test]
    fn pages_are_non_overlapping_and_cover_everything() {
        let cache = cache();
        let summary = cache.summarize_and_cache(leads(73), EntityKind::Leads);
        let fp = fingerprint_of(&summary);

        let page1 = cache.get_page(&fp, 1);
        assert!(page1.starts_with("Page 1/4 (73 total leads):"));
        assert!(page1.contains("1. Lead 1 -"));
        assert!(page1.contains("20. Lead 20 -"));
        assert!(!page1.contains("21. Lead 21 -"));
        assert!(page1.contains("Showing 1-20 of 73."));
        assert!(page1.contains("page=2"));

        let page4 = cache.get_page(&fp, 4);
        assert!(page4.starts_with("Page 4/4 (73 total leads):"));
        assert!(page4.contains("61. Lead 61 -"));
        assert!(page4.contains("73. Lead 73 -"));
        assert!(page4.contains("Showing 61-73 of 73."));
        // Last page carries no next-page hint
        assert!(!page4.contains("Next page"));
    }

    #[test]
    fn page_bounds_are_rejected() {
        let cache = cache();
        let summary = cache.summarize_and_cache(leads(73), EntityKind::Leads);
        let fp = fingerprint_of(&summary);

        assert_eq!(cache.get_page(&fp, 0), "Invalid page 0. Valid range: 1-4");
        assert_eq!(cache.get_page(&fp, 5), "Invalid page 5. Valid range: 1-4");
    }

    #[test]
    fn unknown_fingerprint_gets_rerun_instruction() {
        let cache = cache();
        let response = cache.get_page("nonexistent-id", 1);
        assert!(response.contains("Result set expired or not found"));
        assert!(response.contains("re-run the original search"));
    }

    #[test]
    fn expired_entry_is_swept_not_served() {
        let cache = cache();
        let summary = cache.summarize_and_cache(leads(60), EntityKind::Leads);
        let fp = fingerprint_of(&summary);

        cache.backdate(&fp, Duration::from_secs(601));
        let response = cache.get_page(&fp, 1);
        assert!(response.contains("Result set expired or not found"));
    }

    #[test]
    fn same_records_cached_twice_get_independent_fingerprints() {
        let cache = cache();
        let records = leads(60);
        let fp1 = fingerprint_of(&cache.summarize_and_cache(records.clone(), EntityKind::Leads));
        let fp2 = fingerprint_of(&cache.summarize_and_cache(records, EntityKind::Leads));
        assert_ne!(fp1, fp2);
        // Both remain independently pageable
        assert!(cache.get_page(&fp1, 1).starts_with("Page 1/3"));
        assert!(cache.get_page(&fp2, 1).starts_with("Page 1/3"));
    }

    #[test]
    fn export_embeds_send_file_marker() {
        let cache = cache();
        let summary = cache.summarize_and_cache(leads(60), EntityKind::Leads);
        let fp = fingerprint_of(&summary);

        let response = cache.export(&fp, None);
        assert!(response.starts_with("Report generated with 60 leads."));
        assert!(response.contains("[SEND_FILE:/tmp/leads_60.csv]"));

        let expired = cache.export("missing", Some("My Report"));
        assert!(expired.contains("Result set expired or not found"));
    }
}
