//! Cross-module search tools: lookups by email, phone, or free word, plus
//! record counting and the API health check.

use std::sync::Arc;

use async_trait::async_trait;
use crmpilot_core::crm::{CrmClient, EntityKind, Record};
use crmpilot_core::error::ToolError;
use crmpilot_core::tool::{Tool, int_or, required_str};
use serde_json::{Value, json};
use tracing::info;

use crate::render;
use crate::result_cache::ResultCache;

fn parse_module(arguments: &Value) -> Result<EntityKind, ToolError> {
    let module = required_str(arguments, "module")?;
    module
        .parse()
        .map_err(|_| ToolError::InvalidArguments(format!("unknown module: {module}")))
}

fn module_schema(extra: &str, extra_help: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "module": {
                "type": "string",
                "description": "CRM module to search, e.g. Leads, Contacts, Accounts, Deals"
            },
            extra: { "type": "string", "description": extra_help }
        },
        "required": ["module", extra]
    })
}

fn search_listing(records: &[Record], kind: EntityKind) -> String {
    if records.is_empty() {
        return "No records found".to_string();
    }
    render::listing(records, kind, "record(s)")
}

// --- by email ---

pub struct SearchByEmailTool {
    crm: Arc<dyn CrmClient>,
}

impl SearchByEmailTool {
    pub fn new(crm: Arc<dyn CrmClient>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for SearchByEmailTool {
    fn name(&self) -> &str {
        "search_by_email"
    }
    fn description(&self) -> &str {
        "Find records in a module by exact email address."
    }
    fn parameters_schema(&self) -> Value {
        module_schema("email", "The email address to look up")
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let kind = parse_module(&arguments)?;
        let email = required_str(&arguments, "email")?;
        let records = self.crm.search_by_email(kind, email).await?;
        Ok(search_listing(&records, kind))
    }
}

// --- by phone ---

pub struct SearchByPhoneTool {
    crm: Arc<dyn CrmClient>,
}

impl SearchByPhoneTool {
    pub fn new(crm: Arc<dyn CrmClient>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for SearchByPhoneTool {
    fn name(&self) -> &str {
        "search_by_phone"
    }
    fn description(&self) -> &str {
        "Find records in a module by phone number."
    }
    fn parameters_schema(&self) -> Value {
        module_schema("phone", "The phone number to look up")
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let kind = parse_module(&arguments)?;
        let phone = required_str(&arguments, "phone")?;
        let records = self.crm.search_by_phone(kind, phone).await?;
        Ok(search_listing(&records, kind))
    }
}

// --- by word ---

pub struct SearchByWordTool {
    crm: Arc<dyn CrmClient>,
    cache: Arc<ResultCache>,
}

impl SearchByWordTool {
    pub fn new(crm: Arc<dyn CrmClient>, cache: Arc<ResultCache>) -> Self {
        Self { crm, cache }
    }

    /// Per-module multi-line block for word matches.
    fn word_block(record: &Record, kind: EntityKind) -> String {
        let mut block = match kind {
            EntityKind::Leads => format!(
                "- {} - {}\n  Email: {}\n  Status: {}\n",
                render::person_name(record),
                render::field(record, "Company"),
                render::field(record, "Email"),
                render::field(record, "Lead_Status"),
            ),
            EntityKind::Contacts => format!(
                "- {}\n  Email: {}\n",
                render::person_name(record),
                render::field(record, "Email"),
            ),
            EntityKind::Accounts => format!(
                "- {}\n  Website: {}\n",
                render::field(record, "Account_Name"),
                render::field(record, "Website"),
            ),
            EntityKind::Deals => format!(
                "- {}\n  Amount: {}\n",
                render::field(record, "Deal_Name"),
                render::dollars(record.get("Amount").and_then(Value::as_f64).unwrap_or(0.0)),
            ),
            _ => {
                let name = ["Subject", "Name", "Product_Name"]
                    .iter()
                    .find_map(|key| record.get(*key).and_then(Value::as_str))
                    .unwrap_or("Unknown");
                format!("- {name}\n")
            }
        };
        block.push_str(&format!(
            "  Created: {}\n  ID: {}\n\n",
            render::field(record, "Created_Time"),
            render::field(record, "id"),
        ));
        block
    }
}

#[async_trait]
impl Tool for SearchByWordTool {
    fn name(&self) -> &str {
        "search_by_word"
    }
    fn description(&self) -> &str {
        "Full-text search across a module's records for a word or phrase."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "module": {
                    "type": "string",
                    "description": "CRM module to search, e.g. Leads, Contacts, Accounts, Deals"
                },
                "word": { "type": "string", "description": "The word or phrase to search for" }
            },
            "required": ["module", "word"]
        })
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let kind = parse_module(&arguments)?;
        let word = required_str(&arguments, "word")?;
        let records = self.crm.search_by_word(kind, word).await?;

        if records.is_empty() {
            return Ok(format!("No records found matching '{word}'"));
        }
        if self.cache.is_large(records.len()) {
            return Ok(self.cache.summarize_and_cache(records, kind));
        }

        let mut output = format!("Found {} record(s) matching '{word}':\n\n", records.len());
        for record in &records {
            output.push_str(&Self::word_block(record, kind));
        }
        Ok(output)
    }
}

// --- count ---

pub struct CountAllRecordsTool {
    crm: Arc<dyn CrmClient>,
}

impl CountAllRecordsTool {
    pub fn new(crm: Arc<dyn CrmClient>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for CountAllRecordsTool {
    fn name(&self) -> &str {
        "count_all_records"
    }
    fn description(&self) -> &str {
        "Count every record in a module."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "module": {
                    "type": "string",
                    "description": "CRM module to count, e.g. Leads, Contacts, Accounts"
                },
                "limit": {
                    "type": "integer",
                    "description": "Upper bound on records fetched (default 10000)"
                }
            },
            "required": ["module"]
        })
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let kind = parse_module(&arguments)?;
        let limit = int_or(&arguments, "limit", 10_000) as usize;

        info!(module = %kind, "Counting records");
        let records = self.crm.list_records(kind, limit).await?;
        Ok(format!(
            "Total: {} {} in your CRM",
            render::grouped_count(records.len()),
            kind.label()
        ))
    }
}

// --- health check ---

pub struct CrmHealthCheckTool {
    crm: Arc<dyn CrmClient>,
}

impl CrmHealthCheckTool {
    pub fn new(crm: Arc<dyn CrmClient>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for CrmHealthCheckTool {
    fn name(&self) -> &str {
        "crm_health_check"
    }
    fn description(&self) -> &str {
        "Check whether the CRM API is reachable and credentials work."
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {}, "required": [] })
    }
    async fn execute(&self, _arguments: Value) -> Result<String, ToolError> {
        match self.crm.health_check().await {
            Ok(()) => Ok("CRM API is healthy and accessible".to_string()),
            Err(e) => Ok(format!("Health check failed: {e}")),
        }
    }
}
