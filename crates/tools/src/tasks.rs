//! Task tools: creation, per-record lookup, filtered search, and the paced
//! multi-lead check.

use std::sync::Arc;

use async_trait::async_trait;
use crmpilot_core::crm::{CrmClient, EntityKind, Record};
use crmpilot_core::error::ToolError;
use crmpilot_core::tool::{Tool, optional_str, required_str};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::pacer::Pacer;
use crate::render;
use crate::result_cache::ResultCache;

/// Modules checked, in order, when a record ID arrives without its module.
const TASK_LOOKUP_MODULES: [EntityKind; 4] = [
    EntityKind::Leads,
    EntityKind::Contacts,
    EntityKind::Deals,
    EntityKind::Accounts,
];

/// Multi-line task rendering shared by the task listings. Includes the
/// related-record line when What_Id is present.
fn task_block(index: usize, task: &Record) -> String {
    let mut block = format!(
        "{index}. {}\n   Status: {}\n   Priority: {}\n   Due: {}\n",
        render::field(task, "Subject"),
        render::field(task, "Status"),
        render::field(task, "Priority"),
        render::field(task, "Due_Date"),
    );
    match task.get("What_Id") {
        Some(Value::Object(what)) => {
            let id = what.get("id").and_then(Value::as_str).unwrap_or_default();
            match what.get("name").and_then(Value::as_str) {
                Some(name) => block.push_str(&format!("   Related to: {name} (ID: {id})\n")),
                None => block.push_str(&format!("   Related ID: {id}\n")),
            }
        }
        Some(Value::String(id)) => block.push_str(&format!("   Related ID: {id}\n")),
        _ => {}
    }
    block.push_str(&format!("   Task ID: {}\n\n", render::field(task, "id")));
    block
}

// --- create ---

pub struct CreateTaskTool {
    crm: Arc<dyn CrmClient>,
}

impl CreateTaskTool {
    pub fn new(crm: Arc<dyn CrmClient>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for CreateTaskTool {
    fn name(&self) -> &str {
        "create_task"
    }
    fn description(&self) -> &str {
        "Create a task, optionally related to a CRM record."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "subject": { "type": "string", "description": "What the task is about" },
                "related_to_id": { "type": "string", "description": "CRM record ID this task relates to" },
                "due_date": { "type": "string", "description": "Due date (YYYY-MM-DD)" },
                "priority": { "type": "string", "description": "High, Highest, Low, Lowest or Normal" },
                "status": { "type": "string", "description": "Task status, e.g. Not Started, In Progress, Completed" },
                "description": { "type": "string", "description": "Longer task description" }
            },
            "required": ["subject"]
        })
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let subject = required_str(&arguments, "subject")?;

        let mut fields = Record::new();
        fields.insert("Subject".into(), json!(subject));
        fields.insert(
            "Priority".into(),
            json!(optional_str(&arguments, "priority").unwrap_or("Normal")),
        );
        fields.insert(
            "Status".into(),
            json!(optional_str(&arguments, "status").unwrap_or("Not Started")),
        );
        if let Some(what_id) = optional_str(&arguments, "related_to_id") {
            fields.insert("What_Id".into(), json!(what_id));
        }
        if let Some(due) = optional_str(&arguments, "due_date") {
            fields.insert("Due_Date".into(), json!(due));
        }
        if let Some(description) = optional_str(&arguments, "description") {
            fields.insert("Description".into(), json!(description));
        }

        let task_id = self.crm.create_task(fields).await?;
        Ok(format!(
            "Task created successfully!\nTask ID: {task_id}\nSubject: {subject}"
        ))
    }
}

// --- per-record lookup ---

pub struct GetTasksForRecordTool {
    crm: Arc<dyn CrmClient>,
}

impl GetTasksForRecordTool {
    pub fn new(crm: Arc<dyn CrmClient>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for GetTasksForRecordTool {
    fn name(&self) -> &str {
        "get_tasks_for_record"
    }
    fn description(&self) -> &str {
        "List tasks related to a CRM record. The record's module is discovered automatically when not given."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "record_id": { "type": "string", "description": "The CRM record ID" },
                "module": {
                    "type": "string",
                    "description": "Optional module the record belongs to (Leads, Contacts, Deals, Accounts)"
                }
            },
            "required": ["record_id"]
        })
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let record_id = required_str(&arguments, "record_id")?;

        let modules: Vec<EntityKind> = match optional_str(&arguments, "module") {
            Some(module) => vec![module.parse().map_err(|_| {
                ToolError::InvalidArguments(format!("unknown module: {module}"))
            })?],
            None => TASK_LOOKUP_MODULES.to_vec(),
        };

        // An empty task search cannot distinguish "no tasks" from "no such
        // record", so membership is confirmed by fetching the record first.
        for kind in modules {
            match self.crm.get_record(kind, record_id).await {
                Ok(_) => {
                    let tasks = self.crm.tasks_for_record(kind, record_id).await?;
                    if tasks.is_empty() {
                        return Ok(format!(
                            "Found record in {kind}, but no tasks are associated with it."
                        ));
                    }
                    let mut output = format!("Found {} task(s) for this record:\n\n", tasks.len());
                    for (i, task) in tasks.iter().enumerate() {
                        output.push_str(&task_block(i + 1, task));
                    }
                    return Ok(output);
                }
                Err(e) => {
                    debug!(module = %kind, record_id, error = %e, "Record not in module, trying next");
                }
            }
        }

        Ok(format!("Record ID {record_id} not found in any module."))
    }
}

// --- filtered search ---

pub struct SearchTasksTool {
    crm: Arc<dyn CrmClient>,
    cache: Arc<ResultCache>,
}

impl SearchTasksTool {
    pub fn new(crm: Arc<dyn CrmClient>, cache: Arc<ResultCache>) -> Self {
        Self { crm, cache }
    }
}

#[async_trait]
impl Tool for SearchTasksTool {
    fn name(&self) -> &str {
        "search_tasks"
    }
    fn description(&self) -> &str {
        "Search tasks by status, priority, or subject. With no filters, lists recent tasks."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": { "type": "string", "description": "Exact status to match" },
                "priority": { "type": "string", "description": "Exact priority to match" },
                "subject_contains": { "type": "string", "description": "Substring of the task subject" }
            },
            "required": []
        })
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let mut clauses = Vec::new();
        if let Some(status) = optional_str(&arguments, "status") {
            clauses.push(format!("(Status:equals:{status})"));
        }
        if let Some(priority) = optional_str(&arguments, "priority") {
            clauses.push(format!("(Priority:equals:{priority})"));
        }
        if let Some(subject) = optional_str(&arguments, "subject_contains") {
            clauses.push(format!("(Subject:contains:{subject})"));
        }

        let tasks = if clauses.is_empty() {
            self.crm.list_records(EntityKind::Tasks, 200).await?
        } else {
            let criteria = if clauses.len() == 1 {
                clauses.remove(0)
            } else {
                format!("({})", clauses.join("and"))
            };
            self.crm.search_records(EntityKind::Tasks, &criteria).await?
        };

        if tasks.is_empty() {
            return Ok("No tasks found matching the criteria".to_string());
        }
        if self.cache.is_large(tasks.len()) {
            return Ok(self.cache.summarize_and_cache(tasks, EntityKind::Tasks));
        }

        let mut output = format!("Found {} task(s):\n\n", tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            output.push_str(&task_block(i + 1, task));
        }
        Ok(output)
    }
}

// --- paced multi-lead check ---

pub struct CheckMultipleLeadsForTasksTool {
    crm: Arc<dyn CrmClient>,
    pacer: Pacer,
}

impl CheckMultipleLeadsForTasksTool {
    pub fn new(crm: Arc<dyn CrmClient>, pacer: Pacer) -> Self {
        Self { crm, pacer }
    }
}

#[async_trait]
impl Tool for CheckMultipleLeadsForTasksTool {
    fn name(&self) -> &str {
        "check_multiple_leads_for_tasks"
    }
    fn description(&self) -> &str {
        "Check a batch of leads (up to 50) for associated tasks in one pass."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "record_ids": {
                    "type": "string",
                    "description": "Comma-separated lead IDs, at most 50"
                }
            },
            "required": ["record_ids"]
        })
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let raw = required_str(&arguments, "record_ids")?;
        let ids: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .collect();

        if ids.len() > 50 {
            return Ok(format!(
                "Too many records ({}). Please limit to 50 or fewer to avoid rate limits.",
                ids.len()
            ));
        }

        info!(count = ids.len(), "Checking leads for tasks");

        let mut with_tasks: Vec<(&str, Vec<Record>)> = Vec::new();
        let mut without_tasks: Vec<&str> = Vec::new();
        let mut failed: Vec<&str> = Vec::new();

        for (i, id) in ids.iter().enumerate() {
            match self.crm.tasks_for_record(EntityKind::Leads, id).await {
                Ok(tasks) if !tasks.is_empty() => with_tasks.push((id, tasks)),
                Ok(_) => without_tasks.push(id),
                Err(e) => {
                    debug!(record_id = id, error = %e, "Lead task check failed");
                    failed.push(id);
                }
            }
            self.pacer.pause_if_batch_end(i, ids.len()).await;
        }

        let mut output = format!("Task Check Results ({} leads):\n\n", ids.len());

        if !with_tasks.is_empty() {
            output.push_str(&format!("{} lead(s) WITH tasks:\n\n", with_tasks.len()));
            for (id, tasks) in &with_tasks {
                output.push_str(&format!("- Lead ID {id}: {} task(s)\n", tasks.len()));
                for task in tasks.iter().take(3) {
                    output.push_str(&format!(
                        "  - {} (Due: {})\n",
                        render::field(task, "Subject"),
                        render::field(task, "Due_Date"),
                    ));
                }
                if tasks.len() > 3 {
                    output.push_str(&format!("  ... and {} more\n", tasks.len() - 3));
                }
                output.push('\n');
            }
        }
        if !without_tasks.is_empty() {
            output.push_str(&format!("{} lead(s) WITHOUT tasks\n\n", without_tasks.len()));
        }
        if !failed.is_empty() {
            output.push_str(&format!(
                "{} lead(s) could not be checked: {}\n",
                failed.len(),
                failed[..failed.len().min(5)].join(", ")
            ));
        }

        Ok(output)
    }
}
