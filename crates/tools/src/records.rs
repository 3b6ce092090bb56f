//! Generic record tools: create, get, update, delete, and search, built
//! once and instantiated per CRM module.
//!
//! Each instance owns its model-facing name ("create_lead", "search_deals")
//! and a per-module argument schema, so the model sees the same explicit
//! surface as hand-written wrappers would give it.

use std::sync::Arc;

use async_trait::async_trait;
use crmpilot_core::crm::{CrmClient, EntityKind, Record};
use crmpilot_core::error::ToolError;
use crmpilot_core::tool::{Tool, optional_str, required_str};
use serde_json::{Value, json};

use crate::render;
use crate::result_cache::ResultCache;

/// One model-facing argument mapped to a CRM API field.
struct FieldSpec {
    arg: &'static str,
    api: &'static str,
    required: bool,
    numeric: bool,
    help: &'static str,
}

const fn f(
    arg: &'static str,
    api: &'static str,
    required: bool,
    numeric: bool,
    help: &'static str,
) -> FieldSpec {
    FieldSpec {
        arg,
        api,
        required,
        numeric,
        help,
    }
}

fn field_specs(kind: EntityKind) -> &'static [FieldSpec] {
    match kind {
        EntityKind::Leads => const {
            &[
            f("last_name", "Last_Name", true, false, "The lead's last name"),
            f("company", "Company", true, false, "The lead's company"),
            f("first_name", "First_Name", false, false, "The lead's first name"),
            f("email", "Email", false, false, "Email address"),
            f("phone", "Phone", false, false, "Phone number"),
            f("lead_source", "Lead_Source", false, false, "Where the lead came from"),
            f("lead_status", "Lead_Status", false, false, "Current lead status"),
            f("industry", "Industry", false, false, "The lead's industry"),
        ]
        },
        EntityKind::Contacts => const {
            &[
            f("last_name", "Last_Name", true, false, "The contact's last name"),
            f("first_name", "First_Name", false, false, "The contact's first name"),
            f("email", "Email", false, false, "Email address"),
            f("phone", "Phone", false, false, "Phone number"),
            f("title", "Title", false, false, "Job title"),
            f("department", "Department", false, false, "Department"),
        ]
        },
        EntityKind::Accounts => const {
            &[
            f("account_name", "Account_Name", true, false, "The account's name"),
            f("phone", "Phone", false, false, "Phone number"),
            f("website", "Website", false, false, "Website URL"),
            f("industry", "Industry", false, false, "Industry"),
            f("description", "Description", false, false, "Free-text description"),
        ]
        },
        EntityKind::Deals => const {
            &[
            f("deal_name", "Deal_Name", true, false, "The deal's name"),
            f("stage", "Stage", true, false, "Pipeline stage"),
            f("amount", "Amount", false, true, "Deal amount"),
            f("closing_date", "Closing_Date", false, false, "Expected close date (YYYY-MM-DD)"),
            f("description", "Description", false, false, "Free-text description"),
        ]
        },
        EntityKind::Products => const {
            &[
            f("product_name", "Product_Name", true, false, "The product's name"),
            f("unit_price", "Unit_Price", false, true, "Price per unit"),
            f("product_code", "Product_Code", false, false, "Internal product code"),
            f("description", "Description", false, false, "Free-text description"),
        ]
        },
        // Other modules only get search/get through the cross-module tools
        _ => &[],
    }
}

/// "lead" -> "Lead", "sales_order" -> "Sales order".
fn title_of(kind: EntityKind) -> String {
    let singular = kind.singular().replace('_', " ");
    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => singular,
    }
}

fn id_arg(kind: EntityKind) -> String {
    format!("{}_id", kind.singular())
}

fn schema_from_specs(specs: &[FieldSpec], extra_required: Option<(String, &str)>) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    if let Some((name, help)) = &extra_required {
        required.push(json!(name));
        properties.insert(name.clone(), json!({"type": "string", "description": help}));
    }
    for spec in specs {
        let ty = if spec.numeric { "number" } else { "string" };
        properties.insert(
            spec.arg.to_string(),
            json!({"type": ty, "description": spec.help}),
        );
        if spec.required && extra_required.is_none() {
            required.push(json!(spec.arg));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

/// Build a CRM field map from tool arguments. When `require` is false every
/// field is optional (the update path).
fn fields_from_args(
    args: &Value,
    specs: &[FieldSpec],
    require: bool,
) -> Result<Record, ToolError> {
    let mut fields = Record::new();
    for spec in specs {
        if spec.numeric {
            if let Some(n) = args.get(spec.arg).and_then(Value::as_f64) {
                fields.insert(spec.api.to_string(), json!(n));
            }
            continue;
        }
        if spec.required && require {
            let value = required_str(args, spec.arg)?;
            fields.insert(spec.api.to_string(), json!(value));
        } else if let Some(value) = optional_str(args, spec.arg) {
            fields.insert(spec.api.to_string(), json!(value));
        }
    }
    Ok(fields)
}

// --- create ---

pub struct CreateRecordTool {
    kind: EntityKind,
    crm: Arc<dyn CrmClient>,
    name: String,
    description: String,
}

impl CreateRecordTool {
    pub fn new(kind: EntityKind, crm: Arc<dyn CrmClient>) -> Self {
        Self {
            name: format!("create_{}", kind.singular()),
            description: format!("Create a new {} in the CRM.", kind.singular().replace('_', " ")),
            kind,
            crm,
        }
    }
}

#[async_trait]
impl Tool for CreateRecordTool {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn parameters_schema(&self) -> Value {
        schema_from_specs(field_specs(self.kind), None)
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let fields = fields_from_args(&arguments, field_specs(self.kind), true)?;
        let id = self.crm.create_record(self.kind, fields).await?;
        let title = title_of(self.kind);
        Ok(format!("{title} created successfully!\n{title} ID: {id}"))
    }
}

// --- get ---

pub struct GetRecordTool {
    kind: EntityKind,
    crm: Arc<dyn CrmClient>,
    name: String,
    description: String,
}

impl GetRecordTool {
    pub fn new(kind: EntityKind, crm: Arc<dyn CrmClient>) -> Self {
        Self {
            name: format!("get_{}", kind.singular()),
            description: format!(
                "Get full details of a {} by its CRM ID.",
                kind.singular().replace('_', " ")
            ),
            kind,
            crm,
        }
    }
}

#[async_trait]
impl Tool for GetRecordTool {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn parameters_schema(&self) -> Value {
        let id_arg = id_arg(self.kind);
        json!({
            "type": "object",
            "properties": {
                id_arg.clone(): { "type": "string", "description": "The CRM record ID" }
            },
            "required": [id_arg]
        })
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let id = required_str(&arguments, &id_arg(self.kind))?;
        let record = self.crm.get_record(self.kind, id).await?;
        Ok(format!(
            "{} Details:\n\n{}",
            title_of(self.kind),
            render::details(&record)
        ))
    }
}

// --- update ---

pub struct UpdateRecordTool {
    kind: EntityKind,
    crm: Arc<dyn CrmClient>,
    name: String,
    description: String,
}

impl UpdateRecordTool {
    pub fn new(kind: EntityKind, crm: Arc<dyn CrmClient>) -> Self {
        Self {
            name: format!("update_{}", kind.singular()),
            description: format!(
                "Update fields on an existing {}. Only provided fields change.",
                kind.singular().replace('_', " ")
            ),
            kind,
            crm,
        }
    }
}

#[async_trait]
impl Tool for UpdateRecordTool {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn parameters_schema(&self) -> Value {
        schema_from_specs(field_specs(self.kind), Some((id_arg(self.kind), "The CRM record ID")))
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let id = required_str(&arguments, &id_arg(self.kind))?;
        let fields = fields_from_args(&arguments, field_specs(self.kind), false)?;
        if fields.is_empty() {
            return Ok("No fields provided to update".to_string());
        }
        self.crm.update_record(self.kind, id, fields).await?;
        let title = title_of(self.kind);
        Ok(format!("{title} updated successfully!\n{title} ID: {id}"))
    }
}

// --- delete ---

pub struct DeleteRecordTool {
    kind: EntityKind,
    crm: Arc<dyn CrmClient>,
    name: String,
    description: String,
}

impl DeleteRecordTool {
    pub fn new(kind: EntityKind, crm: Arc<dyn CrmClient>) -> Self {
        Self {
            name: format!("delete_{}", kind.singular()),
            description: format!(
                "Permanently delete a {} by its CRM ID.",
                kind.singular().replace('_', " ")
            ),
            kind,
            crm,
        }
    }
}

#[async_trait]
impl Tool for DeleteRecordTool {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn parameters_schema(&self) -> Value {
        let id_arg = id_arg(self.kind);
        json!({
            "type": "object",
            "properties": {
                id_arg.clone(): { "type": "string", "description": "The CRM record ID" }
            },
            "required": [id_arg]
        })
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let id = required_str(&arguments, &id_arg(self.kind))?;
        self.crm.delete_record(self.kind, id).await?;
        Ok(format!(
            "{} deleted successfully! ID: {id}",
            title_of(self.kind)
        ))
    }
}

// --- search ---

pub struct SearchRecordsTool {
    kind: EntityKind,
    crm: Arc<dyn CrmClient>,
    cache: Arc<ResultCache>,
    name: String,
    description: String,
}

impl SearchRecordsTool {
    pub fn new(kind: EntityKind, crm: Arc<dyn CrmClient>, cache: Arc<ResultCache>) -> Self {
        Self {
            name: format!("search_{}", kind.label()),
            description: format!(
                "Search {} with a criteria expression, e.g. (Last_Name:contains:Smith). \
                 Without criteria, lists the most recent records.",
                kind.label()
            ),
            kind,
            crm,
            cache,
        }
    }
}

#[async_trait]
impl Tool for SearchRecordsTool {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "criteria": {
                    "type": "string",
                    "description": "Search criteria in (Field:operator:value) form. Operators: equals, contains, starts_with."
                }
            },
            "required": []
        })
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let records = match optional_str(&arguments, "criteria") {
            Some(criteria) => self.crm.search_records(self.kind, criteria).await?,
            None => self.crm.list_records(self.kind, 200).await?,
        };

        if records.is_empty() {
            return Ok(format!("No {} found.", self.kind.label()));
        }
        if self.cache.is_large(records.len()) {
            return Ok(self.cache.summarize_and_cache(records, self.kind));
        }
        Ok(render::listing(
            &records,
            self.kind,
            &format!("{}(s)", self.kind.singular()),
        ))
    }
}

// --- lead conversion ---

pub struct ConvertLeadTool {
    crm: Arc<dyn CrmClient>,
}

impl ConvertLeadTool {
    pub fn new(crm: Arc<dyn CrmClient>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for ConvertLeadTool {
    fn name(&self) -> &str {
        "convert_lead_to_contact"
    }
    fn description(&self) -> &str {
        "Convert a lead into a contact (and account). Use when a lead becomes a real customer relationship."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "lead_id": { "type": "string", "description": "The CRM lead ID to convert" }
            },
            "required": ["lead_id"]
        })
    }
    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let lead_id = required_str(&arguments, "lead_id")?;
        let details = self.crm.convert_lead(lead_id).await?;

        let mut output = String::from("Lead converted successfully!\n\n");
        for (label, key) in [("Contact", "Contacts"), ("Account", "Accounts"), ("Deal", "Deals")] {
            if let Some(id) = details.get(key).and_then(Value::as_str) {
                output.push_str(&format!("{label} ID: {id}\n"));
            }
        }
        Ok(output)
    }
}
