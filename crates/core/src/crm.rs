//! CRM boundary — the trait the tool handlers call through, plus the record
//! and entity-kind types shared by rendering and reporting.
//!
//! Handlers depend only on: failures surfacing as `CrmError`, and successful
//! list operations yielding ordered flat record maps. Everything else about
//! the remote service lives behind the implementing crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CrmError;

/// A CRM record: a flat field map as the remote service returns it.
/// Values are primitives, strings, or nested lookup objects; rendering
/// code picks out the handful of fields it knows about per entity kind.
pub type Record = serde_json::Map<String, Value>;

/// The CRM module an operation targets. Closed set; parses from and prints
/// as the remote API's module name (`Sales_Orders`, not `SalesOrders`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Leads,
    Contacts,
    Accounts,
    Deals,
    Products,
    Tasks,
    Vendors,
    Quotes,
    SalesOrders,
    PurchaseOrders,
    Invoices,
}

impl EntityKind {
    /// The module name on the remote API.
    pub fn api_name(&self) -> &'static str {
        match self {
            EntityKind::Leads => "Leads",
            EntityKind::Contacts => "Contacts",
            EntityKind::Accounts => "Accounts",
            EntityKind::Deals => "Deals",
            EntityKind::Products => "Products",
            EntityKind::Tasks => "Tasks",
            EntityKind::Vendors => "Vendors",
            EntityKind::Quotes => "Quotes",
            EntityKind::SalesOrders => "Sales_Orders",
            EntityKind::PurchaseOrders => "Purchase_Orders",
            EntityKind::Invoices => "Invoices",
        }
    }

    /// Singular snake-case form, used in tool names and argument keys.
    pub fn singular(&self) -> &'static str {
        match self {
            EntityKind::Leads => "lead",
            EntityKind::Contacts => "contact",
            EntityKind::Accounts => "account",
            EntityKind::Deals => "deal",
            EntityKind::Products => "product",
            EntityKind::Tasks => "task",
            EntityKind::Vendors => "vendor",
            EntityKind::Quotes => "quote",
            EntityKind::SalesOrders => "sales_order",
            EntityKind::PurchaseOrders => "purchase_order",
            EntityKind::Invoices => "invoice",
        }
    }

    /// Lowercased module label for user-facing counts ("leads",
    /// "sales_orders").
    pub fn label(&self) -> String {
        self.api_name().to_lowercase()
    }

    /// All kinds, in the order the cross-module search walks them.
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Leads,
            EntityKind::Contacts,
            EntityKind::Accounts,
            EntityKind::Deals,
            EntityKind::Products,
            EntityKind::Tasks,
            EntityKind::Vendors,
            EntityKind::Quotes,
            EntityKind::SalesOrders,
            EntityKind::PurchaseOrders,
            EntityKind::Invoices,
        ]
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.api_name())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = CrmError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Leads" => Ok(EntityKind::Leads),
            "Contacts" => Ok(EntityKind::Contacts),
            "Accounts" => Ok(EntityKind::Accounts),
            "Deals" => Ok(EntityKind::Deals),
            "Products" => Ok(EntityKind::Products),
            "Tasks" => Ok(EntityKind::Tasks),
            "Vendors" => Ok(EntityKind::Vendors),
            "Sales_Orders" | "SalesOrders" => Ok(EntityKind::SalesOrders),
            "Purchase_Orders" | "PurchaseOrders" => Ok(EntityKind::PurchaseOrders),
            "Quotes" => Ok(EntityKind::Quotes),
            "Invoices" => Ok(EntityKind::Invoices),
            other => Err(CrmError::InvalidResponse(format!("unknown module: {other}"))),
        }
    }
}

/// The remote business-data collaborator.
///
/// One method per operation shape the tool handlers need. List-returning
/// operations preserve the remote service's ordering; an empty result is an
/// empty `Vec`, never an error.
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Fetch a single record by ID.
    async fn get_record(&self, kind: EntityKind, id: &str) -> Result<Record, CrmError>;

    /// Create a record from a field map. Returns the new record's ID.
    async fn create_record(&self, kind: EntityKind, fields: Record) -> Result<String, CrmError>;

    /// Update fields on an existing record.
    async fn update_record(
        &self,
        kind: EntityKind,
        id: &str,
        fields: Record,
    ) -> Result<(), CrmError>;

    /// Delete a record by ID.
    async fn delete_record(&self, kind: EntityKind, id: &str) -> Result<(), CrmError>;

    /// List records for a module, up to `limit`.
    async fn list_records(&self, kind: EntityKind, limit: usize) -> Result<Vec<Record>, CrmError>;

    /// Search a module with a criteria expression (remote query syntax).
    async fn search_records(
        &self,
        kind: EntityKind,
        criteria: &str,
    ) -> Result<Vec<Record>, CrmError>;

    /// Search a module by exact email.
    async fn search_by_email(
        &self,
        kind: EntityKind,
        email: &str,
    ) -> Result<Vec<Record>, CrmError>;

    /// Search a module by exact phone number.
    async fn search_by_phone(
        &self,
        kind: EntityKind,
        phone: &str,
    ) -> Result<Vec<Record>, CrmError>;

    /// Full-text word search across a module's indexed fields.
    async fn search_by_word(&self, kind: EntityKind, word: &str) -> Result<Vec<Record>, CrmError>;

    /// Open tasks linked to a given record.
    async fn tasks_for_record(
        &self,
        kind: EntityKind,
        record_id: &str,
    ) -> Result<Vec<Record>, CrmError>;

    /// Create a task, optionally linked to a record.
    async fn create_task(&self, fields: Record) -> Result<String, CrmError>;

    /// Convert a lead into a contact (and optionally an account/deal).
    async fn convert_lead(&self, lead_id: &str) -> Result<Record, CrmError>;

    /// Cheap connectivity/auth check.
    async fn health_check(&self) -> Result<(), CrmError>;
}
