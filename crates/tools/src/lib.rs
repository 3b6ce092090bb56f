//! Built-in tool implementations for CRMPilot.
//!
//! Tools give the model the ability to operate the CRM: create, fetch,
//! update, delete and search records, manage tasks, and browse or export
//! large result sets through the bounded result cache.
//!
//! `builtin_registry` is the single place the tool surface is assembled;
//! the catalogue the model sees and the registry the loop dispatches into
//! are always the same closed set.

pub mod pacer;
pub mod paging;
pub mod records;
pub mod registry;
pub mod render;
pub mod report;
pub mod result_cache;
pub mod search;
pub mod tasks;

pub use pacer::Pacer;
pub use registry::ToolRegistry;
pub use report::CsvReportWriter;
pub use result_cache::{CacheParams, ResultCache};

use std::sync::Arc;

use crmpilot_core::crm::{CrmClient, EntityKind};

/// The modules that get the full generic CRUD + search tool set.
const CRUD_MODULES: [EntityKind; 5] = [
    EntityKind::Leads,
    EntityKind::Contacts,
    EntityKind::Accounts,
    EntityKind::Deals,
    EntityKind::Products,
];

/// Create the registry with every built-in tool.
pub fn builtin_registry(
    crm: Arc<dyn CrmClient>,
    cache: Arc<ResultCache>,
    pacer: Pacer,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    for kind in CRUD_MODULES {
        registry.register(Box::new(records::CreateRecordTool::new(kind, crm.clone())));
        registry.register(Box::new(records::GetRecordTool::new(kind, crm.clone())));
        registry.register(Box::new(records::UpdateRecordTool::new(kind, crm.clone())));
        registry.register(Box::new(records::DeleteRecordTool::new(kind, crm.clone())));
        registry.register(Box::new(records::SearchRecordsTool::new(
            kind,
            crm.clone(),
            cache.clone(),
        )));
    }

    registry.register(Box::new(records::ConvertLeadTool::new(crm.clone())));

    registry.register(Box::new(tasks::CreateTaskTool::new(crm.clone())));
    registry.register(Box::new(tasks::GetTasksForRecordTool::new(crm.clone())));
    registry.register(Box::new(tasks::SearchTasksTool::new(crm.clone(), cache.clone())));
    registry.register(Box::new(tasks::CheckMultipleLeadsForTasksTool::new(
        crm.clone(),
        pacer,
    )));

    registry.register(Box::new(search::SearchByEmailTool::new(crm.clone())));
    registry.register(Box::new(search::SearchByPhoneTool::new(crm.clone())));
    registry.register(Box::new(search::SearchByWordTool::new(crm.clone(), cache.clone())));
    registry.register(Box::new(search::CountAllRecordsTool::new(crm.clone())));
    registry.register(Box::new(search::CrmHealthCheckTool::new(crm)));

    registry.register(Box::new(paging::BrowseResultPageTool::new(cache.clone())));
    registry.register(Box::new(paging::ExportResultsReportTool::new(cache)));

    registry
}
