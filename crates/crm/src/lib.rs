//! Remote CRM client for CRMPilot.
//!
//! Implements `crmpilot_core::CrmClient` against a Zoho-style REST API:
//! OAuth refresh-token authentication, per-module record CRUD, and the
//! criteria/email/phone/word search endpoints.

pub mod http_client;

pub use http_client::{CrmCredentials, HttpCrmClient};
