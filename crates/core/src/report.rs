//! ReportRenderer trait — the file-generation collaborator behind the
//! result cache's export operation.

use std::path::PathBuf;

use crate::crm::{EntityKind, Record};
use crate::error::ReportError;

/// Renders a full record set to a file on disk and returns its path.
/// The caller embeds the path in a `[SEND_FILE:...]` marker; the transport
/// layer owns delivery and deletion.
pub trait ReportRenderer: Send + Sync {
    fn render(
        &self,
        records: &[Record],
        kind: EntityKind,
        title: &str,
    ) -> Result<PathBuf, ReportError>;
}
