use std::sync::Arc;

use crate::application::lookup::LookupService;
use crate::application::records::AdminRecordService;
use crate::domain::language::SupportedLanguages;
use crate::infra::db::PostgresRepositories;

/// Shared by the public and admin routers.
#[derive(Clone)]
pub struct HttpState {
    pub lookup: Arc<LookupService>,
    pub records: Arc<AdminRecordService>,
    pub languages: SupportedLanguages,
    /// Checked by `/health`; absent with the in-memory record store.
    pub db: Option<Arc<PostgresRepositories>>,
}
