//! HTTP surface: public lookups and the admin record API, served on separate
//! listeners.

mod admin;
mod error;
mod language;
mod middleware;
mod public;
mod state;

pub use admin::build_admin_router;
pub use error::{ApiError, ApiErrorBody, ApiErrorMessage, codes};
pub use language::{RequestLanguage, preferred_language};
pub use middleware::{RequestContext, log_responses, set_request_context};
pub use public::{TextLookup, ValueLookup, build_public_router};
pub use state::HttpState;
