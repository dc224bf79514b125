use std::sync::Arc;

use crate::logic::audit::AuditStore;
use crate::logic::model::ScoringService;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// `None` when the model artifact failed to load at startup; scoring
    /// endpoints degrade to 503 while the rest of the service stays up.
    pub service: Option<Arc<ScoringService>>,
    pub audit: Arc<AuditStore>,
}
