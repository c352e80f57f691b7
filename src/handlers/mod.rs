// HTTP handlers

pub mod forms;
pub mod sessions;

use uuid::Uuid;

/// Page of one wizard session
pub(crate) fn session_url(id: &Uuid) -> String {
    format!("/sessions/{}", id)
}
