// Backend access and session state

pub mod api_client;
pub mod autosave;
pub mod form_source;
pub mod serializers;
pub mod sessions;
