// Debounced draft auto-save
//
// Value changes are coalesced until the form has been quiet for the
// configured delay, then the latest values are saved. One worker per
// session saves one draft at a time, so an older draft can never land
// after a newer one. Dropping the saver cancels any pending save.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::api_client::FormApi;

pub struct DraftAutosaver {
    sender: watch::Sender<Option<Value>>,
    worker: JoinHandle<()>,
}

impl DraftAutosaver {
    pub fn spawn(api: Arc<dyn FormApi>, form_id: String, delay: Duration) -> Self {
        let (sender, receiver) = watch::channel(None);
        let worker = tokio::spawn(run(api, form_id, delay, receiver));
        Self { sender, worker }
    }

    /// Schedule a save of `data`, replacing anything not yet saved
    pub fn notify(&self, data: Value) {
        self.sender.send_replace(Some(data));
    }
}

impl Drop for DraftAutosaver {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run(api: Arc<dyn FormApi>, form_id: String, delay: Duration, mut receiver: watch::Receiver<Option<Value>>) {
    while receiver.changed().await.is_ok() {
        // Restart the timer on every change until the form goes quiet
        loop {
            tokio::select! {
                changed = receiver.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = tokio::time::sleep(delay) => break,
            }
        }

        let data = receiver.borrow_and_update().clone();
        let Some(data) = data else {
            continue;
        };

        match api.save_draft(&form_id, &data).await {
            Ok(draft) => tracing::debug!(form_id = %form_id, draft_id = %draft.id, "Saved draft"),
            Err(e) => tracing::warn!(form_id = %form_id, "Draft auto-save failed: {:#}", e),
        }
    }
}
