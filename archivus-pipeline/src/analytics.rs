//! Non-blocking view/download/share counters. Unlike [`crate::audit`],
//! backpressure here is drop-with-alert: an analytics counter is allowed to
//! lose an increment under sustained load rather than buffer unboundedly,
//! per the policy note in §9.

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::store::InMemoryStore;

const CHANNEL_CAPACITY: usize = 256;

enum AnalyticsEvent {
    View(Uuid),
    Download(Uuid),
    Share(Uuid),
}

#[derive(Clone)]
pub struct AnalyticsHooks {
    sender: mpsc::Sender<AnalyticsEvent>,
}

impl AnalyticsHooks {
    pub fn spawn(store: InMemoryStore) -> Self {
        let (sender, mut receiver) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                match event {
                    AnalyticsEvent::View(document_id) => store.bump_analytics(document_id, |a| {
                        a.view_count += 1;
                        a.last_viewed_at = Some(Utc::now());
                    }),
                    AnalyticsEvent::Download(document_id) => {
                        store.bump_analytics(document_id, |a| a.download_count += 1)
                    }
                    AnalyticsEvent::Share(document_id) => {
                        store.bump_analytics(document_id, |a| a.share_count += 1)
                    }
                }
            }
        });

        Self { sender }
    }

    pub fn record_view(&self, document_id: Uuid) {
        self.send(AnalyticsEvent::View(document_id));
    }

    pub fn record_download(&self, document_id: Uuid) {
        self.send(AnalyticsEvent::Download(document_id));
    }

    pub fn record_share(&self, document_id: Uuid) {
        self.send(AnalyticsEvent::Share(document_id));
    }

    fn send(&self, event: AnalyticsEvent) {
        if self.sender.try_send(event).is_err() {
            warn!("analytics channel full or closed, dropping counter update");
        }
    }
}
