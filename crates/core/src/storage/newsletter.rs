use crate::domain::newsletter::{NewsletterPreferences, NewsletterSubscription};
use crate::notify::{Notification, Notifier};
use crate::storage::kv::KeyValueStore;
use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub const SUBSCRIPTIONS_KEY: &str = "newsletter_subscriptions";

/// Locally persisted newsletter subscriptions, keyed by email.
///
/// The whole list is loaded once at construction and rewritten on every change. Store writes
/// run on the blocking pool, one at a time. Errors never escape: they are logged, turned into
/// an error notification and reported as `None`/`false`.
pub struct NewsletterService {
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    latency: Duration,
    subscriptions: Mutex<Vec<NewsletterSubscription>>,
    write_gate: tokio::sync::Mutex<()>,
}

impl NewsletterService {
    pub fn load(
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        latency: Duration,
    ) -> Self {
        let subscriptions = match read_subscriptions(store.as_ref()) {
            Ok(list) => {
                tracing::debug!(count = list.len(), "newsletter subscriptions loaded");
                list
            }
            Err(err) => {
                tracing::error!(error = ?err, "failed to load newsletter subscriptions");
                Vec::new()
            }
        };

        Self {
            store,
            notifier,
            latency,
            subscriptions: Mutex::new(subscriptions),
            write_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Creates or updates the subscription for `preferences.email`.
    ///
    /// An update keeps the existing `id` and `created_at` and reactivates the record.
    pub async fn subscribe(
        &self,
        preferences: NewsletterPreferences,
    ) -> Option<NewsletterSubscription> {
        self.simulate_latency().await;

        if !is_plausible_email(&preferences.email) {
            tracing::warn!(email = %preferences.email, "rejecting newsletter subscription");
            self.notifier.notify(Notification::error(
                "Invalid email address",
                "Please enter a valid email address.",
            ));
            return None;
        }

        let _gate = self.write_gate.lock().await;
        let (next, record, updated) = {
            let mut next = self.subscriptions.lock().clone();
            let (record, updated) = match next
                .iter_mut()
                .find(|s| s.preferences.email == preferences.email)
            {
                Some(existing) => {
                    existing.preferences = preferences.clone();
                    existing.is_active = true;
                    (existing.clone(), true)
                }
                None => {
                    let record = NewsletterSubscription {
                        id: format!("sub_{}", uuid::Uuid::new_v4().simple()),
                        created_at: Utc::now(),
                        preferences: preferences.clone(),
                        is_active: true,
                    };
                    next.push(record.clone());
                    (record, false)
                }
            };

            (next, record, updated)
        };
        let result = self
            .persist(&next)
            .await
            .map(|()| {
                *self.subscriptions.lock() = next;
                (record, updated)
            });

        match result {
            Ok((record, true)) => {
                tracing::info!(id = %record.id, "newsletter preferences updated");
                self.notifier.notify(Notification::success(
                    "Newsletter preferences updated",
                    "You'll receive updates based on your new preferences.",
                ));
                Some(record)
            }
            Ok((record, false)) => {
                tracing::info!(id = %record.id, "newsletter subscription created");
                self.notifier.notify(Notification::success(
                    "Newsletter subscription confirmed",
                    format!(
                        "You'll receive {} updates to {}.",
                        preferences.frequency.as_str(),
                        preferences.email
                    ),
                ));
                Some(record)
            }
            Err(err) => {
                tracing::error!(error = ?err, "error subscribing to newsletter");
                self.notifier.notify(Notification::error(
                    "Failed to process subscription",
                    "Please try again later.",
                ));
                None
            }
        }
    }

    /// Deactivates the active subscription for `email`. Records are never removed.
    pub async fn unsubscribe(&self, email: &str) -> bool {
        self.simulate_latency().await;

        let _gate = self.write_gate.lock().await;
        let next = {
            let mut next = self.subscriptions.lock().clone();
            let found = match next
                .iter_mut()
                .find(|s| s.preferences.email == email && s.is_active)
            {
                Some(existing) => {
                    existing.is_active = false;
                    true
                }
                None => false,
            };
            found.then_some(next)
        };
        let result = match next {
            None => None,
            Some(next) => Some(self.persist(&next).await.map(|()| {
                *self.subscriptions.lock() = next;
            })),
        };

        match result {
            None => {
                self.notifier.notify(Notification::error(
                    "Subscription not found",
                    "No active subscription found for this email.",
                ));
                false
            }
            Some(Ok(())) => {
                tracing::info!("newsletter subscription deactivated");
                self.notifier.notify(Notification::success(
                    "Unsubscribed successfully",
                    "You won't receive any more newsletter emails.",
                ));
                true
            }
            Some(Err(err)) => {
                tracing::error!(error = ?err, "error unsubscribing from newsletter");
                self.notifier.notify(Notification::error(
                    "Failed to process unsubscription",
                    "Please try again later.",
                ));
                false
            }
        }
    }

    /// The active subscription for `email`, if any.
    pub fn get_subscription(&self, email: &str) -> Option<NewsletterSubscription> {
        self.subscriptions
            .lock()
            .iter()
            .find(|s| s.preferences.email == email && s.is_active)
            .cloned()
    }

    async fn persist(&self, subs: &[NewsletterSubscription]) -> Result<()> {
        let raw = serde_json::to_string(subs).context("failed to encode subscriptions")?;
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.set(SUBSCRIPTIONS_KEY, &raw))
            .await
            .context("subscription write task failed")?
            .context("failed to save newsletter subscriptions")
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn read_subscriptions(store: &dyn KeyValueStore) -> Result<Vec<NewsletterSubscription>> {
    match store.get(SUBSCRIPTIONS_KEY)? {
        Some(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("{SUBSCRIPTIONS_KEY} is not a valid subscription list")),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::newsletter::Frequency;
    use crate::notify::{NotificationLevel, NotificationLog};
    use crate::storage::kv::MemoryStore;

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn prefs(email: &str, frequency: Frequency) -> NewsletterPreferences {
        NewsletterPreferences {
            email: email.to_string(),
            frequency,
            include_sector_analysis: true,
            include_top_stocks: true,
            include_news_digest: false,
            include_predictions: false,
        }
    }

    fn service(store: Arc<dyn KeyValueStore>) -> (NewsletterService, Arc<NotificationLog>) {
        let log = NotificationLog::new(16);
        let svc = NewsletterService::load(store, log.clone(), Duration::ZERO);
        (svc, log)
    }

    #[tokio::test]
    async fn resubscribe_updates_in_place() {
        let store = Arc::new(MemoryStore::new());
        let (svc, log) = service(store.clone());

        let first = svc
            .subscribe(prefs("a@example.com", Frequency::Weekly))
            .await
            .unwrap();
        assert!(first.id.starts_with("sub_"));

        let second = svc
            .subscribe(prefs("a@example.com", Frequency::Daily))
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.preferences.frequency, Frequency::Daily);

        let persisted: Vec<NewsletterSubscription> =
            serde_json::from_str(&store.get(SUBSCRIPTIONS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted.len(), 1);

        let titles: Vec<_> = log.recent().into_iter().map(|n| n.title).collect();
        assert_eq!(
            titles,
            vec!["Newsletter subscription confirmed", "Newsletter preferences updated"]
        );
    }

    #[tokio::test]
    async fn unsubscribe_soft_deletes_and_resubscribe_reactivates() {
        let (svc, log) = service(Arc::new(MemoryStore::new()));
        let sub = svc
            .subscribe(prefs("b@example.com", Frequency::Monthly))
            .await
            .unwrap();

        assert!(svc.unsubscribe("b@example.com").await);
        assert!(svc.get_subscription("b@example.com").is_none());

        // Already inactive.
        assert!(!svc.unsubscribe("b@example.com").await);
        assert_eq!(log.recent().last().unwrap().title, "Subscription not found");

        let again = svc
            .subscribe(prefs("b@example.com", Frequency::Monthly))
            .await
            .unwrap();
        assert_eq!(again.id, sub.id);
        assert!(svc.get_subscription("b@example.com").unwrap().is_active);
    }

    #[tokio::test]
    async fn subscriptions_survive_reload() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let (svc, _) = service(store.clone());
        svc.subscribe(prefs("c@example.com", Frequency::Weekly))
            .await
            .unwrap();

        let (reloaded, _) = service(store);
        assert!(reloaded.get_subscription("c@example.com").is_some());
        assert!(reloaded.get_subscription("nobody@example.com").is_none());
    }

    #[tokio::test]
    async fn write_failure_is_reported_not_raised() {
        let (svc, log) = service(Arc::new(ReadOnlyStore));
        assert!(svc
            .subscribe(prefs("d@example.com", Frequency::Daily))
            .await
            .is_none());
        assert!(svc.get_subscription("d@example.com").is_none());

        let last = log.recent().pop().unwrap();
        assert_eq!(last.level, NotificationLevel::Error);
        assert_eq!(last.title, "Failed to process subscription");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_subscribers_are_all_persisted() {
        let store = Arc::new(MemoryStore::new());
        let (svc, _) = service(store.clone());

        let (a, b) = tokio::join!(
            svc.subscribe(prefs("f@example.com", Frequency::Daily)),
            svc.subscribe(prefs("g@example.com", Frequency::Weekly)),
        );
        assert!(a.is_some() && b.is_some());

        let persisted: Vec<NewsletterSubscription> =
            serde_json::from_str(&store.get(SUBSCRIPTIONS_KEY).unwrap().unwrap()).unwrap();
        let mut emails: Vec<_> = persisted.iter().map(|s| s.preferences.email.as_str()).collect();
        emails.sort();
        assert_eq!(emails, vec!["f@example.com", "g@example.com"]);
    }

    #[tokio::test]
    async fn corrupt_store_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(SUBSCRIPTIONS_KEY, "{not json").unwrap();
        let (svc, _) = service(store);
        assert!(svc.get_subscription("a@example.com").is_none());
    }

    #[tokio::test]
    async fn invalid_email_is_rejected() {
        let (svc, log) = service(Arc::new(MemoryStore::new()));
        assert!(svc.subscribe(prefs("not-an-email", Frequency::Daily)).await.is_none());
        assert_eq!(log.recent()[0].title, "Invalid email address");
        assert!(is_plausible_email("x@y.io"));
        assert!(!is_plausible_email("x@localhost"));
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_simulated() {
        let log = NotificationLog::new(4);
        let svc = NewsletterService::load(
            Arc::new(MemoryStore::new()),
            log,
            Duration::from_millis(800),
        );
        let started = tokio::time::Instant::now();
        svc.subscribe(prefs("e@example.com", Frequency::Daily))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(800));
    }
}
