// ============================================================================
// Delivery Tracker
// ============================================================================
//
// Deduplication of at-least-once deliveries per (message, subscriber):
//
//   can_be_delivered  -> read record, evaluate
//   set_in_progress   -> unconditional write of IN_PROGRESS
//   set_as_delivered  -> read, require IN_PROGRESS, write DELIVERED
//   try_claim         -> evaluate + conditional write as one claim
//
// can_be_delivered followed by set_in_progress is two separate storage
// calls; two workers can both see "deliverable" and both start. try_claim
// closes that gap with the backend's compare-and-set.
//
// ============================================================================

use crate::decision;
use crate::storage::DeliveryStorage;
use chrono::{Duration, Utc};
use dedup_config::Config;
use dedup_error::{DedupError, DedupResult};
use dedup_types::{DeliveryKey, DeliveryRecord, Verdict};
use tracing::{debug, info, warn};

/// Attempts before a contended claim gives up and reports NoInProgress
const MAX_CLAIM_ATTEMPTS: u32 = 3;

/// Timing settings for the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSettings {
    /// How long an IN_PROGRESS record blocks redelivery
    pub max_acknowledge_time: Duration,
    /// TTL passed with every write, `None` leaves it to the backend default
    pub record_ttl_secs: Option<u64>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl TrackerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_acknowledge_time: config.max_acknowledge_time(),
            record_ttl_secs: None,
        }
    }

    pub fn with_max_acknowledge_time(mut self, window: Duration) -> Self {
        self.max_acknowledge_time = window;
        self
    }

    /// Override the TTL of written records, 0 falls back to the backend default
    pub fn with_record_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.record_ttl_secs = (ttl_secs > 0).then_some(ttl_secs);
        self
    }
}

/// Both identifiers have to be non-empty
fn validate_ids(message_id: &str, subscriber_name: &str) -> DedupResult<()> {
    if message_id.is_empty() || subscriber_name.is_empty() {
        return Err(DedupError::invalid_argument(format!(
            "Message ID \"{}\" and subscriber name \"{}\" have to be provided",
            message_id, subscriber_name
        )));
    }
    Ok(())
}

/// Delivery deduplication over an injected storage backend
pub struct DeliveryTracker<S> {
    storage: S,
    settings: TrackerSettings,
}

impl<S: DeliveryStorage> DeliveryTracker<S> {
    pub fn new(storage: S, settings: TrackerSettings) -> Self {
        Self { storage, settings }
    }

    pub fn from_config(storage: S, config: &Config) -> Self {
        Self::new(storage, TrackerSettings::from_config(config))
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Check whether the message may be delivered to the subscriber
    ///
    /// Fails with `InvalidArgument` before touching storage when either
    /// identifier is empty.
    pub async fn can_be_delivered(
        &self,
        message_id: &str,
        subscriber_name: &str,
    ) -> DedupResult<Verdict> {
        validate_ids(message_id, subscriber_name).inspect_err(DedupError::log)?;

        let key = DeliveryKey::new(message_id, subscriber_name);
        let record = self
            .storage
            .get(&key)
            .await
            .map_err(DedupError::from)
            .inspect_err(DedupError::log)?;

        let verdict = decision::evaluate(
            record.as_ref(),
            Utc::now(),
            self.settings.max_acknowledge_time,
        );

        if verdict.is_yes() && record.is_some() {
            warn!(
                key = %key,
                "In-progress delivery exceeded the acknowledge window, allowing redelivery"
            );
        }
        debug!(key = %key, verdict = %verdict, "Delivery eligibility checked");

        Ok(verdict)
    }

    /// `can_be_delivered` reduced to yes/no
    pub async fn can_start_processing(
        &self,
        message_id: &str,
        subscriber_name: &str,
    ) -> DedupResult<bool> {
        Ok(self
            .can_be_delivered(message_id, subscriber_name)
            .await?
            .is_yes())
    }

    /// Record that processing started, overwriting any existing record
    pub async fn set_in_progress(&self, message_id: &str, subscriber_name: &str) -> DedupResult<()> {
        let key = DeliveryKey::new(message_id, subscriber_name);
        let record = DeliveryRecord::in_progress_now();

        self.storage
            .set(&key, &record, self.settings.record_ttl_secs)
            .await
            .map_err(DedupError::from)
            .inspect_err(DedupError::log)?;

        debug!(key = %key, "Delivery marked in progress");
        Ok(())
    }

    /// Record that processing finished
    ///
    /// The current record has to exist and be IN_PROGRESS.
    pub async fn set_as_delivered(
        &self,
        message_id: &str,
        subscriber_name: &str,
    ) -> DedupResult<()> {
        let key = DeliveryKey::new(message_id, subscriber_name);

        let result = self.mark_delivered(&key).await;
        match &result {
            Ok(()) => debug!(key = %key, "Delivery marked delivered"),
            Err(e) => e.log(),
        }
        result
    }

    async fn mark_delivered(&self, key: &DeliveryKey) -> DedupResult<()> {
        let current = self
            .storage
            .get(key)
            .await?
            .ok_or_else(|| DedupError::not_found(key))?;

        if !current.is_in_progress() {
            return Err(DedupError::invalid_state(key, current.state));
        }

        self.storage
            .set(
                key,
                &DeliveryRecord::delivered_now(),
                self.settings.record_ttl_secs,
            )
            .await?;
        Ok(())
    }

    /// Check eligibility and take the in-progress claim in one step
    ///
    /// Returns `Yes` only to the caller whose IN_PROGRESS write won. A
    /// caller that keeps losing races gets `NoInProgress`.
    pub async fn try_claim(&self, message_id: &str, subscriber_name: &str) -> DedupResult<Verdict> {
        validate_ids(message_id, subscriber_name).inspect_err(DedupError::log)?;

        let key = DeliveryKey::new(message_id, subscriber_name);
        let result = self.claim(&key).await;
        if let Err(e) = &result {
            e.log();
        }
        result
    }

    async fn claim(&self, key: &DeliveryKey) -> DedupResult<Verdict> {
        for attempt in 1..=MAX_CLAIM_ATTEMPTS {
            let current = self.storage.get(key).await?;
            let verdict = decision::evaluate(
                current.as_ref(),
                Utc::now(),
                self.settings.max_acknowledge_time,
            );

            if !verdict.is_yes() {
                debug!(key = %key, verdict = %verdict, "Claim refused");
                return Ok(verdict);
            }

            let claimed = self
                .storage
                .compare_and_set(
                    key,
                    current.as_ref(),
                    &DeliveryRecord::in_progress_now(),
                    self.settings.record_ttl_secs,
                )
                .await?;

            if claimed {
                if current.is_some() {
                    warn!(key = %key, "Took over expired in-progress claim");
                }
                info!(key = %key, attempt = attempt, "Delivery claimed");
                return Ok(Verdict::Yes);
            }

            debug!(key = %key, attempt = attempt, "Claim lost a race, re-reading");
        }

        warn!(
            key = %key,
            attempts = MAX_CLAIM_ATTEMPTS,
            "Claim still contended, treating as in progress"
        );
        Ok(Verdict::NoInProgress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use dedup_types::DeliveryState;

    const MESSAGE_ID: &str = "121212121";
    const SUBSCRIBER: &str = "some service_random-name2!";

    fn tracker() -> DeliveryTracker<InMemoryStorage> {
        DeliveryTracker::new(InMemoryStorage::new(), TrackerSettings::default())
    }

    async fn seed(tracker: &DeliveryTracker<InMemoryStorage>, state: DeliveryState, age: Duration) {
        let key = DeliveryKey::new(MESSAGE_ID, SUBSCRIBER);
        let record = DeliveryRecord::new(state, Utc::now() - age);
        tracker.storage().set(&key, &record, None).await.unwrap();
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config {
            max_acknowledge_time_secs: 60,
            ..Default::default()
        };
        let settings = TrackerSettings::from_config(&config);
        assert_eq!(settings.max_acknowledge_time, Duration::seconds(60));
        assert_eq!(settings.record_ttl_secs, None);
    }

    #[test]
    fn test_zero_record_ttl_uses_backend_default() {
        let settings = TrackerSettings::default().with_record_ttl_secs(0);
        assert_eq!(settings.record_ttl_secs, None);

        let settings = TrackerSettings::default().with_record_ttl_secs(60);
        assert_eq!(settings.record_ttl_secs, Some(60));
    }

    #[tokio::test]
    async fn test_huge_window_keeps_marker_in_progress() {
        let config = Config {
            max_acknowledge_time_secs: 10_000_000_000_000,
            ..Default::default()
        };
        let tracker = DeliveryTracker::from_config(InMemoryStorage::new(), &config);

        tracker.set_in_progress("m", "s").await.unwrap();
        assert_eq!(
            tracker.can_be_delivered("m", "s").await.unwrap(),
            Verdict::NoInProgress
        );
        assert!(!tracker.can_start_processing("m", "s").await.unwrap());
        assert_eq!(
            tracker.try_claim("m", "s").await.unwrap(),
            Verdict::NoInProgress
        );
    }

    #[tokio::test]
    async fn test_new_message_is_deliverable() {
        let tracker = tracker();
        assert_eq!(
            tracker.can_be_delivered(MESSAGE_ID, SUBSCRIBER).await.unwrap(),
            Verdict::Yes
        );
        assert!(tracker.can_start_processing(MESSAGE_ID, SUBSCRIBER).await.unwrap());
    }

    #[tokio::test]
    async fn test_in_progress_two_minutes_ago_blocks() {
        let tracker = tracker();
        seed(&tracker, DeliveryState::InProgress, Duration::minutes(2)).await;

        assert_eq!(
            tracker.can_be_delivered(MESSAGE_ID, SUBSCRIBER).await.unwrap(),
            Verdict::NoInProgress
        );
        assert!(!tracker.can_start_processing(MESSAGE_ID, SUBSCRIBER).await.unwrap());
    }

    #[tokio::test]
    async fn test_in_progress_twenty_minutes_ago_is_recovered() {
        let tracker = tracker();
        seed(&tracker, DeliveryState::InProgress, Duration::minutes(20)).await;

        assert_eq!(
            tracker.can_be_delivered(MESSAGE_ID, SUBSCRIBER).await.unwrap(),
            Verdict::Yes
        );
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let tracker = tracker();

        tracker.set_in_progress(MESSAGE_ID, SUBSCRIBER).await.unwrap();
        assert_eq!(
            tracker.can_be_delivered(MESSAGE_ID, SUBSCRIBER).await.unwrap(),
            Verdict::NoInProgress
        );

        tracker.set_as_delivered(MESSAGE_ID, SUBSCRIBER).await.unwrap();
        assert_eq!(
            tracker.can_be_delivered(MESSAGE_ID, SUBSCRIBER).await.unwrap(),
            Verdict::NoAlreadyDelivered
        );

        // Other subscribers of the same message are independent
        assert_eq!(
            tracker.can_be_delivered(MESSAGE_ID, "another-service").await.unwrap(),
            Verdict::Yes
        );
    }

    #[tokio::test]
    async fn test_set_as_delivered_errors() {
        let tracker = tracker();

        let err = tracker
            .set_as_delivered(MESSAGE_ID, SUBSCRIBER)
            .await
            .unwrap_err();
        assert!(matches!(err, DedupError::NotFound { ref key } if key == "121212121_some service_random-name2!"));

        seed(&tracker, DeliveryState::Delivered, Duration::zero()).await;
        let err = tracker
            .set_as_delivered(MESSAGE_ID, SUBSCRIBER)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DedupError::InvalidState {
                state: DeliveryState::Delivered,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_set_in_progress_overwrites_delivered() {
        let tracker = tracker();
        seed(&tracker, DeliveryState::Delivered, Duration::minutes(5)).await;

        tracker.set_in_progress(MESSAGE_ID, SUBSCRIBER).await.unwrap();

        let key = DeliveryKey::new(MESSAGE_ID, SUBSCRIBER);
        let record = tracker.storage().get(&key).await.unwrap().unwrap();
        assert_eq!(record.state, DeliveryState::InProgress);
    }

    #[tokio::test]
    async fn test_empty_identifiers_are_rejected() {
        let tracker = tracker();

        for (message_id, subscriber) in [("", ""), ("", "a"), ("a", "")] {
            let err = tracker
                .can_be_delivered(message_id, subscriber)
                .await
                .unwrap_err();
            assert!(matches!(err, DedupError::InvalidArgument(_)));

            let err = tracker.try_claim(message_id, subscriber).await.unwrap_err();
            assert!(matches!(err, DedupError::InvalidArgument(_)));
        }
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let tracker = tracker();

        assert_eq!(
            tracker.try_claim(MESSAGE_ID, SUBSCRIBER).await.unwrap(),
            Verdict::Yes
        );
        assert_eq!(
            tracker.try_claim(MESSAGE_ID, SUBSCRIBER).await.unwrap(),
            Verdict::NoInProgress
        );

        tracker.set_as_delivered(MESSAGE_ID, SUBSCRIBER).await.unwrap();
        assert_eq!(
            tracker.try_claim(MESSAGE_ID, SUBSCRIBER).await.unwrap(),
            Verdict::NoAlreadyDelivered
        );
    }

    #[tokio::test]
    async fn test_claim_takes_over_expired_marker() {
        let tracker = tracker();
        seed(&tracker, DeliveryState::InProgress, Duration::minutes(20)).await;

        assert_eq!(
            tracker.try_claim(MESSAGE_ID, SUBSCRIBER).await.unwrap(),
            Verdict::Yes
        );
        assert_eq!(
            tracker.can_be_delivered(MESSAGE_ID, SUBSCRIBER).await.unwrap(),
            Verdict::NoInProgress
        );
    }
}
