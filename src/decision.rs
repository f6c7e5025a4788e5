// ============================================================================
// Delivery Decision
// ============================================================================
//
// Pure eligibility rules over a delivery record:
//
//   no record                        -> Yes
//   DELIVERED                        -> NoAlreadyDelivered (terminal)
//   IN_PROGRESS, inside the window   -> NoInProgress
//   IN_PROGRESS, older than window   -> Yes (previous worker presumed dead)
//
// A window larger than chrono's date range never expires a marker.
//
// "Inside the window" means created strictly after `now - window`.
//
// ============================================================================

use chrono::{DateTime, Duration, Utc};
use dedup_types::{DeliveryRecord, DeliveryState, Verdict};

/// Decide whether a message may be delivered given its stored record
pub fn evaluate(record: Option<&DeliveryRecord>, now: DateTime<Utc>, window: Duration) -> Verdict {
    let Some(record) = record else {
        return Verdict::Yes;
    };

    match record.state {
        DeliveryState::Delivered => Verdict::NoAlreadyDelivered,
        DeliveryState::InProgress => {
            if is_within_window(record, now, window) {
                Verdict::NoInProgress
            } else {
                Verdict::Yes
            }
        }
    }
}

/// Whether an in-progress marker is still younger than the acknowledge window
///
/// A window reaching past the earliest representable time has no lower
/// bound, so every marker is inside it.
pub fn is_within_window(record: &DeliveryRecord, now: DateTime<Utc>, window: Duration) -> bool {
    match now.checked_sub_signed(window) {
        Some(expired_boundary) => record.created_time > expired_boundary,
        None => true,
    }
}
