use std::fmt;

/// Separator placed between the message ID and the subscriber name
pub const KEY_SEPARATOR: char = '_';

/// Storage key for one (message, subscriber) pair
///
/// Format: `{message_id}_{subscriber_name}`. The key is not reversible and
/// two different pairs can produce the same key (e.g. `a_b` + `c` and
/// `a` + `b_c`); that collision is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeliveryKey(String);

impl DeliveryKey {
    /// Build the key for a message and subscriber
    pub fn new(message_id: &str, subscriber_name: &str) -> Self {
        Self::from_parts(Some(message_id), Some(subscriber_name))
    }

    /// Build the key from optional parts, missing parts become empty strings
    pub fn from_parts(message_id: Option<&str>, subscriber_name: Option<&str>) -> Self {
        let message_id = message_id.unwrap_or_default();
        let subscriber_name = subscriber_name.unwrap_or_default();

        let mut key = String::with_capacity(message_id.len() + subscriber_name.len() + 1);
        key.push_str(message_id);
        key.push(KEY_SEPARATOR);
        key.push_str(subscriber_name);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeliveryKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<DeliveryKey> for String {
    fn from(key: DeliveryKey) -> Self {
        key.0
    }
}
