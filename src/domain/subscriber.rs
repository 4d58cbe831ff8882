use serde::Deserialize;

use super::SubscriberEmail;
use super::SubscriptionToken;

/// A row of the `subscribers` table, as reported back by the store.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub email: SubscriberEmail,
    pub token: SubscriptionToken,
    pub subscribed: bool,
}

/// What to do with the stored token when an already known email subscribes
/// again.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenPolicy {
    /// Store the freshly generated token; previously issued links stop
    /// working.
    #[default]
    Rotate,
    /// Keep the token already on record; only reactivate.
    Preserve,
}
