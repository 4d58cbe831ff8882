use std::fmt::Display;

use uuid::Uuid;

/// Opaque capability handed to a subscriber inside their unsubscribe link.
/// Anyone holding it may flip the subscription on or off, so it is never
/// logged.
#[derive(Clone, PartialEq, Eq)]
pub struct SubscriptionToken(String);

impl SubscriptionToken {
    /// A fresh random (v4) UUID, in canonical hyphenated form
    pub fn generate() -> Self { Self(Uuid::new_v4().to_string()) }

    /// Tokens coming back from a link are not inspected beyond being present;
    /// whether they exist is for the store to say.
    pub fn parse(token: String) -> Result<Self, String> {
        match token.is_empty() {
            true => Err("Missing token".to_string()),
            false => Ok(Self(token)),
        }
    }
}

impl AsRef<str> for SubscriptionToken {
    fn as_ref(&self) -> &str { &self.0 }
}

impl Display for SubscriptionToken {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// the token itself is never printed
impl std::fmt::Debug for SubscriptionToken {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str("SubscriptionToken([REDACTED])")
    }
}
