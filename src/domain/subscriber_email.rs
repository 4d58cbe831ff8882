use std::fmt::Display;

/// A normalised (trimmed, lowercased) email address that passed the shape
/// check. Permissive: anything of the form `local@domain.tld` where no part
/// contains whitespace or `@`.
///
/// Must be instantiated with `SubscriberEmail::parse`. The field is left
/// private, to prevent bypassing of `parse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(email: String) -> Result<Self, String> {
        let email = email.trim().to_lowercase();
        match has_email_shape(&email) {
            true => Ok(Self(email)),
            false => Err(format!("Invalid email: {email:?}")),
        }
    }
}

/// `local@domain`, where `domain` has a dot with at least one character on
/// either side of it.
fn has_email_shape(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    let valid_part = |p: &str| !p.is_empty() && !p.chars().any(|c| c.is_whitespace() || c == '@');
    if !valid_part(local) || !valid_part(domain) {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str { &self.0 }
}

impl Display for SubscriberEmail {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
