use serde::{Deserialize, Serialize};

/// Opaque credential giving an unauthenticated client access to one booking.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortalToken(String);

impl PortalToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, presented: &str) -> bool {
        self.0 == presented
    }
}

// Tokens stay out of logs.
impl core::fmt::Debug for PortalToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PortalToken(..)")
    }
}
