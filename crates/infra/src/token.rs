use rand::Rng;
use rand::distr::Alphanumeric;

use eventrent_bookings::PortalToken;

const TOKEN_PREFIX: &str = "tok_";
const TOKEN_LEN: usize = 13;

/// Fresh portal token: `tok_` followed by 13 lowercase alphanumerics.
pub fn generate_portal_token() -> PortalToken {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(TOKEN_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    PortalToken::new(format!("{TOKEN_PREFIX}{suffix}"))
}
