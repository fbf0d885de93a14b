//! Client-facing portal.
//!
//! A client reaches a booking with its id and the token from the quote
//! e-mail. The token is checked on every call; a mismatch reads exactly like
//! an unknown booking.

pub mod session;

pub use session::{ClientPortal, MIN_SIGNER_NAME_CHARS, PortalSession, PortalStep};
