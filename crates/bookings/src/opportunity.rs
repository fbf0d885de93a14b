use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eventrent_clients::{ClientId, NewClient};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Wedding,
    Birthday,
    Corporate,
    #[default]
    Other,
}

/// What is being booked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    pub name: String,
    pub date: DateTime<Utc>,
    pub kind: EventKind,
    pub location: String,
}

/// Either a client already on file or the details for a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientRef {
    Existing(ClientId),
    New(NewClient),
}

/// A prospective client + event pair submitted to open a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    pub client: ClientRef,
    pub event: EventDetails,
}
