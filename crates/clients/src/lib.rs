//! Client records (event-sourced).
//!
//! Registration and contact-detail changes for the people and companies that
//! book events. Pure domain logic; storage lives in `eventrent-infra`.

pub mod client;

pub use client::{
    Client, ClientCommand, ClientDetailsUpdated, ClientEvent, ClientId, ClientPatch,
    ClientRegistered, NewClient, RegisterClient, UpdateClientDetails,
};
