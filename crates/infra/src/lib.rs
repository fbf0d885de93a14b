//! Infrastructure layer: the in-memory lifecycle store, configuration and the
//! async service facade.

pub mod catalog;
pub mod config;
pub mod error;
pub mod seed;
pub mod service;
pub mod store;
pub mod token;

pub use catalog::{Product, ProductCatalog};
pub use config::{LatencyProfile, ServiceConfig};
pub use error::{StoreError, StoreResult};
pub use seed::{SeedData, seed_demo_data};
pub use service::CrmService;
pub use store::{
    BookingSummary, BookingWithClient, ChangeEnvelope, ClientDetails, DashboardSummary,
    LifecycleStore,
};
pub use token::generate_portal_token;
