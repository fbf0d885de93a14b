//! Service configuration.
//!
//! Every knob has a default; `from_env` overrides them from `EVENTRENT_*`
//! variables and falls back (with a warning) when a value does not parse.

use std::str::FromStr;
use std::time::Duration;

use eventrent_observability::{LogConfig, LogFormat};
use eventrent_pricing::{DEFAULT_DEPOSIT_RATE, DEFAULT_TAX_RATE, PricingPolicy, Rate};

pub const ENV_TAX_RATE_BPS: &str = "EVENTRENT_TAX_RATE_BPS";
pub const ENV_DEPOSIT_RATE_BPS: &str = "EVENTRENT_DEPOSIT_RATE_BPS";
pub const ENV_FINAL_INVOICE_LEAD_DAYS: &str = "EVENTRENT_FINAL_INVOICE_LEAD_DAYS";
pub const ENV_SIMULATE_LATENCY: &str = "EVENTRENT_SIMULATE_LATENCY";
pub const ENV_LOG_FORMAT: &str = "EVENTRENT_LOG_FORMAT";
pub const ENV_LOG_FILTER: &str = "EVENTRENT_LOG_FILTER";

/// Days between the final balance due date and the event.
pub const DEFAULT_FINAL_INVOICE_LEAD_DAYS: u32 = 14;

/// Simulated round-trip time per service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyProfile {
    pub dashboard: Duration,
    pub list_clients: Duration,
    pub find_client: Duration,
    pub add_client: Duration,
    pub update_client: Duration,
    pub client_details: Duration,
    pub list_bookings: Duration,
    pub get_booking: Duration,
    pub create_booking: Duration,
    pub update_quote: Duration,
    pub send_quote: Duration,
    pub portal_read: Duration,
    pub sign_quote: Duration,
    pub deposit_payment: Duration,
    pub final_payment: Duration,
    pub create_final_invoice: Duration,
    pub send_final_invoice: Duration,
    pub complete_booking: Duration,
    pub cancel_booking: Duration,
    pub flag_overdue: Duration,
}

impl LatencyProfile {
    /// Zero delay everywhere. Used by tests.
    pub const fn none() -> Self {
        let zero = Duration::ZERO;
        Self {
            dashboard: zero,
            list_clients: zero,
            find_client: zero,
            add_client: zero,
            update_client: zero,
            client_details: zero,
            list_bookings: zero,
            get_booking: zero,
            create_booking: zero,
            update_quote: zero,
            send_quote: zero,
            portal_read: zero,
            sign_quote: zero,
            deposit_payment: zero,
            final_payment: zero,
            create_final_invoice: zero,
            send_final_invoice: zero,
            complete_booking: zero,
            cancel_booking: zero,
            flag_overdue: zero,
        }
    }

    /// The delays of the hosted back-office mock.
    pub const fn simulated() -> Self {
        const fn ms(v: u64) -> Duration {
            Duration::from_millis(v)
        }
        Self {
            dashboard: ms(500),
            list_clients: ms(300),
            find_client: ms(500),
            add_client: ms(400),
            update_client: ms(500),
            client_details: ms(600),
            list_bookings: ms(300),
            get_booking: ms(400),
            create_booking: ms(800),
            update_quote: ms(600),
            send_quote: ms(1000),
            portal_read: ms(500),
            sign_quote: ms(1200),
            deposit_payment: ms(2000),
            final_payment: ms(2000),
            create_final_invoice: ms(700),
            send_final_invoice: ms(1000),
            complete_booking: ms(500),
            cancel_booking: ms(500),
            flag_overdue: ms(300),
        }
    }
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self::simulated()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub pricing: PricingPolicy,
    pub final_invoice_lead_days: u32,
    pub latency: LatencyProfile,
    pub log: LogConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pricing: PricingPolicy {
                tax_rate: DEFAULT_TAX_RATE,
                deposit_rate: DEFAULT_DEPOSIT_RATE,
            },
            final_invoice_lead_days: DEFAULT_FINAL_INVOICE_LEAD_DAYS,
            latency: LatencyProfile::simulated(),
            log: LogConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Defaults with no simulated latency.
    pub fn for_tests() -> Self {
        Self {
            latency: LatencyProfile::none(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let tax_rate = parse_or(&lookup, ENV_TAX_RATE_BPS, defaults.pricing.tax_rate.basis_points());
        let deposit_rate = parse_or(
            &lookup,
            ENV_DEPOSIT_RATE_BPS,
            defaults.pricing.deposit_rate.basis_points(),
        );
        let final_invoice_lead_days = parse_or(
            &lookup,
            ENV_FINAL_INVOICE_LEAD_DAYS,
            defaults.final_invoice_lead_days,
        );
        let latency = if parse_or(&lookup, ENV_SIMULATE_LATENCY, true) {
            LatencyProfile::simulated()
        } else {
            LatencyProfile::none()
        };
        let format = parse_or(&lookup, ENV_LOG_FORMAT, defaults.log.format);
        let filter = lookup(ENV_LOG_FILTER)
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(defaults.log.filter);

        Self {
            pricing: PricingPolicy {
                tax_rate: Rate::from_basis_points(tax_rate),
                deposit_rate: Rate::from_basis_points(deposit_rate),
            },
            final_invoice_lead_days,
            latency,
            log: LogConfig {
                format,
                filter,
            },
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + core::fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, ?default, "invalid config value; using default");
                default
            }
        },
    }
}
