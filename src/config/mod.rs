//! Relay configuration subsystem.
//!
//! # Data Flow
//! ```text
//! RelayOptions (host code or host config file via serde)
//!     → validation.rs (parse backend URL, normalize, reject bad input)
//!     → RelayConfig (validated, immutable)
//!     → owned by BackendRelay for the lifetime of the mount
//! ```
//!
//! # Design Decisions
//! - Options are validated at mount time; a malformed backend URL can never
//!   fail a request
//! - Everything compared per-request is normalized here exactly once

pub mod schema;
pub mod validation;

pub use schema::{InterceptErrors, RelayOptions};
pub use validation::{ConfigError, RelayConfig};
