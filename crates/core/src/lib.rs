//! Shared data model for the Tollgate edge gateway.
//!
//! These types mirror what the control plane publishes into the config
//! store (tokens, the route table) and what the gateway emits back
//! (usage events). The gateway treats all of them as read-only.

pub mod route;
pub mod scope;
pub mod token;
pub mod usage;

pub use route::{AuthConfig, AuthType, DEFAULT_API_KEY_HEADER, RouteEntry, RouteTable};
pub use scope::{ScopeSpec, TAG_SCOPE_PREFIX};
pub use token::{TokenRecord, hash_credential, parse_timestamp};
pub use usage::UsageEvent;
