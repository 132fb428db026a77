//! # Default Attribute Names
//!
//! Every policy that records or reads metadata has a default attribute
//! name, overridable per invocation via the `attribute` configuration
//! key.

/// Where access-time stamping records its timestamp.
pub const ACCESS_TIME: &str = "tessera::access_time";

/// Resource-level flag exempting a resource's replicas from retention.
pub const PRESERVE_REPLICAS: &str = "tessera::retention::preserve_replicas";

/// Resource-level attribute selecting the verification strategy.
pub const VERIFICATION_TYPE: &str = "tessera::verification::type";

/// Where filesystem-usage sampling records its percentage.
pub const FILESYSTEM_USAGE: &str = "tessera::filesystem_usage";
