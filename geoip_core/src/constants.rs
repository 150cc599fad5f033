//! Constants and configuration defaults for the prefix index

pub const V4_BITS: u8 = 32;
pub const V6_BITS: u8 = 128;

/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) carry the IPv4 address in the low 32 bits.
pub const V4_MAPPED_PREFIX: u8 = 96;

pub const DEFAULT_DATA_EXT: &str = "txt";
pub const COMMENT_PREFIX: &str = "#";
pub const UNKNOWN_CODE: &str = "UNKNOWN";

/// Environment prefix read by [`SourceConfig::from_env`](crate::config::SourceConfig::from_env).
pub const ENV_PREFIX: &str = "GEOIP";
pub const ENV_DATA_DIR: &str = "GEOIP_DATA_DIR";
pub const ENV_DATA_EXT: &str = "GEOIP_DATA_EXT";
pub const ENV_COMMENT_PREFIX: &str = "GEOIP_COMMENT_PREFIX";

pub const METRIC_QUERIES: &str = "geoip_queries_total";
pub const METRIC_QUERY_MISSES: &str = "geoip_query_misses_total";
pub const METRIC_UPDATES: &str = "geoip_updates_total";
pub const METRIC_UPDATE_FAILURES: &str = "geoip_update_failures_total";
pub const METRIC_ACTIVE_PREFIXES: &str = "geoip_active_prefixes";
