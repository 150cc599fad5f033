//! In-memory longest-prefix-match index from IPv4/IPv6 CIDR ranges to
//! caller-supplied metadata, with copy-on-write reloads.
//!
//! ```
//! use geoip_core::{IpManager, StaticSource};
//!
//! let source = StaticSource::new(vec![
//!     ("10.0.0.0/8", "US"),
//!     ("10.1.0.0/16", "CA"),
//! ]);
//! let manager = IpManager::new(&source).unwrap();
//! assert_eq!(manager.query("10.1.2.3").as_deref(), Some(&"CA"));
//! assert_eq!(manager.query("10.2.2.3").as_deref(), Some(&"US"));
//! assert!(manager.query("192.0.2.1").is_none());
//! ```

pub mod config;
pub mod constants;
pub mod errors;
pub mod helpers;
pub mod index;
pub mod key;
pub mod manager;
pub mod range;
pub mod source;
pub mod telemetry;
pub mod trie;

pub use config::SourceConfig;
pub use errors::{Error, ErrorCode, FetchError, ParseError, Result};
pub use index::{IndexStats, IpIndex};
pub use manager::IpManager;
pub use range::{parse_cidr, Cidr, IntoCidr, Range};
pub use source::{DataSource, Dataset, DirectorySource, StaticSource};
pub use trie::{BitTrie, Ipv4Trie, Ipv6Trie};
