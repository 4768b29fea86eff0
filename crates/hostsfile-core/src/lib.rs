//! Hosts file core library
//!
//! This crate loads a hosts file (`/etc/hosts` or the Windows equivalent),
//! keeps it in memory as an ordered list of records, and edits it through
//! address and name indexes before writing it back.
//!
//! # Architecture
//!
//! - **Record**: one parsed line (comment, blank, or address + names)
//! - **Index**: key → positions of the records referencing it
//! - **Store**: the record list plus an address index and a name index
//!
//! Comments, blank lines and malformed lines survive a load/flush cycle
//! untouched; data lines are rewritten with single spaces.
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::open()?;
//!
//! // Map a name, moving it off any other address
//! store.add("127.0.0.1", &["myapp.test"])?;
//!
//! // Query
//! assert!(store.has("127.0.0.1", "myapp.test"));
//!
//! // Tidy up and write back
//! store.normalize();
//! store.flush()?;
//! ```
//!
//! # Modules
//!
//! - `store`: Indexed record list (main entry point)
//! - `record`: Line parsing and rendering
//! - `index`: Position lookups
//! - `validate`: Address and name syntax checks
//! - `storage`: Reading and writing the file
//! - `config`: Hosts file location and write options

pub mod config;
pub mod error;
pub mod index;
pub mod record;
pub mod storage;
pub mod store;
pub mod validate;

pub use config::{Config, LineEnding};
pub use error::{HostsError, HostsResult, LineParseError};
pub use index::Index;
pub use record::Record;
pub use store::Store;
