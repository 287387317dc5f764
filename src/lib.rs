//! Structured JSON logging with a fixed, ingestion-stable record schema.
//!
//! ```no_run
//! use logs_plus::{Field, logger};
//!
//! let log = logger();
//! let _flush = log.sync_on_drop();
//! log.info("order accepted", &[Field::string("order_id", "A-1024")]);
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod field;
pub mod level;
pub mod logging;
pub mod sink;

pub use config::LogConfig;
pub use encoder::{CallerEncoding, encode_time, parse_time};
pub use error::{Error, Result};
pub use field::Field;
pub use level::{FATAL_EXIT_CODE, Severity, encode_level};
pub use logging::{LoggerFactory, LoggerHandle, SyncGuard, configure, logger};
