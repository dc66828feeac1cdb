//! Log streaming for debuglog
//!
//! This crate positions a log file, filters its lines and tails them to a
//! subscriber:
//!
//! ```text
//! QueryParams ──→ StreamParams ──→ FilterChain
//!                                      │
//!                  position() ◄────────┤   (backlog counted in matching lines)
//!                      │               │
//!                  ack (ok/error)      │
//!                      │               ▼
//!                  Tailer ◄──── CountedFilter ──→ CapSignal (maxLines)
//!                      │
//!                      ▼
//!                  subscriber
//! ```

pub mod ack;
mod error;
mod filter;
mod params;
mod parser;
mod position;
mod signal;
mod stream;
mod tailer;

pub use ack::{AckError, AckRecord};
pub use error::{ParamError, Result, StreamError};
pub use filter::{FilterChain, Glob, LineFilter};
pub use params::{QueryParams, StreamParams};
pub use parser::LineParser;
pub use position::position;
pub use signal::CapSignal;
pub use stream::LogStream;
pub use tailer::{DEFAULT_POLL_INTERVAL, Tailer, TailerConfig};

// Re-export types used in our public API
pub use debuglog_types::{EntityTag, Level, LogLine, TagError, TagKind};
