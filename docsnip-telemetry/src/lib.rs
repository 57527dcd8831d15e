//! # docsnip telemetry
//!
//! Structured logging for snippet validation runs.
//!
//! ## Usage
//!
//! ```rust
//! use docsnip_telemetry::{init_telemetry, info, test_case_span};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_telemetry("docsnip")?;
//!
//!     let span = test_case_span("get-user-csharp-V1-compiles", "csharp");
//!     let _enter = span.enter();
//!     info!("compiling");
//!     Ok(())
//! }
//! ```

pub mod init;
pub mod spans;

// Re-export tracing macros for convenience
pub use tracing::{Span, debug, error, info, instrument, trace, warn};

pub use init::{init_json_telemetry, init_telemetry};
pub use spans::*;
