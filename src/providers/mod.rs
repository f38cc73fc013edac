//! Frame sources.
//!
//! - [`SerialProvider`]: a meter on a serial port
//! - [`ReplayProvider`]: a capture of raw meter output
//! - [`ReaderProvider`]: any other [`tokio::io::AsyncRead`]

pub mod reader;
pub mod replay;
pub mod serial;

pub use reader::ReaderProvider;
pub use replay::ReplayProvider;
pub use serial::SerialProvider;
