//! Concurrency primitives the pipeline builds on: a fair resizable
//! semaphore, a mutex layered on top of it, and a notify-style signal.
//!
//! None of these have exceptional paths; timed acquisition simply yields a
//! `bool` (`true` = acquired, `false` = timed out), matching the rest of
//! the pipeline's "errors are data" style.

mod mutex;
mod semaphore;
mod signal;

pub use mutex::Mutex;
pub use semaphore::Semaphore;
pub use signal::Signal;
