//! Wire models for the session API
//!
//! Request and response bodies exchanged with the presentation layer.

mod histogram;
mod session;

pub use histogram::*;
pub use session::*;
