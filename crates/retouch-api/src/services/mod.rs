pub mod dispatcher;
pub mod encoding;
pub mod sessions;

pub use dispatcher::{SessionDispatcher, UndoOutcome};
pub use sessions::{Session, SessionError, SessionStore, Snapshot};
