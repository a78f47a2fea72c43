//! Browser automation: a single lazily-attached/launched Chrome process,
//! a capacity-bounded session registry, and a ref-addressed accessibility
//! snapshot protocol for clicking/typing without re-querying the DOM.

pub mod controller;
pub mod session;
pub mod snapshot;

pub use controller::{ChromeController, SnapshotOptions};
pub use session::{BrowserSession, ChromeError, SessionInfo};
pub use snapshot::{ElementDescriptor, SnapshotResult};
