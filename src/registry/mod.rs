//! Session registry
//!
//! An explicit store that lets an outer layer (an HTTP API, a scheduler)
//! look up a crawl by identifier after starting it. The engine never reads
//! it; callers insert the handles they want to find again.

mod store;

pub use store::{SessionId, SessionRegistry};
