//! REST API module.
//!
//! Contains all API routes and handlers following the frontend contract.
//! Success bodies are the plain JSON shapes the frontend consumes; errors are
//! `{ "detail": message }` with the mapped status code.

mod changes;
mod notifications;
mod overview;
mod regulations;
mod users;

pub use changes::*;
pub use notifications::*;
pub use overview::*;
pub use regulations::*;
pub use users::*;
