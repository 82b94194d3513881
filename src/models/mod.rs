//! Data models for the Regulation Change Tracker application.
//!
//! Wire names match the frontend TypeScript interfaces exactly for seamless
//! interoperability.

mod change;
mod notification;
mod regulation;
mod user;

pub use change::*;
pub use notification::*;
pub use regulation::*;
pub use user::*;
