//! Service layer: session orchestration.
//!
//! [`Session`] ties the pool registry and the event bus together for the
//! lifetime of one play session.

pub mod session;

pub use session::Session;
