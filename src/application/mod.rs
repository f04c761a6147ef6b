//! Application layer: use-case orchestration over the domain and ports.

mod session;

pub use session::{BookingSession, SessionError};
