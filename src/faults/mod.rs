pub mod payload;
pub mod service;

pub use payload::{FaultPayload, NewFault};
pub use service::{FaultPage, FaultService};
