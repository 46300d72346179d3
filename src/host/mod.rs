//! Host-facing command contract and the stdio bridge that serves it.

pub mod channel;
pub mod contract;
pub mod stdio;
