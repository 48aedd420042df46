//! Utility modules: retry, timeout, shared HTTP helpers.

pub mod http;
pub mod retry;
pub mod timeout;
