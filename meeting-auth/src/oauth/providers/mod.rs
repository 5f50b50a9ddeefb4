//! Provider-specific token exchanges.

pub mod zoom;
