pub use entity::{zoom_configs, Id};

pub mod error;
pub mod zoom_config;
