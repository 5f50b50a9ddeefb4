pub use super::zoom_configs::Entity as ZoomConfigs;
