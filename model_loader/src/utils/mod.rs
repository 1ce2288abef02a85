//! Utilities for model_loader

pub mod logging;

pub use logging::init_logging;
