//! Storage infrastructure: JSON document persistence.
//!
//! - `config_store` – the settings document (create-if-absent, load, save).
//! - `parking_spaces` – the parking space list owned by the detector.
//! - `atomic` – the temp-file-then-rename write shared by both.
//!
//! Nothing outside this module writes either document.

pub mod atomic;
pub mod config_store;
pub mod parking_spaces;
