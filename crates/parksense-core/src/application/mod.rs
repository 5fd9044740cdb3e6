//! Application layer use cases.
//!
//! - **`switch_mode`** – The device-mode transaction: validate the mode,
//!   back up the settings file, apply the preset, save atomically.

pub mod switch_mode;
