//! Application layer use cases for the bootstrap.
//!
//! - **`bootstrap`** – Runs every setup step in order and collects a
//!   [`bootstrap::BootstrapReport`] for the console summary.

pub mod bootstrap;
