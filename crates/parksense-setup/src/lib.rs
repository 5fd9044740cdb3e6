//! parksense-setup library crate.
//!
//! Prepares a machine to run the ParkSense detector: checks the Python
//! runtime, optionally creates a virtual environment, installs the Python
//! dependencies, scaffolds the `config/`, `data/` and `models/` directories
//! and makes sure both JSON documents exist with their defaults.
//!
//! # Layers
//!
//! ```text
//! main.rs             CLI flags, console summary
//! application/        run_bootstrap: step ordering and the report
//! infrastructure/
//!   toolchain/        python / pip / nvidia-smi behind the Toolchain trait
//!   prompt            y/n questions on any BufRead + Write pair
//! ```
//!
//! The JSON documents themselves are written only through
//! `parksense_core`'s storage layer.

pub mod application;
pub mod infrastructure;
