//! Domain types for the detector configuration.
//!
//! Nothing in here touches the file system.  The storage layer turns these
//! types into JSON files and back.

/// Compute-device modes and the rule the detector uses to pick a backend.
pub mod device;

/// Directory and file names of a ParkSense installation.
pub mod layout;

/// Typed view of the settings document, with defaults and range checks.
pub mod settings;
