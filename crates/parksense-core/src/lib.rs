//! # parksense-core
//!
//! Configuration lifecycle manager for the ParkSense occupancy detector.
//!
//! The detector itself (video capture, object tracking, occupancy inference)
//! is a separate process.  It is driven entirely by two JSON files that this
//! crate owns:
//!
//! - `config/settings.json` – thresholds, tracked object classes and the
//!   compute-device mode.
//! - `data/parking_spaces.json` – the list of marked parking spaces.
//!
//! # Layers
//!
//! - **`domain`** – Pure types: [`DeviceMode`], [`Settings`] and the
//!   [`ProjectLayout`] path map.  No I/O.
//!
//! - **`infrastructure::storage`** – Reads and writes the JSON documents.
//!   Every write goes through a temp-file-then-rename path so a reader never
//!   observes a truncated file.
//!
//! - **`application`** – The mode switch transaction: backup, load, mutate,
//!   persist.
//!
//! Every operation takes the file path as an argument.  There is no global
//! settings singleton, so tests can point each call at an isolated
//! temporary directory.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::switch_mode::{apply_mode, backup_path, switch_mode, ModeSwitchOutcome};
pub use domain::device::{ComputeDevice, DeviceMode, DeviceReason, EffectiveDevice, UnknownDeviceMode};
pub use domain::layout::ProjectLayout;
pub use domain::settings::{Settings, SettingsIssue};
pub use infrastructure::storage::config_store::{ConfigError, InitOutcome, SettingsDocument};
