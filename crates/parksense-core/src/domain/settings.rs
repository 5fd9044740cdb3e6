//! Typed view of the detector settings document.
//!
//! The on-disk document is a flat JSON object:
//!
//! ```json
//! {
//!   "universal_detection": true,
//!   "occupancy_threshold": 0.6,
//!   "uncertainty_threshold": 0.3,
//!   "uncertainty_time_threshold": 3.0,
//!   "frequent_detection_threshold": 10,
//!   "frequent_detection_window": 10.0,
//!   "tracked_objects": [2, 67]
//! }
//! ```
//!
//! `device` and `force_cpu` are optional.  When absent the detector treats
//! them as `"auto"` and `false`.
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]`, so a document that is
//! missing keys (hand-edited, or written by an older detector) still
//! deserializes with the documented defaults filled in.  Unknown keys are
//! ignored here; the storage layer keeps them on disk.
//!
//! Documents read from disk go through [`Settings::from_fields`] instead of
//! the strict serde path: a known key holding a value the detector cannot
//! use (`"device": "gpu"`, `"tracked_objects": "cars"`) falls back to its
//! default and is reported as a [`SettingsIssue::InvalidValue`].

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::device::{resolve_device, DeviceMode, EffectiveDevice};

/// Detector settings.
///
/// Field order is the on-disk key order of a freshly written document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// React to every detected object class, not just `tracked_objects`.
    #[serde(default = "default_true")]
    pub universal_detection: bool,
    /// Fraction of a space that must be covered to count as occupied.
    #[serde(default = "default_occupancy_threshold")]
    pub occupancy_threshold: f64,
    /// Coverage above which a space enters the "uncertain" state.
    #[serde(default = "default_uncertainty_threshold")]
    pub uncertainty_threshold: f64,
    /// Seconds a space must stay uncertain before it is reported as
    /// probably occupied.
    #[serde(default = "default_uncertainty_time_threshold")]
    pub uncertainty_time_threshold: f64,
    /// Detections within the window that mark a space as flickering.
    #[serde(default = "default_frequent_detection_threshold")]
    pub frequent_detection_threshold: u32,
    /// Length of the flicker window in seconds.
    #[serde(default = "default_frequent_detection_window")]
    pub frequent_detection_window: f64,
    /// Object class identifiers the detector reacts to (2 = car).
    #[serde(default = "default_tracked_objects")]
    pub tracked_objects: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_cpu: Option<bool>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_occupancy_threshold() -> f64 {
    0.6
}
fn default_uncertainty_threshold() -> f64 {
    0.3
}
fn default_uncertainty_time_threshold() -> f64 {
    3.0
}
fn default_frequent_detection_threshold() -> u32 {
    10
}
fn default_frequent_detection_window() -> f64 {
    10.0
}
fn default_tracked_objects() -> Vec<i64> {
    vec![2, 67]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            universal_detection: default_true(),
            occupancy_threshold: default_occupancy_threshold(),
            uncertainty_threshold: default_uncertainty_threshold(),
            uncertainty_time_threshold: default_uncertainty_time_threshold(),
            frequent_detection_threshold: default_frequent_detection_threshold(),
            frequent_detection_window: default_frequent_detection_window(),
            tracked_objects: default_tracked_objects(),
            device: None,
            force_cpu: None,
        }
    }
}

/// A value in a settings document that the detector would misinterpret.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsIssue {
    /// A numeric field lies outside its documented range.
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: Option<f64>,
    },
    /// `device` and `force_cpu` disagree, e.g. `device = "cuda"` with
    /// `force_cpu = true`.  The detector lets `force_cpu` win.
    InconsistentDevice { device: DeviceMode, force_cpu: bool },
    /// A known key holds a value of the wrong type or an unknown literal.
    /// The typed view uses the default instead.
    InvalidValue { field: &'static str, value: String },
}

impl fmt::Display for SettingsIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsIssue::OutOfRange {
                field,
                value,
                min,
                max: Some(max),
            } => write!(f, "{field} = {value} is outside [{min}, {max}]"),
            SettingsIssue::OutOfRange {
                field,
                value,
                min,
                max: None,
            } => write!(f, "{field} = {value} must be >= {min}"),
            SettingsIssue::InconsistentDevice { device, force_cpu } => write!(
                f,
                "device = \"{device}\" disagrees with force_cpu = {force_cpu}"
            ),
            SettingsIssue::InvalidValue { field, value } => {
                write!(f, "{field} = {value} is not usable, the default applies")
            }
        }
    }
}

impl Settings {
    /// Builds the typed view of a raw settings object.
    ///
    /// Absent keys take their defaults.  A present key whose value does not
    /// fit the field also takes the default, and is listed in the returned
    /// issues.  Unknown keys are ignored.
    pub fn from_fields(fields: &Map<String, Value>) -> (Self, Vec<SettingsIssue>) {
        let mut s = Settings::default();
        let mut issues = Vec::new();

        read_field(fields, "universal_detection", &mut s.universal_detection, &mut issues);
        read_field(fields, "occupancy_threshold", &mut s.occupancy_threshold, &mut issues);
        read_field(fields, "uncertainty_threshold", &mut s.uncertainty_threshold, &mut issues);
        read_field(
            fields,
            "uncertainty_time_threshold",
            &mut s.uncertainty_time_threshold,
            &mut issues,
        );
        read_field(
            fields,
            "frequent_detection_threshold",
            &mut s.frequent_detection_threshold,
            &mut issues,
        );
        read_field(
            fields,
            "frequent_detection_window",
            &mut s.frequent_detection_window,
            &mut issues,
        );
        read_field(fields, "tracked_objects", &mut s.tracked_objects, &mut issues);
        read_field(fields, "device", &mut s.device, &mut issues);
        read_field(fields, "force_cpu", &mut s.force_cpu, &mut issues);

        (s, issues)
    }

    /// The device mode, treating an absent key as `auto`.
    pub fn device_mode(&self) -> DeviceMode {
        self.device.unwrap_or_default()
    }

    /// The `force_cpu` flag, treating an absent key as `false`.
    pub fn cpu_forced(&self) -> bool {
        self.force_cpu.unwrap_or(false)
    }

    /// Backend the detector will pick given the current GPU availability.
    pub fn effective_device(&self, cuda_available: bool) -> EffectiveDevice {
        resolve_device(self.device_mode(), self.cpu_forced(), cuda_available)
    }

    /// Checks ranges and the `device`/`force_cpu` pairing.
    ///
    /// Returns an empty list for a well-formed document.
    pub fn validate(&self) -> Vec<SettingsIssue> {
        let mut issues = Vec::new();

        let fractions = [
            ("occupancy_threshold", self.occupancy_threshold),
            ("uncertainty_threshold", self.uncertainty_threshold),
        ];
        for (field, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                issues.push(SettingsIssue::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: Some(1.0),
                });
            }
        }

        let durations = [
            ("uncertainty_time_threshold", self.uncertainty_time_threshold),
            ("frequent_detection_window", self.frequent_detection_window),
        ];
        for (field, value) in durations {
            if value < 0.0 {
                issues.push(SettingsIssue::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: None,
                });
            }
        }

        if self.device_mode().forces_cpu() != self.cpu_forced() {
            issues.push(SettingsIssue::InconsistentDevice {
                device: self.device_mode(),
                force_cpu: self.cpu_forced(),
            });
        }

        issues
    }
}

fn read_field<T: DeserializeOwned>(
    fields: &Map<String, Value>,
    key: &'static str,
    slot: &mut T,
    issues: &mut Vec<SettingsIssue>,
) {
    let Some(value) = fields.get(key) else {
        return;
    };
    match T::deserialize(value) {
        Ok(parsed) => *slot = parsed,
        Err(_) => issues.push(SettingsIssue::InvalidValue {
            field: key,
            value: value.to_string(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
