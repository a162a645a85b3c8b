//! Wheel position tables
//!
//! Named position -> step mappings for the three DFOSC wheels, loaded once
//! from the setup YAML at startup. Steps are unique within a table and
//! bounded by the wheel circumference (one full revolution).

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// One full wheel revolution in step units.
pub const WHEEL_CIRCUMFERENCE: u32 = 320_000;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("cannot read wheel setup {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("wheel setup {path} is not valid YAML: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{wheel}: position table is empty")]
    EmptyTable { wheel: String },

    #[error("{wheel}: step {step} assigned to both '{first}' and '{second}'")]
    DuplicateStep {
        wheel: String,
        step: u32,
        first: String,
        second: String,
    },

    #[error("{wheel}: step {step} for '{name}' is not below the circumference {circumference}")]
    StepOutOfBounds {
        wheel: String,
        name: String,
        step: u32,
        circumference: u32,
    },
}

/// Named positions of one wheel, sorted by step.
#[derive(Debug, Clone)]
pub struct WheelPositionTable {
    wheel: String,
    entries: Vec<(String, u32)>,
    circumference: u32,
}

impl WheelPositionTable {
    pub fn new(
        wheel: impl Into<String>,
        positions: impl IntoIterator<Item = (String, u32)>,
    ) -> Result<Self, SetupError> {
        let wheel = wheel.into();
        let mut entries: Vec<(String, u32)> = positions.into_iter().collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        if entries.is_empty() {
            return Err(SetupError::EmptyTable { wheel });
        }
        for pair in entries.windows(2) {
            if pair[0].1 == pair[1].1 {
                return Err(SetupError::DuplicateStep {
                    wheel,
                    step: pair[0].1,
                    first: pair[0].0.clone(),
                    second: pair[1].0.clone(),
                });
            }
        }
        if let Some((name, step)) = entries.iter().find(|(_, s)| *s >= WHEEL_CIRCUMFERENCE) {
            return Err(SetupError::StepOutOfBounds {
                wheel,
                name: name.clone(),
                step: *step,
                circumference: WHEEL_CIRCUMFERENCE,
            });
        }

        Ok(Self {
            wheel,
            entries,
            circumference: WHEEL_CIRCUMFERENCE,
        })
    }

    pub fn wheel(&self) -> &str {
        &self.wheel
    }

    pub fn circumference(&self) -> u32 {
        self.circumference
    }

    pub fn step_of(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, step)| *step)
    }

    pub fn name_at(&self, step: u32) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, s)| *s == step)
            .map(|(name, _)| name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Lowest-step entry; the wrap candidate at the circumference maps back
    /// to this one.
    fn first_entry(&self) -> (&str, u32) {
        let (name, step) = &self.entries[0];
        (name.as_str(), *step)
    }

    /// Best-effort name for a raw step read back from the hardware.
    ///
    /// An exact table hit returns the bare name. Anything else resolves to
    /// the nearest entry by modulo-circumference distance, with an extra
    /// candidate at the circumference standing in for the first entry so
    /// steps near the 0/360-degree boundary land on the right side. Inexact
    /// matches come back decorated as `"<name> [at <step>]"` so a log
    /// reader can tell an exact lock from a guess.
    pub fn guess_position_name(&self, raw_step: u32) -> String {
        if let Some(name) = self.name_at(raw_step) {
            return name.to_string();
        }
        let step = raw_step % self.circumference;
        if let Some(name) = self.name_at(step) {
            return format!("{} [at {}]", name, step);
        }

        let (first_name, _) = self.first_entry();
        let mut best: (&str, u32) = (first_name, step.abs_diff(self.circumference));
        for (name, entry_step) in &self.entries {
            let distance = step.abs_diff(*entry_step) % self.circumference;
            if distance < best.1 {
                best = (name.as_str(), distance);
            }
        }

        // Label with the matched entry's canonical step, not the wrap alias.
        let canonical = self.step_of(best.0).unwrap_or_default();
        format!("{} [at {}]", best.0, canonical)
    }
}

#[derive(Debug, Deserialize)]
struct RawSetup {
    grism: BTreeMap<String, u32>,
    #[serde(alias = "slit")]
    aperture: BTreeMap<String, u32>,
    filter: BTreeMap<String, u32>,
}

/// The three wheel tables, loaded once at startup.
#[derive(Debug, Clone)]
pub struct DfoscSetup {
    pub grism: WheelPositionTable,
    pub aperture: WheelPositionTable,
    pub filter: WheelPositionTable,
}

impl DfoscSetup {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SetupError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text, &path.display().to_string())
    }

    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self, SetupError> {
        let raw: RawSetup = serde_yaml::from_str(text).map_err(|source| SetupError::Yaml {
            path: origin.to_string(),
            source,
        })?;
        Ok(Self {
            grism: WheelPositionTable::new("grism", raw.grism)?,
            aperture: WheelPositionTable::new("aperture", raw.aperture)?,
            filter: WheelPositionTable::new("filter", raw.filter)?,
        })
    }
}
