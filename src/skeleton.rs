//! Interface to the rig that receives joint rotations.

use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Stable handle to a joint, obtained once by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointHandle(pub usize);

/// Which local rotation axis of a joint a value drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Heading,
    Pitch,
    Roll,
}

/// Local joint rotation in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AxisAngles {
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl AxisAngles {
    #[must_use]
    pub const fn new(heading: f64, pitch: f64, roll: f64) -> Self {
        Self { heading, pitch, roll }
    }

    #[must_use]
    pub const fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Heading => self.heading,
            Axis::Pitch => self.pitch,
            Axis::Roll => self.roll,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::Heading => self.heading = value,
            Axis::Pitch => self.pitch = value,
            Axis::Roll => self.roll = value,
        }
    }
}

/// A skeleton whose joints can be rotated
pub trait Skeleton {
    /// Look a joint up by name
    fn resolve_joint(&self, name: &str) -> Option<JointHandle>;

    /// Replace the local rotation of a joint
    fn set_local_rotation(&mut self, joint: JointHandle, angles: AxisAngles);
}

/// Skeleton that stores the last rotation written to each joint
#[derive(Debug, Clone, Default)]
pub struct InMemorySkeleton {
    names: Vec<String>,
    lookup: HashMap<String, JointHandle>,
    rotations: Vec<AxisAngles>,
    writes: usize,
}

impl InMemorySkeleton {
    /// Build a skeleton with the given joint names
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for an empty or duplicate joint name
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut skeleton = Self::default();
        for name in names {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(Error::ConfigError("Joint names must not be empty".to_string()));
            }
            if skeleton.lookup.contains_key(&name) {
                return Err(Error::ConfigError(format!("Duplicate joint name '{name}'")));
            }
            let handle = JointHandle(skeleton.names.len());
            skeleton.lookup.insert(name.clone(), handle);
            skeleton.names.push(name);
            skeleton.rotations.push(AxisAngles::default());
        }
        Ok(skeleton)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn joint_name(&self, joint: JointHandle) -> Option<&str> {
        self.names.get(joint.0).map(String::as_str)
    }

    #[must_use]
    pub fn rotation(&self, joint: JointHandle) -> Option<AxisAngles> {
        self.rotations.get(joint.0).copied()
    }

    /// Current rotation of a joint by name
    #[must_use]
    pub fn rotation_of(&self, name: &str) -> Option<AxisAngles> {
        self.resolve_joint(name).and_then(|joint| self.rotation(joint))
    }

    /// Total number of `set_local_rotation` calls received
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }

    /// All joints with their current rotation, in declaration order
    pub fn pose(&self) -> impl Iterator<Item = (&str, AxisAngles)> {
        self.names.iter().map(String::as_str).zip(self.rotations.iter().copied())
    }
}

impl Skeleton for InMemorySkeleton {
    fn resolve_joint(&self, name: &str) -> Option<JointHandle> {
        self.lookup.get(name).copied()
    }

    fn set_local_rotation(&mut self, joint: JointHandle, angles: AxisAngles) {
        if let Some(slot) = self.rotations.get_mut(joint.0) {
            *slot = angles;
            self.writes += 1;
        } else {
            log::warn!("Ignoring rotation for unknown joint handle {}", joint.0);
        }
    }
}
