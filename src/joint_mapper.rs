//! Mapping of tracked angles onto skeleton joints.
//!
//! Each [`JointTarget`] routes one quantity to one axis of one joint through
//! `angle * scale + offset`. Targets are resolved against the skeleton once;
//! per frame the mapper merges all targets of a joint and issues a single
//! rotation write for it.

use crate::{
    constants::INDEX_FINGER_GAIN,
    skeleton::{Axis, AxisAngles, JointHandle, Skeleton},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tracked angle that can drive joints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    HeadPitch,
    HeadYaw,
    HeadRoll,
    LeftHand,
    RightHand,
}

impl Quantity {
    pub const ALL: [Self; 5] = [Self::HeadPitch, Self::HeadYaw, Self::HeadRoll, Self::LeftHand, Self::RightHand];

    const fn index(self) -> usize {
        match self {
            Self::HeadPitch => 0,
            Self::HeadYaw => 1,
            Self::HeadRoll => 2,
            Self::LeftHand => 3,
            Self::RightHand => 4,
        }
    }

    #[must_use]
    pub const fn is_head(self) -> bool {
        matches!(self, Self::HeadPitch | Self::HeadYaw | Self::HeadRoll)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HeadPitch => "head_pitch",
            Self::HeadYaw => "head_yaw",
            Self::HeadRoll => "head_roll",
            Self::LeftHand => "left_hand",
            Self::RightHand => "right_hand",
        };
        f.write_str(name)
    }
}

/// Latest value of every quantity, `None` until first observed
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuantityValues {
    values: [Option<f64>; 5],
}

impl QuantityValues {
    #[must_use]
    pub const fn new() -> Self {
        Self { values: [None; 5] }
    }

    #[must_use]
    pub const fn get(&self, quantity: Quantity) -> Option<f64> {
        self.values[quantity.index()]
    }

    pub fn set(&mut self, quantity: Quantity, value: f64) {
        self.values[quantity.index()] = Some(value);
    }

    pub fn clear(&mut self, quantity: Quantity) {
        self.values[quantity.index()] = None;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Quantity, f64)> + '_ {
        Quantity::ALL
            .iter()
            .filter_map(|&quantity| self.get(quantity).map(|value| (quantity, value)))
    }
}

const fn unit_scale() -> f64 {
    1.0
}

/// One quantity driving one axis of one named joint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointTarget {
    pub quantity: Quantity,
    pub joint: String,
    pub axis: Axis,
    #[serde(default = "unit_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

impl JointTarget {
    #[must_use]
    pub fn new(quantity: Quantity, joint: impl Into<String>, axis: Axis) -> Self {
        Self {
            quantity,
            joint: joint.into(),
            axis,
            scale: 1.0,
            offset: 0.0,
        }
    }

    #[must_use]
    pub const fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Value written to the joint axis for an input angle
    #[must_use]
    pub fn map(&self, angle: f64) -> f64 {
        angle.mul_add(self.scale, self.offset)
    }

    /// Head on the `Head` joint, each hand on its hand joint and, amplified,
    /// on its index finger base
    #[must_use]
    pub fn default_targets() -> Vec<Self> {
        vec![
            Self::new(Quantity::HeadYaw, "Head", Axis::Heading),
            Self::new(Quantity::HeadPitch, "Head", Axis::Pitch),
            Self::new(Quantity::HeadRoll, "Head", Axis::Roll),
            Self::new(Quantity::LeftHand, "hand.L", Axis::Heading),
            Self::new(Quantity::LeftHand, "f_index.01.L", Axis::Heading).with_scale(INDEX_FINGER_GAIN),
            Self::new(Quantity::RightHand, "hand.R", Axis::Heading),
            Self::new(Quantity::RightHand, "f_index.01.R", Axis::Heading).with_scale(INDEX_FINGER_GAIN),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    quantity: Quantity,
    axis: Axis,
    scale: f64,
    offset: f64,
}

impl Binding {
    fn map(&self, angle: f64) -> f64 {
        angle.mul_add(self.scale, self.offset)
    }
}

/// Resolved joint targets, grouped by joint
#[derive(Debug, Clone, Default)]
pub struct JointMapper {
    joints: Vec<(JointHandle, String, Vec<Binding>)>,
}

impl JointMapper {
    /// Resolve every target's joint name against the skeleton
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingJoint` for the first name the skeleton does not
    /// know, and `Error::ConfigError` for a non-finite scale or offset or for
    /// two targets writing the same axis of one joint
    pub fn resolve<S: Skeleton + ?Sized>(targets: &[JointTarget], skeleton: &S) -> Result<Self> {
        let mut mapper = Self::default();

        for target in targets {
            if !target.scale.is_finite() || !target.offset.is_finite() {
                return Err(Error::ConfigError(format!(
                    "Target {} -> {} has a non-finite scale or offset",
                    target.quantity, target.joint
                )));
            }

            let handle = skeleton
                .resolve_joint(&target.joint)
                .ok_or_else(|| Error::MissingJoint(target.joint.clone()))?;

            let binding = Binding {
                quantity: target.quantity,
                axis: target.axis,
                scale: target.scale,
                offset: target.offset,
            };

            match mapper.joints.iter_mut().find(|(h, _, _)| *h == handle) {
                Some((_, name, bindings)) => {
                    if bindings.iter().any(|b| b.axis == binding.axis) {
                        return Err(Error::ConfigError(format!(
                            "Joint '{name}' has more than one target on the {:?} axis",
                            binding.axis
                        )));
                    }
                    bindings.push(binding);
                }
                None => mapper.joints.push((handle, target.joint.clone(), vec![binding])),
            }

            log::debug!(
                "Bound {} to {}.{:?} (scale {}, offset {})",
                target.quantity,
                target.joint,
                target.axis,
                target.scale,
                target.offset
            );
        }

        log::info!("Resolved {} joint targets on {} joints", targets.len(), mapper.joints.len());
        Ok(mapper)
    }

    /// Number of distinct joints driven
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Joints and the quantities driving them
    pub fn bindings(&self) -> impl Iterator<Item = (&str, Quantity, Axis)> {
        self.joints
            .iter()
            .flat_map(|(_, name, bindings)| bindings.iter().map(move |b| (name.as_str(), b.quantity, b.axis)))
    }

    /// Rotation of each joint for the given quantity values.
    ///
    /// Axes without a driving target, or whose quantity has no value yet, are
    /// zero. Joints none of whose quantities have a value are left out.
    #[must_use]
    pub fn compose(&self, values: &QuantityValues) -> Vec<(JointHandle, &str, AxisAngles)> {
        self.joints
            .iter()
            .filter_map(|(handle, name, bindings)| {
                let mut angles = AxisAngles::default();
                let mut driven = false;
                for binding in bindings {
                    if let Some(value) = values.get(binding.quantity) {
                        angles.set(binding.axis, binding.map(value));
                        driven = true;
                    }
                }
                driven.then_some((*handle, name.as_str(), angles))
            })
            .collect()
    }

    /// Write the composed rotations to the skeleton, one call per joint.
    ///
    /// Returns the number of joints written.
    pub fn apply<S: Skeleton + ?Sized>(&self, values: &QuantityValues, skeleton: &mut S) -> usize {
        let rotations = self.compose(values);
        for (handle, name, angles) in &rotations {
            log::trace!(
                "{name}: heading {:.2}, pitch {:.2}, roll {:.2}",
                angles.heading,
                angles.pitch,
                angles.roll
            );
            skeleton.set_local_rotation(*handle, *angles);
        }
        rotations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::InMemorySkeleton;

    fn rig() -> InMemorySkeleton {
        InMemorySkeleton::new(["Head", "hand.L", "f_index.01.L", "hand.R", "f_index.01.R"]).unwrap()
    }

    #[test]
    fn test_missing_joint_is_fatal() {
        let targets = vec![JointTarget::new(Quantity::HeadYaw, "Neck", Axis::Heading)];
        let err = JointMapper::resolve(&targets, &rig()).unwrap_err();
        assert!(matches!(err, Error::MissingJoint(ref name) if name == "Neck"));
    }

    #[test]
    fn test_duplicate_axis_rejected() {
        let targets = vec![
            JointTarget::new(Quantity::HeadYaw, "Head", Axis::Heading),
            JointTarget::new(Quantity::HeadPitch, "Head", Axis::Heading),
        ];
        assert!(matches!(JointMapper::resolve(&targets, &rig()), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_scale_and_offset() {
        let target = JointTarget::new(Quantity::LeftHand, "hand.L", Axis::Roll)
            .with_scale(1.2)
            .with_offset(-5.0);
        assert!((target.map(10.0) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_head_axes_merge_into_one_write() {
        let mut skeleton = rig();
        let mapper = JointMapper::resolve(&JointTarget::default_targets(), &skeleton).unwrap();
        assert_eq!(mapper.joint_count(), 5);

        let mut values = QuantityValues::new();
        values.set(Quantity::HeadPitch, 5.0);
        values.set(Quantity::HeadYaw, -10.0);
        values.set(Quantity::HeadRoll, 2.0);

        let written = mapper.apply(&values, &mut skeleton);
        assert_eq!(written, 1);
        assert_eq!(skeleton.writes(), 1);
        assert_eq!(skeleton.rotation_of("Head"), Some(AxisAngles::new(-10.0, 5.0, 2.0)));
    }

    #[test]
    fn test_hand_drives_index_finger() {
        let mut skeleton = rig();
        let mapper = JointMapper::resolve(&JointTarget::default_targets(), &skeleton).unwrap();

        let mut values = QuantityValues::new();
        values.set(Quantity::RightHand, -30.0);
        mapper.apply(&values, &mut skeleton);

        let hand = skeleton.rotation_of("hand.R").unwrap();
        let finger = skeleton.rotation_of("f_index.01.R").unwrap();
        assert_eq!(hand, AxisAngles::new(-30.0, 0.0, 0.0));
        assert!((finger.heading + 36.0).abs() < 1e-9);
        assert_eq!(skeleton.rotation_of("hand.L"), Some(AxisAngles::default()));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut skeleton = rig();
        let mapper = JointMapper::resolve(&JointTarget::default_targets(), &skeleton).unwrap();

        let mut values = QuantityValues::new();
        values.set(Quantity::HeadYaw, 12.0);
        values.set(Quantity::LeftHand, 45.0);

        mapper.apply(&values, &mut skeleton);
        let first: Vec<_> = skeleton.pose().map(|(n, a)| (n.to_string(), a)).collect();
        mapper.apply(&values, &mut skeleton);
        let second: Vec<_> = skeleton.pose().map(|(n, a)| (n.to_string(), a)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_target_deserialize_defaults() {
        let target: JointTarget = serde_yaml::from_str("quantity: left_hand\njoint: hand.L\naxis: heading\n").unwrap();
        assert_eq!(target.scale, 1.0);
        assert_eq!(target.offset, 0.0);
    }
}
