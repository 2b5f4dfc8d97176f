//! # Pose
//!
//! A rigid transform (position + orientation) stored as a 4x4 matrix in the scene graph's
//! convention. Poses travel from a hit-test result into the reticle, and from the reticle into
//! each placed object, by plain copy.
//!
//! Devices hand out transforms as 16 floats in column-major order, which is also the storage
//! order of `nalgebra_glm::Mat4`, so conversions in both directions are a straight copy.

use nalgebra_glm::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    matrix: Mat4,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            matrix: Mat4::identity(),
        }
    }

    pub fn from_matrix(matrix: Mat4) -> Self {
        Self { matrix }
    }

    /// Builds a pose from 16 column-major floats, as reported by the device.
    pub fn from_array(values: &[f32; 16]) -> Self {
        Self {
            matrix: Mat4::from_column_slice(values),
        }
    }

    /// Builds a pose from a device-provided slice, or `None` if it does not hold 16 floats.
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        let values: &[f32; 16] = values.try_into().ok()?;
        Some(Self::from_array(values))
    }

    pub fn from_translation(translation: &Vec3) -> Self {
        Self {
            matrix: nalgebra_glm::translation(translation),
        }
    }

    pub fn to_array(&self) -> [f32; 16] {
        let mut values = [0.0; 16];
        values.copy_from_slice(self.matrix.as_slice());
        values
    }

    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    pub fn translation(&self) -> Vec3 {
        nalgebra_glm::vec3(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_layout_is_column_major() {
        let mut values = [0.0; 16];
        values[0] = 1.0;
        values[5] = 1.0;
        values[10] = 1.0;
        values[15] = 1.0;
        values[12] = 2.0;
        values[13] = 0.5;
        values[14] = -3.0;

        let pose = Pose::from_array(&values);
        assert_eq!(pose.translation(), nalgebra_glm::vec3(2.0, 0.5, -3.0));
        assert_eq!(pose.to_array(), values);
        assert_eq!(pose, Pose::from_translation(&nalgebra_glm::vec3(2.0, 0.5, -3.0)));
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(Pose::from_slice(&[0.0; 12]).is_none());
        assert_eq!(Pose::from_slice(&Pose::identity().to_array()), Some(Pose::identity()));
    }
}
