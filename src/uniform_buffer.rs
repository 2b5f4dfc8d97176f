//! # Uniform Buffer Module
//!
//! The per-node data the mesh shader reads from binding `0` of group `0`:
//!
//! ```wgsl
//! struct Uniform {
//!     mvp: mat4x4<f32>,
//!     color: vec4<f32>,
//! };
//! ```
//!
//! `#[repr(C)]` and the `bytemuck` derives keep the Rust layout identical to the WGSL one:
//! 64 bytes of column-major matrix followed by 16 bytes of color, 80 bytes in total.

/// Uniform data for one mesh node.
#[repr(C)]
#[derive(Default, Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBuffer {
    /// Model-view-projection matrix of the node.
    pub mvp: nalgebra_glm::Mat4,
    /// Material base color, multiplied with the vertex shade.
    pub color: nalgebra_glm::Vec4,
}

impl UniformBuffer {
    pub fn new(mvp: nalgebra_glm::Mat4, color: [f32; 4]) -> Self {
        Self {
            mvp,
            color: nalgebra_glm::Vec4::from(color),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<UniformBuffer>(), 80);
        let uniform = UniformBuffer::new(nalgebra_glm::Mat4::identity(), [0.1, 0.2, 0.3, 1.0]);
        let bytes: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&uniform));
        assert_eq!(&bytes[16..], &[0.1, 0.2, 0.3, 1.0]);
        assert_eq!(bytes[0], 1.0);
        assert_eq!(bytes[5], 1.0);
    }
}
