use cgmath::*;

/// cgmath builds OpenGL clip space (z in [-1, 1]); wgpu expects z in [0, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// A camera that never moves. Its matrices are rebuilt every frame from the
/// same fields, which always gives the same bits.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fovy: Deg<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn build_view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn build_projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

impl Default for Camera {
    /// Pulled back 90 units on +Z, looking at the origin.
    fn default() -> Self {
        Self {
            eye: Point3::new(0.0, 0.0, 90.0),
            target: Point3::origin(),
            up: Vector3::unit_y(),
            fovy: Deg(60.0),
            aspect: 1.0,
            znear: 0.1,
            zfar: 1000.0,
        }
    }
}

/// One 4x4 matrix as it sits in a uniform buffer, column-major.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MatrixUniform {
    pub matrix: [[f32; 4]; 4],
}

impl From<Matrix4<f32>> for MatrixUniform {
    fn from(matrix: Matrix4<f32>) -> Self {
        Self {
            matrix: matrix.into(),
        }
    }
}
