use wgpu::util::DeviceExt;

use crate::error::MeshError;

/// A vertex type that knows how it is laid out in a vertex buffer.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// Position-only vertex: the mesh carries no normals or texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PositionVertex {
    pub position: [f32; 3],
}

impl PositionVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
}

impl Vertex for PositionVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PositionVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Flat triangle list as it comes out of the OBJ file.
///
/// Every face corner is its own vertex, so `vertices` always holds exactly
/// three floats per entry of `indices` and `indices` is `0..n`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Builds the triangle list from the first shape of a parsed OBJ.
    ///
    /// Shapes after the first are skipped. The loader's indices are only used
    /// to look positions up; the emitted indices are a running counter.
    pub fn from_first_shape(models: &[tobj::Model]) -> Result<Self, MeshError> {
        let (first, rest) = models.split_first().ok_or(MeshError::NoShapes)?;
        if !rest.is_empty() {
            log::warn!(
                "mesh has {} shapes, only `{}` is drawn",
                models.len(),
                first.name
            );
        }

        let mesh = &first.mesh;
        if mesh.indices.is_empty() {
            return Err(MeshError::Empty);
        }

        let mut vertices = Vec::with_capacity(mesh.indices.len() * 3);
        let mut indices = Vec::with_capacity(mesh.indices.len());

        for (i, &vertex_index) in mesh.indices.iter().enumerate() {
            let start = 3 * vertex_index as usize;
            let position = mesh.positions.get(start..start + 3).ok_or(
                MeshError::IndexOutOfRange {
                    index: vertex_index,
                    positions: mesh.positions.len() / 3,
                },
            )?;

            indices.push(i as u32);
            vertices.extend_from_slice(position);
        }

        Ok(Self { vertices, indices })
    }
}

/// The mesh after upload. Neither buffer is written again.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, mesh: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}

pub trait DrawMesh<'a> {
    fn draw_mesh(&mut self, mesh: &'a GpuMesh);
}

impl<'a, 'b> DrawMesh<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(&mut self, mesh: &'b GpuMesh) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.index_count, 0, 0..1);
    }
}
