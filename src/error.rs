use std::{io, path::PathBuf};

use thiserror::Error;

use crate::shader::ShaderStage;

/// Reading a text asset from disk.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Failed to load mesh {}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("Failed to load mesh: file contains no shapes")]
    NoShapes,

    #[error("Failed to load mesh: first shape has no faces")]
    Empty,

    #[error("Failed to load mesh: index {index} is past the {positions} positions of the shape")]
    IndexOutOfRange { index: u32, positions: usize },
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("shader program failed to link:\n{log}")]
    Link { log: String },

    #[error("shader program has no uniform named `{name}`")]
    MissingUniform { name: &'static str },

    #[error("uniform `{name}` must be a mat4x4<f32>")]
    UniformType { name: &'static str },

    #[error("unsupported uniform layout: {0}")]
    UniformLayout(String),
}

/// Creating the surface, adapter and device behind the window.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to create a surface for the window")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no graphics adapter can present to the window")]
    NoAdapter,

    #[error("failed to open the graphics device")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("the surface reports no supported formats")]
    NoSurfaceFormat,
}
