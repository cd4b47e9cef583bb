use std::{fs, io, path::Path};

use crate::config::Config;
use crate::error::{FileError, MeshError};
use crate::model::MeshData;

/// Everything read from disk before the window and GPU are touched.
pub struct Assets {
    pub vertex_shader: String,
    pub fragment_shader: String,
    pub mesh: MeshData,
}

impl Assets {
    pub fn load(config: &Config) -> anyhow::Result<Self> {
        let vertex_shader = read_to_string(&config.vertex_shader_path)?;
        let fragment_shader = read_to_string(&config.fragment_shader_path)?;
        let mesh = load_mesh(&config.mesh_path)?;

        Ok(Self {
            vertex_shader,
            fragment_shader,
            mesh,
        })
    }
}

/// Reads a whole text file, telling a missing file apart from any other IO failure.
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String, FileError> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => FileError::NotFound {
            path: path.to_path_buf(),
        },
        _ => FileError::Read {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Loads an OBJ file and flattens its first shape, see [MeshData::from_first_shape].
pub fn load_mesh(path: impl AsRef<Path>) -> Result<MeshData, MeshError> {
    let path = path.as_ref();
    let load_options = tobj::LoadOptions {
        triangulate: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    };

    let (models, materials) =
        tobj::load_obj(path, &load_options).map_err(|source| MeshError::Load {
            path: path.to_path_buf(),
            source,
        })?;

    // materials are never used, a broken mtllib is not worth failing over
    if let Err(e) = materials {
        log::debug!("ignoring materials of {}: {e}", path.display());
    }

    let mesh = MeshData::from_first_shape(&models)?;
    log::info!(
        "loaded mesh {} ({} indices)",
        path.display(),
        mesh.indices.len()
    );
    Ok(mesh)
}
