//! Fixed startup values. The viewer takes no arguments and reads no
//! configuration file, so everything it needs is named here.

use std::path::PathBuf;

pub const WINDOW_TITLE: &str = "Orbit Viewer";
pub const WINDOW_WIDTH: u32 = 600;
pub const WINDOW_HEIGHT: u32 = 600;

pub const VERTEX_SHADER_PATH: &str = "Shaders/sample.vert.wgsl";
pub const FRAGMENT_SHADER_PATH: &str = "Shaders/sample.frag.wgsl";
pub const MESH_PATH: &str = "3D/bunny.obj";

/// Where the assets live and how big the window is.
///
/// Paths are relative to the working directory.
#[derive(Debug, Clone)]
pub struct Config {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub vertex_shader_path: PathBuf,
    pub fragment_shader_path: PathBuf,
    pub mesh_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_title: WINDOW_TITLE.to_owned(),
            window_width: WINDOW_WIDTH,
            window_height: WINDOW_HEIGHT,
            vertex_shader_path: PathBuf::from(VERTEX_SHADER_PATH),
            fragment_shader_path: PathBuf::from(FRAGMENT_SHADER_PATH),
            mesh_path: PathBuf::from(MESH_PATH),
        }
    }
}
