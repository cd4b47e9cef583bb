//! Shader compilation, uniform lookup and pipeline linking.
//!
//! Each stage is checked on its own with naga before wgpu sees it, so a
//! broken stage reports as a compile error with the front end's diagnostic.
//! Linking both stages into the render pipeline runs inside a validation
//! error scope and reports as a link error.

use std::fmt;

use crate::error::ShaderError;

pub const MODEL_UNIFORM: &str = "model";
pub const VIEW_UNIFORM: &str = "view";
pub const PROJECTION_UNIFORM: &str = "projection";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Bind group and binding a uniform was declared at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UniformDecl {
    name: String,
    location: UniformLocation,
    is_mat4: bool,
}

/// What the host needs to know about one compiled stage.
#[derive(Debug, Clone)]
pub struct StageReflection {
    pub entry_point: String,
    uniforms: Vec<UniformDecl>,
}

impl StageReflection {
    /// Parses and validates one stage, and finds its entry point.
    pub fn compile(stage: ShaderStage, source: &str) -> Result<Self, ShaderError> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
            stage,
            log: e.emit_to_string(source),
        })?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        );
        validator
            .validate(&module)
            .map_err(|e| ShaderError::Compile {
                stage,
                log: format!("{e:?}"),
            })?;

        let entry_point = module
            .entry_points
            .iter()
            .find(|ep| ep.stage == stage.naga())
            .map(|ep| ep.name.clone())
            .ok_or_else(|| ShaderError::Compile {
                stage,
                log: format!("no @{stage} entry point"),
            })?;

        let uniforms = module
            .global_variables
            .iter()
            .filter(|(_, global)| global.space == naga::AddressSpace::Uniform)
            .filter_map(|(_, global)| {
                let name = global.name.clone()?;
                let binding = global.binding.as_ref()?;
                let is_mat4 = matches!(
                    module.types[global.ty].inner,
                    naga::TypeInner::Matrix {
                        columns: naga::VectorSize::Quad,
                        rows: naga::VectorSize::Quad,
                        ..
                    }
                );
                Some(UniformDecl {
                    name,
                    location: UniformLocation {
                        group: binding.group,
                        binding: binding.binding,
                    },
                    is_mat4,
                })
            })
            .collect();

        Ok(Self {
            entry_point,
            uniforms,
        })
    }

    fn uniform(&self, name: &str) -> Option<&UniformDecl> {
        self.uniforms.iter().find(|u| u.name == name)
    }
}

/// Looks a `mat4x4<f32>` uniform up by name across the linked stages.
pub fn uniform_location(
    stages: &[&StageReflection],
    name: &'static str,
) -> Result<UniformLocation, ShaderError> {
    let decl = stages
        .iter()
        .find_map(|stage| stage.uniform(name))
        .ok_or(ShaderError::MissingUniform { name })?;

    if !decl.is_mat4 {
        return Err(ShaderError::UniformType { name });
    }
    Ok(decl.location)
}

/// Where the three matrices live.
///
/// `view` and `projection` change once per frame and share the camera group;
/// `model` changes per draw and sits alone in the model group, bound with a
/// dynamic offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlots {
    pub model: UniformLocation,
    pub view: UniformLocation,
    pub projection: UniformLocation,
}

impl UniformSlots {
    pub fn locate(stages: &[&StageReflection]) -> Result<Self, ShaderError> {
        let slots = Self {
            model: uniform_location(stages, MODEL_UNIFORM)?,
            view: uniform_location(stages, VIEW_UNIFORM)?,
            projection: uniform_location(stages, PROJECTION_UNIFORM)?,
        };

        if slots.view.group != slots.projection.group {
            return Err(ShaderError::UniformLayout(format!(
                "`view` (group {}) and `projection` (group {}) must share a group",
                slots.view.group, slots.projection.group
            )));
        }
        if slots.view.binding == slots.projection.binding {
            return Err(ShaderError::UniformLayout(
                "`view` and `projection` use the same binding".to_owned(),
            ));
        }
        match (slots.camera_group(), slots.model_group()) {
            (0, 1) | (1, 0) => {}
            (camera, model) => {
                return Err(ShaderError::UniformLayout(format!(
                    "camera uniforms in group {camera} and `model` in group {model}, expected groups 0 and 1"
                )))
            }
        }

        log::debug!("uniform slots: {slots:?}");
        Ok(slots)
    }

    pub fn camera_group(&self) -> u32 {
        self.view.group
    }

    pub fn model_group(&self) -> u32 {
        self.model.group
    }
}

/// The linked vertex + fragment pair and the layouts its uniforms bind through.
pub struct ShaderProgram {
    pub pipeline: wgpu::RenderPipeline,
    pub camera_layout: wgpu::BindGroupLayout,
    pub model_layout: wgpu::BindGroupLayout,
    pub slots: UniformSlots,
}

impl ShaderProgram {
    pub async fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        vertex_layouts: &[wgpu::VertexBufferLayout<'_>],
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderError> {
        let vertex = StageReflection::compile(ShaderStage::Vertex, vertex_source)?;
        let fragment = StageReflection::compile(ShaderStage::Fragment, fragment_source)?;
        let slots = UniformSlots::locate(&[&vertex, &fragment])?;

        let vertex_module =
            create_stage_module(device, ShaderStage::Vertex, vertex_source).await?;
        let fragment_module =
            create_stage_module(device, ShaderStage::Fragment, fragment_source).await?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera_bind_group_layout"),
            entries: &[
                matrix_layout_entry(slots.view.binding, false),
                matrix_layout_entry(slots.projection.binding, false),
            ],
        });

        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("model_bind_group_layout"),
            entries: &[matrix_layout_entry(slots.model.binding, true)],
        });

        let bind_group_layouts = if slots.camera_group() == 0 {
            [&camera_layout, &model_layout]
        } else {
            [&model_layout, &camera_layout]
        };

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let pipeline = create_render_pipeline(
            device,
            &layout,
            color_format,
            vertex_layouts,
            (&vertex_module, &vertex.entry_point),
            (&fragment_module, &fragment.entry_point),
        );

        if let Some(e) = device.pop_error_scope().await {
            return Err(ShaderError::Link { log: e.to_string() });
        }

        // the pipeline keeps what it needs, the stage modules can go
        drop(vertex_module);
        drop(fragment_module);

        log::info!(
            "linked shader program ({} -> {})",
            vertex.entry_point,
            fragment.entry_point
        );

        Ok(Self {
            pipeline,
            camera_layout,
            model_layout,
            slots,
        })
    }
}

async fn create_stage_module(
    device: &wgpu::Device,
    stage: ShaderStage,
    source: &str,
) -> Result<wgpu::ShaderModule, ShaderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(match stage {
            ShaderStage::Vertex => "Vertex Shader",
            ShaderStage::Fragment => "Fragment Shader",
        }),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    match device.pop_error_scope().await {
        Some(e) => Err(ShaderError::Compile {
            stage,
            log: e.to_string(),
        }),
        None => Ok(module),
    }
}

fn matrix_layout_entry(binding: u32, has_dynamic_offset: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset,
            min_binding_size: wgpu::BufferSize::new(MATRIX_SIZE),
        },
        count: None,
    }
}

pub const MATRIX_SIZE: wgpu::BufferAddress =
    std::mem::size_of::<[[f32; 4]; 4]>() as wgpu::BufferAddress;

fn create_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    (vertex_module, vertex_entry): (&wgpu::ShaderModule, &str),
    (fragment_module, fragment_entry): (&wgpu::ShaderModule, &str),
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex_module,
            entry_point: vertex_entry,
            buffers: vertex_layouts,
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment_module,
            entry_point: fragment_entry,
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // no culling and no depth test, both instances of every triangle are kept
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = include_str!("../Shaders/sample.vert.wgsl");
    const FRAGMENT: &str = include_str!("../Shaders/sample.frag.wgsl");

    fn compile_shipped() -> (StageReflection, StageReflection) {
        (
            StageReflection::compile(ShaderStage::Vertex, VERTEX).unwrap(),
            StageReflection::compile(ShaderStage::Fragment, FRAGMENT).unwrap(),
        )
    }

    #[test]
    fn shipped_shaders_compile() {
        let (vertex, fragment) = compile_shipped();
        assert_eq!(vertex.entry_point, "vs_main");
        assert_eq!(fragment.entry_point, "fs_main");
    }

    #[test]
    fn shipped_shaders_expose_all_three_matrices() {
        let (vertex, fragment) = compile_shipped();
        let slots = UniformSlots::locate(&[&vertex, &fragment]).unwrap();

        assert_eq!(slots.view, UniformLocation { group: 0, binding: 0 });
        assert_eq!(slots.projection, UniformLocation { group: 0, binding: 1 });
        assert_eq!(slots.model, UniformLocation { group: 1, binding: 0 });
        assert_eq!(slots.camera_group(), 0);
        assert_eq!(slots.model_group(), 1);
    }

    #[test]
    fn syntax_error_is_a_compile_error_for_that_stage() {
        let err = StageReflection::compile(ShaderStage::Fragment, "fn fs_main( {").unwrap_err();
        match err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn type_error_is_a_compile_error() {
        let source = "@fragment\nfn fs_main() -> @location(0) vec4<f32> { return 1.0; }\n";
        let err = StageReflection::compile(ShaderStage::Fragment, source).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Compile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
    }

    #[test]
    fn stage_without_its_entry_point_fails() {
        let err = StageReflection::compile(ShaderStage::Vertex, FRAGMENT).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Compile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
    }

    #[test]
    fn missing_uniform_is_fatal() {
        let source = VERTEX.replace("var<uniform> model", "var<uniform> world").replace(
            "* model *",
            "* world *",
        );
        let vertex = StageReflection::compile(ShaderStage::Vertex, &source).unwrap();
        let (_, fragment) = compile_shipped();

        let err = UniformSlots::locate(&[&vertex, &fragment]).unwrap_err();
        assert!(matches!(err, ShaderError::MissingUniform { name: "model" }));
    }

    #[test]
    fn uniform_must_be_a_matrix() {
        let source = "\
@group(0) @binding(0) var<uniform> view: vec4<f32>;

@vertex
fn vs_main() -> @builtin(position) vec4<f32> {
    return view;
}
";
        let vertex = StageReflection::compile(ShaderStage::Vertex, source).unwrap();
        let err = uniform_location(&[&vertex], VIEW_UNIFORM).unwrap_err();
        assert!(matches!(err, ShaderError::UniformType { name: "view" }));
    }

    #[test]
    fn uniforms_are_found_in_either_stage() {
        let fragment_source = "\
@group(1) @binding(3) var<uniform> projection: mat4x4<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return projection[0];
}
";
        let (vertex, _) = compile_shipped();
        let fragment = StageReflection::compile(ShaderStage::Fragment, fragment_source).unwrap();

        let location = uniform_location(&[&fragment, &vertex], PROJECTION_UNIFORM).unwrap();
        assert_eq!(location, UniformLocation { group: 1, binding: 3 });
    }

    #[test]
    fn camera_matrices_must_share_a_group() {
        let source = VERTEX.replace(
            "@group(0) @binding(1) var<uniform> projection",
            "@group(2) @binding(1) var<uniform> projection",
        );
        let vertex = StageReflection::compile(ShaderStage::Vertex, &source).unwrap();
        let (_, fragment) = compile_shipped();

        let err = UniformSlots::locate(&[&vertex, &fragment]).unwrap_err();
        assert!(matches!(err, ShaderError::UniformLayout(_)));
    }

    #[test]
    fn model_needs_its_own_group() {
        let source = VERTEX.replace(
            "@group(1) @binding(0) var<uniform> model",
            "@group(0) @binding(2) var<uniform> model",
        );
        let vertex = StageReflection::compile(ShaderStage::Vertex, &source).unwrap();
        let (_, fragment) = compile_shipped();

        let err = UniformSlots::locate(&[&vertex, &fragment]).unwrap_err();
        assert!(matches!(err, ShaderError::UniformLayout(_)));
    }

    #[test]
    fn swapped_groups_are_accepted() {
        let source = VERTEX
            .replace("@group(0) @binding(0) var<uniform> view", "@group(1) @binding(0) var<uniform> view")
            .replace(
                "@group(0) @binding(1) var<uniform> projection",
                "@group(1) @binding(1) var<uniform> projection",
            )
            .replace("@group(1) @binding(0) var<uniform> model", "@group(0) @binding(0) var<uniform> model");
        let vertex = StageReflection::compile(ShaderStage::Vertex, &source).unwrap();
        let (_, fragment) = compile_shipped();

        let slots = UniformSlots::locate(&[&vertex, &fragment]).unwrap();
        assert_eq!(slots.camera_group(), 1);
        assert_eq!(slots.model_group(), 0);
    }
}
