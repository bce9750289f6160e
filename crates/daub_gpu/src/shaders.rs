//! GPU shaders for brush rasterization
//!
//! Two passes:
//! - dab pass: instanced circular dabs stamped into the persistent
//!   painting-space canvas texture, soft edge via an SDF falloff driven by
//!   brush hardness
//! - blit pass: the canvas texture composited to the surface through the
//!   combined painting→clip projection matrix

/// Instanced dab stamping shader
///
/// One instance per dab; the vertex stage expands each instance into a quad
/// around the dab center in painting space, the fragment stage evaluates a
/// circle SDF with a hardness-controlled falloff.
pub const DAB_SHADER: &str = r#"
// ============================================================================
// Daub Dab Stamping Shader
// ============================================================================

struct CanvasUniforms {
    // Painting-space canvas size in texels
    canvas_size: vec2<f32>,
    _padding: vec2<f32>,
}

struct Dab {
    // Dab center in painting space
    center: vec2<f32>,
    radius: f32,
    // 1.0 = hard edge, 0.0 = fade from center
    hardness: f32,
    color: vec4<f32>,
}

@group(0) @binding(0) var<uniform> uniforms: CanvasUniforms;
@group(0) @binding(1) var<storage, read> dabs: array<Dab>;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) local: vec2<f32>,
    @location(1) @interpolate(flat) instance_index: u32,
}

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @builtin(instance_index) instance_index: u32,
) -> VertexOutput {
    let dab = dabs[instance_index];

    let quad_verts = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = quad_verts[vertex_index];

    // One texel of padding so the falloff is never clipped
    let extent = dab.radius + 1.0;
    let pos = dab.center + corner * extent;

    // Painting space -> clip space of the canvas texture (y down)
    let ndc = vec2<f32>(
        pos.x / uniforms.canvas_size.x * 2.0 - 1.0,
        1.0 - pos.y / uniforms.canvas_size.y * 2.0,
    );

    var out: VertexOutput;
    out.position = vec4<f32>(ndc, 0.0, 1.0);
    out.local = corner * extent;
    out.instance_index = instance_index;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let dab = dabs[in.instance_index];
    let dist = length(in.local);

    // Falloff starts at hardness * radius and ends at the radius edge,
    // with half a texel of analytic antialiasing for hard brushes.
    let inner = dab.radius * dab.hardness;
    let edge = max(dab.radius - inner, 0.5);
    let alpha = 1.0 - smoothstep(inner, inner + edge, dist);

    if (alpha <= 0.0) {
        discard;
    }
    return vec4<f32>(dab.color.rgb, dab.color.a * alpha);
}
"#;

/// Canvas-to-surface blit shader
///
/// Draws the painting-space rect as one quad, positioned by the combined
/// projection matrix, sampling the canvas texture.
pub const BLIT_SHADER: &str = r#"
// ============================================================================
// Daub Canvas Blit Shader
// ============================================================================

struct BlitUniforms {
    // Combined painting-space -> clip-space projection
    projection: mat4x4<f32>,
    // Logical painting size
    painting_size: vec2<f32>,
    _padding: vec2<f32>,
}

@group(0) @binding(0) var<uniform> uniforms: BlitUniforms;
@group(0) @binding(1) var canvas_texture: texture_2d<f32>;
@group(0) @binding(2) var canvas_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    let quad_verts = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(0.0, 1.0),
    );
    let uv = quad_verts[vertex_index];
    let pos = uv * uniforms.painting_size;

    var out: VertexOutput;
    out.position = uniforms.projection * vec4<f32>(pos, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(canvas_texture, canvas_sampler, in.uv);
}
"#;
