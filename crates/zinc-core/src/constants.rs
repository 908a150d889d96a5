//! Global constants for zinc-core

/// Default animation duration of a newly created primitive
pub const OBJECT_DEFAULT_DURATION: f32 = 6000.0;

/// Default duration handed to objects loaded into a region
pub const REGION_DEFAULT_DURATION: f32 = 3000.0;

/// Default scene duration, restored by `Scene::reset_duration`
pub const SCENE_DEFAULT_DURATION: f32 = 3000.0;

/// Frames per second used when turning morph target sequences into a clip
pub const MORPH_CLIP_FPS: f32 = 10.0;

/// Default colour for surfaces without a material (RGB)
pub const DEFAULT_COLOUR: [f32; 3] = [1.0, 1.0, 1.0];

/// Default opacity for surfaces without a material
pub const DEFAULT_OPACITY: f32 = 1.0;

/// Default point size for point sets
pub const DEFAULT_POINT_SIZE: f32 = 5.0;

/// Default line width
pub const DEFAULT_LINE_WIDTH: f32 = 1.0;

/// Default playback rate (time units advanced per second of wall time)
pub const DEFAULT_PLAY_RATE: f32 = 500.0;

/// LOD threshold multiplier (of the bounding radius) for the "close" level
pub const LOD_CLOSE_FACTOR: f32 = 3.0;

/// LOD threshold multiplier (of the bounding radius) for the "medium" level
pub const LOD_MEDIUM_FACTOR: f32 = 8.0;

/// Marker sprite base size (width, height) in normalized screen units
pub const MARKER_SIZE: [f32; 2] = [0.015, 0.02];

/// Render order reserved for markers
pub const MARKER_RENDER_ORDER: i32 = 3;
