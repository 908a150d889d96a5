//! Distance-selected levels of detail

use glam::Vec3;

use crate::camera::Camera;
use crate::geometry::{Material, MaterialSide, Representation};

/// Named LOD distances used by metadata documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LodPreset {
    Close,
    Medium,
    Far,
}

impl LodPreset {
    /// Parse a level name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "close" => Some(LodPreset::Close),
            "medium" => Some(LodPreset::Medium),
            "far" => Some(LodPreset::Far),
            _ => None,
        }
    }

    /// Threshold for this preset given the object's bounding radius
    pub fn distance(&self, radius: f32, close_factor: f32, medium_factor: f32) -> f32 {
        match self {
            LodPreset::Close => radius * close_factor,
            LodPreset::Medium => radius * medium_factor,
            LodPreset::Far => f32::INFINITY,
        }
    }
}

/// One (threshold, representation) pair
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    pub threshold: f32,
    pub representation: Representation,
}

/// Ordered set of representations of one primitive
#[derive(Debug, Clone, PartialEq)]
pub struct LevelOfDetail {
    levels: Vec<Level>,
    current: usize,
    /// Index of the first level added; later levels never replace it
    base: usize,
    material: Material,
    frustum_culled: bool,
    render_order: i32,
    visible: bool,
    name: Option<String>,
}

impl Default for LevelOfDetail {
    fn default() -> Self {
        Self {
            levels: Vec::new(),
            current: 0,
            base: 0,
            material: Material::default(),
            frustum_culled: true,
            render_order: 0,
            visible: true,
            name: None,
        }
    }
}

impl LevelOfDetail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a level, keeping thresholds ascending
    ///
    /// The representation takes on the container's current material,
    /// render order, culling flag and visibility. Equal thresholds keep
    /// insertion order. The first level added stays the base level.
    pub fn add_level(&mut self, mut representation: Representation, threshold: f32) {
        representation.material = self.material.clone();
        representation.render_order = self.render_order;
        representation.frustum_culled = self.frustum_culled;
        representation.visible = self.visible;
        representation.name = self.name.clone();

        let index = self
            .levels
            .iter()
            .position(|level| level.threshold > threshold)
            .unwrap_or(self.levels.len());
        if !self.levels.is_empty() {
            if index <= self.current {
                self.current += 1;
            }
            if index <= self.base {
                self.base += 1;
            }
        }
        self.levels.insert(
            index,
            Level {
                threshold,
                representation,
            },
        );
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&Representation> {
        self.levels.get(self.current).map(|l| &l.representation)
    }

    pub fn current_mut(&mut self) -> Option<&mut Representation> {
        self.levels.get_mut(self.current).map(|l| &mut l.representation)
    }

    /// The level the primitive was created with
    pub fn base(&self) -> Option<&Representation> {
        self.levels.get(self.base).map(|l| &l.representation)
    }

    pub fn base_mut(&mut self) -> Option<&mut Representation> {
        self.levels.get_mut(self.base).map(|l| &mut l.representation)
    }

    /// Index of the level used at `distance`
    pub fn level_for_distance(&self, distance: f32) -> Option<usize> {
        if self.levels.is_empty() {
            return None;
        }
        Some(
            self.levels
                .iter()
                .position(|level| level.threshold >= distance)
                .unwrap_or(self.levels.len() - 1),
        )
    }

    /// Select the level for the camera distance to `center`
    ///
    /// Returns true when the active representation changed.
    pub fn update(&mut self, camera: &Camera, center: Vec3) -> bool {
        let Some(index) = self.level_for_distance(camera.distance_to(center)) else {
            return false;
        };
        if index != self.current {
            self.current = index;
            true
        } else {
            false
        }
    }

    // ============== Uniform setters ==============

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = material;
        self.for_each_representation(|rep, lod| rep.material = lod.material.clone());
    }

    pub fn set_colour(&mut self, colour: [f32; 3]) {
        self.material.colour = colour;
        self.for_each_representation(|rep, _| rep.material.colour = colour);
    }

    /// Set opacity and the transparency flag, returns true if the flag changed
    pub fn set_opacity(&mut self, opacity: f32) -> bool {
        let transparent = opacity < 1.0;
        let changed = self.material.transparent != transparent;
        self.material.opacity = opacity;
        self.material.transparent = transparent;
        self.for_each_representation(|rep, _| {
            rep.material.opacity = opacity;
            rep.material.transparent = transparent;
        });
        changed
    }

    pub fn set_side(&mut self, side: MaterialSide) {
        self.material.side = side;
        self.for_each_representation(|rep, _| rep.material.side = side);
    }

    pub fn set_vertex_colors(&mut self, vertex_colors: bool) {
        self.material.vertex_colors = vertex_colors;
        self.for_each_representation(|rep, _| rep.material.vertex_colors = vertex_colors);
    }

    pub fn frustum_culled(&self) -> bool {
        self.frustum_culled
    }

    pub fn set_frustum_culled(&mut self, flag: bool) {
        self.frustum_culled = flag;
        self.for_each_representation(|rep, _| rep.frustum_culled = flag);
    }

    pub fn render_order(&self) -> i32 {
        self.render_order
    }

    pub fn set_render_order(&mut self, order: i32) {
        self.render_order = order;
        self.for_each_representation(|rep, _| rep.render_order = order);
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.for_each_representation(|rep, _| rep.visible = visible);
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
        let name = self.name.clone();
        self.for_each_representation(|rep, _| rep.name = name.clone());
    }

    fn for_each_representation(&mut self, mut f: impl FnMut(&mut Representation, &Self)) {
        let mut levels = std::mem::take(&mut self.levels);
        for level in &mut levels {
            f(&mut level.representation, self);
        }
        self.levels = levels;
    }
}
