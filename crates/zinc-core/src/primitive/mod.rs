//! Renderable primitives (surfaces, lines, points, glyph sets)

mod glyphset;
mod lines;
mod points;

use glam::{Mat4, Vec3};
use uuid::Uuid;

use crate::bounds::BoundingBox;
use crate::camera::Camera;
use crate::constants::OBJECT_DEFAULT_DURATION;
use crate::geometry::{Material, MaterialSide, MeshGeometry, MorphFrame, Representation};
use crate::lod::{LevelOfDetail, LodPreset};
use crate::marker::{Marker, MarkerMode};
use crate::time::{TimeControl, TimeModel};

pub use glyphset::{Glyph, GlyphMetadata, Glyphset, GlyphsetData};
pub use points::PointSet;

/// Kind-specific state of a primitive
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveKind {
    Surface,
    Lines,
    Points(PointSet),
    Glyphset(Glyphset),
}

/// Capability tag used for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Surface,
    Lines,
    Points,
    Glyphset,
}

impl PrimitiveKind {
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            PrimitiveKind::Surface => PrimitiveType::Surface,
            PrimitiveKind::Lines => PrimitiveType::Lines,
            PrimitiveKind::Points(_) => PrimitiveType::Points,
            PrimitiveKind::Glyphset(_) => PrimitiveType::Glyphset,
        }
    }
}

/// Side effects of a render tick the owning region has to apply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    /// The region's pickable set changed
    pub pickable_update_required: bool,
    /// A marker moved, appeared or disappeared
    pub marker_changed: bool,
}

impl RenderOutcome {
    pub fn merge(&mut self, other: RenderOutcome) {
        self.pickable_update_required |= other.pickable_update_required;
        self.marker_changed |= other.marker_changed;
    }
}

/// One renderable item of the scene
#[derive(Debug, Clone, PartialEq)]
pub struct ZincObject {
    id: Uuid,
    pub(crate) region: Option<Uuid>,
    group_name: Option<String>,
    pub anatomical_id: Option<String>,
    kind: PrimitiveKind,
    lod: LevelOfDetail,
    time_enabled: bool,
    morph_colour: bool,
    time: TimeModel,
    visible: bool,
    world_transform: Mat4,
    cached_bbox: Option<BoundingBox>,
    bbox_stale: bool,
    center: Vec3,
    radius: f32,
    marker_mode: MarkerMode,
    marker: Option<Marker>,
    marker_update_required: bool,
    closest_vertex_index: Option<usize>,
}

impl ZincObject {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self::with_id(Uuid::new_v4(), kind)
    }

    pub(crate) fn with_id(id: Uuid, kind: PrimitiveKind) -> Self {
        Self {
            id,
            region: None,
            group_name: None,
            anatomical_id: None,
            kind,
            lod: LevelOfDetail::new(),
            time_enabled: false,
            morph_colour: false,
            time: TimeModel::Manual(crate::time::ManualTime::new(OBJECT_DEFAULT_DURATION)),
            visible: true,
            world_transform: Mat4::IDENTITY,
            cached_bbox: None,
            bbox_stale: true,
            center: Vec3::ZERO,
            radius: 0.0,
            marker_mode: MarkerMode::Inherited,
            marker: None,
            marker_update_required: true,
            closest_vertex_index: None,
        }
    }

    pub fn surface() -> Self {
        Self::new(PrimitiveKind::Surface)
    }

    pub fn lines() -> Self {
        Self::new(PrimitiveKind::Lines)
    }

    pub fn points() -> Self {
        Self::new(PrimitiveKind::Points(PointSet::default()))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Region this object is attached to
    pub fn region(&self) -> Option<Uuid> {
        self.region
    }

    pub fn kind(&self) -> &PrimitiveKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut PrimitiveKind {
        &mut self.kind
    }

    pub fn primitive_type(&self) -> PrimitiveType {
        self.kind.primitive_type()
    }

    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.group_name = name.map(str::to_string);
        self.lod.set_name(self.group_name.clone());
    }

    /// Case-insensitive group name comparison
    pub fn has_group_name(&self, name: Option<&str>) -> bool {
        match (self.group_name.as_deref(), name) {
            (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
            (None, None) => true,
            _ => false,
        }
    }

    // ============== Mesh ==============

    /// Attach the base geometry and pick the time model
    ///
    /// Geometry with at least two morph targets is driven by an animation
    /// clip; anything else uses manual time. The mesh is added as the
    /// level used at any distance.
    pub fn set_mesh(
        &mut self,
        geometry: MeshGeometry,
        material: Material,
        time_enabled: bool,
        morph_colour: bool,
    ) {
        let duration = self.time.duration();
        self.time = TimeModel::for_morph_targets(geometry.morph_target_count(), duration);

        let render_order = self.lod.render_order();
        let visible = self.lod.visible();
        self.lod = LevelOfDetail::new();
        self.lod.set_name(self.group_name.clone());
        self.lod.set_render_order(render_order);
        self.lod.set_visible(visible);
        self.lod.set_material(material);
        self.lod
            .add_level(Representation::new(geometry, Material::default()), f32::INFINITY);

        self.time_enabled = time_enabled;
        self.morph_colour = morph_colour;
        self.check_transparent_mesh(true);
        if self.time_enabled {
            self.set_frustum_culled(false);
        }
        self.bbox_stale = true;
        self.marker_update_required = true;
    }

    pub fn has_mesh(&self) -> bool {
        !self.lod.is_empty()
    }

    pub fn lod(&self) -> &LevelOfDetail {
        &self.lod
    }

    pub fn lod_mut(&mut self) -> &mut LevelOfDetail {
        &mut self.lod
    }

    /// Geometry of the base level
    pub fn geometry(&self) -> Option<&MeshGeometry> {
        self.lod.base().map(|rep| &rep.geometry)
    }

    /// Geometry of the currently active level
    pub fn current_geometry(&self) -> Option<&MeshGeometry> {
        self.lod.current().map(|rep| &rep.geometry)
    }

    /// Add a level at a preset distance relative to this object's size
    ///
    /// The size comes from the base geometry whether or not the object is
    /// currently shown.
    pub fn add_lod_level(
        &mut self,
        geometry: MeshGeometry,
        preset: LodPreset,
        close_factor: f32,
        medium_factor: f32,
    ) {
        let radius = self
            .geometry()
            .and_then(|base| BoundingBox::from_positions(&base.positions_at(self.time.frame())))
            .map_or(0.0, |bbox| bbox.transform(&self.world_transform).radius());
        let threshold = preset.distance(radius, close_factor, medium_factor);
        self.lod
            .add_level(Representation::new(geometry, Material::default()), threshold);
    }

    /// Append geometry to the base level, switching the time model if the
    /// morph sequence length changes
    pub fn merge_geometry(&mut self, geometry: &MeshGeometry) {
        let Some(base) = self.lod.base_mut() else {
            return;
        };
        let before = base.geometry.morph_target_count();
        base.geometry.append(geometry);
        let after = base.geometry.morph_target_count();
        if before != after {
            let time = self.time.time();
            self.time = TimeModel::for_morph_targets(after, self.time.duration());
            self.time.set_time(time);
        }
        self.bbox_stale = true;
    }

    // ============== Time ==============

    pub fn time_model(&self) -> &TimeModel {
        &self.time
    }

    pub fn duration(&self) -> f32 {
        self.time.duration()
    }

    pub fn set_duration(&mut self, duration: f32) {
        self.time.set_duration(duration);
        self.bbox_stale = true;
    }

    /// Externally visible time in `[0, duration]`
    pub fn current_time(&self) -> f32 {
        self.time.time()
    }

    pub fn set_morph_time(&mut self, time: f32) {
        if self.time.set_time(time) {
            self.on_time_changed();
        }
    }

    pub fn time_enabled(&self) -> bool {
        self.time_enabled
    }

    pub fn morph_colour(&self) -> bool {
        self.morph_colour
    }

    pub fn is_time_varying(&self) -> bool {
        self.time_enabled || self.morph_colour
    }

    /// Morph targets blended at the current time
    pub fn morph_frame(&self) -> Option<MorphFrame> {
        self.time.frame()
    }

    fn on_time_changed(&mut self) {
        self.bbox_stale = true;
        if self.time_enabled {
            self.marker_update_required = true;
        }
        if let PrimitiveKind::Glyphset(glyphset) = &mut self.kind {
            glyphset.update_for_time(self.time.time(), self.time.duration());
            let positions = glyphset.positions();
            if let Some(base) = self.lod.base_mut() {
                base.geometry.positions = positions;
            }
        }
    }

    /// Positions of the active level at the current time
    pub fn current_positions(&self) -> Vec<[f32; 3]> {
        self.current_geometry()
            .map(|g| g.positions_at(self.morph_frame()))
            .unwrap_or_default()
    }

    /// Vertex colours of the active level at the current time
    pub fn current_colours(&self) -> Vec<[f32; 3]> {
        self.current_geometry()
            .map(|g| g.colours_at(self.morph_frame()))
            .unwrap_or_default()
    }

    // ============== Appearance ==============

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visibility(&mut self, visible: bool) {
        self.visible = visible;
        self.lod.set_visible(visible);
        self.bbox_stale = true;
    }

    pub fn material(&self) -> &Material {
        self.lod.material()
    }

    pub fn set_material(&mut self, material: Material) {
        self.lod.set_material(material);
        self.check_transparent_mesh(true);
    }

    /// Set opacity; alpha below 1 makes the material transparent
    pub fn set_alpha(&mut self, alpha: f32) {
        let changed = self.lod.set_opacity(alpha);
        self.check_transparent_mesh(changed);
    }

    /// Surfaces render transparent meshes double sided so back faces show
    fn check_transparent_mesh(&mut self, transparent_changed: bool) {
        if !transparent_changed {
            return;
        }
        if let PrimitiveKind::Surface = self.kind {
            let side = if self.lod.material().transparent {
                MaterialSide::Double
            } else {
                MaterialSide::Front
            };
            self.lod.set_side(side);
        }
    }

    pub fn colour(&self) -> [f32; 3] {
        self.lod.material().colour
    }

    pub fn set_colour(&mut self, colour: [f32; 3]) {
        self.lod.set_colour(colour);
    }

    /// Colour in hex form, `None` while colours are morphing
    pub fn colour_hex(&self) -> Option<u32> {
        (!self.morph_colour).then(|| self.lod.material().colour_hex())
    }

    pub fn set_colour_hex(&mut self, hex: u32) {
        self.set_colour(crate::geometry::hex_to_colour(hex));
    }

    pub fn set_vertex_colors(&mut self, vertex_colors: bool) {
        self.lod.set_vertex_colors(vertex_colors);
    }

    pub fn set_frustum_culled(&mut self, flag: bool) {
        self.lod.set_frustum_culled(flag);
    }

    pub fn render_order(&self) -> i32 {
        self.lod.render_order()
    }

    pub fn set_render_order(&mut self, order: i32) {
        self.lod.set_render_order(order);
    }

    // ============== Transforms and bounds ==============

    pub fn world_transform(&self) -> Mat4 {
        self.world_transform
    }

    pub(crate) fn set_world_transform(&mut self, transform: Mat4) {
        if self.world_transform != transform {
            self.world_transform = transform;
            self.bbox_stale = true;
            self.marker_update_required = true;
        }
    }

    /// World-space bounding box of the active level at the current time
    ///
    /// `None` when the object is hidden or has no vertices.
    pub fn bounding_box(&mut self) -> Option<BoundingBox> {
        let rep = self.lod.current()?;
        if !rep.visible {
            return None;
        }
        if self.bbox_stale {
            let positions = rep.geometry.positions_at(self.time.frame());
            self.cached_bbox =
                BoundingBox::from_positions(&positions).map(|b| b.transform(&self.world_transform));
            if let Some(bbox) = self.cached_bbox {
                self.center = bbox.center();
                self.radius = bbox.radius();
            }
            self.bbox_stale = false;
        }
        self.cached_bbox
    }

    pub fn bounding_box_stale(&self) -> bool {
        self.bbox_stale
    }

    /// Center of the last computed bounding box
    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    // ============== Closest vertex ==============

    /// Index of the vertex nearest the center of the active level's box
    ///
    /// Cached after the first call. Topology changes do not invalidate the
    /// cache, call [`ZincObject::invalidate_closest_vertex`] for that.
    pub fn closest_vertex_index(&mut self) -> Option<usize> {
        if self.closest_vertex_index.is_none() {
            self.closest_vertex_index = self.find_closest_vertex_index();
        }
        self.closest_vertex_index
    }

    pub fn invalidate_closest_vertex(&mut self) {
        self.closest_vertex_index = None;
    }

    fn find_closest_vertex_index(&self) -> Option<usize> {
        let positions = &self.lod.current()?.geometry.positions;
        let center = BoundingBox::from_positions(positions)?.center();
        let mut closest: Option<(usize, f32)> = None;
        for (index, position) in positions.iter().enumerate() {
            let distance = Vec3::from(*position).distance(center);
            match closest {
                Some((_, best)) if distance >= best => {}
                _ => closest = Some((index, distance)),
            }
        }
        closest.map(|(index, _)| index)
    }

    /// Position of the closest vertex at the current time
    ///
    /// Falls back to the center of the active level's box when there is no
    /// usable vertex.
    pub fn closest_vertex(&mut self, apply_world: bool) -> Option<Vec3> {
        let index = self.closest_vertex_index();
        let frame = self.time.frame();
        let geometry = self.current_geometry()?;
        let local = index
            .and_then(|i| geometry.position_at(i, frame))
            .or_else(|| {
                BoundingBox::from_positions(&geometry.positions_at(frame)).map(|b| b.center())
            })?;
        Some(if apply_world {
            self.world_transform.transform_point3(local)
        } else {
            local
        })
    }

    // ============== Markers ==============

    pub fn marker_mode(&self) -> MarkerMode {
        self.marker_mode
    }

    /// Returns true if the mode changed
    pub fn set_marker_mode(&mut self, mode: MarkerMode) -> bool {
        if mode != self.marker_mode {
            self.marker_mode = mode;
            true
        } else {
            false
        }
    }

    pub fn marker_is_enabled(&self, display_markers: bool) -> bool {
        self.marker_mode.is_enabled(display_markers)
    }

    pub fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }

    pub fn marker_mut(&mut self) -> Option<&mut Marker> {
        self.marker.as_mut()
    }

    /// Create, move, enable or disable the marker for this frame
    ///
    /// Hidden objects never show a marker.
    pub fn update_marker(
        &mut self,
        play_animation: bool,
        display_markers: bool,
        camera: Option<&Camera>,
    ) -> RenderOutcome {
        let mut outcome = RenderOutcome::default();
        if self.visible && !play_animation && self.marker_is_enabled(display_markers) {
            if self.group_name.is_none() {
                return outcome;
            }
            if self.marker.is_none() {
                self.marker = Some(Marker::new());
                self.marker_update_required = true;
            }
            if self.marker_update_required
                && let Some(position) = self.closest_vertex(true)
            {
                if let Some(marker) = self.marker.as_mut() {
                    marker.set_position(position);
                }
                self.marker_update_required = false;
                outcome.marker_changed = true;
            }
            if let Some(marker) = self.marker.as_mut() {
                if let Some(camera) = camera {
                    let depth = marker.ndc_depth();
                    if marker.update_ndc(camera) != depth {
                        outcome.marker_changed = true;
                    }
                }
                if !marker.is_enabled() {
                    marker.enable();
                    outcome.marker_changed = true;
                    outcome.pickable_update_required = true;
                }
            }
        } else {
            if let Some(marker) = self.marker.as_mut()
                && marker.is_enabled()
            {
                marker.disable();
                outcome.marker_changed = true;
                outcome.pickable_update_required = true;
            }
            self.marker_update_required = true;
        }
        outcome
    }

    // ============== Per-frame ==============

    /// Per-frame update: level selection, time stepping and marker upkeep
    pub fn render(
        &mut self,
        delta: f32,
        play_animation: bool,
        camera: Option<&Camera>,
        display_markers: bool,
    ) -> RenderOutcome {
        if self.visible
            && !(self.time_enabled && play_animation)
            && let Some(camera) = camera
        {
            if self.bbox_stale {
                self.bounding_box();
            }
            self.lod.update(camera, self.center);
        }
        if play_animation {
            let time_varying = self.is_time_varying();
            if self.time.advance(delta, time_varying) {
                self.on_time_changed();
            }
            if self.visible && delta != 0.0 {
                self.bbox_stale = true;
            }
        }
        self.update_marker(play_animation, display_markers, camera)
    }
}
