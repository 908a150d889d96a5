//! Region tree (scene hierarchy)
//!
//! Regions and primitives live in one arena keyed by id. A region owns
//! its children and objects through id lists; objects point back to their
//! region by id only.

mod create;
mod queries;
mod time;

use std::collections::HashMap;
use std::fmt;

use glam::Mat4;
use uuid::Uuid;

use crate::constants::REGION_DEFAULT_DURATION;
use crate::primitive::ZincObject;

pub use queries::Pickable;
pub use time::RenderOptions;

/// Notification sent to scene listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    ObjectAdded { object: Uuid, region: Uuid },
    ObjectRemoved { object: Uuid, region: Uuid },
}

/// Listener invoked on object add/remove
pub type SceneListener = Box<dyn FnMut(&SceneEvent)>;

/// A named node of the scene hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: Uuid,
    name: String,
    parent: Option<Uuid>,
    children: Vec<Uuid>,
    objects: Vec<Uuid>,
    transform: Mat4,
    visible: bool,
    /// Set whenever the pickable set of this region may have changed
    pub pickable_update_required: bool,
    duration: f32,
}

impl Region {
    fn new(name: &str, parent: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            parent,
            children: Vec::new(),
            objects: Vec::new(),
            transform: Mat4::IDENTITY,
            visible: true,
            pickable_update_required: true,
            duration: REGION_DEFAULT_DURATION,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<Uuid> {
        self.parent
    }

    pub fn children(&self) -> &[Uuid] {
        &self.children
    }

    pub fn objects(&self) -> &[Uuid] {
        &self.objects
    }

    /// Local transform relative to the parent
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// The region's own visibility flag
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Default duration for objects loaded into this region
    pub fn duration(&self) -> f32 {
        self.duration
    }
}

/// Arena of regions and primitives rooted at an unnamed region
pub struct RegionTree {
    root: Uuid,
    pub(crate) regions: HashMap<Uuid, Region>,
    pub(crate) objects: HashMap<Uuid, ZincObject>,
    listeners: Vec<SceneListener>,
}

impl fmt::Debug for RegionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionTree")
            .field("root", &self.root)
            .field("regions", &self.regions.len())
            .field("objects", &self.objects.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for RegionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionTree {
    pub fn new() -> Self {
        let root = Region::new("", None);
        let root_id = root.id;
        let mut regions = HashMap::new();
        regions.insert(root_id, root);
        Self {
            root: root_id,
            regions,
            objects: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn root(&self) -> Uuid {
        self.root
    }

    pub fn region(&self, id: Uuid) -> Option<&Region> {
        self.regions.get(&id)
    }

    pub fn region_mut(&mut self, id: Uuid) -> Option<&mut Region> {
        self.regions.get_mut(&id)
    }

    pub fn object(&self, id: Uuid) -> Option<&ZincObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: Uuid) -> Option<&mut ZincObject> {
        self.objects.get_mut(&id)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Register a listener for object add/remove notifications
    pub fn add_listener(&mut self, listener: SceneListener) {
        self.listeners.push(listener);
    }

    fn notify(&mut self, event: SceneEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    // ============== Naming and paths ==============

    /// Rename a region; empty names are ignored
    pub fn set_name(&mut self, region: Uuid, name: &str) {
        if name.is_empty() {
            return;
        }
        if let Some(r) = self.regions.get_mut(&region) {
            r.name = name.to_string();
        }
    }

    /// Append a new child region, duplicate names are allowed
    pub fn create_child(&mut self, parent: Uuid, name: &str) -> Option<Uuid> {
        self.regions.get(&parent)?;
        let child = Region::new(name, Some(parent));
        let id = child.id;
        self.regions.insert(id, child);
        if let Some(p) = self.regions.get_mut(&parent) {
            p.children.push(id);
        }
        Some(id)
    }

    /// First child whose name matches case-insensitively
    pub fn child_with_name(&self, parent: Uuid, name: &str) -> Option<Uuid> {
        let lower = name.to_lowercase();
        self.regions
            .get(&parent)?
            .children
            .iter()
            .copied()
            .find(|id| {
                self.regions
                    .get(id)
                    .is_some_and(|r| r.name.to_lowercase() == lower)
            })
    }

    /// Resolve a `/`-separated path through existing children
    ///
    /// A leading empty segment is ignored and an empty path resolves to
    /// the region itself.
    pub fn find_child_from_path(&self, region: Uuid, path: &str) -> Option<Uuid> {
        self.regions.get(&region)?;
        let mut current = region;
        for segment in path_segments(path) {
            current = self.child_with_name(current, segment)?;
        }
        Some(current)
    }

    /// Resolve a path, creating missing regions along the way
    pub fn create_child_from_path(&mut self, region: Uuid, path: &str) -> Option<Uuid> {
        self.regions.get(&region)?;
        let mut current = region;
        for segment in path_segments(path) {
            current = match self.child_with_name(current, segment) {
                Some(child) => child,
                None => self.create_child(current, segment)?,
            };
        }
        Some(current)
    }

    /// Existing region at `path`, or a newly created one
    pub fn find_or_create_child_from_path(&mut self, region: Uuid, path: &str) -> Option<Uuid> {
        match self.find_child_from_path(region, path) {
            Some(found) => Some(found),
            None => self.create_child_from_path(region, path),
        }
    }

    /// Names from the root down to `region`, skipping unnamed regions
    pub fn full_separated_path(&self, region: Uuid) -> Vec<String> {
        let mut names = Vec::new();
        let Some(start) = self.regions.get(&region) else {
            return names;
        };
        if start.name.is_empty() {
            return names;
        }
        let mut current = Some(start);
        while let Some(r) = current {
            if !r.name.is_empty() {
                names.push(r.name.clone());
            }
            current = r.parent.and_then(|p| self.regions.get(&p));
        }
        names.reverse();
        names
    }

    pub fn full_path(&self, region: Uuid) -> String {
        self.full_separated_path(region).join("/")
    }

    // ============== Objects ==============

    /// Attach an object to a region
    ///
    /// The object takes the region's world transform, the region is marked
    /// for a pickable update and listeners are notified.
    pub fn add_zinc_object(&mut self, region: Uuid, mut object: ZincObject) -> Option<Uuid> {
        let world = self.world_transform(region)?;
        let id = object.id();
        object.region = Some(region);
        object.set_world_transform(world);
        self.objects.insert(id, object);
        if let Some(r) = self.regions.get_mut(&region) {
            r.objects.push(id);
            r.pickable_update_required = true;
        }
        self.notify(SceneEvent::ObjectAdded { object: id, region });
        Some(id)
    }

    /// Detach and drop an object; no-op unless it belongs to `region`
    pub fn remove_zinc_object(&mut self, region: Uuid, object: Uuid) -> Option<ZincObject> {
        let r = self.regions.get_mut(&region)?;
        let index = r.objects.iter().position(|id| *id == object)?;
        r.objects.remove(index);
        r.pickable_update_required = true;
        let mut removed = self.objects.remove(&object)?;
        removed.region = None;
        self.notify(SceneEvent::ObjectRemoved { object, region });
        Some(removed)
    }

    /// Drop every object of the region, and every descendant region when
    /// `recurse` is set
    pub fn clear(&mut self, region: Uuid, recurse: bool) {
        let Some(r) = self.regions.get_mut(&region) else {
            return;
        };
        let objects = std::mem::take(&mut r.objects);
        let children = if recurse {
            std::mem::take(&mut r.children)
        } else {
            Vec::new()
        };
        r.pickable_update_required = true;
        for object in objects {
            self.objects.remove(&object);
        }
        for child in children {
            self.clear(child, true);
            self.regions.remove(&child);
        }
    }

    // ============== Visibility ==============

    /// Set the region's own flag; marks a pickable update only on change
    pub fn set_visibility(&mut self, region: Uuid, visible: bool) {
        if let Some(r) = self.regions.get_mut(&region)
            && r.visible != visible
        {
            r.visible = visible;
            r.pickable_update_required = true;
        }
    }

    /// Visibility combined with every ancestor's flag
    pub fn is_visible_in_tree(&self, region: Uuid) -> bool {
        let mut current = self.regions.get(&region);
        while let Some(r) = current {
            if !r.visible {
                return false;
            }
            current = r.parent.and_then(|p| self.regions.get(&p));
        }
        true
    }

    pub fn hide_all_primitives(&mut self, region: Uuid) {
        self.set_all_primitives_visibility(region, false);
    }

    pub fn show_all_primitives(&mut self, region: Uuid) {
        self.set_all_primitives_visibility(region, true);
    }

    fn set_all_primitives_visibility(&mut self, region: Uuid, visible: bool) {
        for id in self.all_object_ids(region, true) {
            if let Some(object) = self.objects.get_mut(&id) {
                object.set_visibility(visible);
            }
        }
    }

    // ============== Transforms ==============

    /// Set the local transform from 16 row-major values
    ///
    /// World transforms of every object below the region are refreshed,
    /// which invalidates their cached bounding boxes.
    pub fn set_transformation(&mut self, region: Uuid, values: &[f32; 16]) {
        self.set_transform(region, Mat4::from_cols_array(values).transpose());
    }

    pub fn set_transform(&mut self, region: Uuid, transform: Mat4) {
        let Some(r) = self.regions.get_mut(&region) else {
            return;
        };
        r.transform = transform;
        self.propagate_world_transform(region);
    }

    /// Product of the local transforms from the root down to `region`
    pub fn world_transform(&self, region: Uuid) -> Option<Mat4> {
        let mut r = self.regions.get(&region)?;
        let mut world = r.transform;
        while let Some(parent) = r.parent.and_then(|p| self.regions.get(&p)) {
            world = parent.transform * world;
            r = parent;
        }
        Some(world)
    }

    fn propagate_world_transform(&mut self, region: Uuid) {
        let Some(world) = self.world_transform(region) else {
            return;
        };
        let mut stack = vec![(region, world)];
        while let Some((id, world)) = stack.pop() {
            let Some(r) = self.regions.get(&id) else {
                continue;
            };
            for object in r.objects.clone() {
                if let Some(o) = self.objects.get_mut(&object) {
                    o.set_world_transform(world);
                }
            }
            for child in r.children.clone() {
                if let Some(c) = self.regions.get(&child) {
                    stack.push((child, world * c.transform));
                }
            }
        }
    }

    /// Set a marker mode, flagging the owning region when it changes
    pub fn set_marker_mode(&mut self, object: Uuid, mode: crate::marker::MarkerMode) {
        let Some(o) = self.objects.get_mut(&object) else {
            return;
        };
        if o.set_marker_mode(mode)
            && let Some(region) = o.region.and_then(|r| self.regions.get_mut(&r))
        {
            region.pickable_update_required = true;
        }
    }
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.split('/').filter(|segment| !segment.is_empty())
}
