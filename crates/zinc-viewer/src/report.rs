//! Plain summaries of a loaded scene

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use uuid::Uuid;
use zinc_core::{PrimitiveType, RegionTree, Scene};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectReport {
    pub id: Uuid,
    pub group_name: Option<String>,
    pub anatomical_id: Option<String>,
    pub kind: String,
    pub vertices: usize,
    pub levels: usize,
    pub render_order: i32,
    pub visible: bool,
    pub time_varying: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionReport {
    pub path: String,
    pub objects: Vec<ObjectReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneReport {
    pub duration: f32,
    pub original_duration: Option<f64>,
    pub current_time: Option<f32>,
    pub time_stamps: BTreeMap<String, f64>,
    pub viewports: Vec<String>,
    pub eye: [f32; 3],
    pub target: [f32; 3],
    pub regions: Vec<RegionReport>,
    /// Objects whose marker is currently shown
    pub markers: Vec<String>,
}

fn kind_name(kind: PrimitiveType) -> &'static str {
    match kind {
        PrimitiveType::Surface => "surfaces",
        PrimitiveType::Glyphset => "glyph",
        PrimitiveType::Points => "points",
        PrimitiveType::Lines => "lines",
    }
}

fn region_report(tree: &RegionTree, region: Uuid) -> RegionReport {
    let path = tree.full_path(region);
    let objects = tree
        .all_objects(region, false)
        .into_iter()
        .map(|object| ObjectReport {
            id: object.id(),
            group_name: object.group_name().map(str::to_string),
            anatomical_id: object.anatomical_id.clone(),
            kind: kind_name(object.primitive_type()).to_string(),
            vertices: object.geometry().map_or(0, |g| g.vertex_count()),
            levels: object.lod().levels().len(),
            render_order: object.render_order(),
            visible: object.visible(),
            time_varying: object.is_time_varying(),
        })
        .collect();
    RegionReport {
        path: if path.is_empty() { "/".to_string() } else { path },
        objects,
    }
}

impl SceneReport {
    pub fn new(scene: &Scene) -> Self {
        let tree = scene.tree();
        let root = scene.root();
        let regions = std::iter::once(root)
            .chain(tree.child_regions(root, true))
            .map(|region| region_report(tree, region))
            .collect();
        let markers = tree
            .all_objects(root, true)
            .into_iter()
            .filter(|object| object.marker().is_some_and(|marker| marker.is_enabled()))
            .map(|object| object.group_name().unwrap_or_default().to_string())
            .collect();
        let viewport = scene.camera().viewport();

        Self {
            duration: scene.duration(),
            original_duration: scene.original_duration(),
            current_time: scene.current_time(),
            time_stamps: scene.metadata_time_stamps().clone(),
            viewports: scene.viewport_names().map(str::to_string).collect(),
            eye: viewport.eye_position,
            target: viewport.target_position,
            regions,
            markers,
        }
    }

    pub fn object_count(&self) -> usize {
        self.regions.iter().map(|region| region.objects.len()).sum()
    }
}

impl fmt::Display for SceneReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Scene: {} objects, duration {} ms",
            self.object_count(),
            self.duration
        )?;
        if let Some(time) = self.current_time {
            writeln!(f, "  time: {:.1}", time)?;
        }
        writeln!(f, "  eye: {:?} -> {:?}", self.eye, self.target)?;
        if !self.viewports.is_empty() {
            writeln!(f, "  viewports: {}", self.viewports.join(", "))?;
        }
        for (label, millis) in &self.time_stamps {
            writeln!(f, "  time stamp {}: {} ms", label, millis)?;
        }
        for region in &self.regions {
            if region.objects.is_empty() {
                continue;
            }
            writeln!(f, "  {}", region.path)?;
            for object in &region.objects {
                writeln!(
                    f,
                    "    [{}] {} ({} vertices, {} levels, order {}{}{})",
                    object.kind,
                    object.group_name.as_deref().unwrap_or("<unnamed>"),
                    object.vertices,
                    object.levels,
                    object.render_order,
                    if object.time_varying { ", animated" } else { "" },
                    if object.visible { "" } else { ", hidden" },
                )?;
            }
        }
        if !self.markers.is_empty() {
            writeln!(f, "  markers: {}", self.markers.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zinc_core::{MeshGeometry, ZincObject};

    #[test]
    fn test_report_lists_regions() {
        let mut scene = Scene::default();
        let root = scene.root();
        let heart = scene.tree_mut().create_child(root, "heart").unwrap();
        let mut object = ZincObject::points();
        object.set_name(Some("nodes"));
        object.set_mesh(
            MeshGeometry::from_positions(vec![[0.0; 3], [1.0, 0.0, 0.0]]),
            Default::default(),
            false,
            false,
        );
        scene.add_zinc_object_to(heart, object);

        let report = SceneReport::new(&scene);
        assert_eq!(report.object_count(), 1);
        assert_eq!(report.regions.len(), 2);
        let heart = &report.regions[1];
        assert_eq!(heart.objects[0].kind, "points");
        assert_eq!(heart.objects[0].vertices, 2);
        assert!(report.to_string().contains("[points] nodes"));
    }
}
