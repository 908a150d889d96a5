//! Metadata-driven scene loading
//!
//! The loader performs no I/O itself. Loading a document queues
//! [`LoadRequest`]s; the host fetches them in any order (synchronously,
//! on worker threads, or from memory) and hands each result back through
//! [`MetadataLoader::handle_response`]. All scene mutation happens inside
//! that call, on the caller's thread.

mod document;
mod duration;
mod resolve;

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::camera::Viewport;
use crate::config::LoaderConfig;
use crate::lod::LodPreset;
use crate::mesh::{FileFormat, LoadedMesh, MeshError};
use crate::primitive::{GlyphsetData, ZincObject};
use crate::scene::Scene;
use crate::transport::{FetchError, Transport};

pub use document::{
    DocumentV2, InlineContent, Item, ItemType, LodBlock, LodLevelSource, MetadataDocument,
    RegionNode, SettingsBlock, ViewEntry, ViewsBlock,
};
pub use duration::IsoDuration;
pub use resolve::resolve_url;

pub type RequestId = u64;

/// Called once per completed countable item, with the attached object if any
pub type ItemCallback = Box<dyn FnMut(Option<Uuid>)>;

/// Called once when every countable item of a document has completed
pub type CompleteCallback = Box<dyn FnMut()>;

/// What a request fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Metadata,
    View,
    Primitive(ItemType),
    GlyphGeometry,
    LodLevel,
}

/// A fetch the host has to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub id: RequestId,
    /// Load run the request belongs to
    pub generation: u64,
    pub url: String,
    pub kind: RequestKind,
    /// Region the fetched item attaches to
    pub region: Option<Uuid>,
}

/// Aggregate download progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Total bytes, zero while any tracked download has an unknown size
    pub total: u64,
    pub loaded: u64,
    pub error_occurred: bool,
}

/// Loader-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoaderError {
    #[error("Malformed metadata document: {0}")]
    MalformedDocument(String),
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),
    #[error("Invalid glyph set: {0}")]
    Glyphset(String),
    #[error("Invalid viewport: {0}")]
    InvalidViewport(String),
    #[error("{0:?} item has neither URL nor Inline content")]
    MissingSource(ItemType),
    #[error("Target region no longer exists")]
    RegionNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schema {
    V1,
    V2,
}

/// Where an item's payload comes from
#[derive(Debug, Clone, PartialEq)]
enum Source {
    Remote(String),
    Inline(Value),
}

/// A fetched or embedded payload
enum Payload<'a> {
    Bytes(&'a [u8]),
    Inline(&'a Value),
}

impl Payload<'_> {
    fn mesh(&self, format: FileFormat) -> Result<LoadedMesh, MeshError> {
        match self {
            Payload::Bytes(data) => format.loader().parse(data),
            Payload::Inline(value) => format.loader().parse_value(value),
        }
    }

    fn json(&self) -> Result<Value, LoaderError> {
        match self {
            Payload::Bytes(data) => {
                serde_json::from_slice(data).map_err(|e| LoaderError::Glyphset(e.to_string()))
            }
            Payload::Inline(value) => Ok((*value).clone()),
        }
    }
}

/// Everything needed to turn one primitive item into an attached object
#[derive(Debug, Clone)]
struct PrimitiveJob {
    kind: ItemType,
    schema: Schema,
    region: Uuid,
    group_name: Option<String>,
    anatomical_id: Option<String>,
    time_enabled: bool,
    morph_colour: bool,
    format: FileFormat,
    render_order: i32,
    display_labels: bool,
    glyph_geometry: Option<Source>,
    lod_levels: Vec<(LodPreset, String)>,
}

#[derive(Debug)]
enum Pending {
    Metadata {
        url: String,
    },
    View {
        name: Option<String>,
        /// Set when the view counts toward completion
        counted: Option<Schema>,
    },
    Primitive(PrimitiveJob),
    GlyphGeometry {
        object: Uuid,
        schema: Schema,
    },
    LodLevel {
        object: Uuid,
        preset: LodPreset,
        format: FileFormat,
    },
}

/// Resolves metadata documents into a populated region tree
pub struct MetadataLoader {
    config: LoaderConfig,
    generation: u64,
    next_id: RequestId,
    queue: VecDeque<LoadRequest>,
    pending: HashMap<RequestId, Pending>,
    reference_url: Option<String>,
    lazy_views: BTreeMap<String, String>,
    expected_items: usize,
    completed_items: usize,
    completion_fired: bool,
    view_loaded: bool,
    error_occurred: bool,
    in_flight: BTreeMap<ItemType, usize>,
    progress: BTreeMap<RequestId, (u64, u64)>,
    dispatch_index: i32,
    on_item: Option<ItemCallback>,
    on_complete: Option<CompleteCallback>,
}

impl fmt::Debug for MetadataLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataLoader")
            .field("generation", &self.generation)
            .field("pending", &self.pending.len())
            .field("expected_items", &self.expected_items)
            .field("completed_items", &self.completed_items)
            .field("error_occurred", &self.error_occurred)
            .finish()
    }
}

impl Default for MetadataLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl MetadataLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            generation: 0,
            next_id: 0,
            queue: VecDeque::new(),
            pending: HashMap::new(),
            reference_url: None,
            lazy_views: BTreeMap::new(),
            expected_items: 0,
            completed_items: 0,
            completion_fired: false,
            view_loaded: false,
            error_occurred: false,
            in_flight: BTreeMap::new(),
            progress: BTreeMap::new(),
            dispatch_index: 0,
            on_item: None,
            on_complete: None,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn set_item_callback(&mut self, callback: ItemCallback) {
        self.on_item = Some(callback);
    }

    pub fn set_complete_callback(&mut self, callback: CompleteCallback) {
        self.on_complete = Some(callback);
    }

    // ============== State ==============

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn expected_items(&self) -> usize {
        self.expected_items
    }

    pub fn completed_items(&self) -> usize {
        self.completed_items
    }

    /// True once the "all complete" notification fired for the current run
    pub fn is_complete(&self) -> bool {
        self.completion_fired
    }

    pub fn view_loaded(&self) -> bool {
        self.view_loaded
    }

    pub fn error_occurred(&self) -> bool {
        self.error_occurred
    }

    /// Requests handed out but not answered yet
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Downloads in flight for one item type
    pub fn in_flight(&self, kind: ItemType) -> usize {
        self.in_flight.get(&kind).copied().unwrap_or(0)
    }

    /// Downloads in flight across all item types
    pub fn to_be_downloaded(&self) -> usize {
        self.in_flight.values().sum()
    }

    // ============== Requests ==============

    /// Drain the requests queued since the last call
    pub fn take_requests(&mut self) -> Vec<LoadRequest> {
        self.queue.drain(..).collect()
    }

    fn request(&mut self, url: String, kind: RequestKind, pending: Pending) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        debug!("Queueing {:?} request {} for {}", kind, id, url);
        let region = match &pending {
            Pending::Primitive(job) => Some(job.region),
            _ => None,
        };
        self.queue.push_back(LoadRequest {
            id,
            generation: self.generation,
            url,
            kind,
            region,
        });
        self.pending.insert(id, pending);
        id
    }

    fn begin_download(&mut self, kind: ItemType) {
        *self.in_flight.entry(kind).or_insert(0) += 1;
    }

    fn end_download(&mut self, kind: ItemType) {
        if let Some(count) = self.in_flight.get_mut(&kind) {
            *count = count.saturating_sub(1);
        }
    }

    /// Record progress of an in-flight request
    pub fn report_progress(&mut self, id: RequestId, loaded: u64, total: u64) {
        if self.pending.contains_key(&id) {
            self.progress.insert(id, (loaded, total));
        }
    }

    pub fn download_progress(&self) -> DownloadProgress {
        let mut progress = DownloadProgress {
            error_occurred: self.error_occurred,
            ..Default::default()
        };
        let mut unknown_found = false;
        for (loaded, total) in self.progress.values() {
            progress.loaded += loaded;
            progress.total += total;
            unknown_found |= *total == 0;
        }
        if unknown_found {
            progress.total = 0;
        }
        progress
    }

    // ============== Runs ==============

    /// Forget everything about the previous run; its responses are ignored
    fn begin_run(&mut self) {
        self.generation += 1;
        self.queue.clear();
        self.pending.clear();
        self.progress.clear();
        self.in_flight.clear();
        self.lazy_views.clear();
        self.expected_items = 0;
        self.completed_items = 0;
        self.completion_fired = false;
        self.view_loaded = false;
        self.error_occurred = false;
        self.dispatch_index = 0;
    }

    /// Start loading the document at `url`
    pub fn load_metadata_url(&mut self, url: &str) -> RequestId {
        self.begin_run();
        info!("Loading metadata from {}", url);
        self.request(
            url.to_string(),
            RequestKind::Metadata,
            Pending::Metadata {
                url: url.to_string(),
            },
        )
    }

    /// Load a document already in memory
    ///
    /// Relative item URLs resolve against `reference_url`.
    pub fn load_metadata(
        &mut self,
        scene: &mut Scene,
        data: &[u8],
        reference_url: Option<&str>,
    ) -> Result<(), LoaderError> {
        self.begin_run();
        self.process_document(scene, data, reference_url)
    }

    fn process_document(
        &mut self,
        scene: &mut Scene,
        data: &[u8],
        reference_url: Option<&str>,
    ) -> Result<(), LoaderError> {
        let document = MetadataDocument::parse(data).inspect_err(|e| warn!("{}", e))?;

        scene.reset_metadata();
        scene.reset_duration();
        self.view_loaded = false;
        self.reference_url = reference_url.map(str::to_string);
        self.expected_items = document.countable_items();
        self.completed_items = 0;
        self.completion_fired = false;
        info!(
            "Metadata document parsed ({} countable items)",
            self.expected_items
        );

        match &document {
            MetadataDocument::V1(items) => self.dispatch_v1(scene, items),
            MetadataDocument::V2(document) => self.dispatch_v2(scene, document),
        }
        self.check_complete(scene);
        Ok(())
    }

    /// Serve every queued request through `transport` until none are left
    ///
    /// Returns the number of requests served.
    pub fn run_to_completion(&mut self, scene: &mut Scene, transport: &dyn Transport) -> usize {
        let mut served = 0;
        loop {
            let requests = self.take_requests();
            if requests.is_empty() {
                break;
            }
            for request in requests {
                let result = transport.fetch(&request.url);
                self.handle_response(scene, request.id, result);
                served += 1;
            }
        }
        served
    }

    // ============== Dispatch ==============

    fn dispatch_v1(&mut self, scene: &mut Scene, items: &[(usize, Item)]) {
        // View and settings first so geometry sees the final duration
        for (_, item) in items {
            match item.kind {
                ItemType::View => self.dispatch_view_item(scene, item),
                ItemType::Settings => apply_settings(scene, &item.settings),
                _ => {}
            }
        }
        let root = scene.root();
        for (index, item) in items {
            if !item.kind.is_primitive() {
                continue;
            }
            let region = item
                .region_path
                .as_deref()
                .and_then(|path| scene.tree_mut().find_or_create_child_from_path(root, path))
                .unwrap_or(root);
            self.dispatch_primitive(scene, item, region, *index as i32 * 2, Schema::V1);
        }
    }

    fn dispatch_view_item(&mut self, scene: &mut Scene, item: &Item) {
        match self.item_source(item) {
            Some(Source::Remote(url)) => {
                self.begin_download(ItemType::View);
                self.request(
                    url,
                    RequestKind::View,
                    Pending::View {
                        name: None,
                        counted: Some(Schema::V1),
                    },
                );
            }
            Some(Source::Inline(value)) => {
                match Viewport::from_json(&value) {
                    Some(viewport) => {
                        if scene.load_view(&viewport) {
                            self.view_loaded = true;
                        }
                    }
                    None => warn!("Ignoring inline view that is not a viewport"),
                }
                self.finish_item(scene, None);
            }
            None => {
                self.error_occurred = true;
                warn!("{}", LoaderError::MissingSource(ItemType::View));
                self.fail_item(scene, Schema::V1);
            }
        }
    }

    fn dispatch_v2(&mut self, scene: &mut Scene, document: &DocumentV2) {
        if let Some(settings) = &document.settings {
            apply_settings(scene, settings);
        }
        if let Some(views) = &document.views {
            self.dispatch_views(scene, views);
        }
        let root = scene.root();
        self.dispatch_region(scene, &document.regions, root);
    }

    fn dispatch_views(&mut self, scene: &mut Scene, views: &ViewsBlock) {
        for entry in &views.entries {
            let inline = entry.inline.as_ref().and_then(|inline| inline.url.as_ref());
            if let Some(value) = inline {
                match Viewport::from_json(value) {
                    Some(viewport) => scene.add_viewport(&entry.id, viewport),
                    None => warn!("Ignoring view {} that is not a viewport", entry.id),
                }
            } else if let Some(url) = &entry.url {
                let resolved = resolve_url(self.reference_url.as_deref(), url);
                self.lazy_views.insert(entry.id.clone(), resolved);
            }
        }
        if let Some(name) = &views.default {
            if scene.viewport(name).is_some() {
                if scene.set_viewport(name) {
                    self.view_loaded = true;
                }
            } else if self.request_view(scene, name).is_none() {
                warn!("Default view {} is not declared", name);
            }
        }
    }

    fn dispatch_region(&mut self, scene: &mut Scene, node: &RegionNode, region: Uuid) {
        if let Some(transformation) = node.transformation() {
            scene.tree_mut().set_transformation(region, &transformation);
        }
        for item in &node.primitives {
            if !item.kind.is_primitive() {
                debug!("Ignoring {:?} item inside a region", item.kind);
                continue;
            }
            let order = item.order.unwrap_or(self.dispatch_index) * 2;
            self.dispatch_index += 1;
            self.dispatch_primitive(scene, item, region, order, Schema::V2);
        }
        for (name, child) in &node.children {
            match scene.tree_mut().find_or_create_child_from_path(region, name) {
                Some(child_region) => self.dispatch_region(scene, child, child_region),
                None => warn!("Could not create region {}", name),
            }
        }
    }

    /// Fetch a named view of the current document and make it current
    ///
    /// Views already known to the scene are switched to directly and no
    /// request is queued.
    pub fn request_view(&mut self, scene: &mut Scene, name: &str) -> Option<RequestId> {
        if scene.viewport(name).is_some() {
            if scene.set_viewport(name) {
                self.view_loaded = true;
            }
            return None;
        }
        let url = self.lazy_views.get(name)?.clone();
        self.begin_download(ItemType::View);
        Some(self.request(
            url,
            RequestKind::View,
            Pending::View {
                name: Some(name.to_string()),
                counted: None,
            },
        ))
    }

    fn item_source(&self, item: &Item) -> Option<Source> {
        if let Some(url) = &item.url {
            return Some(Source::Remote(resolve_url(self.reference_url.as_deref(), url)));
        }
        item.inline
            .as_ref()
            .and_then(|inline| inline.url.clone())
            .map(Source::Inline)
    }

    fn glyph_geometry_source(&self, item: &Item) -> Option<Source> {
        if item.url.is_some() {
            return item
                .glyph_geometries_url
                .as_deref()
                .map(|url| Source::Remote(resolve_url(self.reference_url.as_deref(), url)));
        }
        let value = item.inline.as_ref()?.glyph_geometries_url.as_ref()?;
        Some(match value {
            Value::String(url) => Source::Remote(resolve_url(self.reference_url.as_deref(), url)),
            other => Source::Inline(other.clone()),
        })
    }

    fn dispatch_primitive(
        &mut self,
        scene: &mut Scene,
        item: &Item,
        region: Uuid,
        render_order: i32,
        schema: Schema,
    ) {
        let lod_levels = item
            .lod
            .iter()
            .flat_map(|lod| lod.levels.iter())
            .filter_map(|(name, level)| {
                let preset = LodPreset::from_name(name)?;
                let url = resolve_url(self.reference_url.as_deref(), level.url.as_deref()?);
                Some((preset, url))
            })
            .collect();
        let job = PrimitiveJob {
            kind: item.kind,
            schema,
            region,
            group_name: item.group_name.clone(),
            anatomical_id: item.anatomical_id.clone(),
            time_enabled: item.morph_vertices,
            morph_colour: item.morph_colours,
            format: FileFormat::from_name(item.file_format.as_deref()),
            render_order,
            display_labels: item.display_labels,
            glyph_geometry: self.glyph_geometry_source(item),
            lod_levels,
        };
        debug!(
            "Dispatching {:?} item {:?} (render order {})",
            job.kind, job.group_name, render_order
        );

        match self.item_source(item) {
            Some(Source::Remote(url)) => {
                self.begin_download(job.kind);
                self.request(url, RequestKind::Primitive(job.kind), Pending::Primitive(job));
            }
            Some(Source::Inline(value)) => {
                self.begin_download(job.kind);
                self.on_payload(scene, job, Payload::Inline(&value));
            }
            None => {
                self.error_occurred = true;
                warn!("{}", LoaderError::MissingSource(job.kind));
                self.fail_item(scene, job.schema);
            }
        }
    }

    // ============== Responses ==============

    /// Feed back the result of a request
    ///
    /// Returns false when the request is unknown or belongs to a superseded
    /// run; such responses are ignored.
    pub fn handle_response(
        &mut self,
        scene: &mut Scene,
        id: RequestId,
        result: Result<Vec<u8>, FetchError>,
    ) -> bool {
        let Some(pending) = self.pending.remove(&id) else {
            debug!("Ignoring response to superseded request {}", id);
            return false;
        };
        if let Ok(data) = &result {
            let size = data.len() as u64;
            self.progress.insert(id, (size, size));
        }

        match pending {
            Pending::Metadata { url } => match result {
                Ok(data) => {
                    // The document fails quietly: no item is ever reported
                    let _ = self.process_document(scene, &data, Some(&url));
                }
                Err(e) => {
                    self.error_occurred = true;
                    warn!("Failed to fetch metadata {}: {}", url, e);
                }
            },
            Pending::View {
                name,
                counted,
            } => {
                self.end_download(ItemType::View);
                let viewport = result.map_err(LoaderError::from).and_then(|data| {
                    serde_json::from_slice::<Viewport>(&data)
                        .map_err(|e| LoaderError::InvalidViewport(e.to_string()))
                });
                match viewport {
                    Ok(viewport) => {
                        if let Some(name) = &name {
                            scene.add_viewport(name, viewport.clone());
                        }
                        if scene.load_view(&viewport) {
                            self.view_loaded = true;
                        }
                        if counted.is_some() {
                            self.finish_item(scene, None);
                        }
                    }
                    Err(e) => {
                        self.error_occurred = true;
                        warn!("Failed to load view {:?}: {}", name, e);
                        if let Some(schema) = counted {
                            self.fail_item(scene, schema);
                        }
                    }
                }
            }
            Pending::Primitive(job) => match result {
                Ok(data) => self.on_payload(scene, job, Payload::Bytes(&data)),
                Err(e) => {
                    self.end_download(job.kind);
                    self.error_occurred = true;
                    warn!("Failed to fetch {:?} {:?}: {}", job.kind, job.group_name, e);
                    self.fail_item(scene, job.schema);
                }
            },
            Pending::GlyphGeometry { object, schema } => {
                self.end_download(ItemType::Glyph);
                let geometry = result
                    .map_err(LoaderError::from)
                    .and_then(|data| FileFormat::Json.loader().parse(&data).map_err(LoaderError::from));
                match geometry {
                    Ok(mesh) => {
                        if let Some(glyphset) = scene
                            .object_mut(object)
                            .and_then(ZincObject::as_glyphset_mut)
                        {
                            glyphset.set_glyph_geometry(mesh.geometry);
                        }
                        self.finish_item(scene, Some(object));
                    }
                    Err(e) => {
                        self.error_occurred = true;
                        warn!("Failed to load glyph geometry: {}", e);
                        self.fail_item(scene, schema);
                    }
                }
            }
            Pending::LodLevel {
                object,
                preset,
                format,
            } => {
                let mesh = result
                    .map_err(LoaderError::from)
                    .and_then(|data| format.loader().parse(&data).map_err(LoaderError::from));
                match mesh {
                    Ok(mesh) => {
                        let close = scene.config().lod_close_factor;
                        let medium = scene.config().lod_medium_factor;
                        if let Some(target) = scene.object_mut(object) {
                            target.add_lod_level(mesh.geometry, preset, close, medium);
                            debug!("Added {:?} level to {:?}", preset, target.group_name());
                        }
                    }
                    Err(e) => {
                        self.error_occurred = true;
                        warn!("Failed to load {:?} level: {}", preset, e);
                    }
                }
            }
        }
        true
    }

    fn on_payload(&mut self, scene: &mut Scene, job: PrimitiveJob, payload: Payload<'_>) {
        self.end_download(job.kind);
        let object = match self.attach(scene, &job, payload) {
            Ok(object) => object,
            Err(e) => {
                self.error_occurred = true;
                warn!("Failed to load {:?} {:?}: {}", job.kind, job.group_name, e);
                self.fail_item(scene, job.schema);
                return;
            }
        };

        for (preset, url) in &job.lod_levels {
            self.request(
                url.clone(),
                RequestKind::LodLevel,
                Pending::LodLevel {
                    object,
                    preset: *preset,
                    format: job.format,
                },
            );
        }

        if job.kind == ItemType::Glyph {
            match &job.glyph_geometry {
                Some(Source::Remote(url)) => {
                    self.begin_download(ItemType::Glyph);
                    self.request(
                        url.clone(),
                        RequestKind::GlyphGeometry,
                        Pending::GlyphGeometry {
                            object,
                            schema: job.schema,
                        },
                    );
                    return;
                }
                Some(Source::Inline(value)) => {
                    match FileFormat::Json.loader().parse_value(value) {
                        Ok(mesh) => {
                            if let Some(glyphset) = scene
                                .object_mut(object)
                                .and_then(ZincObject::as_glyphset_mut)
                            {
                                glyphset.set_glyph_geometry(mesh.geometry);
                            }
                        }
                        Err(e) => {
                            self.error_occurred = true;
                            warn!("Failed to parse inline glyph geometry: {}", e);
                        }
                    }
                }
                None => {}
            }
        }
        self.finish_item(scene, Some(object));
    }

    /// Build the object for a payload and attach it to the job's region
    fn attach(
        &self,
        scene: &mut Scene,
        job: &PrimitiveJob,
        payload: Payload<'_>,
    ) -> Result<Uuid, LoaderError> {
        let mut object = match job.kind {
            ItemType::Surfaces => {
                let mesh = payload.mesh(job.format)?;
                let material = mesh.material(self.config.default_colour, self.config.default_opacity);
                let mut object = ZincObject::surface();
                object.set_name(job.group_name.as_deref());
                object.set_mesh(mesh.geometry, material, job.time_enabled, job.morph_colour);
                object
            }
            ItemType::Points | ItemType::Lines => {
                let mesh = payload.mesh(job.format)?;
                if let Some(existing) = self.existing_object(scene, job) {
                    if let Some(object) = scene.object_mut(existing) {
                        object.merge_geometry(&mesh.geometry);
                    }
                    if let Some(region) = scene.tree_mut().region_mut(job.region) {
                        region.pickable_update_required = true;
                    }
                    return Ok(existing);
                }
                let mut material =
                    mesh.material(self.config.default_colour, self.config.default_opacity);
                material.point_size = self.config.point_size;
                material.line_width = self.config.line_width;
                let mut object = if job.kind == ItemType::Points {
                    ZincObject::points()
                } else {
                    ZincObject::lines()
                };
                object.set_name(job.group_name.as_deref());
                object.set_mesh(mesh.geometry, material, job.time_enabled, job.morph_colour);
                object
            }
            ItemType::Glyph => {
                let value = payload.json()?;
                let data = GlyphsetData::from_json(&value)
                    .map_err(|e| LoaderError::Glyphset(e.to_string()))?;
                let mut object = ZincObject::glyphset(data, job.display_labels);
                object.set_name(job.group_name.as_deref());
                object
            }
            other => return Err(LoaderError::MissingSource(other)),
        };
        object.anatomical_id = job.anatomical_id.clone();
        object.set_render_order(job.render_order);
        scene
            .add_zinc_object_to(job.region, object)
            .ok_or(LoaderError::RegionNotFound)
    }

    /// Point or line set of the same group already in the job's region
    fn existing_object(&self, scene: &Scene, job: &PrimitiveJob) -> Option<Uuid> {
        let group_name = job.group_name.as_deref()?;
        let tree = scene.tree();
        let found = match job.kind {
            ItemType::Points => tree.find_pointsets_with_group_name(job.region, group_name, false),
            ItemType::Lines => tree.find_lines_with_group_name(job.region, group_name, false),
            _ => Vec::new(),
        };
        found.first().copied()
    }

    // ============== Completion ==============

    fn finish_item(&mut self, scene: &mut Scene, object: Option<Uuid>) {
        self.completed_items += 1;
        debug!(
            "Item {}/{} complete",
            self.completed_items, self.expected_items
        );
        if let Some(callback) = self.on_item.as_mut() {
            callback(object);
        }
        self.check_complete(scene);
    }

    fn fail_item(&mut self, scene: &mut Scene, schema: Schema) {
        match schema {
            Schema::V1 if !self.config.count_failed_items => {}
            _ => self.finish_item(scene, None),
        }
    }

    fn check_complete(&mut self, scene: &mut Scene) {
        if self.completion_fired || self.completed_items < self.expected_items {
            return;
        }
        self.completion_fired = true;
        if !self.view_loaded {
            scene.view_all();
        }
        info!("All {} metadata items loaded", self.expected_items);
        if let Some(callback) = self.on_complete.as_mut() {
            callback();
        }
    }
}

fn apply_settings(scene: &mut Scene, settings: &SettingsBlock) {
    if let Some(duration) = &settings.duration
        && !scene.set_duration_from_iso(&IsoDuration::parse(duration))
    {
        warn!("Ignoring unparseable duration {:?}", duration);
    }
    if let Some(duration) = &settings.original_duration
        && !scene.set_original_duration_from_iso(&IsoDuration::parse(duration))
    {
        warn!("Ignoring unparseable original duration {:?}", duration);
    }
    for (label, time) in &settings.time_stamps {
        if !scene.add_metadata_time_stamp(label, &IsoDuration::parse(time)) {
            warn!("Ignoring unparseable time stamp {} = {:?}", label, time);
        }
    }
}
