use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::feature::{FeatureId, SharedFeature};
use crate::geometry::{BBox, Crs};
use crate::spatial::SpatialIndex;

/// A unique layer identifier.
pub type LayerId = Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    #[error("Feature {0} is already in the layer")]
    AlreadyInLayer(FeatureId),

    #[error("Feature {0} is not in the layer")]
    NotInLayer(FeatureId),
}

/// The source of features for one layer renderer.
pub trait Layer {
    /// Features to draw for the viewport, in draw order.
    fn get_features(&self, bbox: &BBox, crs: &Crs, resolution: f64) -> Vec<SharedFeature>;

    /// Whether bursts of updates should be collapsed into one redraw.
    fn delayed_update(&self) -> bool;

    /// How long removed features stay on screen so a transition can play.
    fn transition_time(&self) -> Duration;

    /// When set, a redraw cycle stops before touching anything.
    fn update_prohibited(&self) -> bool {
        false
    }

    /// Bumped on every change that makes the current picture stale.
    fn revision(&self) -> u64 {
        0
    }
}

/// Minimum and maximum resolution at which a layer is displayed. A negative
/// bound is not applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolutionLimits(pub f64, pub f64);

impl Default for ResolutionLimits {
    fn default() -> Self {
        Self(-1.0, -1.0)
    }
}

impl ResolutionLimits {
    pub fn contains(&self, resolution: f64) -> bool {
        (self.0 < 0.0 || resolution >= self.0) && (self.1 < 0.0 || resolution <= self.1)
    }
}

/// Display properties of a [`FeatureLayer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureLayerSettings {
    pub delayed_update: bool,
    pub transition_time_ms: u64,
    pub resolution_limits: ResolutionLimits,
    pub is_displayed: bool,
}

impl Default for FeatureLayerSettings {
    fn default() -> Self {
        Self {
            delayed_update: true,
            transition_time_ms: 0,
            resolution_limits: ResolutionLimits::default(),
            is_displayed: true,
        }
    }
}

/// A layer holding an arbitrary, ordered set of features.
///
/// Later features are drawn on top of earlier ones.
pub struct FeatureLayer {
    pub id: LayerId,
    pub name: String,
    settings: RefCell<FeatureLayerSettings>,
    features: RefCell<Vec<SharedFeature>>,
    /// Rebuilt lazily after the feature list changes.
    index: RefCell<Option<SpatialIndex>>,
    revision: Cell<u64>,
    update_prohibited: Cell<bool>,
}

impl FeatureLayer {
    pub fn new(name: &str) -> Self {
        Self::with_settings(name, FeatureLayerSettings::default())
    }

    pub fn with_settings(name: &str, settings: FeatureLayerSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            settings: RefCell::new(settings),
            features: RefCell::new(Vec::new()),
            index: RefCell::new(None),
            revision: Cell::new(0),
            update_prohibited: Cell::new(false),
        }
    }

    fn touch(&self) {
        self.revision.set(self.revision.get() + 1);
    }

    fn features_changed(&self) {
        self.index.borrow_mut().take();
        self.touch();
    }

    fn position(&self, id: FeatureId) -> Option<usize> {
        self.features.borrow().iter().position(|f| f.id() == id)
    }

    // ── Feature management ───────────────────────────────────────────

    /// Add features to the top of the layer. Nothing is added if any of
    /// them is already present.
    pub fn add(&self, features: &[SharedFeature]) -> Result<(), LayerError> {
        if features.is_empty() {
            return Ok(());
        }
        for (i, feature) in features.iter().enumerate() {
            let duplicate = features[..i].iter().any(|f| f.id() == feature.id());
            if duplicate || self.has(feature.id()) {
                return Err(LayerError::AlreadyInLayer(feature.id()));
            }
        }

        self.features.borrow_mut().extend(features.iter().cloned());
        log::debug!("Layer '{}': added {} features", self.name, features.len());
        self.features_changed();
        Ok(())
    }

    /// Remove features from the layer. Nothing is removed if any of them is
    /// missing.
    pub fn remove(&self, features: &[SharedFeature]) -> Result<(), LayerError> {
        if features.is_empty() {
            return Ok(());
        }
        if let Some(missing) = features.iter().find(|f| !self.has(f.id())) {
            return Err(LayerError::NotInLayer(missing.id()));
        }

        self.features
            .borrow_mut()
            .retain(|f| !features.iter().any(|r| r.id() == f.id()));
        log::debug!("Layer '{}': removed {} features", self.name, features.len());
        self.features_changed();
        Ok(())
    }

    pub fn has(&self, id: FeatureId) -> bool {
        self.position(id).is_some()
    }

    /// Move a feature to the end of the draw order. Ignored when the feature
    /// is not in the layer.
    pub fn move_to_top(&self, id: FeatureId) {
        if let Some(index) = self.position(id) {
            let mut features = self.features.borrow_mut();
            let feature = features.remove(index);
            features.push(feature);
            drop(features);
            self.features_changed();
        }
    }

    /// Replace the whole feature list.
    pub fn set_features(&self, features: Vec<SharedFeature>) -> Result<(), LayerError> {
        self.features.borrow_mut().clear();
        self.features_changed();
        self.add(&features)
    }

    pub fn features(&self) -> Vec<SharedFeature> {
        self.features.borrow().clone()
    }

    pub fn feature_count(&self) -> usize {
        self.features.borrow().len()
    }

    // ── Properties ───────────────────────────────────────────────────

    pub fn settings(&self) -> FeatureLayerSettings {
        self.settings.borrow().clone()
    }

    pub fn set_delayed_update(&self, delayed: bool) {
        self.settings.borrow_mut().delayed_update = delayed;
        self.touch();
    }

    pub fn set_transition_time(&self, time: Duration) {
        self.settings.borrow_mut().transition_time_ms = time.as_millis() as u64;
        self.touch();
    }

    pub fn set_resolution_limits(&self, limits: ResolutionLimits) {
        self.settings.borrow_mut().resolution_limits = limits;
        self.touch();
    }

    pub fn set_displayed(&self, displayed: bool) {
        self.settings.borrow_mut().is_displayed = displayed;
        self.touch();
    }

    pub fn set_update_prohibited(&self, prohibited: bool) {
        self.update_prohibited.set(prohibited);
    }

    fn check_visibility(&self, resolution: f64) -> bool {
        let settings = self.settings.borrow();
        settings.is_displayed && settings.resolution_limits.contains(resolution)
    }
}

impl Layer for FeatureLayer {
    fn get_features(&self, bbox: &BBox, crs: &Crs, resolution: f64) -> Vec<SharedFeature> {
        if !self.check_visibility(resolution) {
            return Vec::new();
        }

        let features = self.features.borrow();
        let mut index = self.index.borrow_mut();
        let index = index.get_or_insert_with(|| SpatialIndex::build(&features));

        index
            .query_viewport(bbox)
            .into_iter()
            .map(|i| &features[i])
            .filter(|f| f.projectable_to(crs))
            .cloned()
            .collect()
    }

    fn delayed_update(&self) -> bool {
        self.settings.borrow().delayed_update
    }

    fn transition_time(&self) -> Duration {
        Duration::from_millis(self.settings.borrow().transition_time_ms)
    }

    fn update_prohibited(&self) -> bool {
        self.update_prohibited.get()
    }

    fn revision(&self) -> u64 {
        self.revision.get()
    }
}

impl std::fmt::Debug for FeatureLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureLayer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("features", &self.feature_count())
            .field("revision", &self.revision.get())
            .finish()
    }
}

/// Shared handle through which both the map and a renderer see a layer.
pub type SharedLayer = Rc<dyn Layer>;
