use std::collections::{HashMap, HashSet};
use std::mem;
use std::rc::Rc;
use std::time::Duration;

use mapview_core::{
    EventKind, FeatureId, HitKind, NodeId, Point, RenderError, RenderId, RenderItem,
    RenderKind, RenderSet, RenderedNode, SharedFeature, SharedLayer,
};

use crate::canvas::Canvas;
use crate::container::SharedContainer;
use crate::master::MapContext;
use crate::render_data::{FeatureSnapshot, RendererSnapshot};
use crate::scheduler::{Scheduler, TaskId};
use crate::settings::RendererSettings;
use crate::svg_render::SvgRender;
use crate::viewport::Viewport;

/// Highest layer index whose node z-index `2 * index + 1` fits in an `i32`.
/// Larger indices stack at this level.
const MAX_LAYER_INDEX: i32 = (i32::MAX - 1) / 2;

/// Work deferred onto the renderer clock.
enum Job {
    Rerender,
    NodeReady {
        render: RenderId,
        outcome: Result<RenderedNode, RenderError>,
    },
    NodeRegenerated {
        render: RenderId,
        target: SharedContainer,
        outcome: Result<RenderedNode, RenderError>,
    },
    FlushRemovals {
        batch: u64,
    },
}

/// Arena entry for one render item that has been drawn or requested.
struct RenderRecord {
    feature: FeatureId,
    item: RenderItem,
    /// Resolution the item's pixel coordinates were produced at.
    resolution: f64,
    node: Option<NodeId>,
    container: Option<SharedContainer>,
    /// Unscaled pixel anchor of a fixed-size node.
    anchor: Option<Point>,
}

impl RenderRecord {
    fn new(feature: FeatureId, item: RenderItem, resolution: f64) -> Self {
        Self {
            feature,
            item,
            resolution,
            node: None,
            container: None,
            anchor: None,
        }
    }
}

struct PendingRemoval {
    render: RenderId,
    /// Flush batch the removal was handed to, once nothing was loading.
    batch: Option<u64>,
}

struct FeatureRenderState {
    feature: SharedFeature,
    current: Option<RenderSet>,
    outdated: Vec<RenderId>,
    pending_removal: Vec<PendingRemoval>,
    /// Last set moved to pending removal; restored if the feature comes back
    /// with the same output before teardown.
    removed_set: Option<RenderSet>,
}

impl FeatureRenderState {
    fn new(feature: SharedFeature) -> Self {
        Self {
            feature,
            current: None,
            outdated: Vec::new(),
            pending_removal: Vec::new(),
            removed_set: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.current.is_none() && self.outdated.is_empty() && self.pending_removal.is_empty()
    }
}

/// The feature a pointer event resolves to.
#[derive(Debug, Clone)]
pub struct EventCatch {
    pub feature: SharedFeature,
    pub render: RenderId,
    pub intersection: HitKind,
}

/// Renders one layer into the map's containers.
///
/// Homogeneous vector output is batched onto a shared canvas; everything
/// else becomes a node built asynchronously. Superseded output stays on
/// screen until its replacement has loaded, and features that left the view
/// are torn down only once nothing is loading and the layer's transition
/// time has passed.
pub struct LayerRenderer {
    layer: SharedLayer,
    master: Rc<dyn MapContext>,
    settings: RendererSettings,

    canvas: Canvas,
    canvas_container: Option<SharedContainer>,
    current_container: Option<SharedContainer>,

    states: HashMap<FeatureId, FeatureRenderState>,
    renders: HashMap<RenderId, RenderRecord>,
    loading: HashMap<RenderId, TaskId>,
    regenerating: HashMap<RenderId, TaskId>,
    event_catchers: HashMap<EventKind, Vec<RenderId>>,

    index: Option<usize>,
    z_index: i32,

    update_needed: bool,
    seen_revision: u64,
    update_timer: Option<TaskId>,
    next_batch: u64,
    scheduler: Scheduler<Job>,
}

impl LayerRenderer {
    pub fn new(
        master: Rc<dyn MapContext>,
        layer: SharedLayer,
        index: usize,
        settings: RendererSettings,
    ) -> Self {
        let seen_revision = layer.revision();
        let mut renderer = Self {
            layer,
            master,
            settings,
            canvas: Canvas::new(),
            canvas_container: None,
            current_container: None,
            states: HashMap::new(),
            renders: HashMap::new(),
            loading: HashMap::new(),
            regenerating: HashMap::new(),
            event_catchers: HashMap::new(),
            index: None,
            z_index: 0,
            // The first update always draws right away.
            update_needed: true,
            seen_revision,
            update_timer: None,
            next_batch: 0,
            scheduler: Scheduler::new(),
        };
        renderer.set_index(index);
        renderer
    }

    pub fn layer(&self) -> &SharedLayer {
        &self.layer
    }

    // ── Update cycle ─────────────────────────────────────────────────

    /// Request a redraw. Layers with delayed updates collapse bursts of
    /// calls into one redraw after the debounce window, unless an update is
    /// already overdue.
    pub fn update(&mut self) -> Result<(), RenderError> {
        if self.master.viewport().is_none() {
            return Err(RenderError::NoViewport);
        }

        let revision = self.layer.revision();
        if revision != self.seen_revision {
            self.seen_revision = revision;
            self.update_needed = true;
        }

        if self.layer.delayed_update() {
            if let Some(timer) = self.update_timer.take() {
                self.scheduler.cancel(timer);
            }

            if self.update_needed {
                self.rerender()?;
            } else {
                let timer = self
                    .scheduler
                    .schedule(self.settings.delayed_update_time(), Job::Rerender);
                self.update_timer = Some(timer);
            }
        } else {
            self.rerender()?;
        }

        self.update_needed = false;
        Ok(())
    }

    /// Make the next [`LayerRenderer::update`] redraw immediately.
    pub fn force_update(&mut self) {
        self.update_needed = true;
    }

    pub fn is_update_scheduled(&self) -> bool {
        self.update_timer
            .is_some_and(|timer| self.scheduler.is_pending(timer))
    }

    /// Redraw the layer for the current viewport.
    pub fn rerender(&mut self) -> Result<(), RenderError> {
        let viewport = self.master.viewport().ok_or(RenderError::NoViewport)?;
        let bbox = viewport.bbox();

        let features = self
            .layer
            .get_features(&bbox, &viewport.crs, viewport.resolution);
        if self.layer.update_prohibited() {
            log::debug!("Layer update prohibited, redraw skipped");
            return Ok(());
        }

        let visible: HashSet<FeatureId> = features.iter().map(|f| f.id()).collect();
        let gone: Vec<FeatureId> = self
            .states
            .iter()
            .filter(|(id, state)| state.current.is_some() && !visible.contains(id))
            .map(|(id, _)| *id)
            .collect();
        for id in &gone {
            self.mark_for_removal(*id);
        }

        self.canvas
            .reset(bbox, viewport.resolution, viewport.width, viewport.height);

        for feature in &features {
            self.draw_feature(feature, &viewport);
        }

        log::debug!(
            "Layer redraw at resolution {}: {} visible, {} removed, {} loading",
            viewport.resolution,
            features.len(),
            gone.len(),
            self.loading.len()
        );

        let placed = self.place_canvas();
        self.clean(None);
        placed
    }

    /// Draw a single feature for the current viewport.
    pub fn draw(&mut self, feature: &SharedFeature) -> Result<(), RenderError> {
        let viewport = self.master.viewport().ok_or(RenderError::NoViewport)?;
        if self.canvas.bbox().is_none() {
            self.canvas.reset(
                viewport.bbox(),
                viewport.resolution,
                viewport.width,
                viewport.height,
            );
        }

        let drawn = self.canvas.commands().len();
        self.draw_feature(feature, &viewport);
        if self.canvas.commands().len() != drawn {
            self.place_canvas()?;
        }
        Ok(())
    }

    /// Attach the canvas to the current container, or detach it when empty.
    fn place_canvas(&mut self) -> Result<(), RenderError> {
        if let Some(container) = self.canvas_container.take() {
            container.borrow_mut().remove_node(self.canvas.node_id());
        }
        let Some(bbox) = self.canvas.bbox() else {
            return Ok(());
        };
        if self.canvas.is_empty() {
            return Ok(());
        }

        let container = self
            .master
            .current_container()
            .ok_or(RenderError::NoContainer)?;
        container.borrow_mut().add_node(
            self.canvas.node(),
            self.canvas.width(),
            self.canvas.height(),
            &bbox,
        );
        self.set_current_container(container.clone());
        self.canvas_container = Some(container);
        Ok(())
    }

    fn feature_is_loading(&self, id: FeatureId) -> bool {
        self.states
            .get(&id)
            .and_then(|state| state.current.as_ref())
            .is_some_and(|set| set.ids().any(|render| self.loading.contains_key(&render)))
    }

    fn draw_feature(&mut self, feature: &SharedFeature, viewport: &Viewport) {
        let id = feature.id();
        if self.feature_is_loading(id) {
            log::trace!("Feature {id} is still loading, draw skipped");
            return;
        }

        let set = feature.render(viewport.resolution, &viewport.crs);
        self.cancel_removal(id, &set);

        let items = set.items();
        let mixed = items.windows(2).any(|w| w[0].is_vector() != w[1].is_vector());
        let on_canvas = self.settings.use_canvas
            && !mixed
            && items.first().is_some_and(|item| item.is_vector());

        let unchanged = self
            .states
            .entry(id)
            .or_insert_with(|| FeatureRenderState::new(feature.clone()))
            .current
            .as_ref()
            .is_some_and(|current| current.same_as(&set));

        if unchanged {
            if on_canvas {
                for item in items {
                    self.canvas.draw(item);
                }
                self.clean(Some(id));
            } else {
                self.ensure_nodes(id, &set, viewport.resolution);
            }
            return;
        }

        self.mark_as_outdated(id);
        if let Some(state) = self.states.get_mut(&id) {
            state.current = Some(set.clone());
        }

        for item in items {
            self.renders
                .insert(item.id, RenderRecord::new(id, item.clone(), viewport.resolution));
            if on_canvas {
                self.canvas.draw(item);
            } else {
                self.draw_node_render(item.id);
            }
            self.set_feature_listeners(feature, item);
        }

        if on_canvas || set.is_empty() {
            self.clean(Some(id));
        }
    }

    /// Re-request nodes that are neither shown nor loading, e.g. after a
    /// failed build.
    fn ensure_nodes(&mut self, feature: FeatureId, set: &RenderSet, resolution: f64) {
        for item in set.items() {
            let shown = self.renders.get(&item.id).is_some_and(|r| r.node.is_some());
            if shown || self.loading.contains_key(&item.id) {
                continue;
            }
            self.renders
                .entry(item.id)
                .or_insert_with(|| RenderRecord::new(feature, item.clone(), resolution));
            self.draw_node_render(item.id);
        }
    }

    fn set_feature_listeners(&mut self, feature: &SharedFeature, item: &RenderItem) {
        if item.ignore_events {
            return;
        }
        for event in &self.settings.listens_for {
            if !feature.has_listeners(*event) {
                continue;
            }
            let catchers = self.event_catchers.entry(*event).or_default();
            if !catchers.contains(&item.id) {
                catchers.push(item.id);
            }
        }
    }

    // ── Asynchronous nodes ───────────────────────────────────────────

    fn draw_node_render(&mut self, render: RenderId) {
        if self.loading.contains_key(&render) {
            return;
        }
        let Some(record) = self.renders.get(&render) else {
            return;
        };

        let task = match &record.item.kind {
            RenderKind::Node(source) => source.get_node(render),
            RenderKind::Vector(_) => SvgRender::new(&record.item).get_node(),
        };
        let timer = self.scheduler.schedule(
            task.ready_after,
            Job::NodeReady {
                render,
                outcome: task.outcome,
            },
        );
        self.loading.insert(render, timer);
    }

    fn on_node_ready(&mut self, render: RenderId, outcome: Result<RenderedNode, RenderError>) {
        if self.loading.remove(&render).is_none() {
            return;
        }
        let Some(feature) = self.renders.get(&render).map(|r| r.feature) else {
            self.clean(None);
            return;
        };

        let rendered = match outcome {
            Ok(rendered) => rendered,
            Err(err) => {
                log::warn!("Feature {feature}: {err}");
                self.clean(Some(feature));
                return;
            }
        };

        if !self.is_relevant(feature, render) {
            log::trace!("Discarding stale node for render {render}");
            self.clean(None);
            return;
        }

        let Some(container) = self.master.current_container() else {
            log::warn!("Feature {feature}: {}", RenderError::NoContainer);
            self.clean(Some(feature));
            return;
        };

        if self.place_node(render, rendered, &container) {
            self.set_current_container(container);
        } else {
            log::warn!("Feature {feature}: render {render} has no bbox or pixel anchor");
        }
        self.clean(Some(feature));
    }

    /// A completed node is still wanted only while its item, or the item it
    /// was derived from, belongs to the feature's current set.
    fn is_relevant(&self, feature: FeatureId, render: RenderId) -> bool {
        let Some(current) = self.states.get(&feature).and_then(|s| s.current.as_ref()) else {
            return false;
        };
        match self.renders.get(&render) {
            Some(record) => current.has_render(record.item.base_render.unwrap_or(render)),
            None => false,
        }
    }

    fn place_node(
        &mut self,
        render: RenderId,
        rendered: RenderedNode,
        container: &SharedContainer,
    ) -> bool {
        let Some(record) = self.renders.get_mut(&render) else {
            return false;
        };

        let mut node = rendered.node;
        node.z_index = self.z_index;
        let node_id = node.id;
        let item = &record.item;

        let mut target = container.borrow_mut();
        if let Some(bbox) = item.bbox {
            let width = item.width.unwrap_or(node.width);
            let height = item.height.unwrap_or(node.height);
            target.add_node(node, width, height, &bbox);
            record.anchor = None;
        } else if let Some(anchor) = item.position.or(rendered.position) {
            let k = record.resolution / target.resolution();
            target.add_fixed_size_node(node, anchor.scale(k), item.offset);
            record.anchor = Some(anchor);
        } else {
            return false;
        }
        drop(target);

        record.node = Some(node_id);
        record.container = Some(container.clone());
        true
    }

    fn set_current_container(&mut self, container: SharedContainer) {
        let changed = self
            .current_container
            .as_ref()
            .map_or(true, |current| current.borrow().id() != container.borrow().id());
        if changed {
            self.current_container = Some(container);
            self.master.resolve_layer_overlay();
        }
    }

    pub fn current_container(&self) -> Option<SharedContainer> {
        self.current_container.clone()
    }

    // ── Cleanup ──────────────────────────────────────────────────────

    /// Drop the feature's outdated renders, then hand pending removals to a
    /// delayed flush if nothing is loading anywhere in the layer.
    fn clean(&mut self, feature: Option<FeatureId>) {
        if let Some(id) = feature {
            let outdated = self
                .states
                .get_mut(&id)
                .map(|state| mem::take(&mut state.outdated))
                .unwrap_or_default();
            for render in outdated {
                self.remove_render(render);
            }
            self.drop_state_if_empty(id);
        }

        if !self.loading.is_empty() {
            return;
        }
        self.schedule_removals();
    }

    fn schedule_removals(&mut self) {
        let batch = self.next_batch;
        let mut scheduled = false;
        for state in self.states.values_mut() {
            for removal in state.pending_removal.iter_mut().filter(|r| r.batch.is_none()) {
                removal.batch = Some(batch);
                scheduled = true;
            }
        }
        if !scheduled {
            return;
        }

        self.next_batch += 1;
        self.scheduler
            .schedule(self.layer.transition_time(), Job::FlushRemovals { batch });
    }

    fn flush_removals(&mut self, batch: u64) {
        if !self.loading.is_empty() {
            // Something started loading since the batch was scheduled; wait
            // for the next drain.
            for state in self.states.values_mut() {
                for removal in &mut state.pending_removal {
                    if removal.batch == Some(batch) {
                        removal.batch = None;
                    }
                }
            }
            return;
        }

        let mut doomed = Vec::new();
        let mut touched = Vec::new();
        for (id, state) in self.states.iter_mut() {
            let before = state.pending_removal.len();
            state.pending_removal.retain(|removal| {
                if removal.batch == Some(batch) {
                    doomed.push(removal.render);
                    false
                } else {
                    true
                }
            });
            if state.pending_removal.len() != before {
                touched.push(*id);
            }
            if state.pending_removal.is_empty() {
                state.removed_set = None;
            }
        }

        log::trace!("Flushing {} removed renders", doomed.len());
        for render in doomed {
            self.remove_render(render);
        }
        for id in touched {
            self.drop_state_if_empty(id);
        }
    }

    fn mark_for_removal(&mut self, id: FeatureId) {
        if let Some(state) = self.states.get_mut(&id) {
            if let Some(set) = state.current.take() {
                state
                    .pending_removal
                    .extend(set.ids().map(|render| PendingRemoval {
                        render,
                        batch: None,
                    }));
                state.removed_set = (!set.is_empty()).then_some(set);
            }
        }
        // Nothing on screen to tear down for an empty set.
        self.drop_state_if_empty(id);
    }

    /// The feature is visible again: its pending teardown is cancelled. Output
    /// identical to what was removed is restored as-is, anything else is kept
    /// as outdated until the new output has loaded.
    fn cancel_removal(&mut self, id: FeatureId, set: &RenderSet) {
        let Some(state) = self.states.get_mut(&id) else {
            return;
        };
        if state.pending_removal.is_empty() {
            return;
        }

        if let Some(removed) = state.removed_set.take() {
            if state.current.is_none() && removed.same_as(set) {
                state
                    .pending_removal
                    .retain(|removal| !removed.has_render(removal.render));
                state.current = Some(removed);
            }
        }

        let rest = mem::take(&mut state.pending_removal);
        state.outdated.extend(rest.into_iter().map(|removal| removal.render));
    }

    fn mark_as_outdated(&mut self, id: FeatureId) {
        if let Some(state) = self.states.get_mut(&id) {
            if let Some(set) = state.current.take() {
                state.outdated.extend(set.ids());
            }
        }
    }

    fn drop_state_if_empty(&mut self, id: FeatureId) {
        if self.states.get(&id).is_some_and(|state| state.is_empty()) {
            self.states.remove(&id);
        }
    }

    fn remove_render(&mut self, render: RenderId) {
        for catchers in self.event_catchers.values_mut() {
            catchers.retain(|r| *r != render);
        }
        if let Some(timer) = self.loading.remove(&render) {
            self.scheduler.cancel(timer);
        }
        if let Some(timer) = self.regenerating.remove(&render) {
            self.scheduler.cancel(timer);
        }

        let Some(record) = self.renders.remove(&render) else {
            return;
        };
        if let (Some(node), Some(container)) = (record.node, record.container) {
            container.borrow_mut().remove_node(node);
        }
    }

    /// Remove everything this renderer has put on screen and drop all
    /// pending work, including a scheduled update.
    pub fn clear(&mut self) {
        self.scheduler.clear();
        self.loading.clear();
        self.regenerating.clear();
        self.update_timer = None;

        let renders: Vec<RenderId> = self.renders.keys().copied().collect();
        for render in renders {
            self.remove_render(render);
        }
        self.states.clear();
        self.event_catchers.clear();

        if let Some(container) = self.canvas_container.take() {
            container.borrow_mut().remove_node(self.canvas.node_id());
        }
    }

    // ── Stacking and containers ──────────────────────────────────────

    /// Nodes stack at `2 * index + 1`, the canvas just below at `2 * index`.
    pub fn set_index(&mut self, index: usize) {
        if self.index == Some(index) {
            return;
        }

        let z_index = i32::try_from(index).unwrap_or(i32::MAX).min(MAX_LAYER_INDEX) * 2 + 1;
        for record in self.renders.values() {
            if let (Some(node), Some(container)) = (record.node, &record.container) {
                container.borrow_mut().set_z_index(node, z_index);
            }
        }

        self.canvas.set_index(z_index - 1);
        if let Some(container) = &self.canvas_container {
            container
                .borrow_mut()
                .set_z_index(self.canvas.node_id(), z_index - 1);
        }

        self.index = Some(index);
        self.z_index = z_index;
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    /// Re-parent every live node into the map's current container.
    ///
    /// Bbox nodes and fixed-position nodes move at once, rescaled by the
    /// resolution ratio. SVG nodes without an anchor of their own are
    /// rebuilt at the new scale and swapped in once ready.
    pub fn move_to_last_container(&mut self) {
        let Some(last) = self.master.current_container() else {
            return;
        };
        let (last_id, last_resolution) = {
            let last = last.borrow();
            (last.id(), last.resolution())
        };

        let mut renders = Vec::new();
        for state in self.states.values() {
            renders.extend(state.outdated.iter().copied());
            if let Some(set) = &state.current {
                renders.extend(set.ids());
            }
        }

        for render in renders {
            let Some(record) = self.renders.get_mut(&render) else {
                continue;
            };
            let (Some(node_id), Some(container)) = (record.node, record.container.clone()) else {
                continue;
            };
            if container.borrow().id() == last_id {
                continue;
            }

            // Pixels of the item's own resolution to pixels of the target.
            let k = record.resolution / last_resolution;
            let item = &record.item;
            let fixed_anchor = item
                .position
                .or(if item.is_vector() { None } else { record.anchor });

            if let Some(bbox) = item.bbox {
                let Some(node) = container.borrow_mut().remove_node(node_id) else {
                    continue;
                };
                let width = item.width.unwrap_or(node.width);
                let height = item.height.unwrap_or(node.height);
                last.borrow_mut().add_node(node, width, height, &bbox);
                record.container = Some(last.clone());
            } else if let Some(anchor) = fixed_anchor {
                let Some(node) = container.borrow_mut().remove_node(node_id) else {
                    continue;
                };
                last.borrow_mut()
                    .add_fixed_size_node(node, anchor.scale(k), item.offset);
                record.container = Some(last.clone());
            } else if item.is_vector() && !self.regenerating.contains_key(&render) {
                let task = SvgRender::with_ratio(item, k).get_node();
                let timer = self.scheduler.schedule(
                    task.ready_after,
                    Job::NodeRegenerated {
                        render,
                        target: last.clone(),
                        outcome: task.outcome,
                    },
                );
                self.regenerating.insert(render, timer);
            }
        }

        if let Some(container) = self.canvas_container.clone() {
            if container.borrow().id() != last_id {
                if let Some(bbox) = self.canvas.bbox() {
                    container.borrow_mut().remove_node(self.canvas.node_id());
                    last.borrow_mut().add_node(
                        self.canvas.node(),
                        self.canvas.width(),
                        self.canvas.height(),
                        &bbox,
                    );
                    self.canvas_container = Some(last.clone());
                }
            }
        }

        self.set_current_container(last);
    }

    fn on_node_regenerated(
        &mut self,
        render: RenderId,
        target: SharedContainer,
        outcome: Result<RenderedNode, RenderError>,
    ) {
        if self.regenerating.remove(&render).is_none() {
            return;
        }
        let rendered = match outcome {
            Ok(rendered) => rendered,
            Err(err) => {
                log::warn!("Could not rebuild node for render {render}: {err}");
                return;
            }
        };
        let Some(position) = rendered.position else {
            return;
        };
        let Some(record) = self.renders.get_mut(&render) else {
            return;
        };
        let (Some(old_node), Some(old_container)) = (record.node, record.container.clone()) else {
            return;
        };

        old_container.borrow_mut().remove_node(old_node);
        let mut node = rendered.node;
        node.z_index = self.z_index;
        record.node = Some(node.id);
        target.borrow_mut().add_fixed_size_node(node, position, None);
        record.container = Some(target);
    }

    // ── Clock ────────────────────────────────────────────────────────

    /// Advance the renderer clock, running debounced updates, node
    /// completions and removal flushes that fall due. The first redraw error
    /// is returned after the remaining work has run.
    pub fn advance(&mut self, elapsed: Duration) -> Result<(), RenderError> {
        let until = self.scheduler.now() + elapsed;
        let mut result = Ok(());

        while let Some((_, job)) = self.scheduler.pop_until(until) {
            match job {
                Job::Rerender => {
                    self.update_timer = None;
                    if let Err(err) = self.rerender() {
                        log::warn!("Delayed layer redraw failed: {err}");
                        if result.is_ok() {
                            result = Err(err);
                        }
                    }
                }
                Job::NodeReady { render, outcome } => self.on_node_ready(render, outcome),
                Job::NodeRegenerated {
                    render,
                    target,
                    outcome,
                } => self.on_node_regenerated(render, target, outcome),
                Job::FlushRemovals { batch } => self.flush_removals(batch),
            }
        }

        self.scheduler.advance_clock(until);
        result
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn has_pending_work(&self) -> bool {
        self.scheduler.pending() > 0
    }

    // ── Hit testing ──────────────────────────────────────────────────

    /// Resolve a pointer event at a render-pixel position to the feature
    /// whose item was registered first for that event and contains it.
    pub fn get_event_catcher(&self, event: EventKind, px: Point) -> Option<EventCatch> {
        let catchers = self.event_catchers.get(&event)?;
        catchers.iter().find_map(|render| {
            let record = self.renders.get(render)?;
            let intersection = record.item.contains(&px, self.settings.hit_tolerance_px)?;
            let state = self.states.get(&record.feature)?;
            Some(EventCatch {
                feature: state.feature.clone(),
                render: *render,
                intersection,
            })
        })
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn is_canvas_attached(&self) -> bool {
        self.canvas_container.is_some()
    }

    pub fn loading_count(&self) -> usize {
        self.loading.len()
    }

    pub fn node_of(&self, render: RenderId) -> Option<NodeId> {
        self.renders.get(&render).and_then(|r| r.node)
    }

    pub fn snapshot(&self) -> RendererSnapshot {
        let mut features: Vec<FeatureSnapshot> = self
            .states
            .iter()
            .map(|(id, state)| FeatureSnapshot {
                feature: *id,
                current: state
                    .current
                    .as_ref()
                    .map(|set| set.ids().collect())
                    .unwrap_or_default(),
                outdated: state.outdated.clone(),
                pending_removal: state.pending_removal.iter().map(|r| r.render).collect(),
            })
            .collect();
        features.sort_by_key(|f| f.feature);

        let mut loading: Vec<RenderId> = self.loading.keys().copied().collect();
        loading.sort();

        RendererSnapshot {
            index: self.index,
            z_index: self.z_index,
            loading,
            features,
            canvas_attached: self.is_canvas_attached(),
            canvas_commands: self.canvas.commands().len(),
        }
    }
}
