// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The [`BindingCache`] façade driving one bind episode per draw, dispatch or trace call.

use crate::allocator::SetAllocator;
use crate::config::BindingCacheConfig;
use crate::error::BindingError;
use crate::plan::{BindRequest, PlanCollector};
use crate::resolver::ScopeResolver;
use crate::writer::{BindingWriter, DynamicOffsetEntry, DynamicOffsetTable};
use quiver_core::{
    BindingStats, DescriptorDevice, DescriptorSetId, FrameIndex, LayoutSource, ReflectedLayouts,
    ResourcePayload, ScopePolicy, SetLayout, SetLayoutId,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Reflected layouts together with their device-side counterparts.
#[derive(Debug)]
struct ResolvedLayouts {
    reflected: ReflectedLayouts,
    device_layouts: BTreeMap<u32, SetLayoutId>,
}

/// What a set is currently bound to.
#[derive(Debug, Clone)]
struct CurrentSet {
    handle: DescriptorSetId,
    offsets: Vec<DynamicOffsetEntry>,
}

/// Caches binding-set instances by set, scope policy, frame and content.
///
/// A cache serves one pipeline program. Its layouts come from a
/// [`LayoutSource`] and are created on the device the first time an episode
/// opens, and again after every [`reset`](Self::reset).
///
/// ```ignore
/// cache.begin_episode()?;
/// cache.plan_named("camera", ResourcePayload::whole_buffer(camera), ScopePolicy::PerFrameShared)?;
/// cache.plan(BindRequest::at(1, 0, material).with_policy(ScopePolicy::GlobalPerCall))?;
/// cache.end_episode()?;
/// encoder.bind_sets(cache.current_set_handles(), cache.current_dynamic_offsets());
/// ```
#[derive(Debug)]
pub struct BindingCache {
    config: BindingCacheConfig,
    device: Arc<dyn DescriptorDevice>,
    source: Box<dyn LayoutSource>,
    layouts: Option<ResolvedLayouts>,
    collector: PlanCollector,
    allocator: SetAllocator,
    frame: FrameIndex,
    current: BTreeMap<u32, CurrentSet>,
    set_handles: Vec<DescriptorSetId>,
    bindings: Vec<(u32, DescriptorSetId)>,
    dynamic_offsets: Vec<u32>,
    stats: BindingStats,
}

impl BindingCache {
    /// Creates an empty cache. No device call happens until the first episode.
    pub fn new(
        device: Arc<dyn DescriptorDevice>,
        source: impl LayoutSource + 'static,
        mut config: BindingCacheConfig,
    ) -> Self {
        if config.frames_in_flight == 0 {
            log::warn!(
                "{}: frames_in_flight must be at least 1, using 1",
                config.label
            );
            config.frames_in_flight = 1;
        }
        let allocator = SetAllocator::new(
            config.frames_in_flight,
            config.per_call_capacity,
            config.array_comparison,
        );
        Self {
            config,
            device,
            source: Box::new(source),
            layouts: None,
            collector: PlanCollector::new(),
            allocator,
            frame: FrameIndex::default(),
            current: BTreeMap::new(),
            set_handles: Vec::new(),
            bindings: Vec::new(),
            dynamic_offsets: Vec::new(),
            stats: BindingStats::default(),
        }
    }

    /// Opens a bind episode.
    ///
    /// Resolves the layouts first if this is the first episode or the cache was reset.
    ///
    /// ## Errors
    /// * `BindingError::EpisodeAlreadyOpen` - If an episode is already open.
    /// * `BindingError::Layout` or `BindingError::Device` - If the layouts could not be resolved.
    pub fn begin_episode(&mut self) -> Result<(), BindingError> {
        if self.collector.is_open() {
            return Err(BindingError::EpisodeAlreadyOpen);
        }
        self.ensure_layouts()?;
        self.collector.begin()
    }

    /// Records one bind request. No device call happens until [`end_episode`](Self::end_episode).
    pub fn plan(&mut self, request: BindRequest) -> Result<(), BindingError> {
        self.collector.push(request)
    }

    /// Records a bind request addressed by its reflected name.
    ///
    /// ## Errors
    /// * `BindingError::EpisodeNotOpen` - If no episode is open.
    /// * `BindingError::UnknownName` - If the reflection table does not know `name`.
    pub fn plan_named(
        &mut self,
        name: &str,
        payload: ResourcePayload,
        policy: ScopePolicy,
    ) -> Result<(), BindingError> {
        self.plan_named_dynamic(name, payload, policy, Vec::new())
    }

    /// Like [`plan_named`](Self::plan_named), with per-element dynamic offsets.
    pub fn plan_named_dynamic(
        &mut self,
        name: &str,
        payload: ResourcePayload,
        policy: ScopePolicy,
        dynamic_offsets: impl Into<Vec<u32>>,
    ) -> Result<(), BindingError> {
        if !self.collector.is_open() {
            return Err(BindingError::EpisodeNotOpen);
        }
        let location = self
            .layouts
            .as_ref()
            .and_then(|layouts| layouts.reflected.locate(name))
            .ok_or_else(|| BindingError::UnknownName {
                name: name.to_owned(),
            })?;
        self.collector.push(
            BindRequest::new(location, payload)
                .with_policy(policy)
                .with_dynamic_offsets(dynamic_offsets),
        )
    }

    /// Closes the episode: resolves policies, selects instances, writes changed
    /// slots and publishes the ordered outputs.
    ///
    /// Every request is validated against its layout before the first device
    /// call, so a contract error leaves the device untouched. The outputs only
    /// change once every set resolved. The episode is closed even when an
    /// error is returned.
    ///
    /// ## Errors
    /// * `BindingError::EpisodeNotOpen` - If no episode is open.
    /// * Any contract error about the planned requests.
    /// * `BindingError::AllocationFailed` - If a set could not be allocated.
    pub fn end_episode(&mut self) -> Result<(), BindingError> {
        let requests = self.collector.finish()?;
        let plans = ScopeResolver::resolve(requests)?;

        let Self {
            config,
            device,
            layouts,
            allocator,
            frame,
            current,
            stats,
            ..
        } = self;
        let device: &dyn DescriptorDevice = &**device;
        // An open episode always has resolved layouts.
        let layouts = layouts.as_ref().ok_or(BindingError::EpisodeNotOpen)?;

        let mut validated: Vec<(&SetLayout, SetLayoutId)> = Vec::with_capacity(plans.len());
        for plan in &plans {
            let unknown = BindingError::UnknownSet { set: plan.set };
            let layout = layouts.reflected.set(plan.set).ok_or(unknown.clone())?;
            let layout_id = layouts
                .device_layouts
                .get(&plan.set)
                .copied()
                .ok_or(unknown)?;
            for request in &plan.requests {
                layout.validate_bind(
                    request.location.slot,
                    &request.payload,
                    &request.dynamic_offsets,
                )?;
            }
            validated.push((layout, layout_id));
        }

        let writer = BindingWriter::new(device, config.array_comparison);
        let staged: Result<Vec<(u32, CurrentSet)>, BindingError> = plans
            .iter()
            .zip(validated)
            .map(|(plan, (layout, layout_id))| {
                let id = allocator.resolve(device, plan, layout_id, *frame, stats)?;
                let instance = allocator
                    .instance_mut(id)
                    .ok_or(BindingError::StaleInstance { set: plan.set })?;
                writer.apply(instance, layout, &plan.requests, stats)?;

                let offsets = instance.dynamic_offsets();
                let published: usize = offsets.iter().map(|entry| entry.offsets.len()).sum();
                if published != layout.dynamic_offset_count() {
                    log::warn!(
                        "{}: set {} publishes {} dynamic offset(s), its layout consumes {}",
                        config.label,
                        plan.set,
                        published,
                        layout.dynamic_offset_count()
                    );
                }
                Ok((
                    plan.set,
                    CurrentSet {
                        handle: instance.handle,
                        offsets,
                    },
                ))
            })
            .collect();

        match staged {
            Ok(staged) => current.extend(staged),
            Err(err) => {
                // Sets evicted before the failure may no longer be bound.
                current.retain(|_, set| allocator.is_live(set.handle));
                self.rebuild_outputs();
                return Err(err);
            }
        }

        self.rebuild_outputs();
        self.stats.episodes += 1;
        log::trace!(
            "{}: episode closed at {} with {} set(s) and {} dynamic offset(s)",
            self.config.label,
            self.frame,
            self.set_handles.len(),
            self.dynamic_offsets.len()
        );
        Ok(())
    }

    /// The handle of every currently bound set, in ascending set order.
    pub fn current_set_handles(&self) -> &[DescriptorSetId] {
        &self.set_handles
    }

    /// The current bindings as `(set index, handle)` pairs, in ascending set order.
    pub fn current_bindings(&self) -> &[(u32, DescriptorSetId)] {
        &self.bindings
    }

    /// The flat dynamic-offset array, ordered by set and then slot.
    pub fn current_dynamic_offsets(&self) -> &[u32] {
        &self.dynamic_offsets
    }

    /// The device layouts of every reflected set, in ascending set order.
    ///
    /// Resolves the layouts if needed.
    pub fn layouts(&mut self) -> Result<Vec<SetLayoutId>, BindingError> {
        self.ensure_layouts()?;
        Ok(self
            .layouts
            .as_ref()
            .map(|layouts| layouts.device_layouts.values().copied().collect())
            .unwrap_or_default())
    }

    /// Makes `index` the current frame-in-flight index.
    ///
    /// The caller guarantees that GPU work previously submitted under `index`
    /// has completed. Sets evicted the last time `index` was current are freed.
    ///
    /// ## Errors
    /// * `BindingError::EpisodeAlreadyOpen` - If an episode is open.
    /// * `BindingError::FrameOutOfRange` - If `index` is not below `frames_in_flight`.
    pub fn advance_frame(&mut self, index: usize) -> Result<(), BindingError> {
        if self.collector.is_open() {
            return Err(BindingError::EpisodeAlreadyOpen);
        }
        if index >= self.config.frames_in_flight {
            return Err(BindingError::FrameOutOfRange {
                index,
                frames_in_flight: self.config.frames_in_flight,
            });
        }
        self.frame = FrameIndex(index);
        self.allocator
            .release_retired(self.frame, self.device.as_ref(), &mut self.stats);
        Ok(())
    }

    /// Drops every instance and layout. The next episode starts from scratch.
    ///
    /// An open episode is abandoned. Use this when the resources the cache
    /// refers to are recreated, e.g. after a swapchain resize.
    pub fn reset(&mut self) {
        log::debug!(
            "{}: resetting, {} live and {} retired instance(s)",
            self.config.label,
            self.allocator.live_instances(),
            self.allocator.retired_len()
        );
        self.teardown();
        self.stats.resets += 1;
    }

    /// Cumulative counters.
    pub fn stats(&self) -> &BindingStats {
        &self.stats
    }

    /// Number of instances currently cached across all buckets.
    pub fn live_instances(&self) -> usize {
        self.allocator.live_instances()
    }

    /// The current frame-in-flight index.
    pub fn frame_index(&self) -> FrameIndex {
        self.frame
    }

    /// Whether an episode is open.
    pub fn is_episode_open(&self) -> bool {
        self.collector.is_open()
    }

    /// The configuration the cache runs with.
    pub fn config(&self) -> &BindingCacheConfig {
        &self.config
    }

    /// The reflected layouts, once resolved.
    pub fn reflected(&self) -> Option<&ReflectedLayouts> {
        self.layouts.as_ref().map(|layouts| &layouts.reflected)
    }

    fn ensure_layouts(&mut self) -> Result<(), BindingError> {
        if self.layouts.is_some() {
            return Ok(());
        }

        let reflected = self.source.reflect()?;
        let mut device_layouts = BTreeMap::new();
        for layout in reflected.sets() {
            match self.device.create_set_layout(layout) {
                Ok(id) => {
                    device_layouts.insert(layout.set_index(), id);
                }
                Err(err) => {
                    destroy_layouts(self.device.as_ref(), device_layouts);
                    return Err(err.into());
                }
            }
        }

        log::info!(
            "{}: resolved {} set layout(s) and {} binding name(s)",
            self.config.label,
            device_layouts.len(),
            reflected.names().count()
        );
        self.stats.layout_resolutions += 1;
        self.layouts = Some(ResolvedLayouts {
            reflected,
            device_layouts,
        });
        Ok(())
    }

    fn rebuild_outputs(&mut self) {
        self.set_handles = self.current.values().map(|set| set.handle).collect();
        self.bindings = self
            .current
            .iter()
            .map(|(&index, set)| (index, set.handle))
            .collect();
        let mut table = DynamicOffsetTable::new();
        for set in self.current.values() {
            table.extend(set.offsets.iter().cloned());
        }
        self.dynamic_offsets = table.flatten();
    }

    fn teardown(&mut self) {
        self.collector.abandon();
        self.allocator.clear(self.device.as_ref(), &mut self.stats);
        if let Some(layouts) = self.layouts.take() {
            destroy_layouts(self.device.as_ref(), layouts.device_layouts);
        }
        self.current.clear();
        self.set_handles.clear();
        self.bindings.clear();
        self.dynamic_offsets.clear();
    }
}

impl Drop for BindingCache {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn destroy_layouts(device: &dyn DescriptorDevice, layouts: BTreeMap<u32, SetLayoutId>) {
    for (set, id) in layouts {
        if let Err(err) = device.destroy_set_layout(id) {
            log::warn!("Failed to destroy layout {id:?} of set {set}: {err}");
        }
    }
}
