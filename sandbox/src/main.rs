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

// Quiver Sandbox
// Drives a binding cache through a few simulated frames of a forward pass.

use anyhow::{Context, Result};
use quiver_cache::{BindingCache, BindingCacheConfig};
use quiver_core::{
    AccelerationStructureId, BindingStats, BufferId, BufferRegion, FrameIndex, ImageViewId,
    ResourcePayload, SampledImage, SamplerId, ScopePolicy,
};
use quiver_infra::{HeadlessDevice, HeadlessDeviceConfig, JsonLayoutSource};
use std::sync::Arc;

const FRAMES: usize = 8;
const OBJECTS_PER_FRAME: usize = 12;
const MATERIALS: usize = 3;
const RESIZE_AT_FRAME: usize = 5;
const OBJECT_STRIDE: u32 = 256;

/// A stand-in for the renderer's per-frame resources.
struct Scene {
    camera_ring: BufferId,
    lights: BufferId,
    objects: BufferId,
    materials: Vec<[ImageViewId; 2]>,
    sampler: SamplerId,
    tlas: AccelerationStructureId,
}

impl Scene {
    fn new(generation: usize) -> Self {
        // Resources are recreated on resize and get fresh handles.
        let base = generation * 100;
        Self {
            camera_ring: BufferId(base + 1),
            lights: BufferId(base + 2),
            objects: BufferId(base + 3),
            materials: (0..MATERIALS)
                .map(|m| [ImageViewId(base + 10 + 2 * m), ImageViewId(base + 11 + 2 * m)])
                .collect(),
            sampler: SamplerId(base + 50),
            tlas: AccelerationStructureId(base + 60),
        }
    }

    fn material_textures(&self, material: usize) -> ResourcePayload {
        ResourcePayload::SampledImages(
            self.materials[material]
                .iter()
                .map(|&view| SampledImage {
                    view,
                    sampler: Some(self.sampler),
                })
                .collect(),
        )
    }
}

fn draw_object(
    cache: &mut BindingCache,
    scene: &Scene,
    frame: FrameIndex,
    object: usize,
) -> Result<()> {
    let material = object % MATERIALS;
    cache.begin_episode()?;
    cache.plan_named_dynamic(
        "camera",
        ResourcePayload::buffer(BufferRegion::new(scene.camera_ring, 0, 256)),
        ScopePolicy::PerFrameShared,
        [frame.get() as u32 * OBJECT_STRIDE],
    )?;
    cache.plan_named(
        "lights",
        ResourcePayload::whole_buffer(scene.lights),
        ScopePolicy::GlobalShared,
    )?;
    cache.plan_named_dynamic(
        "object",
        ResourcePayload::buffer(BufferRegion::new(scene.objects, 0, 256)),
        ScopePolicy::GlobalPerCall,
        [object as u32 * OBJECT_STRIDE],
    )?;
    cache.plan_named(
        "material_textures",
        scene.material_textures(material),
        ScopePolicy::GlobalPerCall,
    )?;
    cache.plan_named(
        "scene_tlas",
        ResourcePayload::acceleration_structure(scene.tlas),
        ScopePolicy::GlobalShared,
    )?;
    cache.end_episode()?;

    log::trace!(
        "object {object}: sets {:?}, offsets {:?}",
        cache.current_set_handles(),
        cache.current_dynamic_offsets()
    );
    Ok(())
}

fn log_frame(frame: usize, delta: &BindingStats, live: usize) {
    log::info!(
        "frame {frame}: {} episode(s), {} set(s) allocated, {} slot write(s), {} skipped, {} live instance(s)",
        delta.episodes,
        delta.sets_allocated,
        delta.descriptor_writes,
        delta.writes_skipped,
        live
    );
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let reflection = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/forward.json");
    let device = HeadlessDevice::new(HeadlessDeviceConfig::default().with_sets_per_pool(16));
    let config = BindingCacheConfig::default().with_label("ForwardPass");
    let frames_in_flight = config.frames_in_flight;
    let mut cache = BindingCache::new(
        Arc::new(device.clone()),
        JsonLayoutSource::from_path(reflection),
        config,
    );

    let layouts = cache
        .layouts()
        .with_context(|| format!("loading reflection data from {reflection}"))?;
    log::info!("Forward pass uses {} set layout(s)", layouts.len());

    let mut generation = 0;
    let mut scene = Scene::new(generation);
    let mut slot = FrameIndex::default();
    for frame in 0..FRAMES {
        if frame == RESIZE_AT_FRAME {
            log::info!("Window resized, recreating resources");
            generation += 1;
            scene = Scene::new(generation);
            cache.reset();
        }

        cache.advance_frame(slot.get())?;
        let before = *cache.stats();
        for object in 0..OBJECTS_PER_FRAME {
            draw_object(&mut cache, &scene, slot, object)?;
        }
        log_frame(frame, &cache.stats().since(&before), cache.live_instances());
        slot = slot.next(frames_in_flight);
    }

    let stats = cache.stats();
    let counters = device.counters();
    log::info!(
        "Total: {} episode(s), {} set(s) allocated, {} slot write(s) in {} batch(es), {} reset(s)",
        stats.episodes,
        stats.sets_allocated,
        stats.descriptor_writes,
        stats.write_batches,
        stats.resets
    );
    log::info!(
        "Device: {} pool(s), {} live set(s), {} freed",
        counters.pools_created,
        device.live_sets(),
        counters.sets_freed
    );
    Ok(())
}
