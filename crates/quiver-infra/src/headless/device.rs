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

//! The pool-backed headless descriptor device.

use super::config::HeadlessDeviceConfig;
use quiver_core::{
    DescriptorDevice, DescriptorSetId, DescriptorWrite, DeviceError, ResourcePayload, SetLayout,
    SetLayoutId,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A snapshot of the work a [`HeadlessDevice`] has performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessCounters {
    /// Successful `allocate_set` calls.
    pub sets_allocated: usize,
    /// Successful `free_set` calls.
    pub sets_freed: usize,
    /// Slots written across every `write_set` call.
    pub slot_writes: usize,
    /// Successful `write_set` calls.
    pub write_calls: usize,
    /// Pools created, including the initial one.
    pub pools_created: usize,
    /// Set layouts created.
    pub layouts_created: usize,
    /// Set layouts destroyed.
    pub layouts_destroyed: usize,
}

#[derive(Debug)]
struct HeadlessSetEntry {
    layout: SetLayoutId,
    pool: usize,
    slots: BTreeMap<u32, ResourcePayload>,
}

#[derive(Debug)]
struct PoolState {
    /// Live set count per pool.
    live: Vec<usize>,
    current: usize,
}

#[derive(Debug)]
struct HeadlessDeviceInternal {
    config: HeadlessDeviceConfig,
    layouts: Mutex<HashMap<SetLayoutId, SetLayout>>,
    sets: Mutex<HashMap<DescriptorSetId, HeadlessSetEntry>>,
    pools: Mutex<PoolState>,

    next_layout_id: AtomicUsize,
    next_set_id: AtomicUsize,

    sets_allocated: AtomicUsize,
    sets_freed: AtomicUsize,
    slot_writes: AtomicUsize,
    write_calls: AtomicUsize,
    pools_created: AtomicUsize,
    layouts_created: AtomicUsize,
    layouts_destroyed: AtomicUsize,
}

/// A clonable, thread-safe descriptor device that keeps everything in memory.
///
/// Sets are carved out of fixed-size pools. Only the most recent pool serves
/// allocations, so a full pool reports [`DeviceError::PoolExhausted`] until
/// [`replenish_pool`](DescriptorDevice::replenish_pool) opens a new one.
/// Every write is checked against the set's layout.
#[derive(Clone, Debug)]
pub struct HeadlessDevice {
    internal: Arc<HeadlessDeviceInternal>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HeadlessDevice {
    /// Creates a device with one open pool.
    pub fn new(config: HeadlessDeviceConfig) -> Self {
        log::debug!(
            "HeadlessDevice: created with {} sets per pool, max pools {:?}",
            config.sets_per_pool,
            config.max_pools
        );
        Self {
            internal: Arc::new(HeadlessDeviceInternal {
                config,
                layouts: Mutex::new(HashMap::new()),
                sets: Mutex::new(HashMap::new()),
                pools: Mutex::new(PoolState {
                    live: vec![0],
                    current: 0,
                }),
                next_layout_id: AtomicUsize::new(0),
                next_set_id: AtomicUsize::new(0),
                sets_allocated: AtomicUsize::new(0),
                sets_freed: AtomicUsize::new(0),
                slot_writes: AtomicUsize::new(0),
                write_calls: AtomicUsize::new(0),
                pools_created: AtomicUsize::new(1),
                layouts_created: AtomicUsize::new(0),
                layouts_destroyed: AtomicUsize::new(0),
            }),
        }
    }

    // --- ID Generation Helpers ---

    fn generate_layout_id(&self) -> SetLayoutId {
        SetLayoutId(
            self.internal
                .next_layout_id
                .fetch_add(1, Ordering::Relaxed),
        )
    }

    fn generate_set_id(&self) -> DescriptorSetId {
        DescriptorSetId(self.internal.next_set_id.fetch_add(1, Ordering::Relaxed))
    }

    /// The configuration the device was created with.
    pub fn config(&self) -> &HeadlessDeviceConfig {
        &self.internal.config
    }

    /// A snapshot of the device counters.
    pub fn counters(&self) -> HeadlessCounters {
        let internal = &self.internal;
        HeadlessCounters {
            sets_allocated: internal.sets_allocated.load(Ordering::Relaxed),
            sets_freed: internal.sets_freed.load(Ordering::Relaxed),
            slot_writes: internal.slot_writes.load(Ordering::Relaxed),
            write_calls: internal.write_calls.load(Ordering::Relaxed),
            pools_created: internal.pools_created.load(Ordering::Relaxed),
            layouts_created: internal.layouts_created.load(Ordering::Relaxed),
            layouts_destroyed: internal.layouts_destroyed.load(Ordering::Relaxed),
        }
    }

    /// Number of sets currently allocated.
    pub fn live_sets(&self) -> usize {
        lock(&self.internal.sets).len()
    }

    /// Number of set layouts currently alive.
    pub fn live_layouts(&self) -> usize {
        lock(&self.internal.layouts).len()
    }

    /// The content last written into `slot` of `set`.
    pub fn bound_payload(&self, set: DescriptorSetId, slot: u32) -> Option<ResourcePayload> {
        lock(&self.internal.sets)
            .get(&set)
            .and_then(|entry| entry.slots.get(&slot).cloned())
    }

    /// The layout `set` was allocated from.
    pub fn set_layout_of(&self, set: DescriptorSetId) -> Option<SetLayoutId> {
        lock(&self.internal.sets).get(&set).map(|entry| entry.layout)
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new(HeadlessDeviceConfig::default())
    }
}

fn check_write(layout: &SetLayout, write: &DescriptorWrite<'_>) -> Result<(), DeviceError> {
    let binding = layout.binding(write.slot).ok_or_else(|| {
        DeviceError::InvalidWrite(format!(
            "slot {} is not declared by set {}",
            write.slot,
            layout.set_index()
        ))
    })?;
    if binding.kind != write.kind {
        return Err(DeviceError::InvalidWrite(format!(
            "slot {} is declared as {} but was written as {}",
            write.slot, binding.kind, write.kind
        )));
    }
    if write.payload.kind() != binding.kind.resource_kind() {
        return Err(DeviceError::InvalidWrite(format!(
            "slot {} of type {} cannot hold a {} payload",
            write.slot,
            binding.kind,
            write.payload.kind()
        )));
    }
    let len = write.payload.len();
    if len == 0 || len > binding.count as usize {
        return Err(DeviceError::InvalidWrite(format!(
            "slot {} holds {} element(s), {} given",
            write.slot, binding.count, len
        )));
    }
    Ok(())
}

impl DescriptorDevice for HeadlessDevice {
    fn create_set_layout(&self, layout: &SetLayout) -> Result<SetLayoutId, DeviceError> {
        let id = self.generate_layout_id();
        lock(&self.internal.layouts).insert(id, layout.clone());
        self.internal.layouts_created.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "HeadlessDevice: Created layout {id:?} for set {} with {} slot(s)",
            layout.set_index(),
            layout.len()
        );
        Ok(id)
    }

    fn destroy_set_layout(&self, id: SetLayoutId) -> Result<(), DeviceError> {
        if lock(&self.internal.layouts).remove(&id).is_none() {
            return Err(DeviceError::InvalidHandle);
        }
        self.internal
            .layouts_destroyed
            .fetch_add(1, Ordering::Relaxed);
        log::debug!("HeadlessDevice: Destroyed layout {id:?}");
        Ok(())
    }

    fn allocate_set(&self, layout: SetLayoutId) -> Result<DescriptorSetId, DeviceError> {
        if !lock(&self.internal.layouts).contains_key(&layout) {
            return Err(DeviceError::InvalidHandle);
        }

        let pool = {
            let mut pools = lock(&self.internal.pools);
            let current = pools.current;
            if pools.live[current] >= self.internal.config.sets_per_pool {
                return Err(DeviceError::PoolExhausted);
            }
            pools.live[current] += 1;
            current
        };

        let id = self.generate_set_id();
        lock(&self.internal.sets).insert(
            id,
            HeadlessSetEntry {
                layout,
                pool,
                slots: BTreeMap::new(),
            },
        );
        self.internal.sets_allocated.fetch_add(1, Ordering::Relaxed);
        log::trace!("HeadlessDevice: Allocated {id:?} from pool {pool}");
        Ok(id)
    }

    fn free_set(&self, set: DescriptorSetId) -> Result<(), DeviceError> {
        let entry = lock(&self.internal.sets)
            .remove(&set)
            .ok_or(DeviceError::InvalidHandle)?;
        let mut pools = lock(&self.internal.pools);
        if let Some(live) = pools.live.get_mut(entry.pool) {
            *live = live.saturating_sub(1);
        }
        self.internal.sets_freed.fetch_add(1, Ordering::Relaxed);
        log::trace!("HeadlessDevice: Freed {set:?} back to pool {}", entry.pool);
        Ok(())
    }

    fn replenish_pool(&self) -> Result<(), DeviceError> {
        let mut pools = lock(&self.internal.pools);
        if let Some(max) = self.internal.config.max_pools {
            if pools.live.len() >= max {
                log::warn!("HeadlessDevice: Pool limit of {max} reached");
                return Err(DeviceError::PoolExhausted);
            }
        }
        pools.live.push(0);
        pools.current = pools.live.len() - 1;
        self.internal.pools_created.fetch_add(1, Ordering::Relaxed);
        log::debug!("HeadlessDevice: Opened pool {}", pools.current);
        Ok(())
    }

    fn write_set(
        &self,
        set: DescriptorSetId,
        writes: &[DescriptorWrite<'_>],
    ) -> Result<(), DeviceError> {
        let mut sets = lock(&self.internal.sets);
        let entry = sets.get_mut(&set).ok_or(DeviceError::InvalidHandle)?;
        {
            let layouts = lock(&self.internal.layouts);
            let layout = layouts
                .get(&entry.layout)
                .ok_or(DeviceError::InvalidHandle)?;
            let mut seen = HashSet::with_capacity(writes.len());
            for write in writes {
                if !seen.insert(write.slot) {
                    return Err(DeviceError::InvalidWrite(format!(
                        "slot {} appears twice in one batch",
                        write.slot
                    )));
                }
                check_write(layout, write)?;
            }
        }

        for write in writes {
            entry.slots.insert(write.slot, write.payload.clone());
        }
        self.internal.write_calls.fetch_add(1, Ordering::Relaxed);
        self.internal
            .slot_writes
            .fetch_add(writes.len(), Ordering::Relaxed);
        Ok(())
    }
}
