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

//! Finds or creates the binding-set instance each resolved set plan needs.

use crate::error::BindingError;
use crate::instance::{InstanceArena, InstanceId, SetInstance};
use crate::resolver::SetPlan;
use quiver_core::{
    ArrayComparison, BindingStats, DescriptorDevice, DescriptorSetId, FrameIndex, ScopePolicy,
    SetLayoutId,
};
use std::collections::HashMap;
use std::num::NonZeroUsize;

/// Identifies the bucket of instances a set plan draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKey {
    /// The single program-lifetime instance of a set.
    GlobalShared {
        /// The set index.
        set: u32,
    },
    /// The single instance of a set for one frame-in-flight index.
    PerFrameShared {
        /// The set index.
        set: u32,
        /// The frame-in-flight index.
        frame: FrameIndex,
    },
    /// Content-addressed instances of a set, persisted across frames.
    GlobalPerCall {
        /// The set index.
        set: u32,
    },
    /// Content-addressed instances of a set for one frame-in-flight index.
    PerFramePerCall {
        /// The set index.
        set: u32,
        /// The frame-in-flight index.
        frame: FrameIndex,
    },
}

impl BucketKey {
    /// The bucket serving `set` under `policy` while `frame` is current.
    pub fn new(set: u32, policy: ScopePolicy, frame: FrameIndex) -> Self {
        match policy {
            ScopePolicy::GlobalShared => BucketKey::GlobalShared { set },
            ScopePolicy::PerFrameShared => BucketKey::PerFrameShared { set, frame },
            ScopePolicy::GlobalPerCall => BucketKey::GlobalPerCall { set },
            ScopePolicy::PerFramePerCall => BucketKey::PerFramePerCall { set, frame },
        }
    }

    /// The set index of the bucket.
    pub fn set(&self) -> u32 {
        match *self {
            BucketKey::GlobalShared { set }
            | BucketKey::PerFrameShared { set, .. }
            | BucketKey::GlobalPerCall { set }
            | BucketKey::PerFramePerCall { set, .. } => set,
        }
    }

    /// Whether the bucket selects instances by content.
    pub fn is_per_call(&self) -> bool {
        matches!(
            self,
            BucketKey::GlobalPerCall { .. } | BucketKey::PerFramePerCall { .. }
        )
    }
}

/// Owns every live instance and the buckets that index them.
///
/// Shared buckets hold at most one instance. Per-call buckets hold a list
/// searched first-fit, bounded by an optional capacity with least-recently-used
/// eviction. Evicted sets are retired under the frame index current at eviction
/// and only returned to the device once that index comes around again.
#[derive(Debug)]
pub struct SetAllocator {
    arena: InstanceArena,
    buckets: HashMap<BucketKey, Vec<InstanceId>>,
    retired: Vec<Vec<DescriptorSetId>>,
    per_call_capacity: Option<NonZeroUsize>,
    comparison: ArrayComparison,
    tick: u64,
}

impl SetAllocator {
    /// Creates an empty allocator for a ring of `frames_in_flight` frames.
    pub fn new(
        frames_in_flight: usize,
        per_call_capacity: Option<NonZeroUsize>,
        comparison: ArrayComparison,
    ) -> Self {
        Self {
            arena: InstanceArena::new(),
            buckets: HashMap::new(),
            retired: vec![Vec::new(); frames_in_flight.max(1)],
            per_call_capacity,
            comparison,
            tick: 0,
        }
    }

    /// Selects or allocates the instance that will serve `plan` this episode.
    ///
    /// ## Arguments
    /// * `device` - The device new sets are allocated from.
    /// * `plan` - The merged requests of one set.
    /// * `layout` - The device layout of the set.
    /// * `frame` - The current frame-in-flight index.
    /// * `stats` - Counters updated with allocations, reuses and evictions.
    /// ## Errors
    /// * `BindingError::AllocationFailed` - If the device could not provide a
    ///   set, even after one pool replenishment.
    pub fn resolve(
        &mut self,
        device: &dyn DescriptorDevice,
        plan: &SetPlan,
        layout: SetLayoutId,
        frame: FrameIndex,
        stats: &mut BindingStats,
    ) -> Result<InstanceId, BindingError> {
        self.tick += 1;
        let tick = self.tick;
        let key = BucketKey::new(plan.set, plan.policy, frame);
        let bucket = self.buckets.entry(key).or_default();

        let reusable = if key.is_per_call() {
            bucket.iter().copied().find(|&id| {
                self.arena
                    .get(id)
                    .is_some_and(|instance| instance.can_serve(&plan.requests, self.comparison))
            })
        } else {
            bucket.first().copied()
        };

        if let Some(id) = reusable {
            if let Some(instance) = self.arena.get_mut(id) {
                instance.last_used = tick;
                stats.instances_reused += 1;
                return Ok(id);
            }
        }

        // A failed allocation must leave the bucket intact.
        let handle = allocate_with_retry(device, layout, plan.set, stats)?;

        if key.is_per_call() {
            if let Some(capacity) = self.per_call_capacity {
                while bucket.len() >= capacity.get() {
                    let Some(position) = bucket
                        .iter()
                        .enumerate()
                        .min_by_key(|&(_, &id)| self.arena.get(id).map_or(0, |i| i.last_used))
                        .map(|(position, _)| position)
                    else {
                        break;
                    };
                    let evicted = bucket.remove(position);
                    if let Some(instance) = self.arena.remove(evicted) {
                        log::trace!(
                            "Evicting {:?} of set {} from {:?}, freeing at {}",
                            instance.handle,
                            instance.set,
                            key,
                            frame
                        );
                        let ring = frame.get() % self.retired.len();
                        self.retired[ring].push(instance.handle);
                        stats.instances_evicted += 1;
                    }
                }
            }
        }

        let mut instance = SetInstance::new(handle, plan.set, layout);
        instance.last_used = tick;
        let id = self.arena.insert(instance);
        bucket.push(id);
        stats.sets_allocated += 1;
        log::debug!(
            "Allocated {:?} for set {} ({}), bucket {:?} now holds {}",
            handle,
            plan.set,
            plan.policy,
            key,
            bucket.len()
        );
        Ok(id)
    }

    /// Frees the sets retired the last time `frame` was current.
    pub fn release_retired(
        &mut self,
        frame: FrameIndex,
        device: &dyn DescriptorDevice,
        stats: &mut BindingStats,
    ) {
        let index = frame.get() % self.retired.len();
        for handle in std::mem::take(&mut self.retired[index]) {
            free_set(device, handle, stats);
        }
    }

    /// Frees every retired and live set and forgets every bucket.
    pub fn clear(&mut self, device: &dyn DescriptorDevice, stats: &mut BindingStats) {
        for handle in self.retired.iter_mut().flat_map(std::mem::take) {
            free_set(device, handle, stats);
        }
        for instance in self.arena.drain() {
            free_set(device, instance.handle, stats);
        }
        self.buckets.clear();
    }

    /// The instance behind `id`.
    pub fn instance(&self, id: InstanceId) -> Option<&SetInstance> {
        self.arena.get(id)
    }

    /// Mutable access to the instance behind `id`.
    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut SetInstance> {
        self.arena.get_mut(id)
    }

    /// Number of live instances across all buckets.
    pub fn live_instances(&self) -> usize {
        self.arena.len()
    }

    /// Whether `handle` belongs to a live instance.
    pub fn is_live(&self, handle: DescriptorSetId) -> bool {
        self.arena.iter().any(|instance| instance.handle == handle)
    }

    #[cfg(test)]
    fn bucket_len(&self, key: &BucketKey) -> usize {
        self.buckets.get(key).map_or(0, Vec::len)
    }

    /// Number of sets waiting for their frame index to recur.
    pub fn retired_len(&self) -> usize {
        self.retired.iter().map(Vec::len).sum()
    }
}

fn allocate_with_retry(
    device: &dyn DescriptorDevice,
    layout: SetLayoutId,
    set: u32,
    stats: &mut BindingStats,
) -> Result<DescriptorSetId, BindingError> {
    match device.allocate_set(layout) {
        Ok(handle) => Ok(handle),
        Err(err) if err.is_pool_exhaustion() => {
            log::warn!("Descriptor pool exhausted while allocating set {set}, replenishing");
            device
                .replenish_pool()
                .map_err(|source| BindingError::AllocationFailed { set, source })?;
            stats.pool_replenishments += 1;
            device
                .allocate_set(layout)
                .map_err(|source| BindingError::AllocationFailed { set, source })
        }
        Err(source) => Err(BindingError::AllocationFailed { set, source }),
    }
}

fn free_set(device: &dyn DescriptorDevice, handle: DescriptorSetId, stats: &mut BindingStats) {
    match device.free_set(handle) {
        Ok(()) => stats.sets_freed += 1,
        Err(err) => log::warn!("Failed to free {handle:?}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::BindRequest;
    use quiver_core::{BufferId, DescriptorWrite, DeviceError, ResourcePayload, SetLayout};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingDevice {
        next_id: AtomicUsize,
        allocations: AtomicUsize,
        frees: AtomicUsize,
        replenishments: AtomicUsize,
        exhausted_allocations: AtomicUsize,
    }

    impl DescriptorDevice for CountingDevice {
        fn create_set_layout(&self, _layout: &SetLayout) -> Result<SetLayoutId, DeviceError> {
            Ok(SetLayoutId(self.next_id.fetch_add(1, Ordering::Relaxed)))
        }

        fn destroy_set_layout(&self, _id: SetLayoutId) -> Result<(), DeviceError> {
            Ok(())
        }

        fn allocate_set(&self, _layout: SetLayoutId) -> Result<DescriptorSetId, DeviceError> {
            let pending = self.exhausted_allocations.load(Ordering::Relaxed);
            if pending > 0 {
                self.exhausted_allocations.store(pending - 1, Ordering::Relaxed);
                return Err(DeviceError::PoolExhausted);
            }
            self.allocations.fetch_add(1, Ordering::Relaxed);
            Ok(DescriptorSetId(self.next_id.fetch_add(1, Ordering::Relaxed)))
        }

        fn free_set(&self, _set: DescriptorSetId) -> Result<(), DeviceError> {
            self.frees.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn replenish_pool(&self) -> Result<(), DeviceError> {
            self.replenishments.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn write_set(
            &self,
            _set: DescriptorSetId,
            _writes: &[DescriptorWrite<'_>],
        ) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    fn plan(policy: ScopePolicy, buffer: usize) -> SetPlan {
        SetPlan {
            set: 0,
            policy,
            requests: vec![BindRequest::at(0, 0, ResourcePayload::whole_buffer(BufferId(buffer)))],
        }
    }

    /// Marks the instance as holding the plan's content, as the writer would.
    fn record(allocator: &mut SetAllocator, id: InstanceId, plan: &SetPlan) {
        let instance = allocator.instance_mut(id).unwrap();
        for request in &plan.requests {
            instance.records.insert(request.location.slot, request.payload.clone());
        }
    }

    fn resolve_at(
        allocator: &mut SetAllocator,
        device: &CountingDevice,
        plan: &SetPlan,
        frame: usize,
        stats: &mut BindingStats,
    ) -> Result<InstanceId, BindingError> {
        allocator.resolve(device, plan, SetLayoutId(0), FrameIndex(frame), stats)
    }

    #[test]
    fn shared_buckets_hold_one_instance() {
        let device = CountingDevice::default();
        let mut stats = BindingStats::default();
        let mut allocator = SetAllocator::new(2, None, ArrayComparison::FirstElement);
        let global = |buffer| plan(ScopePolicy::GlobalShared, buffer);
        let per_frame = |buffer| plan(ScopePolicy::PerFrameShared, buffer);

        let a = resolve_at(&mut allocator, &device, &global(1), 0, &mut stats).unwrap();
        let b = resolve_at(&mut allocator, &device, &global(2), 1, &mut stats).unwrap();
        assert_eq!(a, b);

        let f0 = resolve_at(&mut allocator, &device, &per_frame(1), 0, &mut stats).unwrap();
        let f1 = resolve_at(&mut allocator, &device, &per_frame(1), 1, &mut stats).unwrap();
        let f0_again = resolve_at(&mut allocator, &device, &per_frame(3), 0, &mut stats).unwrap();
        assert_ne!(f0, f1);
        assert_eq!(f0, f0_again);
        assert_eq!(stats.sets_allocated, 3);
        assert_eq!(stats.instances_reused, 2);
        assert_eq!(device.allocations.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn per_call_bucket_reuses_matching_content() {
        let device = CountingDevice::default();
        let mut stats = BindingStats::default();
        let mut allocator = SetAllocator::new(2, None, ArrayComparison::FirstElement);
        let first = plan(ScopePolicy::GlobalPerCall, 1);
        let second = plan(ScopePolicy::GlobalPerCall, 2);

        let mut ids = Vec::new();
        for p in [&first, &second, &first, &second] {
            let id = resolve_at(&mut allocator, &device, p, 0, &mut stats).unwrap();
            record(&mut allocator, id, p);
            ids.push(id);
        }
        assert_eq!(ids[0], ids[2]);
        assert_eq!(ids[1], ids[3]);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(allocator.live_instances(), 2);
        assert_eq!(allocator.bucket_len(&BucketKey::GlobalPerCall { set: 0 }), 2);
    }

    #[test]
    fn full_bucket_evicts_least_recently_used_and_defers_the_free() {
        let device = CountingDevice::default();
        let mut stats = BindingStats::default();
        let capacity = NonZeroUsize::new(2);
        let mut allocator = SetAllocator::new(2, capacity, ArrayComparison::FirstElement);
        let plans: Vec<SetPlan> = (1..=3).map(|b| plan(ScopePolicy::GlobalPerCall, b)).collect();

        let a = resolve_at(&mut allocator, &device, &plans[0], 0, &mut stats).unwrap();
        record(&mut allocator, a, &plans[0]);
        let b = resolve_at(&mut allocator, &device, &plans[1], 0, &mut stats).unwrap();
        record(&mut allocator, b, &plans[1]);
        let b_handle = allocator.instance(b).unwrap().handle;
        // Touch `a` so that `b` becomes the eviction candidate.
        resolve_at(&mut allocator, &device, &plans[0], 0, &mut stats).unwrap();
        resolve_at(&mut allocator, &device, &plans[2], 0, &mut stats).unwrap();

        assert!(allocator.instance(a).is_some());
        assert!(allocator.instance(b).is_none());
        assert!(!allocator.is_live(b_handle));
        assert_eq!(stats.instances_evicted, 1);
        assert_eq!(allocator.retired_len(), 1);
        assert_eq!(device.frees.load(Ordering::Relaxed), 0);

        allocator.release_retired(FrameIndex(1), &device, &mut stats);
        assert_eq!(device.frees.load(Ordering::Relaxed), 0);
        allocator.release_retired(FrameIndex(0), &device, &mut stats);
        assert_eq!(device.frees.load(Ordering::Relaxed), 1);
        assert_eq!(stats.sets_freed, 1);
    }

    #[test]
    fn failed_allocation_keeps_the_full_bucket() {
        let device = CountingDevice::default();
        let mut stats = BindingStats::default();
        let capacity = NonZeroUsize::new(1);
        let mut allocator = SetAllocator::new(2, capacity, ArrayComparison::FirstElement);
        let first = plan(ScopePolicy::GlobalPerCall, 1);

        let id = resolve_at(&mut allocator, &device, &first, 0, &mut stats).unwrap();
        record(&mut allocator, id, &first);
        let handle = allocator.instance(id).unwrap().handle;

        device.exhausted_allocations.store(2, Ordering::Relaxed);
        let second = plan(ScopePolicy::GlobalPerCall, 2);
        let err = resolve_at(&mut allocator, &device, &second, 0, &mut stats).unwrap_err();
        assert!(err.is_resource_exhaustion());

        assert!(allocator.is_live(handle));
        assert_eq!(allocator.instance(id).map(|i| i.handle), Some(handle));
        assert_eq!(allocator.retired_len(), 0);
        assert_eq!(stats.instances_evicted, 0);
    }

    #[test]
    fn exhausted_pool_is_replenished_once() {
        let device = CountingDevice::default();
        device.exhausted_allocations.store(1, Ordering::Relaxed);
        let mut stats = BindingStats::default();
        let mut allocator = SetAllocator::new(1, None, ArrayComparison::FirstElement);

        let global = plan(ScopePolicy::GlobalShared, 1);
        resolve_at(&mut allocator, &device, &global, 0, &mut stats).unwrap();
        assert_eq!(stats.pool_replenishments, 1);
        assert_eq!(device.replenishments.load(Ordering::Relaxed), 1);

        device.exhausted_allocations.store(2, Ordering::Relaxed);
        let per_frame = plan(ScopePolicy::PerFrameShared, 1);
        let err = resolve_at(&mut allocator, &device, &per_frame, 0, &mut stats).unwrap_err();
        assert_eq!(
            err,
            BindingError::AllocationFailed {
                set: 0,
                source: DeviceError::PoolExhausted
            }
        );
        assert!(err.is_resource_exhaustion());
        assert_eq!(device.replenishments.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn clear_frees_live_and_retired_sets() {
        let device = CountingDevice::default();
        let mut stats = BindingStats::default();
        let capacity = NonZeroUsize::new(1);
        let mut allocator = SetAllocator::new(2, capacity, ArrayComparison::FirstElement);
        for buffer in 1..=3 {
            let p = plan(ScopePolicy::PerFramePerCall, buffer);
            let id = resolve_at(&mut allocator, &device, &p, 1, &mut stats).unwrap();
            record(&mut allocator, id, &p);
        }
        assert_eq!(allocator.live_instances(), 1);
        assert_eq!(allocator.retired_len(), 2);

        allocator.clear(&device, &mut stats);
        assert_eq!(allocator.live_instances(), 0);
        assert_eq!(allocator.retired_len(), 0);
        assert_eq!(device.frees.load(Ordering::Relaxed), 3);
    }
}
