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

//! Concrete binding-set instances and the arena that owns them.

use crate::plan::BindRequest;
use crate::writer::DynamicOffsetEntry;
use quiver_core::{ArrayComparison, BindingLocation, DescriptorSetId, ResourcePayload, SetLayoutId};
use std::collections::BTreeMap;

/// A generational index into an [`InstanceArena`].
///
/// Buckets hold ids, never references. An id whose slot has been reused by a
/// later insertion no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId {
    index: u32,
    generation: u32,
}

/// One allocated binding set and the content last written into each slot.
#[derive(Debug, Clone)]
pub struct SetInstance {
    /// The device handle of the set.
    pub handle: DescriptorSetId,
    /// The set index this instance serves.
    pub set: u32,
    /// The device layout the set was allocated from.
    pub layout: SetLayoutId,
    /// Last-written content per slot. Absent slots are unbound.
    pub records: BTreeMap<u32, ResourcePayload>,
    /// Dynamic offsets last planned per dynamic slot.
    pub offsets: BTreeMap<u32, Vec<u32>>,
    /// Tick of the last episode that selected this instance.
    pub last_used: u64,
}

impl SetInstance {
    /// A freshly allocated instance with every slot unbound.
    pub fn new(handle: DescriptorSetId, set: u32, layout: SetLayoutId) -> Self {
        Self {
            handle,
            set,
            layout,
            records: BTreeMap::new(),
            offsets: BTreeMap::new(),
            last_used: 0,
        }
    }

    /// Whether this instance can serve every request without overwriting a
    /// slot that holds different content.
    pub fn can_serve(&self, requests: &[BindRequest], comparison: ArrayComparison) -> bool {
        requests.iter().all(|request| {
            self.records
                .get(&request.location.slot)
                .is_none_or(|held| held.matches(&request.payload, comparison))
        })
    }

    /// Whether the slot's record already matches `payload`.
    pub fn holds(&self, slot: u32, payload: &ResourcePayload, comparison: ArrayComparison) -> bool {
        self.records
            .get(&slot)
            .is_some_and(|held| held.matches(payload, comparison))
    }

    /// The offsets of every dynamic slot planned so far, in slot order.
    pub fn dynamic_offsets(&self) -> Vec<DynamicOffsetEntry> {
        self.offsets
            .iter()
            .map(|(&slot, offsets)| {
                DynamicOffsetEntry::new(BindingLocation::new(self.set, slot), offsets.clone())
            })
            .collect()
    }
}

#[derive(Debug)]
struct Entry {
    generation: u32,
    value: Option<SetInstance>,
}

/// Slot storage for every live [`SetInstance`].
#[derive(Debug, Default)]
pub struct InstanceArena {
    entries: Vec<Entry>,
    free: Vec<u32>,
    len: usize,
}

impl InstanceArena {
    /// An empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an instance and returns its id.
    pub fn insert(&mut self, instance: SetInstance) -> InstanceId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.generation = entry.generation.wrapping_add(1);
            entry.value = Some(instance);
            return InstanceId {
                index,
                generation: entry.generation,
            };
        }
        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            value: Some(instance),
        });
        InstanceId {
            index,
            generation: 0,
        }
    }

    fn entry(&self, id: InstanceId) -> Option<&Entry> {
        self.entries
            .get(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
    }

    /// The instance behind `id`, if it is still live.
    pub fn get(&self, id: InstanceId) -> Option<&SetInstance> {
        self.entry(id).and_then(|entry| entry.value.as_ref())
    }

    /// Mutable access to the instance behind `id`, if it is still live.
    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut SetInstance> {
        self.entries
            .get_mut(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.value.as_mut())
    }

    /// Removes and returns the instance behind `id`.
    pub fn remove(&mut self, id: InstanceId) -> Option<SetInstance> {
        let entry = self
            .entries
            .get_mut(id.index as usize)
            .filter(|entry| entry.generation == id.generation)?;
        let value = entry.value.take()?;
        self.free.push(id.index);
        self.len -= 1;
        Some(value)
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the arena holds no instance.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over the live instances.
    pub fn iter(&self) -> impl Iterator<Item = &SetInstance> {
        self.entries.iter().filter_map(|entry| entry.value.as_ref())
    }

    /// Removes every instance, in insertion-slot order.
    pub fn drain(&mut self) -> Vec<SetInstance> {
        let drained: Vec<SetInstance> = self
            .entries
            .iter_mut()
            .filter_map(|entry| entry.value.take())
            .collect();
        // Generations survive so that ids issued before the drain stay dead.
        self.free = (0..self.entries.len() as u32).rev().collect();
        self.len = 0;
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_core::{BufferId, ImageViewId};

    fn instance(handle: usize) -> SetInstance {
        SetInstance::new(DescriptorSetId(handle), 0, SetLayoutId(1))
    }

    #[test]
    fn removed_ids_do_not_resolve_after_reuse() {
        let mut arena = InstanceArena::new();
        let first = arena.insert(instance(10));
        assert_eq!(arena.remove(first).map(|i| i.handle), Some(DescriptorSetId(10)));
        let second = arena.insert(instance(11));

        assert!(arena.get(first).is_none());
        assert_eq!(arena.get(second).map(|i| i.handle), Some(DescriptorSetId(11)));
        assert!(arena.remove(first).is_none());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn drain_empties_the_arena() {
        let mut arena = InstanceArena::new();
        let a = arena.insert(instance(1));
        arena.insert(instance(2));
        let drained = arena.drain();
        assert_eq!(drained.len(), 2);
        assert!(arena.is_empty());
        assert!(arena.get(a).is_none());
        let c = arena.insert(instance(3));
        assert_ne!(a, c);
        assert_eq!(arena.iter().map(|i| i.handle).collect::<Vec<_>>(), [DescriptorSetId(3)]);
    }

    #[test]
    fn dynamic_offsets_follow_slot_order() {
        let mut held = SetInstance::new(DescriptorSetId(4), 1, SetLayoutId(1));
        held.offsets.insert(2, vec![512]);
        held.offsets.insert(0, vec![0, 256]);

        let entries = held.dynamic_offsets();
        assert_eq!(
            entries,
            [
                DynamicOffsetEntry::new(BindingLocation::new(1, 0), vec![0, 256]),
                DynamicOffsetEntry::new(BindingLocation::new(1, 2), vec![512]),
            ]
        );
    }

    #[test]
    fn unbound_slots_accept_any_content() {
        let mut held = instance(1);
        held.records.insert(0, ResourcePayload::whole_buffer(BufferId(5)));

        let same = [BindRequest::at(0, 0, ResourcePayload::whole_buffer(BufferId(5)))];
        let other = [BindRequest::at(0, 0, ResourcePayload::whole_buffer(BufferId(6)))];
        let unbound = [BindRequest::at(
            0,
            1,
            ResourcePayload::sampled_image(ImageViewId(2), None),
        )];

        assert!(held.can_serve(&same, ArrayComparison::FirstElement));
        assert!(!held.can_serve(&other, ArrayComparison::FirstElement));
        assert!(held.can_serve(&unbound, ArrayComparison::FirstElement));
        assert!(held.holds(0, &same[0].payload, ArrayComparison::FirstElement));
        assert!(!held.holds(1, &unbound[0].payload, ArrayComparison::FirstElement));
    }
}
