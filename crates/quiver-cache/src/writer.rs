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

//! Minimal descriptor writes and the ordered dynamic-offset table.

use crate::error::BindingError;
use crate::instance::SetInstance;
use crate::plan::BindRequest;
use quiver_core::{
    ArrayComparison, BindingLocation, BindingStats, DescriptorDevice, DescriptorWrite, LayoutError,
    SetLayout,
};

/// Diffs requested content against an instance's records and writes the rest.
#[derive(Debug, Clone, Copy)]
pub struct BindingWriter<'a> {
    device: &'a dyn DescriptorDevice,
    comparison: ArrayComparison,
}

impl<'a> BindingWriter<'a> {
    /// Creates a writer issuing updates to `device`.
    pub fn new(device: &'a dyn DescriptorDevice, comparison: ArrayComparison) -> Self {
        Self { device, comparison }
    }

    /// Brings `instance` up to date with `requests` in at most one device call.
    ///
    /// Slots whose record already matches are skipped. Records and dynamic
    /// offsets are only updated once the device accepted the batch.
    ///
    /// ## Returns
    /// The number of slots written.
    /// ## Errors
    /// * `BindingError::Layout` - If a request names a slot missing from `layout`.
    /// * `BindingError::Device` - If the device rejected the batch.
    pub fn apply(
        &self,
        instance: &mut SetInstance,
        layout: &SetLayout,
        requests: &[BindRequest],
        stats: &mut BindingStats,
    ) -> Result<usize, BindingError> {
        let mut writes = Vec::with_capacity(requests.len());
        for request in requests {
            let slot = request.location.slot;
            if instance.holds(slot, &request.payload, self.comparison) {
                stats.writes_skipped += 1;
                continue;
            }
            let binding = layout.binding(slot).ok_or(LayoutError::UnknownSlot {
                set: layout.set_index(),
                slot,
            })?;
            writes.push(DescriptorWrite {
                slot,
                kind: binding.kind,
                payload: &request.payload,
            });
        }

        if !writes.is_empty() {
            self.device.write_set(instance.handle, &writes)?;
            for write in &writes {
                instance.records.insert(write.slot, write.payload.clone());
            }
            stats.descriptor_writes += writes.len() as u64;
            stats.write_batches += 1;
            log::trace!(
                "Wrote {} slot(s) of set {} into {:?}",
                writes.len(),
                instance.set,
                instance.handle
            );
        }

        // Offsets change per call even when the slot content is unchanged.
        for request in requests.iter().filter(|r| !r.dynamic_offsets.is_empty()) {
            instance
                .offsets
                .insert(request.location.slot, request.dynamic_offsets.clone());
        }
        Ok(writes.len())
    }
}

/// The dynamic offsets of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicOffsetEntry {
    /// The slot the offsets apply to.
    pub location: BindingLocation,
    /// One offset per array element.
    pub offsets: Vec<u32>,
}

impl DynamicOffsetEntry {
    /// Creates an entry.
    pub fn new(location: BindingLocation, offsets: Vec<u32>) -> Self {
        Self { location, offsets }
    }
}

/// Collects dynamic offsets and flattens them in (set, slot) order.
///
/// Submission consumes offsets in set-then-slot order no matter in which order
/// the slots were planned.
#[derive(Debug, Clone, Default)]
pub struct DynamicOffsetTable {
    entries: Vec<DynamicOffsetEntry>,
}

impl DynamicOffsetTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the offsets of one slot.
    pub fn push(&mut self, entry: DynamicOffsetEntry) {
        self.entries.push(entry);
    }

    /// Number of slots with offsets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no slot has offsets.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Concatenates every entry's offsets, sorted by (set, slot).
    pub fn flatten(mut self) -> Vec<u32> {
        self.entries.sort_by_key(|entry| entry.location);
        self.entries
            .into_iter()
            .flat_map(|entry| entry.offsets)
            .collect()
    }
}

impl Extend<DynamicOffsetEntry> for DynamicOffsetTable {
    fn extend<T: IntoIterator<Item = DynamicOffsetEntry>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_core::{
        BindingKind, BufferId, DescriptorSetId, DeviceError, SetLayoutBinding, SetLayoutId,
        ShaderStageFlags,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct WriteCounter {
        batches: AtomicUsize,
        slots: AtomicUsize,
        reject: bool,
    }

    impl DescriptorDevice for WriteCounter {
        fn create_set_layout(&self, _layout: &SetLayout) -> Result<SetLayoutId, DeviceError> {
            Ok(SetLayoutId(0))
        }

        fn destroy_set_layout(&self, _id: SetLayoutId) -> Result<(), DeviceError> {
            Ok(())
        }

        fn allocate_set(&self, _layout: SetLayoutId) -> Result<DescriptorSetId, DeviceError> {
            Ok(DescriptorSetId(0))
        }

        fn free_set(&self, _set: DescriptorSetId) -> Result<(), DeviceError> {
            Ok(())
        }

        fn replenish_pool(&self) -> Result<(), DeviceError> {
            Ok(())
        }

        fn write_set(
            &self,
            _set: DescriptorSetId,
            writes: &[DescriptorWrite<'_>],
        ) -> Result<(), DeviceError> {
            if self.reject {
                return Err(DeviceError::InvalidWrite("rejected".to_owned()));
            }
            self.batches.fetch_add(1, Ordering::Relaxed);
            self.slots.fetch_add(writes.len(), Ordering::Relaxed);
            Ok(())
        }
    }

    fn layout() -> SetLayout {
        SetLayout::new(
            0,
            [
                SetLayoutBinding::new(0, BindingKind::UniformBuffer, ShaderStageFlags::VERTEX),
                SetLayoutBinding::new(1, BindingKind::StorageBuffer, ShaderStageFlags::COMPUTE),
            ],
        )
        .unwrap()
    }

    fn requests(a: usize, b: usize) -> Vec<BindRequest> {
        vec![
            BindRequest::at(0, 0, quiver_core::ResourcePayload::whole_buffer(BufferId(a))),
            BindRequest::at(0, 1, quiver_core::ResourcePayload::whole_buffer(BufferId(b))),
        ]
    }

    #[test]
    fn only_changed_slots_are_written() {
        let device = WriteCounter::default();
        let writer = BindingWriter::new(&device, ArrayComparison::FirstElement);
        let mut instance = SetInstance::new(DescriptorSetId(7), 0, SetLayoutId(0));
        let mut stats = BindingStats::default();

        assert_eq!(writer.apply(&mut instance, &layout(), &requests(1, 2), &mut stats), Ok(2));
        assert_eq!(writer.apply(&mut instance, &layout(), &requests(1, 2), &mut stats), Ok(0));
        assert_eq!(writer.apply(&mut instance, &layout(), &requests(1, 3), &mut stats), Ok(1));

        assert_eq!(device.batches.load(Ordering::Relaxed), 2);
        assert_eq!(device.slots.load(Ordering::Relaxed), 3);
        assert_eq!(stats.descriptor_writes, 3);
        assert_eq!(stats.writes_skipped, 3);
        assert_eq!(stats.write_batches, 2);
    }

    #[test]
    fn rejected_batch_leaves_records_untouched() {
        let device = WriteCounter {
            reject: true,
            ..Default::default()
        };
        let writer = BindingWriter::new(&device, ArrayComparison::FirstElement);
        let mut instance = SetInstance::new(DescriptorSetId(7), 0, SetLayoutId(0));
        let mut stats = BindingStats::default();

        let result = writer.apply(&mut instance, &layout(), &requests(1, 2), &mut stats);
        assert!(matches!(result, Err(BindingError::Device(DeviceError::InvalidWrite(_)))));
        assert!(instance.records.is_empty());
        assert!(instance.offsets.is_empty());
        assert_eq!(stats.descriptor_writes, 0);
    }

    #[test]
    fn offsets_update_even_when_the_write_is_skipped() {
        let device = WriteCounter::default();
        let writer = BindingWriter::new(&device, ArrayComparison::FirstElement);
        let layout = SetLayout::new(
            0,
            [SetLayoutBinding::new(
                0,
                BindingKind::UniformBufferDynamic,
                ShaderStageFlags::VERTEX,
            )],
        )
        .unwrap();
        let mut instance = SetInstance::new(DescriptorSetId(7), 0, SetLayoutId(0));
        let mut stats = BindingStats::default();
        let camera = |offset: u32| {
            vec![
                BindRequest::at(0, 0, quiver_core::ResourcePayload::whole_buffer(BufferId(1)))
                    .with_dynamic_offsets([offset]),
            ]
        };

        assert_eq!(writer.apply(&mut instance, &layout, &camera(0), &mut stats), Ok(1));
        assert_eq!(writer.apply(&mut instance, &layout, &camera(256), &mut stats), Ok(0));
        assert_eq!(instance.offsets.get(&0), Some(&vec![256]));
        assert_eq!(device.batches.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn offsets_flatten_in_set_then_slot_order() {
        let mut table = DynamicOffsetTable::new();
        table.push(DynamicOffsetEntry::new(BindingLocation::new(1, 0), vec![10]));
        table.push(DynamicOffsetEntry::new(BindingLocation::new(0, 2), vec![20, 21]));
        table.extend([DynamicOffsetEntry::new(BindingLocation::new(0, 0), vec![30])]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.flatten(), vec![30, 20, 21, 10]);
    }
}
