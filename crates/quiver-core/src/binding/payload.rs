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

//! The resource payloads that can occupy a binding slot.
//!
//! A [`ResourcePayload`] is a tagged union over the four resource kinds the
//! cache knows how to bind. Every variant holds an array so descriptor arrays
//! and single bindings share one representation; a single binding is simply an
//! array of length one.
//!
//! For caching purposes two payloads are compared by their *primary handles*
//! only (the buffer, image view, buffer view or acceleration structure), never
//! by ranges or samplers. How much of an array takes part in that comparison is
//! an explicit [`ArrayComparison`] policy.

use crate::handle::{AccelerationStructureId, BufferId, BufferViewId, ImageViewId, SamplerId};
use std::fmt;
use std::num::NonZeroU64;

/// A region of a buffer bound to a uniform or storage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferRegion {
    /// The buffer to bind.
    pub buffer: BufferId,
    /// Offset into the buffer in bytes.
    pub offset: u64,
    /// Size of the binding, or `None` to bind from `offset` to the end of the buffer.
    pub size: Option<NonZeroU64>,
}

impl BufferRegion {
    /// A region covering the whole buffer.
    pub fn whole(buffer: BufferId) -> Self {
        Self {
            buffer,
            offset: 0,
            size: None,
        }
    }

    /// A region of `size` bytes starting at `offset`. A zero size binds to the end of the buffer.
    pub fn new(buffer: BufferId, offset: u64, size: u64) -> Self {
        Self {
            buffer,
            offset,
            size: NonZeroU64::new(size),
        }
    }
}

/// An image view, optionally paired with the sampler used to read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampledImage {
    /// The image view to bind.
    pub view: ImageViewId,
    /// The sampler for combined image-sampler slots.
    pub sampler: Option<SamplerId>,
}

/// The four kinds of resource a payload can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceKind {
    /// One or more buffer regions.
    Buffer,
    /// One or more image views, with optional samplers.
    SampledImage,
    /// One or more typed buffer views.
    BufferView,
    /// One or more top-level acceleration structures.
    AccelerationStructure,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Buffer => "buffer region",
            ResourceKind::SampledImage => "sampled image",
            ResourceKind::BufferView => "buffer view",
            ResourceKind::AccelerationStructure => "acceleration structure",
        };
        f.write_str(name)
    }
}

/// The handle used when comparing payloads for cache reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryHandle {
    /// A buffer handle.
    Buffer(BufferId),
    /// An image view handle.
    ImageView(ImageViewId),
    /// A buffer view handle.
    BufferView(BufferViewId),
    /// An acceleration structure handle.
    AccelerationStructure(AccelerationStructureId),
}

/// How array payloads are compared when looking for a reusable set instance.
///
/// `FirstElement` only compares element zero. An array whose tail changed
/// while its head stayed the same is then considered unchanged and is *not*
/// rewritten. This is cheap but only correct when callers never vary the tail
/// of an array independently of its head. `AllElements` compares every
/// element and the array length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArrayComparison {
    /// Compare only the first element of each array.
    #[default]
    FirstElement,
    /// Compare the length and every element of each array.
    AllElements,
}

/// The content of one binding slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourcePayload {
    /// Buffer regions for uniform or storage slots.
    Buffers(Vec<BufferRegion>),
    /// Image views for sampled, storage or combined image-sampler slots.
    SampledImages(Vec<SampledImage>),
    /// Typed buffer views for texel-buffer slots.
    BufferViews(Vec<BufferViewId>),
    /// Top-level acceleration structures for ray-tracing slots.
    AccelerationStructures(Vec<AccelerationStructureId>),
}

impl ResourcePayload {
    /// A single buffer region.
    pub fn buffer(region: BufferRegion) -> Self {
        Self::Buffers(vec![region])
    }

    /// A single buffer bound in its entirety.
    pub fn whole_buffer(buffer: BufferId) -> Self {
        Self::buffer(BufferRegion::whole(buffer))
    }

    /// A single image view with an optional sampler.
    pub fn sampled_image(view: ImageViewId, sampler: Option<SamplerId>) -> Self {
        Self::SampledImages(vec![SampledImage { view, sampler }])
    }

    /// A single typed buffer view.
    pub fn buffer_view(view: BufferViewId) -> Self {
        Self::BufferViews(vec![view])
    }

    /// A single top-level acceleration structure.
    pub fn acceleration_structure(tlas: AccelerationStructureId) -> Self {
        Self::AccelerationStructures(vec![tlas])
    }

    /// The kind of resource this payload carries.
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourcePayload::Buffers(_) => ResourceKind::Buffer,
            ResourcePayload::SampledImages(_) => ResourceKind::SampledImage,
            ResourcePayload::BufferViews(_) => ResourceKind::BufferView,
            ResourcePayload::AccelerationStructures(_) => ResourceKind::AccelerationStructure,
        }
    }

    /// The number of array elements.
    pub fn len(&self) -> usize {
        match self {
            ResourcePayload::Buffers(v) => v.len(),
            ResourcePayload::SampledImages(v) => v.len(),
            ResourcePayload::BufferViews(v) => v.len(),
            ResourcePayload::AccelerationStructures(v) => v.len(),
        }
    }

    /// Returns `true` if the payload carries no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The primary handle of the element at `index`.
    pub fn handle_at(&self, index: usize) -> Option<PrimaryHandle> {
        match self {
            ResourcePayload::Buffers(v) => v.get(index).map(|r| PrimaryHandle::Buffer(r.buffer)),
            ResourcePayload::SampledImages(v) => {
                v.get(index).map(|i| PrimaryHandle::ImageView(i.view))
            }
            ResourcePayload::BufferViews(v) => v.get(index).copied().map(PrimaryHandle::BufferView),
            ResourcePayload::AccelerationStructures(v) => v
                .get(index)
                .copied()
                .map(PrimaryHandle::AccelerationStructure),
        }
    }

    /// The primary handle of the first element.
    pub fn primary_handle(&self) -> Option<PrimaryHandle> {
        self.handle_at(0)
    }

    /// Iterates over the primary handles of every element.
    pub fn handles(&self) -> impl Iterator<Item = PrimaryHandle> + '_ {
        (0..self.len()).filter_map(move |index| self.handle_at(index))
    }

    /// Returns `true` if a slot holding `self` can serve a request for `other`
    /// without being rewritten.
    pub fn matches(&self, other: &ResourcePayload, comparison: ArrayComparison) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        match comparison {
            ArrayComparison::FirstElement => self.primary_handle() == other.primary_handle(),
            ArrayComparison::AllElements => {
                self.len() == other.len() && self.handles().eq(other.handles())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_ranges_do_not_take_part_in_matching() {
        let a = ResourcePayload::buffer(BufferRegion::new(BufferId(7), 0, 256));
        let b = ResourcePayload::buffer(BufferRegion::new(BufferId(7), 512, 64));
        let c = ResourcePayload::buffer(BufferRegion::new(BufferId(8), 0, 256));

        assert!(a.matches(&b, ArrayComparison::FirstElement));
        assert!(a.matches(&b, ArrayComparison::AllElements));
        assert!(!a.matches(&c, ArrayComparison::FirstElement));
    }

    #[test]
    fn sampler_does_not_take_part_in_matching() {
        let a = ResourcePayload::sampled_image(ImageViewId(3), Some(SamplerId(1)));
        let b = ResourcePayload::sampled_image(ImageViewId(3), Some(SamplerId(2)));
        assert!(a.matches(&b, ArrayComparison::AllElements));
    }

    #[test]
    fn first_element_comparison_ignores_array_tail() {
        let a = ResourcePayload::BufferViews(vec![BufferViewId(1), BufferViewId(2)]);
        let b = ResourcePayload::BufferViews(vec![BufferViewId(1), BufferViewId(9)]);
        let c = ResourcePayload::BufferViews(vec![BufferViewId(1)]);

        assert!(a.matches(&b, ArrayComparison::FirstElement));
        assert!(a.matches(&c, ArrayComparison::FirstElement));
        assert!(!a.matches(&b, ArrayComparison::AllElements));
        assert!(!a.matches(&c, ArrayComparison::AllElements));
    }

    #[test]
    fn different_kinds_never_match() {
        let buffer = ResourcePayload::whole_buffer(BufferId(1));
        let view = ResourcePayload::buffer_view(BufferViewId(1));
        assert!(!buffer.matches(&view, ArrayComparison::FirstElement));
        assert_eq!(buffer.kind(), ResourceKind::Buffer);
        assert_eq!(
            ResourcePayload::acceleration_structure(AccelerationStructureId(4)).primary_handle(),
            Some(PrimaryHandle::AccelerationStructure(AccelerationStructureId(4)))
        );
    }
}
