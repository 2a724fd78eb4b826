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

//! Static, reflection-derived descriptions of binding sets.

use crate::binding::flags::ShaderStageFlags;
use crate::binding::payload::{ResourceKind, ResourcePayload};
use crate::error::LayoutError;
use std::collections::BTreeMap;
use std::fmt;

/// The type of resource a slot is declared to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BindingKind {
    /// A uniform buffer bound at a fixed offset.
    UniformBuffer,
    /// A storage buffer bound at a fixed offset.
    StorageBuffer,
    /// A uniform buffer whose offset is supplied at submission time.
    UniformBufferDynamic,
    /// A storage buffer whose offset is supplied at submission time.
    StorageBufferDynamic,
    /// An image view paired with a sampler.
    CombinedImageSampler,
    /// A sampled image without a sampler.
    SampledImage,
    /// A storage image.
    StorageImage,
    /// A read-only typed buffer view.
    UniformTexelBuffer,
    /// A read-write typed buffer view.
    StorageTexelBuffer,
    /// A ray-tracing top-level acceleration structure.
    AccelerationStructure,
}

impl BindingKind {
    /// The payload kind a slot of this type accepts.
    pub const fn resource_kind(self) -> ResourceKind {
        match self {
            BindingKind::UniformBuffer
            | BindingKind::StorageBuffer
            | BindingKind::UniformBufferDynamic
            | BindingKind::StorageBufferDynamic => ResourceKind::Buffer,
            BindingKind::CombinedImageSampler
            | BindingKind::SampledImage
            | BindingKind::StorageImage => ResourceKind::SampledImage,
            BindingKind::UniformTexelBuffer | BindingKind::StorageTexelBuffer => {
                ResourceKind::BufferView
            }
            BindingKind::AccelerationStructure => ResourceKind::AccelerationStructure,
        }
    }

    /// Whether binds to this slot carry per-call dynamic offsets.
    pub const fn has_dynamic_offset(self) -> bool {
        matches!(
            self,
            BindingKind::UniformBufferDynamic | BindingKind::StorageBufferDynamic
        )
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The address of a binding slot: a set index and a slot within it.
///
/// Ordering is by set first, then slot, which is the order submission APIs
/// expect dynamic offsets in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BindingLocation {
    /// The set index.
    pub set: u32,
    /// The slot (binding) index within the set.
    pub slot: u32,
}

impl BindingLocation {
    /// Creates a new location.
    pub const fn new(set: u32, slot: u32) -> Self {
        Self { set, slot }
    }
}

impl fmt::Display for BindingLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.set, self.slot)
    }
}

#[cfg(feature = "serde")]
fn default_count() -> u32 {
    1
}

/// Describes a single slot in a set layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetLayoutBinding {
    /// The slot index (e.g., `binding = 0` in GLSL).
    pub slot: u32,
    /// The type of resource bound at this slot.
    pub kind: BindingKind,
    /// The number of array elements. Always at least one.
    #[cfg_attr(feature = "serde", serde(default = "default_count"))]
    pub count: u32,
    /// Which shader stages can access this slot.
    pub stages: ShaderStageFlags,
}

impl SetLayoutBinding {
    /// A single-element slot.
    pub fn new(slot: u32, kind: BindingKind, stages: ShaderStageFlags) -> Self {
        Self {
            slot,
            kind,
            count: 1,
            stages,
        }
    }

    /// Turns this slot into an array of `count` elements.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// The immutable layout of one binding set, ordered by slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetLayout {
    set: u32,
    bindings: BTreeMap<u32, SetLayoutBinding>,
}

impl SetLayout {
    /// Builds the layout of set `set` from its slot descriptions.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] if two descriptions share a slot or a slot has
    /// a zero element count.
    pub fn new<I>(set: u32, bindings: I) -> Result<Self, LayoutError>
    where
        I: IntoIterator<Item = SetLayoutBinding>,
    {
        let mut map = BTreeMap::new();
        for binding in bindings {
            if binding.count == 0 {
                return Err(LayoutError::ZeroCount {
                    set,
                    slot: binding.slot,
                });
            }
            if map.insert(binding.slot, binding).is_some() {
                return Err(LayoutError::DuplicateSlot {
                    set,
                    slot: binding.slot,
                });
            }
        }
        Ok(Self { set, bindings: map })
    }

    /// The set index this layout describes.
    pub fn set_index(&self) -> u32 {
        self.set
    }

    /// The description of `slot`, if the layout declares it.
    pub fn binding(&self, slot: u32) -> Option<&SetLayoutBinding> {
        self.bindings.get(&slot)
    }

    /// All slot descriptions in ascending slot order.
    pub fn bindings(&self) -> impl Iterator<Item = &SetLayoutBinding> {
        self.bindings.values()
    }

    /// The number of declared slots.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if the layout declares no slots.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The number of dynamic offsets a fully bound instance of this layout consumes.
    pub fn dynamic_offset_count(&self) -> usize {
        self.bindings
            .values()
            .filter(|b| b.kind.has_dynamic_offset())
            .map(|b| b.count as usize)
            .sum()
    }

    /// Checks that `payload` and `dynamic_offsets` may be bound at `slot`.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] if the slot is undeclared, the payload kind
    /// does not fit the slot type, the array length is outside `1..=count`, or
    /// the number of dynamic offsets differs from what the slot type requires.
    pub fn validate_bind(
        &self,
        slot: u32,
        payload: &ResourcePayload,
        dynamic_offsets: &[u32],
    ) -> Result<&SetLayoutBinding, LayoutError> {
        let set = self.set;
        let binding = self
            .bindings
            .get(&slot)
            .ok_or(LayoutError::UnknownSlot { set, slot })?;

        if binding.kind.resource_kind() != payload.kind() {
            return Err(LayoutError::KindMismatch {
                set,
                slot,
                expected: binding.kind,
                found: payload.kind(),
            });
        }

        let len = payload.len();
        if len == 0 || len > binding.count as usize {
            return Err(LayoutError::ArrayLength {
                set,
                slot,
                capacity: binding.count,
                requested: len,
            });
        }

        let expected_offsets = if binding.kind.has_dynamic_offset() {
            len
        } else {
            0
        };
        if dynamic_offsets.len() != expected_offsets {
            return Err(LayoutError::DynamicOffsets {
                set,
                slot,
                expected: expected_offsets,
                found: dynamic_offsets.len(),
            });
        }

        Ok(binding)
    }
}
