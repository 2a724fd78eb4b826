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

use crate::binding::layout::{BindingKind, SetLayout};
use crate::binding::payload::ResourcePayload;
use crate::error::DeviceError;
use crate::handle::{DescriptorSetId, SetLayoutId};
use std::fmt::Debug;

/// One slot update inside a batched [`DescriptorDevice::write_set`] call.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorWrite<'a> {
    /// The slot being written.
    pub slot: u32,
    /// The declared type of the slot.
    pub kind: BindingKind,
    /// The new content of the slot.
    pub payload: &'a ResourcePayload,
}

/// The subset of a GPU device the binding cache drives.
///
/// Every call is a synchronous driver call from the cache's point of view.
/// Implementations use interior mutability so that a device can be shared
/// between the cache and the rest of the renderer.
pub trait DescriptorDevice: Send + Sync + Debug + 'static {
    /// Creates a set layout on the device.
    /// ## Arguments
    /// * `layout` - The reflected layout to create.
    /// ## Returns
    /// A `Result` containing the ID of the created layout or an error if the creation fails.
    fn create_set_layout(&self, layout: &SetLayout) -> Result<SetLayoutId, DeviceError>;

    /// Destroys a set layout.
    /// ## Arguments
    /// * `id` - The ID of the layout to be destroyed.
    /// ## Errors
    /// * `DeviceError::InvalidHandle` - If the layout does not exist.
    fn destroy_set_layout(&self, id: SetLayoutId) -> Result<(), DeviceError>;

    /// Allocates a binding set from the current pool.
    /// ## Arguments
    /// * `layout` - The layout the new set conforms to.
    /// ## Returns
    /// A `Result` containing the ID of the new set.
    /// ## Errors
    /// * `DeviceError::PoolExhausted` - If the current pool is full. The caller may
    ///   call [`replenish_pool`](Self::replenish_pool) and retry once.
    fn allocate_set(&self, layout: SetLayoutId) -> Result<DescriptorSetId, DeviceError>;

    /// Returns a set to its pool.
    /// ## Arguments
    /// * `set` - The set to free. It must not be referenced by outstanding GPU work.
    fn free_set(&self, set: DescriptorSetId) -> Result<(), DeviceError>;

    /// Makes room for further allocations, typically by creating a fresh pool.
    /// ## Errors
    /// * `DeviceError` - If no further pool can be created.
    fn replenish_pool(&self) -> Result<(), DeviceError>;

    /// Applies a batch of slot updates to one set.
    /// ## Arguments
    /// * `set` - The set to update.
    /// * `writes` - The slot updates, each at most once per slot.
    /// ## Errors
    /// * `DeviceError` - If the set is unknown or a write does not fit its layout.
    fn write_set(
        &self,
        set: DescriptorSetId,
        writes: &[DescriptorWrite<'_>],
    ) -> Result<(), DeviceError>;
}
