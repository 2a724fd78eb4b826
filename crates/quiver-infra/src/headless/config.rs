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

/// The default number of sets one descriptor pool can hold.
pub const DEFAULT_SETS_PER_POOL: usize = 64;

/// Sizing of the pools a [`HeadlessDevice`](super::HeadlessDevice) allocates from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessDeviceConfig {
    /// Number of sets that may be live in one pool.
    pub sets_per_pool: usize,
    /// Upper bound on the number of pools, `None` for no bound.
    ///
    /// Replenishing past this bound fails with
    /// [`DeviceError::PoolExhausted`](quiver_core::DeviceError::PoolExhausted).
    pub max_pools: Option<usize>,
}

impl Default for HeadlessDeviceConfig {
    fn default() -> Self {
        Self {
            sets_per_pool: DEFAULT_SETS_PER_POOL,
            max_pools: None,
        }
    }
}

impl HeadlessDeviceConfig {
    /// Sets the pool size.
    pub fn with_sets_per_pool(mut self, sets_per_pool: usize) -> Self {
        self.sets_per_pool = sets_per_pool;
        self
    }

    /// Bounds the number of pools.
    pub fn with_max_pools(mut self, max_pools: Option<usize>) -> Self {
        self.max_pools = max_pools;
        self
    }
}
