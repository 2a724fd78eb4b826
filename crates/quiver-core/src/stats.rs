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

//! Counters describing how much work the binding cache did.

/// Cumulative counters for one binding cache.
///
/// The counters only ever increase. Use [`since`](BindingStats::since) to get
/// the work done between two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingStats {
    /// Episodes closed successfully.
    pub episodes: u64,
    /// Sets allocated on the device.
    pub sets_allocated: u64,
    /// Pool replenishments triggered by an exhausted allocation.
    pub pool_replenishments: u64,
    /// Slot writes issued to the device.
    pub descriptor_writes: u64,
    /// Slot writes skipped because the recorded content already matched.
    pub writes_skipped: u64,
    /// Batched `write_set` calls issued to the device.
    pub write_batches: u64,
    /// Times an existing instance served an episode.
    pub instances_reused: u64,
    /// Instances dropped from a bounded per-call bucket.
    pub instances_evicted: u64,
    /// Sets returned to the device.
    pub sets_freed: u64,
    /// Full invalidations.
    pub resets: u64,
    /// Times the layouts were (re)resolved from the layout source.
    pub layout_resolutions: u64,
}

impl BindingStats {
    /// The work done since `earlier` was captured.
    pub fn since(&self, earlier: &BindingStats) -> BindingStats {
        BindingStats {
            episodes: self.episodes - earlier.episodes,
            sets_allocated: self.sets_allocated - earlier.sets_allocated,
            pool_replenishments: self.pool_replenishments - earlier.pool_replenishments,
            descriptor_writes: self.descriptor_writes - earlier.descriptor_writes,
            writes_skipped: self.writes_skipped - earlier.writes_skipped,
            write_batches: self.write_batches - earlier.write_batches,
            instances_reused: self.instances_reused - earlier.instances_reused,
            instances_evicted: self.instances_evicted - earlier.instances_evicted,
            sets_freed: self.sets_freed - earlier.sets_freed,
            resets: self.resets - earlier.resets,
            layout_resolutions: self.layout_resolutions - earlier.layout_resolutions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_subtracts_every_counter() {
        let earlier = BindingStats {
            episodes: 2,
            descriptor_writes: 5,
            ..Default::default()
        };
        let later = BindingStats {
            episodes: 3,
            descriptor_writes: 9,
            sets_allocated: 1,
            ..Default::default()
        };
        let delta = later.since(&earlier);
        assert_eq!(delta.episodes, 1);
        assert_eq!(delta.descriptor_writes, 4);
        assert_eq!(delta.sets_allocated, 1);
        assert_eq!(delta.resets, 0);
    }
}
