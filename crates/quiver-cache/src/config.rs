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

//! Configuration for the binding cache.

use quiver_core::{ArrayComparison, MAX_FRAMES_IN_FLIGHT};
use std::num::NonZeroUsize;

/// The default number of instances kept per per-call bucket.
pub const DEFAULT_PER_CALL_CAPACITY: usize = 32;

/// Configuration for a [`BindingCache`](crate::BindingCache).
#[derive(Debug, Clone)]
pub struct BindingCacheConfig {
    /// Number of frame-in-flight slots. Per-frame buckets are keyed by `0..frames_in_flight`.
    pub frames_in_flight: usize,
    /// Maximum number of instances kept in one per-call bucket before the
    /// least recently used one is evicted. `None` keeps every instance.
    pub per_call_capacity: Option<NonZeroUsize>,
    /// How array payloads are compared when looking for a reusable instance.
    pub array_comparison: ArrayComparison,
    /// Debug label used in log lines.
    pub label: &'static str,
}

impl Default for BindingCacheConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: MAX_FRAMES_IN_FLIGHT,
            per_call_capacity: NonZeroUsize::new(DEFAULT_PER_CALL_CAPACITY),
            array_comparison: ArrayComparison::FirstElement,
            label: "BindingCache",
        }
    }
}

impl BindingCacheConfig {
    /// Sets the number of frame-in-flight slots.
    pub fn with_frames_in_flight(mut self, frames_in_flight: usize) -> Self {
        self.frames_in_flight = frames_in_flight;
        self
    }

    /// Bounds every per-call bucket to `capacity` instances; `None` removes the bound.
    pub fn with_per_call_capacity(mut self, capacity: Option<NonZeroUsize>) -> Self {
        self.per_call_capacity = capacity;
        self
    }

    /// Selects how array payloads are compared.
    pub fn with_array_comparison(mut self, comparison: ArrayComparison) -> Self {
        self.array_comparison = comparison;
        self
    }

    /// Sets the label used in log lines.
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }
}
