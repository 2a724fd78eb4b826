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

//! Errors surfaced by the binding cache.

use quiver_core::{BindingLocation, DeviceError, LayoutError};

/// An error raised while planning or resolving a bind episode.
///
/// Apart from pool exhaustion, which is retried once, every error is a
/// programming error in the caller. Renderer code should treat them as fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// A name-based bind used a name the reflection table does not know.
    #[error("no binding named '{name}' in the reflected layouts")]
    UnknownName {
        /// The unknown name.
        name: String,
    },
    /// A bind targets a set index with no layout.
    #[error("set {set} has no layout")]
    UnknownSet {
        /// The set index.
        set: u32,
    },
    /// Two requests in one episode target the same slot.
    #[error("slot {location} was planned more than once in one episode")]
    DuplicateSlot {
        /// The repeated location.
        location: BindingLocation,
    },
    /// A bind does not fit the layout of its slot.
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// `plan` or `end_episode` was called without an open episode.
    #[error("no bind episode is open")]
    EpisodeNotOpen,
    /// `begin_episode` or `advance_frame` was called while an episode is open.
    #[error("a bind episode is already open")]
    EpisodeAlreadyOpen,
    /// `advance_frame` received an index outside the configured ring.
    #[error("frame index {index} is outside 0..{frames_in_flight}")]
    FrameOutOfRange {
        /// The rejected index.
        index: usize,
        /// The configured number of frames in flight.
        frames_in_flight: usize,
    },
    /// A resolved instance is no longer in the arena.
    #[error("the instance resolved for set {set} is no longer cached")]
    StaleInstance {
        /// The set index.
        set: u32,
    },
    /// Allocating a set failed, after one replenish-and-retry for pool exhaustion.
    #[error("allocating an instance of set {set} failed: {source}")]
    AllocationFailed {
        /// The set index.
        set: u32,
        /// The device error of the last attempt.
        #[source]
        source: DeviceError,
    },
    /// Any other device failure.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl BindingError {
    /// Whether the error is a violation of the caller contract rather than a device failure.
    pub fn is_contract_violation(&self) -> bool {
        !matches!(
            self,
            BindingError::AllocationFailed { .. }
                | BindingError::Device(_)
                | BindingError::StaleInstance { .. }
        )
    }

    /// Whether the error is pool exhaustion that survived the retry.
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(
            self,
            BindingError::AllocationFailed { source, .. } if source.is_pool_exhaustion()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(BindingError::UnknownName {
            name: "albedo".into()
        }
        .is_contract_violation());
        assert!(BindingError::Layout(LayoutError::UnknownSlot { set: 0, slot: 9 })
            .is_contract_violation());

        let exhausted = BindingError::AllocationFailed {
            set: 2,
            source: DeviceError::PoolExhausted,
        };
        assert!(!exhausted.is_contract_violation());
        assert!(exhausted.is_resource_exhaustion());
        assert!(!BindingError::Device(DeviceError::InvalidHandle).is_resource_exhaustion());
    }

    #[test]
    fn messages_name_the_location() {
        let err = BindingError::DuplicateSlot {
            location: BindingLocation::new(1, 3),
        };
        assert_eq!(
            err.to_string(),
            "slot (1, 3) was planned more than once in one episode"
        );
    }
}
