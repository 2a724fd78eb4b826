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

//! Frame-in-flight bookkeeping shared by the cache and its callers.

/// The default number of frames that may be in flight on the GPU at once.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// The index of a frame-in-flight slot, in `0..frames_in_flight`.
///
/// The submission layer owns the fences that decide when a slot may be reused;
/// the binding cache only needs to know which slot is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FrameIndex(pub usize);

impl FrameIndex {
    /// Returns the raw slot index.
    pub const fn get(self) -> usize {
        self.0
    }

    /// Returns the slot that follows this one in a ring of `frames_in_flight` slots.
    pub const fn next(self, frames_in_flight: usize) -> Self {
        Self((self.0 + 1) % frames_in_flight)
    }
}

impl From<usize> for FrameIndex {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_wraps_around_the_ring() {
        let frame = FrameIndex(0);
        assert_eq!(frame.next(MAX_FRAMES_IN_FLIGHT), FrameIndex(1));
        assert_eq!(FrameIndex(1).next(2), FrameIndex(0));
        assert_eq!(FrameIndex(2).next(3), FrameIndex(0));
    }
}
