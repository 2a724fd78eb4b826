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

//! Collection of bind requests for one episode.

use crate::error::BindingError;
use quiver_core::{BindingLocation, ResourcePayload, ScopePolicy};

/// One logical resource bind, pending until the episode closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
    /// The slot being bound.
    pub location: BindingLocation,
    /// The sharing rule requested for the slot's set.
    pub policy: ScopePolicy,
    /// The content of the slot.
    pub payload: ResourcePayload,
    /// One byte offset per payload element, for dynamic-offset slots only.
    pub dynamic_offsets: Vec<u32>,
}

impl BindRequest {
    /// A request with the default scope policy and no dynamic offsets.
    pub fn new(location: BindingLocation, payload: ResourcePayload) -> Self {
        Self {
            location,
            policy: ScopePolicy::default(),
            payload,
            dynamic_offsets: Vec::new(),
        }
    }

    /// Shorthand for [`BindRequest::new`] with an explicit set and slot.
    pub fn at(set: u32, slot: u32, payload: ResourcePayload) -> Self {
        Self::new(BindingLocation::new(set, slot), payload)
    }

    /// Sets the scope policy.
    pub fn with_policy(mut self, policy: ScopePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Attaches per-element dynamic offsets.
    pub fn with_dynamic_offsets(mut self, offsets: impl Into<Vec<u32>>) -> Self {
        self.dynamic_offsets = offsets.into();
        self
    }
}

/// Accumulates the requests of one bind episode.
///
/// Appending is constant time and never touches the device. Set and slot
/// existence are checked when the episode is resolved, not here.
#[derive(Debug, Default)]
pub struct PlanCollector {
    open: bool,
    requests: Vec<BindRequest>,
}

impl PlanCollector {
    /// Creates a closed collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an episode, clearing any pending state.
    pub fn begin(&mut self) -> Result<(), BindingError> {
        if self.open {
            return Err(BindingError::EpisodeAlreadyOpen);
        }
        self.requests.clear();
        self.open = true;
        Ok(())
    }

    /// Appends a request to the open episode.
    pub fn push(&mut self, request: BindRequest) -> Result<(), BindingError> {
        if !self.open {
            return Err(BindingError::EpisodeNotOpen);
        }
        self.requests.push(request);
        Ok(())
    }

    /// Closes the episode and hands over its requests.
    pub fn finish(&mut self) -> Result<Vec<BindRequest>, BindingError> {
        if !self.open {
            return Err(BindingError::EpisodeNotOpen);
        }
        self.open = false;
        Ok(std::mem::take(&mut self.requests))
    }

    /// Closes the episode and discards its requests.
    pub fn abandon(&mut self) {
        self.open = false;
        self.requests.clear();
    }

    /// Whether an episode is open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    #[cfg(test)]
    fn pending(&self) -> &[BindRequest] {
        &self.requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_core::BufferId;

    #[test]
    fn plan_outside_an_episode_is_rejected() {
        let mut collector = PlanCollector::new();
        let request = BindRequest::at(0, 0, ResourcePayload::whole_buffer(BufferId(1)));
        assert_eq!(
            collector.push(request.clone()),
            Err(BindingError::EpisodeNotOpen)
        );
        assert_eq!(collector.finish(), Err(BindingError::EpisodeNotOpen));

        collector.begin().unwrap();
        assert_eq!(collector.begin(), Err(BindingError::EpisodeAlreadyOpen));
        collector.push(request.clone()).unwrap();
        assert_eq!(collector.pending().len(), 1);
        assert_eq!(collector.finish().unwrap(), vec![request]);
        assert!(!collector.is_open());
    }

    #[test]
    fn abandon_discards_pending_requests() {
        let mut collector = PlanCollector::new();
        collector.begin().unwrap();
        collector
            .push(BindRequest::at(1, 2, ResourcePayload::whole_buffer(BufferId(3))))
            .unwrap();
        collector.abandon();
        assert!(!collector.is_open());
        collector.begin().unwrap();
        assert!(collector.pending().is_empty());
    }

    #[test]
    fn builder_sets_policy_and_offsets() {
        let request = BindRequest::at(2, 1, ResourcePayload::whole_buffer(BufferId(9)))
            .with_policy(ScopePolicy::PerFramePerCall)
            .with_dynamic_offsets([512]);
        assert_eq!(request.location, BindingLocation::new(2, 1));
        assert_eq!(request.policy, ScopePolicy::PerFramePerCall);
        assert_eq!(request.dynamic_offsets, vec![512]);
    }
}
