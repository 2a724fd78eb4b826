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

//! Merges the requests of one episode into one plan per touched set.

use crate::error::BindingError;
use crate::plan::BindRequest;
use quiver_core::ScopePolicy;
use std::collections::BTreeMap;

/// Every request touching one set in an episode, with the set's effective policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetPlan {
    /// The set index.
    pub set: u32,
    /// The policy obtained by merging every request's policy.
    pub policy: ScopePolicy,
    /// The requests for this set, in ascending slot order.
    pub requests: Vec<BindRequest>,
}

/// Groups requests by set and folds their policies through the scope lattice.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeResolver;

impl ScopeResolver {
    /// Builds one [`SetPlan`] per touched set, in ascending set order.
    ///
    /// The resolved policy does not depend on request order. Sets without any
    /// request do not appear in the result.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::DuplicateSlot`] if two requests target the same slot.
    pub fn resolve(requests: Vec<BindRequest>) -> Result<Vec<SetPlan>, BindingError> {
        let mut by_set: BTreeMap<u32, Vec<BindRequest>> = BTreeMap::new();
        for request in requests {
            by_set.entry(request.location.set).or_default().push(request);
        }

        let mut plans = Vec::with_capacity(by_set.len());
        for (set, mut requests) in by_set {
            requests.sort_by_key(|r| r.location.slot);
            if let Some(pair) = requests
                .windows(2)
                .find(|pair| pair[0].location.slot == pair[1].location.slot)
            {
                return Err(BindingError::DuplicateSlot {
                    location: pair[0].location,
                });
            }
            let policy = ScopePolicy::merge_all(requests.iter().map(|r| r.policy))
                .unwrap_or_default();
            plans.push(SetPlan {
                set,
                policy,
                requests,
            });
        }
        Ok(plans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_core::{BindingLocation, BufferId, ImageViewId, ResourcePayload};

    fn request(set: u32, slot: u32, policy: ScopePolicy) -> BindRequest {
        BindRequest::at(set, slot, ResourcePayload::whole_buffer(BufferId(slot as usize)))
            .with_policy(policy)
    }

    #[test]
    fn groups_by_set_and_orders_slots() {
        let plans = ScopeResolver::resolve(vec![
            request(1, 0, ScopePolicy::GlobalShared),
            request(0, 2, ScopePolicy::GlobalShared),
            request(0, 0, ScopePolicy::GlobalShared),
        ])
        .unwrap();

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].set, 0);
        let slots: Vec<u32> = plans[0].requests.iter().map(|r| r.location.slot).collect();
        assert_eq!(slots, vec![0, 2]);
        assert_eq!(plans[1].set, 1);
    }

    #[test]
    fn policy_is_merged_per_set() {
        let plans = ScopeResolver::resolve(vec![
            request(0, 0, ScopePolicy::PerFrameShared),
            request(0, 1, ScopePolicy::GlobalPerCall),
            request(1, 0, ScopePolicy::GlobalShared),
        ])
        .unwrap();
        assert_eq!(plans[0].policy, ScopePolicy::PerFramePerCall);
        assert_eq!(plans[1].policy, ScopePolicy::GlobalShared);
    }

    #[test]
    fn resolved_policy_is_independent_of_request_order() {
        for a in ScopePolicy::ALL {
            for b in ScopePolicy::ALL {
                for c in ScopePolicy::ALL {
                    let forward = vec![request(0, 0, a), request(0, 1, b), request(0, 2, c)];
                    let backward = vec![request(0, 2, c), request(0, 1, b), request(0, 0, a)];
                    let forward = ScopeResolver::resolve(forward).unwrap();
                    let backward = ScopeResolver::resolve(backward).unwrap();
                    assert_eq!(forward[0].policy, backward[0].policy);
                    assert_eq!(forward[0].policy, a.merge(b).merge(c));
                }
            }
        }
    }

    #[test]
    fn duplicate_slot_is_rejected() {
        let result = ScopeResolver::resolve(vec![
            request(2, 1, ScopePolicy::GlobalShared),
            BindRequest::at(2, 1, ResourcePayload::sampled_image(ImageViewId(4), None)),
        ]);
        assert_eq!(
            result,
            Err(BindingError::DuplicateSlot {
                location: BindingLocation::new(2, 1)
            })
        );
    }

    #[test]
    fn empty_episode_resolves_to_nothing() {
        assert!(ScopeResolver::resolve(Vec::new()).unwrap().is_empty());
    }
}
