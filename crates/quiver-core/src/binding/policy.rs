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

//! Scope policies and the lattice used to merge them.
//!
//! A scope policy states how widely a binding set may be shared: across the
//! whole program or per call, and across frames-in-flight or per frame. When
//! several requests in one episode touch the same set with different policies,
//! they are folded through [`ScopePolicy::merge`], which always keeps the more
//! restrictive side.

use std::fmt;

/// The sharing and lifetime rule governing the instances of a binding set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScopePolicy {
    /// One instance for the program lifetime, shared by every call and frame.
    #[default]
    GlobalShared,
    /// One instance per frame-in-flight index, shared by every call in that frame.
    PerFrameShared,
    /// One instance per distinct content, persisted across frames.
    GlobalPerCall,
    /// One instance per distinct content, scoped to the current frame index.
    PerFramePerCall,
}

use ScopePolicy::{GlobalPerCall, GlobalShared, PerFramePerCall, PerFrameShared};

/// `MERGE_TABLE[current][incoming]`, indexed by [`ScopePolicy::index`].
const MERGE_TABLE: [[ScopePolicy; 4]; 4] = [
    [GlobalShared, PerFrameShared, GlobalPerCall, PerFramePerCall],
    [PerFrameShared, PerFrameShared, PerFramePerCall, PerFramePerCall],
    [GlobalPerCall, PerFramePerCall, GlobalPerCall, PerFramePerCall],
    [PerFramePerCall, PerFramePerCall, PerFramePerCall, PerFramePerCall],
];

impl ScopePolicy {
    /// Every policy, in table order.
    pub const ALL: [ScopePolicy; 4] = [
        GlobalShared,
        PerFrameShared,
        GlobalPerCall,
        PerFramePerCall,
    ];

    /// The row/column of this policy in the merge table.
    pub const fn index(self) -> usize {
        match self {
            GlobalShared => 0,
            PerFrameShared => 1,
            GlobalPerCall => 2,
            PerFramePerCall => 3,
        }
    }

    /// Joins two policies. Per-call beats shared, per-frame beats global.
    pub const fn merge(self, other: ScopePolicy) -> ScopePolicy {
        MERGE_TABLE[self.index()][other.index()]
    }

    /// Folds a sequence of policies. Returns `None` for an empty sequence.
    pub fn merge_all<I>(policies: I) -> Option<ScopePolicy>
    where
        I: IntoIterator<Item = ScopePolicy>,
    {
        policies.into_iter().reduce(ScopePolicy::merge)
    }

    /// Whether instances are keyed by the frame-in-flight index.
    pub const fn is_per_frame(self) -> bool {
        matches!(self, PerFrameShared | PerFramePerCall)
    }

    /// Whether instances are selected by content rather than shared.
    pub const fn is_per_call(self) -> bool {
        matches!(self, GlobalPerCall | PerFramePerCall)
    }
}

impl fmt::Display for ScopePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GlobalShared => "GLOBAL_SHARED",
            PerFrameShared => "PER_FRAME_SHARED",
            GlobalPerCall => "GLOBAL_PER_CALL",
            PerFramePerCall => "PER_FRAME_PER_CALL",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_matches_reference_table() {
        let expected = [
            (GlobalShared, GlobalShared, GlobalShared),
            (GlobalShared, PerFrameShared, PerFrameShared),
            (GlobalShared, GlobalPerCall, GlobalPerCall),
            (GlobalShared, PerFramePerCall, PerFramePerCall),
            (PerFrameShared, GlobalShared, PerFrameShared),
            (PerFrameShared, PerFrameShared, PerFrameShared),
            (PerFrameShared, GlobalPerCall, PerFramePerCall),
            (PerFrameShared, PerFramePerCall, PerFramePerCall),
            (GlobalPerCall, GlobalShared, GlobalPerCall),
            (GlobalPerCall, PerFrameShared, PerFramePerCall),
            (GlobalPerCall, GlobalPerCall, GlobalPerCall),
            (GlobalPerCall, PerFramePerCall, PerFramePerCall),
            (PerFramePerCall, GlobalShared, PerFramePerCall),
            (PerFramePerCall, PerFrameShared, PerFramePerCall),
            (PerFramePerCall, GlobalPerCall, PerFramePerCall),
            (PerFramePerCall, PerFramePerCall, PerFramePerCall),
        ];
        for (current, incoming, merged) in expected {
            assert_eq!(current.merge(incoming), merged, "{current} + {incoming}");
        }
    }

    #[test]
    fn merge_is_commutative() {
        for a in ScopePolicy::ALL {
            for b in ScopePolicy::ALL {
                assert_eq!(a.merge(b), b.merge(a), "{a} + {b}");
            }
        }
    }

    #[test]
    fn merge_is_associative() {
        for a in ScopePolicy::ALL {
            for b in ScopePolicy::ALL {
                for c in ScopePolicy::ALL {
                    assert_eq!(a.merge(b).merge(c), a.merge(b.merge(c)), "{a} + {b} + {c}");
                }
            }
        }
    }

    #[test]
    fn merge_order_never_changes_the_fold() {
        for a in ScopePolicy::ALL {
            for b in ScopePolicy::ALL {
                for c in ScopePolicy::ALL {
                    let orders = [[a, b, c], [a, c, b], [b, a, c], [b, c, a], [c, a, b], [c, b, a]];
                    let first = ScopePolicy::merge_all(orders[0]);
                    for order in orders {
                        assert_eq!(ScopePolicy::merge_all(order), first);
                    }
                }
            }
        }
    }

    #[test]
    fn global_shared_is_the_identity() {
        for p in ScopePolicy::ALL {
            assert_eq!(GlobalShared.merge(p), p);
            assert_eq!(p.merge(p), p);
        }
        assert_eq!(ScopePolicy::merge_all(std::iter::empty()), None);
        assert_eq!(ScopePolicy::default(), GlobalShared);
    }

    #[test]
    fn classification_helpers() {
        assert!(PerFrameShared.is_per_frame());
        assert!(!PerFrameShared.is_per_call());
        assert!(GlobalPerCall.is_per_call());
        assert!(!GlobalPerCall.is_per_frame());
        assert!(PerFramePerCall.is_per_frame() && PerFramePerCall.is_per_call());
    }
}
