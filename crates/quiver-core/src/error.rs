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

//! Defines the error types reported by layouts and descriptor devices.

use crate::binding::layout::{BindingKind, BindingLocation};
use crate::binding::payload::ResourceKind;
use std::fmt;

/// An error in a set layout, a reflection table, or a bind checked against them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Two slot descriptions in one set share a slot index.
    DuplicateSlot {
        /// The set index.
        set: u32,
        /// The repeated slot index.
        slot: u32,
    },
    /// A slot was declared with zero array elements.
    ZeroCount {
        /// The set index.
        set: u32,
        /// The slot index.
        slot: u32,
    },
    /// Two layouts were supplied for the same set index.
    DuplicateSet {
        /// The repeated set index.
        set: u32,
    },
    /// A symbolic name was mapped twice.
    DuplicateName {
        /// The repeated name.
        name: String,
    },
    /// A symbolic name points at a slot no layout declares.
    UndeclaredName {
        /// The name.
        name: String,
        /// The location it was mapped to.
        location: BindingLocation,
    },
    /// A bind targets a slot the set layout does not declare.
    UnknownSlot {
        /// The set index.
        set: u32,
        /// The undeclared slot index.
        slot: u32,
    },
    /// A bind's payload kind does not fit the slot type.
    KindMismatch {
        /// The set index.
        set: u32,
        /// The slot index.
        slot: u32,
        /// The declared slot type.
        expected: BindingKind,
        /// The kind of payload supplied.
        found: ResourceKind,
    },
    /// A bind's array length is zero or larger than the declared count.
    ArrayLength {
        /// The set index.
        set: u32,
        /// The slot index.
        slot: u32,
        /// The declared element count.
        capacity: u32,
        /// The number of elements supplied.
        requested: usize,
    },
    /// A bind supplies the wrong number of dynamic offsets for its slot type.
    DynamicOffsets {
        /// The set index.
        set: u32,
        /// The slot index.
        slot: u32,
        /// The number of offsets the slot requires.
        expected: usize,
        /// The number of offsets supplied.
        found: usize,
    },
    /// The layout source could not produce a table.
    Source(String),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::DuplicateSlot { set, slot } => {
                write!(f, "Slot {slot} is declared twice in set {set}")
            }
            LayoutError::ZeroCount { set, slot } => {
                write!(f, "Slot {slot} of set {set} is declared with zero elements")
            }
            LayoutError::DuplicateSet { set } => {
                write!(f, "Set {set} has more than one layout")
            }
            LayoutError::DuplicateName { name } => {
                write!(f, "Binding name '{name}' is mapped more than once")
            }
            LayoutError::UndeclaredName { name, location } => {
                write!(f, "Binding name '{name}' points at undeclared slot {location}")
            }
            LayoutError::UnknownSlot { set, slot } => {
                write!(f, "Set {set} does not declare slot {slot}")
            }
            LayoutError::KindMismatch {
                set,
                slot,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Slot ({set}, {slot}) is declared as {expected} but a {found} payload was bound"
                )
            }
            LayoutError::ArrayLength {
                set,
                slot,
                capacity,
                requested,
            } => {
                write!(
                    f,
                    "Slot ({set}, {slot}) holds 1..={capacity} elements but {requested} were bound"
                )
            }
            LayoutError::DynamicOffsets {
                set,
                slot,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Slot ({set}, {slot}) requires {expected} dynamic offsets but {found} were supplied"
                )
            }
            LayoutError::Source(msg) => write!(f, "Layout source failed: {msg}"),
        }
    }
}

impl std::error::Error for LayoutError {}

/// An error reported by a [`DescriptorDevice`](crate::DescriptorDevice).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The set pool has no room left for another allocation.
    PoolExhausted,
    /// The handle used to reference a device object is invalid.
    InvalidHandle,
    /// A descriptor write does not fit the layout of the set it targets.
    InvalidWrite(String),
    /// An error originating from the specific backend implementation.
    Backend(String),
}

impl DeviceError {
    /// Whether replenishing the pool may let a retried allocation succeed.
    pub fn is_pool_exhaustion(&self) -> bool {
        matches!(self, DeviceError::PoolExhausted)
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::PoolExhausted => write!(f, "Descriptor pool exhausted."),
            DeviceError::InvalidHandle => write!(f, "Invalid device handle."),
            DeviceError::InvalidWrite(msg) => write!(f, "Invalid descriptor write: {msg}"),
            DeviceError::Backend(msg) => write!(f, "Backend-specific device error: {msg}"),
        }
    }
}

impl std::error::Error for DeviceError {}
