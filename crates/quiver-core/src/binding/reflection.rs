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

//! Reflection tables: every set layout of a pipeline program plus the
//! name → location map used by name-based binds.

use crate::binding::layout::{BindingLocation, SetLayout};
use crate::error::LayoutError;
use crate::traits::LayoutSource;
use std::collections::{BTreeMap, HashMap};

/// The binding interface of one pipeline program, as produced by shader reflection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReflectedLayouts {
    sets: BTreeMap<u32, SetLayout>,
    names: HashMap<String, BindingLocation>,
}

impl ReflectedLayouts {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a set layout.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::DuplicateSet`] if a layout for the same set index already exists.
    pub fn add_set(&mut self, layout: SetLayout) -> Result<(), LayoutError> {
        let set = layout.set_index();
        if self.sets.contains_key(&set) {
            return Err(LayoutError::DuplicateSet { set });
        }
        self.sets.insert(set, layout);
        Ok(())
    }

    /// Maps a symbolic resource name to a declared slot.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] if the name is already mapped or the location
    /// does not exist in the added layouts.
    pub fn add_name(
        &mut self,
        name: impl Into<String>,
        location: BindingLocation,
    ) -> Result<(), LayoutError> {
        let name = name.into();
        let declared = self
            .sets
            .get(&location.set)
            .and_then(|layout| layout.binding(location.slot))
            .is_some();
        if !declared {
            return Err(LayoutError::UndeclaredName { name, location });
        }
        if self.names.contains_key(&name) {
            return Err(LayoutError::DuplicateName { name });
        }
        self.names.insert(name, location);
        Ok(())
    }

    /// Builder form of [`add_set`](Self::add_set).
    pub fn with_set(mut self, layout: SetLayout) -> Result<Self, LayoutError> {
        self.add_set(layout)?;
        Ok(self)
    }

    /// Builder form of [`add_name`](Self::add_name).
    pub fn with_name(
        mut self,
        name: impl Into<String>,
        location: BindingLocation,
    ) -> Result<Self, LayoutError> {
        self.add_name(name, location)?;
        Ok(self)
    }

    /// The layout of set `index`.
    pub fn set(&self, index: u32) -> Option<&SetLayout> {
        self.sets.get(&index)
    }

    /// All set layouts in ascending set order.
    pub fn sets(&self) -> impl Iterator<Item = &SetLayout> {
        self.sets.values()
    }

    /// The number of set layouts.
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Resolves a symbolic name.
    pub fn locate(&self, name: &str) -> Option<BindingLocation> {
        self.names.get(name).copied()
    }

    /// Iterates over every `(name, location)` pair, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = (&str, BindingLocation)> {
        self.names.iter().map(|(name, loc)| (name.as_str(), *loc))
    }
}

impl LayoutSource for ReflectedLayouts {
    fn reflect(&self) -> Result<ReflectedLayouts, LayoutError> {
        Ok(self.clone())
    }
}
