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

//! Reflection data stored as JSON.
//!
//! ```json
//! {
//!   "sets": [
//!     { "set": 0, "bindings": [ { "slot": 0, "kind": "UniformBuffer", "stages": 3 } ] }
//!   ],
//!   "names": { "camera": { "set": 0, "slot": 0 } }
//! }
//! ```
//!
//! `count` defaults to 1. `stages` is the raw
//! [`ShaderStageFlags`](quiver_core::ShaderStageFlags) bit mask.

use quiver_core::{
    BindingLocation, LayoutError, LayoutSource, ReflectedLayouts, SetLayout, SetLayoutBinding,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct ReflectionFile {
    sets: Vec<ReflectedSet>,
    #[serde(default)]
    names: BTreeMap<String, BindingLocation>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReflectedSet {
    set: u32,
    bindings: Vec<SetLayoutBinding>,
}

#[derive(Debug, Clone)]
enum JsonOrigin {
    File(PathBuf),
    Inline(String),
}

/// A [`LayoutSource`] reading reflection data from JSON.
///
/// A file-backed source reads the file on every [`reflect`](LayoutSource::reflect)
/// call, so rebuilding the file and resetting the cache picks up the new layouts.
#[derive(Debug, Clone)]
pub struct JsonLayoutSource {
    origin: JsonOrigin,
}

impl JsonLayoutSource {
    /// A source reading `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: JsonOrigin::File(path.into()),
        }
    }

    /// A source parsing an in-memory document.
    pub fn from_json(text: impl Into<String>) -> Self {
        Self {
            origin: JsonOrigin::Inline(text.into()),
        }
    }

    /// The file this source reads, if it is file-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            JsonOrigin::File(path) => Some(path),
            JsonOrigin::Inline(_) => None,
        }
    }

    /// Parses a reflection document.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Source`] for malformed JSON and the matching
    /// [`LayoutError`] for inconsistent layouts or names.
    pub fn parse(text: &str) -> Result<ReflectedLayouts, LayoutError> {
        let file: ReflectionFile = serde_json::from_str(text)
            .map_err(|err| LayoutError::Source(format!("invalid reflection JSON: {err}")))?;

        let mut layouts = ReflectedLayouts::new();
        for set in file.sets {
            layouts.add_set(SetLayout::new(set.set, set.bindings)?)?;
        }
        for (name, location) in file.names {
            layouts.add_name(name, location)?;
        }
        Ok(layouts)
    }

    /// Renders `layouts` in the format [`parse`](Self::parse) reads.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Source`] if serialization fails.
    pub fn render(layouts: &ReflectedLayouts) -> Result<String, LayoutError> {
        let file = ReflectionFile {
            sets: layouts
                .sets()
                .map(|layout| ReflectedSet {
                    set: layout.set_index(),
                    bindings: layout.bindings().copied().collect(),
                })
                .collect(),
            names: layouts
                .names()
                .map(|(name, location)| (name.to_owned(), location))
                .collect(),
        };
        serde_json::to_string_pretty(&file)
            .map_err(|err| LayoutError::Source(format!("cannot render reflection JSON: {err}")))
    }
}

impl LayoutSource for JsonLayoutSource {
    fn reflect(&self) -> Result<ReflectedLayouts, LayoutError> {
        match &self.origin {
            JsonOrigin::File(path) => {
                log::debug!("Reading reflection data from {}", path.display());
                let text = std::fs::read_to_string(path).map_err(|err| {
                    LayoutError::Source(format!("cannot read {}: {err}", path.display()))
                })?;
                Self::parse(&text)
            }
            JsonOrigin::Inline(text) => Self::parse(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_core::{BindingKind, ShaderStageFlags};

    const FORWARD: &str = r#"{
        "sets": [
            { "set": 0, "bindings": [ { "slot": 0, "kind": "UniformBuffer", "stages": 3 } ] },
            { "set": 1, "bindings": [
                { "slot": 0, "kind": "UniformBufferDynamic", "stages": 3 },
                { "slot": 1, "kind": "CombinedImageSampler", "count": 4, "stages": 2 }
            ] }
        ],
        "names": {
            "camera": { "set": 0, "slot": 0 },
            "albedo": { "set": 1, "slot": 1 }
        }
    }"#;

    #[test]
    fn parses_sets_and_names() {
        let layouts = JsonLayoutSource::from_json(FORWARD).reflect().unwrap();
        assert_eq!(layouts.set_count(), 2);
        assert_eq!(layouts.locate("albedo"), Some(BindingLocation::new(1, 1)));

        let albedo = layouts.set(1).and_then(|set| set.binding(1)).unwrap();
        assert_eq!(albedo.kind, BindingKind::CombinedImageSampler);
        assert_eq!(albedo.count, 4);
        assert_eq!(albedo.stages, ShaderStageFlags::FRAGMENT);
        assert_eq!(layouts.set(0).and_then(|set| set.binding(0)).unwrap().count, 1);
    }

    #[test]
    fn render_then_parse_keeps_the_layouts() {
        let layouts = JsonLayoutSource::parse(FORWARD).unwrap();
        let text = JsonLayoutSource::render(&layouts).unwrap();
        assert_eq!(JsonLayoutSource::parse(&text).unwrap(), layouts);
    }

    #[test]
    fn inconsistent_documents_are_rejected() {
        let dangling = r#"{ "sets": [], "names": { "camera": { "set": 0, "slot": 0 } } }"#;
        assert!(matches!(
            JsonLayoutSource::parse(dangling),
            Err(LayoutError::UndeclaredName { .. })
        ));
        assert!(matches!(
            JsonLayoutSource::parse("{ not json"),
            Err(LayoutError::Source(_))
        ));
    }

    #[test]
    fn missing_file_is_a_source_error() {
        let source = JsonLayoutSource::from_path("does/not/exist.json");
        assert!(source.path().is_some());
        assert!(matches!(source.reflect(), Err(LayoutError::Source(_))));
    }
}
