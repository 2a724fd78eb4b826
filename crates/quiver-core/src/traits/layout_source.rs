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

use crate::binding::reflection::ReflectedLayouts;
use crate::error::LayoutError;
use std::fmt::Debug;

/// Supplies the binding interface of a pipeline program.
///
/// Implemented by shader reflection. The cache calls [`reflect`](Self::reflect)
/// once before its first episode and again after every reset, so a source may
/// return fresh data when the underlying program was rebuilt.
pub trait LayoutSource: Debug {
    /// Produces the set layouts and the name table.
    /// ## Errors
    /// * `LayoutError` - If the reflection data is unavailable or inconsistent.
    fn reflect(&self) -> Result<ReflectedLayouts, LayoutError>;
}
