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

//! # Quiver Core
//!
//! Foundational crate containing the resource handles, binding layouts, scope
//! policies, and interface contracts shared by the binding cache and the
//! device backends.
//!
//! This crate defines the 'what' of resource binding. The 'how' lives in
//! `quiver-cache` (the hot-path cache itself) and `quiver-infra` (concrete
//! [`DescriptorDevice`] implementations).

#![warn(missing_docs)]

pub mod binding;
pub mod error;
pub mod frame;
pub mod handle;
pub mod stats;
pub mod traits;

pub use binding::*;
pub use error::{DeviceError, LayoutError};
pub use frame::{FrameIndex, MAX_FRAMES_IN_FLIGHT};
pub use handle::*;
pub use stats::BindingStats;
pub use traits::{DescriptorDevice, DescriptorWrite, LayoutSource};
