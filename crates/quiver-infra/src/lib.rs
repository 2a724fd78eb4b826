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

//! # Quiver Infra
//!
//! Concrete implementations of the traits defined in `quiver-core`.
//!
//! - [`headless`]: a pool-backed [`DescriptorDevice`](quiver_core::DescriptorDevice)
//!   that validates every call and counts the work it was asked to do. It drives
//!   tests, benchmarks and the sandbox without a GPU.
//! - [`reflection`]: [`LayoutSource`](quiver_core::LayoutSource) implementations
//!   reading reflection data produced offline.

#![warn(missing_docs)]

pub mod headless;
pub mod reflection;

pub use headless::{HeadlessCounters, HeadlessDevice, HeadlessDeviceConfig};
pub use reflection::JsonLayoutSource;
