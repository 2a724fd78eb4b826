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

//! Data structures describing what can be bound, where, and for how long.
//!
//! Binding sets are the grouping of resource bindings exposed to shaders
//! (descriptor sets in Vulkan, bind groups in WebGPU). This module provides the
//! backend-agnostic vocabulary the binding cache speaks: payloads, layouts,
//! locations, stage visibility, and scope policies.

pub mod flags;
pub mod layout;
pub mod payload;
pub mod policy;
pub mod reflection;

pub use self::flags::{ShaderStage, ShaderStageFlags};
pub use self::layout::{BindingKind, BindingLocation, SetLayout, SetLayoutBinding};
pub use self::payload::{
    ArrayComparison, BufferRegion, PrimaryHandle, ResourceKind, ResourcePayload, SampledImage,
};
pub use self::policy::ScopePolicy;
pub use self::reflection::ReflectedLayouts;
