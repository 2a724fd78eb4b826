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

//! # Quiver Cache
//!
//! The resource-binding cache that sits on the renderer's hot path.
//!
//! Every draw, dispatch or trace call runs one *bind episode*:
//!
//! 1. [`BindingCache::begin_episode`] opens the episode.
//! 2. [`BindingCache::plan`] records one request per logical resource bind.
//! 3. [`BindingCache::end_episode`] merges the scope policies per set
//!    ([`resolver`]), finds or allocates a concrete set instance per set
//!    ([`allocator`]), writes only the slots whose content changed
//!    ([`writer`]), and publishes the ordered set handles and dynamic offsets.
//!
//! The cache is single-threaded: every operation takes `&mut self` and is
//! expected to run on the thread recording commands.

#![warn(missing_docs)]

pub mod allocator;
pub mod cache;
pub mod config;
pub mod error;
pub mod instance;
pub mod plan;
pub mod resolver;
pub mod writer;

pub use allocator::{BucketKey, SetAllocator};
pub use cache::BindingCache;
pub use config::BindingCacheConfig;
pub use error::BindingError;
pub use instance::{InstanceArena, InstanceId, SetInstance};
pub use plan::{BindRequest, PlanCollector};
pub use resolver::{ScopeResolver, SetPlan};
pub use writer::{BindingWriter, DynamicOffsetEntry, DynamicOffsetTable};
