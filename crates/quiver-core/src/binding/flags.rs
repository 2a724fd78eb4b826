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

//! Flags representing which shader stages can access a resource binding.

/// A single programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShaderStage {
    /// Vertex shader stage.
    Vertex,
    /// Fragment shader stage.
    Fragment,
    /// Compute shader stage.
    Compute,
    /// Ray generation stage.
    RayGeneration,
    /// Miss stage.
    Miss,
    /// Closest-hit stage.
    ClosestHit,
    /// Any-hit stage.
    AnyHit,
    /// Intersection stage.
    Intersection,
}

/// Flags representing which shader stages can access a resource binding.
///
/// This is used in set layouts to specify visibility of resources.
/// Multiple stages can be combined using bitwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ShaderStageFlags {
    bits: u32,
}

impl ShaderStageFlags {
    /// No shader stages.
    pub const NONE: Self = Self { bits: 0 };
    /// Vertex shader stage.
    pub const VERTEX: Self = Self { bits: 1 << 0 };
    /// Fragment shader stage.
    pub const FRAGMENT: Self = Self { bits: 1 << 1 };
    /// Compute shader stage.
    pub const COMPUTE: Self = Self { bits: 1 << 2 };
    /// Ray generation stage.
    pub const RAY_GENERATION: Self = Self { bits: 1 << 3 };
    /// Miss stage.
    pub const MISS: Self = Self { bits: 1 << 4 };
    /// Closest-hit stage.
    pub const CLOSEST_HIT: Self = Self { bits: 1 << 5 };
    /// Any-hit stage.
    pub const ANY_HIT: Self = Self { bits: 1 << 6 };
    /// Intersection stage.
    pub const INTERSECTION: Self = Self { bits: 1 << 7 };
    /// All graphics stages (vertex + fragment).
    pub const VERTEX_FRAGMENT: Self = Self {
        bits: Self::VERTEX.bits | Self::FRAGMENT.bits,
    };
    /// All ray-tracing stages.
    pub const RAY_TRACING: Self = Self {
        bits: Self::RAY_GENERATION.bits
            | Self::MISS.bits
            | Self::CLOSEST_HIT.bits
            | Self::ANY_HIT.bits
            | Self::INTERSECTION.bits,
    };
    /// All stages.
    pub const ALL: Self = Self {
        bits: Self::VERTEX_FRAGMENT.bits | Self::COMPUTE.bits | Self::RAY_TRACING.bits,
    };

    /// Creates a new set of shader stage flags from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    /// Creates flags from a single shader stage.
    pub const fn from_stage(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => Self::VERTEX,
            ShaderStage::Fragment => Self::FRAGMENT,
            ShaderStage::Compute => Self::COMPUTE,
            ShaderStage::RayGeneration => Self::RAY_GENERATION,
            ShaderStage::Miss => Self::MISS,
            ShaderStage::ClosestHit => Self::CLOSEST_HIT,
            ShaderStage::AnyHit => Self::ANY_HIT,
            ShaderStage::Intersection => Self::INTERSECTION,
        }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Checks if these flags contain a specific stage.
    pub const fn contains(&self, stage: ShaderStage) -> bool {
        let stage_bits = Self::from_stage(stage).bits;
        (self.bits & stage_bits) == stage_bits
    }

    /// Checks if these flags are empty (no stages).
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl std::ops::BitOr for ShaderStageFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for ShaderStageFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl From<ShaderStage> for ShaderStageFlags {
    fn from(stage: ShaderStage) -> Self {
        Self::from_stage(stage)
    }
}
