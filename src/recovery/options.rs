//! Recovery options carried by a start request.

use crate::engine::EngineOptions;
use serde::{Deserialize, Serialize};

/// Highest accepted paranoia level.
pub const MAX_PARANOID: u8 = 2;

/// Options applied to the context handle before a run.
///
/// Every field has a default so requests only name what they change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryOptions {
    /// 0 = none, 1 = check files, 2 = check files and brute force fragmented ones
    pub paranoid_mode: u8,
    pub keep_corrupted_files: bool,
    pub enable_ext2_optimization: bool,
    pub expert_mode: bool,
    pub low_memory_mode: bool,
    pub verbose_output: bool,
    /// Only carve unallocated space of the selected partition
    pub carve_free_space_only: bool,
    /// Extensions to enable; `everything` enables all
    pub enabled_file_types: Vec<String>,
    pub disabled_file_types: Vec<String>,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            paranoid_mode: 1,
            keep_corrupted_files: false,
            enable_ext2_optimization: true,
            expert_mode: false,
            low_memory_mode: false,
            verbose_output: false,
            carve_free_space_only: false,
            enabled_file_types: Vec::new(),
            disabled_file_types: Vec::new(),
        }
    }
}

impl RecoveryOptions {
    /// Scalar options in engine form, with the paranoia level clamped.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            paranoid: self.paranoid_mode.min(MAX_PARANOID),
            keep_corrupted: self.keep_corrupted_files,
            ext2_optimization: self.enable_ext2_optimization,
            expert: self.expert_mode,
            low_memory: self.low_memory_mode,
            verbose: self.verbose_output,
        }
    }

    pub fn has_file_type_filters(&self) -> bool {
        !self.enabled_file_types.is_empty() || !self.disabled_file_types.is_empty()
    }
}
