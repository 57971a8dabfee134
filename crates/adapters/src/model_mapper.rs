// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Skill-level to model mapping for the LLM executor.
//!
//! Grounded on `original_source`'s `model_mapper.py`: principal-level tasks
//! get the higher-capability model class, everything else (including an
//! unrecognized level) gets the default.

use hpm_core::DifficultyLevel;

pub const SONNET_MODEL: &str = "claude-sonnet";
pub const OPUS_MODEL: &str = "claude-opus";

pub fn model_for(skill_level: DifficultyLevel) -> &'static str {
    match skill_level {
        DifficultyLevel::Principal => OPUS_MODEL,
        DifficultyLevel::Junior | DifficultyLevel::Senior => SONNET_MODEL,
    }
}

pub fn display_name(model_id: &str) -> &'static str {
    match model_id {
        OPUS_MODEL => "Claude Opus",
        SONNET_MODEL => "Claude Sonnet",
        _ => "Unknown Model",
    }
}

#[cfg(test)]
#[path = "model_mapper_tests.rs"]
mod tests;
