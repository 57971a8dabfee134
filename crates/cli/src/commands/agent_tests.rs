// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn sleep_interruptible_returns_promptly_once_the_flag_is_set() {
    let flag = AtomicBool::new(true);
    let started = Instant::now();
    sleep_interruptible(Duration::from_secs(30), &flag);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn sleep_interruptible_waits_out_the_full_duration_when_never_signalled() {
    let flag = AtomicBool::new(false);
    let started = Instant::now();
    sleep_interruptible(Duration::from_millis(250), &flag);
    assert!(started.elapsed() >= Duration::from_millis(250));
}

#[test]
fn role_arg_file_stems_are_distinct() {
    let stems = [
        RoleArg::FrontendDev.as_file_stem(),
        RoleArg::BackendDev.as_file_stem(),
        RoleArg::Qa.as_file_stem(),
        RoleArg::Architect.as_file_stem(),
        RoleArg::Pm.as_file_stem(),
    ];
    let mut unique: Vec<&str> = stems.to_vec();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), stems.len());
}

#[test]
fn skill_arg_converts_to_the_matching_difficulty_level() {
    assert_eq!(DifficultyLevel::from(SkillArg::Junior), DifficultyLevel::Junior);
    assert_eq!(DifficultyLevel::from(SkillArg::Senior), DifficultyLevel::Senior);
    assert_eq!(DifficultyLevel::from(SkillArg::Principal), DifficultyLevel::Principal);
}
