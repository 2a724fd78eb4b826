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

use crate::helpers::*;
use anyhow::Result;
use std::time::Instant;

/// One cargo invocation of the CI pipeline.
struct Step {
    title: &'static str,
    phase: &'static str,
    emoji: &'static str,
    color: &'static str,
    info: &'static str,
    args: &'static [&'static str],
}

const BUILD_STEP: Step = Step {
    title: "Building All Crates",
    phase: "Build",
    emoji: HAMMER,
    color: BLUE,
    info: "Compiling all workspace crates in debug mode",
    args: &["build", "--workspace", "--exclude", "xtask"],
};

const TEST_STEP: Step = Step {
    title: "Running All Tests",
    phase: "Tests",
    emoji: TEST_TUBE,
    color: GREEN,
    info: "Running unit tests, integration tests and doc tests",
    args: &["test", "--workspace"],
};

const CHECK_STEP: Step = Step {
    title: "Checking All Crates",
    phase: "Check",
    emoji: MAGNIFIER,
    color: CYAN,
    info: "Checking code for errors without building executables",
    args: &["check", "--workspace", "--all-targets"],
};

// `fmt` takes `--all`, not `--workspace`.
const FORMAT_STEP: Step = Step {
    title: "Formatting Code",
    phase: "Format",
    emoji: BRUSH,
    color: MAGENTA,
    info: "Formatting code using rustfmt with default settings",
    args: &["fmt", "--all"],
};

const CLIPPY_STEP: Step = Step {
    title: "Running Clippy",
    phase: "Clippy",
    emoji: CLIPPY,
    color: YELLOW,
    info: "Running Clippy linter with warnings as errors",
    args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
};

const BENCH_STEP: Step = Step {
    title: "Running Benchmarks",
    phase: "Bench",
    emoji: STOPWATCH,
    color: MAGENTA,
    info: "Measuring bind episodes against the headless device",
    args: &["bench", "-p", "quiver-cache"],
};

const SANDBOX_STEP: Step = Step {
    title: "Running Sandbox",
    phase: "Sandbox",
    emoji: GEAR,
    color: GREEN,
    info: "Simulating a render loop with a resize in the middle",
    args: &["run", "-p", "sandbox"],
};

fn run(step: &Step) -> Result<()> {
    print_task_start(step.title, step.emoji, step.color);
    println!("{}💡 Info:{} {}", BOLD, RESET, step.info);
    execute_command("cargo", step.args, step.phase)
}

pub fn build() -> Result<()> {
    run(&BUILD_STEP)
}

pub fn test() -> Result<()> {
    run(&TEST_STEP)
}

pub fn check() -> Result<()> {
    run(&CHECK_STEP)
}

pub fn format() -> Result<()> {
    run(&FORMAT_STEP)
}

pub fn clippy() -> Result<()> {
    run(&CLIPPY_STEP)
}

pub fn bench() -> Result<()> {
    run(&BENCH_STEP)
}

pub fn sandbox() -> Result<()> {
    run(&SANDBOX_STEP)
}

pub fn all() -> Result<()> {
    println!("{}", BANNER);
    println!("{}{}Starting full build pipeline...{}", BOLD, CYAN, RESET);
    println!(
        "{}💡 Pipeline:{} This will run build → test → check → format → clippy",
        BOLD, RESET
    );

    let start_time = Instant::now();
    let pipeline = [&BUILD_STEP, &TEST_STEP, &CHECK_STEP, &FORMAT_STEP, &CLIPPY_STEP];
    let total_tasks = pipeline.len();
    let mut success_count = 0;

    for (i, step) in pipeline.iter().enumerate() {
        println!(
            "\n{}{}[{}/{}] {} Phase{}",
            BOLD,
            step.color,
            i + 1,
            total_tasks,
            step.phase,
            RESET
        );
        if run(step).is_ok() {
            success_count += 1;
        }
    }

    print_summary(success_count, total_tasks, start_time.elapsed());

    if success_count != total_tasks {
        anyhow::bail!(
            "Pipeline failed with {}/{} successful tasks.",
            success_count,
            total_tasks
        );
    }
    Ok(())
}
