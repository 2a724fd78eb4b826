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

use anyhow::Result;
use std::process::Command;
use std::time::{Duration, Instant};

// ANSI color codes
pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const GREEN: &str = "\x1b[32m";
pub const RED: &str = "\x1b[31m";
pub const BLUE: &str = "\x1b[34m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const MAGENTA: &str = "\x1b[35m";

// Visual symbols
pub const CHECK: &str = "✓";
pub const CROSS: &str = "✗";
pub const GEAR: &str = "⚙";
pub const ROCKET: &str = "🚀";
pub const HAMMER: &str = "🔨";
pub const TEST_TUBE: &str = "🧪";
pub const MAGNIFIER: &str = "🔍";
pub const BRUSH: &str = "🎨";
pub const CLIPPY: &str = "📎";
pub const STOPWATCH: &str = "⏱";

pub const BANNER: &str = concat!(
    "\x1b[1m",
    "\x1b[36m", // BOLD, CYAN
    "╔═══════════════════════════════════════════════════════════╗\n",
    "║                        🏹 QUIVER ⚙                         ║\n",
    "║             Binding Cache Build Automation                ║\n",
    "╚═══════════════════════════════════════════════════════════╝",
    "\x1b[0m" // RESET
);

pub fn print_task_start(task_name: &str, emoji: &str, color: &str) {
    println!(
        "\n{}{}━━━ {} {} {}━━━{}",
        BOLD, color, emoji, task_name, emoji, RESET
    );
}

pub fn print_success(message: &str) {
    println!("{}{} {} {}{}", BOLD, GREEN, CHECK, message, RESET);
}

pub fn print_error(message: &str) {
    println!("{}{} {} {}{}", BOLD, RED, CROSS, message, RESET);
}

/// Prints the boxed summary closing `cargo xtask all`.
pub fn print_summary(succeeded: usize, total: usize, elapsed: Duration) {
    println!("\n{}{}╔═══════════════════════════════════════╗{}", BOLD, CYAN, RESET);
    println!("{}{}║            PIPELINE SUMMARY           ║{}", BOLD, CYAN, RESET);
    println!("{}{}╚═══════════════════════════════════════╝{}", BOLD, CYAN, RESET);

    if succeeded == total {
        println!(
            "{}{} {} All {} tasks completed successfully! {}{}",
            BOLD, GREEN, CHECK, total, ROCKET, RESET
        );
    } else {
        println!(
            "{}{} ⚠ {}/{} tasks completed{}",
            BOLD, YELLOW, succeeded, total, RESET
        );
    }
    println!(
        "{}{}Total time: {:.2}s{}",
        BOLD,
        BLUE,
        elapsed.as_secs_f64(),
        RESET
    );
}

/// Runs `cmd` with inherited stdio and fails unless it exits successfully.
pub fn execute_command(cmd: &str, args: &[&str], task_name: &str) -> Result<()> {
    println!("{}{}📋 Command:{} {} {}", BOLD, CYAN, RESET, cmd, args.join(" "));

    let start_time = Instant::now();
    let status = Command::new(cmd).args(args).status()?;
    let seconds = start_time.elapsed().as_secs_f64();

    if status.success() {
        print_success(&format!("{task_name} completed in {seconds:.2}s"));
        Ok(())
    } else {
        print_error(&format!("{task_name} failed after {seconds:.2}s"));
        anyhow::bail!("{} failed with status: {}", task_name, status);
    }
}
