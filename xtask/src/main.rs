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

// Build automation for the Quiver workspace
// Run with: cargo xtask <command>

mod commands;
mod helpers;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use commands::ci;

#[derive(Parser)]
#[command(name = "xtask", about = "Build automation for the Quiver workspace")]
struct Cli {
    #[command(subcommand)]
    command: Option<Task>,
}

#[derive(Subcommand)]
enum Task {
    /// Build all crates in the workspace.
    Build,
    /// Run all tests in the workspace.
    Test,
    /// Run `cargo check` on all crates.
    Check,
    /// Format all code in the workspace.
    Format,
    /// Run clippy on all crates with warnings as errors.
    Clippy,
    /// Run the binding-cache benchmarks.
    Bench,
    /// Run the simulated render loop.
    Sandbox,
    /// Run all CI tasks (build, test, check, format, clippy).
    All,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let Some(task) = cli.command else {
        println!("{}", helpers::BANNER);
        Cli::command().print_help()?;
        return Ok(());
    };

    match task {
        Task::Build => ci::build(),
        Task::Test => ci::test(),
        Task::Check => ci::check(),
        Task::Format => ci::format(),
        Task::Clippy => ci::clippy(),
        Task::Bench => ci::bench(),
        Task::Sandbox => ci::sandbox(),
        Task::All => ci::all(),
    }
}
