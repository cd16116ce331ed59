// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

mod options_file;
mod output;
mod qaplib;

use chrono::Utc;
use std::path::{Path, PathBuf};
use tabu_mip_model::selection::SelectionMode;
use tabu_mip_solver::option::Options;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!("Usage: solver [-p OPTION_FILE] INPUT_FILE");
    println!();
    println!("  -p OPTION_FILE: JSON option file overriding the defaults.");
}

fn enable_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn base_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_string())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn main() {
    enable_tracing();

    let arguments: Vec<String> = std::env::args().skip(1).collect();
    let mut input_file: Option<PathBuf> = None;
    let mut option_file: Option<PathBuf> = None;

    let mut index = 0;
    while index < arguments.len() {
        if arguments[index] == "-p" {
            if index + 1 >= arguments.len() {
                print_usage();
                std::process::exit(1);
            }
            option_file = Some(PathBuf::from(&arguments[index + 1]));
            index += 2;
        } else {
            input_file = Some(PathBuf::from(&arguments[index]));
            index += 1;
        }
    }

    let Some(input_file) = input_file else {
        print_usage();
        std::process::exit(1);
    };

    let instance = match qaplib::QaplibInstance::from_path(&input_file) {
        Ok(instance) => instance,
        Err(error) => {
            tracing::error!("Failed to read {}: {}", input_file.display(), error);
            std::process::exit(1);
        }
    };

    let mut options = match option_file {
        Some(path) => match options_file::read_options(&path) {
            Ok(options) => options,
            Err(error) => {
                tracing::error!("Failed to read {}: {}", path.display(), error);
                std::process::exit(1);
            }
        },
        None => Options::default(),
    };

    // The assignment model brings its own neighborhood: facility swaps via
    // the registered updater, with the rows extracted as selections.
    options.is_enabled_binary_move = false;
    options.is_enabled_integer_move = false;
    options.is_enabled_user_defined_move = true;
    options.is_enabled_chain_move = false;
    options.is_enabled_improvability_screening = false;
    options.selection_mode = SelectionMode::Defined;

    let mut model = match qaplib::build_model(&instance, &base_name(&input_file)) {
        Ok(model) => model,
        Err(error) => {
            tracing::error!("Failed to build the model: {}", error);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Solving {} (n = {}) started at {}.",
        model.name(),
        instance.size,
        Utc::now().to_rfc3339()
    );

    let result = match tabu_mip_solver::solver::solve(&mut model, &options) {
        Ok(result) => result,
        Err(error) => {
            tracing::error!("The solver failed: {}", error);
            std::process::exit(1);
        }
    };

    tracing::info!("status: {}", result.status.is_found_feasible_solution);
    tracing::info!("objective: {}", result.solution.objective);

    let output_directory = PathBuf::from(".");
    if let Err(error) = output::write_result_files(&result, &output_directory) {
        tracing::error!("Failed to write result files: {}", error);
    }
    if options.is_enabled_collect_historical_data
        && let Err(error) = output::write_feasible_solutions(&result, &output_directory)
    {
        tracing::error!("Failed to write feasible.json: {}", error);
    }
}
