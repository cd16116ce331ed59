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

//! Result file writers: `incumbent.sol`, `incumbent.json`, `status.json`
//! and `feasible.json`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tabu_mip_solver::result::SolveResult;

pub fn write_result_files(result: &SolveResult, directory: &Path) -> std::io::Result<()> {
    let mut solution_file = BufWriter::new(File::create(directory.join("incumbent.sol"))?);
    result.solution.write_solution(&mut solution_file)?;
    solution_file.flush()?;

    let incumbent_json = serde_json::to_string_pretty(&result.solution)
        .expect("the named solution serializes");
    std::fs::write(directory.join("incumbent.json"), incumbent_json)?;

    let status_json =
        serde_json::to_string_pretty(&result.status).expect("the status serializes");
    std::fs::write(directory.join("status.json"), status_json)?;

    Ok(())
}

pub fn write_feasible_solutions(result: &SolveResult, directory: &Path) -> std::io::Result<()> {
    let feasible_json = serde_json::to_string_pretty(&result.feasible_solutions)
        .expect("the feasible archive serializes");
    std::fs::write(directory.join("feasible.json"), feasible_json)
}
