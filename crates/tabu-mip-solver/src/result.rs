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

use serde::Serialize;
use std::collections::BTreeMap;
use tabu_mip_model::proxy::ValueProxy;
use tabu_mip_model::solution::{ModelSummary, NamedSolution, Solution};

/// Serializable run summary written to `status.json`.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub model_summary: ModelSummary,
    pub is_found_feasible_solution: bool,
    pub elapsed_time: f64,
    pub number_of_lagrange_dual_iterations: usize,
    pub number_of_local_search_iterations: usize,
    pub number_of_tabu_search_iterations: usize,
    pub number_of_tabu_search_loops: usize,
    pub penalty_coefficients: BTreeMap<String, ValueProxy<f64>>,
    pub update_counts: BTreeMap<String, ValueProxy<i64>>,
}

/// What the controller hands back: the best solution seen (feasible when
/// one was found, otherwise the best global-augmented), the run status and
/// the archive of feasible solutions when collection was on.
#[derive(Debug, Clone)]
pub struct SolveResult {
    pub solution: NamedSolution,
    pub status: Status,
    pub feasible_solutions: Vec<Solution>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_with_named_containers() {
        let mut penalty_coefficients = BTreeMap::new();
        penalty_coefficients.insert(
            "cap".to_string(),
            ValueProxy::scalar(0, "cap", 1e7f64),
        );
        let status = Status {
            model_summary: ModelSummary {
                name: "m".to_string(),
                number_of_variables: 3,
                number_of_constraints: 1,
            },
            is_found_feasible_solution: true,
            elapsed_time: 0.5,
            number_of_lagrange_dual_iterations: 0,
            number_of_local_search_iterations: 0,
            number_of_tabu_search_iterations: 42,
            number_of_tabu_search_loops: 3,
            penalty_coefficients,
            update_counts: BTreeMap::new(),
        };
        let json = serde_json::to_string(&status).expect("serialize");
        assert!(json.contains("\"is_found_feasible_solution\":true"));
        assert!(json.contains("\"cap\""));
        assert!(json.contains("\"number_of_tabu_search_loops\":3"));
    }
}
