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

//! The flat option record and its nested per-phase records.
//!
//! Every field has a default so a JSON option file may override any subset.
//! `0` disables the window-style knobs (`no_improvement_iteration_max`,
//! `penalty_coefficient_reset_count_threshold` keeps its own meaning as a
//! phase count).

use serde::{Deserialize, Serialize};
use tabu_mip_model::selection::SelectionMode;

/// Console/log detail, ordered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Verbose {
    None,
    Warning,
    Outer,
    Full,
}

/// Which incumbent seeds the next tabu phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RestartMode {
    Global,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub is_enabled_lagrange_dual: bool,
    pub is_enabled_local_search: bool,
    pub is_enabled_binary_move: bool,
    pub is_enabled_integer_move: bool,
    pub is_enabled_user_defined_move: bool,
    pub is_enabled_chain_move: bool,
    pub is_enabled_aggregation_move: bool,
    pub is_enabled_precedence_move: bool,
    pub is_enabled_variable_bound_move: bool,
    pub is_enabled_exclusive_move: bool,
    pub is_enabled_improvability_screening: bool,
    pub is_enabled_presolve: bool,
    pub is_enabled_initial_value_correction: bool,
    pub is_enabled_parallel_neighborhood_update: bool,
    pub is_enabled_collect_historical_data: bool,
    pub is_enabled_grouping_penalty_coefficient: bool,
    pub time_max: f64,
    pub iteration_max: usize,
    pub seed: u64,
    pub initial_penalty_coefficient: f64,
    pub penalty_coefficient_tightening_rate: f64,
    pub penalty_coefficient_relaxing_rate: f64,
    pub penalty_coefficient_updating_balance: f64,
    pub penalty_coefficient_reset_count_threshold: usize,
    pub target_objective_value: Option<f64>,
    pub historical_data_capacity: usize,
    pub chain_move_capacity: usize,
    pub selection_mode: SelectionMode,
    pub verbose: Verbose,
    pub lagrange_dual: LagrangeDualOptions,
    pub local_search: LocalSearchOptions,
    pub tabu_search: TabuSearchOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            is_enabled_lagrange_dual: false,
            is_enabled_local_search: false,
            is_enabled_binary_move: true,
            is_enabled_integer_move: true,
            is_enabled_user_defined_move: false,
            is_enabled_chain_move: false,
            is_enabled_aggregation_move: false,
            is_enabled_precedence_move: false,
            is_enabled_variable_bound_move: false,
            is_enabled_exclusive_move: false,
            is_enabled_improvability_screening: true,
            is_enabled_presolve: true,
            is_enabled_initial_value_correction: true,
            is_enabled_parallel_neighborhood_update: false,
            is_enabled_collect_historical_data: false,
            is_enabled_grouping_penalty_coefficient: false,
            time_max: 120.0,
            iteration_max: 100,
            seed: 1,
            initial_penalty_coefficient: 1e7,
            penalty_coefficient_tightening_rate: 1.0,
            penalty_coefficient_relaxing_rate: 0.9,
            penalty_coefficient_updating_balance: 0.5,
            penalty_coefficient_reset_count_threshold: 10,
            target_objective_value: None,
            historical_data_capacity: 1_000,
            chain_move_capacity: 10_000,
            selection_mode: SelectionMode::None,
            verbose: Verbose::None,
            lagrange_dual: LagrangeDualOptions::default(),
            local_search: LocalSearchOptions::default(),
            tabu_search: TabuSearchOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LagrangeDualOptions {
    pub iteration_max: usize,
    pub time_max: f64,
    pub time_offset: f64,
    pub seed: u64,
    pub initial_step_size: f64,
    pub step_size_extend_rate: f64,
    pub step_size_shrink_rate: f64,
    pub tolerance: f64,
}

impl Default for LagrangeDualOptions {
    fn default() -> Self {
        Self {
            iteration_max: 1_000,
            time_max: 120.0,
            time_offset: 0.0,
            seed: 1,
            initial_step_size: 0.01,
            step_size_extend_rate: 1.05,
            step_size_shrink_rate: 0.75,
            tolerance: 1e-7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSearchOptions {
    pub iteration_max: usize,
    pub time_max: f64,
    pub time_offset: f64,
    pub seed: u64,
}

impl Default for LocalSearchOptions {
    fn default() -> Self {
        Self {
            iteration_max: 10_000,
            time_max: 120.0,
            time_offset: 0.0,
            seed: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabuSearchOptions {
    pub iteration_max: usize,
    pub time_max: f64,
    pub time_offset: f64,
    pub seed: u64,
    pub initial_tabu_tenure: usize,
    pub iteration_increase_rate: f64,
    pub initial_modification_fixed_rate: f64,
    pub initial_modification_randomize_rate: f64,
    pub is_enabled_automatic_iteration_adjustment: bool,
    pub is_enabled_automatic_tabu_tenure_adjustment: bool,
    pub is_enabled_initial_modification: bool,
    pub restart_mode: RestartMode,
    /// Forced random moves at phase start; driven by the controller.
    pub number_of_initial_modification: usize,
    /// Jitter width of the memory timestamps; 0 keeps them exact.
    pub memory_randomize_width: usize,
    /// Early stop after this many iterations without a local-augmented
    /// improvement; 0 disables the window.
    pub no_improvement_iteration_max: usize,
    /// The time keeper is consulted every this many inner iterations.
    pub time_check_interval: usize,
}

impl Default for TabuSearchOptions {
    fn default() -> Self {
        Self {
            iteration_max: 500,
            time_max: 120.0,
            time_offset: 0.0,
            seed: 1,
            initial_tabu_tenure: 10,
            iteration_increase_rate: 1.5,
            initial_modification_fixed_rate: 1.0,
            initial_modification_randomize_rate: 0.5,
            is_enabled_automatic_iteration_adjustment: true,
            is_enabled_automatic_tabu_tenure_adjustment: true,
            is_enabled_initial_modification: true,
            restart_mode: RestartMode::Global,
            number_of_initial_modification: 0,
            memory_randomize_width: 0,
            no_improvement_iteration_max: 0,
            time_check_interval: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert!(options.is_enabled_binary_move);
        assert!(!options.is_enabled_chain_move);
        assert_eq!(options.initial_penalty_coefficient, 1e7);
        assert_eq!(options.target_objective_value, None);
        assert_eq!(options.selection_mode, SelectionMode::None);
        assert_eq!(options.tabu_search.initial_tabu_tenure, 10);
        assert_eq!(options.tabu_search.restart_mode, RestartMode::Global);
    }

    #[test]
    fn test_verbose_ordering() {
        assert!(Verbose::None < Verbose::Warning);
        assert!(Verbose::Warning < Verbose::Outer);
        assert!(Verbose::Outer < Verbose::Full);
    }

    #[test]
    fn test_partial_json_overlay_keeps_defaults() {
        let json = r#"{
            "iteration_max": 7,
            "is_enabled_chain_move": true,
            "tabu_search": { "initial_tabu_tenure": 3 },
            "target_objective_value": -10.0
        }"#;
        let options: Options = serde_json::from_str(json).expect("parse");
        assert_eq!(options.iteration_max, 7);
        assert!(options.is_enabled_chain_move);
        assert_eq!(options.tabu_search.initial_tabu_tenure, 3);
        assert_eq!(options.tabu_search.iteration_max, 500);
        assert_eq!(options.target_objective_value, Some(-10.0));
        assert_eq!(options.time_max, 120.0);
    }
}
