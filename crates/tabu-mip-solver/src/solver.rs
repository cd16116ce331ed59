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

//! The outer controller.
//!
//! Runs the optional Lagrange dual and local search bootstraps, then loops
//! tabu phases until a budget or the target is hit. Between phases it
//! adapts the local penalty coefficients (reset / tighten / relax), drifts
//! the tabu tenure on the bias metric, decides the initial perturbation
//! count and the next iteration budget, and toggles the structural
//! neighborhoods on stagnation.

use crate::err::{AlreadySolvedError, SolverError};
use crate::history::FeasibleSolutionPool;
use crate::incumbent::{IncumbentHolder, update_status};
use crate::memory::Memory;
use crate::neighborhood::Neighborhood;
use crate::option::{Options, RestartMode, Verbose};
use crate::result::{SolveResult, Status};
use crate::time::TimeKeeper;
use crate::{lagrange_dual, local_search, tabu_search};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tabu_mip_model::EPSILON;
use tabu_mip_model::model::{Model, SetupConfig};
use tabu_mip_model::mov::Move;

pub fn solve(model: &mut Model, options: &Options) -> Result<SolveResult, SolverError> {
    if model.is_solved() {
        return Err(AlreadySolvedError.into());
    }
    model.set_is_solved(true);

    let time_keeper = TimeKeeper::new();
    let master = options.clone();
    let outer_verbose = master.verbose >= Verbose::Outer;
    let warning_verbose = master.verbose >= Verbose::Warning;

    model.setup(&SetupConfig {
        is_enabled_presolve: master.is_enabled_presolve,
        is_enabled_initial_value_correction: master.is_enabled_initial_value_correction,
        selection_mode: master.selection_mode,
    })?;

    if outer_verbose {
        tracing::info!(
            "Optimization starts: {} ({} variables, {} constraints).",
            model.name(),
            model.number_of_variables(),
            model.number_of_constraints()
        );
    }

    let mut neighborhood = Neighborhood::build(model, master.chain_move_capacity);
    if master.is_enabled_binary_move {
        neighborhood.binary_mut().enable();
    }
    if master.is_enabled_integer_move {
        neighborhood.integer_mut().enable();
    }
    if master.is_enabled_user_defined_move && model.move_updater().is_some() {
        neighborhood.user_defined_mut().enable();
    }
    if !model.selections().is_empty() {
        neighborhood.selection_mut().enable();
    }
    // Structural moves start disabled; stagnation turns them on below.
    let has_special_moves =
        neighborhood.number_of_structural_candidates() > 0 || master.is_enabled_chain_move;

    let mut rng = ChaCha8Rng::seed_from_u64(master.seed);

    let global_penalty =
        model.generate_constraint_parameter_proxies(master.initial_penalty_coefficient);
    let mut local_penalty = global_penalty.clone();

    let mut memory = Memory::new(model);
    let mut pool = FeasibleSolutionPool::new(master.historical_data_capacity, model.sign());

    model.update();
    let mut current_solution = model.export_solution();
    let mut incumbent_holder = IncumbentHolder::new();
    let initial_score = model.evaluate(&Move::noop(), &local_penalty, &global_penalty);
    incumbent_holder.try_update(model, &initial_score);

    // Minimization value to stop at. A model with no objective stops at the
    // first feasible solution.
    let target_objective = match master.target_objective_value {
        Some(target) => Some(model.sign() * target),
        None if !model.is_defined_objective() => Some(0.0),
        None => None,
    };

    let mut number_of_lagrange_dual_iterations = 0usize;
    let mut number_of_local_search_iterations = 0usize;
    let mut number_of_tabu_search_iterations = 0usize;
    let mut number_of_tabu_search_loops = 0usize;

    // ---------------------------------------------------------------
    // Lagrange dual bootstrap (optional)
    // ---------------------------------------------------------------
    if master.is_enabled_lagrange_dual {
        if !model.is_linear() {
            if warning_verbose {
                tracing::warn!("The Lagrange dual was skipped because the problem is nonlinear.");
            }
        } else if model.number_of_selection_variables() > 0 {
            if warning_verbose {
                tracing::warn!(
                    "The Lagrange dual was skipped because it does not apply to selection variables."
                );
            }
        } else if time_keeper.elapsed() <= master.time_max {
            let mut phase_options = master.clone();
            phase_options.lagrange_dual.time_offset = time_keeper.elapsed();

            let result = lagrange_dual::solve(
                model,
                &phase_options,
                &time_keeper,
                &local_penalty,
                &global_penalty,
                &current_solution.variable_value_proxies,
                incumbent_holder.clone(),
            );

            current_solution = result
                .incumbent_holder
                .global_augmented_incumbent_solution()
                .clone();
            if master.is_enabled_collect_historical_data {
                pool.push(result.historical_feasible_solutions);
            }
            incumbent_holder.try_update_solution(
                result.incumbent_holder.global_augmented_incumbent_solution(),
                result.incumbent_holder.global_augmented_incumbent_score(),
                model.sign(),
            );
            if result.incumbent_holder.is_found_feasible_solution() {
                incumbent_holder.try_update_solution(
                    result.incumbent_holder.feasible_incumbent_solution(),
                    result.incumbent_holder.feasible_incumbent_score(),
                    model.sign(),
                );
            }
            number_of_lagrange_dual_iterations = result.number_of_iterations;
            if outer_verbose {
                tracing::info!(
                    "The Lagrange dual finished after {} iterations ({:.3}s elapsed).",
                    result.number_of_iterations,
                    time_keeper.elapsed()
                );
            }
        }
    }

    // ---------------------------------------------------------------
    // Local search warm start (optional)
    // ---------------------------------------------------------------
    if master.is_enabled_local_search && time_keeper.elapsed() <= master.time_max {
        let mut phase_options = master.clone();
        phase_options.local_search.time_offset = time_keeper.elapsed();

        let result = local_search::solve(
            model,
            &mut neighborhood,
            &phase_options,
            &time_keeper,
            &local_penalty,
            &global_penalty,
            &current_solution.variable_value_proxies,
            incumbent_holder.clone(),
            memory,
        );
        memory = result.memory;

        current_solution = result
            .incumbent_holder
            .global_augmented_incumbent_solution()
            .clone();
        if master.is_enabled_collect_historical_data {
            pool.push(result.historical_feasible_solutions);
        }
        incumbent_holder.try_update_solution(
            result.incumbent_holder.global_augmented_incumbent_solution(),
            result.incumbent_holder.global_augmented_incumbent_score(),
            model.sign(),
        );
        if result.incumbent_holder.is_found_feasible_solution() {
            incumbent_holder.try_update_solution(
                result.incumbent_holder.feasible_incumbent_solution(),
                result.incumbent_holder.feasible_incumbent_score(),
                model.sign(),
            );
        }
        number_of_local_search_iterations = result.number_of_iterations;
        if outer_verbose {
            tracing::info!(
                "Local search finished after {} iterations ({:.3}s elapsed).",
                result.number_of_iterations,
                time_keeper.elapsed()
            );
        }
    }

    // ---------------------------------------------------------------
    // Tabu search loop
    // ---------------------------------------------------------------
    let mut iteration = 0usize;
    let mut not_update_count = 0usize;
    let mut next_number_of_initial_modification = 0usize;
    let mut next_initial_tabu_tenure = master.tabu_search.initial_tabu_tenure;
    let mut next_iteration_max = master.tabu_search.iteration_max;
    let mut penalty_coefficient_reset_flag = false;
    let mut bias = memory.bias();

    loop {
        let elapsed = time_keeper.elapsed();
        if elapsed > master.time_max {
            if outer_verbose {
                tracing::info!("The outer loop stopped on the time budget ({:.3}s).", elapsed);
            }
            break;
        }
        if iteration >= master.iteration_max {
            if outer_verbose {
                tracing::info!("The outer loop stopped at the iteration limit ({}).", iteration);
            }
            break;
        }
        if let Some(target) = target_objective
            && incumbent_holder.feasible_incumbent_objective() <= target
        {
            if outer_verbose {
                tracing::info!("The feasible incumbent reached the target objective.");
            }
            break;
        }

        let mut phase_options = master.clone();
        if master.tabu_search.is_enabled_automatic_iteration_adjustment {
            phase_options.tabu_search.iteration_max = next_iteration_max;
        }
        phase_options.tabu_search.time_offset = elapsed;
        phase_options.tabu_search.seed =
            master.tabu_search.seed.wrapping_add(iteration as u64);
        phase_options.tabu_search.number_of_initial_modification =
            next_number_of_initial_modification;
        phase_options.tabu_search.initial_tabu_tenure = next_initial_tabu_tenure;

        let result = tabu_search::solve(
            model,
            &mut neighborhood,
            &phase_options,
            &time_keeper,
            &local_penalty,
            &global_penalty,
            &current_solution.variable_value_proxies,
            incumbent_holder.clone(),
            memory,
        );
        memory = result.memory;

        let result_local_solution = result
            .incumbent_holder
            .local_augmented_incumbent_solution()
            .clone();
        let result_global_solution = result
            .incumbent_holder
            .global_augmented_incumbent_solution()
            .clone();

        let is_changed = match master.tabu_search.restart_mode {
            RestartMode::Global => {
                let changed = result_global_solution.variable_value_proxies
                    != current_solution.variable_value_proxies;
                current_solution = result_global_solution.clone();
                changed
            }
            RestartMode::Local => {
                let changed = result_local_solution.variable_value_proxies
                    != current_solution.variable_value_proxies;
                current_solution = result_local_solution.clone();
                changed
            }
        };

        if master.is_enabled_collect_historical_data {
            pool.push(result.historical_feasible_solutions);
        }

        let global_update_status = incumbent_holder.try_update_solution(
            &result_global_solution,
            result.incumbent_holder.global_augmented_incumbent_score(),
            model.sign(),
        );
        if global_update_status & update_status::GLOBAL_AUGMENTED_INCUMBENT_UPDATE != 0 {
            not_update_count = 0;
            penalty_coefficient_reset_flag = false;
        } else {
            not_update_count += 1;
            if not_update_count == master.penalty_coefficient_reset_count_threshold {
                penalty_coefficient_reset_flag = true;
                not_update_count = 0;
            } else {
                penalty_coefficient_reset_flag = false;
            }
        }

        if result.incumbent_holder.is_found_feasible_solution() {
            incumbent_holder.try_update_solution(
                result.incumbent_holder.feasible_incumbent_solution(),
                result.incumbent_holder.feasible_incumbent_score(),
                model.sign(),
            );
        }

        // -------- Local penalty coefficient adaptation --------
        let gap = incumbent_holder.global_augmented_incumbent_objective()
            - result
                .incumbent_holder
                .local_augmented_incumbent_objective();

        if penalty_coefficient_reset_flag {
            local_penalty = global_penalty.clone();
            if outer_verbose {
                tracing::info!("The penalty coefficients were reset due to search stagnation.");
            }
        } else if gap > EPSILON && !result_local_solution.is_feasible {
            let mut sum_violation = 0.0f64;
            let mut sum_squared_violation = 0.0f64;
            for proxy in &result_local_solution.violation_value_proxies {
                for &violation in proxy.values() {
                    sum_violation += violation;
                    sum_squared_violation += violation * violation;
                }
            }
            let balance = master.penalty_coefficient_updating_balance;

            for proxy in local_penalty.iter_mut() {
                let violations = result_local_solution.violation_value_proxies[proxy.id()]
                    .values()
                    .to_vec();
                for (flat, element) in proxy.values_mut().iter_mut().enumerate() {
                    let delta_constant = if sum_violation > 0.0 {
                        gap.max(0.0) / sum_violation
                    } else {
                        0.0
                    };
                    let delta_proportional = if sum_squared_violation > 0.0 {
                        gap.max(0.0) / sum_squared_violation * violations[flat]
                    } else {
                        0.0
                    };
                    *element += master.penalty_coefficient_tightening_rate
                        * (balance * delta_constant + (1.0 - balance) * delta_proportional);
                }

                if master.is_enabled_grouping_penalty_coefficient {
                    let group_max = proxy
                        .values()
                        .iter()
                        .fold(0.0f64, |acc, &value| acc.max(value));
                    for element in proxy.values_mut() {
                        *element = group_max;
                    }
                }

                // Bounded by the initial coefficient.
                for element in proxy.values_mut() {
                    *element = element.min(master.initial_penalty_coefficient);
                }
            }
        } else {
            for proxy in local_penalty.iter_mut() {
                let violations = result_local_solution.violation_value_proxies[proxy.id()]
                    .values()
                    .to_vec();
                for (flat, element) in proxy.values_mut().iter_mut().enumerate() {
                    if violations[flat] < EPSILON {
                        *element *= master.penalty_coefficient_relaxing_rate;
                    }
                }
            }
        }

        // -------- Tabu tenure drift on the bias metric --------
        let previous_bias = bias;
        bias = memory.bias();
        let tenure_cap = model.number_of_unfixed_variables().max(1);
        if master.tabu_search.is_enabled_automatic_tabu_tenure_adjustment {
            if result.total_update_status & update_status::GLOBAL_AUGMENTED_INCUMBENT_UPDATE != 0 {
                next_initial_tabu_tenure =
                    master.tabu_search.initial_tabu_tenure.min(tenure_cap);
            } else if bias > previous_bias {
                next_initial_tabu_tenure =
                    (phase_options.tabu_search.initial_tabu_tenure + 1).min(tenure_cap);
            } else if bias < previous_bias {
                next_initial_tabu_tenure = phase_options
                    .tabu_search
                    .initial_tabu_tenure
                    .saturating_sub(1)
                    .max(1);
            }
        } else {
            next_initial_tabu_tenure = master.tabu_search.initial_tabu_tenure;
        }

        // -------- Initial modification for the next phase --------
        if result.total_update_status
            & (update_status::FEASIBLE_INCUMBENT_UPDATE
                | update_status::GLOBAL_AUGMENTED_INCUMBENT_UPDATE)
            != 0
        {
            next_number_of_initial_modification = 0;
        } else if master.tabu_search.is_enabled_initial_modification && !is_changed {
            let nominal = (master.tabu_search.initial_modification_fixed_rate
                * next_initial_tabu_tenure as f64)
                .floor() as i64;
            let random_width =
                (master.tabu_search.initial_modification_randomize_rate * nominal as f64) as i64;
            let mut count = nominal;
            if random_width > 0 {
                count += rng.random_range(-random_width..random_width);
            }
            next_number_of_initial_modification = count.max(1) as usize;
        }

        // -------- Iteration budget for the next phase --------
        if master.tabu_search.is_enabled_automatic_iteration_adjustment
            && !result.is_early_stopped
        {
            let adjusted = if result.total_update_status
                & update_status::GLOBAL_AUGMENTED_INCUMBENT_UPDATE
                != 0
            {
                (result.last_local_augmented_incumbent_update_iteration as f64
                    * master.tabu_search.iteration_increase_rate)
                    .ceil() as usize
            } else {
                (phase_options.tabu_search.iteration_max as f64
                    * master.tabu_search.iteration_increase_rate)
                    .ceil() as usize
            };
            next_iteration_max = std::cmp::max(
                master.tabu_search.initial_tabu_tenure,
                std::cmp::min(master.tabu_search.iteration_max, adjusted),
            );
        }

        // -------- Structural neighborhood toggling --------
        let mut enabled_special = false;
        let mut disabled_special = false;
        if result.total_update_status & update_status::GLOBAL_AUGMENTED_INCUMBENT_UPDATE != 0 {
            if master.is_enabled_aggregation_move && neighborhood.aggregation().is_enabled() {
                neighborhood.aggregation_mut().disable();
                disabled_special = true;
            }
            if master.is_enabled_precedence_move && neighborhood.precedence().is_enabled() {
                neighborhood.precedence_mut().disable();
                disabled_special = true;
            }
            if master.is_enabled_variable_bound_move && neighborhood.variable_bound().is_enabled()
            {
                neighborhood.variable_bound_mut().disable();
                disabled_special = true;
            }
            if master.is_enabled_exclusive_move && neighborhood.exclusive().is_enabled() {
                neighborhood.exclusive_mut().disable();
                disabled_special = true;
            }
            if master.is_enabled_chain_move && neighborhood.chain().is_enabled() {
                neighborhood.chain_mut().disable();
                disabled_special = true;
            }
        } else if !result.is_early_stopped
            && phase_options.tabu_search.iteration_max == master.tabu_search.iteration_max
        {
            if master.is_enabled_aggregation_move && !neighborhood.aggregation().is_enabled() {
                neighborhood.aggregation_mut().enable();
                enabled_special = true;
            }
            if master.is_enabled_precedence_move && !neighborhood.precedence().is_enabled() {
                neighborhood.precedence_mut().enable();
                enabled_special = true;
            }
            if master.is_enabled_variable_bound_move
                && !neighborhood.variable_bound().is_enabled()
            {
                neighborhood.variable_bound_mut().enable();
                enabled_special = true;
            }
            if master.is_enabled_exclusive_move && !neighborhood.exclusive().is_enabled() {
                neighborhood.exclusive_mut().enable();
                enabled_special = true;
            }
            if master.is_enabled_chain_move && !neighborhood.chain().is_enabled() {
                neighborhood.chain_mut().enable();
                enabled_special = true;
            }
        }

        number_of_tabu_search_iterations += result.number_of_iterations;
        number_of_tabu_search_loops += 1;

        if outer_verbose {
            tracing::info!(
                "Tabu loop {}/{} finished: global augmented {:.3}, feasible {:.3} ({:.3}s elapsed).",
                iteration + 1,
                master.iteration_max,
                incumbent_holder.global_augmented_incumbent_objective() * model.sign(),
                incumbent_holder.feasible_incumbent_objective() * model.sign(),
                time_keeper.elapsed()
            );
            tracing::info!("The tabu tenure for the next loop is {}.", next_initial_tabu_tenure);
            if next_number_of_initial_modification > 0 {
                tracing::info!(
                    "The next loop starts with {} random modifications.",
                    next_number_of_initial_modification
                );
            }
            if disabled_special && has_special_moves {
                tracing::info!("Structural neighborhood moves were disabled.");
            }
            if enabled_special && has_special_moves {
                tracing::info!("Structural neighborhood moves were enabled.");
            }
        }

        if let Some(error) = result.user_callback_error {
            if warning_verbose {
                tracing::warn!(
                    "The outer loop stopped after a user callback error: {}",
                    error
                );
            }
            break;
        }

        model.run_phase_callback();
        iteration += 1;
    }

    // ---------------------------------------------------------------
    // Final export
    // ---------------------------------------------------------------
    let incumbent = if incumbent_holder.is_found_feasible_solution() {
        incumbent_holder.feasible_incumbent_solution().clone()
    } else {
        incumbent_holder.global_augmented_incumbent_solution().clone()
    };

    // Recompute every cache so disabled constraints report values too.
    model.import_variable_values(&incumbent.variable_value_proxies);
    model.update();
    let final_solution = model.export_solution();
    let named_solution = model.convert_to_named_solution(&final_solution);

    let mut penalty_coefficients = BTreeMap::new();
    for (name, proxy) in model
        .constraint_proxy_names()
        .into_iter()
        .zip(local_penalty.iter())
    {
        penalty_coefficients.insert(name, proxy.clone());
    }
    let mut update_counts = BTreeMap::new();
    for (name, proxy) in model
        .variable_proxy_names()
        .into_iter()
        .zip(memory.update_counts().iter())
    {
        update_counts.insert(name, proxy.clone());
    }

    Ok(SolveResult {
        solution: named_solution,
        status: Status {
            model_summary: model.export_summary(),
            is_found_feasible_solution: incumbent_holder.is_found_feasible_solution(),
            elapsed_time: time_keeper.elapsed(),
            number_of_lagrange_dual_iterations,
            number_of_local_search_iterations,
            number_of_tabu_search_iterations,
            number_of_tabu_search_loops,
            penalty_coefficients,
            update_counts,
        },
        feasible_solutions: pool.solutions().to_vec(),
    })
}
