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

//! The tabu search inner loop.
//!
//! Per iteration: regenerate the neighborhood, screen for improvability,
//! delta-score every candidate against the current score, pick the best
//! admissible one under the tabu/aspiration policy, apply it, and update
//! memory, incumbents and the chain buffer. A move is tabu iff every
//! altered variable rested fewer than `tenure` iterations; a tabu move is
//! admitted only when its global augmented objective beats the incumbent.

use crate::incumbent::{IncumbentHolder, update_status};
use crate::memory::Memory;
use crate::neighborhood::{Neighborhood, collect_violated_constraints, is_improvable_move};
use crate::option::Options;
use crate::time::TimeKeeper;
use fixedbitset::FixedBitSet;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tabu_mip_model::model::Model;
use tabu_mip_model::mov::{Move, MoveSense};
use tabu_mip_model::proxy::ValueProxy;
use tabu_mip_model::score::SolutionScore;
use tabu_mip_model::solution::Solution;
use tabu_mip_model::var::{VariableClass, VariableId};
use tabu_mip_model::{ScoreValue, VariableValue};

#[derive(Debug)]
pub struct TabuSearchResult {
    pub incumbent_holder: IncumbentHolder,
    pub memory: Memory,
    pub total_update_status: u32,
    pub number_of_iterations: usize,
    pub last_local_augmented_incumbent_update_iteration: i64,
    pub is_early_stopped: bool,
    pub historical_feasible_solutions: Vec<Solution>,
    pub user_callback_error: Option<String>,
}

/// One tabu phase. The holder and memory come in by value (the controller
/// keeps its own copies) and travel back in the result.
#[tracing::instrument(level = "debug", name = "Tabu Search", skip_all)]
pub fn solve(
    model: &mut Model,
    neighborhood: &mut Neighborhood,
    options: &Options,
    time_keeper: &TimeKeeper,
    local_penalty: &[ValueProxy<ScoreValue>],
    global_penalty: &[ValueProxy<ScoreValue>],
    initial_variable_values: &[ValueProxy<VariableValue>],
    mut incumbent_holder: IncumbentHolder,
    mut memory: Memory,
) -> TabuSearchResult {
    let phase_options = &options.tabu_search;
    let mut rng = ChaCha8Rng::seed_from_u64(phase_options.seed);

    model.import_variable_values(initial_variable_values);
    model.update();
    incumbent_holder.reset_local_augmented_incumbent();
    // The iteration counter restarts at zero, so the short-term memory from
    // the previous phase must not leak into the tabu test.
    memory.reset_last_update_iterations();

    let unfixed: Vec<VariableId> = model
        .variables()
        .iter()
        .filter(|v| !v.is_fixed())
        .map(|v| v.id())
        .collect();
    let tenure = phase_options.initial_tabu_tenure.clamp(1, unfixed.len().max(1)) as i64;

    // Forced random perturbations escape the previous local minimum.
    for _ in 0..phase_options.number_of_initial_modification {
        if let Some(mv) = random_modification_move(model, &unfixed, &mut rng) {
            model.apply(&mv);
            memory.update_randomized(
                model,
                &mv,
                0,
                phase_options.memory_randomize_width,
                &mut rng,
            );
        }
    }

    let mut current_score = model.evaluate(&Move::noop(), local_penalty, global_penalty);
    let mut total_update_status = incumbent_holder.try_update(model, &current_score);

    let mut historical_feasible_solutions = Vec::new();
    if current_score.is_feasible && options.is_enabled_collect_historical_data {
        historical_feasible_solutions.push(model.export_solution());
    }

    let mut violated = FixedBitSet::with_capacity(model.number_of_constraints());
    let mut number_of_iterations = 0usize;
    let mut last_local_update_iteration: i64 = 0;
    let mut last_improvement_iteration: i64 = 0;
    let mut is_early_stopped = false;
    let mut user_callback_error: Option<String> = None;
    let time_check_interval = phase_options.time_check_interval.max(1);

    for iteration in 0..phase_options.iteration_max {
        if iteration % time_check_interval == 0 {
            let elapsed = time_keeper.elapsed();
            if elapsed > options.time_max
                || elapsed - phase_options.time_offset > phase_options.time_max
            {
                tracing::debug!("Tabu phase stopped on time budget at iteration {}.", iteration);
                break;
            }
        }
        if let Some(target) = options.target_objective_value
            && incumbent_holder.feasible_incumbent_objective() <= model.sign() * target
        {
            tracing::debug!("Tabu phase reached the target objective.");
            break;
        }

        if let Err(error) = neighborhood.update_moves(model) {
            tracing::warn!("User-defined move updater failed: {}", error);
            user_callback_error = Some(error);
            break;
        }
        collect_violated_constraints(model, &mut violated);

        let moves = neighborhood.moves();
        let screening = options.is_enabled_improvability_screening;
        let scored: Vec<(usize, SolutionScore)> = if options.is_enabled_parallel_neighborhood_update
        {
            moves
                .par_iter()
                .enumerate()
                .filter(|(_, mv)| !screening || is_improvable_move(model, mv, &violated))
                .map(|(index, mv)| {
                    (
                        index,
                        model.evaluate_with_baseline(mv, &current_score, local_penalty, global_penalty),
                    )
                })
                .collect()
        } else {
            moves
                .iter()
                .enumerate()
                .filter(|(_, mv)| !screening || is_improvable_move(model, mv, &violated))
                .map(|(index, mv)| {
                    (
                        index,
                        model.evaluate_with_baseline(mv, &current_score, local_penalty, global_penalty),
                    )
                })
                .collect()
        };

        let mut best: Option<(usize, SolutionScore)> = None;
        for (index, score) in scored {
            let is_tabu = moves[index].alterations.iter().all(|&(variable, _)| {
                iteration as i64 - memory.last_update_iteration_of(model, variable) < tenure
            });
            let aspirated = score.global_augmented_objective
                < incumbent_holder.global_augmented_incumbent_objective();
            if is_tabu && !aspirated {
                continue;
            }
            let is_better = match &best {
                None => true,
                Some((_, incumbent)) => {
                    score.local_augmented_objective < incumbent.local_augmented_objective
                        || (score.local_augmented_objective == incumbent.local_augmented_objective
                            && score.total_violation < incumbent.total_violation)
                }
            };
            if is_better {
                best = Some((index, score));
            }
        }

        let Some((chosen_index, chosen_score)) = best else {
            tracing::debug!(
                "Tabu phase early-stopped at iteration {}: every candidate is tabu.",
                iteration
            );
            is_early_stopped = true;
            break;
        };
        let chosen_move = moves[chosen_index].clone();

        model.apply(&chosen_move);
        current_score = chosen_score;
        number_of_iterations = iteration + 1;

        let status = incumbent_holder.try_update(model, &current_score);
        total_update_status |= status;
        if status & update_status::LOCAL_AUGMENTED_INCUMBENT_UPDATE != 0 {
            last_local_update_iteration = iteration as i64;
            last_improvement_iteration = iteration as i64;
        }
        if current_score.is_feasible && options.is_enabled_collect_historical_data {
            historical_feasible_solutions.push(model.export_solution());
        }

        memory.update_randomized(
            model,
            &chosen_move,
            iteration as i64,
            phase_options.memory_randomize_width,
            &mut rng,
        );
        if chosen_move.alterations.len() >= 2 {
            neighborhood.register_chain_move(&chosen_move);
        }

        if phase_options.no_improvement_iteration_max > 0
            && iteration as i64 - last_improvement_iteration
                >= phase_options.no_improvement_iteration_max as i64
        {
            tracing::debug!(
                "Tabu phase stopped after {} iterations without improvement.",
                phase_options.no_improvement_iteration_max
            );
            break;
        }
    }

    TabuSearchResult {
        incumbent_holder,
        memory,
        total_update_status,
        number_of_iterations,
        last_local_augmented_incumbent_update_iteration: last_local_update_iteration,
        is_early_stopped,
        historical_feasible_solutions,
        user_callback_error,
    }
}

/// A random single-variable perturbation (selection groups swap as a pair).
fn random_modification_move<R: Rng>(
    model: &Model,
    unfixed: &[VariableId],
    rng: &mut R,
) -> Option<Move> {
    if unfixed.is_empty() {
        return None;
    }
    let id = unfixed[rng.random_range(0..unfixed.len())];
    let variable = model.variable(id);
    match variable.class() {
        VariableClass::Binary => {
            let value = model.variable_value(id);
            Some(Move::new(MoveSense::Binary).with_alteration(id, 1 - value))
        }
        VariableClass::Integer => {
            let (lower, upper) = (variable.lower_bound(), variable.upper_bound());
            if lower == upper {
                return None;
            }
            let current = model.variable_value(id);
            let mut value: VariableValue = rng.random_range(lower..=upper);
            if value == current {
                value = if value < upper { value + 1 } else { value - 1 };
            }
            Some(Move::new(MoveSense::Integer).with_alteration(id, value))
        }
        VariableClass::Selection => {
            let selection = &model.selections()[variable.selection_index()?];
            let selected = selection
                .variable_ids()
                .iter()
                .copied()
                .find(|&v| model.variable_value(v) == 1)?;
            let target = if selected == id {
                let others: Vec<VariableId> = selection
                    .variable_ids()
                    .iter()
                    .copied()
                    .filter(|&v| v != selected && !model.variable(v).is_fixed())
                    .collect();
                if others.is_empty() {
                    return None;
                }
                others[rng.random_range(0..others.len())]
            } else {
                id
            };
            Some(
                Move::new(MoveSense::Selection)
                    .with_alteration(selected, 0)
                    .with_alteration(target, 1),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabu_mip_model::expr::Expression;
    use tabu_mip_model::model::SetupConfig;

    fn setup_config(options: &Options) -> SetupConfig {
        SetupConfig {
            is_enabled_presolve: options.is_enabled_presolve,
            is_enabled_initial_value_correction: options.is_enabled_initial_value_correction,
            selection_mode: options.selection_mode,
        }
    }

    fn run_phase(model: &mut Model, options: &Options) -> TabuSearchResult {
        let mut neighborhood = Neighborhood::build(model, options.chain_move_capacity);
        if options.is_enabled_binary_move {
            neighborhood.binary_mut().enable();
        }
        if options.is_enabled_integer_move {
            neighborhood.integer_mut().enable();
        }
        if !model.selections().is_empty() {
            neighborhood.selection_mut().enable();
        }
        let local_penalty = model.generate_constraint_parameter_proxies(10_000.0);
        let global_penalty = local_penalty.clone();
        let initial = model.export_solution().variable_value_proxies;
        let holder = IncumbentHolder::new();
        let memory = Memory::new(model);
        let time_keeper = TimeKeeper::new();
        solve(
            model,
            &mut neighborhood,
            options,
            &time_keeper,
            &local_penalty,
            &global_penalty,
            &initial,
            holder,
            memory,
        )
    }

    #[test]
    fn test_unconstrained_integer_descent() {
        // Variables in [-1, 1], minimize the sum: converges to all minus one.
        let mut model = Model::new("descent");
        let x = model.add_variables("x", 10, -1, 1).expect("variables");
        model.minimize(Expression::sum_of(&x));
        let mut options = Options::default();
        options.is_enabled_presolve = false;
        options.tabu_search.iteration_max = 200;
        model.setup(&setup_config(&options)).expect("setup");

        let result = run_phase(&mut model, &options);
        assert!(result.incumbent_holder.is_found_feasible_solution());
        assert_eq!(result.incumbent_holder.feasible_incumbent_objective(), -10.0);
    }

    #[test]
    fn test_set_partitioning_reaches_zero() {
        // sum(x) = 1, minimize sum(i * x_i): x0 alone is optimal.
        let mut model = Model::new("partition");
        let x = model.add_variables("x", 10, 0, 1).expect("variables");
        model
            .add_constraint("partition", Expression::sum_of(&x).eq(1.0))
            .expect("constraint");
        let mut objective = Expression::new();
        for (i, &v) in x.iter().enumerate() {
            objective.add_term(v, i as f64);
        }
        model.minimize(objective);

        let mut options = Options::default();
        options.tabu_search.iteration_max = 300;
        model.setup(&setup_config(&options)).expect("setup");

        let result = run_phase(&mut model, &options);
        assert!(result.incumbent_holder.is_found_feasible_solution());
        assert_eq!(result.incumbent_holder.feasible_incumbent_objective(), 0.0);
        let solution = result.incumbent_holder.feasible_incumbent_solution();
        assert_eq!(solution.variable_value_proxies[0][0], 1);
        for flat in 1..10 {
            assert_eq!(solution.variable_value_proxies[0][flat], 0);
        }
    }

    #[test]
    fn test_all_tabu_without_aspiration_early_stops() {
        // One binary variable: after the improving flip, the only candidate
        // is the tabu flip back, which worsens the incumbent.
        let mut model = Model::new("deadlock");
        let x = model.add_scalar_variable("x", 0, 1).expect("variable");
        model.minimize(Expression::term(1.0, x));
        model.set_initial_value(x, 1);

        let mut options = Options::default();
        options.is_enabled_presolve = false;
        options.is_enabled_improvability_screening = false;
        options.tabu_search.iteration_max = 50;
        options.tabu_search.initial_tabu_tenure = 10;
        model.setup(&setup_config(&options)).expect("setup");

        let result = run_phase(&mut model, &options);
        assert!(result.is_early_stopped);
        assert_eq!(result.number_of_iterations, 1);
        assert_eq!(result.incumbent_holder.feasible_incumbent_objective(), 0.0);
    }

    #[test]
    fn test_tabu_discipline_respects_tenure() {
        // Two free binaries, tenure 2: an applied variable must rest two
        // iterations unless aspiration admits it.
        let mut model = Model::new("tenure");
        let x = model.add_variables("x", 4, 0, 1).expect("variables");
        model.minimize(Expression::sum_of(&x));
        for &v in &x {
            model.set_initial_value(v, 1);
        }

        let mut options = Options::default();
        options.is_enabled_presolve = false;
        options.is_enabled_improvability_screening = false;
        options.tabu_search.iteration_max = 4;
        options.tabu_search.initial_tabu_tenure = 2;
        model.setup(&setup_config(&options)).expect("setup");

        let result = run_phase(&mut model, &options);
        // Four improving flips, one per variable: no variable repeats
        // within the tenure window and the optimum is reached.
        assert_eq!(result.number_of_iterations, 4);
        assert_eq!(result.incumbent_holder.feasible_incumbent_objective(), 0.0);
    }

    #[test]
    fn test_initial_modification_perturbs_start() {
        let mut model = Model::new("kick");
        let x = model.add_variables("x", 6, 0, 1).expect("variables");
        model.minimize(Expression::sum_of(&x));

        let mut options = Options::default();
        options.is_enabled_presolve = false;
        options.tabu_search.iteration_max = 0;
        options.tabu_search.number_of_initial_modification = 3;
        model.setup(&setup_config(&options)).expect("setup");

        let result = run_phase(&mut model, &options);
        // No search iterations ran, but the memory saw the forced moves.
        assert_eq!(result.number_of_iterations, 0);
        assert_eq!(result.memory.total_update_count(), 3);
    }
}
