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

//! Best-improvement descent used as an optional warm start before the tabu
//! phases. Stops at the first local minimum of the local augmented
//! objective.

use crate::incumbent::IncumbentHolder;
use crate::memory::Memory;
use crate::neighborhood::{Neighborhood, collect_violated_constraints, is_improvable_move};
use crate::option::Options;
use crate::time::TimeKeeper;
use fixedbitset::FixedBitSet;
use tabu_mip_model::model::Model;
use tabu_mip_model::mov::Move;
use tabu_mip_model::proxy::ValueProxy;
use tabu_mip_model::score::SolutionScore;
use tabu_mip_model::solution::Solution;
use tabu_mip_model::{ScoreValue, VariableValue};

#[derive(Debug)]
pub struct LocalSearchResult {
    pub incumbent_holder: IncumbentHolder,
    pub memory: Memory,
    pub number_of_iterations: usize,
    pub historical_feasible_solutions: Vec<Solution>,
    pub user_callback_error: Option<String>,
}

#[tracing::instrument(level = "debug", name = "Local Search", skip_all)]
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
) -> LocalSearchResult {
    let phase_options = &options.local_search;

    model.import_variable_values(initial_variable_values);
    model.update();
    incumbent_holder.reset_local_augmented_incumbent();

    let mut current_score = model.evaluate(&Move::noop(), local_penalty, global_penalty);
    incumbent_holder.try_update(model, &current_score);

    let mut historical_feasible_solutions = Vec::new();
    if current_score.is_feasible && options.is_enabled_collect_historical_data {
        historical_feasible_solutions.push(model.export_solution());
    }

    let mut violated = FixedBitSet::with_capacity(model.number_of_constraints());
    let mut number_of_iterations = 0usize;
    let mut user_callback_error: Option<String> = None;

    for iteration in 0..phase_options.iteration_max {
        let elapsed = time_keeper.elapsed();
        if elapsed > options.time_max
            || elapsed - phase_options.time_offset > phase_options.time_max
        {
            tracing::debug!("Local search stopped on time budget at iteration {}.", iteration);
            break;
        }

        if let Err(error) = neighborhood.update_moves(model) {
            tracing::warn!("User-defined move updater failed: {}", error);
            user_callback_error = Some(error);
            break;
        }
        collect_violated_constraints(model, &mut violated);

        let screening = options.is_enabled_improvability_screening;
        let mut best: Option<(usize, SolutionScore)> = None;
        for (index, mv) in neighborhood.moves().iter().enumerate() {
            if screening && !is_improvable_move(model, mv, &violated) {
                continue;
            }
            let score =
                model.evaluate_with_baseline(mv, &current_score, local_penalty, global_penalty);
            if score.local_augmented_objective >= current_score.local_augmented_objective {
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
            tracing::debug!("Local search reached a local minimum at iteration {}.", iteration);
            break;
        };
        let chosen_move = neighborhood.moves()[chosen_index].clone();

        model.apply(&chosen_move);
        current_score = chosen_score;
        number_of_iterations = iteration + 1;

        incumbent_holder.try_update(model, &current_score);
        if current_score.is_feasible && options.is_enabled_collect_historical_data {
            historical_feasible_solutions.push(model.export_solution());
        }
        memory.update(model, &chosen_move, iteration as i64);
    }

    LocalSearchResult {
        incumbent_holder,
        memory,
        number_of_iterations,
        historical_feasible_solutions,
        user_callback_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabu_mip_model::expr::Expression;
    use tabu_mip_model::model::SetupConfig;

    #[test]
    fn test_descends_to_local_minimum() {
        let mut model = Model::new("descent");
        let x = model.add_variables("x", 5, 0, 3).expect("variables");
        model.minimize(Expression::sum_of(&x));
        for &v in &x {
            model.set_initial_value(v, 3);
        }
        let mut options = Options::default();
        options.is_enabled_presolve = false;
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");

        let mut neighborhood = Neighborhood::build(&model, 0);
        neighborhood.integer_mut().enable();
        let local_penalty = model.generate_constraint_parameter_proxies(1.0);
        let global_penalty = local_penalty.clone();
        let initial = model.export_solution().variable_value_proxies;
        let memory = Memory::new(&model);
        let time_keeper = TimeKeeper::new();

        let result = solve(
            &mut model,
            &mut neighborhood,
            &options,
            &time_keeper,
            &local_penalty,
            &global_penalty,
            &initial,
            IncumbentHolder::new(),
            memory,
        );

        // 5 variables stepped from 3 to 0, one unit per iteration.
        assert_eq!(result.number_of_iterations, 15);
        assert!(result.incumbent_holder.is_found_feasible_solution());
        assert_eq!(result.incumbent_holder.feasible_incumbent_objective(), 0.0);
        assert_eq!(result.memory.total_update_count(), 15);
    }
}
