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

//! Subgradient Lagrange dual bootstrap.
//!
//! Only for linear, selection-free models. Each iteration minimizes the
//! Lagrangian separably per variable (a box step driven by the reduced
//! cost), evaluates that primal point against the penalized objectives, and
//! takes a subgradient step on the multipliers. The step size extends on
//! dual improvement and shrinks otherwise.

use crate::incumbent::IncumbentHolder;
use crate::option::Options;
use crate::time::TimeKeeper;
use tabu_mip_model::cons::ConstraintSense;
use tabu_mip_model::model::Model;
use tabu_mip_model::mov::Move;
use tabu_mip_model::proxy::ValueProxy;
use tabu_mip_model::solution::Solution;
use tabu_mip_model::{ScoreValue, VariableValue};

#[derive(Debug)]
pub struct LagrangeDualResult {
    pub incumbent_holder: IncumbentHolder,
    pub number_of_iterations: usize,
    pub historical_feasible_solutions: Vec<Solution>,
}

#[tracing::instrument(level = "debug", name = "Lagrange Dual", skip_all)]
pub fn solve(
    model: &mut Model,
    options: &Options,
    time_keeper: &TimeKeeper,
    local_penalty: &[ValueProxy<ScoreValue>],
    global_penalty: &[ValueProxy<ScoreValue>],
    initial_variable_values: &[ValueProxy<VariableValue>],
    mut incumbent_holder: IncumbentHolder,
) -> LagrangeDualResult {
    debug_assert!(model.is_linear());
    let phase_options = &options.lagrange_dual;

    model.import_variable_values(initial_variable_values);
    model.update();

    let mut multipliers: Vec<ValueProxy<ScoreValue>> =
        model.generate_constraint_parameter_proxies(0.0);
    let mut step_size = phase_options.initial_step_size;
    let mut best_dual = f64::NEG_INFINITY;
    let mut number_of_iterations = 0usize;
    let mut historical_feasible_solutions = Vec::new();

    let variable_count = model.number_of_variables();
    let mut primal: Vec<VariableValue> = model.current_values().to_vec();

    for iteration in 0..phase_options.iteration_max {
        let elapsed = time_keeper.elapsed();
        if elapsed > options.time_max
            || elapsed - phase_options.time_offset > phase_options.time_max
        {
            tracing::debug!("Lagrange dual stopped on time budget at iteration {}.", iteration);
            break;
        }

        // Separable primal step: move each variable to the bound its
        // reduced cost favors.
        let sign = model.sign();
        for index in 0..variable_count {
            let variable = &model.variables()[index];
            if variable.is_fixed() {
                continue;
            }
            let mut reduced_cost = sign * variable.objective_sensitivity();
            for &constraint_id in variable.related_constraints() {
                let constraint = model.constraint(constraint_id);
                if !constraint.is_enabled() {
                    continue;
                }
                reduced_cost += multipliers[constraint.proxy_id()][constraint.flat_index()]
                    * variable.constraint_sensitivity(constraint_id);
            }
            if reduced_cost > 0.0 {
                primal[index] = variable.lower_bound();
            } else if reduced_cost < 0.0 {
                primal[index] = variable.upper_bound();
            }
        }

        let bulk = {
            let mut mv = Move::noop();
            for (index, &value) in primal.iter().enumerate() {
                if model.current_values()[index] != value {
                    mv.push(tabu_mip_model::var::VariableId::new(index), value);
                }
            }
            mv
        };
        model.apply(&bulk);

        let score = model.evaluate(&Move::noop(), local_penalty, global_penalty);
        incumbent_holder.try_update(model, &score);
        if score.is_feasible && options.is_enabled_collect_historical_data {
            historical_feasible_solutions.push(model.export_solution());
        }
        number_of_iterations = iteration + 1;

        // Dual value: minimized objective plus multiplier-weighted residuals.
        let mut dual = model.sign() * model.objective_value();
        for constraint in model.constraints() {
            if !constraint.is_enabled() {
                continue;
            }
            dual += multipliers[constraint.proxy_id()][constraint.flat_index()]
                * constraint.constraint_value();
        }

        if dual > best_dual + phase_options.tolerance {
            best_dual = dual;
            step_size *= phase_options.step_size_extend_rate;
        } else {
            step_size *= phase_options.step_size_shrink_rate;
        }

        // Subgradient step with sense-appropriate projection.
        for constraint in model.constraints() {
            if !constraint.is_enabled() {
                continue;
            }
            let entry =
                &mut multipliers[constraint.proxy_id()][constraint.flat_index()];
            let stepped = *entry + step_size * constraint.constraint_value();
            *entry = match constraint.sense() {
                ConstraintSense::Lower => stepped.max(0.0),
                ConstraintSense::Upper => stepped.min(0.0),
                ConstraintSense::Equal => stepped,
            };
        }

        if step_size < phase_options.tolerance {
            tracing::debug!("Lagrange dual converged at iteration {}.", iteration);
            break;
        }
    }

    LagrangeDualResult {
        incumbent_holder,
        number_of_iterations,
        historical_feasible_solutions,
    }
}
