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

//! Presolve: fixing and bound tightening before search.
//!
//! Runs repeated passes over the enabled linear constraints until a fix
//! point: constraints whose variables are all fixed are checked and
//! disabled, constraints with a single free variable either pin it
//! (equality) or tighten its bounds (inequalities). A final sweep fixes
//! variables that no enabled constraint mentions at the bound favored by
//! their objective sensitivity.

use crate::cons::{ConstraintSense, violation_of};
use crate::err::{InfeasibleBySetupError, ModelError};
use crate::model::Model;
use crate::var::VariableId;
use crate::{EPSILON, ScoreValue, VariableValue};

// Guard against pathological models; each pass either fixes or tightens.
const MAX_PASSES: usize = 1_000;

impl Model {
    pub(crate) fn presolve(&mut self) -> Result<(), ModelError> {
        for _ in 0..MAX_PASSES {
            if !self.presolve_pass()? {
                break;
            }
        }
        self.fix_implicit_variables();
        Ok(())
    }

    /// One pass; returns whether anything changed.
    fn presolve_pass(&mut self) -> Result<bool, ModelError> {
        let mut changed = false;

        for index in 0..self.constraints.len() {
            if !self.constraints[index].is_enabled()
                || !self.constraints[index].expression().is_linear()
            {
                continue;
            }

            let sense = self.constraints[index].sense();
            let name = self.constraints[index].name().to_string();

            let mut fixed_sum = self.constraints[index].expression().constant_term();
            let mut free: Option<(VariableId, ScoreValue)> = None;
            let mut free_count = 0usize;
            for (&variable, &coefficient) in
                self.constraints[index].expression().sensitivities()
            {
                if coefficient == 0.0 {
                    continue;
                }
                if self.variables[variable.get()].is_fixed() {
                    fixed_sum +=
                        coefficient * self.variable_values[variable.get()] as ScoreValue;
                } else {
                    free_count += 1;
                    free = Some((variable, coefficient));
                }
            }

            match free_count {
                0 => {
                    if violation_of(sense, fixed_sum) > EPSILON {
                        return Err(InfeasibleBySetupError::new(
                            name,
                            format!("all variables fixed with residual {}", fixed_sum),
                        )
                        .into());
                    }
                    self.constraints[index].disable();
                    changed = true;
                }
                1 => {
                    let (variable, coefficient) = free.expect("one free variable");
                    match sense {
                        ConstraintSense::Equal => {
                            let target = -fixed_sum / coefficient;
                            if (target - target.round()).abs() > EPSILON {
                                return Err(InfeasibleBySetupError::new(
                                    name,
                                    format!("forces non-integral value {}", target),
                                )
                                .into());
                            }
                            let value = target.round() as VariableValue;
                            let v = &self.variables[variable.get()];
                            if value < v.lower_bound() || value > v.upper_bound() {
                                return Err(InfeasibleBySetupError::new(
                                    name,
                                    format!("forces out-of-bounds value {}", value),
                                )
                                .into());
                            }
                            tracing::debug!(
                                "Presolve fixed {} to {} by {}.",
                                self.variable_label(variable),
                                value,
                                name
                            );
                            self.variables[variable.get()].fix_to(value);
                            self.variable_values[variable.get()] = value;
                            self.constraints[index].disable();
                            changed = true;
                        }
                        ConstraintSense::Lower | ConstraintSense::Upper => {
                            // coefficient · x + fixed_sum ⋈ 0
                            let bound = -fixed_sum / coefficient;
                            let tightens_upper = (sense == ConstraintSense::Lower)
                                == (coefficient > 0.0);
                            let v = &self.variables[variable.get()];
                            if tightens_upper {
                                let new_upper = (bound + EPSILON).floor() as VariableValue;
                                if new_upper < v.upper_bound() {
                                    let lower = v.lower_bound();
                                    if new_upper < lower {
                                        return Err(InfeasibleBySetupError::new(
                                            name,
                                            format!(
                                                "implies upper bound {} below lower bound {}",
                                                new_upper, lower
                                            ),
                                        )
                                        .into());
                                    }
                                    self.variables[variable.get()]
                                        .set_bounds(lower, new_upper);
                                    changed = true;
                                }
                            } else {
                                let new_lower = (bound - EPSILON).ceil() as VariableValue;
                                if new_lower > v.lower_bound() {
                                    let upper = v.upper_bound();
                                    if new_lower > upper {
                                        return Err(InfeasibleBySetupError::new(
                                            name,
                                            format!(
                                                "implies lower bound {} above upper bound {}",
                                                new_lower, upper
                                            ),
                                        )
                                        .into());
                                    }
                                    self.variables[variable.get()]
                                        .set_bounds(new_lower, upper);
                                    changed = true;
                                }
                            }
                            let v = &self.variables[variable.get()];
                            if !v.is_fixed() && v.lower_bound() == v.upper_bound() {
                                let value = v.lower_bound();
                                tracing::debug!(
                                    "Presolve fixed {} to {} by bound tightening.",
                                    self.variable_label(variable),
                                    value
                                );
                                self.variables[variable.get()].fix_to(value);
                                self.variable_values[variable.get()] = value;
                                changed = true;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(changed)
    }

    /// Fixes variables no enabled constraint mentions at the bound favored
    /// by the objective. Skipped entirely when any nonlinear piece could
    /// reference variables invisibly.
    fn fix_implicit_variables(&mut self) {
        if !self.is_linear() {
            return;
        }
        let sign = self.sign();
        for index in 0..self.variables.len() {
            if self.variables[index].is_fixed() {
                continue;
            }
            let has_enabled_constraint = self.variables[index]
                .related_constraints()
                .iter()
                .any(|&c| self.constraints[c.get()].is_enabled());
            if has_enabled_constraint {
                continue;
            }
            let minimized_sensitivity = sign * self.variables[index].objective_sensitivity();
            let value = if minimized_sensitivity > 0.0 {
                self.variables[index].lower_bound()
            } else if minimized_sensitivity < 0.0 {
                self.variables[index].upper_bound()
            } else {
                continue;
            };
            let id = self.variables[index].id();
            tracing::debug!(
                "Presolve fixed unconstrained {} to {}.",
                self.variable_label(id),
                value
            );
            self.variables[index].fix_to(value);
            self.variable_values[index] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expression;
    use crate::model::SetupConfig;

    #[test]
    fn test_presolve_fixes_chain_of_constraints() {
        // 2 x0 = 4, 3 x1 <= 10, 8 x1 >= 20, x1 + x2 + 1 = 8, minimize sum(x)
        let mut model = Model::new("presolve");
        let x = model.add_variables("x", 10, -10, 10).expect("variables");
        model
            .add_constraint("c0", Expression::term(2.0, x[0]).eq(4.0))
            .expect("c0");
        model
            .add_constraint("c1", Expression::term(3.0, x[1]).le(10.0))
            .expect("c1");
        model
            .add_constraint("c2", Expression::term(8.0, x[1]).ge(20.0))
            .expect("c2");
        model
            .add_constraint(
                "c3",
                (Expression::term(1.0, x[1])
                    + Expression::term(1.0, x[2])
                    + Expression::constant(1.0))
                .eq(8.0),
            )
            .expect("c3");
        model.minimize(Expression::sum_of(&x));

        model.setup(&SetupConfig::default()).expect("setup");

        assert_eq!(model.variable_value(x[0]), 2);
        assert_eq!(model.variable_value(x[1]), 3);
        assert_eq!(model.variable_value(x[2]), 4);
        for &v in &x[3..] {
            assert_eq!(model.variable_value(v), -10);
        }
        assert!(model.variables().iter().all(|v| v.is_fixed()));
        assert!(model.constraints().iter().all(|c| !c.is_enabled()));
    }

    #[test]
    fn test_presolve_detects_non_integral_equality() {
        let mut model = Model::new("bad");
        let x = model.add_scalar_variable("x", 0, 10).expect("variable");
        model
            .add_constraint("c", Expression::term(2.0, x).eq(5.0))
            .expect("c");
        model.minimize(Expression::term(1.0, x));
        let result = model.setup(&SetupConfig::default());
        assert!(matches!(result, Err(ModelError::InfeasibleBySetup(_))));
    }

    #[test]
    fn test_presolve_detects_crossed_bounds() {
        let mut model = Model::new("crossed");
        let x = model.add_scalar_variable("x", 0, 10).expect("variable");
        model
            .add_constraint("hi", Expression::term(1.0, x).le(3.0))
            .expect("hi");
        model
            .add_constraint("lo", Expression::term(1.0, x).ge(5.0))
            .expect("lo");
        model.minimize(Expression::term(1.0, x));
        let result = model.setup(&SetupConfig::default());
        assert!(matches!(result, Err(ModelError::InfeasibleBySetup(_))));
    }

    #[test]
    fn test_presolve_respects_disable_flag() {
        let mut model = Model::new("nopresolve");
        let x = model.add_scalar_variable("x", 0, 10).expect("variable");
        model
            .add_constraint("c", Expression::term(2.0, x).eq(4.0))
            .expect("c");
        model.minimize(Expression::term(1.0, x));
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");
        assert!(!model.variable(x).is_fixed());
        assert!(model.constraint(crate::cons::ConstraintId::new(0)).is_enabled());
    }

    #[test]
    fn test_objective_direction_drives_implicit_fixing() {
        let mut model = Model::new("maximize");
        let x = model.add_variables("x", 2, -5, 5).expect("variables");
        model.maximize(Expression::sum_of(&x));
        model.setup(&SetupConfig::default()).expect("setup");
        assert_eq!(model.variable_value(x[0]), 5);
        assert_eq!(model.variable_value(x[1]), 5);
    }
}
