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

use tabu_mip_model::cons::ConstraintClass;
use tabu_mip_model::model::Model;
use tabu_mip_model::mov::{Move, MoveSense};
use tabu_mip_model::var::VariableId;

/// A `x − y ⋈ k` pair.
#[derive(Debug, Clone, Copy)]
pub struct PrecedencePair {
    pub x: VariableId,
    pub y: VariableId,
}

/// Shifts both sides of a precedence constraint jointly by ±1, preserving
/// their difference.
#[derive(Debug, Clone)]
pub struct PrecedenceMoveGenerator {
    is_enabled: bool,
    pairs: Vec<PrecedencePair>,
}

impl PrecedenceMoveGenerator {
    pub fn build(model: &Model) -> Self {
        let mut pairs = Vec::new();
        for constraint in model.constraints() {
            if !constraint.is_enabled() || constraint.class() != ConstraintClass::Precedence {
                continue;
            }
            let terms: Vec<VariableId> = constraint
                .expression()
                .sensitivities()
                .keys()
                .copied()
                .collect();
            if model.variable(terms[0]).is_fixed() || model.variable(terms[1]).is_fixed() {
                continue;
            }
            pairs.push(PrecedencePair {
                x: terms[0],
                y: terms[1],
            });
        }
        Self {
            is_enabled: false,
            pairs,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    pub fn enable(&mut self) {
        self.is_enabled = true;
    }

    pub fn disable(&mut self) {
        self.is_enabled = false;
    }

    #[inline]
    pub fn number_of_candidates(&self) -> usize {
        self.pairs.len()
    }

    pub fn generate(&self, model: &Model, out: &mut Vec<Move>) {
        for pair in &self.pairs {
            let x = model.variable(pair.x);
            let y = model.variable(pair.y);
            let x_value = model.variable_value(pair.x);
            let y_value = model.variable_value(pair.y);

            if x_value < x.upper_bound() && y_value < y.upper_bound() {
                out.push(
                    Move::new(MoveSense::Precedence)
                        .with_alteration(pair.x, x_value + 1)
                        .with_alteration(pair.y, y_value + 1),
                );
            }
            if x_value > x.lower_bound() && y_value > y.lower_bound() {
                out.push(
                    Move::new(MoveSense::Precedence)
                        .with_alteration(pair.x, x_value - 1)
                        .with_alteration(pair.y, y_value - 1),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabu_mip_model::expr::Expression;
    use tabu_mip_model::model::SetupConfig;

    #[test]
    fn test_joint_shifts_within_bounds() {
        let mut model = Model::new("precedence");
        let x = model.add_scalar_variable("x", 0, 3).expect("x");
        let y = model.add_scalar_variable("y", 0, 3).expect("y");
        model
            .add_constraint(
                "prec",
                (Expression::term(1.0, x) - Expression::term(1.0, y)).le(1.0),
            )
            .expect("constraint");
        model.minimize(Expression::term(1.0, x) + Expression::term(1.0, y));
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");
        model.set_initial_value(x, 2);
        model.set_initial_value(y, 1);
        model.update();

        let mut generator = PrecedenceMoveGenerator::build(&model);
        generator.enable();
        assert_eq!(generator.number_of_candidates(), 1);

        let mut moves = Vec::new();
        generator.generate(&model, &mut moves);
        assert_eq!(moves.len(), 2);
        for mv in &moves {
            assert_eq!(mv.sense, MoveSense::Precedence);
            assert_eq!(mv.alterations.len(), 2);
            let dx = mv.altered_value(x).unwrap() - 2;
            let dy = mv.altered_value(y).unwrap() - 1;
            assert_eq!(dx, dy);
            assert!(dx == 1 || dx == -1);
        }
    }
}
