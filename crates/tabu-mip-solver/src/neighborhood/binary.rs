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

use tabu_mip_model::model::Model;
use tabu_mip_model::mov::{Move, MoveSense};
use tabu_mip_model::var::{VariableClass, VariableId};

/// Flips each unfixed binary variable.
#[derive(Debug, Clone)]
pub struct BinaryMoveGenerator {
    is_enabled: bool,
    variable_ids: Vec<VariableId>,
}

impl BinaryMoveGenerator {
    pub fn build(model: &Model) -> Self {
        let variable_ids = model
            .variables()
            .iter()
            .filter(|v| v.class() == VariableClass::Binary && !v.is_fixed())
            .map(|v| v.id())
            .collect();
        Self {
            is_enabled: false,
            variable_ids,
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
        self.variable_ids.len()
    }

    pub fn generate(&self, model: &Model, out: &mut Vec<Move>) {
        for &id in &self.variable_ids {
            let value = model.variable_value(id);
            out.push(Move::new(MoveSense::Binary).with_alteration(id, 1 - value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabu_mip_model::expr::Expression;
    use tabu_mip_model::model::SetupConfig;

    #[test]
    fn test_flips_every_unfixed_binary() {
        let mut model = Model::new("binary");
        let x = model.add_variables("x", 3, 0, 1).expect("variables");
        let y = model.add_scalar_variable("y", 0, 5).expect("variable");
        model.minimize(Expression::sum_of(&x) + Expression::term(1.0, y));
        model.fix_variable(x[2], 1);
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");

        let mut generator = BinaryMoveGenerator::build(&model);
        generator.enable();
        assert_eq!(generator.number_of_candidates(), 2);

        let mut moves = Vec::new();
        generator.generate(&model, &mut moves);
        assert_eq!(moves.len(), 2);
        for mv in &moves {
            assert_eq!(mv.sense, MoveSense::Binary);
            assert_eq!(mv.alterations.len(), 1);
            let (id, value) = mv.alterations[0];
            assert!(!model.variable(id).is_fixed());
            assert_eq!(value, 1 - model.variable_value(id));
        }
    }
}
