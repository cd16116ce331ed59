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

/// For each selection group, swaps the selected member against every other
/// member: `{selected → 0, candidate → 1}`.
#[derive(Debug, Clone, Default)]
pub struct SelectionMoveGenerator {
    is_enabled: bool,
}

impl SelectionMoveGenerator {
    pub fn new() -> Self {
        Self::default()
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

    pub fn generate(&self, model: &Model, out: &mut Vec<Move>) {
        for selection in model.selections() {
            if selection.is_empty() {
                continue;
            }
            let Some(selected) = selection
                .variable_ids()
                .iter()
                .copied()
                .find(|&v| model.variable_value(v) == 1)
            else {
                continue;
            };
            if model.variable(selected).is_fixed() {
                continue;
            }
            for &candidate in selection.variable_ids() {
                if candidate == selected || model.variable(candidate).is_fixed() {
                    continue;
                }
                out.push(
                    Move::new(MoveSense::Selection)
                        .with_alteration(selected, 0)
                        .with_alteration(candidate, 1),
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
    use tabu_mip_model::selection::SelectionMode;

    #[test]
    fn test_swaps_selected_against_each_other_member() {
        let mut model = Model::new("selection");
        let x = model.add_variables("x", 4, 0, 1).expect("variables");
        model
            .add_constraint("partition", Expression::sum_of(&x).eq(1.0))
            .expect("constraint");
        model.minimize(Expression::sum_of(&x));
        model.set_initial_value(x[1], 1);
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                is_enabled_initial_value_correction: true,
                selection_mode: SelectionMode::Defined,
            })
            .expect("setup");

        let mut generator = SelectionMoveGenerator::new();
        generator.enable();
        let mut moves = Vec::new();
        generator.generate(&model, &mut moves);

        assert_eq!(moves.len(), 3);
        for mv in &moves {
            assert_eq!(mv.sense, MoveSense::Selection);
            assert_eq!(mv.alterations.len(), 2);
            assert_eq!(mv.alterations[0], (x[1], 0));
            assert_eq!(mv.alterations[1].1, 1);
        }
    }
}
