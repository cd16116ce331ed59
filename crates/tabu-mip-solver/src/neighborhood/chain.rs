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

use std::collections::VecDeque;
use tabu_mip_model::model::Model;
use tabu_mip_model::mov::{Move, MoveSense};

/// Replays past accepted multi-variable moves from a bounded FIFO.
/// No deduplication: a move pushed twice sits in the buffer twice.
#[derive(Debug, Clone)]
pub struct ChainMoveGenerator {
    is_enabled: bool,
    capacity: usize,
    buffer: VecDeque<Move>,
}

impl ChainMoveGenerator {
    pub fn new(capacity: usize) -> Self {
        Self {
            is_enabled: false,
            capacity,
            buffer: VecDeque::new(),
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
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Seeds the buffer with an accepted move; moves altering fewer than
    /// two variables are not worth replaying.
    pub fn register(&mut self, mv: &Move) {
        if self.capacity == 0 || mv.alterations.len() < 2 {
            return;
        }
        let mut stored = mv.clone();
        stored.sense = MoveSense::Chain;
        stored.related_constraints = None;
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(stored);
    }

    pub fn generate(&self, model: &Model, out: &mut Vec<Move>) {
        for stored in &self.buffer {
            let mut changes_something = false;
            let mut valid = true;
            for &(variable, value) in &stored.alterations {
                let v = model.variable(variable);
                if v.is_fixed() || value < v.lower_bound() || value > v.upper_bound() {
                    valid = false;
                    break;
                }
                if model.variable_value(variable) != value {
                    changes_something = true;
                }
            }
            if valid && changes_something {
                out.push(stored.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabu_mip_model::expr::Expression;
    use tabu_mip_model::model::SetupConfig;

    fn model() -> (Model, Vec<tabu_mip_model::var::VariableId>) {
        let mut model = Model::new("chain");
        let x = model.add_variables("x", 3, 0, 1).expect("variables");
        model.minimize(Expression::sum_of(&x));
        model
            .setup(&SetupConfig {
                is_enabled_presolve: false,
                ..SetupConfig::default()
            })
            .expect("setup");
        (model, x)
    }

    #[test]
    fn test_fifo_eviction_without_deduplication() {
        let (_, x) = model();
        let mut chain = ChainMoveGenerator::new(2);
        let mv = Move::new(MoveSense::Selection)
            .with_alteration(x[0], 1)
            .with_alteration(x[1], 0);

        chain.register(&mv);
        chain.register(&mv);
        assert_eq!(chain.len(), 2);

        let other = Move::new(MoveSense::Selection)
            .with_alteration(x[1], 1)
            .with_alteration(x[2], 0);
        chain.register(&other);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_single_variable_moves_are_not_stored() {
        let (_, x) = model();
        let mut chain = ChainMoveGenerator::new(4);
        chain.register(&Move::new(MoveSense::Binary).with_alteration(x[0], 1));
        assert!(chain.is_empty());
    }

    #[test]
    fn test_replay_skips_no_ops() {
        let (mut model, x) = model();
        let mut chain = ChainMoveGenerator::new(4);
        let mv = Move::new(MoveSense::Selection)
            .with_alteration(x[0], 1)
            .with_alteration(x[1], 1);
        chain.register(&mv);

        let mut moves = Vec::new();
        chain.generate(&model, &mut moves);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].sense, MoveSense::Chain);

        // Apply the stored state: the replay becomes a no-op and is skipped.
        model.set_initial_value(x[0], 1);
        model.set_initial_value(x[1], 1);
        model.update();
        moves.clear();
        chain.generate(&model, &mut moves);
        assert!(moves.is_empty());
    }
}
