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

//! Candidate perturbations.
//!
//! A [`Move`] is an ordered list of `(variable, new value)` alterations
//! tagged with the neighborhood kind that produced it. Moves are evaluated
//! against the model without mutating it; applying a move is a separate,
//! explicit step.

use crate::cons::ConstraintId;
use crate::var::VariableId;
use crate::VariableValue;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveSense {
    Binary,
    Integer,
    Selection,
    Aggregation,
    Precedence,
    VariableBound,
    Exclusive,
    Chain,
    UserDefined,
}

pub type Alteration = (VariableId, VariableValue);

#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    pub sense: MoveSense,
    pub alterations: SmallVec<[Alteration; 2]>,
    /// Constraints whose value the move may change, when the generator knows
    /// the topology. When absent, evaluation unions the related constraints
    /// of the altered variables.
    pub related_constraints: Option<Vec<ConstraintId>>,
}

impl Move {
    pub fn new(sense: MoveSense) -> Self {
        Self {
            sense,
            alterations: SmallVec::new(),
            related_constraints: None,
        }
    }

    /// The empty move, used to score or refresh the current state as-is.
    pub fn noop() -> Self {
        Self::new(MoveSense::UserDefined)
    }

    pub fn with_alteration(mut self, variable: VariableId, value: VariableValue) -> Self {
        self.alterations.push((variable, value));
        self
    }

    pub fn with_related_constraints(mut self, constraints: Vec<ConstraintId>) -> Self {
        self.related_constraints = Some(constraints);
        self
    }

    #[inline]
    pub fn push(&mut self, variable: VariableId, value: VariableValue) {
        self.alterations.push((variable, value));
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.alterations.is_empty()
    }

    #[inline]
    pub fn alters(&self, variable: VariableId) -> bool {
        self.alterations.iter().any(|&(v, _)| v == variable)
    }

    /// New value of `variable` under this move, if altered.
    #[inline]
    pub fn altered_value(&self, variable: VariableId) -> Option<VariableValue> {
        self.alterations
            .iter()
            .find(|&&(v, _)| v == variable)
            .map(|&(_, value)| value)
    }

    /// The move that undoes this one, given the values in force before it
    /// was applied.
    pub fn inverse(&self, values_before: &[VariableValue]) -> Self {
        let mut inverse = Move::new(self.sense);
        for &(variable, _) in self.alterations.iter().rev() {
            inverse.push(variable, values_before[variable.get()]);
        }
        inverse.related_constraints = self.related_constraints.clone();
        inverse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_queries() {
        let mv = Move::new(MoveSense::Selection)
            .with_alteration(VariableId::new(2), 0)
            .with_alteration(VariableId::new(5), 1);
        assert_eq!(mv.sense, MoveSense::Selection);
        assert_eq!(mv.alterations.len(), 2);
        assert!(mv.alters(VariableId::new(5)));
        assert!(!mv.alters(VariableId::new(3)));
        assert_eq!(mv.altered_value(VariableId::new(2)), Some(0));
        assert_eq!(mv.altered_value(VariableId::new(3)), None);
    }

    #[test]
    fn test_noop_is_empty() {
        assert!(Move::noop().is_empty());
    }

    #[test]
    fn test_inverse_restores_old_values() {
        let values = vec![4i64, 7, -1];
        let mv = Move::new(MoveSense::Integer)
            .with_alteration(VariableId::new(0), 5)
            .with_alteration(VariableId::new(2), 0);
        let inv = mv.inverse(&values);
        assert_eq!(inv.altered_value(VariableId::new(0)), Some(4));
        assert_eq!(inv.altered_value(VariableId::new(2)), Some(-1));
        assert_eq!(inv.alterations.len(), 2);
    }
}
