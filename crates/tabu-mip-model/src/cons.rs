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

//! Constraints and their structural classification.
//!
//! A constraint stores its expression folded to the form `e ⋈ 0`: `Lower`
//! means `e ≤ 0`, `Upper` means `e ≥ 0`. The classification assigned at
//! setup drives which structural neighborhood moves apply.

use crate::expr::Expression;
use crate::var::{Variable, VariableClass};
use crate::{EPSILON, ScoreValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstraintId(usize);

impl ConstraintId {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn get(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConstraintId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintSense {
    /// `e ≤ 0`
    Lower,
    /// `e = 0`
    Equal,
    /// `e ≥ 0`
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintClass {
    Singleton,
    Aggregation,
    Precedence,
    VariableBound,
    SetPartitioning,
    SetPacking,
    SetCovering,
    Cardinality,
    InvariantKnapsack,
    EquationKnapsack,
    BinPacking,
    Knapsack,
    IntegerKnapsack,
    GeneralLinear,
    Nonlinear,
}

/// Expression plus sense, produced by the relational finishers on
/// [`Expression`]-like builders and consumed by `Model::add_constraint`.
#[derive(Debug, Clone)]
pub struct ConstraintSpec {
    pub expression: Expression,
    pub sense: ConstraintSense,
}

impl Expression {
    /// `self = rhs`
    pub fn eq(mut self, rhs: ScoreValue) -> ConstraintSpec {
        self.set_constant(self.constant_term() - rhs);
        ConstraintSpec {
            expression: self,
            sense: ConstraintSense::Equal,
        }
    }

    /// `self ≤ rhs`
    pub fn le(mut self, rhs: ScoreValue) -> ConstraintSpec {
        self.set_constant(self.constant_term() - rhs);
        ConstraintSpec {
            expression: self,
            sense: ConstraintSense::Lower,
        }
    }

    /// `self ≥ rhs`
    pub fn ge(mut self, rhs: ScoreValue) -> ConstraintSpec {
        self.set_constant(self.constant_term() - rhs);
        ConstraintSpec {
            expression: self,
            sense: ConstraintSense::Upper,
        }
    }
}

/// Nonnegative violation of `e ⋈ 0` at expression value `e`.
#[inline]
pub fn violation_of(sense: ConstraintSense, e: ScoreValue) -> ScoreValue {
    match sense {
        ConstraintSense::Lower => e.max(0.0),
        ConstraintSense::Equal => e.abs(),
        ConstraintSense::Upper => (-e).max(0.0),
    }
}

#[derive(Debug, Clone)]
pub struct Constraint {
    id: ConstraintId,
    proxy_id: usize,
    flat_index: usize,
    name: String,
    expression: Expression,
    sense: ConstraintSense,
    is_enabled: bool,
    constraint_value: ScoreValue,
    violation_value: ScoreValue,
    class: ConstraintClass,
}

impl Constraint {
    pub fn new(
        id: ConstraintId,
        proxy_id: usize,
        flat_index: usize,
        name: impl Into<String>,
        expression: Expression,
        sense: ConstraintSense,
    ) -> Self {
        Self {
            id,
            proxy_id,
            flat_index,
            name: name.into(),
            expression,
            sense,
            is_enabled: true,
            constraint_value: 0.0,
            violation_value: 0.0,
            class: ConstraintClass::GeneralLinear,
        }
    }

    #[inline]
    pub fn id(&self) -> ConstraintId {
        self.id
    }

    #[inline]
    pub fn proxy_id(&self) -> usize {
        self.proxy_id
    }

    #[inline]
    pub fn flat_index(&self) -> usize {
        self.flat_index
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    #[inline]
    pub fn expression_mut(&mut self) -> &mut Expression {
        &mut self.expression
    }

    #[inline]
    pub fn sense(&self) -> ConstraintSense {
        self.sense
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
    pub fn constraint_value(&self) -> ScoreValue {
        self.constraint_value
    }

    #[inline]
    pub fn violation_value(&self) -> ScoreValue {
        self.violation_value
    }

    #[inline]
    pub fn is_violated(&self) -> bool {
        self.violation_value > EPSILON
    }

    /// Caches `e` and the violation derived from it.
    pub fn update_from_value(&mut self, e: ScoreValue) {
        self.expression.set_value(e);
        self.constraint_value = e;
        self.violation_value = violation_of(self.sense, e);
    }

    #[inline]
    pub fn class(&self) -> ConstraintClass {
        self.class
    }

    /// Assigns the structural class. `variables` is the model arena; only
    /// class and bounds of the referenced variables are consulted.
    pub fn classify(&mut self, variables: &[Variable]) {
        self.class = classify_constraint(&self.expression, self.sense, variables);
    }
}

fn classify_constraint(
    expression: &Expression,
    sense: ConstraintSense,
    variables: &[Variable],
) -> ConstraintClass {
    if !expression.is_linear() {
        return ConstraintClass::Nonlinear;
    }

    let terms = expression.number_of_terms();
    if terms == 0 {
        return ConstraintClass::GeneralLinear;
    }
    if terms == 1 {
        return ConstraintClass::Singleton;
    }

    let all_binary = expression
        .sensitivities()
        .keys()
        .all(|&v| variables[v.get()].has_binary_bounds());
    let all_unit = expression.sensitivities().values().all(|&c| c == 1.0);

    if terms == 2 {
        if sense == ConstraintSense::Equal {
            return ConstraintClass::Aggregation;
        }
        let coefficients: Vec<ScoreValue> =
            expression.sensitivities().values().copied().collect();
        let is_difference = (coefficients[0] == 1.0 && coefficients[1] == -1.0)
            || (coefficients[0] == -1.0 && coefficients[1] == 1.0);
        if is_difference && !all_binary {
            return ConstraintClass::Precedence;
        }
        if all_binary {
            return ConstraintClass::VariableBound;
        }
    }

    // The folded form is `e + constant ⋈ 0`; the classical right-hand side.
    let rhs = -expression.constant_term();
    let rhs_is_integral = (rhs - rhs.round()).abs() < EPSILON;

    if all_binary {
        if all_unit && rhs_is_integral && rhs.round() == 1.0 {
            match sense {
                ConstraintSense::Equal => return ConstraintClass::SetPartitioning,
                ConstraintSense::Lower => return ConstraintClass::SetPacking,
                ConstraintSense::Upper => return ConstraintClass::SetCovering,
            }
        }
        if all_unit && rhs_is_integral && rhs.round() >= 2.0 {
            match sense {
                ConstraintSense::Equal => return ConstraintClass::Cardinality,
                ConstraintSense::Lower => return ConstraintClass::InvariantKnapsack,
                ConstraintSense::Upper => {}
            }
        }
        if sense == ConstraintSense::Equal {
            return ConstraintClass::EquationKnapsack;
        }
        let negatives = expression
            .sensitivities()
            .values()
            .filter(|&&c| c < 0.0)
            .count();
        let positives = terms - negatives;
        if (sense == ConstraintSense::Lower && negatives == 1 && positives >= 2)
            || (sense == ConstraintSense::Upper && positives == 1 && negatives >= 2)
        {
            return ConstraintClass::BinPacking;
        }
        return ConstraintClass::Knapsack;
    }

    if sense != ConstraintSense::Equal {
        return ConstraintClass::IntegerKnapsack;
    }
    ConstraintClass::GeneralLinear
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::VariableId;

    fn binary_variables(n: usize) -> Vec<Variable> {
        (0..n)
            .map(|i| Variable::new(VariableId::new(i), 0, i, 0, 1))
            .collect()
    }

    fn integer_variables(n: usize) -> Vec<Variable> {
        (0..n)
            .map(|i| Variable::new(VariableId::new(i), 0, i, -10, 10))
            .collect()
    }

    fn classify(spec: ConstraintSpec, variables: &[Variable]) -> ConstraintClass {
        let mut c = Constraint::new(
            ConstraintId::new(0),
            0,
            0,
            "c",
            spec.expression,
            spec.sense,
        );
        c.classify(variables);
        c.class()
    }

    #[test]
    fn test_violation_per_sense() {
        assert_eq!(violation_of(ConstraintSense::Lower, 2.0), 2.0);
        assert_eq!(violation_of(ConstraintSense::Lower, -2.0), 0.0);
        assert_eq!(violation_of(ConstraintSense::Upper, -3.0), 3.0);
        assert_eq!(violation_of(ConstraintSense::Upper, 3.0), 0.0);
        assert_eq!(violation_of(ConstraintSense::Equal, -1.5), 1.5);
        assert_eq!(violation_of(ConstraintSense::Equal, 1.5), 1.5);
    }

    #[test]
    fn test_relational_finishers_fold_rhs() {
        let v = VariableId::new(0);
        let spec = Expression::term(3.0, v).le(10.0);
        assert_eq!(spec.sense, ConstraintSense::Lower);
        assert_eq!(spec.expression.constant_term(), -10.0);

        let spec = Expression::term(3.0, v).ge(10.0);
        assert_eq!(spec.sense, ConstraintSense::Upper);

        let spec = Expression::term(3.0, v).eq(10.0);
        assert_eq!(spec.sense, ConstraintSense::Equal);
    }

    #[test]
    fn test_update_from_value_caches_violation() {
        let mut c = Constraint::new(
            ConstraintId::new(0),
            0,
            0,
            "c",
            Expression::term(1.0, VariableId::new(0)),
            ConstraintSense::Lower,
        );
        c.update_from_value(4.0);
        assert_eq!(c.constraint_value(), 4.0);
        assert_eq!(c.violation_value(), 4.0);
        assert!(c.is_violated());
        c.update_from_value(-4.0);
        assert_eq!(c.violation_value(), 0.0);
        assert!(!c.is_violated());
    }

    #[test]
    fn test_classification_structural_kinds() {
        let bin = binary_variables(6);
        let int = integer_variables(6);
        let v = |i: usize| VariableId::new(i);

        // Singleton
        let spec = Expression::term(2.0, v(0)).eq(4.0);
        assert_eq!(classify(spec, &int), ConstraintClass::Singleton);

        // Aggregation: 2 x + 3 y = 12
        let spec = (Expression::term(2.0, v(0)) + Expression::term(3.0, v(1))).eq(12.0);
        assert_eq!(classify(spec, &int), ConstraintClass::Aggregation);

        // Precedence: x - y <= 3 on integers
        let spec = (Expression::term(1.0, v(0)) + Expression::term(-1.0, v(1))).le(3.0);
        assert_eq!(classify(spec, &int), ConstraintClass::Precedence);

        // Variable bound: 2 x + 3 y <= 4 on binaries
        let spec = (Expression::term(2.0, v(0)) + Expression::term(3.0, v(1))).le(4.0);
        assert_eq!(classify(spec, &bin), ConstraintClass::VariableBound);
    }

    #[test]
    fn test_classification_set_families() {
        let bin = binary_variables(4);
        let vars: Vec<VariableId> = (0..4).map(VariableId::new).collect();

        let spec = Expression::sum_of(&vars).eq(1.0);
        assert_eq!(classify(spec, &bin), ConstraintClass::SetPartitioning);

        let spec = Expression::sum_of(&vars).le(1.0);
        assert_eq!(classify(spec, &bin), ConstraintClass::SetPacking);

        let spec = Expression::sum_of(&vars).ge(1.0);
        assert_eq!(classify(spec, &bin), ConstraintClass::SetCovering);

        let spec = Expression::sum_of(&vars).eq(2.0);
        assert_eq!(classify(spec, &bin), ConstraintClass::Cardinality);

        let spec = Expression::sum_of(&vars).le(2.0);
        assert_eq!(classify(spec, &bin), ConstraintClass::InvariantKnapsack);
    }

    #[test]
    fn test_classification_knapsack_families() {
        let bin = binary_variables(4);
        let int = integer_variables(4);
        let v = |i: usize| VariableId::new(i);

        let weighted = Expression::term(2.0, v(0))
            + Expression::term(3.0, v(1))
            + Expression::term(5.0, v(2));

        let spec = weighted.clone().le(7.0);
        assert_eq!(classify(spec, &bin), ConstraintClass::Knapsack);

        let spec = weighted.clone().eq(7.0);
        assert_eq!(classify(spec, &bin), ConstraintClass::EquationKnapsack);

        // Bin packing: items minus capacity slot
        let spec = (Expression::term(2.0, v(0))
            + Expression::term(3.0, v(1))
            + Expression::term(-6.0, v(2)))
        .le(0.0);
        assert_eq!(classify(spec, &bin), ConstraintClass::BinPacking);

        let spec = weighted.clone().le(7.0);
        assert_eq!(classify(spec, &int), ConstraintClass::IntegerKnapsack);

        let spec = weighted.eq(7.0);
        assert_eq!(classify(spec, &int), ConstraintClass::GeneralLinear);
    }

    #[test]
    fn test_nonlinear_falls_through() {
        use std::sync::Arc;
        let f: crate::expr::ExpressionFunction = Arc::new(|_, _| 0.0);
        let spec = ConstraintSpec {
            expression: Expression::from_function(f),
            sense: ConstraintSense::Equal,
        };
        let vars = binary_variables(1);
        assert_eq!(classify(spec, &vars), ConstraintClass::Nonlinear);
    }
}
