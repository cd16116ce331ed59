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

//! Sparse linear expressions with an optional opaque extension.
//!
//! An expression is a map `variable → coefficient` plus a constant. It is
//! linear iff no user function is attached; nonlinear expressions delegate
//! every evaluation to the function, which receives the candidate move and
//! the current variable values.

use crate::mov::Move;
use crate::var::VariableId;
use crate::{ScoreValue, VariableValue};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Opaque user function: evaluates the expression under `move` applied on
/// top of `values`. Called with the empty move for full re-evaluation.
pub type ExpressionFunction = Arc<dyn Fn(&Move, &[VariableValue]) -> ScoreValue + Send + Sync>;

#[derive(Clone, Default)]
pub struct Expression {
    sensitivities: BTreeMap<VariableId, ScoreValue>,
    constant: ScoreValue,
    value: ScoreValue,
    function: Option<ExpressionFunction>,
}

impl std::fmt::Debug for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expression")
            .field("sensitivities", &self.sensitivities)
            .field("constant", &self.constant)
            .field("value", &self.value)
            .field("is_linear", &self.function.is_none())
            .finish()
    }
}

impl Expression {
    pub fn new() -> Self {
        Self::default()
    }

    /// The constant expression `c`.
    pub fn constant(c: ScoreValue) -> Self {
        Self {
            constant: c,
            ..Self::default()
        }
    }

    /// The single-term expression `coefficient · variable`.
    pub fn term(coefficient: ScoreValue, variable: VariableId) -> Self {
        let mut e = Self::new();
        e.add_term(variable, coefficient);
        e
    }

    /// `Σ variables` with unit coefficients.
    pub fn sum_of(variables: &[VariableId]) -> Self {
        let mut e = Self::new();
        for &v in variables {
            e.add_term(v, 1.0);
        }
        e
    }

    /// An expression evaluated exclusively through a user function.
    pub fn from_function(function: ExpressionFunction) -> Self {
        Self {
            function: Some(function),
            ..Self::default()
        }
    }

    /// Accumulates `coefficient` onto the entry of `variable`. Zero results
    /// are kept; sparsity is decided by the caller, not by cancellation.
    pub fn add_term(&mut self, variable: VariableId, coefficient: ScoreValue) {
        *self.sensitivities.entry(variable).or_insert(0.0) += coefficient;
    }

    #[inline]
    pub fn sensitivities(&self) -> &BTreeMap<VariableId, ScoreValue> {
        &self.sensitivities
    }

    /// Coefficient of `variable`, zero if absent.
    #[inline]
    pub fn sensitivity(&self, variable: VariableId) -> ScoreValue {
        self.sensitivities.get(&variable).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn constant_term(&self) -> ScoreValue {
        self.constant
    }

    pub fn set_constant(&mut self, constant: ScoreValue) {
        self.constant = constant;
    }

    #[inline]
    pub fn value(&self) -> ScoreValue {
        self.value
    }

    pub fn set_value(&mut self, value: ScoreValue) {
        self.value = value;
    }

    #[inline]
    pub fn is_linear(&self) -> bool {
        self.function.is_none()
    }

    #[inline]
    pub fn function(&self) -> Option<&ExpressionFunction> {
        self.function.as_ref()
    }

    pub fn set_function(&mut self, function: ExpressionFunction) {
        self.function = Some(function);
    }

    #[inline]
    pub fn number_of_terms(&self) -> usize {
        self.sensitivities.len()
    }

    /// Linear value under the current `values`, ignoring any user function.
    pub fn evaluate_linear(&self, values: &[VariableValue]) -> ScoreValue {
        let mut total = self.constant;
        for (&variable, &coefficient) in &self.sensitivities {
            total += coefficient * values[variable.get()] as ScoreValue;
        }
        total
    }

    /// Value under `mv` applied on top of `values`. Nonlinear expressions
    /// delegate to the user function.
    pub fn evaluate(&self, mv: &Move, values: &[VariableValue]) -> ScoreValue {
        if let Some(function) = &self.function {
            return function(mv, values);
        }
        let mut total = self.constant;
        for (&variable, &coefficient) in &self.sensitivities {
            let value = mv
                .altered_value(variable)
                .unwrap_or(values[variable.get()]);
            total += coefficient * value as ScoreValue;
        }
        total
    }

    /// `Σ coefficient · (new − old)` over the alterations of `mv`. Only
    /// meaningful for linear expressions.
    pub fn linear_delta(&self, mv: &Move, values: &[VariableValue]) -> ScoreValue {
        debug_assert!(self.is_linear());
        let mut delta = 0.0;
        for &(variable, new_value) in &mv.alterations {
            let coefficient = self.sensitivity(variable);
            if coefficient != 0.0 {
                delta += coefficient * (new_value - values[variable.get()]) as ScoreValue;
            }
        }
        delta
    }
}

impl std::ops::Add for Expression {
    type Output = Expression;

    fn add(mut self, rhs: Expression) -> Expression {
        for (variable, coefficient) in rhs.sensitivities {
            self.add_term(variable, coefficient);
        }
        self.constant += rhs.constant;
        self
    }
}

impl std::ops::Sub for Expression {
    type Output = Expression;

    fn sub(mut self, rhs: Expression) -> Expression {
        for (variable, coefficient) in rhs.sensitivities {
            self.add_term(variable, -coefficient);
        }
        self.constant -= rhs.constant;
        self
    }
}

impl std::ops::AddAssign for Expression {
    fn add_assign(&mut self, rhs: Expression) {
        for (variable, coefficient) in rhs.sensitivities {
            self.add_term(variable, coefficient);
        }
        self.constant += rhs.constant;
    }
}

impl std::ops::Mul<ScoreValue> for Expression {
    type Output = Expression;

    fn mul(mut self, rhs: ScoreValue) -> Expression {
        for coefficient in self.sensitivities.values_mut() {
            *coefficient *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl std::ops::Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        self * -1.0
    }
}
