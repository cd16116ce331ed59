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

use crate::VariableValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvalidNameError {
    name: String,
}

impl InvalidNameError {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "The name \"{}\" contains whitespace.", self.name)
    }
}

impl std::error::Error for InvalidNameError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapacityExceededError {
    requested: usize,
    capacity: usize,
}

impl CapacityExceededError {
    pub fn new(requested: usize, capacity: usize) -> Self {
        Self {
            requested,
            capacity,
        }
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Display for CapacityExceededError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Creating proxy {} exceeds the configured capacity of {}",
            self.requested, self.capacity
        )
    }
}

impl std::error::Error for CapacityExceededError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoDecisionVariablesError;

impl std::fmt::Display for NoDecisionVariablesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "The model has no decision variables.")
    }
}

impl std::error::Error for NoDecisionVariablesError {}

#[derive(Debug, Clone, PartialEq)]
pub struct InconsistentInitialValueError {
    variable_name: String,
    detail: String,
    value: VariableValue,
}

impl InconsistentInitialValueError {
    pub fn new(
        variable_name: impl Into<String>,
        detail: impl Into<String>,
        value: VariableValue,
    ) -> Self {
        Self {
            variable_name: variable_name.into(),
            detail: detail.into(),
            value,
        }
    }

    pub fn variable_name(&self) -> &str {
        &self.variable_name
    }

    pub fn value(&self) -> VariableValue {
        self.value
    }
}

impl std::fmt::Display for InconsistentInitialValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Inconsistent initial value {} for variable {}: {}",
            self.value, self.variable_name, self.detail
        )
    }
}

impl std::error::Error for InconsistentInitialValueError {}

#[derive(Debug, Clone, PartialEq)]
pub struct InfeasibleBySetupError {
    constraint_name: String,
    detail: String,
}

impl InfeasibleBySetupError {
    pub fn new(constraint_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            constraint_name: constraint_name.into(),
            detail: detail.into(),
        }
    }

    pub fn constraint_name(&self) -> &str {
        &self.constraint_name
    }
}

impl std::fmt::Display for InfeasibleBySetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Presolve proved the model infeasible at constraint {}: {}",
            self.constraint_name, self.detail
        )
    }
}

impl std::error::Error for InfeasibleBySetupError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    InvalidName(InvalidNameError),
    CapacityExceeded(CapacityExceededError),
    NoDecisionVariables(NoDecisionVariablesError),
    InconsistentInitialValue(InconsistentInitialValueError),
    InfeasibleBySetup(InfeasibleBySetupError),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::InvalidName(e) => write!(f, "{}", e),
            ModelError::CapacityExceeded(e) => write!(f, "{}", e),
            ModelError::NoDecisionVariables(e) => write!(f, "{}", e),
            ModelError::InconsistentInitialValue(e) => write!(f, "{}", e),
            ModelError::InfeasibleBySetup(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ModelError {}

impl From<InvalidNameError> for ModelError {
    fn from(err: InvalidNameError) -> Self {
        ModelError::InvalidName(err)
    }
}

impl From<CapacityExceededError> for ModelError {
    fn from(err: CapacityExceededError) -> Self {
        ModelError::CapacityExceeded(err)
    }
}

impl From<NoDecisionVariablesError> for ModelError {
    fn from(err: NoDecisionVariablesError) -> Self {
        ModelError::NoDecisionVariables(err)
    }
}

impl From<InconsistentInitialValueError> for ModelError {
    fn from(err: InconsistentInitialValueError) -> Self {
        ModelError::InconsistentInitialValue(err)
    }
}

impl From<InfeasibleBySetupError> for ModelError {
    fn from(err: InfeasibleBySetupError) -> Self {
        ModelError::InfeasibleBySetup(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = InvalidNameError::new("bad name");
        assert_eq!(e.to_string(), "The name \"bad name\" contains whitespace.");

        let e = CapacityExceededError::new(101, 100);
        assert!(e.to_string().contains("exceeds the configured capacity"));

        let e = InfeasibleBySetupError::new("c0", "2 x0 = 5 has no integral solution");
        assert!(e.to_string().contains("c0"));
    }

    #[test]
    fn test_from_conversions() {
        let e: ModelError = NoDecisionVariablesError.into();
        assert_eq!(
            e,
            ModelError::NoDecisionVariables(NoDecisionVariablesError)
        );

        let e: ModelError = InconsistentInitialValueError::new("x", "out of bounds", 12).into();
        assert!(matches!(e, ModelError::InconsistentInitialValue(_)));
    }
}
