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

use crate::ScoreValue;
use serde::{Deserialize, Serialize};

/// The evaluated score vector of a candidate move or of the current state.
///
/// Augmented objectives are stored as minimization values: the raw objective
/// is multiplied by the model sign before penalties are added, so every
/// incumbent comparison is a plain `<`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SolutionScore {
    pub objective: ScoreValue,
    pub total_violation: ScoreValue,
    pub local_penalty: ScoreValue,
    pub global_penalty: ScoreValue,
    pub local_augmented_objective: ScoreValue,
    pub global_augmented_objective: ScoreValue,
    pub is_objective_improvable: bool,
    pub is_constraint_improvable: bool,
    pub is_feasible: bool,
}

impl std::fmt::Display for SolutionScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SolutionScore(objective: {}, total_violation: {}, local_augmented: {}, global_augmented: {}, feasible: {})",
            self.objective,
            self.total_violation,
            self.local_augmented_objective,
            self.global_augmented_objective,
            self.is_feasible
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zeroed() {
        let s = SolutionScore::default();
        assert_eq!(s.objective, 0.0);
        assert_eq!(s.total_violation, 0.0);
        assert!(!s.is_feasible);
        assert!(!s.is_objective_improvable);
    }

    #[test]
    fn test_display_contains_fields() {
        let s = SolutionScore {
            objective: 3.0,
            is_feasible: true,
            ..SolutionScore::default()
        };
        let rendered = s.to_string();
        assert!(rendered.contains("objective: 3"));
        assert!(rendered.contains("feasible: true"));
    }
}
