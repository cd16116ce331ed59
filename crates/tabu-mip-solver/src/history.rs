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

use tabu_mip_model::solution::Solution;

/// Bounded archive of feasible solutions, best objective first. Duplicate
/// variable assignments are kept once.
#[derive(Debug, Clone)]
pub struct FeasibleSolutionPool {
    capacity: usize,
    sign: f64,
    solutions: Vec<Solution>,
}

impl FeasibleSolutionPool {
    pub fn new(capacity: usize, sign: f64) -> Self {
        Self {
            capacity,
            sign,
            solutions: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    #[inline]
    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    pub fn push(&mut self, batch: Vec<Solution>) {
        for solution in batch {
            let duplicate = self.solutions.iter().any(|existing| {
                existing.variable_value_proxies == solution.variable_value_proxies
            });
            if !duplicate {
                self.solutions.push(solution);
            }
        }
        let sign = self.sign;
        self.solutions.sort_by(|a, b| {
            (sign * a.objective)
                .partial_cmp(&(sign * b.objective))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.solutions.truncate(self.capacity);
    }
}
