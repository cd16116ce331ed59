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

use tabu_mip_model::err::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlreadySolvedError;

impl std::fmt::Display for AlreadySolvedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "This model has already been solved.")
    }
}

impl std::error::Error for AlreadySolvedError {}

#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    AlreadySolved(AlreadySolvedError),
    Model(ModelError),
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::AlreadySolved(e) => write!(f, "{}", e),
            SolverError::Model(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SolverError {}

impl From<AlreadySolvedError> for SolverError {
    fn from(err: AlreadySolvedError) -> Self {
        SolverError::AlreadySolved(err)
    }
}

impl From<ModelError> for SolverError {
    fn from(err: ModelError) -> Self {
        SolverError::Model(err)
    }
}
