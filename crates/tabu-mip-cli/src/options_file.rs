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

use std::path::Path;
use tabu_mip_solver::option::Options;

#[derive(Debug)]
pub enum OptionFileError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl From<std::io::Error> for OptionFileError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for OptionFileError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

impl std::fmt::Display for OptionFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionFileError::Io(e) => write!(f, "I/O error: {e}"),
            OptionFileError::Parse(e) => write!(f, "option file parse error: {e}"),
        }
    }
}

impl std::error::Error for OptionFileError {}

/// Reads a JSON option file; absent fields keep their defaults.
pub fn read_options(path: &Path) -> Result<Options, OptionFileError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_io_error() {
        let result = read_options(Path::new("no/such/option_file.json"));
        assert!(matches!(result, Err(OptionFileError::Io(_))));
    }
}
