/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! C3 — the source-file half. Raw lines per logical file, kept around
//! purely for diagnostic printing (spec.md §4.3: "source files hold the
//! raw lines for diagnostic printing"). Generalized from the teacher's
//! single-file line tracking to support `.include`: one entry per
//! logical file instead of one global line vector.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct SourceFiles {
    files: HashMap<PathBuf, Vec<String>>,
}

impl SourceFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: PathBuf, text: &str) {
        self.files
            .entry(path)
            .or_insert_with(|| text.lines().map(str::to_string).collect());
    }

    /// 1-based line lookup, used when formatting a diagnostic.
    pub fn line(&self, path: &Path, line_number: usize) -> Option<&str> {
        self.files
            .get(path)
            .and_then(|lines| lines.get(line_number.checked_sub(1)?))
            .map(String::as_str)
    }
}
