// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The optional `[A|B|...]` permutation header of a shader source.

use super::is_identifier;

/// Name of the implicit permutation every shader has.
pub const DEFAULT_PERMUTATION: &str = "DEFAULT";

/// Macro that expands to the name of the active permutation.
pub const TYPE_MACRO: &str = "TYPE";

/// A shader source split into its permutation list and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutedSource<'a> {
    /// `DEFAULT` first, then the header's names in order. A permutation's
    /// macro value is its index in this list.
    pub permutations: Vec<String>,
    /// The source without its header line.
    pub body: &'a str,
}

impl<'a> PermutedSource<'a> {
    /// Splits off the header if the first line is one.
    ///
    /// A first line that starts with `[` must be a well-formed header: a
    /// `|`-separated list of distinct identifiers, none of them `DEFAULT`
    /// or `TYPE`.
    pub fn parse(source: &'a str) -> Result<Self, String> {
        let (first, rest) = match source.split_once('\n') {
            Some((first, rest)) => (first, rest),
            None => (source, ""),
        };
        let header = first.trim();
        let mut permutations = vec![DEFAULT_PERMUTATION.to_string()];

        if !header.starts_with('[') {
            return Ok(Self {
                permutations,
                body: source,
            });
        }

        let inner = header
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .ok_or_else(|| format!("unterminated permutation header '{header}'"))?;
        for name in inner.split('|').map(str::trim) {
            if !is_identifier(name) {
                return Err(format!("invalid permutation name '{name}'"));
            }
            if name == TYPE_MACRO || permutations.iter().any(|p| p == name) {
                return Err(format!("duplicate or reserved permutation name '{name}'"));
            }
            permutations.push(name.to_string());
        }

        Ok(Self {
            permutations,
            body: rest,
        })
    }

    /// The `#define` block selecting `active`, to be prepended to the body.
    pub fn prelude(&self, active: &str) -> String {
        let mut out = String::new();
        for (value, name) in self.permutations.iter().enumerate() {
            out.push_str(&format!("#define {name} {value}\n"));
        }
        out.push_str(&format!("#define {TYPE_MACRO} {active}\n"));
        out
    }

    /// The full text compiled for `active`.
    pub fn synthesize(&self, active: &str) -> String {
        let mut text = self.prelude(active);
        text.push_str(self.body);
        text
    }
}
