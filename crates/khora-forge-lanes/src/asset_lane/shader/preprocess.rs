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

//! A small C-style preprocessor run over shader sources before parsing.
//!
//! Supported directives: `#define NAME [value]`, `#undef`, `#ifdef`,
//! `#ifndef`, `#if`, `#elif`, `#else`, `#endif`. Object-like macros are
//! substituted in the surviving lines. Directive and skipped lines are
//! replaced with empty lines so that line numbers are preserved.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Macros are expanded at most this many levels deep.
const MAX_EXPANSION_DEPTH: usize = 32;

/// Parentheses and unary operators nest at most this deep in `#if`.
const MAX_NESTING_DEPTH: usize = 256;

/// A preprocessing failure, with the 1-based line it happened on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct PreprocessError {
    /// 1-based line number in the preprocessed text.
    pub line: usize,
    /// What went wrong.
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
struct Branch {
    /// Whether the enclosing region emits lines.
    parent_active: bool,
    /// Whether some arm of this conditional has already been taken.
    taken: bool,
    /// Whether the current arm emits lines.
    active: bool,
    seen_else: bool,
}

/// Macro table and conditional state for one source.
#[derive(Debug, Default, Clone)]
pub struct Preprocessor {
    defines: HashMap<String, String>,
}

impl Preprocessor {
    /// Creates a preprocessor with no macros defined.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines `name` as `value`, replacing any previous definition.
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.defines.insert(name.into(), value.into());
    }

    /// Returns whether `name` is defined.
    pub fn is_defined(&self, name: &str) -> bool {
        self.defines.contains_key(name)
    }

    /// Runs the preprocessor over `source`.
    pub fn run(&mut self, source: &str) -> Result<String, PreprocessError> {
        let mut out = String::with_capacity(source.len());
        let mut stack: Vec<Branch> = Vec::new();

        for (index, line) in source.lines().enumerate() {
            let line_no = index + 1;
            let fail = |message: String| PreprocessError {
                line: line_no,
                message,
            };
            let active = stack.last().is_none_or(|b| b.active);

            let trimmed = line.trim_start();
            let Some(directive) = trimmed.strip_prefix('#') else {
                if active {
                    out.push_str(&self.substitute(line));
                }
                out.push('\n');
                continue;
            };

            let directive = directive.trim_start();
            let (keyword, rest) = split_word(directive);
            let rest = rest.trim();

            match keyword {
                "define" if active => {
                    let (name, value) = split_word(rest);
                    if !is_identifier(name) {
                        return Err(fail(format!("invalid macro name '{name}'")));
                    }
                    if value.starts_with('(') {
                        return Err(fail(format!(
                            "function-like macro '{name}' is not supported"
                        )));
                    }
                    self.define(name, value.trim());
                }
                "undef" if active => {
                    self.defines.remove(rest);
                }
                "define" | "undef" => {}
                "ifdef" | "ifndef" => {
                    if !is_identifier(rest) {
                        return Err(fail(format!("#{keyword} needs a macro name")));
                    }
                    let cond = self.is_defined(rest) == (keyword == "ifdef");
                    stack.push(open_branch(active, active && cond));
                }
                "if" => {
                    let cond = active && self.evaluate(rest).map_err(fail)? != 0;
                    stack.push(open_branch(active, cond));
                }
                "elif" => {
                    let Some(branch) = stack.last().copied() else {
                        return Err(fail("#elif without #if".to_string()));
                    };
                    if branch.seen_else {
                        return Err(fail("#elif after #else".to_string()));
                    }
                    let cond = branch.parent_active
                        && !branch.taken
                        && self.evaluate(rest).map_err(fail)? != 0;
                    if let Some(top) = stack.last_mut() {
                        top.active = cond;
                        top.taken |= cond;
                    }
                }
                "else" => {
                    let Some(top) = stack.last_mut() else {
                        return Err(fail("#else without #if".to_string()));
                    };
                    if top.seen_else {
                        return Err(fail("duplicate #else".to_string()));
                    }
                    top.seen_else = true;
                    top.active = top.parent_active && !top.taken;
                    top.taken = true;
                }
                "endif" => {
                    if stack.pop().is_none() {
                        return Err(fail("#endif without #if".to_string()));
                    }
                }
                other => return Err(fail(format!("unknown directive '#{other}'"))),
            }
            out.push('\n');
        }

        if !stack.is_empty() {
            return Err(PreprocessError {
                line: source.lines().count(),
                message: format!("{} unterminated conditional(s)", stack.len()),
            });
        }
        Ok(out)
    }

    /// Replaces every macro identifier in `line` by its expansion.
    /// Text after `//` is copied untouched.
    fn substitute(&self, line: &str) -> String {
        let (code, comment) = match line.find("//") {
            Some(at) => line.split_at(at),
            None => (line, ""),
        };
        let mut expanding = HashSet::new();
        let mut out = self.expand(code, &mut expanding, 0);
        out.push_str(comment);
        out
    }

    fn expand(&self, text: &str, expanding: &mut HashSet<String>, depth: usize) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.char_indices().peekable();
        while let Some((start, c)) = chars.next() {
            if !(c.is_ascii_alphabetic() || c == '_') {
                out.push(c);
                continue;
            }
            let mut end = start + c.len_utf8();
            while let Some(&(i, n)) = chars.peek() {
                if n.is_ascii_alphanumeric() || n == '_' {
                    end = i + n.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let word = &text[start..end];
            match self.defines.get(word) {
                Some(value) if depth < MAX_EXPANSION_DEPTH && !expanding.contains(word) => {
                    expanding.insert(word.to_string());
                    out.push_str(&self.expand(value, expanding, depth + 1));
                    expanding.remove(word);
                }
                _ => out.push_str(word),
            }
        }
        out
    }

    /// Evaluates a `#if` expression to an integer.
    pub fn evaluate(&self, expr: &str) -> Result<i64, String> {
        let tokens = tokenize(expr)?;
        let mut parser = ExprParser {
            tokens: &tokens,
            pos: 0,
            pp: self,
            depth: 0,
            nesting: 0,
        };
        let value = parser.or()?;
        match parser.peek() {
            None => Ok(value),
            Some(token) => Err(format!("unexpected '{token:?}' in expression")),
        }
    }
}

fn open_branch(parent_active: bool, cond: bool) -> Branch {
    Branch {
        parent_active,
        taken: cond,
        active: cond,
        seen_else: false,
    }
}

fn split_word(text: &str) -> (&str, &str) {
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    text.split_at(end)
}

/// Whether `name` is a valid macro identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Int(i64),
    Ident(String),
    Op(&'static str),
}

const OPERATORS: [&str; 13] = [
    "==", "!=", "<=", ">=", "&&", "||", "<", ">", "!", "(", ")", "+", "-",
];

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = expr.trim_start();
    while !rest.is_empty() {
        let c = rest.as_bytes()[0];
        if c.is_ascii_digit() {
            let end = rest
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(rest.len());
            let literal = &rest[..end];
            let value = match literal.strip_prefix("0x").or_else(|| literal.strip_prefix("0X")) {
                Some(hex) => i64::from_str_radix(hex, 16),
                None => literal.trim_end_matches(['u', 'U', 'l', 'L']).parse(),
            }
            .map_err(|_| format!("invalid integer '{literal}'"))?;
            tokens.push(Token::Int(value));
            rest = &rest[end..];
        } else if c.is_ascii_alphabetic() || c == b'_' {
            let (word, tail) = split_word(rest);
            tokens.push(Token::Ident(word.to_string()));
            rest = tail;
        } else if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            tokens.push(Token::Op(op));
            rest = &rest[op.len()..];
        } else {
            let c = rest.chars().next().unwrap_or_default();
            return Err(format!("unexpected character '{c}'"));
        }
        rest = rest.trim_start();
    }
    Ok(tokens)
}

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    pp: &'a Preprocessor,
    depth: usize,
    nesting: usize,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Token::Op(o)) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<i64, String> {
        let mut lhs = self.and()?;
        while self.eat("||") {
            let rhs = self.and()?;
            lhs = ((lhs != 0) || (rhs != 0)) as i64;
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<i64, String> {
        let mut lhs = self.equality()?;
        while self.eat("&&") {
            let rhs = self.equality()?;
            lhs = ((lhs != 0) && (rhs != 0)) as i64;
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<i64, String> {
        let mut lhs = self.relational()?;
        loop {
            if self.eat("==") {
                lhs = (lhs == self.relational()?) as i64;
            } else if self.eat("!=") {
                lhs = (lhs != self.relational()?) as i64;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn relational(&mut self) -> Result<i64, String> {
        let mut lhs = self.unary()?;
        loop {
            if self.eat("<=") {
                lhs = (lhs <= self.unary()?) as i64;
            } else if self.eat(">=") {
                lhs = (lhs >= self.unary()?) as i64;
            } else if self.eat("<") {
                lhs = (lhs < self.unary()?) as i64;
            } else if self.eat(">") {
                lhs = (lhs > self.unary()?) as i64;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, String>,
    ) -> Result<T, String> {
        if self.nesting >= MAX_NESTING_DEPTH {
            return Err("expression nests too deeply".to_string());
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn unary(&mut self) -> Result<i64, String> {
        if self.eat("!") {
            return self.nested(|p| Ok((p.unary()? == 0) as i64));
        }
        if self.eat("-") {
            return self.nested(|p| Ok(p.unary()?.wrapping_neg()));
        }
        if self.eat("+") {
            return self.nested(Self::unary);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<i64, String> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| "unexpected end of expression".to_string())?;
        self.pos += 1;
        match token {
            Token::Int(value) => Ok(value),
            Token::Op("(") => {
                let value = self.nested(Self::or)?;
                if !self.eat(")") {
                    return Err("missing ')'".to_string());
                }
                Ok(value)
            }
            Token::Ident(name) if name == "defined" => {
                let parens = self.eat("(");
                let Some(Token::Ident(target)) = self.peek().cloned() else {
                    return Err("defined needs a macro name".to_string());
                };
                self.pos += 1;
                if parens && !self.eat(")") {
                    return Err("missing ')' after defined".to_string());
                }
                Ok(self.pp.is_defined(&target) as i64)
            }
            Token::Ident(name) => match self.pp.defines.get(&name) {
                // Undefined identifiers evaluate to zero.
                None => Ok(0),
                Some(value) if value.trim().is_empty() => Ok(0),
                Some(value) => {
                    if self.depth >= MAX_EXPANSION_DEPTH {
                        return Err(format!("macro '{name}' expands recursively"));
                    }
                    let tokens = tokenize(value)?;
                    let mut inner = ExprParser {
                        tokens: &tokens,
                        pos: 0,
                        pp: self.pp,
                        depth: self.depth + 1,
                        nesting: self.nesting,
                    };
                    let value = inner.or()?;
                    if inner.peek().is_some() {
                        return Err(format!("macro '{name}' is not an expression"));
                    }
                    Ok(value)
                }
            },
            Token::Op(op) => Err(format!("unexpected '{op}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Result<String, PreprocessError> {
        Preprocessor::new().run(source)
    }

    fn kept(output: &str) -> Vec<&str> {
        output.lines().filter(|l| !l.trim().is_empty()).collect()
    }

    #[test]
    fn conditionals_select_one_arm() {
        let out = run("#define MODE 2\n#if MODE == 1\none\n#elif MODE == 2\ntwo\n#else\nother\n#endif\n")
            .unwrap();
        assert_eq!(kept(&out), ["two"]);
        assert_eq!(out.lines().count(), 8);
    }

    #[test]
    fn nested_conditionals_respect_the_parent() {
        let src = "#ifdef MISSING\n#if 1\nhidden\n#else\nalso hidden\n#endif\n#else\nshown\n#endif\n";
        assert_eq!(kept(&run(src).unwrap()), ["shown"]);
    }

    #[test]
    fn macros_are_substituted_outside_comments() {
        let src = "#define COUNT 4\n#define TOTAL COUNT\nlet n = TOTAL; // TOTAL\n";
        assert_eq!(kept(&run(src).unwrap()), ["let n = 4; // TOTAL"]);
    }

    #[test]
    fn self_referencing_macro_terminates() {
        let src = "#define LOOP LOOP + 1\nLOOP\n";
        assert_eq!(kept(&run(src).unwrap()), ["LOOP + 1"]);
    }

    #[test]
    fn expressions_cover_the_operator_set() {
        let mut pp = Preprocessor::new();
        pp.define("A", "1");
        pp.define("B", "A");
        let eval = |e: &str| pp.evaluate(e).unwrap();
        assert_eq!(eval("defined(A) && !defined(C)"), 1);
        assert_eq!(eval("defined B"), 1);
        assert_eq!(eval("B == 1 && (2 > 1 || 0)"), 1);
        assert_eq!(eval("UNKNOWN"), 0);
        assert_eq!(eval("0x10 >= 16"), 1);
        assert_eq!(eval("A != 1"), 0);
        assert!(pp.evaluate("(1").is_err());
    }

    #[test]
    fn structural_errors_name_the_line() {
        assert_eq!(run("ok\n#endif\n").unwrap_err().line, 2);
        assert!(run("#if 1\nbody\n").is_err());
        assert!(run("#else\n").is_err());
        assert!(run("#pragma once\n").is_err());
        assert!(run("#define F(x) x\n").is_err());
    }

    #[test]
    fn non_ascii_in_condition_is_an_error() {
        let err = run("#if x ≥ 1\n#endif\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains('≥'), "{}", err.message);
    }

    #[test]
    fn deep_nesting_is_rejected_without_overflow() {
        let deep = format!("#if {}1\n#endif\n", "(".repeat(200_000));
        assert!(run(&deep).is_err());
        let bangs = format!("#if {}1\n#endif\n", "!".repeat(200_000));
        assert!(run(&bangs).is_err());

        let shallow = format!("#if {}1{}\nyes\n#endif\n", "(".repeat(64), ")".repeat(64));
        assert_eq!(kept(&run(&shallow).unwrap()), ["yes"]);
    }

    #[test]
    fn undef_removes_a_macro() {
        let out = run("#define X 1\n#undef X\n#ifdef X\nyes\n#else\nno\n#endif\n").unwrap();
        assert_eq!(kept(&out), ["no"]);
    }
}
