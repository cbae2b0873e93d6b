//! FILENAME: src/function.rs
//! PURPOSE: The parse result type and the public parse entry points.
//! CONTEXT: A Function pairs a parsed expression tree with its parameter
//! names in index order. Parse failures are tree-valued: the root becomes
//! an Error node and `has_error`/`get_error` expose the diagnostic, so
//! every parse call returns a Function.

use crate::ast::Node;
use crate::parser::parse_function;
use crate::resolver::{Params, SymbolExtractor};
use thiserror::Error;

/// A parsed ranking expression: the root node plus the parameter names
/// that non-negative Symbol ids index into.
#[derive(Debug, PartialEq)]
pub struct Function {
    root: Box<Node>,
    params: Vec<String>,
}

impl Function {
    pub(crate) fn new(root: Node, params: Vec<String>) -> Self {
        Function {
            root: Box::new(root),
            params,
        }
    }

    /// Parses with implicit parameters: free identifiers become parameters
    /// in first-encounter order.
    pub fn parse(expression: &str) -> Function {
        parse_function(Params::implicit(), expression, None)
    }

    /// Parses with implicit parameters and a host-provided extractor for
    /// qualified names.
    pub fn parse_with_extractor(expression: &str, extractor: &dyn SymbolExtractor) -> Function {
        parse_function(Params::implicit(), expression, Some(extractor))
    }

    /// Parses against a fixed parameter list; names outside it fail with
    /// an unknown-symbol diagnostic.
    ///
    /// # Panics
    /// Panics if `params` contains the same name twice.
    pub fn parse_with_params(params: &[&str], expression: &str) -> Function {
        parse_function(Params::explicit(params), expression, None)
    }

    /// Parses against a fixed parameter list with a symbol extractor.
    ///
    /// # Panics
    /// Panics if `params` contains the same name twice.
    pub fn parse_with_params_and_extractor(
        params: &[&str],
        expression: &str,
        extractor: &dyn SymbolExtractor,
    ) -> Function {
        parse_function(Params::explicit(params), expression, Some(extractor))
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    pub fn param_names(&self) -> &[String] {
        &self.params
    }

    pub fn has_error(&self) -> bool {
        matches!(*self.root, Node::Error(_))
    }

    /// The bracketed diagnostic, or the empty string when the parse
    /// succeeded.
    pub fn get_error(&self) -> &str {
        match *self.root {
            Node::Error(ref message) => message,
            _ => "",
        }
    }

    /// Renders the expression back to parseable syntax.
    pub fn dump(&self) -> String {
        self.root.dump(&self.params)
    }

    /// Detaches the root for iterative teardown, leaving a leaf behind.
    pub(crate) fn take_root(&mut self) -> Node {
        std::mem::replace(&mut *self.root, Node::Number(0.0))
    }
}

/// Errors from [`unwrap`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnwrapError {
    #[error("could not extract wrapper name")]
    MissingWrapperName,
    #[error("could not match opening '('")]
    MissingOpeningParen,
    #[error("could not match closing ')'")]
    MissingClosingParen,
}

/// The result of stripping a wrapper envelope: the wrapper name and the
/// body between its parentheses, borrowed from the input.
#[derive(Debug, PartialEq, Eq)]
pub struct Unwrapped<'a> {
    pub wrapper: &'a str,
    pub body: &'a str,
}

/// Strips an optional `IDENT ( ... )` envelope from around an expression:
/// leading whitespace, an alphabetic wrapper name, optional whitespace,
/// `(`, the body up to the last `)`, and trailing whitespace only. The
/// body keeps its own whitespace untouched.
pub fn unwrap(input: &str) -> Result<Unwrapped<'_>, UnwrapError> {
    let bytes = input.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() && crate::context::is_space(bytes[pos]) {
        pos += 1;
    }
    let wrapper_begin = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
        pos += 1;
    }
    let wrapper_end = pos;
    if wrapper_end == wrapper_begin {
        return Err(UnwrapError::MissingWrapperName);
    }
    while pos < bytes.len() && crate::context::is_space(bytes[pos]) {
        pos += 1;
    }
    if pos == bytes.len() || bytes[pos] != b'(' {
        return Err(UnwrapError::MissingOpeningParen);
    }
    let body_begin = pos + 1;
    let mut body_end = bytes.len() - 1;
    while body_end > body_begin && crate::context::is_space(bytes[body_end]) {
        body_end -= 1;
    }
    if bytes[body_end] != b')' {
        return Err(UnwrapError::MissingClosingParen);
    }
    Ok(Unwrapped {
        wrapper: &input[wrapper_begin..wrapper_end],
        body: &input[body_begin..body_end],
    })
}
