//! FILENAME: src/context.rs
//! PURPOSE: Mutable state for one parse: cursor, stacks, and failure latch.
//! CONTEXT: The parser threads a single ParseContext through every
//! sub-parser. It owns the byte cursor over the input, the expression and
//! operator stacks driving precedence reduction, the stack of resolution
//! scopes, and the single-shot failure latch that short-circuits work
//! after the first error.

use crate::ast::Node;
use crate::operators::Operator;
use crate::resolver::{Params, ResolveContext, SymbolExtractor};

/// ASCII whitespace: space, tab, newline, carriage return, form feed,
/// vertical tab. `u8::is_ascii_whitespace` omits vertical tab, so the set
/// is spelled out here.
pub(crate) fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// A checkpoint of the input cursor, used to rewind after speculative
/// reads (see `extract_symbol`).
#[derive(Debug, Clone, Copy)]
pub(crate) struct InputMark {
    pos: usize,
    curr: u8,
}

pub(crate) struct ParseContext<'a> {
    input: &'a [u8],
    pos: usize,
    /// Current byte, or 0 at end of input. A latched failure also forces
    /// this to 0 so every scanning loop terminates promptly.
    curr: u8,
    failure: String,
    expression_stack: Vec<Node>,
    operator_stack: Vec<Operator>,
    /// Low-water mark on the operator stack. Precedence reduction never
    /// pops below it, which keeps sub-expression parses (call arguments,
    /// parenthesized groups) from draining an enclosing expression's
    /// pending operators.
    operator_mark: usize,
    resolve_stack: Vec<ResolveContext<'a>>,
}

impl<'a> ParseContext<'a> {
    pub fn new(
        params: Params,
        expression: &'a str,
        symbol_extractor: Option<&'a dyn SymbolExtractor>,
    ) -> Self {
        let input = expression.as_bytes();
        ParseContext {
            input,
            pos: 0,
            curr: input.first().copied().unwrap_or(0),
            failure: String::new(),
            expression_stack: Vec::new(),
            operator_stack: Vec::new(),
            operator_mark: 0,
            resolve_stack: vec![ResolveContext::new(params, symbol_extractor)],
        }
    }

    // ========================================================================
    // Failure latch
    // ========================================================================

    /// Records the first failure and forces the cursor to the end-of-input
    /// sentinel. Later calls are no-ops; the first diagnostic wins.
    pub fn fail(&mut self, msg: impl Into<String>) {
        if self.failure.is_empty() {
            self.failure = msg.into();
            self.curr = 0;
        }
    }

    pub fn failed(&self) -> bool {
        !self.failure.is_empty()
    }

    // ========================================================================
    // Cursor primitives
    // ========================================================================

    pub fn get(&self) -> u8 {
        self.curr
    }

    pub fn eos(&self) -> bool {
        self.curr == 0
    }

    pub fn next(&mut self) {
        if self.curr != 0 {
            self.pos += 1;
            self.curr = self.input.get(self.pos).copied().unwrap_or(0);
        }
    }

    pub fn eat(&mut self, c: u8) {
        if self.curr == c {
            self.next();
        } else {
            self.fail(format!(
                "expected '{}', but got '{}'",
                c as char, self.curr as char
            ));
        }
    }

    pub fn skip_spaces(&mut self) {
        while !self.eos() && is_space(self.curr) {
            self.next();
        }
    }

    /// Reads up to `n` bytes ahead without moving the cursor, zero-padding
    /// past end of input (or after a latched failure).
    pub fn peek(&self, n: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            if self.curr != 0 && self.pos + i < self.input.len() {
                out.push(self.input[self.pos + i]);
            } else {
                out.push(0);
            }
        }
        out
    }

    pub fn skip(&mut self, n: usize) {
        for _ in 0..n {
            self.next();
        }
    }

    pub fn get_input_mark(&self) -> InputMark {
        InputMark {
            pos: self.pos,
            curr: self.curr,
        }
    }

    /// Rewinds to a checkpoint. Moving from the end-of-input sentinel back
    /// to a live byte clears the failure latch; this is the only path that
    /// does, and it exists so symbol extraction can retry a name that
    /// already failed to parse as something else.
    pub fn restore_input_mark(&mut self, mark: InputMark) {
        if self.curr == 0 && mark.curr != 0 {
            self.failure.clear();
        }
        self.pos = mark.pos;
        self.curr = mark.curr;
    }

    // ========================================================================
    // Resolution scopes
    // ========================================================================

    fn resolver(&self) -> &ResolveContext<'a> {
        self.resolve_stack
            .last()
            .expect("resolve stack is never empty")
    }

    fn resolver_mut(&mut self) -> &mut ResolveContext<'a> {
        self.resolve_stack
            .last_mut()
            .expect("resolve stack is never empty")
    }

    pub fn push_resolve_context(
        &mut self,
        params: Params,
        symbol_extractor: Option<&'a dyn SymbolExtractor>,
    ) {
        self.resolve_stack
            .push(ResolveContext::new(params, symbol_extractor));
    }

    pub fn pop_resolve_context(&mut self) {
        self.resolve_stack.pop();
    }

    pub fn push_let_binding(&mut self, name: &str) {
        self.resolver_mut().push_let_name(name);
    }

    pub fn pop_let_binding(&mut self) {
        self.resolver_mut().pop_let_name();
    }

    pub fn resolve_let_ref(&self, name: &str) -> Option<i32> {
        self.resolver().resolve_let_name(name)
    }

    pub fn resolve_parameter(&mut self, name: &str) -> Option<i32> {
        self.resolver_mut().resolve_param(name)
    }

    pub fn params_implicit(&self) -> bool {
        self.resolver().params().is_implicit()
    }

    pub fn extract_params(&self) -> Vec<String> {
        self.resolver().params().extract()
    }

    /// Lets the current scope's SymbolExtractor consume a qualified name.
    ///
    /// The cursor is first rewound to `before_symbol` so the extractor
    /// sees the raw text of the identifier already read (clearing the
    /// failure latch if that identifier had run the cursor out). The
    /// extractor must consume at least one byte and at most the remainder;
    /// anything else leaves the cursor at the rewound position and
    /// `symbol_out` empty.
    pub fn extract_symbol(&mut self, symbol_out: &mut String, before_symbol: InputMark) {
        let extractor = match self.resolver().symbol_extractor() {
            Some(extractor) => extractor,
            None => return,
        };
        symbol_out.clear();
        self.restore_input_mark(before_symbol);
        if self.eos() {
            return;
        }
        if let Some((consumed, symbol)) = extractor.extract_symbol(&self.input[self.pos..]) {
            if consumed > 0 && consumed <= self.input.len() - self.pos {
                self.pos += consumed;
                self.curr = self.input.get(self.pos).copied().unwrap_or(0);
                *symbol_out = symbol;
            }
        }
    }

    // ========================================================================
    // Expression and operator stacks
    // ========================================================================

    pub fn num_expressions(&self) -> usize {
        self.expression_stack.len()
    }

    pub fn push_expression(&mut self, node: Node) {
        self.expression_stack.push(node);
    }

    pub fn pop_expression(&mut self) -> Node {
        match self.expression_stack.pop() {
            Some(node) => node,
            None => {
                self.fail("expression stack underflow");
                Node::Number(0.0)
            }
        }
    }

    pub fn num_operators(&self) -> usize {
        self.operator_stack.len()
    }

    pub fn operator_mark(&self) -> usize {
        self.operator_mark
    }

    pub fn set_operator_mark(&mut self, mark: usize) {
        self.operator_mark = mark;
    }

    /// Pops one operator and two expressions and pushes the combined
    /// binary node back as an expression.
    pub fn apply_operator(&mut self) {
        let op = self
            .operator_stack
            .pop()
            .expect("operator stack underflow");
        let rhs = self.pop_expression();
        let lhs = self.pop_expression();
        self.push_expression(Node::BinaryOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        });
    }

    /// Reduces while the stack top outranks the incoming operator, then
    /// pushes it. Reduction stops at the current operator mark.
    pub fn push_operator(&mut self, op: Operator) {
        while self.operator_stack.len() > self.operator_mark
            && self
                .operator_stack
                .last()
                .is_some_and(|top| top.do_before(&op))
        {
            self.apply_operator();
        }
        self.operator_stack.push(op);
    }

    // ========================================================================
    // Finalization
    // ========================================================================

    /// Pops the finished tree, or synthesizes an Error node around the
    /// latched diagnostic. The error message embeds the input split at the
    /// failure position: `[<before>]...[<diagnostic>]...[<after>]`.
    pub fn get_result(&mut self) -> Node {
        if !self.eos() || self.num_expressions() != 1 || self.num_operators() > 0 {
            self.fail("incomplete parse");
        }
        if !self.failure.is_empty() {
            let before = String::from_utf8_lossy(&self.input[..self.pos]);
            let after = String::from_utf8_lossy(&self.input[self.pos..]);
            return Node::Error(format!("[{}]...[{}]...[{}]", before, self.failure, after));
        }
        self.pop_expression()
    }
}
