//! FILENAME: src/parser.rs
//! PURPOSE: Recursive descent parser for ranking expressions.
//! CONTEXT: Sub-parsers scan the ParseContext cursor directly and push
//! finished nodes onto the expression stack; binary operators go through
//! the operator stack and are reduced by precedence at expression
//! boundaries. There is no separate token stream.
//!
//! GRAMMAR:
//!   expr       := value (operator value)*
//!   value      := '-' value | '!' value | '(' expr ')' | array
//!              | string | number | name-call-or-symbol
//!   array      := '[' (expr (',' expr)*)? ']'
//!   name-call-or-symbol := ident ( '(' call-args ')' )?
//!   call-args  := if-args | let-args | map-args | join-args | sum-args
//!              | expr (',' expr)*
//!   lambda     := 'f' '(' (ident (',' ident)*)? ')' '(' expr ')'
//!   ident      := [A-Za-z0-9_@] [A-Za-z0-9_@$]*
//!   number     := digit+ ('.' digit*)? ([eE][+-]?digit+)?
//!   string     := '"' (char | '\' escape)* '"'
//!
//! Parsing never aborts early: the first failure latches a diagnostic in
//! the context and the remaining work short-circuits, so every entry point
//! always produces a Function (possibly rooted at an Error node).

use crate::ast::Node;
use crate::calls::{CallFn, CallRepo};
use crate::context::{InputMark, ParseContext};
use crate::function::Function;
use crate::operators::OperatorRepo;
use crate::resolver::{Params, SymbolExtractor};

/// Identifier characters. Digits are legal even in the first position for
/// compatibility with the Java ranking expression parser; in practice a
/// leading digit is taken by the number parser first, so such identifiers
/// are unreachable from expression syntax.
fn is_ident(c: u8, first: bool) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'@' || (c == b'$' && !first)
}

/// Reads a maximal identifier after skipping whitespace. Empty if the
/// cursor is not on an identifier character.
fn get_ident(ctx: &mut ParseContext) -> String {
    ctx.skip_spaces();
    let mut ident = String::new();
    if is_ident(ctx.get(), true) {
        ident.push(ctx.get() as char);
        ctx.next();
        while is_ident(ctx.get(), false) {
            ident.push(ctx.get() as char);
            ctx.next();
        }
    }
    ident
}

fn unhex(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn parse_string(ctx: &mut ParseContext) {
    let mut bytes: Vec<u8> = Vec::new();
    ctx.eat(b'"');
    while !ctx.eos() && ctx.get() != b'"' {
        if ctx.get() == b'\\' {
            ctx.next();
            if ctx.get() == b'x' {
                ctx.next();
                let hex1 = unhex(ctx.get());
                ctx.next();
                let hex2 = unhex(ctx.get());
                match (hex1, hex2) {
                    (Some(hi), Some(lo)) => bytes.push((hi << 4) | lo),
                    _ => ctx.fail("bad hex quote"),
                }
            } else {
                match ctx.get() {
                    b'"' => bytes.push(b'"'),
                    b'\\' => bytes.push(b'\\'),
                    b'f' => bytes.push(0x0c),
                    b'n' => bytes.push(b'\n'),
                    b'r' => bytes.push(b'\r'),
                    b't' => bytes.push(b'\t'),
                    _ => ctx.fail("bad quote"),
                }
            }
        } else {
            bytes.push(ctx.get());
        }
        ctx.next();
    }
    ctx.eat(b'"');
    ctx.push_expression(Node::String(bytes));
}

/// Scans one numeric literal: digits, optional fraction, optional
/// exponent. The first byte is taken unchecked so the `p_true` position in
/// `if` can accept a sign. The accumulated text must convert to f64
/// completely or the parse fails.
fn parse_number(ctx: &mut ParseContext) {
    let mut text = String::new();
    if ctx.get() != 0 {
        text.push(ctx.get() as char);
    }
    ctx.next();
    while ctx.get().is_ascii_digit() {
        text.push(ctx.get() as char);
        ctx.next();
    }
    if ctx.get() == b'.' {
        text.push(ctx.get() as char);
        ctx.next();
        while ctx.get().is_ascii_digit() {
            text.push(ctx.get() as char);
            ctx.next();
        }
    }
    if ctx.get() == b'e' || ctx.get() == b'E' {
        text.push(ctx.get() as char);
        ctx.next();
        if ctx.get() == b'+' || ctx.get() == b'-' {
            text.push(ctx.get() as char);
            ctx.next();
        }
        while ctx.get().is_ascii_digit() {
            text.push(ctx.get() as char);
            ctx.next();
        }
    }
    match text.parse::<f64>() {
        Ok(value) => ctx.push_expression(Node::Number(value)),
        Err(_) => ctx.fail(format!("invalid number: '{}'", text)),
    }
}

fn parse_if(ctx: &mut ParseContext) {
    parse_expression(ctx);
    let cond = ctx.pop_expression();
    ctx.eat(b',');
    parse_expression(ctx);
    let true_expr = ctx.pop_expression();
    ctx.eat(b',');
    parse_expression(ctx);
    let false_expr = ctx.pop_expression();
    let mut p_true = 0.5;
    if ctx.get() == b',' {
        ctx.eat(b',');
        parse_number(ctx);
        if let Node::Number(value) = ctx.pop_expression() {
            p_true = value;
        }
    }
    ctx.push_expression(Node::If {
        cond: Box::new(cond),
        true_expr: Box::new(true_expr),
        false_expr: Box::new(false_expr),
        p_true,
    });
}

fn parse_let(ctx: &mut ParseContext) {
    let name = get_ident(ctx);
    ctx.skip_spaces();
    ctx.eat(b',');
    parse_expression(ctx);
    let value = ctx.pop_expression();
    ctx.eat(b',');
    ctx.push_let_binding(&name);
    parse_expression(ctx);
    let body = ctx.pop_expression();
    ctx.pop_let_binding();
    ctx.push_expression(Node::Let {
        name,
        value: Box::new(value),
        body: Box::new(body),
    });
}

fn parse_call(ctx: &mut ParseContext, func: CallFn) {
    let mut args = Vec::with_capacity(func.num_params());
    for i in 0..func.num_params() {
        if i > 0 {
            ctx.eat(b',');
        }
        parse_expression(ctx);
        args.push(ctx.pop_expression());
    }
    ctx.push_expression(Node::Call { func, args });
}

// (a,b,c)
fn get_ident_list(ctx: &mut ParseContext) -> Vec<String> {
    let mut list = Vec::new();
    ctx.skip_spaces();
    ctx.eat(b'(');
    ctx.skip_spaces();
    while !ctx.eos() && ctx.get() != b')' {
        if !list.is_empty() {
            ctx.eat(b',');
        }
        list.push(get_ident(ctx));
        ctx.skip_spaces();
    }
    ctx.eat(b')');
    list
}

/// f(a,b,...)(body). The body parses in a fresh resolution scope with
/// exactly the listed parameters and no symbol extractor, so names from
/// the enclosing expression are invisible.
fn parse_lambda(ctx: &mut ParseContext) -> Function {
    ctx.skip_spaces();
    ctx.eat(b'f');
    let param_names = get_ident_list(ctx);
    ctx.push_resolve_context(Params::explicit(&param_names), None);
    ctx.skip_spaces();
    ctx.eat(b'(');
    parse_expression(ctx);
    ctx.eat(b')');
    ctx.pop_resolve_context();
    let lambda_root = ctx.pop_expression();
    Function::new(lambda_root, param_names)
}

fn parse_tensor_map(ctx: &mut ParseContext) {
    parse_expression(ctx);
    let child = ctx.pop_expression();
    ctx.eat(b',');
    let lambda = parse_lambda(ctx);
    if lambda.num_params() != 1 {
        ctx.fail(format!(
            "map requires a lambda with 1 parameter, was {}",
            lambda.num_params()
        ));
    }
    ctx.push_expression(Node::TensorMap {
        child: Box::new(child),
        lambda,
    });
}

fn parse_tensor_join(ctx: &mut ParseContext) {
    parse_expression(ctx);
    let lhs = ctx.pop_expression();
    ctx.eat(b',');
    parse_expression(ctx);
    let rhs = ctx.pop_expression();
    ctx.eat(b',');
    let lambda = parse_lambda(ctx);
    if lambda.num_params() != 2 {
        ctx.fail(format!(
            "join requires a lambda with 2 parameter, was {}",
            lambda.num_params()
        ));
    }
    ctx.push_expression(Node::TensorJoin {
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        lambda,
    });
}

fn parse_tensor_sum(ctx: &mut ParseContext) {
    parse_expression(ctx);
    let child = ctx.pop_expression();
    if ctx.get() == b',' {
        ctx.next();
        let dimension = get_ident(ctx);
        ctx.skip_spaces();
        ctx.push_expression(Node::TensorSum {
            child: Box::new(child),
            dimension: Some(dimension),
        });
    } else {
        ctx.push_expression(Node::TensorSum {
            child: Box::new(child),
            dimension: None,
        });
    }
}

/// Dispatches `name(` call sites: the reserved forms first, then the call
/// registry, then the tensor forms. Returns false when the name is not
/// followed by a parenthesis or is not callable; the unknown-function case
/// latches a failure but still returns false so the caller can retry the
/// name as a qualified symbol through an extractor.
fn try_parse_call(ctx: &mut ParseContext, name: &str) -> bool {
    ctx.skip_spaces();
    if ctx.get() == b'(' {
        ctx.eat(b'(');
        if name == "if" {
            parse_if(ctx);
        } else if name == "let" {
            parse_let(ctx);
        } else if let Some(func) = CallRepo::instance().create(name) {
            parse_call(ctx, func);
        } else if name == "map" {
            parse_tensor_map(ctx);
        } else if name == "join" {
            parse_tensor_join(ctx);
        } else if name == "sum" {
            parse_tensor_sum(ctx);
        } else {
            ctx.fail(format!("unknown function: '{}'", name));
            return false;
        }
        ctx.eat(b')');
        return true;
    }
    false
}

/// Resolves a bare name: innermost let binding first, then (through the
/// extractor, when one is present) the parameter set. With an extractor
/// present, `name` is replaced by whatever the extractor produced, or
/// emptied when it declines.
fn parse_symbol(ctx: &mut ParseContext, name: &mut String, before_name: InputMark) -> Option<i32> {
    if let Some(id) = ctx.resolve_let_ref(name) {
        return Some(id);
    }
    ctx.extract_symbol(name, before_name);
    ctx.resolve_parameter(name)
}

fn parse_symbol_or_call(ctx: &mut ParseContext) {
    let before_name = ctx.get_input_mark();
    let mut name = get_ident(ctx);
    if !try_parse_call(ctx, &name) {
        let id = parse_symbol(ctx, &mut name, before_name);
        if name.is_empty() {
            ctx.fail("missing value");
        } else {
            match id {
                Some(id) => ctx.push_expression(Node::Symbol(id)),
                None => ctx.fail(format!("unknown symbol: '{}'", name)),
            }
        }
    }
}

fn parse_array(ctx: &mut ParseContext) {
    let mut nodes = Vec::new();
    ctx.eat(b'[');
    ctx.skip_spaces();
    let mut size = 0;
    while !ctx.eos() && ctx.get() != b']' {
        size += 1;
        if size > 1 {
            ctx.eat(b',');
        }
        parse_expression(ctx);
        nodes.push(ctx.pop_expression());
    }
    ctx.eat(b']');
    ctx.push_expression(Node::Array(nodes));
}

fn parse_value(ctx: &mut ParseContext) {
    ctx.skip_spaces();
    if ctx.get() == b'-' {
        ctx.next();
        parse_value(ctx);
        let child = ctx.pop_expression();
        ctx.push_expression(Node::Neg(Box::new(child)));
    } else if ctx.get() == b'!' {
        ctx.next();
        parse_value(ctx);
        let child = ctx.pop_expression();
        ctx.push_expression(Node::Not(Box::new(child)));
    } else if ctx.get() == b'(' {
        ctx.next();
        parse_expression(ctx);
        ctx.eat(b')');
    } else if ctx.get() == b'[' {
        parse_array(ctx);
    } else if ctx.get() == b'"' {
        parse_string(ctx);
    } else if ctx.get().is_ascii_digit() {
        parse_number(ctx);
    } else {
        parse_symbol_or_call(ctx);
    }
}

fn parse_operator(ctx: &mut ParseContext) {
    ctx.skip_spaces();
    let peeked = ctx.peek(OperatorRepo::instance().max_size());
    match OperatorRepo::instance().create(&peeked) {
        Some(op) => {
            ctx.push_operator(op);
            ctx.skip(op.symbol().len());
        }
        None => ctx.fail(format!("invalid operator: '{}'", ctx.get() as char)),
    }
}

/// The precedence driver: alternates values and operators until an
/// expression terminator, then reduces the operator stack back down to
/// this expression's mark. Saving and restoring the previous mark makes
/// the routine re-entrant for sub-expressions.
pub(crate) fn parse_expression(ctx: &mut ParseContext) {
    let old_mark = ctx.operator_mark();
    ctx.set_operator_mark(ctx.num_operators());
    loop {
        parse_value(ctx);
        ctx.skip_spaces();
        if ctx.eos() || ctx.get() == b')' || ctx.get() == b',' || ctx.get() == b']' {
            while ctx.num_operators() > ctx.operator_mark() {
                ctx.apply_operator();
            }
            ctx.set_operator_mark(old_mark);
            return;
        }
        parse_operator(ctx);
    }
}

/// Shared tail of every public parse entry point. A failed parse in
/// implicit mode reports no parameters, since discovery is unreliable once
/// the input stops making sense.
pub(crate) fn parse_function(
    params: Params,
    expression: &str,
    symbol_extractor: Option<&dyn SymbolExtractor>,
) -> Function {
    let mut ctx = ParseContext::new(params, expression, symbol_extractor);
    parse_expression(&mut ctx);
    if ctx.failed() && ctx.params_implicit() {
        return Function::new(ctx.get_result(), Vec::new());
    }
    let root = ctx.get_result();
    let params = ctx.extract_params();
    Function::new(root, params)
}
