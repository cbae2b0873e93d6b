//! FILENAME: src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for ranking expressions.
//! CONTEXT: The parser builds this tree directly while scanning the input.
//! An evaluator (external to this crate) traverses the finished tree to
//! compute feature scores.
//!
//! SUPPORTED NODES:
//! - Literals: Numbers (IEEE-754 doubles), quoted byte strings
//! - Symbols: parameters (id >= 0) and let-bound names (id < 0)
//! - Unary operations: - (negation), ! (logical not)
//! - Arrays: [a, b, c]
//! - Conditionals: if(cond, a, b [, p_true])
//! - Local bindings: let(name, value, body)
//! - Function calls: sin(x), pow(x, y), ...
//! - Binary operations: +, -, *, /, %, ^, ==, !=, ~=, <, <=, >, >=, &&, ||
//! - Tensor forms: sum(t [, dim]), map(t, lambda), join(a, b, lambda)
//! - Error: replaces the whole tree when parsing failed

use crate::calls::CallFn;
use crate::function::Function;
use crate::operators::Operator;
use std::mem;

/// A parsed ranking expression node.
/// This is the core data structure an evaluator will traverse.
#[derive(Debug, PartialEq)]
pub enum Node {
    /// A numeric literal.
    Number(f64),

    /// A quoted string literal. Stored as raw bytes because \xHH escapes
    /// may produce sequences that are not valid UTF-8.
    String(Vec<u8>),

    /// A resolved symbol. Non-negative ids index the parameter list of the
    /// enclosing Function; negative ids reference let bindings, where
    /// `-(i + 1)` names the binding at depth `i` (0-based from the outside).
    Symbol(i32),

    /// Arithmetic negation: -x
    Neg(Box<Node>),

    /// Logical not: !x
    Not(Box<Node>),

    /// An array literal: [a, b, c]
    Array(Vec<Node>),

    /// A conditional: if(cond, true_expr, false_expr [, p_true]).
    /// `p_true` is the estimated probability that the condition holds,
    /// 0.5 unless spelled out. The parser accepts any numeric literal here
    /// and does not clamp; range checking is the producer's concern.
    If {
        cond: Box<Node>,
        true_expr: Box<Node>,
        false_expr: Box<Node>,
        p_true: f64,
    },

    /// A local binding: let(name, value, body). Occurrences of `name`
    /// inside `body` resolve to a negative Symbol id.
    Let {
        name: String,
        value: Box<Node>,
        body: Box<Node>,
    },

    /// A call to a registered function with a fixed number of arguments.
    Call { func: CallFn, args: Vec<Node> },

    /// A binary operation. The operator identity carries precedence and
    /// associativity, so the tree shape is self-describing.
    BinaryOp {
        op: Operator,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },

    /// Tensor dimension sum: sum(t) or sum(t, dimension).
    TensorSum {
        child: Box<Node>,
        dimension: Option<String>,
    },

    /// Tensor cell-wise map: map(t, f(x)(...)). The lambda has exactly
    /// one parameter.
    TensorMap { child: Box<Node>, lambda: Function },

    /// Tensor join: join(a, b, f(x, y)(...)). The lambda has exactly
    /// two parameters.
    TensorJoin {
        lhs: Box<Node>,
        rhs: Box<Node>,
        lambda: Function,
    },

    /// Parse failure. When parsing fails the whole tree is replaced by a
    /// single Error node carrying the bracketed diagnostic.
    Error(String),
}

impl Node {
    /// Returns the direct children of this node in syntactic order.
    /// Lambda roots of map/join count as children so a plain worklist
    /// traversal reaches every node in the tree.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Number(_) | Node::String(_) | Node::Symbol(_) | Node::Error(_) => Vec::new(),
            Node::Neg(child) | Node::Not(child) => vec![&**child],
            Node::Array(nodes) => nodes.iter().collect(),
            Node::If {
                cond,
                true_expr,
                false_expr,
                ..
            } => vec![&**cond, &**true_expr, &**false_expr],
            Node::Let { value, body, .. } => vec![&**value, &**body],
            Node::Call { args, .. } => args.iter().collect(),
            Node::BinaryOp { lhs, rhs, .. } => vec![&**lhs, &**rhs],
            Node::TensorSum { child, .. } => vec![&**child],
            Node::TensorMap { child, lambda } => vec![&**child, lambda.root()],
            Node::TensorJoin { lhs, rhs, lambda } => vec![&**lhs, &**rhs, lambda.root()],
        }
    }

    /// Renders the node back to expression syntax. `params` supplies the
    /// names for non-negative Symbol ids; let references print as `$depth`.
    /// Binary operands are parenthesized so precedence survives re-parsing.
    pub fn dump(&self, params: &[String]) -> String {
        let mut out = String::new();
        self.dump_to(&mut out, params);
        out
    }

    fn dump_to(&self, out: &mut String, params: &[String]) {
        match self {
            Node::Number(v) => out.push_str(&v.to_string()),
            Node::String(bytes) => dump_string(out, bytes),
            Node::Symbol(id) => {
                if *id >= 0 {
                    match params.get(*id as usize) {
                        Some(name) => out.push_str(name),
                        None => out.push_str(&format!("${}", id)),
                    }
                } else {
                    out.push_str(&format!("${}", -id));
                }
            }
            Node::Neg(child) => {
                out.push('-');
                child.dump_to(out, params);
            }
            Node::Not(child) => {
                out.push('!');
                child.dump_to(out, params);
            }
            Node::Array(nodes) => {
                out.push('[');
                for (i, node) in nodes.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    node.dump_to(out, params);
                }
                out.push(']');
            }
            Node::If {
                cond,
                true_expr,
                false_expr,
                p_true,
            } => {
                out.push_str("if(");
                cond.dump_to(out, params);
                out.push(',');
                true_expr.dump_to(out, params);
                out.push(',');
                false_expr.dump_to(out, params);
                if *p_true != 0.5 {
                    out.push(',');
                    out.push_str(&p_true.to_string());
                }
                out.push(')');
            }
            Node::Let { name, value, body } => {
                out.push_str("let(");
                out.push_str(name);
                out.push(',');
                value.dump_to(out, params);
                out.push(',');
                body.dump_to(out, params);
                out.push(')');
            }
            Node::Call { func, args } => {
                out.push_str(func.name());
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    arg.dump_to(out, params);
                }
                out.push(')');
            }
            Node::BinaryOp { op, lhs, rhs } => {
                out.push('(');
                lhs.dump_to(out, params);
                out.push_str(op.symbol());
                rhs.dump_to(out, params);
                out.push(')');
            }
            Node::TensorSum { child, dimension } => {
                out.push_str("sum(");
                child.dump_to(out, params);
                if let Some(dim) = dimension {
                    out.push(',');
                    out.push_str(dim);
                }
                out.push(')');
            }
            Node::TensorMap { child, lambda } => {
                out.push_str("map(");
                child.dump_to(out, params);
                out.push(',');
                dump_lambda(out, lambda);
                out.push(')');
            }
            Node::TensorJoin { lhs, rhs, lambda } => {
                out.push_str("join(");
                lhs.dump_to(out, params);
                out.push(',');
                rhs.dump_to(out, params);
                out.push(',');
                dump_lambda(out, lambda);
                out.push(')');
            }
            Node::Error(message) => out.push_str(message),
        }
    }

    /// Moves every direct child out of this node onto `out`, leaving cheap
    /// leaf placeholders behind. Used by the iterative Drop below.
    fn detach_children(&mut self, out: &mut Vec<Node>) {
        match self {
            Node::Number(_) | Node::String(_) | Node::Symbol(_) | Node::Error(_) => {}
            Node::Neg(child) | Node::Not(child) => {
                out.push(mem::replace(child.as_mut(), Node::Number(0.0)));
            }
            Node::Array(nodes) => out.extend(nodes.drain(..)),
            Node::If {
                cond,
                true_expr,
                false_expr,
                ..
            } => {
                out.push(mem::replace(cond.as_mut(), Node::Number(0.0)));
                out.push(mem::replace(true_expr.as_mut(), Node::Number(0.0)));
                out.push(mem::replace(false_expr.as_mut(), Node::Number(0.0)));
            }
            Node::Let { value, body, .. } => {
                out.push(mem::replace(value.as_mut(), Node::Number(0.0)));
                out.push(mem::replace(body.as_mut(), Node::Number(0.0)));
            }
            Node::Call { args, .. } => out.extend(args.drain(..)),
            Node::BinaryOp { lhs, rhs, .. } => {
                out.push(mem::replace(lhs.as_mut(), Node::Number(0.0)));
                out.push(mem::replace(rhs.as_mut(), Node::Number(0.0)));
            }
            Node::TensorSum { child, .. } => {
                out.push(mem::replace(child.as_mut(), Node::Number(0.0)));
            }
            Node::TensorMap { child, lambda } => {
                out.push(mem::replace(child.as_mut(), Node::Number(0.0)));
                out.push(lambda.take_root());
            }
            Node::TensorJoin { lhs, rhs, lambda } => {
                out.push(mem::replace(lhs.as_mut(), Node::Number(0.0)));
                out.push(mem::replace(rhs.as_mut(), Node::Number(0.0)));
                out.push(lambda.take_root());
            }
        }
    }
}

/// Expression trees nest to the depth of the input, so the default
/// recursive drop could overflow the stack. Children are detached onto a
/// worklist and released loop-wise instead.
impl Drop for Node {
    fn drop(&mut self) {
        let mut worklist = Vec::new();
        self.detach_children(&mut worklist);
        while let Some(mut node) = worklist.pop() {
            node.detach_children(&mut worklist);
        }
    }
}

/// Writes a string literal back in quoted form, escaping the same set the
/// lexer accepts.
fn dump_string(out: &mut String, bytes: &[u8]) {
    out.push('"');
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x0c => out.push_str("\\f"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out.push('"');
}

fn dump_lambda(out: &mut String, lambda: &Function) {
    out.push_str("f(");
    for (i, name) in lambda.param_names().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(name);
    }
    out.push_str(")(");
    out.push_str(&lambda.dump());
    out.push(')');
}
