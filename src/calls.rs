//! FILENAME: src/calls.rs
//! PURPOSE: Built-in function identities and the call registry.
//! CONTEXT: When the parser sees `name(` and `name` is not a reserved
//! form, it asks the CallRepo for the function identity. Each identity
//! declares a fixed arity; the parser reads exactly that many
//! comma-separated argument expressions.
//!
//! SUPPORTED FUNCTIONS:
//! - One argument: cos, sin, tan, cosh, sinh, tanh, acos, asin, atan,
//!   exp, log10, log, sqrt, ceil, fabs, floor, isNan
//! - Two arguments: atan2, ldexp, pow, fmod, min, max

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Built-in functions callable from ranking expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallFn {
    Cos,
    Sin,
    Tan,
    Cosh,
    Sinh,
    Tanh,
    Acos,
    Asin,
    Atan,
    Exp,
    Log10,
    Log,
    Sqrt,
    Ceil,
    Fabs,
    Floor,
    Atan2,
    Ldexp,
    Pow,
    Fmod,
    Min,
    Max,
    IsNan,
}

impl CallFn {
    pub const ALL: [CallFn; 23] = [
        CallFn::Cos,
        CallFn::Sin,
        CallFn::Tan,
        CallFn::Cosh,
        CallFn::Sinh,
        CallFn::Tanh,
        CallFn::Acos,
        CallFn::Asin,
        CallFn::Atan,
        CallFn::Exp,
        CallFn::Log10,
        CallFn::Log,
        CallFn::Sqrt,
        CallFn::Ceil,
        CallFn::Fabs,
        CallFn::Floor,
        CallFn::Atan2,
        CallFn::Ldexp,
        CallFn::Pow,
        CallFn::Fmod,
        CallFn::Min,
        CallFn::Max,
        CallFn::IsNan,
    ];

    /// The name matched at the call site.
    pub fn name(&self) -> &'static str {
        match self {
            CallFn::Cos => "cos",
            CallFn::Sin => "sin",
            CallFn::Tan => "tan",
            CallFn::Cosh => "cosh",
            CallFn::Sinh => "sinh",
            CallFn::Tanh => "tanh",
            CallFn::Acos => "acos",
            CallFn::Asin => "asin",
            CallFn::Atan => "atan",
            CallFn::Exp => "exp",
            CallFn::Log10 => "log10",
            CallFn::Log => "log",
            CallFn::Sqrt => "sqrt",
            CallFn::Ceil => "ceil",
            CallFn::Fabs => "fabs",
            CallFn::Floor => "floor",
            CallFn::Atan2 => "atan2",
            CallFn::Ldexp => "ldexp",
            CallFn::Pow => "pow",
            CallFn::Fmod => "fmod",
            CallFn::Min => "min",
            CallFn::Max => "max",
            CallFn::IsNan => "isNan",
        }
    }

    /// Number of arguments the call site must supply.
    pub fn num_params(&self) -> usize {
        match self {
            CallFn::Atan2
            | CallFn::Ldexp
            | CallFn::Pow
            | CallFn::Fmod
            | CallFn::Min
            | CallFn::Max => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for CallFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Read-only registry mapping function names to identities.
/// Populated once; safe for concurrent lookups afterward.
pub struct CallRepo {
    map: HashMap<&'static str, CallFn>,
}

static INSTANCE: Lazy<CallRepo> = Lazy::new(CallRepo::new);

impl CallRepo {
    fn new() -> Self {
        let mut map = HashMap::new();
        for func in CallFn::ALL {
            map.insert(func.name(), func);
        }
        CallRepo { map }
    }

    pub fn instance() -> &'static CallRepo {
        &INSTANCE
    }

    /// Exact-name lookup. Returns None for unknown functions; the parser
    /// turns that into an "unknown function" diagnostic.
    pub fn create(&self, name: &str) -> Option<CallFn> {
        self.map.get(name).copied()
    }
}
