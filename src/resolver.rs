//! FILENAME: src/resolver.rs
//! PURPOSE: Symbol resolution for parameters and let bindings.
//! CONTEXT: Bare identifiers in an expression resolve against three
//! layers, innermost first: the stack of lexically scoped let bindings,
//! the parameter set (fixed up front or discovered while parsing), and an
//! optional host-provided SymbolExtractor for qualified names the plain
//! identifier syntax cannot express.

use indexmap::IndexMap;

/// Extends identifier lexing with host-defined syntax (dotted or otherwise
/// qualified names).
///
/// The parser hands over the unread remainder of the input. An
/// implementation consumes a symbol from the front and reports how many
/// bytes it used together with the extracted name. Returning `None`, a
/// zero length, or a length past the end of the remainder leaves the
/// parser's cursor untouched and the symbol empty.
pub trait SymbolExtractor {
    fn extract_symbol(&self, input: &[u8]) -> Option<(usize, String)>;
}

/// The parameter set of one resolution scope.
///
/// Explicit parameters are fixed by the caller and unknown names stay
/// unresolved. Implicit parameters are discovered: the first use of a name
/// registers it at the next free index, and the insertion order becomes
/// the parameter list of the parsed Function.
#[derive(Debug)]
pub enum Params {
    Explicit(IndexMap<String, usize>),
    Implicit(IndexMap<String, usize>),
}

impl Params {
    /// Builds a fixed parameter set from the given names.
    ///
    /// # Panics
    /// Panics if the same name appears twice.
    pub fn explicit<S: AsRef<str>>(names: &[S]) -> Params {
        let mut map = IndexMap::new();
        for name in names {
            let name = name.as_ref();
            let index = map.len();
            assert!(
                map.insert(name.to_string(), index).is_none(),
                "duplicate parameter name: '{}'",
                name
            );
        }
        Params::Explicit(map)
    }

    pub fn implicit() -> Params {
        Params::Implicit(IndexMap::new())
    }

    pub fn is_implicit(&self) -> bool {
        matches!(self, Params::Implicit(_))
    }

    /// Looks up a name. In implicit mode an absent name is registered at
    /// the next index, so the lookup always succeeds.
    pub fn resolve(&mut self, name: &str) -> Option<usize> {
        match self {
            Params::Explicit(map) => map.get(name).copied(),
            Params::Implicit(map) => {
                let next = map.len();
                Some(*map.entry(name.to_string()).or_insert(next))
            }
        }
    }

    /// The parameter names in index order.
    pub fn extract(&self) -> Vec<String> {
        match self {
            Params::Explicit(map) | Params::Implicit(map) => map.keys().cloned().collect(),
        }
    }
}

/// One resolution scope: a parameter set, an optional symbol extractor,
/// and the let bindings opened within the scope. Lambda bodies get a fresh
/// ResolveContext, so outer parameters and bindings are invisible there.
pub struct ResolveContext<'a> {
    params: Params,
    symbol_extractor: Option<&'a dyn SymbolExtractor>,
    let_names: Vec<String>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(params: Params, symbol_extractor: Option<&'a dyn SymbolExtractor>) -> Self {
        ResolveContext {
            params,
            symbol_extractor,
            let_names: Vec::new(),
        }
    }

    pub fn push_let_name(&mut self, name: &str) {
        self.let_names.push(name.to_string());
    }

    pub fn pop_let_name(&mut self) {
        self.let_names.pop();
    }

    /// Scans bindings innermost-first. A match at depth `i` (0-based from
    /// the outside) yields the negative Symbol id `-(i + 1)`.
    pub fn resolve_let_name(&self, name: &str) -> Option<i32> {
        for (i, let_name) in self.let_names.iter().enumerate().rev() {
            if name == let_name {
                return Some(-(i as i32 + 1));
            }
        }
        None
    }

    pub fn resolve_param(&mut self, name: &str) -> Option<i32> {
        self.params.resolve(name).map(|id| id as i32)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn symbol_extractor(&self) -> Option<&'a dyn SymbolExtractor> {
        self.symbol_extractor
    }
}
