//! The component library handed to the synthesis oracle.
use crate::engine::primitives::NAMED_PRIMITIVES;
use crate::engine::{unparse, Expr, Primitive};
use std::collections::BTreeSet;
use std::fmt;

/// Integer literals available from the start.
pub const BASE_LITERALS: [i64; 2] = [0, 1];

#[derive(Clone, Debug)]
pub struct Component {
    pub expr: Expr,
    description: String,
}

impl Component {
    pub fn new(expr: Expr) -> Self {
        let description = unparse(&expr);
        Self { expr, description }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn arity(&self) -> usize {
        self.expr.arity()
    }

    pub fn is_invented(&self) -> bool {
        matches!(self.expr, Expr::Invented(_))
    }

    /// Whether bottom-up enumeration may apply this component to values.
    pub fn is_first_order(&self) -> bool {
        !matches!(self.expr, Expr::Primitive(p) if p.is_higher_order())
    }
}

/// A uniform grammar over a set of components, tagged with the version it was
/// built for. Equality ignores the version.
#[derive(Clone, Debug)]
pub struct Grammar {
    components: Vec<Component>,
    version: u64,
}

impl Grammar {
    /// Duplicate descriptions are kept once, first occurrence wins.
    pub fn uniform(exprs: impl IntoIterator<Item = Expr>, version: u64) -> Self {
        let mut seen = BTreeSet::new();
        let mut components = Vec::new();
        for expr in exprs {
            let c = Component::new(expr);
            if seen.insert(c.description.clone()) {
                components.push(c);
            }
        }
        Self { components, version }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn contains(&self, description: &str) -> bool {
        self.components.iter().any(|c| c.description == description)
    }

    pub fn descriptions(&self) -> BTreeSet<&str> {
        self.components.iter().map(|c| c.description.as_str()).collect()
    }

    pub fn invented(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| c.is_invented())
    }
}

impl PartialEq for Grammar {
    fn eq(&self, other: &Self) -> bool {
        self.descriptions() == other.descriptions()
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grammar v{} [", self.version)?;
        for (idx, c) in self.components.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&c.description)?;
        }
        f.write_str("]")
    }
}

/// Starting component set. `fix` is left out unless recursion is enabled.
pub fn base_primitives(y_combinator: bool) -> Vec<Expr> {
    let literals = BASE_LITERALS.iter().map(|v| Expr::int(*v));
    let named = NAMED_PRIMITIVES
        .iter()
        .copied()
        .filter(|p| y_combinator || *p != Primitive::Fix)
        .map(Expr::prim);
    literals.chain(named).collect()
}
