//! Engine - program terms and their bounded evaluation.
pub mod primitives;
pub mod reduce;
pub mod types;
pub mod unparse;


pub use primitives::Primitive;
pub use reduce::{apply, eval, evaluate};
pub use types::{EvalContext, EvalError, RtValue};
pub use unparse::unparse;

use std::fmt;
use std::rc::Rc;

/// A program term in de Bruijn form.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Index(usize),
    Abstraction(Rc<Expr>),
    Application(Rc<Expr>, Rc<Expr>),
    Primitive(Primitive),
    /// A closed sub-program promoted into the grammar, printed as `#body`.
    Invented(Rc<Expr>),
}

impl Expr {
    pub fn var(i: usize) -> Self {
        Expr::Index(i)
    }

    pub fn prim(p: Primitive) -> Self {
        Expr::Primitive(p)
    }

    pub fn int(v: i64) -> Self {
        Expr::Primitive(Primitive::Int(v))
    }

    pub fn lambda(body: Expr) -> Self {
        Expr::Abstraction(Rc::new(body))
    }

    /// Wrap `body` in `n` abstractions.
    pub fn lambdas(n: usize, body: Expr) -> Self {
        (0..n).fold(body, |acc, _| Expr::lambda(acc))
    }

    pub fn invented(body: Expr) -> Self {
        Expr::Invented(Rc::new(body))
    }

    /// `(f a b ...)` as a left-nested application.
    pub fn apply(f: Expr, args: impl IntoIterator<Item = Expr>) -> Self {
        args.into_iter()
            .fold(f, |acc, arg| Expr::Application(Rc::new(acc), Rc::new(arg)))
    }

    /// Head and arguments of the application spine.
    pub fn spine(&self) -> (&Expr, Vec<&Expr>) {
        let mut args = Vec::new();
        let mut curr = self;
        while let Expr::Application(f, x) = curr {
            args.push(x.as_ref());
            curr = f.as_ref();
        }
        args.reverse();
        (curr, args)
    }

    /// Number of arguments the program takes before producing a value.
    pub fn arity(&self) -> usize {
        match self {
            Expr::Abstraction(body) => 1 + body.arity(),
            Expr::Invented(body) => body.arity(),
            Expr::Primitive(p) => p.arity(),
            Expr::Index(_) => 0,
            Expr::Application(..) => {
                let (head, args) = self.spine();
                match head {
                    Expr::Primitive(_) | Expr::Invented(_) => head.arity().saturating_sub(args.len()),
                    _ => 0,
                }
            }
        }
    }

    /// Node count; invented components count as one node.
    pub fn size(&self) -> usize {
        let mut total = 0;
        let mut stack = vec![self];
        while let Some(e) = stack.pop() {
            total += 1;
            match e {
                Expr::Abstraction(body) => stack.push(body),
                Expr::Application(f, x) => {
                    stack.push(f);
                    stack.push(x);
                }
                _ => {}
            }
        }
        total
    }

    pub fn uses_invented(&self) -> bool {
        let mut stack = vec![self];
        while let Some(e) = stack.pop() {
            match e {
                Expr::Invented(_) => return true,
                Expr::Abstraction(body) => stack.push(body),
                Expr::Application(f, x) => {
                    stack.push(f);
                    stack.push(x);
                }
                _ => {}
            }
        }
        false
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&unparse(self))
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&unparse(self))
    }
}
