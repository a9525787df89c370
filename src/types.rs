use serde::{Deserialize, Serialize};
use std::fmt;

/// Request types of synthesis tasks.
///
/// Only the shapes the vocabulary actually observes are representable: integers,
/// integer lists (tuples on the observation side) and curried arrows between them.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Type {
    Int,
    List(Box<Type>),
    Arrow(Box<Type>, Box<Type>),
}

impl Type {
    pub fn list(inner: Type) -> Self {
        Type::List(Box::new(inner))
    }

    /// Right-associated arrow chain `a -> b -> ... -> z`.
    ///
    /// A single component is returned unchanged (an arity-0 request).
    pub fn arrow(mut components: Vec<Type>) -> Self {
        let mut ty = match components.pop() {
            Some(ty) => ty,
            None => return Type::Int,
        };
        while let Some(arg) = components.pop() {
            ty = Type::Arrow(Box::new(arg), Box::new(ty));
        }
        ty
    }

    /// Number of arguments before the return type.
    pub fn arity(&self) -> usize {
        let mut n = 0;
        let mut curr = self;
        while let Type::Arrow(_, ret) = curr {
            n += 1;
            curr = ret;
        }
        n
    }

    /// Argument types in application order.
    pub fn arguments(&self) -> Vec<&Type> {
        let mut args = Vec::new();
        let mut curr = self;
        while let Type::Arrow(arg, ret) = curr {
            args.push(arg.as_ref());
            curr = ret;
        }
        args
    }

    pub fn returns(&self) -> &Type {
        let mut curr = self;
        while let Type::Arrow(_, ret) = curr {
            curr = ret;
        }
        curr
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Frame<'a> {
            Enter(&'a Type, bool),
            Text(&'a str),
        }

        let mut out = String::new();
        let mut stack = vec![Frame::Enter(self, false)];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Text(s) => out.push_str(s),
                Frame::Enter(t, parens) => match t {
                    Type::Int => out.push_str("int"),
                    Type::List(inner) => {
                        stack.push(Frame::Text(")"));
                        stack.push(Frame::Enter(inner, false));
                        stack.push(Frame::Text("list("));
                    }
                    Type::Arrow(a, b) => {
                        if parens {
                            stack.push(Frame::Text(")"));
                        }
                        stack.push(Frame::Enter(b, false));
                        stack.push(Frame::Text(" -> "));
                        stack.push(Frame::Enter(a, true));
                        if parens {
                            stack.push(Frame::Text("("));
                        }
                    }
                },
            }
        }

        f.write_str(&out)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_chain() {
        let t = Type::arrow(vec![Type::Int, Type::Int, Type::Int]);
        assert_eq!(t.arity(), 2);
        assert_eq!(format!("{}", t), "int -> int -> int");
        assert_eq!(t.returns(), &Type::Int);
    }

    #[test]
    fn test_nested_display() {
        let l = Type::list(Type::Int);
        let t = Type::arrow(vec![Type::arrow(vec![l.clone(), l.clone()]), l]);
        assert_eq!(format!("{:?}", t), "(list(int) -> list(int)) -> list(int)");
    }

    #[test]
    fn test_single_component_is_constant() {
        assert_eq!(Type::arrow(vec![Type::Int]).arity(), 0);
    }
}
