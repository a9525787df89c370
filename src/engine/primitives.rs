use crate::engine::reduce::apply;
use crate::engine::types::{EvalContext, EvalError, RtValue};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Int(i64),
    Incr,
    Decr,
    Add,
    Sub,
    Mul,
    Eq,
    Gt,
    If,
    Empty,
    Cons,
    Car,
    Cdr,
    IsEmpty,
    Length,
    Fix,
}

/// Non-literal primitives in a stable order.
pub const NAMED_PRIMITIVES: [Primitive; 15] = [
    Primitive::Incr,
    Primitive::Decr,
    Primitive::Add,
    Primitive::Sub,
    Primitive::Mul,
    Primitive::Eq,
    Primitive::Gt,
    Primitive::If,
    Primitive::Empty,
    Primitive::Cons,
    Primitive::Car,
    Primitive::Cdr,
    Primitive::IsEmpty,
    Primitive::Length,
    Primitive::Fix,
];

impl Primitive {
    pub fn name(&self) -> String {
        match self {
            Primitive::Int(v) => v.to_string(),
            Primitive::Incr => "incr".into(),
            Primitive::Decr => "decr".into(),
            Primitive::Add => "+".into(),
            Primitive::Sub => "-".into(),
            Primitive::Mul => "*".into(),
            Primitive::Eq => "eq?".into(),
            Primitive::Gt => "gt?".into(),
            Primitive::If => "if".into(),
            Primitive::Empty => "empty".into(),
            Primitive::Cons => "cons".into(),
            Primitive::Car => "car".into(),
            Primitive::Cdr => "cdr".into(),
            Primitive::IsEmpty => "empty?".into(),
            Primitive::Length => "length".into(),
            Primitive::Fix => "fix".into(),
        }
    }

    pub fn from_name(s: &str) -> Option<Primitive> {
        if let Ok(v) = s.parse::<i64>() {
            return Some(Primitive::Int(v));
        }
        NAMED_PRIMITIVES.iter().copied().find(|p| p.name() == s)
    }

    /// Number of arguments consumed before the primitive fires.
    pub fn arity(&self) -> usize {
        match self {
            Primitive::Int(_) | Primitive::Empty => 0,
            Primitive::Incr
            | Primitive::Decr
            | Primitive::Car
            | Primitive::Cdr
            | Primitive::IsEmpty
            | Primitive::Length => 1,
            Primitive::Add
            | Primitive::Sub
            | Primitive::Mul
            | Primitive::Eq
            | Primitive::Gt
            | Primitive::Cons
            | Primitive::Fix => 2,
            Primitive::If => 3,
        }
    }

    /// Primitives that expect a function argument. Bottom-up enumeration only
    /// builds first-order terms, so these are skipped there.
    pub fn is_higher_order(&self) -> bool {
        matches!(self, Primitive::Fix)
    }

    /// Value of a nullary primitive.
    pub fn constant(&self) -> Option<RtValue> {
        match self {
            Primitive::Int(v) => Some(RtValue::Int(*v)),
            Primitive::Empty => Some(RtValue::List(Rc::new(Vec::new()))),
            _ => None,
        }
    }
}

pub fn apply_primitive(
    p: Primitive,
    args: Vec<RtValue>,
    ctx: &mut EvalContext,
) -> Result<RtValue, EvalError> {
    if args.len() != p.arity() {
        return Err(EvalError::ArityMismatch { expected: p.arity(), found: args.len() });
    }
    match p {
        Primitive::Int(_) | Primitive::Empty => p.constant().ok_or(EvalError::TypeMismatch("constant")),
        Primitive::Incr => {
            let a = args[0].as_int("incr")?;
            a.checked_add(1).map(RtValue::Int).ok_or(EvalError::Overflow)
        }
        Primitive::Decr => {
            let a = args[0].as_int("decr")?;
            a.checked_sub(1).map(RtValue::Int).ok_or(EvalError::Overflow)
        }
        Primitive::Add | Primitive::Sub | Primitive::Mul => {
            let a = args[0].as_int("arithmetic")?;
            let b = args[1].as_int("arithmetic")?;
            let res = match p {
                Primitive::Add => a.checked_add(b),
                Primitive::Sub => a.checked_sub(b),
                _ => a.checked_mul(b),
            };
            res.map(RtValue::Int).ok_or(EvalError::Overflow)
        }
        Primitive::Eq => match (&args[0], &args[1]) {
            (RtValue::Int(a), RtValue::Int(b)) => Ok(RtValue::Bool(a == b)),
            (RtValue::List(a), RtValue::List(b)) => Ok(RtValue::Bool(a == b)),
            _ => Err(EvalError::TypeMismatch("eq?")),
        },
        Primitive::Gt => {
            let a = args[0].as_int("gt?")?;
            let b = args[1].as_int("gt?")?;
            Ok(RtValue::Bool(a > b))
        }
        Primitive::If => {
            // Reached only when `if` is passed around as a value; both branches are
            // already evaluated at this point.
            let mut args = args;
            let c = args[0].as_bool("if")?;
            let e = args.pop().ok_or(EvalError::TypeMismatch("if"))?;
            let t = args.pop().ok_or(EvalError::TypeMismatch("if"))?;
            Ok(if c { t } else { e })
        }
        Primitive::Cons => {
            let x = args[0].as_int("cons")?;
            let xs = args[1].as_list("cons")?;
            let mut out = Vec::with_capacity(xs.len() + 1);
            out.push(x);
            out.extend_from_slice(xs);
            Ok(RtValue::List(Rc::new(out)))
        }
        Primitive::Car => {
            let xs = args[0].as_list("car")?;
            xs.first().copied().map(RtValue::Int).ok_or(EvalError::IndexOutOfRange("car"))
        }
        Primitive::Cdr => {
            let xs = args[0].as_list("cdr")?;
            if xs.is_empty() {
                return Err(EvalError::IndexOutOfRange("cdr"));
            }
            Ok(RtValue::List(Rc::new(xs[1..].to_vec())))
        }
        Primitive::IsEmpty => Ok(RtValue::Bool(args[0].as_list("empty?")?.is_empty())),
        Primitive::Length => Ok(RtValue::Int(args[0].as_list("length")?.len() as i64)),
        Primitive::Fix => {
            // fix x f = f (fix _ f) x
            let mut args = args;
            let f = args.pop().ok_or(EvalError::TypeMismatch("fix"))?;
            let x = args.pop().ok_or(EvalError::TypeMismatch("fix"))?;
            fix(x, f, ctx)
        }
    }
}

pub fn fix(x: RtValue, f: RtValue, ctx: &mut EvalContext) -> Result<RtValue, EvalError> {
    ctx.enter()?;
    let recur = RtValue::Recur(Rc::new(f.clone()));
    let step = apply(f, recur, ctx).and_then(|g| apply(g, x, ctx));
    ctx.leave();
    step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for p in NAMED_PRIMITIVES {
            assert_eq!(Primitive::from_name(&p.name()), Some(p));
        }
        assert_eq!(Primitive::from_name("-3"), Some(Primitive::Int(-3)));
        assert_eq!(Primitive::from_name("nope"), None);
    }

    #[test]
    fn test_car_of_empty_is_index_failure() {
        let mut ctx = EvalContext::default();
        let res = apply_primitive(Primitive::Car, vec![RtValue::List(Rc::new(vec![]))], &mut ctx);
        assert_eq!(res.unwrap_err(), EvalError::IndexOutOfRange("car"));
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut ctx = EvalContext::default();
        let res = apply_primitive(Primitive::Add, vec![RtValue::Int(i64::MAX), RtValue::Int(1)], &mut ctx);
        assert_eq!(res.unwrap_err(), EvalError::Overflow);
    }
}
