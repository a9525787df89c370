use crate::engine::primitives::{apply_primitive, fix, Primitive};
use crate::engine::types::{Env, EvalContext, EvalError, RtValue};
use crate::engine::Expr;
use crate::value::Value;

/// Evaluate a closed program on concrete inputs.
///
/// The program is curried: it is evaluated once, then applied to each input
/// in order. Tuples enter as lists and lists leave as tuples.
pub fn evaluate(program: &Expr, inputs: &[Value], ctx: &mut EvalContext) -> Result<Value, EvalError> {
    let expected = program.arity();
    if expected != inputs.len() {
        return Err(EvalError::ArityMismatch { expected, found: inputs.len() });
    }
    let mut f = eval(program, &Env::new(), ctx)?;
    for input in inputs {
        let x = RtValue::from_value(input)?;
        f = apply(f, x, ctx)?;
    }
    f.into_value()
}

pub fn eval(expr: &Expr, env: &Env, ctx: &mut EvalContext) -> Result<RtValue, EvalError> {
    ctx.tick()?;
    match expr {
        Expr::Index(i) => env.lookup(*i),
        Expr::Abstraction(body) => Ok(RtValue::Closure { body: body.clone(), env: env.clone() }),
        Expr::Primitive(p) => Ok(p
            .constant()
            .unwrap_or(RtValue::Partial { prim: *p, args: Vec::new() })),
        Expr::Invented(body) => eval(body, &Env::new(), ctx),
        Expr::Application(..) => {
            let (head, args) = expr.spine();
            ctx.enter()?;
            let res = eval_application(head, &args, env, ctx);
            ctx.leave();
            res
        }
    }
}

fn eval_application(
    head: &Expr,
    args: &[&Expr],
    env: &Env,
    ctx: &mut EvalContext,
) -> Result<RtValue, EvalError> {
    // `if` only evaluates the branch it takes; recursion through `fix` relies on it.
    if let Expr::Primitive(Primitive::If) = head {
        if args.len() >= 3 {
            let cond = eval(args[0], env, ctx)?.as_bool("if")?;
            let branch = if cond { args[1] } else { args[2] };
            let mut f = eval(branch, env, ctx)?;
            for arg in &args[3..] {
                let x = eval(arg, env, ctx)?;
                f = apply(f, x, ctx)?;
            }
            return Ok(f);
        }
    }

    let mut f = eval(head, env, ctx)?;
    for arg in args {
        let x = eval(arg, env, ctx)?;
        f = apply(f, x, ctx)?;
    }
    Ok(f)
}

pub fn apply(f: RtValue, x: RtValue, ctx: &mut EvalContext) -> Result<RtValue, EvalError> {
    ctx.tick()?;
    match f {
        RtValue::Closure { body, env } => {
            ctx.enter()?;
            let res = eval(&body, &env.bind(x), ctx);
            ctx.leave();
            res
        }
        RtValue::Partial { prim, mut args } => {
            args.push(x);
            if args.len() == prim.arity() {
                apply_primitive(prim, args, ctx)
            } else {
                Ok(RtValue::Partial { prim, args })
            }
        }
        RtValue::Recur(f) => fix(x, (*f).clone(), ctx),
        _ => Err(EvalError::TypeMismatch("application of a non-function")),
    }
}
