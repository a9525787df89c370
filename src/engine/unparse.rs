use crate::engine::Expr;

/// Canonical textual description of a program.
///
/// Applications are printed with their spine flattened, `(f a b)`, abstractions
/// as `(lambda body)`, variables as `$n` and invented components with a leading
/// `#`. The output parses back to an identical `Expr`.
pub fn unparse(expr: &Expr) -> String {
    enum Item<'a> {
        Node(&'a Expr),
        Text(&'static str),
    }

    let mut out = String::new();
    let mut stack: Vec<Item<'_>> = vec![Item::Node(expr)];

    while let Some(item) = stack.pop() {
        match item {
            Item::Text(s) => out.push_str(s),
            Item::Node(e) => match e {
                Expr::Index(i) => {
                    out.push('$');
                    out.push_str(&i.to_string());
                }
                Expr::Primitive(p) => out.push_str(&p.name()),
                Expr::Invented(body) => {
                    out.push('#');
                    stack.push(Item::Node(body));
                }
                Expr::Abstraction(body) => {
                    out.push_str("(lambda ");
                    stack.push(Item::Text(")"));
                    stack.push(Item::Node(body));
                }
                Expr::Application(..) => {
                    let (head, args) = e.spine();
                    out.push('(');
                    stack.push(Item::Text(")"));
                    for arg in args.iter().rev() {
                        stack.push(Item::Node(arg));
                        stack.push(Item::Text(" "));
                    }
                    stack.push(Item::Node(head));
                }
            },
        }
    }
    out
}
