//! The partial evaluator over literals and composites.
//!
//! `resolve` maps an expression to an equivalent literal or
//! literal-composite value, or to `None` when the expression is outside the
//! supported forms.  It never mutates the tree; `materialize` builds fresh
//! nodes for a value only once the walker decides to propose it.
//!
//! Integer arithmetic is host-width and wrapping; division truncates toward
//! zero and division by zero is simply not resolvable.  Indexing a string
//! addresses bytes, as the language does.

use goshrink_syntax::ast::*;
use goshrink_syntax::lit;
use goshrink_syntax::resolve::{ObjKind, TypeInfo};
use goshrink_syntax::Pos;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    /// Carried as source text; floats participate in composites but not in
    /// arithmetic.
    Float(String),
    Char(char),
    Str(String),
    Composite { ty: Option<ExprId>, elems: Vec<Value> },
}

pub fn resolve(arena: &Arena, info: &TypeInfo, e: ExprId) -> Option<Value> {
    match &arena.exprs[e].kind {
        ExprKind::Lit { kind, text } => match kind {
            LitKind::Int => lit::parse_int(text).map(Value::Int),
            LitKind::Float => Some(Value::Float(text.clone())),
            LitKind::Char => lit::unquote_char(text).map(Value::Char),
            LitKind::Str => lit::unquote_str(text).map(Value::Str),
        },
        ExprKind::Paren(inner) => resolve(arena, info, *inner),
        ExprKind::Composite { ty, elems } => {
            let mut values = Vec::with_capacity(elems.len());
            for &elem in elems {
                if matches!(arena.exprs[elem].kind, ExprKind::KeyValue { .. }) {
                    return None;
                }
                values.push(resolve(arena, info, elem)?);
            }
            Some(Value::Composite {
                ty: *ty,
                elems: values,
            })
        }
        ExprKind::Unary { op, expr } => {
            let Value::Int(n) = resolve(arena, info, *expr)? else {
                return None;
            };
            match op {
                UnOp::Plus => Some(Value::Int(n)),
                UnOp::Minus => Some(Value::Int(n.wrapping_neg())),
                _ => None,
            }
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let l = resolve(arena, info, *lhs)?;
            let r = resolve(arena, info, *rhs)?;
            match (l, r) {
                (Value::Int(a), Value::Int(b)) => {
                    let n = match op {
                        BinOp::Add => a.wrapping_add(b),
                        BinOp::Sub => a.wrapping_sub(b),
                        BinOp::Mul => a.wrapping_mul(b),
                        BinOp::Quo => {
                            if b == 0 {
                                return None;
                            }
                            a.wrapping_div(b)
                        }
                        _ => return None,
                    };
                    Some(Value::Int(n))
                }
                (Value::Str(a), Value::Str(b)) if *op == BinOp::Add => Some(Value::Str(a + &b)),
                _ => None,
            }
        }
        ExprKind::Index { expr, index } => {
            let Value::Int(i) = resolve(arena, info, *index)? else {
                return None;
            };
            let i = usize::try_from(i).ok()?;
            match resolve(arena, info, *expr)? {
                Value::Str(s) => s.as_bytes().get(i).map(|&b| Value::Char(b as char)),
                Value::Composite { elems, .. } => elems.get(i).cloned(),
                _ => None,
            }
        }
        ExprKind::Slice {
            expr,
            low,
            high,
            max,
            ..
        } => {
            if max.is_some() {
                return None;
            }
            let base = resolve(arena, info, *expr)?;
            let lo = match low {
                Some(e) => int_of(resolve(arena, info, *e)?)?,
                None => 0,
            };
            match base {
                Value::Str(s) => {
                    let hi = match high {
                        Some(e) => int_of(resolve(arena, info, *e)?)?,
                        None => s.len(),
                    };
                    if lo > hi || hi > s.len() || !s.is_char_boundary(lo) || !s.is_char_boundary(hi)
                    {
                        return None;
                    }
                    Some(Value::Str(s[lo..hi].to_string()))
                }
                Value::Composite { ty, elems } => {
                    let hi = match high {
                        Some(e) => int_of(resolve(arena, info, *e)?)?,
                        None => elems.len(),
                    };
                    if lo > hi || hi > elems.len() {
                        return None;
                    }
                    Some(Value::Composite {
                        ty,
                        elems: elems[lo..hi].to_vec(),
                    })
                }
                _ => None,
            }
        }
        ExprKind::Call { func, args, spread } => {
            if *spread {
                return None;
            }
            match builtin_name(arena, info, *func)? {
                "len" => {
                    let [arg] = args.as_slice() else { return None };
                    let n = match resolve(arena, info, *arg)? {
                        Value::Str(s) => s.len(),
                        Value::Composite { elems, .. } => elems.len(),
                        _ => return None,
                    };
                    Some(Value::Int(n as i64))
                }
                "append" => {
                    let (&first, rest) = args.split_first()?;
                    let Value::Composite { ty, mut elems } = resolve(arena, info, first)? else {
                        return None;
                    };
                    for &arg in rest {
                        elems.push(resolve(arena, info, arg)?);
                    }
                    Some(Value::Composite { ty, elems })
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn int_of(v: Value) -> Option<usize> {
    match v {
        Value::Int(n) => usize::try_from(n).ok(),
        _ => None,
    }
}

/// The callee's name, provided it resolves to the universe scope (a user
/// declaration shadowing `len` must not fold).
fn builtin_name<'a>(arena: &'a Arena, info: &TypeInfo, func: ExprId) -> Option<&'a str> {
    let ExprKind::Ident(name) = &arena.exprs[func].kind else {
        return None;
    };
    let &obj = info.uses.get(func)?;
    (info.objects[obj].kind == ObjKind::Builtin).then_some(name.as_str())
}

/// Builds fresh nodes for `value`.  Composite element types are deep-copied
/// so the result shares nothing with the expression it came from.
pub fn materialize(arena: &mut Arena, value: &Value, pos: Pos) -> ExprId {
    match value {
        Value::Int(n) => int_expr(arena, *n, pos),
        Value::Float(text) => arena.expr(
            ExprKind::Lit {
                kind: LitKind::Float,
                text: text.clone(),
            },
            pos,
        ),
        Value::Char(c) => arena.expr(
            ExprKind::Lit {
                kind: LitKind::Char,
                text: lit::quote_char(*c),
            },
            pos,
        ),
        Value::Str(s) => arena.expr(
            ExprKind::Lit {
                kind: LitKind::Str,
                text: lit::quote_str(s),
            },
            pos,
        ),
        Value::Composite { ty, elems } => {
            let ty = ty.map(|t| arena.clone_expr(t));
            let elems = elems
                .iter()
                .map(|v| materialize(arena, v, pos))
                .collect();
            arena.expr(ExprKind::Composite { ty, elems }, pos)
        }
    }
}

fn int_expr(arena: &mut Arena, n: i64, pos: Pos) -> ExprId {
    let text = n.unsigned_abs().to_string();
    let literal = arena.expr(
        ExprKind::Lit {
            kind: LitKind::Int,
            text,
        },
        pos,
    );
    if n < 0 {
        arena.expr(
            ExprKind::Unary {
                op: UnOp::Minus,
                expr: literal,
            },
            pos,
        )
    } else {
        literal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goshrink_syntax::parser::parse_file;
    use goshrink_syntax::printer;
    use goshrink_syntax::resolve::check;
    use std::path::Path;

    /// Parses `src` as the body of `var probe = <src>` and resolves it.
    fn eval(src: &str) -> (Arena, TypeInfo, ExprId, Option<Value>) {
        let text = format!("package p\n\nvar sink = []int{{}}\n\nvar probe = {src}\n");
        let mut arena = Arena::new();
        let file = parse_file(&mut arena, Path::new("main.go"), &text).expect("parse");
        let pkg = Package {
            name: file.package.clone(),
            files: vec![file.clone()],
        };
        let info = check(&arena, &pkg);
        let DeclKind::Gen { specs, .. } = &arena.decls[file.decls[1]].kind else {
            panic!()
        };
        let SpecKind::Value { values, .. } = &arena.specs[specs[0]].kind else {
            panic!()
        };
        let e = values[0];
        let v = resolve(&arena, &info, e);
        (arena, info, e, v)
    }

    fn eval_value(src: &str) -> Option<Value> {
        eval(src).3
    }

    #[test]
    fn double_negation_matches_plain() {
        assert_eq!(eval_value("-(-7)"), eval_value("7"));
    }

    #[test]
    fn len_of_string() {
        assert_eq!(eval_value("len(\"abc\")"), Some(Value::Int(3)));
    }

    #[test]
    fn string_concat() {
        assert_eq!(eval_value("\"a\" + \"b\""), Some(Value::Str("ab".into())));
    }

    #[test]
    fn append_concatenates() {
        let v = eval_value("append([]int{1, 2}, 3)").expect("resolves");
        let Value::Composite { elems, .. } = v else { panic!() };
        assert_eq!(elems, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn arithmetic_truncates() {
        assert_eq!(eval_value("7 / 2"), Some(Value::Int(3)));
        assert_eq!(eval_value("5 + 1"), Some(Value::Int(6)));
        assert_eq!(eval_value("1 / 0"), None);
    }

    #[test]
    fn string_index_is_a_byte() {
        assert_eq!(eval_value("\"abc\"[1]"), Some(Value::Char('b')));
        assert_eq!(eval_value("\"abc\"[3]"), None);
    }

    #[test]
    fn composite_index_and_slice() {
        assert_eq!(eval_value("[]int{1, 2, 3}[1]"), Some(Value::Int(2)));
        let v = eval_value("[]int{1, 2, 3, 4}[1:3]").expect("resolves");
        let Value::Composite { elems, .. } = v else { panic!() };
        assert_eq!(elems, vec![Value::Int(2), Value::Int(3)]);
        assert_eq!(eval_value("[]int{1}[0:9]"), None);
    }

    #[test]
    fn slice_chain_resolves_through() {
        assert_eq!(eval_value("[]int{1, 2, 3, 4}[1:3][0]"), Some(Value::Int(2)));
    }

    #[test]
    fn unsupported_forms_do_not_resolve_or_mutate() {
        let (arena, info, e, v) = eval("sink[0] * 2");
        assert_eq!(v, None);
        // A second resolution over the untouched tree agrees.
        assert_eq!(resolve(&arena, &info, e), None);
    }

    #[test]
    fn shadowed_builtins_do_not_fold() {
        let text = "package p\n\nfunc len(s string) int {\n\treturn 0\n}\n\nvar probe = len(\"abc\")\n";
        let mut arena = Arena::new();
        let file = parse_file(&mut arena, Path::new("main.go"), text).expect("parse");
        let pkg = Package {
            name: file.package.clone(),
            files: vec![file.clone()],
        };
        let info = check(&arena, &pkg);
        let DeclKind::Gen { specs, .. } = &arena.decls[file.decls[1]].kind else {
            panic!()
        };
        let SpecKind::Value { values, .. } = &arena.specs[specs[0]].kind else {
            panic!()
        };
        assert_eq!(resolve(&arena, &info, values[0]), None);
    }

    #[test]
    fn materialized_negative_int_prints_as_expected() {
        let mut arena = Arena::new();
        let e = materialize(&mut arena, &Value::Int(-4), Pos::NONE);
        assert_eq!(printer::expr_to_string(&arena, e), "-4");
    }

    #[test]
    fn materialized_composite_prints_with_its_type() {
        let (mut arena, _, _, v) = eval("append([]int{1}, 2)");
        let v = v.expect("resolves");
        let e = materialize(&mut arena, &v, Pos::NONE);
        assert_eq!(printer::expr_to_string(&arena, e), "[]int{1, 2}");
    }
}
