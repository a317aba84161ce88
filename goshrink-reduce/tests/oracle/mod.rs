//! An in-process stand-in for the external toolchain.
//!
//! It parses the scratch directory with the real frontend, reports the
//! compile errors the toolchain would report (undefined names, unused
//! short-form locals, unused imports), and interprets `main` with a small
//! evaluator covering the forms the fixtures use.  Statements outside that
//! coverage are skipped.

use goshrink_syntax::ast::*;
use goshrink_syntax::lit;
use goshrink_syntax::parser;
use goshrink_syntax::resolve::{self, ObjKind, TypeInfo};
use std::collections::HashMap;
use std::io;
use std::path::Path;

pub fn run(dir: &Path) -> io::Result<Vec<u8>> {
    let mut arena = Arena::new();
    let pkg = match parser::parse_dir(&mut arena, dir) {
        Ok(pkg) => pkg,
        Err(err) => return Ok(format!("parse error: {err}\n").into_bytes()),
    };
    let info = resolve::check(&arena, &pkg);
    if let Some((pos, msg)) = info.errors.first() {
        return Ok(format!("{pos}: {msg}\n").into_bytes());
    }
    if let Some(err) = compile_errors(&arena, &pkg, &info) {
        return Ok(err.into_bytes());
    }

    let mut interp = Interp::new(&arena, &info);
    for file in &pkg.files {
        for &d in &file.decls {
            interp.collect_decl(d);
        }
    }
    interp.run_main();
    Ok(interp.out)
}

/// What the toolchain rejects: unused `:=` locals and unused imports.
fn compile_errors(arena: &Arena, pkg: &Package, info: &TypeInfo) -> Option<String> {
    let mut use_counts: HashMap<resolve::ObjId, usize> = HashMap::new();
    for file in &pkg.files {
        for &d in &file.decls {
            arena.walk(NodeRef::Decl(d), &mut |n| {
                if let NodeRef::Expr(e) = n {
                    if let Some(&obj) = info.uses.get(e) {
                        *use_counts.entry(obj).or_insert(0) += 1;
                    }
                }
            });
        }
    }
    for (id, object) in info.objects.iter() {
        if !object.is_package_local() || use_counts.get(&id).copied().unwrap_or(0) > 0 {
            continue;
        }
        match object.kind {
            ObjKind::Var if matches!(object.decl, Some(NodeRef::Stmt(_))) => {
                return Some(format!("declared and not used: {}\n", object.name));
            }
            ObjKind::PkgName => {
                return Some(format!("imported and not used: {}\n", object.name));
            }
            _ => {}
        }
    }
    None
}

#[derive(Clone, Debug, PartialEq)]
enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
    List(Vec<Value>),
}

impl Value {
    fn display(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Str(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::List(elems) => {
                let parts: Vec<String> = elems.iter().map(Value::display).collect();
                format!("[{}]", parts.join(" "))
            }
        }
    }
}

type Env = HashMap<String, Value>;

struct Interp<'a> {
    arena: &'a Arena,
    info: &'a TypeInfo,
    /// Function and method bodies by name; receivers are ignored.
    bodies: HashMap<String, StmtId>,
    globals: Env,
    out: Vec<u8>,
    panicked: bool,
}

impl<'a> Interp<'a> {
    fn new(arena: &'a Arena, info: &'a TypeInfo) -> Interp<'a> {
        Interp {
            arena,
            info,
            bodies: HashMap::new(),
            globals: Env::new(),
            out: Vec::new(),
            panicked: false,
        }
    }

    fn collect_decl(&mut self, d: DeclId) {
        match &self.arena.decls[d].kind {
            DeclKind::Func { name, body, .. } => {
                if let (Some(name), Some(body)) = (self.arena.ident_name(*name), body) {
                    self.bodies.insert(name.to_string(), *body);
                }
            }
            DeclKind::Gen { specs, .. } => {
                for &s in specs {
                    if let SpecKind::Value { names, values, .. } = &self.arena.specs[s].kind {
                        if names.len() != values.len() {
                            continue;
                        }
                        let env = self.globals.clone();
                        for (&name, &value) in names.iter().zip(values) {
                            let Some(name) = self.arena.ident_name(name) else {
                                continue;
                            };
                            if let Some(v) = eval(self.arena, &env, value) {
                                self.globals.insert(name.to_string(), v);
                            }
                        }
                    }
                }
            }
        }
    }

    fn run_main(&mut self) {
        let Some(&body) = self.bodies.get("main") else {
            return;
        };
        let mut env = self.globals.clone();
        self.exec(body, &mut env);
    }

    fn exec(&mut self, s: StmtId, env: &mut Env) {
        if self.panicked {
            return;
        }
        match self.arena.stmts[s].kind.clone() {
            StmtKind::Block(stmts) => {
                for child in stmts {
                    self.exec(child, env);
                }
            }
            StmtKind::If {
                init,
                cond,
                body,
                els,
            } => {
                if let Some(init) = init {
                    self.exec(init, env);
                }
                match eval(self.arena, env, cond) {
                    Some(Value::Bool(true)) => self.exec(body, env),
                    Some(Value::Bool(false)) => {
                        if let Some(els) = els {
                            self.exec(els, env);
                        }
                    }
                    _ => {}
                }
            }
            StmtKind::Assign { lhs, rhs, .. } => {
                if lhs.len() != rhs.len() {
                    return;
                }
                for (&name, &value) in lhs.iter().zip(&rhs) {
                    let Some(name) = self.arena.ident_name(name) else {
                        continue;
                    };
                    if name == "_" {
                        continue;
                    }
                    if let Some(v) = eval(self.arena, env, value) {
                        env.insert(name.to_string(), v);
                    }
                }
            }
            StmtKind::Decl(d) => {
                if let DeclKind::Gen { specs, .. } = self.arena.decls[d].kind.clone() {
                    for spec in specs {
                        if let SpecKind::Value { names, values, .. } =
                            self.arena.specs[spec].kind.clone()
                        {
                            if names.len() != values.len() {
                                continue;
                            }
                            for (&name, &value) in names.iter().zip(&values) {
                                let Some(name) = self.arena.ident_name(name) else {
                                    continue;
                                };
                                if let Some(v) = eval(self.arena, env, value) {
                                    env.insert(name.to_string(), v);
                                }
                            }
                        }
                    }
                }
            }
            StmtKind::Expr(e) | StmtKind::Defer(e) | StmtKind::Go(e) => self.call(e, env),
            _ => {}
        }
    }

    fn call(&mut self, e: ExprId, env: &mut Env) {
        let ExprKind::Call { func, args, .. } = self.arena.exprs[e].kind.clone() else {
            return;
        };
        let callee = match &self.arena.exprs[func].kind {
            ExprKind::Ident(name) => name.clone(),
            ExprKind::Selector { sel, .. } => {
                let Some(name) = self.arena.ident_name(*sel) else {
                    return;
                };
                name.to_string()
            }
            _ => return,
        };
        match callee.as_str() {
            "print" => {
                let text = self.eval_args(&args, env).join(" ");
                self.out.extend_from_slice(text.as_bytes());
            }
            "println" | "Println" => {
                let mut text = self.eval_args(&args, env).join(" ");
                text.push('\n');
                self.out.extend_from_slice(text.as_bytes());
            }
            "panic" => {
                let text = self.eval_args(&args, env).join(" ");
                self.out
                    .extend_from_slice(format!("panic: {text}\n").as_bytes());
                self.panicked = true;
            }
            name => {
                let body = self.bodies.get(name).copied();
                if let Some(body) = body {
                    let mut inner = self.globals.clone();
                    self.exec(body, &mut inner);
                }
            }
        }
    }

    fn eval_args(&self, args: &[ExprId], env: &Env) -> Vec<String> {
        args.iter()
            .map(|&a| {
                eval(self.arena, env, a).map_or_else(|| "?".to_string(), |v| v.display())
            })
            .collect()
    }
}

fn eval(arena: &Arena, env: &Env, e: ExprId) -> Option<Value> {
    match &arena.exprs[e].kind {
        ExprKind::Ident(name) => match name.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => env.get(name).cloned(),
        },
        ExprKind::Lit { kind, text } => match kind {
            LitKind::Int => lit::parse_int(text).map(Value::Int),
            LitKind::Str => lit::unquote_str(text).map(Value::Str),
            LitKind::Char => lit::unquote_char(text).map(|c| Value::Int(c as i64)),
            LitKind::Float => None,
        },
        ExprKind::Paren(inner) => eval(arena, env, *inner),
        ExprKind::Composite { elems, .. } => {
            let mut values = Vec::new();
            for &elem in elems {
                values.push(eval(arena, env, elem)?);
            }
            Some(Value::List(values))
        }
        ExprKind::Unary { op, expr } => {
            let Value::Int(n) = eval(arena, env, *expr)? else {
                return None;
            };
            match op {
                UnOp::Plus => Some(Value::Int(n)),
                UnOp::Minus => Some(Value::Int(-n)),
                _ => None,
            }
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let l = eval(arena, env, *lhs)?;
            let r = eval(arena, env, *rhs)?;
            match (l, r) {
                (Value::Int(a), Value::Int(b)) => match op {
                    BinOp::Add => Some(Value::Int(a + b)),
                    BinOp::Sub => Some(Value::Int(a - b)),
                    BinOp::Mul => Some(Value::Int(a * b)),
                    BinOp::Quo => (b != 0).then(|| Value::Int(a / b)),
                    BinOp::Eql => Some(Value::Bool(a == b)),
                    BinOp::Neq => Some(Value::Bool(a != b)),
                    BinOp::Lss => Some(Value::Bool(a < b)),
                    BinOp::Leq => Some(Value::Bool(a <= b)),
                    BinOp::Gtr => Some(Value::Bool(a > b)),
                    BinOp::Geq => Some(Value::Bool(a >= b)),
                    _ => None,
                },
                (Value::Str(a), Value::Str(b)) => match op {
                    BinOp::Add => Some(Value::Str(a + &b)),
                    BinOp::Eql => Some(Value::Bool(a == b)),
                    BinOp::Neq => Some(Value::Bool(a != b)),
                    _ => None,
                },
                _ => None,
            }
        }
        ExprKind::Index { expr, index } => {
            let Value::Int(i) = eval(arena, env, *index)? else {
                return None;
            };
            let i = usize::try_from(i).ok()?;
            match eval(arena, env, *expr)? {
                Value::Str(s) => s.as_bytes().get(i).map(|&b| Value::Int(i64::from(b))),
                Value::List(elems) => elems.get(i).cloned(),
                _ => None,
            }
        }
        ExprKind::Slice {
            expr, low, high, ..
        } => {
            let base = eval(arena, env, *expr)?;
            let lo = match low {
                Some(e) => usize::try_from(int(eval(arena, env, *e)?)?).ok()?,
                None => 0,
            };
            match base {
                Value::List(elems) => {
                    let hi = match high {
                        Some(e) => usize::try_from(int(eval(arena, env, *e)?)?).ok()?,
                        None => elems.len(),
                    };
                    (lo <= hi && hi <= elems.len())
                        .then(|| Value::List(elems[lo..hi].to_vec()))
                }
                Value::Str(s) => {
                    let hi = match high {
                        Some(e) => usize::try_from(int(eval(arena, env, *e)?)?).ok()?,
                        None => s.len(),
                    };
                    (lo <= hi && hi <= s.len() && s.is_char_boundary(lo) && s.is_char_boundary(hi))
                        .then(|| Value::Str(s[lo..hi].to_string()))
                }
                _ => None,
            }
        }
        ExprKind::Call { func, args, .. } => {
            let ExprKind::Ident(name) = &arena.exprs[*func].kind else {
                return None;
            };
            match name.as_str() {
                "len" => {
                    let [arg] = args.as_slice() else { return None };
                    match eval(arena, env, *arg)? {
                        Value::Str(s) => Some(Value::Int(s.len() as i64)),
                        Value::List(elems) => Some(Value::Int(elems.len() as i64)),
                        _ => None,
                    }
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn int(v: Value) -> Option<i64> {
    match v {
        Value::Int(n) => Some(n),
        _ => None,
    }
}
