//! Lexical name resolution: the Defs/Uses maps the reducer is built on.
//!
//! This is deliberately shallower than a real type checker.  It resolves
//! every identifier to an object through lexical scopes, infers a shallow
//! "primitive kind" where a declaration makes it obvious, and pairs method
//! selectors with method declarations by name when that is unambiguous.
//! Anything it cannot resolve is a soft error: recorded, never fatal.  The
//! reducer tolerates partially populated maps; a candidate built on stale
//! or missing information just fails its predicate run and is rolled back.

use crate::ast::*;
use crate::token::Pos;
use slotmap::{new_key_type, SecondaryMap, SlotMap};
use std::collections::HashMap;

new_key_type! {
    pub struct ObjId;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ObjKind {
    Var,
    Const,
    Func,
    Method,
    TypeName,
    PkgName,
    Builtin,
}

/// Shallow primitive classification, used by the constant-inlining rule.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PrimKind {
    Int,
    Float,
    Char,
    Str,
    Bool,
}

#[derive(Clone, Debug)]
pub struct Object {
    pub name: String,
    pub kind: ObjKind,
    /// Declaring node; `None` for universe members.
    pub decl: Option<NodeRef>,
    pub prim: Option<PrimKind>,
}

impl Object {
    /// Whether the object is declared by this package, as opposed to the
    /// universe scope.
    pub fn is_package_local(&self) -> bool {
        self.decl.is_some() && self.kind != ObjKind::Builtin
    }

    /// The naming-only exported check.
    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }
}

#[derive(Clone, Debug, Default)]
pub struct TypeInfo {
    pub objects: SlotMap<ObjId, Object>,
    /// Identifier that declares an object.
    pub defs: SecondaryMap<ExprId, ObjId>,
    /// Identifier that refers to an object.
    pub uses: SecondaryMap<ExprId, ObjId>,
    /// Soft errors, reported but recoverable.
    pub errors: Vec<(Pos, String)>,
}

/// Resolves the whole package.  Never fails; missing information turns into
/// soft errors in `TypeInfo::errors`.
pub fn check(arena: &Arena, pkg: &Package) -> TypeInfo {
    let mut r = Resolver {
        arena,
        info: TypeInfo::default(),
        scopes: Vec::new(),
        methods: HashMap::new(),
    };
    r.push_universe();
    r.collect_package(pkg);
    for file in &pkg.files {
        r.resolve_file(file);
    }
    r.info
}

struct Resolver<'a> {
    arena: &'a Arena,
    info: TypeInfo,
    scopes: Vec<HashMap<String, ObjId>>,
    /// Package methods by name; ambiguous names resolve to nothing.
    methods: HashMap<String, Vec<ObjId>>,
}

const BUILTIN_FUNCS: &[&str] = &[
    "append", "cap", "close", "copy", "delete", "len", "make", "new", "panic", "print", "println",
    "recover",
];

const BUILTIN_CONSTS: &[&str] = &["true", "false", "nil", "iota"];

fn prim_of_type_name(name: &str) -> Option<PrimKind> {
    Some(match name {
        "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16" | "uint32"
        | "uint64" | "uintptr" | "byte" | "rune" => PrimKind::Int,
        "float32" | "float64" => PrimKind::Float,
        "string" => PrimKind::Str,
        "bool" => PrimKind::Bool,
        _ => return None,
    })
}

const BUILTIN_TYPES: &[&str] = &[
    "bool", "byte", "error", "float32", "float64", "int", "int8", "int16", "int32", "int64",
    "rune", "string", "uint", "uint8", "uint16", "uint32", "uint64", "uintptr",
];

impl<'a> Resolver<'a> {
    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn push_universe(&mut self) {
        self.push_scope();
        for &name in BUILTIN_FUNCS.iter().chain(BUILTIN_CONSTS) {
            let prim = match name {
                "true" | "false" => Some(PrimKind::Bool),
                "iota" => Some(PrimKind::Int),
                _ => None,
            };
            self.insert_obj(name.to_string(), ObjKind::Builtin, None, prim);
        }
        for &name in BUILTIN_TYPES {
            self.insert_obj(name.to_string(), ObjKind::Builtin, None, None);
        }
    }

    fn insert_obj(
        &mut self,
        name: String,
        kind: ObjKind,
        decl: Option<NodeRef>,
        prim: Option<PrimKind>,
    ) -> ObjId {
        let id = self.info.objects.insert(Object {
            name: name.clone(),
            kind,
            decl,
            prim,
        });
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .insert(name, id);
        id
    }

    fn lookup(&self, name: &str) -> Option<ObjId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    /// Defines `ident` in the innermost scope.  The blank identifier never
    /// declares an object.
    fn define(&mut self, ident: ExprId, kind: ObjKind, decl: NodeRef, prim: Option<PrimKind>) {
        let name = match self.arena.ident_name(ident) {
            None | Some("_") => return,
            Some(name) => name.to_string(),
        };
        let obj = self.insert_obj(name, kind, Some(decl), prim);
        self.info.defs.insert(ident, obj);
    }

    fn use_ident(&mut self, ident: ExprId) {
        let Some(name) = self.arena.ident_name(ident) else {
            return;
        };
        if name == "_" {
            return;
        }
        match self.lookup(name) {
            Some(obj) => {
                self.info.uses.insert(ident, obj);
            }
            None => {
                let pos = self.arena.exprs[ident].pos;
                self.info.errors.push((pos, format!("undefined: {name}")));
            }
        }
    }

    // ----- package-scope collection -----

    fn collect_package(&mut self, pkg: &Package) {
        self.push_scope();
        for file in &pkg.files {
            for &d in &file.decls {
                self.collect_decl(d);
            }
        }
    }

    fn collect_decl(&mut self, d: DeclId) {
        match self.arena.decls[d].kind.clone() {
            DeclKind::Func { name, recv, .. } => {
                if recv.is_some() {
                    self.collect_method(d, name);
                } else {
                    self.define(name, ObjKind::Func, NodeRef::Decl(d), None);
                }
            }
            DeclKind::Gen { kw, specs, .. } => {
                for s in specs {
                    self.collect_spec(kw, s);
                }
            }
        }
    }

    fn collect_method(&mut self, d: DeclId, name: ExprId) {
        let Some(name_str) = self.arena.ident_name(name) else {
            return;
        };
        if name_str == "_" {
            return;
        }
        let obj = self.info.objects.insert(Object {
            name: name_str.to_string(),
            kind: ObjKind::Method,
            decl: Some(NodeRef::Decl(d)),
            prim: None,
        });
        self.info.defs.insert(name, obj);
        self.methods.entry(name_str.to_string()).or_default().push(obj);
    }

    fn collect_spec(&mut self, kw: DeclKw, s: SpecId) {
        let node = NodeRef::Spec(s);
        match self.arena.specs[s].kind.clone() {
            SpecKind::Import { name, path } => {
                let local = match name {
                    Some(ident) => self.arena.ident_name(ident).map(str::to_string),
                    None => import_base_name(self.arena, path),
                };
                let Some(local) = local else { return };
                if local == "_" {
                    return;
                }
                let obj = self.insert_obj(local, ObjKind::PkgName, Some(node), None);
                if let Some(ident) = name {
                    self.info.defs.insert(ident, obj);
                }
            }
            SpecKind::Value { names, ty, values } => {
                let kind = if kw == DeclKw::Const {
                    ObjKind::Const
                } else {
                    ObjKind::Var
                };
                for (i, &ident) in names.iter().enumerate() {
                    let prim = self.value_prim(ty, values.get(i).copied());
                    self.define(ident, kind, node, prim);
                }
            }
            SpecKind::Type { name, .. } => {
                self.define(name, ObjKind::TypeName, node, None);
            }
        }
    }

    fn value_prim(&self, ty: Option<ExprId>, value: Option<ExprId>) -> Option<PrimKind> {
        if let Some(ty) = ty {
            if let ExprKind::Ident(name) = &self.arena.exprs[ty].kind {
                return prim_of_type_name(name);
            }
            return None;
        }
        self.expr_prim(value?)
    }

    /// Shallow literal-shape classification of an initializer.
    fn expr_prim(&self, e: ExprId) -> Option<PrimKind> {
        match &self.arena.exprs[e].kind {
            ExprKind::Lit { kind, .. } => Some(match kind {
                LitKind::Int => PrimKind::Int,
                LitKind::Float => PrimKind::Float,
                LitKind::Char => PrimKind::Char,
                LitKind::Str => PrimKind::Str,
            }),
            ExprKind::Ident(name) => match name.as_str() {
                "true" | "false" => Some(PrimKind::Bool),
                "iota" => Some(PrimKind::Int),
                _ => None,
            },
            ExprKind::Paren(inner) => self.expr_prim(*inner),
            ExprKind::Unary {
                op: UnOp::Plus | UnOp::Minus,
                expr,
            } => self.expr_prim(*expr),
            ExprKind::Binary { lhs, rhs, op } => match op {
                BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Quo | BinOp::Rem => {
                    let l = self.expr_prim(*lhs)?;
                    let r = self.expr_prim(*rhs)?;
                    (l == r).then_some(l)
                }
                _ => None,
            },
            _ => None,
        }
    }

    // ----- resolution -----

    fn resolve_file(&mut self, file: &File) {
        for &d in &file.decls {
            self.resolve_decl(d);
        }
    }

    fn resolve_decl(&mut self, d: DeclId) {
        match self.arena.decls[d].kind.clone() {
            DeclKind::Func {
                recv, sig, body, ..
            } => {
                self.push_scope();
                if let Some(recv) = &recv {
                    self.resolve_field_def(recv, NodeRef::Decl(d));
                }
                self.resolve_sig_def(&sig, NodeRef::Decl(d));
                if let Some(body) = body {
                    self.resolve_stmt(body);
                }
                self.pop_scope();
            }
            DeclKind::Gen { kw, specs, .. } => {
                for s in specs {
                    self.resolve_spec(kw, s, false);
                }
            }
        }
    }

    /// Resolves the contents of a spec.  With `local`, names are defined in
    /// the current scope as well (package-scope names were collected up
    /// front).
    fn resolve_spec(&mut self, kw: DeclKw, s: SpecId, local: bool) {
        let node = NodeRef::Spec(s);
        match self.arena.specs[s].kind.clone() {
            SpecKind::Import { .. } => {}
            SpecKind::Value { names, ty, values } => {
                if let Some(ty) = ty {
                    self.resolve_expr(ty);
                }
                for &v in &values {
                    self.resolve_expr(v);
                }
                if local {
                    let kind = if kw == DeclKw::Const {
                        ObjKind::Const
                    } else {
                        ObjKind::Var
                    };
                    for (i, &ident) in names.iter().enumerate() {
                        let prim = self.value_prim(ty, values.get(i).copied());
                        self.define(ident, kind, node, prim);
                    }
                }
            }
            SpecKind::Type { name, ty } => {
                self.resolve_expr(ty);
                if local {
                    self.define(name, ObjKind::TypeName, node, None);
                }
            }
        }
    }

    fn resolve_field_def(&mut self, field: &Field, decl: NodeRef) {
        self.resolve_expr(field.ty);
        let prim = match &self.arena.exprs[field.ty].kind {
            ExprKind::Ident(name) => prim_of_type_name(name),
            _ => None,
        };
        for &name in &field.names {
            self.define(name, ObjKind::Var, decl, prim);
        }
    }

    fn resolve_sig_def(&mut self, sig: &FuncSig, decl: NodeRef) {
        for field in sig.params.iter().chain(&sig.results) {
            self.resolve_field_def(field, decl);
        }
    }

    fn resolve_stmt(&mut self, s: StmtId) {
        let node = NodeRef::Stmt(s);
        match self.arena.stmts[s].kind.clone() {
            StmtKind::Empty | StmtKind::Branch(_) => {}
            StmtKind::Block(stmts) => {
                self.push_scope();
                for child in stmts {
                    self.resolve_stmt(child);
                }
                self.pop_scope();
            }
            StmtKind::If {
                init,
                cond,
                body,
                els,
            } => {
                self.push_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init);
                }
                self.resolve_expr(cond);
                self.resolve_stmt(body);
                if let Some(els) = els {
                    self.resolve_stmt(els);
                }
                self.pop_scope();
            }
            StmtKind::Switch { init, tag, cases } => {
                self.push_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init);
                }
                if let Some(tag) = tag {
                    self.resolve_expr(tag);
                }
                for case in &cases {
                    for &e in &case.exprs {
                        self.resolve_expr(e);
                    }
                    self.push_scope();
                    for &child in &case.body {
                        self.resolve_stmt(child);
                    }
                    self.pop_scope();
                }
                self.pop_scope();
            }
            StmtKind::Select { cases } => {
                for case in &cases {
                    self.push_scope();
                    if let Some(comm) = case.comm {
                        self.resolve_stmt(comm);
                    }
                    for &child in &case.body {
                        self.resolve_stmt(child);
                    }
                    self.pop_scope();
                }
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                self.push_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init);
                }
                if let Some(cond) = cond {
                    self.resolve_expr(cond);
                }
                if let Some(post) = post {
                    self.resolve_stmt(post);
                }
                self.resolve_stmt(body);
                self.pop_scope();
            }
            StmtKind::Range {
                key,
                value,
                define,
                expr,
                body,
            } => {
                self.push_scope();
                self.resolve_expr(expr);
                for ident in [key, value].into_iter().flatten() {
                    if define {
                        self.define(ident, ObjKind::Var, node, None);
                    } else {
                        self.resolve_expr(ident);
                    }
                }
                self.resolve_stmt(body);
                self.pop_scope();
            }
            StmtKind::Assign { lhs, op, rhs } => {
                for &e in &rhs {
                    self.resolve_expr(e);
                }
                if op == AssignOp::Define {
                    for (i, &ident) in lhs.iter().enumerate() {
                        let already = self
                            .arena
                            .ident_name(ident)
                            .and_then(|name| self.scopes.last().and_then(|s| s.get(name)).copied());
                        match already {
                            // Redeclaration in the same scope assigns to the
                            // existing object.
                            Some(obj) => {
                                self.info.uses.insert(ident, obj);
                            }
                            None => {
                                let prim = if lhs.len() == rhs.len() {
                                    self.expr_prim(rhs[i])
                                } else {
                                    None
                                };
                                self.define(ident, ObjKind::Var, node, prim);
                            }
                        }
                    }
                } else {
                    for &e in &lhs {
                        self.resolve_expr(e);
                    }
                }
            }
            StmtKind::IncDec { expr, .. } => self.resolve_expr(expr),
            StmtKind::Send { chan, value } => {
                self.resolve_expr(chan);
                self.resolve_expr(value);
            }
            StmtKind::Expr(e) | StmtKind::Defer(e) | StmtKind::Go(e) => self.resolve_expr(e),
            StmtKind::Return(results) => {
                for e in results {
                    self.resolve_expr(e);
                }
            }
            StmtKind::Decl(d) => {
                if let DeclKind::Gen { kw, specs, .. } = self.arena.decls[d].kind.clone() {
                    for s in specs {
                        self.resolve_spec(kw, s, true);
                    }
                }
            }
        }
    }

    fn resolve_expr(&mut self, e: ExprId) {
        match self.arena.exprs[e].kind.clone() {
            ExprKind::Ident(_) => self.use_ident(e),
            ExprKind::Lit { .. } | ExprKind::InterfaceType => {}
            ExprKind::Composite { ty, elems } => {
                if let Some(ty) = ty {
                    self.resolve_expr(ty);
                }
                for elem in elems {
                    match self.arena.exprs[elem].kind.clone() {
                        ExprKind::KeyValue { key, value } => {
                            // A bare identifier key is a struct field name,
                            // not a reference; other key forms are values.
                            if !matches!(self.arena.exprs[key].kind, ExprKind::Ident(_)) {
                                self.resolve_expr(key);
                            }
                            self.resolve_expr(value);
                        }
                        _ => self.resolve_expr(elem),
                    }
                }
            }
            ExprKind::KeyValue { key, value } => {
                self.resolve_expr(key);
                self.resolve_expr(value);
            }
            ExprKind::Call { func, args, .. } => {
                self.resolve_expr(func);
                for a in args {
                    self.resolve_expr(a);
                }
            }
            ExprKind::Index { expr, index } => {
                self.resolve_expr(expr);
                self.resolve_expr(index);
            }
            ExprKind::Slice {
                expr,
                low,
                high,
                max,
                ..
            } => {
                self.resolve_expr(expr);
                for part in [low, high, max].into_iter().flatten() {
                    self.resolve_expr(part);
                }
            }
            ExprKind::Unary { expr, .. } | ExprKind::Star(expr) | ExprKind::Paren(expr) => {
                self.resolve_expr(expr)
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.resolve_expr(lhs);
                self.resolve_expr(rhs);
            }
            ExprKind::Selector { expr, sel } => {
                self.resolve_expr(expr);
                let base_is_pkg = match &self.arena.exprs[expr].kind {
                    ExprKind::Ident(_) => self
                        .info
                        .uses
                        .get(expr)
                        .is_some_and(|&obj| self.info.objects[obj].kind == ObjKind::PkgName),
                    _ => false,
                };
                if !base_is_pkg {
                    self.resolve_selector_method(sel);
                }
            }
            ExprKind::FuncLit { sig, body } => {
                self.push_scope();
                self.resolve_sig_def(&sig, NodeRef::Expr(e));
                self.resolve_stmt(body);
                self.pop_scope();
            }
            ExprKind::ArrayType { len, elem } => {
                if let Some(len) = len {
                    self.resolve_expr(len);
                }
                self.resolve_expr(elem);
            }
            ExprKind::MapType { key, value } => {
                self.resolve_expr(key);
                self.resolve_expr(value);
            }
            ExprKind::ChanType { elem, .. } => self.resolve_expr(elem),
            ExprKind::StructType { fields } => {
                for field in &fields {
                    // Field names are not references.
                    self.resolve_expr(field.ty);
                }
            }
            ExprKind::FuncType(sig) => {
                for field in sig.params.iter().chain(&sig.results) {
                    self.resolve_expr(field.ty);
                }
            }
            ExprKind::Ellipsis(elem) => {
                if let Some(elem) = elem {
                    self.resolve_expr(elem);
                }
            }
        }
    }

    /// Pairs `x.M` with the package's method `M` when exactly one method of
    /// that name exists.
    fn resolve_selector_method(&mut self, sel: ExprId) {
        let Some(name) = self.arena.ident_name(sel) else {
            return;
        };
        if let Some(candidates) = self.methods.get(name) {
            if let [only] = candidates.as_slice() {
                self.info.uses.insert(sel, *only);
            }
        }
    }
}

fn import_base_name(arena: &Arena, path: ExprId) -> Option<String> {
    let ExprKind::Lit { text, .. } = &arena.exprs[path].kind else {
        return None;
    };
    let unquoted = crate::lit::unquote_str(text)?;
    Some(
        unquoted
            .rsplit('/')
            .next()
            .unwrap_or(&unquoted)
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_file;
    use std::path::Path;

    fn check_src(src: &str) -> (Arena, Package, TypeInfo) {
        let mut arena = Arena::new();
        let file = parse_file(&mut arena, Path::new("main.go"), src).expect("parse");
        let pkg = Package {
            name: file.package.clone(),
            files: vec![file],
        };
        let info = check(&arena, &pkg);
        (arena, pkg, info)
    }

    fn uses_of<'i>(info: &'i TypeInfo, name: &str) -> Vec<ObjId> {
        info.uses
            .iter()
            .filter(|&(_, &obj)| info.objects[obj].name == name)
            .map(|(_, &obj)| obj)
            .collect()
    }

    #[test]
    fn defs_and_uses() {
        let (_, _, info) = check_src(
            "package main\n\nconst k = 5\n\nfunc main() {\n\tprintln(k + 1)\n}\n",
        );
        assert!(info.errors.is_empty(), "{:?}", info.errors);
        let uses = uses_of(&info, "k");
        assert_eq!(uses.len(), 1);
        let obj = &info.objects[uses[0]];
        assert_eq!(obj.kind, ObjKind::Const);
        assert_eq!(obj.prim, Some(PrimKind::Int));
        assert!(obj.is_package_local());
        assert!(!obj.is_exported());
    }

    #[test]
    fn builtins_are_not_package_local() {
        let (_, _, info) = check_src("package p\n\nfunc f(s string) int {\n\treturn len(s)\n}\n");
        let uses = uses_of(&info, "len");
        assert_eq!(uses.len(), 1);
        assert!(!info.objects[uses[0]].is_package_local());
    }

    #[test]
    fn import_names_resolve_to_pkg_objects() {
        let (_, _, info) = check_src(
            "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(1)\n}\n",
        );
        assert!(info.errors.is_empty(), "{:?}", info.errors);
        let uses = uses_of(&info, "fmt");
        assert_eq!(uses.len(), 1);
        assert_eq!(info.objects[uses[0]].kind, ObjKind::PkgName);
        // `Println` is an external symbol and must not resolve.
        assert!(uses_of(&info, "Println").is_empty());
    }

    #[test]
    fn methods_pair_with_unambiguous_selectors() {
        let (_, _, info) = check_src(
            "package p\n\ntype T struct{}\n\nfunc (t T) M() {}\n\nfunc f(x T) {\n\tx.M()\n}\n",
        );
        let uses = uses_of(&info, "M");
        assert_eq!(uses.len(), 1);
        assert_eq!(info.objects[uses[0]].kind, ObjKind::Method);
    }

    #[test]
    fn shadowing_and_short_decls() {
        let (_, _, info) = check_src(
            "package p\n\nvar x = 1\n\nfunc f() int {\n\tx := 2\n\tif x > 0 {\n\t\tx := 3\n\t\t_ = x\n\t}\n\treturn x\n}\n",
        );
        assert!(info.errors.is_empty(), "{:?}", info.errors);
        // Three distinct `x` objects exist.
        let objs: Vec<_> = info
            .objects
            .iter()
            .filter(|(_, o)| o.name == "x")
            .collect();
        assert_eq!(objs.len(), 3);
    }

    #[test]
    fn unresolved_is_a_soft_error() {
        let (_, _, info) = check_src("package p\n\nfunc f() {\n\tmystery()\n}\n");
        assert_eq!(info.errors.len(), 1);
        assert!(info.errors[0].1.contains("mystery"));
    }

    #[test]
    fn range_defines_its_names() {
        let (_, _, info) = check_src(
            "package p\n\nfunc f(a []int) int {\n\tt := 0\n\tfor i, v := range a {\n\t\tt += i + v\n\t}\n\treturn t\n}\n",
        );
        assert!(info.errors.is_empty(), "{:?}", info.errors);
    }
}
