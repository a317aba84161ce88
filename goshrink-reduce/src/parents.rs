//! The parent index and the node-slot locator.
//!
//! The index is an auxiliary map keyed by node identity, rebuilt from a
//! preorder walk at the start of every outer-loop iteration and patched when
//! a slot is overwritten mid-walk.  Entries for detached subtrees go stale
//! harmlessly; nothing ever looks them up again.
//!
//! The locator rewrites the one slot in a parent that currently holds a
//! given child.  Not finding the slot means the index and the tree disagree,
//! which is a programming error, so it panics rather than limping on.

use goshrink_syntax::ast::*;
use slotmap::SecondaryMap;

#[derive(Default)]
pub struct Parents {
    expr: SecondaryMap<ExprId, NodeRef>,
    stmt: SecondaryMap<StmtId, NodeRef>,
    decl: SecondaryMap<DeclId, NodeRef>,
    spec: SecondaryMap<SpecId, NodeRef>,
}

impl Parents {
    pub fn new() -> Parents {
        Parents::default()
    }

    pub fn rebuild(&mut self, arena: &Arena, files: &[File]) {
        self.expr.clear();
        self.stmt.clear();
        self.decl.clear();
        self.spec.clear();
        for file in files {
            for &d in &file.decls {
                self.index_subtree(arena, NodeRef::Decl(d));
            }
        }
    }

    fn index_subtree(&mut self, arena: &Arena, root: NodeRef) {
        let mut children = Vec::new();
        arena.for_each_child(root, &mut |c| children.push(c));
        for child in children {
            self.set(child, root);
            self.index_subtree(arena, child);
        }
    }

    pub fn set(&mut self, child: NodeRef, parent: NodeRef) {
        match child {
            NodeRef::Expr(id) => {
                self.expr.insert(id, parent);
            }
            NodeRef::Stmt(id) => {
                self.stmt.insert(id, parent);
            }
            NodeRef::Decl(id) => {
                self.decl.insert(id, parent);
            }
            NodeRef::Spec(id) => {
                self.spec.insert(id, parent);
            }
        }
    }

    pub fn of_expr(&self, e: ExprId) -> NodeRef {
        *self.expr.get(e).expect("expression has no parent in the index")
    }

    pub fn of_stmt(&self, s: StmtId) -> NodeRef {
        *self.stmt.get(s).expect("statement has no parent in the index")
    }

    /// Top-level declarations have no parent node; they sit in a file.
    pub fn of_decl(&self, d: DeclId) -> Option<NodeRef> {
        self.decl.get(d).copied()
    }

    pub fn of_spec(&self, s: SpecId) -> NodeRef {
        *self.spec.get(s).expect("spec has no parent in the index")
    }
}

/// Overwrites the slot in `parent` currently holding expression `old`.
pub fn replace_expr_child(arena: &mut Arena, parent: NodeRef, old: ExprId, new: ExprId) {
    let found = match parent {
        NodeRef::Expr(p) => replace_in_expr(arena, p, old, new),
        NodeRef::Stmt(p) => replace_in_stmt(arena, p, old, new),
        NodeRef::Decl(p) => replace_in_decl(arena, p, old, new),
        NodeRef::Spec(p) => replace_in_spec(arena, p, old, new),
    };
    assert!(found, "expression slot not found in its parent");
}

/// Overwrites the slot in `parent` currently holding statement `old`.
pub fn replace_stmt_child(arena: &mut Arena, parent: NodeRef, old: StmtId, new: StmtId) {
    let found = match parent {
        NodeRef::Expr(p) => match &mut arena.exprs[p].kind {
            ExprKind::FuncLit { body, .. } => swap(body, old, new),
            _ => false,
        },
        NodeRef::Stmt(p) => replace_stmt_in_stmt(arena, p, old, new),
        NodeRef::Decl(p) => match &mut arena.decls[p].kind {
            DeclKind::Func { body: Some(body), .. } => swap(body, old, new),
            _ => false,
        },
        NodeRef::Spec(_) => false,
    };
    assert!(found, "statement slot not found in its parent");
}

fn swap<K: PartialEq + Copy>(slot: &mut K, old: K, new: K) -> bool {
    if *slot == old {
        *slot = new;
        true
    } else {
        false
    }
}

fn swap_opt<K: PartialEq + Copy>(slot: &mut Option<K>, old: K, new: K) -> bool {
    match slot {
        Some(v) if *v == old => {
            *slot = Some(new);
            true
        }
        _ => false,
    }
}

fn swap_list<K: PartialEq + Copy>(list: &mut [K], old: K, new: K) -> bool {
    for v in list {
        if *v == old {
            *v = new;
            return true;
        }
    }
    false
}

fn swap_fields(fields: &mut [Field], old: ExprId, new: ExprId) -> bool {
    for field in fields {
        if swap_list(&mut field.names, old, new) || swap(&mut field.ty, old, new) {
            return true;
        }
    }
    false
}

fn swap_sig(sig: &mut FuncSig, old: ExprId, new: ExprId) -> bool {
    swap_fields(&mut sig.params, old, new) || swap_fields(&mut sig.results, old, new)
}

fn replace_in_expr(arena: &mut Arena, p: ExprId, old: ExprId, new: ExprId) -> bool {
    match &mut arena.exprs[p].kind {
        ExprKind::Ident(_) | ExprKind::Lit { .. } | ExprKind::InterfaceType => false,
        ExprKind::Composite { ty, elems } => {
            swap_opt(ty, old, new) || swap_list(elems, old, new)
        }
        ExprKind::KeyValue { key, value } => swap(key, old, new) || swap(value, old, new),
        ExprKind::Call { func, args, .. } => swap(func, old, new) || swap_list(args, old, new),
        ExprKind::Index { expr, index } => swap(expr, old, new) || swap(index, old, new),
        ExprKind::Slice {
            expr,
            low,
            high,
            max,
            ..
        } => {
            swap(expr, old, new)
                || swap_opt(low, old, new)
                || swap_opt(high, old, new)
                || swap_opt(max, old, new)
        }
        ExprKind::Unary { expr, .. } | ExprKind::Star(expr) | ExprKind::Paren(expr) => {
            swap(expr, old, new)
        }
        ExprKind::Binary { lhs, rhs, .. } => swap(lhs, old, new) || swap(rhs, old, new),
        ExprKind::Selector { expr, sel } => swap(expr, old, new) || swap(sel, old, new),
        ExprKind::FuncLit { sig, .. } => swap_sig(sig, old, new),
        ExprKind::ArrayType { len, elem } => swap_opt(len, old, new) || swap(elem, old, new),
        ExprKind::MapType { key, value } => swap(key, old, new) || swap(value, old, new),
        ExprKind::ChanType { elem, .. } => swap(elem, old, new),
        ExprKind::StructType { fields } => swap_fields(fields, old, new),
        ExprKind::FuncType(sig) => swap_sig(sig, old, new),
        ExprKind::Ellipsis(elem) => swap_opt(elem, old, new),
    }
}

fn replace_in_stmt(arena: &mut Arena, p: StmtId, old: ExprId, new: ExprId) -> bool {
    match &mut arena.stmts[p].kind {
        StmtKind::Empty | StmtKind::Block(_) | StmtKind::Branch(_) | StmtKind::Decl(_) => false,
        StmtKind::If { cond, .. } => swap(cond, old, new),
        StmtKind::Switch { tag, cases, .. } => {
            swap_opt(tag, old, new)
                || cases
                    .iter_mut()
                    .any(|case| swap_list(&mut case.exprs, old, new))
        }
        StmtKind::Select { .. } => false,
        StmtKind::For { cond, .. } => swap_opt(cond, old, new),
        StmtKind::Range {
            key, value, expr, ..
        } => swap_opt(key, old, new) || swap_opt(value, old, new) || swap(expr, old, new),
        StmtKind::Assign { lhs, rhs, .. } => {
            swap_list(lhs, old, new) || swap_list(rhs, old, new)
        }
        StmtKind::IncDec { expr, .. } => swap(expr, old, new),
        StmtKind::Send { chan, value } => swap(chan, old, new) || swap(value, old, new),
        StmtKind::Expr(e) | StmtKind::Defer(e) | StmtKind::Go(e) => swap(e, old, new),
        StmtKind::Return(results) => swap_list(results, old, new),
    }
}

fn replace_in_decl(arena: &mut Arena, p: DeclId, old: ExprId, new: ExprId) -> bool {
    match &mut arena.decls[p].kind {
        DeclKind::Func {
            name, recv, sig, ..
        } => {
            swap(name, old, new)
                || recv
                    .as_mut()
                    .is_some_and(|field| {
                        swap_list(&mut field.names, old, new) || swap(&mut field.ty, old, new)
                    })
                || swap_sig(sig, old, new)
        }
        DeclKind::Gen { .. } => false,
    }
}

fn replace_in_spec(arena: &mut Arena, p: SpecId, old: ExprId, new: ExprId) -> bool {
    match &mut arena.specs[p].kind {
        SpecKind::Import { name, path } => swap_opt(name, old, new) || swap(path, old, new),
        SpecKind::Value { names, ty, values } => {
            swap_list(names, old, new) || swap_opt(ty, old, new) || swap_list(values, old, new)
        }
        SpecKind::Type { name, ty } => swap(name, old, new) || swap(ty, old, new),
    }
}

fn replace_stmt_in_stmt(arena: &mut Arena, p: StmtId, old: StmtId, new: StmtId) -> bool {
    match &mut arena.stmts[p].kind {
        StmtKind::Block(stmts) => swap_list(stmts, old, new),
        StmtKind::If { init, body, els, .. } => {
            swap_opt(init, old, new) || swap(body, old, new) || swap_opt(els, old, new)
        }
        StmtKind::Switch { init, cases, .. } => {
            swap_opt(init, old, new)
                || cases
                    .iter_mut()
                    .any(|case| swap_list(&mut case.body, old, new))
        }
        StmtKind::Select { cases } => cases.iter_mut().any(|case| {
            swap_opt(&mut case.comm, old, new) || swap_list(&mut case.body, old, new)
        }),
        StmtKind::For {
            init, post, body, ..
        } => swap_opt(init, old, new) || swap_opt(post, old, new) || swap(body, old, new),
        StmtKind::Range { body, .. } => swap(body, old, new),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goshrink_syntax::parser::parse_file;
    use std::path::Path;

    fn parse(src: &str) -> (Arena, File) {
        let mut arena = Arena::new();
        let file = parse_file(&mut arena, Path::new("main.go"), src).expect("parse");
        (arena, file)
    }

    #[test]
    fn every_node_has_one_parent_and_roots_have_none() {
        let (arena, file) = parse(
            "package p\n\nvar x = 1\n\nfunc f(a []int) int {\n\tif x > 0 {\n\t\treturn a[0]\n\t}\n\treturn 0\n}\n",
        );
        let mut parents = Parents::new();
        parents.rebuild(&arena, std::slice::from_ref(&file));
        for &d in &file.decls {
            assert!(parents.of_decl(d).is_none());
            let mut count = 0usize;
            arena.walk(NodeRef::Decl(d), &mut |n| {
                if n != NodeRef::Decl(d) {
                    // Looking up the parent panics when absent.
                    match n {
                        NodeRef::Expr(e) => {
                            parents.of_expr(e);
                        }
                        NodeRef::Stmt(s) => {
                            parents.of_stmt(s);
                        }
                        NodeRef::Decl(d) => {
                            assert!(parents.of_decl(d).is_some());
                        }
                        NodeRef::Spec(s) => {
                            parents.of_spec(s);
                        }
                    }
                }
                count += 1;
            });
            assert!(count > 1);
        }
    }

    #[test]
    fn replace_expr_slot_rewrites_the_right_field() {
        let (mut arena, file) = parse("package p\n\nfunc f() int {\n\treturn 1 + 2\n}\n");
        let mut parents = Parents::new();
        parents.rebuild(&arena, std::slice::from_ref(&file));
        // Find the binary expression and its lhs.
        let (bin, lhs) = arena
            .exprs
            .iter()
            .find_map(|(id, e)| match e.kind {
                ExprKind::Binary { lhs, .. } => Some((id, lhs)),
                _ => None,
            })
            .expect("binary expr");
        let zero = arena.expr(
            ExprKind::Lit {
                kind: LitKind::Int,
                text: "0".into(),
            },
            goshrink_syntax::Pos::NONE,
        );
        replace_expr_child(&mut arena, NodeRef::Expr(bin), lhs, zero);
        let ExprKind::Binary { lhs: new_lhs, .. } = arena.exprs[bin].kind else {
            panic!()
        };
        assert_eq!(new_lhs, zero);
    }

    #[test]
    #[should_panic(expected = "slot not found")]
    fn missing_slot_panics() {
        let (mut arena, file) = parse("package p\n\nfunc f() {\n}\n");
        let a = arena.ident("a", goshrink_syntax::Pos::NONE);
        let b = arena.ident("b", goshrink_syntax::Pos::NONE);
        let d = file.decls[0];
        replace_expr_child(&mut arena, NodeRef::Decl(d), a, b);
    }
}
