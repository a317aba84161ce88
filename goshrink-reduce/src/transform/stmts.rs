//! Statement-level rules: list deletion, block inlining, `if`/`switch`
//! collapsing, `go`/`defer` stripping and trivial call inlining.

use crate::mutate::StmtListRef;
use crate::reduce::Reducer;
use goshrink_syntax::ast::*;
use goshrink_syntax::resolve::ObjKind;
use std::collections::HashSet;

impl Reducer {
    pub(crate) fn reduce_stmt(&mut self, s: StmtId) -> bool {
        match self.arena.stmts[s].kind.clone() {
            StmtKind::Block(_) | StmtKind::Switch { .. } | StmtKind::Select { .. } => {
                for list in self.stmt_lists_of(s) {
                    if self.delete_from_list(list) {
                        return true;
                    }
                    if self.splice_blocks(list) {
                        return true;
                    }
                }
                if let StmtKind::Switch { init, tag, cases } = self.arena.stmts[s].kind.clone() {
                    return self.collapse_switch(s, init, tag, &cases);
                }
                false
            }
            StmtKind::If {
                init,
                cond,
                body,
                els,
            } => self.bypass_if(s, init, cond, body, els),
            StmtKind::Go(call) => {
                let pos = self.arena.stmts[s].pos;
                let plain = self.arena.stmt(StmtKind::Expr(call), pos);
                self.try_stmt(s, plain, &[], "removed go")
            }
            StmtKind::Defer(call) => {
                let pos = self.arena.stmts[s].pos;
                let plain = self.arena.stmt(StmtKind::Expr(call), pos);
                self.try_stmt(s, plain, &[], "removed defer")
            }
            StmtKind::Expr(call) => self.inline_trivial_call(s, call),
            _ => false,
        }
    }

    /// Tries to remove each statement of a list, one candidate at a time.
    /// Declarations and `:=` assignments are never removed here (their
    /// names may be needed), and one terminating `return` and one
    /// terminating top-level `panic(...)` call per list are kept: the first
    /// of each class seen trips a flag and survives, the rest are fair
    /// game.
    fn delete_from_list(&mut self, list: StmtListRef) -> bool {
        let mut kept_return = false;
        let mut kept_panic = false;
        for child in self.stmt_list(list).clone() {
            match &self.arena.stmts[child].kind {
                StmtKind::Decl(_) => continue,
                StmtKind::Assign {
                    op: AssignOp::Define,
                    ..
                } => continue,
                StmtKind::Return(_) if !kept_return => {
                    kept_return = true;
                    continue;
                }
                StmtKind::Expr(e) if !kept_panic && self.is_panic_call(*e) => {
                    kept_panic = true;
                    continue;
                }
                _ => {}
            }
            let stmts = self.stmt_list_mut(list);
            let Some(index) = stmts.iter().position(|&c| c == child) else {
                continue;
            };
            stmts.remove(index);
            self.arm_deletion_fallbacks(&[NodeRef::Stmt(child)]);
            if self.attempt("removed statement", NodeRef::Stmt(child)) {
                return true;
            }
            self.stmt_list_mut(list).insert(index, child);
        }
        false
    }

    fn is_panic_call(&self, e: ExprId) -> bool {
        let ExprKind::Call { func, .. } = &self.arena.exprs[e].kind else {
            return false;
        };
        self.arena.ident_name(*func) == Some("panic")
    }

    /// Replaces a block statement that sits directly in a statement list
    /// with its contents.  Identifiers declared inside the block that would
    /// collide with names visible outside are renamed first by appending
    /// underscores; a rejection restores the renames along with the list.
    fn splice_blocks(&mut self, list: StmtListRef) -> bool {
        for child in self.stmt_list(list).clone() {
            let StmtKind::Block(inner) = self.arena.stmts[child].kind.clone() else {
                continue;
            };
            let renames = self.rename_shadowed(child);
            let stmts = self.stmt_list_mut(list);
            let Some(index) = stmts.iter().position(|&c| c == child) else {
                continue;
            };
            stmts.splice(index..=index, inner.iter().copied());
            if self.attempt("inlined block", NodeRef::Stmt(child)) {
                return true;
            }
            self.stmt_list_mut(list)
                .splice(index..index + inner.len(), [child]);
            for (ident, original) in renames {
                self.set_ident_name(ident, &original);
            }
        }
        false
    }

    /// Renames declarations inside `block` that collide with any name
    /// occurring outside it, appending underscores until unique.  Returns
    /// the renamed identifiers with their original names, use sites
    /// included.
    fn rename_shadowed(&mut self, block: StmtId) -> Vec<(ExprId, String)> {
        let arena = &self.arena;
        let mut inside_idents = HashSet::new();
        let mut inside_names = HashSet::new();
        let mut inside_defs = Vec::new();
        arena.walk(NodeRef::Stmt(block), &mut |n| {
            let NodeRef::Expr(e) = n else { return };
            if let Some(name) = arena.ident_name(e) {
                inside_idents.insert(e);
                inside_names.insert(name.to_string());
                if let Some(&obj) = self.info.defs.get(e) {
                    inside_defs.push((e, obj));
                }
            }
        });
        let mut outside_names = HashSet::new();
        for file in &self.pkg.files {
            for &d in &file.decls {
                arena.walk(NodeRef::Decl(d), &mut |n| {
                    let NodeRef::Expr(e) = n else { return };
                    if inside_idents.contains(&e) {
                        return;
                    }
                    if let Some(name) = arena.ident_name(e) {
                        outside_names.insert(name.to_string());
                    }
                });
            }
        }

        let mut taken: HashSet<String> = outside_names.union(&inside_names).cloned().collect();
        let mut renames = Vec::new();
        for (ident, obj) in inside_defs {
            let Some(original) = self.arena.ident_name(ident).map(str::to_string) else {
                continue;
            };
            if original == "_" || !outside_names.contains(&original) {
                continue;
            }
            let mut fresh = original.clone();
            while taken.contains(&fresh) {
                fresh.push('_');
            }
            taken.insert(fresh.clone());
            let mut touched = vec![ident];
            touched.extend(
                self.refs
                    .use_idents
                    .get(&obj)
                    .into_iter()
                    .flatten()
                    .copied(),
            );
            for id in touched {
                renames.push((id, original.clone()));
                self.set_ident_name(id, &fresh);
            }
        }
        renames
    }

    /// `if C { B } [else E]` -> `B`, falling back to `E`.
    fn bypass_if(
        &mut self,
        s: StmtId,
        init: Option<StmtId>,
        cond: ExprId,
        body: StmtId,
        els: Option<StmtId>,
    ) -> bool {
        let block_is_empty = |r: &Reducer, b: StmtId| {
            matches!(&r.arena.stmts[b].kind, StmtKind::Block(list) if list.is_empty())
        };
        if !block_is_empty(self, body) {
            let mut removed = vec![NodeRef::Expr(cond)];
            removed.extend(init.map(NodeRef::Stmt));
            removed.extend(els.map(NodeRef::Stmt));
            if self.try_stmt(s, body, &removed, "replaced if with body") {
                return true;
            }
        }
        if let Some(els) = els {
            if !block_is_empty(self, els) {
                let mut removed = vec![NodeRef::Expr(cond), NodeRef::Stmt(body)];
                removed.extend(init.map(NodeRef::Stmt));
                if self.try_stmt(s, els, &removed, "replaced if with else branch") {
                    return true;
                }
            }
        }
        false
    }

    /// A switch with one case and no init collapses to the case body.
    fn collapse_switch(
        &mut self,
        s: StmtId,
        init: Option<StmtId>,
        tag: Option<ExprId>,
        cases: &[CaseClause],
    ) -> bool {
        if init.is_some() || cases.len() != 1 {
            return false;
        }
        let case = &cases[0];
        let pos = self.arena.stmts[s].pos;
        let block = self.arena.stmt(StmtKind::Block(case.body.clone()), pos);
        let mut removed: Vec<NodeRef> = case.exprs.iter().map(|&e| NodeRef::Expr(e)).collect();
        removed.extend(tag.map(NodeRef::Expr));
        self.try_stmt(s, block, &removed, "collapsed switch")
    }

    /// An expression statement `f()` calling a local, single-use,
    /// parameterless, resultless function whose body has no `return` or
    /// `defer` is replaced by a copy of that body.
    fn inline_trivial_call(&mut self, s: StmtId, call: ExprId) -> bool {
        let ExprKind::Call { func, args, .. } = self.arena.exprs[call].kind.clone() else {
            return false;
        };
        if !args.is_empty() {
            return false;
        }
        let Some(&obj) = self.info.uses.get(func) else {
            return false;
        };
        if self.info.objects[obj].kind != ObjKind::Func || self.refs.use_count(obj) != 1 {
            return false;
        }
        let Some(NodeRef::Decl(decl)) = self.info.objects[obj].decl else {
            return false;
        };
        let DeclKind::Func {
            recv: None,
            sig,
            body: Some(body),
            ..
        } = self.arena.decls[decl].kind.clone()
        else {
            return false;
        };
        if !sig.params.is_empty() || !sig.results.is_empty() {
            return false;
        }
        let mut blocked = false;
        self.arena.walk(NodeRef::Stmt(body), &mut |n| {
            if let NodeRef::Stmt(inner) = n {
                if matches!(
                    self.arena.stmts[inner].kind,
                    StmtKind::Return(_) | StmtKind::Defer(_)
                ) {
                    blocked = true;
                }
            }
        });
        if blocked {
            return false;
        }
        let copy = self.arena.clone_stmt(body);
        let name = self.arena.ident_name(func).unwrap_or("function").to_string();
        self.try_stmt(
            s,
            copy,
            &[NodeRef::Stmt(s)],
            &format!("inlined call to {name}"),
        )
    }
}
