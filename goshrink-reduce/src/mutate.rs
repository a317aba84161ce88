//! The speculative mutator: shared edit/undo helpers and the two-tier
//! deferred deletion fallbacks.
//!
//! Rules follow a command model: mutate, consult the candidate driver, and
//! restore from their own saved state when rejected.  Deletion rules add
//! one wrinkle: detaching a subtree can leave other declarations dead, so
//! before a deletion proposal runs, `arm_deletion_fallbacks` removes the
//! newly-dead declarations outright (the primary form) and arms up to two
//! alternatives the cascade in `Reducer::attempt` tries on rejection:
//!
//! 1. *keep-as-underscore*: the declarations come back with `_` names;
//!    unused imports stay removed;
//! 2. *keep-unchanged*: declarations and imports are restored verbatim.
//!
//! `apply_restore` transitions from the underscore state, never from the
//! primary state; the cascade guarantees that ordering.

use crate::parents;
use crate::reduce::Reducer;
use goshrink_syntax::ast::*;
use goshrink_syntax::resolve::{ObjId, ObjKind};
use indexmap::IndexMap;

/// Addresses one of the statement lists inside a node: a block's body, or
/// one arm of a switch/select.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct StmtListRef {
    pub owner: StmtId,
    pub arm: usize,
}

/// Where a removed declaration sat, for exact reinsertion.
#[derive(Clone, Debug)]
enum DeclSlot {
    TopLevel { file: usize, index: usize },
    InList { list: StmtListRef, index: usize, stmt: StmtId },
}

/// Where a removed spec sat.
#[derive(Clone, Debug)]
pub(crate) struct SpecSlot {
    decl: DeclId,
    index: usize,
    spec: SpecId,
    /// Set when removing the spec emptied its group.
    removed_decl: Option<DeclSlot>,
}

#[derive(Clone, Debug)]
enum DeclCut {
    /// A whole value spec was removed.
    SpecRemoved {
        slot: SpecSlot,
        names: Vec<(ExprId, String)>,
    },
    /// One name and its paired value were removed from a spec.
    NameRemoved {
        spec: SpecId,
        index: usize,
        name: ExprId,
        original: String,
        value: Option<ExprId>,
    },
    /// A name was blanked in place.
    NameBlanked { ident: ExprId, original: String },
    /// A `:=` whose left side became all blanks was relaxed to `=`.
    DefineRelaxed { stmt: StmtId },
    /// An import spec was removed.
    ImportRemoved { slot: SpecSlot },
}

#[derive(Clone, Debug, Default)]
pub(crate) struct DeleteUndo {
    cuts: Vec<DeclCut>,
}

impl DeleteUndo {
    pub(crate) fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Primary state -> underscore state: removed declarations come back
    /// with blank names; imports stay gone.  Reverse order keeps recorded
    /// indices valid.
    pub(crate) fn apply_underscore(&self, r: &mut Reducer) {
        for cut in self.cuts.iter().rev() {
            match cut {
                DeclCut::SpecRemoved { slot, names } => {
                    r.restore_spec(slot);
                    for &(ident, _) in names {
                        r.set_ident_name(ident, "_");
                    }
                }
                DeclCut::NameRemoved {
                    spec,
                    index,
                    name,
                    value,
                    ..
                } => {
                    r.set_ident_name(*name, "_");
                    r.reinsert_spec_name(*spec, *index, *name, *value);
                }
                DeclCut::NameBlanked { .. }
                | DeclCut::DefineRelaxed { .. }
                | DeclCut::ImportRemoved { .. } => {}
            }
        }
    }

    /// Underscore state -> original state.
    pub(crate) fn apply_restore(&self, r: &mut Reducer) {
        for cut in self.cuts.iter().rev() {
            match cut {
                DeclCut::SpecRemoved { names, .. } => {
                    for (ident, original) in names {
                        r.set_ident_name(*ident, original);
                    }
                }
                DeclCut::NameRemoved { name, original, .. } => {
                    r.set_ident_name(*name, original);
                }
                DeclCut::NameBlanked { ident, original } => {
                    r.set_ident_name(*ident, original);
                }
                DeclCut::DefineRelaxed { stmt } => {
                    if let StmtKind::Assign { op, .. } = &mut r.arena.stmts[*stmt].kind {
                        *op = AssignOp::Define;
                    }
                }
                DeclCut::ImportRemoved { slot } => r.restore_spec(slot),
            }
        }
    }
}

impl Reducer {
    // ----- slot edits -----

    pub(crate) fn set_expr_slot(&mut self, parent: NodeRef, old: ExprId, new: ExprId) {
        parents::replace_expr_child(&mut self.arena, parent, old, new);
        self.parents.set(NodeRef::Expr(new), parent);
    }

    pub(crate) fn set_stmt_slot(&mut self, parent: NodeRef, old: StmtId, new: StmtId) {
        parents::replace_stmt_child(&mut self.arena, parent, old, new);
        self.parents.set(NodeRef::Stmt(new), parent);
    }

    pub(crate) fn set_ident_name(&mut self, ident: ExprId, name: &str) {
        if let ExprKind::Ident(text) = &mut self.arena.exprs[ident].kind {
            name.clone_into(text);
        }
    }

    /// Proposes `new` for `old` in `old`'s expression slot.  `removed`
    /// lists the subtrees the edit detaches, for the deletion fallbacks.
    pub(crate) fn try_expr(
        &mut self,
        old: ExprId,
        new: ExprId,
        removed: &[NodeRef],
        msg: &str,
    ) -> bool {
        let parent = self.parents.of_expr(old);
        self.set_expr_slot(parent, old, new);
        self.arm_deletion_fallbacks(removed);
        if self.attempt(msg, NodeRef::Expr(old)) {
            return true;
        }
        self.set_expr_slot(parent, new, old);
        false
    }

    /// Statement-slot counterpart of `try_expr`.
    pub(crate) fn try_stmt(
        &mut self,
        old: StmtId,
        new: StmtId,
        removed: &[NodeRef],
        msg: &str,
    ) -> bool {
        let parent = self.parents.of_stmt(old);
        self.set_stmt_slot(parent, old, new);
        self.arm_deletion_fallbacks(removed);
        if self.attempt(msg, NodeRef::Stmt(old)) {
            return true;
        }
        self.set_stmt_slot(parent, new, old);
        false
    }

    // ----- statement lists -----

    /// The statement lists directly inside `s`, in source order.
    pub(crate) fn stmt_lists_of(&self, s: StmtId) -> Vec<StmtListRef> {
        match &self.arena.stmts[s].kind {
            StmtKind::Block(_) => vec![StmtListRef { owner: s, arm: 0 }],
            StmtKind::Switch { cases, .. } => (0..cases.len())
                .map(|arm| StmtListRef { owner: s, arm })
                .collect(),
            StmtKind::Select { cases } => (0..cases.len())
                .map(|arm| StmtListRef { owner: s, arm })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn stmt_list(&self, l: StmtListRef) -> &Vec<StmtId> {
        match &self.arena.stmts[l.owner].kind {
            StmtKind::Block(stmts) => stmts,
            StmtKind::Switch { cases, .. } => &cases[l.arm].body,
            StmtKind::Select { cases } => &cases[l.arm].body,
            _ => panic!("node has no statement list"),
        }
    }

    pub(crate) fn stmt_list_mut(&mut self, l: StmtListRef) -> &mut Vec<StmtId> {
        match &mut self.arena.stmts[l.owner].kind {
            StmtKind::Block(stmts) => stmts,
            StmtKind::Switch { cases, .. } => &mut cases[l.arm].body,
            StmtKind::Select { cases } => &mut cases[l.arm].body,
            _ => panic!("node has no statement list"),
        }
    }

    fn find_stmt_list(&self, owner: StmtId, child: StmtId) -> Option<StmtListRef> {
        self.stmt_lists_of(owner)
            .into_iter()
            .find(|&l| self.stmt_list(l).contains(&child))
    }

    // ----- deferred deletion fallbacks -----

    /// Collects the use sites inside the subtrees a proposal detached,
    /// figures out which package-local declarations that leaves dead, and
    /// performs the primary follow-up edit (remove the declarations and any
    /// now-unused imports), arming the underscore/restore fallbacks.
    pub(crate) fn arm_deletion_fallbacks(&mut self, removed: &[NodeRef]) {
        debug_assert!(self.keep_underscore.is_none() && self.keep_unchanged.is_none());
        let arena = &self.arena;
        let info = &self.info;
        let mut removed_uses: IndexMap<ObjId, usize> = IndexMap::new();
        for &root in removed {
            arena.walk(root, &mut |n| {
                if let NodeRef::Expr(e) = n {
                    if let Some(&obj) = info.uses.get(e) {
                        *removed_uses.entry(obj).or_insert(0) += 1;
                    }
                }
            });
        }
        let dead: Vec<ObjId> = removed_uses
            .iter()
            .filter_map(|(&obj, &count)| {
                let object = &self.info.objects[obj];
                if !object.is_package_local() || object.is_exported() {
                    return None;
                }
                (self.refs.use_count(obj) <= count).then_some(obj)
            })
            .collect();
        let mut undo = DeleteUndo::default();
        for obj in dead {
            self.cut_declaration(obj, &mut undo);
        }
        if !undo.is_empty() {
            self.keep_underscore = Some(undo);
        }
    }

    /// The primary follow-up for one dead object.
    fn cut_declaration(&mut self, obj: ObjId, undo: &mut DeleteUndo) {
        let object = self.info.objects[obj].clone();
        let Some(ident) = self.refs.rev_defs.get(&obj).copied() else {
            return;
        };
        match (object.kind, object.decl) {
            (ObjKind::Var | ObjKind::Const, Some(NodeRef::Spec(spec))) => {
                let SpecKind::Value { names, values, .. } = self.arena.specs[spec].kind.clone()
                else {
                    return;
                };
                let Some(index) = names.iter().position(|&n| n == ident) else {
                    return;
                };
                if names.len() == 1 {
                    if let Some(slot) = self.remove_spec(spec) {
                        undo.cuts.push(DeclCut::SpecRemoved {
                            slot,
                            names: vec![(ident, object.name)],
                        });
                    }
                } else if values.len() == names.len() || values.is_empty() {
                    let value = values.get(index).copied();
                    let SpecKind::Value { names, values, .. } =
                        &mut self.arena.specs[spec].kind
                    else {
                        return;
                    };
                    names.remove(index);
                    if value.is_some() {
                        values.remove(index);
                    }
                    undo.cuts.push(DeclCut::NameRemoved {
                        spec,
                        index,
                        name: ident,
                        original: object.name,
                        value,
                    });
                } else {
                    // Multiple names share one call value; blank the name.
                    self.set_ident_name(ident, "_");
                    undo.cuts.push(DeclCut::NameBlanked {
                        ident,
                        original: object.name,
                    });
                }
            }
            (ObjKind::Var, Some(NodeRef::Stmt(stmt))) => {
                self.set_ident_name(ident, "_");
                undo.cuts.push(DeclCut::NameBlanked {
                    ident,
                    original: object.name,
                });
                // `:=` with nothing but blanks on the left is illegal;
                // relax it to an assignment.
                if let StmtKind::Assign { lhs, op, .. } = self.arena.stmts[stmt].kind.clone() {
                    if op == AssignOp::Define
                        && lhs
                            .iter()
                            .all(|&e| self.arena.ident_name(e) == Some("_"))
                    {
                        if let StmtKind::Assign { op, .. } = &mut self.arena.stmts[stmt].kind {
                            *op = AssignOp::Assign;
                        }
                        undo.cuts.push(DeclCut::DefineRelaxed { stmt });
                    }
                }
            }
            (ObjKind::PkgName, Some(NodeRef::Spec(spec))) => {
                if let Some(slot) = self.remove_spec(spec) {
                    undo.cuts.push(DeclCut::ImportRemoved { slot });
                }
            }
            _ => {}
        }
    }

    // ----- spec removal and restoration -----

    /// Removes `spec` from its group; removes the group as well when it
    /// becomes empty.  Returns what is needed to put everything back.
    pub(crate) fn remove_spec(&mut self, spec: SpecId) -> Option<SpecSlot> {
        let NodeRef::Decl(decl) = self.parents.of_spec(spec) else {
            return None;
        };
        let DeclKind::Gen { specs, .. } = &mut self.arena.decls[decl].kind else {
            return None;
        };
        let index = specs.iter().position(|&s| s == spec)?;
        specs.remove(index);
        let empty = specs.is_empty();
        let removed_decl = if empty { self.remove_decl(decl) } else { None };
        Some(SpecSlot {
            decl,
            index,
            spec,
            removed_decl,
        })
    }

    fn remove_decl(&mut self, decl: DeclId) -> Option<DeclSlot> {
        match self.parents.of_decl(decl) {
            None => {
                let file = self
                    .pkg
                    .files
                    .iter()
                    .position(|f| f.decls.contains(&decl))?;
                let index = self.pkg.files[file]
                    .decls
                    .iter()
                    .position(|&d| d == decl)?;
                self.pkg.files[file].decls.remove(index);
                Some(DeclSlot::TopLevel { file, index })
            }
            Some(NodeRef::Stmt(stmt)) => {
                let NodeRef::Stmt(owner) = self.parents.of_stmt(stmt) else {
                    return None;
                };
                let list = self.find_stmt_list(owner, stmt)?;
                let index = self.stmt_list(list).iter().position(|&s| s == stmt)?;
                self.stmt_list_mut(list).remove(index);
                Some(DeclSlot::InList { list, index, stmt })
            }
            Some(_) => None,
        }
    }

    pub(crate) fn restore_spec(&mut self, slot: &SpecSlot) {
        if let Some(removed) = &slot.removed_decl {
            match *removed {
                DeclSlot::TopLevel { file, index } => {
                    self.pkg.files[file].decls.insert(index, slot.decl);
                }
                DeclSlot::InList { list, index, stmt } => {
                    self.stmt_list_mut(list).insert(index, stmt);
                }
            }
        }
        if let DeclKind::Gen { specs, .. } = &mut self.arena.decls[slot.decl].kind {
            specs.insert(slot.index, slot.spec);
        }
    }

    fn reinsert_spec_name(&mut self, spec: SpecId, index: usize, name: ExprId, value: Option<ExprId>) {
        if let SpecKind::Value { names, values, .. } = &mut self.arena.specs[spec].kind {
            names.insert(index, name);
            if let Some(value) = value {
                values.insert(index, value);
            }
        }
    }
}
