//! Expression-level rules.  The constant folder gets the first shot at
//! every expression; the shape-specific simplifications follow.

use crate::fold;
use crate::reduce::Reducer;
use goshrink_syntax::ast::*;
use goshrink_syntax::lit;
use goshrink_syntax::printer;
use goshrink_syntax::resolve::ObjKind;

impl Reducer {
    pub(crate) fn reduce_expr(&mut self, e: ExprId) -> bool {
        if self.fold_expr(e) {
            return true;
        }
        match self.arena.exprs[e].kind.clone() {
            ExprKind::Binary { lhs, rhs, .. } => {
                if self.try_expr(e, lhs, &[NodeRef::Expr(rhs)], "kept left operand") {
                    return true;
                }
                self.try_expr(e, rhs, &[NodeRef::Expr(lhs)], "kept right operand")
            }
            ExprKind::Index { expr, index } => {
                self.try_expr(e, expr, &[NodeRef::Expr(index)], "removed index")
            }
            ExprKind::Star(inner) => self.try_expr(e, inner, &[], "removed dereference"),
            ExprKind::Slice {
                expr,
                low,
                high,
                max,
                ..
            } => self.reduce_slice(e, expr, low, high, max),
            ExprKind::Composite { ty, elems } if !elems.is_empty() => {
                let pos = self.arena.exprs[e].pos;
                let empty = self.arena.expr(ExprKind::Composite { ty, elems: Vec::new() }, pos);
                let removed: Vec<NodeRef> = elems.iter().map(|&el| NodeRef::Expr(el)).collect();
                self.try_expr(e, empty, &removed, "emptied composite literal")
            }
            ExprKind::Lit {
                kind: LitKind::Str,
                text,
            } => {
                if lit::unquote_str(&text).map_or(true, |s| s.is_empty()) {
                    return false;
                }
                let pos = self.arena.exprs[e].pos;
                let empty = self.arena.expr(
                    ExprKind::Lit {
                        kind: LitKind::Str,
                        text: "\"\"".into(),
                    },
                    pos,
                );
                self.try_expr(e, empty, &[], "emptied string literal")
            }
            ExprKind::Lit {
                kind: LitKind::Int,
                text,
            } => {
                if lit::parse_int(&text) == Some(0) {
                    return false;
                }
                let pos = self.arena.exprs[e].pos;
                let zero = self.arena.expr(
                    ExprKind::Lit {
                        kind: LitKind::Int,
                        text: "0".into(),
                    },
                    pos,
                );
                self.try_expr(e, zero, &[], "zeroed integer literal")
            }
            ExprKind::Ident(_) => self.inline_constant(e),
            _ => false,
        }
    }

    /// The walker pre-pass: when the partial evaluator produces a distinct
    /// simpler form, that substitution is proposed before anything else.
    fn fold_expr(&mut self, e: ExprId) -> bool {
        let Some(value) = fold::resolve(&self.arena, &self.info, e) else {
            return false;
        };
        let pos = self.arena.exprs[e].pos;
        let new = fold::materialize(&mut self.arena, &value, pos);
        let printed = printer::expr_to_string(&self.arena, new);
        if printed == printer::expr_to_string(&self.arena, e) {
            return false;
        }
        let msg = format!("resolved to {printed}");
        self.try_expr(e, new, &[NodeRef::Expr(e)], &msg)
    }

    /// `a[l:h[:m]]` -> `a`, then dropping max, high and low in that order.
    /// Dropping the max demotes the slice to its two-index form.
    fn reduce_slice(
        &mut self,
        e: ExprId,
        expr: ExprId,
        low: Option<ExprId>,
        high: Option<ExprId>,
        max: Option<ExprId>,
    ) -> bool {
        let mut removed: Vec<NodeRef> = Vec::new();
        removed.extend(low.map(NodeRef::Expr));
        removed.extend(high.map(NodeRef::Expr));
        removed.extend(max.map(NodeRef::Expr));
        if self.try_expr(e, expr, &removed, "kept sliced operand") {
            return true;
        }
        if let Some(m) = max {
            self.set_slice_max(e, None);
            self.arm_deletion_fallbacks(&[NodeRef::Expr(m)]);
            if self.attempt("removed slice max", NodeRef::Expr(e)) {
                return true;
            }
            self.set_slice_max(e, Some(m));
        }
        if let Some(h) = high {
            if self.null_slice_index(e, h, SlicePart::High, "removed slice high") {
                return true;
            }
        }
        if let Some(l) = low {
            if self.null_slice_index(e, l, SlicePart::Low, "removed slice low") {
                return true;
            }
        }
        false
    }

    fn set_slice_max(&mut self, e: ExprId, value: Option<ExprId>) {
        if let ExprKind::Slice { max, three, .. } = &mut self.arena.exprs[e].kind {
            *max = value;
            *three = value.is_some();
        }
    }

    fn null_slice_index(&mut self, e: ExprId, index: ExprId, part: SlicePart, msg: &str) -> bool {
        self.set_slice_part(e, part, None);
        self.arm_deletion_fallbacks(&[NodeRef::Expr(index)]);
        if self.attempt(msg, NodeRef::Expr(e)) {
            return true;
        }
        self.set_slice_part(e, part, Some(index));
        false
    }

    fn set_slice_part(&mut self, e: ExprId, part: SlicePart, value: Option<ExprId>) {
        if let ExprKind::Slice { low, high, .. } = &mut self.arena.exprs[e].kind {
            match part {
                SlicePart::Low => *low = value,
                SlicePart::High => *high = value,
            }
        }
    }

    /// Replaces a single-use local identifier with a copy of its
    /// definition's right-hand side.  The definition must be shallowly
    /// understood: a primitive-kind object, or one whose right-hand side
    /// the partial evaluator can already resolve (a literal composite, for
    /// instance).  The now-dead declaration rides the deletion fallbacks.
    fn inline_constant(&mut self, e: ExprId) -> bool {
        let Some(&obj) = self.info.uses.get(e) else {
            return false;
        };
        let object = self.info.objects[obj].clone();
        if !matches!(object.kind, ObjKind::Var | ObjKind::Const) {
            return false;
        }
        if self.refs.use_count(obj) != 1 {
            return false;
        }
        let Some(rhs) = self.definition_rhs(obj) else {
            return false;
        };
        if object.prim.is_none() && fold::resolve(&self.arena, &self.info, rhs).is_none() {
            return false;
        }
        let copy = self.arena.clone_expr(rhs);
        let name = object.name;
        self.try_expr(
            e,
            copy,
            &[NodeRef::Expr(e)],
            &format!("inlined {name}"),
        )
    }

    /// The right-hand side paired with the object's defining name, when the
    /// definition pairs names and values one to one.
    fn definition_rhs(&self, obj: goshrink_syntax::ObjId) -> Option<ExprId> {
        let ident = self.refs.rev_defs.get(&obj).copied()?;
        match self.info.objects[obj].decl? {
            NodeRef::Spec(spec) => {
                let SpecKind::Value { names, values, .. } = &self.arena.specs[spec].kind else {
                    return None;
                };
                if names.len() != values.len() {
                    return None;
                }
                let index = names.iter().position(|&n| n == ident)?;
                values.get(index).copied()
            }
            NodeRef::Stmt(stmt) => {
                let StmtKind::Assign {
                    lhs,
                    op: AssignOp::Define,
                    rhs,
                } = &self.arena.stmts[stmt].kind
                else {
                    return None;
                };
                if lhs.len() != rhs.len() {
                    return None;
                }
                let index = lhs.iter().position(|&n| n == ident)?;
                rhs.get(index).copied()
            }
            _ => None,
        }
    }
}

#[derive(Clone, Copy)]
enum SlicePart {
    Low,
    High,
}
