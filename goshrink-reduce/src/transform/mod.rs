//! The reduction-rule catalog and the walk that dispatches it.
//!
//! A walk is one preorder traversal of the package.  At every node a single
//! dispatch on the node's category proposes the applicable rules; the first
//! accepted edit sets `did_change` and unwinds the walk, and the outer loop
//! starts over with fresh type information.  A rule that finds no
//! acceptable variant leaves the tree byte-identical to how it found it.

mod decls;
mod exprs;
mod stmts;

use crate::reduce::Reducer;
use goshrink_syntax::ast::{NodeRef, SpecKind};

impl Reducer {
    pub(crate) fn walk_package(&mut self) {
        for fi in 0..self.pkg.files.len() {
            self.cur_file = fi;
            let decls = self.pkg.files[fi].decls.clone();
            for d in decls {
                if self.walk_node(NodeRef::Decl(d)) {
                    return;
                }
            }
        }
    }

    fn walk_node(&mut self, n: NodeRef) -> bool {
        let changed = match n {
            NodeRef::Expr(e) => self.reduce_expr(e),
            NodeRef::Stmt(s) => self.reduce_stmt(s),
            NodeRef::Decl(d) => self.reduce_decl(d),
            NodeRef::Spec(_) => false,
        };
        if changed {
            return true;
        }
        // Import paths hold nothing reducible.
        if let NodeRef::Spec(s) = n {
            if matches!(self.arena.specs[s].kind, SpecKind::Import { .. }) {
                return false;
            }
        }
        let mut children = Vec::new();
        self.arena.for_each_child(n, &mut |c| children.push(c));
        for c in children {
            if self.walk_node(c) {
                return true;
            }
        }
        false
    }
}
