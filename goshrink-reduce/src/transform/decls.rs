//! Declaration-level rules: dead value-spec removal, blank-import removal
//! and receiver stripping.

use crate::reduce::Reducer;
use goshrink_syntax::ast::*;

impl Reducer {
    pub(crate) fn reduce_decl(&mut self, d: DeclId) -> bool {
        match self.arena.decls[d].kind.clone() {
            DeclKind::Func {
                name,
                recv: Some(recv),
                ..
            } => self.strip_receiver(d, name, &recv),
            DeclKind::Gen {
                kw: DeclKw::Var | DeclKw::Const,
                specs,
                ..
            } => self.remove_dead_value_specs(&specs),
            DeclKind::Gen {
                kw: DeclKw::Import,
                specs,
                ..
            } => self.remove_blank_imports(&specs),
            _ => false,
        }
    }

    /// Removes a var/const spec when none of its names is exported and none
    /// is used.  Removing the last spec takes the group with it.
    fn remove_dead_value_specs(&mut self, specs: &[SpecId]) -> bool {
        for &spec in specs {
            let SpecKind::Value { names, .. } = self.arena.specs[spec].kind.clone() else {
                continue;
            };
            let removable = names.iter().all(|&name| {
                match self.arena.ident_name(name) {
                    Some("_") => true,
                    Some(_) => self.info.defs.get(name).is_some_and(|&obj| {
                        !self.info.objects[obj].is_exported() && self.refs.use_count(obj) == 0
                    }),
                    None => false,
                }
            });
            if !removable {
                continue;
            }
            let Some(slot) = self.remove_spec(spec) else {
                continue;
            };
            self.arm_deletion_fallbacks(&[NodeRef::Spec(spec)]);
            if self.attempt("removed declaration", NodeRef::Spec(spec)) {
                return true;
            }
            self.restore_spec(&slot);
        }
        false
    }

    /// Only explicitly-blank imports are removed here; imports that fall
    /// dead through other edits ride the deletion fallbacks instead.
    fn remove_blank_imports(&mut self, specs: &[SpecId]) -> bool {
        for &spec in specs {
            let SpecKind::Import {
                name: Some(name), ..
            } = self.arena.specs[spec].kind.clone()
            else {
                continue;
            };
            if self.arena.ident_name(name) != Some("_") {
                continue;
            }
            let Some(slot) = self.remove_spec(spec) else {
                continue;
            };
            if self.attempt("removed import", NodeRef::Spec(spec)) {
                return true;
            }
            self.restore_spec(&slot);
        }
        false
    }

    /// For a method whose receiver variable is unused in the body, rewrites
    /// every `x.M(...)` call site to `M(...)` and drops the receiver.  On
    /// rejection call sites and receiver both come back.
    fn strip_receiver(&mut self, d: DeclId, name: ExprId, recv: &Field) -> bool {
        if let Some(&recv_name) = recv.names.first() {
            if self.arena.ident_name(recv_name) != Some("_") {
                let Some(&recv_obj) = self.info.defs.get(recv_name) else {
                    return false;
                };
                if self.refs.use_count(recv_obj) > 0 {
                    return false;
                }
            }
        }
        let Some(&method) = self.info.defs.get(name) else {
            return false;
        };
        let Some(method_name) = self.arena.ident_name(name).map(str::to_string) else {
            return false;
        };
        // The bare name must not collide with any other declaration in the
        // package, another method of the same name included.
        let collides = self
            .info
            .objects
            .iter()
            .any(|(id, o)| id != method && o.is_package_local() && o.name == method_name);
        if collides {
            return false;
        }

        // Rewrite each use site `x.M` to the bare `M`.
        let sites = self
            .refs
            .use_idents
            .get(&method)
            .cloned()
            .unwrap_or_default();
        let mut rewritten = Vec::new();
        let mut bases = Vec::new();
        for sel in sites {
            let NodeRef::Expr(selector) = self.parents.of_expr(sel) else {
                continue;
            };
            let ExprKind::Selector { expr: base, sel: s } = self.arena.exprs[selector].kind
            else {
                continue;
            };
            if s != sel {
                continue;
            }
            let outer = self.parents.of_expr(selector);
            self.set_expr_slot(outer, selector, sel);
            rewritten.push((outer, selector, sel));
            bases.push(NodeRef::Expr(base));
        }

        let saved = recv.clone();
        if let DeclKind::Func { recv, .. } = &mut self.arena.decls[d].kind {
            *recv = None;
        }
        self.arm_deletion_fallbacks(&bases);
        if self.attempt("removed receiver", NodeRef::Decl(d)) {
            return true;
        }
        if let DeclKind::Func { recv, .. } = &mut self.arena.decls[d].kind {
            *recv = Some(saved);
        }
        for (outer, selector, sel) in rewritten.into_iter().rev() {
            self.set_expr_slot(outer, sel, selector);
        }
        false
    }
}
