//! The reference tracker: derived indices over the resolver's Defs/Uses.
//!
//! Rebuilt from scratch after every outer-loop re-resolve; never updated
//! incrementally.  Rules answer "how often is this object used" and "where
//! is it declared" against this snapshot, and must bail out rather than
//! trust it once they have moved things around.

use goshrink_syntax::ast::{Arena, ExprId, NodeRef, Package};
use goshrink_syntax::resolve::{ObjId, TypeInfo};
use indexmap::IndexMap;

#[derive(Default)]
pub struct RefTracker {
    /// Object to its defining identifier (injective).
    pub rev_defs: IndexMap<ObjId, ExprId>,
    /// Object to its use-site identifiers, in source order.  Restricted to
    /// objects declared in this package; universe members are excluded.
    pub use_idents: IndexMap<ObjId, Vec<ExprId>>,
}

impl RefTracker {
    pub fn use_count(&self, obj: ObjId) -> usize {
        self.use_idents.get(&obj).map_or(0, Vec::len)
    }
}

pub fn build(arena: &Arena, pkg: &Package, info: &TypeInfo) -> RefTracker {
    let mut tracker = RefTracker::default();
    for file in &pkg.files {
        for &d in &file.decls {
            arena.walk(NodeRef::Decl(d), &mut |n| {
                let NodeRef::Expr(e) = n else { return };
                if let Some(&obj) = info.defs.get(e) {
                    tracker.rev_defs.insert(obj, e);
                }
                if let Some(&obj) = info.uses.get(e) {
                    if info.objects[obj].is_package_local() {
                        tracker.use_idents.entry(obj).or_default().push(e);
                    }
                }
            });
        }
    }
    tracker
}

#[cfg(test)]
mod tests {
    use super::*;
    use goshrink_syntax::parser::parse_file;
    use goshrink_syntax::resolve;
    use std::path::Path;

    fn setup(src: &str) -> (Arena, Package, TypeInfo, RefTracker) {
        let mut arena = Arena::new();
        let file = parse_file(&mut arena, Path::new("main.go"), src).expect("parse");
        let pkg = Package {
            name: file.package.clone(),
            files: vec![file],
        };
        let info = resolve::check(&arena, &pkg);
        let tracker = build(&arena, &pkg, &info);
        (arena, pkg, info, tracker)
    }

    fn obj_named(info: &TypeInfo, tracker: &RefTracker, name: &str) -> ObjId {
        tracker
            .rev_defs
            .keys()
            .copied()
            .find(|&o| info.objects[o].name == name)
            .unwrap_or_else(|| panic!("no tracked object named {name}"))
    }

    #[test]
    fn counts_uses_per_object() {
        let (_, _, info, tracker) = setup(
            "package p\n\nvar a = 1\n\nvar b = 2\n\nfunc f() int {\n\treturn a + a + b\n}\n",
        );
        assert_eq!(tracker.use_count(obj_named(&info, &tracker, "a")), 2);
        assert_eq!(tracker.use_count(obj_named(&info, &tracker, "b")), 1);
        assert_eq!(tracker.use_count(obj_named(&info, &tracker, "f")), 0);
    }

    #[test]
    fn builtin_uses_are_excluded() {
        let (_, _, info, tracker) = setup("package p\n\nfunc f(s string) int {\n\treturn len(s)\n}\n");
        // `len` resolves to the universe and must not be tracked; the only
        // tracked use is `s`.
        assert_eq!(tracker.use_idents.len(), 1);
        let only = *tracker.use_idents.keys().next().unwrap();
        assert_eq!(info.objects[only].name, "s");
    }

    #[test]
    fn rev_defs_points_at_the_declaring_ident() {
        let (arena, _, info, tracker) = setup("package p\n\nconst k = 5\n");
        let k = obj_named(&info, &tracker, "k");
        let ident = tracker.rev_defs[&k];
        assert_eq!(arena.ident_name(ident), Some("k"));
    }
}
