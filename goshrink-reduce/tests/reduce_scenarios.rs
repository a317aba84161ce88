//! End-to-end reductions against an in-process predicate.
//!
//! The oracle stands in for the external toolchain: it parses the scratch
//! directory with the real frontend, reports the compile errors the
//! toolchain would (undefined names, unused short-form locals, unused
//! imports), and interprets `main` with a tiny evaluator covering the
//! forms the fixtures use.  Reductions therefore run exactly as in
//! production, minus the process spawns.

use goshrink_reduce::{Error, FnOracle, Options, Reducer};
use goshrink_syntax::ast::{Arena, DeclKind, StmtKind};
use goshrink_syntax::parser;
use regex::bytes::Regex;
use std::fs;
use std::path::{Path, PathBuf};

mod oracle;

fn write_pkg(dir: &Path, src: &str) -> PathBuf {
    let path = dir.join("main.go");
    fs::write(&path, src).unwrap();
    path
}

fn reduce(src: &str, pattern: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pkg(dir.path(), src);
    let mut reducer = Reducer::with_oracle(
        dir.path(),
        Regex::new(pattern).unwrap(),
        Box::new(FnOracle::new(|d: &Path| oracle::run(d))),
        &Options::default(),
    )
    .expect("setup");
    reducer.run().expect("reduction succeeds");
    (dir, path)
}

/// Re-running on the output must accept nothing further.
fn assert_fixed_point(dir: &Path, pattern: &str) {
    let mut reducer = Reducer::with_oracle(
        dir,
        Regex::new(pattern).unwrap(),
        Box::new(FnOracle::new(|d: &Path| oracle::run(d))),
        &Options::default(),
    )
    .expect("setup");
    assert!(matches!(reducer.run(), Err(Error::CouldNotReduce)));
}

/// Statements of `main`'s body in the reduced file, serialized.
fn main_body(path: &Path) -> Vec<String> {
    let src = fs::read_to_string(path).unwrap();
    let mut arena = Arena::new();
    let file = parser::parse_file(&mut arena, path, &src).expect("reduced output parses");
    for &d in &file.decls {
        let DeclKind::Func { name, body, .. } = &arena.decls[d].kind else {
            continue;
        };
        if arena.ident_name(*name) != Some("main") {
            continue;
        }
        let StmtKind::Block(stmts) = &arena.stmts[body.unwrap()].kind else {
            panic!("main body is not a block");
        };
        return stmts.iter().map(|&s| stmt_text(&arena, s)).collect();
    }
    panic!("no main in reduced output");
}

fn stmt_text(arena: &Arena, s: goshrink_syntax::StmtId) -> String {
    match &arena.stmts[s].kind {
        StmtKind::Expr(e) => goshrink_syntax::printer::expr_to_string(arena, *e),
        other => format!("{other:?}"),
    }
}

#[test]
fn dead_branch_reduces_to_the_live_panic() {
    let src = "package main\n\nfunc main() {\n\tif true {\n\t\tpanic(\"x\")\n\t} else {\n\t\tpanic(\"y\")\n\t}\n}\n";
    let (dir, path) = reduce(src, "panic: x");
    let reduced = fs::read_to_string(&path).unwrap();
    assert!(reduced.contains("panic(\"x\")"), "{reduced}");
    assert!(!reduced.contains("if"), "{reduced}");
    assert!(!reduced.contains("\"y\""), "{reduced}");
    assert_fixed_point(dir.path(), "panic: x");
}

#[test]
fn single_use_constant_is_inlined_and_folded() {
    let src = "package main\n\nconst k = 5\n\nfunc main() {\n\tprint(k + 1)\n}\n";
    let (dir, path) = reduce(src, "^6$");
    let reduced = fs::read_to_string(&path).unwrap();
    assert!(!reduced.contains("const"), "constant should be gone: {reduced}");
    assert_eq!(main_body(&path), vec!["print(6)"]);
    assert_fixed_point(dir.path(), "^6$");
}

#[test]
fn unused_blank_import_is_removed() {
    let src = "package main\n\nimport (\n\t\"fmt\"\n\t_ \"os\"\n)\n\nfunc main() {\n\tfmt.Println(\"boom\")\n}\n";
    let (dir, path) = reduce(src, "boom");
    let reduced = fs::read_to_string(&path).unwrap();
    assert!(!reduced.contains("os"), "{reduced}");
    assert!(reduced.contains("\"fmt\""), "{reduced}");
    assert_fixed_point(dir.path(), "boom");
}

#[test]
fn method_with_unused_receiver_becomes_a_function() {
    let src = "package main\n\ntype T struct{}\n\nfunc (t T) M() {\n\tprintln(\"m called\")\n}\n\nfunc main() {\n\tx := T{}\n\tx.M()\n}\n";
    let (dir, path) = reduce(src, "m called");
    let reduced = fs::read_to_string(&path).unwrap();
    assert!(!reduced.contains("(t T)"), "receiver survives: {reduced}");
    assert!(!reduced.contains("x.M"), "call site survives: {reduced}");
    assert_fixed_point(dir.path(), "m called");
}

#[test]
fn composite_slice_resolves_to_its_element() {
    let src = "package main\n\nfunc main() {\n\ta := []int{1, 2, 3, 4}\n\tprint(a[1:3][0])\n}\n";
    let (dir, path) = reduce(src, "^2$");
    assert_eq!(main_body(&path), vec!["print(2)"]);
    assert_fixed_point(dir.path(), "^2$");
}

#[test]
fn composite_slice_reduces_further_when_the_pattern_allows() {
    // With a pattern that still matches `0`, the literal keeps shrinking.
    let src = "package main\n\nfunc main() {\n\ta := []int{1, 2, 3, 4}\n\tprint(a[1:3][0])\n}\n";
    let (_dir, path) = reduce(src, "^[0-9]$");
    assert_eq!(main_body(&path), vec!["print(0)"]);
}

#[test]
fn trivial_call_is_inlined() {
    let src = "package main\n\nfunc f() {\n\tprintln(\"did thing\")\n}\n\nfunc main() {\n\tf()\n}\n";
    let (dir, path) = reduce(src, "did thing");
    assert_eq!(main_body(&path), vec!["println(\"did thing\")"]);
    assert_fixed_point(dir.path(), "did thing");
}

#[test]
fn go_and_defer_wrappers_are_stripped() {
    let src = "package main\n\nfunc main() {\n\tdefer println(\"kept\")\n}\n";
    let (_dir, path) = reduce(src, "kept");
    assert_eq!(main_body(&path), vec!["println(\"kept\")"]);
}

#[test]
fn rejecting_every_candidate_leaves_the_input_untouched() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let src = "package main\n\nfunc main() {\n\tprintln(\"a\")\n\tprintln(\"b\")\n}\n";
    let dir = tempfile::tempdir().unwrap();
    let path = write_pkg(dir.path(), src);
    // Only the very first serialized program matches; every candidate after
    // that is rejected, so the run must end in could-not-reduce with the
    // input bytes intact.
    let first: Rc<RefCell<Option<Vec<u8>>>> = Rc::new(RefCell::new(None));
    let seen = Rc::clone(&first);
    let mut reducer = Reducer::with_oracle(
        dir.path(),
        Regex::new("boom").unwrap(),
        Box::new(FnOracle::new(move |d: &Path| {
            let text = fs::read(d.join("main.go"))?;
            let mut slot = seen.borrow_mut();
            match &*slot {
                None => {
                    *slot = Some(text);
                    Ok(b"boom".to_vec())
                }
                Some(original) if *original == text => Ok(b"boom".to_vec()),
                Some(_) => Ok(b"nope".to_vec()),
            }
        })),
        &Options::default(),
    )
    .expect("setup");
    assert!(matches!(reducer.run(), Err(Error::CouldNotReduce)));
    assert_eq!(fs::read_to_string(&path).unwrap(), src);
}

#[test]
fn predicate_must_match_up_front() {
    let src = "package main\n\nfunc main() {\n\tpanic(\"zap\")\n}\n";
    let dir = tempfile::tempdir().unwrap();
    write_pkg(dir.path(), src);
    let mut reducer = Reducer::with_oracle(
        dir.path(),
        Regex::new("unrelated pattern").unwrap(),
        Box::new(FnOracle::new(|d: &Path| oracle::run(d))),
        &Options::default(),
    )
    .expect("setup");
    assert!(matches!(reducer.run(), Err(Error::ErrorMismatch)));
}

#[test]
fn empty_initial_output_is_its_own_error() {
    let src = "package main\n\nfunc main() {\n}\n";
    let dir = tempfile::tempdir().unwrap();
    write_pkg(dir.path(), src);
    let mut reducer = Reducer::with_oracle(
        dir.path(),
        Regex::new(".*").unwrap(),
        Box::new(FnOracle::new(|d: &Path| oracle::run(d))),
        &Options::default(),
    )
    .expect("setup");
    assert!(matches!(reducer.run(), Err(Error::ExpectedError)));
}

/// Predicate oracle over the serialized source itself: accepts whenever the
/// current text matches `keep`.  Lets a test steer which of the three
/// cascade states (primary, underscore, unchanged) survives.
fn text_oracle(keep: &'static str) -> Box<dyn goshrink_reduce::Oracle> {
    Box::new(FnOracle::new(move |d: &Path| {
        let text = fs::read_to_string(d.join("main.go"))?;
        let keep = regex::Regex::new(keep).unwrap();
        Ok(if keep.is_match(&text) {
            b"MARKER".to_vec()
        } else {
            b"nope".to_vec()
        })
    }))
}

#[test]
fn deletion_falls_back_to_underscored_declaration() {
    // Removing `println(n)` leaves `n` dead.  The primary follow-up (drop
    // the declaration) is rejected here; the underscore form is accepted.
    let src = "package main\n\nconst n = 5\n\nfunc main() {\n\tprintln(n)\n\tpanic(\"x\")\n}\n";
    let dir = tempfile::tempdir().unwrap();
    let path = write_pkg(dir.path(), src);
    let mut reducer = Reducer::with_oracle(
        dir.path(),
        Regex::new("MARKER").unwrap(),
        text_oracle("const (n|_) = 5"),
        &Options::default(),
    )
    .expect("setup");
    reducer.run().expect("reduction succeeds");
    let reduced = fs::read_to_string(&path).unwrap();
    assert!(reduced.contains("const _ = 5"), "{reduced}");
    assert!(!reduced.contains("println"), "{reduced}");
}

#[test]
fn deletion_falls_back_to_unchanged_declaration() {
    // Here both the removed and the underscored declaration are rejected;
    // only restoring the declaration verbatim lets the deletion through.
    let src = "package main\n\nconst n = 5\n\nfunc main() {\n\tprintln(n)\n\tpanic(\"x\")\n}\n";
    let dir = tempfile::tempdir().unwrap();
    let path = write_pkg(dir.path(), src);
    let mut reducer = Reducer::with_oracle(
        dir.path(),
        Regex::new("MARKER").unwrap(),
        text_oracle("const n = 5"),
        &Options::default(),
    )
    .expect("setup");
    reducer.run().expect("reduction succeeds");
    let reduced = fs::read_to_string(&path).unwrap();
    assert!(reduced.contains("const n = 5"), "{reduced}");
    assert!(!reduced.contains("println"), "{reduced}");
}

#[test]
fn dead_statements_drop_with_their_declarations() {
    // Deleting `println(n)` leaves `n` dead; the deletion fallbacks must
    // take the declaration along (or blank it) in the same accepted step.
    let src = "package main\n\nconst n = 42\n\nfunc main() {\n\tprintln(n)\n\tpanic(\"keep\")\n}\n";
    let (dir, path) = reduce(src, "panic: keep");
    let reduced = fs::read_to_string(&path).unwrap();
    assert!(!reduced.contains("42"), "{reduced}");
    assert!(reduced.contains("panic(\"keep\")"), "{reduced}");
    assert_fixed_point(dir.path(), "panic: keep");
}
