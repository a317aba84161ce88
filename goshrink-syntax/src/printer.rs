//! Serializes trees back to source text.
//!
//! Two modes share one printer: `Raw` is the reducer's speculative
//! serialization (no indentation, no blank lines) and doubles as the memo
//! fingerprint, so it must be deterministic; `Formatted` is used once for
//! the final output files.  Both produce text the parser accepts again.
//! Statements always get their own line; the scanner's semicolon insertion
//! depends on it.

use crate::ast::*;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Raw,
    Formatted,
}

/// Appends the serialized file to `out`, which the caller truncates and
/// reuses across candidates.
pub fn print_file(arena: &Arena, file: &File, mode: Mode, out: &mut String) {
    let mut p = Printer {
        arena,
        mode,
        depth: 0,
        out,
    };
    p.file(file);
}

pub fn file_to_string(arena: &Arena, file: &File, mode: Mode) -> String {
    let mut out = String::new();
    print_file(arena, file, mode, &mut out);
    out
}

pub fn expr_to_string(arena: &Arena, e: ExprId) -> String {
    let mut out = String::new();
    let mut p = Printer {
        arena,
        mode: Mode::Raw,
        depth: 0,
        out: &mut out,
    };
    p.expr(e);
    out
}

struct Printer<'a> {
    arena: &'a Arena,
    mode: Mode,
    depth: usize,
    out: &'a mut String,
}

impl<'a> Printer<'a> {
    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn nl(&mut self) {
        self.out.push('\n');
    }

    fn indent(&mut self) {
        if self.mode == Mode::Formatted {
            for _ in 0..self.depth {
                self.out.push('\t');
            }
        }
    }

    fn file(&mut self, file: &File) {
        self.push("package ");
        self.push(&file.package);
        self.nl();
        for &d in &file.decls {
            if self.mode == Mode::Formatted {
                self.nl();
            }
            self.decl(d);
            self.nl();
        }
    }

    fn decl(&mut self, d: DeclId) {
        match &self.arena.decls[d].kind {
            DeclKind::Func {
                name,
                recv,
                sig,
                body,
            } => {
                self.push("func ");
                if let Some(recv) = recv {
                    self.push("(");
                    self.field(recv);
                    self.push(") ");
                }
                self.expr(*name);
                self.sig(sig);
                if let Some(body) = body {
                    self.push(" ");
                    self.block(*body);
                }
            }
            DeclKind::Gen { kw, specs, grouped } => {
                self.push(kw.as_str());
                if *grouped {
                    self.push(" (");
                    self.nl();
                    self.depth += 1;
                    for &s in specs {
                        self.indent();
                        self.spec(s);
                        self.nl();
                    }
                    self.depth -= 1;
                    self.indent();
                    self.push(")");
                } else {
                    self.push(" ");
                    if let Some(&s) = specs.first() {
                        self.spec(s);
                    }
                }
            }
        }
    }

    fn spec(&mut self, s: SpecId) {
        match &self.arena.specs[s].kind {
            SpecKind::Import { name, path } => {
                if let Some(name) = name {
                    self.expr(*name);
                    self.push(" ");
                }
                self.expr(*path);
            }
            SpecKind::Value { names, ty, values } => {
                self.expr_list(names);
                if let Some(ty) = ty {
                    self.push(" ");
                    self.expr(*ty);
                }
                if !values.is_empty() {
                    self.push(" = ");
                    self.expr_list(values);
                }
            }
            SpecKind::Type { name, ty } => {
                self.expr(*name);
                self.push(" ");
                self.expr(*ty);
            }
        }
    }

    fn block(&mut self, s: StmtId) {
        let StmtKind::Block(stmts) = &self.arena.stmts[s].kind else {
            // Headers can hold a non-block after mutation; print it braced
            // so the result still parses.
            self.push("{");
            self.nl();
            self.depth += 1;
            self.indent();
            self.stmt(s);
            self.nl();
            self.depth -= 1;
            self.indent();
            self.push("}");
            return;
        };
        self.push("{");
        self.nl();
        self.depth += 1;
        for &child in stmts {
            self.indent();
            self.stmt(child);
            self.nl();
        }
        self.depth -= 1;
        self.indent();
        self.push("}");
    }

    fn stmt(&mut self, s: StmtId) {
        match &self.arena.stmts[s].kind {
            StmtKind::Empty => {}
            StmtKind::Block(_) => self.block(s),
            StmtKind::If {
                init,
                cond,
                body,
                els,
            } => {
                self.push("if ");
                if let Some(init) = init {
                    self.stmt(*init);
                    self.push("; ");
                }
                self.expr(*cond);
                self.push(" ");
                self.block(*body);
                if let Some(els) = els {
                    self.push(" else ");
                    match self.arena.stmts[*els].kind {
                        StmtKind::If { .. } => self.stmt(*els),
                        _ => self.block(*els),
                    }
                }
            }
            StmtKind::Switch { init, tag, cases } => {
                self.push("switch ");
                if let Some(init) = init {
                    self.stmt(*init);
                    self.push("; ");
                }
                if let Some(tag) = tag {
                    self.expr(*tag);
                    self.push(" ");
                }
                self.push("{");
                self.nl();
                for case in cases {
                    self.indent();
                    if case.exprs.is_empty() {
                        self.push("default:");
                    } else {
                        self.push("case ");
                        self.expr_list(&case.exprs);
                        self.push(":");
                    }
                    self.nl();
                    self.depth += 1;
                    for &child in &case.body {
                        self.indent();
                        self.stmt(child);
                        self.nl();
                    }
                    self.depth -= 1;
                }
                self.indent();
                self.push("}");
            }
            StmtKind::Select { cases } => {
                self.push("select {");
                self.nl();
                for case in cases {
                    self.indent();
                    match case.comm {
                        Some(comm) => {
                            self.push("case ");
                            self.stmt(comm);
                            self.push(":");
                        }
                        None => self.push("default:"),
                    }
                    self.nl();
                    self.depth += 1;
                    for &child in &case.body {
                        self.indent();
                        self.stmt(child);
                        self.nl();
                    }
                    self.depth -= 1;
                }
                self.indent();
                self.push("}");
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                self.push("for ");
                if init.is_some() || post.is_some() {
                    if let Some(init) = init {
                        self.stmt(*init);
                    }
                    self.push("; ");
                    if let Some(cond) = cond {
                        self.expr(*cond);
                    }
                    self.push("; ");
                    if let Some(post) = post {
                        self.stmt(*post);
                    }
                    self.push(" ");
                } else if let Some(cond) = cond {
                    self.expr(*cond);
                    self.push(" ");
                }
                self.block(*body);
            }
            StmtKind::Range {
                key,
                value,
                define,
                expr,
                body,
            } => {
                self.push("for ");
                if let Some(key) = key {
                    self.expr(*key);
                    if let Some(value) = value {
                        self.push(", ");
                        self.expr(*value);
                    }
                    self.push(if *define { " := " } else { " = " });
                }
                self.push("range ");
                self.expr(*expr);
                self.push(" ");
                self.block(*body);
            }
            StmtKind::Assign { lhs, op, rhs } => {
                self.expr_list(lhs);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.expr_list(rhs);
            }
            StmtKind::IncDec { expr, inc } => {
                self.expr(*expr);
                self.push(if *inc { "++" } else { "--" });
            }
            StmtKind::Send { chan, value } => {
                self.expr(*chan);
                self.push(" <- ");
                self.expr(*value);
            }
            StmtKind::Expr(e) => self.expr(*e),
            StmtKind::Return(results) => {
                self.push("return");
                if !results.is_empty() {
                    self.push(" ");
                    self.expr_list(results);
                }
            }
            StmtKind::Branch(kind) => self.push(kind.as_str()),
            StmtKind::Defer(e) => {
                self.push("defer ");
                self.expr(*e);
            }
            StmtKind::Go(e) => {
                self.push("go ");
                self.expr(*e);
            }
            StmtKind::Decl(d) => self.decl(*d),
        }
    }

    fn expr_list(&mut self, list: &[ExprId]) {
        for (i, &e) in list.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(e);
        }
    }

    fn expr(&mut self, e: ExprId) {
        match &self.arena.exprs[e].kind {
            ExprKind::Ident(name) => self.push(name),
            ExprKind::Lit { text, .. } => self.push(text),
            ExprKind::Composite { ty, elems } => {
                if let Some(ty) = ty {
                    self.expr(*ty);
                }
                self.push("{");
                self.expr_list(elems);
                self.push("}");
            }
            ExprKind::KeyValue { key, value } => {
                self.expr(*key);
                self.push(": ");
                self.expr(*value);
            }
            ExprKind::Call { func, args, spread } => {
                self.expr(*func);
                self.push("(");
                self.expr_list(args);
                if *spread {
                    self.push("...");
                }
                self.push(")");
            }
            ExprKind::Index { expr, index } => {
                self.expr(*expr);
                self.push("[");
                self.expr(*index);
                self.push("]");
            }
            ExprKind::Slice {
                expr,
                low,
                high,
                max,
                three,
            } => {
                self.expr(*expr);
                self.push("[");
                if let Some(low) = low {
                    self.expr(*low);
                }
                self.push(":");
                if let Some(high) = high {
                    self.expr(*high);
                }
                if *three {
                    self.push(":");
                    if let Some(max) = max {
                        self.expr(*max);
                    }
                }
                self.push("]");
            }
            ExprKind::Unary { op, expr } => {
                self.push(op.as_str());
                self.expr(*expr);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.expr(*lhs);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.expr(*rhs);
            }
            ExprKind::Star(inner) => {
                self.push("*");
                self.expr(*inner);
            }
            ExprKind::Paren(inner) => {
                self.push("(");
                self.expr(*inner);
                self.push(")");
            }
            ExprKind::Selector { expr, sel } => {
                self.expr(*expr);
                self.push(".");
                self.expr(*sel);
            }
            ExprKind::FuncLit { sig, body } => {
                self.push("func");
                self.sig(sig);
                self.push(" ");
                self.block(*body);
            }
            ExprKind::ArrayType { len, elem } => {
                self.push("[");
                if let Some(len) = len {
                    self.expr(*len);
                }
                self.push("]");
                self.expr(*elem);
            }
            ExprKind::MapType { key, value } => {
                self.push("map[");
                self.expr(*key);
                self.push("]");
                self.expr(*value);
            }
            ExprKind::ChanType { dir, elem } => {
                match dir {
                    ChanDir::Both => self.push("chan "),
                    ChanDir::Send => self.push("chan<- "),
                    ChanDir::Recv => self.push("<-chan "),
                }
                self.expr(*elem);
            }
            ExprKind::StructType { fields } => {
                self.push("struct {");
                self.nl();
                self.depth += 1;
                for field in fields {
                    self.indent();
                    self.field(field);
                    self.nl();
                }
                self.depth -= 1;
                self.indent();
                self.push("}");
            }
            ExprKind::FuncType(sig) => {
                self.push("func");
                self.sig(sig);
            }
            ExprKind::InterfaceType => self.push("interface{}"),
            ExprKind::Ellipsis(elem) => {
                self.push("...");
                if let Some(elem) = elem {
                    self.expr(*elem);
                }
            }
        }
    }

    fn field(&mut self, field: &Field) {
        if !field.names.is_empty() {
            self.expr_list(&field.names);
            self.push(" ");
        }
        self.expr(field.ty);
    }

    fn sig(&mut self, sig: &FuncSig) {
        self.push("(");
        for (i, field) in sig.params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.field(field);
        }
        self.push(")");
        match sig.results.as_slice() {
            [] => {}
            [single] if single.names.is_empty() => {
                self.push(" ");
                self.expr(single.ty);
            }
            results => {
                self.push(" (");
                for (i, field) in results.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.field(field);
                }
                self.push(")");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_file;
    use std::path::Path;

    fn roundtrip(src: &str) {
        let mut arena = Arena::new();
        let file = parse_file(&mut arena, Path::new("main.go"), src).expect("parse");
        let printed = file_to_string(&arena, &file, Mode::Raw);
        let mut arena2 = Arena::new();
        let file2 = parse_file(&mut arena2, Path::new("main.go"), &printed)
            .unwrap_or_else(|e| panic!("reparse failed: {e}\n{printed}"));
        let printed2 = file_to_string(&arena2, &file2, Mode::Raw);
        assert_eq!(printed, printed2, "print is not a fixed point");
    }

    #[test]
    fn roundtrip_basics() {
        roundtrip(
            "package main\n\nimport \"fmt\"\n\nconst k = 5\n\nfunc main() {\n\tfmt.Println(k + 1)\n}\n",
        );
    }

    #[test]
    fn roundtrip_control_flow() {
        roundtrip(
            "package p\n\nfunc f(x int, a []int) int {\n\tif x > 0 {\n\t\tx--\n\t} else if x < -1 {\n\t\tx++\n\t} else {\n\t\tx = 0\n\t}\n\tswitch x {\n\tcase 1:\n\t\treturn 1\n\tdefault:\n\t}\n\tfor i, v := range a {\n\t\tx += i * v\n\t}\n\tfor i := 0; i < 3; i++ {\n\t\tx += a[i:][0]\n\t}\n\treturn x\n}\n",
        );
    }

    #[test]
    fn roundtrip_types_and_literals() {
        roundtrip(
            "package p\n\ntype T struct {\n\ta, b int\n\tc map[string][]int\n}\n\nvar v = T{a: 1, b: 2}\n\nvar ch chan int\n\nfunc g() func() int {\n\treturn func() int {\n\t\treturn len(\"abc\")\n\t}\n}\n",
        );
    }

    #[test]
    fn roundtrip_goroutines() {
        roundtrip(
            "package p\n\nfunc f(ch chan int) {\n\tgo func() {\n\t\tch <- 1\n\t}()\n\tdefer close(ch)\n\tselect {\n\tcase v := <-ch:\n\t\t_ = v\n\tdefault:\n\t}\n}\n",
        );
    }

    #[test]
    fn formatted_has_blank_lines_between_decls() {
        let mut arena = Arena::new();
        let file = parse_file(
            &mut arena,
            Path::new("main.go"),
            "package p\nvar a = 1\nvar b = 2\n",
        )
        .unwrap();
        let formatted = file_to_string(&arena, &file, Mode::Formatted);
        assert_eq!(formatted, "package p\n\nvar a = 1\n\nvar b = 2\n");
    }

    #[test]
    fn raw_mode_is_stable_under_reparse() {
        let mut arena = Arena::new();
        let file = parse_file(
            &mut arena,
            Path::new("main.go"),
            "package p\n\nvar (\n\ta = 1\n\tb, c = 2, 3\n)\n\nfunc f(a []int) []int {\n\treturn a[1:2:3]\n}\n",
        )
        .unwrap();
        let raw = file_to_string(&arena, &file, Mode::Raw);
        assert!(raw.contains("a[1:2:3]"));
        let mut arena2 = Arena::new();
        parse_file(&mut arena2, Path::new("main.go"), &raw).expect("raw output reparses");
    }
}
