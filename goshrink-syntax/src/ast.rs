//! Arena-backed syntax tree.
//!
//! Nodes live in one `SlotMap` per category and refer to their children by
//! key.  The reducer mutates trees by overwriting child keys in place, so
//! keys must stay stable across edits; detached subtrees simply keep their
//! slots until the arena is dropped.  `NodeRef` is the erased node identity
//! used by maps that span categories (the parent index, undo records).

use crate::token::Pos;
use slotmap::{new_key_type, SlotMap};
use std::path::PathBuf;

new_key_type! {
    pub struct ExprId;
    pub struct StmtId;
    pub struct DeclId;
    pub struct SpecId;
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum NodeRef {
    Expr(ExprId),
    Stmt(StmtId),
    Decl(DeclId),
    Spec(SpecId),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LitKind {
    Int,
    Float,
    Char,
    Str,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnOp {
    Plus,
    Minus,
    Not,
    Xor,
    Addr,
    Recv,
}

impl UnOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnOp::Plus => "+",
            UnOp::Minus => "-",
            UnOp::Not => "!",
            UnOp::Xor => "^",
            UnOp::Addr => "&",
            UnOp::Recv => "<-",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinOp {
    LOr,
    LAnd,
    Eql,
    Neq,
    Lss,
    Leq,
    Gtr,
    Geq,
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    AndNot,
    Shl,
    Shr,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::LOr => "||",
            BinOp::LAnd => "&&",
            BinOp::Eql => "==",
            BinOp::Neq => "!=",
            BinOp::Lss => "<",
            BinOp::Leq => "<=",
            BinOp::Gtr => ">",
            BinOp::Geq => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Quo => "/",
            BinOp::Rem => "%",
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Xor => "^",
            BinOp::AndNot => "&^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }

    /// Binding strength, high binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::LOr => 1,
            BinOp::LAnd => 2,
            BinOp::Eql | BinOp::Neq | BinOp::Lss | BinOp::Leq | BinOp::Gtr | BinOp::Geq => 3,
            BinOp::Add | BinOp::Sub | BinOp::Or | BinOp::Xor => 4,
            BinOp::Mul
            | BinOp::Quo
            | BinOp::Rem
            | BinOp::Shl
            | BinOp::Shr
            | BinOp::And
            | BinOp::AndNot => 5,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AssignOp {
    Assign,
    Define,
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    AndNot,
    Shl,
    Shr,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Define => ":=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Quo => "/=",
            AssignOp::Rem => "%=",
            AssignOp::And => "&=",
            AssignOp::Or => "|=",
            AssignOp::Xor => "^=",
            AssignOp::AndNot => "&^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BranchKind {
    Break,
    Continue,
    Fallthrough,
}

impl BranchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchKind::Break => "break",
            BranchKind::Continue => "continue",
            BranchKind::Fallthrough => "fallthrough",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// A parameter/result/receiver/struct-field group: `a, b T`.
#[derive(Clone, Debug)]
pub struct Field {
    pub names: Vec<ExprId>,
    pub ty: ExprId,
}

#[derive(Clone, Debug, Default)]
pub struct FuncSig {
    pub params: Vec<Field>,
    pub results: Vec<Field>,
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Pos,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Ident(String),
    Lit {
        kind: LitKind,
        /// Quoted source text for strings and chars.
        text: String,
    },
    Composite {
        ty: Option<ExprId>,
        elems: Vec<ExprId>,
    },
    KeyValue {
        key: ExprId,
        value: ExprId,
    },
    Call {
        func: ExprId,
        args: Vec<ExprId>,
        spread: bool,
    },
    Index {
        expr: ExprId,
        index: ExprId,
    },
    Slice {
        expr: ExprId,
        low: Option<ExprId>,
        high: Option<ExprId>,
        max: Option<ExprId>,
        three: bool,
    },
    Unary {
        op: UnOp,
        expr: ExprId,
    },
    Binary {
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Star(ExprId),
    Paren(ExprId),
    Selector {
        expr: ExprId,
        sel: ExprId,
    },
    FuncLit {
        sig: FuncSig,
        body: StmtId,
    },
    // Type forms, usable in expression position.
    ArrayType {
        len: Option<ExprId>,
        elem: ExprId,
    },
    MapType {
        key: ExprId,
        value: ExprId,
    },
    ChanType {
        dir: ChanDir,
        elem: ExprId,
    },
    StructType {
        fields: Vec<Field>,
    },
    FuncType(FuncSig),
    InterfaceType,
    Ellipsis(Option<ExprId>),
}

#[derive(Clone, Debug)]
pub struct CaseClause {
    /// Empty for `default`.
    pub exprs: Vec<ExprId>,
    pub body: Vec<StmtId>,
    pub pos: Pos,
}

#[derive(Clone, Debug)]
pub struct CommClause {
    /// None for `default`.
    pub comm: Option<StmtId>,
    pub body: Vec<StmtId>,
    pub pos: Pos,
}

#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: Pos,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    Empty,
    Block(Vec<StmtId>),
    If {
        init: Option<StmtId>,
        cond: ExprId,
        body: StmtId,
        els: Option<StmtId>,
    },
    Switch {
        init: Option<StmtId>,
        tag: Option<ExprId>,
        cases: Vec<CaseClause>,
    },
    Select {
        cases: Vec<CommClause>,
    },
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        post: Option<StmtId>,
        body: StmtId,
    },
    Range {
        key: Option<ExprId>,
        value: Option<ExprId>,
        define: bool,
        expr: ExprId,
        body: StmtId,
    },
    Assign {
        lhs: Vec<ExprId>,
        op: AssignOp,
        rhs: Vec<ExprId>,
    },
    IncDec {
        expr: ExprId,
        inc: bool,
    },
    Send {
        chan: ExprId,
        value: ExprId,
    },
    Expr(ExprId),
    Return(Vec<ExprId>),
    Branch(BranchKind),
    Defer(ExprId),
    Go(ExprId),
    Decl(DeclId),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DeclKw {
    Import,
    Var,
    Const,
    Type,
}

impl DeclKw {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKw::Import => "import",
            DeclKw::Var => "var",
            DeclKw::Const => "const",
            DeclKw::Type => "type",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Decl {
    pub kind: DeclKind,
    pub pos: Pos,
}

#[derive(Clone, Debug)]
pub enum DeclKind {
    Func {
        name: ExprId,
        recv: Option<Field>,
        sig: FuncSig,
        body: Option<StmtId>,
    },
    Gen {
        kw: DeclKw,
        specs: Vec<SpecId>,
        grouped: bool,
    },
}

#[derive(Clone, Debug)]
pub struct Spec {
    pub kind: SpecKind,
    pub pos: Pos,
}

#[derive(Clone, Debug)]
pub enum SpecKind {
    Import {
        /// Explicit local name, including the blank one.
        name: Option<ExprId>,
        /// The quoted path literal.
        path: ExprId,
    },
    Value {
        names: Vec<ExprId>,
        ty: Option<ExprId>,
        values: Vec<ExprId>,
    },
    Type {
        name: ExprId,
        ty: ExprId,
    },
}

#[derive(Clone, Debug)]
pub struct File {
    pub package: String,
    pub path: PathBuf,
    pub decls: Vec<DeclId>,
}

/// One parsed package: the arena plus its files, in directory order.
#[derive(Clone, Debug, Default)]
pub struct Package {
    pub name: String,
    pub files: Vec<File>,
}

#[derive(Clone, Debug, Default)]
pub struct Arena {
    pub exprs: SlotMap<ExprId, Expr>,
    pub stmts: SlotMap<StmtId, Stmt>,
    pub decls: SlotMap<DeclId, Decl>,
    pub specs: SlotMap<SpecId, Spec>,
}

impl Arena {
    pub fn new() -> Arena {
        Arena::default()
    }

    pub fn expr(&mut self, kind: ExprKind, pos: Pos) -> ExprId {
        self.exprs.insert(Expr { kind, pos })
    }

    pub fn stmt(&mut self, kind: StmtKind, pos: Pos) -> StmtId {
        self.stmts.insert(Stmt { kind, pos })
    }

    pub fn decl(&mut self, kind: DeclKind, pos: Pos) -> DeclId {
        self.decls.insert(Decl { kind, pos })
    }

    pub fn spec(&mut self, kind: SpecKind, pos: Pos) -> SpecId {
        self.specs.insert(Spec { kind, pos })
    }

    pub fn ident(&mut self, name: impl Into<String>, pos: Pos) -> ExprId {
        self.expr(ExprKind::Ident(name.into()), pos)
    }

    pub fn ident_name(&self, e: ExprId) -> Option<&str> {
        match &self.exprs[e].kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn node_pos(&self, n: NodeRef) -> Pos {
        match n {
            NodeRef::Expr(e) => self.exprs[e].pos,
            NodeRef::Stmt(s) => self.stmts[s].pos,
            NodeRef::Decl(d) => self.decls[d].pos,
            NodeRef::Spec(s) => self.specs[s].pos,
        }
    }

    /// Calls `f` with every immediate child of `n`, in source order.
    pub fn for_each_child(&self, n: NodeRef, f: &mut impl FnMut(NodeRef)) {
        match n {
            NodeRef::Expr(id) => match &self.exprs[id].kind {
                ExprKind::Ident(_) | ExprKind::Lit { .. } | ExprKind::InterfaceType => {}
                ExprKind::Composite { ty, elems } => {
                    if let Some(ty) = ty {
                        f(NodeRef::Expr(*ty));
                    }
                    for e in elems {
                        f(NodeRef::Expr(*e));
                    }
                }
                ExprKind::KeyValue { key, value } => {
                    f(NodeRef::Expr(*key));
                    f(NodeRef::Expr(*value));
                }
                ExprKind::Call { func, args, .. } => {
                    f(NodeRef::Expr(*func));
                    for a in args {
                        f(NodeRef::Expr(*a));
                    }
                }
                ExprKind::Index { expr: e, index } => {
                    f(NodeRef::Expr(*e));
                    f(NodeRef::Expr(*index));
                }
                ExprKind::Slice {
                    expr: e,
                    low,
                    high,
                    max,
                    ..
                } => {
                    f(NodeRef::Expr(*e));
                    for part in [low, high, max].into_iter().flatten() {
                        f(NodeRef::Expr(*part));
                    }
                }
                ExprKind::Unary { expr: e, .. }
                | ExprKind::Star(e)
                | ExprKind::Paren(e) => f(NodeRef::Expr(*e)),
                ExprKind::Binary { lhs, rhs, .. } => {
                    f(NodeRef::Expr(*lhs));
                    f(NodeRef::Expr(*rhs));
                }
                ExprKind::Selector { expr: e, sel } => {
                    f(NodeRef::Expr(*e));
                    f(NodeRef::Expr(*sel));
                }
                ExprKind::FuncLit { sig, body } => {
                    self.sig_children(sig, &mut *f);
                    f(NodeRef::Stmt(*body));
                }
                ExprKind::ArrayType { len, elem } => {
                    if let Some(len) = len {
                        f(NodeRef::Expr(*len));
                    }
                    f(NodeRef::Expr(*elem));
                }
                ExprKind::MapType { key, value } => {
                    f(NodeRef::Expr(*key));
                    f(NodeRef::Expr(*value));
                }
                ExprKind::ChanType { elem, .. } => f(NodeRef::Expr(*elem)),
                ExprKind::StructType { fields } => {
                    for field in fields {
                        self.field_children(field, &mut *f);
                    }
                }
                ExprKind::FuncType(sig) => self.sig_children(sig, &mut *f),
                ExprKind::Ellipsis(elem) => {
                    if let Some(e) = elem {
                        f(NodeRef::Expr(*e));
                    }
                }
            },
            NodeRef::Stmt(id) => match &self.stmts[id].kind {
                StmtKind::Empty | StmtKind::Branch(_) => {}
                StmtKind::Block(stmts) => {
                    for s in stmts {
                        f(NodeRef::Stmt(*s));
                    }
                }
                StmtKind::If {
                    init,
                    cond,
                    body,
                    els,
                } => {
                    if let Some(init) = init {
                        f(NodeRef::Stmt(*init));
                    }
                    f(NodeRef::Expr(*cond));
                    f(NodeRef::Stmt(*body));
                    if let Some(els) = els {
                        f(NodeRef::Stmt(*els));
                    }
                }
                StmtKind::Switch { init, tag, cases } => {
                    if let Some(init) = init {
                        f(NodeRef::Stmt(*init));
                    }
                    if let Some(tag) = tag {
                        f(NodeRef::Expr(*tag));
                    }
                    for case in cases {
                        for e in &case.exprs {
                            f(NodeRef::Expr(*e));
                        }
                        for s in &case.body {
                            f(NodeRef::Stmt(*s));
                        }
                    }
                }
                StmtKind::Select { cases } => {
                    for case in cases {
                        if let Some(comm) = case.comm {
                            f(NodeRef::Stmt(comm));
                        }
                        for s in &case.body {
                            f(NodeRef::Stmt(*s));
                        }
                    }
                }
                StmtKind::For {
                    init,
                    cond,
                    post,
                    body,
                } => {
                    if let Some(init) = init {
                        f(NodeRef::Stmt(*init));
                    }
                    if let Some(cond) = cond {
                        f(NodeRef::Expr(*cond));
                    }
                    if let Some(post) = post {
                        f(NodeRef::Stmt(*post));
                    }
                    f(NodeRef::Stmt(*body));
                }
                StmtKind::Range {
                    key,
                    value,
                    expr: e,
                    body,
                    ..
                } => {
                    for part in [key, value].into_iter().flatten() {
                        f(NodeRef::Expr(*part));
                    }
                    f(NodeRef::Expr(*e));
                    f(NodeRef::Stmt(*body));
                }
                StmtKind::Assign { lhs, rhs, .. } => {
                    for e in lhs.iter().chain(rhs) {
                        f(NodeRef::Expr(*e));
                    }
                }
                StmtKind::IncDec { expr: e, .. } => f(NodeRef::Expr(*e)),
                StmtKind::Send { chan, value } => {
                    f(NodeRef::Expr(*chan));
                    f(NodeRef::Expr(*value));
                }
                StmtKind::Expr(e) | StmtKind::Defer(e) | StmtKind::Go(e) => f(NodeRef::Expr(*e)),
                StmtKind::Return(results) => {
                    for e in results {
                        f(NodeRef::Expr(*e));
                    }
                }
                StmtKind::Decl(d) => f(NodeRef::Decl(*d)),
            },
            NodeRef::Decl(id) => match &self.decls[id].kind {
                DeclKind::Func {
                    name,
                    recv,
                    sig,
                    body,
                } => {
                    f(NodeRef::Expr(*name));
                    if let Some(recv) = recv {
                        self.field_children(recv, &mut *f);
                    }
                    self.sig_children(sig, &mut *f);
                    if let Some(body) = body {
                        f(NodeRef::Stmt(*body));
                    }
                }
                DeclKind::Gen { specs, .. } => {
                    for s in specs {
                        f(NodeRef::Spec(*s));
                    }
                }
            },
            NodeRef::Spec(id) => match &self.specs[id].kind {
                SpecKind::Import { name, path } => {
                    if let Some(name) = name {
                        f(NodeRef::Expr(*name));
                    }
                    f(NodeRef::Expr(*path));
                }
                SpecKind::Value { names, ty, values } => {
                    for e in names {
                        f(NodeRef::Expr(*e));
                    }
                    if let Some(ty) = ty {
                        f(NodeRef::Expr(*ty));
                    }
                    for e in values {
                        f(NodeRef::Expr(*e));
                    }
                }
                SpecKind::Type { name, ty } => {
                    f(NodeRef::Expr(*name));
                    f(NodeRef::Expr(*ty));
                }
            },
        }
    }

    fn field_children(&self, field: &Field, f: &mut impl FnMut(NodeRef)) {
        for name in &field.names {
            f(NodeRef::Expr(*name));
        }
        f(NodeRef::Expr(field.ty));
    }

    fn sig_children(&self, sig: &FuncSig, f: &mut impl FnMut(NodeRef)) {
        for field in sig.params.iter().chain(&sig.results) {
            self.field_children(field, &mut *f);
        }
    }

    /// Preorder walk of the subtree rooted at `n`.
    pub fn walk(&self, n: NodeRef, f: &mut impl FnMut(NodeRef)) {
        f(n);
        let mut children = Vec::new();
        self.for_each_child(n, &mut |c| children.push(c));
        for c in children {
            self.walk(c, &mut *f);
        }
    }

    /// Deep-copies the expression subtree rooted at `e`.  Used by rules that
    /// duplicate a right-hand side at a use site; the duplicate reports the
    /// same source positions as the original.
    pub fn clone_expr(&mut self, e: ExprId) -> ExprId {
        let Expr { kind, pos } = self.exprs[e].clone();
        let kind = match kind {
            ExprKind::Ident(_) | ExprKind::Lit { .. } | ExprKind::InterfaceType => kind,
            ExprKind::Composite { ty, elems } => ExprKind::Composite {
                ty: ty.map(|t| self.clone_expr(t)),
                elems: elems.into_iter().map(|e| self.clone_expr(e)).collect(),
            },
            ExprKind::KeyValue { key, value } => ExprKind::KeyValue {
                key: self.clone_expr(key),
                value: self.clone_expr(value),
            },
            ExprKind::Call { func, args, spread } => ExprKind::Call {
                func: self.clone_expr(func),
                args: args.into_iter().map(|a| self.clone_expr(a)).collect(),
                spread,
            },
            ExprKind::Index { expr, index } => ExprKind::Index {
                expr: self.clone_expr(expr),
                index: self.clone_expr(index),
            },
            ExprKind::Slice {
                expr,
                low,
                high,
                max,
                three,
            } => ExprKind::Slice {
                expr: self.clone_expr(expr),
                low: low.map(|e| self.clone_expr(e)),
                high: high.map(|e| self.clone_expr(e)),
                max: max.map(|e| self.clone_expr(e)),
                three,
            },
            ExprKind::Unary { op, expr } => ExprKind::Unary {
                op,
                expr: self.clone_expr(expr),
            },
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op,
                lhs: self.clone_expr(lhs),
                rhs: self.clone_expr(rhs),
            },
            ExprKind::Star(e) => ExprKind::Star(self.clone_expr(e)),
            ExprKind::Paren(e) => ExprKind::Paren(self.clone_expr(e)),
            ExprKind::Selector { expr, sel } => ExprKind::Selector {
                expr: self.clone_expr(expr),
                sel: self.clone_expr(sel),
            },
            ExprKind::FuncLit { sig, body } => ExprKind::FuncLit {
                sig: self.clone_sig(&sig),
                body: self.clone_stmt(body),
            },
            ExprKind::ArrayType { len, elem } => ExprKind::ArrayType {
                len: len.map(|e| self.clone_expr(e)),
                elem: self.clone_expr(elem),
            },
            ExprKind::MapType { key, value } => ExprKind::MapType {
                key: self.clone_expr(key),
                value: self.clone_expr(value),
            },
            ExprKind::ChanType { dir, elem } => ExprKind::ChanType {
                dir,
                elem: self.clone_expr(elem),
            },
            ExprKind::StructType { fields } => ExprKind::StructType {
                fields: fields.iter().map(|f| self.clone_field(f)).collect(),
            },
            ExprKind::FuncType(sig) => ExprKind::FuncType(self.clone_sig(&sig)),
            ExprKind::Ellipsis(elem) => ExprKind::Ellipsis(elem.map(|e| self.clone_expr(e))),
        };
        self.expr(kind, pos)
    }

    pub fn clone_stmt(&mut self, s: StmtId) -> StmtId {
        let Stmt { kind, pos } = self.stmts[s].clone();
        let kind = match kind {
            StmtKind::Empty | StmtKind::Branch(_) => kind,
            StmtKind::Block(stmts) => {
                StmtKind::Block(stmts.into_iter().map(|s| self.clone_stmt(s)).collect())
            }
            StmtKind::If {
                init,
                cond,
                body,
                els,
            } => StmtKind::If {
                init: init.map(|s| self.clone_stmt(s)),
                cond: self.clone_expr(cond),
                body: self.clone_stmt(body),
                els: els.map(|s| self.clone_stmt(s)),
            },
            StmtKind::Switch { init, tag, cases } => StmtKind::Switch {
                init: init.map(|s| self.clone_stmt(s)),
                tag: tag.map(|e| self.clone_expr(e)),
                cases: cases
                    .into_iter()
                    .map(|c| CaseClause {
                        exprs: c.exprs.into_iter().map(|e| self.clone_expr(e)).collect(),
                        body: c.body.into_iter().map(|s| self.clone_stmt(s)).collect(),
                        pos: c.pos,
                    })
                    .collect(),
            },
            StmtKind::Select { cases } => StmtKind::Select {
                cases: cases
                    .into_iter()
                    .map(|c| CommClause {
                        comm: c.comm.map(|s| self.clone_stmt(s)),
                        body: c.body.into_iter().map(|s| self.clone_stmt(s)).collect(),
                        pos: c.pos,
                    })
                    .collect(),
            },
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => StmtKind::For {
                init: init.map(|s| self.clone_stmt(s)),
                cond: cond.map(|e| self.clone_expr(e)),
                post: post.map(|s| self.clone_stmt(s)),
                body: self.clone_stmt(body),
            },
            StmtKind::Range {
                key,
                value,
                define,
                expr,
                body,
            } => StmtKind::Range {
                key: key.map(|e| self.clone_expr(e)),
                value: value.map(|e| self.clone_expr(e)),
                define,
                expr: self.clone_expr(expr),
                body: self.clone_stmt(body),
            },
            StmtKind::Assign { lhs, op, rhs } => StmtKind::Assign {
                lhs: lhs.into_iter().map(|e| self.clone_expr(e)).collect(),
                op,
                rhs: rhs.into_iter().map(|e| self.clone_expr(e)).collect(),
            },
            StmtKind::IncDec { expr, inc } => StmtKind::IncDec {
                expr: self.clone_expr(expr),
                inc,
            },
            StmtKind::Send { chan, value } => StmtKind::Send {
                chan: self.clone_expr(chan),
                value: self.clone_expr(value),
            },
            StmtKind::Expr(e) => StmtKind::Expr(self.clone_expr(e)),
            StmtKind::Defer(e) => StmtKind::Defer(self.clone_expr(e)),
            StmtKind::Go(e) => StmtKind::Go(self.clone_expr(e)),
            StmtKind::Return(results) => {
                StmtKind::Return(results.into_iter().map(|e| self.clone_expr(e)).collect())
            }
            StmtKind::Decl(d) => {
                let Decl { kind, pos: dpos } = self.decls[d].clone();
                let kind = match kind {
                    DeclKind::Func {
                        name,
                        recv,
                        sig,
                        body,
                    } => DeclKind::Func {
                        name: self.clone_expr(name),
                        recv: recv.map(|f| self.clone_field(&f)),
                        sig: self.clone_sig(&sig),
                        body: body.map(|b| self.clone_stmt(b)),
                    },
                    DeclKind::Gen { kw, specs, grouped } => DeclKind::Gen {
                        kw,
                        specs: specs.into_iter().map(|s| self.clone_spec(s)).collect(),
                        grouped,
                    },
                };
                StmtKind::Decl(self.decl(kind, dpos))
            }
        };
        self.stmt(kind, pos)
    }

    fn clone_spec(&mut self, s: SpecId) -> SpecId {
        let Spec { kind, pos } = self.specs[s].clone();
        let kind = match kind {
            SpecKind::Import { name, path } => SpecKind::Import {
                name: name.map(|e| self.clone_expr(e)),
                path: self.clone_expr(path),
            },
            SpecKind::Value { names, ty, values } => SpecKind::Value {
                names: names.into_iter().map(|e| self.clone_expr(e)).collect(),
                ty: ty.map(|e| self.clone_expr(e)),
                values: values.into_iter().map(|e| self.clone_expr(e)).collect(),
            },
            SpecKind::Type { name, ty } => SpecKind::Type {
                name: self.clone_expr(name),
                ty: self.clone_expr(ty),
            },
        };
        self.spec(kind, pos)
    }

    fn clone_field(&mut self, field: &Field) -> Field {
        Field {
            names: field.names.iter().map(|&e| self.clone_expr(e)).collect(),
            ty: self.clone_expr(field.ty),
        }
    }

    fn clone_sig(&mut self, sig: &FuncSig) -> FuncSig {
        FuncSig {
            params: sig.params.iter().map(|f| self.clone_field(f)).collect(),
            results: sig.results.iter().map(|f| self.clone_field(f)).collect(),
        }
    }
}
