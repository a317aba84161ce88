//! Recursive-descent parser for the subset grammar.
//!
//! One token of lookahead.  The only context carried across productions is
//! `allow_composite`, which suppresses composite-literal parsing inside
//! `if`/`for`/`switch` headers where `{` opens the body instead.

use crate::ast::*;
use crate::scanner::{Lexed, ScanError, Scanner};
use crate::token::{Pos, Tok};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{path}: {err}")]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("{path}:{err}")]
    Scan {
        path: PathBuf,
        #[source]
        err: ScanError,
    },
    #[error("{path}:{pos}: {msg}")]
    Syntax {
        path: PathBuf,
        pos: Pos,
        msg: String,
    },
    #[error("no source files in {0}")]
    NoFiles(PathBuf),
    #[error("expected a single package, found {0} and {1}")]
    PackageMismatch(String, String),
}

/// Parses every `.go` file in `dir` (skipping `_test` files) into `arena`,
/// requiring a single package name across files.  Files are visited in name
/// order so parses of the same directory are identical.
pub fn parse_dir(arena: &mut Arena, dir: &Path) -> Result<Package, ParseError> {
    let io_err = |err| ParseError::Io {
        path: dir.to_path_buf(),
        err,
    };
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?
        .into_iter()
        .map(|e| e.path())
        .filter(|p| {
            p.extension().is_some_and(|e| e == "go")
                && !p
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| s.ends_with("_test"))
        })
        .collect();
    paths.sort();
    if paths.is_empty() {
        return Err(ParseError::NoFiles(dir.to_path_buf()));
    }
    let mut pkg = Package::default();
    for path in paths {
        let src = fs::read_to_string(&path).map_err(|err| ParseError::Io {
            path: path.clone(),
            err,
        })?;
        let file = parse_file(arena, &path, &src)?;
        if pkg.name.is_empty() {
            pkg.name = file.package.clone();
        } else if pkg.name != file.package {
            return Err(ParseError::PackageMismatch(pkg.name, file.package));
        }
        pkg.files.push(file);
    }
    Ok(pkg)
}

pub fn parse_file(arena: &mut Arena, path: &Path, src: &str) -> Result<File, ParseError> {
    let mut p = Parser::new(arena, path, src)?;
    p.file()
}

struct Parser<'a> {
    arena: &'a mut Arena,
    path: PathBuf,
    scanner: Scanner<'a>,
    cur: Lexed,
    allow_composite: bool,
}

type PResult<T> = Result<T, ParseError>;

impl<'a> Parser<'a> {
    fn new(arena: &'a mut Arena, path: &Path, src: &'a str) -> PResult<Parser<'a>> {
        let mut scanner = Scanner::new(src);
        let cur = scanner.next().map_err(|err| ParseError::Scan {
            path: path.to_path_buf(),
            err,
        })?;
        Ok(Parser {
            arena,
            path: path.to_path_buf(),
            scanner,
            cur,
            allow_composite: true,
        })
    }

    fn bump(&mut self) -> PResult<Lexed> {
        let next = self.scanner.next().map_err(|err| ParseError::Scan {
            path: self.path.clone(),
            err,
        })?;
        Ok(std::mem::replace(&mut self.cur, next))
    }

    fn err<T>(&self, msg: impl Into<String>) -> PResult<T> {
        Err(ParseError::Syntax {
            path: self.path.clone(),
            pos: self.cur.pos,
            msg: msg.into(),
        })
    }

    fn at(&self, tok: Tok) -> bool {
        self.cur.tok == tok
    }

    fn eat(&mut self, tok: Tok) -> PResult<bool> {
        if self.at(tok) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, tok: Tok) -> PResult<Lexed> {
        if self.at(tok) {
            self.bump()
        } else {
            self.err(format!("expected {}, found {}", tok, self.cur.tok))
        }
    }

    /// A semicolon, possibly elided before a closing delimiter.
    fn expect_semi(&mut self) -> PResult<()> {
        if self.at(Tok::Semi) {
            self.bump()?;
        } else if !matches!(self.cur.tok, Tok::RParen | Tok::RBrace | Tok::Eof) {
            return self.err(format!("expected ;, found {}", self.cur.tok));
        }
        Ok(())
    }

    fn ident(&mut self) -> PResult<ExprId> {
        let lexed = self.expect(Tok::Ident)?;
        Ok(self.arena.ident(lexed.lit, lexed.pos))
    }

    // ----- file and declarations -----

    fn file(&mut self) -> PResult<File> {
        let _ = self.expect(Tok::Package)?;
        let package = self.expect(Tok::Ident)?.lit;
        self.expect_semi()?;
        let mut decls = Vec::new();
        while self.at(Tok::Import) {
            decls.push(self.gen_decl(DeclKw::Import)?);
            self.expect_semi()?;
        }
        while !self.at(Tok::Eof) {
            decls.push(self.decl()?);
            self.expect_semi()?;
        }
        Ok(File {
            package,
            path: self.path.clone(),
            decls,
        })
    }

    fn decl(&mut self) -> PResult<DeclId> {
        match self.cur.tok {
            Tok::Func => self.func_decl(),
            Tok::Var => self.gen_decl(DeclKw::Var),
            Tok::Const => self.gen_decl(DeclKw::Const),
            Tok::Type => self.gen_decl(DeclKw::Type),
            Tok::Import => self.err("imports must precede other declarations"),
            tok => self.err(format!("expected declaration, found {tok}")),
        }
    }

    fn gen_decl(&mut self, kw: DeclKw) -> PResult<DeclId> {
        let pos = self.bump()?.pos;
        let mut specs = Vec::new();
        let grouped = self.eat(Tok::LParen)?;
        if grouped {
            while !self.at(Tok::RParen) {
                specs.push(self.spec(kw)?);
                self.expect_semi()?;
            }
            self.expect(Tok::RParen)?;
        } else {
            specs.push(self.spec(kw)?);
        }
        Ok(self.arena.decl(DeclKind::Gen { kw, specs, grouped }, pos))
    }

    fn spec(&mut self, kw: DeclKw) -> PResult<SpecId> {
        let pos = self.cur.pos;
        let kind = match kw {
            DeclKw::Import => {
                let name = if self.at(Tok::Ident) {
                    Some(self.ident()?)
                } else {
                    None
                };
                let lexed = self.expect(Tok::Str)?;
                let path = self.arena.expr(
                    ExprKind::Lit {
                        kind: LitKind::Str,
                        text: lexed.lit,
                    },
                    lexed.pos,
                );
                SpecKind::Import { name, path }
            }
            DeclKw::Type => {
                let name = self.ident()?;
                self.eat(Tok::Assign)?; // type alias
                let ty = self.type_expr()?;
                SpecKind::Type { name, ty }
            }
            DeclKw::Var | DeclKw::Const => {
                let mut names = vec![self.ident()?];
                while self.eat(Tok::Comma)? {
                    names.push(self.ident()?);
                }
                let ty = if !matches!(self.cur.tok, Tok::Assign | Tok::Semi | Tok::RParen | Tok::RBrace | Tok::Eof)
                {
                    Some(self.type_expr()?)
                } else {
                    None
                };
                let values = if self.eat(Tok::Assign)? {
                    self.expr_list()?
                } else {
                    Vec::new()
                };
                SpecKind::Value { names, ty, values }
            }
        };
        Ok(self.arena.spec(kind, pos))
    }

    fn func_decl(&mut self) -> PResult<DeclId> {
        let pos = self.expect(Tok::Func)?.pos;
        let recv = if self.at(Tok::LParen) {
            Some(self.receiver()?)
        } else {
            None
        };
        let name = self.ident()?;
        let sig = self.signature()?;
        let body = if self.at(Tok::LBrace) {
            Some(self.block()?)
        } else {
            None
        };
        Ok(self.arena.decl(
            DeclKind::Func {
                name,
                recv,
                sig,
                body,
            },
            pos,
        ))
    }

    fn receiver(&mut self) -> PResult<Field> {
        self.expect(Tok::LParen)?;
        let first = self.type_expr()?;
        let field = if self.at(Tok::RParen) {
            Field {
                names: Vec::new(),
                ty: first,
            }
        } else {
            let ty = self.type_expr()?;
            Field {
                names: vec![first],
                ty,
            }
        };
        self.expect(Tok::RParen)?;
        Ok(field)
    }

    fn signature(&mut self) -> PResult<FuncSig> {
        self.expect(Tok::LParen)?;
        let params = self.field_list(Tok::RParen)?;
        self.expect(Tok::RParen)?;
        let results = if self.at(Tok::LParen) {
            self.bump()?;
            let fields = self.field_list(Tok::RParen)?;
            self.expect(Tok::RParen)?;
            fields
        } else if self.starts_type() {
            let ty = self.type_expr()?;
            vec![Field {
                names: Vec::new(),
                ty,
            }]
        } else {
            Vec::new()
        };
        Ok(FuncSig { params, results })
    }

    /// Parses `a, b T, c U` / `T, U` style field lists.  Entries are read as
    /// type expressions; a run of comma-separated entries followed by a type
    /// turns out to have been names.
    fn field_list(&mut self, end: Tok) -> PResult<Vec<Field>> {
        let mut fields = Vec::new();
        let mut pending: Vec<ExprId> = Vec::new();
        while !self.at(end) {
            let item = self.type_expr()?;
            if self.at(Tok::Comma) {
                self.bump()?;
                pending.push(item);
                continue;
            }
            if self.at(end) || self.at(Tok::Semi) {
                pending.push(item);
                break;
            }
            let ty = self.type_expr()?;
            pending.push(item);
            fields.push(Field {
                names: std::mem::take(&mut pending),
                ty,
            });
            if !self.eat(Tok::Comma)? {
                break;
            }
        }
        for ty in pending {
            fields.push(Field {
                names: Vec::new(),
                ty,
            });
        }
        Ok(fields)
    }

    fn starts_type(&self) -> bool {
        matches!(
            self.cur.tok,
            Tok::Ident
                | Tok::LBrack
                | Tok::Mul
                | Tok::Map
                | Tok::Chan
                | Tok::Arrow
                | Tok::Struct
                | Tok::Interface
                | Tok::Func
                | Tok::LParen
                | Tok::Ellipsis
        )
    }

    fn type_expr(&mut self) -> PResult<ExprId> {
        let pos = self.cur.pos;
        match self.cur.tok {
            Tok::Ident => {
                let mut e = self.ident()?;
                if self.at(Tok::Dot) {
                    self.bump()?;
                    let sel = self.ident()?;
                    e = self.arena.expr(ExprKind::Selector { expr: e, sel }, pos);
                }
                Ok(e)
            }
            Tok::Mul => {
                self.bump()?;
                let inner = self.type_expr()?;
                Ok(self.arena.expr(ExprKind::Star(inner), pos))
            }
            Tok::LBrack => {
                self.bump()?;
                let len = if self.at(Tok::RBrack) {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.expect(Tok::RBrack)?;
                let elem = self.type_expr()?;
                Ok(self.arena.expr(ExprKind::ArrayType { len, elem }, pos))
            }
            Tok::Map => {
                self.bump()?;
                self.expect(Tok::LBrack)?;
                let key = self.type_expr()?;
                self.expect(Tok::RBrack)?;
                let value = self.type_expr()?;
                Ok(self.arena.expr(ExprKind::MapType { key, value }, pos))
            }
            Tok::Chan => {
                self.bump()?;
                let dir = if self.eat(Tok::Arrow)? {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                let elem = self.type_expr()?;
                Ok(self.arena.expr(ExprKind::ChanType { dir, elem }, pos))
            }
            Tok::Arrow => {
                self.bump()?;
                self.expect(Tok::Chan)?;
                let elem = self.type_expr()?;
                Ok(self.arena.expr(
                    ExprKind::ChanType {
                        dir: ChanDir::Recv,
                        elem,
                    },
                    pos,
                ))
            }
            Tok::Struct => {
                self.bump()?;
                self.expect(Tok::LBrace)?;
                let mut fields = Vec::new();
                while !self.at(Tok::RBrace) {
                    fields.push(self.struct_field()?);
                    self.expect_semi()?;
                }
                self.expect(Tok::RBrace)?;
                Ok(self.arena.expr(ExprKind::StructType { fields }, pos))
            }
            Tok::Interface => {
                self.bump()?;
                self.expect(Tok::LBrace)?;
                if !self.at(Tok::RBrace) {
                    return self.err("only the empty interface is supported");
                }
                self.expect(Tok::RBrace)?;
                Ok(self.arena.expr(ExprKind::InterfaceType, pos))
            }
            Tok::Func => {
                self.bump()?;
                let sig = self.signature()?;
                Ok(self.arena.expr(ExprKind::FuncType(sig), pos))
            }
            Tok::LParen => {
                self.bump()?;
                let inner = self.type_expr()?;
                self.expect(Tok::RParen)?;
                Ok(self.arena.expr(ExprKind::Paren(inner), pos))
            }
            Tok::Ellipsis => {
                self.bump()?;
                let elem = if self.starts_type() {
                    Some(self.type_expr()?)
                } else {
                    None
                };
                Ok(self.arena.expr(ExprKind::Ellipsis(elem), pos))
            }
            tok => self.err(format!("expected type, found {tok}")),
        }
    }

    fn struct_field(&mut self) -> PResult<Field> {
        let first = self.type_expr()?;
        if matches!(self.cur.tok, Tok::Semi | Tok::RBrace) {
            // Embedded field.
            return Ok(Field {
                names: Vec::new(),
                ty: first,
            });
        }
        let mut names = vec![first];
        while self.eat(Tok::Comma)? {
            names.push(self.ident()?);
        }
        let ty = self.type_expr()?;
        Ok(Field { names, ty })
    }

    // ----- statements -----

    fn block(&mut self) -> PResult<StmtId> {
        let pos = self.expect(Tok::LBrace)?.pos;
        let stmts = self.stmt_list()?;
        self.expect(Tok::RBrace)?;
        Ok(self.arena.stmt(StmtKind::Block(stmts), pos))
    }

    fn stmt_list(&mut self) -> PResult<Vec<StmtId>> {
        let mut stmts = Vec::new();
        while !matches!(self.cur.tok, Tok::RBrace | Tok::Case | Tok::Default | Tok::Eof) {
            stmts.push(self.stmt()?);
        }
        Ok(stmts)
    }

    fn stmt(&mut self) -> PResult<StmtId> {
        let pos = self.cur.pos;
        match self.cur.tok {
            Tok::Var | Tok::Const | Tok::Type => {
                let kw = match self.cur.tok {
                    Tok::Var => DeclKw::Var,
                    Tok::Const => DeclKw::Const,
                    _ => DeclKw::Type,
                };
                let decl = self.gen_decl(kw)?;
                self.expect_semi()?;
                Ok(self.arena.stmt(StmtKind::Decl(decl), pos))
            }
            Tok::LBrace => {
                let block = self.block()?;
                self.expect_semi()?;
                Ok(block)
            }
            Tok::If => self.if_stmt(),
            Tok::Switch => self.switch_stmt(),
            Tok::Select => self.select_stmt(),
            Tok::For => self.for_stmt(),
            Tok::Return => {
                self.bump()?;
                let results = if matches!(self.cur.tok, Tok::Semi | Tok::RBrace) {
                    Vec::new()
                } else {
                    self.expr_list()?
                };
                self.expect_semi()?;
                Ok(self.arena.stmt(StmtKind::Return(results), pos))
            }
            Tok::Break | Tok::Continue | Tok::Fallthrough => {
                let kind = match self.cur.tok {
                    Tok::Break => BranchKind::Break,
                    Tok::Continue => BranchKind::Continue,
                    _ => BranchKind::Fallthrough,
                };
                self.bump()?;
                if self.at(Tok::Ident) {
                    return self.err("labels are not supported");
                }
                self.expect_semi()?;
                Ok(self.arena.stmt(StmtKind::Branch(kind), pos))
            }
            Tok::Defer => {
                self.bump()?;
                let call = self.expr()?;
                self.expect_semi()?;
                Ok(self.arena.stmt(StmtKind::Defer(call), pos))
            }
            Tok::Go => {
                self.bump()?;
                let call = self.expr()?;
                self.expect_semi()?;
                Ok(self.arena.stmt(StmtKind::Go(call), pos))
            }
            Tok::Semi => {
                self.bump()?;
                Ok(self.arena.stmt(StmtKind::Empty, pos))
            }
            _ => {
                let stmt = match self.simple_stmt(false)? {
                    Simple::Stmt(s) => s,
                    Simple::Range { .. } => unreachable!("range outside for"),
                };
                self.expect_semi()?;
                Ok(stmt)
            }
        }
    }

    /// Parses a simple statement: expression, send, inc/dec or assignment.
    /// With `in_for`, a `range` right-hand side is legal and reported
    /// separately for the enclosing `for` to assemble.
    fn simple_stmt(&mut self, in_for: bool) -> PResult<Simple> {
        let pos = self.cur.pos;
        let lhs = self.expr_list()?;
        match self.cur.tok {
            Tok::Define
            | Tok::Assign
            | Tok::AddAssign
            | Tok::SubAssign
            | Tok::MulAssign
            | Tok::QuoAssign
            | Tok::RemAssign
            | Tok::AndAssign
            | Tok::OrAssign
            | Tok::XorAssign
            | Tok::AndNotAssign
            | Tok::ShlAssign
            | Tok::ShrAssign => {
                let op = match self.cur.tok {
                    Tok::Define => AssignOp::Define,
                    Tok::Assign => AssignOp::Assign,
                    Tok::AddAssign => AssignOp::Add,
                    Tok::SubAssign => AssignOp::Sub,
                    Tok::MulAssign => AssignOp::Mul,
                    Tok::QuoAssign => AssignOp::Quo,
                    Tok::RemAssign => AssignOp::Rem,
                    Tok::AndAssign => AssignOp::And,
                    Tok::OrAssign => AssignOp::Or,
                    Tok::XorAssign => AssignOp::Xor,
                    Tok::AndNotAssign => AssignOp::AndNot,
                    Tok::ShlAssign => AssignOp::Shl,
                    _ => AssignOp::Shr,
                };
                self.bump()?;
                if in_for && self.at(Tok::Range) {
                    self.bump()?;
                    let expr = self.expr()?;
                    let mut it = lhs.into_iter();
                    return Ok(Simple::Range {
                        key: it.next(),
                        value: it.next(),
                        define: op == AssignOp::Define,
                        expr,
                    });
                }
                let rhs = self.expr_list()?;
                Ok(Simple::Stmt(
                    self.arena.stmt(StmtKind::Assign { lhs, op, rhs }, pos),
                ))
            }
            Tok::Arrow if lhs.len() == 1 => {
                self.bump()?;
                let value = self.expr()?;
                Ok(Simple::Stmt(self.arena.stmt(
                    StmtKind::Send {
                        chan: lhs[0],
                        value,
                    },
                    pos,
                )))
            }
            Tok::Inc | Tok::Dec if lhs.len() == 1 => {
                let inc = self.at(Tok::Inc);
                self.bump()?;
                Ok(Simple::Stmt(
                    self.arena.stmt(StmtKind::IncDec { expr: lhs[0], inc }, pos),
                ))
            }
            _ if lhs.len() == 1 => Ok(Simple::Stmt(self.arena.stmt(StmtKind::Expr(lhs[0]), pos))),
            tok => self.err(format!("expected assignment, found {tok}")),
        }
    }

    fn if_stmt(&mut self) -> PResult<StmtId> {
        let pos = self.expect(Tok::If)?.pos;
        let saved = std::mem::replace(&mut self.allow_composite, false);
        let mut init = None;
        let first = match self.simple_stmt(false)? {
            Simple::Stmt(s) => s,
            Simple::Range { .. } => unreachable!(),
        };
        let cond_stmt = if self.at(Tok::Semi) {
            self.bump()?;
            init = Some(first);
            match self.simple_stmt(false)? {
                Simple::Stmt(s) => s,
                Simple::Range { .. } => unreachable!(),
            }
        } else {
            first
        };
        let cond = self.cond_of(cond_stmt)?;
        self.allow_composite = saved;
        let body = self.block()?;
        let els = if self.eat(Tok::Else)? {
            if self.at(Tok::If) {
                Some(self.if_stmt()?)
            } else {
                let b = self.block()?;
                self.expect_semi()?;
                Some(b)
            }
        } else {
            self.expect_semi()?;
            None
        };
        Ok(self.arena.stmt(
            StmtKind::If {
                init,
                cond,
                body,
                els,
            },
            pos,
        ))
    }

    fn cond_of(&mut self, stmt: StmtId) -> PResult<ExprId> {
        match self.arena.stmts[stmt].kind {
            StmtKind::Expr(e) => Ok(e),
            _ => self.err("expected condition expression"),
        }
    }

    fn switch_stmt(&mut self) -> PResult<StmtId> {
        let pos = self.expect(Tok::Switch)?.pos;
        let saved = std::mem::replace(&mut self.allow_composite, false);
        let mut init = None;
        let mut tag = None;
        if !self.at(Tok::LBrace) {
            let first = match self.simple_stmt(false)? {
                Simple::Stmt(s) => s,
                Simple::Range { .. } => unreachable!(),
            };
            if self.at(Tok::Semi) {
                self.bump()?;
                init = Some(first);
                if !self.at(Tok::LBrace) {
                    tag = Some(self.expr()?);
                }
            } else {
                tag = Some(self.cond_of(first)?);
            }
        }
        self.allow_composite = saved;
        self.expect(Tok::LBrace)?;
        let mut cases = Vec::new();
        while !self.at(Tok::RBrace) {
            let cpos = self.cur.pos;
            let exprs = if self.eat(Tok::Case)? {
                self.expr_list()?
            } else {
                self.expect(Tok::Default)?;
                Vec::new()
            };
            self.expect(Tok::Colon)?;
            let body = self.stmt_list()?;
            cases.push(CaseClause {
                exprs,
                body,
                pos: cpos,
            });
        }
        self.expect(Tok::RBrace)?;
        self.expect_semi()?;
        Ok(self.arena.stmt(StmtKind::Switch { init, tag, cases }, pos))
    }

    fn select_stmt(&mut self) -> PResult<StmtId> {
        let pos = self.expect(Tok::Select)?.pos;
        self.expect(Tok::LBrace)?;
        let mut cases = Vec::new();
        while !self.at(Tok::RBrace) {
            let cpos = self.cur.pos;
            let comm = if self.eat(Tok::Case)? {
                match self.simple_stmt(false)? {
                    Simple::Stmt(s) => Some(s),
                    Simple::Range { .. } => unreachable!(),
                }
            } else {
                self.expect(Tok::Default)?;
                None
            };
            self.expect(Tok::Colon)?;
            let body = self.stmt_list()?;
            cases.push(CommClause {
                comm,
                body,
                pos: cpos,
            });
        }
        self.expect(Tok::RBrace)?;
        self.expect_semi()?;
        Ok(self.arena.stmt(StmtKind::Select { cases }, pos))
    }

    fn for_stmt(&mut self) -> PResult<StmtId> {
        let pos = self.expect(Tok::For)?.pos;
        let saved = std::mem::replace(&mut self.allow_composite, false);
        let mut init = None;
        let mut cond = None;
        let mut post = None;
        let mut range = None;
        if self.at(Tok::Range) {
            // `for range e`
            self.bump()?;
            let expr = self.expr()?;
            range = Some((None, None, false, expr));
        } else if !self.at(Tok::LBrace) {
            let first = if self.at(Tok::Semi) {
                None
            } else {
                match self.simple_stmt(true)? {
                    Simple::Stmt(s) => Some(s),
                    Simple::Range {
                        key,
                        value,
                        define,
                        expr,
                    } => {
                        range = Some((key, value, define, expr));
                        None
                    }
                }
            };
            if range.is_none() {
                if self.at(Tok::LBrace) {
                    // `for cond { ... }`
                    if let Some(s) = first {
                        cond = Some(self.cond_of(s)?);
                    }
                } else {
                    self.expect(Tok::Semi)?;
                    init = first;
                    if !self.at(Tok::Semi) {
                        cond = Some(self.expr()?);
                    }
                    self.expect(Tok::Semi)?;
                    if !self.at(Tok::LBrace) {
                        post = match self.simple_stmt(false)? {
                            Simple::Stmt(s) => Some(s),
                            Simple::Range { .. } => unreachable!(),
                        };
                    }
                }
            }
        }
        self.allow_composite = saved;
        let body = self.block()?;
        self.expect_semi()?;
        Ok(match range {
            Some((key, value, define, expr)) => self.arena.stmt(
                StmtKind::Range {
                    key,
                    value,
                    define,
                    expr,
                    body,
                },
                pos,
            ),
            None => self.arena.stmt(
                StmtKind::For {
                    init,
                    cond,
                    post,
                    body,
                },
                pos,
            ),
        })
    }

    // ----- expressions -----

    fn expr_list(&mut self) -> PResult<Vec<ExprId>> {
        let mut list = vec![self.expr()?];
        while self.eat(Tok::Comma)? {
            list.push(self.expr()?);
        }
        Ok(list)
    }

    fn expr(&mut self) -> PResult<ExprId> {
        self.binary_expr(1)
    }

    fn binary_expr(&mut self, min_prec: u8) -> PResult<ExprId> {
        let mut lhs = self.unary_expr()?;
        loop {
            let op = match self.cur.tok {
                Tok::LOr => BinOp::LOr,
                Tok::LAnd => BinOp::LAnd,
                Tok::Eql => BinOp::Eql,
                Tok::Neq => BinOp::Neq,
                Tok::Lss => BinOp::Lss,
                Tok::Leq => BinOp::Leq,
                Tok::Gtr => BinOp::Gtr,
                Tok::Geq => BinOp::Geq,
                Tok::Add => BinOp::Add,
                Tok::Sub => BinOp::Sub,
                Tok::Or => BinOp::Or,
                Tok::Xor => BinOp::Xor,
                Tok::Mul => BinOp::Mul,
                Tok::Quo => BinOp::Quo,
                Tok::Rem => BinOp::Rem,
                Tok::Shl => BinOp::Shl,
                Tok::Shr => BinOp::Shr,
                Tok::And => BinOp::And,
                Tok::AndNot => BinOp::AndNot,
                _ => break,
            };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            let pos = self.bump()?.pos;
            let rhs = self.binary_expr(prec + 1)?;
            lhs = self.arena.expr(ExprKind::Binary { op, lhs, rhs }, pos);
        }
        Ok(lhs)
    }

    fn unary_expr(&mut self) -> PResult<ExprId> {
        let pos = self.cur.pos;
        let op = match self.cur.tok {
            Tok::Add => Some(UnOp::Plus),
            Tok::Sub => Some(UnOp::Minus),
            Tok::Not => Some(UnOp::Not),
            Tok::Xor => Some(UnOp::Xor),
            Tok::And => Some(UnOp::Addr),
            Tok::Arrow => Some(UnOp::Recv),
            Tok::Mul => {
                self.bump()?;
                let inner = self.unary_expr()?;
                return Ok(self.arena.expr(ExprKind::Star(inner), pos));
            }
            _ => None,
        };
        if let Some(op) = op {
            self.bump()?;
            let expr = self.unary_expr()?;
            return Ok(self.arena.expr(ExprKind::Unary { op, expr }, pos));
        }
        self.primary_expr()
    }

    fn primary_expr(&mut self) -> PResult<ExprId> {
        let mut e = self.operand()?;
        loop {
            let pos = self.cur.pos;
            match self.cur.tok {
                Tok::Dot => {
                    self.bump()?;
                    let sel = self.ident()?;
                    e = self.arena.expr(ExprKind::Selector { expr: e, sel }, pos);
                }
                Tok::LParen => {
                    self.bump()?;
                    let saved = std::mem::replace(&mut self.allow_composite, true);
                    let mut args = Vec::new();
                    let mut spread = false;
                    while !self.at(Tok::RParen) {
                        args.push(self.expr()?);
                        if self.eat(Tok::Ellipsis)? {
                            spread = true;
                        }
                        if !self.eat(Tok::Comma)? {
                            break;
                        }
                    }
                    self.allow_composite = saved;
                    self.expect(Tok::RParen)?;
                    e = self.arena.expr(
                        ExprKind::Call {
                            func: e,
                            args,
                            spread,
                        },
                        pos,
                    );
                }
                Tok::LBrack => {
                    self.bump()?;
                    let saved = std::mem::replace(&mut self.allow_composite, true);
                    let low = if matches!(self.cur.tok, Tok::Colon) {
                        None
                    } else {
                        Some(self.expr()?)
                    };
                    if self.eat(Tok::Colon)? {
                        let high = if matches!(self.cur.tok, Tok::Colon | Tok::RBrack) {
                            None
                        } else {
                            Some(self.expr()?)
                        };
                        let (max, three) = if self.eat(Tok::Colon)? {
                            (Some(self.expr()?), true)
                        } else {
                            (None, false)
                        };
                        self.allow_composite = saved;
                        self.expect(Tok::RBrack)?;
                        e = self.arena.expr(
                            ExprKind::Slice {
                                expr: e,
                                low,
                                high,
                                max,
                                three,
                            },
                            pos,
                        );
                    } else {
                        self.allow_composite = saved;
                        self.expect(Tok::RBrack)?;
                        let Some(index) = low else {
                            return self.err("expected index expression");
                        };
                        e = self.arena.expr(ExprKind::Index { expr: e, index }, pos);
                    }
                }
                Tok::LBrace if self.allow_composite && self.is_composite_type(e) => {
                    e = self.composite_lit(Some(e), pos)?;
                }
                _ => return Ok(e),
            }
        }
    }

    fn is_composite_type(&self, e: ExprId) -> bool {
        matches!(
            self.arena.exprs[e].kind,
            ExprKind::Ident(_)
                | ExprKind::Selector { .. }
                | ExprKind::ArrayType { .. }
                | ExprKind::MapType { .. }
                | ExprKind::StructType { .. }
        )
    }

    fn composite_lit(&mut self, ty: Option<ExprId>, pos: Pos) -> PResult<ExprId> {
        self.expect(Tok::LBrace)?;
        let saved = std::mem::replace(&mut self.allow_composite, true);
        let mut elems = Vec::new();
        while !self.at(Tok::RBrace) {
            let epos = self.cur.pos;
            let mut e = if self.at(Tok::LBrace) {
                // Untyped nested literal.
                self.composite_lit(None, epos)?
            } else {
                self.expr()?
            };
            if self.eat(Tok::Colon)? {
                let value = if self.at(Tok::LBrace) {
                    let vpos = self.cur.pos;
                    self.composite_lit(None, vpos)?
                } else {
                    self.expr()?
                };
                e = self.arena.expr(ExprKind::KeyValue { key: e, value }, epos);
            }
            elems.push(e);
            if !self.eat(Tok::Comma)? {
                break;
            }
        }
        self.allow_composite = saved;
        self.expect(Tok::RBrace)?;
        Ok(self.arena.expr(ExprKind::Composite { ty, elems }, pos))
    }

    fn operand(&mut self) -> PResult<ExprId> {
        let pos = self.cur.pos;
        match self.cur.tok {
            Tok::Ident => self.ident(),
            Tok::Int => self.lit(LitKind::Int),
            Tok::Float => self.lit(LitKind::Float),
            Tok::Char => self.lit(LitKind::Char),
            Tok::Str => self.lit(LitKind::Str),
            Tok::LParen => {
                self.bump()?;
                let saved = std::mem::replace(&mut self.allow_composite, true);
                let inner = self.expr()?;
                self.allow_composite = saved;
                self.expect(Tok::RParen)?;
                Ok(self.arena.expr(ExprKind::Paren(inner), pos))
            }
            Tok::Func => {
                self.bump()?;
                let sig = self.signature()?;
                if self.at(Tok::LBrace) {
                    let saved = std::mem::replace(&mut self.allow_composite, true);
                    let body = self.block()?;
                    self.allow_composite = saved;
                    Ok(self.arena.expr(ExprKind::FuncLit { sig, body }, pos))
                } else {
                    Ok(self.arena.expr(ExprKind::FuncType(sig), pos))
                }
            }
            Tok::LBrack | Tok::Map | Tok::Chan | Tok::Struct | Tok::Interface => self.type_expr(),
            tok => self.err(format!("expected expression, found {tok}")),
        }
    }

    fn lit(&mut self, kind: LitKind) -> PResult<ExprId> {
        let lexed = self.bump()?;
        Ok(self.arena.expr(
            ExprKind::Lit {
                kind,
                text: lexed.lit,
            },
            lexed.pos,
        ))
    }
}

enum Simple {
    Stmt(StmtId),
    Range {
        key: Option<ExprId>,
        value: Option<ExprId>,
        define: bool,
        expr: ExprId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_src(src: &str) -> (Arena, File) {
        let mut arena = Arena::new();
        let file = parse_file(&mut arena, Path::new("main.go"), src).expect("parse");
        (arena, file)
    }

    #[test]
    fn hello() {
        let (arena, file) = parse_src(
            "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"hi\")\n}\n",
        );
        assert_eq!(file.package, "main");
        assert_eq!(file.decls.len(), 2);
        let main = &arena.decls[file.decls[1]];
        assert!(matches!(main.kind, DeclKind::Func { .. }));
    }

    #[test]
    fn composite_suppressed_in_headers() {
        // `x == y` must not swallow the body brace as a composite literal,
        // while composite literals stay available in ordinary positions.
        let (arena, file) = parse_src(
            "package p\n\nfunc f(x, y int) {\n\tif x == y {\n\t\treturn\n\t}\n\tv := []int{1, 2}\n\t_ = v\n}\n",
        );
        let DeclKind::Func { body, .. } = &arena.decls[file.decls[0]].kind else {
            panic!("expected func");
        };
        let StmtKind::Block(stmts) = &arena.stmts[body.unwrap()].kind else {
            panic!("expected block");
        };
        assert!(matches!(arena.stmts[stmts[0]].kind, StmtKind::If { .. }));
        assert!(matches!(arena.stmts[stmts[1]].kind, StmtKind::Assign { op: AssignOp::Define, .. }));
    }

    #[test]
    fn for_range_forms() {
        let (arena, file) = parse_src(
            "package p\n\nfunc f(a []int) {\n\tfor i, v := range a {\n\t\t_ = i\n\t\t_ = v\n\t}\n\tfor range a {\n\t}\n\tfor i := 0; i < 10; i++ {\n\t}\n\tfor {\n\t\tbreak\n\t}\n}\n",
        );
        let DeclKind::Func { body, .. } = &arena.decls[file.decls[0]].kind else {
            panic!("expected func");
        };
        let StmtKind::Block(stmts) = &arena.stmts[body.unwrap()].kind else {
            panic!("expected block");
        };
        assert!(matches!(arena.stmts[stmts[0]].kind, StmtKind::Range { define: true, .. }));
        assert!(matches!(arena.stmts[stmts[1]].kind, StmtKind::Range { define: false, .. }));
        assert!(matches!(arena.stmts[stmts[2]].kind, StmtKind::For { .. }));
        assert!(matches!(
            arena.stmts[stmts[3]].kind,
            StmtKind::For {
                init: None,
                cond: None,
                post: None,
                ..
            }
        ));
    }

    #[test]
    fn switch_and_select() {
        parse_src(
            "package p\n\nfunc f(x int, ch chan int) {\n\tswitch x {\n\tcase 1, 2:\n\t\tx++\n\tdefault:\n\t}\n\tselect {\n\tcase v := <-ch:\n\t\t_ = v\n\tcase ch <- x:\n\tdefault:\n\t}\n}\n",
        );
    }

    #[test]
    fn grouped_decls_and_methods() {
        let (arena, file) = parse_src(
            "package p\n\nvar (\n\ta, b = 1, 2\n\tc int\n)\n\ntype T struct {\n\tn int\n}\n\nfunc (t T) M() int {\n\treturn t.n\n}\n",
        );
        assert_eq!(file.decls.len(), 3);
        let DeclKind::Func { recv, .. } = &arena.decls[file.decls[2]].kind else {
            panic!("expected method");
        };
        assert!(recv.is_some());
    }

    #[test]
    fn three_index_slice() {
        let (arena, file) = parse_src("package p\n\nfunc f(a []int) []int {\n\treturn a[1:2:3]\n}\n");
        let DeclKind::Func { body, .. } = &arena.decls[file.decls[0]].kind else {
            panic!()
        };
        let StmtKind::Block(stmts) = &arena.stmts[body.unwrap()].kind else {
            panic!()
        };
        let StmtKind::Return(results) = &arena.stmts[stmts[0]].kind else {
            panic!()
        };
        assert!(matches!(
            arena.exprs[results[0]].kind,
            ExprKind::Slice { three: true, .. }
        ));
    }

    #[test]
    fn unsupported_syntax_is_a_parse_error() {
        let mut arena = Arena::new();
        let err = parse_file(
            &mut arena,
            Path::new("main.go"),
            "package p\n\nfunc f(x interface{ M() }) {\n}\n",
        );
        assert!(err.is_err());
    }
}
