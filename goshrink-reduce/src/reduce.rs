//! The reducer: setup, the outer fixed-point loop, and the candidate
//! driver that every rule funnels through.

use crate::driver::{Oracle, Scratch, ShellOracle};
use crate::error::Error;
use crate::mutate::DeleteUndo;
use crate::parents::Parents;
use crate::track::{self, RefTracker};
use goshrink_syntax::ast::{Arena, DeclKind, NodeRef, Package};
use goshrink_syntax::printer::{self, Mode};
use goshrink_syntax::resolve::{self, TypeInfo};
use goshrink_syntax::parser;
use log::{debug, info};
use regex::bytes::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Leak the scratch directory instead of deleting it on exit, for
    /// postmortems.
    pub keep_tmp: bool,
}

pub struct Reducer {
    pub(crate) arena: Arena,
    /// The working package, mutated in place.
    pub(crate) pkg: Package,
    /// Second parse of the same input; consulted only when reporting, never
    /// mutated.
    original: Package,
    /// Snapshot taken at the start of the current walk.  Rules must treat
    /// it as stale the moment they move anything.
    pub(crate) info: TypeInfo,
    pub(crate) refs: RefTracker,
    pub(crate) parents: Parents,
    /// Serialized texts already proposed, per file.
    tried: HashSet<(usize, String)>,
    /// Candidates attempted since the last accepted edit.
    tries: u32,
    pub(crate) did_change: bool,
    any_change: bool,
    pub(crate) cur_file: usize,
    buf: String,
    scratch: Scratch,
    oracle: Box<dyn Oracle>,
    pattern: Regex,
    /// Deferred fallbacks for the current proposal; see `mutate`.
    pub(crate) keep_underscore: Option<DeleteUndo>,
    pub(crate) keep_unchanged: Option<DeleteUndo>,
}

impl Reducer {
    /// Sets up a reduction with the shell predicate.  With no `cmd`, the
    /// default predicate runs the program when the package has an entry
    /// point and merely builds it otherwise.
    pub fn new(
        dir: &Path,
        pattern: Regex,
        cmd: Option<&str>,
        shell: &str,
        opts: &Options,
    ) -> Result<Reducer, Error> {
        let mut arena = Arena::new();
        let pkg = parser::parse_dir(&mut arena, dir)?;
        let snippet = match cmd {
            Some(cmd) => cmd.to_string(),
            None => default_predicate(&arena, &pkg).to_string(),
        };
        let oracle = ShellOracle::new(shell, &snippet)?;
        Reducer::build(arena, pkg, dir, pattern, Box::new(oracle), opts)
    }

    /// Sets up a reduction against a caller-provided predicate.  Tests use
    /// this to run hermetically.
    pub fn with_oracle(
        dir: &Path,
        pattern: Regex,
        oracle: Box<dyn Oracle>,
        opts: &Options,
    ) -> Result<Reducer, Error> {
        let mut arena = Arena::new();
        let pkg = parser::parse_dir(&mut arena, dir)?;
        Reducer::build(arena, pkg, dir, pattern, oracle, opts)
    }

    fn build(
        mut arena: Arena,
        pkg: Package,
        dir: &Path,
        pattern: Regex,
        oracle: Box<dyn Oracle>,
        opts: &Options,
    ) -> Result<Reducer, Error> {
        // Second parse: the immutable snapshot used for reporting.
        let original = parser::parse_dir(&mut arena, dir)?;
        let names: Vec<&Path> = pkg.files.iter().map(|f| f.path.as_path()).collect();
        let scratch = Scratch::new(&names, opts.keep_tmp).map_err(Error::Scratch)?;
        Ok(Reducer {
            arena,
            pkg,
            original,
            info: TypeInfo::default(),
            refs: RefTracker::default(),
            parents: Parents::new(),
            tried: HashSet::new(),
            tries: 0,
            did_change: false,
            any_change: false,
            cur_file: 0,
            buf: String::new(),
            scratch,
            oracle,
            pattern,
            keep_underscore: None,
            keep_unchanged: None,
        })
    }

    /// Runs the reduction to its fixed point and overwrites the inputs with
    /// the result.  Inputs are left untouched unless at least one edit was
    /// accepted.
    pub fn run(&mut self) -> Result<(), Error> {
        for i in 0..self.pkg.files.len() {
            self.buf.clear();
            printer::print_file(&self.arena, &self.pkg.files[i], Mode::Raw, &mut self.buf);
            self.scratch.rewrite(i, &self.buf).map_err(Error::Scratch)?;
            self.tried.insert((i, self.buf.clone()));
        }
        let out = self
            .oracle
            .run(self.scratch.path())
            .map_err(Error::Predicate)?;
        if out.is_empty() {
            return Err(Error::ExpectedError);
        }
        if !self.pattern.is_match(&out) {
            return Err(Error::ErrorMismatch);
        }

        loop {
            self.info = resolve::check(&self.arena, &self.pkg);
            for (pos, msg) in &self.info.errors {
                debug!("soft resolve error at {pos}: {msg}");
            }
            self.refs = track::build(&self.arena, &self.pkg, &self.info);
            self.parents.rebuild(&self.arena, &self.pkg.files);
            self.did_change = false;
            self.walk_package();
            if !self.did_change {
                break;
            }
        }

        if !self.any_change {
            return Err(Error::CouldNotReduce);
        }
        for file in &self.pkg.files {
            let text = printer::file_to_string(&self.arena, file, Mode::Formatted);
            fs::write(&file.path, text).map_err(|err| Error::WriteOutput {
                path: file.path.clone(),
                err,
            })?;
        }
        if self.scratch.kept() {
            info!("scratch directory kept at {}", self.scratch.path().display());
        }
        Ok(())
    }

    /// The three-step proposal cascade: primary edit, then
    /// keep-as-underscore, then keep-unchanged.  Whatever the outcome, both
    /// fallback slots are empty afterwards.
    pub(crate) fn attempt(&mut self, msg: &str, at: NodeRef) -> bool {
        if self.candidate(msg, at) {
            self.keep_underscore = None;
            self.keep_unchanged = None;
            return true;
        }
        if let Some(undo) = self.keep_underscore.take() {
            undo.apply_underscore(self);
            self.keep_unchanged = Some(undo);
            if self.candidate(msg, at) {
                self.keep_unchanged = None;
                return true;
            }
        }
        if let Some(undo) = self.keep_unchanged.take() {
            undo.apply_restore(self);
            if self.candidate(msg, at) {
                return true;
            }
        }
        false
    }

    /// Serializes the current file, dedups against the memo, rewrites the
    /// temp file and consults the predicate.  Any I/O failure is a
    /// rejection.
    fn candidate(&mut self, msg: &str, at: NodeRef) -> bool {
        self.buf.clear();
        printer::print_file(
            &self.arena,
            &self.pkg.files[self.cur_file],
            Mode::Raw,
            &mut self.buf,
        );
        if !self.tried.insert((self.cur_file, self.buf.clone())) {
            return false;
        }
        self.tries += 1;
        if self.scratch.rewrite(self.cur_file, &self.buf).is_err() {
            return false;
        }
        let Ok(out) = self.oracle.run(self.scratch.path()) else {
            return false;
        };
        if !self.pattern.is_match(&out) {
            debug!("candidate rejected ({msg}, try {})", self.tries);
            return false;
        }
        self.did_change = true;
        self.any_change = true;
        let pos = self.arena.node_pos(at);
        let path = &self.original.files[self.cur_file].path;
        info!("{}:{}: {} ({} tries)", path.display(), pos.line, msg, self.tries);
        self.tries = 0;
        true
    }
}

/// `go run` for programs, `go build` for everything else.
fn default_predicate(arena: &Arena, pkg: &Package) -> &'static str {
    let has_main = pkg.name == "main"
        && pkg.files.iter().any(|file| {
            file.decls.iter().any(|&d| match &arena.decls[d].kind {
                DeclKind::Func { name, recv, .. } => {
                    recv.is_none() && arena.ident_name(*name) == Some("main")
                }
                DeclKind::Gen { .. } => false,
            })
        });
    if has_main {
        "go run ."
    } else {
        "go build -o /dev/null ."
    }
}
