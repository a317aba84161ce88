//! The predicate seam and the scratch directory.
//!
//! `Oracle` is what the candidate driver calls for every proposed program:
//! run something against the scratch directory, return the combined output
//! bytes.  Production uses `ShellOracle`; tests plug in closures that
//! inspect the scratch files in-process.

use crate::error::Error;
use std::fs;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub trait Oracle {
    /// Runs the predicate with `dir` as its working directory and returns
    /// stdout followed by stderr.  Must not return before the predicate is
    /// done.
    fn run(&mut self, dir: &Path) -> io::Result<Vec<u8>>;
}

/// Adapts a closure into an `Oracle`; the in-process predicates tests use.
pub struct FnOracle<F>(F);

impl<F> FnOracle<F>
where
    F: FnMut(&Path) -> io::Result<Vec<u8>>,
{
    pub fn new(f: F) -> FnOracle<F> {
        FnOracle(f)
    }
}

impl<F> Oracle for FnOracle<F>
where
    F: FnMut(&Path) -> io::Result<Vec<u8>>,
{
    fn run(&mut self, dir: &Path) -> io::Result<Vec<u8>> {
        (self.0)(dir)
    }
}

/// Runs a user-supplied shell snippet, e.g. `sh -c 'go build . 2>&1'`.
pub struct ShellOracle {
    argv: Vec<String>,
}

impl ShellOracle {
    /// `shell` is the interpreter command line (split like a shell would);
    /// the snippet is appended as its final argument.
    pub fn new(shell: &str, snippet: &str) -> Result<ShellOracle, Error> {
        let mut argv = shlex::split(shell)
            .filter(|argv| !argv.is_empty())
            .ok_or_else(|| Error::Shell(shell.to_string()))?;
        argv.push(snippet.to_string());
        Ok(ShellOracle { argv })
    }
}

impl Oracle for ShellOracle {
    fn run(&mut self, dir: &Path) -> io::Result<Vec<u8>> {
        let out = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .current_dir(dir)
            .output()?;
        let mut bytes = out.stdout;
        bytes.extend_from_slice(&out.stderr);
        Ok(bytes)
    }
}

/// The scratch directory: one temp file per source file, created once and
/// rewritten in place per candidate.  Deleted on drop unless leaked for a
/// postmortem.
pub struct Scratch {
    // None once leaked via `keep_tmp`.
    guard: Option<TempDir>,
    path: PathBuf,
    files: Vec<fs::File>,
}

impl Scratch {
    pub fn new(names: &[&Path], keep_tmp: bool) -> io::Result<Scratch> {
        let dir = tempfile::Builder::new().prefix("goshrink-").tempdir()?;
        let (guard, path) = if keep_tmp {
            let path = dir.into_path();
            (None, path)
        } else {
            let path = dir.path().to_path_buf();
            (Some(dir), path)
        };
        let mut files = Vec::with_capacity(names.len());
        for name in names {
            let base = name.file_name().unwrap_or_else(|| name.as_os_str());
            files.push(fs::File::create(path.join(base))?);
        }
        Ok(Scratch { guard, path, files })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kept(&self) -> bool {
        self.guard.is_none()
    }

    /// Truncate-and-rewrite from offset 0.
    pub fn rewrite(&mut self, index: usize, text: &str) -> io::Result<()> {
        let file = &mut self.files[index];
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_oracle_combines_output() {
        let mut oracle = ShellOracle::new("sh -c", "echo out; echo err 1>&2").unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let bytes = oracle.run(tmp.path()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("out"));
        assert!(text.contains("err"));
    }

    #[test]
    fn shell_oracle_runs_in_dir() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("probe.txt"), "marker").unwrap();
        let mut oracle = ShellOracle::new("sh -c", "cat probe.txt").unwrap();
        let bytes = oracle.run(tmp.path()).unwrap();
        assert_eq!(bytes, b"marker");
    }

    #[test]
    fn rewrite_truncates() {
        let mut scratch = Scratch::new(&[Path::new("main.go")], false).unwrap();
        scratch.rewrite(0, "longer first contents").unwrap();
        scratch.rewrite(0, "short").unwrap();
        let read = fs::read_to_string(scratch.path().join("main.go")).unwrap();
        assert_eq!(read, "short");
    }

    #[test]
    fn empty_shell_is_rejected() {
        assert!(ShellOracle::new("", "true").is_err());
    }
}
