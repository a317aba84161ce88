//! Command-line surface for the reducer.

use anyhow::{Context, Result};
use clap::Parser;
use goshrink_reduce::{Options, Reducer};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "goshrink",
    version,
    about = "Reduce a program to the smallest form that still triggers a diagnostic",
    after_help = "The predicate command runs with the scratch directory as its working \
                  directory; a candidate is kept when the command's combined output matches \
                  the --match pattern.  Without --cmd the package is run (with an entry \
                  point) or built."
)]
struct Cli {
    /// Regular expression the predicate output must match
    #[arg(long = "match", value_name = "REGEX", required = true)]
    pattern: String,

    /// Shell snippet to use as the predicate
    #[arg(long, value_name = "SNIPPET")]
    cmd: Option<String>,

    /// Interpreter command line the snippet is passed to
    #[arg(long, value_name = "CMDLINE", default_value = "sh -c")]
    shell: String,

    /// Log each accepted reduction step
    #[arg(short, long)]
    verbose: bool,

    /// Keep the scratch directory around for a postmortem
    #[arg(long)]
    keep_tmp: bool,

    /// Directory containing exactly one package of source files
    dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let pattern = regex::bytes::Regex::new(&cli.pattern)
        .with_context(|| format!("invalid --match pattern {:?}", cli.pattern))?;
    let opts = Options {
        keep_tmp: cli.keep_tmp,
    };
    let mut reducer = Reducer::new(&cli.dir, pattern, cli.cmd.as_deref(), &cli.shell, &opts)
        .with_context(|| format!("setting up reduction of {}", cli.dir.display()))?;
    reducer.run()?;
    Ok(())
}
