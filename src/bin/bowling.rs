use anyhow::{bail, Context, Result};
use bowling_score::CLIArgs;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .init();

    let args = CLIArgs::parse();
    let Some(input_path) = args.input_path else {
        return Ok(());
    };

    let results = bowling_score::score_file(&input_path).with_context(|| {
        format!("Could not read the score file({}).", input_path.display())
    })?;
    bowling_score::print_scores(&results).context("Failed to print the game scores.")?;

    let malformed_n = results.iter().filter(|r| r.score.is_err()).count();
    if malformed_n > 0 {
        bail!(
            "{} of {} game(s) in given file({}) have malformed notation.",
            malformed_n,
            results.len(),
            input_path.display()
        );
    }

    Ok(())
}
