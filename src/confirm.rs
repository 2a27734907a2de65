use anyhow::{Context, Result};
use std::io::{BufRead, Write};

/// Asks a y/N question. End of input counts as no.
pub fn confirm(input: &mut impl BufRead, output: &mut impl Write, prompt: &str) -> Result<bool> {
    write!(output, "{} (y/N): ", prompt)?;
    output.flush()?;

    let mut response = String::new();
    let read = input
        .read_line(&mut response)
        .context("Failed to read confirmation")?;
    if read == 0 {
        // Keep whatever follows off the prompt line
        writeln!(output)?;
    }

    Ok(is_yes(&response))
}

fn is_yes(response: &str) -> bool {
    matches!(response.trim().to_lowercase().as_str(), "y" | "yes")
}
