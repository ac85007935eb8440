//! Output for analysis results.
//!
//! - [`write`]: JSON or a user handlebars template, to a file or stdout.
//! - [`terminal`]: per-module summary table on stderr.
//! - [`licenses`]: third-party license notice grouped by license.

pub mod licenses;
pub mod terminal;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;

/// Render `data` as pretty JSON, or through `template` when given, and write
/// it to `output` (`-` is stdout).
pub fn write<T: Serialize>(output: &str, template: Option<&Path>, data: &T) -> Result<()> {
    let rendered = match template {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("could not read template {}", path.display()))?;
            render(&source, data)?
        }
        None => serde_json::to_string_pretty(data)?,
    };
    emit(output, &rendered)
}

/// Render a handlebars template without HTML escaping.
pub fn render<T: Serialize>(template: &str, data: &T) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.register_template_string("report", template)?;
    Ok(handlebars.render("report", data)?)
}

/// Write `content` to the file at `output`, or stdout for `-`.
pub fn emit(output: &str, content: &str) -> Result<()> {
    if output == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(content.as_bytes())?;
        if !content.ends_with('\n') {
            stdout.write_all(b"\n")?;
        }
        return Ok(());
    }
    std::fs::write(output, content).with_context(|| format!("could not write {output}"))
}
