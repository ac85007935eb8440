use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::normalize::SourceUnit;

/// Print a per-module summary of the analysis to stderr.
pub fn render(units: &[SourceUnit], quiet: bool) {
    if quiet {
        return;
    }

    let total: usize = units.iter().map(|u| u.build.dependencies.len()).sum();
    let unresolved: usize = units.iter().map(SourceUnit::unresolved).sum();

    eprintln!(
        "\n {} v{}",
        "deplocatr".bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{}", table(units));
    let unresolved = if unresolved > 0 {
        unresolved.to_string().yellow()
    } else {
        unresolved.to_string().green()
    };
    eprintln!(
        " Modules: {}  Dependencies: {}  Unresolved: {}\n",
        units.len(),
        total,
        unresolved
    );
}

fn table(units: &[SourceUnit]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Module").add_attribute(Attribute::Bold),
            Cell::new("Type").add_attribute(Attribute::Bold),
            Cell::new("Locator").add_attribute(Attribute::Bold),
            Cell::new("Direct").add_attribute(Attribute::Bold),
            Cell::new("Total").add_attribute(Attribute::Bold),
            Cell::new("Unresolved").add_attribute(Attribute::Bold),
        ]);

    for unit in units {
        let unresolved = unit.unresolved();
        let unresolved_color = if unresolved > 0 {
            Color::Yellow
        } else {
            Color::Green
        };

        table.add_row(vec![
            Cell::new(&unit.name),
            Cell::new(&unit.kind),
            Cell::new(unit.locator.to_string()),
            Cell::new(unit.build.imports.len()).set_alignment(CellAlignment::Right),
            Cell::new(unit.build.dependencies.len()).set_alignment(CellAlignment::Right),
            Cell::new(unresolved)
                .fg(unresolved_color)
                .set_alignment(CellAlignment::Right),
        ]);
    }

    table
}
