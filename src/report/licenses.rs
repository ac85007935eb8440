use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use anyhow::{Context, Result};

use crate::api::revisions::Revision;
use crate::locator::Locator;
use crate::normalize::SourceUnit;

/// Built-in notice; `this` is a map from license id to revisions.
pub const DEFAULT_TEMPLATE: &str = r#"# 3rd-Party Software License Notice
Generated by deplocatr.
This software includes the following software and licenses:
{{#each this}}
========================================================================
{{@key}}
========================================================================
The following software have components provided under the terms of this license:
{{#each this}}
- {{#if project}}{{project.title}} (from {{project.url}}){{else}}{{locator}}{{/if}}
{{/each}}
{{/each}}
"#;

/// Dependency locators to look up, sorted and deduplicated across units.
/// Unresolved locators are only included with `include_unknown`.
pub fn lookup_locators(units: &[SourceUnit], include_unknown: bool) -> Vec<Locator> {
    let locators: BTreeSet<Locator> = units
        .iter()
        .flat_map(|u| u.build.dependencies.iter())
        .map(|d| d.locator.clone())
        .filter(|l| include_unknown || l.is_resolved())
        .collect();
    locators.into_iter().collect()
}

/// Group revisions by license id, sorted by id. A revision appears once per
/// license it carries; revisions without licenses are left out.
pub fn group_by_license(revisions: &[Revision]) -> BTreeMap<String, Vec<Revision>> {
    let mut groups: BTreeMap<String, Vec<Revision>> = BTreeMap::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();

    for rev in revisions {
        for license in &rev.licenses {
            if seen.insert((license.license_id.as_str(), rev.locator.as_str())) {
                groups
                    .entry(license.license_id.clone())
                    .or_default()
                    .push(rev.clone());
            }
        }
    }
    groups
}

/// Render the notice with the built-in template or the one at `template`.
pub fn render(groups: &BTreeMap<String, Vec<Revision>>, template: Option<&Path>) -> Result<String> {
    match template {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("could not read template {}", path.display()))?;
            super::render(&source, groups)
        }
        None => super::render(DEFAULT_TEMPLATE, groups),
    }
}
