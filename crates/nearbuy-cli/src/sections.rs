//! Suggestion-section commands.
//!
//! Both commands validate the whole file before acting on it, so a bad
//! definition never leaves the database half-seeded.

use std::path::Path;

use anyhow::Context;
use nearbuy_core::{load_sections, SectionDefinition, SectionsFile};

/// One summary line per section: key, behaviour, title and item count.
pub(crate) fn summarize(section: &SectionDefinition) -> String {
    let state = if section.active { "" } else { " (inactive)" };
    let category = section
        .main_category
        .as_deref()
        .map_or_else(String::new, |c| format!(" [{c}]"));
    format!(
        "{:<24} {:<15} {}{category} - {} item(s){state}",
        section.key,
        section.kind,
        section.title,
        section.items.len()
    )
}

fn load(path: &Path) -> anyhow::Result<SectionsFile> {
    load_sections(path).with_context(|| format!("invalid sections file {}", path.display()))
}

/// Loads and validates `path`, printing a summary of each section.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or validated.
pub(crate) fn run_check_sections(path: &Path) -> anyhow::Result<()> {
    let file = load(path)?;
    for section in &file.sections {
        println!("{}", summarize(section));
    }
    println!("{} section(s) valid in {}", file.sections.len(), path.display());
    Ok(())
}

/// Upserts every section in `path` by key.
///
/// # Errors
///
/// Returns an error if the file is invalid, a named main category does not
/// exist, or a database write fails. Writes are all-or-nothing.
pub(crate) async fn run_seed_sections(pool: &sqlx::PgPool, path: &Path) -> anyhow::Result<()> {
    let file = load(path)?;
    tracing::info!(
        path = %path.display(),
        sections = file.sections.len(),
        "seeding suggestion sections"
    );

    let written = nearbuy_db::seed_sections(pool, &file.sections)
        .await
        .context("failed to seed suggestion sections")?;

    println!("seeded {written} section(s) from {}", path.display());
    Ok(())
}
