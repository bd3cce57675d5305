use std::path::{Path, PathBuf};

use nearbuy_core::SectionDefinition;

use super::*;

#[test]
fn parses_migrate_command() {
    let cli = Cli::try_parse_from(["nearbuy-cli", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Migrate));
}

#[test]
fn seed_sections_defaults_to_configured_path() {
    let cli =
        Cli::try_parse_from(["nearbuy-cli", "seed-sections"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::SeedSections {
            path: None,
            dry_run: false
        }
    ));
}

#[test]
fn seed_sections_accepts_path_and_dry_run() {
    let cli = Cli::try_parse_from([
        "nearbuy-cli",
        "seed-sections",
        "--path",
        "staging/sections.yaml",
        "--dry-run",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::SeedSections {
            path: Some(ref p),
            dry_run: true
        } if p == &PathBuf::from("staging/sections.yaml")
    ));
}

#[test]
fn check_sections_takes_explicit_path() {
    let cli = Cli::try_parse_from(["nearbuy-cli", "check-sections", "--path", "other.yaml"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::CheckSections { ref path } if path == &PathBuf::from("other.yaml")
    ));
}

#[test]
fn missing_command_is_rejected() {
    assert!(Cli::try_parse_from(["nearbuy-cli"]).is_err());
}

#[test]
fn bundled_sections_file_checks_clean() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/sections.yaml");
    sections::run_check_sections(&path).expect("bundled sections.yaml is valid");
}

#[test]
fn check_sections_reports_missing_file() {
    let err = sections::run_check_sections(Path::new("/nonexistent/sections.yaml"))
        .expect_err("missing file");
    assert!(err.to_string().contains("/nonexistent/sections.yaml"));
}

#[test]
fn summary_line_names_key_kind_and_items() {
    let section: SectionDefinition = serde_yaml::from_str(
        "key: weekend\ntitle: Weekend picks\ntype: STATIC\nmain_category: Food\nactive: false\n\
         items:\n  - title: One\n  - title: Two\n",
    )
    .expect("section yaml");

    let line = sections::summarize(&section);

    assert!(line.starts_with("weekend"));
    assert!(line.contains("STATIC"));
    assert!(line.contains("Weekend picks [Food] - 2 item(s)"));
    assert!(line.ends_with("(inactive)"));
}
