//! Validate a ClipForge project directory.

use std::path::PathBuf;

use super::load_project;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating project at: {}", path.display());

    let project = load_project(&path)?;

    println!("  Name: {}", project.project.name);
    println!("  Version: {}", project.project.version);
    println!("  Assets: {}", project.project.assets.len());
    println!(
        "  Timeline: {} clip(s), {} text overlay(s), {:.2}s",
        project.timeline.clips.len(),
        project.timeline.overlays.len(),
        project.timeline.total_duration()
    );

    let errors = project.validate_sources();
    if errors.is_empty() {
        println!("  Sources: All present");
        println!("\nProject is valid.");
    } else {
        println!("\nValidation issues:");
        for error in &errors {
            println!("  - {error}");
        }
        println!(
            "\n{} issue(s) found. Export will fail until they are fixed.",
            errors.len()
        );
    }

    Ok(())
}
