//! Initialize a new ClipForge project.

use std::path::PathBuf;

use clipforge_project_model::LoadedProject;

pub fn run(name: String, output: PathBuf) -> anyhow::Result<()> {
    let project_dir = output.join(&name);
    println!("Creating project '{}' at {}", name, project_dir.display());

    let project = LoadedProject::create(&project_dir, &name)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Project created successfully:");
    println!("  Directory: {}", project.root.display());
    println!(
        "  Canvas: {}x{} @ {}fps",
        project.timeline.canvas.width, project.timeline.canvas.height, project.timeline.frame_rate
    );
    println!();
    println!("Directory structure:");
    println!("  {}/", name);
    println!("  ├── sources/     (imported media)");
    println!("  ├── meta/        (project.json, timeline.json)");
    println!("  └── exports/     (rendered output)");

    Ok(())
}
