//! Compile a project's timeline and print the render command.

use std::path::PathBuf;

use clipforge_render_engine::{compile, AssetSource, CompileOptions, ProjectAssetStore};

use super::load_project;

pub fn run(path: PathBuf, json: bool, allow_empty: bool) -> anyhow::Result<()> {
    let project = load_project(&path)?;
    let assets = ProjectAssetStore::new(&project);
    let options = CompileOptions {
        allow_empty,
        ..CompileOptions::from_settings(&project.project.export)
    };

    let command = compile(&project.timeline, &assets, &options)
        .map_err(|e| anyhow::anyhow!("Compilation failed: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&command)?);
        return Ok(());
    }

    let input_paths: Vec<PathBuf> = command
        .inputs
        .iter()
        .map(|i| match &i.source {
            AssetSource::File(p) => p.clone(),
            AssetSource::Bytes(_) => PathBuf::from(&i.local_name),
        })
        .collect();
    let output = path.join("exports").join("output.mp4");
    let args = command.to_ffmpeg_args(&input_paths, &output)?;

    print!("{}", command.summary());
    println!("ffmpeg {}", args.join(" "));
    Ok(())
}
