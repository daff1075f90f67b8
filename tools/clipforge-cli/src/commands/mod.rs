pub mod check;
pub mod compile;
pub mod edit;
pub mod export;
pub mod import;
pub mod info;
pub mod init;
pub mod validate;

use std::path::Path;

use clipforge_project_model::LoadedProject;

pub(crate) fn load_project(path: &Path) -> anyhow::Result<LoadedProject> {
    LoadedProject::load(path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))
}
