use thiserror::Error;

/// Failures raised at the persistence boundary. None of them is fatal; each
/// maps to a transient notice for the user.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to load project: {0:#}")]
    Load(anyhow::Error),

    #[error("failed to save project: {0:#}")]
    Save(anyhow::Error),

    #[error("failed to import project: {0:#}")]
    Import(anyhow::Error),

    #[error("failed to export project: {0:#}")]
    Export(anyhow::Error),
}

impl ProjectError {
    /// Short message for the notice surface.
    pub fn notice(&self) -> &'static str {
        match self {
            ProjectError::Load(_) => "Failed to load project",
            ProjectError::Save(_) => "Failed to save project",
            ProjectError::Import(_) => "Failed to import project",
            ProjectError::Export(_) => "Failed to export project",
        }
    }
}
