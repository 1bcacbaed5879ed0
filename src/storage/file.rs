use std::{
    fs,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{error, info};
use tokio::sync::oneshot;

use super::ProjectGateway;
use crate::{
    error::ProjectError,
    models::{now_millis, Project},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Where the project lives on disk.
#[derive(Debug, Clone)]
pub struct ProjectFiles {
    pub project_path: PathBuf,
    pub export_dir: PathBuf,
    pub export_file_name: String,
}

impl ProjectFiles {
    pub fn in_dir(data_dir: &Path, project_file: &str, export_file: &str) -> Self {
        Self {
            project_path: data_dir.join(project_file),
            export_dir: data_dir.join("exports"),
            export_file_name: export_file.to_string(),
        }
    }

    fn read_project(&self) -> Result<Project> {
        if !self.project_path.exists() {
            log_debug!("no project at {}, starting fresh", self.project_path.display());
            return Ok(Project::default());
        }
        let raw = fs::read_to_string(&self.project_path)
            .with_context(|| format!("failed to read {}", self.project_path.display()))?;
        Project::from_json(&raw)
            .with_context(|| format!("failed to parse {}", self.project_path.display()))
    }

    fn write_project(&self, project: &Project) -> Result<()> {
        write_json_atomically(&self.project_path, project)
    }

    fn write_export(&self, project: &Project) -> Result<PathBuf> {
        fs::create_dir_all(&self.export_dir)
            .with_context(|| format!("failed to create {}", self.export_dir.display()))?;
        let target = self.export_dir.join(&self.export_file_name);
        write_json_atomically(&target, project)?;
        Ok(target)
    }
}

fn write_json_atomically(target: &Path, project: &Project) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let serialized = project
        .to_json_pretty()
        .context("failed to serialize project")?;
    let staging = target.with_extension("json.tmp");
    fs::write(&staging, serialized)
        .with_context(|| format!("failed to write {}", staging.display()))?;
    fs::rename(&staging, target)
        .with_context(|| format!("failed to move {} into place", staging.display()))
}

type IoTask = Box<dyn FnOnce(&ProjectFiles) + Send + 'static>;

enum IoCommand {
    Execute(IoTask),
    Shutdown,
}

struct GatewayInner {
    sender: mpsc::Sender<IoCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for GatewayInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(IoCommand::Shutdown) {
                error!("Failed to send shutdown to storage thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join storage thread: {join_err:?}");
            }
        }
    }
}

/// File-backed gateway. Blocking file I/O runs on one dedicated thread so
/// async callers never block and writes reach the disk in submission order.
#[derive(Clone)]
pub struct FileGateway {
    inner: Arc<GatewayInner>,
}

impl FileGateway {
    pub fn new(files: ProjectFiles) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<IoCommand>();
        info!("Project storage at {}", files.project_path.display());

        let worker = thread::Builder::new()
            .name("deepnoura-storage".into())
            .spawn(move || {
                while let Ok(command) = command_rx.recv() {
                    match command {
                        IoCommand::Execute(task) => task(&files),
                        IoCommand::Shutdown => break,
                    }
                }
                info!("Storage thread shutting down");
            })
            .context("failed to spawn storage worker thread")?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&ProjectFiles) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = IoCommand::Execute(Box::new(move |files| {
            let result = task(files);
            if reply_tx.send(result).is_err() {
                log_warn!("storage caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to storage thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("storage thread terminated unexpectedly"))?
    }
}

#[async_trait]
impl ProjectGateway for FileGateway {
    async fn load(&self) -> Result<Project, ProjectError> {
        self.execute(|files| files.read_project())
            .await
            .map_err(ProjectError::Load)
    }

    async fn save(&self, project: &Project) -> Result<(), ProjectError> {
        let snapshot = project.clone();
        self.execute(move |files| files.write_project(&snapshot))
            .await
            .map_err(ProjectError::Save)
    }

    async fn import_from(&self, source: &Path) -> Result<Project, ProjectError> {
        let source = source.to_path_buf();
        self.execute(move |files| {
            let raw = fs::read_to_string(&source)
                .with_context(|| format!("failed to read {}", source.display()))?;
            let mut imported = Project::from_json(&raw)
                .with_context(|| format!("failed to parse {}", source.display()))?;
            imported.updated_at = now_millis();
            files.write_project(&imported)?;
            Ok(imported)
        })
        .await
        .map_err(ProjectError::Import)
    }

    async fn export(&self, project: &Project) -> Result<PathBuf, ProjectError> {
        let snapshot = project.clone();
        self.execute(move |files| files.write_export(&snapshot))
            .await
            .map_err(ProjectError::Export)
    }
}
