//! Build port backed by the daemon's own command-line tool.
//!
//! `build` writes the definition (daemon dialect) to a temporary file and
//! runs `<exe> create <name> -f <file>`; `copy` runs `<exe> cp <src> <dst>`.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use modelkeep_core::{BuildError, ModelBuilderPort, ModelDefinition};
use tracing::{debug, info, warn};

use crate::command::{CommandOutput, CommandRunner, SystemCommandRunner};

/// Builder that shells out to the daemon executable.
pub struct CliModelBuilder<R: CommandRunner + 'static = SystemCommandRunner> {
    runner: Arc<R>,
    executable: PathBuf,
}

impl CliModelBuilder {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self::with_runner(executable, SystemCommandRunner)
    }
}

impl<R: CommandRunner + 'static> CliModelBuilder<R> {
    pub fn with_runner(executable: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            runner: Arc::new(runner),
            executable: executable.into(),
        }
    }

    /// Run the executable off the async runtime.
    async fn run(&self, args: Vec<OsString>, name: &str) -> Result<CommandOutput, BuildError> {
        let runner = Arc::clone(&self.runner);
        let executable = self.executable.clone();
        tokio::task::spawn_blocking(move || runner.run(&executable, &args))
            .await
            .map_err(|e| BuildError::Io(format!("build task failed: {e}")))?
            .map_err(|e| spawn_error(&self.executable, &e))
            .and_then(|output| {
                if output.is_success() {
                    Ok(output)
                } else {
                    Err(BuildError::Rejected {
                        name: name.to_string(),
                        message: output.message(),
                    })
                }
            })
    }
}

fn spawn_error(executable: &std::path::Path, err: &io::Error) -> BuildError {
    if err.kind() == io::ErrorKind::NotFound {
        BuildError::Unavailable(format!(
            "daemon executable not found at {}",
            executable.display()
        ))
    } else {
        BuildError::Io(format!("failed to run {}: {err}", executable.display()))
    }
}

/// Write the definition to a fresh `.modelfile` in the system temp dir.
fn write_definition_file(definition: &str) -> Result<tempfile::NamedTempFile, BuildError> {
    let mut file = tempfile::Builder::new()
        .prefix("modelkeep-")
        .suffix(".modelfile")
        .tempfile()
        .map_err(|e| BuildError::Io(format!("cannot create definition file: {e}")))?;
    file.write_all(ModelDefinition::new(definition).to_daemon_text().as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| BuildError::Io(format!("cannot write definition file: {e}")))?;
    Ok(file)
}

#[async_trait]
impl<R: CommandRunner + 'static> ModelBuilderPort for CliModelBuilder<R> {
    async fn build(&self, name: &str, definition: &str) -> Result<(), BuildError> {
        let file = write_definition_file(definition)?;
        debug!(model = %name, file = %file.path().display(), "Wrote definition file");

        let args = vec![
            OsString::from("create"),
            OsString::from(name),
            OsString::from("-f"),
            file.path().as_os_str().to_os_string(),
        ];
        let result = self.run(args, name).await;

        let path = file.path().to_path_buf();
        if let Err(e) = file.close() {
            warn!(file = %path.display(), error = %e, "Failed to remove definition file");
        }

        result?;
        info!(model = %name, "Built model with daemon CLI");
        Ok(())
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), BuildError> {
        let args = vec![
            OsString::from("cp"),
            OsString::from(source),
            OsString::from(destination),
        ];
        self.run(args, destination).await?;
        info!(source = %source, destination = %destination, "Copied model with daemon CLI");
        Ok(())
    }
}
