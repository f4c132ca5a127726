// Configured resize command: argument vector with placeholders, run without a shell

use crate::error::StorageError;
use tokio::process::Command;

#[derive(Debug, Clone, Default)]
pub struct ResizeCommand {
    argv: Vec<String>,
}

impl ResizeCommand {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    /// Substitutes `{device}`, `{mount}` and `{size}` in every argument.
    pub fn render(&self, device: &str, mount: &str, size: u64) -> Option<(String, Vec<String>)> {
        let size = size.to_string();
        let mut parts = self.argv.iter().map(|a| {
            a.replace("{device}", device)
                .replace("{mount}", mount)
                .replace("{size}", &size)
        });
        let program = parts.next()?;
        Some((program, parts.collect()))
    }

    pub async fn run(&self, device: &str, mount: &str, size: u64) -> Result<(), StorageError> {
        let Some((program, args)) = self.render(device, mount, size) else {
            return Err(StorageError::Unsupported(
                "no resize command configured on this host".into(),
            ));
        };
        tracing::debug!(program = %program, ?args, "running resize command");
        let output = Command::new(&program)
            .args(&args)
            .output()
            .await
            .map_err(|e| StorageError::CommandFailed(format!("{}: {}", program, e)))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.trim();
        Err(StorageError::CommandFailed(if detail.is_empty() {
            format!("{} exited with {}", program, output.status)
        } else {
            format!("{} exited with {}: {}", program, output.status, detail)
        }))
    }
}
