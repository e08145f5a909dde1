//! Lazily provisioned handle to the libwebp tools.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use super::runner::{execute, strip_line_breaks, ProcessOutput};
use crate::adapter::ByteReader;
use crate::config::BinaryConfig;
use crate::error::Result;
use crate::provision::{BinLocation, Provisioner, Tool};

/// Shared, cheaply cloneable handle that provisions the tools on first use
/// and runs them.
///
/// One wrapper pins one libwebp release. Provisioning happens at most once
/// per wrapper; a failed attempt is retried on the next call.
#[derive(Debug, Clone)]
pub struct BinWrapper {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    provisioner: Provisioner,
    location: OnceCell<BinLocation>,
}

impl BinWrapper {
    pub fn new(config: BinaryConfig) -> Self {
        Self::with_provisioner(Provisioner::new(config))
    }

    /// Configuration from the environment, with skipping turned on for hosts
    /// that have no usable prebuilt tools.
    pub fn from_env() -> Self {
        Self::new(BinaryConfig::from_env().detect_unsupported_platforms())
    }

    pub fn with_provisioner(provisioner: Provisioner) -> Self {
        Self {
            inner: Arc::new(Inner {
                provisioner,
                location: OnceCell::new(),
            }),
        }
    }

    pub fn config(&self) -> &BinaryConfig {
        self.inner.provisioner.config()
    }

    pub fn provisioner(&self) -> &Provisioner {
        &self.inner.provisioner
    }

    /// Provisions the tools if that has not happened yet.
    pub async fn location(&self) -> Result<&BinLocation> {
        self.inner
            .location
            .get_or_try_init(|| async {
                self.inner
                    .provisioner
                    .ensure_installed(|progress| {
                        if let Some(percent) = progress.percent {
                            debug!("libwebp download progress: {:.1}%", percent);
                        }
                    })
                    .await
            })
            .await
    }

    /// Path used to launch `tool`, provisioning first if needed.
    pub async fn executable(&self, tool: Tool) -> Result<PathBuf> {
        self.location().await?;
        Ok(self.inner.provisioner.executable_path(tool))
    }

    /// Runs `tool` once with `args`.
    pub async fn run(
        &self,
        tool: Tool,
        args: &[OsString],
        stdin: Option<ByteReader>,
    ) -> Result<ProcessOutput> {
        let program = self.executable(tool).await?;
        execute(tool, &program, args, stdin).await
    }

    /// Runs `tool -version` and returns its stdout with line breaks removed.
    pub async fn version(&self, tool: Tool) -> Result<String> {
        let output = self.run(tool, &[OsString::from("-version")], None).await?;
        Ok(strip_line_breaks(&output.stdout_text()))
    }
}
