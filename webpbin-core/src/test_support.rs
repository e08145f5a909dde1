//! Shared helpers for unit tests that spawn processes.

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;

static PROCESS_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that write executables or spawn children.
///
/// Forking while another thread still holds a freshly written script open
/// makes `exec` fail with ETXTBSY.
pub(crate) fn process_lock() -> MutexGuard<'static, ()> {
    PROCESS_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Writer whose contents stay inspectable after a clone was boxed away.
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub(crate) fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl AsyncWrite for SharedBuffer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(unix)]
pub(crate) use fake::FakeTools;

#[cfg(unix)]
mod fake {
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use tempfile::TempDir;

    use crate::config::BinaryConfig;
    use crate::process::BinWrapper;
    use crate::provision::Tool;

    /// Copies its input to its output and records the arguments it received
    /// next to itself in `<tool>.args`.
    const ECHO_SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
    printf '1.4.0\r\nlibsharpyuv: 0.4.0\n'
    exit 0
fi
: > "$0.args"
for arg in "$@"; do
    printf '%s\n' "$arg" >> "$0.args"
done
out=""
prev=""
in=""
for arg in "$@"; do
    if [ "$prev" = "-o" ]; then
        out="$arg"
    fi
    prev="$arg"
    in="$arg"
done
if [ "$in" = "-" ]; then
    in=/dev/stdin
fi
if [ -z "$out" ] || [ "$out" = "-" ]; then
    cat "$in"
else
    cat "$in" > "$out"
fi
"#;

    const FAILING_SCRIPT: &str = r#"#!/bin/sh
cat > /dev/null 2>&1
echo "Error! Cannot open input file" >&2
exit 3
"#;

    /// Stand-in `cwebp`/`dwebp` executables in a temporary vendor directory.
    pub(crate) struct FakeTools {
        dir: TempDir,
    }

    impl FakeTools {
        pub(crate) fn install() -> Self {
            Self::with_script(ECHO_SCRIPT)
        }

        /// Tools that always exit with status 3 and a message on stderr.
        pub(crate) fn failing() -> Self {
            Self::with_script(FAILING_SCRIPT)
        }

        fn with_script(script: &str) -> Self {
            let dir = TempDir::new().unwrap();
            for tool in Tool::all() {
                let path = dir.path().join(tool.as_str());
                std::fs::write(&path, script).unwrap();
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            }
            Self { dir }
        }

        /// Wrapper pinned to this directory. Any download attempt would fail.
        pub(crate) fn wrapper(&self) -> BinWrapper {
            BinWrapper::new(
                BinaryConfig::new()
                    .with_vendor_path(self.dir.path())
                    .with_skip_download(false)
                    .with_base_url("https://downloads.invalid/webp/"),
            )
        }

        pub(crate) fn dir(&self) -> &Path {
            self.dir.path()
        }

        /// Arguments of the last non-version invocation of `tool`.
        pub(crate) fn recorded_args(&self, tool: Tool) -> Vec<String> {
            let path = self.dir.path().join(format!("{}.args", tool.as_str()));
            std::fs::read_to_string(path)
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }
}
