//! Concrete handlers shipped with the binary.
//!
//! Every catalogue entry in the config file becomes one handler: an
//! [`LlmHandler`] for `chat` entries, a [`FileHandler`] for `files` entries.
//! See [`build_handlers`].

pub mod files;
pub mod llm;

pub use files::{FileHandler, FileOperation, FileWorkspace};
pub use llm::LlmHandler;

use std::path::Path;
use std::sync::Arc;

use switchyard_llm::LlmProvider;

use crate::config::{HandlerConfig, HandlerKind, DEFAULT_FILES_ROOT};
use crate::error::CoreResult;
use crate::handler::Handler;

/// One handler per catalogue entry, sharing `provider`. Order is preserved so
/// registration order follows the config file. Relative workspace roots are
/// resolved against `base_dir` and created if missing.
pub fn build_handlers(
    catalogue: &[HandlerConfig],
    provider: Arc<dyn LlmProvider>,
    base_dir: &Path,
) -> CoreResult<Vec<Arc<dyn Handler>>> {
    catalogue
        .iter()
        .map(|entry| {
            let handler: Arc<dyn Handler> = match entry.kind {
                HandlerKind::Chat => Arc::new(LlmHandler::new(entry.clone(), provider.clone())),
                HandlerKind::Files => {
                    let root = entry
                        .root
                        .as_deref()
                        .unwrap_or_else(|| Path::new(DEFAULT_FILES_ROOT));
                    let workspace = FileWorkspace::open(&base_dir.join(root))?;
                    tracing::info!(
                        handler = %entry.name,
                        root = %workspace.root().display(),
                        "file workspace ready"
                    );
                    Arc::new(FileHandler::new(entry.clone(), workspace, provider.clone()))
                }
            };
            Ok(handler)
        })
        .collect()
}
