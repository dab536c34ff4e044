use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use stride_core::config::Config;
use stride_core::{Assistant, MemoryStore, Store, StrideError, YamlStore};
use stride_server::AppState;

pub fn run(root: &Path, port: Option<u16>) -> anyhow::Result<()> {
    let (config, store): (Config, Arc<dyn Store>) = match Config::load(root) {
        Ok(config) => (config, Arc::new(YamlStore::new(root))),
        Err(StrideError::NotInitialized) => {
            tracing::warn!(root = %root.display(), "no .stride/ found, serving from memory");
            (Config::default(), Arc::new(MemoryStore::new()))
        }
        Err(e) => return Err(e).context("failed to load config"),
    };

    for w in config.validate() {
        tracing::warn!(level = ?w.level, "{}", w.message);
    }

    let port = port.unwrap_or(config.server.port);
    let assistant = Assistant::from_config(&config, store).context("failed to build oracle")?;
    let state = AppState::new(assistant, config.server.user_header.clone())
        .with_details(!config.is_production());

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        tokio::select! {
            res = stride_server::serve(state, port) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
