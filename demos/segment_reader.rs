//! Example reader: attaches read-only to a segment made by `segment_writer`

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use venom_map::{AccessMode, Mapping};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "venom_map_demo".to_string());

    let mut segment = Mapping::new(&name, AccessMode::ReadOnly);
    if let Err(e) = segment.open().and_then(|_| segment.map()) {
        error!(%name, error = %e, "failed to attach; is segment_writer running?");
        std::process::exit(1);
    }

    if let Some(bytes) = segment.as_slice() {
        info!(%name, size = bytes.len(), head = ?&bytes[..bytes.len().min(16)], "attached");
    }
}
