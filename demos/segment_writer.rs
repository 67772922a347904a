//! Example writer: creates a shared segment and fills it with a counter
//!
//! Run `segment_reader` with the same name while this is alive.

use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use venom_map::{AccessMode, Mapping};

fn main() -> venom_map::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "venom_map_demo".to_string());

    let mut segment = Mapping::with_size(&name, 64, AccessMode::ReadWrite);
    segment.open()?;
    segment.map()?;
    info!(%name, size = segment.size(), "segment ready, writing for 30s");

    for tick in 0u8..30 {
        let pattern: Vec<u8> = (0..segment.size()).map(|i| (i as u8).wrapping_add(tick)).collect();
        segment.write_at(0, &pattern)?;
        info!(tick, "wrote pattern");
        std::thread::sleep(Duration::from_secs(1));
    }

    segment.close()?;
    info!("segment removed");
    Ok(())
}
