//! Example: write a file through one mapping, read it back through another

use tracing::info;
use tracing_subscriber::EnvFilter;
use venom_map::{granularity, AccessMode, Mapping};

fn main() -> venom_map::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    let path = std::env::temp_dir().join("venom_map_demo.bin");
    let target = path.to_string_lossy().into_owned();
    info!(granularity = granularity(), path = %target, "starting");

    {
        let mut writer = Mapping::with_size(&target, 128, AccessMode::ReadWrite);
        writer.open_file()?;
        writer.map()?;
        writer.write_at(0, b"persisted through a file mapping")?;
        writer.flush()?;
    }

    let mut reader = Mapping::new(&target, AccessMode::ReadOnly);
    reader.open_file()?;
    reader.map()?;
    if let Some(bytes) = reader.as_slice() {
        info!(size = bytes.len(), text = %String::from_utf8_lossy(&bytes[..32]), "read back");
    }
    reader.close()?;

    let _ = std::fs::remove_file(&path);
    Ok(())
}
