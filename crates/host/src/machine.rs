use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use types::MapFlags;
use vm::{Engine, EngineConfig, Snapshot};

/// Machine description read from JSON. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineFile {
    pub engine: EngineConfig,
    /// Raw images copied into real memory before boot.
    pub images: Vec<Image>,
    pub map: Vec<MapRange>,
    /// Resume from a saved snapshot instead of booting.
    pub snapshot: Option<PathBuf>,
    /// Interrupt levels posted before the run starts.
    pub interrupts: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub path: PathBuf,
    /// First real word address.
    #[serde(default)]
    pub real_address: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapRange {
    pub virtual_page: u32,
    pub real_page: u32,
    #[serde(default = "one_page")]
    pub count: u32,
    /// Map flag bits: referenced 1, dirty 2, protected 4.
    #[serde(default)]
    pub flags: u16,
}

fn one_page() -> u32 {
    1
}

impl MachineFile {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid machine description")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read machine file {}", path.display()))?;
        Self::parse(&json)
    }
}

/// Split a raw image into big-endian words.
pub fn image_words(bytes: &[u8]) -> Result<Vec<u16>> {
    if bytes.len() % 2 != 0 {
        bail!("Image length {} is not a whole number of words", bytes.len());
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

/// Create the engine, install the page map and load the images. Relative
/// image paths are taken from `base`.
pub fn build(machine: &MachineFile, base: &Path) -> Result<Engine> {
    let mut engine = Engine::new(machine.engine.clone());
    for range in &machine.map {
        let Some(flags) = MapFlags::from_bits(range.flags) else {
            bail!("Unknown map flags 0x{:x} for page 0x{:x}", range.flags, range.virtual_page);
        };
        engine
            .mem
            .map_range(range.virtual_page, range.real_page, range.count, flags)
            .with_context(|| format!("Cannot map page 0x{:x}", range.virtual_page))?;
    }
    for image in &machine.images {
        let path = base.join(&image.path);
        let bytes = fs::read(&path).with_context(|| format!("Failed to read image {}", path.display()))?;
        let words = image_words(&bytes)?;
        engine
            .mem
            .load_real(image.real_address, &words)
            .with_context(|| format!("Image {} does not fit in real memory", path.display()))?;
    }
    Ok(engine)
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&json).context("Invalid snapshot")
}

pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_string(snapshot)?;
    fs::write(path, json).with_context(|| format!("Failed to write snapshot {}", path.display()))
}
