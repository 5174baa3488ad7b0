//! Listing fixtures: generated folder trees stored as JSON.
//!
//! Files ending in `.br` are Brotli compressed on write and decompressed on
//! read.

use crate::model::Entry;
use crate::source::FolderContents;
use anyhow::{Context, Result};
use brotli::enc::BrotliEncoderParams;
use brotli::{CompressorWriter, Decompressor};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

pub const ROOT_FOLDER_ID: &str = "root";

const FOLDER_NAMES: &[&str] = &[
    "Inspections",
    "Blueprints",
    "Permits",
    "Manuals",
    "Invoices",
    "Photos",
    "Safety",
    "Warranties",
    "Renovation",
    "Meeting Minutes",
];

const FILE_STEMS: &[&str] = &[
    "boiler-inspection",
    "fire-alarm-test",
    "elevator-certificate",
    "floor-plan",
    "hvac-maintenance",
    "water-tank-cleaning",
    "electrical-survey",
    "gas-leak-check",
    "lease-agreement",
    "repair-estimate",
    "site-photo",
    "energy-report",
];

const EXTENSIONS: &[&str] = &["pdf", "xlsx", "docx", "jpg", "csv", "dwg"];

const OWNERS: &[&str] = &["Sato", "Suzuki", "Takahashi", "Tanaka", "Ito", "Watanabe"];

/// A whole folder tree keyed by folder id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingFixture {
    pub root: String,
    pub folders: BTreeMap<String, FolderContents>,
}

impl ListingFixture {
    pub fn entry_count(&self) -> usize {
        self.folders
            .values()
            .map(|contents| contents.folders.len() + contents.files.len())
            .sum()
    }

    /// Writes the fixture, compressing it when the path ends with `.br`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create file: {}", path.display()))?;

        let mut writer: Box<dyn Write> = if is_brotli(path) {
            let params = BrotliEncoderParams {
                quality: 6,
                lgwin: 22,
                ..Default::default()
            };
            Box::new(CompressorWriter::with_params(BufWriter::new(file), 4096, &params))
        } else {
            Box::new(BufWriter::new(file))
        };

        serde_json::to_writer(&mut writer, self)
            .with_context(|| format!("Failed to write listing: {}", path.display()))?;
        writer.flush()?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;

        let reader: Box<dyn Read> = if is_brotli(path) {
            Box::new(BufReader::new(Decompressor::new(file, 4096)))
        } else {
            Box::new(BufReader::new(file))
        };

        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse listing: {}", path.display()))
    }
}

fn is_brotli(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "br")
}

/// Shape of a generated tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Subfolders per folder
    pub folders: usize,
    /// Files per folder, drawn from `files_min..=files_max`
    pub files_min: usize,
    pub files_max: usize,
    /// Folder nesting below the root
    pub depth: usize,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            folders: 4,
            files_min: 20,
            files_max: 200,
            depth: 2,
            seed: 42,
        }
    }
}

/// Generates a reproducible facility document tree.
pub fn generate(config: &GeneratorConfig) -> ListingFixture {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut folders = BTreeMap::new();
    let mut next_id = 1u64;
    let epoch = Utc
        .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut pending = vec![(ROOT_FOLDER_ID.to_string(), 0usize)];
    while let Some((folder_id, level)) = pending.pop() {
        let mut contents = FolderContents::default();

        if level < config.depth {
            for i in 0..config.folders {
                let id = format!("d{}", next_id);
                next_id += 1;
                let base = FOLDER_NAMES[(i + level) % FOLDER_NAMES.len()];
                let name = if i < FOLDER_NAMES.len() {
                    base.to_string()
                } else {
                    format!("{} {}", base, i / FOLDER_NAMES.len() + 1)
                };
                let updated = epoch + Duration::minutes(rng.gen_range(0..2_000_000));
                contents.folders.push(
                    Entry::folder(id.clone(), name, updated)
                        .with_owner(OWNERS[rng.gen_range(0..OWNERS.len())]),
                );
                pending.push((id, level + 1));
            }
        }

        let max = config.files_max.max(config.files_min);
        let file_count = rng.gen_range(config.files_min..=max);
        for n in 0..file_count {
            let id = format!("f{}", next_id);
            next_id += 1;
            let stem = FILE_STEMS[rng.gen_range(0..FILE_STEMS.len())];
            let ext = EXTENSIONS[rng.gen_range(0..EXTENSIONS.len())];
            let updated = epoch + Duration::minutes(rng.gen_range(0..2_000_000));
            let size = rng.gen_range(1_024..50 * 1024 * 1024);
            contents.files.push(
                Entry::file(id, format!("{}-{:04}.{}", stem, n + 1, ext), updated, size)
                    .with_owner(OWNERS[rng.gen_range(0..OWNERS.len())]),
            );
        }

        folders.insert(folder_id, contents);
    }

    ListingFixture {
        root: ROOT_FOLDER_ID.to_string(),
        folders,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn small() -> GeneratorConfig {
        GeneratorConfig {
            folders: 2,
            files_min: 3,
            files_max: 3,
            depth: 2,
            seed: 7,
        }
    }

    #[test]
    fn test_generate_builds_full_tree() {
        let fixture = generate(&small());

        // root + 2 + 4 folders, each with 3 files
        assert_eq!(fixture.folders.len(), 7);
        assert_eq!(fixture.folders[ROOT_FOLDER_ID].folders.len(), 2);
        assert_eq!(fixture.entry_count(), 6 + 7 * 3);
        let child_id = fixture.folders[ROOT_FOLDER_ID].folders[0].id.as_str().to_string();
        assert!(fixture.folders.contains_key(&child_id));
    }

    #[test]
    fn test_generate_is_reproducible() {
        assert_eq!(generate(&small()), generate(&small()));
    }

    #[test]
    fn test_brotli_fixture_round_trip() {
        let path = env::temp_dir().join("docview_fixture_test.json.br");
        let fixture = generate(&small());

        fixture.write(&path).unwrap();
        let loaded = ListingFixture::read(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded, fixture);
    }
}
