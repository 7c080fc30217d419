//! Weight table file: one `option1,option2:weight` record per line.

#![allow(missing_docs)]

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::core::config::Config;
use crate::core::errors::{Result, SrhError};
use crate::logger::jsonl::{EventSink, EventType, LogEntry, Severity};
use crate::pairwise::catalog::{OptionCatalog, is_valid_option_name};
use crate::pairwise::generator::{OptionPair, WeightRange, WeightedPair, generate_weighted};

/// Ordered weighted pairs, as generated or as read back from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeightTable {
    entries: Vec<WeightedPair>,
}

impl WeightTable {
    pub fn new(entries: Vec<WeightedPair>) -> Self {
        Self { entries }
    }

    /// Generate a table for `catalog` with the given RNG.
    pub fn generate<R: rand::Rng>(catalog: &OptionCatalog, range: WeightRange, rng: &mut R) -> Self {
        Self::new(generate_weighted(catalog, range, rng))
    }

    pub fn entries(&self) -> &[WeightedPair] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &OptionPair> {
        self.entries.iter().map(|e| &e.pair)
    }

    pub fn total_weight(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.weight)).sum()
    }

    /// Look up the weight of `first`/`second` in either order.
    pub fn weight_of(&self, first: &str, second: &str) -> Option<u32> {
        let probe = OptionPair::new(first, second);
        self.entries
            .iter()
            .find(|e| e.pair.same_options(&probe))
            .map(|e| e.weight)
    }

    /// Heaviest `n` entries, ties kept in generation order.
    pub fn heaviest(&self, n: usize) -> Vec<&WeightedPair> {
        let mut sorted: Vec<&WeightedPair> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.weight.cmp(&a.weight));
        sorted.truncate(n);
        sorted
    }

    /// Render the whole table in file format.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.entries.len() * 32);
        for e in &self.entries {
            out.push_str(&format_record(e));
            out.push('\n');
        }
        out
    }

    /// Write the table to `path`, replacing any existing file in full.
    ///
    /// The table is written next to the destination and renamed into place.
    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| SrhError::io(parent, e))?;
        }

        let tmp = temp_path(path);
        let result = self.write_to(&tmp).and_then(|()| {
            fs::rename(&tmp, path).map_err(|e| SrhError::io(path, e))
        });
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| SrhError::io(path, e))?;
        let mut w = BufWriter::new(file);
        for e in &self.entries {
            writeln!(w, "{}", format_record(e)).map_err(|err| SrhError::io(path, err))?;
        }
        w.flush().map_err(|e| SrhError::io(path, e))?;
        w.get_ref().sync_all().map_err(|e| SrhError::io(path, e))?;
        Ok(())
    }

    /// Read a table back, keeping file order.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                SrhError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                SrhError::io(path, source)
            }
        })?;
        Self::parse(&text, path)
    }

    /// Parse file-format text; `origin` only labels errors.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let entry = parse_record(line).map_err(|details| SrhError::WeightTableParse {
                path: origin.to_path_buf(),
                line: idx + 1,
                details,
            })?;
            entries.push(entry);
        }
        Ok(Self { entries })
    }
}

/// `a,b:w`
pub fn format_record(entry: &WeightedPair) -> String {
    format!("{},{}:{}", entry.pair.first, entry.pair.second, entry.weight)
}

fn parse_record(line: &str) -> std::result::Result<WeightedPair, String> {
    let (names, weight) = line
        .rsplit_once(':')
        .ok_or_else(|| format!("missing ':' in {line:?}"))?;
    let (first, second) = names
        .split_once(',')
        .ok_or_else(|| format!("missing ',' in {line:?}"))?;
    for name in [first, second] {
        if !is_valid_option_name(name) {
            return Err(format!("invalid option name {name:?}"));
        }
    }
    if first == second {
        return Err(format!("self-pair {first:?}"));
    }
    let weight = weight
        .parse::<u32>()
        .map_err(|e| format!("bad weight {weight:?}: {e}"))?;
    Ok(WeightedPair {
        pair: OptionPair::new(first, second),
        weight,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// What a generation run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateSummary {
    pub path: PathBuf,
    pub options: usize,
    pub pairs: usize,
    pub min_weight: u32,
    pub max_weight: u32,
    pub seed: Option<u64>,
    pub total_weight: u64,
}

/// Build the catalog from `config`, weight every pair, and overwrite the
/// configured output file.
pub fn run_generate(config: &Config, sink: &mut dyn EventSink) -> Result<GenerateSummary> {
    let catalog = config.catalog()?;
    let range = config.weight_range()?;
    let table = match config.weights.seed {
        Some(seed) => WeightTable::generate(&catalog, range, &mut StdRng::seed_from_u64(seed)),
        None => WeightTable::generate(&catalog, range, &mut rand::rng()),
    };

    let path = &config.weights.output_path;
    table.persist(path)?;

    let summary = GenerateSummary {
        path: path.clone(),
        options: catalog.len(),
        pairs: table.len(),
        min_weight: range.min(),
        max_weight: range.max(),
        seed: config.weights.seed,
        total_weight: table.total_weight(),
    };

    let mut entry = LogEntry::new(EventType::WeightsGenerated, Severity::Info).with_path(path);
    entry.count = Some(summary.pairs);
    if let Some(seed) = summary.seed {
        entry = entry.with_details(format!("seed={seed}"));
    }
    sink.record(&entry);

    Ok(summary)
}
