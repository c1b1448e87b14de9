// FileLedger — newline-delimited text file of reposted post URIs.
//
// Each recorded URI is appended to the file straight away, so a crash mid-run
// keeps everything done up to that point. `flush` compacts: it writes the
// full set to a sibling temp file and renames it over the original, so the
// file is always either the old or the new complete set.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::traits::DedupLedger;

pub struct FileLedger {
    path: PathBuf,
    done: BTreeSet<String>,
}

impl FileLedger {
    /// Load the ledger at `path`. A missing file is an empty ledger.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let done = match fs::read_to_string(&path) {
            Ok(text) => parse_lines(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read ledger {}", path.display()))
            }
        };

        debug!(path = %path.display(), entries = done.len(), "Loaded ledger");
        Ok(Self { path, done })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory for ledger: {}", self.path.display())
                })?;
            }
        }
        Ok(())
    }

    fn append(&self, uri: &str) -> Result<()> {
        self.ensure_parent()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open ledger {}", self.path.display()))?;
        writeln!(file, "{uri}")
            .with_context(|| format!("Failed to append to ledger {}", self.path.display()))
    }
}

fn parse_lines(text: &str) -> BTreeSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

impl DedupLedger for FileLedger {
    fn contains(&self, uri: &str) -> bool {
        self.done.contains(uri)
    }

    fn record(&mut self, uri: &str) -> Result<()> {
        if self.done.insert(uri.to_string()) {
            self.append(uri)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_parent()?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut body = String::new();
        for uri in &self.done {
            body.push_str(uri);
            body.push('\n');
        }

        fs::write(&tmp, body)
            .with_context(|| format!("Failed to write ledger {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace ledger {}", self.path.display()))?;

        debug!(path = %self.path.display(), entries = self.done.len(), "Flushed ledger");
        Ok(())
    }

    fn len(&self) -> usize {
        self.done.len()
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}
