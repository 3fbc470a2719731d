//! Persistent record of feed items that have already been evaluated and notified.
//!
//! Stored as a small JSON document next to the binary's working directory.
//! Every new mark is written through (temp file + rename), so a crash mid-run
//! never loses items that were already posted.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_SEEN_STORE_PATH: &str = "cve_notifier_seen.json";

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SeenDoc {
    version: u32,
    #[serde(default)]
    seen: BTreeMap<String, DateTime<Utc>>,
}

impl Default for SeenDoc {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            seen: BTreeMap::new(),
        }
    }
}

#[derive(Debug)]
pub struct SeenStore {
    path: PathBuf,
    doc: SeenDoc,
    added: usize,
    closed: bool,
}

impl SeenStore {
    /// Open (or start) the store at `path`. A missing file is an empty store and
    /// nothing is created until the first mark. Unreadable or malformed content is an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = match fs::read_to_string(&path).await {
            Ok(s) if s.trim().is_empty() => SeenDoc::default(),
            Ok(s) => serde_json::from_str::<SeenDoc>(&s)
                .with_context(|| format!("parsing seen store {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => SeenDoc::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading seen store {}", path.display()))
            }
        };
        if doc.version != FORMAT_VERSION {
            bail!(
                "seen store {} has unsupported version {}",
                path.display(),
                doc.version
            );
        }
        tracing::debug!(path = %path.display(), records = doc.seen.len(), "seen store opened");
        Ok(Self {
            path,
            doc,
            added: 0,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.doc.seen.contains_key(id)
    }

    /// When `id` was first marked, if ever.
    pub fn seen_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.doc.seen.get(id).copied()
    }

    /// Record `id` as seen at `at`. Returns `false` (and writes nothing) if it was
    /// already recorded; the original timestamp is kept. If the write fails the
    /// id is not recorded in memory either.
    pub async fn mark_seen(&mut self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        if self.has_seen(id) {
            return Ok(false);
        }
        self.doc.seen.insert(id.to_string(), at);
        if let Err(e) = self.persist().await {
            self.doc.seen.remove(id);
            return Err(e);
        }
        self.added += 1;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.doc.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.seen.is_empty()
    }

    /// Release the store at the end of a run. Every mark is already on disk,
    /// so there is nothing left to flush; returns how many ids this run added.
    pub fn close(mut self) -> usize {
        self.closed = true;
        tracing::debug!(
            path = %self.path.display(),
            records = self.doc.seen.len(),
            added = self.added,
            "seen store closed"
        );
        self.added
    }

    async fn persist(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating seen store dir {}", dir.display()))?;
        }
        let bytes = serde_json::to_vec_pretty(&self.doc).context("serializing seen store")?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);
        {
            let mut f = fs::File::create(&tmp)
                .await
                .with_context(|| format!("creating {}", tmp.display()))?;
            f.write_all(&bytes)
                .await
                .with_context(|| format!("writing {}", tmp.display()))?;
            f.sync_all()
                .await
                .with_context(|| format!("syncing {}", tmp.display()))?;
        }
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing seen store {}", self.path.display()))?;
        Ok(())
    }
}

impl Drop for SeenStore {
    fn drop(&mut self) {
        if !self.closed {
            tracing::debug!(
                path = %self.path.display(),
                added = self.added,
                "seen store released on early exit"
            );
        }
    }
}
