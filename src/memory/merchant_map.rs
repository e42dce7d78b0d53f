//! A `MerchantMemory` stored as a two-column CSV file (`merchant,category`).

use crate::error::{ErrorType, IntoResult, Res};
use crate::memory::{normalize_key, MemoryMatch, MerchantMemory, MerchantRecord, DEFAULT_THRESHOLD};
use crate::model::Category;
use crate::similarity::{Similarity, TokenSetRatio};
use crate::{utils, Config, Error, Result};
use anyhow::{anyhow, bail, Context};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, trace, warn};

const MERCHANT: &str = "merchant";
const CATEGORY: &str = "category";

/// The CSV-backed merchant memory. The whole file is read on `load` and rewritten on every change.
pub struct MerchantMap {
    path: PathBuf,
    threshold: u8,
    similarity: Box<dyn Similarity>,
    records: Vec<MerchantRecord>,
}

impl Debug for MerchantMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MerchantMap")
            .field("path", &self.path)
            .field("threshold", &self.threshold)
            .field("records", &self.records.len())
            .finish()
    }
}

impl MerchantMap {
    /// Loads the merchant map at `path`. If the file does not exist it is created, along with its
    /// parent directories, holding only the header row.
    ///
    /// # Errors
    /// A `Storage` error if the file exists but cannot be read or is not a valid merchant map. The
    /// file is never reset in that case.
    pub async fn load(
        path: impl Into<PathBuf>,
        threshold: u8,
        similarity: Box<dyn Similarity>,
    ) -> Result<Self> {
        let path = path.into();
        let mut map = Self {
            path,
            threshold,
            similarity,
            records: Vec::new(),
        };

        if !map.path.exists() {
            debug!("Creating an empty merchant map at {}", map.path.display());
            if let Some(parent) = map.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                utils::make_dir(parent)
                    .await
                    .pub_result(ErrorType::Storage)?;
            }
            map.save().await?;
            return Ok(map);
        }

        let content = utils::read(&map.path)
            .await
            .pub_result(ErrorType::Storage)?;
        map.records = parse(&content)
            .with_context(|| format!("The merchant map at {} is malformed", map.path.display()))
            .pub_result(ErrorType::Storage)?;
        debug!(
            "Loaded {} merchants from {}",
            map.records.len(),
            map.path.display()
        );
        Ok(map)
    }

    /// Loads the merchant map named in `config` with the default similarity scorer.
    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::load(
            config.merchant_map_path(),
            config.match_threshold(),
            Box::new(TokenSetRatio),
        )
        .await
    }

    /// Loads with the default threshold and scorer.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::load(path, DEFAULT_THRESHOLD, Box::new(TokenSetRatio)).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes every record to the file, replacing it.
    pub async fn save(&self) -> Result<()> {
        let data = serialize(&self.records).pub_result(ErrorType::Storage)?;
        utils::write_replace(&self.path, data)
            .await
            .pub_result(ErrorType::Storage)?;
        trace!(
            "Saved {} merchants to {}",
            self.records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.records.iter().position(|r| r.merchant_key == key)
    }
}

#[async_trait::async_trait]
impl MerchantMemory for MerchantMap {
    fn lookup(&self, description: &str) -> Option<MemoryMatch> {
        let key = normalize_key(description);
        if key.is_empty() || self.records.is_empty() {
            return None;
        }

        let mut best: Option<(&MerchantRecord, u8)> = None;
        for record in &self.records {
            let score = self.similarity.score(&key, &record.merchant_key);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((record, score));
            }
        }

        let (record, score) = best?;
        trace!("Best match for '{key}' is '{}' ({score})", record.merchant);
        (score >= self.threshold).then(|| MemoryMatch {
            category: record.category.clone(),
            score,
            merchant: record.merchant.clone(),
        })
    }

    async fn learn(&mut self, description: &str, category: &Category) -> Result<()> {
        let category = category.validated().pub_result(ErrorType::Input)?;
        let record = MerchantRecord::new(description, category);
        if record.merchant_key.is_empty() {
            return Err(Error::new(
                ErrorType::Input,
                anyhow!("Cannot learn a category for a blank merchant"),
            ));
        }
        match self.position(&record.merchant_key) {
            Some(i) => {
                debug!(
                    "Updating '{}' to {}",
                    self.records[i].merchant, record.category
                );
                self.records[i].category = record.category;
            }
            None => {
                debug!("Learning '{}' as {}", record.merchant, record.category);
                self.records.push(record);
            }
        }
        self.save().await
    }

    async fn forget(&mut self, description: &str) -> Result<bool> {
        let key = normalize_key(description);
        match self.position(&key) {
            Some(i) => {
                let removed = self.records.remove(i);
                debug!("Forgot '{}'", removed.merchant);
                self.save().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn records(&self) -> &[MerchantRecord] {
        &self.records
    }
}

/// Parses the file contents. Rows that repeat a key are folded into the first row with that key,
/// taking the later category.
fn parse(content: &str) -> Res<Vec<MerchantRecord>> {
    if content.trim().is_empty() {
        warn!("The merchant map is empty and has no header, treating it as having no merchants");
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers().context("Unable to read the header row")?;
    if headers.len() != 2
        || !headers[0].eq_ignore_ascii_case(MERCHANT)
        || !headers[1].eq_ignore_ascii_case(CATEGORY)
    {
        bail!("Expected the header '{MERCHANT},{CATEGORY}' but found '{headers:?}'");
    }

    let mut records: Vec<MerchantRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, row) in reader.records().enumerate() {
        let line = i + 2;
        let row = row.with_context(|| format!("Unable to read line {line}"))?;
        let category = Category::from_str(&row[1])
            .with_context(|| format!("Invalid category on line {line}"))?;
        let record = MerchantRecord::new(&row[0], category);
        if record.merchant_key.is_empty() {
            bail!("Blank merchant on line {line}");
        }
        match index.get(&record.merchant_key) {
            Some(&existing) => {
                warn!(
                    "Duplicate merchant '{}' on line {line}, keeping the later category",
                    record.merchant
                );
                records[existing].category = record.category;
            }
            None => {
                index.insert(record.merchant_key.clone(), records.len());
                records.push(record);
            }
        }
    }
    Ok(records)
}

fn serialize(records: &[MerchantRecord]) -> Res<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([MERCHANT, CATEGORY])
        .context("Unable to write the header row")?;
    for record in records {
        writer
            .write_record([record.merchant.as_str(), record.category.label()])
            .with_context(|| format!("Unable to write '{}'", record.merchant))?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow!("Unable to flush the merchant map: {}", e.error()))
}
