//! Input sources: directory discovery and CSV record reading.
//!
//! Each source is a text stream of `identifier,latitude,longitude` records.
//! Header detection is by identifier value and happens in
//! [`EntityBatch::from_records`], so the reader itself treats every line as
//! data.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{EntityBatch, NearestError};

/// One record as read from a source, before numeric parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub identifier: String,
    pub latitude: String,
    pub longitude: String,
}

/// List the regular files in `dir`, sorted by path.
///
/// Sorting makes processing order independent of the filesystem's
/// enumeration order.
pub fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>, NearestError> {
    let unavailable = |source: io::Error| NearestError::SourceUnavailable {
        path: dir.to_path_buf(),
        source,
    };

    let mut sources = Vec::new();
    for entry in fs::read_dir(dir).map_err(unavailable)? {
        let path = entry.map_err(unavailable)?.path();
        if path.is_file() {
            sources.push(path);
        } else {
            debug!(path = %path.display(), "ignoring non-file entry");
        }
    }
    sources.sort();
    Ok(sources)
}

/// Read every record of a source.
///
/// Fields are split on commas only; quote characters are kept verbatim.
/// Reading stops at the first record with fewer than three fields and the
/// remainder of the source is ignored. Extra fields are ignored.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<RawRecord>, NearestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut records = Vec::new();
    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result?;
        let (Some(identifier), Some(latitude), Some(longitude)) =
            (record.get(0), record.get(1), record.get(2))
        else {
            warn!(
                record = row_idx + 1,
                fields = record.len(),
                "incomplete record; ignoring the rest of the source"
            );
            break;
        };
        records.push(RawRecord {
            identifier: identifier.to_owned(),
            latitude: latitude.to_owned(),
            longitude: longitude.to_owned(),
        });
    }
    Ok(records)
}

/// Open, read and parse one source into a batch.
pub fn load_batch(path: &Path, header_sentinel: &str) -> Result<EntityBatch, NearestError> {
    let file = File::open(path).map_err(|source| NearestError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_records(BufReader::new(file))?;
    let batch = EntityBatch::from_records(
        records
            .iter()
            .map(|r| (r.identifier.as_str(), r.latitude.as_str(), r.longitude.as_str())),
        header_sentinel,
    )?;
    debug!(
        path = %path.display(),
        records = records.len(),
        entities = batch.len(),
        "loaded source"
    );
    Ok(batch)
}
