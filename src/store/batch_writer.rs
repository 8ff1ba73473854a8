use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use csv::WriterBuilder;

use crate::model::{self, OptionContractRecord, SaveFormat, ScrapeError};

/// Splits a record stream into `{PREFIX}_part1.csv`, `{PREFIX}_part2.csv`, ...
/// each holding at most `batch_size` records.
pub struct BatchWriter {
    output_dir: PathBuf,
    batch_size: usize,
    format: SaveFormat,
    prefix: String,
}

impl BatchWriter {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        batch_size: usize,
        format: SaveFormat,
        prefix: &str, // Usually the ticker.
    ) -> model::Result<Self> {
        if batch_size == 0 {
            return Err(ScrapeError::ConfigError(
                "batch size must be at least 1".into(),
            ));
        }
        Ok(Self {
            output_dir: output_dir.into(),
            batch_size,
            format,
            prefix: prefix.trim().to_uppercase(),
        })
    }

    pub fn path_for(&self, part: usize) -> PathBuf {
        self.output_dir.join(format!(
            "{}_part{}.{}",
            self.prefix,
            part,
            self.format.extension()
        ))
    }

    /// Drains `records`, writing a file whenever a batch fills and once more
    /// for the remainder. A record error stops the run; the unfinished batch
    /// is dropped and files already written stay on disk.
    pub fn write_all<I>(&self, records: I) -> model::Result<Vec<PathBuf>>
    where
        I: IntoIterator<Item = model::Result<OptionContractRecord>>,
    {
        fs::create_dir_all(&self.output_dir).map_err(|e| ScrapeError::write(&self.output_dir, e))?;

        let mut written = Vec::new();
        let mut batch = Vec::with_capacity(self.batch_size);
        for record in records {
            batch.push(record?);
            if batch.len() == self.batch_size {
                written.push(self.write_batch(written.len() + 1, &batch)?);
                batch.clear();
            }
        }
        if !batch.is_empty() {
            written.push(self.write_batch(written.len() + 1, &batch)?);
        }

        log::info!(
            "wrote {} file(s) for {} to {}",
            written.len(),
            self.prefix,
            self.output_dir.display()
        );
        Ok(written)
    }

    fn write_batch(&self, part: usize, batch: &[OptionContractRecord]) -> model::Result<PathBuf> {
        let path = self.path_for(part);
        match self.format {
            SaveFormat::Csv => write_csv(&path, batch)?,
            SaveFormat::Json => write_json(&path, batch)?,
        }
        log::info!("Successfully saved {} records to {}", batch.len(), path.display());
        Ok(path)
    }
}

// The header is written once from RECORD_KEYS; rows serialize in the same order.
fn write_csv(path: &Path, batch: &[OptionContractRecord]) -> model::Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| ScrapeError::write(path, e))?;
    writer
        .write_record(model::RECORD_KEYS)
        .map_err(|e| ScrapeError::write(path, e))?;
    for record in batch {
        writer
            .serialize(record)
            .map_err(|e| ScrapeError::write(path, e))?;
    }
    writer.flush().map_err(|e| ScrapeError::write(path, e))
}

fn write_json(path: &Path, batch: &[OptionContractRecord]) -> model::Result<()> {
    let file = File::create(path).map_err(|e| ScrapeError::write(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, batch).map_err(|e| ScrapeError::write(path, e))?;
    writer.flush().map_err(|e| ScrapeError::write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn records(count: usize) -> Vec<OptionContractRecord> {
        (0..count)
            .map(|i| {
                let strike = 100 + i * 5;
                let is_call = i % 2 == 0;
                OptionContractRecord {
                    root: "AMD".into(),
                    calls: is_call.then(|| format!("amd--250711c{:05}000", strike)),
                    last: Some(format!("{}.{:02}", i, i)),
                    chg: Some("-0.05".into()),
                    bid: if i == 1 { Some("--".into()) } else { Some("1.10".into()) },
                    ask: Some("1,201.25".into()),
                    vol: if i == 2 { None } else { Some("1,204".into()) },
                    open_int: Some("905".into()),
                    strike: Some(format!("{}.00", strike)),
                    puts: (!is_call).then(|| format!("amd--250711p{:05}000", strike)),
                    expiry_date: "2025-07-11".into(),
                }
            })
            .collect()
    }

    fn read_csv(path: &Path) -> Vec<OptionContractRecord> {
        csv::Reader::from_path(path)
            .unwrap()
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn splits_into_ceil_m_over_n_files() {
        let dir = tempdir().unwrap();
        let writer = BatchWriter::new(dir.path().join("out"), 2, SaveFormat::Csv, "amd").unwrap();
        let input = records(5);

        let files = writer.write_all(input.clone().into_iter().map(Ok)).unwrap();

        assert_eq!(files.len(), 3);
        assert_eq!(files[0], dir.path().join("out").join("AMD_part1.csv"));
        assert_eq!(files[2], dir.path().join("out").join("AMD_part3.csv"));
        let sizes: Vec<usize> = files.iter().map(|f| read_csv(f).len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);

        let roundtrip: Vec<_> = files.iter().flat_map(|f| read_csv(f)).collect();
        assert_eq!(roundtrip, input);
    }

    #[test]
    fn csv_header_matches_record_keys() {
        let dir = tempdir().unwrap();
        let writer = BatchWriter::new(dir.path(), 10, SaveFormat::Csv, "AMD").unwrap();
        let files = writer.write_all(records(1).into_iter().map(Ok)).unwrap();

        let mut reader = csv::Reader::from_path(&files[0]).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, model::RECORD_KEYS);
    }

    #[test]
    fn json_batches_are_arrays_of_records() {
        let dir = tempdir().unwrap();
        let writer = BatchWriter::new(dir.path(), 3, SaveFormat::Json, "AMD").unwrap();
        let input = records(4);

        let files = writer.write_all(input.clone().into_iter().map(Ok)).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].extension().unwrap(), "json");

        let mut roundtrip = Vec::new();
        for file in &files {
            let batch: Vec<OptionContractRecord> =
                serde_json::from_slice(&fs::read(file).unwrap()).unwrap();
            assert!(batch.len() <= 3);
            roundtrip.extend(batch);
        }
        assert_eq!(roundtrip, input);

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&files[0]).unwrap()).unwrap();
        assert!(raw[0].get("Open Int").is_some());
        assert!(raw[0].get("Expiry Date").is_some());
    }

    #[test]
    fn no_records_no_files() {
        let dir = tempdir().unwrap();
        let writer = BatchWriter::new(dir.path(), 3, SaveFormat::Csv, "AMD").unwrap();
        let files = writer
            .write_all(Vec::<model::Result<OptionContractRecord>>::new())
            .unwrap();
        assert!(files.is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let result = BatchWriter::new("out", 0, SaveFormat::Csv, "AMD");
        assert!(matches!(result, Err(ScrapeError::ConfigError(_))));
    }

    #[test]
    fn record_error_keeps_finished_files_and_drops_the_rest() {
        let dir = tempdir().unwrap();
        let writer = BatchWriter::new(dir.path(), 2, SaveFormat::Csv, "AMD").unwrap();
        let mut input: Vec<model::Result<OptionContractRecord>> =
            records(3).into_iter().map(Ok).collect();
        input.push(Err(ScrapeError::SchemaError("broken row".into())));

        let err = writer.write_all(input).unwrap_err();
        assert!(matches!(err, ScrapeError::SchemaError(_)));
        assert!(writer.path_for(1).exists());
        assert!(!writer.path_for(2).exists());
    }

    #[test]
    fn unwritable_output_is_write_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();
        let writer = BatchWriter::new(&blocker, 2, SaveFormat::Json, "AMD").unwrap();

        let err = writer.write_all(records(1).into_iter().map(Ok)).unwrap_err();
        assert!(matches!(err, ScrapeError::WriteError(..)));
    }
}
