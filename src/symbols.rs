use std::{
    fs::OpenOptions,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::model::{self, ScrapeError};

/// Reads one ticker per line, skipping blank lines and `#` comments.
pub fn read_symbols_from_file(symbols_file_path: &str) -> model::Result<Vec<String>> {
    // Validate symbols file path
    let path = Path::new(symbols_file_path);
    if !path.exists() {
        return Err(ScrapeError::ConfigError(format!(
            "symbols file not found: {}",
            symbols_file_path
        )));
    }

    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| ScrapeError::ConfigError(format!("{}: {}", symbols_file_path, e)))?;

    let mut symbols = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            ScrapeError::ConfigError(format!("{} line {}: {}", symbols_file_path, i + 1, e))
        })?;
        let symbol = line.trim();
        if symbol.is_empty() || symbol.starts_with('#') {
            log::debug!("line {} is empty", i + 1);
            continue;
        }
        symbols.push(symbol.to_uppercase());
    }

    if symbols.is_empty() {
        return Err(ScrapeError::ConfigError(format!(
            "empty symbols file: {}",
            symbols_file_path
        )));
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reads_tickers_skipping_blanks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("symbols.txt");
        fs::write(&path, "amd\n\n  spy \n# watchlist\nTSLA\n").unwrap();

        let symbols = read_symbols_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(symbols, vec!["AMD", "SPY", "TSLA"]);
    }

    #[test]
    fn missing_or_empty_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        assert!(read_symbols_from_file(missing.to_str().unwrap()).is_err());

        let empty = dir.path().join("empty.txt");
        fs::write(&empty, "\n\n").unwrap();
        assert!(matches!(
            read_symbols_from_file(empty.to_str().unwrap()),
            Err(ScrapeError::ConfigError(_))
        ));
    }
}
