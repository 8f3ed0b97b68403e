//! Watchlist export in TradingView format.

use std::fs;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};

use crate::error::RankingError;
use crate::sources::RankingType;

/// Exchange prefix expected by the charting tool for Tokyo listings.
const EXCHANGE_PREFIX: &str = "TSE";

/// Writes ranking snapshots as single-line watchlist files under a configured
/// output directory.
pub struct WatchlistExporter {
    output_dir: PathBuf,
}

impl WatchlistExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Renders `codes` as one comma-joined `TSE:CODE` line and writes it to
    /// `<filename-label>_<YYYYMMDD>.txt`, creating the output directory if
    /// absent. The date is the site-reported update date when known, else
    /// today. An existing file of the same name is overwritten.
    pub fn export(
        &self,
        codes: &[String],
        ranking: RankingType,
        updated_on: Option<NaiveDate>,
    ) -> Result<PathBuf, RankingError> {
        fs::create_dir_all(&self.output_dir)?;

        let date = updated_on.unwrap_or_else(|| Local::now().date_naive());
        let filename = format!(
            "{}_{}.txt",
            ranking.filename_label(),
            date.format("%Y%m%d")
        );
        let path = self.output_dir.join(filename);

        let line = codes
            .iter()
            .map(|code| format!("{EXCHANGE_PREFIX}:{code}"))
            .collect::<Vec<_>>()
            .join(",");
        fs::write(&path, line)?;

        tracing::info!(path = %path.display(), codes = codes.len(), "wrote watchlist");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn export_writes_named_single_line_file() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = WatchlistExporter::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();

        let path = exporter
            .export(&codes(&["7203", "6758"]), RankingType::Up, Some(date))
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "値上がり_20250115.txt"
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "TSE:7203,TSE:6758");
    }

    #[test]
    fn export_without_update_date_uses_today() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = WatchlistExporter::new(dir.path());

        let path = exporter
            .export(&codes(&["9984"]), RankingType::Tick, None)
            .unwrap();

        let expected = format!(
            "ティック回数_{}.txt",
            Local::now().date_naive().format("%Y%m%d")
        );
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), expected);
    }

    #[test]
    fn export_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = WatchlistExporter::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();

        exporter
            .export(&codes(&["7203"]), RankingType::Down, Some(date))
            .unwrap();
        let path = exporter
            .export(&codes(&["6758"]), RankingType::Down, Some(date))
            .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "TSE:6758");
    }

    #[test]
    fn export_creates_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("lists");
        let exporter = WatchlistExporter::new(&nested);
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();

        let path = exporter
            .export(&codes(&["8306"]), RankingType::Volume, Some(date))
            .unwrap();

        assert!(path.starts_with(&nested));
        assert_eq!(fs::read_to_string(&path).unwrap(), "TSE:8306");
    }
}
