//! Dataset loading and schema validation.
//!
//! Reads a delimited text or Parquet file into a [`RecordTable`]. Loading is
//! a single synchronous read; any failure is fatal for the pipeline.

use crate::error::{PipelineError, Result};
use crate::types::RecordTable;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Number of rows used for CSV schema inference.
const INFER_SCHEMA_ROWS: usize = 1000;

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Tsv,
    Parquet,
}

impl SourceFormat {
    /// Pick a format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" | "txt" => Ok(Self::Tsv),
            "parquet" | "pq" => Ok(Self::Parquet),
            _ => Err(PipelineError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Loader for the raw sales table.
pub struct DatasetLoader;

impl DatasetLoader {
    /// Load and validate the dataset at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<RecordTable> {
        let path = path.as_ref();
        info!("Loading dataset from: {}", path.display());

        let df = Self::read_dataframe(path)?;
        info!("Dataset loaded: {:?}", df.shape());

        RecordTable::new(df)
    }

    /// Read `path` into a DataFrame without schema validation.
    pub fn read_dataframe(path: &Path) -> Result<DataFrame> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.display().to_string()));
        }

        match SourceFormat::from_path(path)? {
            SourceFormat::Csv => Self::read_delimited(path, b','),
            SourceFormat::Tsv => Self::read_delimited(path, b'\t'),
            SourceFormat::Parquet => {
                let file = File::open(path)?;
                ParquetReader::new(file)
                    .finish()
                    .map_err(|e| PipelineError::LoadFailed(e.to_string()))
            }
        }
    }

    /// Read delimited text, falling back to an all-string schema when
    /// inference fails on messy columns. The cleaner parses strings leniently.
    fn read_delimited(path: &Path, separator: u8) -> Result<DataFrame> {
        match Self::csv_options(separator, Some(INFER_SCHEMA_ROWS))
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))
            .and_then(|reader| reader.finish())
        {
            Ok(df) => return Ok(df),
            Err(e) => {
                debug!("Typed loading failed, retrying with string schema: {}", e);
            }
        }

        Self::csv_options(separator, Some(0))
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))
            .and_then(|reader| reader.finish())
            .map_err(|e| PipelineError::LoadFailed(e.to_string()))
    }

    fn csv_options(separator: u8, infer_schema_length: Option<usize>) -> CsvReadOptions {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(infer_schema_length)
            .with_parse_options(
                CsvParseOptions::default()
                    .with_separator(separator)
                    .with_quote_char(Some(b'"')),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("vgsales_loader_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            SourceFormat::from_path(Path::new("a.CSV")).unwrap(),
            SourceFormat::Csv
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("a.parquet")).unwrap(),
            SourceFormat::Parquet
        );
        assert!(matches!(
            SourceFormat::from_path(Path::new("a.xlsx")),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = DatasetLoader::load("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
        assert!(err.is_fatal_load());
    }

    #[test]
    fn test_load_valid_csv() {
        let path = write_temp(
            "valid.csv",
            "title,console,genre,na_sales,jp_sales,pal_sales,other_sales,total_sales\n\
             A,PS4,Action,1.0,0.5,,0.1,1.6\n",
        );
        let table = DatasetLoader::load(&path).unwrap();
        assert_eq!(table.height(), 1);
    }

    #[test]
    fn test_load_tab_separated() {
        let path = write_temp(
            "valid.tsv",
            "title\tconsole\tgenre\tna_sales\tjp_sales\tpal_sales\tother_sales\ttotal_sales\n\
             A\tPC\tRacing\t0.1\t0\t0\t0\t0.1\n",
        );
        let table = DatasetLoader::load(&path).unwrap();
        assert_eq!(table.dataframe().width(), 8);
    }

    #[test]
    fn test_missing_required_columns() {
        let path = write_temp("no_sales.csv", "title,console,genre\nA,PS4,Action\n");
        match DatasetLoader::load(&path) {
            Err(PipelineError::MissingColumns { columns }) => {
                assert_eq!(columns.len(), 5);
                assert!(columns.contains(&"na_sales".to_string()));
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }
}
