use crate::error::{CorpusError, RecipeError, Result};
use std::fs;
use std::path::Path;

pub const TEXT_COLUMN: &str = "text";
pub const REFERENCE_COLUMN: &str = "ref";
pub const SOURCE_COLUMN: &str = "source";
pub const TRANSLATED_COLUMN: &str = "translated";
pub const SIMILARITY_COLUMN: &str = "similarity_score";

/// One row's view of the columns a recipe cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit<'a> {
    pub text: &'a str,
    pub reference: Option<&'a str>,
    pub source: Option<&'a str>,
}

/// An in-memory CSV table. Every input column is kept so the output file
/// carries the input columns plus whatever a recipe adds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Corpus {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Short rows are padded; a row wider than the header is an error.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path.as_ref())?;
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() > headers.len() {
                return Err(CorpusError::ExtraFields {
                    line: record.position().map(|p| p.line()).unwrap_or(0),
                    expected: headers.len(),
                    got: record.len(),
                }
                .into());
            }
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        Ok(Self::new(headers, rows))
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| RecipeError::MissingColumn(name.to_string()).into())
    }

    /// Cell values of a column, `None` when the column is absent.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    /// Adds the column, or overwrites it when it already exists.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(RecipeError::RowCountMismatch {
                expected: self.rows.len(),
                got: values.len(),
            }
            .into());
        }

        let idx = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                self.headers.push(name.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
                self.headers.len() - 1
            }
        };

        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        Ok(())
    }

    /// Rows as translation units. Empty `ref`/`source` cells count as absent.
    pub fn units(&self) -> Result<Vec<TranslationUnit<'_>>> {
        let text = self.require_column(TEXT_COLUMN)?;
        let reference = self.column_index(REFERENCE_COLUMN);
        let source = self.column_index(SOURCE_COLUMN);
        Ok(self
            .rows
            .iter()
            .map(|row| TranslationUnit {
                text: row[text].as_str(),
                reference: non_empty(row, reference),
                source: non_empty(row, source),
            })
            .collect())
    }
}

fn non_empty(row: &[String], idx: Option<usize>) -> Option<&str> {
    idx.map(|i| row[i].as_str()).filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Corpus {
        Corpus::new(
            vec!["text".into(), "ref".into(), "source".into()],
            vec![
                vec!["Hello".into(), "Bonjour".into(), "bible".into()],
                vec!["Bye".into(), "".into()],
            ],
        )
    }

    #[test]
    fn pads_short_rows_and_reads_units() {
        let corpus = sample();
        let units = corpus.units().unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].reference, Some("Bonjour"));
        assert_eq!(units[0].source, Some("bible"));
        assert_eq!(units[1].reference, None);
        assert_eq!(units[1].source, None);
    }

    #[test]
    fn units_require_text_column() {
        let corpus = Corpus::new(vec!["sentence".into()], vec![vec!["x".into()]]);
        assert!(corpus.units().is_err());
    }

    #[test]
    fn set_column_appends_then_overwrites() {
        let mut corpus = sample();
        corpus
            .set_column("translated", vec!["a".into(), "b".into()])
            .unwrap();
        assert_eq!(corpus.headers().len(), 4);
        corpus
            .set_column("translated", vec!["c".into(), "d".into()])
            .unwrap();
        assert_eq!(corpus.headers().len(), 4);
        assert_eq!(corpus.column("translated").unwrap(), vec!["c", "d"]);
        assert!(corpus.set_column("x", vec!["only one".into()]).is_err());
    }

    #[test]
    fn writes_and_reads_back_quoted_cells() {
        let mut path = std::env::temp_dir();
        path.push(format!("nsanku_corpus_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        let file = path.join("nested").join("en-fr.csv");

        let corpus = Corpus::new(
            vec!["text".into()],
            vec![vec!["Hello, \"world\"\nagain".into()]],
        );
        corpus.write(&file).unwrap();
        let back = Corpus::read(&file).unwrap();
        assert_eq!(back, corpus);
    }

    #[test]
    fn rows_wider_than_header_are_rejected() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("nsanku_corpus_wide_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let wide = dir.join("en-fr.csv");
        fs::write(&wide, "text,ref\nhello,bonjour,EXTRA\n").unwrap();
        let err = Corpus::read(&wide).unwrap_err();
        assert_eq!(err.kind(), "corpus");

        let short = dir.join("en-tw.csv");
        fs::write(&short, "text,ref\nhello\n").unwrap();
        let corpus = Corpus::read(&short).unwrap();
        assert_eq!(corpus.cell(0, "ref"), Some(""));
    }
}
