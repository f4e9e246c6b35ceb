//! Batch processing over song tables.
//!
//! A corpus is a directory of CSV files, one row per song, with at least a
//! `lyrics` and a `lyrics_available` column. Labelled corpora also carry a
//! `Classname` column naming the gold mood.
//!
//! [`MoodPredictor::predict`] is per-document. Batches here skip documents
//! that fail on their own ([`Error::is_per_document`]) and keep going; any
//! other error stops the batch.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::labels::LabelSet;
use crate::predict::{MoodPredictor, Prediction};
use crate::{Error, Result};

/// One row of a song table. Unknown columns are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SongRecord {
    /// Song title.
    #[serde(rename = "Song Name", default)]
    pub name: Option<String>,
    /// Performer.
    #[serde(rename = "Author", default)]
    pub author: Option<String>,
    /// Gold mood, when the table is labelled.
    #[serde(rename = "Classname", default)]
    pub classname: Option<String>,
    /// Whether `lyrics` was actually fetched.
    #[serde(default, deserialize_with = "flag")]
    pub lyrics_available: bool,
    /// Song text.
    #[serde(default)]
    pub lyrics: Option<String>,
}

impl SongRecord {
    /// Trimmed lyrics, if the row has usable text.
    #[must_use]
    pub fn usable_lyrics(&self) -> Option<&str> {
        if !self.lyrics_available {
            return None;
        }
        self.lyrics
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

// Tables written by pandas spell booleans `True`/`False`.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    ))
}

/// Read every `*.csv` file directly under `dir`, in file-name order.
///
/// # Errors
///
/// Returns [`Error::Io`] if `dir` cannot be listed or holds no CSV files, and
/// [`Error::Csv`] for a malformed table.
pub fn load_csv_dir(dir: &Path) -> Result<Vec<SongRecord>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    if files.is_empty() {
        return Err(Error::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no CSV files"),
        ));
    }
    files.sort();

    let mut records = Vec::new();
    for file in &files {
        let before = records.len();
        let mut reader = csv::Reader::from_path(file)?;
        for row in reader.deserialize() {
            records.push(row?);
        }
        log::debug!("{}: {} rows", file.display(), records.len() - before);
    }
    log::info!("loaded {} rows from {} CSV files", records.len(), files.len());
    Ok(records)
}

/// A song's predicted mood and embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongEmbedding {
    /// Song title.
    pub name: Option<String>,
    /// Performer.
    pub author: Option<String>,
    /// Predicted mood.
    pub label: String,
    /// Length of the trimmed lyrics in characters.
    pub lyrics_length: usize,
    /// Pooled document embedding.
    pub embedding: Vec<f32>,
}

/// Outcome of embedding a corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusReport {
    /// Embedded songs, in input order.
    pub songs: Vec<SongEmbedding>,
    /// Rows without usable lyrics, or whose prediction failed per-document.
    pub skipped: usize,
}

/// Predict every row with usable lyrics.
///
/// # Errors
///
/// Returns the first error that is not [`per-document`](Error::is_per_document).
pub fn embed_corpus(predictor: &MoodPredictor, records: &[SongRecord]) -> Result<CorpusReport> {
    embed_with(records, |text| predictor.predict(text))
}

/// [`embed_corpus`] with the prediction step supplied by the caller.
///
/// # Errors
///
/// See [`embed_corpus`].
pub fn embed_with<F>(records: &[SongRecord], mut predict: F) -> Result<CorpusReport>
where
    F: FnMut(&str) -> Result<Prediction>,
{
    let mut report = CorpusReport::default();
    for (row, record) in records.iter().enumerate() {
        let Some(lyrics) = record.usable_lyrics() else {
            report.skipped += 1;
            continue;
        };
        match predict(lyrics) {
            Ok(prediction) => report.songs.push(SongEmbedding {
                name: record.name.clone(),
                author: record.author.clone(),
                label: prediction.label,
                lyrics_length: lyrics.chars().count(),
                embedding: prediction.embedding,
            }),
            Err(err) if err.is_per_document() => {
                log::warn!("skipping row {row}: {err}");
                report.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }
    log::info!(
        "embedded {} songs, skipped {}",
        report.songs.len(),
        report.skipped
    );
    Ok(report)
}

/// Accuracy and confusion matrix over labelled rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    /// Class names, indexing both axes of `confusion`.
    pub labels: Vec<String>,
    /// `confusion[gold][predicted]` counts.
    pub confusion: Vec<Vec<usize>>,
    /// Rows scored.
    pub evaluated: usize,
    /// Rows without usable lyrics or a known gold label, or that failed
    /// per-document.
    pub skipped: usize,
}

impl Evaluation {
    fn new(labels: &LabelSet) -> Self {
        Self {
            labels: labels.iter().map(str::to_string).collect(),
            confusion: vec![vec![0; labels.len()]; labels.len()],
            evaluated: 0,
            skipped: 0,
        }
    }

    /// Rows where the prediction matched the gold label.
    #[must_use]
    pub fn correct(&self) -> usize {
        self.confusion
            .iter()
            .enumerate()
            .map(|(i, row)| row[i])
            .sum()
    }

    /// Fraction of scored rows predicted correctly, `None` if none were
    /// scored.
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        (self.evaluated > 0).then(|| self.correct() as f64 / self.evaluated as f64)
    }
}

/// Score a predictor against the `Classname` column.
///
/// # Errors
///
/// See [`embed_corpus`].
pub fn evaluate(predictor: &MoodPredictor, records: &[SongRecord]) -> Result<Evaluation> {
    evaluate_with(predictor.labels(), records, |text| predictor.predict(text))
}

/// [`evaluate`] with the prediction step supplied by the caller.
///
/// # Errors
///
/// See [`embed_corpus`].
pub fn evaluate_with<F>(
    labels: &LabelSet,
    records: &[SongRecord],
    mut predict: F,
) -> Result<Evaluation>
where
    F: FnMut(&str) -> Result<Prediction>,
{
    let mut evaluation = Evaluation::new(labels);
    for (row, record) in records.iter().enumerate() {
        let gold = record
            .classname
            .as_deref()
            .and_then(|name| labels.index(name.trim()));
        let (Some(gold), Some(lyrics)) = (gold, record.usable_lyrics()) else {
            evaluation.skipped += 1;
            continue;
        };
        match predict(lyrics) {
            Ok(prediction) => {
                let predicted = prediction.class_index;
                if predicted >= labels.len() {
                    return Err(Error::LabelOutOfRange {
                        index: predicted,
                        len: labels.len(),
                    });
                }
                evaluation.confusion[gold][predicted] += 1;
                evaluation.evaluated += 1;
            }
            Err(err) if err.is_per_document() => {
                log::warn!("skipping row {row}: {err}");
                evaluation.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }
    if let Some(accuracy) = evaluation.accuracy() {
        log::info!(
            "accuracy {:.4} over {} rows",
            accuracy,
            evaluation.evaluated
        );
    }
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
Song Name,Author,Classname,lyrics_available,lyrics,seeds
One,A,party,True,  dance all night  ,x
Two,B,heartbroken,False,,y
Three,C,party,True,   ,z
Four,D,,true,alone again,w
";

    fn records() -> Vec<SongRecord> {
        csv::Reader::from_reader(TABLE.as_bytes())
            .deserialize()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    }

    fn fixed(label: &str, class_index: usize) -> Prediction {
        Prediction {
            label: label.to_string(),
            class_index,
            logits: vec![],
            embedding: vec![1.0, 2.0],
        }
    }

    #[test]
    fn test_parse_pandas_table() {
        let rows = records();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].name.as_deref(), Some("One"));
        assert!(rows[0].lyrics_available);
        assert!(!rows[1].lyrics_available);
        assert_eq!(rows[1].lyrics, None);
        assert_eq!(rows[3].classname, None);
    }

    #[test]
    fn test_usable_lyrics_filters_and_trims() {
        let rows = records();
        let usable: Vec<_> = rows.iter().map(SongRecord::usable_lyrics).collect();
        assert_eq!(
            usable,
            vec![Some("dance all night"), None, None, Some("alone again")]
        );
    }

    #[test]
    fn test_embed_skips_unusable_rows() {
        let mut seen = Vec::new();
        let report = embed_with(&records(), |text| {
            seen.push(text.to_string());
            Ok(fixed("party", 6))
        })
        .unwrap();
        assert_eq!(seen, vec!["dance all night", "alone again"]);
        assert_eq!(report.songs.len(), 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.songs[0].lyrics_length, 15);
        assert_eq!(report.songs[1].author.as_deref(), Some("D"));
    }

    #[test]
    fn test_embed_continues_past_per_document_errors() {
        let report = embed_with(&records(), |text| {
            if text.starts_with("dance") {
                Err(Error::DegenerateChunking)
            } else {
                Ok(fixed("loneliness", 3))
            }
        })
        .unwrap();
        assert_eq!(report.songs.len(), 1);
        assert_eq!(report.skipped, 3);
    }

    #[test]
    fn test_embed_aborts_on_model_errors() {
        let err = embed_with(&records(), |_| Err(Error::Tokenizer("broken".into())))
            .unwrap_err();
        assert!(matches!(err, Error::Tokenizer(_)));
    }

    #[test]
    fn test_evaluate_confusion() {
        let labels = LabelSet::moods();
        let evaluation =
            evaluate_with(&labels, &records(), |_| Ok(fixed("heartbroken", 1))).unwrap();
        // Only row One has both lyrics and a known gold label.
        assert_eq!(evaluation.evaluated, 1);
        assert_eq!(evaluation.skipped, 3);
        assert_eq!(evaluation.confusion[6][1], 1);
        assert_eq!(evaluation.correct(), 0);
        assert_eq!(evaluation.accuracy(), Some(0.0));
    }

    #[test]
    fn test_accuracy_undefined_without_rows() {
        let evaluation = evaluate_with(&LabelSet::moods(), &[], |_| unreachable!()).unwrap();
        assert_eq!(evaluation.accuracy(), None);
    }

    #[test]
    fn test_load_csv_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_csv_dir(dir.path()), Err(Error::Io { .. })));

        std::fs::write(dir.path().join("b.csv"), TABLE).unwrap();
        std::fs::write(dir.path().join("a.CSV"), "lyrics,lyrics_available\nhi,True\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let rows = load_csv_dir(dir.path()).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].lyrics.as_deref(), Some("hi"));
        assert_eq!(rows[0].name, None);
    }
}
