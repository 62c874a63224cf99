//! The ingestion loop
//!
//! Pages are handled strictly one at a time: fetch, check and decode every
//! record, write the page in one transaction, then follow the cursor. The
//! run stops at the first page whose cursor is [`Cursor::Done`].

use crate::config::{DecodePolicy, EntityKind, IngestConfig};
use crate::error::{IngestError, Result};
use crate::ingest::decoder::RecordDecoder;
use crate::ingest::encoder::NestedValueEncoder;
use crate::ingest::fetcher::PageSource;
use crate::ingest::types::{Cursor, Page, Record};
use crate::schema::{SchemaConformanceChecker, UnknownField};
use crate::store::{Checkpoint, SqliteWriter};
use std::collections::HashSet;
use tracing::{info, warn};

/// A record left out of the batch under [`DecodePolicy::SkipRecord`]
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    pub index: usize,
    pub reason: String,
}

/// Result of checking and decoding one page
#[derive(Debug, Clone, Default)]
pub struct PageOutcome {
    pub records: Vec<Record>,
    pub diagnostics: Vec<UnknownField>,
    pub skipped: Vec<SkippedRecord>,
}

/// Totals for a finished run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestSummary {
    pub pages: u64,
    pub rows: u64,
    pub diagnostics: u64,
    pub skipped: u64,
    /// URL the run resumed from, if it continued a checkpoint
    pub resumed_from: Option<String>,
}

enum DriverState {
    Fetching(String),
    Processing { url: String, page: Page },
    Done,
}

/// Drives paginated ingestion of one entity kind
pub struct IngestionDriver<'a> {
    kind: &'a EntityKind,
    config: &'a IngestConfig,
}

impl<'a> IngestionDriver<'a> {
    pub fn new(kind: &'a EntityKind, config: &'a IngestConfig) -> Self {
        IngestionDriver { kind, config }
    }

    /// Run until the final page has been written
    pub fn run<S: PageSource + ?Sized>(
        &self,
        source: &mut S,
        writer: &mut SqliteWriter,
    ) -> Result<IngestSummary> {
        let schema = self.kind.schema();
        let table = self.kind.table();
        writer.ensure_table(table, schema)?;

        let mut summary = IngestSummary::default();
        let mut visited = HashSet::new();

        let (mut state, mut pages_committed) = match self.start_url(writer)? {
            Some((url, previous_pages)) => {
                if previous_pages > 0 {
                    summary.resumed_from = Some(url.clone());
                }
                (DriverState::Fetching(url), previous_pages)
            }
            None => (DriverState::Done, 0),
        };

        loop {
            state = match state {
                DriverState::Fetching(url) => {
                    if !visited.insert(url.clone()) {
                        return Err(IngestError::MalformedPage(format!(
                            "pagination revisits '{url}'"
                        )));
                    }
                    let page = source.fetch(&url)?;
                    info!(url = %url, records = page.records.len(), "fetched page");
                    DriverState::Processing { url, page }
                }
                DriverState::Processing { url, page } => {
                    let outcome = self.process_page(&page)?;
                    summary.diagnostics += outcome.diagnostics.len() as u64;
                    summary.skipped += outcome.skipped.len() as u64;

                    let rows = outcome
                        .records
                        .into_iter()
                        .map(|record| NestedValueEncoder::flatten(schema, record))
                        .collect::<Result<Vec<_>>>()?;

                    summary.pages += 1;
                    pages_committed += 1;
                    let progress = Checkpoint {
                        target: table.to_string(),
                        next_url: page.cursor.next_url().map(str::to_string),
                        pages: pages_committed,
                        completed: page.cursor.is_done(),
                    };
                    let written = writer.write_batch(table, schema, &rows, Some(&progress))?;
                    summary.rows += written as u64;
                    info!(url = %url, rows = written, table, "page written");

                    match page.cursor {
                        Cursor::Next(next) => {
                            info!(next = %next, "next url to fetch");
                            DriverState::Fetching(next)
                        }
                        Cursor::Done => DriverState::Done,
                    }
                }
                DriverState::Done => break,
            };
        }

        info!(
            kind = self.kind.name(),
            pages = summary.pages,
            rows = summary.rows,
            diagnostics = summary.diagnostics,
            skipped = summary.skipped,
            "ingestion finished"
        );
        Ok(summary)
    }

    /// Check and decode every record of a page. Unknown fields are reported
    /// before decoding so they are visible even though decoding drops them.
    pub fn process_page(&self, page: &Page) -> Result<PageOutcome> {
        let schema = self.kind.schema();
        let normalizer = self.kind.normalizer();
        let checker = SchemaConformanceChecker::new(schema, normalizer, &self.config.pagination_key);
        let decoder = RecordDecoder::new(schema, normalizer);

        let mut outcome = PageOutcome::default();
        for (index, raw) in page.records.iter().enumerate() {
            outcome.diagnostics.extend(checker.report(raw));

            match decoder.decode(index, raw) {
                Ok(record) => outcome.records.push(record),
                Err(err @ IngestError::Decode { .. })
                    if self.config.on_decode_error == DecodePolicy::SkipRecord =>
                {
                    warn!(index, error = %err, "skipping record");
                    outcome.skipped.push(SkippedRecord {
                        index,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(outcome)
    }

    /// First URL of the run and the number of pages already committed
    /// before it, or `None` when a resumed run has nothing left to do
    fn start_url(&self, writer: &SqliteWriter) -> Result<Option<(String, u64)>> {
        if !self.config.resume {
            return Ok(Some((self.kind.initial_url().to_string(), 0)));
        }

        match writer.load_checkpoint(self.kind.table())? {
            Some(checkpoint) if checkpoint.completed => {
                info!(table = self.kind.table(), "previous run completed, nothing to resume");
                Ok(None)
            }
            Some(Checkpoint {
                next_url: Some(url),
                pages,
                ..
            }) => {
                info!(url = %url, pages, "resuming from checkpoint");
                Ok(Some((url, pages)))
            }
            _ => Ok(Some((self.kind.initial_url().to_string(), 0))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, NormalizationRules, Schema};
    use serde_json::json;

    fn kind() -> EntityKind {
        let schema = Schema::new(vec![Field::text("Name"), Field::integer("Strength")]).unwrap();
        EntityKind::new("test", schema, NormalizationRules::new(), "p1", "test_imports").unwrap()
    }

    fn page() -> Page {
        Page::from_value(json!({
            "next": null,
            "results": [
                {"name": "Ogre", "strength": 19},
                {"name": "Bad", "strength": "very"},
                {"name": "Troll", "strength": 18, "regeneration": 10}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_abort_policy_fails_page() {
        let kind = kind();
        let config = IngestConfig::default();
        let driver = IngestionDriver::new(&kind, &config);

        let result = driver.process_page(&page());
        assert!(matches!(result, Err(IngestError::Decode { index: 1, .. })));
    }

    #[test]
    fn test_skip_policy_keeps_good_records() {
        let kind = kind();
        let config = IngestConfig {
            on_decode_error: DecodePolicy::SkipRecord,
            ..IngestConfig::default()
        };
        let driver = IngestionDriver::new(&kind, &config);

        let outcome = driver.process_page(&page()).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].index, 1);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].key, "regeneration");
    }
}
