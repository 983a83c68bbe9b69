//! Publish loop
//!
//! Turns source rows into queue messages, strictly in row order. Rows that do
//! not clean into a valid employee are logged and skipped; only broker and
//! source-read failures stop the loop.

use relay_common::record::EmployeeRecord;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::publisher::Publisher;
use crate::source::SourceRow;

/// Counts reported once the source is exhausted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub published: u64,
    pub skipped: u64,
}

/// Publish every valid row from `rows` through `publisher`.
pub async fn publish_rows<I, P>(rows: I, publisher: &mut P) -> Result<PublishSummary>
where
    I: IntoIterator<Item = Result<SourceRow>>,
    P: Publisher + ?Sized,
{
    let mut summary = PublishSummary::default();

    for row in rows {
        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_row_local() => {
                warn!(error = %e, "Skipping unparsable row");
                summary.skipped += 1;
                continue;
            },
            Err(e) => return Err(e),
        };

        let record = match EmployeeRecord::clean(&row.record) {
            Ok(record) => record,
            Err(reason) => {
                warn!(line = row.line, fields = ?row.record.fields(), %reason, "Skipping invalid row");
                summary.skipped += 1;
                continue;
            },
        };

        let payload = record.to_payload()?;
        publisher.publish(row.line, &payload).await?;
        summary.published += 1;

        debug!(line = row.line, name = %record.name, "Published record");
    }

    info!(
        published = summary.published,
        skipped = summary.skipped,
        "Source exhausted"
    );

    Ok(summary)
}
