use crate::error::{LedgerError, Result};
use crate::interfaces::commands::CommandRecord;
use std::io::Read;

/// Reads ledger commands from a CSV source.
///
/// Whitespace around fields is trimmed and rows may omit trailing columns
/// the command type does not need.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes one record per row. A malformed row yields an
    /// error item and the stream continues with the next row.
    pub fn records(self) -> impl Iterator<Item = Result<CommandRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }
}
