//! Row sinks that receive per-entity results as they are resolved.

use std::io::{self, Write};

/// One emitted line: an entity and the neighbor currently recorded for its
/// identifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row<'a> {
    pub index: usize,
    pub identifier: &'a str,
    pub neighbor: &'a str,
    pub distance_km: f64,
}

/// Destination for rows emitted by [`BatchEngine`](crate::BatchEngine).
pub trait RowSink {
    fn emit(&mut self, row: Row<'_>) -> io::Result<()>;
}

impl<S: RowSink + ?Sized> RowSink for &mut S {
    #[inline]
    fn emit(&mut self, row: Row<'_>) -> io::Result<()> {
        (**self).emit(row)
    }
}

/// Writes `<identifier> <neighbor> <distance_km>` lines.
pub struct WriterSink<W: Write> {
    out: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Write a free-form line, e.g. a per-source heading.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RowSink for WriterSink<W> {
    fn emit(&mut self, row: Row<'_>) -> io::Result<()> {
        writeln!(
            self.out,
            "{} {} {}",
            row.identifier, row.neighbor, row.distance_km
        )
    }
}

/// Owned copy of a [`Row`].
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedRow {
    pub index: usize,
    pub identifier: String,
    pub neighbor: String,
    pub distance_km: f64,
}

/// Keeps every emitted row in memory, in emission order.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub rows: Vec<OwnedRow>,
}

impl RowSink for CollectSink {
    fn emit(&mut self, row: Row<'_>) -> io::Result<()> {
        self.rows.push(OwnedRow {
            index: row.index,
            identifier: row.identifier.to_owned(),
            neighbor: row.neighbor.to_owned(),
            distance_km: row.distance_km,
        });
        Ok(())
    }
}

/// Drops every row.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl RowSink for Discard {
    #[inline]
    fn emit(&mut self, _row: Row<'_>) -> io::Result<()> {
        Ok(())
    }
}
