use std::io::{self, BufWriter, Write};

pub trait DocSink {
    fn write_doc(&mut self, doc: &bson::Document) -> io::Result<()>;
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// One relaxed extended-JSON object per line.
pub struct NdjsonSink<W: Write> {
    w: BufWriter<W>,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(inner: W) -> Self {
        Self { w: BufWriter::new(inner) }
    }
}

impl<W: Write> DocSink for NdjsonSink<W> {
    fn write_doc(&mut self, doc: &bson::Document) -> io::Result<()> {
        let s = serde_json::to_string(doc)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(self.w, "{s}")
    }

    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.w.flush()
    }
}
