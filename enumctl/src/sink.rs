//! Newline-delimited-JSON output sink (§9 "CLI output sink"): serializes
//! each walked [`engine::graph::OutputRecord`] the driver emits, standing in
//! for a graph-database persistence backend (e.g. Neo4j) without requiring
//! a live database to exercise the core.

use std::io::Write;

use serde::Serialize;

use engine::graph::{Classification, OutputRecord};
use engine::AddressInfo;

use crate::error::Result;

#[derive(Serialize)]
struct OutputLine {
    name: String,
    addresses: Vec<AddressLine>,
    classification: &'static str,
}

#[derive(Serialize)]
struct AddressLine {
    ip: String,
    netblock: Option<String>,
    asn: Option<u32>,
    asn_description: Option<String>,
}

fn classification_str(classification: Classification) -> &'static str {
    match classification {
        Classification::Web => "web",
        Classification::Ns => "ns",
        Classification::Mx => "mx",
        Classification::Norm => "norm",
    }
}

fn to_line(record: &OutputRecord) -> OutputLine {
    OutputLine {
        name: record.name.clone(),
        addresses: record.addresses.iter().map(address_line).collect(),
        classification: classification_str(record.classification),
    }
}

fn address_line(info: &AddressInfo) -> AddressLine {
    AddressLine {
        ip: info.ip.to_string(),
        netblock: info.netblock.map(|n| n.to_string()),
        asn: info.asn,
        asn_description: info.asn_description.clone(),
    }
}

/// Writes one JSON object per line to `writer`, flushing after each record
/// so a tailing consumer sees output incrementally.
pub struct Sink<W: Write> {
    writer: W,
    emitted: usize,
}

impl<W: Write> Sink<W> {
    pub fn new(writer: W) -> Self {
        Sink { writer, emitted: 0 }
    }

    pub fn write_record(&mut self, record: &OutputRecord) -> Result<()> {
        let line = to_line(record);
        let json = serde_json::to_string(&line).expect("output record always serializes");
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        self.emitted += 1;
        Ok(())
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::graph::GraphStore;

    #[test]
    fn write_record_emits_one_json_line_per_call() {
        let graph = GraphStore::new();
        graph.add_a("a.example.com", "1.2.3.4".parse().unwrap());
        let record = graph.walk_name("a.example.com").unwrap();

        let mut buf = Vec::new();
        let mut sink = Sink::new(&mut buf);
        sink.write_record(&record).unwrap();
        sink.write_record(&record).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("\"a.example.com\""));
        assert_eq!(sink.emitted(), 2);
    }
}
