//! DNS wire encode/decode (§6 EXTERNAL INTERFACES).
//!
//! Builds outgoing query messages and parses incoming responses using
//! `hickory-proto`'s wire types directly, rather than going through
//! `hickory-resolver`'s stub resolver, so the resolver pool can own its own
//! transaction IDs, timeouts, and retry policy (§1 ambient stack).

use std::net::IpAddr;

use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::opt::{ClientSubnet, EdnsOption};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};

use crate::error::{DnsError, Rcode};
use crate::model::{AnswerRecord, RecordKind};

fn record_type_of(kind: RecordKind) -> RecordType {
    match kind {
        RecordKind::A => RecordType::A,
        RecordKind::Aaaa => RecordType::AAAA,
        RecordKind::Cname => RecordType::CNAME,
        RecordKind::Ptr => RecordType::PTR,
        RecordKind::Ns => RecordType::NS,
        RecordKind::Mx => RecordType::MX,
        RecordKind::Txt => RecordType::TXT,
        RecordKind::Soa => RecordType::SOA,
        RecordKind::Spf => RecordType::Unknown(99), // SPF(99) has no first-class RData; matched by raw type below.
        RecordKind::Srv => RecordType::SRV,
        RecordKind::Axfr => RecordType::AXFR,
    }
}

fn record_kind_of(rtype: RecordType) -> Option<RecordKind> {
    match rtype {
        RecordType::A => Some(RecordKind::A),
        RecordType::AAAA => Some(RecordKind::Aaaa),
        RecordType::CNAME => Some(RecordKind::Cname),
        RecordType::PTR => Some(RecordKind::Ptr),
        RecordType::NS => Some(RecordKind::Ns),
        RecordType::MX => Some(RecordKind::Mx),
        RecordType::TXT => Some(RecordKind::Txt),
        RecordType::SOA => Some(RecordKind::Soa),
        RecordType::SRV => Some(RecordKind::Srv),
        RecordType::Unknown(99) => Some(RecordKind::Spf),
        _ => None,
    }
}

/// Build a query message per §4.1/§6: RD=1, AA=CD=AD=0, OpCode=QUERY,
/// Class=IN, with an EDNS0 OPT carrying a location-hiding `ClientSubnet` of
/// 0.0.0.0/0.
pub fn build_query(id: u16, name: &str, kind: RecordKind) -> Result<Message, DnsError> {
    let qname = Name::from_ascii(name).map_err(|e| DnsError::transport(e.to_string()))?;
    let rtype = record_type_of(kind);

    let mut message = Message::new();
    message.set_id(id);
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(true);
    message.set_authentic_data(false);
    message.set_checking_disabled(false);

    let mut query = Query::new();
    query.set_name(qname);
    query.set_query_type(rtype);
    query.set_query_class(DNSClass::IN);
    message.add_query(query);

    let mut edns = Edns::new();
    edns.set_max_payload(4096);
    edns.options_mut().insert(EdnsOption::Subnet(ClientSubnet::new(
        IpAddr::from([0, 0, 0, 0]),
        0,
        0,
    )));
    message.set_edns(edns);

    Ok(message)
}

pub fn encode(message: &Message) -> Result<Vec<u8>, DnsError> {
    message.to_bytes().map_err(|e| DnsError::transport(e.to_string()))
}

/// Parsed reply: RCODE, truncation flag, and normalized answer records.
/// AXFR and NSEC walking each read the message directly (they need the
/// authority section / record ordering), so this only covers the common
/// answer-section path used by the Resolve API.
pub struct ParsedReply {
    pub id: u16,
    pub rcode: Rcode,
    pub truncated: bool,
    pub answers: Vec<AnswerRecord>,
    /// `NextDomain` off an NSEC record in the authority section, if one was
    /// present (§4.7 NSEC walk).
    pub nsec_next: Option<String>,
}

pub fn decode(bytes: &[u8]) -> Result<ParsedReply, DnsError> {
    let message = Message::from_bytes(bytes).map_err(|e| DnsError::transport(e.to_string()))?;
    let rcode = Rcode(u16::from(message.response_code()));
    let truncated = message.truncated();
    let answers = message.answers().iter().filter_map(record_to_answer).collect();
    let nsec_next = message
        .name_servers()
        .iter()
        .find(|r| r.record_type() == RecordType::NSEC)
        .and_then(|r| r.data())
        .and_then(|rdata| match rdata {
            RData::NSEC(nsec) => Some(nsec.next_domain_name().to_utf8()),
            _ => None,
        });

    Ok(ParsedReply {
        id: message.id(),
        rcode,
        truncated,
        answers,
        nsec_next,
    })
}

fn record_to_answer(record: &Record) -> Option<AnswerRecord> {
    let kind = record_kind_of(record.record_type())?;
    let name = record.name().to_utf8();
    let ttl = record.ttl();
    let data = rdata_to_string(record.data()?, kind)?;
    Some(AnswerRecord::new(name, kind, ttl, data))
}

/// §3 normalization: target-only for NS/MX/SRV/CNAME/PTR, SOA concatenates
/// primary-NS and responsible-mailbox, TXT/SPF join pieces with a space.
fn rdata_to_string(rdata: &RData, kind: RecordKind) -> Option<String> {
    match (kind, rdata) {
        (RecordKind::A, RData::A(ip)) => Some(ip.to_string()),
        (RecordKind::Aaaa, RData::AAAA(ip)) => Some(ip.to_string()),
        (RecordKind::Cname, RData::CNAME(name)) => Some(name.to_utf8()),
        (RecordKind::Ptr, RData::PTR(name)) => Some(name.to_utf8()),
        (RecordKind::Ns, RData::NS(name)) => Some(name.to_utf8()),
        (RecordKind::Mx, RData::MX(mx)) => Some(mx.exchange().to_utf8()),
        (RecordKind::Srv, RData::SRV(srv)) => Some(srv.target().to_utf8()),
        (RecordKind::Soa, RData::SOA(soa)) => {
            Some(format!("{} {}", soa.mname().to_utf8(), soa.rname().to_utf8()))
        }
        (RecordKind::Txt, RData::TXT(txt)) => Some(join_txt(txt)),
        (RecordKind::Spf, RData::Unknown { rdata, .. }) => Some(join_character_strings(rdata.anything())),
        _ => None,
    }
}

fn join_txt(txt: &hickory_proto::rr::rdata::TXT) -> String {
    txt.txt_data()
        .iter()
        .map(|chunk| String::from_utf8_lossy(chunk))
        .collect::<Vec<_>>()
        .join(" ")
}

/// SPF(99) has no first-class `RData`, so its rdata arrives as the raw
/// character-string sequence (one length-prefix byte then that many bytes,
/// repeated): decode each piece and join the same way `join_txt` does for TXT.
fn join_character_strings(bytes: &[u8]) -> String {
    let mut pieces = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let len = bytes[i] as usize;
        i += 1;
        let end = (i + len).min(bytes.len());
        pieces.push(String::from_utf8_lossy(&bytes[i..end]).into_owned());
        i = end;
    }
    pieces.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_query_sets_expected_flags() {
        let msg = build_query(42, "example.com", RecordKind::A).unwrap();
        assert_eq!(msg.id(), 42);
        assert!(msg.recursion_desired());
        assert!(!msg.authentic_data());
        assert!(!msg.checking_disabled());
        assert_eq!(msg.queries()[0].query_class(), DNSClass::IN);
    }

    #[test]
    fn encode_then_decode_preserves_id() {
        let msg = build_query(7, "example.com", RecordKind::Aaaa).unwrap();
        let bytes = encode(&msg).unwrap();
        let parsed = decode(&bytes).unwrap();
        assert_eq!(parsed.id, 7);
    }

    #[test]
    fn spf_character_strings_join_without_length_bytes() {
        let mut raw = vec![6];
        raw.extend_from_slice(b"v=spf1");
        raw.push(8);
        raw.extend_from_slice(b" -all...");
        assert_eq!(join_character_strings(&raw), "v=spf1  -all...");
    }
}
