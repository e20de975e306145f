//! DNS Wire Format
//!
//! Just enough of RFC 1035 to read the question section of a query and
//! write an authoritative reply carrying A and AAAA answers.

use crate::dns::handler::Answer;
use std::net::IpAddr;

/// DNS packet constants
pub const DNS_HEADER_SIZE: usize = 12;
pub const DNS_MAX_PACKET_SIZE: usize = 512;

/// DNS record types
pub const TYPE_A: u16 = 1;
pub const TYPE_AAAA: u16 = 28;

/// DNS classes
pub const CLASS_IN: u16 = 1;

/// DNS flags
const FLAG_QR: u16 = 0x8000; // Query/Response
const OPCODE_MASK: u16 = 0x7800;
const FLAG_AA: u16 = 0x0400; // Authoritative Answer
const FLAG_TC: u16 = 0x0200; // Truncated
const FLAG_RD: u16 = 0x0100; // Recursion Desired

/// One entry of the question section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Fully qualified name with trailing dot, case preserved
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

/// A parsed query message
#[derive(Debug, Clone)]
pub struct Query {
    pub id: u16,
    pub flags: u16,
    pub questions: Vec<Question>,
}

/// Parse a query message
pub fn parse_query(packet: &[u8]) -> anyhow::Result<Query> {
    if packet.len() < DNS_HEADER_SIZE {
        anyhow::bail!("Packet shorter than header");
    }

    let id = u16::from_be_bytes([packet[0], packet[1]]);
    let flags = u16::from_be_bytes([packet[2], packet[3]]);
    let qdcount = u16::from_be_bytes([packet[4], packet[5]]);

    if flags & FLAG_QR != 0 {
        anyhow::bail!("Not a query");
    }

    let mut questions = Vec::with_capacity(qdcount as usize);
    let mut offset = DNS_HEADER_SIZE;
    for _ in 0..qdcount {
        let (question, len) = parse_question(&packet[offset..])?;
        questions.push(question);
        offset += len;
    }

    Ok(Query {
        id,
        flags,
        questions,
    })
}

/// Parse one question, returning it and the bytes consumed
fn parse_question(data: &[u8]) -> anyhow::Result<(Question, usize)> {
    let mut name = String::new();
    let mut offset = 0;

    // Parse name labels
    loop {
        if offset >= data.len() {
            anyhow::bail!("Truncated question");
        }

        let len = data[offset] as usize;
        if len == 0 {
            offset += 1;
            break;
        }

        // Also rejects compression pointers, which never appear in questions
        if len > 63 {
            anyhow::bail!("Invalid label length");
        }

        offset += 1;
        if offset + len > data.len() {
            anyhow::bail!("Truncated label");
        }

        let label = std::str::from_utf8(&data[offset..offset + len])?;
        if label.contains('.') {
            anyhow::bail!("Label contains a dot");
        }
        name.push_str(label);
        name.push('.');
        offset += len;
    }

    if name.is_empty() {
        name.push('.');
    }

    if offset + 4 > data.len() {
        anyhow::bail!("Truncated question");
    }

    let qtype = u16::from_be_bytes([data[offset], data[offset + 1]]);
    let qclass = u16::from_be_bytes([data[offset + 2], data[offset + 3]]);
    offset += 4;

    Ok((Question { name, qtype, qclass }, offset))
}

/// Build an authoritative reply
///
/// `answers` pairs each answer with the index of the question it answers.
/// Answers that would push the reply past 512 bytes are dropped and the TC
/// flag is set. A question section that cannot fit on its own yields a bare
/// header with TC set and no questions.
pub fn build_response(query: &Query, answers: &[(usize, Answer)]) -> Vec<u8> {
    let mut response = Vec::with_capacity(DNS_MAX_PACKET_SIZE);

    let mut flags = FLAG_QR | FLAG_AA | (query.flags & (OPCODE_MASK | FLAG_RD));

    response.extend_from_slice(&query.id.to_be_bytes());
    response.extend_from_slice(&flags.to_be_bytes());
    response.extend_from_slice(&(query.questions.len() as u16).to_be_bytes()); // qdcount
    response.extend_from_slice(&0u16.to_be_bytes()); // ancount, patched below
    response.extend_from_slice(&0u16.to_be_bytes()); // nscount = 0
    response.extend_from_slice(&0u16.to_be_bytes()); // arcount = 0

    // Echo questions, remembering where each name starts
    let mut name_offsets = Vec::with_capacity(query.questions.len());
    for question in &query.questions {
        name_offsets.push(response.len());
        write_name(&mut response, &question.name);
        response.extend_from_slice(&question.qtype.to_be_bytes());
        response.extend_from_slice(&question.qclass.to_be_bytes());
    }

    if response.len() > DNS_MAX_PACKET_SIZE {
        flags |= FLAG_TC;
        response.truncate(DNS_HEADER_SIZE);
        response[2..4].copy_from_slice(&flags.to_be_bytes());
        response[4..6].copy_from_slice(&0u16.to_be_bytes());
        return response;
    }

    let mut ancount: u16 = 0;
    for (index, answer) in answers {
        let Some(&name_offset) = name_offsets.get(*index) else {
            continue;
        };

        let rdata: Vec<u8> = match answer.address {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        };

        // pointer + type + class + ttl + rdlength + rdata
        if response.len() + 12 + rdata.len() > DNS_MAX_PACKET_SIZE {
            flags |= FLAG_TC;
            break;
        }

        let name_ptr = 0xC000 | (name_offset as u16); // Compression pointer
        response.extend_from_slice(&name_ptr.to_be_bytes());
        response.extend_from_slice(&answer.rtype.to_be_bytes());
        response.extend_from_slice(&CLASS_IN.to_be_bytes());
        response.extend_from_slice(&answer.ttl.to_be_bytes());
        response.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        response.extend_from_slice(&rdata);
        ancount += 1;
    }

    response[2..4].copy_from_slice(&flags.to_be_bytes());
    response[6..8].copy_from_slice(&ancount.to_be_bytes());

    response
}

/// Encode a dotted name as length-prefixed labels
fn write_name(out: &mut Vec<u8>, name: &str) {
    for label in name.split('.').filter(|l| !l.is_empty()) {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0); // End of name
}
