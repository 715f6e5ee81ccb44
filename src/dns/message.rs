//! DNS message parsing and response synthesis.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use thiserror::Error;

use super::cursor::Cursor;
use super::types::{QueryClass, QueryType, ResponseCode};

/// Size of the fixed DNS header.
pub const HEADER_LEN: usize = 12;

const FLAG_QR: u8 = 0x80;
const FLAG_RD: u8 = 0x01;
const FLAG_RA: u8 = 0x80;
const RCODE_MASK: u8 = 0x0F;

/// Reasons a message could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("message is {0} bytes, shorter than the 12-byte header")]
    TooShort(usize),
    #[error("reading {needed} bytes at offset {offset} runs past the end of the message")]
    Truncated { offset: usize, needed: usize },
    #[error("unsupported label type at offset {0}")]
    UnsupportedLabel(usize),
}

/// The single question of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Dot-joined labels, case preserved.
    pub name: String,
    /// Lowercase copy of `name`, used for filter matching.
    pub normalized: String,
    pub qtype: QueryType,
    pub qclass: QueryClass,
}

/// A decoded client query.
///
/// `question` is `None` when the header announces anything other than one
/// question. Such a message is well formed but not something the proxy
/// forwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub id: u16,
    pub question_count: u16,
    pub question: Option<Question>,
}

impl ParsedQuery {
    /// Decode the header and question section of a client query.
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        if raw.len() < HEADER_LEN {
            return Err(DecodeError::TooShort(raw.len()));
        }

        let mut cursor = Cursor::new(raw);
        let id = cursor.read_u16()?;
        cursor.skip(2)?; // flags
        let question_count = cursor.read_u16()?;
        cursor.skip(6)?; // ANCOUNT, NSCOUNT, ARCOUNT

        if question_count != 1 {
            return Ok(Self {
                id,
                question_count,
                question: None,
            });
        }

        let labels = cursor.read_labels()?;
        let name = labels
            .iter()
            .map(|label| String::from_utf8_lossy(label))
            .collect::<Vec<_>>()
            .join(".");
        let qtype = QueryType::from(cursor.read_u16()?);
        let qclass = QueryClass::from(cursor.read_u16()?);

        Ok(Self {
            id,
            question_count,
            question: Some(Question {
                normalized: name.to_ascii_lowercase(),
                name,
                qtype,
                qclass,
            }),
        })
    }

    /// Name of the question, or `None` for multi-question messages.
    pub fn name(&self) -> Option<&str> {
        self.question.as_ref().map(|q| q.name.as_str())
    }
}

/// Turn a query into an error response carrying `code`.
///
/// The question section is kept byte for byte so the client can correlate
/// the reply. Returns `None` for messages shorter than the header.
pub fn synthesize_response(raw: &[u8], code: ResponseCode) -> Option<Vec<u8>> {
    if raw.len() < HEADER_LEN {
        return None;
    }

    let mut response = raw.to_vec();
    // QR set; AA, TC and opcode cleared; RD kept from the query.
    response[2] = (response[2] | FLAG_QR) & (FLAG_QR | FLAG_RD);
    // RA cleared, Z/AD/CD kept, RCODE replaced.
    response[3] = (response[3] & !(FLAG_RA | RCODE_MASK)) | code.to_u8();
    // ANCOUNT, NSCOUNT, ARCOUNT
    response[6..HEADER_LEN].fill(0);

    Some(response)
}

/// Find the first A or AAAA record in the answer section of a reply.
///
/// Diagnostic only: any bounds violation yields `None`.
pub fn extract_first_address(reply: &[u8]) -> Option<IpAddr> {
    first_address(reply).ok().flatten()
}

fn first_address(reply: &[u8]) -> Result<Option<IpAddr>, DecodeError> {
    if reply.len() < HEADER_LEN {
        return Err(DecodeError::TooShort(reply.len()));
    }

    let mut cursor = Cursor::new(reply);
    cursor.skip(4)?; // ID, flags
    let question_count = cursor.read_u16()?;
    let answer_count = cursor.read_u16()?;
    cursor.skip(4)?; // NSCOUNT, ARCOUNT

    for _ in 0..question_count {
        cursor.skip_name()?;
        cursor.skip(4)?; // QTYPE, QCLASS
    }

    for _ in 0..answer_count {
        cursor.skip_name()?;
        let rtype = QueryType::from(cursor.read_u16()?);
        cursor.skip(6)?; // CLASS, TTL
        let rdlength = cursor.read_u16()? as usize;
        let rdata = cursor.read_bytes(rdlength)?;

        match (rtype, rdata.len()) {
            (QueryType::A, 4) => {
                let octets: [u8; 4] = [rdata[0], rdata[1], rdata[2], rdata[3]];
                return Ok(Some(IpAddr::V4(Ipv4Addr::from(octets))));
            }
            (QueryType::AAAA, 16) => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(rdata);
                return Ok(Some(IpAddr::V6(Ipv6Addr::from(octets))));
            }
            _ => {}
        }
    }

    Ok(None)
}
