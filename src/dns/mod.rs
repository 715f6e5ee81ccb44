//! DNS wire format: header and question decoding, error response
//! synthesis, and answer inspection for upstream replies.

mod cursor;
mod message;
mod types;

pub use message::{
    DecodeError, HEADER_LEN, ParsedQuery, Question, extract_first_address, synthesize_response,
};
pub use types::{QueryClass, QueryType, ResponseCode};

#[cfg(test)]
pub(crate) use message::tests::{build_a_reply, build_query};
