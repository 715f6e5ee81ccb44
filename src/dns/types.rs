//! Closed enumerations for the wire constants the proxy inspects.
//!
//! Each enum keeps an `Unknown` variant so that any 16-bit (or 4-bit) value
//! read off the wire maps to something, and renders as text for logging.

use std::fmt;

/// Question / record type (RFC 1035 §3.2.2, §3.2.3 and common extensions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum QueryType {
    A,
    NS,
    MD,
    MF,
    CNAME,
    SOA,
    MB,
    MG,
    MR,
    NULL,
    WKS,
    PTR,
    HINFO,
    MINFO,
    MX,
    TXT,
    AAAA,
    SRV,
    OPT,
    AXFR,
    MAILB,
    MAILA,
    ANY,
    Unknown(u16),
}

impl QueryType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => QueryType::A,
            2 => QueryType::NS,
            3 => QueryType::MD,
            4 => QueryType::MF,
            5 => QueryType::CNAME,
            6 => QueryType::SOA,
            7 => QueryType::MB,
            8 => QueryType::MG,
            9 => QueryType::MR,
            10 => QueryType::NULL,
            11 => QueryType::WKS,
            12 => QueryType::PTR,
            13 => QueryType::HINFO,
            14 => QueryType::MINFO,
            15 => QueryType::MX,
            16 => QueryType::TXT,
            28 => QueryType::AAAA,
            33 => QueryType::SRV,
            41 => QueryType::OPT,
            252 => QueryType::AXFR,
            253 => QueryType::MAILB,
            254 => QueryType::MAILA,
            255 => QueryType::ANY,
            other => QueryType::Unknown(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            QueryType::A => 1,
            QueryType::NS => 2,
            QueryType::MD => 3,
            QueryType::MF => 4,
            QueryType::CNAME => 5,
            QueryType::SOA => 6,
            QueryType::MB => 7,
            QueryType::MG => 8,
            QueryType::MR => 9,
            QueryType::NULL => 10,
            QueryType::WKS => 11,
            QueryType::PTR => 12,
            QueryType::HINFO => 13,
            QueryType::MINFO => 14,
            QueryType::MX => 15,
            QueryType::TXT => 16,
            QueryType::AAAA => 28,
            QueryType::SRV => 33,
            QueryType::OPT => 41,
            QueryType::AXFR => 252,
            QueryType::MAILB => 253,
            QueryType::MAILA => 254,
            QueryType::ANY => 255,
            QueryType::Unknown(v) => v,
        }
    }
}

impl From<u16> for QueryType {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryType::A => "A",
            QueryType::NS => "NS",
            QueryType::MD => "MD",
            QueryType::MF => "MF",
            QueryType::CNAME => "CNAME",
            QueryType::SOA => "SOA",
            QueryType::MB => "MB",
            QueryType::MG => "MG",
            QueryType::MR => "MR",
            QueryType::NULL => "NULL",
            QueryType::WKS => "WKS",
            QueryType::PTR => "PTR",
            QueryType::HINFO => "HINFO",
            QueryType::MINFO => "MINFO",
            QueryType::MX => "MX",
            QueryType::TXT => "TXT",
            QueryType::AAAA => "AAAA",
            QueryType::SRV => "SRV",
            QueryType::OPT => "OPT",
            QueryType::AXFR => "AXFR",
            QueryType::MAILB => "MAILB",
            QueryType::MAILA => "MAILA",
            QueryType::ANY => "ANY",
            QueryType::Unknown(v) => return write!(f, "TYPE{}", v),
        };
        f.write_str(name)
    }
}

/// Question class (RFC 1035 §3.2.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum QueryClass {
    IN,
    CS,
    CH,
    HS,
    Unknown(u16),
}

impl QueryClass {
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => QueryClass::IN,
            2 => QueryClass::CS,
            3 => QueryClass::CH,
            4 => QueryClass::HS,
            other => QueryClass::Unknown(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            QueryClass::IN => 1,
            QueryClass::CS => 2,
            QueryClass::CH => 3,
            QueryClass::HS => 4,
            QueryClass::Unknown(v) => v,
        }
    }
}

impl From<u16> for QueryClass {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

impl fmt::Display for QueryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryClass::IN => f.write_str("IN"),
            QueryClass::CS => f.write_str("CS"),
            QueryClass::CH => f.write_str("CH"),
            QueryClass::HS => f.write_str("HS"),
            QueryClass::Unknown(v) => write!(f, "CLASS{}", v),
        }
    }
}

/// Response code carried in the low nibble of header byte 3 (RFC 1035 §4.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Unknown(u8),
}

impl ResponseCode {
    /// Build from a raw value; only the low four bits are significant.
    pub fn from_u8(value: u8) -> Self {
        match value & 0x0F {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            other => ResponseCode::Unknown(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            ResponseCode::NoError => 0,
            ResponseCode::FormatError => 1,
            ResponseCode::ServerFailure => 2,
            ResponseCode::NameError => 3,
            ResponseCode::NotImplemented => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Unknown(v) => v & 0x0F,
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::NoError => f.write_str("NO_ERROR"),
            ResponseCode::FormatError => f.write_str("FORMAT_ERROR"),
            ResponseCode::ServerFailure => f.write_str("SERVER_FAILURE"),
            ResponseCode::NameError => f.write_str("NAME_ERROR"),
            ResponseCode::NotImplemented => f.write_str("NOT_IMPLEMENTED"),
            ResponseCode::Refused => f.write_str("REFUSED"),
            ResponseCode::Unknown(v) => write!(f, "RCODE{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_type_maps_known_codes() {
        assert_eq!(QueryType::from_u16(1), QueryType::A);
        assert_eq!(QueryType::from_u16(28), QueryType::AAAA);
        assert_eq!(QueryType::from_u16(255), QueryType::ANY);
    }

    #[test]
    fn query_type_keeps_unknown_value() {
        let qtype = QueryType::from_u16(65);

        assert_eq!(qtype, QueryType::Unknown(65));
        assert_eq!(qtype.to_u16(), 65);
        assert_eq!(qtype.to_string(), "TYPE65");
    }

    #[test]
    fn query_class_renders_names() {
        assert_eq!(QueryClass::from_u16(1).to_string(), "IN");
        assert_eq!(QueryClass::from_u16(3).to_string(), "CH");
        assert_eq!(QueryClass::from_u16(254).to_string(), "CLASS254");
    }

    #[test]
    fn response_code_uses_low_nibble() {
        assert_eq!(ResponseCode::from_u8(0x85), ResponseCode::Refused);
        assert_eq!(ResponseCode::Refused.to_u8(), 5);
        assert_eq!(ResponseCode::NotImplemented.to_u8(), 4);
        assert_eq!(ResponseCode::from_u8(9), ResponseCode::Unknown(9));
    }

    #[test]
    fn response_code_display() {
        assert_eq!(ResponseCode::ServerFailure.to_string(), "SERVER_FAILURE");
        assert_eq!(ResponseCode::Unknown(11).to_string(), "RCODE11");
    }
}
