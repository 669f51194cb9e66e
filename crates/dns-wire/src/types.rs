use bytes::Bytes;
use std::fmt;

/// Largest possible DNS message.  Receive buffers are sized to this.
pub const MAX_MESSAGE_SIZE: usize = 65535;

/// Octet mask for the QR flag being set (response).
pub const HEADER_MASK_QR: u8 = 0b1000_0000;

/// Octet mask for the opcode field.
pub const HEADER_MASK_OPCODE: u8 = 0b0111_1000;

/// Offset for the opcode field.
pub const HEADER_OFFSET_OPCODE: usize = 3;

/// Octet mask for the AA flag being set (authoritative)
pub const HEADER_MASK_AA: u8 = 0b0000_0100;

/// Octet mask for the TC flag being set (truncated)
pub const HEADER_MASK_TC: u8 = 0b0000_0010;

/// Octet mask for the RD flag being set (desired)
pub const HEADER_MASK_RD: u8 = 0b0000_0001;

/// Octet mask for the RA flag being set (available)
pub const HEADER_MASK_RA: u8 = 0b1000_0000;

/// Octet mask for the reserved Z bit.
pub const HEADER_MASK_Z: u8 = 0b0100_0000;

/// Octet mask for the AD flag being set (authenticated data)
pub const HEADER_MASK_AD: u8 = 0b0010_0000;

/// Octet mask for the CD flag being set (checking disabled)
pub const HEADER_MASK_CD: u8 = 0b0001_0000;

/// Octet mask for the rcode field.
pub const HEADER_MASK_RCODE: u8 = 0b0000_1111;

/// Octet mask for a compression pointer: the top two bits of a
/// length octet both set.
pub const POINTER_TAG: u8 = 0b1100_0000;

/// Mask extracting the 14-bit offset from a two-octet pointer.
pub const POINTER_OFFSET_MASK: u16 = 0b0011_1111_1111_1111;

/// Basic DNS message format, used for both queries and responses.
///
/// ```text
///     +---------------------+
///     |        Header       |
///     +---------------------+
///     |       Question      | the question for the name server
///     +---------------------+
///     |        Answer       | RRs answering the question
///     +---------------------+
///     |      Authority      | RRs pointing toward an authority
///     +---------------------+
///     |      Additional     | RRs holding additional information
///     +---------------------+
/// ```
///
/// See section 4.1 of RFC 1035.  Messages with more than one
/// question are legal on the wire but not supported here, so the
/// question section is a single `Question`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Packet {
    pub header: Header,
    pub question: Question,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

impl Packet {
    /// Build an outgoing query for the A records of `name`, with
    /// recursion desired.  The question count is pinned to 1 and the
    /// record counts to 0: a query carries no resource records.
    pub fn query(id: u16, name: DomainName) -> Self {
        Self {
            header: Header {
                id,
                is_response: false,
                opcode: Opcode::Standard,
                is_authoritative: false,
                is_truncated: false,
                recursion_desired: true,
                recursion_available: false,
                z: false,
                authenticated_data: false,
                checking_disabled: false,
                rcode: Rcode::NoError,
                qdcount: 1,
                ancount: 0,
                nscount: 0,
                arcount: 0,
            },
            question: Question {
                name,
                qtype: RecordType::A,
                qclass: RecordClass::IN,
            },
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }
}

/// Common header type for all messages.
///
/// ```text
///                                     1  1  1  1  1  1
///       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      ID                       |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |QR|   Opcode  |AA|TC|RD|RA| Z|AD|CD|   RCODE   |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    QDCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ANCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    NSCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ARCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// See section 4.1.1 of RFC 1035, with the AD and CD bits of RFC
/// 2535 carved out of the reserved field.  Every bit, the reserved Z
/// included, survives a serialise/deserialise round trip.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub struct Header {
    /// A 16 bit identifier assigned by the program that generates
    /// any kind of query.  This identifier is copied into the
    /// corresponding reply and can be used by the requester to match
    /// up replies to outstanding queries.
    pub id: u16,

    /// Whether this message is a query (false) or a response (true).
    pub is_response: bool,

    /// A four bit field that specifies the kind of query in this
    /// message.  This value is set by the originator of a query and
    /// copied into the response.
    pub opcode: Opcode,

    /// Authoritative Answer - this bit is valid in responses, and
    /// specifies that the responding name server is an authority for
    /// the domain name in the question section.
    pub is_authoritative: bool,

    /// Truncation - specifies that this message was truncated due to
    /// length greater than that permitted on the transmission
    /// channel.
    pub is_truncated: bool,

    /// Recursion Desired - this bit may be set in a query and is
    /// copied into the response.  If RD is set, it directs the name
    /// server to pursue the query recursively.
    pub recursion_desired: bool,

    /// Recursion Available - set or cleared in a response, denotes
    /// whether recursive query support is available in the name
    /// server.
    pub recursion_available: bool,

    /// Reserved.  Carried through untouched.
    pub z: bool,

    /// Authenticated Data - in a response, the data included has
    /// been verified by the server.
    pub authenticated_data: bool,

    /// Checking Disabled - in a query, the client accepts
    /// unauthenticated data.
    pub checking_disabled: bool,

    /// Response code set as part of responses.
    pub rcode: Rcode,

    /// Number of entries in the question section.
    pub qdcount: u16,

    /// Number of entries in the answer section.
    pub ancount: u16,

    /// Number of entries in the authority section.
    pub nscount: u16,

    /// Number of entries in the additional section.
    pub arcount: u16,
}

/// A single entry of the question section.
///
/// ```text
///                                     1  1  1  1  1  1
///       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                                               |
///     /                     QNAME                     /
///     /                                               /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                     QTYPE                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                     QCLASS                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// See section 4.1.2 of RFC 1035.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub struct Question {
    pub name: DomainName,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.name.to_dotted_string(),
            self.qclass,
            self.qtype
        )
    }
}

/// The answer, authority, and additional sections are all the same
/// format: a variable number of resource records.
///
/// ```text
///                                     1  1  1  1  1  1
///       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                                               |
///     /                      NAME                     /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      TYPE                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                     CLASS                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      TTL                      |
///     |                                               |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                   RDLENGTH                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--|
///     /                     RDATA                     /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// See section 4.1.3 of RFC 1035.  The RDLENGTH field is consumed
/// during deserialisation and not kept: how much of it the payload
/// spans is a property of the wire encoding, not of the record.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResourceRecord {
    /// The domain name to which this record pertains.
    pub name: DomainName,

    /// The record type, which fixes how `rdata` was decoded.
    pub rtype: RecordType,

    /// The class of the data in the RDATA field.
    pub rclass: RecordClass,

    /// How many seconds the record may be cached for.  Not acted on
    /// here, but reported as received.
    pub ttl: u32,

    /// The record payload.
    pub rdata: Rdata,
}

/// A record payload.  Which variant a record decodes to is fixed by
/// its type field at decode time and never changes afterwards: CNAME
/// data is a (possibly compressed) domain name, everything else is
/// opaque octets of the declared RDATA length.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Rdata {
    Name(DomainName),
    Bytes(Bytes),
}

/// What sort of query this is.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Opcode {
    Standard,
    Inverse,
    Status,
    Reserved(OpcodeReserved),
}

/// A struct with a private constructor, to ensure invalid `Opcode`s
/// cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct OpcodeReserved(u8);

impl From<u8> for Opcode {
    fn from(octet: u8) -> Self {
        match octet & 0b0000_1111 {
            0 => Opcode::Standard,
            1 => Opcode::Inverse,
            2 => Opcode::Status,
            other => Opcode::Reserved(OpcodeReserved(other)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        match value {
            Opcode::Standard => 0,
            Opcode::Inverse => 1,
            Opcode::Status => 2,
            Opcode::Reserved(OpcodeReserved(octet)) => octet,
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for Opcode {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from(u.arbitrary::<u8>()?))
    }
}

/// What sort of response this is.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Rcode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Reserved(RcodeReserved),
}

/// A struct with a private constructor, to ensure invalid `Rcode`s
/// cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RcodeReserved(u8);

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rcode::NoError => write!(f, "no-error"),
            Rcode::FormatError => write!(f, "format-error"),
            Rcode::ServerFailure => write!(f, "server-failure"),
            Rcode::NameError => write!(f, "name-error"),
            Rcode::NotImplemented => write!(f, "not-implemented"),
            Rcode::Refused => write!(f, "refused"),
            Rcode::Reserved(_) => write!(f, "reserved"),
        }
    }
}

impl From<u8> for Rcode {
    fn from(octet: u8) -> Self {
        match octet & 0b0000_1111 {
            0 => Rcode::NoError,
            1 => Rcode::FormatError,
            2 => Rcode::ServerFailure,
            3 => Rcode::NameError,
            4 => Rcode::NotImplemented,
            5 => Rcode::Refused,
            other => Rcode::Reserved(RcodeReserved(other)),
        }
    }
}

impl From<Rcode> for u8 {
    fn from(value: Rcode) -> Self {
        match value {
            Rcode::NoError => 0,
            Rcode::FormatError => 1,
            Rcode::ServerFailure => 2,
            Rcode::NameError => 3,
            Rcode::NotImplemented => 4,
            Rcode::Refused => 5,
            Rcode::Reserved(RcodeReserved(octet)) => octet,
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for Rcode {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from(u.arbitrary::<u8>()?))
    }
}

/// A domain name: an ordered sequence of labels, rendered as a
/// dotted string.  Label octets are kept exactly as given, case
/// included.  The empty name has no labels and renders as "".
///
/// Labels over 63 octets or containing a NUL cannot be represented
/// on the wire; producing one is a caller error the codec does not
/// check for.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct DomainName {
    pub labels: Vec<Bytes>,
}

impl DomainName {
    pub fn from_dotted_string(s: &str) -> Self {
        if s.is_empty() {
            return Self { labels: Vec::new() };
        }

        Self {
            labels: s
                .split('.')
                .map(|label| Bytes::copy_from_slice(label.as_bytes()))
                .collect(),
        }
    }

    pub fn to_dotted_string(&self) -> String {
        let mut out = String::new();
        let mut first = true;
        for label in &self.labels {
            if first {
                first = false;
            } else {
                out.push('.');
            }
            for octet in label {
                out.push(*octet as char);
            }
        }

        out
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainName")
            .field("to_dotted_string()", &self.to_dotted_string())
            .finish()
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", &self.to_dotted_string())
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for DomainName {
    // only generates wire-representable names: 1 to 4 alphanumeric
    // labels of 1 to 16 octets
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

        let num_labels = u.int_in_range::<usize>(1..=4)?;
        let mut labels = Vec::with_capacity(num_labels);
        for _ in 0..num_labels {
            let label_len = u.int_in_range::<usize>(1..=16)?;
            let mut label = Vec::with_capacity(label_len);
            for _ in 0..label_len {
                let index = u.int_in_range::<usize>(0..=ALPHABET.len() - 1)?;
                label.push(ALPHABET[index]);
            }
            labels.push(Bytes::from(label));
        }

        Ok(Self { labels })
    }
}

/// Record types are used by resource records and by queries.  Only A
/// and CNAME are interpreted; the rest are named so responses
/// mentioning them stay legible, and anything else is `Unknown`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RecordType {
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    Unknown(RecordTypeUnknown),
}

/// A struct with a private constructor, to ensure invalid
/// `RecordType`s cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RecordTypeUnknown(u16);

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::NS => write!(f, "NS"),
            RecordType::CNAME => write!(f, "CNAME"),
            RecordType::SOA => write!(f, "SOA"),
            RecordType::PTR => write!(f, "PTR"),
            RecordType::MX => write!(f, "MX"),
            RecordType::Unknown(RecordTypeUnknown(n)) => write!(f, "TYPE{n}"),
        }
    }
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::NS,
            5 => RecordType::CNAME,
            6 => RecordType::SOA,
            12 => RecordType::PTR,
            15 => RecordType::MX,
            _ => RecordType::Unknown(RecordTypeUnknown(value)),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::SOA => 6,
            RecordType::PTR => 12,
            RecordType::MX => 15,
            RecordType::Unknown(RecordTypeUnknown(value)) => value,
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for RecordType {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from(u.arbitrary::<u16>()?))
    }
}

/// Record classes are used by resource records and by queries.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RecordClass {
    IN,
    Unknown(RecordClassUnknown),
}

/// A struct with a private constructor, to ensure invalid
/// `RecordClass`es cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RecordClassUnknown(u16);

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordClass::IN => write!(f, "IN"),
            RecordClass::Unknown(RecordClassUnknown(n)) => write!(f, "CLASS{n}"),
        }
    }
}

impl From<u16> for RecordClass {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordClass::IN,
            _ => RecordClass::Unknown(RecordClassUnknown(value)),
        }
    }
}

impl From<RecordClass> for u16 {
    fn from(value: RecordClass) -> Self {
        match value {
            RecordClass::IN => 1,
            RecordClass::Unknown(RecordClassUnknown(value)) => value,
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for RecordClass {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from(u.arbitrary::<u16>()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u8_opcode_roundtrip() {
        for i in 0..15 {
            assert_eq!(u8::from(Opcode::from(i)), i);
        }
    }

    #[test]
    fn u8_rcode_roundtrip() {
        for i in 0..15 {
            assert_eq!(u8::from(Rcode::from(i)), i);
        }
    }

    #[test]
    fn u16_recordtype_roundtrip() {
        for i in 0..100 {
            assert_eq!(u16::from(RecordType::from(i)), i);
        }
    }

    #[test]
    fn u16_recordclass_roundtrip() {
        for i in 0..100 {
            assert_eq!(u16::from(RecordClass::from(i)), i);
        }
    }

    #[test]
    fn domainname_empty_string_is_empty_name() {
        let name = DomainName::from_dotted_string("");

        assert!(name.labels.is_empty());
        assert_eq!("", name.to_dotted_string());
    }

    #[test]
    fn domainname_dotted_string_conversions() {
        for input in ["com", "example.com", "a.b.c.d.example", "WWW.Example.COM"] {
            assert_eq!(
                input,
                DomainName::from_dotted_string(input).to_dotted_string()
            );
        }
    }

    #[test]
    fn domainname_preserves_label_order_and_case() {
        let name = DomainName::from_dotted_string("News.BBC.co.uk");

        assert_eq!(4, name.labels.len());
        assert_eq!(&name.labels[0][..], b"News");
        assert_eq!(&name.labels[1][..], b"BBC");
        assert_eq!(&name.labels[2][..], b"co");
        assert_eq!(&name.labels[3][..], b"uk");
    }
}

#[cfg(any(feature = "test-util", test))]
#[allow(clippy::missing_panics_doc)]
pub mod test_util {
    use super::*;

    use arbitrary::{Arbitrary, Unstructured};
    use rand::Rng;

    pub fn domain(name: &str) -> DomainName {
        DomainName::from_dotted_string(name)
    }

    pub fn arbitrary_domainname() -> DomainName {
        arbitrary_value()
    }

    pub fn arbitrary_header() -> Header {
        arbitrary_value()
    }

    pub fn arbitrary_question() -> Question {
        arbitrary_value()
    }

    fn arbitrary_value<T: for<'a> Arbitrary<'a>>() -> T {
        let mut rng = rand::thread_rng();
        for size in [128, 256, 512, 1024] {
            let mut buf = vec![0u8; size];
            rng.fill(&mut buf[..]);

            if let Ok(value) = T::arbitrary(&mut Unstructured::new(&buf)) {
                return value;
            }
        }

        panic!("could not generate arbitrary value!");
    }
}
