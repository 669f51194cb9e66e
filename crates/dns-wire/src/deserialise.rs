//! Deserialisation of DNS messages from the network.  See the `types`
//! module for details of the format.

use bytes::Bytes;
use std::fmt;

use crate::types::*;

impl Packet {
    pub fn from_octets(octets: &[u8]) -> Result<Self, Error> {
        Self::deserialise(&mut ConsumableBuffer::new(octets))
    }

    pub fn deserialise(buffer: &mut ConsumableBuffer) -> Result<Self, Error> {
        let header = Header::deserialise(buffer)?;

        if header.qdcount != 1 {
            return Err(Error::UnsupportedQuestionCount {
                qdcount: header.qdcount,
            });
        }

        let question = Question::deserialise(buffer)?;

        let mut answers = Vec::with_capacity(header.ancount.into());
        let mut authority = Vec::with_capacity(header.nscount.into());
        let mut additional = Vec::with_capacity(header.arcount.into());

        for _ in 0..header.ancount {
            answers.push(ResourceRecord::deserialise(buffer)?);
        }
        for _ in 0..header.nscount {
            authority.push(ResourceRecord::deserialise(buffer)?);
        }
        for _ in 0..header.arcount {
            additional.push(ResourceRecord::deserialise(buffer)?);
        }

        Ok(Self {
            header,
            question,
            answers,
            authority,
            additional,
        })
    }
}

impl Header {
    pub fn deserialise(buffer: &mut ConsumableBuffer) -> Result<Self, Error> {
        let id = buffer.next_u16()?;
        let flags1 = buffer.next_u8()?;
        let flags2 = buffer.next_u8()?;
        let qdcount = buffer.next_u16()?;
        let ancount = buffer.next_u16()?;
        let nscount = buffer.next_u16()?;
        let arcount = buffer.next_u16()?;

        Ok(Self {
            id,
            is_response: flags1 & HEADER_MASK_QR != 0,
            opcode: Opcode::from((flags1 & HEADER_MASK_OPCODE) >> HEADER_OFFSET_OPCODE),
            is_authoritative: flags1 & HEADER_MASK_AA != 0,
            is_truncated: flags1 & HEADER_MASK_TC != 0,
            recursion_desired: flags1 & HEADER_MASK_RD != 0,
            recursion_available: flags2 & HEADER_MASK_RA != 0,
            z: flags2 & HEADER_MASK_Z != 0,
            authenticated_data: flags2 & HEADER_MASK_AD != 0,
            checking_disabled: flags2 & HEADER_MASK_CD != 0,
            rcode: Rcode::from(flags2 & HEADER_MASK_RCODE),
            qdcount,
            ancount,
            nscount,
            arcount,
        })
    }
}

impl Question {
    pub fn deserialise(buffer: &mut ConsumableBuffer) -> Result<Self, Error> {
        let name = DomainName::deserialise(buffer)?;
        let qtype = RecordType::from(buffer.next_u16()?);
        let qclass = RecordClass::from(buffer.next_u16()?);

        Ok(Self {
            name,
            qtype,
            qclass,
        })
    }
}

impl ResourceRecord {
    pub fn deserialise(buffer: &mut ConsumableBuffer) -> Result<Self, Error> {
        let name = DomainName::deserialise(buffer)?;
        let rtype = RecordType::from(buffer.next_u16()?);
        let rclass = RecordClass::from(buffer.next_u16()?);
        let ttl = buffer.next_u32()?;
        let rdlength = buffer.next_u16()?;

        // CNAME data is itself a name field, so it gets the
        // pointer-aware decode rather than being taken as `rdlength`
        // raw octets.  Everything else is opaque, byte order and all.
        let rdata = match rtype {
            RecordType::CNAME => Rdata::Name(DomainName::deserialise(buffer)?),
            _ => Rdata::Bytes(Bytes::copy_from_slice(buffer.take(rdlength as usize)?)),
        };

        Ok(Self {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
        })
    }
}

impl DomainName {
    pub fn deserialise(buffer: &mut ConsumableBuffer<'_>) -> Result<Self, Error> {
        let mut labels = Vec::with_capacity(5);

        // Pointer offsets already followed while decoding this name:
        // a repeat means the chain can never terminate.
        let mut visited: Vec<usize> = Vec::new();

        // After the first pointer the remaining labels are read
        // through a detached cursor.  The caller's cursor has already
        // moved past the two pointer octets and must not move again.
        let mut detached: Option<ConsumableBuffer<'_>> = None;

        loop {
            let cursor = match detached {
                Some(ref mut c) => c,
                None => &mut *buffer,
            };

            let size = cursor.next_u8()?;

            if size == 0 {
                break;
            } else if size & POINTER_TAG != POINTER_TAG {
                labels.push(Bytes::copy_from_slice(cursor.take(size as usize)?));
            } else {
                let lo = cursor.next_u8()?;
                let offset = usize::from(u16::from_be_bytes([size, lo]) & POINTER_OFFSET_MASK);

                if offset >= cursor.len() {
                    return Err(Error::InvalidPointer { offset });
                }
                if visited.contains(&offset) {
                    return Err(Error::CompressionLoop { offset });
                }
                visited.push(offset);

                let jumped = cursor.at_offset(offset);
                detached = Some(jumped);
            }
        }

        Ok(Self { labels })
    }
}

/// Errors encountered when parsing a message.  Any of these aborts
/// the decode of the whole message: there is no partial result.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Error {
    /// The buffer ran out in the middle of a field.
    TruncatedMessage,

    /// A compression pointer's offset lies outside the message.
    InvalidPointer { offset: usize },

    /// A compression pointer chain revisits an offset, so following
    /// it would never terminate.
    CompressionLoop { offset: usize },

    /// The question count is not exactly one.  Multi-question
    /// messages are legal on the wire but not supported here.
    UnsupportedQuestionCount { qdcount: u16 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::TruncatedMessage => write!(f, "message is truncated"),
            Error::InvalidPointer { offset } => {
                write!(f, "compression pointer to offset {offset} is out of range")
            }
            Error::CompressionLoop { offset } => {
                write!(f, "compression pointer chain loops at offset {offset}")
            }
            Error::UnsupportedQuestionCount { qdcount } => {
                write!(f, "expected exactly one question, got {qdcount}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A buffer which will be consumed by the parsing process.
pub struct ConsumableBuffer<'a> {
    octets: &'a [u8],
    position: usize,
}

impl<'a> ConsumableBuffer<'a> {
    pub fn new(octets: &'a [u8]) -> Self {
        Self {
            octets,
            position: 0,
        }
    }

    pub fn next_u8(&mut self) -> Result<u8, Error> {
        if self.octets.len() > self.position {
            let a = self.octets[self.position];
            self.position += 1;
            Ok(a)
        } else {
            Err(Error::TruncatedMessage)
        }
    }

    pub fn next_u16(&mut self) -> Result<u16, Error> {
        if self.octets.len() > self.position + 1 {
            let a = self.octets[self.position];
            let b = self.octets[self.position + 1];
            self.position += 2;
            Ok(u16::from_be_bytes([a, b]))
        } else {
            Err(Error::TruncatedMessage)
        }
    }

    pub fn next_u32(&mut self) -> Result<u32, Error> {
        if self.octets.len() > self.position + 3 {
            let a = self.octets[self.position];
            let b = self.octets[self.position + 1];
            let c = self.octets[self.position + 2];
            let d = self.octets[self.position + 3];
            self.position += 4;
            Ok(u32::from_be_bytes([a, b, c, d]))
        } else {
            Err(Error::TruncatedMessage)
        }
    }

    pub fn take(&mut self, size: usize) -> Result<&'a [u8], Error> {
        if self.octets.len() >= self.position + size {
            let slice = &self.octets[self.position..self.position + size];
            self.position += size;
            Ok(slice)
        } else {
            Err(Error::TruncatedMessage)
        }
    }

    pub fn len(&self) -> usize {
        self.octets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.octets.is_empty()
    }

    pub fn at_offset(&self, position: usize) -> ConsumableBuffer<'a> {
        Self {
            octets: self.octets,
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialise::WritableBuffer;
    use crate::types::test_util::*;

    #[test]
    fn integer_reads_are_bounds_checked() {
        let octets = [0xab];

        assert_eq!(Ok(0xab), ConsumableBuffer::new(&octets).next_u8());
        assert_eq!(
            Err(Error::TruncatedMessage),
            ConsumableBuffer::new(&octets).next_u16()
        );
        assert_eq!(
            Err(Error::TruncatedMessage),
            ConsumableBuffer::new(&octets).next_u32()
        );
        assert_eq!(
            Err(Error::TruncatedMessage),
            ConsumableBuffer::new(&octets).take(2)
        );
        assert_eq!(
            Err(Error::TruncatedMessage),
            ConsumableBuffer::new(&[]).next_u8()
        );
    }

    #[test]
    fn integer_reads_are_big_endian() {
        let octets = [0x12, 0x34, 0x56, 0x78];

        assert_eq!(
            Ok(0x1234),
            ConsumableBuffer::new(&octets).next_u16()
        );
        assert_eq!(
            Ok(0x1234_5678),
            ConsumableBuffer::new(&octets).next_u32()
        );
    }

    #[test]
    fn name_roundtrips() {
        for _ in 0..100 {
            let name = arbitrary_domainname();

            let mut buffer = WritableBuffer::default();
            name.serialise(&mut buffer);
            let deserialised = DomainName::deserialise(&mut ConsumableBuffer::new(&buffer.octets));

            assert_eq!(Ok(name), deserialised);
        }
    }

    #[test]
    fn header_roundtrips_every_bit() {
        for _ in 0..100 {
            let header = arbitrary_header();

            let mut buffer = WritableBuffer::default();
            header.serialise(&mut buffer);
            let deserialised = Header::deserialise(&mut ConsumableBuffer::new(&buffer.octets));

            assert_eq!(Ok(header), deserialised);
        }
    }

    #[test]
    fn question_roundtrips() {
        for _ in 0..100 {
            let question = arbitrary_question();

            let mut buffer = WritableBuffer::default();
            question.serialise(&mut buffer);
            let deserialised = Question::deserialise(&mut ConsumableBuffer::new(&buffer.octets));

            assert_eq!(Ok(question), deserialised);
        }
    }

    #[test]
    fn query_roundtrips() {
        let query = Packet::query(0x0515, domain("www.example.com"));
        let deserialised = Packet::from_octets(&query.to_octets());

        assert_eq!(Ok(query), deserialised);
    }

    #[test]
    fn reserved_z_bit_survives() {
        let mut header = arbitrary_header();
        header.z = true;

        let mut buffer = WritableBuffer::default();
        header.serialise(&mut buffer);

        assert!(Header::deserialise(&mut ConsumableBuffer::new(&buffer.octets))
            .unwrap()
            .z);
    }

    #[test]
    fn empty_name_deserialises_to_empty_string() {
        let octets = [0];
        let name = DomainName::deserialise(&mut ConsumableBuffer::new(&octets)).unwrap();

        assert_eq!("", name.to_dotted_string());
    }

    #[test]
    fn name_deserialise_needs_the_terminator() {
        let octets = [3, b'f', b'o', b'o'];

        assert_eq!(
            Err(Error::TruncatedMessage),
            DomainName::deserialise(&mut ConsumableBuffer::new(&octets))
        );
    }

    #[test]
    fn name_pointer_is_followed() {
        // "foo" at offset 0, then "bar" + pointer to it
        let octets = [
            3, b'f', b'o', b'o', 0, //
            3, b'b', b'a', b'r', 0xc0, 0x00,
        ];
        let mut buffer = ConsumableBuffer::new(&octets).at_offset(5);
        let name = DomainName::deserialise(&mut buffer).unwrap();

        assert_eq!("bar.foo", name.to_dotted_string());
    }

    #[test]
    fn name_pointer_chain_of_three_resolves() {
        let octets = [
            3, b'f', b'o', b'o', 0, // 0: "foo"
            3, b'b', b'a', b'r', 0xc0, 0x00, // 5: "bar.foo"
            0xc0, 0x05, // 11: -> 5
            3, b'q', b'u', b'x', 0xc0, 0x0b, // 13: "qux" -> 11 -> 5 -> 0
        ];
        let mut buffer = ConsumableBuffer::new(&octets).at_offset(13);
        let name = DomainName::deserialise(&mut buffer).unwrap();

        assert_eq!("qux.bar.foo", name.to_dotted_string());
    }

    #[test]
    fn name_pointer_cycle_is_rejected() {
        // two pointers at each other
        let octets = [0xc0, 0x02, 0xc0, 0x00];

        assert_eq!(
            Err(Error::CompressionLoop { offset: 2 }),
            DomainName::deserialise(&mut ConsumableBuffer::new(&octets))
        );
    }

    #[test]
    fn name_pointer_to_itself_is_rejected() {
        let octets = [0xc0, 0x00];

        assert_eq!(
            Err(Error::CompressionLoop { offset: 0 }),
            DomainName::deserialise(&mut ConsumableBuffer::new(&octets))
        );
    }

    #[test]
    fn name_pointer_out_of_range_is_rejected() {
        let octets = [0xc0, 0x63];

        assert_eq!(
            Err(Error::InvalidPointer { offset: 0x63 }),
            DomainName::deserialise(&mut ConsumableBuffer::new(&octets))
        );
    }

    #[test]
    fn cname_rdata_is_a_name_whatever_rdlength_claims() {
        let mut buffer = WritableBuffer::default();
        domain("www.example.com").serialise(&mut buffer);
        buffer.write_u16(u16::from(RecordType::CNAME));
        buffer.write_u16(u16::from(RecordClass::IN));
        buffer.write_u32(300);
        buffer.write_u16(0); // deliberately wrong
        domain("example.net").serialise(&mut buffer);

        let rr =
            ResourceRecord::deserialise(&mut ConsumableBuffer::new(&buffer.octets)).unwrap();

        assert_eq!(RecordType::CNAME, rr.rtype);
        assert_eq!(Rdata::Name(domain("example.net")), rr.rdata);
    }

    #[test]
    fn a_rdata_is_the_literal_octets() {
        let mut buffer = WritableBuffer::default();
        domain("example.com").serialise(&mut buffer);
        buffer.write_u16(u16::from(RecordType::A));
        buffer.write_u16(u16::from(RecordClass::IN));
        buffer.write_u32(300);
        buffer.write_u16(4);
        buffer.write_octets(&[93, 184, 216, 34]);

        let rr =
            ResourceRecord::deserialise(&mut ConsumableBuffer::new(&buffer.octets)).unwrap();

        assert_eq!(RecordType::A, rr.rtype);
        assert_eq!(300, rr.ttl);
        match rr.rdata {
            Rdata::Bytes(octets) => assert_eq!(&octets[..], [93, 184, 216, 34]),
            Rdata::Name(_) => panic!("A rdata decoded as a name"),
        }
    }

    #[test]
    fn rdata_shorter_than_declared_is_truncated() {
        let mut buffer = WritableBuffer::default();
        domain("example.com").serialise(&mut buffer);
        buffer.write_u16(u16::from(RecordType::MX));
        buffer.write_u16(u16::from(RecordClass::IN));
        buffer.write_u32(300);
        buffer.write_u16(10);
        buffer.write_octets(&[0, 5, 3]);

        assert_eq!(
            Err(Error::TruncatedMessage),
            ResourceRecord::deserialise(&mut ConsumableBuffer::new(&buffer.octets))
        );
    }

    #[test]
    fn multi_question_packets_are_rejected() {
        for qdcount in [0, 2, 30] {
            let mut query = Packet::query(1000, domain("example.com"));
            query.header.qdcount = qdcount;

            assert_eq!(
                Err(Error::UnsupportedQuestionCount { qdcount }),
                Packet::from_octets(&query.to_octets())
            );
        }
    }

    #[test]
    fn response_with_all_sections_deserialises() {
        let mut buffer = WritableBuffer::default();
        let mut response = Packet::query(0xcafe, domain("example.com"));
        response.header.is_response = true;
        response.header.recursion_available = true;
        response.header.ancount = 2;
        response.header.nscount = 1;
        response.serialise(&mut buffer);

        // answer 1: CNAME, owner name a pointer to the question name
        buffer.write_octets(&[0xc0, 0x0c]);
        buffer.write_u16(u16::from(RecordType::CNAME));
        buffer.write_u16(u16::from(RecordClass::IN));
        buffer.write_u32(300);
        buffer.write_u16(2);
        buffer.write_octets(&[0xc0, 0x0c]);

        // answer 2: A for the same owner, again by pointer
        buffer.write_octets(&[0xc0, 0x0c]);
        buffer.write_u16(u16::from(RecordType::A));
        buffer.write_u16(u16::from(RecordClass::IN));
        buffer.write_u32(300);
        buffer.write_u16(4);
        buffer.write_octets(&[93, 184, 216, 34]);

        // authority: an uninterpreted type passes through opaquely
        domain("example.com").serialise(&mut buffer);
        buffer.write_u16(u16::from(RecordType::SOA));
        buffer.write_u16(u16::from(RecordClass::IN));
        buffer.write_u32(3600);
        buffer.write_u16(3);
        buffer.write_octets(&[1, 2, 3]);

        let packet = Packet::from_octets(&buffer.octets).unwrap();

        assert_eq!(2, packet.answers.len());
        assert_eq!(1, packet.authority.len());
        assert!(packet.additional.is_empty());

        // both pointer-encoded owner names equal the question name
        assert_eq!(packet.question.name, packet.answers[0].name);
        assert_eq!(packet.question.name, packet.answers[1].name);
        assert_eq!(Rdata::Name(domain("example.com")), packet.answers[0].rdata);

        match &packet.authority[0].rdata {
            Rdata::Bytes(octets) => assert_eq!(&octets[..], [1, 2, 3]),
            Rdata::Name(_) => panic!("SOA rdata decoded as a name"),
        }
    }
}
