//! Serialisation of DNS queries to the wire format.  See the `types`
//! module for details of the format.
//!
//! Only the query direction is serialised: a message is written as
//! its header and its single question.  The record sections exist
//! only in responses, which this side never produces.

use crate::types::*;

impl Packet {
    pub fn to_octets(&self) -> Vec<u8> {
        let mut buffer = WritableBuffer::default();
        self.serialise(&mut buffer);
        buffer.octets
    }

    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        self.header.serialise(buffer);
        self.question.serialise(buffer);
    }
}

impl Header {
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        let flags1 = (if self.is_response { HEADER_MASK_QR } else { 0 })
            | (HEADER_MASK_OPCODE & (u8::from(self.opcode) << HEADER_OFFSET_OPCODE))
            | (if self.is_authoritative {
                HEADER_MASK_AA
            } else {
                0
            })
            | (if self.is_truncated { HEADER_MASK_TC } else { 0 })
            | (if self.recursion_desired {
                HEADER_MASK_RD
            } else {
                0
            });
        let flags2 = (if self.recursion_available {
            HEADER_MASK_RA
        } else {
            0
        }) | (if self.z { HEADER_MASK_Z } else { 0 })
            | (if self.authenticated_data {
                HEADER_MASK_AD
            } else {
                0
            })
            | (if self.checking_disabled {
                HEADER_MASK_CD
            } else {
                0
            })
            | (HEADER_MASK_RCODE & u8::from(self.rcode));

        buffer.write_u16(self.id);
        buffer.write_u8(flags1);
        buffer.write_u8(flags2);
        buffer.write_u16(self.qdcount);
        buffer.write_u16(self.ancount);
        buffer.write_u16(self.nscount);
        buffer.write_u16(self.arcount);
    }
}

impl Question {
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        self.name.serialise(buffer);
        buffer.write_u16(u16::from(self.qtype));
        buffer.write_u16(u16::from(self.qclass));
    }
}

impl DomainName {
    /// Write the name in label-length-prefixed form, terminated by a
    /// zero octet.  Compression pointers are never produced: every
    /// name goes out in full.
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        for label in &self.labels {
            buffer.write_u8(label.len() as u8);
            buffer.write_octets(label);
        }
        buffer.write_u8(0);
    }
}

/// A buffer which can be written to, for serialisation purposes.
/// Appending is the only operation, so writes cannot fail.
pub struct WritableBuffer {
    pub octets: Vec<u8>,
}

impl Default for WritableBuffer {
    fn default() -> Self {
        Self {
            octets: Vec::with_capacity(512),
        }
    }
}

impl WritableBuffer {
    pub fn write_u8(&mut self, octet: u8) {
        self.octets.push(octet);
    }

    pub fn write_u16(&mut self, value: u16) {
        for octet in value.to_be_bytes() {
            self.octets.push(octet);
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        for octet in value.to_be_bytes() {
            self.octets.push(octet);
        }
    }

    pub fn write_octets(&mut self, octets: &[u8]) {
        self.octets.extend_from_slice(octets);
    }
}
