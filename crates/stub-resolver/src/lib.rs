//! A one-shot DNS stub resolver: ask a recursive nameserver for the
//! A records of a hostname over UDP and report the addresses and the
//! CNAME chain that come back.
//!
//! One call is one exchange.  A single query datagram goes to the
//! first configured nameserver and a single response datagram is
//! awaited: no retries, no fallback to the rest of the list, no
//! caching.  A resolver whose nameserver list is empty reads the
//! system configuration the first time it is needed, so `resolve`
//! takes `&mut self`; use one resolver per task (or a lock) if
//! resolving concurrently.

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod resolv_conf;

use rand::Rng;
use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use dns_wire::types::{DomainName, Packet, Rdata, RecordType, MAX_MESSAGE_SIZE};

/// Port a nameserver listens on, for addresses that arrive without
/// one (the CLI flag, resolv.conf entries).
pub const DNS_PORT: u16 = 53;

/// How long to wait for a response when the caller does not say.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the system keeps its resolver configuration.
pub const RESOLV_CONF: &str = "/etc/resolv.conf";

/// What a lookup produces: the resolved name, its aliases, and its
/// addresses.  Built fresh per call, never cached.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HostEntry {
    /// The name that was resolved, as echoed in the response.
    pub name: String,

    /// Canonical-name aliases, in answer order.
    pub aliases: Vec<String>,

    /// IPv4 addresses, in answer order.
    pub addresses: Vec<Ipv4Addr>,
}

/// Errors encountered resolving a hostname.
#[derive(Debug)]
pub enum LookupError {
    /// No nameserver was configured and the system configuration
    /// offered none either.
    NoNameserverConfigured,

    /// The socket failed while binding, sending, or receiving.
    Network(io::Error),

    /// The nameserver answered with a zero-length datagram.
    EmptyResponse,

    /// No response arrived within the configured timeout.
    Timeout,

    /// The response could not be decoded.
    Protocol(dns_wire::deserialise::Error),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LookupError::NoNameserverConfigured => write!(f, "no nameserver configured"),
            LookupError::Network(error) => write!(f, "network error: {error}"),
            LookupError::EmptyResponse => write!(f, "nameserver sent an empty response"),
            LookupError::Timeout => write!(f, "timed out waiting for a response"),
            LookupError::Protocol(error) => write!(f, "malformed response: {error}"),
        }
    }
}

impl std::error::Error for LookupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LookupError::Network(error) => Some(error),
            LookupError::Protocol(error) => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for LookupError {
    fn from(error: io::Error) -> Self {
        LookupError::Network(error)
    }
}

impl From<dns_wire::deserialise::Error> for LookupError {
    fn from(error: dns_wire::deserialise::Error) -> Self {
        LookupError::Protocol(error)
    }
}

/// A stub resolver: a nameserver list and a timeout.
pub struct StubResolver {
    nameservers: Vec<SocketAddr>,
    timeout: Duration,
    resolv_conf: PathBuf,
}

impl Default for StubResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl StubResolver {
    pub fn new() -> Self {
        Self {
            nameservers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            resolv_conf: PathBuf::from(RESOLV_CONF),
        }
    }

    /// Replace the nameserver list with a single entry.
    pub fn set_nameserver(&mut self, nameserver: SocketAddr) {
        self.nameservers.clear();
        self.nameservers.push(nameserver);
    }

    /// Append a nameserver to the list.
    pub fn add_nameserver(&mut self, nameserver: SocketAddr) {
        self.nameservers.push(nameserver);
    }

    /// Replace the nameserver list wholesale.
    pub fn set_nameservers(&mut self, nameservers: Vec<SocketAddr>) {
        self.nameservers = nameservers;
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Read system nameservers from somewhere other than
    /// `/etc/resolv.conf`.
    pub fn set_resolv_conf(&mut self, path: impl Into<PathBuf>) {
        self.resolv_conf = path.into();
    }

    /// Make sure at least one nameserver is configured, consulting
    /// the system configuration if the caller supplied none, and
    /// return the one to query.
    async fn ensure_nameservers(&mut self) -> Result<SocketAddr, LookupError> {
        if self.nameservers.is_empty() {
            self.nameservers = resolv_conf::system_nameservers(&self.resolv_conf)
                .await
                .into_iter()
                .map(|address| SocketAddr::from((address, DNS_PORT)))
                .collect();
        }

        match self.nameservers.first() {
            Some(nameserver) => Ok(*nameserver),
            None => Err(LookupError::NoNameserverConfigured),
        }
    }

    /// Resolve the A records and CNAME chain of `hostname`.
    pub async fn resolve(&mut self, hostname: &str) -> Result<HostEntry, LookupError> {
        let nameserver = self.ensure_nameservers().await?;

        let id = rand::thread_rng().gen();
        let query = Packet::query(id, DomainName::from_dotted_string(hostname));
        tracing::debug!(%nameserver, question = %query.question, "sending query");

        let response = match timeout(self.timeout, exchange(nameserver, &query.to_octets())).await
        {
            Ok(outcome) => outcome?,
            Err(_) => return Err(LookupError::Timeout),
        };

        let packet = Packet::from_octets(&response)?;
        tracing::debug!(
            answers = packet.answers.len(),
            rcode = %packet.header.rcode,
            "response decoded"
        );

        Ok(project(&packet))
    }
}

/// One UDP round trip: send the serialised query to the nameserver,
/// receive a single datagram from the same peer.
async fn exchange(nameserver: SocketAddr, request: &[u8]) -> Result<Vec<u8>, LookupError> {
    let sock = UdpSocket::bind("0.0.0.0:0").await?;
    sock.connect(nameserver).await?;
    sock.send(request).await?;

    let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
    let len = sock.recv(&mut buf).await?;
    if len == 0 {
        return Err(LookupError::EmptyResponse);
    }
    buf.truncate(len);

    Ok(buf)
}

/// Project the answer section into a `HostEntry`: CNAME names become
/// aliases, A payloads become addresses, anything else is skipped.
/// The authority and additional sections were decoded along with the
/// rest of the message but are not reported.
fn project(packet: &Packet) -> HostEntry {
    let mut entry = HostEntry {
        name: packet.question.name.to_dotted_string(),
        aliases: Vec::new(),
        addresses: Vec::new(),
    };

    for answer in &packet.answers {
        match (answer.rtype, &answer.rdata) {
            (RecordType::CNAME, Rdata::Name(cname)) => {
                entry.aliases.push(cname.to_dotted_string());
            }
            (RecordType::A, Rdata::Bytes(octets)) => {
                if let Ok(quad) = <[u8; 4]>::try_from(octets.as_ref()) {
                    entry.addresses.push(Ipv4Addr::from(quad));
                } else {
                    tracing::warn!(
                        name = %answer.name,
                        octets = octets.len(),
                        "skipping A record with a malformed address"
                    );
                }
            }
            (rtype, _) => {
                tracing::debug!(name = %answer.name, %rtype, "skipping record of uninterpreted type");
            }
        }
    }

    entry
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use dns_wire::types::test_util::*;
    use dns_wire::types::{RecordClass, ResourceRecord};

    use super::*;

    #[test]
    fn project_splits_answers_by_type() {
        let mut packet = Packet::query(1, domain("example.com"));
        packet.answers = vec![
            cname_rr("example.com", "example-alias.net"),
            a_rr("example-alias.net", [93, 184, 216, 34]),
            a_rr("example-alias.net", [93, 184, 216, 35]),
        ];

        let entry = project(&packet);

        assert_eq!("example.com", entry.name);
        assert_eq!(vec!["example-alias.net".to_string()], entry.aliases);
        assert_eq!(
            vec![
                Ipv4Addr::new(93, 184, 216, 34),
                Ipv4Addr::new(93, 184, 216, 35)
            ],
            entry.addresses
        );
    }

    #[test]
    fn project_skips_uninterpreted_types() {
        let mut packet = Packet::query(1, domain("example.com"));
        packet.answers = vec![
            ResourceRecord {
                name: domain("example.com"),
                rtype: RecordType::MX,
                rclass: RecordClass::IN,
                ttl: 300,
                rdata: Rdata::Bytes(Bytes::from_static(&[0, 5, 4, b'm', b'a', b'i', b'l', 0])),
            },
            a_rr("example.com", [93, 184, 216, 34]),
        ];

        let entry = project(&packet);

        assert!(entry.aliases.is_empty());
        assert_eq!(vec![Ipv4Addr::new(93, 184, 216, 34)], entry.addresses);
    }

    #[test]
    fn project_skips_malformed_a_payloads() {
        let mut packet = Packet::query(1, domain("example.com"));
        packet.answers = vec![ResourceRecord {
            name: domain("example.com"),
            rtype: RecordType::A,
            rclass: RecordClass::IN,
            ttl: 300,
            rdata: Rdata::Bytes(Bytes::from_static(&[10, 0, 0])),
        }];

        let entry = project(&packet);

        assert!(entry.addresses.is_empty());
    }

    #[test]
    fn project_ignores_authority_and_additional() {
        let mut packet = Packet::query(1, domain("example.com"));
        packet.authority = vec![a_rr("example.com", [1, 1, 1, 1])];
        packet.additional = vec![a_rr("example.com", [2, 2, 2, 2])];

        let entry = project(&packet);

        assert!(entry.aliases.is_empty());
        assert!(entry.addresses.is_empty());
    }

    fn cname_rr(name: &str, target: &str) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype: RecordType::CNAME,
            rclass: RecordClass::IN,
            ttl: 300,
            rdata: Rdata::Name(domain(target)),
        }
    }

    fn a_rr(name: &str, address: [u8; 4]) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype: RecordType::A,
            rclass: RecordClass::IN,
            ttl: 300,
            rdata: Rdata::Bytes(Bytes::copy_from_slice(&address)),
        }
    }
}
