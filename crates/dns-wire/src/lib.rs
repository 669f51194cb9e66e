//! The DNS wire format: message types, serialisation of queries, and
//! deserialisation of responses.
//!
//! Queries and responses share one message layout (see section 4.1 of
//! RFC 1035), but this crate only ever travels it in one direction
//! per side: a query is serialised as a header and a single question,
//! and a response is deserialised in full, compression pointers
//! included.

#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::wildcard_imports)]

pub mod deserialise;
pub mod serialise;
pub mod types;
