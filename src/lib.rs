//! Build a single QUIC long-header packet from individually chosen fields
//! and protect it the way an Initial packet is protected (RFC 9001 §5).
//!
//! Every field can be set by hand, including ones a well-behaved endpoint
//! would never get wrong (length prefixes, the Length field, the associated
//! data, the header protection sample). This makes the crate suitable for
//! probing how middleboxes react to valid and malformed Initial packets.
//!
//! ```no_run
//! use quic_packet_builder::builder::{CidSpec, PacketSpec};
//! use quic_packet_builder::packet::ConnectionId;
//! use quic_packet_builder::rng::SystemRng;
//!
//! let spec = PacketSpec {
//!     dcid: CidSpec::Given(ConnectionId::new(&[0xaa, 0xbb, 0xcc, 0xdd])?),
//!     payload: b"Hello".to_vec(),
//!     ..PacketSpec::default()
//! };
//! let packet = spec.build(&mut SystemRng::new())?;
//! println!("{}", packet.to_hex());
//! # Ok::<(), quic_packet_builder::error::Error>(())
//! ```

#![forbid(unsafe_code)]

pub mod builder;
pub mod crypto;
pub mod error;
pub mod fields;
pub mod open;
pub mod packet;
pub mod rng;
pub mod varint;

pub use builder::{AssembledPacket, CidSpec, Overrides, PacketSpec, ProtectedPacket, TokenSpec};
pub use crypto::{Direction, KeyOverride, SampleSource};
pub use error::Error;
pub use open::{open_packet, OpenOptions, OpenedPacket};
pub use packet::{ConnectionId, HeaderFields, PacketNumber, Token};
pub use rng::{Rng, SeededRng, SystemRng};
