//! Command-line surface. Flag names keep their underscores so existing
//! experiment drivers keep working.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::info;

use quic_packet_builder::builder::{CidSpec, Overrides, PacketSpec, TokenSpec};
use quic_packet_builder::crypto::rustcrypto::Aes128GcmProvider;
use quic_packet_builder::crypto::{Direction, KeyOverride, SampleSource};
use quic_packet_builder::fields::{parse_bit, parse_bits, parse_hex, parse_sample, parse_version};
use quic_packet_builder::open::{open_packet, OpenOptions};
use quic_packet_builder::packet::{ConnectionId, HeaderFields, PacketNumber, Token};
use quic_packet_builder::rng::SystemRng;

#[derive(Parser, Debug)]
#[command(
    name = "quic-packet-builder",
    about = "Construct a protected QUIC long header packet and print it as hex",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Increase log verbosity on stderr (-v, -vv, -vvv).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub build: BuildArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remove protection from a packet and print its payload as hex.
    Open(OpenArgs),
}

/// Key derivation flags shared by building and opening.
#[derive(Args, Debug, Clone, Default)]
pub struct KeyArgs {
    /// Use the server Initial secret instead of the client one.
    #[arg(long)]
    pub server: bool,

    /// Derive keys from this DCID (hex) instead of the packet's DCID.
    #[arg(long = "key_dcid")]
    pub key_dcid: Option<String>,

    /// Derive keys as for this version (hex) regardless of the version field.
    #[arg(long = "key_version", conflicts_with_all = ["salt", "secret"])]
    pub key_version: Option<String>,

    /// Initial salt (hex) to use instead of the version's salt.
    #[arg(long, conflicts_with = "secret")]
    pub salt: Option<String>,

    /// 32-byte Initial traffic secret (hex), bypassing salt and DCID.
    #[arg(long)]
    pub secret: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// 1-bit header form.
    #[arg(long = "header_form", default_value_t = 1)]
    pub header_form: u8,

    /// 1-bit fixed bit.
    #[arg(long = "fixed_bit", default_value_t = 1)]
    pub fixed_bit: u8,

    /// 2-bit packet type, e.g. 00.
    #[arg(long = "packet_type", default_value = "00")]
    pub packet_type: String,

    /// 2-bit reserved bits.
    #[arg(long = "reserved_bits", default_value = "00")]
    pub reserved_bits: String,

    /// 2-bit packet number length (00 = 1 byte ... 11 = 4 bytes).
    #[arg(long = "pkt_num_len_bits", default_value = "00")]
    pub pkt_num_len_bits: String,

    /// 4-byte version as hex, e.g. 00000001.
    #[arg(long, default_value = "00000001")]
    pub version: String,

    /// Destination Connection ID length. Random DCID length when --dcid is
    /// absent, otherwise overrides the length byte on the wire.
    #[arg(long = "dcid_len")]
    pub dcid_len: Option<u8>,

    /// Destination Connection ID in hex. Random if absent.
    #[arg(long)]
    pub dcid: Option<String>,

    /// Source Connection ID length, as for --dcid_len.
    #[arg(long = "scid_len")]
    pub scid_len: Option<u8>,

    /// Source Connection ID in hex. Random if absent.
    #[arg(long)]
    pub scid: Option<String>,

    /// Token length. Random token of this length when --token is absent,
    /// otherwise overrides the token length on the wire.
    #[arg(long = "token_len")]
    pub token_len: Option<u64>,

    /// Token in hex.
    #[arg(long)]
    pub token: Option<String>,

    /// Value of the Length field instead of the computed one.
    #[arg(long)]
    pub length: Option<u64>,

    /// Varint width of the Length field (1, 2, 4 or 8 bytes).
    #[arg(long = "length_width")]
    pub length_width: Option<usize>,

    /// Payload in hex.
    #[arg(long, default_value = "")]
    pub payload: String,

    /// Packet number in hex, exactly as wide as the packet number length.
    /// Random if absent.
    #[arg(long = "packet_number")]
    pub packet_number: Option<String>,

    /// Associated data in hex instead of the unprotected header.
    #[arg(long = "additional_data")]
    pub additional_data: Option<String>,

    /// Header protection sample: 0x-prefixed hex, or a decimal offset from
    /// the start of the packet number.
    #[arg(long)]
    pub sample: Option<String>,

    #[command(flatten)]
    pub keys: KeyArgs,

    /// Print the associated data instead of the packet.
    #[arg(short = 'a', conflicts_with_all = ["print_sample", "print_mask"])]
    pub print_aad: bool,

    /// Print the header protection sample instead of the packet.
    #[arg(short = 's', conflicts_with = "print_mask")]
    pub print_sample: bool,

    /// Print the header protection mask instead of the packet.
    #[arg(short = 'm')]
    pub print_mask: bool,
}

#[derive(Args, Debug, Clone)]
pub struct OpenArgs {
    /// Protected packet in hex.
    pub packet: String,

    #[command(flatten)]
    pub keys: KeyArgs,
}

fn key_override(args: &KeyArgs) -> Result<Option<KeyOverride>> {
    if let Some(v) = &args.key_version {
        return Ok(Some(KeyOverride::AsVersion(parse_version("key_version", v)?)));
    }
    if let Some(salt) = &args.salt {
        return Ok(Some(KeyOverride::Salt(parse_hex("salt", salt)?)));
    }
    if let Some(secret) = &args.secret {
        return Ok(Some(KeyOverride::Secret(parse_hex("secret", secret)?)));
    }
    Ok(None)
}

fn direction(args: &KeyArgs) -> Direction {
    if args.server {
        Direction::Server
    } else {
        Direction::Client
    }
}

fn cid_spec(
    field: &'static str,
    hex: Option<&str>,
    len: Option<u8>,
) -> Result<(CidSpec, Option<u8>)> {
    match hex {
        Some(hex) => {
            let cid = ConnectionId::new(&parse_hex(field, hex)?)?;
            Ok((CidSpec::Given(cid), len))
        }
        None => {
            let spec = match len {
                Some(len) => CidSpec::Random {
                    len: usize::from(len),
                },
                None => CidSpec::default(),
            };
            Ok((spec, None))
        }
    }
}

/// Turn the parsed flags into a packet spec.
pub fn packet_spec(args: &BuildArgs) -> Result<PacketSpec> {
    let header = HeaderFields::new(
        parse_bit("header_form", args.header_form)?,
        parse_bit("fixed_bit", args.fixed_bit)?,
        parse_bits("packet_type", &args.packet_type, 2)?,
        parse_bits("reserved_bits", &args.reserved_bits, 2)?,
        parse_bits("pkt_num_len_bits", &args.pkt_num_len_bits, 2)?,
        parse_version("version", &args.version)?,
    )?;

    let (dcid, dcid_len) = cid_spec("dcid", args.dcid.as_deref(), args.dcid_len)?;
    let (scid, scid_len) = cid_spec("scid", args.scid.as_deref(), args.scid_len)?;

    let (token, token_len) = match (&args.token, args.token_len) {
        (Some(hex), len) => (TokenSpec::Given(Token::new(&parse_hex("token", hex)?)), len),
        (None, Some(len)) if len > 0 => (
            TokenSpec::Random {
                len: usize::try_from(len).context("token_len too large to generate")?,
            },
            None,
        ),
        (None, _) => (TokenSpec::Empty, None),
    };

    let packet_number = args
        .packet_number
        .as_deref()
        .map(|hex| PacketNumber::from_bytes(&parse_hex("packet_number", hex)?))
        .transpose()?;

    let aad = args
        .additional_data
        .as_deref()
        .map(|hex| parse_hex("additional_data", hex))
        .transpose()?;

    let sample = match &args.sample {
        Some(s) => parse_sample(s)?,
        None => SampleSource::Standard,
    };

    let key_dcid = args
        .keys
        .key_dcid
        .as_deref()
        .map(|hex| ConnectionId::new(&parse_hex("key_dcid", hex)?))
        .transpose()?;

    Ok(PacketSpec {
        header,
        dcid,
        scid,
        token,
        packet_number,
        payload: parse_hex("payload", &args.payload)?,
        direction: direction(&args.keys),
        overrides: Overrides {
            dcid_len,
            scid_len,
            token_len,
            length: args.length,
            length_width: args.length_width,
            aad,
            sample,
            keys: key_override(&args.keys)?,
            key_dcid,
        },
        ..PacketSpec::default()
    })
}

/// Build a packet and return the requested artifact as hex.
pub fn run_build(args: &BuildArgs) -> Result<String> {
    let spec = packet_spec(args)?;
    let mut rng = SystemRng::new();

    let assembled = spec.assemble(&mut rng).context("failed to assemble packet")?;
    if args.print_aad {
        return Ok(hex::encode(assembled.aad()));
    }

    let packet = assembled
        .protect(&Aes128GcmProvider)
        .context("failed to protect packet")?;
    info!(
        len = packet.bytes().len(),
        length_field = packet.length(),
        "built packet"
    );

    Ok(if args.print_sample {
        hex::encode(packet.sample())
    } else if args.print_mask {
        hex::encode(packet.mask())
    } else {
        packet.to_hex()
    })
}

/// Open a protected packet and return its payload as hex.
pub fn run_open(args: &OpenArgs) -> Result<String> {
    let bytes = parse_hex("packet", &args.packet)?;
    let options = OpenOptions {
        direction: direction(&args.keys),
        key_dcid: args
            .keys
            .key_dcid
            .as_deref()
            .map(|hex| parse_hex("key_dcid", hex))
            .transpose()?,
        key_override: key_override(&args.keys)?,
        ..OpenOptions::default()
    };

    let opened = open_packet(&bytes, &options).context("failed to open packet")?;
    info!(
        first_byte = %format_args!("{:#04x}", opened.first_byte),
        version = %format_args!("{:#010x}", opened.version),
        dcid = %hex::encode(&opened.dcid),
        scid = %hex::encode(&opened.scid),
        packet_number = opened.packet_number.value(),
        "opened packet"
    );
    Ok(hex::encode(opened.payload))
}
