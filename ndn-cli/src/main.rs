use std::process;

use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::error;

mod commands;
mod config;
mod utils;

use commands::*;
use config::Config;

const DEFAULT_CONFIG: &str = "ndnpkt.toml";

fn name_arg() -> Arg {
    Arg::new("name")
        .required(true)
        .value_name("NAME")
        .help("Packet name, e.g. /ndn/edu/ucla/ping")
}

fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .help("Write raw TLV to FILE instead of printing hex")
}

fn interest_args(command: Command) -> Command {
    command
        .arg(name_arg())
        .arg(
            Arg::new("can-be-prefix")
                .long("can-be-prefix")
                .help("Set CanBePrefix")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("must-be-fresh")
                .long("must-be-fresh")
                .help("Set MustBeFresh")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("lifetime")
                .long("lifetime")
                .value_name("MS")
                .help("InterestLifetime in milliseconds (default: 4000)")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("hop-limit")
                .long("hop-limit")
                .value_name("N")
                .help("HopLimit (default: 255)")
                .value_parser(value_parser!(u8)),
        )
        .arg(
            Arg::new("forwarding-hint")
                .long("forwarding-hint")
                .value_name("NAME")
                .help("Add a ForwardingHint delegation"),
        )
        .arg(
            Arg::new("params")
                .long("params")
                .value_name("HEX")
                .help("ApplicationParameters; a ParamsDigest is appended to the name"),
        )
        .arg(output_arg())
}

fn input_args(command: Command) -> Command {
    command
        .arg(Arg::new("hex").value_name("HEX").help("Packet as hex"))
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Read the packet from FILE (raw TLV or hex)")
                .conflicts_with("hex"),
        )
}

fn cli() -> Command {
    Command::new("ndnpkt")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build, inspect, sign and verify NDN packets")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            interest_args(Command::new("interest").about("Encode an Interest")).arg(
                Arg::new("sign")
                    .long("sign")
                    .help("Sign with the configured algorithm")
                    .action(ArgAction::SetTrue),
            ),
        )
        .subcommand(
            Command::new("data")
                .about("Encode and sign a Data packet")
                .arg(name_arg())
                .arg(
                    Arg::new("content")
                        .long("content")
                        .value_name("TEXT")
                        .help("Content as UTF-8 text"),
                )
                .arg(
                    Arg::new("content-hex")
                        .long("content-hex")
                        .value_name("HEX")
                        .help("Content as hex")
                        .conflicts_with("content"),
                )
                .arg(
                    Arg::new("content-type")
                        .long("content-type")
                        .value_name("N")
                        .help("ContentType (default: 0)")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("freshness")
                        .long("freshness")
                        .value_name("MS")
                        .help("FreshnessPeriod in milliseconds")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("final-block-id")
                        .long("final-block-id")
                        .value_name("COMPONENT")
                        .help("FinalBlockId in URI form, e.g. 50=%04"),
                )
                .arg(output_arg()),
        )
        .subcommand(
            interest_args(Command::new("nack").about("Encode a Nack for an Interest")).arg(
                Arg::new("reason")
                    .long("reason")
                    .value_name("CODE")
                    .help("NackReason: 50 congestion, 100 duplicate, 150 no route")
                    .value_parser(value_parser!(u64)),
            ),
        )
        .subcommand(input_args(
            Command::new("decode").about("Decode a packet and print it as JSON"),
        ))
        .subcommand(input_args(
            Command::new("verify").about("Check ParamsDigest and signature of a packet"),
        ))
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    let level = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run_command(&matches).await {
        error!("Command failed: {:#}", e);
        process::exit(1);
    }
}

async fn run_command(matches: &ArgMatches) -> Result<()> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match matches.subcommand() {
        Some(("interest", sub_matches)) => handle_interest_command(sub_matches, &config).await,
        Some(("data", sub_matches)) => handle_data_command(sub_matches, &config).await,
        Some(("nack", sub_matches)) => handle_nack_command(sub_matches).await,
        Some(("decode", sub_matches)) => handle_decode_command(sub_matches, &config).await,
        Some(("verify", sub_matches)) => handle_verify_command(sub_matches, &config).await,
        _ => {
            println!("No command specified. Use --help for usage information.");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }

    #[test]
    fn test_parse_interest() {
        let matches = cli()
            .try_get_matches_from(["ndnpkt", "interest", "/A", "--lifetime", "8198", "--sign"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "interest");
        assert_eq!(sub.get_one::<u64>("lifetime"), Some(&8198));
        assert!(sub.get_flag("sign"));
        assert!(!sub.get_flag("can-be-prefix"));
    }

    #[test]
    fn test_nack_with_params_gets_digest() {
        let matches = cli()
            .try_get_matches_from(["ndnpkt", "nack", "/A", "--params", "c0ffee", "--reason", "150"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let nack = build_nack(sub).unwrap();
        assert_eq!(nack.interest.name.len(), 2);
        nack.interest.validate_params_digest().unwrap();

        let wire = ndn_core::encode_packet(&nack.into()).unwrap();
        let decoded = ndn_core::decode_packet(wire, ndn_core::PacketKind::Any).unwrap();
        match decoded {
            ndn_core::Packet::Nack(nack) => {
                nack.interest.validate_params_digest().unwrap();
                assert_eq!(
                    nack.interest.app_parameters.as_deref(),
                    Some(&[0xc0, 0xff, 0xee][..])
                );
            }
            other => panic!("expected Nack, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_input_conflict() {
        let result = cli().try_get_matches_from(["ndnpkt", "decode", "0500", "--file", "x"]);
        assert!(result.is_err());
    }
}
