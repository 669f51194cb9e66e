use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr};
use std::process;
use std::time::Duration;

use stub_resolver::{StubResolver, DNS_PORT};

// the doc comments for this struct turn into the CLI help text
#[derive(Parser)]
/// Resolve a hostname to its IPv4 addresses by speaking DNS over UDP
/// directly, without the system resolver.
struct Args {
    /// Host name to resolve
    #[clap(value_parser)]
    hostname: String,

    /// Nameserver to query (if not given, /etc/resolv.conf is used)
    #[clap(short, long, value_parser)]
    nameserver: Option<Ipv4Addr>,

    /// Seconds to wait for a response
    #[clap(short, long, default_value_t = 5, value_parser)]
    timeout: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut resolver = StubResolver::new();
    resolver.set_timeout(Duration::from_secs(args.timeout));
    if let Some(nameserver) = args.nameserver {
        resolver.set_nameserver(SocketAddr::from((nameserver, DNS_PORT)));
    }

    match resolver.resolve(&args.hostname).await {
        Ok(entry) => {
            println!("Hostname {} has:", entry.name);
            for alias in &entry.aliases {
                println!("alias:\t{alias}");
            }
            for address in &entry.addresses {
                println!("IPv4 address:\t{address}");
            }
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}
