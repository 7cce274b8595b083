use clap::Parser;
use log::debug;
use wakeonlan::wol;
use wakeonlan::wol::{AddressFamily, SendOptions};

/// Wake one or more computers using the wake on lan protocol.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Hardware addresses of the machines to wake, e.g. 01:23:45:67:89:ab
    #[arg(required = true, value_name = "MAC_ADDRESS")]
    macs: Vec<String>,

    /// IP address or hostname to send the magic packets to
    #[arg(short = 'i', long = "ip", env = "WAKEONLAN_IP", default_value = wol::BROADCAST_IP)]
    ip_address: String,

    /// UDP port to send the magic packets to
    #[arg(short, long, env = "WAKEONLAN_PORT", default_value_t = wol::DEFAULT_PORT)]
    port: u16,

    /// Local address of the network adapter to send through
    #[arg(short = 'n', long, env = "WAKEONLAN_INTERFACE")]
    interface: Option<String>,

    /// Use IPv6 regardless of the destination address
    #[arg(short = '6', long)]
    ipv6: bool,

    /// Log every socket operation
    #[arg(short, long)]
    verbose: bool,

    /// Log what would be sent without touching the network
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn send_options(&self) -> SendOptions {
        let mut options = SendOptions::new()
            .with_ip_address(self.ip_address.as_str())
            .with_port(self.port);
        if let Some(interface) = &self.interface {
            options = options.with_interface(interface.as_str());
        }
        if self.ipv6 {
            options = options.with_address_family(AddressFamily::Ipv6);
        }
        options
    }

    fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.dry_run {
            "info"
        } else {
            "warn"
        }
    }
}

fn run(args: &Args) -> Result<(), wol::Error> {
    let options = args.send_options();
    debug!("{:?}", options);
    if args.dry_run {
        wol::send_magic_packet_with(&wol::noop::LogOnlyFactory, args.macs.as_slice(), &options)
    } else {
        wol::send_magic_packet(args.macs.as_slice(), &options)
    }
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .format_timestamp(Some(env_logger::fmt::TimestampPrecision::Millis))
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
