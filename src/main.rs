use std::net::IpAddr;

use anyhow::Result;
use clap::Parser;
use minisocks::Socks5;

/// A small, multi-connection SOCKS5 proxy server.
#[derive(Parser)]
#[command(name = "minisocks", version, about)]
struct Args {
    /// Address to listen on
    #[arg(short = 'i', long = "listen-ip", default_value = "0.0.0.0")]
    listen_ip: IpAddr,

    /// Port to listen on
    #[arg(short = 'p', long = "port", default_value_t = 1080)]
    port: u16,

    /// Username for USERNAME/PASSWORD authentication
    #[arg(short = 'u', long = "user")]
    user: Option<String>,

    /// Password for USERNAME/PASSWORD authentication
    #[arg(short = 'P', long = "password")]
    password: Option<String>,

    /// Source address for outgoing connections
    #[arg(short = 'b', long = "bind-addr")]
    bind_addr: Option<IpAddr>,

    /// After one successful login, accept NO AUTH from the same client IP
    #[arg(short = '1', long = "auth-once")]
    auth_once: bool,

    /// Disable logging
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.user.is_some() != args.password.is_some() {
        eprintln!("error: user and password must be used together");
        std::process::exit(1);
    }
    if args.auth_once && args.user.is_none() {
        eprintln!("error: auth-once requires user/password");
        std::process::exit(1);
    }

    if !args.quiet {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    let mut server = Socks5::bind((args.listen_ip, args.port)).await?;
    if let (Some(user), Some(pass)) = (args.user, args.password) {
        server.set_credentials(user, pass);
    }
    if args.auth_once {
        server.enable_auth_once();
    }
    if let Some(ip) = args.bind_addr {
        server.set_outgoing_ip(ip);
    }

    tracing::info!(addr = %server.local_addr()?, "listening");
    server.run().await?;
    Ok(())
}
