use std::net::{AddrParseError, IpAddr, SocketAddr};

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Whether clients connect over https.
    /// If so, the session cookie is sent as a secure cookie.
    #[arg(short, long)]
    secure: bool,

    /// The address to listen on. By default
    /// only the IPv4 loopback is used.
    #[arg(short, long)]
    address: Option<String>,

    /// The port to listen on.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Where users and feedback are stored.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://feedback.db")]
    database_url: String,

    /// Signs session cookies. At least 32 bytes; changing it logs everyone out.
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    secret_key: String,
}

impl Args {
    pub fn addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.address
            .as_deref()
            .unwrap_or("127.0.0.1")
            .parse()
            .map(|addr: IpAddr| (addr, self.port).into())
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["userfeedback", "--secret-key", "k"]).unwrap();

        assert_eq!(args.addr().unwrap(), "127.0.0.1:8080".parse().unwrap());
        assert!(!args.secure());
        assert_eq!(args.secret_key(), "k");
    }

    #[test]
    fn listen_anywhere() {
        let args = Args::try_parse_from([
            "userfeedback",
            "--secret-key",
            "k",
            "-a",
            "::",
            "-p",
            "5000",
            "--secure",
        ])
        .unwrap();

        assert_eq!(args.addr().unwrap(), "[::]:5000".parse().unwrap());
        assert!(args.secure());
    }

    #[test]
    fn bad_address() {
        let args = Args::try_parse_from(["userfeedback", "--secret-key", "k", "-a", "localhost"])
            .unwrap();

        assert!(args.addr().is_err());
    }
}
