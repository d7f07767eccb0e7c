//! Minimal startup configuration (SPEC_FULL.md §3): a port and a bind
//! address, sourced from the command line, then the environment, then a
//! default. No config file format — there's nothing here that warrants one.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DEFAULT_PORT: u16 = 6379;
const DEFAULT_BIND: Ipv4Addr = Ipv4Addr::LOCALHOST;

#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub addr: SocketAddr,
}

impl Config {
    pub fn from_env_and_args<I: IntoIterator<Item = String>>(args: I) -> Self {
        let mut port = std::env::var("KVSTORED_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_PORT);
        let mut bind: IpAddr = std::env::var("KVSTORED_BIND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(IpAddr::V4(DEFAULT_BIND));

        let mut iter = args.into_iter().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--port" => {
                    if let Some(v) = iter.next().and_then(|s| s.parse().ok()) {
                        port = v;
                    }
                }
                "--bind" => {
                    if let Some(v) = iter.next().and_then(|s| s.parse().ok()) {
                        bind = v;
                    }
                }
                _ => {}
            }
        }

        Self { addr: SocketAddr::new(bind, port) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_loopback_6379() {
        let cfg = Config::from_env_and_args(vec!["kvstored".to_string()]);
        assert_eq!(cfg.addr.port(), DEFAULT_PORT);
        assert_eq!(cfg.addr.ip(), IpAddr::V4(DEFAULT_BIND));
    }

    #[test]
    fn cli_flags_override_defaults() {
        let cfg = Config::from_env_and_args(
            vec!["kvstored", "--port", "7001", "--bind", "0.0.0.0"]
                .into_iter()
                .map(String::from),
        );
        assert_eq!(cfg.addr.port(), 7001);
        assert_eq!(cfg.addr.ip(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }
}
