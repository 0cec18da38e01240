use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 4001;
pub const DEFAULT_BIND: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

const PORT_VAR: &str = "PORT";
const BIND_VAR: &str = "SKETCHMATCH_BIND";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND,
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            bind: parse_or(BIND_VAR, lookup(BIND_VAR), DEFAULT_BIND),
            port: parse_or(PORT_VAR, lookup(PORT_VAR), DEFAULT_PORT),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(value) = value else {
        return default;
    };
    match value.trim().parse() {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Ignoring {key}={value:?} ({e}), using {default}");
            default
        }
    }
}
