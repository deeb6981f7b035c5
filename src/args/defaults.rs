use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Run files checked in the working directory when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILES: [&str; 2] = ["volley.toml", "volley.json"];

const DEFAULT_LISTEN_PORT: u16 = 5000;

pub(crate) const fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_LISTEN_PORT)
}
