use std::{net::IpAddr, str::FromStr, sync::OnceLock};

use actix_web::HttpRequest;
use log::{debug, trace, warn};
use regex::Regex;

use crate::config::ServerOptions;

fn forwarded_for_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)for="?\[?(?P<ip>[^;,"\]]+)"#).ok()).as_ref()
}

/// Strips a port from `1.2.3.4:567` style addresses.
fn parse_ip(s: &str) -> Option<IpAddr> {
    let s = s.trim();
    IpAddr::from_str(s).ok().or_else(|| std::net::SocketAddr::from_str(s).ok().map(|a| a.ip()))
}

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The first address in the `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `for` parameter of the `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(parse_ip);
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| forwarded_for_regex().and_then(|re| re.captures(v)))
            .and_then(|caps| caps.name("ip"))
            .and_then(|m| parse_ip(m.as_str()));
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr.and_then(|s| parse_ip(&s))
    })
}

/// True if the request may call the payment webhook. With no whitelist configured, everyone may.
pub fn is_whitelisted_peer(req: &HttpRequest, options: &ServerOptions) -> bool {
    let Some(whitelist) = &options.paystack_whitelist else {
        return true;
    };
    match get_remote_ip(req, options.use_x_forwarded_for, options.use_forwarded) {
        Some(ip) if whitelist.contains(&ip) => true,
        Some(ip) => {
            warn!("💻️ Webhook call from {ip}, which is not on the whitelist. Denying access.");
            false
        },
        None => {
            warn!("💻️ No IP address found for webhook request. Denying access.");
            false
        },
    }
}
