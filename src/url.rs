// Copyright (C) 2026  Braiins Systems s.r.o.
//
// This file is part of Braiins Open-Source Initiative (BOSI).
//
// BOSI is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// Please, keep in mind that we may also license BOSI or any part thereof
// under a proprietary license. For more information on the terms and conditions
// of such proprietary license or if you have any other questions, please
// contact us at opensource@braiins.com.

//! URL and proxy-prefix parsing (spec.md §6 "URL parsing", SPEC_FULL
//! §4.9), grounded in `extract_sockaddr` and `get_proxy` (`util.c`).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("empty host in url")]
    EmptyHost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SockAddr {
    pub host: String,
    pub port: String,
}

/// Parses `[scheme://]host[:port]`, with IPv6 hosts wrapped in `[...]`.
/// Defaults the port to `"80"` when absent, mirroring
/// `extract_sockaddr`.
pub fn extract_sockaddr(url: &str) -> Result<SockAddr, UrlError> {
    let after_scheme = match url.find("//") {
        Some(idx) => &url[idx + 2..],
        None => url,
    };

    let ipv6_begin = after_scheme.find('[');
    let ipv6_end = after_scheme.find(']');

    let (host, rest) = if let (Some(b), Some(e)) = (ipv6_begin, ipv6_end) {
        if e > b {
            (&after_scheme[..e + 1], &after_scheme[e + 1..])
        } else {
            split_at_colon(after_scheme)
        }
    } else {
        split_at_colon(after_scheme)
    };

    if host.is_empty() {
        return Err(UrlError::EmptyHost);
    }

    let port = if let Some(stripped) = rest.strip_prefix(':') {
        if stripped.is_empty() {
            return Err(UrlError::EmptyHost);
        }
        stripped.to_string()
    } else {
        "80".to_string()
    };

    Ok(SockAddr {
        host: host.to_string(),
        port,
    })
}

fn split_at_colon(s: &str) -> (&str, &str) {
    match s.find(':') {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    }
}

/// Proxy kind recognized by the `<proxytype>:<proxyhost>|<realurl>`
/// prefix syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyType {
    Http,
    Http0,
    Socks4,
    Socks5,
    Socks4a,
    Socks5h,
}

impl ProxyType {
    const TABLE: &'static [(&'static str, ProxyType)] = &[
        ("http:", ProxyType::Http),
        ("http0:", ProxyType::Http0),
        ("socks4:", ProxyType::Socks4),
        ("socks5:", ProxyType::Socks5),
        ("socks4a:", ProxyType::Socks4a),
        ("socks5h:", ProxyType::Socks5h),
    ];

    /// Mirrors `proxytype()`: the prefix string for a given kind.
    pub fn name(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(_, t)| *t == self)
            .map(|(n, _)| *n)
            .expect("BUG: every ProxyType variant is in TABLE")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedProxy {
    pub proxy_type: ProxyType,
    pub proxy_host: String,
}

/// Splits an optional `<proxytype>:<proxyhost>|<realurl>` prefix off of
/// `url`, mirroring `get_proxy`. Returns the (possibly absent) proxy
/// descriptor and the remaining real URL.
pub fn get_proxy(url: &str) -> (Option<ParsedProxy>, &str) {
    for (prefix, kind) in ProxyType::TABLE {
        if let Some(rest) = url.strip_prefix(prefix) {
            if let Some(bar) = rest.find('|') {
                let proxy_host = rest[..bar].to_string();
                let real_url = &rest[bar + 1..];
                return (
                    Some(ParsedProxy {
                        proxy_type: *kind,
                        proxy_host,
                    }),
                    real_url,
                );
            }
            // prefix matched but no '|real_url' — not a proxy spec, the
            // whole string is the url (mirrors the original returning
            // `url` unchanged when no '|' is found).
            return (None, url);
        }
    }
    (None, url)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plain_host_port() {
        let addr = extract_sockaddr("stratum+tcp://pool.example.com:3333").unwrap();
        assert_eq!(addr.host, "pool.example.com");
        assert_eq!(addr.port, "3333");
    }

    #[test]
    fn default_port_is_80() {
        let addr = extract_sockaddr("pool.example.com").unwrap();
        assert_eq!(addr.port, "80");
    }

    #[test]
    fn ipv6_literal_host() {
        let addr = extract_sockaddr("[::1]:3333").unwrap();
        assert_eq!(addr.host, "[::1]");
        assert_eq!(addr.port, "3333");
    }

    #[test]
    fn proxy_prefix_splits_off() {
        let (proxy, rest) = get_proxy("socks5:127.0.0.1:9050|stratum+tcp://pool.example.com:3333");
        let proxy = proxy.unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::Socks5);
        assert_eq!(proxy.proxy_host, "127.0.0.1:9050");
        assert_eq!(rest, "stratum+tcp://pool.example.com:3333");
        assert_eq!(proxy.proxy_type.name(), "socks5:");
    }

    #[test]
    fn no_proxy_prefix_returns_whole_url() {
        let (proxy, rest) = get_proxy("stratum+tcp://pool.example.com:3333");
        assert!(proxy.is_none());
        assert_eq!(rest, "stratum+tcp://pool.example.com:3333");
    }
}
