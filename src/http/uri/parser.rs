use std::borrow::Cow;

use super::UriError;

/// Components of a URI reference, borrowed from the input.
#[derive(Debug)]
pub(super) struct Parts<'a> {
    pub scheme: Option<&'a str>,
    pub authority: Option<&'a str>,
    pub path: Cow<'a, str>,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

impl<'a> Parts<'a> {
    /// Split a URI reference into its five components.
    pub fn parse(input: &'a str) -> Result<Self, UriError> {
        if input.bytes().any(|b| b.is_ascii_control() || b == b' ') {
            return Err(UriError::InvalidChar);
        }

        let mut rest = input;

        let fragment = match rest.split_once('#') {
            Some((lead, fragment)) => {
                rest = lead;
                Some(fragment)
            }
            None => None,
        };

        let query = match rest.split_once('?') {
            Some((lead, query)) => {
                rest = lead;
                Some(query)
            }
            None => None,
        };

        let scheme = match rest.find([':', '/']) {
            Some(idx) if rest.as_bytes()[idx] == b':' => {
                let scheme = &rest[..idx];
                if !is_scheme(scheme) {
                    return Err(UriError::InvalidScheme);
                }
                rest = &rest[idx + 1..];
                Some(scheme)
            }
            _ => None,
        };

        let authority = match rest.strip_prefix("//") {
            Some(tail) => {
                let end = tail.find('/').unwrap_or(tail.len());
                rest = &tail[end..];
                Some(&tail[..end])
            }
            None => None,
        };

        Ok(Self {
            scheme,
            authority,
            path: Cow::Borrowed(rest),
            query,
            fragment,
        })
    }
}

fn is_scheme(scheme: &str) -> bool {
    let mut bytes = scheme.bytes();
    matches!(bytes.next(), Some(b) if b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
}

// ===== Authority =====

#[derive(Debug)]
pub(super) struct Authority<'a> {
    pub userinfo: Option<&'a str>,
    pub host: &'a str,
    pub port: Option<u16>,
}

impl<'a> Authority<'a> {
    pub fn parse(authority: &'a str) -> Result<Self, UriError> {
        let (userinfo, hostport) = match authority.rsplit_once('@') {
            Some((userinfo, hostport)) => (Some(userinfo), hostport),
            None => (None, authority),
        };

        let (host, port) = if hostport.starts_with('[') {
            let Some(end) = hostport.find(']') else {
                return Err(UriError::InvalidAuthority);
            };
            let (host, tail) = hostport.split_at(end + 1);
            match tail {
                "" => (host, None),
                _ => match tail.strip_prefix(':') {
                    Some(port) => (host, Some(port)),
                    None => return Err(UriError::InvalidAuthority),
                },
            }
        } else {
            match hostport.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (hostport, None),
            }
        };

        let port = match port {
            None | Some("") => None,
            Some(port) => match port.parse::<u16>() {
                Ok(port) => Some(port),
                Err(_) => return Err(UriError::InvalidAuthority),
            },
        };

        if host.contains(['/', '?', '#', '@']) {
            return Err(UriError::InvalidAuthority);
        }

        Ok(Self { userinfo, host, port })
    }
}
