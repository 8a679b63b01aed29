use std::borrow::Cow;

use super::parser::Parts;
use super::{Uri, UriError};

/// [RFC3986 section 5.2.2](https://www.rfc-editor.org/rfc/rfc3986#section-5.2.2)
pub(super) fn resolve(base: &Uri, reference: &str) -> Result<Uri, UriError> {
    let r = Parts::parse(reference.trim())?;

    if r.scheme.is_some() {
        let path = remove_dot_segments(&r.path);
        return Uri::from_parts(Parts { path: Cow::Owned(path), ..r });
    }

    if r.authority.is_some() {
        let path = remove_dot_segments(&r.path);
        return Uri::from_parts(Parts {
            scheme: Some(&base.scheme),
            path: Cow::Owned(path),
            ..r
        });
    }

    let (path, query) = if r.path.is_empty() {
        (base.path.clone(), r.query.or(base.query.as_deref()))
    } else if r.path.starts_with('/') {
        (remove_dot_segments(&r.path), r.query)
    } else {
        (remove_dot_segments(&merge(base, &r.path)), r.query)
    };

    Ok(Uri {
        scheme: base.scheme.clone(),
        userinfo: base.userinfo.clone(),
        host: base.host.clone(),
        port: base.port,
        path,
        query: query.map(str::to_owned),
        fragment: r.fragment.map(str::to_owned),
    })
}

fn merge(base: &Uri, path: &str) -> String {
    if base.path.is_empty() {
        return format!("/{path}");
    }
    match base.path.rfind('/') {
        Some(idx) => format!("{}{path}", &base.path[..=idx]),
        None => path.to_owned(),
    }
}

/// [RFC3986 section 5.2.4](https://www.rfc-editor.org/rfc/rfc3986#section-5.2.4)
pub(super) fn remove_dot_segments(mut input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            pop_segment(&mut output);
        } else if input == "/.." {
            input = "/";
            pop_segment(&mut output);
        } else if input == "." || input == ".." {
            input = "";
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..].find('/').map_or(input.len(), |i| i + start);
            output.push_str(&input[..end]);
            input = &input[end..];
        }
    }

    output
}

fn pop_segment(output: &mut String) {
    match output.rfind('/') {
        Some(idx) => output.truncate(idx),
        None => output.clear(),
    }
}
