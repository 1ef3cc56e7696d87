use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use hmac::{Hmac, Mac};
use log::{debug, trace};
use regex::Regex;
use sha2::Sha256;

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        // Proxies append to the list; the first entry is the client
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
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
            .and_then(|v| {
                let re = Regex::new(r#"for="?(?P<ip>[^;,"]+)"?"#).ok()?;
                re.captures(v).and_then(|caps| caps.name("ip")).map(|m| m.as_str().to_string())
            })
            .and_then(|s| IpAddr::from_str(&s).ok());
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr.and_then(|s| IpAddr::from_str(&s).ok())
    })
}

/// Splits an `x-signature` header (`ts=1704908010,v1=618c85...`) into its timestamp and hash.
pub fn parse_signature_header(header: &str) -> Option<(String, String)> {
    let mut ts = None;
    let mut v1 = None;
    for part in header.split(',') {
        match part.split_once('=').map(|(k, v)| (k.trim(), v.trim())) {
            Some(("ts", v)) if !v.is_empty() => ts = Some(v.to_string()),
            Some(("v1", v)) if !v.is_empty() => v1 = Some(v.to_string()),
            _ => {},
        }
    }
    ts.zip(v1)
}

/// The string that the gateway signs for a webhook notification. Parts that are absent from the request are left out.
/// Alphanumeric resource ids are signed in lower case.
pub fn signature_manifest(data_id: Option<&str>, request_id: Option<&str>, ts: &str) -> String {
    let mut manifest = String::new();
    if let Some(id) = data_id {
        manifest.push_str(&format!("id:{};", id.to_lowercase()));
    }
    if let Some(request_id) = request_id {
        manifest.push_str(&format!("request-id:{request_id};"));
    }
    manifest.push_str(&format!("ts:{ts};"));
    manifest
}

/// Hex-encoded HMAC-SHA256 of `data`.
pub fn calculate_signature(secret: &str, data: &str) -> String {
    webhook_mac(secret, data).map(|mac| hex::encode(mac.finalize().into_bytes())).unwrap_or_default()
}

/// Checks that `signature` is the hex-encoded HMAC-SHA256 of `data`. The comparison runs in constant time.
pub fn verify_signature(secret: &str, data: &str, signature: &str) -> bool {
    let Ok(signature) = hex::decode(signature.trim()) else {
        return false;
    };
    webhook_mac(secret, data).is_some_and(|mac| mac.verify_slice(&signature).is_ok())
}

fn webhook_mac(secret: &str, data: &str) -> Option<Hmac<Sha256>> {
    // HMAC accepts keys of any length
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(data.as_bytes());
    Some(mac)
}

/// Keeps the digits of a postal code. Returns `None` unless exactly eight remain.
pub fn normalize_cep(cep: &str) -> Option<String> {
    let digits = cep.chars().filter(char::is_ascii_digit).collect::<String>();
    (digits.len() == 8).then_some(digits)
}

/// Formats an eight-digit postal code as `01310-100`. Anything else is returned unchanged.
pub fn format_cep(cep: &str) -> String {
    match normalize_cep(cep) {
        Some(digits) => format!("{}-{}", &digits[..5], &digits[5..]),
        None => cep.to_string(),
    }
}
