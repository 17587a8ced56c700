use crate::error::InvalidTarget;
use crate::model::Target;
use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

fn target_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9]{1,3}(\.[0-9]{1,3}){3}:[0-9]{1,5}$").expect("target pattern compiles")
    })
}

/// Parses `/IP:PORT` (any number of leading slashes) into a [`Target`].
pub fn parse_target(path: &str) -> Result<Target, InvalidTarget> {
    let target = path.trim_start_matches('/');
    if !target_pattern().is_match(target) {
        return Err(InvalidTarget::Format);
    }

    let (ip_part, port_part) = target.split_once(':').ok_or(InvalidTarget::Format)?;

    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(ip_part.split('.')) {
        let value: u16 = part.parse().map_err(|_| InvalidTarget::Format)?;
        *slot = u8::try_from(value).map_err(|_| InvalidTarget::Range)?;
    }

    let port: u32 = port_part.parse().map_err(|_| InvalidTarget::Format)?;
    let port = match u16::try_from(port) {
        Ok(0) | Err(_) => return Err(InvalidTarget::Range),
        Ok(port) => port,
    };

    Ok(Target::new(Ipv4Addr::from(octets), port))
}
