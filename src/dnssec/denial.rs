use super::{DnsSecError, errors::Result};
use crate::dns::enums::{DNSResourceType, ResponseCode};
use crate::dns::resource::DNSResource;
use tracing::{debug, trace};

/// NSEC/NSEC3 denial of existence validator, kept for the standalone
/// forwarding-mode path (`dnssec::validator::DnsSecValidator`). The
/// six named denial procedures below (§4.6) are the entry points the
/// iterative state machine uses instead.
pub struct DenialOfExistenceValidator;

impl DenialOfExistenceValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_denial(
        &self,
        packet: &crate::dns::DNSPacket,
        qname: &str,
        qtype: DNSResourceType,
    ) -> Result<()> {
        if packet.header.rcode != ResponseCode::NameError.to_u8() && packet.header.ancount > 0 {
            return Ok(());
        }

        debug!("Validating denial of existence for {} {:?}", qname, qtype);

        let has_nsec3 = packet
            .authorities
            .iter()
            .any(|rr| rr.rtype == DNSResourceType::NSEC3);
        if has_nsec3 {
            return match nsec3_prove(&packet.authorities, qname, Some(qtype))? {
                Nsec3Outcome::Proved | Nsec3Outcome::NotFound => Ok(()),
            };
        }

        let has_nsec = packet
            .authorities
            .iter()
            .any(|rr| rr.rtype == DNSResourceType::NSEC);
        if has_nsec {
            return nsec_existence_or_name_error(&packet.authorities, qname, qtype);
        }

        Err(DnsSecError::DenialOfExistenceFailed)
    }
}

impl Default for DenialOfExistenceValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn nsec_existence_or_name_error(
    section: &[DNSResource],
    qname: &str,
    qtype: DNSResourceType,
) -> Result<()> {
    for nsec in section.iter().filter(|rr| rr.rtype == DNSResourceType::NSEC) {
        let Some((owner, next)) = nsec_owner_next(nsec) else {
            continue;
        };
        if owner.eq_ignore_ascii_case(qname) {
            let denied = nsec_type_bitmap(nsec);
            if !denied.contains(&qtype) {
                return Ok(());
            }
        } else if name_in_range(&owner, &next, qname) {
            return Ok(());
        }
    }
    Err(DnsSecError::DenialOfExistenceFailed)
}

/// Outcome of an NSEC3 proof (§4.6): it may affirmatively prove the
/// denial, or come back `NotFound`, which the caller interprets as an
/// opt-out only in the contexts that permit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nsec3Outcome {
    Proved,
    NotFound,
}

/// NSEC name-error (NXDOMAIN) proof: `section` must contain an NSEC whose
/// (owner, next) range covers `qname`.
pub fn nsec_name_error(section: &[DNSResource], qname: &str) -> Result<()> {
    for nsec in section.iter().filter(|rr| rr.rtype == DNSResourceType::NSEC) {
        let Some((owner, next)) = nsec_owner_next(nsec) else {
            continue;
        };
        if !owner.eq_ignore_ascii_case(qname) && name_in_range(&owner, &next, qname) {
            return Ok(());
        }
    }
    Err(DnsSecError::BadDenial)
}

/// NSEC existence-denial: NODATA for `rtype` at an owner that does exist.
pub fn nsec_existence_denial(
    section: &[DNSResource],
    owner_name: &str,
    rtype: DNSResourceType,
) -> Result<()> {
    for nsec in section.iter().filter(|rr| rr.rtype == DNSResourceType::NSEC) {
        if nsec.labels.join(".").eq_ignore_ascii_case(owner_name) {
            let denied = nsec_type_bitmap(nsec);
            if !denied.contains(&rtype) {
                return Ok(());
            }
        }
    }
    Err(DnsSecError::BadDenial)
}

/// NSEC reference-to-unsigned (RFC 4035 §5.2): `owner_name` falls in the
/// gap covered by an NSEC range, so no signature is expected there.
pub fn nsec_ref_to_unsigned(section: &[DNSResource], owner_name: &str) -> Result<()> {
    for nsec in section.iter().filter(|rr| rr.rtype == DNSResourceType::NSEC) {
        if let Some((owner, next)) = nsec_owner_next(nsec) {
            if name_in_range(&owner, &next, owner_name) {
                return Ok(());
            }
        }
    }
    Err(DnsSecError::BadDenial)
}

pub fn nsec3_name_error(section: &[DNSResource], qname: &str) -> Result<Nsec3Outcome> {
    nsec3_prove(section, qname, None)
}

pub fn nsec3_no_data(
    section: &[DNSResource],
    owner_name: &str,
    rtype: DNSResourceType,
) -> Result<Nsec3Outcome> {
    nsec3_prove(section, owner_name, Some(rtype))
}

pub fn nsec3_ref_to_unsigned(section: &[DNSResource], owner_name: &str) -> Result<Nsec3Outcome> {
    nsec3_prove(section, owner_name, None)
}

struct Nsec3Parsed {
    iterations: u16,
    salt: String,
    next_hash: String,
    types: Vec<DNSResourceType>,
    opt_out: bool,
}

fn parse_nsec3(nsec3: &DNSResource) -> Option<Nsec3Parsed> {
    let parsed = nsec3.parsed_rdata.as_ref()?;
    let parts: Vec<&str> = parsed.split(' ').collect();
    if parts.len() < 5 {
        return None;
    }

    let algorithm = parts[0].parse::<u8>().ok()?;
    if algorithm != 1 {
        return None; // only SHA-1 is defined for NSEC3
    }
    let flags = parts[1].parse::<u8>().unwrap_or(0);
    let iterations = parts[2].parse::<u16>().ok()?;
    let salt = parts[3].to_string();
    let next_hash = parts[4].to_string();
    let types = if parts.len() > 5 {
        parse_nsec_types(&parts[5..])
    } else {
        Vec::new()
    };

    Some(Nsec3Parsed {
        iterations,
        salt,
        next_hash,
        types,
        opt_out: flags & 0x01 != 0,
    })
}

fn nsec3_prove(
    section: &[DNSResource],
    name: &str,
    rtype: Option<DNSResourceType>,
) -> Result<Nsec3Outcome> {
    let nsec3_records: Vec<&DNSResource> = section
        .iter()
        .filter(|rr| rr.rtype == DNSResourceType::NSEC3)
        .collect();
    if nsec3_records.is_empty() {
        return Ok(Nsec3Outcome::NotFound);
    }

    for nsec3 in &nsec3_records {
        let Some(parsed) = parse_nsec3(nsec3) else {
            continue;
        };
        let Ok(hash) = compute_nsec3_hash(name, &parsed.salt, parsed.iterations) else {
            continue;
        };
        let owner_hash = nsec3.labels.first().cloned().unwrap_or_default();

        if owner_hash.eq_ignore_ascii_case(&hash) {
            if let Some(rtype) = rtype {
                if !parsed.types.contains(&rtype) {
                    trace!("NSEC3 proves NODATA for {:?} at {}", rtype, name);
                    return Ok(Nsec3Outcome::Proved);
                }
            }
            continue; // exact hash match with no type gap: name/type exists
        }

        if hash_in_range(&owner_hash, &parsed.next_hash, &hash) {
            if parsed.opt_out {
                debug!("NSEC3 opt-out range covers {}", name);
                return Ok(Nsec3Outcome::NotFound);
            }
            return Ok(Nsec3Outcome::Proved);
        }
    }

    Ok(Nsec3Outcome::NotFound)
}

fn nsec_owner_next(nsec: &DNSResource) -> Option<(String, String)> {
    let parsed = nsec.parsed_rdata.as_ref()?;
    let next = parsed.split(' ').next()?.to_string();
    Some((nsec.labels.join("."), next))
}

fn nsec_type_bitmap(nsec: &DNSResource) -> Vec<DNSResourceType> {
    let Some(parsed) = &nsec.parsed_rdata else {
        return Vec::new();
    };
    let parts: Vec<&str> = parsed.split(' ').collect();
    if parts.len() <= 1 {
        return Vec::new();
    }
    parse_nsec_types(&parts[1..])
}

fn parse_nsec_types(parts: &[&str]) -> Vec<DNSResourceType> {
    parts
        .iter()
        .filter_map(|p| p.parse::<u16>().ok().and_then(DNSResourceType::from_u16))
        .collect()
}

fn name_in_range(owner: &str, next: &str, name: &str) -> bool {
    let owner_lower = owner.to_lowercase();
    let next_lower = next.to_lowercase();
    let name_lower = name.to_lowercase();

    if next_lower < owner_lower {
        name_lower >= owner_lower || name_lower <= next_lower
    } else {
        name_lower >= owner_lower && name_lower <= next_lower
    }
}

fn hash_in_range(owner: &str, next: &str, hash: &str) -> bool {
    let owner_lower = owner.to_lowercase();
    let next_lower = next.to_lowercase();
    let hash_lower = hash.to_lowercase();

    if next_lower < owner_lower {
        hash_lower >= owner_lower || hash_lower <= next_lower
    } else {
        hash_lower >= owner_lower && hash_lower <= next_lower
    }
}

fn compute_nsec3_hash(name: &str, salt: &str, iterations: u16) -> Result<String> {
    use ring::digest;

    let salt_bytes = if salt == "-" {
        Vec::new()
    } else {
        hex::decode(salt).map_err(|_| DnsSecError::InvalidNsec3Parameters)?
    };

    let mut wire_name = Vec::new();
    for label in name.split('.') {
        if !label.is_empty() {
            wire_name.push(label.len() as u8);
            wire_name.extend_from_slice(label.to_lowercase().as_bytes());
        }
    }
    wire_name.push(0);

    let mut hash_input = wire_name.clone();
    hash_input.extend_from_slice(&salt_bytes);
    let mut hash = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, &hash_input);

    for _ in 0..iterations {
        let mut next_input = hash.as_ref().to_vec();
        next_input.extend_from_slice(&salt_bytes);
        hash = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, &next_input);
    }

    Ok(
        base32::encode(base32::Alphabet::Rfc4648 { padding: false }, hash.as_ref())
            .to_lowercase(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_in_range() {
        assert!(name_in_range("a.example.com", "c.example.com", "b.example.com"));
        assert!(!name_in_range("a.example.com", "c.example.com", "d.example.com"));
        assert!(name_in_range("x.example.com", "b.example.com", "a.example.com"));
        assert!(name_in_range("x.example.com", "b.example.com", "z.example.com"));
    }

    #[test]
    fn test_nsec3_hash_computation() {
        let hash = compute_nsec3_hash("example.com", "-", 0).unwrap();
        assert!(!hash.is_empty());

        let hash_with_salt = compute_nsec3_hash("example.com", "aabbccdd", 1).unwrap();
        assert!(!hash_with_salt.is_empty());
        assert_ne!(hash, hash_with_salt);
    }

    #[test]
    fn nsec3_empty_section_is_not_found() {
        assert_eq!(
            nsec3_name_error(&[], "example.com").unwrap(),
            Nsec3Outcome::NotFound
        );
    }
}
