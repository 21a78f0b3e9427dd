//! Per-RRset signature verification (§4.3.1), generalized from
//! `dnssec::validator`'s single-packet routine to accept an externally
//! supplied candidate key set and reference timestamp.

use ring::signature;
use tracing::trace;

use super::{DnsSecAlgorithm, DnsSecError, calculate_key_tag, errors::Result};
use crate::dns::resource::DNSResource;

/// Parsed RRSIG RDATA (RFC 4034 §3.1).
#[derive(Debug, Clone)]
pub struct RrsigData {
    pub type_covered: u16,
    pub algorithm: u8,
    pub labels: u8,
    pub original_ttl: u32,
    pub sig_expiration: u32,
    pub sig_inception: u32,
    pub key_tag: u16,
    pub signer_name: String,
    pub signature: Vec<u8>,
}

/// Parsed DNSKEY RDATA (RFC 4034 §2.1).
#[derive(Debug, Clone)]
pub struct DnskeyData {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: Vec<u8>,
    pub key_tag: u16,
}

/// Outcome of verifying one RRset against a set of candidate RRSIGs and
/// keys (§4.3.1's four-way contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Ok { wexpand: bool },
    NoSignature,
    Bogus,
    Unknown,
}

pub fn parse_rrsig(rrsig: &DNSResource) -> Result<RrsigData> {
    if rrsig.rdata.len() < 18 {
        return Err(DnsSecError::InvalidSignature);
    }

    let type_covered = u16::from_be_bytes([rrsig.rdata[0], rrsig.rdata[1]]);
    let algorithm = rrsig.rdata[2];
    let labels = rrsig.rdata[3];
    let original_ttl = u32::from_be_bytes([
        rrsig.rdata[4],
        rrsig.rdata[5],
        rrsig.rdata[6],
        rrsig.rdata[7],
    ]);
    let sig_expiration = u32::from_be_bytes([
        rrsig.rdata[8],
        rrsig.rdata[9],
        rrsig.rdata[10],
        rrsig.rdata[11],
    ]);
    let sig_inception = u32::from_be_bytes([
        rrsig.rdata[12],
        rrsig.rdata[13],
        rrsig.rdata[14],
        rrsig.rdata[15],
    ]);
    let key_tag = u16::from_be_bytes([rrsig.rdata[16], rrsig.rdata[17]]);

    let (signer_name, signature_start) = parse_domain_name(&rrsig.rdata[18..])?;
    let signature = rrsig.rdata[18 + signature_start..].to_vec();

    Ok(RrsigData {
        type_covered,
        algorithm,
        labels,
        original_ttl,
        sig_expiration,
        sig_inception,
        key_tag,
        signer_name,
        signature,
    })
}

pub fn parse_dnskey(dnskey: &DNSResource) -> Result<DnskeyData> {
    if dnskey.rdata.len() < 4 {
        return Err(DnsSecError::InvalidPublicKey);
    }

    let flags = u16::from_be_bytes([dnskey.rdata[0], dnskey.rdata[1]]);
    let protocol = dnskey.rdata[2];
    let algorithm = dnskey.rdata[3];
    let public_key = dnskey.rdata[4..].to_vec();
    let key_tag = calculate_key_tag(flags, protocol, algorithm, &public_key);

    Ok(DnskeyData {
        flags,
        protocol,
        algorithm,
        public_key,
        key_tag,
    })
}

/// Uncompressed domain name parse, as it appears inside RRSIG RDATA (no
/// compression pointers are permitted there per RFC 4034 §3.1.7).
fn parse_domain_name(data: &[u8]) -> Result<(String, usize)> {
    let mut labels = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let len = data[pos] as usize;
        if len == 0 {
            pos += 1;
            break;
        }
        if len > 63 {
            return Err(DnsSecError::InvalidSignature);
        }
        pos += 1;
        if pos + len > data.len() {
            return Err(DnsSecError::InvalidSignature);
        }
        labels.push(String::from_utf8_lossy(&data[pos..pos + len]).to_string());
        pos += len;
    }

    let name = if labels.is_empty() {
        ".".to_string()
    } else {
        labels.join(".")
    };

    Ok((name, pos))
}

/// §4.3.1: verify one RRset (`records`, all sharing owner/type/class)
/// against the RRSIGs that claim to cover it (`rrsigs`) and the candidate
/// key set. `owner_labels` is the owner name's label count, used for the
/// wildcard-expansion check.
pub fn verify_rrset(
    owner_labels: u8,
    records: &[&DNSResource],
    rrsigs: &[&DNSResource],
    keys: &[DNSResource],
    timestamp: u32,
) -> VerifyOutcome {
    if rrsigs.is_empty() {
        return VerifyOutcome::NoSignature;
    }

    let mut saw_parseable = false;
    for rrsig_rr in rrsigs {
        let rrsig = match parse_rrsig(rrsig_rr) {
            Ok(r) => r,
            Err(_) => continue,
        };
        saw_parseable = true;

        if timestamp < rrsig.sig_inception || timestamp > rrsig.sig_expiration {
            trace!(
                "rrsig outside validity window: inception={} expiration={} now={}",
                rrsig.sig_inception, rrsig.sig_expiration, timestamp
            );
            continue;
        }

        let Some(algorithm) = DnsSecAlgorithm::from_u8(rrsig.algorithm) else {
            continue;
        };
        if !algorithm.is_supported() {
            continue;
        }

        let Some(key_rr) = keys.iter().find(|k| {
            parse_dnskey(k)
                .map(|d| d.key_tag == rrsig.key_tag && d.algorithm == rrsig.algorithm)
                .unwrap_or(false)
        }) else {
            continue;
        };
        let Ok(dnskey) = parse_dnskey(key_rr) else {
            continue;
        };

        let Ok(signed_data) = build_signed_data(&rrsig, records) else {
            continue;
        };
        let Some(verify_alg) = algorithm.ring_algorithm() else {
            continue;
        };

        let public_key = signature::UnparsedPublicKey::new(verify_alg, &dnskey.public_key);
        if public_key.verify(&signed_data, &rrsig.signature).is_ok() {
            return VerifyOutcome::Ok {
                wexpand: rrsig.labels < owner_labels,
            };
        }
    }

    if saw_parseable {
        VerifyOutcome::Bogus
    } else {
        VerifyOutcome::Unknown
    }
}

/// RFC 4034 §3.1.8.1 canonical signed-data construction.
fn build_signed_data(rrsig: &RrsigData, records: &[&DNSResource]) -> Result<Vec<u8>> {
    let mut data = Vec::new();

    data.extend_from_slice(&rrsig.type_covered.to_be_bytes());
    data.push(rrsig.algorithm);
    data.push(rrsig.labels);
    data.extend_from_slice(&rrsig.original_ttl.to_be_bytes());
    data.extend_from_slice(&rrsig.sig_expiration.to_be_bytes());
    data.extend_from_slice(&rrsig.sig_inception.to_be_bytes());
    data.extend_from_slice(&rrsig.key_tag.to_be_bytes());

    for label in rrsig.signer_name.split('.') {
        if !label.is_empty() {
            data.push(label.len() as u8);
            data.extend_from_slice(label.to_lowercase().as_bytes());
        }
    }
    data.push(0);

    let mut sorted_records = records.to_vec();
    sorted_records.sort_by(|a, b| a.rdata.cmp(&b.rdata));

    for record in sorted_records {
        for label in &record.labels {
            if !label.is_empty() {
                data.push(label.len() as u8);
                data.extend_from_slice(label.to_lowercase().as_bytes());
            }
        }
        data.push(0);

        let rtype_u16: u16 = record.rtype.into();
        let rclass_u16: u16 = record.rclass.into();
        data.extend_from_slice(&rtype_u16.to_be_bytes());
        data.extend_from_slice(&rclass_u16.to_be_bytes());
        data.extend_from_slice(&rrsig.original_ttl.to_be_bytes());

        data.extend_from_slice(&(record.rdata.len() as u16).to_be_bytes());
        data.extend_from_slice(&record.rdata);
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rrsigs_means_no_signature() {
        let records: Vec<&DNSResource> = Vec::new();
        let rrsigs: Vec<&DNSResource> = Vec::new();
        let keys: Vec<DNSResource> = Vec::new();
        assert_eq!(
            verify_rrset(2, &records, &rrsigs, &keys, 0),
            VerifyOutcome::NoSignature
        );
    }
}
