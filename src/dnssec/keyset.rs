//! Key-set updater (§4.4): merges a DNSKEY answer into the current zone
//! cut once it has been authenticated against the trust anchor's DS.

use tracing::debug;

use super::model::Query;
use super::rrset_verify::{self, VerifyOutcome};
use super::{DigestType, DnsSecError, errors::Result};
use crate::dns::enums::DNSResourceType;
use crate::dns::resource::DNSResource;

struct DsData {
    key_tag: u16,
    algorithm: u8,
    digest_type: u8,
    digest: Vec<u8>,
}

fn parse_ds(ds: &DNSResource) -> Result<DsData> {
    if ds.rdata.len() < 4 {
        return Err(DnsSecError::Malformed("DS record too short".to_string()));
    }
    Ok(DsData {
        key_tag: u16::from_be_bytes([ds.rdata[0], ds.rdata[1]]),
        algorithm: ds.rdata[2],
        digest_type: ds.rdata[3],
        digest: ds.rdata[4..].to_vec(),
    })
}

fn compute_dnskey_digest(
    domain: &str,
    dnskey: &rrset_verify::DnskeyData,
    digest_type: u8,
) -> Result<Vec<u8>> {
    let digest_type =
        DigestType::from_u8(digest_type).ok_or(DnsSecError::UnsupportedDigestType(digest_type))?;

    let mut data = Vec::new();
    for label in domain.split('.') {
        if !label.is_empty() {
            data.push(label.len() as u8);
            data.extend_from_slice(label.to_lowercase().as_bytes());
        }
    }
    data.push(0);

    data.extend_from_slice(&dnskey.flags.to_be_bytes());
    data.push(dnskey.protocol);
    data.push(dnskey.algorithm);
    data.extend_from_slice(&dnskey.public_key);

    digest_type
        .digest(&data)
        .ok_or(DnsSecError::UnsupportedDigestType(digest_type.to_u8()))
}

/// Outcome of §4.4's key-set update, as distinguished by §4.1(a)'s caller:
/// a plain failure is BOGUS, but a missing trust anchor just means the
/// planner hasn't fetched DS for this cut yet and should be asked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeysetOutcome {
    Installed,
    Retry,
}

/// §4.4: given a DNSKEY answer at `query.zone_cut.name`, find the subset of
/// keys that chain to the current trust anchor and whose self-signature
/// validates, then install them as the zone cut's key set.
pub fn update_keyset(query: &mut Query, answer: &[DNSResource]) -> Result<KeysetOutcome> {
    let domain = query.zone_cut.name.clone();
    let Some(trust_anchor) = query.zone_cut.trust_anchor.clone() else {
        return Ok(KeysetOutcome::Retry);
    };

    let dnskeys: Vec<&DNSResource> = answer
        .iter()
        .filter(|rr| rr.rtype == DNSResourceType::DNSKEY)
        .collect();
    if dnskeys.is_empty() {
        return Err(DnsSecError::ChainBroken);
    }

    let ds_records: Vec<DsData> = trust_anchor
        .iter()
        .filter(|rr| rr.rtype == DNSResourceType::DS)
        .filter_map(|rr| parse_ds(rr).ok())
        .collect();
    if ds_records.is_empty() {
        return Err(DnsSecError::NoDs);
    }

    let mut trusted: Vec<DNSResource> = Vec::new();
    for key_rr in &dnskeys {
        let Ok(dnskey) = rrset_verify::parse_dnskey(key_rr) else {
            continue;
        };
        let matches = ds_records.iter().any(|ds| {
            ds.key_tag == dnskey.key_tag
                && ds.algorithm == dnskey.algorithm
                && compute_dnskey_digest(&domain, &dnskey, ds.digest_type)
                    .map(|digest| digest == ds.digest)
                    .unwrap_or(false)
        });
        if matches {
            trusted.push((*key_rr).clone());
        }
    }

    if trusted.is_empty() {
        return Err(DnsSecError::ChainBroken);
    }

    let rrsigs: Vec<&DNSResource> = answer
        .iter()
        .filter(|rr| {
            rr.rtype == DNSResourceType::RRSIG
                && rrset_verify::parse_rrsig(rr)
                    .map(|p| p.type_covered == DNSResourceType::DNSKEY.to_u16())
                    .unwrap_or(false)
        })
        .collect();

    let owner_labels = domain.trim_end_matches('.').split('.').filter(|l| !l.is_empty()).count() as u8;
    let all_keys: Vec<DNSResource> = dnskeys.iter().map(|k| (*k).clone()).collect();
    match rrset_verify::verify_rrset(owner_labels, &dnskeys, &rrsigs, &all_keys, query.timestamp) {
        VerifyOutcome::Ok { .. } => {
            debug!("installed {} trusted DNSKEY(s) at {}", trusted.len(), domain);
            query.zone_cut.key = Some(trusted);
            Ok(KeysetOutcome::Installed)
        }
        _ => Err(DnsSecError::ChainBroken),
    }
}
