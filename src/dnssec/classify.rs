//! Record classifier (§4.2): per-section pass deciding what each ranked
//! record is and whether it is subject to this validation round.

use std::collections::HashMap;
use tracing::trace;

use super::model::{Rank, RankedRecord, Section, label_count};
use super::rrset_verify::{self, VerifyOutcome};
use crate::dns::enums::DNSResourceType;
use crate::dns::resource::DNSResource;

pub struct ClassifyOutcome {
    /// Whether any RRSIG record at all was present in the section.
    pub any_rrsig: bool,
    /// Whether any verified RRset showed wildcard expansion.
    pub wexpand: bool,
}

/// Classify and verify every non-yielded, non-secure record of one section
/// in place, mutating each record's `rank`.
pub fn classify_section(
    records: &mut [RankedRecord],
    section: Section,
    zone_name: &str,
    keys: &[DNSResource],
    timestamp: u32,
) -> ClassifyOutcome {
    let mut any_rrsig = false;

    for rr in records.iter_mut() {
        if rr.yielded || rr.rank == Rank::Secure {
            continue;
        }
        if rr.record.rtype == DNSResourceType::RRSIG {
            any_rrsig = true;
            match rrset_verify::parse_rrsig(&rr.record) {
                Ok(parsed) if parsed.signer_name.eq_ignore_ascii_case(zone_name) => {
                    rr.rank = Rank::Secure;
                }
                Ok(parsed) => {
                    rr.rank = Rank::Mismatch;
                    rr.mismatch_signer = Some(parsed.signer_name);
                }
                Err(_) => rr.rank = Rank::Unknown,
            }
        } else if rr.record.rtype == DNSResourceType::NS && section == Section::Authority {
            rr.rank = Rank::Secure;
        }
    }

    let mut wexpand = false;
    let mut groups: HashMap<(String, DNSResourceType), Vec<usize>> = HashMap::new();
    for (i, rr) in records.iter().enumerate() {
        if rr.yielded || rr.rank != Rank::Initial {
            continue;
        }
        groups
            .entry((rr.owner(), rr.record.rtype))
            .or_default()
            .push(i);
    }

    for ((owner, rtype), indices) in groups {
        let owner_labels = label_count(&owner) as u8;
        let rrset: Vec<&DNSResource> = indices.iter().map(|&i| &records[i].record).collect();
        let rrsigs: Vec<&DNSResource> = records
            .iter()
            .filter(|rr| {
                rr.record.rtype == DNSResourceType::RRSIG
                    && rr.owner().eq_ignore_ascii_case(&owner)
                    && rrset_verify::parse_rrsig(&rr.record)
                        .map(|p| p.type_covered == rtype.to_u16())
                        .unwrap_or(false)
            })
            .map(|rr| &rr.record)
            .collect();

        let outcome = rrset_verify::verify_rrset(owner_labels, &rrset, &rrsigs, keys, timestamp);
        trace!("verify_rrset {} {:?}: {:?}", owner, rtype, outcome);

        let rank = match outcome {
            VerifyOutcome::Ok { wexpand: w } => {
                if w {
                    wexpand = true;
                }
                Rank::Secure
            }
            VerifyOutcome::NoSignature => Rank::Insecure,
            VerifyOutcome::Bogus => Rank::Bad,
            VerifyOutcome::Unknown => Rank::Unknown,
        };
        for &i in &indices {
            records[i].rank = rank;
        }
    }

    ClassifyOutcome { any_rrsig, wexpand }
}
