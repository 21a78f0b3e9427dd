//! Delegation updater (§4.5): folds a DS answer or referral's authority
//! section into the zone cut's trust anchor, or proves its absence.

use tracing::debug;

use super::denial::{self, Nsec3Outcome};
use super::model::{Query, Section};
use super::{DnsSecError, errors::Result};
use crate::dns::enums::DNSResourceType;
use crate::dns::resource::DNSResource;

/// Which kind of response triggered the delegation update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegationKind {
    /// A referral: NS (and maybe DS) arrived in the authority section.
    Referral,
    /// A direct answer to a DS query.
    Authoritative,
}

/// §4.5: inspect `section` for DS records at `query.zone_cut.name`. If any
/// are present, aggregate them (order-independent merge by owner) and
/// install as the new trust anchor. If none are present, the absence must
/// be proven by the accompanying NSEC/NSEC3 records before the name can be
/// treated as falling out of the signed chain.
pub fn update_delegation(
    query: &mut Query,
    section: &[DNSResource],
    kind: DelegationKind,
) -> Result<()> {
    let owner = query.zone_cut.name.clone();

    let ds: Vec<DNSResource> = section
        .iter()
        .filter(|rr| rr.rtype == DNSResourceType::DS && rr.labels.join(".").eq_ignore_ascii_case(&owner))
        .cloned()
        .collect();

    if !ds.is_empty() {
        debug!("installed {} DS record(s) as trust anchor at {}", ds.len(), owner);
        query.zone_cut.trust_anchor = Some(ds);
        return Ok(());
    }

    let has_nsec3 = section.iter().any(|rr| rr.rtype == DNSResourceType::NSEC3);

    let proven = if has_nsec3 {
        let outcome = match kind {
            DelegationKind::Referral => denial::nsec3_ref_to_unsigned(section, &owner)?,
            DelegationKind::Authoritative => {
                denial::nsec3_no_data(section, &owner, DNSResourceType::DS)?
            }
        };
        matches!(outcome, Nsec3Outcome::Proved | Nsec3Outcome::NotFound)
    } else {
        match kind {
            DelegationKind::Referral => denial::nsec_ref_to_unsigned(section, &owner).is_ok(),
            DelegationKind::Authoritative => {
                denial::nsec_existence_denial(section, &owner, DNSResourceType::DS).is_ok()
            }
        }
    };

    if proven {
        query.mark_insecure();
        Ok(())
    } else {
        query.mark_bogus();
        Err(DnsSecError::BadDenial)
    }
}

/// §4.5: decide which section and kind apply to the current response. A
/// non-authoritative response is a referral, carrying its (possible) DS in
/// the authority section; an authoritative answer to a DS query carries it
/// in the answer section. Anything else has no delegation-relevant material.
pub fn classify_response(response_aa: bool, qtype: DNSResourceType) -> Option<DelegationKind> {
    if !response_aa {
        Some(DelegationKind::Referral)
    } else if qtype == DNSResourceType::DS {
        Some(DelegationKind::Authoritative)
    } else {
        None
    }
}

pub fn section_for(kind: DelegationKind) -> Section {
    match kind {
        DelegationKind::Referral => Section::Authority,
        DelegationKind::Authoritative => Section::Answer,
    }
}
