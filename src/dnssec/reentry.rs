//! Re-entry / yielding (§4.7): the two places validation pauses to ask the
//! planner for more data — a signer name outside the current trust anchor
//! (§4.7.1), and an RRset with no covering signature at all (§4.7.2).

use tracing::trace;

use super::model::{
    LayerState, Query, ZoneCut, is_strict_subname, label_count, matched_labels,
    strip_leading_labels,
};
use super::rrset_verify;
use crate::dns::DNSPacket;
use crate::dns::enums::DNSResourceType;

/// Outcome of the §4.7.1 signer-name check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerCheckOutcome {
    /// Signer agrees with the trust anchor (or there is nothing to check
    /// against yet); proceed to the key-set updater.
    Proceed,
    /// The cut was moved; the planner must refetch keys.
    Yield,
    /// Already retried once with no progress.
    Fail,
}

/// §4.7.1: find the signer of the first non-yielded RRSIG (answer section
/// first, then authority), and reconcile it against the zone cut's trust
/// anchor.
pub fn signer_check(query: &mut Query, response: &DNSPacket) -> SignerCheckOutcome {
    let signer = response
        .answers
        .iter()
        .chain(response.authorities.iter())
        .find(|rr| rr.rtype == DNSResourceType::RRSIG)
        .and_then(|rr| rrset_verify::parse_rrsig(rr).ok())
        .map(|parsed| parsed.signer_name);

    let Some(ta_owner) = query.zone_cut.trust_anchor_owner() else {
        return SignerCheckOutcome::Proceed;
    };

    let agrees = signer
        .as_deref()
        .map(|s| s.eq_ignore_ascii_case(&ta_owner))
        .unwrap_or(false);
    if agrees {
        return SignerCheckOutcome::Proceed;
    }

    if query.already_yielded {
        trace!("signer check already retried once for {}, failing", query.sname);
        return SignerCheckOutcome::Fail;
    }

    let Some(signer) = signer else {
        trace!("no signer present for {}, leaving cut untouched", query.sname);
        return SignerCheckOutcome::Proceed;
    };

    if is_strict_subname(&signer, &query.zone_cut.name) {
        trace!("signer {} is below cut {}, descending", signer, query.zone_cut.name);
        query.zone_cut.name = signer;
    } else if signer.eq_ignore_ascii_case(&query.zone_cut.name) {
        trace!("signer matches cut name but DS/DNSKEY disagree, retrying");
    } else {
        trace!("signer {} is above cut {}, ascending", signer, query.zone_cut.name);
        if !query.zone_cut.ascend() {
            query.flags.await_cut = true;
        }
        query.zone_cut.name = signer;
    }

    query.already_yielded = true;
    SignerCheckOutcome::Yield
}

/// §4.7.2: decide what to do about an RRset with no covering RRSIG at
/// `owner`, under the current (believed-secure) zone cut.
pub fn handle_missing_rrsig(query: &mut Query, owner: &str) -> LayerState {
    if owner.eq_ignore_ascii_case(&query.zone_cut.name) || query.already_yielded {
        trace!("no RRSIG at cut name {} or already retried, bogus", owner);
        query.mark_bogus();
        return LayerState::Fail;
    }

    let owner_labels = label_count(owner);
    let matched = matched_labels(&query.zone_cut.name, owner);
    let skip = owner_labels.saturating_sub(matched).saturating_sub(1);
    let new_cut_start = strip_leading_labels(owner, skip);

    if is_strict_subname(&new_cut_start, &query.zone_cut.name) {
        trace!("nesting cut at {}", new_cut_start);
        query.zone_cut.descend(new_cut_start);
        query.flags.await_cut = true;
    } else {
        match query.zone_cut.find_ancestor(&new_cut_start).cloned() {
            Some(ancestor) => {
                trace!("reusing ancestor cut {}", ancestor.name);
                query.zone_cut.name = ancestor.name;
                query.zone_cut.key = ancestor.key;
                query.zone_cut.trust_anchor = ancestor.trust_anchor;
            }
            None => {
                trace!("no ancestor for {}, awaiting cut", new_cut_start);
                query.zone_cut = ZoneCut::new(new_cut_start);
                query.flags.await_cut = true;
            }
        }
    }

    query.already_yielded = true;
    LayerState::Yield
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::DNSHeader;
    use crate::dnssec::model::ZoneCut;

    fn empty_response() -> DNSPacket {
        DNSPacket {
            header: DNSHeader::default(),
            questions: Vec::new(),
            answers: Vec::new(),
            authorities: Vec::new(),
            resources: Vec::new(),
            edns: None,
        }
    }

    #[test]
    fn signer_check_without_trust_anchor_proceeds() {
        let mut query = Query::new("example.com", DNSResourceType::A, ZoneCut::new("example.com"));
        let response = empty_response();
        assert_eq!(signer_check(&mut query, &response), SignerCheckOutcome::Proceed);
    }

    #[test]
    fn first_miss_yields_and_descends() {
        let mut query = Query::new(
            "deep.sub.example.com",
            DNSResourceType::A,
            ZoneCut::new("example.com"),
        );
        let verdict = handle_missing_rrsig(&mut query, "deep.sub.example.com");
        assert_eq!(verdict, LayerState::Yield);
        assert!(query.already_yielded);
        assert_eq!(query.zone_cut.name, "sub.example.com");
        assert!(query.flags.await_cut);
    }

    #[test]
    fn miss_at_cut_name_is_bogus() {
        let mut query = Query::new("example.com", DNSResourceType::A, ZoneCut::new("example.com"));
        let verdict = handle_missing_rrsig(&mut query, "example.com");
        assert_eq!(verdict, LayerState::Fail);
        assert!(query.flags.bogus);
    }

    #[test]
    fn second_miss_is_bogus() {
        let mut query = Query::new(
            "deep.sub.example.com",
            DNSResourceType::A,
            ZoneCut::new("example.com"),
        );
        query.already_yielded = true;
        let verdict = handle_missing_rrsig(&mut query, "deep.sub.example.com");
        assert_eq!(verdict, LayerState::Fail);
        assert!(query.flags.bogus);
    }
}
