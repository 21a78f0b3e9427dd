//! Section-level validation driver (§4.3.2 / §4.3.3): runs the classifier
//! over answer and authority, then turns the resulting ranks into a verdict.

use tracing::{debug, trace};

use super::classify;
use super::model::{LayerState, Query, Rank, RankedRecord, Request, Section};
use super::reentry;
use super::{DnsSecError, errors::Result};
use crate::dns::resource::DNSResource;

pub struct SectionResult {
    pub any_rrsig: bool,
    pub wexpand: bool,
}

/// Thin wrapper over the classifier for one section.
pub fn validate_section(
    records: &mut [RankedRecord],
    section: Section,
    zone_name: &str,
    keys: &[DNSResource],
    timestamp: u32,
) -> SectionResult {
    let outcome = classify::classify_section(records, section, zone_name, keys, timestamp);
    SectionResult {
        any_rrsig: outcome.any_rrsig,
        wexpand: outcome.wexpand,
    }
}

/// §4.3.3: validate both sections of a request against the current zone
/// cut's keys, at the snapshot of `zone_cut.name` taken before either
/// section is processed (the "restore zone_name" caveat the C source
/// works around does not apply here, since we never mutate the name
/// mid-pass — a mismatch instead produces `Rank::Mismatch` for the
/// top-level verdict pass to act on).
pub fn validate_records(request: &mut Request, keys: &[DNSResource]) -> Result<bool> {
    let zone_name = request.query.zone_cut.name.clone();
    let timestamp = request.query.timestamp;

    let answ = validate_section(
        &mut request.answ_selected,
        Section::Answer,
        &zone_name,
        keys,
        timestamp,
    );
    let auth = validate_section(
        &mut request.auth_selected,
        Section::Authority,
        &zone_name,
        keys,
        timestamp,
    );

    if answ.any_rrsig && !auth.any_rrsig && request.auth_selected.iter().any(|r| !r.yielded) {
        debug!("answer carried RRSIGs but authority did not; propagating NoRrsig");
        return Err(DnsSecError::NoRrsig);
    }

    Ok(answ.wexpand || auth.wexpand)
}

/// §4.3.2: scan ranked records for a signer-name mismatch first (these win
/// over everything else, since they redirect the whole validation), then
/// decide the verdict from the remaining ranks.
pub fn verdict_from_ranks(records: &mut [RankedRecord], query: &mut Query) -> LayerState {
    for rr in records.iter() {
        if rr.yielded {
            continue;
        }
        if rr.rank == Rank::Mismatch {
            if let Some(signer) = &rr.mismatch_signer {
                trace!("zone cut mismatch, descending to signer {}", signer);
                query.zone_cut.name = signer.clone();
                return LayerState::Yield;
            }
        }
    }

    for rr in records.iter() {
        if rr.yielded {
            continue;
        }
        match rr.rank {
            Rank::Insecure => return reentry::handle_missing_rrsig(query, &rr.owner()),
            Rank::Bad | Rank::Unknown => {
                query.mark_bogus();
                return LayerState::Fail;
            }
            _ => {}
        }
    }

    LayerState::Done
}
