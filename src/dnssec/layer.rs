//! Top-level validation layer (§4.1, §4.8): the sole public entry point
//! the iterative resolver drives, `DnssecLayer::consume`.

use tracing::{debug, trace, warn};

use super::delegation::{self, DelegationKind};
use super::denial::{self, Nsec3Outcome};
use super::keyset::{self, KeysetOutcome};
use super::model::{LayerState, RankedRecord, Request};
use super::reentry::{self, SignerCheckOutcome};
use super::section;
use crate::dns::DNSPacket;
use crate::dns::enums::{DNSResourceType, ResponseCode};

/// DNSSEC response validation layer. Stateless itself; all mutable state
/// lives in the `Request`/`Query` the caller threads through each call.
#[derive(Debug, Default, Clone, Copy)]
pub struct DnssecLayer;

impl DnssecLayer {
    pub fn new() -> Self {
        Self
    }

    /// §4.1: consume one response for `request`'s in-flight query.
    /// `state` is the verdict the layers above this one produced; this
    /// layer only acts on `Consume` and otherwise passes the state through
    /// unchanged.
    pub fn consume(
        &self,
        state: LayerState,
        request: &mut Request,
        response: &DNSPacket,
    ) -> LayerState {
        if !matches!(state, LayerState::Consume) {
            return state;
        }
        if !request.query.flags.want || request.query.flags.stub {
            return LayerState::Done;
        }
        if request.query.stype != DNSResourceType::RRSIG
            && !request.query.flags.cached
            && !response.edns.as_ref().map(|e| e.do_flag()).unwrap_or(false)
        {
            request.query.mark_bogus();
            return LayerState::Fail;
        }

        match self.run(request, response) {
            LayerState::Done => self.propagate_to_parent(request),
            other => other,
        }
    }

    fn run(&self, request: &mut Request, response: &DNSPacket) -> LayerState {
        let rcode = response.header.rcode;
        let qtype = request.query.stype;
        let qname = request.query.sname.clone();
        let aa = response.header.aa;

        if request.query.flags.cached {
            return LayerState::Done;
        }

        if qtype == DNSResourceType::DNSKEY && aa && !response.answers.is_empty() {
            return self.handle_dnskey_answer(request, response);
        }

        if rcode == ResponseCode::NameError.to_u8() {
            return self.handle_nxdomain(request, response, &qname);
        }

        if response.answers.is_empty() && aa {
            return self.handle_nodata(request, response, &qname, qtype);
        }

        self.handle_positive(request, response)
    }

    fn handle_dnskey_answer(&self, request: &mut Request, response: &DNSPacket) -> LayerState {
        match reentry::signer_check(&mut request.query, response) {
            SignerCheckOutcome::Yield => return LayerState::Yield,
            SignerCheckOutcome::Fail => {
                request.query.mark_bogus();
                return LayerState::Fail;
            }
            SignerCheckOutcome::Proceed => {}
        }

        match keyset::update_keyset(&mut request.query, &response.answers) {
            Ok(KeysetOutcome::Installed) => LayerState::Done,
            Ok(KeysetOutcome::Retry) => LayerState::Yield,
            Err(err) => {
                warn!("DNSKEY key-set update failed: {}", err);
                request.query.mark_bogus();
                LayerState::Fail
            }
        }
    }

    fn handle_nxdomain(
        &self,
        request: &mut Request,
        response: &DNSPacket,
        qname: &str,
    ) -> LayerState {
        let has_nsec3 = response
            .authorities
            .iter()
            .any(|rr| rr.rtype == DNSResourceType::NSEC3);

        // Preserved verbatim from the original's proof target: the name
        // denied is the query's own sname, not any name echoed in the
        // response, matching the upstream implementation's documented
        // assumption that the two always agree at this point.
        let proved = if has_nsec3 {
            matches!(
                denial::nsec3_name_error(&response.authorities, qname),
                Ok(Nsec3Outcome::Proved) | Ok(Nsec3Outcome::NotFound)
            )
        } else {
            denial::nsec_name_error(&response.authorities, qname).is_ok()
        };

        if proved {
            debug!("authenticated NXDOMAIN for {}", qname);
            LayerState::Done
        } else {
            request.query.mark_bogus();
            LayerState::Fail
        }
    }

    fn handle_nodata(
        &self,
        request: &mut Request,
        response: &DNSPacket,
        qname: &str,
        qtype: DNSResourceType,
    ) -> LayerState {
        let has_nsec3 = response
            .authorities
            .iter()
            .any(|rr| rr.rtype == DNSResourceType::NSEC3);

        let proved = if has_nsec3 {
            match denial::nsec3_no_data(&response.authorities, qname, qtype) {
                Ok(Nsec3Outcome::Proved) => true,
                // An NSEC3 NODATA dispatch that comes back empty is accepted
                // as an opt-out only for NODATA, never for NXDOMAIN.
                Ok(Nsec3Outcome::NotFound) => true,
                Err(_) => false,
            }
        } else {
            denial::nsec_existence_denial(&response.authorities, qname, qtype).is_ok()
        };

        if proved {
            debug!("authenticated NODATA for {} {:?}", qname, qtype);
            LayerState::Done
        } else {
            request.query.mark_bogus();
            LayerState::Fail
        }
    }

    fn handle_positive(&self, request: &mut Request, response: &DNSPacket) -> LayerState {
        request.answ_selected = response
            .answers
            .iter()
            .cloned()
            .map(RankedRecord::new)
            .collect();
        request.auth_selected = response
            .authorities
            .iter()
            .cloned()
            .map(RankedRecord::new)
            .collect();

        let Some(keys) = request.query.zone_cut.key.clone() else {
            trace!("no keys at {} yet, yielding", request.query.zone_cut.name);
            return LayerState::Yield;
        };

        match section::validate_records(request, &keys) {
            Ok(wexpand) => {
                request.query.flags.wexpand = wexpand;
                if wexpand {
                    for rr in request.auth_selected.iter_mut() {
                        rr.wexpand = true;
                    }
                }
            }
            Err(err) => {
                warn!("section validation error: {}", err);
                request.query.mark_bogus();
                return LayerState::Fail;
            }
        }

        let answ_verdict =
            section::verdict_from_ranks(&mut request.answ_selected, &mut request.query);
        if !matches!(answ_verdict, LayerState::Done) {
            return answ_verdict;
        }
        let auth_verdict =
            section::verdict_from_ranks(&mut request.auth_selected, &mut request.query);
        if !matches!(auth_verdict, LayerState::Done) {
            return auth_verdict;
        }

        if let Some(kind) = delegation::classify_response(response.header.aa, request.query.stype) {
            let section = request.section(delegation::section_for(kind)).to_vec();
            let records: Vec<_> = section.into_iter().map(|rr| rr.record).collect();
            if let Err(err) = delegation::update_delegation(&mut request.query, &records, kind) {
                warn!("delegation update failed: {}", err);
                return LayerState::Fail;
            }
        }

        LayerState::Done
    }

    /// §4.8: once this query is fully resolved, fold its outcome into the
    /// parent query that spawned it (a DS/DNSKEY subquery dispatched on an
    /// earlier `Yield`), so the parent's next `consume` call sees the
    /// updated zone cut rather than redoing the work.
    fn propagate_to_parent(&self, request: &mut Request) -> LayerState {
        if let Some(parent) = request.query.parent.as_mut() {
            parent.zone_cut = request.query.zone_cut.clone();
            if request.query.flags.insecure {
                parent.flags.insecure = true;
            }
            if request.query.flags.bogus {
                parent.flags.bogus = true;
            }
        }
        LayerState::Done
    }
}
