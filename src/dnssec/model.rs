//! Data model shared by the validation state machine: queries, zone cuts,
//! ranked records and the small per-section validation context.

use crate::dns::enums::{DNSResourceClass, DNSResourceType};
use crate::dns::resource::DNSResource;

/// Verdict of `DnssecLayer::consume` (§6 layer contract). `Produce`/`Consume`
/// are carried through unchanged by this layer; it only ever produces
/// `Done`/`Yield`/`Fail` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerState {
    Produce,
    Consume,
    Done,
    Yield,
    Fail,
}

/// Which section of the response a record was selected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Answer,
    Authority,
}

/// Per-record verification verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rank {
    #[default]
    Initial,
    Secure,
    Insecure,
    Bad,
    Mismatch,
    Unknown,
}

/// A record selected by earlier layers, carrying its mutable rank.
#[derive(Debug, Clone)]
pub struct RankedRecord {
    pub record: DNSResource,
    pub rank: Rank,
    pub yielded: bool,
    /// Set when `rank == Mismatch`: the RRSIG's signer name, which becomes
    /// the candidate new zone cut name.
    pub mismatch_signer: Option<String>,
    /// Set on every authority record once the query's WEXPAND flag is
    /// known, so the final wire response can carry the indicator (§4.1(e)).
    pub wexpand: bool,
}

impl RankedRecord {
    pub fn new(record: DNSResource) -> Self {
        Self {
            record,
            rank: Rank::Initial,
            yielded: false,
            mismatch_signer: None,
            wexpand: false,
        }
    }

    pub fn owner(&self) -> String {
        self.record.labels.join(".")
    }
}

/// Flags drawn from the query's DNSSEC state set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryFlags {
    pub want: bool,
    pub insecure: bool,
    pub bogus: bool,
    pub wexpand: bool,
    pub cached: bool,
    pub stub: bool,
    pub await_cut: bool,
}

/// The currently trusted delegation point. `parent` forms an owned chain
/// toward the root; there is no possibility of a cycle since a cut is only
/// ever nested by copying the current cut into a fresh `Box`.
#[derive(Debug, Clone)]
pub struct ZoneCut {
    pub name: String,
    pub key: Option<Vec<DNSResource>>,
    pub trust_anchor: Option<Vec<DNSResource>>,
    pub parent: Option<Box<ZoneCut>>,
}

impl ZoneCut {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: None,
            trust_anchor: None,
            parent: None,
        }
    }

    /// Descend: nest the current cut as `parent`, reinitialize at
    /// `new_name` inheriting `key`/`trust_anchor` from the (now parent) cut,
    /// as in §4.7.2's nesting case.
    pub fn descend(&mut self, new_name: String) {
        let inherited_key = self.key.clone();
        let inherited_ta = self.trust_anchor.clone();
        let old = std::mem::replace(self, ZoneCut::new(new_name));
        self.key = inherited_key;
        self.trust_anchor = inherited_ta;
        self.parent = Some(Box::new(old));
    }

    /// Ascend: copy the parent cut's contents over the current cut, as in
    /// §4.7.1's ascent case. Returns `false` if there was no parent.
    pub fn ascend(&mut self) -> bool {
        match self.parent.take() {
            Some(parent) => {
                *self = *parent;
                true
            }
            None => false,
        }
    }

    /// Walk the parent chain looking for a cut whose name equals `name`.
    pub fn find_ancestor(&self, name: &str) -> Option<&ZoneCut> {
        let mut cur = self.parent.as_deref();
        while let Some(cut) = cur {
            if cut.name.eq_ignore_ascii_case(name) {
                return Some(cut);
            }
            cur = cut.parent.as_deref();
        }
        None
    }

    pub fn trust_anchor_owner(&self) -> Option<String> {
        self.trust_anchor
            .as_ref()
            .and_then(|ta| ta.first())
            .map(|rr| rr.labels.join("."))
    }
}

/// An in-flight question (§3 Query).
#[derive(Debug, Clone)]
pub struct Query {
    pub sname: String,
    pub stype: DNSResourceType,
    pub sclass: DNSResourceClass,
    pub zone_cut: ZoneCut,
    pub flags: QueryFlags,
    pub parent: Option<Box<Query>>,
    pub timestamp: u32,
    pub id: u16,
    /// True once this query has already returned `Yield` once; used by the
    /// progress requirement (invariant 5, §8) and the signer-check's
    /// "already retried" branch (§4.7.1).
    pub already_yielded: bool,
}

impl Query {
    pub fn new(sname: impl Into<String>, stype: DNSResourceType, zone_cut: ZoneCut) -> Self {
        Self {
            sname: sname.into(),
            stype,
            sclass: DNSResourceClass::IN,
            zone_cut,
            flags: QueryFlags::default(),
            parent: None,
            timestamp: 0,
            id: 0,
            already_yielded: false,
        }
    }

    pub fn mark_insecure(&mut self) {
        self.flags.want = false;
        self.flags.insecure = true;
    }

    pub fn mark_bogus(&mut self) {
        self.flags.bogus = true;
    }
}

/// Container owning the ranked record arrays for one request (§3 Request).
#[derive(Debug)]
pub struct Request {
    pub query: Query,
    pub answ_selected: Vec<RankedRecord>,
    pub auth_selected: Vec<RankedRecord>,
}

impl Request {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            answ_selected: Vec::new(),
            auth_selected: Vec::new(),
        }
    }

    pub fn section(&self, section: Section) -> &[RankedRecord] {
        match section {
            Section::Answer => &self.answ_selected,
            Section::Authority => &self.auth_selected,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut Vec<RankedRecord> {
        match section {
            Section::Answer => &mut self.answ_selected,
            Section::Authority => &mut self.auth_selected,
        }
    }
}

/// Number of labels in a DNS name (root "." has zero).
pub fn label_count(name: &str) -> usize {
    if name.is_empty() || name == "." {
        0
    } else {
        name.trim_end_matches('.').split('.').count()
    }
}

fn labels_rev(name: &str) -> Vec<&str> {
    if name.is_empty() || name == "." {
        Vec::new()
    } else {
        let mut labels: Vec<&str> = name.trim_end_matches('.').split('.').collect();
        labels.reverse();
        labels
    }
}

/// Number of labels `a` and `b` share as a common suffix (i.e. how many
/// labels of the shorter name, from the root down, match the longer one).
pub fn matched_labels(a: &str, b: &str) -> usize {
    let la = labels_rev(a);
    let lb = labels_rev(b);
    la.iter()
        .zip(lb.iter())
        .take_while(|(x, y)| x.eq_ignore_ascii_case(y))
        .count()
}

/// Whether `sub` is a strict subname of `of` (more labels, and `of` is a
/// suffix of `sub`).
pub fn is_strict_subname(sub: &str, of: &str) -> bool {
    let sub_labels = label_count(sub);
    let of_labels = label_count(of);
    sub_labels > of_labels && matched_labels(sub, of) == of_labels
}

/// Strip `n` leading (leftmost) labels from `name`.
pub fn strip_leading_labels(name: &str, n: usize) -> String {
    if n == 0 {
        return name.to_string();
    }
    let labels: Vec<&str> = if name.is_empty() || name == "." {
        Vec::new()
    } else {
        name.trim_end_matches('.').split('.').collect()
    };
    if n >= labels.len() {
        return ".".to_string();
    }
    labels[n..].join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subname_detection() {
        assert!(is_strict_subname("sub.example.com", "example.com"));
        assert!(!is_strict_subname("example.com", "example.com"));
        assert!(!is_strict_subname("example.com", "sub.example.com"));
    }

    #[test]
    fn strip_labels() {
        assert_eq!(strip_leading_labels("a.b.example.com", 2), "example.com");
        assert_eq!(strip_leading_labels("example.com", 0), "example.com");
    }

    #[test]
    fn zone_cut_descend_and_ascend() {
        let mut cut = ZoneCut::new("com");
        cut.key = Some(Vec::new());
        cut.descend("example.com".to_string());
        assert_eq!(cut.name, "example.com");
        assert!(cut.key.is_some());
        assert!(cut.parent.is_some());
        assert!(cut.ascend());
        assert_eq!(cut.name, "com");
        assert!(!cut.ascend());
    }
}
