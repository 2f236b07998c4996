//! Message envelope types for the arbitration protocol.
//!
//! Three message kinds flow during a round:
//! - `FaultMessage`: injected by the upstream fault detector, names a suspect
//! - `SiteFailureMessage`: a site's survivor claim plus its safe transaction
//!   watermarks for the sites in trouble
//! - `SiteFailureForwardMessage`: relays another site's claim to peers that
//!   cannot hear it directly
//!
//! All collections are ordered (`BTreeSet`/`BTreeMap`), so the bincode
//! encoding is a length-prefixed ascending array: byte-identical for equal
//! logical values regardless of how they were assembled.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Host-site identifier: a 64-bit value uniquely naming a peer.
pub type Hsid = i64;

/// Wire-level routing tags. Receive calls filter on these; non-matching
/// messages stay queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    /// Fault detector notifications.
    Failure,
    /// Survivor-claim broadcasts.
    SiteFailureUpdate,
    /// Relayed survivor claims.
    SiteFailureForward,
}

/// A fault notification from the upstream fault detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultMessage {
    /// The site reporting the fault.
    pub reporting_site: Hsid,
    /// The site suspected failed.
    pub failed_site: Hsid,
    /// True when the reporter observed the fault directly (a broken link);
    /// false for relayed hearsay.
    pub witnessed: bool,
    /// The reporter's view of who is still alive.
    pub survivors: BTreeSet<Hsid>,
}

/// A site's survivor claim: who it believes alive, and the newest safe
/// transaction id it vouches for on behalf of each in-trouble site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteFailureMessage {
    /// The claiming site.
    pub source: Hsid,
    /// Sites the source believes alive. The source lists itself.
    pub survivors: BTreeSet<Hsid>,
    /// Safe transaction watermark per in-trouble site.
    pub safe_txn_ids: BTreeMap<Hsid, i64>,
}

impl SiteFailureMessage {
    pub fn builder() -> SiteFailureMessageBuilder {
        SiteFailureMessageBuilder::default()
    }
}

/// Builder for `SiteFailureMessage`.
#[derive(Debug, Default)]
pub struct SiteFailureMessageBuilder {
    source: Hsid,
    survivors: BTreeSet<Hsid>,
    safe_txn_ids: BTreeMap<Hsid, i64>,
}

impl SiteFailureMessageBuilder {
    /// Set the claiming site.
    pub fn source(mut self, source: Hsid) -> Self {
        self.source = source;
        self
    }

    /// Add survivors to the claim.
    pub fn survivors(mut self, survivors: impl IntoIterator<Item = Hsid>) -> Self {
        self.survivors.extend(survivors);
        self
    }

    /// Vouch a safe transaction id for an in-trouble site.
    pub fn safe_txn_id(mut self, site: Hsid, txn_id: i64) -> Self {
        self.safe_txn_ids.insert(site, txn_id);
        self
    }

    pub fn build(self) -> SiteFailureMessage {
        SiteFailureMessage {
            source: self.source,
            survivors: self.survivors,
            safe_txn_ids: self.safe_txn_ids,
        }
    }
}

/// Relay wrapper around a survivor claim, tagged with the site whose claim
/// it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteFailureForwardMessage {
    /// The site whose claim is being relayed.
    pub reporter: Hsid,
    /// The relayed claim.
    pub inner: SiteFailureMessage,
}

impl SiteFailureForwardMessage {
    /// Wrap a received claim for relay. The reporter tag is the claim's
    /// source.
    pub fn new(inner: SiteFailureMessage) -> Self {
        Self {
            reporter: inner.source,
            inner,
        }
    }
}

/// Envelope over everything the arbiter sends or receives. The variant tag
/// doubles as the wire-level subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArbiterMessage {
    Fault(FaultMessage),
    SiteFailure(SiteFailureMessage),
    SiteFailureForward(SiteFailureForwardMessage),
}

impl ArbiterMessage {
    pub fn subject(&self) -> Subject {
        match self {
            ArbiterMessage::Fault(_) => Subject::Failure,
            ArbiterMessage::SiteFailure(_) => Subject::SiteFailureUpdate,
            ArbiterMessage::SiteFailureForward(_) => Subject::SiteFailureForward,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ArbiterMessage::Fault(_) => "FaultMessage",
            ArbiterMessage::SiteFailure(_) => "SiteFailureMessage",
            ArbiterMessage::SiteFailureForward(_) => "SiteFailureForwardMessage",
        }
    }

    /// Encode to the stable wire form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from the wire form.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_update() -> SiteFailureMessage {
        SiteFailureMessage::builder()
            .source(1)
            .survivors([1, 2, 4])
            .safe_txn_id(3, 123_456_789_012_345)
            .build()
    }

    #[test]
    fn test_fault_round_trip() {
        let msg = ArbiterMessage::Fault(FaultMessage {
            reporting_site: 2,
            failed_site: 3,
            witnessed: true,
            survivors: [1, 2, 4].into_iter().collect(),
        });
        let decoded = ArbiterMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_update_round_trip() {
        let msg = ArbiterMessage::SiteFailure(sample_update());
        let decoded = ArbiterMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_forward_round_trip() {
        let msg = ArbiterMessage::SiteFailureForward(SiteFailureForwardMessage::new(sample_update()));
        let decoded = ArbiterMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_encoding_is_assembly_order_independent() {
        let a = SiteFailureMessage::builder()
            .source(7)
            .survivors([5, 1, 3])
            .safe_txn_id(9, 90)
            .safe_txn_id(2, 20)
            .build();
        let b = SiteFailureMessage::builder()
            .source(7)
            .survivors([3, 5])
            .survivors([1])
            .safe_txn_id(2, 20)
            .safe_txn_id(9, 90)
            .build();
        assert_eq!(a, b);
        assert_eq!(
            ArbiterMessage::SiteFailure(a).encode().unwrap(),
            ArbiterMessage::SiteFailure(b).encode().unwrap()
        );
    }

    #[test]
    fn test_forward_tags_reporter_from_source() {
        let forward = SiteFailureForwardMessage::new(sample_update());
        assert_eq!(forward.reporter, 1);
        assert_eq!(forward.inner.source, 1);
    }

    #[test]
    fn test_subjects() {
        let fault = ArbiterMessage::Fault(FaultMessage {
            reporting_site: 1,
            failed_site: 2,
            witnessed: false,
            survivors: BTreeSet::new(),
        });
        let update = ArbiterMessage::SiteFailure(sample_update());
        let forward =
            ArbiterMessage::SiteFailureForward(SiteFailureForwardMessage::new(sample_update()));

        assert_eq!(fault.subject(), Subject::Failure);
        assert_eq!(update.subject(), Subject::SiteFailureUpdate);
        assert_eq!(forward.subject(), Subject::SiteFailureForward);

        assert_eq!(fault.type_name(), "FaultMessage");
        assert_eq!(update.type_name(), "SiteFailureMessage");
        assert_eq!(forward.type_name(), "SiteFailureForwardMessage");
    }

    #[test]
    fn test_builder_overwrites_safe_txn_id() {
        let msg = SiteFailureMessage::builder()
            .source(1)
            .safe_txn_id(3, 10)
            .safe_txn_id(3, 20)
            .build();
        assert_eq!(msg.safe_txn_ids.get(&3), Some(&20));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(ArbiterMessage::decode(&[0xff, 0xff, 0xff]).is_err());
    }
}
