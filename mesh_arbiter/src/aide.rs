//! Companion oracle the arbiter consults during a round.

use std::collections::BTreeSet;

use crate::messages::Hsid;

/// Peer-info oracle: safe transaction watermarks and heartbeat emission.
///
/// The surrounding system stops heartbeating while arbitration runs, so the
/// receive loop calls `send_heartbeats` on every idle tick to keep the dead
/// host timers of healthy peers fed.
pub trait MeshAide: Send + Sync {
    /// Newest safe transaction id this site will vouch for on behalf of
    /// `hsid`, if one has been recorded. A site failing mid-recovery may
    /// have none.
    fn newest_safe_transaction_for_initiator(&self, hsid: Hsid) -> Option<i64>;

    /// Emit a heartbeat to every site in `hs_ids`.
    fn send_heartbeats(&self, hs_ids: &BTreeSet<Hsid>);
}
