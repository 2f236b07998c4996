//! Arbitration driver: classifies incoming faults and runs rounds to a
//! consistent kill decision.
//!
//! One `MeshArbiter` instance is owned by one site and driven by one thread.
//! A round is: drain the fault queue, broadcast this site's survivor claim,
//! collect every survivor's claim, resolve the kill set, notify danglers,
//! commit. A new actionable fault observed mid-round aborts the round and is
//! pushed back; the next entry restarts with the union of troubles.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::aide::MeshAide;
use crate::error::{ArbiterError, Result};
use crate::ledger::FailureUpdateLedger;
use crate::mailbox::Mailbox;
use crate::messages::{
    ArbiterMessage, FaultMessage, Hsid, SiteFailureForwardMessage, SiteFailureMessage, Subject,
};
use crate::seeker::{AgreementSeeker, ArbitrationStrategy};

/// Timing knobs for the receive phase.
#[derive(Debug, Clone)]
pub struct ArbiterConfig {
    /// Receive tick; also the heartbeat cadence while blocked.
    pub recv_tick: Duration,
    /// How long the receive phase may run before stall warnings start.
    pub stall_warn_after: Duration,
    /// Interval between stall warnings once they start.
    pub stall_report_interval: Duration,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            recv_tick: Duration::from_millis(5),
            stall_warn_after: Duration::from_secs(10),
            stall_report_interval: Duration::from_secs(60),
        }
    }
}

impl ArbiterConfig {
    /// Set the receive tick.
    pub fn with_recv_tick(mut self, tick: Duration) -> Self {
        self.recv_tick = tick;
        self
    }

    /// Set the delay before stall warnings start.
    pub fn with_stall_warn_after(mut self, after: Duration) -> Self {
        self.stall_warn_after = after;
        self
    }

    /// Set the interval between stall warnings.
    pub fn with_stall_report_interval(mut self, interval: Duration) -> Self {
        self.stall_report_interval = interval;
        self
    }
}

/// Verdict on an incoming `FaultMessage`. Everything except `DoNot` drops
/// the message; test order is significant (earlier verdicts win).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discard {
    /// The message names this site as the failed one.
    Suicide,
    /// The named site already failed in a previous round.
    AlreadyFailed,
    /// The reporter itself already failed.
    ReporterFailed,
    /// The named site is not part of the mesh.
    Unknown,
    /// The reporter is not part of the mesh.
    ReporterUnknown,
    /// Unwitnessed hearsay attributed to this site; amplifying it would
    /// manufacture evidence.
    SelfUnwitnessed,
    /// The fault adds no information over the in-trouble table.
    AlreadyKnow,
    /// Late unwitnessed gossip referring to a previous round.
    StaleUnwitnessed,
    /// Not discarded; the fault enters the round.
    DoNot,
}

impl Discard {
    fn log(self, fm: &FaultMessage) {
        match self {
            Discard::DoNot => {}
            Discard::ReporterFailed | Discard::ReporterUnknown => {
                tracing::info!(verdict = ?self, reporting_site = fm.reporting_site, "discarding fault");
            }
            Discard::StaleUnwitnessed => {
                tracing::info!(verdict = ?self, fault = ?fm, "discarding fault");
            }
            _ => {
                tracing::info!(verdict = ?self, failed_site = fm.failed_site, "discarding fault");
            }
        }
    }
}

/// Non-blocking view of arbitration progress; cheap to clone and read from
/// any thread. Values may lag the arbitration thread by one event.
#[derive(Debug, Clone)]
pub struct ArbiterProbe {
    in_trouble: Arc<AtomicU32>,
    failed_sites: Arc<AtomicU32>,
}

impl ArbiterProbe {
    pub fn in_trouble_count(&self) -> u32 {
        self.in_trouble.load(Ordering::Relaxed)
    }

    pub fn failed_sites_count(&self) -> u32 {
        self.failed_sites.load(Ordering::Relaxed)
    }

    pub fn is_in_arbitration(&self) -> bool {
        self.in_trouble_count() > 0
    }
}

/// The arbitration state machine for one site.
pub struct MeshArbiter {
    hsid: Hsid,
    mailbox: Arc<dyn Mailbox>,
    aide: Arc<dyn MeshAide>,
    config: ArbiterConfig,
    seeker: AgreementSeeker,
    ledger: FailureUpdateLedger,
    /// Sites whose death is being evaluated this round, and whether the
    /// fault was witnessed directly. Witness status only upgrades.
    in_trouble: BTreeMap<Hsid, bool>,
    /// Historic set of evicted sites. Only grows.
    failed_sites: BTreeSet<Hsid>,
    /// Unwitnessed in-trouble sites that survived the previous round; used
    /// to recognize late gossip about it.
    stale_unwitnessed: BTreeSet<Hsid>,
    forward_candidates: BTreeMap<Hsid, SiteFailureForwardMessage>,
    in_trouble_count: Arc<AtomicU32>,
    failed_sites_count: Arc<AtomicU32>,
}

impl MeshArbiter {
    pub fn new(hsid: Hsid, mailbox: Arc<dyn Mailbox>, aide: Arc<dyn MeshAide>) -> Self {
        Self::with_config(hsid, mailbox, aide, ArbiterConfig::default())
    }

    pub fn with_config(
        hsid: Hsid,
        mailbox: Arc<dyn Mailbox>,
        aide: Arc<dyn MeshAide>,
        config: ArbiterConfig,
    ) -> Self {
        Self {
            hsid,
            mailbox,
            aide,
            config,
            seeker: AgreementSeeker::new(ArbitrationStrategy::MatchingCardinality, hsid),
            ledger: FailureUpdateLedger::new(),
            in_trouble: BTreeMap::new(),
            failed_sites: BTreeSet::new(),
            stale_unwitnessed: BTreeSet::new(),
            forward_candidates: BTreeMap::new(),
            in_trouble_count: Arc::new(AtomicU32::new(0)),
            failed_sites_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// True while an arbitration round is open.
    pub fn is_in_arbitration(&self) -> bool {
        self.in_trouble_count.load(Ordering::Relaxed) > 0
    }

    /// Number of sites evicted over this arbiter's lifetime.
    pub fn failed_sites_count(&self) -> u32 {
        self.failed_sites_count.load(Ordering::Relaxed)
    }

    /// Handle for observing progress without touching the arbitration
    /// thread.
    pub fn probe(&self) -> ArbiterProbe {
        ArbiterProbe {
            in_trouble: Arc::clone(&self.in_trouble_count),
            failed_sites: Arc::clone(&self.failed_sites_count),
        }
    }

    /// Classify an incoming fault against current state. Pure: applying it
    /// twice without a state change yields the same verdict.
    pub fn may_ignore(&self, hs_ids: &BTreeSet<Hsid>, fm: &FaultMessage) -> Discard {
        let already_witnessed = self.in_trouble.get(&fm.failed_site).copied();

        if fm.failed_site == self.hsid {
            Discard::Suicide
        } else if self.failed_sites.contains(&fm.failed_site) {
            Discard::AlreadyFailed
        } else if self.failed_sites.contains(&fm.reporting_site) {
            Discard::ReporterFailed
        } else if !hs_ids.contains(&fm.failed_site) {
            Discard::Unknown
        } else if !hs_ids.contains(&fm.reporting_site) {
            Discard::ReporterUnknown
        } else if !fm.witnessed && fm.reporting_site == self.hsid {
            Discard::SelfUnwitnessed
        } else if matches!(already_witnessed, Some(w) if w || w == fm.witnessed) {
            Discard::AlreadyKnow
        } else if !fm.witnessed
            && self.in_trouble.is_empty()
            && self.stale_unwitnessed.contains(&fm.failed_site)
            && (fm.survivors.intersection(&self.failed_sites).next().is_some()
                || fm.survivors == *self.seeker.survivors())
        {
            Discard::StaleUnwitnessed
        } else {
            Discard::DoNot
        }
    }

    /// Process a fault and, if necessary, run an arbitration round.
    ///
    /// Returns `{failed_site -> safe_txn_id}`: the sites to disconnect from
    /// and the watermarks to recover against. An empty map means no decision
    /// was reached (stale input, an empty kill set, or a concurrent fault
    /// aborted the round); the caller keeps pumping messages. An `Err` is
    /// fatal: the site must crash rather than keep coordinating.
    pub fn reconfigure_on_fault(
        &mut self,
        hs_ids: &BTreeSet<Hsid>,
        fm: FaultMessage,
    ) -> Result<BTreeMap<Hsid, i64>> {
        let mut proceed = false;
        let mut next = Some(fm);
        while let Some(fault) = next {
            let verdict = self.may_ignore(hs_ids, &fault);
            if verdict == Discard::DoNot {
                tracing::info!(fault = ?fault, "processing fault");
                self.in_trouble.insert(fault.failed_site, fault.witnessed);
                proceed = true;
            } else {
                verdict.log(&fault);
            }
            next = match self.mailbox.recv(&[Subject::Failure]) {
                Some(ArbiterMessage::Fault(more)) => Some(more),
                _ => None,
            };
        }

        if !proceed {
            return Ok(BTreeMap::new());
        }
        self.in_trouble_count
            .store(self.in_trouble.len() as u32, Ordering::Relaxed);

        let alive: BTreeSet<Hsid> = hs_ids.difference(&self.failed_sites).copied().collect();
        self.seeker.start_seeking_for(alive, &self.in_trouble);
        self.seed_local_ledger();
        self.discover_global_fault_data_send();

        if !self.discover_global_fault_data_rcv(hs_ids) {
            return Ok(BTreeMap::new());
        }

        let decision = self.extract_global_fault_data(hs_ids)?;

        if !decision.is_empty() {
            self.notify_danglers(&decision);
            self.failed_sites.extend(decision.keys().copied());
            self.failed_sites_count
                .store(self.failed_sites.len() as u32, Ordering::Relaxed);
            tracing::info!(
                killed = ?decision.keys().collect::<Vec<_>>(),
                "adding to failed sites history"
            );
        }

        self.clear_in_trouble();
        self.seeker.clear();

        Ok(decision)
    }

    /// Seed the ledger with this site's own watermarks for every in-trouble
    /// site. The oracle may have no record for a site that failed while it
    /// was still recovering.
    fn seed_local_ledger(&mut self) {
        for &site in self.in_trouble.keys() {
            let txn = self
                .aide
                .newest_safe_transaction_for_initiator(site)
                .unwrap_or(i64::MIN);
            self.ledger.insert(self.hsid, site, txn);
        }
    }

    /// Broadcast this site's survivor claim and watermarks to every
    /// survivor, itself included. Self-delivery guarantees at least one
    /// response and seeds the graph even in a mesh of one.
    fn discover_global_fault_data_send(&mut self) {
        let survivors = self.seeker.survivors().clone();
        tracing::info!(survivors = ?survivors, "sending survivor set");

        let mut builder = SiteFailureMessage::builder()
            .source(self.hsid)
            .survivors(survivors.iter().copied());
        for &troubled in self.in_trouble.keys() {
            if troubled == self.hsid {
                continue;
            }
            let txn = self
                .aide
                .newest_safe_transaction_for_initiator(troubled)
                .unwrap_or(i64::MIN);
            builder = builder.safe_txn_id(troubled, txn);
        }

        let dests: Vec<Hsid> = survivors.into_iter().collect();
        self.mailbox
            .send(&dests, ArbiterMessage::SiteFailure(builder.build()));
    }

    /// Receive-phase loop. Runs until the ledger covers every
    /// (survivor, failing) pair and no relay work remains. Returns false
    /// when a concurrent actionable fault aborts the round.
    fn discover_global_fault_data_rcv(&mut self, hs_ids: &BTreeSet<Hsid>) -> bool {
        const SUBJECTS: [Subject; 3] = [
            Subject::Failure,
            Subject::SiteFailureUpdate,
            Subject::SiteFailureForward,
        ];

        let blocked_since = Instant::now();
        let mut last_stall_report: Option<Instant> = None;
        let mut have_enough = false;

        loop {
            let received = self.mailbox.recv_blocking(&SUBJECTS, self.config.recv_tick);

            if blocked_since.elapsed() >= self.config.stall_warn_after
                && last_stall_report
                    .map_or(true, |at| at.elapsed() >= self.config.stall_report_interval)
            {
                last_stall_report = Some(Instant::now());
                self.have_necessary_fault_info(true);
            }

            let Some(message) = received else {
                // The surrounding system does not heartbeat while
                // arbitration runs; keep the dead host timers fed.
                self.aide.send_heartbeats(hs_ids);
                continue;
            };

            match message {
                ArbiterMessage::SiteFailure(sfm) => {
                    if hs_ids.contains(&sfm.source) && !self.failed_sites.contains(&sfm.source) {
                        self.update_failed_sites_ledger(hs_ids, &sfm);
                        self.seeker.add_update(&sfm);
                        tracing::info!(update = ?sfm, "received survivor claim");
                        self.forward_candidates
                            .insert(sfm.source, SiteFailureForwardMessage::new(sfm));
                    }
                }
                ArbiterMessage::SiteFailureForward(forward) => {
                    if hs_ids.contains(&forward.inner.source)
                        && !self.seeker.survivors().contains(&forward.reporter)
                        && !self.failed_sites.contains(&forward.reporter)
                    {
                        self.seeker.add_forward(&forward);
                        tracing::info!(forward = ?forward, "received relayed claim");
                    }
                    self.forward_candidates.insert(forward.reporter, forward);
                }
                ArbiterMessage::Fault(fault) => {
                    let verdict = self.may_ignore(hs_ids, &fault);
                    if verdict == Discard::DoNot {
                        tracing::info!(
                            failed_site = fault.failed_site,
                            "concurrent failure detected, aborting round"
                        );
                        self.mailbox.deliver_front(ArbiterMessage::Fault(fault));
                        return false;
                    }
                    verdict.log(&fault);
                }
            }

            have_enough = have_enough || self.have_necessary_fault_info(false);
            if have_enough {
                self.flush_forward_candidates();
                if !self.seeker.need_forward() {
                    return true;
                }
            }
        }
    }

    /// Relay each candidate claim to the survivors that cannot have heard it
    /// directly.
    fn flush_forward_candidates(&mut self) {
        let candidates = std::mem::take(&mut self.forward_candidates);
        for (reporter, message) in candidates {
            let unseen = self.seeker.for_whom_site_is_dead(reporter);
            if unseen.is_empty() {
                continue;
            }
            tracing::info!(reporter, recipients = ?unseen, "forwarding claim to severed peers");
            let dests: Vec<Hsid> = unseen.iter().copied().collect();
            self.mailbox
                .send(&dests, ArbiterMessage::SiteFailureForward(message));
            self.seeker.mark_forwarded(reporter, &unseen);
        }
    }

    fn update_failed_sites_ledger(&mut self, hs_ids: &BTreeSet<Hsid>, sfm: &SiteFailureMessage) {
        for (&failed_peer, &txn) in &sfm.safe_txn_ids {
            if !hs_ids.contains(&failed_peer) || failed_peer == self.hsid {
                continue;
            }
            self.ledger.insert(sfm.source, failed_peer, txn);
        }
    }

    /// True when the ledger covers the full (survivor, failing) product.
    /// With `log`, warns with the concrete missing pairs.
    fn have_necessary_fault_info(&self, log: bool) -> bool {
        let failing: BTreeSet<Hsid> = self.in_trouble.keys().copied().collect();
        let missing = self.ledger.missing_pairs(self.seeker.survivors(), &failing);
        if log {
            tracing::warn!(
                missing = ?missing,
                "failure resolution stalled waiting for (survivor, failing) site pairs"
            );
        }
        missing.is_empty()
    }

    fn extract_global_fault_data(&mut self, hs_ids: &BTreeSet<Hsid>) -> Result<BTreeMap<Hsid, i64>> {
        if !self.have_necessary_fault_info(false) {
            let failing: BTreeSet<Hsid> = self.in_trouble.keys().copied().collect();
            let missing = self
                .ledger
                .missing_pairs(self.seeker.survivors(), &failing)
                .len();
            return Err(ArbiterError::LedgerIncomplete { missing });
        }

        let to_be_killed = self.seeker.next_kill();

        let mut safe_points: BTreeMap<Hsid, i64> = BTreeMap::new();
        for (&(reporter, subject), &txn) in self.ledger.iter() {
            if !hs_ids.contains(&reporter) || !to_be_killed.contains(&subject) {
                continue;
            }
            let watermark = safe_points.entry(subject).or_insert(i64::MIN);
            *watermark = (*watermark).max(txn);
        }

        if let Some((&site, _)) = safe_points.iter().find(|&(_, &txn)| txn == i64::MIN) {
            return Err(ArbiterError::UnresolvedWatermark(site));
        }

        safe_points.remove(&self.hsid);
        Ok(safe_points)
    }

    /// When an unwitnessed in-trouble site is being killed, this site is
    /// severing a link it can still talk on. Tell the other survivors, or a
    /// later round may split the mesh over those links.
    fn notify_danglers(&mut self, decision: &BTreeMap<Hsid, i64>) {
        let has_danglers = self.in_trouble.values().any(|&witnessed| !witnessed);
        if !has_danglers {
            return;
        }

        let survivors = self.seeker.survivors();
        let mut builder = SiteFailureMessage::builder().source(self.hsid).survivors(
            survivors
                .iter()
                .copied()
                .filter(|site| !decision.contains_key(site)),
        );
        for (&site, &txn) in decision {
            builder = builder.safe_txn_id(site, txn);
        }
        let message = builder.build();

        let dests: Vec<Hsid> = survivors
            .iter()
            .copied()
            .filter(|&site| site != self.hsid)
            .collect();
        if dests.is_empty() {
            return;
        }
        tracing::info!(dests = ?dests, message = ?message, "sending dangler notification");
        self.mailbox
            .send(&dests, ArbiterMessage::SiteFailure(message));
    }

    /// Round cleanup: remember which unwitnessed sites survived, drop the
    /// resolved subjects from the ledger, reset per-round tables.
    fn clear_in_trouble(&mut self) {
        self.stale_unwitnessed.clear();
        self.forward_candidates.clear();

        let subjects: BTreeSet<Hsid> = self.in_trouble.keys().copied().collect();
        self.ledger.clear_subjects(&subjects);

        let resolved = std::mem::take(&mut self.in_trouble);
        for (site, witnessed) in resolved {
            if !witnessed && !self.failed_sites.contains(&site) {
                self.stale_unwitnessed.insert(site);
            }
        }
        self.in_trouble_count.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::MemoryHub;
    use std::sync::atomic::AtomicUsize;

    struct ScriptedAide {
        safe_txns: BTreeMap<Hsid, i64>,
        heartbeats: AtomicUsize,
    }

    impl ScriptedAide {
        fn new(safe_txns: &[(Hsid, i64)]) -> Arc<Self> {
            Arc::new(Self {
                safe_txns: safe_txns.iter().copied().collect(),
                heartbeats: AtomicUsize::new(0),
            })
        }
    }

    impl MeshAide for ScriptedAide {
        fn newest_safe_transaction_for_initiator(&self, hsid: Hsid) -> Option<i64> {
            self.safe_txns.get(&hsid).copied()
        }

        fn send_heartbeats(&self, _hs_ids: &BTreeSet<Hsid>) {
            self.heartbeats.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn mesh(ids: &[Hsid]) -> BTreeSet<Hsid> {
        ids.iter().copied().collect()
    }

    fn fault(reporting_site: Hsid, failed_site: Hsid, witnessed: bool, survivors: &[Hsid]) -> FaultMessage {
        FaultMessage {
            reporting_site,
            failed_site,
            witnessed,
            survivors: survivors.iter().copied().collect(),
        }
    }

    fn arbiter(hsid: Hsid) -> MeshArbiter {
        let hub = MemoryHub::new();
        MeshArbiter::new(hsid, hub.mailbox(hsid), ScriptedAide::new(&[]))
    }

    #[test]
    fn test_may_ignore_suicide() {
        let a = arbiter(1);
        let verdict = a.may_ignore(&mesh(&[1, 2, 3]), &fault(2, 1, true, &[2, 3]));
        assert_eq!(verdict, Discard::Suicide);
    }

    #[test]
    fn test_may_ignore_already_failed() {
        let mut a = arbiter(1);
        a.failed_sites.insert(3);
        let verdict = a.may_ignore(&mesh(&[1, 2, 3]), &fault(2, 3, true, &[1, 2]));
        assert_eq!(verdict, Discard::AlreadyFailed);
    }

    #[test]
    fn test_may_ignore_reporter_failed() {
        let mut a = arbiter(1);
        a.failed_sites.insert(2);
        let verdict = a.may_ignore(&mesh(&[1, 2, 3]), &fault(2, 3, true, &[1]));
        assert_eq!(verdict, Discard::ReporterFailed);
    }

    #[test]
    fn test_may_ignore_unknown_sites() {
        let a = arbiter(1);
        assert_eq!(
            a.may_ignore(&mesh(&[1, 2, 3]), &fault(2, 9, true, &[1, 2])),
            Discard::Unknown
        );
        assert_eq!(
            a.may_ignore(&mesh(&[1, 2, 3]), &fault(9, 3, true, &[1, 2])),
            Discard::ReporterUnknown
        );
    }

    #[test]
    fn test_may_ignore_self_unwitnessed() {
        let a = arbiter(1);
        let verdict = a.may_ignore(&mesh(&[1, 2, 3]), &fault(1, 3, false, &[1, 2]));
        assert_eq!(verdict, Discard::SelfUnwitnessed);
        // Witnessed by self is actionable.
        let verdict = a.may_ignore(&mesh(&[1, 2, 3]), &fault(1, 3, true, &[1, 2]));
        assert_eq!(verdict, Discard::DoNot);
    }

    #[test]
    fn test_may_ignore_already_know() {
        let mut a = arbiter(1);
        a.in_trouble.insert(3, false);
        // Same witness level: no new information.
        assert_eq!(
            a.may_ignore(&mesh(&[1, 2, 3]), &fault(2, 3, false, &[1, 2])),
            Discard::AlreadyKnow
        );
        // Upgrade to witnessed is new information.
        assert_eq!(
            a.may_ignore(&mesh(&[1, 2, 3]), &fault(2, 3, true, &[1, 2])),
            Discard::DoNot
        );

        a.in_trouble.insert(3, true);
        // Once witnessed, nothing about 3 is news, not even a downgrade.
        assert_eq!(
            a.may_ignore(&mesh(&[1, 2, 3]), &fault(2, 3, false, &[1, 2])),
            Discard::AlreadyKnow
        );
        assert_eq!(
            a.may_ignore(&mesh(&[1, 2, 3]), &fault(2, 3, true, &[1, 2])),
            Discard::AlreadyKnow
        );
    }

    #[test]
    fn test_may_ignore_stale_unwitnessed() {
        let mut a = arbiter(1);
        a.failed_sites.insert(5);
        a.stale_unwitnessed.insert(3);

        // Late gossip naming an already-failed survivor set member.
        assert_eq!(
            a.may_ignore(&mesh(&[1, 2, 3, 4, 5]), &fault(2, 3, false, &[1, 5])),
            Discard::StaleUnwitnessed
        );
        // Fresh survivor view: actionable again.
        assert_eq!(
            a.may_ignore(&mesh(&[1, 2, 3, 4, 5]), &fault(2, 3, false, &[1, 2, 4])),
            Discard::DoNot
        );
        // Witnessed faults are never stale-filtered.
        assert_eq!(
            a.may_ignore(&mesh(&[1, 2, 3, 4, 5]), &fault(2, 3, true, &[1, 5])),
            Discard::DoNot
        );
    }

    #[test]
    fn test_may_ignore_is_idempotent() {
        let mut a = arbiter(1);
        a.failed_sites.insert(5);
        a.in_trouble.insert(4, false);
        let hs_ids = mesh(&[1, 2, 3, 4, 5]);

        for fm in [
            fault(2, 1, true, &[2, 3]),
            fault(2, 5, true, &[1, 2]),
            fault(2, 4, false, &[1, 2, 3]),
            fault(2, 3, true, &[1, 2]),
        ] {
            let first = a.may_ignore(&hs_ids, &fm);
            let second = a.may_ignore(&hs_ids, &fm);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_suicide_returns_empty_and_leaves_state_alone() {
        let mut a = arbiter(1);
        let decision = a
            .reconfigure_on_fault(&mesh(&[1, 2, 3]), fault(2, 1, true, &[2, 3]))
            .unwrap();
        assert!(decision.is_empty());
        assert!(a.in_trouble.is_empty());
        assert!(!a.is_in_arbitration());
        assert_eq!(a.failed_sites_count(), 0);
    }

    #[test]
    fn test_probe_tracks_counters() {
        let a = arbiter(1);
        let probe = a.probe();
        assert_eq!(probe.in_trouble_count(), 0);
        assert_eq!(probe.failed_sites_count(), 0);
        assert!(!probe.is_in_arbitration());

        a.in_trouble_count.store(2, Ordering::Relaxed);
        a.failed_sites_count.store(1, Ordering::Relaxed);
        assert_eq!(probe.in_trouble_count(), 2);
        assert_eq!(probe.failed_sites_count(), 1);
        assert!(probe.is_in_arbitration());
    }

    #[test]
    fn test_config_builders() {
        let config = ArbiterConfig::default()
            .with_recv_tick(Duration::from_millis(1))
            .with_stall_warn_after(Duration::from_secs(2))
            .with_stall_report_interval(Duration::from_secs(3));
        assert_eq!(config.recv_tick, Duration::from_millis(1));
        assert_eq!(config.stall_warn_after, Duration::from_secs(2));
        assert_eq!(config.stall_report_interval, Duration::from_secs(3));
    }
}
