//! Agreement seeker: aggregates survivor claims and resolves the kill set.
//!
//! Every claim is turned into accusations ("reporter declares site dead",
//! the complement of the claimed survivor set within the round's universe).
//! Resolution finds the largest mutually consistent group of reporters;
//! in-trouble sites left outside that group are the kill set. The same
//! inputs produce the same decision on every peer.

use std::collections::{BTreeMap, BTreeSet};

use crate::messages::{Hsid, SiteFailureForwardMessage, SiteFailureMessage};

/// How the kill set is chosen from the accusation graph.
///
/// A closed set of strategies; tie-breaking rules live with the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArbitrationStrategy {
    /// Maximize the number of reporters in mutual agreement; on ties prefer
    /// the smaller kill set, then the lexicographically least agreement by
    /// ascending hsid.
    #[default]
    MatchingCardinality,
}

/// An evaluated agreement candidate during resolution.
#[derive(Debug)]
struct Agreement {
    reporters: usize,
    kill_size: usize,
    members: BTreeSet<Hsid>,
}

/// Per-round aggregation of survivor claims.
#[derive(Debug)]
pub struct AgreementSeeker {
    strategy: ArbitrationStrategy,
    self_hsid: Hsid,
    /// Sites alive at round start.
    universe: BTreeSet<Hsid>,
    /// Current best-known survivor set.
    survivors: BTreeSet<Hsid>,
    /// The round's in-trouble table.
    in_trouble: BTreeMap<Hsid, bool>,
    /// reporter -> sites it declares dead.
    declared: BTreeMap<Hsid, BTreeSet<Hsid>>,
    /// site -> reporters declaring it dead.
    accusers: BTreeMap<Hsid, BTreeSet<Hsid>>,
    /// reporter -> survivors already covered by a relay of its claim.
    forwarded: BTreeMap<Hsid, BTreeSet<Hsid>>,
}

impl AgreementSeeker {
    pub fn new(strategy: ArbitrationStrategy, self_hsid: Hsid) -> Self {
        Self {
            strategy,
            self_hsid,
            universe: BTreeSet::new(),
            survivors: BTreeSet::new(),
            in_trouble: BTreeMap::new(),
            declared: BTreeMap::new(),
            accusers: BTreeMap::new(),
            forwarded: BTreeMap::new(),
        }
    }

    /// Initialize for a new round. Witnessed in-trouble sites are presumed
    /// dead and start outside the survivor set; unwitnessed ones stay in.
    pub fn start_seeking_for(&mut self, alive: BTreeSet<Hsid>, in_trouble: &BTreeMap<Hsid, bool>) {
        self.survivors = alive
            .iter()
            .copied()
            .filter(|site| !matches!(in_trouble.get(site), Some(true)))
            .collect();
        self.universe = alive;
        self.in_trouble = in_trouble.clone();
        self.declared.clear();
        self.accusers.clear();
        self.forwarded.clear();
    }

    /// Record a directly received survivor claim.
    pub fn add_update(&mut self, sfm: &SiteFailureMessage) {
        self.record(sfm.source, &sfm.survivors);
    }

    /// Record a relayed survivor claim, attributed to the original reporter.
    pub fn add_forward(&mut self, forward: &SiteFailureForwardMessage) {
        self.record(forward.reporter, &forward.inner.survivors);
    }

    /// A reporter may re-claim; the newest claim replaces its accusations.
    fn record(&mut self, reporter: Hsid, claimed: &BTreeSet<Hsid>) {
        if let Some(previous) = self.declared.remove(&reporter) {
            for site in previous {
                if let Some(accusers) = self.accusers.get_mut(&site) {
                    accusers.remove(&reporter);
                    if accusers.is_empty() {
                        self.accusers.remove(&site);
                    }
                }
            }
        }
        let dead: BTreeSet<Hsid> = self
            .universe
            .difference(claimed)
            .copied()
            .filter(|&site| site != reporter)
            .collect();
        for &site in &dead {
            self.accusers.entry(site).or_default().insert(reporter);
        }
        self.declared.insert(reporter, dead);
    }

    /// Current best-known survivor set. Excludes the kill set once
    /// `next_kill` has resolved.
    pub fn survivors(&self) -> &BTreeSet<Hsid> {
        &self.survivors
    }

    /// Survivors that declare `reporter` dead and have not yet been covered
    /// by a relay of its claim. They cannot have heard the claim directly:
    /// their link to the reporter is severed.
    pub fn for_whom_site_is_dead(&self, reporter: Hsid) -> BTreeSet<Hsid> {
        let Some(accusers) = self.accusers.get(&reporter) else {
            return BTreeSet::new();
        };
        let covered = self.forwarded.get(&reporter);
        accusers
            .iter()
            .copied()
            .filter(|site| {
                self.survivors.contains(site)
                    && *site != self.self_hsid
                    && covered.map_or(true, |c| !c.contains(site))
            })
            .collect()
    }

    /// Mark relay recipients covered, so the same claim is not re-sent.
    pub fn mark_forwarded(&mut self, reporter: Hsid, recipients: &BTreeSet<Hsid>) {
        self.forwarded
            .entry(reporter)
            .or_default()
            .extend(recipients.iter().copied());
    }

    /// True while some recorded claim still has uncovered recipients.
    pub fn need_forward(&self) -> bool {
        self.declared
            .keys()
            .any(|&reporter| !self.for_whom_site_is_dead(reporter).is_empty())
    }

    /// Resolve the kill set under the configured strategy and drop it from
    /// the survivor set.
    pub fn next_kill(&mut self) -> BTreeSet<Hsid> {
        let kill = match self.strategy {
            ArbitrationStrategy::MatchingCardinality => self.matching_cardinality_kill(),
        };
        self.survivors.retain(|site| !kill.contains(site));
        kill
    }

    fn matching_cardinality_kill(&self) -> BTreeSet<Hsid> {
        // Only sites touched by an accusation constrain the agreement; the
        // rest belong to every candidate.
        let contested: Vec<Hsid> = self
            .universe
            .iter()
            .copied()
            .filter(|site| {
                self.accusers.contains_key(site)
                    || self.declared.get(site).is_some_and(|dead| !dead.is_empty())
            })
            .collect();
        if contested.is_empty() {
            return BTreeSet::new();
        }
        let free: BTreeSet<Hsid> = self
            .universe
            .iter()
            .copied()
            .filter(|site| !contested.contains(site))
            .collect();

        let mut best: Option<Agreement> = None;
        let mut chosen: Vec<Hsid> = Vec::new();
        self.descend(&contested, 0, &free, &mut chosen, &mut best);

        let agreement = match best {
            Some(agreement) => agreement.members,
            None => self.universe.clone(),
        };
        self.in_trouble
            .keys()
            .copied()
            .filter(|site| !agreement.contains(site))
            .collect()
    }

    /// Enumerate independent sets over the contested sites, keeping the best
    /// candidate under (reporters desc, kill size asc, members lexicographic
    /// asc). Branch order is ascending hsid, include before exclude.
    fn descend(
        &self,
        contested: &[Hsid],
        index: usize,
        free: &BTreeSet<Hsid>,
        chosen: &mut Vec<Hsid>,
        best: &mut Option<Agreement>,
    ) {
        if index == contested.len() {
            let members: BTreeSet<Hsid> = free
                .iter()
                .copied()
                .chain(chosen.iter().copied())
                .collect();
            let reporters = members
                .iter()
                .filter(|site| self.declared.contains_key(*site))
                .count();
            let kill_size = self
                .in_trouble
                .keys()
                .filter(|site| !members.contains(*site))
                .count();
            let candidate = Agreement {
                reporters,
                kill_size,
                members,
            };
            let better = match best.as_ref() {
                None => true,
                Some(current) => {
                    candidate.reporters > current.reporters
                        || (candidate.reporters == current.reporters
                            && (candidate.kill_size < current.kill_size
                                || (candidate.kill_size == current.kill_size
                                    && candidate.members < current.members)))
                }
            };
            if better {
                *best = Some(candidate);
            }
            return;
        }

        if let Some(current) = best.as_ref() {
            let reachable = free
                .iter()
                .chain(chosen.iter())
                .chain(contested[index..].iter())
                .filter(|site| self.declared.contains_key(*site))
                .count();
            if reachable < current.reporters {
                return;
            }
        }

        let site = contested[index];
        let compatible = chosen.iter().all(|&member| {
            !self.declares_dead(member, site) && !self.declares_dead(site, member)
        });
        if compatible {
            chosen.push(site);
            self.descend(contested, index + 1, free, chosen, best);
            chosen.pop();
        }
        self.descend(contested, index + 1, free, chosen, best);
    }

    fn declares_dead(&self, reporter: Hsid, subject: Hsid) -> bool {
        self.declared
            .get(&reporter)
            .is_some_and(|dead| dead.contains(&subject))
    }

    /// Drop all per-round state.
    pub fn clear(&mut self) {
        self.universe.clear();
        self.survivors.clear();
        self.in_trouble.clear();
        self.declared.clear();
        self.accusers.clear();
        self.forwarded.clear();
    }
}
