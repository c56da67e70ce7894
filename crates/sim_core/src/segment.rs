//! Segment recording and server-side verification.
//!
//! A session is submitted in segments of [`SEGMENT_SIZE_WAVES`] waves. The
//! client records the events it fed the engine plus a chained checkpoint on
//! every [`CHECKPOINT_INTERVAL_TICKS`] grid tick. The server replays the
//! segment from its own resume point and either accepts it or returns one of
//! six [`RejectionCode`]s.
//!
//! Both sides close a segment with the same rule: on the first grid tick
//! after the wave counter has passed the segment's last wave, or on the tick
//! the session ends (with an extra closing checkpoint if that tick is off
//! the grid).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checkpoint::{fnv1a, hash_hex, parse_hash_hex, Checkpoint, HashChain};
use crate::config::{
    SimConfig, CHECKPOINT_INTERVAL_TICKS, MAX_TICKS_PER_SEGMENT, SEGMENT_SIZE_WAVES, SIM_VERSION,
};
use crate::error::{Result, SimError};
use crate::events::{GameEvent, PlayerEvent};
use crate::rng::DeterministicRng;
use crate::simulation::Simulation;

/// Last wave covered by segment `index`.
#[must_use]
pub const fn segment_end_wave(index: u32) -> u32 {
    (index + 1) * SEGMENT_SIZE_WAVES
}

fn is_grid_tick(tick: u64) -> bool {
    tick % CHECKPOINT_INTERVAL_TICKS == 0
}

fn segment_closes(sim: &Simulation, end_wave: u32) -> bool {
    sim.is_ended() || (is_grid_tick(sim.tick()) && sim.snapshot().wave > end_wave)
}

// ============================================================================
// Wire format
// ============================================================================

/// An event on the wire: `{tick, type, payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    /// Target tick.
    pub tick: u64,
    /// Snake-case event name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Event fields.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl WireEvent {
    /// Wire form of a tick-bound event.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Serialization`] if the event cannot be encoded.
    pub fn from_event(event: &PlayerEvent) -> Result<Self> {
        let value = serde_json::to_value(event.event)
            .map_err(|e| SimError::Serialization(format!("Failed to encode event: {e}")))?;
        let payload = match value {
            serde_json::Value::Object(map) => map.into_iter().next().map(|(_, v)| v),
            _ => None,
        }
        .unwrap_or(serde_json::Value::Null);
        Ok(Self {
            tick: event.tick,
            kind: event.event.name().to_string(),
            payload,
        })
    }

    /// Decode back into an engine event.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Serialization`] for an unknown type or a payload
    /// that does not match it.
    pub fn to_event(&self) -> Result<PlayerEvent> {
        let mut map = serde_json::Map::new();
        map.insert(self.kind.clone(), self.payload.clone());
        let event: GameEvent = serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| SimError::Serialization(format!("Bad `{}` event: {e}", self.kind)))?;
        Ok(PlayerEvent {
            tick: self.tick,
            event,
        })
    }
}

/// Client-to-server segment submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSubmission {
    /// Zero-based segment number within the session.
    pub segment_index: u32,
    /// Session seed.
    pub seed: u32,
    /// Events recorded during the segment, in submission order.
    pub events: Vec<WireEvent>,
    /// Checkpoints in tick order.
    pub checkpoints: Vec<Checkpoint>,
    /// Hex chain hash after the closing checkpoint.
    pub final_hash: String,
    /// Engine build that produced the hashes.
    pub sim_version: String,
}

/// Exhaustive rejection reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionCode {
    /// Events, checkpoints or the segment index are out of order.
    #[error("ticks not monotonic")]
    TicksNotMonotonic,
    /// A secretly audited checkpoint was not supplied.
    #[error("audit tick missing")]
    AuditTickMissing,
    /// A supplied checkpoint differs from the replay.
    #[error("checkpoint mismatch")]
    CheckpointMismatch,
    /// The final chain hash differs from the replay.
    #[error("final hash mismatch")]
    FinalHashMismatch,
    /// The segment ran past the tick cap.
    #[error("segment tick cap exceeded")]
    SegmentTickCap,
    /// The client runs a different engine build.
    #[error("sim version mismatch")]
    SimVersionMismatch,
}

/// Server reply to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentResponse {
    /// Whether the segment was accepted.
    pub accepted: bool,
    /// Why it was not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<RejectionCode>,
}

impl SegmentResponse {
    /// Accepted.
    #[must_use]
    pub const fn accepted() -> Self {
        Self {
            accepted: true,
            rejection_reason: None,
        }
    }

    /// Rejected with `code`.
    #[must_use]
    pub const fn rejected(code: RejectionCode) -> Self {
        Self {
            accepted: false,
            rejection_reason: Some(code),
        }
    }
}

/// A rejection with diagnostics for the server log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code} at tick {tick:?}: {detail}")]
pub struct Rejection {
    /// Wire code.
    pub code: RejectionCode,
    /// Tick the problem was found at, when there is one.
    pub tick: Option<u64>,
    /// Human-readable detail.
    pub detail: String,
}

impl Rejection {
    fn new(code: RejectionCode, tick: Option<u64>, detail: impl Into<String>) -> Self {
        Self {
            code,
            tick,
            detail: detail.into(),
        }
    }
}

// ============================================================================
// Client side
// ============================================================================

/// A closed segment, before conversion to the wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment number.
    pub index: u32,
    /// Session seed.
    pub seed: u32,
    /// First tick of the segment.
    pub start_tick: u64,
    /// Tick the segment closed at.
    pub end_tick: u64,
    /// Events in submission order.
    pub events: Vec<PlayerEvent>,
    /// Checkpoints in tick order.
    pub checkpoints: Vec<Checkpoint>,
    /// Chain hash after the closing checkpoint.
    pub final_hash: u32,
}

impl Segment {
    /// Wire form.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Serialization`] if an event cannot be encoded.
    pub fn to_submission(&self) -> Result<SegmentSubmission> {
        let events = self
            .events
            .iter()
            .map(WireEvent::from_event)
            .collect::<Result<Vec<_>>>()?;
        Ok(SegmentSubmission {
            segment_index: self.index,
            seed: self.seed,
            events,
            checkpoints: self.checkpoints.clone(),
            final_hash: hash_hex(self.final_hash),
            sim_version: SIM_VERSION.to_string(),
        })
    }
}

/// Drives a [`Simulation`] and cuts it into verifiable segments.
#[derive(Debug, Clone)]
pub struct SegmentRecorder {
    sim: Simulation,
    seed: u32,
    chain: HashChain,
    index: u32,
    start_tick: u64,
    events: Vec<PlayerEvent>,
    checkpoints: Vec<Checkpoint>,
    last_event_tick: u64,
}

impl SegmentRecorder {
    /// Start a new session.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if the loadout is rejected.
    pub fn new(seed: u32, config: &SimConfig) -> Result<Self> {
        Ok(Self {
            sim: Simulation::create(seed, config)?,
            seed,
            chain: HashChain::new(),
            index: 0,
            start_tick: 0,
            events: Vec::new(),
            checkpoints: Vec::new(),
            last_event_tick: 0,
        })
    }

    /// The wrapped simulation.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Index of the segment being recorded.
    #[must_use]
    pub const fn segment_index(&self) -> u32 {
        self.index
    }

    /// Forward an event to the engine and record it.
    ///
    /// Events must be submitted in non-decreasing tick order.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::StaleEvent`] for an out-of-order tick and
    /// whatever [`Simulation::submit_event`] rejects.
    pub fn submit(&mut self, event: GameEvent, tick: u64) -> Result<()> {
        if tick < self.last_event_tick {
            return Err(SimError::StaleEvent {
                target_tick: tick,
                current_tick: self.last_event_tick,
            });
        }
        self.sim.submit_event(event, tick)?;
        self.last_event_tick = tick;
        self.events.push(PlayerEvent { tick, event });
        Ok(())
    }

    /// Advance one tick. Returns the segment that closed on this tick.
    pub fn step(&mut self) -> Option<Segment> {
        if self.sim.is_ended() {
            return None;
        }
        self.sim.step();
        let tick = self.sim.tick();
        if is_grid_tick(tick) || self.sim.is_ended() {
            self.checkpoints.push(self.chain.append(self.sim.snapshot()));
        }
        if !segment_closes(&self.sim, segment_end_wave(self.index)) {
            return None;
        }

        let segment = Segment {
            index: self.index,
            seed: self.seed,
            start_tick: self.start_tick,
            end_tick: tick,
            events: std::mem::take(&mut self.events),
            checkpoints: std::mem::take(&mut self.checkpoints),
            final_hash: self.chain.head(),
        };
        tracing::info!(
            index = segment.index,
            start = segment.start_tick,
            end = segment.end_tick,
            events = segment.events.len(),
            checkpoints = segment.checkpoints.len(),
            "Segment closed"
        );
        self.index += 1;
        self.start_tick = tick;
        Some(segment)
    }

    /// Step until the current segment closes. Returns `None` if the session
    /// had already ended.
    pub fn finish_segment(&mut self) -> Option<Segment> {
        while !self.sim.is_ended() {
            if let Some(segment) = self.step() {
                return Some(segment);
            }
        }
        None
    }
}

// ============================================================================
// Server side
// ============================================================================

/// Picks the checkpoint ticks a segment is audited on.
pub trait AuditTickSelector {
    /// Choose from the grid ticks the replay produced for `segment_index`.
    fn audit_ticks(&self, segment_index: u32, grid_ticks: &[u64]) -> Vec<u64>;
}

/// Audit ticks derived from a server secret the client never sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretAuditSelector {
    secret: Vec<u8>,
    per_segment: usize,
}

impl SecretAuditSelector {
    /// Selector picking `per_segment` ticks per segment.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>, per_segment: usize) -> Self {
        Self {
            secret: secret.into(),
            per_segment,
        }
    }
}

impl AuditTickSelector for SecretAuditSelector {
    fn audit_ticks(&self, segment_index: u32, grid_ticks: &[u64]) -> Vec<u64> {
        let mut seed_bytes = self.secret.clone();
        seed_bytes.extend_from_slice(&segment_index.to_le_bytes());
        let mut rng = DeterministicRng::new(fnv1a(&seed_bytes));

        let mut pool = grid_ticks.to_vec();
        let count = self.per_segment.min(pool.len());
        for i in 0..count {
            let j = rng.next_range(i as u32, pool.len() as u32) as usize;
            pool.swap(i, j);
        }
        let mut picked = pool[..count].to_vec();
        picked.sort_unstable();
        picked
    }
}

/// Server-side progress through one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierSession {
    /// Session seed.
    pub seed: u32,
    /// Segment index expected next.
    pub next_index: u32,
    /// Engine state at the end of the last accepted segment.
    pub resume: Simulation,
    /// Chain head at the end of the last accepted segment.
    pub chain: HashChain,
}

impl VerifierSession {
    /// Session at tick 0.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if the loadout is rejected.
    pub fn new(seed: u32, config: &SimConfig) -> Result<Self> {
        Ok(Self {
            seed,
            next_index: 0,
            resume: Simulation::create(seed, config)?,
            chain: HashChain::new(),
        })
    }

    /// Persist with bincode.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Serialization`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SimError::Serialization(format!("Failed to serialize session: {e}")))
    }

    /// Restore from [`VerifierSession::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Serialization`] for malformed bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| SimError::Serialization(format!("Failed to deserialize session: {e}")))
    }
}

/// An accepted segment and the session state it leads to.
#[derive(Debug, Clone)]
pub struct VerifiedSegment {
    /// Segment number.
    pub index: u32,
    /// First tick.
    pub start_tick: u64,
    /// Closing tick.
    pub end_tick: u64,
    /// Chain hash after the closing checkpoint.
    pub final_hash: u32,
    /// Session to verify the next segment against.
    pub session: VerifierSession,
}

/// Replays submissions and accepts or rejects them.
#[derive(Debug, Clone)]
pub struct SegmentVerifier<A> {
    selector: A,
    tick_cap: u64,
}

impl<A: AuditTickSelector> SegmentVerifier<A> {
    /// Verifier with the standard tick cap.
    #[must_use]
    pub const fn new(selector: A) -> Self {
        Self {
            selector,
            tick_cap: MAX_TICKS_PER_SEGMENT,
        }
    }

    /// Override the tick cap.
    #[must_use]
    pub const fn with_tick_cap(mut self, tick_cap: u64) -> Self {
        self.tick_cap = tick_cap;
        self
    }

    /// Verify `submission` against `session`.
    ///
    /// Nothing is mutated; on acceptance the caller stores
    /// [`VerifiedSegment::session`] in place of `session`.
    ///
    /// # Errors
    ///
    /// Returns the first [`Rejection`] found, checked in this order:
    /// version, ordering, replayed checkpoints, tick cap, audit, final hash.
    pub fn verify(
        &self,
        session: &VerifierSession,
        submission: &SegmentSubmission,
    ) -> std::result::Result<VerifiedSegment, Rejection> {
        if submission.sim_version != SIM_VERSION {
            return Err(Rejection::new(
                RejectionCode::SimVersionMismatch,
                None,
                format!("client {} server {SIM_VERSION}", submission.sim_version),
            ));
        }
        check_ordering(session, submission)?;

        let mut sim = session.resume.clone();
        let start_tick = sim.tick();
        for wire in &submission.events {
            match wire.to_event() {
                Ok(event) => {
                    if let Err(reason) = sim.submit_event(event.event, event.tick) {
                        tracing::warn!(tick = wire.tick, event = %wire.kind, %reason, "Dropped wire event");
                    }
                }
                Err(reason) => {
                    tracing::warn!(tick = wire.tick, event = %wire.kind, %reason, "Dropped wire event");
                }
            }
        }

        let end_wave = segment_end_wave(submission.segment_index);
        let mut chain = session.chain;
        let mut supplied = submission.checkpoints.iter().peekable();
        let mut grid_ticks = Vec::new();
        loop {
            sim.step();
            let tick = sim.tick();
            let ended = sim.is_ended();

            if let Some(stray) = supplied.next_if(|c| c.tick < tick) {
                return Err(Rejection::new(
                    RejectionCode::CheckpointMismatch,
                    Some(stray.tick),
                    "checkpoint off the grid",
                ));
            }
            if is_grid_tick(tick) || ended {
                let expected = chain.append(sim.snapshot());
                if is_grid_tick(tick) {
                    grid_ticks.push(tick);
                }
                if let Some(claimed) = supplied.next_if(|c| c.tick == tick) {
                    if claimed.hash != expected.hash {
                        return Err(Rejection::new(
                            RejectionCode::CheckpointMismatch,
                            Some(tick),
                            format!(
                                "expected {} got {}",
                                hash_hex(expected.hash),
                                hash_hex(claimed.hash)
                            ),
                        ));
                    }
                }
            }

            if segment_closes(&sim, end_wave) {
                break;
            }
            if tick - start_tick >= self.tick_cap {
                return Err(Rejection::new(
                    RejectionCode::SegmentTickCap,
                    Some(tick),
                    format!("segment still open after {} ticks", self.tick_cap),
                ));
            }
        }
        let end_tick = sim.tick();

        if let Some(extra) = supplied.next() {
            return Err(Rejection::new(
                RejectionCode::CheckpointMismatch,
                Some(extra.tick),
                format!("checkpoint after segment end {end_tick}"),
            ));
        }

        for audit in self.selector.audit_ticks(submission.segment_index, &grid_ticks) {
            if !submission.checkpoints.iter().any(|c| c.tick == audit) {
                return Err(Rejection::new(
                    RejectionCode::AuditTickMissing,
                    Some(audit),
                    "audited checkpoint not supplied",
                ));
            }
        }

        if submission.seed != session.seed {
            return Err(Rejection::new(
                RejectionCode::FinalHashMismatch,
                None,
                format!("seed {} does not match session", submission.seed),
            ));
        }
        if parse_hash_hex(&submission.final_hash) != Some(chain.head()) {
            return Err(Rejection::new(
                RejectionCode::FinalHashMismatch,
                Some(end_tick),
                format!(
                    "expected {} got {}",
                    hash_hex(chain.head()),
                    submission.final_hash
                ),
            ));
        }

        tracing::debug!(
            index = submission.segment_index,
            start_tick,
            end_tick,
            "Segment verified"
        );
        Ok(VerifiedSegment {
            index: submission.segment_index,
            start_tick,
            end_tick,
            final_hash: chain.head(),
            session: VerifierSession {
                seed: session.seed,
                next_index: session.next_index + 1,
                resume: sim,
                chain,
            },
        })
    }
}

fn check_ordering(
    session: &VerifierSession,
    submission: &SegmentSubmission,
) -> std::result::Result<(), Rejection> {
    let not_monotonic =
        |tick: Option<u64>, detail: String| Rejection::new(RejectionCode::TicksNotMonotonic, tick, detail);

    if session.resume.is_ended() {
        return Err(not_monotonic(None, "session has already ended".to_string()));
    }
    if submission.segment_index != session.next_index {
        return Err(not_monotonic(
            None,
            format!(
                "segment {} submitted, expected {}",
                submission.segment_index, session.next_index
            ),
        ));
    }

    let start = session.resume.tick();
    let mut previous = start;
    for event in &submission.events {
        if event.tick < previous {
            return Err(not_monotonic(
                Some(event.tick),
                format!("event for tick {} after tick {previous}", event.tick),
            ));
        }
        previous = event.tick;
    }

    let mut previous = start;
    for checkpoint in &submission.checkpoints {
        if checkpoint.tick <= previous {
            return Err(not_monotonic(
                Some(checkpoint.tick),
                format!("checkpoint {} after {previous}", checkpoint.tick),
            ));
        }
        previous = checkpoint.tick;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TurretKind;
    use crate::math::fx;

    /// Audits every grid tick.
    struct AuditAll;

    impl AuditTickSelector for AuditAll {
        fn audit_ticks(&self, _segment_index: u32, grid_ticks: &[u64]) -> Vec<u64> {
            grid_ticks.to_vec()
        }
    }

    fn record_first_segment(seed: u32) -> Segment {
        let mut recorder = SegmentRecorder::new(seed, &SimConfig::default()).unwrap();
        recorder
            .submit(
                GameEvent::PlaceTurret {
                    slot: 2,
                    kind: TurretKind::Artillery,
                },
                40,
            )
            .unwrap();
        recorder.submit(GameEvent::PlaceWall { x: fx(20) }, 200).unwrap();
        recorder.finish_segment().unwrap()
    }

    fn verifier() -> SegmentVerifier<SecretAuditSelector> {
        SegmentVerifier::new(SecretAuditSelector::new("test-secret", 3))
    }

    fn session(seed: u32) -> VerifierSession {
        VerifierSession::new(seed, &SimConfig::default()).unwrap()
    }

    #[test]
    fn test_recorded_segment_is_accepted() {
        let segment = record_first_segment(77);
        assert_eq!(segment.index, 0);
        assert_eq!(segment.start_tick, 0);
        assert!(segment.checkpoints.iter().all(|c| c.tick % 30 == 0 || c.tick == segment.end_tick));
        assert_eq!(segment.checkpoints.last().map(|c| c.hash), Some(segment.final_hash));

        let submission = segment.to_submission().unwrap();
        let verified = verifier().verify(&session(77), &submission).unwrap();
        assert_eq!(verified.end_tick, segment.end_tick);
        assert_eq!(verified.final_hash, segment.final_hash);
        assert_eq!(verified.session.next_index, 1);
        assert_eq!(verified.session.resume.tick(), segment.end_tick);
    }

    #[test]
    fn test_second_segment_chains_from_first() {
        let mut recorder = SegmentRecorder::new(5, &SimConfig::default()).unwrap();
        let first = recorder.finish_segment().unwrap();
        let second = recorder.finish_segment().unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.start_tick, first.end_tick);

        let verifier = verifier();
        let accepted = verifier
            .verify(&session(5), &first.to_submission().unwrap())
            .unwrap();
        let accepted = verifier
            .verify(&accepted.session, &second.to_submission().unwrap())
            .unwrap();
        assert_eq!(accepted.final_hash, second.final_hash);
    }

    #[test]
    fn test_version_checked_first() {
        let mut submission = record_first_segment(1).to_submission().unwrap();
        submission.sim_version = "sim-core/0.0.0".to_string();
        submission.segment_index = 9;
        let rejection = verifier().verify(&session(1), &submission).unwrap_err();
        assert_eq!(rejection.code, RejectionCode::SimVersionMismatch);
    }

    #[test]
    fn test_wrong_segment_index_rejected() {
        let mut submission = record_first_segment(1).to_submission().unwrap();
        submission.segment_index = 1;
        let rejection = verifier().verify(&session(1), &submission).unwrap_err();
        assert_eq!(rejection.code, RejectionCode::TicksNotMonotonic);
    }

    #[test]
    fn test_out_of_order_events_rejected() {
        let mut submission = record_first_segment(1).to_submission().unwrap();
        submission.events.reverse();
        let rejection = verifier().verify(&session(1), &submission).unwrap_err();
        assert_eq!(rejection.code, RejectionCode::TicksNotMonotonic);
        assert_eq!(rejection.tick, Some(40));
    }

    #[test]
    fn test_tampered_checkpoint_caught_where_altered() {
        let mut submission = record_first_segment(3).to_submission().unwrap();
        let tampered = submission.checkpoints[2].tick;
        submission.checkpoints[2].hash ^= 1;
        let rejection = verifier().verify(&session(3), &submission).unwrap_err();
        assert_eq!(rejection.code, RejectionCode::CheckpointMismatch);
        assert_eq!(rejection.tick, Some(tampered));
    }

    #[test]
    fn test_off_grid_checkpoint_rejected() {
        let mut submission = record_first_segment(3).to_submission().unwrap();
        submission.checkpoints[0].tick = 31;
        let rejection = verifier().verify(&session(3), &submission).unwrap_err();
        assert_eq!(rejection.code, RejectionCode::CheckpointMismatch);
    }

    #[test]
    fn test_missing_audit_tick_rejected() {
        let mut submission = record_first_segment(4).to_submission().unwrap();
        let dropped = submission.checkpoints.remove(1).tick;
        let rejection = SegmentVerifier::new(AuditAll)
            .verify(&session(4), &submission)
            .unwrap_err();
        assert_eq!(rejection.code, RejectionCode::AuditTickMissing);
        assert_eq!(rejection.tick, Some(dropped));
    }

    #[test]
    fn test_final_hash_and_seed_checked() {
        let mut submission = record_first_segment(8).to_submission().unwrap();
        submission.final_hash = "00000000".to_string();
        let rejection = verifier().verify(&session(8), &submission).unwrap_err();
        assert_eq!(rejection.code, RejectionCode::FinalHashMismatch);

        let mut submission = record_first_segment(8).to_submission().unwrap();
        submission.seed = 9;
        let rejection = verifier().verify(&session(8), &submission).unwrap_err();
        assert_eq!(rejection.code, RejectionCode::FinalHashMismatch);
    }

    #[test]
    fn test_tick_cap_rejected() {
        let submission = record_first_segment(2).to_submission().unwrap();
        let rejection = verifier()
            .with_tick_cap(120)
            .verify(&session(2), &submission)
            .unwrap_err();
        assert_eq!(rejection.code, RejectionCode::SegmentTickCap);
        assert_eq!(rejection.tick, Some(120));
    }

    #[test]
    fn test_verification_is_repeatable() {
        let session = session(11);
        let mut submission = record_first_segment(11).to_submission().unwrap();
        submission.checkpoints[4].hash ^= 0x10;
        let verifier = verifier();
        let first = verifier.verify(&session, &submission).unwrap_err();
        let second = verifier.verify(&session, &submission).unwrap_err();
        assert_eq!(first, second);
        assert_eq!(session.next_index, 0);
        assert_eq!(session.resume.tick(), 0);
    }

    #[test]
    fn test_secret_selector_is_stable_and_distinct() {
        let grid: Vec<u64> = (1..=18).map(|i| i * 30).collect();
        let selector = SecretAuditSelector::new("secret", 3);
        let picked = selector.audit_ticks(0, &grid);
        assert_eq!(picked.len(), 3);
        assert_eq!(picked, selector.audit_ticks(0, &grid));
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
        assert!(picked.iter().all(|t| grid.contains(t)));
        assert!(selector.audit_ticks(0, &[]).is_empty());
        assert_eq!(selector.audit_ticks(1, &grid[..2]).len(), 2);
    }

    #[test]
    fn test_wire_event_shape() {
        let event = PlayerEvent {
            tick: 12,
            event: GameEvent::PlaceTurret {
                slot: 3,
                kind: TurretKind::Cryo,
            },
        };
        let wire = WireEvent::from_event(&event).unwrap();
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"tick": 12, "type": "place_turret", "payload": {"slot": 3, "kind": "Cryo"}})
        );
        assert_eq!(wire.to_event().unwrap(), event);

        let bogus = WireEvent {
            tick: 1,
            kind: "launch_nukes".to_string(),
            payload: serde_json::Value::Null,
        };
        assert!(bogus.to_event().is_err());
    }

    #[test]
    fn test_response_wire_form() {
        let rejected = serde_json::to_string(&SegmentResponse::rejected(
            RejectionCode::CheckpointMismatch,
        ))
        .unwrap();
        assert_eq!(
            rejected,
            r#"{"accepted":false,"rejectionReason":"CHECKPOINT_MISMATCH"}"#
        );
        let accepted = serde_json::to_string(&SegmentResponse::accepted()).unwrap();
        assert_eq!(accepted, r#"{"accepted":true}"#);
    }

    #[test]
    fn test_session_bytes_roundtrip() {
        let session = session(6);
        let restored = VerifierSession::from_bytes(&session.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, session);
    }
}
