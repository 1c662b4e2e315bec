use std::time::Duration;

use tracing::{info, warn};

use crate::cancel::CancelGate;
use crate::config::{append_spin_log, now_ms};
use crate::draw::RandomSource;
use crate::error::WheelResult;
use crate::presentation::{presentation_order, WINNER_SLOT};
use crate::render::{animate_spin, SpinAnimationAssembler, WheelSnapshotRenderer};
use crate::roster::MembershipSource;
use crate::spin::{frame_schedule, solve_spin};
use crate::tournament::{draw_reinstatement, CancelCheck, EliminationTournament};
use crate::types::*;

/// Everything needed to show one landing: who is drawn first on the wheel,
/// how far it turns, and the rendered frames.
#[derive(Debug, Clone)]
pub struct PreparedSpin {
    pub presentation: Vec<String>,
    pub plan: SpinPlan,
    pub animation: SpinAnimation,
}

/// Drives one wheel run end to end: optional reinstatement, then elimination
/// rounds until a survivor is left or the run is cancelled.
pub struct WheelSession<M, R> {
    config: WheelConfig,
    members: M,
    rng: R,
    cancel: CancelGate,
    overlay: SharedOverlayState,
}

impl<M: MembershipSource, R: RandomSource> WheelSession<M, R> {
    pub fn new(
        config: WheelConfig,
        members: M,
        rng: R,
        cancel: CancelGate,
        overlay: SharedOverlayState,
    ) -> Self {
        WheelSession {
            config,
            members,
            rng,
            cancel,
            overlay,
        }
    }

    pub fn members(&self) -> &M {
        &self.members
    }

    pub fn into_members(self) -> M {
        self.members
    }

    fn publish(&self, update: impl FnOnce(&mut OverlayState)) {
        let mut guard = self.overlay.lock().unwrap_or_else(|e| e.into_inner());
        update(&mut guard);
        guard.updated_at_ms = now_ms();
    }

    /// Order, solve, schedule and render a spin landing on `pool[winner_index]`.
    pub fn prepare_spin(&mut self, pool: &[Participant], winner_index: usize) -> WheelResult<PreparedSpin> {
        let presentation = presentation_order(pool, winner_index, &mut self.rng)?;
        let plan = solve_spin(
            presentation.len(),
            WINNER_SLOT,
            self.config.pointer_angle,
            self.config.whole_rotations,
        )?;
        let schedule = frame_schedule(plan.final_rotation_radians, self.config.timing)?;
        let mut renderer = WheelSnapshotRenderer::new(self.config.pointer_angle);
        let animation = animate_spin(
            &mut renderer,
            &mut SpinAnimationAssembler,
            &presentation,
            WINNER_SLOT,
            schedule,
        )?;
        Ok(PreparedSpin {
            presentation,
            plan,
            animation,
        })
    }

    fn update_tags(
        &mut self,
        participant: &Participant,
        add: Vec<String>,
        remove: Vec<String>,
        report: &mut SessionReport,
    ) -> bool {
        let ok = self.members.set_tags(participant, &add, &remove);
        if ok {
            info!(member = %participant.id, ?add, ?remove, "tags updated");
        } else {
            warn!(member = %participant.id, ?add, ?remove, "tag update failed");
            report.failed_tag_updates.push(participant.id.clone());
        }
        ok
    }

    fn spin_log(&self, label: &str, spin: &PreparedSpin) {
        if !self.config.spin_log_enabled {
            return;
        }
        let payload = format!(
            "order: {}\nfinal rotation: {:.6} rad ({} turns)",
            spin.presentation.join(", "),
            spin.plan.final_rotation_radians,
            spin.plan.total_whole_rotations,
        );
        append_spin_log(label, &payload);
    }

    /// Keep a freshly published spin on the overlay for its whole animation
    /// plus the inter-round pause.
    async fn hold_spin(&self, animation_ms: u64) {
        let hold = animation_ms.saturating_add(self.config.inter_round_wait_ms);
        tokio::time::sleep(Duration::from_millis(hold)).await;
    }

    /// Bring one eliminated member back when enough of them are waiting.
    /// Returns `None` when the step is disabled or the pool is too small.
    pub async fn reinstate(&mut self, report: &mut SessionReport) -> WheelResult<Option<Participant>> {
        if !self.config.reinstatement_enabled {
            return Ok(None);
        }
        let pool = self
            .members
            .list_participants_with_tag(&self.config.eliminated_tag)?;
        if pool.len() < self.config.reinstatement_min_pool {
            info!(
                pool = pool.len(),
                required = self.config.reinstatement_min_pool,
                "skipping reinstatement"
            );
            return Ok(None);
        }

        let (index, picked) = draw_reinstatement(&pool, &mut self.rng)?;
        let spin = self.prepare_spin(&pool, index)?;
        info!(member = %picked.id, label = %picked.label, pool = pool.len(), "reinstatement drawn");
        self.spin_log(&format!("reinstated {}", picked.label), &spin);
        self.publish(|state| {
            state.status = SessionStatus::Spinning;
            state.pool = spin.presentation.clone();
            state.animation = Some(spin.animation.clone());
            state.spin_seq += 1;
        });

        let add = vec![self.config.participant_tag.clone()];
        let remove = vec![self.config.eliminated_tag.clone()];
        self.update_tags(&picked, add, remove, report);
        report.reinstated = Some(picked.clone());
        self.hold_spin(spin.animation.total_duration_ms).await;
        Ok(Some(picked))
    }

    pub async fn run(&mut self) -> WheelResult<SessionReport> {
        let mut report = SessionReport::default();
        self.reinstate(&mut report).await?;

        let pool = self
            .members
            .list_participants_with_tag(&self.config.participant_tag)?;
        if pool.len() < self.config.min_pool_size {
            warn!(
                pool = pool.len(),
                required = self.config.min_pool_size,
                tag = %self.config.participant_tag,
                "not enough participants to spin"
            );
            self.publish(|state| {
                state.status = SessionStatus::Idle;
                state.pool = pool.iter().map(|p| p.label.clone()).collect();
            });
            return Ok(report);
        }

        info!(pool = pool.len(), tag = %self.config.participant_tag, "wheel session starting");
        let mut tournament = EliminationTournament::new(pool)?;
        let wait = Duration::from_millis(self.config.cancel_timeout_ms);

        while !tournament.is_finished() {
            if !tournament.rounds().is_empty() {
                self.publish(|state| state.status = SessionStatus::Waiting);
                self.cancel.await_cancellation(wait).await;
                if self.cancel.should_cancel() {
                    info!(rounds = tournament.rounds().len(), "wheel session cancelled");
                    report.cancelled = true;
                    break;
                }
            }

            let pool_before = tournament.pool().to_vec();
            let Some(result) = tournament.next_round(&mut self.rng)? else {
                break;
            };
            let spin = self.prepare_spin(&pool_before, result.winner_index)?;
            info!(
                round = result.round,
                eliminated = %result.winner.label,
                remaining = result.remaining_pool.len(),
                "round spun"
            );
            self.spin_log(&format!("round {} eliminated {}", result.round, result.winner.label), &spin);

            let add = vec![self.config.eliminated_tag.clone()];
            let remove = vec![self.config.participant_tag.clone()];
            let tags_updated = self.update_tags(&result.winner, add, remove, &mut report);

            let hold_ms = spin.animation.total_duration_ms;
            let summary = RoundSummary {
                round: result.round,
                eliminated: result.winner.clone(),
                presentation: spin.presentation.clone(),
                plan: spin.plan,
                tags_updated,
            };
            self.publish(|state| {
                state.status = SessionStatus::Spinning;
                state.round = result.round;
                state.pool = spin.presentation.clone();
                state.animation = Some(spin.animation);
                state.spin_seq += 1;
                state.last_round = Some(summary.clone());
            });
            report.rounds.push(summary);
            self.hold_spin(hold_ms).await;
        }

        if let Some(survivor) = tournament.survivor().cloned() {
            info!(survivor = %survivor.label, "wheel session finished");
            let add = vec![self.config.winner_tag.clone()];
            self.update_tags(&survivor, add, Vec::new(), &mut report);
            self.publish(|state| {
                state.status = SessionStatus::Finished;
                state.survivor = Some(survivor.clone());
            });
            report.survivor = Some(survivor);
        } else if report.cancelled {
            self.publish(|state| state.status = SessionStatus::Cancelled);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::ScriptedRandom;
    use crate::roster::{JsonRoster, ManualClock, RoleCache};
    use crate::spin::segment_under_pointer;
    use std::f64::consts::PI;
    use std::sync::{Arc, Mutex};

    fn member(id: &str, tags: &[&str]) -> RosterMember {
        RosterMember {
            id: id.to_string(),
            name: id.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn test_config() -> WheelConfig {
        WheelConfig {
            cancel_timeout_ms: 0,
            spin_log_enabled: false,
            timing: SpinTiming {
                frame_count: 12,
                ..SpinTiming::default()
            },
            ..WheelConfig::default()
        }
    }

    fn session(
        members: Vec<RosterMember>,
        script: Vec<usize>,
        config: WheelConfig,
    ) -> (WheelSession<JsonRoster, ScriptedRandom>, CancelGate, SharedOverlayState) {
        let gate = CancelGate::new();
        let overlay: SharedOverlayState = Arc::new(Mutex::new(OverlayState::default()));
        let session = WheelSession::new(
            config,
            JsonRoster::in_memory(members),
            ScriptedRandom::new(script),
            gate.clone(),
            overlay.clone(),
        );
        (session, gate, overlay)
    }

    fn seven_out_two_in() -> Vec<RosterMember> {
        let mut members: Vec<RosterMember> = (0..7).map(|i| member(&format!("out{i}"), &["wheel-out"])).collect();
        members.push(member("in0", &["wheel"]));
        members.push(member("in1", &["wheel"]));
        members
    }

    fn eight_players() -> Vec<RosterMember> {
        ["A", "B", "C", "D", "E", "F", "G", "H"]
            .iter()
            .map(|id| member(id, &["wheel"]))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_round_lands_on_drawn_participant() {
        let (mut session, _gate, overlay) = session(eight_players(), vec![3], test_config());
        let report = session.run().await.unwrap();

        let first = &report.rounds[0];
        assert_eq!(first.eliminated.label, "D");
        assert_eq!(first.presentation[0], "D");
        assert_eq!(first.presentation.len(), 8);
        let expected = 8.0 * PI + PI / 2.0 - PI / 8.0;
        assert!((first.plan.final_rotation_radians - expected).abs() < 1e-9);

        assert_eq!(report.rounds.len(), 7);
        assert!(!report.cancelled);
        // Script ran out after round 1, so index 0 is drawn each time: H survives.
        assert_eq!(report.survivor.as_ref().unwrap().label, "H");
        assert!(report.failed_tag_updates.is_empty());

        let guard = overlay.lock().unwrap();
        assert_eq!(guard.status, SessionStatus::Finished);
        assert_eq!(guard.round, 7);
        assert_eq!(guard.spin_seq, 7);
        let animation = guard.animation.as_ref().unwrap();
        let last = &animation.frames.last().unwrap().frame;
        assert_eq!(segment_under_pointer(2, last.rotation, 0.0).unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tags_follow_results() {
        let (mut session, _gate, _overlay) = session(eight_players(), vec![3], test_config());
        let report = session.run().await.unwrap();
        let roster = session.into_members();

        let survivor_id = report.survivor.unwrap().id;
        for m in roster.members() {
            if m.id == survivor_id {
                assert!(m.has_tag("wheel"));
                assert!(m.has_tag("wheel-winner"));
            } else {
                assert!(m.has_tag("wheel-out"), "{} should be out", m.id);
                assert!(!m.has_tag("wheel"));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_after_committed_round() {
        let (mut session, gate, overlay) = session(eight_players(), vec![0, 0, 0], test_config());
        gate.cancel();
        let report = session.run().await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.rounds.len(), 1);
        assert!(report.survivor.is_none());
        assert_eq!(overlay.lock().unwrap().status, SessionStatus::Cancelled);

        let still_in = session
            .into_members()
            .members()
            .iter()
            .filter(|m| m.has_tag("wheel"))
            .count();
        assert_eq!(still_in, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_participant_is_not_spun() {
        let (mut session, _gate, overlay) = session(vec![member("solo", &["wheel"])], vec![], test_config());
        let report = session.run().await.unwrap();
        assert!(report.rounds.is_empty());
        assert!(report.survivor.is_none());
        assert_eq!(overlay.lock().unwrap().status, SessionStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinstatement_runs_with_seven_out() {
        let mut members: Vec<RosterMember> = (0..7).map(|i| member(&format!("out{i}"), &["wheel-out"])).collect();
        members.push(member("in0", &["wheel"]));
        members.push(member("in1", &["wheel"]));
        let (mut session, _gate, _overlay) = session(members, vec![2], test_config());
        let report = session.run().await.unwrap();

        let back = report.reinstated.unwrap();
        assert_eq!(back.id, "out2");
        // Reinstated member joins the three-way wheel.
        assert_eq!(report.rounds.len(), 2);
        assert_eq!(report.rounds[0].presentation.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinstatement_skipped_with_five_out() {
        let mut members: Vec<RosterMember> = (0..5).map(|i| member(&format!("out{i}"), &["wheel-out"])).collect();
        members.push(member("in0", &["wheel"]));
        members.push(member("in1", &["wheel"]));
        let (mut session, _gate, _overlay) = session(members, vec![], test_config());
        let report = session.run().await.unwrap();

        assert!(report.reinstated.is_none());
        assert_eq!(report.rounds.len(), 1);
        assert_eq!(report.rounds[0].presentation.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinstatement_can_be_disabled() {
        let mut members: Vec<RosterMember> = (0..7).map(|i| member(&format!("out{i}"), &["wheel-out"])).collect();
        members.push(member("in0", &["wheel"]));
        members.push(member("in1", &["wheel"]));
        let config = WheelConfig {
            reinstatement_enabled: false,
            ..test_config()
        };
        let (mut session, _gate, _overlay) = session(members, vec![], config);
        let report = session.run().await.unwrap();
        assert!(report.reinstated.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinstatement_spin_stays_on_overlay() {
        let config = WheelConfig {
            inter_round_wait_ms: 1_000,
            ..test_config()
        };
        let (mut session, _gate, overlay) = session(seven_out_two_in(), vec![2], config);
        let running = tokio::spawn(async move { session.run().await });

        // The session is now parked on the reinstatement spin.
        tokio::time::sleep(Duration::from_millis(1)).await;
        {
            let guard = overlay.lock().unwrap();
            assert_eq!(guard.spin_seq, 1);
            assert_eq!(guard.round, 0);
            assert_eq!(guard.status, SessionStatus::Spinning);
            assert_eq!(guard.pool[0], "out2");
            let animation = guard.animation.as_ref().unwrap();
            assert_eq!(animation.frames[0].frame.segments.len(), 7);
        }

        let report = running.await.unwrap().unwrap();
        assert_eq!(report.rounds.len(), 2);
        let guard = overlay.lock().unwrap();
        assert_eq!(guard.spin_seq, 3);
        assert_eq!(guard.status, SessionStatus::Finished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_round_spin_is_held_before_the_next() {
        let config = WheelConfig {
            inter_round_wait_ms: 1_000,
            ..test_config()
        };
        let (mut session, _gate, overlay) = session(eight_players(), vec![3], config);
        let running = tokio::spawn(async move { session.run().await });

        tokio::time::sleep(Duration::from_millis(1)).await;
        {
            let guard = overlay.lock().unwrap();
            assert_eq!(guard.spin_seq, 1);
            assert_eq!(guard.round, 1);
            assert_eq!(guard.last_round.as_ref().unwrap().eliminated.label, "D");
        }
        assert_eq!(running.await.unwrap().unwrap().rounds.len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinstated_member_joins_pool_through_role_cache() {
        let clock = ManualClock::new(0);
        let mut members = RoleCache::new(
            JsonRoster::in_memory(seven_out_two_in()),
            clock,
            DEFAULT_ROLE_CACHE_TTL_MS,
        );
        // Warm the cache; the clock never moves, so only invalidation can refresh it.
        assert_eq!(members.list_participants_with_tag("wheel").unwrap().len(), 2);

        let overlay: SharedOverlayState = Arc::new(Mutex::new(OverlayState::default()));
        let mut session = WheelSession::new(
            test_config(),
            members,
            ScriptedRandom::new(vec![2]),
            CancelGate::new(),
            overlay,
        );
        let report = session.run().await.unwrap();

        assert_eq!(report.reinstated.as_ref().unwrap().id, "out2");
        assert_eq!(report.rounds.len(), 2);
        let first = &report.rounds[0].presentation;
        assert_eq!(first.len(), 3);
        assert!(first.contains(&"out2".to_string()));

        let cache = session.into_members();
        let survivor = report.survivor.unwrap();
        let winner = cache
            .source()
            .members()
            .iter()
            .find(|m| m.id == survivor.id)
            .unwrap();
        assert!(winner.has_tag("wheel-winner"));
    }
}
