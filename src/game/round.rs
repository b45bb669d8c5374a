//! Round Resolution
//!
//! The deterministic step function. Given exactly one command per seat,
//! `ArenaState::apply` runs six phases in a fixed order; reordering them
//! changes outcomes.

use crate::game::events::{RoundEvent, RoundEventData, RoundPhase};
use crate::game::moves::{Command, MoveCategory, Seat};
use crate::game::state::{ArenaState, Delta};

impl ArenaState {
    /// Resolve one round.
    ///
    /// # Phases
    ///
    /// 1. Stance: `ChangeStance` toggles immediately
    /// 2. Intent: moving commands set `next_position`
    /// 3. Bounds: default unset intents, clamp into the arena
    /// 4. Resolution: commit only if seat 0 stays strictly below seat 1
    /// 5. Attack: hit iff distance equals the attack's range
    /// 6. Damage: every hit costs exactly one health
    ///
    /// Returns the before/after snapshots of both players.
    pub fn apply(&mut self, moves: [Command; 2]) -> Delta {
        debug_assert_ne!(moves[0].seat, moves[1].seat, "one command per seat");

        let before = self.snapshot();
        self.round += 1;

        self.stance_phase(&moves);
        self.intent_phase(&moves);
        self.bounds_phase();
        self.resolution_phase();
        self.attack_phase(&moves);
        self.damage_phase();

        Delta {
            before,
            after: self.snapshot(),
        }
    }

    /// Rewind one round by restoring `delta.before` verbatim.
    ///
    /// Works for any move type since it never derives an inverse.
    pub fn undo(&mut self, delta: &Delta) {
        for (player, snapshot) in self.players.iter_mut().zip(delta.before.iter()) {
            player.restore(snapshot);
        }
        self.round = self.round.saturating_sub(1);
        self.pending_events.clear();
    }

    fn stance_phase(&mut self, moves: &[Command; 2]) {
        for cmd in moves {
            if cmd.mv.category() != MoveCategory::Stance {
                continue;
            }
            let player = self.player_mut(cmd.seat);
            player.stance = player.stance.toggled();
            let stance = player.stance;
            self.emit(RoundPhase::Stance, RoundEventData::StanceChanged {
                seat: cmd.seat,
                stance,
            });
        }
    }

    fn intent_phase(&mut self, moves: &[Command; 2]) {
        for cmd in moves {
            if let Some(displacement) = cmd.displacement() {
                let player = self.player_mut(cmd.seat);
                player.next_position = Some(player.position + displacement);
            }
        }
    }

    fn bounds_phase(&mut self) {
        let max = self.config.max_position();
        for player in self.players.iter_mut() {
            let intended = player.next_position.unwrap_or(player.position);
            player.next_position = Some(intended.clamp(0, max));
        }
    }

    fn resolution_phase(&mut self) {
        let intended = [
            self.players[0].next_position.unwrap_or(self.players[0].position),
            self.players[1].next_position.unwrap_or(self.players[1].position),
        ];

        // Simultaneous movement may never let the players meet or pass.
        if intended[0] < intended[1] {
            for seat in Seat::ALL {
                let player = self.player_mut(seat);
                let from = player.position;
                let to = intended[seat.index()];
                player.position = to;
                if from != to {
                    self.emit(RoundPhase::Movement, RoundEventData::Moved { seat, from, to });
                }
            }
        } else {
            let stationary = [self.players[0].position, self.players[1].position];
            if intended != stationary {
                self.emit(RoundPhase::Movement, RoundEventData::MovementBlocked { intended });
            }
        }

        for player in self.players.iter_mut() {
            player.next_position = None;
        }
    }

    fn attack_phase(&mut self, moves: &[Command; 2]) {
        let distance = self.distance();

        for cmd in moves {
            let stance = self.player(cmd.seat).stance;
            let Some(range) = cmd.mv.attack_range(stance) else {
                continue;
            };

            if distance == range {
                self.player_mut(cmd.seat.opponent()).is_hit = true;
                self.emit(RoundPhase::Attack, RoundEventData::AttackHit {
                    attacker: cmd.seat,
                    range,
                });
            } else {
                self.emit(RoundPhase::Attack, RoundEventData::AttackMissed {
                    attacker: cmd.seat,
                    range,
                    distance,
                });
            }

            if cmd.mv.flips_stance_on_attack() {
                let player = self.player_mut(cmd.seat);
                player.stance = player.stance.toggled();
                let stance = player.stance;
                self.emit(RoundPhase::Attack, RoundEventData::StanceChanged {
                    seat: cmd.seat,
                    stance,
                });
            }
        }
    }

    fn damage_phase(&mut self) {
        for seat in Seat::ALL {
            let player = self.player_mut(seat);
            if !player.is_hit {
                continue;
            }
            let was_standing = player.is_standing();
            player.health = player.health.saturating_sub(1);
            let health = player.health;

            self.emit(RoundPhase::Damage, RoundEventData::Damaged { seat, health });
            if was_standing && health == 0 {
                self.emit(RoundPhase::Damage, RoundEventData::KnockedOut { seat });
            }
        }

        for player in self.players.iter_mut() {
            player.is_hit = false;
        }
    }

    fn emit(&mut self, phase: RoundPhase, data: RoundEventData) {
        let event = RoundEvent::new(self.round, phase, data);
        self.push_event(event);
    }
}

/// Replay a sequence of rounds from an initial state.
///
/// Returns the final state and every event produced along the way.
pub fn replay_rounds(
    initial_state: ArenaState,
    rounds: &[[Command; 2]],
) -> (ArenaState, Vec<RoundEvent>) {
    let mut state = initial_state;
    let mut all_events = Vec::new();

    for moves in rounds {
        state.apply(*moves);
        all_events.extend(state.take_events());
    }

    (state, all_events)
}
