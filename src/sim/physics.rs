//! Player vertical physics
//!
//! Gravity, landing, the jump/double-jump state machine and the timed speed
//! debuff. Illegal jump requests are absorbed as no-ops so the state machine
//! can never reach an invalid configuration.

use super::events::EventKind;
use super::state::{JumpState, Player};
use crate::consts::*;

impl Player {
    /// Advance one tick of player motion
    pub fn update(&mut self) {
        if self.pos.y < GROUND_Y || self.vel_y < 0.0 {
            self.vel_y += GRAVITY;
            self.pos.y += self.vel_y;
        }

        // Top of the play field
        if self.pos.y < 0.0 {
            self.pos.y = 0.0;
            self.vel_y = self.vel_y.max(0.0);
        }

        if self.pos.y >= GROUND_Y {
            self.pos.y = GROUND_Y;
            self.vel_y = 0.0;
            self.jump = JumpState::Grounded;
        }

        if self.debuff_ticks > 0 {
            self.debuff_ticks -= 1;
            if self.debuff_ticks == 0 {
                self.speed_debuff = 1.0;
            }
        }
    }

    /// Try to jump; returns the event to log, or `None` if nothing happened
    pub fn jump(&mut self) -> Option<EventKind> {
        match self.jump {
            JumpState::Grounded => {
                self.vel_y = JUMP_IMPULSE;
                self.jump = JumpState::Jumping;
                Some(EventKind::Jump)
            }
            JumpState::Jumping => {
                self.vel_y = JUMP_IMPULSE * DOUBLE_JUMP_FACTOR;
                self.jump = JumpState::DoubleJumped;
                Some(EventKind::DoubleJump)
            }
            JumpState::DoubleJumped => None,
        }
    }

    /// Launch off a bounce pad; the double jump is available again
    pub fn bounce(&mut self) {
        self.vel_y = BOUNCE_IMPULSE;
        self.jump = JumpState::Jumping;
    }

    /// Halve the player's speed for a fixed number of ticks
    pub fn apply_debuff(&mut self) {
        self.speed_debuff = DEBUFF_MULTIPLIER;
        self.debuff_ticks = DEBUFF_TICKS;
    }

    pub fn is_grounded(&self) -> bool {
        self.jump == JumpState::Grounded
    }
}
