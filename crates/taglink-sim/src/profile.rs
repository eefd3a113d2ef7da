//! Per-session reader behavior profiles.
//!
//! A profile decides, for each protocol session, how many handshakes the
//! simulated reader completes and how many full messages it acknowledges.
//! The fading profile evolves by a seeded random walk, so a given seed
//! always produces the same link history.

use rand::rngs::StdRng;
use rand::{RngExt as _, SeedableRng};

/// What one simulated session yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionScript {
    /// Successful preamble handshakes in the session.
    pub handshakes: u16,
    /// Acknowledged full messages; never exceeds `handshakes`.
    pub acks: u16,
}

/// Reader behavior over time.
#[derive(Debug, Clone)]
pub enum LinkProfile {
    /// Every session completes `acks` messages out of `handshakes`
    /// handshakes.
    Solid { handshakes: u16, acks: u16 },
    /// No reader in range; sessions see nothing.
    Dead,
    /// Ack rate wanders between 0 and 1 by a seeded random walk.
    Fading {
        seed: u64,
        /// Handshakes offered per session.
        handshakes: u16,
        /// Largest per-step change of the ack rate.
        step: f64,
    },
}

/// Stateful session-by-session generator for a [`LinkProfile`].
#[derive(Debug)]
pub struct SessionPlanner {
    profile: LinkProfile,
    rng: StdRng,
    rate: f64,
}

impl SessionPlanner {
    pub fn new(profile: LinkProfile) -> Self {
        let seed = match &profile {
            LinkProfile::Fading { seed, .. } => *seed,
            _ => 0,
        };
        SessionPlanner {
            profile,
            rng: StdRng::seed_from_u64(seed),
            rate: 1.0,
        }
    }

    /// Script for the next session.
    pub fn next_session(&mut self) -> SessionScript {
        match self.profile {
            LinkProfile::Solid { handshakes, acks } => SessionScript {
                handshakes: handshakes.max(acks),
                acks,
            },
            LinkProfile::Dead => SessionScript {
                handshakes: 0,
                acks: 0,
            },
            LinkProfile::Fading {
                handshakes, step, ..
            } => {
                let nudge = (self.rng.random::<f64>() * 2.0 - 1.0) * step;
                self.rate = (self.rate + nudge).clamp(0.0, 1.0);
                SessionScript {
                    handshakes,
                    acks: (f64::from(handshakes) * self.rate).round() as u16,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_profile_is_constant() {
        let mut planner = SessionPlanner::new(LinkProfile::Solid {
            handshakes: 12,
            acks: 10,
        });
        for _ in 0..5 {
            assert_eq!(
                planner.next_session(),
                SessionScript {
                    handshakes: 12,
                    acks: 10
                }
            );
        }
    }

    #[test]
    fn dead_profile_yields_nothing() {
        let mut planner = SessionPlanner::new(LinkProfile::Dead);
        assert_eq!(
            planner.next_session(),
            SessionScript {
                handshakes: 0,
                acks: 0
            }
        );
    }

    #[test]
    fn acks_never_exceed_handshakes() {
        let mut planner = SessionPlanner::new(LinkProfile::Fading {
            seed: 77,
            handshakes: 20,
            step: 0.4,
        });
        for _ in 0..200 {
            let script = planner.next_session();
            assert!(script.acks <= script.handshakes);
        }
    }

    #[test]
    fn same_seed_replays_the_same_history() {
        let profile = LinkProfile::Fading {
            seed: 9,
            handshakes: 16,
            step: 0.25,
        };
        let mut a = SessionPlanner::new(profile.clone());
        let mut b = SessionPlanner::new(profile);
        for _ in 0..50 {
            assert_eq!(a.next_session(), b.next_session());
        }
    }
}
