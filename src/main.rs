//! Ronin Duel demo driver
//!
//! Runs an authority and a replica in one process over a loopback link and
//! plays a scripted duel at the simulation tick rate. Set `RONIN_CONFIG` to a
//! JSON file to override the tuned constants; `RUST_LOG` controls verbosity.

use std::time::Duration;

use anyhow::Context;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ronin::{
    core::hash::short_hex,
    game::{combatant::CombatantId, events::CombatEventData, state::MatchState},
    network::{Encoding, LoopbackTransport, PeerSession, Role, SessionConfig},
    InputFrame, InputLatch, SimConfig, TICK_RATE, VERSION,
};

/// Demo length cap (two minutes at 60 Hz).
const MAX_DEMO_TICKS: u32 = 7200;

/// Closing distance at which the scripted fighters stop walking and swing.
const ENGAGE_RANGE: f32 = 90.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Ronin Duel v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let sim = match std::env::var("RONIN_CONFIG") {
        Ok(path) => SimConfig::load(&path).with_context(|| format!("loading {path}"))?,
        Err(_) => SimConfig::default(),
    };

    let config = SessionConfig {
        encoding: Encoding::Binary,
        sim,
        ..SessionConfig::default()
    };
    info!("RNG Seed: {}", config.seed);

    let (host_link, guest_link) = LoopbackTransport::pair(config.encoding);
    let host_inbox = host_link.inbox();
    let guest_inbox = guest_link.inbox();
    let mut authority = PeerSession::new(Role::Authority, host_link, host_inbox, config.clone())?;
    let mut replica = PeerSession::new(Role::Replica, guest_link, guest_inbox, config)?;

    let mut host_latch = InputLatch::new();
    let mut guest_latch = InputLatch::new();
    let dt = 1.0 / TICK_RATE as f32;

    let mut interval = tokio::time::interval(Duration::from_secs_f32(dt));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    for t in 0..MAX_DEMO_TICKS {
        interval.tick().await;

        let host_frame = authority
            .state()
            .map(|s| script_input(&mut host_latch, s, authority.local_id(), t, false))
            .unwrap_or_default();
        let report = authority.step(dt, host_frame)?;

        for event in &report.events {
            match &event.data {
                CombatEventData::Strike { attacker, defender, move_key, outcome, damage, .. } => {
                    info!(
                        "Tick {}: {} -> {} {} ({:?}, {:.1} dmg)",
                        event.tick, attacker.0, defender.0, move_key.as_str(), outcome, damage
                    );
                }
                CombatEventData::Died { victim, .. } => info!("Combatant {} fell", victim.0),
                CombatEventData::MatchEnded { winner, duration_ticks } => {
                    info!("Match ended after {} ticks, winner: {:?}", duration_ticks, winner);
                }
            }
        }

        // Let the loopback reader deliver the snapshot before the replica steps.
        tokio::task::yield_now().await;

        let guest_frame = replica
            .state()
            .map(|s| script_input(&mut guest_latch, s, replica.local_id(), t, true))
            .unwrap_or_default();
        let mirror = replica.step(dt, guest_frame)?;

        if t % 600 == 0 || report.match_ended {
            info!(
                "Tick {}: authority {} / replica {} ({:?})",
                report.tick,
                short_hex(&report.digest),
                short_hex(&mirror.digest),
                mirror.link
            );
        }

        if report.match_ended && mirror.match_ended {
            break;
        }
    }

    if let (Some(a), Some(r)) = (authority.state(), replica.state()) {
        for (id, c) in &a.combatants {
            info!("Combatant {}: health {:.1}, guard {:.1}", id.0, c.health(), c.guard());
        }
        let (ha, hr) = (a.compute_hash(), r.compute_hash());
        info!("Final digests: authority {} / replica {}", hex::encode(ha), hex::encode(hr));
    }

    authority.end();
    replica.end();
    Ok(())
}

/// Scripted fighter: close in, swing every half second, and (as the
/// defender) raise the guard now and then.
fn script_input(
    latch: &mut InputLatch,
    state: &MatchState,
    me: Option<CombatantId>,
    t: u32,
    defensive: bool,
) -> InputFrame {
    let Some(me) = me.and_then(|id| state.get(id)) else {
        return latch.frame();
    };
    let Some(foe) = state.combatants.values().find(|c| c.team != me.team && c.is_alive()) else {
        latch.set_movement(0.0, 0.0);
        return latch.frame();
    };

    latch.set_aim(foe.position);
    let to_foe = foe.position - me.position;
    if to_foe.length() > ENGAGE_RANGE {
        let dir = to_foe.normalize();
        latch.set_movement(dir.x, dir.y);
    } else {
        latch.set_movement(0.0, 0.0);
        if t % 30 == 0 {
            latch.press(InputFrame::FLAG_ATTACK);
        }
    }

    latch.set_block(defensive && t % 120 >= 100);
    if t % 240 == 0 {
        latch.press(InputFrame::FLAG_STANCE_UP);
    }
    if !defensive && to_foe.length() > 3.0 * ENGAGE_RANGE && t % 90 == 0 {
        latch.press(InputFrame::FLAG_DASH);
    }
    latch.frame()
}
