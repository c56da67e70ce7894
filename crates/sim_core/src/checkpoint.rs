//! Canonical snapshot encoding and the checkpoint hash chain.
//!
//! The snapshot is a hand-laid little-endian byte stream, independent of
//! serde, in a fixed order:
//!
//! 1. core scalars (tick, wave, ended, won)
//! 2. RNG state
//! 3. fortress
//! 4. enemies, ascending id
//! 5. heroes, slot order
//! 6. turrets, placement order
//! 7. projectiles, ascending id
//! 8. walls, then militia
//! 9. economy and wave flow
//! 10. relics, crystals, timed buffs
//! 11. analytics
//!
//! Every variable-length list is prefixed with its length as a `u32`.
//! Changing anything here changes every hash, so it must move in lockstep
//! with [`crate::config::SIM_VERSION`].

use serde::{Deserialize, Serialize};

use crate::combat::status::{StatusApplication, StatusEffects};
use crate::components::{
    Blocker, Enemy, Fortress, Health, Hero, Militia, OverchargeState, Projectile,
    ProjectileOwner, Turret, Wall,
};
use crate::math::{Fixed, Vec2Fixed};
use crate::state::{Analytics, SimulationState};
use crate::waves::SpawnEntry;

/// FNV-1a 32-bit offset basis.
pub const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
/// FNV-1a 32-bit prime.
pub const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a over `bytes`.
#[must_use]
pub fn fnv1a(bytes: &[u8]) -> u32 {
    fnv1a_extend(FNV_OFFSET_BASIS, bytes)
}

/// Continue an FNV-1a hash with more bytes.
#[must_use]
pub fn fnv1a_extend(mut hash: u32, bytes: &[u8]) -> u32 {
    for &byte in bytes {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Byte sink for the canonical layout.
#[derive(Debug, Default)]
pub struct CanonicalWriter {
    bytes: Vec<u8>,
}

impl CanonicalWriter {
    /// Empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    fn bool(&mut self, value: bool) {
        self.u8(u8::from(value));
    }

    fn u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn len(&mut self, len: usize) {
        self.u32(len as u32);
    }

    fn fixed(&mut self, value: Fixed) {
        self.i32(value.to_bits());
    }

    fn vec2(&mut self, value: Vec2Fixed) {
        self.fixed(value.x);
        self.fixed(value.y);
    }

    fn opt_u32(&mut self, value: Option<u32>) {
        match value {
            Some(v) => {
                self.u8(1);
                self.u32(v);
            }
            None => self.u8(0),
        }
    }

    fn health(&mut self, health: &Health) {
        self.u32(health.current);
        self.u32(health.max);
    }

    fn status(&mut self, status: &StatusEffects) {
        self.u8(status.active_mask());
        if let Some(slow) = status.slow {
            self.i32(slow.factor.to_bits());
            self.u32(slow.remaining);
        }
        if let Some(burn) = status.burn {
            self.u32(burn.per_tick);
            self.u32(burn.remaining);
        }
        if let Some(poison) = status.poison {
            self.u32(poison.per_stack);
            self.u8(poison.stacks);
            self.u32(poison.remaining);
        }
        self.u32(status.freeze);
        self.u32(status.stun);
        self.u32(status.armor_break);
    }

    fn status_application(&mut self, application: Option<StatusApplication>) {
        match application {
            None => self.u8(0),
            Some(StatusApplication::Slow { factor, duration }) => {
                self.u8(1);
                self.i32(factor.to_bits());
                self.u32(duration);
            }
            Some(StatusApplication::Burn { per_tick, duration }) => {
                self.u8(2);
                self.u32(per_tick);
                self.u32(duration);
            }
            Some(StatusApplication::Poison {
                per_stack,
                duration,
            }) => {
                self.u8(3);
                self.u32(per_stack);
                self.u32(duration);
            }
            Some(StatusApplication::Freeze { duration }) => {
                self.u8(4);
                self.u32(duration);
            }
            Some(StatusApplication::Stun { duration }) => {
                self.u8(5);
                self.u32(duration);
            }
            Some(StatusApplication::ArmorBreak { duration }) => {
                self.u8(6);
                self.u32(duration);
            }
        }
    }

    fn spawn_entry(&mut self, entry: &SpawnEntry) {
        self.u8(entry.kind.code());
        self.u8(entry.tier.code());
        self.u8(entry.pillar.code());
        self.u32(entry.hp);
        self.fixed(entry.speed);
        self.u32(entry.damage);
        self.fixed(entry.radius);
        self.u32(entry.reward);
        self.u32(entry.shield);
        self.u32(entry.regen_percent);
        self.u32(entry.ability_cooldown);
    }

    fn fortress(&mut self, fortress: &Fortress) {
        self.health(&fortress.health);
        self.u8(fortress.class as u8);
        self.u8(fortress.commander_level);
        self.len(fortress.auras.len());
        for aura in &fortress.auras {
            self.u8(*aura as u8);
        }
        self.u32(fortress.attack_cooldown);
        for cooldown in fortress.skill_cooldowns {
            self.u32(cooldown);
        }
        self.len(fortress.pending_skills.len());
        for skill in &fortress.pending_skills {
            self.u8(skill.index() as u8);
        }
        self.u32(fortress.shield);
        self.u32(fortress.shield_ticks);
    }

    fn enemy(&mut self, enemy: &Enemy) {
        self.u32(enemy.id);
        self.u8(enemy.kind.code());
        self.u8(enemy.tier.code());
        self.u8(enemy.pillar.code());
        self.health(&enemy.health);
        self.u32(enemy.shield);
        self.fixed(enemy.speed);
        self.u32(enemy.damage);
        self.fixed(enemy.radius);
        self.vec2(enemy.position);
        self.fixed(enemy.progress);
        self.status(&enemy.status);
        self.u32(enemy.ability_cooldown);
        self.u32(enemy.attack_cooldown);
        self.u32(enemy.reward);
        self.u32(enemy.regen_percent);
        self.u64(enemy.combo.locked_until);
        self.len(enemy.combo.hits.len());
        for hit in &enemy.combo.hits {
            self.u8(hit.element.code());
            self.u64(hit.tick);
        }
        self.len(enemy.pending_hits.len());
        for element in &enemy.pending_hits {
            self.u8(element.code());
        }
        match enemy.blocked_by {
            None => self.u8(0),
            Some(Blocker::Wall(id)) => {
                self.u8(1);
                self.u32(id);
            }
            Some(Blocker::Militia(id)) => {
                self.u8(2);
                self.u32(id);
            }
        }
        self.bool(enemy.leaked);
    }

    fn hero(&mut self, hero: &Hero) {
        self.u8(hero.slot);
        self.u8(hero.class as u8);
        self.u8(hero.tier as u8);
        self.u8(hero.passive as u8);
        self.u8(hero.artifact.map_or(0, |a| a as u8 + 1));
        self.u8(hero.state as u8);
        self.vec2(hero.position);
        self.vec2(hero.home);
        match hero.command_target {
            Some(point) => {
                self.u8(1);
                self.vec2(point);
            }
            None => self.u8(0),
        }
        self.opt_u32(hero.target);
        self.bool(hero.forced_target);
        self.u32(hero.attack_cooldown);
        self.u32(hero.skill_cooldown);
        self.bool(hero.skill_pending);
        self.u32(hero.disabled_ticks);
    }

    fn turret(&mut self, turret: &Turret) {
        self.u32(turret.id);
        self.u8(turret.kind.code());
        self.u8(turret.slot);
        self.u8(turret.level);
        self.u8(turret.mode as u8);
        match turret.overcharge {
            OverchargeState::Inactive => self.u8(0),
            OverchargeState::Active { remaining } => {
                self.u8(1);
                self.u32(remaining);
            }
            OverchargeState::CoolingDown { remaining } => {
                self.u8(2);
                self.u32(remaining);
            }
        }
        self.u32(turret.cooldown);
        self.vec2(turret.position);
    }

    fn projectile(&mut self, projectile: &Projectile) {
        self.u32(projectile.id);
        match projectile.owner {
            ProjectileOwner::Hero(slot) => {
                self.u8(0);
                self.u32(u32::from(slot));
            }
            ProjectileOwner::Turret(id) => {
                self.u8(1);
                self.u32(id);
            }
            ProjectileOwner::Fortress => {
                self.u8(2);
                self.u32(0);
            }
            ProjectileOwner::Militia(id) => {
                self.u8(3);
                self.u32(id);
            }
        }
        self.vec2(projectile.position);
        self.vec2(projectile.velocity);
        self.u32(projectile.damage);
        self.u8(projectile.element.code());
        self.u8(projectile.pierce);
        self.fixed(projectile.splash);
        self.u8(projectile.chain);
        self.status_application(projectile.status);
        self.fixed(projectile.radius);
        self.u32(projectile.ttl);
        self.u8(projectile.trail as u8);
        self.len(projectile.hits.len());
        for id in &projectile.hits {
            self.u32(*id);
        }
        self.bool(projectile.alive);
    }

    fn wall(&mut self, wall: &Wall) {
        self.u32(wall.id);
        self.fixed(wall.x);
        self.health(&wall.health);
    }

    fn militia(&mut self, unit: &Militia) {
        self.u32(unit.id);
        self.vec2(unit.position);
        self.health(&unit.health);
        self.u32(unit.attack_cooldown);
        self.u32(unit.lifetime);
        self.opt_u32(unit.target);
    }

    fn analytics(&mut self, analytics: &Analytics) {
        self.u32(analytics.kills);
        self.u32(analytics.elite_kills);
        self.u32(analytics.boss_kills);
        self.u32(analytics.leaks);
        self.u64(analytics.damage_dealt);
        self.u64(analytics.damage_taken);
        self.u32(analytics.combos);
        self.u32(analytics.events_applied);
        self.u32(analytics.events_dropped);
        self.u32(analytics.projectiles_fired);
        self.u32(analytics.spawns_capped);
    }

    /// Write the whole state in canonical order.
    pub fn state(&mut self, state: &SimulationState) {
        self.u64(state.tick);
        self.u32(state.wave);
        self.bool(state.ended);
        self.bool(state.won);
        self.u32(state.rng.state());

        let store = &state.store;
        self.fortress(&store.fortress);

        debug_assert!(store.enemies.windows(2).all(|w| w[0].id < w[1].id));
        self.len(store.enemies.len());
        for enemy in &store.enemies {
            self.enemy(enemy);
        }
        self.len(store.heroes.len());
        for hero in &store.heroes {
            self.hero(hero);
        }
        self.len(store.turrets.len());
        for turret in &store.turrets {
            self.turret(turret);
        }
        self.len(store.projectiles.len());
        for projectile in &store.projectiles {
            self.projectile(projectile);
        }
        self.len(store.walls.len());
        for wall in &store.walls {
            self.wall(wall);
        }
        self.len(store.militia.len());
        for unit in &store.militia {
            self.militia(unit);
        }
        self.u32(store.next_id);

        self.u32(state.economy.gold);
        self.u32(state.economy.earned);
        self.u32(state.economy.spent);

        let waves = &state.waves;
        self.u64(waves.started_at);
        self.u8(waves.modifier.code());
        self.len(waves.queue.len());
        for entry in &waves.queue {
            self.spawn_entry(entry);
        }
        self.u32(waves.batch_size);
        self.u64(waves.next_batch_at);
        self.bool(waves.capped);
        self.u32(waves.final_wave);

        self.len(state.loadout.relics.len());
        for relic in &state.loadout.relics {
            self.u8(relic.code());
        }
        self.u32(state.loadout.pending_relic_picks);
        self.len(state.loadout.crystals.len());
        for crystal in &state.loadout.crystals {
            self.u8(*crystal as u8);
        }
        self.len(state.buffs.len());
        for buff in &state.buffs {
            self.u32(buff.percent);
            self.u32(buff.remaining);
        }

        self.analytics(&state.analytics);
    }
}

/// Canonical bytes of a state.
#[must_use]
pub fn encode_state(state: &SimulationState) -> Vec<u8> {
    let mut writer = CanonicalWriter::new();
    writer.state(state);
    writer.into_bytes()
}

/// FNV-1a of the canonical snapshot.
#[must_use]
pub fn snapshot_hash(state: &SimulationState) -> u32 {
    fnv1a(&encode_state(state))
}

/// Next link of the chain: `fnv1a(prev ++ tick ++ snapshot)`, all little-endian.
#[must_use]
pub fn chain_hash(prev: u32, tick: u64, snapshot: u32) -> u32 {
    let mut bytes = [0u8; 16];
    bytes[..4].copy_from_slice(&prev.to_le_bytes());
    bytes[4..12].copy_from_slice(&tick.to_le_bytes());
    bytes[12..].copy_from_slice(&snapshot.to_le_bytes());
    fnv1a(&bytes)
}

/// Lowercase 8-digit hex, the wire form of a hash.
#[must_use]
pub fn hash_hex(hash: u32) -> String {
    format!("{hash:08x}")
}

/// Parse the wire form of a hash.
#[must_use]
pub fn parse_hash_hex(text: &str) -> Option<u32> {
    if text.len() != 8 {
        return None;
    }
    u32::from_str_radix(text, 16).ok()
}

/// Running chain hash across a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashChain {
    head: u32,
}

impl Default for HashChain {
    fn default() -> Self {
        Self::new()
    }
}

impl HashChain {
    /// Chain at session start.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            head: FNV_OFFSET_BASIS,
        }
    }

    /// Resume from a stored head.
    #[must_use]
    pub const fn from_head(head: u32) -> Self {
        Self { head }
    }

    /// Current head.
    #[must_use]
    pub const fn head(&self) -> u32 {
        self.head
    }

    /// Append a checkpoint of `state` and return it.
    pub fn append(&mut self, state: &SimulationState) -> Checkpoint {
        self.head = chain_hash(self.head, state.tick, snapshot_hash(state));
        Checkpoint {
            tick: state.tick,
            hash: self.head,
        }
    }
}

/// A tick-tagged chain hash. On the wire the hash is 8-digit lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Tick the checkpoint was taken after.
    pub tick: u64,
    /// Chain hash.
    #[serde(with = "hex_hash")]
    pub hash: u32,
}

mod hex_hash {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::hash_hex(*hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_hash_hex(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid hash `{text}`")))
    }
}
