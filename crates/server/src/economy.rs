//! Per-player resource economy.
//!
//! Three fungible resources with independent stocks and production rates.
//! Costs and rewards may additionally carry hit points, which blend into the
//! affordability rule: a cost can never be paid with a player's life.

use serde::{Deserialize, Serialize};

/// The three resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    Wood,
    Stone,
    Gold,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Wood, ResourceKind::Stone, ResourceKind::Gold];

    /// Stable numeric id used on the wire.
    pub fn id(self) -> u8 {
        match self {
            ResourceKind::Wood => 1,
            ResourceKind::Stone => 2,
            ResourceKind::Gold => 3,
        }
    }

    fn index(self) -> usize {
        match self {
            ResourceKind::Wood => 0,
            ResourceKind::Stone => 1,
            ResourceKind::Gold => 2,
        }
    }
}

/// A price in resources, optionally blended with hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cost {
    pub wood: u32,
    pub stone: u32,
    pub gold: u32,
    pub hitpoints: u32,
}

impl Cost {
    pub const fn resources(wood: u32, stone: u32, gold: u32) -> Self {
        Self {
            wood,
            stone,
            gold,
            hitpoints: 0,
        }
    }

    pub const fn gold(amount: u32) -> Self {
        Self::resources(0, 0, amount)
    }
}

/// A payout in resources, optionally blended with hit points (healing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reward {
    pub wood: u32,
    pub stone: u32,
    pub gold: u32,
    pub hitpoints: u32,
}

impl Reward {
    pub const fn resources(wood: u32, stone: u32, gold: u32) -> Self {
        Self {
            wood,
            stone,
            gold,
            hitpoints: 0,
        }
    }

    pub const fn gold(amount: u32) -> Self {
        Self::resources(0, 0, amount)
    }
}

/// One player's stock and production rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stockpile {
    amounts: [u32; 3],
    rates: [u32; 3],
}

impl Stockpile {
    pub fn new(starting_amount: u32, base_production: u32) -> Self {
        Self {
            amounts: [starting_amount; 3],
            rates: [base_production; 3],
        }
    }

    pub fn amount(&self, kind: ResourceKind) -> u32 {
        self.amounts[kind.index()]
    }

    pub fn rate(&self, kind: ResourceKind) -> u32 {
        self.rates[kind.index()]
    }

    pub fn wood(&self) -> u32 {
        self.amount(ResourceKind::Wood)
    }

    pub fn stone(&self) -> u32 {
        self.amount(ResourceKind::Stone)
    }

    pub fn gold(&self) -> u32 {
        self.amount(ResourceKind::Gold)
    }

    /// Affordability is strict on hit points: the player must keep at least
    /// one point after paying, so a cost can never eliminate them.
    pub fn can_afford(&self, cost: &Cost, current_hitpoints: u32) -> bool {
        self.wood() >= cost.wood
            && self.stone() >= cost.stone
            && self.gold() >= cost.gold
            && current_hitpoints > cost.hitpoints
    }

    /// Debit a cost's resource component. Callers check affordability first;
    /// stocks saturate at zero regardless.
    pub fn subtract(&mut self, cost: &Cost) {
        self.amounts[0] = self.amounts[0].saturating_sub(cost.wood);
        self.amounts[1] = self.amounts[1].saturating_sub(cost.stone);
        self.amounts[2] = self.amounts[2].saturating_sub(cost.gold);
    }

    /// Credit a reward's resource component.
    pub fn add(&mut self, reward: &Reward) {
        self.amounts[0] += reward.wood;
        self.amounts[1] += reward.stone;
        self.amounts[2] += reward.gold;
    }

    /// Additive production bonus, granted by building construction.
    pub fn add_production_bonus(&mut self, kind: ResourceKind, bonus: u32) {
        self.rates[kind.index()] += bonus;
    }

    /// Credit one production interval's worth of every resource.
    pub fn tick_production(&mut self) {
        for i in 0..3 {
            self.amounts[i] += self.rates[i];
        }
    }

    /// Restore a stockpile from captured values (snapshot restore).
    pub fn from_parts(amounts: [u32; 3], rates: [u32; 3]) -> Self {
        Self { amounts, rates }
    }
}
