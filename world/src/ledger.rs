use getaway_core::{PurchaseError, UpgradeKind};
use serde::{Deserialize, Serialize};

/// Stat values and costs for one upgrade track.
///
/// `stats[n]` is the stat at level `n + 1`; `costs[n]` is the price of moving
/// from level `n + 1` to level `n + 2`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradeTrack {
    /// Stat reported at each level, starting from level one.
    pub stats: Vec<f32>,
    /// Coin cost of each level transition.
    pub costs: Vec<u32>,
}

impl UpgradeTrack {
    /// Creates a new track from its stat and cost tables.
    #[must_use]
    pub fn new(stats: Vec<f32>, costs: Vec<u32>) -> Self {
        Self { stats, costs }
    }

    /// Highest level reachable on the track.
    #[must_use]
    pub fn max_level(&self) -> u32 {
        let purchasable = self.costs.len().min(self.stats.len().saturating_sub(1));
        purchasable as u32 + 1
    }

    /// Stat at the provided one-based level, clamped to the table.
    #[must_use]
    pub fn stat(&self, level: u32) -> f32 {
        stat_at(&self.stats, level)
    }

    /// Cost of upgrading from `level`, or `None` when already at the top.
    #[must_use]
    pub fn next_cost(&self, level: u32) -> Option<u32> {
        if level >= self.max_level() {
            return None;
        }
        self.costs.get(level.saturating_sub(1) as usize).copied()
    }
}

/// Stat tables for every upgrade track, keyed by [`UpgradeKind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeCatalog {
    /// Top speed per engine level.
    pub engine: UpgradeTrack,
    /// Tank capacity per fuel tank level.
    pub fuel_tank: UpgradeTrack,
    /// Lane change speed per handling level.
    pub handling: UpgradeTrack,
    /// Fraction of forward speed kept while changing lanes, per handling level.
    pub handling_speed_retain: Vec<f32>,
}

impl UpgradeCatalog {
    /// Track backing the provided upgrade kind.
    #[must_use]
    pub fn track(&self, kind: UpgradeKind) -> &UpgradeTrack {
        match kind {
            UpgradeKind::Engine => &self.engine,
            UpgradeKind::FuelTank => &self.fuel_tank,
            UpgradeKind::Handling => &self.handling,
        }
    }
}

impl Default for UpgradeCatalog {
    fn default() -> Self {
        Self {
            engine: UpgradeTrack::new(
                vec![30.0, 40.0, 52.0, 66.0, 82.0],
                vec![200, 450, 750, 1_200],
            ),
            fuel_tank: UpgradeTrack::new(
                vec![60.0, 75.0, 92.0, 112.0, 135.0],
                vec![150, 350, 600, 950],
            ),
            handling: UpgradeTrack::new(
                vec![15.0, 18.0, 21.0, 24.0, 27.0],
                vec![180, 400, 650, 1_000],
            ),
            handling_speed_retain: vec![0.5, 0.65, 0.8, 0.9, 1.0],
        }
    }
}

/// Completed purchase reported by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Purchase {
    pub(crate) level: u32,
    pub(crate) cost: u32,
}

/// Session coin balance and upgrade levels. Nothing here persists across runs.
#[derive(Clone, Debug)]
pub(crate) struct Ledger {
    coins: f32,
    levels: [u32; 3],
    catalog: UpgradeCatalog,
}

impl Ledger {
    pub(crate) fn new(catalog: UpgradeCatalog, coins: f32) -> Self {
        Self {
            coins: coins.max(0.0),
            levels: [1; 3],
            catalog,
        }
    }

    pub(crate) fn coins(&self) -> f32 {
        self.coins
    }

    pub(crate) fn whole_coins(&self) -> u32 {
        self.coins.floor() as u32
    }

    pub(crate) fn earn(&mut self, amount: f32) {
        if amount > 0.0 {
            self.coins += amount;
        }
    }

    pub(crate) fn level(&self, kind: UpgradeKind) -> u32 {
        self.levels[slot(kind)]
    }

    /// Sum of purchased levels across all tracks.
    pub(crate) fn total_upgrades(&self) -> u32 {
        self.levels.iter().map(|level| level.saturating_sub(1)).sum()
    }

    pub(crate) fn stat(&self, kind: UpgradeKind) -> f32 {
        self.catalog.track(kind).stat(self.level(kind))
    }

    pub(crate) fn speed_retain(&self) -> f32 {
        stat_at(
            &self.catalog.handling_speed_retain,
            self.level(UpgradeKind::Handling),
        )
    }

    pub(crate) fn purchase(&mut self, kind: UpgradeKind) -> Result<Purchase, PurchaseError> {
        let level = self.level(kind);
        let cost = self
            .catalog
            .track(kind)
            .next_cost(level)
            .ok_or(PurchaseError::MaxLevel)?;
        if self.coins < cost as f32 {
            return Err(PurchaseError::InsufficientCoins);
        }

        self.coins -= cost as f32;
        let next = level + 1;
        self.levels[slot(kind)] = next;
        Ok(Purchase { level: next, cost })
    }
}

const fn slot(kind: UpgradeKind) -> usize {
    match kind {
        UpgradeKind::Engine => 0,
        UpgradeKind::FuelTank => 1,
        UpgradeKind::Handling => 2,
    }
}

fn stat_at(table: &[f32], level: u32) -> f32 {
    if table.is_empty() {
        return 0.0;
    }
    let index = (level.max(1) as usize - 1).min(table.len() - 1);
    table[index]
}
