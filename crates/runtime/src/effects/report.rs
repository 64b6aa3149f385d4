use battle_core::EffectKind;

/// Summary of one [`EffectManager::tick`](super::EffectManager::tick).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub turn: u64,
    /// Hp lost to damage-over-time effects.
    pub damage_dealt: i64,
    /// Healing absorbed from heal-over-time effects (hp and overheal).
    pub healing_done: i64,
    /// Effects that ran out this turn, in the order they expired.
    pub expired: Vec<(EffectKind, String)>,
    /// HoTs not applied because the entity was already down.
    pub skipped_hots: usize,
    /// DoTs not applied because the entity had already fallen.
    pub skipped_dots: usize,
}

impl TickReport {
    pub(crate) fn new(turn: u64) -> Self {
        Self {
            turn,
            ..Self::default()
        }
    }

    pub fn expired_ids(&self, kind: EffectKind) -> impl Iterator<Item = &str> + '_ {
        self.expired
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, id)| id.as_str())
    }
}
