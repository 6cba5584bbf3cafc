use alloc::collections::VecDeque;
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    AwaitingWager,
    Scratching,
    Resolved,
    SessionComplete,
}

impl SessionState {
    pub const fn is_scratching(self) -> bool {
        matches!(self, Self::Scratching)
    }

    pub const fn is_complete(self) -> bool {
        matches!(self, Self::SessionComplete)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::AwaitingWager
    }
}

/// Notifications for the presentation layer, in the order they happened.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    BalanceChanged {
        balance: Amount,
        total_earned: Amount,
    },
    CardStarted {
        index: u32,
    },
    /// The cover is gone and the outcome is known.
    CardRevealed {
        index: u32,
        outcome: Outcome,
    },
    /// Emitted `popup_delay` after the reveal unless the card was collected or the session reset first.
    PrizePopup {
        card_index: u32,
        won: bool,
        value: Amount,
    },
    InsufficientFunds {
        balance: Amount,
        cost: Amount,
    },
    SessionComplete {
        total_earned: Amount,
        final_balance: Amount,
    },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PrizeNotice {
    pub card_index: u32,
    pub outcome: Outcome,
}

/// The card currently in play.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    index: u32,
    grid: Grid,
    winning_value: Amount,
    coverage: CoverageTracker,
    outcome: Option<Outcome>,
}

impl Card {
    fn new(index: u32, generated: GeneratedGrid, surface_size: SurfaceSize) -> Self {
        Self {
            index,
            grid: generated.grid,
            winning_value: generated.winning_value,
            coverage: CoverageTracker::new(surface_size),
            outcome: None,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn winning_value(&self) -> Amount {
        self.winning_value
    }

    pub fn coverage(&self) -> &CoverageTracker {
        &self.coverage
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }
}

/// One play session: bankroll, the card sequence and the current card.
#[derive(Clone, Debug)]
pub struct Session<G = RandomGridGenerator> {
    config: GameConfig,
    catalog: SymbolCatalog,
    generator: G,
    balance: Amount,
    total_earned: Amount,
    cards_remaining: u32,
    current_card_index: u32,
    state: SessionState,
    pending_prize: Option<Amount>,
    card: Option<Card>,
    surface_size: SurfaceSize,
    popup: Option<Deferred<PrizeNotice>>,
    events: VecDeque<SessionEvent>,
}

impl Session<RandomGridGenerator> {
    pub fn with_seed(config: GameConfig, catalog: SymbolCatalog, seed: u64) -> Result<Self> {
        Self::new(config, catalog, RandomGridGenerator::new(seed))
    }
}

impl<G: GridGenerator> Session<G> {
    pub fn new(config: GameConfig, catalog: SymbolCatalog, generator: G) -> Result<Self> {
        config.validate()?;
        catalog.validate_for(config.eligible_range, config.filler_policy)?;

        Ok(Self {
            balance: config.starting_balance,
            total_earned: 0,
            cards_remaining: config.cards_per_session,
            current_card_index: 1,
            state: Default::default(),
            pending_prize: None,
            card: None,
            surface_size: (0, 0),
            popup: None,
            events: VecDeque::new(),
            config,
            catalog,
            generator,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn catalog(&self) -> &SymbolCatalog {
        &self.catalog
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn total_earned(&self) -> Amount {
        self.total_earned
    }

    pub fn cards_remaining(&self) -> u32 {
        self.cards_remaining
    }

    pub fn current_card_index(&self) -> u32 {
        self.current_card_index
    }

    pub fn pending_prize(&self) -> Option<Amount> {
        self.pending_prize
    }

    pub fn card(&self) -> Option<&Card> {
        self.card.as_ref()
    }

    pub fn can_afford_wager(&self) -> bool {
        self.balance >= self.config.wager_cost
    }

    pub fn has_pending_popup(&self) -> bool {
        self.popup.is_some()
    }

    pub fn coverage_percent(&self) -> f64 {
        self.card
            .as_ref()
            .map_or(0.0, |card| card.coverage.coverage_percent())
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = SessionEvent> + '_ {
        self.events.drain(..)
    }

    /// Pay the wager and deal a fresh card.
    pub fn start_card(&mut self) -> Result<()> {
        if !matches!(self.state, SessionState::AwaitingWager) {
            return Err(GameError::InvalidState);
        }
        self.wager_and_deal()
    }

    pub fn erase(&mut self, x: f64, y: f64, radius: f64) -> StrokeOutcome {
        self.erase_stroke(Stroke::new(x, y, radius))
    }

    pub fn erase_stroke(&mut self, stroke: Stroke) -> StrokeOutcome {
        let threshold = self.config.reveal_threshold;
        let every_stroke = matches!(self.config.recompute_policy, RecomputePolicy::EveryStroke);

        let Some(card) = self.scratching_card_mut() else {
            log::trace!("{}, stroke {:?} ignored", GameError::InvalidGestureState, stroke);
            return StrokeOutcome::Ignored;
        };

        if !card.coverage.apply(stroke) {
            return StrokeOutcome::NoChange;
        }
        if !every_stroke {
            return StrokeOutcome::Erased;
        }

        card.coverage.take_recompute_request();
        if card.coverage.is_threshold_crossed(threshold) {
            self.resolve();
            StrokeOutcome::Revealed
        } else {
            StrokeOutcome::Erased
        }
    }

    /// Frame tick: drains pending coverage recomputation and releases due popups. Returns whether anything changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let threshold = self.config.reveal_threshold;
        let mut updated = false;

        let crossed = self.scratching_card_mut().is_some_and(|card| {
            card.coverage.take_recompute_request() && card.coverage.is_threshold_crossed(threshold)
        });
        if crossed {
            updated |= self.resolve();
        }

        if let Some(popup) = self.popup.take_if(|popup| popup.is_due(now)) {
            let PrizeNotice {
                card_index,
                outcome,
            } = popup.into_payload();
            self.emit(SessionEvent::PrizePopup {
                card_index,
                won: outcome.won,
                value: outcome.value,
            });
            updated = true;
        }

        updated
    }

    /// Resolve the current card without scratching the rest of the cover.
    pub fn reveal_all(&mut self) -> bool {
        self.resolve()
    }

    /// Credit the pending prize and move on to the next card, returns the credited amount.
    pub fn collect_prize(&mut self) -> Result<Amount> {
        if !matches!(self.state, SessionState::Resolved) {
            return Err(GameError::InvalidState);
        }

        let prize = self.pending_prize.take().unwrap_or(0);
        self.total_earned = self.total_earned.saturating_add(prize);
        if self.popup.take().is_some() {
            log::debug!("prize collected before its popup, popup cancelled");
        }
        self.card = None;
        self.cards_remaining = self.cards_remaining.saturating_sub(1);
        self.current_card_index += 1;
        self.emit_balance();

        if self.cards_remaining == 0 {
            log::debug!(
                "session complete, earned {} with {} left",
                self.total_earned,
                self.balance
            );
            self.state = SessionState::SessionComplete;
            self.emit(SessionEvent::SessionComplete {
                total_earned: self.total_earned,
                final_balance: self.balance,
            });
            return Ok(prize);
        }

        self.state = SessionState::AwaitingWager;
        let auto_continue = match self.config.continue_policy {
            ContinuePolicy::Manual => false,
            ContinuePolicy::AutoAfterFirst => self.current_card_index > 1,
        };
        if auto_continue {
            match self.wager_and_deal() {
                Ok(()) => {}
                Err(GameError::InsufficientFunds { .. }) => {}
                Err(err) => log::warn!("could not deal card {}: {}", self.current_card_index, err),
            }
        }

        Ok(prize)
    }

    /// Start over with the configured bankroll, dropping the current card and any pending popup.
    pub fn reset(&mut self) {
        log::debug!("session reset");
        self.balance = self.config.starting_balance;
        self.total_earned = 0;
        self.cards_remaining = self.config.cards_per_session;
        self.current_card_index = 1;
        self.state = SessionState::AwaitingWager;
        self.pending_prize = None;
        self.card = None;
        self.popup = None;
        self.events.clear();
        self.emit_balance();
    }

    /// Remember the backing size of the cover surface, the current card is resampled to it.
    pub fn resize_surface(&mut self, size: SurfaceSize) {
        self.surface_size = size;
        if let Some(card) = self.card.as_mut() {
            card.coverage.resize(size);
        }
    }

    fn scratching_card_mut(&mut self) -> Option<&mut Card> {
        if self.state.is_scratching() {
            self.card.as_mut()
        } else {
            None
        }
    }

    fn wager_and_deal(&mut self) -> Result<()> {
        let cost = self.config.wager_cost;
        let Some(balance) = self.balance.checked_sub(cost) else {
            log::debug!(
                "cannot wager {} on card {} with a balance of {}",
                cost,
                self.current_card_index,
                self.balance
            );
            self.emit(SessionEvent::InsufficientFunds {
                balance: self.balance,
                cost,
            });
            return Err(GameError::InsufficientFunds {
                balance: self.balance,
                cost,
            });
        };

        let generated = self.generator.generate(
            &self.catalog,
            self.config.eligible_range,
            self.config.filler_policy,
        )?;

        self.balance = balance;
        self.card = Some(Card::new(
            self.current_card_index,
            generated,
            self.surface_size,
        ));
        self.state = SessionState::Scratching;
        log::debug!("card {} dealt", self.current_card_index);
        self.emit_balance();
        self.emit(SessionEvent::CardStarted {
            index: self.current_card_index,
        });
        Ok(())
    }

    /// Scratching → Resolved, at most once per card.
    fn resolve(&mut self) -> bool {
        let delay = self.config.popup_delay();
        let Some(card) = self.scratching_card_mut() else {
            log::trace!("{}, resolve ignored", GameError::InvalidGestureState);
            return false;
        };

        let outcome = card.grid.evaluate();
        card.outcome = Some(outcome);
        card.coverage.clear_all();
        card.coverage.take_recompute_request();
        let index = card.index;

        self.pending_prize = Some(outcome.value);
        self.state = SessionState::Resolved;
        log::debug!("card {} resolved: {:?}", index, outcome);
        self.emit(SessionEvent::CardRevealed { index, outcome });
        self.popup = Some(Deferred::new(
            PrizeNotice {
                card_index: index,
                outcome,
            },
            delay,
        ));
        true
    }

    fn emit_balance(&mut self) {
        self.emit(SessionEvent::BalanceChanged {
            balance: self.balance,
            total_earned: self.total_earned,
        });
    }

    fn emit(&mut self, event: SessionEvent) {
        self.events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use web_time::Duration;

    fn session() -> Session {
        let mut session =
            Session::with_seed(GameConfig::default(), SymbolCatalog::default(), 5).unwrap();
        session.resize_surface((100, 100));
        session
    }

    #[test]
    fn new_session_waits_for_wager() {
        let session = session();

        assert_eq!(session.state(), SessionState::AwaitingWager);
        assert_eq!(session.balance(), 50);
        assert_eq!(session.cards_remaining(), 5);
        assert_eq!(session.current_card_index(), 1);
        assert!(session.card().is_none());
    }

    #[test]
    fn start_card_deducts_and_deals() {
        let mut session = session();

        session.start_card().unwrap();

        assert_eq!(session.state(), SessionState::Scratching);
        assert_eq!(session.balance(), 40);
        let card = session.card().unwrap();
        assert_eq!(card.index(), 1);
        assert_eq!(card.coverage().size(), (100, 100));
        assert_eq!(card.grid().count_of(card.winning_value()), 3);
        assert_eq!(session.start_card(), Err(GameError::InvalidState));
    }

    #[test]
    fn crossing_the_threshold_resolves_exactly_once() {
        let mut session = session();
        session.start_card().unwrap();

        assert_eq!(session.erase(50.0, 50.0, 200.0), StrokeOutcome::Revealed);
        let pending = session.pending_prize();
        assert_eq!(session.state(), SessionState::Resolved);

        assert_eq!(session.erase(50.0, 50.0, 200.0), StrokeOutcome::Ignored);
        assert!(!session.reveal_all());
        assert_eq!(session.pending_prize(), pending);

        let reveals = session
            .drain_events()
            .filter(|event| matches!(event, SessionEvent::CardRevealed { .. }))
            .count();
        assert_eq!(reveals, 1);
    }

    #[test]
    fn strokes_below_the_threshold_keep_scratching() {
        let mut session = session();
        session.start_card().unwrap();

        assert_eq!(session.erase(10.0, 10.0, 5.0), StrokeOutcome::Erased);
        assert_eq!(session.erase(10.0, 10.0, 5.0), StrokeOutcome::NoChange);
        assert_eq!(session.state(), SessionState::Scratching);
        assert!(session.coverage_percent() > 0.0);
    }

    #[test]
    fn per_frame_recompute_resolves_on_tick() {
        let config = GameConfig {
            recompute_policy: RecomputePolicy::PerFrame,
            ..Default::default()
        };
        let mut session = Session::with_seed(config, SymbolCatalog::default(), 1).unwrap();
        session.resize_surface((20, 20));
        session.start_card().unwrap();

        assert_eq!(session.erase(10.0, 10.0, 50.0), StrokeOutcome::Erased);
        assert_eq!(session.state(), SessionState::Scratching);

        assert!(session.tick(Instant::now()));
        assert_eq!(session.state(), SessionState::Resolved);
    }

    #[test]
    fn popup_fires_once_after_delay() {
        let mut session = session();
        session.start_card().unwrap();
        session.reveal_all();
        session.drain_events().for_each(drop);

        let t0 = Instant::now();
        assert!(!session.tick(t0));
        assert!(!session.tick(t0 + Duration::from_millis(500)));
        assert!(session.tick(t0 + Duration::from_millis(800)));
        assert!(!session.tick(t0 + Duration::from_millis(2_000)));

        let popups: Vec<_> = session.drain_events().collect();
        assert_eq!(popups.len(), 1);
        assert!(matches!(
            popups[0],
            SessionEvent::PrizePopup {
                card_index: 1,
                won: true,
                ..
            }
        ));
    }

    #[test]
    fn collecting_cancels_pending_popup() {
        let mut session = session();
        session.start_card().unwrap();
        session.reveal_all();
        assert!(session.has_pending_popup());

        session.collect_prize().unwrap();
        assert!(!session.has_pending_popup());

        let t0 = Instant::now();
        session.tick(t0);
        session.tick(t0 + Duration::from_secs(5));
        assert!(
            !session
                .drain_events()
                .any(|event| matches!(event, SessionEvent::PrizePopup { card_index: 1, .. }))
        );
    }

    #[test]
    fn reset_cancels_popup_and_restores_bankroll() {
        let mut session = session();
        session.start_card().unwrap();
        session.reveal_all();

        session.reset();

        assert!(!session.has_pending_popup());
        assert_eq!(session.state(), SessionState::AwaitingWager);
        assert_eq!(session.balance(), 50);
        assert_eq!(session.pending_prize(), None);
        assert!(session.card().is_none());
    }

    #[test]
    fn collect_requires_resolved_card() {
        let mut session = session();
        assert_eq!(session.collect_prize(), Err(GameError::InvalidState));

        session.start_card().unwrap();
        assert_eq!(session.collect_prize(), Err(GameError::InvalidState));
    }

    #[test]
    fn auto_continue_after_first_card() {
        let mut session = session();
        session.start_card().unwrap();
        session.reveal_all();
        let prize = session.collect_prize().unwrap();

        assert!(prize >= 50);
        assert_eq!(session.total_earned(), prize);
        assert_eq!(session.state(), SessionState::Scratching);
        assert_eq!(session.current_card_index(), 2);
        assert_eq!(session.cards_remaining(), 4);
        assert_eq!(session.balance(), 30);
    }

    #[test]
    fn manual_policy_waits_for_every_card() {
        let config = GameConfig {
            continue_policy: ContinuePolicy::Manual,
            ..Default::default()
        };
        let mut session = Session::with_seed(config, SymbolCatalog::default(), 2).unwrap();
        session.start_card().unwrap();
        session.reveal_all();
        session.collect_prize().unwrap();

        assert_eq!(session.state(), SessionState::AwaitingWager);
        assert_eq!(session.balance(), 40);
    }

    #[test]
    fn degenerate_catalog_is_fatal_at_startup() {
        let catalog = SymbolCatalog::from_values(&[1, 100]).unwrap();
        assert!(matches!(
            Session::with_seed(GameConfig::default(), catalog, 0),
            Err(GameError::DegenerateCatalog { .. })
        ));
    }

    #[test]
    fn resize_mid_card_keeps_progress() {
        let mut session = session();
        session.start_card().unwrap();
        session.erase(0.0, 0.0, 30.0);
        let before = session.coverage_percent();

        session.resize_surface((200, 200));

        assert_eq!(session.card().unwrap().coverage().size(), (200, 200));
        assert_eq!(session.coverage_percent(), before);
    }

    #[test]
    fn shrinking_mid_card_never_loses_progress() {
        let mut session = session();
        session.start_card().unwrap();
        for x in (1..100).step_by(2) {
            session.erase(x as f64 + 0.5, 50.0, 0.5);
        }
        let before = session.coverage_percent();
        assert!(before > 0.0);

        session.resize_surface((33, 47));

        assert_eq!(session.card().unwrap().coverage().size(), (33, 47));
        assert!(session.coverage_percent() >= before);
    }
}
