use std::cell::Cell;
use std::rc::Rc;

use crate::canvas::CanvasCover;
use crate::utils::*;
use bitflags::bitflags;
use clap::Args;
use gloo::events::{EventListener, EventListenerOptions};
use gloo::timers::callback::Interval;
use scratchy_core as game;
use game::{CoverSurface, SessionEvent, SessionState};
use wasm_bindgen::JsCast;
use yew::prelude::*;

/// Frame cadence for coverage recompute and popup timers.
const FRAME_MS: u32 = 16;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq)]
    struct MouseButtons: u16 {
        const LEFT    = 1;
        const RIGHT   = 1 << 1;
        const MIDDLE  = 1 << 2;
        const BACK    = 1 << 3;
        const FORWARD = 1 << 4;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Msg {
    Frame,
    Buy,
    Collect,
    RevealAll,
    NewSession,
    Resize,
    Input(game::InputEvent),
}

#[derive(Args, Properties, Debug, Clone, PartialEq)]
pub(crate) struct GameProps {
    /// Force a seed instead of random
    #[arg(short, long)]
    pub seed: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Popup {
    won: bool,
    value: game::Amount,
}

#[derive(Debug)]
pub(crate) struct GameView {
    session: game::Session,
    router: game::GestureRouter,
    canvas_ref: NodeRef,
    cover: Option<CanvasCover>,
    scratching: Rc<Cell<bool>>,
    popup: Option<Popup>,
    notice: Option<String>,
    resize_requested: bool,
    _frame: Interval,
    _listeners: Vec<EventListener>,
}

impl GameView {
    fn new_session(seed: u64) -> game::Session {
        let config = game::GameConfig::default();
        game::Session::with_seed(config, game::SymbolCatalog::default(), seed)
            .expect("default configuration must be valid")
    }

    fn create_frame(ctx: &Context<Self>) -> Interval {
        let link = ctx.link().clone();
        Interval::new(FRAME_MS, move || link.send_message(Msg::Frame))
    }

    fn pointer_event(phase: game::GesturePhase, event: &MouseEvent) -> game::InputEvent {
        game::InputEvent::Pointer {
            phase,
            point: game::ClientPoint::new(event.client_x() as f64, event.client_y() as f64),
        }
    }

    fn touch_event(phase: game::GesturePhase, event: &TouchEvent) -> game::InputEvent {
        let list = event.touches();
        game::InputEvent::Touch {
            phase,
            touches: (0..list.length())
                .filter_map(|i| list.get(i))
                .map(|touch| game::ClientPoint::new(touch.client_x() as f64, touch.client_y() as f64))
                .collect(),
        }
    }

    /// Attach input listeners. They are non-passive so scrolling can be suppressed while scratching.
    ///
    /// `preventDefault` has to be called during DOM dispatch, before the message reaches the router, so listeners
    /// read the router's latest `prevent_default` decision from the shared `scratching` cell.
    fn attach_listeners(&mut self, ctx: &Context<Self>) {
        use game::GesturePhase::*;

        let Some(cover) = &self.cover else {
            return;
        };
        let canvas = &cover.canvas().clone();
        let window = gloo::utils::window();
        let link = ctx.link();

        let on_mouse = |phase: game::GesturePhase| {
            let link = link.clone();
            let scratching = self.scratching.clone();
            move |event: &Event| {
                let Some(event) = event.dyn_ref::<MouseEvent>() else {
                    return;
                };
                if scratching.get() {
                    event.prevent_default();
                }
                let buttons = MouseButtons::from_bits_truncate(event.buttons());
                let phase = match phase {
                    Move if !buttons.contains(MouseButtons::LEFT) => End,
                    phase => phase,
                };
                link.send_message(Msg::Input(Self::pointer_event(phase, event)));
            }
        };

        let on_touch = |phase: game::GesturePhase| {
            let link = link.clone();
            let scratching = self.scratching.clone();
            move |event: &Event| {
                let Some(event) = event.dyn_ref::<TouchEvent>() else {
                    return;
                };
                if scratching.get() {
                    event.prevent_default();
                }
                link.send_message(Msg::Input(Self::touch_event(phase, event)));
            }
        };

        let on_context_menu = {
            let link = link.clone();
            let scratching = self.scratching.clone();
            move |event: &Event| {
                if scratching.get() {
                    event.prevent_default();
                }
                link.send_message(Msg::Input(game::InputEvent::ContextMenu));
            }
        };

        let on_resize = {
            let link = link.clone();
            move |_: &Event| link.send_message(Msg::Resize)
        };

        let non_passive = EventListenerOptions::enable_prevent_default;
        self._listeners = vec![
            EventListener::new_with_options(canvas, "mousedown", non_passive(), on_mouse(Start)),
            EventListener::new_with_options(canvas, "mousemove", non_passive(), on_mouse(Move)),
            EventListener::new_with_options(&window, "mouseup", non_passive(), on_mouse(End)),
            EventListener::new_with_options(canvas, "touchstart", non_passive(), on_touch(Start)),
            EventListener::new_with_options(canvas, "touchmove", non_passive(), on_touch(Move)),
            EventListener::new_with_options(&window, "touchend", non_passive(), on_touch(End)),
            EventListener::new_with_options(&window, "touchcancel", non_passive(), on_touch(Cancel)),
            EventListener::new_with_options(canvas, "contextmenu", non_passive(), on_context_menu),
            EventListener::new(&window, "resize", on_resize),
        ];
    }

    /// Apply a pending resize, at most once per frame.
    fn apply_resize(&mut self) {
        if !std::mem::take(&mut self.resize_requested) {
            return;
        }
        let Some(cover) = self.cover.as_mut() else {
            return;
        };

        let size = cover.fit_to_container();
        self.session.resize_surface(size);
        self.router.set_geometry(cover.geometry());
        match self.session.card() {
            Some(card) => cover.paint_from(card.coverage()),
            None => cover.restore(),
        }
        log::debug!("cover resized to {:?}", size);
    }

    /// Forward queued session events to the view, returns whether anything needs a redraw.
    fn handle_events(&mut self) -> bool {
        let events: Vec<_> = self.session.drain_events().collect();
        let updated = !events.is_empty();

        for event in events {
            log::trace!("session event: {:?}", event);
            match event {
                SessionEvent::BalanceChanged { .. } => {}
                SessionEvent::CardStarted { .. } => {
                    self.popup = None;
                    self.notice = None;
                    if let Some(cover) = self.cover.as_mut() {
                        cover.restore();
                    }
                }
                SessionEvent::CardRevealed { .. } => {
                    if let Some(cover) = self.cover.as_mut() {
                        cover.clear_all();
                    }
                }
                SessionEvent::PrizePopup { won, value, .. } => {
                    self.popup = Some(Popup { won, value });
                }
                SessionEvent::InsufficientFunds { .. } => {
                    self.notice = Some("Saldo insuficiente para jogar!".to_string());
                }
                SessionEvent::SessionComplete { total_earned, .. } => {
                    self.notice = Some(format!(
                        "Todas as raspadinhas foram completadas! Total: {}",
                        format_amount(total_earned)
                    ));
                }
            }
        }

        self.scratching.set(self.session.state().is_scratching());
        updated
    }

    fn card_info(&self) -> String {
        let config = self.session.config();
        if self.session.state().is_complete() {
            return "Todas as raspadinhas foram completadas!".to_string();
        }
        let top_prize = self
            .session
            .catalog()
            .symbols()
            .iter()
            .map(|symbol| symbol.value)
            .max()
            .unwrap_or(0);
        format!(
            "Raspadinha {} de {} - Prêmios de até {}",
            self.session.current_card_index(),
            config.cards_per_session,
            format_amount(top_prize)
        )
    }

    fn view_grid(&self) -> Html {
        let card = self.session.card();
        let outcome = card.and_then(|card| card.outcome());

        html! {
            <table class="prizes">
                {
                    for (0..game::GRID_SIDE).map(|row| html! {
                        <tr>
                            {
                                for (0..game::GRID_SIDE).map(|col| {
                                    let index = row * game::GRID_SIDE + col;
                                    let winning = outcome.is_some_and(|o| o.is_winning_cell(index));
                                    let label = card
                                        .map(|card| format_amount(card.grid()[index].value))
                                        .unwrap_or_else(|| "?".to_string());
                                    html! {
                                        <td class={classes!("prize-cell", winning.then_some("winning"))}>{label}</td>
                                    }
                                })
                            }
                        </tr>
                    })
                }
            </table>
        }
    }

    fn view_actions(&self, ctx: &Context<Self>) -> Html {
        let state = self.session.state();
        let cost = format_amount(self.session.config().wager_cost);

        match state {
            SessionState::AwaitingWager => {
                let affordable = self.session.can_afford_wager();
                let label = if affordable {
                    format!("Raspar ({})", cost)
                } else {
                    "Saldo Insuficiente".to_string()
                };
                html! {
                    <button onclick={ctx.link().callback(|_| Msg::Buy)} disabled={!affordable}>{label}</button>
                }
            }
            SessionState::Scratching => html! {
                <button onclick={ctx.link().callback(|_| Msg::RevealAll)}>{"Revelar tudo"}</button>
            },
            SessionState::Resolved => html! {
                <button onclick={ctx.link().callback(|_| Msg::Collect)}>{"Coletar"}</button>
            },
            SessionState::SessionComplete => html! {
                <button onclick={ctx.link().callback(|_| Msg::NewSession)}>{"Jogar de novo"}</button>
            },
        }
    }

    fn view_popup(&self, ctx: &Context<Self>) -> Html {
        let Some(Popup { won, value }) = self.popup else {
            return html! {};
        };
        let headline = if won {
            format!("Você ganhou {}!", format_amount(value))
        } else {
            "Não foi dessa vez".to_string()
        };

        html! {
            <dialog class="popup" open={true}>
                <article>
                    <h2>{headline}</h2>
                    <footer>
                        <button onclick={ctx.link().callback(|_| Msg::Collect)}>{"Coletar"}</button>
                    </footer>
                </article>
            </dialog>
        }
    }
}

impl Component for GameView {
    type Message = Msg;
    type Properties = GameProps;

    fn create(ctx: &Context<Self>) -> Self {
        let seed = ctx
            .props()
            .seed
            .as_deref()
            .map_or_else(js_random_seed, seed_from_str);
        let session = Self::new_session(seed);
        let router = game::GestureRouter::new(session.config().brush_radius);

        Self {
            session,
            router,
            canvas_ref: NodeRef::default(),
            cover: None,
            scratching: Rc::new(Cell::new(false)),
            popup: None,
            notice: None,
            resize_requested: true,
            _frame: Self::create_frame(ctx),
            _listeners: Vec::new(),
        }
    }

    fn rendered(&mut self, ctx: &Context<Self>, first_render: bool) {
        if !first_render {
            return;
        }

        self.cover = self
            .canvas_ref
            .cast::<web_sys::HtmlCanvasElement>()
            .and_then(CanvasCover::new);
        if self.cover.is_none() {
            log::error!("canvas 2d context unavailable");
            return;
        }
        self.attach_listeners(ctx);
        self.apply_resize();
    }

    fn update(&mut self, _ctx: &Context<Self>, msg: Self::Message) -> bool {
        use Msg::*;

        let updated = match msg {
            Frame => {
                self.apply_resize();
                self.session.tick(web_time::Instant::now())
            }
            Buy => {
                if let Err(err) = self.session.start_card() {
                    log::debug!("start card failed: {}", err);
                }
                true
            }
            Collect => match self.session.collect_prize() {
                Ok(prize) => {
                    log::debug!("collected {}", prize);
                    self.popup = None;
                    true
                }
                Err(err) => {
                    log::debug!("collect failed: {}", err);
                    false
                }
            },
            RevealAll => self.session.reveal_all(),
            NewSession => {
                self.session.reset();
                self.popup = None;
                self.notice = None;
                if let Some(cover) = self.cover.as_mut() {
                    cover.restore();
                }
                true
            }
            Resize => {
                self.resize_requested = true;
                false
            }
            Input(event) => {
                let Some(cover) = self.cover.as_mut() else {
                    return false;
                };
                if event.samples_position() {
                    self.router.set_geometry(cover.geometry());
                }
                let response = self.router.route(&event, &mut self.session, cover);
                self.scratching.set(response.prevent_default);
                response.outcome.has_update()
            }
        };

        self.handle_events() || updated
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let balance = format_amount(self.session.balance());
        let total_earned = format_amount(self.session.total_earned());
        let active = self.session.state().is_scratching();

        html! {
            <div class={classes!("scratchy", active.then_some("game-active"))}>
                <nav>
                    <aside>{"Saldo: "}{balance}</aside>
                    <aside>{"Ganhos: "}{total_earned}</aside>
                </nav>
                <p class="game-description">{self.card_info()}</p>
                <div class="card">
                    {self.view_grid()}
                    <canvas ref={self.canvas_ref.clone()}/>
                </div>
                <footer>{self.view_actions(ctx)}</footer>
                if let Some(notice) = &self.notice {
                    <small class="notice">{notice.clone()}</small>
                }
                {self.view_popup(ctx)}
            </div>
        }
    }
}
