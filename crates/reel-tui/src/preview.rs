//! Hover previews for catalog cards.
//!
//! Each card moves through `Idle → PendingFetch → Mounted → Idle`.  Entering
//! a card arms a debounce timer; when it fires the card's videos are fetched
//! and a surface is mounted.  Leaving cancels the timer and unmounts.
//!
//! Timers and fetches run as background tasks and report back through
//! `PreviewEvent`s.  Every event carries the hover session it was started
//! for and is only applied while the card is still pending in that session,
//! so a late timer or a slow fetch can never mount onto a card the pointer
//! has already left.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reel_proto::media::{select_preview, PreviewContext};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::query::{preview_media, CatalogQuery};

/// A card on screen.  The same item shown in two rows is two cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardKey {
    pub row: usize,
    pub item_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewSurface {
    Player { url: String, label: &'static str },
    /// Nothing playable, or the fetch failed.
    Unavailable,
}

#[derive(Debug)]
enum CardPreviewState {
    Idle,
    PendingFetch {
        session: u64,
        timer: AbortHandle,
        in_flight: bool,
    },
    Mounted(PreviewSurface),
}

/// Coarse view of a card's state, for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewPhase {
    Idle,
    Waiting,
    Fetching,
    Mounted,
}

#[derive(Debug)]
pub enum PreviewEvent {
    DebounceElapsed {
        card: CardKey,
        session: u64,
    },
    Fetched {
        card: CardKey,
        session: u64,
        surface: PreviewSurface,
    },
}

pub struct PreviewScheduler {
    client: Arc<dyn CatalogQuery>,
    delay: Duration,
    cards: HashMap<CardKey, CardPreviewState>,
    next_session: u64,
    events: mpsc::Sender<PreviewEvent>,
}

impl PreviewScheduler {
    pub fn new(
        client: Arc<dyn CatalogQuery>,
        delay: Duration,
    ) -> (Self, mpsc::Receiver<PreviewEvent>) {
        let (events, rx) = mpsc::channel(64);
        let scheduler = Self {
            client,
            delay,
            cards: HashMap::new(),
            next_session: 0,
            events,
        };
        (scheduler, rx)
    }

    pub fn pointer_enter(&mut self, card: CardKey) {
        if !matches!(self.cards.get(&card), None | Some(CardPreviewState::Idle)) {
            return;
        }
        self.next_session += 1;
        let session = self.next_session;

        let events = self.events.clone();
        let delay = self.delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events
                .send(PreviewEvent::DebounceElapsed { card, session })
                .await;
        });

        debug!("preview: enter {:?} (session {})", card, session);
        self.cards.insert(
            card,
            CardPreviewState::PendingFetch {
                session,
                timer: timer.abort_handle(),
                in_flight: false,
            },
        );
    }

    pub fn pointer_leave(&mut self, card: CardKey) {
        if let Some(state) = self.cards.get_mut(&card) {
            if let CardPreviewState::PendingFetch { timer, .. } = state {
                timer.abort();
            }
            *state = CardPreviewState::Idle;
        }
    }

    /// Apply a background event.  Returns `true` when a card changed.
    pub fn handle(&mut self, event: PreviewEvent) -> bool {
        match event {
            PreviewEvent::DebounceElapsed { card, session } => {
                self.on_debounce_elapsed(card, session)
            }
            PreviewEvent::Fetched {
                card,
                session,
                surface,
            } => self.on_fetched(card, session, surface),
        }
    }

    fn on_debounce_elapsed(&mut self, card: CardKey, session: u64) -> bool {
        let Some(CardPreviewState::PendingFetch {
            session: current,
            in_flight,
            ..
        }) = self.cards.get_mut(&card)
        else {
            debug!("preview: timer for {:?} fired after leave", card);
            return false;
        };
        if *current != session || *in_flight {
            return false;
        }
        *in_flight = true;

        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let surface = match preview_media(client.as_ref(), card.item_id).await {
                Ok(media) => match select_preview(&media, PreviewContext::Card) {
                    Some(m) => PreviewSurface::Player {
                        url: m.watch_url(),
                        label: m.label(),
                    },
                    None => PreviewSurface::Unavailable,
                },
                Err(e) => {
                    warn!("preview: videos for {} failed: {}", card.item_id, e);
                    PreviewSurface::Unavailable
                }
            };
            let _ = events
                .send(PreviewEvent::Fetched {
                    card,
                    session,
                    surface,
                })
                .await;
        });
        true
    }

    fn on_fetched(&mut self, card: CardKey, session: u64, surface: PreviewSurface) -> bool {
        match self.cards.get(&card) {
            Some(CardPreviewState::PendingFetch {
                session: current,
                in_flight: true,
                ..
            }) if *current == session => {
                debug!("preview: mount {:?} {:?}", card, surface);
                self.cards.insert(card, CardPreviewState::Mounted(surface));
                true
            }
            _ => {
                debug!("preview: discarding stale result for {:?} (session {})", card, session);
                false
            }
        }
    }

    /// Drop a card that is no longer displayed.
    pub fn forget(&mut self, card: CardKey) {
        if let Some(CardPreviewState::PendingFetch { timer, .. }) = self.cards.remove(&card) {
            timer.abort();
        }
    }

    pub fn forget_row(&mut self, row: usize) {
        let cards: Vec<CardKey> = self.cards.keys().filter(|c| c.row == row).copied().collect();
        for card in cards {
            self.forget(card);
        }
    }

    pub fn forget_all(&mut self) {
        let cards: Vec<CardKey> = self.cards.keys().copied().collect();
        for card in cards {
            self.forget(card);
        }
    }

    pub fn phase(&self, card: CardKey) -> PreviewPhase {
        match self.cards.get(&card) {
            None | Some(CardPreviewState::Idle) => PreviewPhase::Idle,
            Some(CardPreviewState::PendingFetch { in_flight: false, .. }) => PreviewPhase::Waiting,
            Some(CardPreviewState::PendingFetch { in_flight: true, .. }) => PreviewPhase::Fetching,
            Some(CardPreviewState::Mounted(_)) => PreviewPhase::Mounted,
        }
    }

    pub fn surface(&self, card: CardKey) -> Option<&PreviewSurface> {
        match self.cards.get(&card) {
            Some(CardPreviewState::Mounted(surface)) => Some(surface),
            _ => None,
        }
    }
}
