//! The large pane at the top: the selected item with its trailer, or a
//! still when there is none.
use std::sync::Arc;

use reel_proto::catalog::Item;
use reel_proto::media::{select_preview, PreviewContext};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::query::{preview_media, CatalogQuery};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeroMedia {
    Loading,
    Player { url: String, label: &'static str },
    Still(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeroView {
    pub item: Item,
    pub media: HeroMedia,
}

#[derive(Debug)]
pub struct HeroResolved {
    seq: u64,
    media: HeroMedia,
}

/// Every `show` gets a sequence number; only the latest one may resolve,
/// so rapid selections always settle on the last item picked.
pub struct HeroController {
    client: Arc<dyn CatalogQuery>,
    seq: u64,
    view: Option<HeroView>,
    tx: mpsc::Sender<HeroResolved>,
}

impl HeroController {
    pub fn new(client: Arc<dyn CatalogQuery>) -> (Self, mpsc::Receiver<HeroResolved>) {
        let (tx, rx) = mpsc::channel(16);
        let controller = Self {
            client,
            seq: 0,
            view: None,
            tx,
        };
        (controller, rx)
    }

    pub fn show(&mut self, item: Item) {
        self.seq += 1;
        let seq = self.seq;
        debug!("hero: show {} ({}) seq={}", item.display_title(), item.id, seq);
        self.view = Some(HeroView {
            item: item.clone(),
            media: HeroMedia::Loading,
        });

        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let media = resolve(client.as_ref(), &item).await;
            let _ = tx.send(HeroResolved { seq, media }).await;
        });
    }

    /// Returns `false` when a newer `show` has superseded this result.
    pub fn on_resolved(&mut self, resolved: HeroResolved) -> bool {
        if resolved.seq != self.seq {
            debug!("hero: discarding seq {} (current {})", resolved.seq, self.seq);
            return false;
        }
        match self.view.as_mut() {
            Some(view) => {
                view.media = resolved.media;
                true
            }
            None => false,
        }
    }

    pub fn view(&self) -> Option<&HeroView> {
        self.view.as_ref()
    }

    /// Link for the trailer currently on screen, if any.
    pub fn watch_url(&self) -> Option<&str> {
        match self.view.as_ref().map(|v| &v.media) {
            Some(HeroMedia::Player { url, .. }) => Some(url),
            _ => None,
        }
    }
}

async fn resolve(client: &dyn CatalogQuery, item: &Item) -> HeroMedia {
    match preview_media(client, item.id).await {
        Ok(media) => {
            if let Some(m) = select_preview(&media, PreviewContext::Hero) {
                return HeroMedia::Player {
                    url: m.watch_url(),
                    label: m.label(),
                };
            }
        }
        Err(e) => warn!("hero: videos for {} failed: {}", item.id, e),
    }
    item.still_url().map(HeroMedia::Still).unwrap_or(HeroMedia::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::tests::{videos, FakeCatalog};
    use crate::query::QueryError;
    use std::time::Duration;

    fn item(id: u64, backdrop: Option<&str>, poster: Option<&str>) -> Item {
        Item {
            id,
            title: Some(format!("item {}", id)),
            backdrop_path: backdrop.map(str::to_string),
            poster_path: poster.map(str::to_string),
            overview: Some("overview".into()),
        }
    }

    fn by_id() -> FakeCatalog {
        FakeCatalog::new(|q| match q.item_id.as_deref() {
            Some("1") => Ok(videos(&[
                ("Vimeo", "Trailer", "vim"),
                ("YouTube", "Teaser", "tease"),
                ("YouTube", "Trailer", "trail"),
            ])),
            Some("2") => Ok(videos(&[("YouTube", "Clip", "clip")])),
            _ => Err(QueryError::Transport("timed out".into())),
        })
    }

    async fn show_and_resolve(item: Item) -> HeroView {
        let (mut hero, mut rx) = HeroController::new(Arc::new(by_id()));
        hero.show(item);
        assert_eq!(hero.view().unwrap().media, HeroMedia::Loading);
        let resolved = rx.recv().await.unwrap();
        assert!(hero.on_resolved(resolved));
        hero.view().unwrap().clone()
    }

    #[tokio::test]
    async fn test_first_youtube_trailer_or_teaser_plays() {
        let view = show_and_resolve(item(1, None, None)).await;
        assert_eq!(
            view.media,
            HeroMedia::Player {
                url: "https://www.youtube.com/watch?v=tease".into(),
                label: "Teaser"
            }
        );
        assert_eq!(view.item.overview(), "overview");
    }

    #[tokio::test]
    async fn test_clip_only_falls_back_to_backdrop_then_poster() {
        let view = show_and_resolve(item(2, Some("/b.jpg"), Some("/p.jpg"))).await;
        assert_eq!(
            view.media,
            HeroMedia::Still("https://image.tmdb.org/t/p/original/b.jpg".into())
        );

        let view = show_and_resolve(item(2, None, Some("/p.jpg"))).await;
        assert_eq!(
            view.media,
            HeroMedia::Still("https://image.tmdb.org/t/p/original/p.jpg".into())
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_without_images_is_empty() {
        let view = show_and_resolve(item(3, None, None)).await;
        assert_eq!(view.media, HeroMedia::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_selection_wins() {
        let fake = by_id().with_delay(|q| match q.item_id.as_deref() {
            Some("1") => Duration::from_millis(500),
            _ => Duration::from_millis(10),
        });
        let (mut hero, mut rx) = HeroController::new(Arc::new(fake));
        hero.show(item(1, None, None));
        hero.show(item(3, None, Some("/p.jpg")));

        let fast = rx.recv().await.unwrap();
        assert!(hero.on_resolved(fast));
        let slow = rx.recv().await.unwrap();
        assert!(!hero.on_resolved(slow));

        let view = hero.view().unwrap();
        assert_eq!(view.item.id, 3);
        assert_eq!(
            view.media,
            HeroMedia::Still("https://image.tmdb.org/t/p/original/p.jpg".into())
        );
        assert_eq!(hero.watch_url(), None);
    }
}
