//! services/app/src/client/listing.rs
//!
//! The tutor listing controller.
//!
//! Tutors are pulled from the catalog progressively and kept in one
//! deduplicated superset. Filtering is always done locally over that superset;
//! a remote fetch only happens when the current filter cannot fill the visible
//! window and the catalog says more data exists.
//!
//! The controller is cheap to clone and safe to drive from several tasks. The
//! state lock is never held across a remote call, and at most one fetch runs
//! per listing at a time.

use learnlingo_core::catalog::merge_by_id;
use learnlingo_core::domain::{Tutor, TutorId};
use learnlingo_core::filter::FilterCriteria;
use learnlingo_core::ports::{CatalogStore, PortResult};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::FetchPolicy;
use crate::error::AppError;

//=========================================================================================
// Public State
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingPhase {
    Idle,
    LoadingInitial,
    Ready,
    LoadingMore,
    Failed,
}

/// What the listing view renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingView {
    pub phase: ListingPhase,
    /// Filtered tutors inside the visible window.
    pub tutors: Vec<Tutor>,
    /// Filtered tutors among everything fetched so far.
    pub total_matches: usize,
    /// Whether the "load more" button is shown at all.
    pub can_load_more: bool,
    /// Whether the button can be clicked (false while a fetch is in flight).
    pub load_more_enabled: bool,
    pub has_active_filters: bool,
    /// Retryable error to show in a banner.
    pub error: Option<String>,
}

impl ListingView {
    pub fn ids(&self) -> Vec<&str> {
        self.tutors.iter().map(|t| t.id.as_str()).collect()
    }
}

//=========================================================================================
// Internal State
//=========================================================================================

struct ListingState {
    phase: ListingPhase,
    criteria: FilterCriteria,
    /// Every tutor fetched so far, in arrival order, no duplicate ids.
    fetched: Vec<Tutor>,
    cursor: Option<TutorId>,
    /// Whether the catalog may hold entries after `cursor`.
    remote_has_more: bool,
    /// Size of the visible window over the filtered set.
    visible: usize,
    in_flight: bool,
    error: Option<String>,
    /// Bumped whenever a fetch sequence is abandoned; responses tagged with an
    /// older generation are dropped.
    generation: u64,
}

impl ListingState {
    fn matching_count(&self) -> usize {
        self.fetched.iter().filter(|t| self.criteria.matches(t)).count()
    }

    fn wants_remote(&self, policy: FetchPolicy) -> bool {
        policy == FetchPolicy::CursorPaged
            && self.remote_has_more
            && self.matching_count() < self.visible
    }

    fn view(&self, policy: FetchPolicy) -> ListingView {
        let matching: Vec<&Tutor> = self.criteria.apply(&self.fetched);
        let total_matches = matching.len();
        let tutors: Vec<Tutor> = matching.into_iter().take(self.visible).cloned().collect();
        let loaded = matches!(self.phase, ListingPhase::Ready | ListingPhase::LoadingMore);
        let remote_more = policy == FetchPolicy::CursorPaged && self.remote_has_more;
        let can_load_more = loaded && (total_matches > tutors.len() || remote_more);
        ListingView {
            phase: self.phase,
            tutors,
            total_matches,
            can_load_more,
            load_more_enabled: can_load_more && !self.in_flight,
            has_active_filters: self.criteria.has_active_filters(),
            error: self.error.clone(),
        }
    }
}

//=========================================================================================
// The Controller
//=========================================================================================

#[derive(Clone)]
pub struct ListingController {
    catalog: Arc<dyn CatalogStore>,
    policy: FetchPolicy,
    page_size: usize,
    state: Arc<Mutex<ListingState>>,
    cancellation_token: CancellationToken,
}

impl ListingController {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        policy: FetchPolicy,
        page_size: usize,
        criteria: FilterCriteria,
    ) -> Self {
        let page_size = page_size.max(1);
        Self {
            catalog,
            policy,
            page_size,
            state: Arc::new(Mutex::new(ListingState {
                phase: ListingPhase::Idle,
                criteria,
                fetched: Vec::new(),
                cursor: None,
                remote_has_more: false,
                visible: page_size,
                in_flight: false,
                error: None,
                generation: 0,
            })),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub async fn snapshot(&self) -> ListingView {
        self.state.lock().await.view(self.policy)
    }

    pub async fn criteria(&self) -> FilterCriteria {
        self.state.lock().await.criteria.clone()
    }

    /// First load. Does nothing unless the listing is `Idle`.
    pub async fn start(&self) -> ListingView {
        self.load_initial(ListingPhase::Idle).await
    }

    /// Reloads from scratch after a failed first load.
    pub async fn retry(&self) -> ListingView {
        self.load_initial(ListingPhase::Failed).await
    }

    /// Grows the visible window by one page, fetching if the fetched set
    /// cannot fill it. Ignored while another fetch is in flight.
    pub async fn load_more(&self) -> ListingView {
        let generation = {
            let mut state = self.state.lock().await;
            if state.in_flight || state.phase != ListingPhase::Ready {
                debug!("Ignoring load more while the listing is {:?}.", state.phase);
                return state.view(self.policy);
            }
            if !state.view(self.policy).can_load_more {
                return state.view(self.policy);
            }
            state.visible += self.page_size;
            state.error = None;
            if !state.wants_remote(self.policy) {
                return state.view(self.policy);
            }
            state.phase = ListingPhase::LoadingMore;
            state.in_flight = true;
            state.generation
        };

        let result = self.fill_window(generation).await;
        self.finish_more(generation, result).await
    }

    /// Applies new criteria over what is already fetched. Fetches only if the
    /// new filter cannot fill the first page and the catalog has more.
    pub async fn set_criteria(&self, criteria: FilterCriteria) -> ListingView {
        let generation = {
            let mut state = self.state.lock().await;
            state.criteria = criteria;
            state.visible = self.page_size;
            // An in-flight fetch re-checks the criteria before each page.
            if state.in_flight || state.phase != ListingPhase::Ready {
                return state.view(self.policy);
            }
            if !state.wants_remote(self.policy) {
                return state.view(self.policy);
            }
            state.phase = ListingPhase::LoadingMore;
            state.in_flight = true;
            state.generation
        };

        let result = self.fill_window(generation).await;
        self.finish_more(generation, result).await
    }

    /// Stops applying responses. Anything still in flight is discarded when
    /// it arrives.
    pub async fn teardown(&self) {
        self.cancellation_token.cancel();
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.in_flight = false;
        debug!("Listing torn down.");
    }

    //=====================================================================================
    // Fetching
    //=====================================================================================

    async fn load_initial(&self, from: ListingPhase) -> ListingView {
        let generation = {
            let mut state = self.state.lock().await;
            if state.phase != from || self.cancellation_token.is_cancelled() {
                return state.view(self.policy);
            }
            state.generation += 1;
            state.phase = ListingPhase::LoadingInitial;
            state.in_flight = true;
            state.error = None;
            state.fetched.clear();
            state.cursor = None;
            state.remote_has_more = self.policy == FetchPolicy::CursorPaged;
            state.visible = self.page_size;
            state.generation
        };

        let result = match self.policy {
            FetchPolicy::FullFetch => self.fetch_everything(generation).await,
            FetchPolicy::CursorPaged => self.fill_window(generation).await,
        };

        let mut state = self.state.lock().await;
        if self.is_stale(&state, generation) {
            return state.view(self.policy);
        }
        state.in_flight = false;
        match result {
            Ok(()) => {
                state.phase = ListingPhase::Ready;
                info!(
                    fetched = state.fetched.len(),
                    matching = state.matching_count(),
                    "Tutor listing loaded."
                );
            }
            Err(e) => {
                error!("Failed to load tutors: {:?}", e);
                state.phase = ListingPhase::Failed;
                state.error = Some(AppError::from(e).user_message());
            }
        }
        state.view(self.policy)
    }

    async fn fetch_everything(&self, generation: u64) -> PortResult<()> {
        let tutors = self.catalog.fetch_all().await?;
        let mut state = self.state.lock().await;
        if self.is_stale(&state, generation) {
            return Ok(());
        }
        merge_by_id(&mut state.fetched, tutors);
        state.remote_has_more = false;
        Ok(())
    }

    /// Pulls pages until the filtered set fills the window or the catalog is
    /// exhausted. The criteria are re-read before every page.
    async fn fill_window(&self, generation: u64) -> PortResult<()> {
        loop {
            let cursor = {
                let state = self.state.lock().await;
                if self.is_stale(&state, generation) || !state.wants_remote(self.policy) {
                    return Ok(());
                }
                state.cursor.clone()
            };

            let page = self
                .catalog
                .fetch_page(self.page_size, cursor.as_deref())
                .await?;

            let mut state = self.state.lock().await;
            if self.is_stale(&state, generation) {
                debug!("Dropping a catalog page that arrived after the listing moved on.");
                return Ok(());
            }
            let added = merge_by_id(&mut state.fetched, page.entries);
            if page.next_cursor.is_some() {
                state.cursor = page.next_cursor;
            }
            state.remote_has_more = page.has_more;
            debug!(
                added,
                cursor = ?state.cursor,
                has_more = state.remote_has_more,
                "Merged catalog page."
            );
        }
    }

    async fn finish_more(&self, generation: u64, result: PortResult<()>) -> ListingView {
        let mut state = self.state.lock().await;
        if self.is_stale(&state, generation) {
            return state.view(self.policy);
        }
        state.in_flight = false;
        state.phase = ListingPhase::Ready;
        if let Err(e) = result {
            warn!("Failed to load more tutors: {:?}", e);
            state.error = Some(AppError::from(e).user_message());
        }
        state.view(self.policy)
    }

    fn is_stale(&self, state: &ListingState, generation: u64) -> bool {
        self.cancellation_token.is_cancelled() || state.generation != generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCatalog;
    use learnlingo_core::filter::{MultiSelect, PriceBucket};
    use std::time::Duration;

    fn tutor(id: &str, language: &str, price: f64) -> Tutor {
        Tutor {
            id: id.to_string(),
            name: id.to_string(),
            surname: String::new(),
            avatar_url: String::new(),
            languages: vec![language.to_string()],
            levels: vec!["Beginner".to_string()],
            price_per_hour: price,
            lessons_done: 0,
            rating: 5.0,
            lesson_info: String::new(),
            conditions: Vec::new(),
            experience: String::new(),
            reviews: Vec::new(),
        }
    }

    fn english_only() -> FilterCriteria {
        let mut c = MultiSelect::default();
        c.toggle_language("English");
        FilterCriteria::MultiSelect(c)
    }

    #[tokio::test]
    async fn full_fetch_paginates_locally() {
        let catalog = Arc::new(InMemoryCatalog::with_tutors(
            (1..=6).map(|i| tutor(&i.to_string(), "English", 25.0)).collect(),
        ));
        let listing = ListingController::new(
            catalog.clone(),
            FetchPolicy::FullFetch,
            4,
            FilterCriteria::default(),
        );

        let view = listing.start().await;
        assert_eq!(view.phase, ListingPhase::Ready);
        assert_eq!(view.ids(), vec!["1", "2", "3", "4"]);
        assert!(view.can_load_more);

        let view = listing.load_more().await;
        assert_eq!(view.tutors.len(), 6);
        assert!(!view.can_load_more);
        assert_eq!(catalog.fetch_all_calls(), 1);
        assert_eq!(catalog.fetch_page_calls(), 0);
    }

    #[tokio::test]
    async fn paged_fetch_skips_until_filter_fills_page() {
        let mut tutors = Vec::new();
        for i in 1..=10 {
            let language = if i % 3 == 0 { "English" } else { "German" };
            tutors.push(tutor(&i.to_string(), language, 25.0));
        }
        let catalog = Arc::new(InMemoryCatalog::with_tutors(tutors));
        let listing =
            ListingController::new(catalog.clone(), FetchPolicy::CursorPaged, 2, english_only());

        let view = listing.start().await;
        assert_eq!(view.ids(), vec!["3", "6"]);
        assert!(view.can_load_more);

        let view = listing.load_more().await;
        assert_eq!(view.ids(), vec!["3", "6", "9"]);
        assert!(!view.can_load_more);
    }

    #[tokio::test]
    async fn initial_failure_is_retryable() {
        let catalog = Arc::new(InMemoryCatalog::with_tutors(vec![tutor("1", "English", 10.0)]));
        catalog.set_unavailable(true);
        let listing = ListingController::new(
            catalog.clone(),
            FetchPolicy::CursorPaged,
            4,
            FilterCriteria::default(),
        );

        let view = listing.start().await;
        assert_eq!(view.phase, ListingPhase::Failed);
        assert!(view.tutors.is_empty());
        assert!(view.error.is_some());
        assert!(!view.can_load_more);

        catalog.set_unavailable(false);
        let view = listing.retry().await;
        assert_eq!(view.phase, ListingPhase::Ready);
        assert_eq!(view.ids(), vec!["1"]);
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn narrowing_filter_reuses_fetched_tutors() {
        let catalog = Arc::new(InMemoryCatalog::with_tutors(vec![
            tutor("1", "English", 10.0),
            tutor("2", "French", 25.0),
            tutor("3", "English", 35.0),
        ]));
        let listing = ListingController::new(
            catalog.clone(),
            FetchPolicy::FullFetch,
            4,
            FilterCriteria::default(),
        );
        listing.start().await;

        let mut criteria = MultiSelect::default();
        criteria.price = PriceBucket::Over30;
        let view = listing.set_criteria(FilterCriteria::MultiSelect(criteria)).await;
        assert_eq!(view.ids(), vec!["3"]);
        assert!(view.has_active_filters);
        assert_eq!(catalog.fetch_all_calls(), 1);
    }

    #[tokio::test]
    async fn start_after_teardown_does_nothing() {
        let catalog = Arc::new(InMemoryCatalog::with_tutors(vec![tutor("1", "English", 10.0)]));
        let listing = ListingController::new(
            catalog.clone(),
            FetchPolicy::CursorPaged,
            4,
            FilterCriteria::default(),
        );
        listing.teardown().await;
        let view = listing.start().await;
        assert_eq!(view.phase, ListingPhase::Idle);
        assert!(view.tutors.is_empty());
        assert_eq!(catalog.fetch_page_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn page_arriving_after_teardown_is_dropped() {
        let catalog = Arc::new(InMemoryCatalog::with_tutors(
            (1..=4).map(|i| tutor(&i.to_string(), "English", 25.0)).collect(),
        ));
        let listing = ListingController::new(
            catalog.clone(),
            FetchPolicy::CursorPaged,
            2,
            FilterCriteria::default(),
        );
        listing.start().await;
        catalog.set_latency(Duration::from_millis(100));

        let torn_down = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            listing.teardown().await;
        };
        tokio::join!(listing.load_more(), torn_down);

        assert_eq!(catalog.fetch_page_calls(), 2);
        assert_eq!(listing.snapshot().await.ids(), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn narrowing_filter_fetches_when_window_cannot_fill() {
        let catalog = Arc::new(InMemoryCatalog::with_tutors(vec![
            tutor("1", "German", 25.0),
            tutor("2", "German", 25.0),
            tutor("3", "German", 25.0),
            tutor("4", "English", 25.0),
            tutor("5", "German", 25.0),
            tutor("6", "English", 25.0),
            tutor("7", "German", 25.0),
        ]));
        let listing = ListingController::new(
            catalog.clone(),
            FetchPolicy::CursorPaged,
            2,
            FilterCriteria::default(),
        );
        let view = listing.start().await;
        assert_eq!(view.ids(), vec!["1", "2"]);
        assert_eq!(catalog.fetch_page_calls(), 1);

        let view = listing.set_criteria(english_only()).await;
        assert_eq!(view.phase, ListingPhase::Ready);
        assert_eq!(view.ids(), vec!["4", "6"]);
        assert_eq!(catalog.fetch_page_calls(), 3);
        assert!(view.can_load_more);
    }

    #[tokio::test(start_paused = true)]
    async fn filter_change_during_load_more_loses_and_repeats_nothing() {
        let tutors = (1..=12)
            .map(|i| {
                let language = if i % 2 == 0 { "English" } else { "German" };
                tutor(&format!("{i:02}"), language, 25.0)
            })
            .collect();
        let catalog = Arc::new(InMemoryCatalog::with_tutors(tutors));
        let listing = ListingController::new(
            catalog.clone(),
            FetchPolicy::CursorPaged,
            2,
            FilterCriteria::default(),
        );
        listing.start().await;
        catalog.set_latency(Duration::from_millis(100));

        let (_, during) = tokio::join!(listing.load_more(), listing.set_criteria(english_only()));
        assert_eq!(during.phase, ListingPhase::LoadingMore);
        assert_eq!(during.ids(), vec!["02"]);

        let mut view = listing.snapshot().await;
        assert_eq!(view.phase, ListingPhase::Ready);
        while view.can_load_more {
            view = listing.load_more().await;
        }
        assert_eq!(view.ids(), vec!["02", "04", "06", "08", "10", "12"]);
        assert_eq!(view.total_matches, 6);
    }

    #[tokio::test]
    async fn failed_load_more_keeps_the_list() {
        let catalog = Arc::new(InMemoryCatalog::with_tutors(
            (1..=4).map(|i| tutor(&i.to_string(), "English", 25.0)).collect(),
        ));
        let listing = ListingController::new(
            catalog.clone(),
            FetchPolicy::CursorPaged,
            2,
            FilterCriteria::default(),
        );
        listing.start().await;

        catalog.set_unavailable(true);
        let view = listing.load_more().await;
        assert_eq!(view.phase, ListingPhase::Ready);
        assert_eq!(view.ids(), vec!["1", "2"]);
        assert!(view.error.is_some());
        assert!(view.load_more_enabled);

        catalog.set_unavailable(false);
        let view = listing.load_more().await;
        assert_eq!(view.ids(), vec!["1", "2", "3", "4"]);
        assert!(view.error.is_none());
    }
}
