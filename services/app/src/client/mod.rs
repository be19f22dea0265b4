pub mod auth_gate;
pub mod booking;
pub mod context;
pub mod favorites;
pub mod listing;
pub mod routes;
pub mod state;
pub mod validation;

// Re-export the pieces the binaries and tests wire together.
pub use auth_gate::{AuthGate, Credentials};
pub use booking::{BookingForm, BookingService, LearningReason, PreferredTime};
pub use context::{ClientContext, FavoriteClick, ClientSettings};
pub use favorites::FavoritesStore;
pub use listing::{ListingController, ListingPhase, ListingView};
pub use routes::{Route, RouteDecision};
pub use state::{Action, AppState, AppStore, AuthState, BootPhase};
