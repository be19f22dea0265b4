pub mod catalog;
pub mod domain;
pub mod filter;
pub mod ports;

#[cfg(test)]
mod test_support;

pub use domain::{CatalogPage, Review, Tutor, TutorId, UserIdentity};
pub use filter::{FilterCriteria, MultiSelect, PriceBucket, SingleSelect};
pub use ports::{
    CatalogStore, IdentityProvider, LocalStorage, PortError, PortResult, SessionStream,
};
