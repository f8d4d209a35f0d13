pub mod attendance;
pub mod catalog;
pub mod categories;
pub mod config;
pub mod deserializers;
pub mod error;
pub mod export;
pub mod keys;
pub mod messaging;
pub mod portal;
pub mod presence;
pub mod registrations;
pub mod schedule;
pub mod store;

pub use catalog::{Catalog, Event, EventQuery};
pub use config::Config;
pub use error::{PortalError, Result};
pub use portal::{Identity, Portal};
pub use schedule::{EventStatus, FestivalCalendar, FestivalDay, Schedule};
pub use store::{JsonFileBackend, MemoryBackend, Store, StoreDocument};
