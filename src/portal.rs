//! The calls a front end makes: login, dashboards, event cards, exports.
//!
//! `Portal` owns the catalog, the festival calendar and the store; it holds
//! no state of its own between calls.

use crate::catalog::{Catalog, Event};
use crate::categories::extract_categories;
use crate::config::Config;
use crate::error::{PortalError, Result};
use crate::export;
use crate::keys::name_key;
use crate::messaging::preview;
use crate::registrations::SubcategoryFilter;
use crate::schedule::{EventStatus, FestivalCalendar, Schedule};
use crate::store::{DocumentBackend, JsonFileBackend, Registration, Role, Store};
use chrono::{Duration, NaiveDateTime};
use std::fmt;
use std::io::Write;
use tracing::info;

/// Who is using the portal after a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Admin { name: String },
    Participant { name: String },
}

impl Identity {
    pub fn name(&self) -> &str {
        match self {
            Identity::Admin { name } | Identity::Participant { name } => name,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Identity::Admin { .. })
    }
}

/// Status line for a participant's soonest event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub participant: String,
    pub event: String,
    pub status: EventStatus,
}

impl fmt::Display for Greeting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail = match self.status {
            EventStatus::Completed => "is completed".to_string(),
            EventStatus::Ongoing => "is ongoing".to_string(),
            other => other.to_string(),
        };
        write!(
            f,
            "Hello {}, your event {} {}.",
            self.participant, self.event, tail
        )
    }
}

/// Everything needed to render one event
#[derive(Debug, Clone)]
pub struct EventCard {
    pub event: Event,
    pub schedule: Schedule,
    pub status: EventStatus,
    pub subcategories: Vec<String>,
    pub roster: Vec<RosterLine>,
}

#[derive(Debug, Clone)]
pub struct RosterLine {
    pub registration: Registration,
    /// "sender: text" preview of the latest thread message
    pub last_message: Option<String>,
}

pub struct Portal<B: DocumentBackend> {
    config: Config,
    catalog: Catalog,
    calendar: FestivalCalendar,
    store: Store<B>,
}

impl Portal<JsonFileBackend> {
    /// Load the catalog (fatal on failure) and open the JSON store
    pub fn open(config: Config) -> Result<Self> {
        let catalog = Catalog::load(&config.paths.catalog)?;
        let store = Store::new(JsonFileBackend::new(config.paths.store.clone()));
        Ok(Self::new(config, catalog, store))
    }
}

impl<B: DocumentBackend> Portal<B> {
    pub fn new(config: Config, catalog: Catalog, store: Store<B>) -> Self {
        let calendar = FestivalCalendar::from(&config.festival);
        Self {
            config,
            catalog,
            calendar,
            store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn calendar(&self) -> &FestivalCalendar {
        &self.calendar
    }

    pub fn store(&self) -> &Store<B> {
        &self.store
    }

    pub fn login_participant(&self, name: &str, now: NaiveDateTime) -> Result<Identity> {
        let name = name.trim();
        if !self.store.is_registered(name)? {
            return Err(PortalError::UnknownParticipant {
                name: name.to_string(),
            });
        }
        self.store.touch_session(name, Role::Participant, now)?;
        info!("Participant login: {}", name);
        Ok(Identity::Participant {
            name: name.to_string(),
        })
    }

    pub fn login_admin(&self, password: &str, name: &str, now: NaiveDateTime) -> Result<Identity> {
        let expected = &self.config.auth.admin_password;
        if expected.is_empty() || password != expected {
            return Err(PortalError::InvalidPassword);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(PortalError::InvalidParams {
                message: "admin name cannot be empty".into(),
            });
        }
        self.store.touch_session(name, Role::Admin, now)?;
        info!("Admin login: {}", name);
        Ok(Identity::Admin {
            name: name.to_string(),
        })
    }

    /// Catalog events this person is registered for, in registration order, without repeats
    pub fn my_events(&self, name: &str) -> Result<Vec<&Event>> {
        let mut out: Vec<&Event> = Vec::new();
        for reg in self.store.find_by_name(name)? {
            if let Some(ev) = self.catalog.get(&reg.event_key)
                && !out.iter().any(|e| e.key() == ev.key())
            {
                out.push(ev);
            }
        }
        Ok(out)
    }

    /// Greeting for the registered event with the earliest known start
    pub fn greeting(&self, name: &str, now: NaiveDateTime) -> Result<Option<Greeting>> {
        let soonest = self
            .my_events(name)?
            .into_iter()
            .filter_map(|ev| {
                let sched = self.calendar.resolve_event(ev);
                sched.start.map(|start| (start, sched, ev))
            })
            .min_by_key(|(start, _, _)| *start);

        Ok(soonest.map(|(_, sched, ev)| Greeting {
            participant: name.trim().to_string(),
            event: ev.name.clone(),
            status: sched.status(now),
        }))
    }

    pub fn event_card(
        &self,
        event: &Event,
        filter: &SubcategoryFilter,
        now: NaiveDateTime,
    ) -> Result<EventCard> {
        let schedule = self.calendar.resolve_event(event);
        let subcategories = extract_categories(&event.brochure_block);
        let doc = self.store.read()?;
        let roster = doc
            .roster(&event.name, filter)
            .into_iter()
            .map(|registration| {
                let last_message = doc
                    .thread(&event.name, &registration.name)
                    .last()
                    .map(preview);
                RosterLine {
                    registration,
                    last_message,
                }
            })
            .collect();
        Ok(EventCard {
            event: event.clone(),
            schedule,
            status: schedule.status(now),
            subcategories,
            roster,
        })
    }

    /// Sub-category an admin form should preselect: the filter when it names
    /// a real category, else the first category, else none
    pub fn default_subcategory(&self, event: &Event, filter: &SubcategoryFilter) -> String {
        let cats = extract_categories(&event.brochure_block);
        match filter {
            SubcategoryFilter::Only(sc) if cats.contains(sc) => sc.clone(),
            _ => cats.into_iter().next().unwrap_or_default(),
        }
    }

    pub fn is_registered_for(&self, event: &Event, name: &str) -> Result<bool> {
        let nk = name_key(name);
        Ok(self
            .store
            .list_by_event(&event.name, &SubcategoryFilter::All)?
            .iter()
            .any(|r| r.name_key == nk))
    }

    pub fn online_window(&self) -> Duration {
        Duration::minutes(self.config.presence.window_minutes)
    }

    pub fn calendar_file(&self, event: &Event) -> String {
        let schedule = self.calendar.resolve_event(event);
        export::calendar_file(event, &schedule, &self.config.calendar)
    }

    pub fn export_raw<W: Write>(&self, writer: W) -> Result<()> {
        export::write_raw_csv(&self.store.all_registrations()?, writer)
    }

    pub fn export_report<W: Write>(&self, writer: W) -> Result<()> {
        export::write_report_csv(&self.store.all_registrations()?, &self.catalog, writer)
    }
}
