//! Who has been seen recently. A polling snapshot, not a live connection.

use crate::error::Result;
use crate::keys::name_key;
use crate::store::{Change, DocumentBackend, Role, Session, Store};
use chrono::{Duration, NaiveDateTime};
use tracing::debug;

impl<B: DocumentBackend> Store<B> {
    /// Record a login (or any activity) for `name`
    pub fn touch_session(&self, name: &str, role: Role, now: NaiveDateTime) -> Result<Session> {
        let nk = name_key(name);
        let display = name.trim().to_string();
        let session = self.mutate(|doc| {
            if let Some(row) = doc.sessions.iter_mut().find(|s| s.name_key == nk) {
                row.name = display.clone();
                row.role = role;
                row.last_seen = Some(now);
                return Ok(Change::Save(row.clone()));
            }
            let row = Session {
                name: display.clone(),
                name_key: nk.clone(),
                role,
                last_seen: Some(now),
            };
            doc.sessions.push(row.clone());
            Ok(Change::Save(row))
        })?;
        debug!("Session touched: {} ({})", session.name, session.role);
        Ok(session)
    }

    /// Sessions seen within `window` of `now`
    pub fn online(&self, now: NaiveDateTime, window: Duration) -> Result<Vec<Session>> {
        Ok(self
            .read()?
            .sessions
            .into_iter()
            .filter(|s| s.last_seen.is_some_and(|seen| now - seen <= window))
            .collect())
    }
}
