use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tracing::{debug, warn};

use crate::config::now_ms;
use crate::error::WheelResult;
use crate::types::{Participant, RosterFile, RosterMember};

/// Who holds which tags. Reads may be stale; tag updates report plain
/// success or failure and are never retried here.
pub trait MembershipSource {
    fn list_participants_with_tag(&mut self, tag: &str) -> WheelResult<Vec<Participant>>;

    fn set_tags(&mut self, participant: &Participant, add: &[String], remove: &[String]) -> bool;
}

/// Roster kept in a JSON file (`{"members": [{"id", "name", "tags"}]}`).
/// Tag updates are written straight back to disk.
#[derive(Debug, Clone, Default)]
pub struct JsonRoster {
    path: Option<PathBuf>,
    members: Vec<RosterMember>,
}

impl JsonRoster {
    pub fn load(path: &Path) -> WheelResult<Self> {
        let members = if path.is_file() {
            let data = fs::read_to_string(path)?;
            serde_json::from_str::<RosterFile>(&data)?.members
        } else {
            warn!("roster {} not found, starting empty", path.display());
            Vec::new()
        };
        Ok(JsonRoster {
            path: Some(path.to_path_buf()),
            members,
        })
    }

    pub fn in_memory(members: Vec<RosterMember>) -> Self {
        JsonRoster { path: None, members }
    }

    pub fn members(&self) -> &[RosterMember] {
        &self.members
    }

    fn persist(&self) -> WheelResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let payload = serde_json::to_string_pretty(&RosterFile {
            members: self.members.clone(),
        })?;
        fs::write(path, payload)?;
        Ok(())
    }
}

impl MembershipSource for JsonRoster {
    fn list_participants_with_tag(&mut self, tag: &str) -> WheelResult<Vec<Participant>> {
        Ok(self
            .members
            .iter()
            .filter(|m| m.has_tag(tag))
            .map(RosterMember::participant)
            .collect())
    }

    fn set_tags(&mut self, participant: &Participant, add: &[String], remove: &[String]) -> bool {
        let Some(member) = self.members.iter_mut().find(|m| m.id == participant.id) else {
            warn!("set_tags: member {} not in roster", participant.id);
            return false;
        };
        member.tags.retain(|t| !remove.iter().any(|r| r.eq_ignore_ascii_case(t)));
        for tag in add {
            if !member.has_tag(tag) {
                member.tags.push(tag.clone());
            }
        }
        match self.persist() {
            Ok(()) => true,
            Err(e) => {
                warn!("set_tags: persisting roster failed: {e}");
                false
            }
        }
    }
}

pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        now_ms()
    }
}

/// Hand-driven clock for tests and replays.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        ManualClock {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Short-lived cache in front of a membership source. Listings are reused
/// for `ttl_ms`; any tag update drops every cached listing.
pub struct RoleCache<M, C> {
    source: M,
    clock: C,
    ttl_ms: u64,
    entries: HashMap<String, (u64, Vec<Participant>)>,
}

impl<M: MembershipSource, C: Clock> RoleCache<M, C> {
    pub fn new(source: M, clock: C, ttl_ms: u64) -> Self {
        RoleCache {
            source,
            clock,
            ttl_ms,
            entries: HashMap::new(),
        }
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn source(&self) -> &M {
        &self.source
    }

    fn cache_key(tag: &str) -> String {
        tag.trim().to_ascii_lowercase()
    }
}

impl<M: MembershipSource, C: Clock> MembershipSource for RoleCache<M, C> {
    fn list_participants_with_tag(&mut self, tag: &str) -> WheelResult<Vec<Participant>> {
        let key = Self::cache_key(tag);
        let now = self.clock.now_ms();
        if let Some((fetched_at, participants)) = self.entries.get(&key) {
            if now.saturating_sub(*fetched_at) < self.ttl_ms {
                debug!(tag = %key, "role cache hit");
                return Ok(participants.clone());
            }
        }
        let participants = self.source.list_participants_with_tag(tag)?;
        self.entries.insert(key, (now, participants.clone()));
        Ok(participants)
    }

    fn set_tags(&mut self, participant: &Participant, add: &[String], remove: &[String]) -> bool {
        let ok = self.source.set_tags(participant, add, remove);
        self.invalidate();
        ok
    }
}
