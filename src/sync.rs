//! Sync client and the two-tier state facade.
//!
//! [`SyncClient`] speaks the shared-store API: fetch the server snapshot,
//! push a local one under optimistic concurrency. Every failure mode short of
//! a real conflict collapses into "shared tier unavailable" — the local cache
//! keeps working and the next push carries the full state anyway.
//!
//! [`StateStore`] is what the rest of the app talks to. Writes land in the
//! local cache first and are pushed in the background; pushes superseded by a
//! newer local write are discarded when their outcome arrives. Conflicts are
//! never auto-resolved: both copies go out on a channel and the caller
//! decides (merge-and-retry, adopt the server copy, or force).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};

use crate::error::StoreError;
use crate::sanitize::{is_plausible_state, sanitize_state};
use crate::store::LocalStore;
use crate::types::AppState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Sync client
// ============================================================================

/// What the writer claims to have seen when pushing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushBase {
    Version(i64),
    /// Skip the server's version check. Only sent on explicit user request.
    Force,
}

#[derive(Debug)]
pub enum PushOutcome {
    Accepted { version: i64 },
    /// Someone else wrote first; `server_data` is their copy.
    Conflict { server_data: Box<AppState> },
    /// Network failure or an unexpected server response. Local-only until
    /// the next push.
    Unavailable,
}

#[derive(Clone)]
pub struct SyncClient {
    http: reqwest::Client,
    base_url: String,
}

impl SyncClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        SyncClient {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn data_url(&self) -> String {
        format!("{}/api/data", self.base_url)
    }

    /// Fetch the server snapshot. `None` covers everything from "offline" to
    /// "server returned something that is not a state".
    pub async fn fetch(&self) -> Option<AppState> {
        let response = match self
            .http
            .get(self.data_url())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::info!("Shared store unreachable: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            log::warn!("Shared store fetch returned {}", response.status());
            return None;
        }
        let value: Value = match response.json().await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Shared store returned invalid JSON: {}", e);
                return None;
            }
        };
        if !is_plausible_state(&value) {
            log::warn!("Shared store payload does not look like app state, ignoring");
            return None;
        }
        sanitize_state(value)
    }

    /// Push `state` (session-local fields stripped) on top of `base`.
    pub async fn push(&self, state: &AppState, base: PushBase) -> PushOutcome {
        let header = match base {
            PushBase::Version(v) => v.to_string(),
            PushBase::Force => "force".to_string(),
        };
        let response = match self
            .http
            .post(self.data_url())
            .timeout(REQUEST_TIMEOUT)
            .header("X-Base-Version", header)
            .json(&state.shared_value())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::info!("Push failed, staying local-only: {}", e);
                return PushOutcome::Unavailable;
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::CONFLICT {
            #[derive(serde::Deserialize)]
            struct ConflictBody {
                #[serde(rename = "serverData")]
                server_data: Value,
            }
            return match response.json::<ConflictBody>().await {
                Ok(body) => match sanitize_state(body.server_data) {
                    Some(server) => PushOutcome::Conflict {
                        server_data: Box::new(server),
                    },
                    // A conflict whose server copy cannot be parsed gives
                    // the resolver nothing real to merge against. Better to
                    // stay local-only than to hand it a fabricated state.
                    None => {
                        log::warn!("Conflict carried an unusable server copy");
                        PushOutcome::Unavailable
                    }
                },
                Err(e) => {
                    log::warn!("Conflict response without server data: {}", e);
                    PushOutcome::Unavailable
                }
            };
        }
        if !status.is_success() {
            log::warn!("Push rejected with {}", status);
            return PushOutcome::Unavailable;
        }

        #[derive(serde::Deserialize)]
        struct AcceptBody {
            timestamp: i64,
        }
        match response.json::<AcceptBody>().await {
            Ok(body) => PushOutcome::Accepted {
                version: body.timestamp,
            },
            Err(e) => {
                log::warn!("Accepted push without a timestamp: {}", e);
                PushOutcome::Unavailable
            }
        }
    }
}

// ============================================================================
// Two-tier facade
// ============================================================================

/// A push bounced off a newer server version. The caller picks a resolution.
#[derive(Debug)]
pub struct ConflictEvent {
    pub local: AppState,
    pub server: AppState,
}

/// Local-first store with background sync. Cloning shares the cache, the
/// client, and the conflict channel.
#[derive(Clone)]
pub struct StateStore {
    local: LocalStore,
    sync: Option<SyncClient>,
    conflicts: mpsc::Sender<ConflictEvent>,
    // Bumped under the write gate by every local write and every adopted
    // snapshot; a push outcome holding an older token is stale and dropped.
    generation: Arc<AtomicU64>,
    // Orders push-outcome commits against local writes. Without it a late
    // outcome could pass the generation check and then commit over a write
    // that landed in between.
    write_gate: Arc<Mutex<()>>,
}

impl StateStore {
    pub fn new(
        local: LocalStore,
        sync: Option<SyncClient>,
    ) -> (Self, mpsc::Receiver<ConflictEvent>) {
        let (conflicts, rx) = mpsc::channel(8);
        (
            StateStore {
                local,
                sync,
                conflicts,
                generation: Arc::new(AtomicU64::new(0)),
                write_gate: Arc::new(Mutex::new(())),
            },
            rx,
        )
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn load(&self) -> AppState {
        self.local.load()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppState> {
        self.local.subscribe()
    }

    /// Apply `f` to the cached state, persist, and push in the background.
    /// Returns as soon as the local write lands.
    pub fn update<F>(&self, f: F) -> Result<AppState, StoreError>
    where
        F: FnOnce(&mut AppState),
    {
        let (saved, base, token) = {
            let _gate = self.lock_writes();
            let base = self.local.load().last_updated;
            let saved = self.local.update(f)?;
            let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            (saved, base, token)
        };
        self.spawn_push(saved.clone(), PushBase::Version(base), token);
        Ok(saved)
    }

    fn spawn_push(&self, state: AppState, base: PushBase, token: u64) {
        let Some(client) = self.sync.clone() else {
            return;
        };
        let this = self.clone();
        tokio::spawn(async move {
            let outcome = client.push(&state, base).await;
            // Validity check and commit happen under the same gate the
            // writers hold, so a write that landed while this push was in
            // flight has already bumped the generation by the time we look.
            let _gate = this.lock_writes();
            if this.generation.load(Ordering::SeqCst) != token {
                log::debug!("Discarding outcome of superseded push");
                return;
            }
            match outcome {
                PushOutcome::Accepted { version } => {
                    // Keep the local stamp aligned with the server so the
                    // next push bases on the accepted version.
                    let mut aligned = state;
                    aligned.last_updated = version;
                    if let Err(e) = this.local.commit(aligned) {
                        log::warn!("Failed to record accepted push: {}", e);
                    }
                }
                PushOutcome::Conflict { server_data } => {
                    let event = ConflictEvent {
                        local: state,
                        server: *server_data,
                    };
                    if this.conflicts.try_send(event).is_err() {
                        log::warn!("Conflict channel full, dropping conflict notification");
                    }
                }
                PushOutcome::Unavailable => {}
            }
        });
    }

    /// Push the current cached state and wait for the outcome. Used for
    /// explicit retry and for the user's "overwrite server" choice.
    pub async fn push_now(&self, force: bool) -> PushOutcome {
        let Some(client) = &self.sync else {
            return PushOutcome::Unavailable;
        };
        let (state, base) = {
            let _gate = self.lock_writes();
            let state = self.local.load();
            let base = if force {
                PushBase::Force
            } else {
                PushBase::Version(state.last_updated)
            };
            self.generation.fetch_add(1, Ordering::SeqCst);
            (state, base)
        };
        client.push(&state, base).await
    }

    /// Pull the server snapshot and adopt it if it is newer than the cache.
    /// Returns the state now in effect, or `None` when offline.
    pub async fn refresh(&self) -> Option<AppState> {
        let client = self.sync.as_ref()?;
        let remote = client.fetch().await?;
        let local = self.local.load();
        if remote.last_updated > local.last_updated {
            match self.adopt(remote) {
                Ok(adopted) => Some(adopted),
                Err(e) => {
                    log::warn!("Failed to cache server snapshot: {}", e);
                    Some(local)
                }
            }
        } else {
            Some(local)
        }
    }

    /// Replace the cache with a server snapshot, keeping this client's
    /// session (logged-in user, theme). Also the "accept theirs" conflict
    /// resolution.
    pub fn adopt(&self, mut remote: AppState) -> Result<AppState, StoreError> {
        let _gate = self.lock_writes();
        let local = self.local.load();
        remote.current_user = local.current_user;
        remote.theme = local.theme;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.local.commit(remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{router, SharedStore};
    use crate::types::{bootstrap_admin, Team};
    use std::path::Path;

    async fn spawn_server(dir: &Path) -> String {
        let store = SharedStore::open(dir).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(store)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn team(id: &str, name: &str) -> Team {
        Team {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_returns_bootstrap_state() {
        let dir = tempfile::tempdir().unwrap();
        let url = spawn_server(dir.path()).await;

        let client = SyncClient::new(&url);
        let state = client.fetch().await.unwrap();
        assert_eq!(state.users[0].id, "u1");
    }

    #[tokio::test]
    async fn test_fetch_offline_is_none() {
        let client = SyncClient::new("http://127.0.0.1:1");
        assert!(client.fetch().await.is_none());
    }

    #[tokio::test]
    async fn test_push_then_stale_push_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let url = spawn_server(dir.path()).await;
        let client = SyncClient::new(&url);

        let mut state_a = client.fetch().await.unwrap();
        let base = state_a.last_updated;
        state_a.teams.push(team("t1", "First writer"));
        let v1 = match client.push(&state_a, PushBase::Version(base)).await {
            PushOutcome::Accepted { version } => version,
            other => panic!("expected accept, got {:?}", other),
        };
        assert!(v1 > base);

        // A second writer still based on the old version loses.
        let mut state_b = AppState::default();
        state_b.users.push(bootstrap_admin());
        state_b.teams.push(team("t2", "Second writer"));
        match client.push(&state_b, PushBase::Version(base)).await {
            PushOutcome::Conflict { server_data } => {
                assert_eq!(server_data.teams[0].name, "First writer");
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_facade_update_reaches_server() {
        let dir = tempfile::tempdir().unwrap();
        let url = spawn_server(dir.path()).await;

        let cache = tempfile::tempdir().unwrap();
        let (store, _conflicts) = StateStore::new(
            LocalStore::new(cache.path()).unwrap(),
            Some(SyncClient::new(&url)),
        );

        store.refresh().await.unwrap();
        store
            .update(|s| {
                s.teams.push(team("t1", "Synced"));
                s.current_user = Some(bootstrap_admin());
            })
            .unwrap();

        // Background push: poll the server until the team shows up.
        let client = SyncClient::new(&url);
        let mut synced = None;
        for _ in 0..50 {
            if let Some(remote) = client.fetch().await {
                if remote.teams.iter().any(|t| t.name == "Synced") {
                    synced = Some(remote);
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let remote = synced.expect("background push never reached the server");
        // Session-local fields never travel.
        assert!(remote.current_user.is_none());
    }

    #[tokio::test]
    async fn test_facade_conflict_event_and_adopt() {
        let dir = tempfile::tempdir().unwrap();
        let url = spawn_server(dir.path()).await;

        let cache_a = tempfile::tempdir().unwrap();
        let (store_a, _conflicts_a) = StateStore::new(
            LocalStore::new(cache_a.path()).unwrap(),
            Some(SyncClient::new(&url)),
        );
        let cache_b = tempfile::tempdir().unwrap();
        let (store_b, mut conflicts_b) = StateStore::new(
            LocalStore::new(cache_b.path()).unwrap(),
            Some(SyncClient::new(&url)),
        );

        // Both clients start from the same snapshot.
        store_a.refresh().await.unwrap();
        store_b.refresh().await.unwrap();

        // A wins the race.
        store_a
            .local
            .update(|s| s.teams.push(team("t1", "A's team")))
            .unwrap();
        match store_a.push_now(false).await {
            PushOutcome::Accepted { .. } => {}
            other => panic!("expected accept, got {:?}", other),
        }

        // B edits without refreshing; its background push hits the conflict
        // and the event comes out on the channel.
        store_b
            .update(|s| s.teams.push(team("t2", "B's team")))
            .unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), conflicts_b.recv())
            .await
            .expect("no conflict event within 5s")
            .expect("conflict channel closed");
        assert_eq!(event.local.teams[0].name, "B's team");
        let server_copy = event.server;
        assert_eq!(server_copy.teams[0].name, "A's team");

        // B resolves by adopting the server copy; local session survives.
        store_b
            .local
            .update(|s| s.current_user = Some(bootstrap_admin()))
            .unwrap();
        let adopted = store_b.adopt(server_copy).unwrap();
        assert_eq!(adopted.teams[0].name, "A's team");
        assert!(adopted.current_user.is_some());
    }

    #[tokio::test]
    async fn test_late_push_outcome_never_overwrites_newer_state() {
        let dir = tempfile::tempdir().unwrap();
        let url = spawn_server(dir.path()).await;

        let cache = tempfile::tempdir().unwrap();
        let (store, _conflicts) = StateStore::new(
            LocalStore::new(cache.path()).unwrap(),
            Some(SyncClient::new(&url)),
        );
        store.refresh().await.unwrap();

        // Kick off a background push, then replace the cache before its
        // outcome can land.
        store
            .update(|s| s.teams.push(team("t1", "Pushed")))
            .unwrap();
        let mut snapshot = store.load();
        snapshot.teams.clear();
        snapshot.teams.push(team("t9", "Adopted"));
        store.adopt(snapshot).unwrap();

        // Whenever the in-flight outcome arrives, it is superseded and must
        // leave the adopted state alone.
        tokio::time::sleep(Duration::from_millis(500)).await;
        let state = store.load();
        assert_eq!(state.teams.len(), 1);
        assert_eq!(state.teams[0].name, "Adopted");
    }

    #[tokio::test]
    async fn test_refresh_ignores_older_server_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let url = spawn_server(dir.path()).await;

        let cache = tempfile::tempdir().unwrap();
        let (store, _conflicts) = StateStore::new(
            LocalStore::new(cache.path()).unwrap(),
            Some(SyncClient::new(&url)),
        );

        // Local edit stamps a time past the server's seed stamp.
        store
            .local
            .update(|s| s.teams.push(team("t1", "Local only")))
            .unwrap();

        let state = store.refresh().await.unwrap();
        assert_eq!(state.teams.len(), 1, "local newer state was clobbered");
    }
}
