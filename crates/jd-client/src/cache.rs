// crates/jd-client/src/cache.rs
//
// QueryClient: process-wide cache of last-known query results keyed by
// procedure path and input, with explicit invalidation.
//
// Entries stay fresh until invalidated (or until `stale_time` passes, when
// set). Errors are never cached. An invalidation that lands while a fetch is
// in flight marks that fetch's result stale on arrival, so a read issued after
// `invalidate` never observes data fetched before it.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;

use jd_core::{ProcedureDef, ProcedureKind};

use crate::error::ClientError;
use crate::link::HttpBatchLink;

/// Observable state of one query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Pending,
    Success(T),
    Error(ClientError),
}

impl<T> QueryState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ClientError> {
        match self {
            QueryState::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, QueryState::Pending)
    }
}

impl<T> From<Result<T, ClientError>> for QueryState<T> {
    fn from(result: Result<T, ClientError>) -> Self {
        match result {
            Ok(data) => QueryState::Success(data),
            Err(err) => QueryState::Error(err),
        }
    }
}

/// Cache key: procedure path plus canonical JSON of the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    pub path: String,
    pub input: String,
}

impl QueryKey {
    pub fn of<D: ProcedureDef>(input: &D::Input) -> Result<Self, ClientError> {
        // serde_json maps are ordered, so this rendering is canonical.
        let input = serde_json::to_string(&serde_json::to_value(input)?)?;
        Ok(Self {
            path: D::path(),
            input,
        })
    }

    /// Whether `filter` selects this key: an exact path, or a path prefix
    /// ending at a dot boundary (`"session"` matches `"session.getSession"`).
    pub fn matches(&self, filter: &str) -> bool {
        self.path == filter
            || (self.path.starts_with(filter) && self.path[filter.len()..].starts_with('.'))
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    fetched_at: Instant,
    stale: bool,
}

/// Typed query/mutation front end over an `HttpBatchLink`.
#[derive(Debug, Clone)]
pub struct QueryClient {
    link: HttpBatchLink,
    cache: Arc<RwLock<HashMap<QueryKey, CacheEntry>>>,
    /// Bumped by every invalidation.
    generation: Arc<AtomicU64>,
    stale_time: Option<Duration>,
}

impl QueryClient {
    pub fn new(link: HttpBatchLink) -> Self {
        Self {
            link,
            cache: Arc::new(RwLock::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
            stale_time: None,
        }
    }

    /// Treat entries older than `stale_time` as stale.
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn link(&self) -> &HttpBatchLink {
        &self.link
    }

    /// Bind a query handle to procedure `D` and `input`.
    pub fn query<D: ProcedureDef>(&self, input: D::Input) -> Query<D> {
        Query {
            client: self.clone(),
            input,
            state: QueryState::Pending,
            _procedure: PhantomData,
        }
    }

    /// Read through the cache.
    pub async fn fetch<D: ProcedureDef>(&self, input: &D::Input) -> QueryState<D::Output> {
        self.try_fetch::<D>(input).await.into()
    }

    pub async fn try_fetch<D: ProcedureDef>(&self, input: &D::Input) -> Result<D::Output, ClientError> {
        if D::KIND != ProcedureKind::Query {
            return Err(ClientError::Serialization(format!(
                "{} is a {}; use mutate",
                D::path(),
                D::KIND
            )));
        }

        let key = QueryKey::of::<D>(input)?;
        if let Some(data) = self.fresh(&key).await {
            return Ok(serde_json::from_value(data)?);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let data = self
            .link
            .call(ProcedureKind::Query, key.path.clone(), Some(serde_json::to_value(input)?))
            .await?;
        let output: D::Output = serde_json::from_value(data.clone())?;

        let stale = self.generation.load(Ordering::SeqCst) != generation;
        self.cache.write().await.insert(
            key,
            CacheEntry {
                data,
                fetched_at: Instant::now(),
                stale,
            },
        );
        Ok(output)
    }

    /// Current state without fetching. Stale data is still reported.
    pub async fn peek<D: ProcedureDef>(&self, input: &D::Input) -> QueryState<D::Output> {
        let key = match QueryKey::of::<D>(input) {
            Ok(key) => key,
            Err(e) => return QueryState::Error(e),
        };
        match self.cache.read().await.get(&key) {
            Some(entry) => serde_json::from_value::<D::Output>(entry.data.clone())
                .map_err(ClientError::from)
                .into(),
            None => QueryState::Pending,
        }
    }

    /// Run a mutation. Mutations bypass the cache.
    pub async fn mutate<D: ProcedureDef>(&self, input: &D::Input) -> Result<D::Output, ClientError> {
        if D::KIND != ProcedureKind::Mutation {
            return Err(ClientError::Serialization(format!(
                "{} is a {}; use fetch",
                D::path(),
                D::KIND
            )));
        }
        let data = self
            .link
            .call(ProcedureKind::Mutation, D::path(), Some(serde_json::to_value(input)?))
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Mark every entry selected by `filter` stale. Returns how many matched.
    pub async fn invalidate(&self, filter: &str) -> usize {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut cache = self.cache.write().await;
        let mut count = 0;
        for (key, entry) in cache.iter_mut() {
            if key.matches(filter) {
                entry.stale = true;
                count += 1;
            }
        }
        tracing::debug!(filter, count, "Invalidated queries");
        count
    }

    /// Invalidate one procedure/input pair.
    pub async fn invalidate_key<D: ProcedureDef>(&self, input: &D::Input) -> Result<bool, ClientError> {
        let key = QueryKey::of::<D>(input)?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(match self.cache.write().await.get_mut(&key) {
            Some(entry) => {
                entry.stale = true;
                true
            }
            None => false,
        })
    }

    async fn fresh(&self, key: &QueryKey) -> Option<Value> {
        let cache = self.cache.read().await;
        let entry = cache.get(key)?;
        let expired = self
            .stale_time
            .map(|ttl| entry.fetched_at.elapsed() >= ttl)
            .unwrap_or(false);
        if entry.stale || expired {
            None
        } else {
            Some(entry.data.clone())
        }
    }
}

/// A query bound to one procedure and input, as held by a UI component.
pub struct Query<D: ProcedureDef> {
    client: QueryClient,
    input: D::Input,
    state: QueryState<D::Output>,
    _procedure: PhantomData<D>,
}

impl<D: ProcedureDef> std::fmt::Debug for Query<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("path", &D::path())
            .field("pending", &self.state.is_pending())
            .finish()
    }
}

impl<D: ProcedureDef> Query<D> {
    pub fn state(&self) -> &QueryState<D::Output> {
        &self.state
    }

    pub fn data(&self) -> Option<&D::Output> {
        self.state.data()
    }

    pub fn input(&self) -> &D::Input {
        &self.input
    }

    /// Resolve the query through the cache and record the new state.
    pub async fn load(&mut self) -> &QueryState<D::Output> {
        self.state = self.client.fetch::<D>(&self.input).await;
        &self.state
    }

    /// Force the next `load` to re-fetch.
    pub async fn invalidate(&mut self) -> Result<(), ClientError> {
        self.client.invalidate_key::<D>(&self.input).await?;
        self.state = QueryState::Pending;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkConfig;
    use crate::auth::merge_set_cookies;
    use crate::test_support::{app_link, app_link_with_provider, CookieProvider, SwitchableProvider};
    use jd_core::api::example::{Hello, HelloInput, Random, RandomInput};
    use jd_core::api::session::GetSession;
    use jd_core::ErrorCode;

    fn config() -> LinkConfig {
        LinkConfig::new("http://test/api/trpc")
    }

    fn hello(name: &str) -> HelloInput {
        HelloInput {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_second_read_hits_cache() {
        let (link, transport) = app_link(config());
        let client = QueryClient::new(link);
        let first = client.fetch::<Hello>(&hello("from tRPC")).await;
        assert_eq!(first.data().map(String::as_str), Some("Hello from tRPC"));
        let second = client.fetch::<Hello>(&hello("from tRPC")).await;
        assert_eq!(second, first);
        assert_eq!(transport.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_different_inputs_are_different_keys() {
        let (link, transport) = app_link(config());
        let client = QueryClient::new(link);
        client.fetch::<Hello>(&hello("a")).await;
        client.fetch::<Hello>(&hello("b")).await;
        assert_eq!(transport.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_after_sign_out_reflects_null_session() {
        let provider = Arc::new(SwitchableProvider::default());
        provider.sign_in("Ada").await;
        let (link, _transport) = app_link_with_provider(config(), provider.clone());
        let client = QueryClient::new(link);

        let session = client.try_fetch::<GetSession>(&()).await.unwrap();
        assert_eq!(session.unwrap().display_name(), Some("Ada"));

        provider.sign_out().await;
        // Without invalidation the cached session is still served.
        let cached = client.try_fetch::<GetSession>(&()).await.unwrap();
        assert!(cached.is_some());

        assert_eq!(client.invalidate("session.getSession").await, 1);
        let after = client.try_fetch::<GetSession>(&()).await.unwrap();
        assert!(after.is_none());
    }

    #[tokio::test]
    async fn test_cleared_cookie_and_invalidation_reflect_null_session() {
        let cookie = "authjs.session-token=Ada; authjs.csrf-token=t";
        let (link, _transport) =
            app_link_with_provider(config().with_header("cookie", cookie), Arc::new(CookieProvider));
        let client = QueryClient::new(link);
        let mut session = client.query::<GetSession>(());
        session.load().await;
        assert_eq!(
            session.data().and_then(|s| s.as_ref()).and_then(|s| s.display_name()),
            Some("Ada")
        );

        // The provider's sign-out reply clears the session cookie.
        let after_sign_out = merge_set_cookies(Some(cookie), ["authjs.session-token=; Path=/; Max-Age=0"]);
        client.link().set_header("cookie", after_sign_out).await;
        session.invalidate().await.unwrap();
        assert!(session.state().is_pending());

        session.load().await;
        assert_eq!(session.state(), &QueryState::Success(None));
    }

    #[tokio::test]
    async fn test_invalidate_by_group_prefix() {
        let (link, _transport) = app_link(config());
        let client = QueryClient::new(link);
        client.fetch::<Hello>(&hello("a")).await;
        client.fetch::<GetSession>(&()).await;
        assert_eq!(client.invalidate("example").await, 1);
        assert_eq!(client.invalidate("exam").await, 0);
        assert_eq!(client.invalidate("session").await, 1);
    }

    #[tokio::test]
    async fn test_peek_is_pending_until_fetched() {
        let (link, _transport) = app_link(config());
        let client = QueryClient::new(link);
        assert!(client.peek::<Hello>(&hello("x")).await.is_pending());
        client.fetch::<Hello>(&hello("x")).await;
        assert_eq!(
            client.peek::<Hello>(&hello("x")).await.data().map(String::as_str),
            Some("Hello x")
        );
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let (link, transport) = app_link(config());
        let client = QueryClient::new(link);
        let err = client.mutate::<Random>(&RandomInput { num: 0.0 }).await.unwrap_err();
        assert_eq!(err.rpc_code(), Some(ErrorCode::BadRequest));
        let value = client.mutate::<Random>(&RandomInput { num: 1.0 }).await.unwrap();
        assert!((0.0..100.0).contains(&value));
        assert_eq!(transport.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_rejected_locally() {
        let (link, transport) = app_link(config());
        let client = QueryClient::new(link);
        assert!(client.fetch::<Random>(&RandomInput { num: 1.0 }).await.error().is_some());
        assert!(client.mutate::<Hello>(&hello("x")).await.is_err());
        assert!(transport.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_time_expires_entries() {
        let (link, transport) = app_link(config());
        let client = QueryClient::new(link).with_stale_time(Duration::ZERO);
        client.fetch::<Hello>(&hello("x")).await;
        client.fetch::<Hello>(&hello("x")).await;
        assert_eq!(transport.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_query_handle_states_and_batching() {
        let provider = Arc::new(SwitchableProvider::default());
        let (link, transport) = app_link_with_provider(config(), provider);
        let client = QueryClient::new(link);

        let mut greeting = client.query::<Hello>(hello("from tRPC"));
        let mut session = client.query::<GetSession>(());
        assert!(greeting.state().is_pending());

        tokio::join!(greeting.load(), session.load());
        assert_eq!(greeting.data().map(String::as_str), Some("Hello from tRPC"));
        assert_eq!(session.data(), Some(&None));
        assert_eq!(transport.requests().await.len(), 1);

        greeting.invalidate().await.unwrap();
        assert!(greeting.state().is_pending());
        greeting.load().await;
        assert_eq!(transport.requests().await.len(), 2);
    }
}
