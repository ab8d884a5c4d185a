//! Bullhorn REST client: one method per endpoint.
//!
//! Accessors only build a [`Route`] and forward to the [`RequestExecutor`];
//! retries, error mapping and logging all live there.

use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{RequestExecutor, Session};
use crate::route::{Method, Params, Route};
use crate::types::{
    Candidate, ChangeResponse, ClientContact, ClientCorporation, CorporateUser, Entity,
    EntityResponse, JobOrder, JobSubmission, Listing, Page, Ping, Placement,
};

/// Field list sent when the caller does not pick one; the API requires `fields`.
pub const DEFAULT_FIELDS: &str = "id";

/// Library version, from `git describe` when built from a checkout.
pub const VERSION: &str = env!("BULLHORN_VERSION");

/// Builds the `User-Agent` sent with every request.
pub fn user_agent() -> String {
    [
        "Rust wrapper for Bullhorn API".to_string(),
        format!("(https://github.com/recruithub/bullhorn {})", VERSION),
        format!("rustc/{}", env!("BULLHORN_RUSTC_VERSION")),
        format!("({}; {})", std::env::consts::OS, std::env::consts::ARCH),
        "reqwest".to_string(),
    ]
    .join(" ")
}

/// Lucene-style `search/{entityType}` request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchParams {
    pub entity_type: String,
    pub query: String,
    pub fields: Option<String>,
    pub sort: Option<String>,
    pub count: Option<u64>,
    pub start: Option<u64>,
}

impl SearchParams {
    pub fn new(entity_type: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            query: query.into(),
            ..Default::default()
        }
    }

    /// Search over the entity type of `T`.
    pub fn of<T: Entity>(query: impl Into<String>) -> Self {
        Self::new(T::ENTITY_TYPE, query)
    }

    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn start(mut self, start: u64) -> Self {
        self.start = Some(start);
        self
    }
}

/// JPQL-style `query/{entityType}` request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryParams {
    pub entity_type: String,
    pub where_clause: String,
    pub fields: Option<String>,
    pub order_by: Option<String>,
    pub count: Option<u64>,
    pub start: Option<u64>,
}

impl QueryParams {
    pub fn new(entity_type: impl Into<String>, where_clause: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            where_clause: where_clause.into(),
            ..Default::default()
        }
    }

    pub fn of<T: Entity>(where_clause: impl Into<String>) -> Self {
        Self::new(T::ENTITY_TYPE, where_clause)
    }

    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn start(mut self, start: u64) -> Self {
        self.start = Some(start);
        self
    }
}

/// A listing request that can be walked page by page.
trait PagedRequest {
    fn route(&self, start: Option<u64>) -> Result<Route>;
    fn count(&self) -> Option<u64>;
    fn start(&self) -> Option<u64>;
}

impl PagedRequest for SearchParams {
    fn route(&self, start: Option<u64>) -> Result<Route> {
        let mut query = Params::new()
            .with("query", &self.query)
            .with("fields", self.fields.as_deref().unwrap_or(DEFAULT_FIELDS));
        query.set_opt("sort", self.sort.as_deref());
        query.set_opt("count", self.count);
        query.set_opt("start", start);

        Ok(Route::build(
            Method::Get,
            "search/{entityType}",
            Params::new().with("entityType", &self.entity_type),
            query,
        )?)
    }

    fn count(&self) -> Option<u64> {
        self.count
    }

    fn start(&self) -> Option<u64> {
        self.start
    }
}

impl PagedRequest for QueryParams {
    fn route(&self, start: Option<u64>) -> Result<Route> {
        let mut query = Params::new()
            .with("where", &self.where_clause)
            .with("fields", self.fields.as_deref().unwrap_or(DEFAULT_FIELDS));
        query.set_opt("orderBy", self.order_by.as_deref());
        query.set_opt("count", self.count);
        query.set_opt("start", start);

        Ok(Route::build(
            Method::Get,
            "query/{entityType}",
            Params::new().with("entityType", &self.entity_type),
            query,
        )?)
    }

    fn count(&self) -> Option<u64> {
        self.count
    }

    fn start(&self) -> Option<u64> {
        self.start
    }
}

/// Client for one REST session.
#[derive(Clone)]
pub struct BullhornClient {
    session: Session,
    executor: RequestExecutor,
}

impl std::fmt::Debug for BullhornClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BullhornClient")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl BullhornClient {
    /// Creates a client for `rest_url` (the `restUrl` returned at login).
    pub fn new(token: Option<String>, rest_url: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(token, rest_url))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            session: Session {
                base_url: config.rest_url,
                token: config.token,
                user_agent: user_agent(),
            },
            executor: RequestExecutor::default(),
        }
    }

    /// Replaces the executor, e.g. to inject a transport or sleeper.
    pub fn with_executor(mut self, executor: RequestExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.session.user_agent
    }

    pub fn rest_url(&self) -> &str {
        &self.session.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.session.token.as_deref()
    }

    /// Rotates the session token used by subsequent calls.
    pub fn set_token(&mut self, token: Option<String>) {
        self.session.token = token;
    }

    /// Sends an arbitrary route and returns the raw JSON body.
    pub async fn request(&self, route: &Route, body: Option<&Value>) -> Result<Value> {
        self.executor.execute(&self.session, route, body).await
    }

    async fn request_as<T: DeserializeOwned>(&self, route: &Route, body: Option<&Value>) -> Result<T> {
        self.executor.execute_as(&self.session, route, body).await
    }

    /// Checks that the configured session is usable.
    #[tracing::instrument(skip(self))]
    pub async fn login(&self) -> Result<Ping> {
        let ping = self.ping().await?;
        debug!("Session valid until {}", ping.session_expires);
        Ok(ping)
    }

    #[tracing::instrument(skip(self))]
    pub async fn ping(&self) -> Result<Ping> {
        self.request_as(&Route::new(Method::Get, "ping")?, None).await
    }

    /// Fetches one record of `T`'s entity type by id.
    pub async fn get<T: Entity>(&self, id: i64, fields: Option<&str>) -> Result<T> {
        self.get_entity(T::ENTITY_TYPE, id, fields).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_entity<T: DeserializeOwned>(
        &self,
        entity_type: &str,
        id: i64,
        fields: Option<&str>,
    ) -> Result<T> {
        let route = Route::build(
            Method::Get,
            "entity/{entityType}/{entityId}",
            Params::new()
                .with("entityType", entity_type)
                .with("entityId", id),
            Params::new().with("fields", fields.unwrap_or(DEFAULT_FIELDS)),
        )?;

        let response: EntityResponse<T> = self.request_as(&route, None).await?;
        response
            .data
            .into_vec()
            .into_iter()
            .next()
            .ok_or_else(|| empty_data_error(&route))
    }

    /// Fetches several records of one entity type in a single call.
    #[tracing::instrument(skip(self))]
    pub async fn get_entities<T: DeserializeOwned>(
        &self,
        entity_type: &str,
        ids: &[i64],
        fields: Option<&str>,
    ) -> Result<Vec<T>> {
        let route = Route::build(
            Method::Get,
            "entity/{entityType}/{entityIds}",
            Params::new()
                .with("entityType", entity_type)
                .with("entityIds", join_ids(ids)),
            Params::new().with("fields", fields.unwrap_or(DEFAULT_FIELDS)),
        )?;

        let response: EntityResponse<T> = self.request_as(&route, None).await?;
        Ok(response.data.into_vec())
    }

    /// Fetches the records linked to `ids` through a to-many `association`.
    #[tracing::instrument(skip(self))]
    pub async fn get_associations<T: DeserializeOwned>(
        &self,
        entity_type: &str,
        ids: &[i64],
        association: &str,
        fields: Option<&str>,
    ) -> Result<Vec<T>> {
        let route = Route::build(
            Method::Get,
            "entity/{entityType}/{entityIds}/{association}",
            Params::new()
                .with("entityType", entity_type)
                .with("entityIds", join_ids(ids))
                .with("association", association),
            Params::new().with("fields", fields.unwrap_or(DEFAULT_FIELDS)),
        )?;

        let listing: Listing<T> = self.request_as(&route, None).await?;
        Ok(listing.into_data())
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn create_entity<B: Serialize + ?Sized>(
        &self,
        entity_type: &str,
        body: &B,
    ) -> Result<ChangeResponse> {
        let route = Route::build(
            Method::Put,
            "entity/{entityType}",
            Params::new().with("entityType", entity_type),
            Params::new(),
        )?;
        let body = to_body(body)?;
        self.request_as(&route, Some(&body)).await
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn update_entity<B: Serialize + ?Sized>(
        &self,
        entity_type: &str,
        id: i64,
        body: &B,
    ) -> Result<ChangeResponse> {
        let route = Route::build(
            Method::Post,
            "entity/{entityType}/{entityId}",
            Params::new()
                .with("entityType", entity_type)
                .with("entityId", id),
            Params::new(),
        )?;
        let body = to_body(body)?;
        self.request_as(&route, Some(&body)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_entity(&self, entity_type: &str, id: i64) -> Result<ChangeResponse> {
        let route = Route::build(
            Method::Delete,
            "entity/{entityType}/{entityId}",
            Params::new()
                .with("entityType", entity_type)
                .with("entityId", id),
            Params::new(),
        )?;
        self.request_as(&route, None).await
    }

    /// One search page, envelope included.
    #[tracing::instrument(skip(self))]
    pub async fn search_page<T: DeserializeOwned>(&self, params: &SearchParams) -> Result<Page<T>> {
        self.fetch_page(params).await
    }

    /// The records of one search page.
    #[tracing::instrument(skip(self))]
    pub async fn search<T: DeserializeOwned>(&self, params: &SearchParams) -> Result<Vec<T>> {
        let listing: Listing<T> = self.request_as(&params.route(params.start)?, None).await?;
        Ok(listing.into_data())
    }

    /// Every matching record, fetched page by page.
    #[tracing::instrument(skip(self))]
    pub async fn search_all<T: DeserializeOwned>(&self, params: &SearchParams) -> Result<Vec<T>> {
        self.collect_pages(params).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn query_page<T: DeserializeOwned>(&self, params: &QueryParams) -> Result<Page<T>> {
        self.fetch_page(params).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn query<T: DeserializeOwned>(&self, params: &QueryParams) -> Result<Vec<T>> {
        let listing: Listing<T> = self.request_as(&params.route(params.start)?, None).await?;
        Ok(listing.into_data())
    }

    #[tracing::instrument(skip(self))]
    pub async fn query_all<T: DeserializeOwned>(&self, params: &QueryParams) -> Result<Vec<T>> {
        self.collect_pages(params).await
    }

    async fn fetch_page<T: DeserializeOwned, P: PagedRequest>(&self, params: &P) -> Result<Page<T>> {
        let route = params.route(params.start())?;
        match self.request_as::<Listing<T>>(&route, None).await? {
            Listing::Paged(page) => Ok(page),
            Listing::Bare(data) => Ok(Page {
                total: Some(data.len() as u64),
                start: params.start().unwrap_or(0),
                count: data.len() as u64,
                data,
            }),
        }
    }

    async fn collect_pages<T: DeserializeOwned, P: PagedRequest>(&self, params: &P) -> Result<Vec<T>> {
        let mut start = params.start().unwrap_or(0);
        let mut records = Vec::new();

        loop {
            let route = params.route(Some(start))?;
            let page = match self.request_as::<Listing<T>>(&route, None).await? {
                Listing::Paged(page) => page,
                Listing::Bare(data) => {
                    records.extend(data);
                    break;
                }
            };

            let next = page.next_start(params.count());
            debug!(
                "Fetched {} records from {} (start {}, total {:?})",
                page.data.len(),
                route.key(),
                page.start,
                page.total
            );
            records.extend(page.data);

            match next {
                Some(next) if next > start => start = next,
                _ => break,
            }
        }

        Ok(records)
    }

    /// Field metadata for an entity type; the live source of its schema.
    #[tracing::instrument(skip(self))]
    pub async fn get_meta(&self, entity_type: &str, fields: Option<&str>) -> Result<Value> {
        let route = Route::build(
            Method::Get,
            "meta/{entityType}",
            Params::new().with("entityType", entity_type),
            Params::new().with("fields", fields.unwrap_or("*")),
        )?;
        self.request(&route, None).await
    }

    /// Reads one or more comma-separated system settings.
    #[tracing::instrument(skip(self))]
    pub async fn get_settings(&self, settings: &str) -> Result<Value> {
        let route = Route::build(
            Method::Get,
            "settings/{settings}",
            Params::new().with("settings", settings),
            Params::new(),
        )?;
        self.request(&route, None).await
    }

    pub async fn get_candidates(&self, query: &str, fields: &str) -> Result<Vec<Candidate>> {
        self.search(&SearchParams::of::<Candidate>(query).fields(fields))
            .await
    }

    pub async fn get_client_contacts(&self, query: &str, fields: &str) -> Result<Vec<ClientContact>> {
        self.search(&SearchParams::of::<ClientContact>(query).fields(fields))
            .await
    }

    pub async fn get_client_corporations(
        &self,
        query: &str,
        fields: &str,
    ) -> Result<Vec<ClientCorporation>> {
        self.search(&SearchParams::of::<ClientCorporation>(query).fields(fields))
            .await
    }

    pub async fn get_corporate_users(
        &self,
        where_clause: &str,
        fields: &str,
    ) -> Result<Vec<CorporateUser>> {
        self.query(&QueryParams::of::<CorporateUser>(where_clause).fields(fields))
            .await
    }

    pub async fn get_job_orders(&self, query: &str, fields: &str) -> Result<Vec<JobOrder>> {
        self.search(&SearchParams::of::<JobOrder>(query).fields(fields))
            .await
    }

    pub async fn get_job_submissions(&self, query: &str, fields: &str) -> Result<Vec<JobSubmission>> {
        self.search(&SearchParams::of::<JobSubmission>(query).fields(fields))
            .await
    }

    pub async fn get_placements(&self, query: &str, fields: &str) -> Result<Vec<Placement>> {
        self.search(&SearchParams::of::<Placement>(query).fields(fields))
            .await
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(Error::Serialize)
}

fn empty_data_error(route: &Route) -> Error {
    let source = <serde_json::Error as serde::de::Error>::custom(format!(
        "{} returned no record",
        route.key()
    ));
    Error::Parse {
        source,
        body: String::new(),
    }
}
