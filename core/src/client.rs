//! The OZmap client facade.
//!
//! # Design
//! `OzmapClient` composes the pieces of the crate: `RequestFactory` builds
//! each request, a `Transport` executes it, and `classify` turns any failure
//! into an `OzError` localized for the configured locale. The client never
//! retries.
//!
//! Mutable state is limited to the API key and the execution log. The key
//! lives behind an `RwLock`; `authenticate` additionally holds a refresh
//! lock so concurrent refreshes log in once. Requests already in flight keep
//! the key they read when they were built.

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::{classify, Error, Failure, Result};
use crate::exec_log::ExecutionLog;
use crate::filter::{Clause, Filter};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::pagination::{Accumulator, FetchAll, NextPage, Page};
use crate::request::RequestFactory;
use crate::transport::{Transport, UreqTransport};
use crate::types::{Credentials, CustomRequest, ExportFormat, FetchAllQuery, LoginResponse, ReadQuery};

/// Client for the OZmap `/api/v2` API.
///
/// ```rust,no_run
/// use ozmap_core::{Config, Credentials, Model, OzmapClient, ReadQuery};
///
/// # fn example() -> ozmap_core::Result<()> {
/// let config = Config::from_env()?.with_base_url("https://demo.ozmap.com.br");
/// let client = OzmapClient::new(config, None)?;
/// client.authenticate(&Credentials::new("admin", "secret"))?;
///
/// let boxes: serde_json::Value = client.read(&ReadQuery::new(Model::Box.path()).limit(10))?;
/// println!("{boxes}");
/// # Ok(())
/// # }
/// ```
pub struct OzmapClient<T: Transport = UreqTransport> {
    requests: RequestFactory,
    transport: T,
    config: Config,
    key: RwLock<Option<String>>,
    refresh: Mutex<()>,
    exec_log: Mutex<ExecutionLog>,
}

impl OzmapClient<UreqTransport> {
    /// Client over HTTP using `config.base_url`.
    pub fn new(config: Config, key: Option<String>) -> Result<Self> {
        Self::with_transport(config, key, UreqTransport::new())
    }
}

impl<T: Transport> OzmapClient<T> {
    /// Client over an arbitrary transport.
    pub fn with_transport(config: Config, key: Option<String>, transport: T) -> Result<Self> {
        let base_url = config.base_url.clone().ok_or_else(|| {
            Error::Configuration("no OZmap URL configured; set OZMAP_URL or pass a base URL".into())
        })?;
        Ok(Self {
            requests: RequestFactory::from_config(&base_url, &config),
            transport,
            config,
            key: RwLock::new(key),
            refresh: Mutex::new(()),
            exec_log: Mutex::new(ExecutionLog::default()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The API key currently sent with requests.
    pub fn key(&self) -> Option<String> {
        self.key.read().clone()
    }

    /// Copy of the execution log.
    pub fn execution_log(&self) -> ExecutionLog {
        self.exec_log.lock().clone()
    }

    /// Start a new execution log, returning the previous one as JSON.
    pub fn reset_execution_log(&self) -> Result<String> {
        self.exec_log.lock().reset()
    }

    /// Make sure the client holds a valid key.
    ///
    /// The current key is probed against `/authenticated` first; only when
    /// that fails (or there is no key) does the client log in with
    /// `credentials` and store the returned token. Returns the key in use.
    pub fn authenticate(&self, credentials: &Credentials) -> Result<String> {
        let _refresh = self.refresh.lock();
        log::debug!("[AUTH] Authenticating against {}", self.requests.base_url());

        if let Some(key) = self.key() {
            let probe = self.requests.build_authenticated(Some(&key));
            match self.execute(&probe) {
                Ok(_) => {
                    log::debug!("[AUTH] Current key is still valid");
                    return Ok(key);
                }
                Err(err) => log::debug!("[AUTH] Current key rejected ({err}); logging in"),
            }
        }

        let request = self.requests.build_login(credentials)?;
        let login: LoginResponse = self.execute(&request)?.json()?;
        log::debug!("[AUTH] Logged in as '{}'", credentials.login);
        *self.key.write() = Some(login.authorization.clone());
        Ok(login.authorization)
    }

    /// `POST /{model}`. Returns `None` when suppressed by dry-run mode.
    pub fn create<D: Serialize>(&self, model: &str, data: &D) -> Result<Option<Value>> {
        let data = serde_json::to_value(data)?;
        log::debug!("[CREATE] {model} --> {data}");
        self.exec_log.lock().create.push(data.clone());
        if self.config.dry_run {
            return Ok(None);
        }

        let request = self.requests.build_create(self.key().as_deref(), model, &data)?;
        self.execute(&request)?.json().map(Some)
    }

    /// `PATCH /{model}/{id}`. Returns `None` when suppressed by dry-run mode.
    pub fn update<D: Serialize>(
        &self,
        model: &str,
        id: &str,
        data: &D,
        extra_headers: &[(String, String)],
    ) -> Result<Option<Value>> {
        let data = serde_json::to_value(data)?;
        log::debug!("[UPDATE] {model}/{id} --> {data}");
        self.exec_log.lock().update.push(data.clone());
        if self.config.dry_run {
            return Ok(None);
        }

        let request = self
            .requests
            .build_update(self.key().as_deref(), model, id, &data, extra_headers)?;
        self.execute(&request)?.json().map(Some)
    }

    /// `DELETE /{model}/{id}`. Returns `None` when suppressed by dry-run mode.
    pub fn delete(&self, model: &str, id: &str, extra_headers: &[(String, String)]) -> Result<Option<Value>> {
        log::debug!("[DELETE] {model}/{id}");
        self.exec_log.lock().delete.push(id.to_string());
        if self.config.dry_run {
            return Ok(None);
        }

        let request = self
            .requests
            .build_delete(self.key().as_deref(), model, id, extra_headers);
        self.execute(&request)?.json().map(Some)
    }

    /// List request with filter and modifiers.
    pub fn read<R: DeserializeOwned>(&self, query: &ReadQuery) -> Result<R> {
        let request = self.requests.build_read(self.key().as_deref(), query)?;
        log::debug!("[READ] {} {}", request.url, request.body.as_deref().unwrap_or_default());
        self.execute(&request)?.json()
    }

    /// Shorthand list request: each `(property, value)` pair becomes an
    /// equality clause.
    pub fn read_where<R, I, K, V>(&self, model: &str, equalities: I, extra_headers: &[(String, String)]) -> Result<R>
    where
        R: DeserializeOwned,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let clauses: Vec<Clause> = equalities
            .into_iter()
            .map(|(property, value)| Clause::equals(property, value))
            .collect();
        let query = ReadQuery {
            filter: Some(Filter::all(clauses)),
            extra_headers: extra_headers.to_vec(),
            ..ReadQuery::new(model)
        };
        self.read(&query)
    }

    /// `GET /{model}/{id}`.
    pub fn read_by_id<R: DeserializeOwned>(
        &self,
        model: &str,
        id: &str,
        select: Option<&str>,
        extra_headers: &[(String, String)],
    ) -> Result<R> {
        let request = self
            .requests
            .build_read_by_id(self.key().as_deref(), model, id, select, extra_headers);
        log::debug!("[READ] {}", request.url);
        self.execute(&request)?.json()
    }

    /// Read every page of a list query and concatenate the rows.
    pub fn fetch_all_with_pagination<R: DeserializeOwned>(&self, fetch: &FetchAllQuery) -> Result<FetchAll<R>> {
        let strategy = fetch.strategy.unwrap_or(self.config.pagination);
        let mut pages = Accumulator::new(strategy, self.config.max_pages);
        let mut query = fetch.query.clone();
        query.page = pages.first_page();

        let mut next = {
            let first: Page<R> = self.read(&query)?;
            pages.absorb(first)?
        };

        loop {
            let page: Page<R> = match next {
                NextPage::Done => break,
                NextPage::Number(number) => {
                    query.page = Some(number);
                    log::debug!("[PAGINATION] {} page {number}", query.model);
                    self.read(&query)?
                }
                NextPage::Cursor(next_url) => {
                    let request = self.requests.build_next_page(
                        self.key().as_deref(),
                        &next_url,
                        query.filter.as_ref(),
                        &query.extra_headers,
                    )?;
                    log::debug!("[PAGINATION] Following {}", request.url);
                    self.execute(&request)?.json()?
                }
            };
            next = pages.absorb(page)?;
        }

        log::debug!("[PAGINATION] {} finished after {} pages", query.model, pages.requests());
        Ok(pages.finish())
    }

    /// Arbitrary call under `/api/v2`. In dry-run mode only `GET` requests
    /// and the login route are sent; everything else returns `None`.
    pub fn custom_request(&self, custom: &CustomRequest) -> Result<Option<Value>> {
        let request = self.requests.build_custom(self.key().as_deref(), custom)?;
        log::debug!("[CUSTOM] {} {}", request.method, request.url);
        self.exec_log.lock().custom.push(custom.data.clone());
        if self.config.dry_run && custom.method != HttpMethod::Get && !custom.is_login() {
            return Ok(None);
        }

        self.execute(&request)?.json().map(Some)
    }

    /// Render a property's croqui and return the raw file.
    pub fn export_croqui(&self, property_id: &str, format: ExportFormat) -> Result<Vec<u8>> {
        let request = self
            .requests
            .build_export_croqui(self.key().as_deref(), property_id, format);
        log::debug!("[EXPORT] Croqui ({format}) from {}", request.url);
        Ok(self.execute(&request)?.body)
    }

    /// Render a box diagram, highlighting the given fibers.
    pub fn export_box(&self, box_id: &str, highlight: &[String], format: ExportFormat) -> Result<Vec<u8>> {
        let request = self
            .requests
            .build_export_box(self.key().as_deref(), box_id, highlight, format)?;
        log::debug!("[EXPORT] Box ({format}) from {}", request.url);
        Ok(self.execute(&request)?.body)
    }

    /// One round trip; non-2xx statuses and transport failures come back
    /// classified.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let outcome = match self.transport.execute(request) {
            Ok(response) if response.is_success() => return Ok(response),
            Ok(response) => Failure::Status(response),
            Err(err) => Failure::Transport(err),
        };
        Err(classify(outcome, self.config.locale).into())
    }
}
