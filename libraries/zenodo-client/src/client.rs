//! Main Zenodo client.

use crate::credentials::{default_config_path, section_for, CredentialStore, PLACEHOLDER_TOKEN};
use crate::deposition_actions::DepositionActions;
use crate::deposition_files::DepositionFiles;
use crate::depositions::Depositions;
use crate::error::{ConfigError, Result};
use crate::record::Record;
use crate::records::Records;
use crate::report::{Notice, Reporter, TracingReporter};
use crate::resources::Resources;
use crate::status::expect_status;
use crate::transport::{ApiRequest, ApiResponse, Method, ReqwestTransport, Transport};
use crate::types::{ClientConfig, Endpoint, Listing};
use crate::vocabulary::{ContentType, DepositionAction, ResourceKind};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Client for one Zenodo instance.
///
/// The base URL is fixed at construction. The access token is either given
/// in the [`ClientConfig`] or read lazily from the credential file the first
/// time a request needs it, then cached.
///
/// # Example
///
/// ```ignore
/// use zenodo_client::{ClientConfig, DepositionQuery, ZenodoClient};
///
/// let client = ZenodoClient::new(ClientConfig::new().sandbox(true))?;
///
/// let draft = client.depositions().create()?;
/// println!("Created deposition {}", draft.id()?);
///
/// let listing = client.depositions().list(&DepositionQuery::default())?;
/// for record in listing.records() {
///     println!("{}", record.title()?);
/// }
/// ```
pub struct ZenodoClient {
    base_url: String,
    sandbox: bool,
    explicit_token: Option<String>,
    token: OnceLock<String>,
    credentials: Option<CredentialStore>,
    transport: Box<dyn Transport>,
    reporter: Arc<dyn Reporter>,
}

impl ZenodoClient {
    /// Create a client talking HTTP through reqwest and reporting notices
    /// as `tracing` warnings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout, config.connect_timeout)?;
        Self::with_transport(config, Box::new(transport), Arc::new(TracingReporter))
    }

    /// Create a client with injected collaborators.
    pub fn with_transport(
        config: ClientConfig,
        transport: Box<dyn Transport>,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        let base_url = match &config.endpoint {
            Endpoint::Custom(url) => Endpoint::custom(url)?.base_url().to_string(),
            endpoint => endpoint.base_url().to_string(),
        };

        let explicit_token = config
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        let credentials = open_credentials(&config, explicit_token.is_some(), &reporter)?;

        debug!(url = %base_url, sandbox = config.sandbox, "Zenodo client created");

        Ok(Self {
            base_url,
            sandbox: config.sandbox,
            explicit_token,
            token: OnceLock::new(),
            credentials,
            transport,
            reporter,
        })
    }

    /// Base URL of the API, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_sandbox(&self) -> bool {
        self.sandbox
    }

    /// Access token: the explicit one, else the first entry of the
    /// `SANDBOX` or `ZENODO` section. Resolved once.
    pub fn token(&self) -> Result<&str> {
        if let Some(token) = &self.explicit_token {
            return Ok(token.as_str());
        }
        if let Some(token) = self.token.get() {
            return Ok(token.as_str());
        }

        let store = self.credentials.as_ref().ok_or(ConfigError::NoCredentials)?;
        let section = section_for(self.sandbox);
        let token = store.first_token(section)?.trim();
        if token.is_empty() || token == PLACEHOLDER_TOKEN {
            return Err(ConfigError::EmptySection {
                section: section.to_string(),
            }
            .into());
        }
        debug!(section = %section, path = %store.path().display(), "Token resolved from credential file");

        Ok(self.token.get_or_init(|| token.to_string()).as_str())
    }

    /// Request headers, JSON unless another encoding is asked for. A fresh
    /// copy on every call.
    pub fn headers(&self, content_type: Option<ContentType>) -> Result<Vec<(String, String)>> {
        let mut headers = vec![("Authorization".to_string(), format!("Bearer {}", self.token()?))];
        match content_type {
            Some(content_type) => {
                headers.push(("Content-Type".into(), content_type.mime_type().into()));
                headers.push(("Accept".into(), content_type.mime_type().into()));
            }
            None => headers.push(("Content-Type".into(), ContentType::Json.mime_type().into())),
        }
        Ok(headers)
    }

    /// Query parameters carrying the access token. A fresh copy on every
    /// call.
    pub fn params(&self) -> Result<Vec<(String, String)>> {
        Ok(vec![("access_token".to_string(), self.token()?.to_string())])
    }

    /// Credential file backing this client, if one was loaded.
    pub fn credentials(&self) -> Option<&CredentialStore> {
        self.credentials.as_ref()
    }

    pub fn credentials_mut(&mut self) -> Option<&mut CredentialStore> {
        self.credentials.as_mut()
    }

    pub fn reporter(&self) -> Arc<dyn Reporter> {
        Arc::clone(&self.reporter)
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) fn notice(&self, notice: Notice) {
        self.reporter.notice(notice);
    }

    /// Authenticated JSON request carrying the token parameter.
    pub(crate) fn request(&self, method: Method, url: impl Into<String>) -> Result<ApiRequest> {
        Ok(ApiRequest::new(method, url)
            .headers(self.headers(None)?)
            .query(self.params()?))
    }

    /// Execute and accept only the given status codes.
    pub(crate) fn send(&self, request: ApiRequest, accepted: &[u16]) -> Result<ApiResponse> {
        debug!(method = %request.method, url = %request.url, "Sending request");
        expect_status(self.transport.execute(request)?, accepted)
    }

    /// Wrap a JSON body, routing its notices through this client.
    pub(crate) fn record(&self, body: Value) -> Result<Record> {
        Ok(Record::from_value(body)?.with_reporter(self.reporter()))
    }

    pub(crate) fn listing(&self, body: Value) -> Result<Listing> {
        Ok(Listing::from_body(body)?.with_reporter(&self.reporter))
    }

    // =========================================================================
    // URL builders
    // =========================================================================

    pub fn deposition_collection_url(&self) -> String {
        format!("{}/deposit/depositions", self.base_url)
    }

    pub fn deposition_url(&self, id: u64) -> String {
        format!("{}/{}", self.deposition_collection_url(), id)
    }

    pub fn deposition_files_url(&self, id: u64) -> String {
        format!("{}/files", self.deposition_url(id))
    }

    pub fn deposition_file_url(&self, id: u64, file_id: &str) -> String {
        format!("{}/{}", self.deposition_files_url(id), file_id)
    }

    pub fn deposition_action_url(&self, id: u64, action: DepositionAction) -> String {
        format!("{}/actions/{}", self.deposition_url(id), action.as_str())
    }

    pub fn records_url(&self) -> String {
        format!("{}/records", self.base_url)
    }

    pub fn record_url(&self, id: u64) -> String {
        format!("{}/{}", self.records_url(), id)
    }

    pub fn resource_collection_url(&self, kind: ResourceKind) -> String {
        format!("{}/{}", self.base_url, kind.as_str())
    }

    pub fn resource_url(&self, kind: ResourceKind, id: &str) -> String {
        format!("{}/{}", self.resource_collection_url(kind), id)
    }

    /// Prefix every upload bucket lives under.
    pub fn files_namespace(&self) -> String {
        format!("{}/files", self.base_url)
    }

    // =========================================================================
    // Collections
    // =========================================================================

    pub fn depositions(&self) -> Depositions<'_> {
        Depositions::new(self)
    }

    pub fn deposition_files(&self) -> DepositionFiles<'_> {
        DepositionFiles::new(self)
    }

    pub fn deposition_actions(&self) -> DepositionActions<'_> {
        DepositionActions::new(self)
    }

    pub fn records(&self) -> Records<'_> {
        Records::new(self)
    }

    pub fn resources(&self, kind: ResourceKind) -> Resources<'_> {
        Resources::new(self, kind)
    }

    pub fn licenses(&self) -> Resources<'_> {
        self.resources(ResourceKind::Licenses)
    }

    pub fn communities(&self) -> Resources<'_> {
        self.resources(ResourceKind::Communities)
    }

    pub fn funders(&self) -> Resources<'_> {
        self.resources(ResourceKind::Funders)
    }

    pub fn grants(&self) -> Resources<'_> {
        self.resources(ResourceKind::Grants)
    }
}

impl fmt::Debug for ZenodoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZenodoClient")
            .field("base_url", &self.base_url)
            .field("sandbox", &self.sandbox)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

// An explicit path is always loaded. Without a token or a path the default
// file is loaded, or created with a placeholder when missing.
fn open_credentials(
    config: &ClientConfig,
    has_token: bool,
    reporter: &Arc<dyn Reporter>,
) -> Result<Option<CredentialStore>> {
    let store = match (&config.config_path, has_token) {
        (Some(path), _) => CredentialStore::load(path)?,
        (None, true) => return Ok(None),
        (None, false) => {
            let path = default_config_path();
            if path.exists() {
                CredentialStore::load(&path)?
            } else {
                let store = CredentialStore::create_default(&path, config.sandbox)?;
                info!(path = %path.display(), "No credential file found, created a default one");
                reporter.notice(Notice::ConfigCreated { path });
                store
            }
        }
    };
    Ok(Some(store.with_reporter(Arc::clone(reporter))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZenodoError;
    use crate::report::MemoryReporter;
    use crate::transport::MockTransport;
    use std::fs;
    use tempfile::TempDir;

    fn client(config: ClientConfig) -> Result<ZenodoClient> {
        ZenodoClient::with_transport(
            config,
            Box::new(MockTransport::new()),
            Arc::new(MemoryReporter::new()),
        )
    }

    fn credential_file(contents: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zenodorc");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_url_builders() {
        let client = client(ClientConfig::new().with_token("t")).unwrap();
        assert_eq!(
            client.deposition_collection_url(),
            "https://zenodo.org/api/deposit/depositions"
        );
        assert_eq!(
            client.deposition_file_url(3, "abc"),
            "https://zenodo.org/api/deposit/depositions/3/files/abc"
        );
        assert_eq!(
            client.deposition_action_url(3, DepositionAction::NewVersion),
            "https://zenodo.org/api/deposit/depositions/3/actions/newversion"
        );
        assert_eq!(client.record_url(9), "https://zenodo.org/api/records/9");
        assert_eq!(
            client.resource_url(ResourceKind::Licenses, "cc-by"),
            "https://zenodo.org/api/licenses/cc-by"
        );
        assert_eq!(client.files_namespace(), "https://zenodo.org/api/files");
    }

    #[test]
    fn test_sandbox_base_url() {
        let client = client(ClientConfig::new().with_token("t").sandbox(true)).unwrap();
        assert_eq!(client.base_url(), "https://sandbox.zenodo.org/api");
        assert!(client.is_sandbox());
    }

    #[test]
    fn test_headers_and_params() {
        let client = client(ClientConfig::new().with_token(" secret ")).unwrap();

        let mut headers = client.headers(None).unwrap();
        assert!(headers.contains(&("Authorization".into(), "Bearer secret".into())));
        assert!(headers.contains(&("Content-Type".into(), "application/json".into())));

        // Copies are independent of the client.
        headers.clear();
        assert_eq!(client.headers(None).unwrap().len(), 2);

        let bibtex = client.headers(Some(ContentType::Bibtex)).unwrap();
        assert!(bibtex.contains(&("Accept".into(), "application/x-bibtex".into())));

        assert_eq!(
            client.params().unwrap(),
            vec![("access_token".to_string(), "secret".to_string())]
        );
    }

    #[test]
    fn test_token_from_credential_file() {
        let (_dir, path) = credential_file("[ZENODO]\ntoken = prod\n\n[SANDBOX]\ntoken = sand\n");

        let production = client(ClientConfig::new().with_config_path(&path)).unwrap();
        assert_eq!(production.token().unwrap(), "prod");
        assert!(production.credentials().is_some());

        let sandbox = client(ClientConfig::new().with_config_path(&path).sandbox(true)).unwrap();
        assert_eq!(sandbox.token().unwrap(), "sand");
    }

    #[test]
    fn test_explicit_token_wins() {
        let (_dir, path) = credential_file("[ZENODO]\ntoken = prod\n");
        let client = client(ClientConfig::new().with_token("given").with_config_path(&path)).unwrap();
        assert_eq!(client.token().unwrap(), "given");
    }

    #[test]
    fn test_placeholder_token_rejected() {
        let (_dir, path) = credential_file("[ZENODO]\ntoken = <FIXME>\n\n[SANDBOX]\n");

        let production = client(ClientConfig::new().with_config_path(&path)).unwrap();
        assert!(matches!(
            production.token(),
            Err(ZenodoError::Configuration(ConfigError::EmptySection { .. }))
        ));

        let sandbox = client(ClientConfig::new().with_config_path(&path).sandbox(true)).unwrap();
        assert!(sandbox.token().is_err());
    }

    #[test]
    fn test_missing_config_path() {
        let dir = TempDir::new().unwrap();
        let err = client(ClientConfig::new().with_config_path(dir.path().join("absent"))).unwrap_err();
        assert!(matches!(
            err,
            ZenodoError::Configuration(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_custom_endpoint() {
        let config = ClientConfig::new()
            .with_token("t")
            .with_endpoint(Endpoint::Custom("localhost".into()));
        assert!(matches!(client(config), Err(ZenodoError::InvalidArgument(_))));
    }

    #[test]
    fn test_credentials_mut_persists() {
        let (_dir, path) = credential_file("[ZENODO]\ntoken = prod\n");
        let mut client = client(ClientConfig::new().with_config_path(&path)).unwrap();

        let store = client.credentials_mut().unwrap();
        store.write_token("zenodo", "backup", "other", false).unwrap();
        store.persist().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("backup = other"));
    }
}
