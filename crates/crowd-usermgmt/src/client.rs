//! Asynchronous Crowd user-management client.

use crate::membership::MembershipDump;
use crate::models::{
    require_name, EntityName, GroupNames, NewGroup, NewUser, PasswordValue, Session,
    SessionRequest, User, UserNames, ValidationFactors, DEFAULT_REMOTE_ADDRESS,
};
use crate::tables;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, MediaType, ReqwestTransport};
use crate::Result;
use crowd_core::config::{AppCredentials, CrowdConfig, TlsVerify};
use crowd_core::error::{ENCODE_OPERATION, TRANSPORT_OPERATION};
use crowd_core::http::HttpSettings;
use crowd_core::outcome::{Outcome, StatusTable};
use crowd_core::query::{Expand, QueryParams};
use crowd_core::Error;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Builder for [`DirectoryClient`].
pub struct DirectoryClientBuilder {
    config: CrowdConfig,
    http_settings: HttpSettings,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl DirectoryClientBuilder {
    /// Create a builder from a [`CrowdConfig`].
    #[must_use]
    pub fn new(config: CrowdConfig) -> Self {
        let http_settings = HttpSettings::from_config(&config);
        Self {
            config,
            http_settings,
            transport: None,
        }
    }

    /// Override the HTTP settings of the default transport.
    #[must_use]
    pub fn with_http_settings(mut self, http_settings: HttpSettings) -> Self {
        self.http_settings = http_settings;
        self
    }

    /// Send requests through the given transport instead of the default reqwest client.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client. No network call is made.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the configuration is invalid or the default
    /// transport cannot be constructed.
    pub fn build(self) -> Result<DirectoryClient> {
        self.config.check()?;
        let rest_root = self.config.rest_root()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(
                &self.config.tls_verify,
                &self.http_settings,
            )?),
        };

        Ok(DirectoryClient {
            transport,
            base_url: self.config.normalized_base_url().to_string(),
            rest_root,
            credentials: Arc::new(self.config.credentials()),
            nested_max_results: self.config.nested_max_results,
        })
    }
}

/// Asynchronous client for the Crowd user-management REST API.
///
/// Every method is one request/response round trip mapped through the operation's
/// status table. The client holds no mutable state and can be cloned and shared freely.
#[derive(Clone)]
pub struct DirectoryClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    rest_root: Url,
    credentials: Arc<AppCredentials>,
    nested_max_results: u32,
}

impl DirectoryClient {
    /// Construct a client for an application account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the URL or credentials are invalid or the trust
    /// bundle cannot be loaded.
    pub fn new(
        base_url: impl Into<String>,
        app_name: impl Into<String>,
        app_password: impl Into<String>,
        tls_verify: impl Into<TlsVerify>,
    ) -> Result<Self> {
        let config = CrowdConfig::new(base_url, app_name, app_password)?.with_tls_verify(tls_verify);
        DirectoryClientBuilder::new(config).build()
    }

    /// Construct a client from a configuration.
    ///
    /// # Errors
    ///
    /// See [`DirectoryClientBuilder::build`].
    pub fn from_config(config: CrowdConfig) -> Result<Self> {
        DirectoryClientBuilder::new(config).build()
    }

    /// Start a builder pre-populated with the provided configuration.
    #[must_use]
    pub fn builder(config: CrowdConfig) -> DirectoryClientBuilder {
        DirectoryClientBuilder::new(config)
    }

    /// The normalized server base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The REST root, `<base>/rest/usermanagement/1`.
    #[must_use]
    pub fn rest_root(&self) -> &Url {
        &self.rest_root
    }

    /// Page-size ceiling used by nested membership queries.
    #[must_use]
    pub const fn nested_max_results(&self) -> u32 {
        self.nested_max_results
    }

    /// Check that the application itself can authenticate.
    ///
    /// Requests a path that does not exist: a 404 means application authentication
    /// passed, a 401 means it did not.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for any other response.
    pub async fn auth_ping(&self) -> Result<bool> {
        let response = self
            .get_for(&tables::AUTH_PING, &["non-existent", "location"], &QueryParams::new())
            .await?;
        let outcome = classify(&tables::AUTH_PING, &response)?;
        Ok(outcome.is_success())
    }

    /// Authenticate a user and return their attributes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] with the server's message on a 400.
    pub async fn authenticate_user(&self, username: &str, password: &str) -> Result<User> {
        require_name("username", username)?;
        let query = QueryParams::user(username);
        let response = self
            .post_for(&tables::AUTHENTICATE_USER, &["authentication"], &query, &PasswordValue { value: password })
            .await?;
        expect_json(&tables::AUTHENTICATE_USER, &response)
    }

    /// Create a session for a user.
    ///
    /// `remote_address` is sent as the `remote_address` validation factor; it defaults
    /// to `127.0.0.1`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] with the server's message on a 400.
    pub async fn create_session(
        &self,
        username: &str,
        password: &str,
        remote_address: Option<&str>,
    ) -> Result<Session> {
        require_name("username", username)?;
        let body = SessionRequest {
            username,
            password,
            validation_factors: ValidationFactors::remote_address(
                remote_address.unwrap_or(DEFAULT_REMOTE_ADDRESS),
            ),
        };
        let query = QueryParams::new().expand(Expand::User);
        let response = self.post_for(&tables::CREATE_SESSION, &["session"], &query, &body).await?;
        expect_json(&tables::CREATE_SESSION, &response)
    }

    /// Validate a session token and return the session with its user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] for any non-2xx response.
    pub async fn validate_session(
        &self,
        token: &str,
        remote_address: Option<&str>,
    ) -> Result<Session> {
        require_name("token", token)?;
        let body =
            ValidationFactors::remote_address(remote_address.unwrap_or(DEFAULT_REMOTE_ADDRESS));
        let query = QueryParams::new().expand(Expand::User);
        let response = self.post_for(&tables::VALIDATE_SESSION, &["session", token], &query, &body).await?;
        expect_json(&tables::VALIDATE_SESSION, &response)
    }

    /// Terminate a session, logging the user out of all Crowd-enabled services.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for anything but a 204.
    pub async fn terminate_session(&self, token: &str) -> Result<()> {
        require_name("token", token)?;
        let response = self.delete_for(&tables::TERMINATE_SESSION, &["session", token], &QueryParams::new()).await?;
        expect_done(&tables::TERMINATE_SESSION, &response)
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserAlreadyExists`] on a 400 and [`Error::AuthorizationDenied`]
    /// on a 403.
    pub async fn create_user(&self, user: &NewUser) -> Result<()> {
        let response = self
            .post_for(&tables::CREATE_USER, &["user"], &QueryParams::new(), &user.payload())
            .await?;
        expect_done(&tables::CREATE_USER, &response)
    }

    /// Create a user from attribute key/value pairs.
    ///
    /// The attributes are validated before any request is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] naming a missing required attribute or an
    /// unknown key, otherwise as [`DirectoryClient::create_user`].
    pub async fn create_user_from_attributes<I, K, V>(
        &self,
        username: &str,
        attributes: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let user = NewUser::from_attributes(username, attributes)?;
        self.create_user(&user).await
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserNotFound`] on a 404 and [`Error::AuthorizationDenied`] on a
    /// 403.
    pub async fn delete_user(&self, username: &str) -> Result<()> {
        require_name("username", username)?;
        let query = QueryParams::user(username);
        let response = self.delete_for(&tables::DELETE_USER, &["user"], &query).await?;
        expect_done(&tables::DELETE_USER, &response)
    }

    /// Fetch a user with extended attributes, or `None` if there is no such user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] on an unexpected response.
    pub async fn get_user(&self, username: &str) -> Result<Option<User>> {
        require_name("username", username)?;
        let query = QueryParams::user(username).expand(Expand::Attributes);
        let response = self.get_for(&tables::GET_USER, &["user"], &query).await?;
        lookup_json(&tables::GET_USER, &response)
    }

    /// Whether the user exists. Any non-2xx response counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the request could not be sent.
    pub async fn user_exists(&self, username: &str) -> Result<bool> {
        require_name("username", username)?;
        let query = QueryParams::user(username);
        let response = self.get_for(&tables::USER_EXISTS, &["user"], &query).await?;
        Ok(classify(&tables::USER_EXISTS, &response)?.is_success())
    }

    /// Create a group.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GroupAlreadyExists`] on a 400 and [`Error::AuthorizationDenied`]
    /// on a 403.
    pub async fn create_group(&self, group: &NewGroup) -> Result<()> {
        let response = self.post_for(&tables::CREATE_GROUP, &["group"], &QueryParams::new(), group).await?;
        expect_done(&tables::CREATE_GROUP, &response)
    }

    /// Create a group from attribute key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] naming an unknown key, otherwise as
    /// [`DirectoryClient::create_group`].
    pub async fn create_group_from_attributes<I, K, V>(
        &self,
        groupname: &str,
        attributes: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let group = NewGroup::from_attributes(groupname, attributes)?;
        self.create_group(&group).await
    }

    /// Whether the group exists. Any non-2xx response counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the request could not be sent.
    pub async fn group_exists(&self, groupname: &str) -> Result<bool> {
        require_name("groupname", groupname)?;
        let query = QueryParams::group(groupname);
        let response = self.get_for(&tables::GROUP_EXISTS, &["group"], &query).await?;
        Ok(classify(&tables::GROUP_EXISTS, &response)?.is_success())
    }

    /// Names of groups the user is a direct member of, or `None` if the user is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] on an unexpected response.
    pub async fn user_direct_groups(&self, username: &str) -> Result<Option<Vec<String>>> {
        require_name("username", username)?;
        let query = QueryParams::user(username);
        let response = self.get_for(&tables::USER_DIRECT_GROUPS, &["user", "group", "direct"], &query).await?;
        Ok(lookup_json::<GroupNames>(&tables::USER_DIRECT_GROUPS, &response)?
            .map(GroupNames::into_names))
    }

    /// Names of groups the user belongs to directly or through nesting, or `None` if the
    /// user is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] on an unexpected response.
    pub async fn user_nested_groups(&self, username: &str) -> Result<Option<Vec<String>>> {
        require_name("username", username)?;
        let query = QueryParams::user(username);
        let response = self.get_for(&tables::USER_NESTED_GROUPS, &["user", "group", "nested"], &query).await?;
        Ok(lookup_json::<GroupNames>(&tables::USER_NESTED_GROUPS, &response)?
            .map(GroupNames::into_names))
    }

    /// Names of users that are direct members of the group, or `None` if the group is
    /// unknown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] on an unexpected response.
    pub async fn group_direct_members(&self, groupname: &str) -> Result<Option<Vec<String>>> {
        require_name("groupname", groupname)?;
        let query = QueryParams::group(groupname);
        let response = self.get_for(&tables::GROUP_DIRECT_MEMBERS, &["group", "user", "direct"], &query).await?;
        Ok(lookup_json::<UserNames>(&tables::GROUP_DIRECT_MEMBERS, &response)?
            .map(UserNames::into_names))
    }

    /// The user if they are a direct member of the group, otherwise `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] on an unexpected response.
    pub async fn group_direct_member(
        &self,
        groupname: &str,
        username: &str,
    ) -> Result<Option<User>> {
        require_name("groupname", groupname)?;
        require_name("username", username)?;
        let query = QueryParams::membership(groupname, username);
        let response = self.get_for(&tables::GROUP_DIRECT_MEMBER, &["group", "user", "direct"], &query).await?;
        lookup_json(&tables::GROUP_DIRECT_MEMBER, &response)
    }

    /// Names of users that belong to the group directly or through nesting, or `None` on
    /// any non-2xx response.
    ///
    /// Requests a single window of [`DirectoryClient::nested_max_results`] entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the request fails or the body is undecodable.
    pub async fn group_nested_members(&self, groupname: &str) -> Result<Option<Vec<String>>> {
        require_name("groupname", groupname)?;
        let query = QueryParams::group(groupname).window(0, self.nested_max_results);
        let response = self.get_for(&tables::GROUP_NESTED_MEMBERS, &["group", "user", "nested"], &query).await?;
        Ok(lookup_json::<UserNames>(&tables::GROUP_NESTED_MEMBERS, &response)?
            .map(UserNames::into_names))
    }

    /// Names of groups that are direct children of the group, or `None` if the group is
    /// unknown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] on an unexpected response.
    pub async fn group_direct_children(&self, groupname: &str) -> Result<Option<Vec<String>>> {
        require_name("groupname", groupname)?;
        let query = QueryParams::group(groupname);
        let response = self
            .get_for(&tables::GROUP_DIRECT_CHILDREN, &["group", "child-group", "direct"], &query)
            .await?;
        Ok(lookup_json::<GroupNames>(&tables::GROUP_DIRECT_CHILDREN, &response)?
            .map(GroupNames::into_names))
    }

    /// Make a user a direct member of a group.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserNotFound`] on a 400, [`Error::GroupNotFound`] on a 404 and
    /// [`Error::UserAlreadyExists`] on a 409 (already a member).
    pub async fn add_user_to_group(&self, username: &str, groupname: &str) -> Result<()> {
        require_name("username", username)?;
        require_name("groupname", groupname)?;
        let query = QueryParams::group(groupname);
        let response = self
            .post_for(&tables::ADD_USER_TO_GROUP, 
                &["group", "user", "direct"],
                &query,
                &EntityName { name: username },
            )
            .await?;
        expect_done(&tables::ADD_USER_TO_GROUP, &response)
    }

    /// Make a group a direct child of another group.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GroupNotFound`] when either group is missing (400 for the child,
    /// 404 for the parent).
    pub async fn add_child_group(&self, parent: &str, child: &str) -> Result<()> {
        require_name("parent group", parent)?;
        require_name("child group", child)?;
        let query = QueryParams::group(parent);
        let response = self
            .post_for(&tables::ADD_CHILD_GROUP, 
                &["group", "child-group", "direct"],
                &query,
                &EntityName { name: child },
            )
            .await?;
        expect_done(&tables::ADD_CHILD_GROUP, &response).map_err(|err| match err {
            Error::GroupNotFound(ctx) if ctx.message.is_none() => {
                let missing = if ctx.status == Some(400) { child } else { parent };
                Error::GroupNotFound(ctx.with_message(format!("group `{missing}` does not exist")))
            }
            other => other,
        })
    }

    /// Remove a user as a direct member of a group.
    ///
    /// # Errors
    ///
    /// On a 404 the server's message decides between [`Error::UserNotFound`] and
    /// [`Error::GroupNotFound`]; an unrecognized message is [`Error::Protocol`].
    pub async fn remove_user_from_group(&self, username: &str, groupname: &str) -> Result<()> {
        require_name("username", username)?;
        require_name("groupname", groupname)?;
        let query = QueryParams::membership(groupname, username);
        let response = self.delete_for(&tables::REMOVE_USER_FROM_GROUP, &["group", "user", "direct"], &query).await?;
        expect_done(&tables::REMOVE_USER_FROM_GROUP, &response)
    }

    /// Full dump of group memberships with users and nested groups, or `None` on a 404.
    ///
    /// This endpoint only speaks XML; the XML headers apply to this request alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] on an unexpected response or malformed XML.
    pub async fn group_memberships(&self) -> Result<Option<MembershipDump>> {
        let response = self
            .send(
                tables::GROUP_MEMBERSHIPS.operation(),
                Method::GET,
                &["group", "membership"],
                &QueryParams::new(),
                None,
                MediaType::Xml,
            )
            .await?;
        let table = &tables::GROUP_MEMBERSHIPS;
        classify(table, &response)?
            .try_map(|()| {
                MembershipDump::parse(&response.body).map_err(|err| {
                    Error::protocol(
                        table.operation(),
                        Some(response.status.as_u16()),
                        err.message().unwrap_or("malformed XML").to_string(),
                    )
                })
            })
            .map(Outcome::into_option)
    }

    /// Send a JSON `GET` to a path below the REST root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the transport fails.
    pub async fn get(&self, segments: &[&str], query: &QueryParams) -> Result<HttpResponse> {
        self.send(TRANSPORT_OPERATION, Method::GET, segments, query, None, MediaType::Json)
            .await
    }

    /// Send a JSON `POST` with a body to a path below the REST root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the body cannot be encoded or the transport fails.
    pub async fn post<B>(
        &self,
        segments: &[&str],
        query: &QueryParams,
        body: &B,
    ) -> Result<HttpResponse>
    where
        B: Serialize + ?Sized,
    {
        let body = encode(ENCODE_OPERATION, body)?;
        self.send(TRANSPORT_OPERATION, Method::POST, segments, query, Some(body), MediaType::Json)
            .await
    }

    /// Send a JSON `DELETE` to a path below the REST root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the transport fails.
    pub async fn delete(&self, segments: &[&str], query: &QueryParams) -> Result<HttpResponse> {
        self.send(TRANSPORT_OPERATION, Method::DELETE, segments, query, None, MediaType::Json)
            .await
    }

    async fn get_for(
        &self,
        table: &StatusTable,
        segments: &[&str],
        query: &QueryParams,
    ) -> Result<HttpResponse> {
        self.send(table.operation(), Method::GET, segments, query, None, MediaType::Json)
            .await
    }

    async fn post_for<B>(
        &self,
        table: &StatusTable,
        segments: &[&str],
        query: &QueryParams,
        body: &B,
    ) -> Result<HttpResponse>
    where
        B: Serialize + ?Sized,
    {
        let operation = table.operation();
        let body = encode(operation, body)?;
        self.send(operation, Method::POST, segments, query, Some(body), MediaType::Json)
            .await
    }

    async fn delete_for(
        &self,
        table: &StatusTable,
        segments: &[&str],
        query: &QueryParams,
    ) -> Result<HttpResponse> {
        self.send(table.operation(), Method::DELETE, segments, query, None, MediaType::Json)
            .await
    }

    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        segments: &[&str],
        query: &QueryParams,
        body: Option<Vec<u8>>,
        media_type: MediaType,
    ) -> Result<HttpResponse> {
        let url = self.build_url(segments, query)?;
        debug!(operation, method = %method, path = %url.path(), %media_type, "Sending Crowd request");

        let request = HttpRequest {
            method,
            url,
            media_type,
            body,
            credentials: Arc::clone(&self.credentials),
        };
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|err| err.in_operation(operation))?;

        debug!(operation, status = response.status.as_u16(), "Received Crowd response");
        Ok(response)
    }

    fn build_url(&self, segments: &[&str], query: &QueryParams) -> Result<Url> {
        let mut url = self.rest_root.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::ConfigError(format!("Crowd URL `{}` cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        query.append_to(&mut url);
        Ok(url)
    }
}

impl fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("base_url", &self.base_url)
            .field("rest_root", &self.rest_root.as_str())
            .field("credentials", &self.credentials)
            .field("nested_max_results", &self.nested_max_results)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for DirectoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Crowd server at {}", self.base_url)
    }
}

fn classify(table: &StatusTable, response: &HttpResponse) -> Result<Outcome<()>> {
    table.classify(response.status.as_u16(), &response.body)
}

fn encode<B: Serialize + ?Sized>(operation: &'static str, body: &B) -> Result<Vec<u8>> {
    serde_json::to_vec(body).map_err(|err| {
        Error::protocol(operation, None, format!("unencodable request body: {err}"))
    })
}

fn decode<T: DeserializeOwned>(table: &StatusTable, response: &HttpResponse) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|err| {
        Error::protocol(
            table.operation(),
            Some(response.status.as_u16()),
            format!("undecodable response body: {err}"),
        )
    })
}

fn lookup_json<T: DeserializeOwned>(
    table: &StatusTable,
    response: &HttpResponse,
) -> Result<Option<T>> {
    classify(table, response)?
        .try_map(|()| decode(table, response))
        .map(Outcome::into_option)
}

fn expect_json<T: DeserializeOwned>(table: &StatusTable, response: &HttpResponse) -> Result<T> {
    match classify(table, response)? {
        Outcome::Success(()) => decode(table, response),
        Outcome::NotFound => Err(table.unexpected(response.status.as_u16(), &response.body)),
    }
}

fn expect_done(table: &StatusTable, response: &HttpResponse) -> Result<()> {
    match classify(table, response)? {
        Outcome::Success(()) => Ok(()),
        Outcome::NotFound => Err(table.unexpected(response.status.as_u16(), &response.body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockHttpTransport;
    use crowd_core::ErrorKind;
    use reqwest::StatusCode;

    fn client_with(transport: MockHttpTransport) -> DirectoryClient {
        let config =
            CrowdConfig::new("https://crowd.example.com/crowd/", "app", "hunter2").unwrap();
        DirectoryClient::builder(config)
            .with_transport(Arc::new(transport))
            .build()
            .unwrap()
    }

    fn respond(status: StatusCode, body: &'static str) -> HttpResponse {
        HttpResponse::new(status, body.as_bytes().to_vec())
    }

    #[test]
    fn construction_makes_no_request() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().never();
        let client = client_with(transport);

        assert_eq!(client.base_url(), "https://crowd.example.com/crowd");
        assert_eq!(
            client.rest_root().as_str(),
            "https://crowd.example.com/crowd/rest/usermanagement/1"
        );
        assert_eq!(client.to_string(), "Crowd server at https://crowd.example.com/crowd");
        assert!(!format!("{client:?}").contains("hunter2"));
    }

    #[test]
    fn default_transport_builds_offline() {
        let client =
            DirectoryClient::new("https://crowd.example.com", "app", "secret", false).unwrap();
        assert_eq!(client.nested_max_results(), crowd_core::config::DEFAULT_NESTED_MAX_RESULTS);
    }

    #[tokio::test]
    async fn create_user_missing_email_never_sends() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().never();
        let client = client_with(transport);

        let err = client
            .create_user_from_attributes("jdoe", [("password", "pw")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().unwrap().contains("email"));
    }

    #[tokio::test]
    async fn create_user_unknown_attribute_never_sends() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().never();
        let client = client_with(transport);

        let err = client
            .create_user_from_attributes(
                "jdoe",
                [("email", "jdoe@example.com"), ("password", "pw"), ("nickname", "JD")],
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().unwrap().contains("nickname"));
    }

    #[tokio::test]
    async fn create_group_unknown_attribute_never_sends() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().never();
        let client = client_with(transport);

        let err = client
            .create_group_from_attributes("admins", [("owner", "root")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().unwrap().contains("owner"));
    }

    #[tokio::test]
    async fn empty_username_never_sends() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().never();
        let client = client_with(transport);

        let err = client.get_user("").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn requests_carry_credentials_and_query() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .withf(|request| {
                request.method == Method::GET
                    && request.url.path() == "/crowd/rest/usermanagement/1/user"
                    && request.query_value("username").as_deref() == Some("jdoe")
                    && request.query_value("expand").as_deref() == Some("attributes")
                    && request.credentials.name() == "app"
                    && request.media_type == MediaType::Json
                    && request.body.is_none()
            })
            .times(1)
            .returning(|_| Ok(respond(StatusCode::OK, r#"{"name":"jdoe","active":true}"#)));
        let client = client_with(transport);

        let user = client.get_user("jdoe").await.unwrap().unwrap();
        assert_eq!(user.name, "jdoe");
        assert!(user.active);
    }

    #[tokio::test]
    async fn get_user_missing_is_none() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .returning(|_| Ok(HttpResponse::empty(StatusCode::NOT_FOUND)));
        let client = client_with(transport);

        assert!(client.get_user("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn existence_checks_are_idempotent() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .withf(|request| request.url.path().ends_with("/group"))
            .times(2)
            .returning(|_| Ok(HttpResponse::empty(StatusCode::NOT_FOUND)));
        transport
            .expect_send()
            .withf(|request| request.url.path().ends_with("/user"))
            .times(2)
            .returning(|_| Ok(respond(StatusCode::OK, r#"{"name":"jdoe"}"#)));
        let client = client_with(transport);

        assert!(!client.group_exists("admins").await.unwrap());
        assert!(!client.group_exists("admins").await.unwrap());
        assert!(client.user_exists("jdoe").await.unwrap());
        assert!(client.user_exists("jdoe").await.unwrap());
    }

    #[tokio::test]
    async fn auth_ping_mapping() {
        for (status, expected) in [
            (StatusCode::NOT_FOUND, Some(true)),
            (StatusCode::UNAUTHORIZED, Some(false)),
            (StatusCode::INTERNAL_SERVER_ERROR, None),
        ] {
            let mut transport = MockHttpTransport::new();
            transport
                .expect_send()
                .withf(|request| request.url.path().ends_with("/non-existent/location"))
                .returning(move |_| Ok(HttpResponse::empty(status)));
            let client = client_with(transport);

            match expected {
                Some(value) => assert_eq!(client.auth_ping().await.unwrap(), value),
                None => {
                    let err = client.auth_ping().await.unwrap_err();
                    assert_eq!(err.kind(), ErrorKind::Protocol);
                    assert_eq!(err.status(), Some(500));
                }
            }
        }
    }

    #[tokio::test]
    async fn xml_headers_are_scoped_to_membership_dump() {
        let mut transport = MockHttpTransport::new();
        let mut sequence = mockall::Sequence::new();
        transport
            .expect_send()
            .withf(|request| {
                request.media_type == MediaType::Xml
                    && request.url.path().ends_with("/group/membership")
            })
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| {
                Ok(respond(
                    StatusCode::OK,
                    r#"<memberships><membership group="g"><users><user name="u"/></users></membership></memberships>"#,
                ))
            });
        transport
            .expect_send()
            .withf(|request| request.media_type == MediaType::Json)
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(HttpResponse::empty(StatusCode::NOT_FOUND)));
        let client = client_with(transport);

        let dump = client.group_memberships().await.unwrap().unwrap();
        assert_eq!(dump.group("g").unwrap().users, vec!["u"]);
        assert!(client.get_user("u").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_token_is_a_single_path_segment() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .withf(|request| {
                request.method == Method::DELETE
                    && request.url.path() == "/crowd/rest/usermanagement/1/session/a%2Fb"
            })
            .returning(|_| Ok(HttpResponse::empty(StatusCode::NO_CONTENT)));
        let client = client_with(transport);

        client.terminate_session("a/b").await.unwrap();
    }

    #[tokio::test]
    async fn nested_members_request_single_window() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .withf(|request| {
                request.query_value("start-index").as_deref() == Some("0")
                    && request.query_value("max-results").as_deref() == Some("250")
            })
            .returning(|_| {
                Ok(respond(
                    StatusCode::OK,
                    r#"{"users":[{"name":"jdoe"},{"name":"asmith"}]}"#,
                ))
            });
        let config = CrowdConfig::new("https://crowd.example.com", "app", "secret")
            .unwrap()
            .with_nested_max_results(250);
        let client = DirectoryClient::builder(config)
            .with_transport(Arc::new(transport))
            .build()
            .unwrap();

        let members = client.group_nested_members("devs").await.unwrap().unwrap();
        assert_eq!(members, vec!["jdoe", "asmith"]);
    }

    #[tokio::test]
    async fn undecodable_success_body_is_protocol_error() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .returning(|_| Ok(respond(StatusCode::OK, "<html>maintenance</html>")));
        let client = client_with(transport);

        let err = client.user_direct_groups("jdoe").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(err.status(), Some(200));
        assert_eq!(err.operation(), Some("user_direct_groups"));
    }

    #[tokio::test]
    async fn transport_failure_is_not_retried() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Err(Error::protocol(
                crowd_core::error::TRANSPORT_OPERATION,
                None,
                "connection refused",
            ))
        });
        let client = client_with(transport);

        let err = client.group_exists("admins").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(err.status(), None);
        assert_eq!(err.operation(), Some("group_exists"));
        assert_eq!(err.message(), Some("connection refused"));
    }

    #[tokio::test]
    async fn post_failures_name_the_operation() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Err(Error::protocol(
                crowd_core::error::TRANSPORT_OPERATION,
                None,
                "request timed out",
            ))
        });
        let client = client_with(transport);

        let err = client.add_user_to_group("jdoe", "admins").await.unwrap_err();
        assert_eq!(err.operation(), Some("add_user_to_group"));
    }

    #[tokio::test]
    async fn raw_primitives_keep_transport_label() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Err(Error::protocol(
                crowd_core::error::TRANSPORT_OPERATION,
                None,
                "connection reset",
            ))
        });
        let client = client_with(transport);

        let err = client.get(&["user"], &QueryParams::user("jdoe")).await.unwrap_err();
        assert_eq!(err.operation(), Some(TRANSPORT_OPERATION));
    }

    #[tokio::test]
    async fn add_child_group_names_missing_group() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .returning(|_| Ok(HttpResponse::empty(StatusCode::BAD_REQUEST)));
        let client = client_with(transport);

        let err = client.add_child_group("parent", "child").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GroupNotFound);
        assert!(err.message().unwrap().contains("child"));
    }
}
