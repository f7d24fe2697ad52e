use gather_shared::models::events::AnnouncementKind;
use gather_shared::models::{
    AnnounceRequest, AssignRequest, DelegateCodeResponse, DelegateProfile, Event, EventDetail, EventUpsert,
    GeocodeResult, LeaveGroupRequest, LeaveTaskRequest, MessageResponse, RegisterDelegateRequest,
    RemoveDelegateRequest, RemoveVolunteerRequest, ResetConfirmRequest, ResetRequest, Role,
    SignupRequest, SignupResponse, Task, TaskPayload, Token, VolunteerProfile,
};
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::credentials::{CredentialStore, AUTH_TOKEN_KEY};
use crate::error::ClientError;
use crate::validation;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Client for every Gather endpoint. Calls are plain request/response; the
/// bearer token lives in the credential store under `auth_token`.
pub struct ApiClient<C: CredentialStore> {
    base_url: String,
    http: Client,
    credentials: Arc<C>,
}

impl<C: CredentialStore> ApiClient<C> {
    /// `base_url` includes any stage prefix, e.g. `https://api.example.org/Prod`
    pub fn new(base_url: impl Into<String>, credentials: Arc<C>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Appends path segments to the base URL, percent-encoding each one so
    /// ids cannot smuggle in `/`, `?` or `#`
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let invalid = || ClientError::Validation(format!("Invalid server URL {}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn is_logged_in(&self) -> bool {
        self.credentials.get(AUTH_TOKEN_KEY).is_some()
    }

    fn authed(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.credentials.get(AUTH_TOKEN_KEY).ok_or_else(|| {
            ClientError::Validation("You need to log in first".to_string())
        })?;
        Ok(builder.bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, fallback: &str) -> Result<T> {
        let response = builder.send().await.map_err(|e| {
            warn!("Request failed without a response: {}", e);
            ClientError::transport(e)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(ClientError::transport)?;
        if !status.is_success() {
            debug!("Server answered {}: {}", status, body);
            return Err(ClientError::from_response(status.as_u16(), &body, fallback));
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!("Unexpected response body: {}", e);
            ClientError::Api {
                status: status.as_u16(),
                message: fallback.to_string(),
                code: None,
            }
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, fallback: &str) -> Result<T> {
        let builder = self.authed(self.http.get(url))?;
        self.send(builder, fallback).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, url: Url, fallback: &str) -> Result<T> {
        let builder = self.authed(self.http.post(url))?;
        self.send(builder, fallback).await
    }

    async fn with_json<B, T>(
        &self,
        builder: RequestBuilder,
        body: &B,
        fallback: &str,
    ) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.authed(builder)?.json(body);
        self.send(builder, fallback).await
    }

    // Accounts

    /// OAuth2 password grant; the token is stored on success
    pub async fn login(&self, email: &str, password: &str) -> Result<Token> {
        validation::login(email, password)?;
        let form = [
            ("grant_type", "password"),
            ("username", email.trim()),
            ("password", password),
        ];
        let token: Token = self
            .send(self.http.post(self.url("/token")).form(&form), "Login failed")
            .await?;
        self.credentials.set(AUTH_TOKEN_KEY, &token.access_token);
        Ok(token)
    }

    pub fn logout(&self) {
        self.credentials.remove(AUTH_TOKEN_KEY);
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<SignupResponse> {
        validation::signup(request)?;
        self.send(
            self.http.post(self.url("/signup")).json(request),
            "Sign up failed",
        )
        .await
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<MessageResponse> {
        validation::email(email)?;
        let body = ResetRequest {
            email: email.trim().to_string(),
        };
        self.send(
            self.http.post(self.url("/request-reset")).json(&body),
            "Could not request a password reset",
        )
        .await
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<MessageResponse> {
        validation::required("Reset token", token)?;
        validation::required("New password", new_password)?;
        let body = ResetConfirmRequest {
            token: token.trim().to_string(),
            new_password: new_password.to_string(),
        };
        self.send(
            self.http.post(self.url("/reset")).json(&body),
            "Could not reset the password",
        )
        .await
    }

    // Events

    pub async fn upsert_event(&self, event: &EventUpsert) -> Result<Event> {
        validation::event(event)?;
        self.with_json(self.http.patch(self.url("/event")), event, "Could not save the event")
            .await
    }

    pub async fn list_events(&self, role: Role) -> Result<Vec<Event>> {
        let mut url = self.endpoint(&["events"])?;
        url.query_pairs_mut().append_pair("role", &role.to_string());
        self.get(url, "Could not load events").await
    }

    /// Role-shaped event view. A volunteer without a task gets an error for
    /// which `is_not_assigned()` holds.
    pub async fn event_detail(
        &self,
        event_id: &str,
        role: Role,
        delegate_org_code: Option<&str>,
    ) -> Result<EventDetail> {
        validation::required("Event", event_id)?;
        let mut query = vec![("role", role.to_string())];
        if let Some(code) = delegate_org_code {
            query.push(("delegate_org_code", code.to_string()));
        }
        let builder = self
            .authed(self.http.get(self.endpoint(&["events", event_id.trim()])?))?
            .query(&query);
        self.send(builder, "Could not load the event").await
    }

    /// Organizer broadcast mailed to every member of the event
    pub async fn announce(
        &self,
        event_id: &str,
        kind: AnnouncementKind,
        message: &str,
    ) -> Result<MessageResponse> {
        validation::required("Event", event_id)?;
        validation::required("Message", message)?;
        let url = self.endpoint(&["events", event_id.trim(), "announce"])?;
        let body = AnnounceRequest {
            kind,
            message: message.trim().to_string(),
        };
        self.with_json(self.http.post(url), &body, "Could not send the announcement")
            .await
    }

    pub async fn join_event(&self, code: &str) -> Result<Event> {
        let code = validation::join_code(code)?;
        self.post_empty(self.endpoint(&["event", "join", code.as_str()])?, "Could not join the event")
            .await
    }

    // Tasks

    pub async fn list_tasks(&self, event_id: &str) -> Result<Vec<Task>> {
        validation::required("Event", event_id)?;
        let url = self.endpoint(&["events", event_id.trim(), "tasks"])?;
        self.get(url, "Could not load tasks").await
    }

    pub async fn create_task(&self, event_id: &str, task: &TaskPayload) -> Result<Task> {
        validation::task(task)?;
        let url = self.endpoint(&["events", event_id.trim(), "tasks"])?;
        self.with_json(self.http.post(url), task, "Could not create the task")
            .await
    }

    pub async fn update_task(&self, event_id: &str, task_id: &str, task: &TaskPayload) -> Result<Task> {
        validation::task(task)?;
        let url = self.endpoint(&["events", event_id.trim(), "tasks", task_id.trim()])?;
        self.with_json(self.http.patch(url), task, "Could not update the task")
            .await
    }

    pub async fn assign_delegate(&self, event_id: &str, task_id: &str, delegate_email: &str) -> Result<Task> {
        validation::email(delegate_email)?;
        let url = self.endpoint(&["events", event_id.trim(), "tasks", task_id.trim(), "assign"])?;
        let body = AssignRequest {
            assigned_delegate: delegate_email.trim().to_string(),
        };
        self.with_json(self.http.patch(url), &body, "Could not assign the delegate")
            .await
    }

    pub async fn unassign_delegate(&self, event_id: &str, task_id: &str) -> Result<Task> {
        let url = self.endpoint(&["events", event_id.trim(), "tasks", task_id.trim(), "unassign"])?;
        let builder = self.authed(self.http.patch(url))?;
        self.send(builder, "Could not unassign the delegate").await
    }

    pub async fn join_task(&self, code: &str) -> Result<Task> {
        let code = validation::join_code(code)?;
        self.post_empty(self.endpoint(&["tasks", "join", code.as_str()])?, "Could not join the task")
            .await
    }

    pub async fn leave_task(&self, task_id: &str) -> Result<MessageResponse> {
        let body = LeaveTaskRequest {
            task_id: task_id.to_string(),
        };
        self.with_json(self.http.post(self.url("/tasks/leave")), &body, "Could not leave the task")
            .await
    }

    // Delegates

    pub async fn register_delegate(
        &self,
        organization: &str,
        event_id: Option<&str>,
    ) -> Result<DelegateCodeResponse> {
        validation::required("Organization", organization)?;
        let mut builder = self.http.post(self.url("/delegate/register"));
        if let Some(event_id) = event_id {
            builder = builder.query(&[("event_id", event_id)]);
        }
        let body = RegisterDelegateRequest {
            organization: organization.trim().to_string(),
        };
        self.with_json(builder, &body, "Could not register as a delegate")
            .await
    }

    pub async fn delegate_profile(&self) -> Result<DelegateProfile> {
        self.get(
            self.endpoint(&["delegate", "profile"])?,
            "Could not load your delegate profile",
        )
        .await
    }

    pub async fn attach_delegate(&self, event_ref: &str, org_code: &str) -> Result<DelegateCodeResponse> {
        validation::required("Event", event_ref)?;
        let org_code = validation::join_code(org_code)?;
        self.post_empty(
            self.endpoint(&["delegate", "attach", event_ref.trim(), org_code.as_str()])?,
            "Could not attach to the event",
        )
        .await
    }

    pub async fn leave_delegate_event(&self) -> Result<MessageResponse> {
        self.post_empty(self.endpoint(&["delegate", "leave"])?, "Could not leave the event")
            .await
    }

    pub async fn remove_delegate(&self, event_id: &str, delegate_email: &str) -> Result<MessageResponse> {
        validation::email(delegate_email)?;
        validation::required("Event", event_id)?;
        let url = self.endpoint(&["delegate", "remove", event_id.trim()])?;
        let body = RemoveDelegateRequest {
            delegate_email: delegate_email.trim().to_string(),
        };
        self.with_json(self.http.post(url), &body, "Could not remove the delegate")
            .await
    }

    pub async fn remove_volunteer(&self, volunteer_email: &str) -> Result<MessageResponse> {
        validation::email(volunteer_email)?;
        let body = RemoveVolunteerRequest {
            volunteer_email: volunteer_email.trim().to_string(),
        };
        self.with_json(
            self.http.post(self.url("/delegate/volunteer/remove")),
            &body,
            "Could not remove the volunteer",
        )
        .await
    }

    // Volunteers

    pub async fn join_delegate_group(&self, code: &str) -> Result<VolunteerProfile> {
        let code = validation::join_code(code)?;
        self.post_empty(self.endpoint(&["delegate", "join", code.as_str()])?, "Could not join the group")
            .await
    }

    pub async fn volunteer_profile(&self) -> Result<VolunteerProfile> {
        self.get(
            self.endpoint(&["volunteer", "profile"])?,
            "Could not load your volunteer profile",
        )
        .await
    }

    pub async fn leave_group(&self, request: &LeaveGroupRequest) -> Result<MessageResponse> {
        self.with_json(
            self.http.post(self.url("/volunteer/leave")),
            request,
            "Could not leave the group",
        )
        .await
    }

    pub async fn geocode(&self, address: &str) -> Result<GeocodeResult> {
        validation::required("Address", address)?;
        let builder = self
            .authed(self.http.get(self.url("/geocode")))?
            .query(&[("address", address.trim())]);
        self.send(builder, "Could not find that address").await
    }
}
