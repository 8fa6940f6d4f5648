//! Contact form, quote request and newsletter capture.
//!
//! Submissions are held in memory for the life of the process; every field is
//! sanitized or validated before it is stored.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::http::{ApiError, ApiJson, ApiResult};
use crate::security::input::{sanitize_string, validate_email, validate_phone, InputError};

const NAME_MAX_LEN: usize = 100;
const COMPANY_MAX_LEN: usize = 200;
const SERVICE_MAX_LEN: usize = 200;
const MESSAGE_MAX_LEN: usize = 5000;
const BUDGET_MAX_LEN: usize = 100;
const TIMELINE_MAX_LEN: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub service: Option<String>,
    pub message: String,
    pub submitted_at: DateTime<Utc>,
}

/// Lifecycle of a quote request. New requests start out pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Pending,
    Contacted,
    Quoted,
    Closed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub service_of_interest: Option<String>,
    pub project_description: String,
    pub estimated_budget: Option<String>,
    pub timeline: Option<String>,
    pub status: QuoteStatus,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscription {
    pub id: Uuid,
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

/// In-memory capture of contact submissions, quote requests and newsletter
/// subscriptions.
#[derive(Default)]
pub struct SubmissionStore {
    contacts: DashMap<Uuid, ContactSubmission>,
    quotes: DashMap<Uuid, QuoteRequest>,
    newsletter: DashMap<String, NewsletterSubscription>,
}

impl SubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_contact(&self, submission: ContactSubmission) {
        self.contacts.insert(submission.id, submission);
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn record_quote(&self, quote: QuoteRequest) {
        self.quotes.insert(quote.id, quote);
    }

    pub fn quote(&self, id: Uuid) -> Option<QuoteRequest> {
        self.quotes.get(&id).map(|r| r.value().clone())
    }

    pub fn quote_count(&self) -> usize {
        self.quotes.len()
    }

    /// Subscribe `email`, re-activating an existing inactive subscription.
    /// Returns the subscription and whether it was newly created.
    pub fn subscribe(&self, email: String, now: DateTime<Utc>) -> (NewsletterSubscription, bool) {
        let mut created = false;
        let mut entry = self.newsletter.entry(email.clone()).or_insert_with(|| {
            created = true;
            NewsletterSubscription {
                id: Uuid::new_v4(),
                email,
                subscribed_at: now,
                updated_at: now,
                is_active: true,
            }
        });
        if !entry.is_active {
            entry.is_active = true;
            entry.updated_at = now;
        }
        (entry.clone(), created)
    }

    /// Mark a subscription inactive. Returns `None` for unknown addresses.
    pub fn unsubscribe(&self, email: &str, now: DateTime<Utc>) -> Option<NewsletterSubscription> {
        let mut entry = self.newsletter.get_mut(email)?;
        if entry.is_active {
            entry.is_active = false;
            entry.updated_at = now;
        }
        Some(entry.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequestForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub service_of_interest: Option<String>,
    pub project_description: String,
    #[serde(default)]
    pub estimated_budget: Option<String>,
    #[serde(default)]
    pub timeline: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewsletterRequest {
    pub email: String,
}

fn required(field: &'static str, value: &str, max: usize) -> ApiResult<String> {
    let cleaned = sanitize_string(value, max).map_err(|e| ApiError::invalid(field, e))?;
    if cleaned.is_empty() {
        return Err(ApiError::invalid(field, InputError::InvalidFormat { field }));
    }
    Ok(cleaned)
}

fn optional(field: &'static str, value: Option<String>, max: usize) -> ApiResult<Option<String>> {
    match value {
        Some(v) => {
            let cleaned = sanitize_string(&v, max).map_err(|e| ApiError::invalid(field, e))?;
            Ok((!cleaned.is_empty()).then_some(cleaned))
        }
        None => Ok(None),
    }
}

fn optional_phone(value: Option<&str>) -> ApiResult<Option<String>> {
    match value.map(str::trim) {
        Some(phone) if !phone.is_empty() => {
            Ok(Some(validate_phone(phone).map_err(|e| ApiError::invalid("phone", e))?))
        }
        _ => Ok(None),
    }
}

pub async fn submit_contact(
    State(store): State<Arc<SubmissionStore>>,
    State(clock): State<Arc<dyn Clock>>,
    ApiJson(request): ApiJson<ContactRequest>,
) -> ApiResult<(StatusCode, Json<ContactSubmission>)> {
    let submission = ContactSubmission {
        id: Uuid::new_v4(),
        name: required("name", &request.name, NAME_MAX_LEN)?,
        email: validate_email(&request.email).map_err(|e| ApiError::invalid("email", e))?,
        phone: optional_phone(request.phone.as_deref())?,
        company: optional("company", request.company, COMPANY_MAX_LEN)?,
        service: optional("service", request.service, SERVICE_MAX_LEN)?,
        message: required("message", &request.message, MESSAGE_MAX_LEN)?,
        submitted_at: clock.now(),
    };

    store.record_contact(submission.clone());
    tracing::info!(submission = %submission.id, "Contact form received");
    Ok((StatusCode::CREATED, Json(submission)))
}

pub async fn submit_quote(
    State(store): State<Arc<SubmissionStore>>,
    State(clock): State<Arc<dyn Clock>>,
    ApiJson(request): ApiJson<QuoteRequestForm>,
) -> ApiResult<(StatusCode, Json<QuoteRequest>)> {
    let quote = QuoteRequest {
        id: Uuid::new_v4(),
        name: required("name", &request.name, NAME_MAX_LEN)?,
        email: validate_email(&request.email).map_err(|e| ApiError::invalid("email", e))?,
        phone: optional_phone(request.phone.as_deref())?,
        company: optional("company", request.company, COMPANY_MAX_LEN)?,
        service_of_interest: optional(
            "service_of_interest",
            request.service_of_interest,
            SERVICE_MAX_LEN,
        )?,
        project_description: required(
            "project_description",
            &request.project_description,
            MESSAGE_MAX_LEN,
        )?,
        estimated_budget: optional("estimated_budget", request.estimated_budget, BUDGET_MAX_LEN)?,
        timeline: optional("timeline", request.timeline, TIMELINE_MAX_LEN)?,
        status: QuoteStatus::Pending,
        submitted_at: clock.now(),
    };

    store.record_quote(quote.clone());
    tracing::info!(quote = %quote.id, "Quote request received");
    Ok((StatusCode::CREATED, Json(quote)))
}

pub async fn subscribe(
    State(store): State<Arc<SubmissionStore>>,
    State(clock): State<Arc<dyn Clock>>,
    ApiJson(request): ApiJson<NewsletterRequest>,
) -> ApiResult<(StatusCode, Json<NewsletterSubscription>)> {
    let email = validate_email(&request.email).map_err(|e| ApiError::invalid("email", e))?;
    let (subscription, created) = store.subscribe(email, clock.now());
    if created {
        tracing::info!(subscription = %subscription.id, "Newsletter subscription created");
    }
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn unsubscribe(
    State(store): State<Arc<SubmissionStore>>,
    State(clock): State<Arc<dyn Clock>>,
    ApiJson(request): ApiJson<NewsletterRequest>,
) -> ApiResult<Json<NewsletterSubscription>> {
    let email = validate_email(&request.email).map_err(|e| ApiError::invalid("email", e))?;
    store
        .unsubscribe(&email, clock.now())
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Subscription not found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_subscribe_is_idempotent() {
        let store = SubmissionStore::new();
        let now = Utc::now();

        let (first, created) = store.subscribe("a@example.com".into(), now);
        assert!(created);
        let (second, created) = store.subscribe("a@example.com".into(), now + Duration::seconds(5));
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(second.updated_at, now);
    }

    #[test]
    fn test_resubscribe_reactivates() {
        let store = SubmissionStore::new();
        let now = Utc::now();
        let (original, _) = store.subscribe("a@example.com".into(), now);

        let later = now + Duration::days(1);
        let inactive = store.unsubscribe("a@example.com", later).unwrap();
        assert!(!inactive.is_active);

        let even_later = later + Duration::days(1);
        let (again, created) = store.subscribe("a@example.com".into(), even_later);
        assert!(!created);
        assert!(again.is_active);
        assert_eq!(again.id, original.id);
        assert_eq!(again.subscribed_at, now);
        assert_eq!(again.updated_at, even_later);
    }

    #[test]
    fn test_unsubscribe_unknown() {
        let store = SubmissionStore::new();
        assert!(store.unsubscribe("nobody@example.com", Utc::now()).is_none());
    }

    fn quote_form() -> QuoteRequestForm {
        QuoteRequestForm {
            name: " Grace ".into(),
            email: "Grace@Example.com".into(),
            phone: Some("+1 (555) 010-2030".into()),
            company: Some("  ".into()),
            service_of_interest: Some("Fit-out".into()),
            project_description: "Two floors\u{0000} of shelving".into(),
            estimated_budget: None,
            timeline: Some("Q3".into()),
        }
    }

    #[tokio::test]
    async fn test_quote_request_is_cleaned_and_pending() {
        let store = Arc::new(SubmissionStore::new());
        let clock: Arc<dyn Clock> = Arc::new(crate::clock::ManualClock::default());

        let (status, Json(quote)) =
            submit_quote(State(store.clone()), State(clock.clone()), ApiJson(quote_form()))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(quote.name, "Grace");
        assert_eq!(quote.email, "grace@example.com");
        assert_eq!(quote.phone.as_deref(), Some("+15550102030"));
        assert_eq!(quote.company, None);
        assert_eq!(quote.project_description, "Two floors of shelving");
        assert_eq!(quote.status, QuoteStatus::Pending);
        assert_eq!(quote.submitted_at, clock.now());
        assert_eq!(store.quote(quote.id).unwrap().timeline.as_deref(), Some("Q3"));

        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["serviceOfInterest"], "Fit-out");
    }

    #[tokio::test]
    async fn test_quote_request_rejections_name_the_field() {
        let store = Arc::new(SubmissionStore::new());
        let clock: Arc<dyn Clock> = Arc::new(crate::clock::ManualClock::default());

        let mut blank = quote_form();
        blank.project_description = " \t ".into();
        let err = submit_quote(State(store.clone()), State(clock.clone()), ApiJson(blank))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Invalid { field: Some("project_description"), .. }));

        let mut bad_phone = quote_form();
        bad_phone.phone = Some("call me".into());
        let err = submit_quote(State(store.clone()), State(clock), ApiJson(bad_phone))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Invalid { field: Some("phone"), .. }));
        assert_eq!(store.quote_count(), 0);
    }

    #[test]
    fn test_field_helpers() {
        assert_eq!(required("name", "  Ada \u{0007}", 100).unwrap(), "Ada");
        assert!(matches!(
            required("name", "   ", 100),
            Err(ApiError::Invalid { field: Some("name"), .. })
        ));
        assert!(matches!(
            required("message", &"x".repeat(11), 10),
            Err(ApiError::Invalid { field: Some("message"), source: InputError::TooLong { max: 10 } })
        ));
        assert_eq!(optional("company", Some("  ".into()), 10).unwrap(), None);
        assert_eq!(optional("company", None, 10).unwrap(), None);
        assert_eq!(optional("company", Some(" Acme ".into()), 10).unwrap(), Some("Acme".into()));
    }
}
