// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar client for itinerary sync.
//!
//! Handles:
//! - Building the OAuth consent URL (itinerary id rides along as `state`)
//! - Exchanging the authorization code for an access token
//! - Inserting the itinerary as a calendar event
//!
//! The core only cares whether sync succeeded and which provider was used;
//! export file generation for other providers lives outside this service.

use crate::config::Config;
use crate::error::AppError;
use crate::models::Itinerary;
use serde::Deserialize;

const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

/// Google Calendar API client.
#[derive(Clone)]
pub struct CalendarService {
    http: reqwest::Client,
    auth_base_url: String,
    token_url: String,
    events_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct EventResponse {
    #[serde(rename = "htmlLink")]
    html_link: Option<String>,
}

impl CalendarService {
    /// Create a new calendar client from OAuth credentials.
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_base_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            events_url: "https://www.googleapis.com/calendar/v3/calendars/primary/events"
                .to_string(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: format!("{}/api/itineraries/google/callback", config.api_url),
        }
    }

    /// Build the Google OAuth consent URL for syncing one itinerary.
    ///
    /// The itinerary id is carried in `state` so the callback knows which
    /// itinerary to mark as synced.
    pub fn auth_url(&self, itinerary_id: &str) -> String {
        format!(
            "{}?\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             access_type=offline&\
             prompt=consent&\
             scope={}&\
             state={}",
            self.auth_base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(CALENDAR_SCOPE),
            urlencoding::encode(itinerary_id),
        )
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Google token exchange failed");
            return Err(AppError::CalendarApi(format!(
                "Token exchange failed ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::CalendarApi(e.to_string()))?;

        Ok(token.access_token)
    }

    /// Insert the itinerary as an event on the user's primary calendar.
    ///
    /// Returns the event link when Google provides one.
    pub async fn insert_event(
        &self,
        access_token: &str,
        itinerary: &Itinerary,
    ) -> Result<Option<String>, AppError> {
        let start = itinerary
            .from
            .clone()
            .unwrap_or_else(crate::time_utils::now_rfc3339);
        let end = itinerary.to.clone().unwrap_or_else(|| start.clone());

        let event = serde_json::json!({
            "summary": itinerary.name,
            "description": format!("Trip with TravaMate by {}", itinerary.owner_id),
            "start": { "dateTime": start },
            "end": { "dateTime": end },
        });

        let response = self
            .http
            .post(&self.events_url)
            .bearer_auth(access_token)
            .json(&event)
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(%status, itinerary_id = %itinerary.id, "Event insert failed");
            return Err(AppError::CalendarApi(format!(
                "Event insert failed ({})",
                status
            )));
        }

        let created: EventResponse = response
            .json()
            .await
            .map_err(|e| AppError::CalendarApi(e.to_string()))?;

        Ok(created.html_link)
    }
}
