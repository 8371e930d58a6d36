// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod attraction;
pub mod itinerary;
pub mod review;
pub mod user;

pub use attraction::{Attraction, SavedAttraction};
pub use itinerary::{CalendarProvider, Itinerary, ItineraryAccess, SyncState};
pub use review::Review;
pub use user::{PublicProfile, User};
