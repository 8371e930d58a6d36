// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod calendar;
pub mod decode;
pub mod enrich;

pub use calendar::CalendarService;
pub use decode::decode_title;
pub use enrich::{enrich_reviews, EnrichedReview, FALLBACK_ATTRACTION_NAME};
