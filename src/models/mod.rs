// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod emission;
pub mod summary;
pub mod user;

pub use activity::{Activity, Category, ParseCategoryError};
pub use emission::{ActivityTypeInfo, EmissionFactors, EmissionResult, FactorTableError, CO2_UNIT};
pub use summary::{DailyTrend, EmissionRecord, EmissionSummary, RecordedEmission};
pub use user::User;
