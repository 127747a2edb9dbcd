// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod advisor;
pub mod calculator;
pub mod password;
pub mod period;

pub use advisor::{AdvisorService, EmissionContext};
pub use calculator::{calculate_total_emissions, CalcError, EmissionCalculator};
pub use period::{daily_trends, Period, PeriodWindow};
