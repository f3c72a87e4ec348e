// Copyright 2026 SocialCheck Contributors
// SPDX-License-Identifier: Apache-2.0

//! SocialCheck: discover and validate social-media links for organization
//! domains.
//!
//! The pipeline runs liveness checks, scrapes reachable pages for social
//! links, then renders each link in headless Chromium and classifies it with
//! per-platform rule chains.

pub mod acquisition;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod pipeline;
pub mod renderer;
pub mod report;
pub mod session;
pub mod validator;
