//! HTTP-side collaborators: domain liveness and the social-link anchor scan.
//!
//! Neither touches the browser. Both run on a bounded worker pool and feed
//! the validation stage.

pub mod extractor;
pub mod http_client;
pub mod liveness;
