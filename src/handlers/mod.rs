//! Terminal handlers of the route table. Guards have already validated the
//! request and left typed data in its extensions by the time these run.

pub mod auth;
pub mod comments;
pub mod invites;
pub mod metrics;
pub mod notifications;
pub mod pages;
pub mod twitter;
pub mod users;
