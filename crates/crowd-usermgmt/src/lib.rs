//! Crowd user-management client.
//!
//! This crate provides a typed, asynchronous client for the Crowd user-management REST
//! API: application auth checks, user authentication, sessions, users, groups and group
//! memberships. Each operation maps the server's status codes through its own table into
//! a value, an absent sentinel, or a typed [`crowd_core::Error`].

#![deny(missing_docs)]

pub mod client;
pub mod membership;
pub mod models;
pub mod tables;
pub mod transport;

pub use client::{DirectoryClient, DirectoryClientBuilder};
pub use crowd_core::config::{CrowdConfig, TlsVerify, DEFAULT_NESTED_MAX_RESULTS};
pub use crowd_core::{Error, ErrorKind, Outcome};
pub use membership::{GroupMembership, MembershipDump, XmlElement};
pub use models::{
    Attribute, AttributeSet, GroupType, NewGroup, NewUser, NewUserBuilder, Session, User,
    UserField, ValidationFactor,
};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, MediaType, ReqwestTransport};

/// Convenient result alias that reuses the shared Crowd error type.
pub type Result<T> = crowd_core::Result<T>;
