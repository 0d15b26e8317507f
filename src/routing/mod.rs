//! Criteria based request dispatch.
//!
//! A [`Router`] is a tree of routing links arranged in a fixed order,
//! each link matching one criterion of a [`Route`]: path, method, content
//! type, produced media type, accepted language, query parameters. Routes
//! that do not define a link's criterion flow through its default next
//! link.
//!
//! [`service::WebRouter`] binds the router to handler resources and maps
//! resolution errors to HTTP responses.
mod route;
mod input;
mod link;
mod visitor;

// criterion links
mod path;
mod method;
mod content;
mod accept;
mod language;
mod query;

mod router;
pub mod service;

pub mod error;

pub use error::RouteError;
pub use input::RouteInput;
pub use route::{PathPattern, PathSpec, QueryMatcher, QueryRules, Route};
pub use router::{Chain, LinkKind, Router};
pub use visitor::RouteVisitor;

#[doc(inline)]
pub use service::{Handler, PathParams, Resource, WebRouter};

#[cfg(test)]
mod test;
