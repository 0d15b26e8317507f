use std::sync::RwLock;

use super::accept::ProducesLink;
use super::content::ConsumesLink;
use super::error::RouteError;
use super::input::RouteInput;
use super::language::LanguageLink;
use super::link::{BoxLink, LinkFactory, ResourceLink};
use super::method::MethodLink;
use super::path::{PathLink, PathPatternLink};
use super::query::QueryLink;
use super::route::Route;
use super::visitor::{RouteCollector, RouteVisitor};

/// The criterion order of a routing chain.
///
/// The chain is built by piping the link constructors together in this
/// order; the last link is the terminal holding the leaf resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    PathExact,
    PathPattern,
    Method,
    Consumes,
    Produces,
    Language,
    Query,
}

/// A chain specification, an ordered list of [`LinkKind`].
#[derive(Debug, Clone)]
pub struct Chain {
    links: Vec<LinkKind>,
}

impl Chain {
    /// The standard order: exact path, path pattern, method, consumes,
    /// produces, language, query.
    pub fn standard() -> Chain {
        Self {
            links: vec![
                LinkKind::PathExact,
                LinkKind::PathPattern,
                LinkKind::Method,
                LinkKind::Consumes,
                LinkKind::Produces,
                LinkKind::Language,
                LinkKind::Query,
            ],
        }
    }

    /// A custom order.
    pub fn new(links: Vec<LinkKind>) -> Chain {
        Self { links }
    }

    /// Pipe the link constructors together, back to front.
    fn build<R: Clone + Send + Sync + 'static>(&self) -> BoxLink<R> {
        let mut factory: LinkFactory<R> = ResourceLink::factory();
        for kind in self.links.iter().rev() {
            factory = match kind {
                LinkKind::PathExact => PathLink::factory(factory),
                LinkKind::PathPattern => PathPatternLink::factory(factory),
                LinkKind::Method => MethodLink::factory(factory),
                LinkKind::Consumes => ConsumesLink::factory(factory),
                LinkKind::Produces => ProducesLink::factory(factory),
                LinkKind::Language => LanguageLink::factory(factory),
                LinkKind::Query => QueryLink::factory(factory),
            };
        }
        factory()
    }
}

impl Default for Chain {
    #[inline]
    fn default() -> Self {
        Self::standard()
    }
}

/// A router dispatching inputs to resources through a chain of routing
/// links.
///
/// Mutations take a coarse write lock; resolves run read-only and in
/// parallel, each acquiring the tree at entry so a concurrent mutation
/// is observed either entirely or not at all.
pub struct Router<R> {
    root: RwLock<BoxLink<R>>,
}

impl<R: Clone + Send + Sync + 'static> Router<R> {
    /// Create a router with the standard chain.
    pub fn new() -> Router<R> {
        Self::with_chain(&Chain::standard())
    }

    /// Create a router with a custom chain order.
    pub fn with_chain(chain: &Chain) -> Router<R> {
        Self {
            root: RwLock::new(chain.build()),
        }
    }

    /// Bind a route to a resource, returning a replaced resource when
    /// the route was already bound.
    pub fn set(&self, route: &Route, resource: R) -> Option<R> {
        let mut root = self.root.write().unwrap();
        let replaced = root.set(route, resource);
        root.refresh_enabled();
        replaced
    }

    /// Unbind a route, pruning links that lost all children and their
    /// resource.
    pub fn remove(&self, route: &Route) -> Option<R> {
        let mut root = self.root.write().unwrap();
        let removed = root.remove(route);
        root.refresh_enabled();
        removed
    }

    /// Enable a route. Returns whether the route was found.
    pub fn enable(&self, route: &Route) -> bool {
        let mut root = self.root.write().unwrap();
        let found = root.set_enabled(route, true);
        root.refresh_enabled();
        found
    }

    /// Disable a route without removing it. Returns whether the route
    /// was found.
    pub fn disable(&self, route: &Route) -> bool {
        let mut root = self.root.write().unwrap();
        let found = root.set_enabled(route, false);
        root.refresh_enabled();
        found
    }

    /// Resolve an input to the best matching resource.
    pub fn resolve(&self, input: &RouteInput) -> Result<R, RouteError> {
        let root = self.root.read().unwrap();
        match root.resolve(input)? {
            Some(resource) => Ok(resource),
            None => Err(RouteError::NotFound),
        }
    }

    /// Enumerate all bound routes with their resources and enabled
    /// state, reconstructed by traversing the chain.
    pub fn routes(&self) -> Vec<(Route, R, bool)> {
        let mut collector = RouteCollector { routes: Vec::new() };
        self.visit(&mut collector);
        collector.routes
    }

    /// Walk the chain with a visitor.
    pub fn visit(&self, visitor: &mut dyn RouteVisitor<R>) {
        let root = self.root.read().unwrap();
        let mut stack = Route::new();
        root.visit(&mut stack, visitor);
    }
}

impl<R: Clone + Send + Sync + 'static> Default for Router<R> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<R> std::fmt::Debug for Router<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").finish_non_exhaustive()
    }
}
