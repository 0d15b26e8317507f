use std::sync::Arc;

use super::error::RouteError;
use super::input::RouteInput;
use super::route::Route;
use super::visitor::RouteVisitor;

pub(crate) type BoxLink<R> = Box<dyn Link<R>>;

/// Creates the rest of the chain below a link, used whenever a new
/// criterion value needs its own subtree.
pub(crate) type LinkFactory<R> = Arc<dyn Fn() -> BoxLink<R> + Send + Sync>;

/// A node in the routing tree, responsible for one criterion.
///
/// Each implementation owns a child per criterion value plus a default
/// next link handling routes that do not define the criterion.
pub(crate) trait Link<R: Clone + Send + Sync + 'static>: Send + Sync {
    /// Whether this link's criterion is set on the route.
    fn can_link(&self, route: &Route) -> bool;

    /// Descend and store the resource at the leaf, returning a replaced
    /// one.
    fn set(&mut self, route: &Route, resource: R) -> Option<R>;

    /// Descend and remove the leaf resource; empty children are pruned
    /// on the way back up.
    fn remove(&mut self, route: &Route) -> Option<R>;

    /// Descend and flip the leaf's enabled flag. Returns whether the
    /// route was found.
    fn set_enabled(&mut self, route: &Route, enabled: bool) -> bool;

    /// Resolve the best matching resource for the input.
    ///
    /// `Ok(None)` means "nothing here", letting the caller fall back;
    /// an error is a definite taxonomy outcome (405, 415, 406).
    fn resolve(&self, input: &RouteInput) -> Result<Option<R>, RouteError>;

    /// Walk every route, calling the visitor once per link responsible
    /// for each criterion and once per leaf.
    fn visit(&self, stack: &mut Route, visitor: &mut dyn RouteVisitor<R>);

    /// Whether any resource lives in this subtree.
    fn has_resource(&self) -> bool;

    /// Rebuild the enabled-children caches. Returns whether the subtree
    /// holds an enabled resource.
    fn refresh_enabled(&mut self) -> bool;
}

/// A child subtree plus its cached enabled state.
pub(crate) struct Child<R> {
    pub link: BoxLink<R>,
    /// Cache: the subtree holds at least one enabled resource.
    pub enabled: bool,
}

impl<R: Clone + Send + Sync + 'static> Child<R> {
    pub(crate) fn new(factory: &LinkFactory<R>) -> Child<R> {
        Self {
            link: factory(),
            enabled: true,
        }
    }
}

// ===== Terminal =====

/// Chain terminal holding the leaf resource.
pub(crate) struct ResourceLink<R> {
    resource: Option<R>,
    enabled: bool,
}

impl<R: Clone + Send + Sync + 'static> ResourceLink<R> {
    pub(crate) fn factory() -> LinkFactory<R> {
        Arc::new(|| {
            Box::new(ResourceLink {
                resource: None,
                enabled: true,
            })
        })
    }
}

impl<R: Clone + Send + Sync + 'static> Link<R> for ResourceLink<R> {
    fn can_link(&self, _: &Route) -> bool {
        false
    }

    fn set(&mut self, _: &Route, resource: R) -> Option<R> {
        self.enabled = true;
        self.resource.replace(resource)
    }

    fn remove(&mut self, _: &Route) -> Option<R> {
        self.resource.take()
    }

    fn set_enabled(&mut self, _: &Route, enabled: bool) -> bool {
        if self.resource.is_some() {
            self.enabled = enabled;
            true
        } else {
            false
        }
    }

    fn resolve(&self, _: &RouteInput) -> Result<Option<R>, RouteError> {
        Ok(match self.enabled {
            true => self.resource.clone(),
            false => None,
        })
    }

    fn visit(&self, stack: &mut Route, visitor: &mut dyn RouteVisitor<R>) {
        if let Some(resource) = &self.resource {
            visitor.resource(stack, resource, self.enabled);
        }
    }

    fn has_resource(&self) -> bool {
        self.resource.is_some()
    }

    fn refresh_enabled(&mut self) -> bool {
        self.resource.is_some() && self.enabled
    }
}
