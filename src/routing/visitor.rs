use super::route::{PathSpec, QueryRules, Route};
use crate::headers::MediaRange;
use crate::http::Method;

/// Visitor over the routing tree.
///
/// Each criterion method fires once per link responsible for it as the
/// traversal descends; [`resource`] fires once per leaf with the route
/// reconstructed from the criteria accumulated on the way down.
///
/// [`resource`]: RouteVisitor::resource
#[allow(unused_variables)]
pub trait RouteVisitor<R> {
    fn path(&mut self, spec: &PathSpec) {}

    fn method(&mut self, method: Method) {}

    fn consumes(&mut self, range: &MediaRange) {}

    fn produces(&mut self, range: &MediaRange) {}

    fn language(&mut self, tag: &str) {}

    fn queries(&mut self, rules: &QueryRules) {}

    fn resource(&mut self, route: &Route, resource: &R, enabled: bool);
}

/// Collects `(route, resource, enabled)` triples, the default visitor
/// behind `Router::routes`.
pub(crate) struct RouteCollector<R> {
    pub routes: Vec<(Route, R, bool)>,
}

impl<R: Clone> RouteVisitor<R> for RouteCollector<R> {
    fn resource(&mut self, route: &Route, resource: &R, enabled: bool) {
        self.routes.push((route.clone(), resource.clone(), enabled));
    }
}
