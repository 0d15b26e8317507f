use super::error::RouteError;
use super::input::RouteInput;
use super::link::{BoxLink, Child, Link, LinkFactory};
use super::route::Route;
use super::visitor::RouteVisitor;

/// Routing link matching the request method.
///
/// Absence of any child means "accepts any method"; when children exist
/// and none matches, resolution fails with the allowed set.
pub(crate) struct MethodLink<R> {
    children: Vec<(crate::http::Method, Child<R>)>,
    next: BoxLink<R>,
    next_factory: LinkFactory<R>,
}

impl<R: Clone + Send + Sync + 'static> MethodLink<R> {
    pub(crate) fn factory(next: LinkFactory<R>) -> LinkFactory<R> {
        std::sync::Arc::new(move || {
            Box::new(MethodLink {
                children: Vec::new(),
                next: next(),
                next_factory: next.clone(),
            })
        })
    }
}

impl<R: Clone + Send + Sync + 'static> Link<R> for MethodLink<R> {
    fn can_link(&self, route: &Route) -> bool {
        route.method_spec().is_some()
    }

    fn set(&mut self, route: &Route, resource: R) -> Option<R> {
        match route.method_spec() {
            Some(method) => {
                let at = match self.children.iter().position(|(m, _)| *m == method) {
                    Some(at) => at,
                    None => {
                        self.children.push((method, Child::new(&self.next_factory)));
                        self.children.len() - 1
                    }
                };
                self.children[at].1.link.set(route, resource)
            }
            None => self.next.set(route, resource),
        }
    }

    fn remove(&mut self, route: &Route) -> Option<R> {
        match route.method_spec() {
            Some(method) => {
                let at = self.children.iter().position(|(m, _)| *m == method)?;
                let removed = self.children[at].1.link.remove(route);
                if !self.children[at].1.link.has_resource() {
                    self.children.remove(at);
                }
                removed
            }
            None => self.next.remove(route),
        }
    }

    fn set_enabled(&mut self, route: &Route, enabled: bool) -> bool {
        match route.method_spec() {
            Some(method) => match self.children.iter_mut().find(|(m, _)| *m == method) {
                Some((_, child)) => child.link.set_enabled(route, enabled),
                None => false,
            },
            None => self.next.set_enabled(route, enabled),
        }
    }

    fn resolve(&self, input: &RouteInput) -> Result<Option<R>, RouteError> {
        let mut first_err = None;
        let mut allowed = Vec::new();
        let mut matched = false;

        for (method, child) in &self.children {
            if !child.enabled {
                continue;
            }
            allowed.push(*method);
            if *method != input.method {
                continue;
            }
            matched = true;
            match child.link.resolve(input) {
                Ok(Some(resource)) => return Ok(Some(resource)),
                Ok(None) => {}
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }

        match self.next.resolve(input) {
            Ok(Some(resource)) => return Ok(Some(resource)),
            Ok(None) => {}
            Err(err) => {
                first_err.get_or_insert(err);
            }
        }

        if let Some(err) = first_err {
            return Err(err);
        }
        if !matched && !allowed.is_empty() {
            return Err(RouteError::MethodNotAllowed(allowed));
        }
        Ok(None)
    }

    fn visit(&self, stack: &mut Route, visitor: &mut dyn RouteVisitor<R>) {
        for (method, child) in &self.children {
            visitor.method(*method);
            stack.method = Some(*method);
            child.link.visit(stack, visitor);
            stack.method = None;
        }
        self.next.visit(stack, visitor);
    }

    fn has_resource(&self) -> bool {
        self.children.iter().any(|(_, c)| c.link.has_resource()) || self.next.has_resource()
    }

    fn refresh_enabled(&mut self) -> bool {
        let mut any = false;
        for (_, child) in &mut self.children {
            child.enabled = child.link.refresh_enabled();
            any |= child.enabled;
        }
        any | self.next.refresh_enabled()
    }
}
