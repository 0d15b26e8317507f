use super::error::RouteError;
use super::input::RouteInput;
use super::link::{BoxLink, Child, Link, LinkFactory};
use super::route::Route;
use super::visitor::RouteVisitor;
use crate::headers::MediaRange;

/// Routing link matching the request `Content-Type` against consumed
/// media ranges.
///
/// Matching children are tried most specific range first. A request
/// whose content type falls outside every consumed range fails with the
/// consumed set.
pub(crate) struct ConsumesLink<R> {
    children: Vec<(MediaRange, Child<R>)>,
    next: BoxLink<R>,
    next_factory: LinkFactory<R>,
}

impl<R: Clone + Send + Sync + 'static> ConsumesLink<R> {
    pub(crate) fn factory(next: LinkFactory<R>) -> LinkFactory<R> {
        std::sync::Arc::new(move || {
            Box::new(ConsumesLink {
                children: Vec::new(),
                next: next(),
                next_factory: next.clone(),
            })
        })
    }
}

impl<R: Clone + Send + Sync + 'static> Link<R> for ConsumesLink<R> {
    fn can_link(&self, route: &Route) -> bool {
        route.consumes.is_some()
    }

    fn set(&mut self, route: &Route, resource: R) -> Option<R> {
        match &route.consumes {
            Some(range) => {
                let at = match self.children.iter().position(|(r, _)| r == range) {
                    Some(at) => at,
                    None => {
                        self.children
                            .push((range.clone(), Child::new(&self.next_factory)));
                        self.children.len() - 1
                    }
                };
                self.children[at].1.link.set(route, resource)
            }
            None => self.next.set(route, resource),
        }
    }

    fn remove(&mut self, route: &Route) -> Option<R> {
        match &route.consumes {
            Some(range) => {
                let at = self.children.iter().position(|(r, _)| r == range)?;
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
        match &route.consumes {
            Some(range) => match self.children.iter_mut().find(|(r, _)| r == range) {
                Some((_, child)) => child.link.set_enabled(route, enabled),
                None => false,
            },
            None => self.next.set_enabled(route, enabled),
        }
    }

    fn resolve(&self, input: &RouteInput) -> Result<Option<R>, RouteError> {
        let mut first_err = None;
        let mut consumed = Vec::new();
        let mut matched = false;

        // matching ranges sorted most specific first, declaration order
        // preserved on ties
        let mut candidates: Vec<usize> = Vec::new();
        for (at, (range, child)) in self.children.iter().enumerate() {
            if !child.enabled {
                continue;
            }
            consumed.push(range.to_string());
            if let Some(content_type) = &input.content_type {
                if range.matches(content_type) {
                    candidates.push(at);
                }
            }
        }
        candidates.sort_by(|&a, &b| {
            self.children[b]
                .0
                .specificity()
                .cmp(&self.children[a].0.specificity())
        });

        for at in candidates {
            matched = true;
            match self.children[at].1.link.resolve(input) {
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
        if !matched && !consumed.is_empty() {
            return Err(RouteError::UnsupportedMediaType(consumed));
        }
        Ok(None)
    }

    fn visit(&self, stack: &mut Route, visitor: &mut dyn RouteVisitor<R>) {
        for (range, child) in &self.children {
            visitor.consumes(range);
            stack.consumes = Some(range.clone());
            child.link.visit(stack, visitor);
            stack.consumes = None;
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
