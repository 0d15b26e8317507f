use super::error::RouteError;
use super::input::RouteInput;
use super::link::{BoxLink, Child, Link, LinkFactory};
use super::route::Route;
use super::visitor::RouteVisitor;
use crate::headers::MediaRange;

/// Routing link matching produced media types against the request
/// `Accept`.
///
/// The accept ranges are already sorted best first (quality, then range
/// specificity, then declaration order); per accept range, producing
/// children are tried most specific produced type first. When a selected
/// child fails to resolve, the ordered match list continues.
pub(crate) struct ProducesLink<R> {
    children: Vec<(MediaRange, Child<R>)>,
    next: BoxLink<R>,
    next_factory: LinkFactory<R>,
}

impl<R: Clone + Send + Sync + 'static> ProducesLink<R> {
    pub(crate) fn factory(next: LinkFactory<R>) -> LinkFactory<R> {
        std::sync::Arc::new(move || {
            Box::new(ProducesLink {
                children: Vec::new(),
                next: next(),
                next_factory: next.clone(),
            })
        })
    }
}

impl<R: Clone + Send + Sync + 'static> Link<R> for ProducesLink<R> {
    fn can_link(&self, route: &Route) -> bool {
        route.produces.is_some()
    }

    fn set(&mut self, route: &Route, resource: R) -> Option<R> {
        match &route.produces {
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
        match &route.produces {
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
        match &route.produces {
            Some(range) => match self.children.iter_mut().find(|(r, _)| r == range) {
                Some((_, child)) => child.link.set_enabled(route, enabled),
                None => false,
            },
            None => self.next.set_enabled(route, enabled),
        }
    }

    fn resolve(&self, input: &RouteInput) -> Result<Option<R>, RouteError> {
        let mut first_err = None;
        let mut matched = false;
        let mut visited = vec![false; self.children.len()];

        for accept in input.accept.ranges() {
            if accept.q() == 0 {
                // explicitly not acceptable
                continue;
            }
            // producing children for this accept range, most specific
            // produced type first
            let mut candidates: Vec<usize> = self
                .children
                .iter()
                .enumerate()
                .filter(|(at, (produced, child))| {
                    child.enabled && !visited[*at] && accept.includes(produced)
                })
                .map(|(at, _)| at)
                .collect();
            candidates.sort_by(|&a, &b| {
                self.children[b]
                    .0
                    .specificity()
                    .cmp(&self.children[a].0.specificity())
            });

            for at in candidates {
                visited[at] = true;
                matched = true;
                match self.children[at].1.link.resolve(input) {
                    Ok(Some(resource)) => return Ok(Some(resource)),
                    Ok(None) => {}
                    Err(err) => {
                        first_err.get_or_insert(err);
                    }
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
        if !matched {
            let produced: Vec<String> = self
                .children
                .iter()
                .filter(|(_, child)| child.enabled)
                .map(|(range, _)| range.to_string())
                .collect();
            if !produced.is_empty() {
                return Err(RouteError::NotAcceptable(produced));
            }
        }
        Ok(None)
    }

    fn visit(&self, stack: &mut Route, visitor: &mut dyn RouteVisitor<R>) {
        for (range, child) in &self.children {
            visitor.produces(range);
            stack.produces = Some(range.clone());
            child.link.visit(stack, visitor);
            stack.produces = None;
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
