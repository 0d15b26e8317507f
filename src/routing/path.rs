use std::collections::HashMap;

use super::error::RouteError;
use super::input::RouteInput;
use super::link::{BoxLink, Child, Link, LinkFactory};
use super::route::{PathPattern, PathSpec, Route};
use super::visitor::RouteVisitor;

// ===== Exact path =====

/// Routing link matching the normalised path exactly.
///
/// Children are keyed by `(path, trailing-slash flag)`; with the flag
/// set, `/x` and `/x/` route to the same resource.
pub(crate) struct PathLink<R> {
    children: HashMap<(String, bool), Child<R>>,
    next: BoxLink<R>,
    next_factory: LinkFactory<R>,
}

impl<R: Clone + Send + Sync + 'static> PathLink<R> {
    pub(crate) fn factory(next: LinkFactory<R>) -> LinkFactory<R> {
        std::sync::Arc::new(move || {
            Box::new(PathLink {
                children: HashMap::new(),
                next: next(),
                next_factory: next.clone(),
            })
        })
    }

    fn key(route: &Route) -> Option<(String, bool)> {
        match route.path_spec() {
            Some(PathSpec::Exact {
                path,
                trailing_slash,
            }) => Some((path.clone(), *trailing_slash)),
            _ => None,
        }
    }
}

impl<R: Clone + Send + Sync + 'static> Link<R> for PathLink<R> {
    fn can_link(&self, route: &Route) -> bool {
        matches!(route.path_spec(), Some(PathSpec::Exact { .. }))
    }

    fn set(&mut self, route: &Route, resource: R) -> Option<R> {
        match Self::key(route) {
            Some(key) => {
                let factory = self.next_factory.clone();
                self.children
                    .entry(key)
                    .or_insert_with(|| Child::new(&factory))
                    .link
                    .set(route, resource)
            }
            None => self.next.set(route, resource),
        }
    }

    fn remove(&mut self, route: &Route) -> Option<R> {
        match Self::key(route) {
            Some(key) => {
                let child = self.children.get_mut(&key)?;
                let removed = child.link.remove(route);
                if !child.link.has_resource() {
                    self.children.remove(&key);
                }
                removed
            }
            None => self.next.remove(route),
        }
    }

    fn set_enabled(&mut self, route: &Route, enabled: bool) -> bool {
        match Self::key(route) {
            Some(key) => match self.children.get_mut(&key) {
                Some(child) => child.link.set_enabled(route, enabled),
                None => false,
            },
            None => self.next.set_enabled(route, enabled),
        }
    }

    fn resolve(&self, input: &RouteInput) -> Result<Option<R>, RouteError> {
        let mut first_err = None;

        // exact key first, then the trailing-slash tolerant forms
        let lookup = |key: &(String, bool)| -> Result<Option<R>, RouteError> {
            match self.children.get(key) {
                Some(child) if child.enabled => child.link.resolve(input),
                _ => Ok(None),
            }
        };

        let path = input.path.as_str();
        let mut keys = Vec::with_capacity(3);
        keys.push((path.to_owned(), false));
        keys.push((path.to_owned(), true));
        if path != "/" {
            match path.strip_suffix('/') {
                Some(trimmed) => keys.push((trimmed.to_owned(), true)),
                None => keys.push((format!("{path}/"), true)),
            }
        }

        for key in &keys {
            match lookup(key) {
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

        match first_err {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }

    fn visit(&self, stack: &mut Route, visitor: &mut dyn RouteVisitor<R>) {
        for ((path, trailing_slash), child) in &self.children {
            let spec = PathSpec::Exact {
                path: path.clone(),
                trailing_slash: *trailing_slash,
            };
            visitor.path(&spec);
            stack.path = Some(spec);
            child.link.visit(stack, visitor);
            stack.path = None;
        }
        self.next.visit(stack, visitor);
    }

    fn has_resource(&self) -> bool {
        self.children.values().any(|c| c.link.has_resource()) || self.next.has_resource()
    }

    fn refresh_enabled(&mut self) -> bool {
        let mut any = false;
        for child in self.children.values_mut() {
            child.enabled = child.link.refresh_enabled();
            any |= child.enabled;
        }
        any | self.next.refresh_enabled()
    }
}

// ===== Path pattern =====

struct PatternChild<R> {
    pattern: PathPattern,
    trailing_slash: bool,
    child: Child<R>,
    order: usize,
}

/// Routing link matching parameterised path templates.
///
/// Children are kept sorted by specificity: a longer literal prefix
/// beats a shorter one, a literal segment beats a parameter, a
/// constrained parameter beats an unconstrained one, ties keep
/// declaration order.
pub(crate) struct PathPatternLink<R> {
    children: Vec<PatternChild<R>>,
    next_order: usize,
    next: BoxLink<R>,
    next_factory: LinkFactory<R>,
}

impl<R: Clone + Send + Sync + 'static> PathPatternLink<R> {
    pub(crate) fn factory(next: LinkFactory<R>) -> LinkFactory<R> {
        std::sync::Arc::new(move || {
            Box::new(PathPatternLink {
                children: Vec::new(),
                next_order: 0,
                next: next(),
                next_factory: next.clone(),
            })
        })
    }

    fn position(&self, route: &Route) -> Option<usize> {
        let Some(PathSpec::Pattern {
            pattern,
            trailing_slash,
        }) = route.path_spec()
        else {
            return None;
        };
        self.children.iter().position(|entry| {
            entry.pattern == *pattern && entry.trailing_slash == *trailing_slash
        })
    }
}

impl<R: Clone + Send + Sync + 'static> Link<R> for PathPatternLink<R> {
    fn can_link(&self, route: &Route) -> bool {
        matches!(route.path_spec(), Some(PathSpec::Pattern { .. }))
    }

    fn set(&mut self, route: &Route, resource: R) -> Option<R> {
        let Some(PathSpec::Pattern {
            pattern,
            trailing_slash,
        }) = route.path_spec()
        else {
            return self.next.set(route, resource);
        };

        let at = match self.position(route) {
            Some(at) => at,
            None => {
                self.children.push(PatternChild {
                    pattern: pattern.clone(),
                    trailing_slash: *trailing_slash,
                    child: Child::new(&self.next_factory),
                    order: self.next_order,
                });
                self.next_order += 1;
                self.children.sort_by(|a, b| {
                    a.pattern
                        .cmp_specificity(&b.pattern)
                        .then(a.order.cmp(&b.order))
                });
                self.position(route).expect("just inserted")
            }
        };
        self.children[at].child.link.set(route, resource)
    }

    fn remove(&mut self, route: &Route) -> Option<R> {
        match self.position(route) {
            Some(at) => {
                let removed = self.children[at].child.link.remove(route);
                if !self.children[at].child.link.has_resource() {
                    self.children.remove(at);
                }
                removed
            }
            None if route.path_spec().is_none() => self.next.remove(route),
            None => None,
        }
    }

    fn set_enabled(&mut self, route: &Route, enabled: bool) -> bool {
        match self.position(route) {
            Some(at) => self.children[at].child.link.set_enabled(route, enabled),
            None if route.path_spec().is_none() => self.next.set_enabled(route, enabled),
            None => false,
        }
    }

    fn resolve(&self, input: &RouteInput) -> Result<Option<R>, RouteError> {
        let mut first_err = None;

        for entry in &self.children {
            if !entry.child.enabled {
                continue;
            }
            if entry
                .pattern
                .captures(&input.path, entry.trailing_slash)
                .is_none()
            {
                continue;
            }
            match entry.child.link.resolve(input) {
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

        match first_err {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }

    fn visit(&self, stack: &mut Route, visitor: &mut dyn RouteVisitor<R>) {
        for entry in &self.children {
            let spec = PathSpec::Pattern {
                pattern: entry.pattern.clone(),
                trailing_slash: entry.trailing_slash,
            };
            visitor.path(&spec);
            stack.path = Some(spec);
            entry.child.link.visit(stack, visitor);
            stack.path = None;
        }
        self.next.visit(stack, visitor);
    }

    fn has_resource(&self) -> bool {
        self.children.iter().any(|e| e.child.link.has_resource()) || self.next.has_resource()
    }

    fn refresh_enabled(&mut self) -> bool {
        let mut any = false;
        for entry in &mut self.children {
            entry.child.enabled = entry.child.link.refresh_enabled();
            any |= entry.child.enabled;
        }
        any | self.next.refresh_enabled()
    }
}
