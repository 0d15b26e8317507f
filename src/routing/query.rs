use super::error::RouteError;
use super::input::RouteInput;
use super::link::{BoxLink, Child, Link, LinkFactory};
use super::route::{QueryRules, Route};
use super::visitor::RouteVisitor;

struct QueryChild<R> {
    rules: QueryRules,
    child: Child<R>,
    order: usize,
}

/// Routing link matching query parameter criteria.
///
/// Every matcher of a child must match at least one value of its named
/// parameter. Children are sorted by constraint count descending so the
/// most constrained match wins.
pub(crate) struct QueryLink<R> {
    children: Vec<QueryChild<R>>,
    next_order: usize,
    next: BoxLink<R>,
    next_factory: LinkFactory<R>,
}

impl<R: Clone + Send + Sync + 'static> QueryLink<R> {
    pub(crate) fn factory(next: LinkFactory<R>) -> LinkFactory<R> {
        std::sync::Arc::new(move || {
            Box::new(QueryLink {
                children: Vec::new(),
                next_order: 0,
                next: next(),
                next_factory: next.clone(),
            })
        })
    }

    fn position(&self, rules: &QueryRules) -> Option<usize> {
        self.children.iter().position(|entry| entry.rules == *rules)
    }
}

fn rules_match(rules: &QueryRules, query: &[(String, String)]) -> bool {
    rules.iter().all(|(name, matcher)| {
        query
            .iter()
            .any(|(key, value)| key == name && matcher.matches(value))
    })
}

impl<R: Clone + Send + Sync + 'static> Link<R> for QueryLink<R> {
    fn can_link(&self, route: &Route) -> bool {
        !route.queries.is_empty()
    }

    fn set(&mut self, route: &Route, resource: R) -> Option<R> {
        if route.queries.is_empty() {
            return self.next.set(route, resource);
        }
        let at = match self.position(&route.queries) {
            Some(at) => at,
            None => {
                self.children.push(QueryChild {
                    rules: route.queries.clone(),
                    child: Child::new(&self.next_factory),
                    order: self.next_order,
                });
                self.next_order += 1;
                // most constrained first, declaration order on ties
                self.children.sort_by(|a, b| {
                    b.rules
                        .len()
                        .cmp(&a.rules.len())
                        .then(a.order.cmp(&b.order))
                });
                self.position(&route.queries).expect("just inserted")
            }
        };
        self.children[at].child.link.set(route, resource)
    }

    fn remove(&mut self, route: &Route) -> Option<R> {
        if route.queries.is_empty() {
            return self.next.remove(route);
        }
        let at = self.position(&route.queries)?;
        let removed = self.children[at].child.link.remove(route);
        if !self.children[at].child.link.has_resource() {
            self.children.remove(at);
        }
        removed
    }

    fn set_enabled(&mut self, route: &Route, enabled: bool) -> bool {
        if route.queries.is_empty() {
            return self.next.set_enabled(route, enabled);
        }
        match self.position(&route.queries) {
            Some(at) => self.children[at].child.link.set_enabled(route, enabled),
            None => false,
        }
    }

    fn resolve(&self, input: &RouteInput) -> Result<Option<R>, RouteError> {
        let mut first_err = None;

        for entry in &self.children {
            if !entry.child.enabled || !rules_match(&entry.rules, &input.query) {
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
            visitor.queries(&entry.rules);
            stack.queries = entry.rules.clone();
            entry.child.link.visit(stack, visitor);
            stack.queries = QueryRules::new();
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
