use super::error::RouteError;
use super::input::RouteInput;
use super::link::{BoxLink, Child, Link, LinkFactory};
use super::route::Route;
use super::visitor::RouteVisitor;
use crate::headers::LanguageMatch;

/// Routing link matching configured language tags against the request
/// `Accept-Language`.
///
/// Per requested range an exact tag wins over a broader prefix tag,
/// which wins over the `*` wildcard.
pub(crate) struct LanguageLink<R> {
    children: Vec<(String, Child<R>)>,
    next: BoxLink<R>,
    next_factory: LinkFactory<R>,
}

impl<R: Clone + Send + Sync + 'static> LanguageLink<R> {
    pub(crate) fn factory(next: LinkFactory<R>) -> LinkFactory<R> {
        std::sync::Arc::new(move || {
            Box::new(LanguageLink {
                children: Vec::new(),
                next: next(),
                next_factory: next.clone(),
            })
        })
    }
}

impl<R: Clone + Send + Sync + 'static> Link<R> for LanguageLink<R> {
    fn can_link(&self, route: &Route) -> bool {
        route.language.is_some()
    }

    fn set(&mut self, route: &Route, resource: R) -> Option<R> {
        match &route.language {
            Some(tag) => {
                let at = match self.children.iter().position(|(t, _)| t == tag) {
                    Some(at) => at,
                    None => {
                        self.children
                            .push((tag.clone(), Child::new(&self.next_factory)));
                        self.children.len() - 1
                    }
                };
                self.children[at].1.link.set(route, resource)
            }
            None => self.next.set(route, resource),
        }
    }

    fn remove(&mut self, route: &Route) -> Option<R> {
        match &route.language {
            Some(tag) => {
                let at = self.children.iter().position(|(t, _)| t == tag)?;
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
        match &route.language {
            Some(tag) => match self.children.iter_mut().find(|(t, _)| t == tag) {
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

        for requested in input.accept_language.ranges() {
            if requested.q() == 0 {
                continue;
            }
            // children for this range, best match quality first,
            // declaration order preserved on ties
            let mut candidates: Vec<(usize, LanguageMatch)> = self
                .children
                .iter()
                .enumerate()
                .filter(|(at, (_, child))| child.enabled && !visited[*at])
                .filter_map(|(at, (tag, _))| requested.match_tag(tag).map(|quality| (at, quality)))
                .collect();
            candidates.sort_by(|a, b| b.1.cmp(&a.1));

            for (at, _) in candidates {
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
            let tags: Vec<String> = self
                .children
                .iter()
                .filter(|(_, child)| child.enabled)
                .map(|(tag, _)| tag.clone())
                .collect();
            if !tags.is_empty() {
                return Err(RouteError::NotAcceptable(tags));
            }
        }
        Ok(None)
    }

    fn visit(&self, stack: &mut Route, visitor: &mut dyn RouteVisitor<R>) {
        for (tag, child) in &self.children {
            visitor.language(tag);
            stack.language = Some(tag.clone());
            child.link.visit(stack, visitor);
            stack.language = None;
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
