//! Segment trie for route resolution.
//!
//! Each node owns its constant children, at most one parameter child, at most one
//! wildcard child, and the bindings of routes that end at the node (`routes`) or that
//! end in a catchall directly below it (`catchall`).
//!
//! ## Search order
//!
//! At every level the matcher tries, in order, the constant child whose text equals
//! the segment, the parameter child, the wildcard child, and finally the catchall
//! bindings. A branch that fails further down is abandoned and the next option is
//! tried, so `/foo/bar/baz` prefers a constant route but still falls back to
//! `/foo/:x/baz` or `/foo/**` when the constant branch dead-ends.
//!
//! Terminals reached with bindings for other methods contribute to the allowed set
//! reported when no binding matches the requested method.
//!
//! The trie is immutable once serving starts, so lookups take `&self` and need no
//! synchronization.

use super::core::Route;
use super::pattern::RoutePattern;
use super::segment::{PatternToken, SegmentMatch};
use crate::config::CaseSensitivity;
use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;

type Binding = (Method, Arc<Route>);

/// Raw parameter values collected along the search path, in pattern order.
pub(crate) type Captures<'p> = SmallVec<[&'p str; 8]>;

/// Methods seen on terminals that did not bind the requested method.
pub(crate) type AllowedMethods = SmallVec<[Method; 4]>;

/// Successful search.
#[derive(Debug)]
pub(crate) struct Hit<'t, 'p> {
    pub route: &'t Arc<Route>,
    /// Segments consumed by a catchall; empty otherwise
    pub tail: &'p [&'p str],
}

/// Registration clash at a terminal.
#[derive(Debug)]
pub(crate) enum Insert {
    Added,
    /// An identical route is already bound
    Unchanged,
    /// A different route owns this method at the same position
    Conflict(Arc<Route>),
    /// A route of the same method names the parameter at this position differently
    NameConflict(Arc<Route>),
}

#[derive(Debug)]
struct Node {
    /// Token leading to this node. A parameter node keeps the name of the first
    /// route registered through it; matched routes resolve their own names.
    token: PatternToken,
    /// Parameter name used by each method through this node, with the route that
    /// introduced it
    names: Vec<(Arc<str>, Arc<Route>)>,
    constants: Vec<Node>,
    parameter: Option<Box<Node>>,
    wildcard: Option<Box<Node>>,
    catchall: Vec<Binding>,
    routes: Vec<Binding>,
}

fn lookup<'t>(bindings: &'t [Binding], method: &Method) -> Option<&'t Arc<Route>> {
    bindings
        .iter()
        .find(|(m, _)| m == method)
        .map(|(_, route)| route)
}

fn bind(bindings: &mut Vec<Binding>, route: Arc<Route>) -> Insert {
    match bindings.iter().find(|(m, _)| *m == route.method) {
        Some((_, existing))
            if existing.pattern == route.pattern && existing.handler == route.handler =>
        {
            Insert::Unchanged
        }
        Some((_, existing)) => Insert::Conflict(Arc::clone(existing)),
        None => {
            bindings.push((route.method.clone(), route));
            Insert::Added
        }
    }
}

impl Node {
    fn new(token: PatternToken) -> Self {
        Self {
            token,
            names: Vec::new(),
            constants: Vec::new(),
            parameter: None,
            wildcard: None,
            catchall: Vec::new(),
            routes: Vec::new(),
        }
    }

    fn root() -> Self {
        Self::new(PatternToken::Constant(Arc::from("")))
    }

    fn insert(
        &mut self,
        tokens: &[PatternToken],
        route: Arc<Route>,
        case: CaseSensitivity,
    ) -> Insert {
        let Some((token, rest)) = tokens.split_first() else {
            return bind(&mut self.routes, route);
        };

        match token {
            PatternToken::Catchall => bind(&mut self.catchall, route),
            PatternToken::Constant(text) => {
                let index = match self
                    .constants
                    .iter()
                    .position(|child| child.token.matches(text, case).is_match())
                {
                    Some(index) => index,
                    None => {
                        self.constants.push(Node::new(token.clone()));
                        self.constants.len() - 1
                    }
                };
                self.constants[index].insert(rest, route, case)
            }
            PatternToken::Parameter(name) => {
                let child = self
                    .parameter
                    .get_or_insert_with(|| Box::new(Node::new(token.clone())));
                match child.names.iter().find(|(_, r)| r.method == route.method) {
                    Some((existing, owner)) if existing != name => {
                        return Insert::NameConflict(Arc::clone(owner));
                    }
                    Some(_) => {}
                    None => child.names.push((Arc::clone(name), Arc::clone(&route))),
                }
                child.insert(rest, route, case)
            }
            PatternToken::Wildcard => self
                .wildcard
                .get_or_insert_with(|| Box::new(Node::new(PatternToken::Wildcard)))
                .insert(rest, route, case),
        }
    }

    fn search<'t, 'p>(
        &'t self,
        segments: &'p [&'p str],
        method: &Method,
        case: CaseSensitivity,
        captures: &mut Captures<'p>,
        allowed: &mut AllowedMethods,
    ) -> Option<Hit<'t, 'p>> {
        let Some((&segment, rest)) = segments.split_first() else {
            if let Some(route) = lookup(&self.routes, method) {
                return Some(Hit { route, tail: &[] });
            }
            allowed.extend(self.routes.iter().map(|(m, _)| m.clone()));
            return None;
        };

        // Constant texts are unique per level, so at most one child can match.
        if let Some(child) = self
            .constants
            .iter()
            .find(|child| child.token.matches(segment, case).is_match())
        {
            if let Some(hit) = child.search(rest, method, case, captures, allowed) {
                return Some(hit);
            }
        }

        if let Some(child) = &self.parameter {
            if let SegmentMatch::Captured(value) = child.token.matches(segment, case) {
                captures.push(value);
                if let Some(hit) = child.search(rest, method, case, captures, allowed) {
                    return Some(hit);
                }
                captures.pop();
            }
        }

        if let Some(child) = &self.wildcard {
            if child.token.matches(segment, case).is_match() {
                if let Some(hit) = child.search(rest, method, case, captures, allowed) {
                    return Some(hit);
                }
            }
        }

        if !self.catchall.is_empty() {
            if let Some(tail) = PatternToken::Catchall.matches_tail(segments) {
                if let Some(route) = lookup(&self.catchall, method) {
                    return Some(Hit { route, tail });
                }
                allowed.extend(self.catchall.iter().map(|(m, _)| m.clone()));
            }
        }

        None
    }
}

/// Route trie keyed by path segments.
#[derive(Debug)]
pub(crate) struct Trie {
    root: Node,
    case: CaseSensitivity,
}

impl Trie {
    pub fn new(case: CaseSensitivity) -> Self {
        Self {
            root: Node::root(),
            case,
        }
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }

    pub fn insert(&mut self, pattern: &RoutePattern, route: Arc<Route>) -> Insert {
        self.root.insert(pattern.tokens(), route, self.case)
    }

    /// Find the route bound to `method` for `segments`.
    ///
    /// On a miss, `allowed` holds every method bound on a terminal the path reached.
    pub fn search<'t, 'p>(
        &'t self,
        segments: &'p [&'p str],
        method: &Method,
        captures: &mut Captures<'p>,
        allowed: &mut AllowedMethods,
    ) -> Option<Hit<'t, 'p>> {
        self.root.search(segments, method, self.case, captures, allowed)
    }
}
