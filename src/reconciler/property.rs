//! Property descriptors: per-property diffing shared by the loggers,
//! log handlers and data sources.
//!
//! A [`Registry`] is built once per resource kind. Each descriptor knows how
//! to read its value from the live resource and from the plan entry, how to
//! put it into a spec for a new resource, and how to write it to a live one.

use std::fmt;

use crate::audit::AuditBuilder;
use crate::container::Operation;
use crate::error::Result;

/// One property of a resource kind.
///
/// `P` is the plan entry, `L` the live resource and `S` the spec a new
/// resource is built into.
pub trait Descriptor<P, L, S>: Send + Sync {
    /// Property name as recorded in audits.
    fn name(&self) -> &'static str;

    /// Compares the live and planned values and returns the operations that
    /// converge them, recording the change.
    ///
    /// # Errors
    ///
    /// Returns an error if the property cannot be changed in place.
    fn update(&self, live: &L, plan: &P, audit: &mut AuditBuilder) -> Result<Vec<Operation>>;

    /// Puts the planned value into the spec, recording it as added.
    fn build(&self, plan: &P, spec: &mut S, audit: &mut AuditBuilder);

    /// Records the live value as removed.
    fn audit_removal(&self, live: &L, audit: &mut AuditBuilder);
}

/// Writes a new value, `None` undefining the attribute.
pub type Writer<L, T> = fn(&L, Option<&T>) -> Result<Vec<Operation>>;

/// A scalar property.
pub struct Property<P, L, S, T> {
    name: &'static str,
    live: fn(&L) -> Option<T>,
    planned: fn(&P) -> Option<T>,
    build: fn(&mut S, T),
    write: Writer<L, T>,
    confidential: bool,
    applies: fn(&L) -> bool,
}

impl<P, L, S, T> Property<P, L, S, T> {
    /// Creates a property from its accessors.
    #[must_use]
    pub fn new(
        name: &'static str,
        live: fn(&L) -> Option<T>,
        planned: fn(&P) -> Option<T>,
        build: fn(&mut S, T),
        write: Writer<L, T>,
    ) -> Self {
        Self {
            name,
            live,
            planned,
            build,
            write,
            confidential: false,
            applies: |_| true,
        }
    }

    /// Marks the property as confidential: audits only show whether it is set.
    #[must_use]
    pub const fn confidential(mut self) -> Self {
        self.confidential = true;
        self
    }

    /// Restricts updates and removal audits to live resources matching the filter.
    #[must_use]
    pub fn only_if(mut self, applies: fn(&L) -> bool) -> Self {
        self.applies = applies;
        self
    }

    fn record(&self, audit: &mut AuditBuilder, old: Option<String>, new: Option<String>) {
        if self.confidential {
            audit.change_concealed(self.name, old, new);
        } else {
            audit.change(self.name, old, new);
        }
    }
}

impl<P, L, S, T> Descriptor<P, L, S> for Property<P, L, S, T>
where
    T: PartialEq + fmt::Display,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn update(&self, live: &L, plan: &P, audit: &mut AuditBuilder) -> Result<Vec<Operation>> {
        if !(self.applies)(live) {
            return Ok(Vec::new());
        }
        let old = (self.live)(live);
        let new = (self.planned)(plan);
        if old == new {
            return Ok(Vec::new());
        }
        self.record(
            audit,
            old.as_ref().map(ToString::to_string),
            new.as_ref().map(ToString::to_string),
        );
        (self.write)(live, new.as_ref())
    }

    fn build(&self, plan: &P, spec: &mut S, audit: &mut AuditBuilder) {
        if let Some(value) = (self.planned)(plan) {
            self.record(audit, None, Some(value.to_string()));
            (self.build)(spec, value);
        }
    }

    fn audit_removal(&self, live: &L, audit: &mut AuditBuilder) {
        if (self.applies)(live) {
            self.record(audit, (self.live)(live).map(|v| v.to_string()), None);
        }
    }
}

/// The descriptors of one resource kind, in audit order.
pub struct Registry<P, L, S> {
    descriptors: Vec<Box<dyn Descriptor<P, L, S>>>,
}

impl<P, L, S> fmt::Debug for Registry<P, L, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl<P, L, S> Registry<P, L, S> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Registers a descriptor.
    #[must_use]
    pub fn with(mut self, descriptor: impl Descriptor<P, L, S> + 'static) -> Self {
        self.descriptors.push(Box::new(descriptor));
        self
    }

    /// Names of the registered properties.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name()).collect()
    }

    /// Diffs every property.
    ///
    /// # Errors
    ///
    /// Returns the first error of a descriptor.
    pub fn update(&self, live: &L, plan: &P, audit: &mut AuditBuilder) -> Result<Vec<Operation>> {
        let mut operations = Vec::new();
        for descriptor in &self.descriptors {
            operations.extend(descriptor.update(live, plan, audit)?);
        }
        Ok(operations)
    }

    /// Builds a spec from every planned property.
    pub fn build(&self, plan: &P, spec: &mut S, audit: &mut AuditBuilder) {
        for descriptor in &self.descriptors {
            descriptor.build(plan, spec, audit);
        }
    }

    /// Records every live property as removed.
    pub fn audit_removal(&self, live: &L, audit: &mut AuditBuilder) {
        for descriptor in &self.descriptors {
            descriptor.audit_removal(live, audit);
        }
    }
}

impl<P, L, S> Default for Registry<P, L, S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a list the way collection audits show it, e.g. `[A, B]`.
#[must_use]
pub fn render_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    format!("[{}]", items.into_iter().collect::<Vec<_>>().join(", "))
}

/// Renders a map the way collection audits show it, e.g. `{a=1, b=2}`.
#[must_use]
pub fn render_map<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let entries: Vec<String> = entries.into_iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{{{}}}", entries.join(", "))
}
