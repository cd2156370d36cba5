//! Binding of the viewer into the host's extension points.
//!
//! Registration is a plain function over a [`Binder`]; every binding is
//! guarded by the same capability predicate so that nothing is shown to
//! callers who may not read the audit log.

use std::fmt;

use super::links::{AUDIT_LOG_ROUTE, CapabilityLinks, subject_link, with_context_path};
use crate::domain::error::DomainError;
use crate::domain::subjects::Subject;

pub const VIEWER_TITLE: &str = "Audit Log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionPoint {
    AdminRoute,
    AdminNavigation,
    RepositoryInformation,
    UserInformation,
    GroupInformation,
}

impl ExtensionPoint {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtensionPoint::AdminRoute => "admin.route",
            ExtensionPoint::AdminNavigation => "admin.navigation",
            ExtensionPoint::RepositoryInformation => "repository.information.table.bottom",
            ExtensionPoint::UserInformation => "user.information.table.bottom",
            ExtensionPoint::GroupInformation => "group.information.table.bottom",
        }
    }

    /// Detail-page extension point showing `subject`.
    pub fn for_subject(subject: &Subject) -> Self {
        match subject {
            Subject::User(_) => ExtensionPoint::UserInformation,
            Subject::Group(_) => ExtensionPoint::GroupInformation,
            Subject::Repository { .. } => ExtensionPoint::RepositoryInformation,
        }
    }
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// The viewer itself, mounted under the admin area.
    Viewer,
    /// Entry in the admin navigation.
    NavigationItem,
    /// Row on a detail page linking to the pre-filtered log.
    CrossLinkRow,
}

impl Component {
    /// Where the component points to. Cross-link rows need the subject they
    /// are rendered for and yield `None` without one.
    pub fn href(
        self,
        context_path: &str,
        subject: Option<&Subject>,
    ) -> Result<Option<String>, DomainError> {
        let route = match self {
            Component::Viewer => AUDIT_LOG_ROUTE.to_string(),
            Component::NavigationItem => format!("{AUDIT_LOG_ROUTE}/"),
            Component::CrossLinkRow => match subject {
                Some(subject) => subject_link(subject)?,
                None => return Ok(None),
            },
        };
        Ok(Some(with_context_path(context_path, &route)))
    }
}

pub type Predicate = fn(&CapabilityLinks) -> bool;

/// Shared guard of every binding.
pub fn predicate(links: &CapabilityLinks) -> bool {
    links.is_available()
}

pub trait Binder {
    fn bind(&mut self, point: ExtensionPoint, component: Component, predicate: Predicate);
}

pub fn register(binder: &mut impl Binder) {
    binder.bind(ExtensionPoint::AdminRoute, Component::Viewer, predicate);
    binder.bind(
        ExtensionPoint::AdminNavigation,
        Component::NavigationItem,
        predicate,
    );
    for point in [
        ExtensionPoint::RepositoryInformation,
        ExtensionPoint::UserInformation,
        ExtensionPoint::GroupInformation,
    ] {
        binder.bind(point, Component::CrossLinkRow, predicate);
    }
}

struct Binding {
    point: ExtensionPoint,
    component: Component,
    predicate: Predicate,
}

#[derive(Default)]
pub struct ExtensionRegistry {
    bindings: Vec<Binding>,
}

impl ExtensionRegistry {
    /// Registry with the viewer's bindings in place.
    pub fn with_viewer() -> Self {
        let mut registry = Self::default();
        register(&mut registry);
        registry
    }

    /// Components bound to `point` whose predicate holds for `links`.
    pub fn components_for(&self, point: ExtensionPoint, links: &CapabilityLinks) -> Vec<Component> {
        self.bindings
            .iter()
            .filter(|binding| binding.point == point && (binding.predicate)(links))
            .map(|binding| binding.component)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Binder for ExtensionRegistry {
    fn bind(&mut self, point: ExtensionPoint, component: Component, predicate: Predicate) {
        self.bindings.push(Binding {
            point,
            component,
            predicate,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available() -> CapabilityLinks {
        CapabilityLinks {
            audit_log: Some("https://scm.example/scm/api/v2/audit-log".into()),
            csv_export: None,
        }
    }

    #[test]
    fn register_binds_every_point_once() {
        let registry = ExtensionRegistry::with_viewer();
        assert_eq!(registry.len(), 5);
        for point in [
            ExtensionPoint::AdminRoute,
            ExtensionPoint::AdminNavigation,
            ExtensionPoint::RepositoryInformation,
            ExtensionPoint::UserInformation,
            ExtensionPoint::GroupInformation,
        ] {
            assert_eq!(registry.components_for(point, &available()).len(), 1, "{point}");
        }
    }

    #[test]
    fn nothing_is_shown_without_capability() {
        let registry = ExtensionRegistry::with_viewer();
        assert!(
            registry
                .components_for(ExtensionPoint::AdminNavigation, &CapabilityLinks::default())
                .is_empty()
        );
    }

    #[test]
    fn navigation_points_to_viewer_root() {
        let href = Component::NavigationItem
            .href("/scm", None)
            .expect("valid route");
        assert_eq!(href.as_deref(), Some("/scm/admin/audit-log/"));
    }

    #[test]
    fn cross_link_row_needs_a_subject() {
        assert_eq!(Component::CrossLinkRow.href("", None).expect("valid"), None);

        let group = Subject::Group("crew".into());
        let point = ExtensionPoint::for_subject(&group);
        assert_eq!(point.as_str(), "group.information.table.bottom");
        assert_eq!(
            Component::CrossLinkRow
                .href("", Some(&group))
                .expect("valid route")
                .as_deref(),
            Some("/admin/audit-log/1?entity=crew&label=group")
        );
    }
}
