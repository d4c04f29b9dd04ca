use crate::error::ApiError;
use actix_web::{http::StatusCode, web, HttpResponse};

/// Registers a group's endpoints on its scope.
pub type Configure = fn(&mut web::ServiceConfig);

/// A named collection of endpoints mounted under a URL prefix.
#[derive(Clone, Copy)]
pub struct RouteGroup {
    pub name: &'static str,
    pub prefix: &'static str,
    configure: Option<Configure>,
}

impl RouteGroup {
    pub fn new(name: &'static str, prefix: &'static str, configure: Configure) -> Self {
        Self {
            name,
            prefix,
            configure: Some(configure),
        }
    }

    /// A group whose prefix is claimed but which has no endpoints yet.
    pub fn reserved(name: &'static str, prefix: &'static str) -> Self {
        Self {
            name,
            prefix,
            configure: None,
        }
    }

    pub fn has_endpoints(&self) -> bool {
        self.configure.is_some()
    }

    fn scope(&self) -> actix_web::Scope {
        let mut scope = web::scope(self.prefix);
        if let Some(configure) = self.configure {
            scope = scope.configure(configure);
        }
        scope.default_service(web::to(not_found))
    }
}

impl std::fmt::Debug for RouteGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGroup")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("has_endpoints", &self.has_endpoints())
            .finish()
    }
}

#[derive(thiserror::Error, Debug)]
#[error("There is no route group named `{0}`")]
pub struct UnknownGroup(pub String);

#[derive(Clone, Default, Debug)]
pub struct RouteGroups(Vec<RouteGroup>);

impl RouteGroups {
    /// The API's groups, all reserved until their endpoints are attached.
    pub fn standard() -> Self {
        Self(vec![
            RouteGroup::reserved("user", "/api/user"),
            RouteGroup::reserved("team", "/api/team"),
            RouteGroup::reserved("stats", "/api/stats"),
            RouteGroup::reserved("admin", "/api/admin"),
            RouteGroup::reserved("group", "/api/group"),
            RouteGroup::reserved("problems", "/api/problems"),
            RouteGroup::reserved("achievements", "/api/achievements"),
            RouteGroup::reserved("v1", "/api/v1"),
        ])
    }

    /// Attach endpoints to an existing group, replacing any attached before.
    pub fn attach(mut self, name: &str, configure: Configure) -> Result<Self, UnknownGroup> {
        let group = self
            .0
            .iter_mut()
            .find(|g| g.name == name)
            .ok_or_else(|| UnknownGroup(name.to_string()))?;
        group.configure = Some(configure);
        Ok(self)
    }

    pub fn mount(mut self, group: RouteGroup) -> Self {
        self.0.push(group);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteGroup> {
        self.0.iter()
    }

    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        for group in &self.0 {
            tracing::debug!(group = group.name, prefix = group.prefix, "Mounting route group");
            cfg.service(group.scope());
        }
    }
}

/// Fallback for paths no endpoint claims.
pub async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::domain(StatusCode::NOT_FOUND, "Not found"))
}
