//! # Module Registry
//!
//! Binds handlers to `(module, member, method)` routes declared by the
//! schema. Setup happens on a [`RegistryBuilder`]; [`RegistryBuilder::build`]
//! seals it into a [`Registry`] that is read-only from then on and can be
//! shared across tasks behind an `Arc` without locking.
//!
//! Every binding is checked against the schema when it is made, so a typo in
//! a route name is a startup error, not a `NotFound` at request time.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use iop_schema::{Method, ResolvedSchema};

use crate::error::RegistryError;
use crate::handler::Handler;

/// A bound method: its resolved signature and its implementation.
#[derive(Clone)]
pub struct Binding {
    pub method: Method,
    pub handler: Arc<dyn Handler>,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("method", &self.method.name)
            .finish_non_exhaustive()
    }
}

type MethodTable = BTreeMap<String, Binding>;
type MemberTable = BTreeMap<String, MethodTable>;

/// Handlers for the methods of one interface, mounted as a unit with
/// [`RegistryBuilder::mount`].
#[derive(Default)]
pub struct InterfaceImpl {
    methods: BTreeMap<String, Arc<dyn Handler>>,
}

impl InterfaceImpl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method handler. A later handler for the same name replaces the
    /// earlier one.
    pub fn method(mut self, name: impl Into<String>, handler: impl Handler) -> Self {
        self.methods.insert(name.into(), Arc::new(handler));
        self
    }
}

impl fmt::Debug for InterfaceImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceImpl")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Mutable setup phase of a [`Registry`].
pub struct RegistryBuilder {
    schema: Arc<ResolvedSchema>,
    routes: BTreeMap<String, MemberTable>,
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("package", &self.schema.package())
            .finish_non_exhaustive()
    }
}

impl RegistryBuilder {
    pub fn new(schema: Arc<ResolvedSchema>) -> Self {
        Self {
            schema,
            routes: BTreeMap::new(),
        }
    }

    /// Bind one method.
    pub fn implement(
        &mut self,
        module: &str,
        member: &str,
        method: &str,
        handler: impl Handler,
    ) -> Result<&mut Self, RegistryError> {
        self.bind(module, member, method, Arc::new(handler))?;
        Ok(self)
    }

    /// Bind every method of `implementation` under `module.member`.
    ///
    /// A member can be mounted once; mounting a member that already has any
    /// method bound is a duplicate registration.
    pub fn mount(
        &mut self,
        module: &str,
        member: &str,
        implementation: InterfaceImpl,
    ) -> Result<&mut Self, RegistryError> {
        let mounted = self
            .routes
            .get(module)
            .and_then(|members| members.get(member))
            .is_some_and(|methods| !methods.is_empty());
        if mounted {
            return Err(RegistryError::DuplicateRegistration {
                route: format!("{module}.{member}"),
            });
        }
        for (method, handler) in implementation.methods {
            self.bind(module, member, &method, handler)?;
        }
        Ok(self)
    }

    fn bind(
        &mut self,
        module: &str,
        member: &str,
        method: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), RegistryError> {
        let route = format!("{module}.{member}.{method}");
        let unknown = |reason: String| RegistryError::UnknownRoute {
            route: route.clone(),
            reason,
        };

        let module_type = self
            .schema
            .module(module)
            .ok_or_else(|| unknown(format!("no module '{module}'")))?;
        let member_type = module_type
            .member(member)
            .ok_or_else(|| unknown(format!("module '{module}' has no member '{member}'")))?;
        let interface = self.schema.interface(member_type.interface);
        let resolved = interface.method(method).ok_or_else(|| {
            unknown(format!("interface '{}' has no method '{method}'", interface.name))
        })?;

        let methods = self
            .routes
            .entry(module.to_string())
            .or_default()
            .entry(member.to_string())
            .or_default();
        if methods.contains_key(method) {
            return Err(RegistryError::DuplicateRegistration { route });
        }
        methods.insert(
            method.to_string(),
            Binding {
                method: resolved.clone(),
                handler,
            },
        );
        Ok(())
    }

    /// Seal the builder.
    pub fn build(self) -> Registry {
        let mut unbound = Vec::new();
        for module in self.schema.modules() {
            for member in &module.members {
                let interface = self.schema.interface(member.interface);
                for method in &interface.methods {
                    let bound = self
                        .routes
                        .get(&module.name)
                        .and_then(|members| members.get(&member.name))
                        .is_some_and(|methods| methods.contains_key(&method.name));
                    if !bound {
                        unbound.push(format!("{}.{}.{}", module.name, member.name, method.name));
                    }
                }
            }
        }

        let bound: usize = self
            .routes
            .values()
            .flat_map(|members| members.values())
            .map(|methods| methods.len())
            .sum();
        tracing::info!(
            package = %self.schema.package(),
            fingerprint = %self.schema.fingerprint(),
            bound,
            unbound = unbound.len(),
            "registry sealed"
        );

        Registry {
            schema: self.schema,
            routes: self.routes,
            unbound,
        }
    }
}

/// Sealed, immutable route table.
pub struct Registry {
    schema: Arc<ResolvedSchema>,
    routes: BTreeMap<String, MemberTable>,
    unbound: Vec<String>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("package", &self.schema.package())
            .field("unbound", &self.unbound)
            .finish_non_exhaustive()
    }
}

impl Registry {
    pub fn schema(&self) -> &Arc<ResolvedSchema> {
        &self.schema
    }

    pub fn lookup(&self, module: &str, member: &str, method: &str) -> Option<&Binding> {
        self.routes.get(module)?.get(member)?.get(method)
    }

    /// Methods the schema declares but no handler was bound to, as
    /// `module.member.method`.
    pub fn unbound_methods(&self) -> &[String] {
        &self.unbound
    }

    /// Bound routes as `(module, member, method)`, in name order.
    pub fn routes(&self) -> impl Iterator<Item = (&str, &str, &str)> + '_ {
        self.routes.iter().flat_map(|(module, members)| {
            members.iter().flat_map(move |(member, methods)| {
                methods
                    .keys()
                    .map(move |method| (module.as_str(), member.as_str(), method.as_str()))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerReply, HandlerResult};
    use crate::test_support::course_schema;
    use iop_core::StructValue;

    async fn void_handler(_args: StructValue) -> HandlerResult {
        Ok(HandlerReply::Void)
    }

    #[test]
    fn test_binding_is_checked_against_schema() {
        let mut builder = RegistryBuilder::new(course_schema());
        builder
            .implement("Course", "user", "setProgress", void_handler)
            .unwrap();

        let err = builder
            .implement("Course", "user", "delete", void_handler)
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::UnknownRoute { ref route, .. } if route == "Course.user.delete"
        ));

        let err = builder
            .implement("School", "user", "get", void_handler)
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownRoute { .. }));

        let err = builder
            .implement("Course", "admin", "get", void_handler)
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownRoute { .. }));
    }

    #[test]
    fn test_duplicate_method_binding() {
        let mut builder = RegistryBuilder::new(course_schema());
        builder
            .implement("Course", "user", "setProgress", void_handler)
            .unwrap();
        let err = builder
            .implement("Course", "user", "setProgress", void_handler)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateRegistration {
                route: "Course.user.setProgress".into()
            }
        );
    }

    #[test]
    fn test_duplicate_mount() {
        let mut builder = RegistryBuilder::new(course_schema());
        builder
            .mount("Course", "custom", InterfaceImpl::new().method("getNbTotalSteps", void_handler))
            .unwrap();
        let err = builder
            .mount("Course", "custom", InterfaceImpl::new())
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateRegistration {
                route: "Course.custom".into()
            }
        );
    }

    #[test]
    fn test_sealed_registry_reports_unbound_methods() {
        let mut builder = RegistryBuilder::new(course_schema());
        builder
            .mount(
                "Course",
                "user",
                InterfaceImpl::new()
                    .method("create", void_handler)
                    .method("get", void_handler)
                    .method("setProgress", void_handler),
            )
            .unwrap();
        let registry = builder.build();

        assert_eq!(
            registry.unbound_methods(),
            &[
                "Course.user.getCompletionRate".to_string(),
                "Course.custom.getNbTotalSteps".to_string(),
            ]
        );
        assert!(registry.lookup("Course", "user", "create").is_some());
        assert!(registry.lookup("Course", "user", "getCompletionRate").is_none());
        assert_eq!(registry.routes().count(), 3);
    }

    #[test]
    fn test_registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
