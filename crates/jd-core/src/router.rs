// crates/jd-core/src/router.rs
//
// Procedure groups and the composed Router.
//
// Groups collect procedures under a name; `Router::builder()` composes groups
// (and already-built routers) into one flat namespace of dotted paths. All
// naming problems are reported by `build()`, before anything is served.
// A built Router is immutable.

use std::collections::BTreeMap;
use std::future::Future;

use serde_json::Value;
use thiserror::Error;

use crate::context::RequestContext;
use crate::error::RpcError;
use crate::procedure::{Procedure, ProcedureDef, ProcedureKind};

/// Router construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// Two procedures compose to the same dotted path.
    #[error("Duplicate procedure: {0}")]
    DuplicateProcedure(String),

    /// Empty or whitespace-containing group/operation name.
    #[error("Invalid procedure name: {0:?}")]
    InvalidName(String),

    /// A contract procedure registered outside the group its contract names.
    #[error("Procedure {path} belongs to group {expected} but was registered in {actual}")]
    GroupMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// More than one of the above.
    #[error("{} router errors: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<RouterError>),
}

fn join_errors(errors: &[RouterError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn valid_segment(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| c.is_whitespace() || c == ',')
        && !name.starts_with('.')
        && !name.ends_with('.')
}

// ---------------------------------------------------------------------------
// ProcedureGroup
// ---------------------------------------------------------------------------

/// A named set of procedures, e.g. `example` or `session`.
#[derive(Debug, Clone)]
pub struct ProcedureGroup {
    name: String,
    procedures: Vec<(String, Procedure)>,
}

impl ProcedureGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            procedures: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a procedure under `name` inside this group.
    pub fn register(mut self, name: impl Into<String>, procedure: Procedure) -> Self {
        self.procedures.push((name.into(), procedure));
        self
    }

    /// Register the handler for contract procedure `D`.
    pub fn procedure<D, F, Fut>(self, handler: F) -> Self
    where
        D: ProcedureDef,
        F: Fn(RequestContext, D::Input) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<D::Output, RpcError>> + Send + 'static,
    {
        self.register(D::NAME, Procedure::typed::<D, F, Fut>(handler))
    }
}

// ---------------------------------------------------------------------------
// RouterBuilder
// ---------------------------------------------------------------------------

/// Collects groups and nested routers, validated in `build()`.
#[derive(Debug, Default)]
pub struct RouterBuilder {
    entries: Vec<(String, String, Procedure)>,
    errors: Vec<RouterError>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group. Its procedures become `<group>.<operation>`.
    pub fn group(mut self, group: ProcedureGroup) -> Self {
        if !valid_segment(&group.name) {
            self.errors.push(RouterError::InvalidName(group.name.clone()));
            return self;
        }
        for (op, procedure) in group.procedures {
            if !valid_segment(&op) {
                self.errors
                    .push(RouterError::InvalidName(format!("{}.{}", group.name, op)));
                continue;
            }
            if let Some(expected) = procedure.contract_group {
                if expected != group.name {
                    self.errors.push(RouterError::GroupMismatch {
                        path: format!("{}.{}", expected, op),
                        expected: expected.to_string(),
                        actual: group.name.clone(),
                    });
                    continue;
                }
            }
            self.entries.push((group.name.clone(), op, procedure));
        }
        self
    }

    /// Mount every procedure of an already-built router under `prefix`.
    pub fn merge(mut self, prefix: impl Into<String>, router: Router) -> Self {
        let prefix = prefix.into();
        if !valid_segment(&prefix) {
            self.errors.push(RouterError::InvalidName(prefix));
            return self;
        }
        for (path, procedure) in router.procedures {
            self.entries.push((prefix.clone(), path, procedure));
        }
        self
    }

    /// Flatten into a Router, failing on any naming problem.
    pub fn build(self) -> Result<Router, RouterError> {
        let mut errors = self.errors;
        let mut procedures = BTreeMap::new();

        for (group, op, procedure) in self.entries {
            let path = format!("{}.{}", group, op);
            if procedures.contains_key(&path) {
                errors.push(RouterError::DuplicateProcedure(path));
                continue;
            }
            procedures.insert(path, procedure);
        }

        match errors.len() {
            0 => Ok(Router { procedures }),
            1 => Err(errors.remove(0)),
            _ => Err(RouterError::Multiple(errors)),
        }
    }
}

/// Compose groups into a router in one call.
pub fn compose<I>(groups: I) -> Result<Router, RouterError>
where
    I: IntoIterator<Item = ProcedureGroup>,
{
    groups
        .into_iter()
        .fold(RouterBuilder::new(), RouterBuilder::group)
        .build()
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Flat, immutable map from dotted path to procedure.
#[derive(Clone)]
pub struct Router {
    procedures: BTreeMap<String, Procedure>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("paths", &self.procedures.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// All dotted paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.procedures.keys().map(String::as_str)
    }

    pub fn get(&self, path: &str) -> Option<&Procedure> {
        self.procedures.get(path)
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    /// Dispatch a call to `path`, which the caller issued as `kind`.
    pub async fn call(
        &self,
        ctx: RequestContext,
        path: &str,
        kind: ProcedureKind,
        input: Value,
    ) -> Result<Value, RpcError> {
        let procedure = self
            .procedures
            .get(path)
            .ok_or_else(|| RpcError::not_found(format!("No \"{}\"-procedure on path \"{}\"", kind, path)))?;

        if procedure.kind() != kind {
            return Err(RpcError::method_not_supported(format!(
                "\"{}\" is a {}, not a {}",
                path,
                procedure.kind(),
                kind
            )));
        }

        procedure.invoke(ctx, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::example::{Hello, HelloInput};
    use crate::error::ErrorCode;
    use crate::wire::HttpMethod;

    fn echo() -> Procedure {
        Procedure::new(ProcedureKind::Query, |_ctx, input| async move { Ok(input) })
    }

    fn ctx() -> RequestContext {
        RequestContext::anonymous(HttpMethod::Get)
    }

    #[test]
    fn test_compose_flattens_group_names() {
        let router = compose([
            ProcedureGroup::new("example").register("hello", echo()),
            ProcedureGroup::new("session").register("getSession", echo()),
        ])
        .unwrap();
        let paths: Vec<&str> = router.paths().collect();
        assert_eq!(paths, vec!["example.hello", "session.getSession"]);
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_duplicate_composed_name_fails_at_construction() {
        let err = compose([
            ProcedureGroup::new("example").register("hello", echo()),
            ProcedureGroup::new("example").register("hello", echo()),
        ])
        .unwrap_err();
        assert_eq!(err, RouterError::DuplicateProcedure("example.hello".to_string()));
    }

    #[test]
    fn test_duplicate_across_nesting_levels() {
        // "a.b" + "c" and "a" + "b.c" both compose to "a.b.c".
        let err = compose([
            ProcedureGroup::new("a.b").register("c", echo()),
            ProcedureGroup::new("a").register("b.c", echo()),
        ])
        .unwrap_err();
        assert_eq!(err, RouterError::DuplicateProcedure("a.b.c".to_string()));
    }

    #[test]
    fn test_invalid_names_and_multiple_errors() {
        let err = compose([
            ProcedureGroup::new("").register("x", echo()),
            ProcedureGroup::new("ok").register("has space", echo()),
        ])
        .unwrap_err();
        match err {
            RouterError::Multiple(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(matches!(errors[0], RouterError::InvalidName(_)));
                assert!(matches!(errors[1], RouterError::InvalidName(_)));
            }
            other => panic!("expected Multiple, got {:?}", other),
        }
    }

    #[test]
    fn test_contract_group_mismatch() {
        let err = compose([ProcedureGroup::new("greetings")
            .procedure::<Hello, _, _>(|_ctx, input: HelloInput| async move { Ok(input.name) })])
        .unwrap_err();
        assert!(matches!(err, RouterError::GroupMismatch { .. }));
    }

    #[test]
    fn test_merge_prefixes_nested_router() {
        let inner = compose([ProcedureGroup::new("posts").register("list", echo())]).unwrap();
        let router = Router::builder()
            .group(ProcedureGroup::new("example").register("hello", echo()))
            .merge("admin", inner)
            .build()
            .unwrap();
        assert!(router.get("admin.posts.list").is_some());
        assert!(router.get("example.hello").is_some());
    }

    #[tokio::test]
    async fn test_call_unknown_path_is_not_found() {
        let router = compose([ProcedureGroup::new("example").register("hello", echo())]).unwrap();
        let err = router
            .call(ctx(), "example.nope", ProcedureKind::Query, Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_call_wrong_kind_is_method_not_supported() {
        let router = compose([ProcedureGroup::new("example").register("hello", echo())]).unwrap();
        let err = router
            .call(ctx(), "example.hello", ProcedureKind::Mutation, Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MethodNotSupported);
    }

    #[tokio::test]
    async fn test_call_dispatches() {
        let router = compose([ProcedureGroup::new("example").register("hello", echo())]).unwrap();
        let out = router
            .call(ctx(), "example.hello", ProcedureKind::Query, Value::from("hi"))
            .await
            .unwrap();
        assert_eq!(out, Value::from("hi"));
    }
}
