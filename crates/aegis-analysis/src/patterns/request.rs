//! Request-source and route-registration helpers.

use crate::tree::{NodeId, NodeKind, SourceTree};

/// Dotted prefixes that denote untrusted request data.
pub const REQUEST_SOURCES: &[&str] = &[
    "req.body",
    "req.query",
    "req.params",
    "req.headers",
    "req.cookies",
    "req.files",
    "request.body",
    "request.query",
    "request.params",
    "request.headers",
    "request.cookies",
    "request.args",
    "request.form",
    "request.json",
    "request.values",
    "request.data",
    "request.files",
    "request.GET",
    "request.POST",
    "request.query_params",
    "request.path_params",
    "ctx.request",
    "ctx.query",
    "ctx.params",
    "event.body",
    "event.queryStringParameters",
    "event.pathParameters",
];

const HTTP_METHODS: &[&str] = &[
    "get", "post", "put", "patch", "delete", "del", "all", "route", "options", "head",
];

const ROUTER_OBJECTS: &[&str] = &[
    "app", "router", "server", "api", "fastify", "routes", "blueprint", "bp",
];

/// Whether a dotted path reads request data.
pub fn is_request_path(path: &str) -> bool {
    REQUEST_SOURCES.iter().any(|src| {
        path == *src
            || (path.starts_with(src) && path.as_bytes().get(src.len()) == Some(&b'.'))
    })
}

/// Whether any member chain inside `id` reads request data.
pub fn is_request_derived(tree: &SourceTree, id: NodeId) -> bool {
    tree.descendants(id).any(|d| match tree.kind(d) {
        NodeKind::Member => tree.dotted_path(d).is_some_and(|p| is_request_path(&p)),
        NodeKind::Call => tree
            .callee_path(d)
            .is_some_and(|p| p == "request.get_json" || p == "req.get" || p == "req.param"),
        _ => false,
    })
}

/// Whether a callee path registers an HTTP route: `app.get`, `router.post`,
/// `bp.route`, `userRouter.delete`.
pub fn is_route_registration(callee_path: &str) -> bool {
    let Some((object, method)) = callee_path.rsplit_once('.') else {
        return false;
    };
    let object = object.rsplit('.').next().unwrap_or(object).to_ascii_lowercase();
    HTTP_METHODS.contains(&method.to_ascii_lowercase().as_str())
        && (ROUTER_OBJECTS.contains(&object.as_str())
            || object.ends_with("router")
            || object.ends_with("app"))
}

/// Route path of a registration call or route decorator: its first string
/// argument when it starts with `/`.
pub fn route_path(tree: &SourceTree, call: NodeId) -> Option<&str> {
    let first = tree.call_args(call).next()?;
    tree.string_prefix(first).filter(|p| p.starts_with('/'))
}

/// Route decorators: `@app.route`, `@router.get`, `@Get`, `@Post`, ...
pub fn is_route_decorator(name: &str) -> bool {
    if is_route_registration(name) {
        return true;
    }
    matches!(
        name,
        "Get" | "Post" | "Put" | "Patch" | "Delete" | "All" | "route" | "api_view"
    )
}
