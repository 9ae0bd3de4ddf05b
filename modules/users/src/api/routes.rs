use axum::http::Method;
use plugkit::RouteTable;

use crate::api::handlers;
use crate::domain::service::Service;

/// The account route table. Order matters: every matching entry runs, and
/// the disable rule must come before the generic `/{id}` rules.
pub fn route_table() -> Result<RouteTable<Service>, regex::Error> {
    RouteTable::new()
        .route(
            "disable",
            r"^/api/users/(?P<id>[^/]+)/disable/?$",
            Method::POST,
            handlers::disable_account,
        )?
        .route("list", r"^/api/users/?$", Method::GET, handlers::list_accounts)?
        .route("add", r"^/api/users/?$", Method::POST, handlers::add_account)?
        .route(
            "delete",
            r"^/api/users/(?P<id>[^/]+)/?$",
            Method::DELETE,
            handlers::delete_account,
        )?
        .route(
            "change_password",
            r"^/api/users/(?P<id>[^/]+)/?$",
            Method::PUT,
            handlers::change_password,
        )?
        .route(
            "get",
            r"^/api/users/(?P<id>[^/]+)/?$",
            Method::GET,
            handlers::get_account,
        )
}
