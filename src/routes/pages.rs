//! Server-rendered views. Only the pages that need the signed-in profile or a
//! specific invite carry guards; everything else renders with the session
//! decoded by the cookie pre-pass.

use axum::routing::on;

use super::{RouteSpec, Verb::Get};
use crate::{
    guards::Guard,
    handlers::{invites, pages, users},
};

pub fn routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec::new(Get, "/", &[], "renderIndex", |f| on(f, pages::render_index)),
        RouteSpec::new(Get, "/login", &[], "renderLogin", |f| {
            on(f, pages::render("login"))
        }),
        RouteSpec::new(Get, "/register", &[], "renderRegister", |f| {
            on(f, pages::render("register"))
        }),
        RouteSpec::new(Get, "/howitworks", &[], "renderHowItWorks", |f| {
            on(f, pages::render("howitworks"))
        }),
        RouteSpec::new(Get, "/about", &[], "renderAbout", |f| {
            on(f, pages::render("about"))
        }),
        RouteSpec::new(Get, "/reportUser", &[], "renderReportUser", |f| {
            on(f, pages::render_anonymous("reportUser"))
        }),
        RouteSpec::new(
            Get,
            "/post",
            &[Guard::GetUserByUserId],
            "renderUserPost",
            |f| on(f, invites::render_user_post_page),
        ),
        RouteSpec::new(Get, "/posts", &[], "renderJobInvitesPage", |f| {
            on(f, invites::render_job_invites_page)
        }),
        RouteSpec::new(Get, "/post/{inviteId}", &[], "renderSinglePostPage", |f| {
            on(f, invites::render_single_post_page)
        }),
        RouteSpec::new(
            Get,
            "/post/{inviteId}/edit",
            &[
                Guard::ValidateInviteId,
                Guard::ValidateInvite,
                Guard::GetUserByUserId,
            ],
            "renderEditInvitePage",
            |f| on(f, invites::render_edit_invite_page),
        ),
        RouteSpec::new(Get, "/users/{username}", &[], "renderUserProfile", |f| {
            on(f, users::render_user_profile)
        }),
        RouteSpec::new(Get, "/invites/search", &[], "renderSearchResults", |f| {
            on(f, invites::render_search_results)
        }),
        // --- Admin views ---
        RouteSpec::new(Get, "/admin", &[], "renderAdminIndex", |f| {
            on(f, pages::render_anonymous("admin/index"))
        }),
        RouteSpec::new(Get, "/admin/reported", &[], "renderAdminReported", |f| {
            on(f, pages::render("admin/reported"))
        }),
        RouteSpec::new(
            Get,
            "/admin/reportedusers",
            &[],
            "renderAdminReportedUsers",
            |f| on(f, pages::render_anonymous("admin/reportedusers")),
        ),
        RouteSpec::new(Get, "/admin/users", &[], "renderAdminUsersPage", |f| {
            on(f, users::render_admin_users_page)
        }),
        RouteSpec::new(Get, "/admin/posts", &[], "renderAdminJobInvitesPage", |f| {
            on(f, invites::render_admin_job_invites_page)
        }),
    ]
}
