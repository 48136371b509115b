//! JSON API under `/api/v1`, plus the Twitter OAuth endpoints.
//!
//! Guard order is significant. Body validation runs before id checks on the
//! write routes, and authentication always precedes the admin/owner checks.

use axum::routing::on;

use super::{
    RouteSpec,
    Verb::{Delete, Get, Patch, Post, Put},
};
use crate::{
    guards::Guard::*,
    handlers::{auth, comments, invites, metrics, notifications, twitter, users},
};

pub fn routes() -> Vec<RouteSpec> {
    vec![
        // --- Auth ---
        RouteSpec::new(
            Post,
            "/api/v1/auth/signin",
            &[ValidateSigninFormData, ValidUser],
            "signin",
            |f| on(f, auth::signin),
        ),
        RouteSpec::new(
            Post,
            "/api/v1/auth/signup",
            &[
                ValidateSignupFormData,
                VerifyUniqueUserEmail,
                VerifyUniqueUserUsername,
            ],
            "signup",
            |f| on(f, auth::signup),
        ),
        RouteSpec::new(Get, "/auth/twitter", &[], "passportAuthenticate", |f| {
            on(f, twitter::passport_authenticate)
        }),
        RouteSpec::new(
            Get,
            "/auth/twitter/callback",
            &[],
            "passportAuthCallback",
            |f| on(f, twitter::passport_auth_callback),
        ),
        // --- Users ---
        RouteSpec::new(
            Get,
            "/api/v1/users",
            &[AuthenticateUserToken, ValidateAdmin],
            "getUsers",
            |f| on(f, users::get_users),
        ),
        RouteSpec::new(Get, "/api/v1/users/json/{username}", &[], "getUser", |f| {
            on(f, users::get_user)
        }),
        RouteSpec::new(
            Patch,
            "/api/v1/users/block/{userId}",
            &[
                ValidateUserId,
                AuthenticateUserToken,
                ValidateAdmin,
                ValidateUserById,
            ],
            "blockUser",
            |f| on(f, users::block_user),
        ),
        // --- Invites ---
        RouteSpec::new(
            Post,
            "/api/v1/invites",
            &[AuthenticateUserToken, MulterUploads, ValidateInviteData],
            "saveNewInvite",
            |f| on(f, invites::save_new_invite),
        ),
        RouteSpec::new(Get, "/api/v1/invites", &[], "getAllInvites", |f| {
            on(f, invites::get_all_invites)
        }),
        RouteSpec::new(
            Get,
            "/api/v1/invites/search/json",
            &[],
            "searchInvitesApi",
            |f| on(f, invites::search_invites_api),
        ),
        RouteSpec::new(
            Get,
            "/api/v1/invites/{inviteId}",
            &[ValidateInviteId],
            "getOneInvite",
            |f| on(f, invites::get_one_invite),
        ),
        RouteSpec::new(
            Put,
            "/api/v1/invites/{inviteId}",
            &[
                ValidateInviteUpdateData,
                ValidateInviteId,
                AuthenticateUserToken,
                ValidateInvite,
                ValidateInviteOwner,
            ],
            "updateInvite",
            |f| on(f, invites::update_invite),
        ),
        RouteSpec::new(
            Delete,
            "/api/v1/invites/{inviteId}",
            &[
                ValidateInviteId,
                AuthenticateUserToken,
                ValidateAdmin,
                ValidateInvite,
            ],
            "deleteInvite",
            |f| on(f, invites::delete_invite),
        ),
        RouteSpec::new(
            Patch,
            "/api/v1/invites/upvote/{inviteId}/{voteType}",
            &[ValidateUpvoteInput, ValidateInvite],
            "upvoteInvite",
            |f| on(f, invites::upvote_invite),
        ),
        // --- Comments ---
        RouteSpec::new(
            Get,
            "/api/v1/comments/{inviteId}",
            &[ValidateInviteId],
            "getComments",
            |f| on(f, comments::get_comments),
        ),
        RouteSpec::new(
            Post,
            "/api/v1/comments/{inviteId}",
            &[
                ValidateCommentData,
                ValidateInviteId,
                AuthenticateUserToken,
                ValidateInvite,
            ],
            "createComment",
            |f| on(f, comments::create_comment),
        ),
        // --- Metrics & notifications ---
        RouteSpec::new(Get, "/api/v1/metrics", &[], "getMetrics", |f| {
            on(f, metrics::get_metrics)
        }),
        RouteSpec::new(
            Get,
            "/api/v1/notifications/{userId}",
            &[ValidateUserId],
            "getNotifications",
            |f| on(f, notifications::get_notifications),
        ),
        RouteSpec::new(
            Post,
            "/api/v1/notifications",
            &[ValidateNotificationData],
            "createNotification",
            |f| on(f, notifications::create_notification),
        ),
    ]
}
