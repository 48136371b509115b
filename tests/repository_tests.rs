use invite_board::{
    models::{InviteUpdate, NewInvite, NewNotification, NewUser, ROLE_USER, SearchQuery, VoteType},
    repository::{InMemoryRepository, PostgresRepository, Repository, RepositoryError},
};
use serial_test::serial;
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Connects to `DATABASE_URL`, applies migrations and empties every table.
async fn postgres_repository() -> PostgresRepository {
    dotenv::dotenv().ok();

    let db_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set to run integration tests");
    let pool = PgPool::connect(&db_url)
        .await
        .expect("Failed to connect to database for integration tests.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations.");

    sqlx::query("TRUNCATE notifications, comments, invites, users CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to reset tables");

    PostgresRepository::new(pool)
}

// --- Test Data Helpers ---

fn new_user(username: &str) -> NewUser {
    NewUser {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        role: ROLE_USER.to_string(),
    }
}

fn new_invite(title: &str, location: &str) -> NewInvite {
    NewInvite {
        title: title.to_string(),
        company: "Acme".to_string(),
        location: location.to_string(),
        description: "Join the team".to_string(),
    }
}

// --- Shared contract ---

async fn users_are_unique_and_found_case_insensitively(repo: &dyn Repository) {
    let user = repo.create_user(new_user("Alice")).await.unwrap();

    let by_email = repo.find_user_by_email("ALICE@example.com").await.unwrap();
    assert_eq!(by_email.map(|u| u.id), Some(user.id));
    let by_name = repo.find_user_by_username("alice").await.unwrap();
    assert_eq!(by_name.map(|u| u.id), Some(user.id));

    let mut clash = new_user("someone");
    clash.email = "alice@example.com".into();
    assert!(matches!(
        repo.create_user(clash).await,
        Err(RepositoryError::Duplicate("email"))
    ));

    let blocked = repo.set_user_blocked(user.id, true).await.unwrap().unwrap();
    assert!(blocked.is_blocked);
    assert!(repo.set_user_blocked(Uuid::new_v4(), true).await.unwrap().is_none());
}

async fn invites_support_search_update_votes_and_cascade(repo: &dyn Repository) {
    let owner = repo.create_user(new_user("owner")).await.unwrap();
    let first = repo
        .create_invite(owner.id, new_invite("Rust Developer", "Dublin"), None)
        .await
        .unwrap();
    let second = repo
        .create_invite(owner.id, new_invite("Barista", "Cork"), Some("bucket/a.png".into()))
        .await
        .unwrap();

    let all = repo.list_invites(10, 0).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(repo.list_invites(1, 1).await.unwrap().len(), 1);
    assert_eq!(repo.list_invites_by_user(owner.id).await.unwrap().len(), 2);

    let hits = repo
        .search_invites(&SearchQuery {
            q: Some("rust".into()),
            location: Some("dub".into()),
        })
        .await
        .unwrap();
    assert_eq!(hits.iter().map(|i| i.id).collect::<Vec<_>>(), vec![first.id]);

    let updated = repo
        .update_invite(
            second.id,
            InviteUpdate {
                title: Some("Head Barista".into()),
                ..InviteUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Head Barista");
    assert_eq!(updated.location, "Cork");
    assert_eq!(updated.image_url.as_deref(), Some("bucket/a.png"));

    let voted = repo.vote_invite(first.id, VoteType::Downvote).await.unwrap().unwrap();
    assert_eq!((voted.upvotes, voted.downvotes), (0, 1));

    let comment = repo
        .create_comment(first.id, owner.id, "Nice".into())
        .await
        .unwrap();
    assert_eq!(comment.username, "owner");
    assert_eq!(repo.get_metrics().await.unwrap().comments, 1);

    assert!(repo.delete_invite(first.id).await.unwrap());
    assert!(!repo.delete_invite(first.id).await.unwrap());
    assert!(repo.list_comments(first.id).await.unwrap().is_empty());
    assert_eq!(repo.get_metrics().await.unwrap().comments, 0);
}

async fn notifications_are_listed_per_recipient(repo: &dyn Repository) {
    let recipient = repo.create_user(new_user("recipient")).await.unwrap();
    let other = repo.create_user(new_user("other")).await.unwrap();

    repo.create_notification(NewNotification {
        user_id: recipient.id,
        invite_id: None,
        message: "Welcome".into(),
    })
    .await
    .unwrap();

    let inbox = repo.list_notifications(recipient.id).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].message, "Welcome");
    assert!(!inbox[0].is_read);
    assert!(repo.list_notifications(other.id).await.unwrap().is_empty());
}

// --- In-memory ---

#[tokio::test]
async fn memory_users() {
    users_are_unique_and_found_case_insensitively(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn memory_invites() {
    invites_support_search_update_votes_and_cascade(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn memory_notifications() {
    notifications_are_listed_per_recipient(&InMemoryRepository::new()).await;
}

// --- Postgres ---

#[tokio::test]
#[serial]
#[ignore = "requires DATABASE_URL"]
async fn postgres_users() {
    users_are_unique_and_found_case_insensitively(&postgres_repository().await).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires DATABASE_URL"]
async fn postgres_invites() {
    invites_support_search_update_votes_and_cascade(&postgres_repository().await).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires DATABASE_URL"]
async fn postgres_notifications() {
    notifications_are_listed_per_recipient(&postgres_repository().await).await;
}
