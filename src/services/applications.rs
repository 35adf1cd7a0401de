use crate::db::entities::mod_apps;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set};
use serde::Deserialize;
use tracing::{error, info};

const APPLY_PAGE: &str = include_str!("../../assets/apply.html");

/// Moderator application as posted by the intake form.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationForm {
    pub username: String,
    pub userid: String,
    pub reason: String,
}

pub fn router(db: DatabaseConnection) -> Router {
    Router::new()
        .route("/", get(apply_page))
        .route("/apply", post(submit))
        .with_state(db)
}

/// Serves the intake form until the process exits. A bind failure is logged, the bot keeps running.
pub async fn serve(db: DatabaseConnection, port: u16) {
    let addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind application form on {}: {:?}", addr, e);
            return;
        }
    };

    info!("Application form listening on {}", addr);
    if let Err(e) = axum::serve(listener, router(db)).await {
        error!("Application form server stopped: {:?}", e);
    }
}

async fn apply_page() -> Html<&'static str> {
    Html(APPLY_PAGE)
}

pub async fn submit(
    State(db): State<DatabaseConnection>,
    Form(form): Form<ApplicationForm>,
) -> (StatusCode, &'static str) {
    match record_application(&db, form).await {
        Ok(application) => {
            info!(
                "Stored moderator application {} from {}",
                application.id, application.username
            );
            (StatusCode::OK, "Application submitted.")
        }
        Err(e) => {
            error!("Failed to store moderator application: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to submit application.",
            )
        }
    }
}

pub async fn record_application(
    db: &DatabaseConnection,
    form: ApplicationForm,
) -> Result<mod_apps::Model, DbErr> {
    mod_apps::ActiveModel {
        username: Set(form.username),
        user_id: Set(form.userid),
        reason: Set(form.reason),
        submitted_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use sea_orm::{ConnectionTrait, EntityTrait, Statement};

    fn form() -> ApplicationForm {
        ApplicationForm {
            username: "dutz".to_string(),
            userid: "123456789012345678".to_string(),
            reason: "I am online all day".to_string(),
        }
    }

    #[tokio::test]
    async fn submission_is_stored() {
        let db = testing::database().await;

        let (status, body) = submit(State(db.clone()), Form(form())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Application submitted.");

        let stored = mod_apps::Entity::find().all(&db).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].username, "dutz");
        assert_eq!(stored[0].user_id, "123456789012345678");
        assert_eq!(stored[0].reason, "I am online all day");
    }

    #[tokio::test]
    async fn storage_failure_is_a_server_error() {
        let db = testing::database().await;
        let backend = db.get_database_backend();
        db.execute(Statement::from_string(backend, "DROP TABLE mod_apps"))
            .await
            .unwrap();

        let (status, body) = submit(State(db), Form(form())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Failed to submit application.");
    }

    #[test]
    fn form_page_posts_to_the_apply_route() {
        assert!(APPLY_PAGE.contains(r#"action="/apply""#));
        for field in ["username", "userid", "reason"] {
            assert!(APPLY_PAGE.contains(&format!(r#"name="{field}""#)));
        }
    }
}
