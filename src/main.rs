use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lms_quiz::ai::{ChatCompletionsClient, Offline};
use lms_quiz::notify::{self, ProgressEvents};
use lms_quiz::state::AppState;
use lms_quiz::{app, auth, config, db};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lms_quiz=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = config::load();

  let pool = db::init_db(&config.database_path).expect("Failed to initialize database");

  {
    let conn = pool.lock().expect("Database lock failed during startup");
    if config.seed_demo {
      db::seed_demo_data(&conn).expect("Failed to seed demo data");
    }

    match auth::db::cleanup_expired_sessions(&conn) {
      Ok(0) => {}
      Ok(n) => tracing::info!("Removed {} expired session(s)", n),
      Err(e) => tracing::warn!("Failed to clean up expired sessions: {}", e),
    }
  }

  let (events, saved_results) = ProgressEvents::with_recorder();
  tokio::spawn(notify::record_progress(saved_results, pool.clone()));

  let ai_timeout = config.ai.timeout();
  let state = match (config.ai.enabled, config.ai.api_key.is_some()) {
    (true, true) => {
      let client = ChatCompletionsClient::new(&config.ai).expect("Failed to build AI client");
      tracing::info!("AI grading enabled with model {}", config.ai.model);
      AppState::new(pool, Arc::new(client), ai_timeout, events)
    }
    (true, false) => {
      tracing::warn!("No AI API key configured; using local grading and recommendations");
      AppState::new(pool, Arc::new(Offline), ai_timeout, events)
    }
    (false, _) => {
      tracing::info!("AI features disabled; using local grading and recommendations");
      AppState::new(pool, Arc::new(Offline), ai_timeout, events)
    }
  };

  let bind_addr = config.bind_addr();
  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://{}", bind_addr);

  axum::serve(listener, app(state))
    .await
    .expect("Server failed to start");
}
