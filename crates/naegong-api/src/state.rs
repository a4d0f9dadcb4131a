use std::path::PathBuf;
use std::sync::Arc;

use naegong_chat::ChatService;
use naegong_db::Database;
use naegong_gateway::dispatcher::Dispatcher;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub chat: ChatService,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
}
