use crate::{db::OrmConn, notifications::Notifier};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub notifier: Notifier,
}
