use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::service::PrinterService;
use crate::store::MemoryStore;

pub mod health;
pub mod printers;

pub use health::health;
pub use printers::{list_printers, refresh_all, refresh_printer};

/// Общее состояние для обработчиков
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PrinterService>,
    pub store: Arc<MemoryStore>,
    /// Отменяется при остановке сервера, прерывает пакетный опрос
    pub shutdown: CancellationToken,
}
