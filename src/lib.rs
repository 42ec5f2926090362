//! Опрос принтеров по SNMP: уровни тонера, серийный номер и ошибки.

pub mod config;
pub mod error;
pub mod formatter;
pub mod handlers;
pub mod poller;
pub mod routes;
pub mod service;
pub mod snmp;
pub mod store;
pub mod telemetry;
