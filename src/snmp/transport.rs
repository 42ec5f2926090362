use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snmp2::AsyncSession;
use tokio::time::timeout;
use tracing::debug;

use super::oid::ObjectId;
use super::value::{SnmpValue, VarBind};
use crate::error::SnmpError;

/// noSuchName из SNMPv1
const V1_NO_SUCH_NAME: u32 = 2;

/// Сколько раз переоткрываем сессию ради одного запроса
const STALE_REOPENS: usize = 1;

/// Версия протокола, которую пробует оркестратор
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnmpVersion {
    #[serde(rename = "1")]
    V1,
    #[serde(rename = "2c")]
    V2c,
}

impl SnmpVersion {
    /// Аргумент для `-v` у net-snmp утилит
    pub fn cli_flag(&self) -> &'static str {
        match self {
            SnmpVersion::V1 => "1",
            SnmpVersion::V2c => "2c",
        }
    }
}

impl fmt::Display for SnmpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnmpVersion::V1 => f.write_str("v1"),
            SnmpVersion::V2c => f.write_str("v2c"),
        }
    }
}

/// Адрес агента
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Один запрос-ответ к агенту. Таймауты и повторы живут уровнем выше, в `Session`.
#[async_trait]
pub trait SnmpTransport: Send {
    async fn get(&mut self, oid: &ObjectId) -> Result<VarBind, SnmpError>;

    async fn get_next(&mut self, oid: &ObjectId) -> Result<VarBind, SnmpError>;
}

/// Открывает транспорт к агенту с заданными community и версией
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(
        &self,
        target: &Target,
        community: &str,
        version: SnmpVersion,
    ) -> Result<Box<dyn SnmpTransport>, SnmpError>;
}

/// UDP транспорт поверх snmp2.
///
/// Ответ, опоздавший после таймаута, остаётся в сокете и приходит на
/// следующий запрос с чужим request-id. Такой сокет бросаем: открываем
/// сессию заново и повторяем запрос.
pub struct UdpTransport {
    session: AsyncSession,
    target: Target,
    community: Vec<u8>,
    version: SnmpVersion,
}

impl UdpTransport {
    pub async fn connect(
        target: &Target,
        community: &str,
        version: SnmpVersion,
    ) -> Result<Self, SnmpError> {
        let community = community.as_bytes().to_vec();
        let session = open_session(target, &community, version).await?;

        Ok(Self {
            session,
            target: target.clone(),
            community,
            version,
        })
    }

    async fn request(&mut self, kind: Request, oid: &ObjectId) -> Result<VarBind, SnmpError> {
        let request = oid
            .to_snmp2()
            .map_err(|e| SnmpError::Protocol(e.to_string()))?;

        for _ in 0..=STALE_REOPENS {
            // ответ заимствует буфер сессии: разбираем его до переоткрытия
            let outcome = {
                let response = match kind {
                    Request::Get => self.session.get(&request).await,
                    Request::GetNext => self.session.getnext(&request).await,
                };
                match response {
                    // v1 агент сообщает о конце MIB через noSuchName
                    Ok(pdu)
                        if kind == Request::GetNext
                            && self.version == SnmpVersion::V1
                            && pdu.error_status == V1_NO_SUCH_NAME =>
                    {
                        Some(Ok(VarBind::new(oid.clone(), SnmpValue::EndOfMibView)))
                    }
                    Ok(pdu) if pdu.error_status != 0 => Some(Err(SnmpError::Protocol(format!(
                        "error-status {} (index {}) для {}",
                        pdu.error_status, pdu.error_index, oid
                    )))),
                    Ok(pdu) => Some(first_varbind(pdu.varbinds)),
                    Err(snmp2::Error::RequestIdMismatch) => None,
                    Err(e) => Some(Err(SnmpError::Unreachable(e.to_string()))),
                }
            };

            match outcome {
                Some(result) => return result,
                None => {
                    debug!(target = %self.target, %oid, "устаревший ответ в сокете, переоткрываем сессию");
                    self.session = open_session(&self.target, &self.community, self.version).await?;
                }
            }
        }

        Err(SnmpError::Protocol(format!(
            "{}: request-id не совпадает и после переоткрытия сессии",
            self.target
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    Get,
    GetNext,
}

async fn open_session(
    target: &Target,
    community: &[u8],
    version: SnmpVersion,
) -> Result<AsyncSession, SnmpError> {
    let addr = target.to_string();
    match version {
        SnmpVersion::V1 => AsyncSession::new_v1(addr.as_str(), community, 1).await,
        SnmpVersion::V2c => AsyncSession::new_v2c(addr.as_str(), community, 1).await,
    }
    .map_err(|e| SnmpError::Unreachable(format!("{}: {}", addr, e)))
}

#[async_trait]
impl SnmpTransport for UdpTransport {
    async fn get(&mut self, oid: &ObjectId) -> Result<VarBind, SnmpError> {
        self.request(Request::Get, oid).await
    }

    async fn get_next(&mut self, oid: &ObjectId) -> Result<VarBind, SnmpError> {
        self.request(Request::GetNext, oid).await
    }
}

fn first_varbind<'a, I>(varbinds: I) -> Result<VarBind, SnmpError>
where
    I: IntoIterator<Item = (snmp2::Oid<'a>, snmp2::Value<'a>)>,
{
    let (oid, value) = varbinds
        .into_iter()
        .next()
        .ok_or_else(|| SnmpError::Protocol("SNMP ответ пустой".to_string()))?;

    let oid: ObjectId = oid
        .to_string()
        .parse()
        .map_err(|e: anyhow::Error| SnmpError::Protocol(e.to_string()))?;

    Ok(VarBind::new(oid, SnmpValue::from(&value)))
}

/// Подключение через UDP с ограничением на открытие сессии
#[derive(Debug, Clone)]
pub struct UdpConnector {
    pub open_timeout: Duration,
}

impl Default for UdpConnector {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(3),
        }
    }
}

#[async_trait]
impl Connector for UdpConnector {
    async fn open(
        &self,
        target: &Target,
        community: &str,
        version: SnmpVersion,
    ) -> Result<Box<dyn SnmpTransport>, SnmpError> {
        match timeout(
            self.open_timeout,
            UdpTransport::connect(target, community, version),
        )
        .await
        {
            Ok(Ok(transport)) => Ok(Box::new(transport)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SnmpError::Unreachable(format!(
                "{}: не удалось открыть сессию",
                target
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_flags_match_net_snmp() {
        assert_eq!(SnmpVersion::V1.cli_flag(), "1");
        assert_eq!(SnmpVersion::V2c.cli_flag(), "2c");
        assert_eq!(SnmpVersion::V2c.to_string(), "v2c");
    }

    #[test]
    fn target_renders_host_port() {
        assert_eq!(Target::new("10.1.2.3", 161).to_string(), "10.1.2.3:161");
    }
}
