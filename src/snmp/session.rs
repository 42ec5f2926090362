use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use super::oid::{known, ObjectId};
use super::transport::{Connector, SnmpTransport, SnmpVersion, Target};
use super::value::VarBind;
use crate::error::SnmpError;

/// Таймаут и количество повторов для каждого запроса
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPolicy {
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            retries: 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RequestKind {
    Get,
    GetNext,
}

/// Сессия к одному агенту с фиксированными community и версией
pub struct Session {
    transport: Box<dyn SnmpTransport>,
    policy: RequestPolicy,
    target: Target,
    version: SnmpVersion,
}

impl Session {
    pub fn new(
        transport: Box<dyn SnmpTransport>,
        target: Target,
        version: SnmpVersion,
        policy: RequestPolicy,
    ) -> Self {
        Self {
            transport,
            policy,
            target,
            version,
        }
    }

    pub async fn open(
        connector: &dyn Connector,
        target: &Target,
        community: &str,
        version: SnmpVersion,
        policy: RequestPolicy,
    ) -> Result<Self, SnmpError> {
        let transport = connector.open(target, community, version).await?;
        Ok(Self::new(transport, target.clone(), version, policy))
    }

    pub async fn get(&mut self, oid: &ObjectId) -> Result<VarBind, SnmpError> {
        self.request(RequestKind::Get, oid).await
    }

    pub async fn get_next(&mut self, oid: &ObjectId) -> Result<VarBind, SnmpError> {
        self.request(RequestKind::GetNext, oid).await
    }

    /// Пробный GET sysDescr.0: проверяет доступность и будит спящий принтер.
    /// Ошибки не пробрасываются.
    pub async fn identify(&mut self) -> bool {
        let sys_descr = ObjectId::new(known::SYS_DESCR);
        match self.get(&sys_descr).await {
            Ok(vb) => !vb.value.is_exception(),
            Err(e) => {
                debug!(target = %self.target, version = %self.version, error = %e, "sysDescr недоступен");
                false
            }
        }
    }

    async fn request(&mut self, kind: RequestKind, oid: &ObjectId) -> Result<VarBind, SnmpError> {
        let attempts = self.policy.retries + 1;
        let mut last = SnmpError::Timeout { attempts };

        for attempt in 1..=attempts {
            let call = match kind {
                RequestKind::Get => self.transport.get(oid),
                RequestKind::GetNext => self.transport.get_next(oid),
            };

            match timeout(self.policy.timeout, call).await {
                Ok(Ok(vb)) => return Ok(vb),
                // агент ответил, повтор ничего не изменит
                Ok(Err(e @ SnmpError::Protocol(_))) => return Err(e),
                Ok(Err(e @ SnmpError::Unreachable(_))) => {
                    debug!(target = %self.target, %oid, attempt, error = %e, "запрос не удался");
                    last = e;
                }
                Ok(Err(SnmpError::Timeout { .. })) | Err(_) => {
                    debug!(target = %self.target, %oid, attempt, "таймаут запроса");
                    last = SnmpError::Timeout { attempts };
                }
            }
        }

        Err(last)
    }
}
