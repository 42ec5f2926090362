//! SNMP агент на loopback UDP: минимальный BER, GET и GETNEXT по словарю.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::ops::Bound;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;

const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_OID: u8 = 0x06;
const TAG_SEQUENCE: u8 = 0x30;
const PDU_GET: u8 = 0xA0;
const PDU_GET_NEXT: u8 = 0xA1;
const PDU_RESPONSE: u8 = 0xA2;

const NULL: [u8; 2] = [0x05, 0x00];
const NO_SUCH_OBJECT: [u8; 2] = [0x80, 0x00];
const END_OF_MIB_VIEW: [u8; 2] = [0x82, 0x00];

const NO_SUCH_NAME: i64 = 2;
const GEN_ERR: i64 = 5;

#[derive(Debug, Clone)]
pub enum AgentValue {
    Int(i64),
    Str(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct LoopbackAgent {
    community: Vec<u8>,
    mib: BTreeMap<Vec<u64>, AgentValue>,
    broken: Vec<Vec<u64>>,
    delay_first: Option<Duration>,
}

impl LoopbackAgent {
    pub fn new(community: &str) -> Self {
        Self {
            community: community.as_bytes().to_vec(),
            mib: BTreeMap::new(),
            broken: Vec::new(),
            delay_first: None,
        }
    }

    pub fn int(mut self, oid: &[u64], value: i64) -> Self {
        self.mib.insert(oid.to_vec(), AgentValue::Int(value));
        self
    }

    pub fn text(mut self, oid: &[u64], value: &str) -> Self {
        self.mib.insert(oid.to_vec(), AgentValue::Str(value.as_bytes().to_vec()));
        self
    }

    /// На запросы под этим OID отвечает genErr
    pub fn broken(mut self, oid: &[u64]) -> Self {
        self.broken.push(oid.to_vec());
        self
    }

    /// Первый ответ уходит с задержкой, остальные сразу
    pub fn delay_first(mut self, delay: Duration) -> Self {
        self.delay_first = Some(delay);
        self
    }

    pub async fn spawn(self) -> SocketAddr {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let addr = socket.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 65_535];
            let mut delay = self.delay_first;
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let Some(request) = Request::parse(&buf[..len]) else {
                    continue;
                };
                // чужая community: молчим, как настоящий принтер
                if request.community != self.community {
                    continue;
                }
                let response = self.answer(&request);

                match delay.take() {
                    Some(wait) => {
                        let socket = Arc::clone(&socket);
                        tokio::spawn(async move {
                            tokio::time::sleep(wait).await;
                            let _ = socket.send_to(&response, peer).await;
                        });
                    }
                    None => {
                        let _ = socket.send_to(&response, peer).await;
                    }
                }
            }
        });

        addr
    }

    fn answer(&self, request: &Request) -> Vec<u8> {
        let v1 = request.version == 0;
        if self.broken.iter().any(|b| request.oid.starts_with(b)) {
            return request.respond(GEN_ERR, 1, &request.oid, &NULL);
        }

        let found = match request.pdu {
            PDU_GET => self.mib.get(&request.oid).map(|v| (request.oid.clone(), v)),
            _ => self
                .mib
                .range::<Vec<u64>, _>((Bound::Excluded(&request.oid), Bound::Unbounded))
                .next()
                .map(|(k, v)| (k.clone(), v)),
        };

        match (found, v1) {
            (Some((oid, value)), _) => request.respond(0, 0, &oid, &encode_value(value)),
            (None, true) => request.respond(NO_SUCH_NAME, 1, &request.oid, &NULL),
            (None, false) if request.pdu == PDU_GET => {
                request.respond(0, 0, &request.oid, &NO_SUCH_OBJECT)
            }
            (None, false) => request.respond(0, 0, &request.oid, &END_OF_MIB_VIEW),
        }
    }
}

struct Request {
    version: i64,
    community: Vec<u8>,
    pdu: u8,
    request_id: i64,
    oid: Vec<u64>,
}

impl Request {
    fn parse(datagram: &[u8]) -> Option<Self> {
        let (_, message, _) = read_tlv(datagram)?;
        let (_, version, rest) = read_tlv(message)?;
        let (_, community, rest) = read_tlv(rest)?;
        let (pdu, body, _) = read_tlv(rest)?;
        if pdu != PDU_GET && pdu != PDU_GET_NEXT {
            return None;
        }
        let (_, request_id, rest) = read_tlv(body)?;
        let (_, _status, rest) = read_tlv(rest)?;
        let (_, _index, rest) = read_tlv(rest)?;
        let (_, varbinds, _) = read_tlv(rest)?;
        let (_, varbind, _) = read_tlv(varbinds)?;
        let (_, oid, _) = read_tlv(varbind)?;

        Some(Self {
            version: read_int(version),
            community: community.to_vec(),
            pdu,
            request_id: read_int(request_id),
            oid: read_oid(oid),
        })
    }

    fn respond(&self, status: i64, index: i64, oid: &[u64], value: &[u8]) -> Vec<u8> {
        let varbind = tlv(TAG_SEQUENCE, &[tlv(TAG_OID, &encode_oid(oid)), value.to_vec()].concat());
        let body = [
            tlv(TAG_INTEGER, &encode_int(self.request_id)),
            tlv(TAG_INTEGER, &encode_int(status)),
            tlv(TAG_INTEGER, &encode_int(index)),
            tlv(TAG_SEQUENCE, &varbind),
        ]
        .concat();
        let message = [
            tlv(TAG_INTEGER, &encode_int(self.version)),
            tlv(TAG_OCTET_STRING, &self.community),
            tlv(PDU_RESPONSE, &body),
        ]
        .concat();
        tlv(TAG_SEQUENCE, &message)
    }
}

fn read_tlv(buf: &[u8]) -> Option<(u8, &[u8], &[u8])> {
    let tag = *buf.first()?;
    let first = usize::from(*buf.get(1)?);
    let (len, header) = if first < 0x80 {
        (first, 2)
    } else {
        let octets = first & 0x7f;
        let mut len = 0usize;
        for i in 0..octets {
            len = (len << 8) | usize::from(*buf.get(2 + i)?);
        }
        (len, 2 + octets)
    };
    let content = buf.get(header..header + len)?;
    Some((tag, content, &buf[header + len..]))
}

fn read_int(content: &[u8]) -> i64 {
    let negative = content.first().is_some_and(|b| b & 0x80 != 0);
    let start = if negative { -1i64 } else { 0 };
    content
        .iter()
        .fold(start, |acc, byte| (acc << 8) | i64::from(*byte))
}

fn read_oid(content: &[u8]) -> Vec<u64> {
    let Some((first, rest)) = content.split_first() else {
        return Vec::new();
    };
    let mut parts = vec![u64::from(first / 40), u64::from(first % 40)];
    let mut acc = 0u64;
    for byte in rest {
        acc = (acc << 7) | u64::from(byte & 0x7f);
        if byte & 0x80 == 0 {
            parts.push(acc);
            acc = 0;
        }
    }
    parts
}

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    match content.len() {
        len if len < 0x80 => out.push(len as u8),
        len if len <= 0xff => out.extend([0x81, len as u8]),
        len => out.extend([0x82, (len >> 8) as u8, len as u8]),
    }
    out.extend_from_slice(content);
    out
}

fn encode_int(value: i64) -> Vec<u8> {
    let mut bytes = value.to_be_bytes().to_vec();
    while bytes.len() > 1
        && ((bytes[0] == 0x00 && bytes[1] & 0x80 == 0) || (bytes[0] == 0xff && bytes[1] & 0x80 != 0))
    {
        bytes.remove(0);
    }
    bytes
}

fn encode_oid(parts: &[u64]) -> Vec<u8> {
    let mut out = vec![(parts[0] * 40 + parts[1]) as u8];
    for part in &parts[2..] {
        let mut chunk = vec![(part & 0x7f) as u8];
        let mut rest = part >> 7;
        while rest > 0 {
            chunk.insert(0, (rest & 0x7f) as u8 | 0x80);
            rest >>= 7;
        }
        out.extend(chunk);
    }
    out
}

fn encode_value(value: &AgentValue) -> Vec<u8> {
    match value {
        AgentValue::Int(v) => tlv(TAG_INTEGER, &encode_int(*v)),
        AgentValue::Str(s) => tlv(TAG_OCTET_STRING, s),
    }
}
