pub mod oid;
pub mod session;
pub mod transport;
pub mod value;
pub mod walker;

pub use oid::{known, parse_oid, ObjectId};
pub use session::{RequestPolicy, Session};
pub use transport::{Connector, SnmpTransport, SnmpVersion, Target, UdpConnector, UdpTransport};
pub use value::{SnmpValue, VarBind};
pub use walker::{walk, IndexedValues, DEFAULT_MAX_WALK_ENTRIES};
