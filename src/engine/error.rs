use thiserror::Error;

use crate::app::{Endpoint, GeneratorId, ReceiverId};
use crate::net::{NetError, NodeId};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Net(#[from] NetError),
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("unknown generator {0:?}")]
    UnknownGenerator(GeneratorId),
    #[error("unknown receiver {0:?}")]
    UnknownReceiver(ReceiverId),
    #[error("{0:?} is already scheduled to start")]
    AlreadyScheduled(Endpoint),
    #[error("port {port} already has a receiver on {node:?}")]
    PortInUse { node: NodeId, port: u16 },
}
