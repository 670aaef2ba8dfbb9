//! 网络层错误

use std::net::Ipv4Addr;

use thiserror::Error;

use super::addr::{AddressError, Ipv4Block};
use super::id::{LinkId, NodeId};

#[derive(Debug, Error)]
pub enum NetError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("unknown link {0:?}")]
    UnknownLink(LinkId),
    #[error("cannot link node {0:?} to itself")]
    SelfLoop(NodeId),
    #[error("network stack already installed on {0:?}")]
    StackAlreadyInstalled(NodeId),
    #[error("network stack not installed on {0:?}")]
    NoStack(NodeId),
    #[error("link {0:?} already has addresses")]
    AlreadyAddressed(LinkId),
    #[error("address {0} already assigned")]
    DuplicateAddress(Ipv4Addr),
    #[error("block {0} has no room for two interfaces")]
    BlockTooSmall(Ipv4Block),
    #[error(transparent)]
    Address(#[from] AddressError),
}
