//! Conversions between wire messages and [`Block`].
//!
//! The wire carries flattened row-major payloads with a side-length bound
//! (`max`); every conversion from the wire validates that the payload
//! actually holds `max * max` values before a block is constructed.

use blockgrid_core::Block;
use thiserror::Error;

use crate::proto;

/// Errors raised when a wire payload does not describe a valid block.
#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    #[error("payload of {len} values does not form a {max}x{max} block")]
    PayloadShape { len: usize, max: u32 },

    #[error("block payload has zero dimension")]
    ZeroDim,
}

/// Build a [`proto::BlockPair`] request from two equally sized operands.
pub fn pair_to_wire(a: &Block, b: &Block, max: u32) -> proto::BlockPair {
    proto::BlockPair {
        a: a.data().to_vec(),
        b: b.data().to_vec(),
        max,
    }
}

/// Reconstruct both operands of a [`proto::BlockPair`].
pub fn pair_from_wire(pair: proto::BlockPair) -> Result<(Block, Block), WireError> {
    let max = pair.max;
    Ok((payload_to_block(pair.a, max)?, payload_to_block(pair.b, max)?))
}

/// Build a [`proto::BlockReply`] from a computed block.
pub fn block_to_reply(block: &Block) -> proto::BlockReply {
    proto::BlockReply {
        max: block.dim() as u32,
        block: block.data().to_vec(),
    }
}

/// Reconstruct the block carried by a [`proto::BlockReply`].
pub fn reply_to_block(reply: proto::BlockReply) -> Result<Block, WireError> {
    payload_to_block(reply.block, reply.max)
}

fn payload_to_block(payload: Vec<f64>, max: u32) -> Result<Block, WireError> {
    if max == 0 {
        return Err(WireError::ZeroDim);
    }
    let len = payload.len();
    Block::from_flat(max as usize, payload).map_err(|_| WireError::PayloadShape { len, max })
}
