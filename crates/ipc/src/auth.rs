//! Peer Authorization
//!
//! The socket file is already 0600, but every accepted peer is checked
//! again by kernel-reported credentials.

use crate::error::IpcError;
use tokio::net::UnixStream;

const ROOT_UID: u32 = 0;

/// Which peers may talk to the helper
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerPolicy {
    allowed_uid: Option<u32>,
}

impl PeerPolicy {
    /// Root, plus `allowed_uid` when given
    pub fn new(allowed_uid: Option<u32>) -> Self {
        Self { allowed_uid }
    }

    pub fn authorize(&self, uid: u32) -> Result<(), IpcError> {
        if uid == ROOT_UID || self.allowed_uid == Some(uid) {
            Ok(())
        } else {
            Err(IpcError::Unauthorized(uid))
        }
    }

    /// Authorize a connected stream (`SO_PEERCRED` / `getpeereid`)
    pub fn authorize_stream(&self, stream: &UnixStream) -> Result<u32, IpcError> {
        let uid = stream.peer_cred()?.uid();
        self.authorize(uid)?;
        Ok(uid)
    }
}
