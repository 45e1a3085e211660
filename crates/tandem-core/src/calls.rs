//! Session table: outstanding outbound calls awaiting their replies.

use crate::RpcError;

/// One outstanding call: owns the typed reply destination and the
/// completion until a matching reply or an abort consumes it.
///
/// `fill` parses a wire payload into the reply destination; `complete`
/// fires the completion. A slot is completed exactly once, and only after
/// it has been removed from the table.
pub(crate) trait PendingReply: Send {
    fn fill(&mut self, payload: &[u8]) -> Result<(), RpcError>;
    fn complete(self: Box<Self>, result: Result<(), RpcError>);
}

impl std::fmt::Debug for dyn PendingReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PendingReply")
    }
}

/// Per-connection table of call slots.
///
/// A session id in `[0, slots.len())` is either occupied or on the free
/// list, never both. Recycled ids are reused LIFO before the table grows,
/// which keeps hot ids cache-resident and bounds growth under steady-state
/// churn.
#[derive(Default)]
pub(crate) struct SessionTable {
    slots: Vec<Option<Box<dyn PendingReply>>>,
    free: Vec<u32>,
}

impl SessionTable {
    /// Allocate a slot for `pending` and return its session id.
    pub(crate) fn issue(&mut self, pending: Box<dyn PendingReply>) -> u32 {
        match self.free.pop() {
            Some(session) => {
                debug_assert!(self.slots[session as usize].is_none());
                self.slots[session as usize] = Some(pending);
                session
            }
            None => {
                let session = self.slots.len() as u32;
                self.slots.push(Some(pending));
                session
            }
        }
    }

    /// Remove and return the slot for `session`, recycling the id.
    pub(crate) fn take(&mut self, session: u32) -> Result<Box<dyn PendingReply>, RpcError> {
        let slot = self
            .slots
            .get_mut(session as usize)
            .ok_or(RpcError::SessionOutOfRange)?;
        let pending = slot.take().ok_or(RpcError::InvalidSession)?;
        self.free.push(session);
        Ok(pending)
    }

    /// Remove every occupied slot, leaving the table empty.
    pub(crate) fn drain(&mut self) -> Vec<Box<dyn PendingReply>> {
        self.free.clear();
        self.slots.drain(..).flatten().collect()
    }

    /// Session ids of outstanding calls, ascending.
    pub(crate) fn outstanding(&self) -> Vec<u32> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(session, _)| session as u32)
            .collect()
    }

    /// Recycled ids available for reuse, most recently freed last.
    pub(crate) fn free_ids(&self) -> Vec<u32> {
        self.free.clone()
    }
}
