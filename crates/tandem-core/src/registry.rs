//! Handler registry: routes inbound requests to bound user handlers.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;

use crate::{RpcError, SchemaMessage};

/// A bound handler with its (request, reply) pair erased.
///
/// `invoke` parses the wire payload into a fresh request, runs the user
/// function against a fresh reply, and hands back the reply's wire name and
/// serialized form.
pub(crate) trait BoundHandler: Send + Sync {
    fn invoke(&self, payload: &[u8]) -> Result<(&'static str, Bytes), RpcError>;
}

impl std::fmt::Debug for dyn BoundHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BoundHandler")
    }
}

struct TypedHandler<Req, Rep, F> {
    handler: F,
    _types: PhantomData<fn(&Req, &mut Rep)>,
}

impl<Req, Rep, F> BoundHandler for TypedHandler<Req, Rep, F>
where
    Req: SchemaMessage,
    Rep: SchemaMessage,
    F: Fn(&Req, &mut Rep) + Send + Sync,
{
    fn invoke(&self, payload: &[u8]) -> Result<(&'static str, Bytes), RpcError> {
        let request = Req::decode(payload).map_err(|_| RpcError::ParsePayloadFailed)?;
        let mut reply = Rep::default();
        (self.handler)(&request, &mut reply);
        Ok((Rep::type_name(), reply.encode_to_vec().into()))
    }
}

/// Dense handler table keyed by schema index, plus the name map used to
/// resolve inbound `message` fields.
///
/// The table is sized on first bind from the request type's schema file, so
/// dispatch indexes a vector instead of hashing.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    slots: Vec<Option<Arc<dyn BoundHandler>>>,
    by_name: HashMap<&'static str, usize>,
}

impl HandlerRegistry {
    /// Bind `handler` for the (Req, Rep) pair. Binding the same request
    /// type again replaces the previous entry.
    pub(crate) fn bind<Req, Rep, F>(&mut self, handler: F)
    where
        Req: SchemaMessage,
        Rep: SchemaMessage,
        F: Fn(&Req, &mut Rep) + Send + Sync + 'static,
    {
        let descriptor = Req::descriptor();
        if self.slots.is_empty() {
            self.slots.resize_with(descriptor.file.message_count, || None);
        }
        assert!(
            descriptor.index < self.slots.len(),
            "descriptor index {} out of range for schema file {} ({} messages)",
            descriptor.index,
            descriptor.file.name,
            self.slots.len(),
        );
        self.slots[descriptor.index] = Some(Arc::new(TypedHandler {
            handler,
            _types: PhantomData,
        }));
        self.by_name.insert(descriptor.type_name, descriptor.index);
    }

    /// Resolve an inbound request type name to its bound handler.
    pub(crate) fn lookup(&self, type_name: &str) -> Result<Arc<dyn BoundHandler>, RpcError> {
        self.by_name
            .get(type_name)
            .and_then(|&index| self.slots.get(index))
            .and_then(|slot| slot.clone())
            .ok_or(RpcError::UnknownProtocolDescriptor)
    }

    /// Drop every bound handler.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.by_name.clear();
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
