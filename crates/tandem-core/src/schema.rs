//! Schema facility: static descriptions of message types.
//!
//! The wire names payloads by fully-qualified schema name, and the handler
//! registry keys its dense table by each message's index within its
//! governing schema file. Message types declare both through
//! [`SchemaMessage`], normally via [`schema_file!`].

use prost::Message;

/// One schema file: a named collection of message types.
#[derive(Debug)]
pub struct SchemaFile {
    /// Package-qualified file name, e.g. `"demo.greeter"`.
    pub name: &'static str,
    /// Number of message types the file declares. Sizes the handler
    /// registry's slot table.
    pub message_count: usize,
}

/// Identifies one message type within its schema file.
#[derive(Debug)]
pub struct MessageDescriptor {
    /// The governing schema file.
    pub file: &'static SchemaFile,
    /// Position of this message within the file, `< file.message_count`.
    pub index: usize,
    /// Fully-qualified name as it travels on the wire.
    pub type_name: &'static str,
}

/// A message type that knows its wire encoding and its place in a schema
/// file.
///
/// Fresh instances come from `Default`; parsing and serialization from
/// [`prost::Message`].
pub trait SchemaMessage: Message + Default + 'static {
    /// Static descriptor tying the type to its schema file.
    fn descriptor() -> &'static MessageDescriptor;

    /// Fully-qualified wire name.
    fn type_name() -> &'static str {
        Self::descriptor().type_name
    }
}

/// Declares a schema file and the message types it contains.
///
/// Indices are assigned in declaration order, mirroring the order of the
/// messages in the source schema:
///
/// ```
/// #[derive(Clone, PartialEq, prost::Message)]
/// struct Ping {
///     #[prost(uint64, tag = "1")]
///     nonce: u64,
/// }
///
/// #[derive(Clone, PartialEq, prost::Message)]
/// struct Pong {
///     #[prost(uint64, tag = "1")]
///     nonce: u64,
/// }
///
/// tandem_core::schema_file! {
///     static GREETER: "demo.greeter" {
///         Ping = "demo.greeter.Ping",
///         Pong = "demo.greeter.Pong",
///     }
/// }
///
/// use tandem_core::SchemaMessage;
/// assert_eq!(Ping::type_name(), "demo.greeter.Ping");
/// assert_eq!(Pong::descriptor().index, 1);
/// assert_eq!(GREETER.message_count, 2);
/// ```
#[macro_export]
macro_rules! schema_file {
    (
        $vis:vis static $file:ident: $file_name:literal {
            $($ty:ident = $type_name:literal),+ $(,)?
        }
    ) => {
        $vis static $file: $crate::SchemaFile = $crate::SchemaFile {
            name: $file_name,
            message_count: [$($type_name),+].len(),
        };
        $crate::schema_file!(@impl $file; 0usize; $($ty = $type_name,)+);
    };
    (@impl $file:ident; $index:expr; $ty:ident = $type_name:literal, $($rest:tt)*) => {
        impl $crate::SchemaMessage for $ty {
            fn descriptor() -> &'static $crate::MessageDescriptor {
                static DESCRIPTOR: $crate::MessageDescriptor = $crate::MessageDescriptor {
                    file: &$file,
                    index: $index,
                    type_name: $type_name,
                };
                &DESCRIPTOR
            }
        }
        $crate::schema_file!(@impl $file; $index + 1usize; $($rest)*);
    };
    (@impl $file:ident; $index:expr;) => {};
}

#[cfg(test)]
mod tests {
    use crate::SchemaMessage;

    #[derive(Clone, PartialEq, prost::Message)]
    struct First {
        #[prost(uint32, tag = "1")]
        value: u32,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct Second {
        #[prost(string, tag = "1")]
        value: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct Third {
        #[prost(bool, tag = "1")]
        value: bool,
    }

    crate::schema_file! {
        static TEST_FILE: "tandem.test.schema" {
            First = "tandem.test.schema.First",
            Second = "tandem.test.schema.Second",
            Third = "tandem.test.schema.Third",
        }
    }

    #[test]
    fn indices_follow_declaration_order() {
        assert_eq!(First::descriptor().index, 0);
        assert_eq!(Second::descriptor().index, 1);
        assert_eq!(Third::descriptor().index, 2);
    }

    #[test]
    fn file_metadata() {
        assert_eq!(TEST_FILE.message_count, 3);
        assert_eq!(First::descriptor().file.name, "tandem.test.schema");
        assert!(std::ptr::eq(Second::descriptor().file, &TEST_FILE));
    }

    #[test]
    fn type_names() {
        assert_eq!(First::type_name(), "tandem.test.schema.First");
        assert_eq!(Third::type_name(), "tandem.test.schema.Third");
    }
}
