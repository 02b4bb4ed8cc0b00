//! Code generation backends.
//!
//! Each backend is a formatter over registered schema objects: it borrows
//! the [`Registry`](crate::registry::Registry) to resolve links and
//! produces strings, leaving all file writing to [`crate::writer`].
//!
//! * [`protobuf`] - one `.proto` file per service.
//! * [`rust`] - the `gen/` module tree compiled into each service crate.
//! * [`graphql`] - query and mutation documents for the web client.

pub mod graphql;
pub mod protobuf;
pub mod rust;
