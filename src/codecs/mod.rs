//! Bundled implementations of the [`Codec`](crate::codec::Codec) capability.

pub mod deflate;

pub use deflate::DeflateCodec;
