/*!
  A schema-driven codec for patch-token GPU device binaries.

  A device binary is a program header, a stream of patch tokens, and per kernel a header, a name,
  an instruction heap, state heaps and another token stream. The layout of every header and token
  is not hard-coded: it is read from C-like schema text (`schema`), either the compiler's patch
  list headers or a built-in default.

  `decoder::BinaryDecoder` turns a binary into PTM text plus side-files, and
  `encoder::BinaryEncoder` turns them back into a binary. Kernel machine code goes through an
  `isa::IsaAssembler` when one is available and is kept as raw bytes otherwise.
*/

#[macro_use] extern crate lazy_static;
#[macro_use] extern crate prettytable;

pub mod container;
pub mod cursor;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod files;
pub mod hash;
pub mod isa;
pub mod messages;
pub mod ptm;
pub mod report;
pub mod schema;

pub use decoder::{BinaryDecoder, DecodeOptions, DecodedProgram};
pub use encoder::{BinaryEncoder, ContainerPolicy, EncodeOptions};
pub use error::{CodecError, Result, SchemaError};
pub use messages::MessagePrinter;
pub use schema::{Schema, SchemaLoader};
